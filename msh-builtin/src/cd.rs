use super::ShellProxy;
use msh_types::{Context, ExitStatus};
use std::path::Path;

pub fn command(ctx: &Context, argv: Vec<String>, proxy: &mut dyn ShellProxy) -> ExitStatus {
    let current_dir = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(err) => {
            ctx.write_stderr(&format!("cd: {err}")).ok();
            return ExitStatus::ExitedWith(1);
        }
    };

    let dir = match argv.get(1).map(|s| s.as_str()) {
        Some("-") => match proxy.previous_dir() {
            Some(prev) => prev,
            None => {
                ctx.write_stderr("cd: no previous directory").ok();
                return ExitStatus::ExitedWith(1);
            }
        },
        Some(dir) if dir.starts_with('/') => dir.to_string(),
        Some(dir) => {
            let res = Path::new(&current_dir).join(dir).canonicalize();
            match res {
                Ok(res) => res.to_string_lossy().into_owned(),
                Err(err) => {
                    ctx.write_stderr(&format!("cd: {err}: {dir}")).ok();
                    return ExitStatus::ExitedWith(1);
                }
            }
        }
        None => std::env::var("HOME").unwrap_or_else(|_| String::from("/")),
    };

    match proxy.changepwd(&dir) {
        Ok(_) => ExitStatus::ExitedWith(0),
        Err(err) => {
            ctx.write_stderr(&format!("cd: {err}: {dir}")).ok();
            ExitStatus::ExitedWith(1)
        }
    }
}
