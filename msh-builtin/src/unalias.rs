use super::ShellProxy;
use msh_types::{Context, ExitStatus};

pub fn command(ctx: &Context, argv: Vec<String>, proxy: &mut dyn ShellProxy) -> ExitStatus {
    let Some(name) = argv.get(1) else {
        ctx.write_stderr("unalias: usage: unalias <name>").ok();
        return ExitStatus::ExitedWith(1);
    };

    if proxy.remove_alias(name) {
        ExitStatus::ExitedWith(0)
    } else {
        ctx.write_stderr(&format!("unalias: {name} alias does not exist"))
            .ok();
        ExitStatus::ExitedWith(1)
    }
}
