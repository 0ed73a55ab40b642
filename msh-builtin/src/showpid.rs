use super::ShellProxy;
use msh_types::{Context, ExitStatus};

pub fn command(ctx: &Context, _argv: Vec<String>, _proxy: &mut dyn ShellProxy) -> ExitStatus {
    ctx.write_stdout(&format!("msh pid is {}", ctx.shell_pid)).ok();
    ExitStatus::ExitedWith(0)
}
