use super::ShellProxy;
use msh_types::{Context, ExitStatus};
use tracing::debug;

pub fn command(ctx: &Context, argv: Vec<String>, proxy: &mut dyn ShellProxy) -> ExitStatus {
    debug!("quit requested: {:?}", argv);
    match proxy.dispatch(ctx, "quit", argv) {
        Ok(_) => ExitStatus::ExitedWith(0),
        Err(e) => {
            ctx.write_stderr(&format!("quit: {e}")).ok();
            ExitStatus::ExitedWith(1)
        }
    }
}
