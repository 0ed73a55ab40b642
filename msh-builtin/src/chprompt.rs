use super::ShellProxy;
use msh_types::{Context, ExitStatus};

/// With no argument, resets the prompt to the default.
pub fn command(_ctx: &Context, argv: Vec<String>, proxy: &mut dyn ShellProxy) -> ExitStatus {
    let prompt = argv.get(1).cloned().unwrap_or_else(|| String::from("msh"));
    proxy.set_prompt(prompt);
    ExitStatus::ExitedWith(0)
}
