use anyhow::Result;
use msh_types::{Context, ExitStatus};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::debug;

mod alias;
mod bg;
pub mod cd;
mod chprompt;
mod fg;
mod jobs;
mod kill;
mod pwd;
mod quit;
mod showpid;
mod unalias;

/// Interface builtin commands use to reach shell state without a direct
/// dependency on the shell crate.
pub trait ShellProxy {
    /// Routes job-control commands (`jobs`, `fg`, `bg`, `kill`, `quit`) to
    /// the shell's dispatcher, which owns the job table.
    fn dispatch(&mut self, ctx: &Context, cmd: &str, argv: Vec<String>) -> Result<()>;

    /// Changes the working directory and records the previous one for `cd -`.
    fn changepwd(&mut self, path: &str) -> Result<()>;

    /// Directory the shell was in before the last `cd`, if any.
    fn previous_dir(&self) -> Option<String>;

    fn set_prompt(&mut self, prompt: String);

    fn set_alias(&mut self, name: String, command: String);

    /// Returns true if the alias existed.
    fn remove_alias(&mut self, name: &str) -> bool;

    fn list_aliases(&self) -> Vec<(String, String)>;
}

pub type BuiltinCommand =
    fn(ctx: &Context, argv: Vec<String>, proxy: &mut dyn ShellProxy) -> ExitStatus;

static BUILTIN_COMMAND: Lazy<HashMap<&'static str, BuiltinCommand>> = Lazy::new(|| {
    let mut builtin: HashMap<&'static str, BuiltinCommand> = HashMap::new();

    // Job control
    builtin.insert("jobs", jobs::command);
    builtin.insert("fg", fg::command);
    builtin.insert("bg", bg::command);
    builtin.insert("kill", kill::command);
    builtin.insert("quit", quit::command);

    // Directory and environment
    builtin.insert("cd", cd::command);
    builtin.insert("pwd", pwd::command);
    builtin.insert("showpid", showpid::command);
    builtin.insert("chprompt", chprompt::command);

    // Alias table
    builtin.insert("alias", alias::command);
    builtin.insert("unalias", unalias::command);

    builtin
});

pub fn get_command(name: &str) -> Option<BuiltinCommand> {
    let cmd = BUILTIN_COMMAND.get(name).copied();
    debug!("builtin lookup '{}' -> {}", name, cmd.is_some());
    cmd
}
