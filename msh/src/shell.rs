use anyhow::Result;
use msh_types::{Context, ExitStatus};
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use nix::unistd::{Pid, getpid, setpgid};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

use crate::parser::parse_command_line;
use crate::process::foreground::ForegroundSlot;
use crate::process::fork::{SpawnOutcome, spawn};
use crate::process::job::JobList;
use crate::process::signal;

/// The shell's single instance of state, constructed once at process start
/// and passed by reference into every command handler.
///
/// The job table and the foreground slot are the only state shared with the
/// signal path, and only through the reap queue and the foreground-pid
/// atomic (see `process::signal`).
#[derive(Debug)]
pub struct Shell {
    pub pid: Pid,
    pub pgid: Pid,
    pub prompt: String,
    pub exited: Option<ExitStatus>,
    pub(crate) jobs: JobList,
    pub(crate) foreground: ForegroundSlot,
    pub(crate) aliases: HashMap<String, String>,
    pub(crate) previous_dir: Option<PathBuf>,
    /// Exit status of the last foreground command. Internal bookkeeping
    /// only; not yet surfaced to callers.
    pub last_status: i32,
}

impl Default for Shell {
    fn default() -> Self {
        Self::new()
    }
}

impl Shell {
    pub fn new() -> Self {
        let pid = getpid();
        let pgid = pid;
        let _ = setpgid(pid, pgid);

        Shell {
            pid,
            pgid,
            prompt: String::from("msh"),
            exited: None,
            jobs: JobList::new(),
            foreground: ForegroundSlot::new(),
            aliases: HashMap::new(),
            previous_dir: None,
            last_status: 0,
        }
    }

    /// Installs the SIGCHLD/SIGINT handlers and shields the shell itself
    /// from the remaining job-control signals.
    pub fn set_signals(&mut self) -> Result<()> {
        signal::install_handlers()?;

        let action = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
        for sig in [
            Signal::SIGQUIT,
            Signal::SIGTSTP,
            Signal::SIGTTIN,
            Signal::SIGTTOU,
        ] {
            unsafe {
                sigaction(sig, &action)
                    .map_err(|e| anyhow::anyhow!("failed to ignore {:?}: {}", sig, e))?;
            }
        }
        Ok(())
    }

    /// Dispatches one line of input: reap pass, parse, then a builtin call
    /// or an external spawn. Errors are reported as a single diagnostic
    /// line; nothing short of `quit` terminates the shell.
    pub fn eval_str(&mut self, ctx: &Context, input: &str) -> Result<ExitStatus> {
        self.jobs.remove_finished();

        let Some(cmdline) = parse_command_line(input, &self.aliases) else {
            return Ok(ExitStatus::ExitedWith(0));
        };
        debug!(
            "dispatch '{}' background:{} argv:{:?}",
            cmdline.line, cmdline.background, cmdline.argv
        );

        if let Some(builtin) = msh_builtin::get_command(&cmdline.argv[0]) {
            let status = builtin(ctx, cmdline.argv.clone(), self);
            return Ok(status);
        }

        match spawn(&mut self.jobs, &mut self.foreground, &cmdline) {
            Ok(SpawnOutcome::Completed(code)) => {
                self.last_status = code;
                Ok(ExitStatus::ExitedWith(code))
            }
            Ok(SpawnOutcome::Stopped(pid)) => {
                let job_id = self.jobs.add_job(pid, cmdline.line.clone(), true);
                debug!("stopped foreground child registered as job [{}]", job_id);
                ctx.write_stdout(&format!("msh: process {} was stopped", pid))
                    .ok();
                Ok(ExitStatus::ExitedWith(1))
            }
            Ok(SpawnOutcome::Backgrounded(job_id, pid)) => {
                debug!("background job [{}] pid:{}", job_id, pid);
                Ok(ExitStatus::Running(pid))
            }
            Err(err) => {
                ctx.write_stderr(&format!("msh: {err}")).ok();
                self.last_status = 1;
                Ok(ExitStatus::ExitedWith(1))
            }
        }
    }
}
