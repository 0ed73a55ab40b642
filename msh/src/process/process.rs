use anyhow::{Context as _, Result};
use nix::sys::signal::{
    SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal, sigaction, sigprocmask,
};
use nix::unistd::{Pid, execv, execvp, setpgid};
use std::ffi::CString;
use tracing::{debug, error};

use super::state::JobState;

/// Child-process half of the launcher: what runs between `fork` and `exec`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process {
    pub(crate) cmd: String,
    pub(crate) argv: Vec<String>,
    pub(crate) pid: Option<Pid>,
    pub(crate) state: JobState,
}

/// Commands containing shell glob characters are handed to `/bin/bash -c`
/// for expansion instead of being exec'd directly.
pub(crate) fn has_wildcard(cmd: &str) -> bool {
    cmd.contains('*') || cmd.contains('?')
}

impl Process {
    pub fn new(cmd: String, argv: Vec<String>) -> Self {
        Process {
            cmd,
            argv,
            pid: None,
            state: JobState::Running,
        }
    }

    fn set_signals(&self) -> Result<()> {
        debug!("reset signal dispositions pid:{:?}", self.pid);
        // The shell ignores or handles these; the child must get the
        // defaults back before exec.
        let action = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
        unsafe {
            sigaction(Signal::SIGINT, &action)
                .map_err(|e| anyhow::anyhow!("failed to set SIGINT handler: {}", e))?;
            sigaction(Signal::SIGQUIT, &action)
                .map_err(|e| anyhow::anyhow!("failed to set SIGQUIT handler: {}", e))?;
            sigaction(Signal::SIGTSTP, &action)
                .map_err(|e| anyhow::anyhow!("failed to set SIGTSTP handler: {}", e))?;
            sigaction(Signal::SIGTTIN, &action)
                .map_err(|e| anyhow::anyhow!("failed to set SIGTTIN handler: {}", e))?;
            sigaction(Signal::SIGTTOU, &action)
                .map_err(|e| anyhow::anyhow!("failed to set SIGTTOU handler: {}", e))?;
            sigaction(Signal::SIGCHLD, &action)
                .map_err(|e| anyhow::anyhow!("failed to set SIGCHLD handler: {}", e))?;
        }
        Ok(())
    }

    /// Runs in the forked child. Joins its own process group so terminal
    /// signals aimed at the shell do not reach it, restores default signal
    /// dispositions, then replaces the image. Never returns to shell code:
    /// exec failure exits the child with a non-zero status.
    pub fn launch(&mut self, pid: Pid) -> Result<()> {
        setpgid(pid, pid).context("failed setpgid")?;
        self.set_signals()?;

        // The parent forks with SIGCHLD blocked; the mask survives exec, so
        // clear it before replacing the image.
        let mask = SigSet::empty();
        sigprocmask(SigmaskHow::SIG_SETMASK, Some(&mask), None).context("failed sigprocmask")?;

        if has_wildcard(&self.cmd) {
            debug!("wildcard in '{}', delegating to /bin/bash -c", self.cmd);
            let bash = CString::new("/bin/bash").context("failed new CString")?;
            let argv = [
                bash.clone(),
                CString::new("-c").context("failed new CString")?,
                CString::new(self.cmd.clone()).context("failed new CString")?,
            ];
            if let Err(err) = execv(&bash, &argv) {
                error!("failed to exec /bin/bash -c '{}' ({})", self.cmd, err);
                eprintln!("msh: failed to exec /bin/bash: {err}");
                std::process::exit(127);
            }
            unreachable!();
        }

        let cmd = CString::new(self.argv[0].clone()).context("failed new CString")?;
        let argv: Result<Vec<CString>> = self
            .argv
            .clone()
            .into_iter()
            .map(|a| CString::new(a).map_err(|e| anyhow::anyhow!("failed to create CString: {}", e)))
            .collect();
        let argv = argv?;

        debug!("launch: execvp cmd:{:?} argv:{:?} pid:{:?}", cmd, argv, pid);

        if let Err(err) = execvp(&cmd, &argv) {
            error!("failed to exec {:?} ({})", cmd, err);
            eprintln!("msh: {}: {err}", self.argv[0]);
            std::process::exit(127);
        }
        unreachable!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = tracing_subscriber::fmt::try_init();
    }

    #[test]
    fn wildcard_detection() {
        init();
        assert!(has_wildcard("ls *.rs"));
        assert!(has_wildcard("ls file?.txt"));
        assert!(!has_wildcard("ls -la src"));
    }

    #[test]
    fn new_process_starts_running() {
        init();
        let process = Process::new(
            "sleep 100".to_string(),
            vec!["sleep".to_string(), "100".to_string()],
        );
        assert_eq!(process.state, JobState::Running);
        assert!(process.pid.is_none());
    }
}
