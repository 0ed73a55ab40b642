use nix::errno::Errno;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use tracing::{debug, error};

use super::state::JobState;

/// Collects the status of one child.
///
/// With `no_hang` the call never blocks and returns `None` while the child is
/// still alive. Without it the call blocks until the child exits or stops
/// (`WUNTRACED`), retrying on `EINTR` so an interrupting signal handler does
/// not abort the wait.
///
/// `ECHILD` means the child was already reaped, normally by the SIGCHLD
/// handler racing ahead of us; it is reported as terminated so callers drop
/// the job either way.
pub fn wait_pid_job(pid: Pid, no_hang: bool) -> Option<(Pid, JobState)> {
    let options = if no_hang {
        WaitPidFlag::WUNTRACED | WaitPidFlag::WNOHANG
    } else {
        WaitPidFlag::WUNTRACED
    };

    loop {
        let result = waitpid(pid, Some(options));
        debug!("waitpid pid: {} no_hang: {} -> {:?}", pid, no_hang, result);

        return match result {
            Ok(WaitStatus::Exited(pid, status)) => {
                Some((pid, JobState::Terminated(status as u8, None)))
            }
            Ok(WaitStatus::Signaled(pid, signal, _core_dumped)) => {
                Some((pid, JobState::Terminated(1, Some(signal))))
            }
            Ok(WaitStatus::Stopped(pid, signal)) => Some((pid, JobState::Stopped(signal))),
            Err(Errno::ECHILD) => Some((pid, JobState::Terminated(1, None))),
            Err(Errno::EINTR) => continue,
            Ok(WaitStatus::StillAlive) => None,
            Ok(WaitStatus::Continued(_)) => None,
            status => {
                error!("unexpected waitpid status for pid {}: {:?}", pid, status);
                None
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    fn init() {
        let _ = tracing_subscriber::fmt::try_init();
    }

    #[test]
    fn blocking_wait_reports_exit_status() {
        init();
        let child = Command::new("true").spawn().expect("spawn true");
        let pid = Pid::from_raw(child.id() as i32);

        let (waited, state) = wait_pid_job(pid, false).expect("status");
        assert_eq!(waited, pid);
        assert_eq!(state, JobState::Terminated(0, None));
    }

    #[test]
    fn blocking_wait_reports_nonzero_exit() {
        init();
        let child = Command::new("false").spawn().expect("spawn false");
        let pid = Pid::from_raw(child.id() as i32);

        let (_, state) = wait_pid_job(pid, false).expect("status");
        assert_eq!(state, JobState::Terminated(1, None));
    }

    #[test]
    fn no_hang_returns_none_for_live_child() {
        init();
        let mut child = Command::new("sleep").arg("5").spawn().expect("spawn sleep");
        let pid = Pid::from_raw(child.id() as i32);

        assert!(wait_pid_job(pid, true).is_none());

        child.kill().ok();
        child.wait().ok();
    }

    #[test]
    fn already_reaped_child_reports_terminated() {
        init();
        let mut child = Command::new("true").spawn().expect("spawn true");
        let pid = Pid::from_raw(child.id() as i32);
        child.wait().expect("reap via std");

        // ECHILD path: the kernel no longer knows this child.
        let (_, state) = wait_pid_job(pid, true).expect("status");
        assert!(state.is_terminated());
    }
}
