use msh_types::SpawnError;
use nix::unistd::{ForkResult, Pid, fork, getpid};
use tracing::{debug, error};

use super::foreground::ForegroundSlot;
use super::job::JobList;
use super::process::Process;
use super::signal::{block_sigchld, unblock_sigchld};
use super::state::JobState;
use super::wait::wait_pid_job;
use crate::parser::CommandLine;

/// How a spawned command resolved from the shell's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnOutcome {
    /// Foreground child exited with this status.
    Completed(i32),
    /// Foreground child was suspended instead of exiting; the dispatcher
    /// registers it in the job table.
    Stopped(Pid),
    /// Background child registered under this job id.
    Backgrounded(usize, Pid),
}

/// Creates a child process for the command and decides synchronous vs.
/// asynchronous completion.
///
/// Background: register in the table and return immediately. Foreground:
/// occupy the foreground slot and block until the child exits or stops.
/// Fork failure is fatal to this command only, never to the shell.
pub fn spawn(
    jobs: &mut JobList,
    slot: &mut ForegroundSlot,
    cmdline: &CommandLine,
) -> Result<SpawnOutcome, SpawnError> {
    let mut process = Process::new(cmdline.argv.join(" "), cmdline.argv.clone());

    // SIGCHLD stays blocked until the child is either registered in the
    // table or collected by the foreground wait; otherwise the handler can
    // reap a fast-exiting child first and the status is lost.
    block_sigchld().ok();
    let fork_result = match unsafe { fork() } {
        Ok(result) => result,
        Err(err) => {
            unblock_sigchld().ok();
            return Err(SpawnError::ForkFailed(err));
        }
    };
    match fork_result {
        ForkResult::Child => {
            let pid = getpid();
            if let Err(err) = process.launch(pid) {
                error!("child launch failed: {}", err);
                std::process::exit(127);
            }
            // launch either execs or exits; this is unreachable in practice.
            std::process::exit(1);
        }
        ForkResult::Parent { child } => {
            debug!(
                "forked '{}' pid:{} background:{}",
                cmdline.line, child, cmdline.background
            );

            if cmdline.background {
                let job_id = jobs.add_job(child, cmdline.line.clone(), false);
                unblock_sigchld().ok();
                return Ok(SpawnOutcome::Backgrounded(job_id, child));
            }

            slot.set(child, cmdline.line.clone());
            let state = wait_pid_job(child, false);
            slot.clear();
            unblock_sigchld().ok();

            match state {
                Some((_, JobState::Stopped(signal))) => {
                    debug!("foreground child {} stopped by {:?}", child, signal);
                    Ok(SpawnOutcome::Stopped(child))
                }
                Some((_, JobState::Terminated(status, signal))) => {
                    debug!(
                        "foreground child {} terminated status:{} signal:{:?}",
                        child, status, signal
                    );
                    Ok(SpawnOutcome::Completed(status as i32))
                }
                _ => Ok(SpawnOutcome::Completed(1)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_command_line;
    use std::collections::HashMap;

    fn init() {
        let _ = tracing_subscriber::fmt::try_init();
    }

    fn descriptor(input: &str) -> CommandLine {
        parse_command_line(input, &HashMap::new()).expect("descriptor")
    }

    #[test]
    fn foreground_spawn_completes_with_exit_status() {
        init();
        let mut jobs = JobList::new();
        let mut slot = ForegroundSlot::new();

        let outcome = spawn(&mut jobs, &mut slot, &descriptor("true")).expect("spawn");
        assert_eq!(outcome, SpawnOutcome::Completed(0));
        assert!(jobs.is_empty());
        assert!(slot.is_empty());

        let outcome = spawn(&mut jobs, &mut slot, &descriptor("false")).expect("spawn");
        assert_eq!(outcome, SpawnOutcome::Completed(1));
    }

    #[test]
    fn background_spawn_registers_job_and_returns_immediately() {
        init();
        let mut jobs = JobList::new();
        let mut slot = ForegroundSlot::new();

        let outcome = spawn(&mut jobs, &mut slot, &descriptor("sleep 60 &")).expect("spawn");
        let SpawnOutcome::Backgrounded(job_id, pid) = outcome else {
            panic!("expected Backgrounded, got {outcome:?}");
        };
        assert_eq!(job_id, 1);
        assert!(slot.is_empty());

        let job = jobs.get_by_id(job_id).expect("registered");
        assert_eq!(job.pid, pid);
        assert_eq!(job.state, JobState::Running);
        assert_eq!(job.cmd, "sleep 60 &");

        // Cleanup: the child is ours to reap.
        nix::sys::signal::kill(pid, nix::sys::signal::Signal::SIGKILL).ok();
        wait_pid_job(pid, false);
    }
}
