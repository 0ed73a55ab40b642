use msh_types::{BgError, Context, FgError, KillError};
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use tracing::{debug, warn};

use super::job::JobList;
use super::signal::{self, send_signal};
use super::state::JobState;
use super::wait::wait_pid_job;

/// The zero-or-one process the shell is currently blocked on.
///
/// Set immediately before a blocking wait begins and cleared immediately
/// after it returns. The pid is mirrored into a signal-safe atomic so the
/// SIGINT handler can target it; the command text stays on this thread.
#[derive(Debug, Default)]
pub struct ForegroundSlot {
    entry: Option<(Pid, String)>,
}

impl ForegroundSlot {
    pub fn new() -> Self {
        ForegroundSlot { entry: None }
    }

    pub fn set(&mut self, pid: Pid, cmd: String) {
        signal::set_foreground_pid(pid);
        self.entry = Some((pid, cmd));
    }

    pub fn clear(&mut self) {
        signal::clear_foreground_pid();
        self.entry = None;
    }

    pub fn pid(&self) -> Option<Pid> {
        self.entry.as_ref().map(|(pid, _)| *pid)
    }

    pub fn command(&self) -> Option<&str> {
        self.entry.as_ref().map(|(_, cmd)| cmd.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }
}

/// Promotes a job to the foreground and blocks on it.
///
/// The job leaves the table when promoted; it is no longer a background
/// bookkeeping entry. If it stops again while foregrounded it is NOT
/// reinserted and drops out of `jobs`, a limitation carried over from the
/// modeled system (see DESIGN.md).
pub fn bring_to_foreground(
    jobs: &mut JobList,
    slot: &mut ForegroundSlot,
    ctx: &Context,
    target: Option<usize>,
) -> Result<(), FgError> {
    let job_id = match target {
        Some(id) => {
            if jobs.get_by_id(id).is_none() {
                return Err(FgError::NoSuchJob(id));
            }
            id
        }
        None => jobs.get_last().ok_or(FgError::EmptyJobList)?.job_id,
    };

    let Some(job) = jobs.remove_by_id(job_id) else {
        return Err(FgError::NoSuchJob(job_id));
    };
    debug!("foreground job [{}] pid:{} '{}'", job.job_id, job.pid, job.cmd);
    ctx.write_stdout(&format!("{} {}", job.cmd, job.pid)).ok();

    if job.state.is_stopped() {
        if let Err(err) = killpg(job.pgid, Signal::SIGCONT) {
            warn!("failed to send SIGCONT to pgid {}: {}", job.pgid, err);
        }
    }

    slot.set(job.pid, job.cmd.clone());
    let state = wait_pid_job(job.pid, false);
    slot.clear();

    if let Some((_, JobState::Stopped(signal))) = state {
        debug!(
            "foregrounded job [{}] stopped again ({:?}) and is no longer tracked",
            job.job_id, signal
        );
    }
    Ok(())
}

/// Resumes a stopped job without taking the foreground. The job stays in the
/// table and is marked running in place.
pub fn continue_in_background(
    jobs: &mut JobList,
    ctx: &Context,
    target: usize,
) -> Result<(), BgError> {
    let job = jobs
        .get_mut_by_id(target)
        .ok_or(BgError::NoSuchJob(target))?;
    if !job.state.is_stopped() {
        return Err(BgError::NotStopped(target));
    }

    if let Err(err) = killpg(job.pgid, Signal::SIGCONT) {
        warn!("failed to send SIGCONT to pgid {}: {}", job.pgid, err);
    }
    job.state = JobState::Running;
    ctx.write_stdout(&format!("{} : {}", job.cmd, job.pid)).ok();
    Ok(())
}

/// Delivers `signum` to the job's process. Argument validation happens
/// before any delivery is attempted.
pub fn kill_job(
    jobs: &mut JobList,
    ctx: &Context,
    target: usize,
    signum: i32,
) -> Result<(), KillError> {
    if signum <= 0 {
        return Err(KillError::InvalidArguments);
    }
    let signal = Signal::try_from(signum).map_err(|_| KillError::InvalidArguments)?;

    let job = jobs.get_by_id(target).ok_or(KillError::NoSuchJob(target))?;
    send_signal(job.pid, signal).map_err(|source| KillError::Delivery {
        pid: job.pid.as_raw(),
        source,
    })?;

    ctx.write_stdout(&format!(
        "signal number {} was sent to pid {}",
        signum, job.pid
    ))
    .ok();
    Ok(())
}
