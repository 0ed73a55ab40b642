use msh_types::Context;
use nix::sys::signal::Signal;
use nix::unistd::Pid;
use std::time::Instant;
use tracing::{debug, warn};

use super::signal::{send_signal, take_reaped};
use super::state::JobState;
use super::wait::wait_pid_job;

/// One tracked background or stopped child.
///
/// `pgid == pid`: every job launched by this shell leads its own process
/// group, so the whole job can be signalled as `-pgid` if ever needed.
#[derive(Debug)]
pub struct Job {
    pub job_id: usize,
    pub pid: Pid,
    pub pgid: Pid,
    pub cmd: String,
    pub state: JobState,
    pub started_at: Instant,
}

/// The authoritative record of background and stopped jobs.
///
/// Ids are handed out from a counter that only moves forward; an id is never
/// reused within a shell session. `jobs` stays sorted by id because inserts
/// always append with a larger id and removals preserve order.
#[derive(Debug, Default)]
pub struct JobList {
    jobs: Vec<Job>,
    last_job_id: usize,
}

impl JobList {
    pub fn new() -> Self {
        JobList {
            jobs: Vec::new(),
            last_job_id: 0,
        }
    }

    /// Registers a child. Runs a reap pass first so the table never grows
    /// while holding entries for already-dead processes.
    pub fn add_job(&mut self, pid: Pid, cmd: String, stopped: bool) -> usize {
        self.remove_finished();

        self.last_job_id += 1;
        let job_id = self.last_job_id;
        let state = if stopped {
            JobState::Stopped(Signal::SIGTSTP)
        } else {
            JobState::Running
        };
        debug!("add job [{}] pid:{} '{}' state:{}", job_id, pid, cmd, state);
        self.jobs.push(Job {
            job_id,
            pid,
            pgid: pid,
            cmd,
            state,
            started_at: Instant::now(),
        });
        job_id
    }

    /// Non-blocking reap pass: drains the SIGCHLD queue, then polls every
    /// tracked pid. Exited children leave the table; stopped ones are marked.
    pub fn remove_finished(&mut self) {
        self.drain_reaped();

        let mut i = 0;
        while i < self.jobs.len() {
            match wait_pid_job(self.jobs[i].pid, true) {
                Some((_, state)) if state.is_terminated() => {
                    let job = self.jobs.remove(i);
                    debug!("reaped job [{}] pid:{} '{}'", job.job_id, job.pid, job.cmd);
                }
                Some((_, JobState::Stopped(signal))) => {
                    self.jobs[i].state = JobState::Stopped(signal);
                    i += 1;
                }
                _ => i += 1,
            }
        }
    }

    /// Removes jobs whose pids the SIGCHLD handler already reaped.
    fn drain_reaped(&mut self) {
        for pid in take_reaped() {
            if let Some(idx) = self.jobs.iter().position(|job| job.pid == pid) {
                let job = self.jobs.remove(idx);
                debug!(
                    "handler reaped job [{}] pid:{} '{}'",
                    job.job_id, job.pid, job.cmd
                );
            }
        }
    }

    pub fn get_by_id(&self, job_id: usize) -> Option<&Job> {
        self.jobs.iter().find(|job| job.job_id == job_id)
    }

    pub fn get_mut_by_id(&mut self, job_id: usize) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|job| job.job_id == job_id)
    }

    pub fn get_last(&self) -> Option<&Job> {
        self.jobs.last()
    }

    pub fn get_last_stopped(&self) -> Option<&Job> {
        self.jobs.iter().rev().find(|job| job.state.is_stopped())
    }

    pub fn remove_by_id(&mut self, job_id: usize) -> Option<Job> {
        let idx = self.jobs.iter().position(|job| job.job_id == job_id)?;
        Some(self.jobs.remove(idx))
    }

    /// Ascending by id. The ordering is part of the `jobs` builtin contract.
    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// SIGKILL to every tracked job, reporting each `pid: command` pair.
    /// Only used on `quit kill`.
    pub fn kill_all(&mut self, ctx: &Context) {
        for job in &self.jobs {
            ctx.write_stdout(&format!("{}: {}", job.pid, job.cmd)).ok();
            if let Err(err) = send_signal(job.pid, Signal::SIGKILL) {
                warn!("failed to kill pid {}: {}", job.pid, err);
            }
        }
        self.jobs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msh_types::Context;
    use nix::unistd::{getpgrp, getpid};
    use std::fs::File;
    use std::io::Read;
    use std::os::unix::io::FromRawFd;
    use std::process::{Child, Command};

    fn init() {
        let _ = tracing_subscriber::fmt::try_init();
    }

    fn spawn_sleep() -> (Child, Pid) {
        let child = Command::new("sleep").arg("60").spawn().expect("spawn sleep");
        let pid = Pid::from_raw(child.id() as i32);
        (child, pid)
    }

    fn reap(mut child: Child) {
        child.kill().ok();
        child.wait().ok();
    }

    #[test]
    fn job_ids_strictly_increase_and_are_never_reused() {
        init();
        let mut jobs = JobList::new();
        let (c1, p1) = spawn_sleep();
        let (c2, p2) = spawn_sleep();
        let (c3, p3) = spawn_sleep();

        assert_eq!(jobs.add_job(p1, "sleep 60 &".to_string(), false), 1);
        assert_eq!(jobs.add_job(p2, "sleep 60 &".to_string(), false), 2);
        assert_eq!(jobs.add_job(p3, "sleep 60 &".to_string(), false), 3);

        jobs.remove_by_id(3);
        let (c4, p4) = spawn_sleep();
        assert_eq!(jobs.add_job(p4, "sleep 60 &".to_string(), false), 4);

        for child in [c1, c2, c3, c4] {
            reap(child);
        }
    }

    #[test]
    fn reap_pass_removes_exited_jobs() {
        init();
        let mut jobs = JobList::new();
        let mut child = Command::new("true").spawn().expect("spawn true");
        let pid = Pid::from_raw(child.id() as i32);
        jobs.add_job(pid, "true &".to_string(), false);

        // Let the child exit and be reaped, then run the pass.
        child.wait().expect("wait true");
        jobs.remove_finished();

        assert!(jobs.get_by_id(1).is_none());
        assert!(jobs.is_empty());
    }

    #[test]
    fn listing_is_ordered_by_id_ascending() {
        init();
        let (c1, p1) = spawn_sleep();
        let (c2, p2) = spawn_sleep();
        let mut jobs = JobList::new();
        jobs.add_job(p1, "sleep 60 &".to_string(), false);
        jobs.add_job(p2, "sleep 60 &".to_string(), false);

        let ids: Vec<usize> = jobs.jobs().map(|job| job.job_id).collect();
        assert_eq!(ids, vec![1, 2]);

        reap(c1);
        reap(c2);
    }

    #[test]
    fn last_stopped_picks_highest_stopped_id() {
        init();
        let (c1, p1) = spawn_sleep();
        let (c2, p2) = spawn_sleep();
        let (c3, p3) = spawn_sleep();
        let mut jobs = JobList::new();
        jobs.add_job(p1, "sleep 60 &".to_string(), true);
        jobs.add_job(p2, "sleep 60 &".to_string(), false);
        jobs.add_job(p3, "sleep 60 &".to_string(), true);

        assert_eq!(jobs.get_last_stopped().map(|job| job.job_id), Some(3));
        assert_eq!(jobs.get_last().map(|job| job.job_id), Some(3));

        reap(c1);
        reap(c2);
        reap(c3);
    }

    #[test]
    fn kill_all_reports_pairs_and_empties_table() {
        init();
        let (c1, p1) = spawn_sleep();
        let (c2, p2) = spawn_sleep();
        let mut jobs = JobList::new();
        jobs.add_job(p1, "sleep 60 &".to_string(), false);
        jobs.add_job(p2, "sleep 60 &".to_string(), false);

        let (read_fd, write_fd) = nix::unistd::pipe().expect("pipe");
        let mut ctx = Context::new(getpid(), getpgrp(), false);
        ctx.outfile = write_fd;
        ctx.errfile = write_fd;

        jobs.kill_all(&ctx);
        nix::unistd::close(write_fd).ok();

        let mut output = String::new();
        let mut reader = unsafe { File::from_raw_fd(read_fd) };
        reader.read_to_string(&mut output).expect("read pipe");

        assert!(jobs.is_empty());
        assert!(output.contains(&format!("{}: sleep 60 &", p1)));
        assert!(output.contains(&format!("{}: sleep 60 &", p2)));

        reap(c1);
        reap(c2);
    }
}
