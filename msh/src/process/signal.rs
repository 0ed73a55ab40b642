use anyhow::Result;
use nix::sys::signal::{
    SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal, kill, sigaction, sigprocmask,
};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use tracing::debug;

use crate::APP_NAME;

/// Fixed-capacity, allocation-free queue of reaped pids.
///
/// Written only by the SIGCHLD handler, drained only by the main control
/// path, so container operations never run reentrantly. A pid pushed while
/// the queue is full is dropped; the per-pid `WNOHANG` sweep in
/// `JobList::remove_finished` observes that exit as `ECHILD` instead.
pub(crate) struct ReapQueue<const CAP: usize> {
    slots: [AtomicI32; CAP],
    len: AtomicUsize,
}

impl<const CAP: usize> ReapQueue<CAP> {
    const fn new() -> Self {
        const EMPTY: AtomicI32 = AtomicI32::new(0);
        ReapQueue {
            slots: [EMPTY; CAP],
            len: AtomicUsize::new(0),
        }
    }

    /// Handler side. Store-then-bump keeps a concurrent drain from reading a
    /// slot before its pid lands.
    fn push(&self, pid: Pid) {
        let idx = self.len.load(Ordering::SeqCst);
        if idx < CAP {
            self.slots[idx].store(pid.as_raw(), Ordering::SeqCst);
            self.len.store(idx + 1, Ordering::SeqCst);
        }
    }

    /// Main-path side. Zeroed slots are skipped: a handler interrupting the
    /// drain restarts at index zero and its pid is picked up next time.
    fn take(&self) -> Vec<Pid> {
        let n = self.len.swap(0, Ordering::SeqCst).min(CAP);
        (0..n)
            .filter_map(|i| {
                let pid = self.slots[i].swap(0, Ordering::SeqCst);
                (pid > 0).then(|| Pid::from_raw(pid))
            })
            .collect()
    }
}

const REAP_QUEUE_CAP: usize = 64;

static REAP_QUEUE: ReapQueue<REAP_QUEUE_CAP> = ReapQueue::new();

/// Pid the shell is currently blocked on in a foreground wait, or 0.
/// Mirrors the `ForegroundSlot` for the SIGINT handler.
static FOREGROUND_PID: AtomicI32 = AtomicI32::new(0);

extern "C" fn handle_sigchld(_: i32) {
    // Only async-signal-safe work here: waitpid, atomics. Table mutation is
    // deferred to the main path via the reap queue.
    loop {
        match waitpid(None, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(pid, _)) | Ok(WaitStatus::Signaled(pid, _, _)) => {
                REAP_QUEUE.push(pid);
            }
            _ => break,
        }
    }
}

extern "C" fn handle_sigint(_: i32) {
    write_raw(b"\nmsh: got ctrl-C\n");
    let pid = FOREGROUND_PID.swap(0, Ordering::SeqCst);
    if pid > 0 {
        if kill(Pid::from_raw(pid), Signal::SIGKILL).is_ok() {
            write_pid_line(b"msh: process ", pid, b" was killed\n");
        } else {
            write_raw(b"msh: kill failed\n");
        }
    }
}

/// Installs the SIGCHLD and SIGINT handlers. `SA_RESTART` keeps interrupted
/// reads restartable; the foreground wait still observes the killed child
/// because waitpid returns once it actually exits.
pub fn install_handlers() -> Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(handle_sigchld),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    unsafe {
        sigaction(Signal::SIGCHLD, &action)
            .map_err(|e| anyhow::anyhow!("failed to set SIGCHLD handler: {}", e))?;
    }

    let action = SigAction::new(
        SigHandler::Handler(handle_sigint),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    unsafe {
        sigaction(Signal::SIGINT, &action)
            .map_err(|e| anyhow::anyhow!("failed to set SIGINT handler: {}", e))?;
    }

    debug!("{}: signal handlers installed", APP_NAME);
    Ok(())
}

/// Drains every pid the SIGCHLD handler reaped since the last call.
pub fn take_reaped() -> Vec<Pid> {
    REAP_QUEUE.take()
}

pub(crate) fn set_foreground_pid(pid: Pid) {
    FOREGROUND_PID.store(pid.as_raw(), Ordering::SeqCst);
}

pub(crate) fn clear_foreground_pid() {
    FOREGROUND_PID.store(0, Ordering::SeqCst);
}

pub(crate) fn send_signal(pid: Pid, signal: Signal) -> nix::Result<()> {
    debug!("sending {:?} to pid {}", signal, pid);
    kill(pid, signal)
}

/// Blocks SIGCHLD delivery on this thread. Held across fork-and-register (or
/// fork-and-wait) so the handler cannot reap a child before the main path
/// has recorded it; pending SIGCHLDs fire on unblock.
pub(crate) fn block_sigchld() -> nix::Result<()> {
    let mut set = SigSet::empty();
    set.add(Signal::SIGCHLD);
    sigprocmask(SigmaskHow::SIG_BLOCK, Some(&set), None)
}

pub(crate) fn unblock_sigchld() -> nix::Result<()> {
    let mut set = SigSet::empty();
    set.add(Signal::SIGCHLD);
    sigprocmask(SigmaskHow::SIG_UNBLOCK, Some(&set), None)
}

fn write_raw(bytes: &[u8]) {
    unsafe {
        libc::write(
            libc::STDOUT_FILENO,
            bytes.as_ptr() as *const libc::c_void,
            bytes.len(),
        );
    }
}

/// `write(2)`s `<prefix><pid><suffix>` without allocating; decimal rendering
/// happens in a stack buffer so the call stays async-signal-safe.
fn write_pid_line(prefix: &[u8], pid: i32, suffix: &[u8]) {
    let mut buf = [0u8; 12];
    let digits = format_decimal(pid, &mut buf);
    write_raw(prefix);
    write_raw(digits);
    write_raw(suffix);
}

fn format_decimal(mut n: i32, buf: &mut [u8; 12]) -> &[u8] {
    if n <= 0 {
        buf[0] = b'0';
        return &buf[..1];
    }
    let mut end = buf.len();
    while n > 0 {
        end -= 1;
        buf[end] = b'0' + (n % 10) as u8;
        n /= 10;
    }
    let start = end;
    buf.copy_within(start.., 0);
    let len = buf.len() - start;
    &buf[..len]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = tracing_subscriber::fmt::try_init();
    }

    #[test]
    fn reap_queue_round_trip() {
        init();
        let queue = ReapQueue::<8>::new();
        queue.push(Pid::from_raw(100));
        queue.push(Pid::from_raw(200));

        let taken = queue.take();
        assert_eq!(taken, vec![Pid::from_raw(100), Pid::from_raw(200)]);

        // Drained: a second take sees nothing.
        assert!(queue.take().is_empty());
    }

    #[test]
    fn reap_queue_drops_overflow() {
        init();
        let queue = ReapQueue::<2>::new();
        queue.push(Pid::from_raw(1000));
        queue.push(Pid::from_raw(2000));
        queue.push(Pid::from_raw(3000));

        let taken = queue.take();
        assert_eq!(taken, vec![Pid::from_raw(1000), Pid::from_raw(2000)]);
    }

    #[test]
    fn format_decimal_renders_pids() {
        let mut buf = [0u8; 12];
        assert_eq!(format_decimal(1, &mut buf), b"1");
        let mut buf = [0u8; 12];
        assert_eq!(format_decimal(54321, &mut buf), b"54321");
        let mut buf = [0u8; 12];
        assert_eq!(format_decimal(2147483647, &mut buf), b"2147483647");
        let mut buf = [0u8; 12];
        assert_eq!(format_decimal(0, &mut buf), b"0");
    }
}
