use nix::sys::signal::Signal;

/// Lifecycle of a tracked child process.
///
/// `Terminated` is terminal: the next reap pass drops the job from the table
/// and it is never queried again.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum JobState {
    Running,
    Stopped(Signal),
    Terminated(u8, Option<Signal>),
}

impl JobState {
    pub fn is_stopped(&self) -> bool {
        matches!(self, JobState::Stopped(_))
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, JobState::Terminated(_, _))
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            JobState::Running => formatter.write_str("running"),
            JobState::Stopped(_) => formatter.write_str("stopped"),
            JobState::Terminated(_, signal) => {
                if let Some(signal) = signal {
                    if signal == &Signal::SIGKILL {
                        formatter.write_str("killed")
                    } else if signal == &Signal::SIGTERM {
                        formatter.write_str("terminated")
                    } else {
                        formatter.write_str("done")
                    }
                } else {
                    formatter.write_str("done")
                }
            }
        }
    }
}
