pub mod foreground;
pub mod fork;
pub mod job;
pub mod process;
pub mod signal;
pub mod state;
pub mod wait;

pub use foreground::ForegroundSlot;
pub use fork::{SpawnOutcome, spawn};
pub use job::{Job, JobList};
pub use process::Process;
pub use state::JobState;
pub use wait::wait_pid_job;
