use thiserror::Error;

/// Process creation failed. Fatal to the command that requested it, never to
/// the shell itself.
#[derive(Error, Debug)]
pub enum SpawnError {
    #[error("fork failed: {0}")]
    ForkFailed(#[source] nix::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FgError {
    #[error("jobs list is empty")]
    EmptyJobList,
    #[error("job-id {0} does not exist")]
    NoSuchJob(usize),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BgError {
    #[error("job-id {0} does not exist")]
    NoSuchJob(usize),
    #[error("job-id {0} is not stopped")]
    NotStopped(usize),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum KillError {
    #[error("invalid arguments")]
    InvalidArguments,
    #[error("job-id {0} does not exist")]
    NoSuchJob(usize),
    #[error("failed to send signal to pid {pid}: {source}")]
    Delivery { pid: i32, source: nix::Error },
}
