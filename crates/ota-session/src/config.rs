use std::time::Duration;

/// Smallest inflate scratch buffer the session accepts.
pub const MIN_SCRATCH_SIZE: usize = 64;

/// Default inflate scratch buffer.
pub const DEFAULT_SCRATCH_SIZE: usize = 256;

/// Default minimum spacing between progress reports.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration for an [`UpdateSession`](crate::UpdateSession).
///
/// ```text
/// ┌───────────────────┬───────────────────────────────────────────────┐
/// │ Field             │ Purpose                                       │
/// ├───────────────────┼───────────────────────────────────────────────┤
/// │ scratch_size      │ inflate output buffer; bounds memory per step │
/// │ progress_interval │ minimum time between progress reports         │
/// │ start_policy      │ what a start does while an update is running  │
/// └───────────────────┴───────────────────────────────────────────────┘
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Inflate output buffer in bytes. Must be at least
    /// [`MIN_SCRATCH_SIZE`]; a smaller value makes every start fail.
    pub scratch_size: usize,

    /// Minimum wall time between two progress reports.
    pub progress_interval: Duration,

    pub start_policy: StartPolicy,
}

impl Default for SessionConfig {
    /// 256-byte scratch buffer, one progress report per 30 seconds, and
    /// force-abort on a second start.
    fn default() -> Self {
        Self {
            scratch_size: DEFAULT_SCRATCH_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            start_policy: StartPolicy::default(),
        }
    }
}

/// What happens when a start notification arrives mid-update.
///
/// Either way there is never more than one open storage handle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StartPolicy {
    /// Abandon the running update (reported as superseded) and begin again.
    /// Transports restart a download by sending a fresh start.
    #[default]
    ForceAbort,

    /// Refuse the new start with `UpdateError::SessionBusy`; the running
    /// update continues.
    Reject,
}
