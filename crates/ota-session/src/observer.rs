use ota_flash::SlotId;

use crate::error::FailureReason;

/// Terminal result of one update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Image committed and selected as the next boot target.
    Success { slot: SlotId, bytes_written: u64 },
    Failure(FailureReason),
}

/// Snapshot handed to [`UpdateObserver::on_progress`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressReport {
    /// Compressed bytes received since start, header included.
    pub received: u64,
    /// Decompressed bytes written to storage.
    pub written: u64,
    /// Decompressed bytes still expected.
    pub remaining: u32,
    /// Compressed bytes received since the previous report.
    pub since_last: u64,
    /// Receive notifications that produced no report since the previous one.
    pub suppressed: u32,
}

/// Receives session events. All callbacks run synchronously inside the
/// session call that triggered them.
pub trait UpdateObserver {
    /// Exactly once per update, whether it succeeded or failed.
    fn on_outcome(&mut self, outcome: &Outcome);

    /// Rate-limited progress while image bytes are flowing.
    fn on_progress(&mut self, _report: &ProgressReport) {}

    /// The new image is bootable; the host should restart when convenient.
    fn request_restart(&mut self);
}

/// Everything an [`EventLog`] has seen, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateEvent {
    Outcome(Outcome),
    Progress(ProgressReport),
    RestartRequested,
}

/// Observer that records every callback.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Vec<UpdateEvent>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> &[UpdateEvent] {
        &self.events
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &Outcome> {
        self.events.iter().filter_map(|event| match event {
            UpdateEvent::Outcome(outcome) => Some(outcome),
            _ => None,
        })
    }

    /// The most recent outcome, if any.
    #[must_use]
    pub fn last_outcome(&self) -> Option<Outcome> {
        self.outcomes().last().copied()
    }

    pub fn progress(&self) -> impl Iterator<Item = &ProgressReport> {
        self.events.iter().filter_map(|event| match event {
            UpdateEvent::Progress(report) => Some(report),
            _ => None,
        })
    }

    #[must_use]
    pub fn restart_requested(&self) -> bool {
        self.events.contains(&UpdateEvent::RestartRequested)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl UpdateObserver for EventLog {
    fn on_outcome(&mut self, outcome: &Outcome) {
        self.events.push(UpdateEvent::Outcome(*outcome));
    }

    fn on_progress(&mut self, report: &ProgressReport) {
        self.events.push(UpdateEvent::Progress(*report));
    }

    fn request_restart(&mut self) {
        self.events.push(UpdateEvent::RestartRequested);
    }
}
