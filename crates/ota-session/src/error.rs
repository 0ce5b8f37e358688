use ota_flash::StorageError;

/// Errors from the streaming inflater.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InflateError {
    /// The configured scratch buffer is below the supported minimum.
    #[error("scratch buffer of {size} bytes is below the {min}-byte minimum")]
    ScratchTooSmall { size: usize, min: usize },

    /// The zlib stream is corrupt, asks for a preset dictionary, or the
    /// decoder ran out of memory.
    #[error("malformed compressed stream: {0}")]
    Malformed(String),
}

/// Why an update could not start.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InitError {
    #[error("decompressor unavailable: {0}")]
    Decompressor(InflateError),

    #[error("storage unavailable: {0}")]
    Storage(StorageError),
}

/// Errors surfaced by [`UpdateSession`](crate::UpdateSession).
///
/// Every fatal variant has already been cleaned up by the time the caller
/// sees it: storage handle aborted (or never opened), decompressor dropped,
/// boot target untouched.
///
/// ```text
///   UpdateError
///   ├── Init                   ← start could not acquire inflater or slot
///   ├── UnsupportedSubElement  ← header tag is not the image tag
///   ├── Decode                 ← zlib stream is corrupt
///   ├── StorageWrite           ← flash rejected an append
///   ├── StorageCommit          ← flash rejected the final flush
///   ├── BootTarget             ← boot record could not be switched
///   ├── PrematureFinish        ← finish before the declared length arrived
///   ├── TruncatedHeader        ← finish before the header was complete
///   ├── NoActiveSession        ← (non-fatal) receive/finish while idle
///   └── SessionBusy            ← (non-fatal) start rejected by policy
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpdateError {
    #[error("update could not start: {0}")]
    Init(#[from] InitError),

    #[error("sub-element type {tag:#06X} not supported")]
    UnsupportedSubElement { tag: u16 },

    #[error(transparent)]
    Decode(#[from] InflateError),

    #[error("flash write failed: {0}")]
    StorageWrite(StorageError),

    #[error("flash commit failed: {0}")]
    StorageCommit(StorageError),

    #[error("boot target update failed: {0}")]
    BootTarget(StorageError),

    #[error("finish after {written} of {expected} bytes")]
    PrematureFinish { expected: u32, written: u64 },

    #[error("finish with only {received} of 6 header bytes")]
    TruncatedHeader { received: usize },

    #[error("no update in progress")]
    NoActiveSession,

    #[error("an update is already in progress")]
    SessionBusy,
}

impl UpdateError {
    /// The reason reported to the observer, or `None` for the non-fatal
    /// variants that leave the session as it was.
    #[must_use]
    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            UpdateError::Init(_) => Some(FailureReason::Init),
            UpdateError::UnsupportedSubElement { .. } => Some(FailureReason::UnsupportedSubElement),
            UpdateError::Decode(_) => Some(FailureReason::Decode),
            UpdateError::StorageWrite(_) => Some(FailureReason::StorageWrite),
            UpdateError::StorageCommit(_) => Some(FailureReason::StorageCommit),
            UpdateError::BootTarget(_) => Some(FailureReason::BootTarget),
            UpdateError::PrematureFinish { .. } | UpdateError::TruncatedHeader { .. } => {
                Some(FailureReason::PrematureFinish)
            }
            UpdateError::NoActiveSession | UpdateError::SessionBusy => None,
        }
    }

    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.reason().is_some()
    }
}

/// Compact failure cause handed to the observer with `Outcome::Failure`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureReason {
    Init,
    UnsupportedSubElement,
    Decode,
    StorageWrite,
    StorageCommit,
    BootTarget,
    PrematureFinish,
    /// The transport cancelled the update.
    Aborted,
    /// A new start replaced the running update.
    Superseded,
}

/// Errors from the channel-driven [`UpdateHandle`](crate::UpdateHandle).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("update service has stopped")]
    Closed,
}
