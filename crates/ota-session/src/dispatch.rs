use ota_flash::UpdateStorage;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::UpdateError;
use crate::observer::UpdateObserver;
use crate::session::UpdateSession;

/// Status codes a transport reports while it drives an update.
///
/// `B` is the payload type for [`Receive`](Self::Receive): a borrowed slice
/// for direct calls, or an owned buffer such as `bytes::Bytes` when events
/// cross a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportStatus<B> {
    Start,
    Receive(B),
    Apply,
    Check,
    Finish,
    Abort,
    Ok,
    Error,
    /// The server accepted the running image as current.
    ImageAccepted,
    Busy,
    ServerNotFound,
    /// Any status this crate does not know.
    Other(u16),
}

impl<B> TransportStatus<B> {
    /// Short lowercase name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            TransportStatus::Start => "start",
            TransportStatus::Receive(_) => "receive",
            TransportStatus::Apply => "apply",
            TransportStatus::Check => "check",
            TransportStatus::Finish => "finish",
            TransportStatus::Abort => "abort",
            TransportStatus::Ok => "ok",
            TransportStatus::Error => "error",
            TransportStatus::ImageAccepted => "image-accepted",
            TransportStatus::Busy => "busy",
            TransportStatus::ServerNotFound => "server-not-found",
            TransportStatus::Other(_) => "other",
        }
    }
}

/// One callback from the transport: whether its own operation succeeded,
/// and what it is reporting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification<B> {
    pub success: bool,
    pub status: TransportStatus<B>,
}

impl<B> Notification<B> {
    #[must_use]
    pub fn ok(status: TransportStatus<B>) -> Self {
        Self {
            success: true,
            status,
        }
    }

    #[must_use]
    pub fn failed(status: TransportStatus<B>) -> Self {
        Self {
            success: false,
            status,
        }
    }
}

impl<B> From<TransportStatus<B>> for Notification<B> {
    fn from(status: TransportStatus<B>) -> Self {
        Self::ok(status)
    }
}

impl<S: UpdateStorage, O: UpdateObserver, C: Clock> UpdateSession<S, O, C> {
    /// Route a transport notification to the matching lifecycle call.
    ///
    /// ```text
    /// ┌─────────────────────────────────────┬─────────────┐
    /// │ Status                              │ Action      │
    /// ├─────────────────────────────────────┼─────────────┤
    /// │ Start                               │ on_start    │
    /// │ Receive                             │ on_receive  │
    /// │ Finish                              │ on_finish   │
    /// │ Abort, Error, Busy, ServerNotFound  │ on_abort    │
    /// │ Apply, Check, Ok, ImageAccepted,    │ log only    │
    /// │ Other                               │             │
    /// └─────────────────────────────────────┴─────────────┘
    /// ```
    ///
    /// A notification whose `success` flag is false is logged and ignored.
    /// Every notification other than `Receive` first logs how many receive
    /// notifications went by without a progress report.
    ///
    /// # Errors
    ///
    /// Whatever the lifecycle call returns.
    pub fn dispatch<B: AsRef<[u8]>>(
        &mut self,
        notification: Notification<B>,
    ) -> Result<(), UpdateError> {
        let Notification { success, status } = notification;
        let name = status.name();
        if !success {
            warn!(status = name, "transport reported failure, ignored");
            return Ok(());
        }

        match status {
            TransportStatus::Start => self.on_start(),
            TransportStatus::Receive(bytes) => self.on_receive(bytes.as_ref()).map(drop),
            TransportStatus::Finish => self.on_finish().map(drop),
            TransportStatus::Abort
            | TransportStatus::Error
            | TransportStatus::Busy
            | TransportStatus::ServerNotFound => {
                info!(status = name, "transport ended the update");
                self.on_abort();
                Ok(())
            }
            TransportStatus::Apply
            | TransportStatus::Check
            | TransportStatus::Ok
            | TransportStatus::ImageAccepted => {
                self.flush_progress();
                debug!(status = name, "transport status");
                Ok(())
            }
            TransportStatus::Other(code) => {
                self.flush_progress();
                debug!(code, "unknown transport status");
                Ok(())
            }
        }
    }
}
