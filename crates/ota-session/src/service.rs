//! Channel front end for an [`UpdateSession`].
//!
//! Transports usually deliver callbacks on their own task. An
//! [`UpdateService`] moves the session onto a tokio task and hands back a
//! cloneable [`UpdateHandle`]; notifications are processed strictly in send
//! order.
//!
//! ```text
//!   transport task ──notify()──▶ mpsc ──▶ session task ──▶ storage
//!                  ◀──reply─── oneshot ◀──┘
//! ```

use bytes::Bytes;
use ota_flash::UpdateStorage;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::dispatch::Notification;
use crate::error::{ServiceError, UpdateError};
use crate::observer::UpdateObserver;
use crate::session::UpdateSession;

type Reply = oneshot::Sender<Result<(), UpdateError>>;

struct Command {
    notification: Notification<Bytes>,
    reply: Option<Reply>,
}

/// Sending side of a running update service.
#[derive(Clone, Debug)]
pub struct UpdateHandle {
    tx: mpsc::Sender<Command>,
}

impl UpdateHandle {
    /// Queue a notification without waiting for it to be processed.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Closed`] if the session task has stopped.
    pub async fn notify(&self, notification: Notification<Bytes>) -> Result<(), ServiceError> {
        self.tx
            .send(Command {
                notification,
                reply: None,
            })
            .await
            .map_err(|_| ServiceError::Closed)
    }

    /// Queue a notification and wait for the session's verdict.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Closed`] if the session task has stopped
    /// before replying. The inner result is the session's own.
    pub async fn request(
        &self,
        notification: Notification<Bytes>,
    ) -> Result<Result<(), UpdateError>, ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command {
                notification,
                reply: Some(reply),
            })
            .await
            .map_err(|_| ServiceError::Closed)?;
        rx.await.map_err(|_| ServiceError::Closed)
    }
}

/// A session that owns its notification queue.
///
/// The service is the only owner of the session, so notifications are
/// handled one at a time in the order they were queued. It stops once every
/// [`UpdateHandle`] is dropped and the queue is drained, handing the
/// session back.
pub struct UpdateService<S: UpdateStorage, O, C> {
    session: UpdateSession<S, O, C>,
    rx: mpsc::Receiver<Command>,
}

impl<S, O, C> UpdateService<S, O, C>
where
    S: UpdateStorage,
    O: UpdateObserver,
    C: Clock,
{
    /// Wrap `session` with a queue of `capacity` notifications.
    pub fn new(session: UpdateSession<S, O, C>, capacity: usize) -> (Self, UpdateHandle) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { session, rx }, UpdateHandle { tx })
    }

    /// Process notifications until every handle is gone.
    pub async fn run(mut self) -> UpdateSession<S, O, C> {
        while let Some(Command {
            notification,
            reply,
        }) = self.rx.recv().await
        {
            let status = notification.status.name();
            let result = self.session.dispatch(notification);
            match reply {
                Some(reply) => {
                    if reply.send(result).is_err() {
                        debug!(status, "requester went away before the reply");
                    }
                }
                None => {
                    if let Err(e) = result {
                        warn!(status, error = %e, "queued notification failed");
                    }
                }
            }
        }
        debug!("update service stopped");
        self.session
    }
}

impl<S, O, C> UpdateService<S, O, C>
where
    S: UpdateStorage + Send + 'static,
    S::Handle: Send,
    O: UpdateObserver + Send + 'static,
    C: Clock + Send + 'static,
{
    /// Run on a new tokio task; the join handle yields the session.
    pub fn spawn(self) -> JoinHandle<UpdateSession<S, O, C>> {
        tokio::spawn(self.run())
    }
}
