#![warn(clippy::pedantic)]

pub mod clock;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod inflate;
pub mod observer;
pub mod progress;
pub mod service;
pub mod session;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{SessionConfig, StartPolicy};
pub use dispatch::{Notification, TransportStatus};
pub use error::{FailureReason, InflateError, InitError, ServiceError, UpdateError};
pub use inflate::Inflater;
pub use observer::{EventLog, Outcome, ProgressReport, UpdateEvent, UpdateObserver};
pub use service::{UpdateHandle, UpdateService};
pub use session::{SessionState, UpdateSession};
