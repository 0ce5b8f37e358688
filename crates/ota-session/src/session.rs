use ota_flash::{SlotId, UpdateStorage};
use ota_wire::{HeaderCursor, WireError};
use tracing::{debug, error, info, trace, warn};

use crate::clock::{Clock, MonotonicClock};
use crate::config::{SessionConfig, StartPolicy};
use crate::error::{FailureReason, InflateError, InitError, UpdateError};
use crate::inflate::Inflater;
use crate::observer::{Outcome, ProgressReport, UpdateObserver};
use crate::progress::ProgressLimiter;

/// Where the session is in the update lifecycle.
///
/// ```text
///              on_start                    on_finish
///   ┌──────┐ ───────────▶ ┌────────┐ ───────────────▶ ┌───────────┐
///   │ Idle │              │ Active │                  │ Finishing │
///   └──────┘ ◀─────────── └────────┘                  └───────────┘
///      ▲       on_abort        │ fatal error          │       │
///      │                       ▼                      │       │
///      │   on_start/abort ┌────────┐   fatal error    │       │
///      └───────────────── │ Failed │ ◀────────────────┘       │
///      ▲                  └────────┘                          │
///      └──────────────────────── success ─────────────────────┘
/// ```
///
/// `Finishing` only exists inside [`UpdateSession::on_finish`]; callers
/// never observe it between calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active,
    Finishing,
    Failed,
}

/// Resources owned by a running update. Dropping this releases the
/// decompressor; the storage handle must go back through commit or abort.
struct ActiveUpdate<H> {
    handle: H,
    inflater: Inflater,
    header: HeaderCursor,
    /// Decompressed bytes still expected; `None` until the header is parsed.
    remaining: Option<u32>,
    /// Compressed bytes received, header included.
    received: u64,
    written: u64,
}

/// Turns a stream of transport notifications into a committed boot image.
///
/// Owns the storage backend and observer for its whole life. Between calls
/// it holds either nothing or exactly one storage handle plus one
/// decompressor, never more.
///
/// # Example
///
/// ```
/// use ota_flash::{NorFlashStorage, PartitionLayout, RamFlash, SlotId};
/// use ota_packer::ImagePacker;
/// use ota_session::{EventLog, UpdateSession};
///
/// let layout = PartitionLayout::contiguous(4096, 64 * 1024);
/// let flash = RamFlash::new(layout.total_size() as usize);
/// let storage = NorFlashStorage::open(flash, layout).unwrap();
/// let mut session = UpdateSession::new(storage, EventLog::new());
///
/// let image = ImagePacker::new(b"firmware").pack().unwrap();
/// session.on_start().unwrap();
/// for chunk in image.as_bytes().chunks(16) {
///     session.on_receive(chunk).unwrap();
/// }
/// assert_eq!(session.on_finish().unwrap(), SlotId::B);
/// assert!(session.observer().restart_requested());
/// ```
pub struct UpdateSession<S: UpdateStorage, O, C = MonotonicClock> {
    config: SessionConfig,
    storage: S,
    observer: O,
    clock: C,
    state: SessionState,
    active: Option<ActiveUpdate<S::Handle>>,
    progress: ProgressLimiter,
    last_failure: Option<FailureReason>,
}

impl<S: UpdateStorage, O: UpdateObserver> UpdateSession<S, O, MonotonicClock> {
    /// Session with [`SessionConfig::default`] and the wall clock.
    pub fn new(storage: S, observer: O) -> Self {
        Self::with_config(SessionConfig::default(), storage, observer, MonotonicClock::default())
    }
}

impl<S: UpdateStorage, O: UpdateObserver, C: Clock> UpdateSession<S, O, C> {
    pub fn with_config(config: SessionConfig, storage: S, observer: O, clock: C) -> Self {
        let progress = ProgressLimiter::new(config.progress_interval);
        Self {
            config,
            storage,
            observer,
            clock,
            state: SessionState::Idle,
            active: None,
            progress,
            last_failure: None,
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Begin a new update.
    ///
    /// If an update is already running, [`StartPolicy::ForceAbort`] aborts
    /// it (reporting [`FailureReason::Superseded`]) before starting over,
    /// while [`StartPolicy::Reject`] leaves it running.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::SessionBusy`] under `Reject` while an update runs.
    /// - [`UpdateError::Init`] if the decompressor or storage slot cannot
    ///   be acquired. The session stays `Idle` and the failure is reported.
    pub fn on_start(&mut self) -> Result<(), UpdateError> {
        self.flush_progress();
        if let Some(active) = self.active.take() {
            if self.config.start_policy == StartPolicy::Reject {
                warn!("start while an update is running, rejected");
                self.active = Some(active);
                return Err(UpdateError::SessionBusy);
            }
            warn!(
                written = active.written,
                "start while an update is running, abandoning it"
            );
            self.storage.abort(active.handle);
            self.state = SessionState::Idle;
            self.report_failure(FailureReason::Superseded);
        }

        info!("update started");
        let inflater = match Inflater::new(self.config.scratch_size) {
            Ok(inflater) => inflater,
            Err(e) => return Err(self.init_failed(InitError::Decompressor(e))),
        };
        let handle = match self.storage.begin() {
            Ok(handle) => handle,
            Err(e) => return Err(self.init_failed(InitError::Storage(e))),
        };

        self.active = Some(ActiveUpdate {
            handle,
            inflater,
            header: HeaderCursor::new(),
            remaining: None,
            received: 0,
            written: 0,
        });
        self.state = SessionState::Active;
        self.last_failure = None;
        Ok(())
    }

    /// Feed one delivery of image bytes.
    ///
    /// The first six bytes of the stream (possibly spread over several
    /// deliveries) are the sub-element header; the rest is zlib data.
    /// Decompressed bytes are appended to storage up to the declared length
    /// and anything past it is dropped.
    ///
    /// Returns the number of decompressed bytes appended by this call.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::NoActiveSession`] unless the session is `Active`.
    ///   Nothing changes.
    /// - [`UpdateError::UnsupportedSubElement`], [`UpdateError::Decode`] or
    ///   [`UpdateError::StorageWrite`] end the update: the handle is aborted,
    ///   the failure is reported, and the session moves to `Failed`.
    pub fn on_receive(&mut self, bytes: &[u8]) -> Result<usize, UpdateError> {
        let Some(active) = self.active.as_mut() else {
            trace!(state = ?self.state, len = bytes.len(), "receive without an active update");
            return Err(UpdateError::NoActiveSession);
        };
        active.received += bytes.len() as u64;

        let body = match active.header.consume(bytes) {
            Ok(consumed) => {
                if active.remaining.is_none() {
                    if let Some(header) = consumed.header {
                        debug!(length = header.length, "sub-element header parsed");
                        active.remaining = Some(header.length);
                    }
                }
                consumed.rest
            }
            Err(WireError::UnsupportedSubElement { tag }) => {
                return Err(self.fail(UpdateError::UnsupportedSubElement { tag }));
            }
            Err(other) => {
                return Err(self.fail(InflateError::Malformed(other.to_string()).into()));
            }
        };

        if active.remaining.is_none() {
            return Ok(0);
        }
        let appended = match pump(&mut self.storage, active, body, false) {
            Ok(appended) => appended,
            Err(e) => return Err(self.fail(e)),
        };

        if let Some(tick) = self.progress.record(self.clock.now(), bytes.len()) {
            let report = ProgressReport {
                received: active.received,
                written: active.written,
                remaining: active.remaining.unwrap_or(0),
                since_last: tick.since_last,
                suppressed: tick.suppressed,
            };
            debug!(
                received = report.received,
                written = report.written,
                remaining = report.remaining,
                suppressed = report.suppressed,
                "update progress"
            );
            self.observer.on_progress(&report);
        }
        Ok(appended)
    }

    /// Complete the update: flush the decompressor, check the length,
    /// commit the slot and make it the boot target.
    ///
    /// On success the observer gets [`Outcome::Success`] followed by
    /// [`request_restart`](UpdateObserver::request_restart), and the session
    /// returns to `Idle`.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::NoActiveSession`] unless the session is `Active`.
    /// - [`UpdateError::PrematureFinish`] or [`UpdateError::TruncatedHeader`]
    ///   if fewer bytes arrived than the header declared.
    /// - [`UpdateError::Decode`], [`UpdateError::StorageWrite`],
    ///   [`UpdateError::StorageCommit`] or [`UpdateError::BootTarget`] from
    ///   the final steps.
    ///
    /// All but the first leave the session `Failed` with the boot target
    /// unchanged.
    pub fn on_finish(&mut self) -> Result<SlotId, UpdateError> {
        self.flush_progress();
        let Some(mut active) = self.active.take() else {
            debug!(state = ?self.state, "finish without an active update");
            return Err(UpdateError::NoActiveSession);
        };
        self.state = SessionState::Finishing;
        debug!(written = active.written, "update finishing");

        if let Err(e) = pump(&mut self.storage, &mut active, &[], true) {
            return Err(self.abandon(active, e));
        }
        if !active.inflater.is_finished() {
            debug!("compressed stream has no end marker");
        }

        let short = match (active.header.header(), active.remaining) {
            (None, _) => Some(UpdateError::TruncatedHeader {
                received: active.header.fill(),
            }),
            (Some(header), Some(remaining)) if remaining > 0 => Some(UpdateError::PrematureFinish {
                expected: header.length,
                written: active.written,
            }),
            _ => None,
        };
        if let Some(e) = short {
            return Err(self.abandon(active, e));
        }

        let ActiveUpdate { handle, written, .. } = active;
        let slot = match self.storage.commit(handle) {
            Ok(slot) => slot,
            Err(e) => return Err(self.settle(UpdateError::StorageCommit(e))),
        };
        if let Err(e) = self.storage.set_boot_target(slot) {
            return Err(self.settle(UpdateError::BootTarget(e)));
        }

        info!(%slot, bytes = written, "update applied, restart required");
        self.state = SessionState::Idle;
        self.observer.on_outcome(&Outcome::Success {
            slot,
            bytes_written: written,
        });
        self.observer.request_restart();
        Ok(slot)
    }

    /// Cancel the running update, if any. Always leaves the session `Idle`.
    ///
    /// Aborting an active update reports [`FailureReason::Aborted`]; aborting
    /// from `Idle` or `Failed` reports nothing.
    pub fn on_abort(&mut self) {
        self.flush_progress();
        if let Some(active) = self.active.take() {
            info!(written = active.written, "update aborted");
            self.storage.abort(active.handle);
            self.state = SessionState::Idle;
            self.report_failure(FailureReason::Aborted);
        } else {
            debug!(state = ?self.state, "abort without an active update");
            self.state = SessionState::Idle;
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Reason for the most recent failure, cleared by the next start.
    #[must_use]
    pub fn last_failure(&self) -> Option<FailureReason> {
        self.last_failure
    }

    /// Decompressed bytes still expected, once the header is known.
    #[must_use]
    pub fn remaining(&self) -> Option<u32> {
        self.active.as_ref().and_then(|active| active.remaining)
    }

    /// Decompressed bytes written by the running update.
    #[must_use]
    pub fn bytes_written(&self) -> Option<u64> {
        self.active.as_ref().map(|active| active.written)
    }

    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    #[must_use]
    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// Tear the session down, aborting any running update first.
    pub fn into_parts(mut self) -> (S, O) {
        if let Some(active) = self.active.take() {
            self.storage.abort(active.handle);
        }
        (self.storage, self.observer)
    }

    // ── Internals ───────────────────────────────────────────────────────

    /// Log and clear the count of receive notifications that produced no
    /// progress report.
    pub(crate) fn flush_progress(&mut self) {
        let suppressed = self.progress.flush();
        if suppressed > 0 {
            debug!(suppressed, "receive notifications without progress report");
        }
    }

    fn init_failed(&mut self, e: InitError) -> UpdateError {
        error!(error = %e, "update could not start");
        self.state = SessionState::Idle;
        self.report_failure(FailureReason::Init);
        UpdateError::Init(e)
    }

    /// Fail the running update, releasing its handle.
    fn fail(&mut self, e: UpdateError) -> UpdateError {
        match self.active.take() {
            Some(active) => self.abandon(active, e),
            None => self.settle(e),
        }
    }

    fn abandon(&mut self, active: ActiveUpdate<S::Handle>, e: UpdateError) -> UpdateError {
        self.storage.abort(active.handle);
        self.settle(e)
    }

    /// Enter `Failed` and report. Resources must already be released.
    fn settle(&mut self, e: UpdateError) -> UpdateError {
        error!(error = %e, "update failed");
        self.state = SessionState::Failed;
        self.progress.flush();
        if let Some(reason) = e.reason() {
            self.report_failure(reason);
        }
        e
    }

    fn report_failure(&mut self, reason: FailureReason) {
        self.last_failure = Some(reason);
        self.observer.on_outcome(&Outcome::Failure(reason));
    }
}

/// Push `input` through the decompressor into storage, clipping output at
/// the declared length. With `finish`, drains the decompressor instead.
#[allow(clippy::cast_possible_truncation)]
fn pump<S: UpdateStorage>(
    storage: &mut S,
    active: &mut ActiveUpdate<S::Handle>,
    input: &[u8],
    finish: bool,
) -> Result<usize, UpdateError> {
    let ActiveUpdate {
        handle,
        inflater,
        remaining,
        written,
        ..
    } = active;

    if *remaining == Some(0) {
        if !input.is_empty() {
            trace!(bytes = input.len(), "declared length reached, dropping input");
        }
        return Ok(0);
    }

    let mut feed = if finish {
        inflater.finish()
    } else {
        inflater.feed(input)
    };
    let mut appended = 0;
    while let Some(chunk) = feed.next() {
        let chunk = chunk?;
        let take = match *remaining {
            Some(left) => chunk.len().min(left as usize),
            None => chunk.len(),
        };
        if take < chunk.len() {
            trace!(dropped = chunk.len() - take, "output beyond declared length");
        }
        if take > 0 {
            storage
                .append(handle, &chunk[..take])
                .map_err(UpdateError::StorageWrite)?;
        }
        if let Some(left) = remaining.as_mut() {
            *left -= take as u32;
        }
        *written += take as u64;
        appended += take;
        if *remaining == Some(0) {
            break;
        }
    }
    Ok(appended)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ota_flash::{NorFlashStorage, PartitionLayout, RamFlash};
    use ota_packer::ImagePacker;
    use ota_packer::compression::compress;
    use ota_wire::SubElementHeader;

    use super::*;
    use crate::clock::ManualClock;
    use crate::observer::EventLog;

    const SLOT_SIZE: u32 = 64 * 1024;

    type TestSession = UpdateSession<NorFlashStorage<RamFlash>, EventLog, ManualClock>;

    fn session_with(config: SessionConfig) -> (TestSession, ManualClock) {
        let layout = PartitionLayout::contiguous(4096, SLOT_SIZE);
        let flash = RamFlash::new(layout.total_size() as usize);
        let storage = NorFlashStorage::open(flash, layout).unwrap();
        let clock = ManualClock::new();
        let session = UpdateSession::with_config(config, storage, EventLog::new(), clock.clone());
        (session, clock)
    }

    fn session() -> TestSession {
        session_with(SessionConfig::default()).0
    }

    fn firmware(len: usize) -> Vec<u8> {
        let mut x = 0x9E37_79B9u32;
        (0..len)
            .map(|_| {
                x ^= x << 13;
                x ^= x >> 17;
                x ^= x << 5;
                x as u8
            })
            .collect()
    }

    fn written_image(session: &mut TestSession, slot: SlotId, len: usize) -> Vec<u8> {
        let storage = &mut session.storage;
        storage.read_image(slot, len as u32).unwrap()
    }

    #[test]
    fn happy_path_commits_and_switches_boot_target() {
        let mut session = session();
        let data = firmware(20_000);
        let image = ImagePacker::new(&data).pack().unwrap();

        session.on_start().unwrap();
        assert_eq!(session.state(), SessionState::Active);
        for chunk in image.as_bytes().chunks(100) {
            session.on_receive(chunk).unwrap();
        }
        assert_eq!(session.remaining(), Some(0));
        let slot = session.on_finish().unwrap();

        assert_eq!(slot, SlotId::B);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.storage().boot_target(), SlotId::B);
        assert_eq!(written_image(&mut session, slot, data.len()), data);
        assert_eq!(
            session.observer().last_outcome(),
            Some(Outcome::Success {
                slot: SlotId::B,
                bytes_written: 20_000
            })
        );
        assert!(session.observer().restart_requested());
    }

    #[test]
    fn receive_while_idle_changes_nothing() {
        let mut session = session();
        assert_eq!(session.on_receive(&[1, 2, 3]), Err(UpdateError::NoActiveSession));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.observer().events().is_empty());
    }

    #[test]
    fn finish_without_start_is_rejected() {
        let mut session = session();
        assert_eq!(session.on_finish(), Err(UpdateError::NoActiveSession));
        assert!(session.observer().events().is_empty());
    }

    #[test]
    fn unsupported_tag_fails_and_releases_slot() {
        let mut session = session();
        session.on_start().unwrap();
        let err = session.on_receive(&[0x01, 0x00, 0x10, 0x00, 0x00, 0x00]).unwrap_err();

        assert_eq!(err, UpdateError::UnsupportedSubElement { tag: 0x0001 });
        assert_eq!(session.state(), SessionState::Failed);
        assert!(!session.storage().has_pending_update());
        assert_eq!(session.storage().boot_target(), SlotId::A);
        assert_eq!(
            session.observer().last_outcome(),
            Some(Outcome::Failure(FailureReason::UnsupportedSubElement))
        );
        assert_eq!(session.on_receive(&[0; 4]), Err(UpdateError::NoActiveSession));
    }

    #[test]
    fn corrupt_stream_fails_with_decode() {
        let mut session = session();
        session.on_start().unwrap();
        session.on_receive(&[0x00, 0x00, 0x00, 0x01, 0x00, 0x00]).unwrap();
        let err = session.on_receive(&[0x12, 0x34, 0x56, 0x78]).unwrap_err();

        assert!(matches!(err, UpdateError::Decode(_)));
        assert_eq!(session.last_failure(), Some(FailureReason::Decode));
        assert!(!session.storage().has_pending_update());
    }

    #[test]
    fn finish_before_length_is_premature() {
        let mut session = session();
        let data = firmware(8_000);
        let image = ImagePacker::new(&data).pack().unwrap();
        let bytes = image.as_bytes();

        session.on_start().unwrap();
        session.on_receive(&bytes[..bytes.len() / 2]).unwrap();
        let err = session.on_finish().unwrap_err();

        match err {
            UpdateError::PrematureFinish { expected, written } => {
                assert_eq!(expected, 8_000);
                assert!(written < 8_000);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(session.storage().boot_target(), SlotId::A);
        assert!(!session.observer().restart_requested());
    }

    #[test]
    fn finish_inside_header_is_truncated() {
        let mut session = session();
        session.on_start().unwrap();
        session.on_receive(&[0x00, 0x00, 0x10]).unwrap();
        assert_eq!(
            session.on_finish(),
            Err(UpdateError::TruncatedHeader { received: 3 })
        );
        assert_eq!(
            session.last_failure(),
            Some(FailureReason::PrematureFinish)
        );
    }

    #[test]
    fn abort_releases_and_reports_once() {
        let mut session = session();
        session.on_start().unwrap();
        session.on_receive(&[0x00, 0x00]).unwrap();
        session.on_abort();
        session.on_abort();

        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.storage().has_pending_update());
        assert_eq!(session.observer().outcomes().count(), 1);
        assert_eq!(session.last_failure(), Some(FailureReason::Aborted));
    }

    #[test]
    fn abort_from_failed_returns_to_idle() {
        let mut session = session();
        session.on_start().unwrap();
        session.on_receive(&[0x07, 0x00, 0, 0, 0, 0]).unwrap_err();
        assert_eq!(session.state(), SessionState::Failed);

        session.on_abort();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.observer().outcomes().count(), 1);
    }

    #[test]
    fn second_start_supersedes_by_default() {
        let mut session = session();
        let data = firmware(3_000);
        let image = ImagePacker::new(&data).pack().unwrap();

        session.on_start().unwrap();
        session.on_receive(&image.as_bytes()[..40]).unwrap();
        session.on_start().unwrap();
        assert_eq!(session.bytes_written(), Some(0));
        assert_eq!(
            session.observer().last_outcome(),
            Some(Outcome::Failure(FailureReason::Superseded))
        );

        session.on_receive(image.as_bytes()).unwrap();
        assert_eq!(session.on_finish(), Ok(SlotId::B));
        assert_eq!(written_image(&mut session, SlotId::B, data.len()), data);
    }

    #[test]
    fn second_start_rejected_under_reject_policy() {
        let config = SessionConfig {
            start_policy: StartPolicy::Reject,
            ..SessionConfig::default()
        };
        let (mut session, _) = session_with(config);
        session.on_start().unwrap();
        session.on_receive(&[0x00, 0x00, 0x04]).unwrap();

        assert_eq!(session.on_start(), Err(UpdateError::SessionBusy));
        assert_eq!(session.state(), SessionState::Active);
        assert!(session.observer().events().is_empty());
        // header progress survives the rejected start
        session.on_receive(&[0x00, 0x00, 0x00]).unwrap();
        assert_eq!(session.remaining(), Some(4));
    }

    #[test]
    fn tiny_scratch_fails_init_and_stays_idle() {
        let config = SessionConfig {
            scratch_size: 8,
            ..SessionConfig::default()
        };
        let (mut session, _) = session_with(config);
        let err = session.on_start().unwrap_err();

        assert!(matches!(err, UpdateError::Init(InitError::Decompressor(_))));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.storage().has_pending_update());
        assert_eq!(session.last_failure(), Some(FailureReason::Init));
    }

    #[test]
    fn excess_output_is_clipped_to_declared_length() {
        let mut session = session();
        let data = firmware(5_000);
        let mut image = ImagePacker::new(&data).pack().unwrap().into_bytes();
        // declare 1000 bytes, deliver 5000
        image[2..6].copy_from_slice(&1000u32.to_le_bytes());

        session.on_start().unwrap();
        session.on_receive(&image).unwrap();
        assert_eq!(session.remaining(), Some(0));
        assert_eq!(session.on_receive(&[0xAB; 16]), Ok(0));
        session.on_finish().unwrap();

        assert_eq!(written_image(&mut session, SlotId::B, 1000), &data[..1000]);
        assert_eq!(
            session.observer().last_outcome(),
            Some(Outcome::Success {
                slot: SlotId::B,
                bytes_written: 1000
            })
        );
    }

    #[test]
    fn zero_length_image_commits_empty() {
        let mut session = session();
        let mut image = SubElementHeader::upgrade_image(0).to_bytes().to_vec();
        image.extend(compress(&[], 9).unwrap());
        session.on_start().unwrap();
        session.on_receive(&image).unwrap();
        assert_eq!(session.on_finish(), Ok(SlotId::B));
    }

    #[test]
    fn progress_is_rate_limited() {
        let (mut session, clock) = session_with(SessionConfig::default());
        let data = firmware(40_000);
        let image = ImagePacker::new(&data).pack().unwrap();

        session.on_start().unwrap();
        for chunk in image.as_bytes().chunks(64) {
            session.on_receive(chunk).unwrap();
            clock.advance(Duration::from_secs(1));
        }
        let reports: Vec<_> = session.observer().progress().copied().collect();
        let deliveries = image.as_bytes().len().div_ceil(64);

        assert!(reports.len() >= 2);
        assert!(reports.len() <= deliveries.div_ceil(30) + 1);
        assert_eq!(reports[1].suppressed, 29);
    }

    #[test]
    fn flash_fault_is_storage_write() {
        let mut session = session();
        let data = firmware(20_000);
        let image = ImagePacker::new(&data).pack().unwrap();

        session.on_start().unwrap();
        let flash = session.storage.flash_mut();
        flash.fail_writes_after(2);
        let err = session.on_receive(image.as_bytes()).unwrap_err();

        assert!(matches!(err, UpdateError::StorageWrite(_)));
        assert_eq!(session.storage().boot_target(), SlotId::A);
        assert!(!session.storage().has_pending_update());
    }
}
