#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use ota_flash::{NorFlashStorage, PartitionLayout, RamFlash, SlotId, UpdateStorage};
use ota_session::{EventLog, Outcome, SessionConfig, SessionState, StartPolicy, UpdateSession};

#[derive(Debug, Arbitrary)]
enum Op {
    Start,
    Receive(Vec<u8>),
    Finish,
    Abort,
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    reject: bool,
    ops: Vec<Op>,
}

// Fuzz target: arbitrary notification sequences against NOR storage.
//
// Invariants checked after every step:
// - the session never reports Finishing between calls
// - the storage never holds a pending slot unless the session is Active
// - the boot target only moves on a reported success
fuzz_target!(|input: FuzzInput| {
    let layout = PartitionLayout::contiguous(4096, 16 * 4096);
    let flash = RamFlash::new(layout.total_size() as usize);
    let storage = NorFlashStorage::open(flash, layout).unwrap();
    let config = SessionConfig {
        start_policy: if input.reject { StartPolicy::Reject } else { StartPolicy::ForceAbort },
        ..SessionConfig::default()
    };
    let mut session = UpdateSession::with_config(
        config,
        storage,
        EventLog::new(),
        ota_session::ManualClock::new(),
    );

    let mut boot = SlotId::A;
    for op in input.ops {
        match op {
            Op::Start => drop(session.on_start()),
            Op::Receive(bytes) => drop(session.on_receive(&bytes)),
            Op::Finish => drop(session.on_finish()),
            Op::Abort => session.on_abort(),
        }

        assert_ne!(session.state(), SessionState::Finishing);
        assert_eq!(
            session.storage().has_pending_update(),
            session.state() == SessionState::Active
        );
        if let Some(Outcome::Success { slot, .. }) = session.observer().last_outcome() {
            boot = slot;
        }
        assert_eq!(session.storage().boot_target(), boot);
    }
});
