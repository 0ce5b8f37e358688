//! The channel-driven service: several producers, one session, in order.

use bytes::Bytes;
use ota_flash::{SlotId, UpdateStorage};
use ota_session::{
    EventLog, FailureReason, Notification, Outcome, TransportStatus, UpdateService, UpdateSession,
};
use ota_tests::{RecordingStorage, firmware, nor_storage, pack};

fn chunks(image: &[u8], size: usize) -> Vec<Bytes> {
    let image = Bytes::copy_from_slice(image);
    (0..image.len())
        .step_by(size)
        .map(|start| image.slice(start..(start + size).min(image.len())))
        .collect()
}

#[tokio::test]
async fn full_update_through_service() {
    let data = firmware(30_000, 51);
    let session = UpdateSession::new(nor_storage(64 * 1024), EventLog::new());
    let (service, handle) = UpdateService::new(session, 16);
    let task = service.spawn();

    handle.notify(TransportStatus::Start.into()).await.unwrap();
    for chunk in chunks(&pack(&data), 64) {
        handle
            .notify(TransportStatus::Receive(chunk).into())
            .await
            .unwrap();
    }
    let verdict = handle.request(TransportStatus::Finish.into()).await.unwrap();
    assert_eq!(verdict, Ok(()));
    drop(handle);

    let (mut storage, log) = task.await.unwrap().into_parts();
    assert_eq!(storage.boot_target(), SlotId::B);
    assert_eq!(storage.read_image(SlotId::B, 30_000).unwrap(), data);
    assert!(log.restart_requested());
}

#[tokio::test]
async fn abort_from_a_second_producer() {
    let data = firmware(10_000, 53);
    let session = UpdateSession::new(RecordingStorage::new(), EventLog::new());
    let (service, transport) = UpdateService::new(session, 4);
    let watchdog = transport.clone();
    let task = service.spawn();

    transport.notify(TransportStatus::Start.into()).await.unwrap();
    for chunk in chunks(&pack(&data), 256).into_iter().take(5) {
        transport
            .notify(TransportStatus::Receive(chunk).into())
            .await
            .unwrap();
    }
    watchdog
        .request(TransportStatus::Abort.into())
        .await
        .unwrap()
        .unwrap();

    // the transport does not know yet and keeps sending
    let late = transport
        .request(TransportStatus::Receive(Bytes::from_static(&[0; 64])).into())
        .await
        .unwrap();
    assert!(late.is_err());

    drop(transport);
    drop(watchdog);
    let (storage, log) = task.await.unwrap().into_parts();
    assert_eq!(storage.open_handles(), 0);
    assert_eq!(storage.boot_target(), SlotId::A);
    assert_eq!(log.last_outcome(), Some(Outcome::Failure(FailureReason::Aborted)));
}

#[tokio::test]
async fn failed_transport_notifications_are_ignored() {
    let session = UpdateSession::new(RecordingStorage::new(), EventLog::new());
    let (service, handle) = UpdateService::new(session, 4);
    let task = service.spawn();

    handle.notify(TransportStatus::Start.into()).await.unwrap();
    let verdict = handle
        .request(Notification::failed(TransportStatus::Abort))
        .await
        .unwrap();
    assert_eq!(verdict, Ok(()));
    drop(handle);

    let session = task.await.unwrap();
    assert_eq!(session.storage().open_handles(), 1);
    assert!(session.observer().events().is_empty());
}
