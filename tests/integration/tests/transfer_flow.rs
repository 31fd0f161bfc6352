//! Integration test: full transfer lifecycle across crates.
//!
//! Drives the plugin end to end against the in-memory ledger: submit a
//! create-transfer, inject store notifications, and observe the typed
//! lifecycle events a routing agent would consume.

use std::time::Duration;

use uuid::Uuid;

use ledgerlink_core::{codec, RelativeDirection, TransferState};
use ledgerlink_plugin::PluginEvent;

use ledgerlink_integration_tests::{plugin_with_ledger, prepared_transfer, PREFIX, SELF_ACCOUNT};

const ID: &str = "f55585e1-0c19-4588-832d-369cfa005640";

async fn next_event(
    rx: &mut tokio::sync::broadcast::Receiver<PluginEvent>,
) -> PluginEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

#[tokio::test]
async fn test_create_then_update_notification_fires_outgoing_prepare() {
    let (plugin, ledger) = plugin_with_ledger();
    let mut events = plugin.subscribe();

    plugin.connect().await.unwrap();
    assert_eq!(next_event(&mut events).await, PluginEvent::Connect);

    let id = Uuid::parse_str(ID).unwrap();
    plugin
        .send_transfer(&prepared_transfer(id, 1000, "JPY-1"))
        .await
        .unwrap();

    // The accepted submission surfaces back through the notification
    // path once the ledger processes it.
    let ledger_id = codec::to_ledger_id(ID).unwrap();
    ledger.emit_update(&ledger_id);

    match next_event(&mut events).await {
        PluginEvent::Prepare {
            direction,
            transfer,
        } => {
            assert_eq!(direction, Some(RelativeDirection::Outgoing));
            assert_eq!(transfer.id, id);
            assert_eq!(transfer.amount, 1000);
            assert_eq!(transfer.money_id, "JPY-1");
            assert_eq!(transfer.state, Some(TransferState::Prepare));
            assert_eq!(transfer.from, SELF_ACCOUNT);
            assert_eq!(transfer.ledger.as_deref(), Some(PREFIX));
        }
        other => panic!("unexpected event: {other:?}"),
    }

    // The projection read back through the public surface agrees.
    let read = plugin.get_transfer(&id).await.unwrap().unwrap();
    assert_eq!(read.state, Some(TransferState::Prepare));
    assert_eq!(read.amount, 1000);
}

#[tokio::test]
async fn test_fulfill_notification_fires_outgoing_fulfill() {
    let (plugin, ledger) = plugin_with_ledger();
    let mut events = plugin.subscribe();
    plugin.connect().await.unwrap();
    assert_eq!(next_event(&mut events).await, PluginEvent::Connect);

    let id = Uuid::parse_str(ID).unwrap();
    plugin
        .send_transfer(&prepared_transfer(id, 1000, "JPY-1"))
        .await
        .unwrap();

    // The counterparty fulfills on-ledger; the store flips the state
    // and notifies.
    let ledger_id = codec::to_ledger_id(ID).unwrap();
    plugin.fulfill_condition(&id, "cafe", "AQI").await.unwrap();
    // First event: the immediate forced re-emission.
    match next_event(&mut events).await {
        PluginEvent::Fulfill { fulfillment, .. } => assert_eq!(fulfillment, "cafe"),
        other => panic!("unexpected event: {other:?}"),
    }

    ledger.emit_fulfill(&ledger_id, "0xca75");
    match next_event(&mut events).await {
        PluginEvent::Fulfill {
            direction,
            transfer,
            ..
        } => {
            assert_eq!(direction, Some(RelativeDirection::Outgoing));
            assert_eq!(transfer.state, Some(TransferState::Fulfill));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_terminal_state_survives_repeated_notifications() {
    let (plugin, ledger) = plugin_with_ledger();
    let mut events = plugin.subscribe();
    plugin.connect().await.unwrap();
    assert_eq!(next_event(&mut events).await, PluginEvent::Connect);

    let id = Uuid::parse_str(ID).unwrap();
    plugin
        .send_transfer(&prepared_transfer(id, 1000, "JPY-1"))
        .await
        .unwrap();
    plugin.fulfill_condition(&id, "cafe", "AQI").await.unwrap();
    // Drain the forced re-emission.
    assert!(matches!(
        next_event(&mut events).await,
        PluginEvent::Fulfill { .. }
    ));

    // Duplicated/out-of-order updates for an already-terminal transfer
    // keep projecting the terminal state, never prepare again.
    let ledger_id = codec::to_ledger_id(ID).unwrap();
    for _ in 0..3 {
        ledger.emit_update(&ledger_id);
        match next_event(&mut events).await {
            PluginEvent::Fulfill { transfer, .. } => {
                assert_eq!(transfer.state, Some(TransferState::Fulfill));
            }
            other => panic!("state regressed: {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_reject_incoming_surfaces_abort() {
    let (plugin, ledger) = plugin_with_ledger();
    let mut events = plugin.subscribe();
    plugin.connect().await.unwrap();
    assert_eq!(next_event(&mut events).await, PluginEvent::Connect);

    let id = Uuid::parse_str(ID).unwrap();
    plugin
        .send_transfer(&prepared_transfer(id, 1000, "JPY-1"))
        .await
        .unwrap();
    plugin.reject_incoming_transfer(&id).await.unwrap();

    let ledger_id = codec::to_ledger_id(ID).unwrap();
    ledger.emit_update(&ledger_id);
    match next_event(&mut events).await {
        PluginEvent::Abort {
            direction,
            transfer,
        } => {
            assert_eq!(direction, Some(RelativeDirection::Outgoing));
            assert_eq!(transfer.state, Some(TransferState::Abort));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_forced_reemission_after_missed_event() {
    let (plugin, ledger) = plugin_with_ledger();
    plugin.connect().await.unwrap();

    let id = Uuid::parse_str(ID).unwrap();
    plugin
        .send_transfer(&prepared_transfer(id, 1000, "JPY-1"))
        .await
        .unwrap();
    let _ = ledger;

    // A listener that attached late can ask for the prepare event
    // again.
    let mut events = plugin.subscribe();
    assert!(plugin.force_emit_prepare(&id).await.unwrap());
    match next_event(&mut events).await {
        PluginEvent::Prepare {
            direction,
            transfer,
        } => {
            assert_eq!(direction, Some(RelativeDirection::Outgoing));
            assert_eq!(transfer.id, id);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}
