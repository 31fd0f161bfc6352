//! Integration test: endpoint failover through the health probe.
//!
//! Uses tokio's paused clock: the probe interval in the test config is
//! 100ms, so each sleep below spans at least one probe tick.

use std::time::Duration;

use uuid::Uuid;

use ledgerlink_core::codec;
use ledgerlink_plugin::PluginEvent;

use ledgerlink_integration_tests::{plugin_with_ledger, prepared_transfer, SECONDARY};

const ID: &str = "f55585e1-0c19-4588-832d-369cfa005640";

#[tokio::test(start_paused = true)]
async fn test_liveness_failure_fails_over_to_secondary() {
    let (plugin, ledger) = plugin_with_ledger();
    plugin.connect().await.unwrap();
    assert!(plugin.is_connected().await);

    // The primary node goes dark.
    ledger.set_live(false);
    tokio::time::sleep(Duration::from_millis(150)).await;
    ledger.set_live(true);
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(plugin.is_connected().await);
    assert!(
        ledger.dialed_endpoints().contains(&SECONDARY.to_string()),
        "failover never dialed the secondary endpoint"
    );
}

#[tokio::test(start_paused = true)]
async fn test_events_and_routing_survive_failover() {
    let (plugin, ledger) = plugin_with_ledger();
    let mut events = plugin.subscribe();
    plugin.connect().await.unwrap();
    assert_eq!(events.recv().await.unwrap(), PluginEvent::Connect);

    let id = Uuid::parse_str(ID).unwrap();
    plugin
        .send_transfer(&prepared_transfer(id, 1000, "JPY-1"))
        .await
        .unwrap();

    // Kill the link; the probe closes it and reconnects to the
    // secondary.
    ledger.set_live(false);
    tokio::time::sleep(Duration::from_millis(150)).await;
    ledger.set_live(true);

    assert_eq!(events.recv().await.unwrap(), PluginEvent::Disconnect);
    assert_eq!(events.recv().await.unwrap(), PluginEvent::Connect);

    // Notifications on the fresh link still reach listeners.
    let ledger_id = codec::to_ledger_id(ID).unwrap();
    ledger.emit_update(&ledger_id);
    let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("no event after reconnect")
        .unwrap();
    assert!(matches!(event, PluginEvent::Prepare { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_manual_disconnect_stays_down_until_probe_revives() {
    let (plugin, ledger) = plugin_with_ledger();
    let mut events = plugin.subscribe();
    plugin.connect().await.unwrap();
    assert_eq!(events.recv().await.unwrap(), PluginEvent::Connect);

    plugin.disconnect().await;
    assert_eq!(events.recv().await.unwrap(), PluginEvent::Disconnect);
    assert!(!plugin.is_connected().await);

    // The probe's reconnect path brings the link back on a later tick;
    // listeners observe it as a fresh connect.
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(plugin.is_connected().await);
    assert_eq!(events.recv().await.unwrap(), PluginEvent::Connect);
    let _ = ledger;
}
