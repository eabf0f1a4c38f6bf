//! Connection lifecycle: connect guards, reconnect backoff, subscription
//! replay and inbound event delivery.

mod support;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use support::auth::{FakeRefresher, MemoryStore};
use support::transport::{FakeTransport, OpenScript};
use support::{journal, settle, wait_for_state, Journal};
use wavelink_common::CommonError;
use wavelink_core::connection::ConnectionSettings;
use wavelink_core::{
    ConnectionManager, CredentialRefreshCoordinator, EventDispatcher, NetworkObserver,
    TransportError,
};
use wavelink_domain::constants::{
    EVENT_CONNECT_FAILED, EVENT_RECONNECTING, EVENT_RECONNECT_EXHAUSTED,
};
use wavelink_domain::{ChannelConfig, ConnectionState, NetworkStatus, NetworkType, Topic};

struct Harness {
    manager: ConnectionManager,
    transport: Arc<FakeTransport>,
    refresher: Arc<FakeRefresher>,
    network: NetworkObserver,
    dispatcher: Arc<EventDispatcher>,
    journal: Journal,
}

fn harness() -> Harness {
    let store = MemoryStore::with_refresh_token("refresh-0");
    let journal = journal();
    let transport = FakeTransport::new(journal.clone());
    let refresher = Arc::new(FakeRefresher::new(Duration::from_millis(10)));
    let network = NetworkObserver::new(NetworkStatus::online(NetworkType::Wifi));
    let credentials = CredentialRefreshCoordinator::new(
        refresher.clone(),
        Arc::new(store),
        network.clone(),
        Duration::from_secs(30),
    );
    let dispatcher = Arc::new(EventDispatcher::new());
    let manager = ConnectionManager::spawn(
        ConnectionSettings::from(&ChannelConfig::default()),
        transport.clone(),
        credentials,
        &network,
        dispatcher.clone(),
    );

    Harness { manager, transport, refresher, network, dispatcher, journal }
}

/// Record every `event` into the journal as `event:<name>:<payload>`.
fn record(h: &Harness, event: &'static str) {
    let journal = h.journal.clone();
    h.dispatcher.on(event, move |payload| {
        journal.lock().push(format!("event:{event}:{payload}"));
        Ok(())
    });
}

fn topic(name: &str) -> Topic {
    Topic::parse(name).unwrap()
}

fn entries_starting_with(journal: &Journal, prefix: &str) -> Vec<String> {
    journal.lock().iter().filter(|entry| entry.starts_with(prefix)).cloned().collect()
}

#[tokio::test(start_paused = true)]
async fn two_immediate_connects_open_once() {
    let h = harness();

    let (first, second) = tokio::join!(h.manager.connect(), h.manager.connect());

    assert!(first);
    assert!(second);
    assert_eq!(h.transport.open_count(), 1);
    assert_eq!(h.refresher.calls(), 1);
    assert_eq!(h.manager.state(), ConnectionState::Connected);

    assert!(h.manager.connect().await);
    assert_eq!(h.transport.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn connect_while_offline_returns_false_then_connects_on_network_up() {
    let h = harness();
    h.network.update(NetworkStatus::offline());

    assert!(!h.manager.connect().await);
    assert_eq!(h.transport.open_count(), 0);
    assert_eq!(h.manager.state(), ConnectionState::Disconnected);

    let mut states = h.manager.state_changes();
    h.network.update(NetworkStatus::online(NetworkType::Cellular));
    wait_for_state(&mut states, ConnectionState::Connected).await;
    assert_eq!(h.transport.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn network_up_without_connect_request_stays_idle() {
    let h = harness();
    h.network.update(NetworkStatus::offline());
    h.network.update(NetworkStatus::online(NetworkType::Wifi));
    settle().await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(h.transport.open_count(), 0);
    assert_eq!(h.manager.state(), ConnectionState::Disconnected);
}

/// Validates the reconnect schedule after an involuntary disconnect.
///
/// Assertions:
/// - Confirms reconnect attempts are spaced 1s, 2s, 4s, 8s and 16s apart.
/// - Confirms the manager ends `Disconnected` with a `reconnect_exhausted`
///   event after the fifth failed attempt.
#[tokio::test(start_paused = true)]
async fn reconnect_backoff_then_exhaustion() {
    let h = harness();
    record(&h, EVENT_RECONNECTING);
    record(&h, EVENT_RECONNECT_EXHAUSTED);
    assert!(h.manager.connect().await);

    h.transport.fail_all(TransportError::unreachable("server down"));
    let mut states = h.manager.state_changes();
    h.transport.drop_latest();

    wait_for_state(&mut states, ConnectionState::ReconnectWaiting).await;
    wait_for_state(&mut states, ConnectionState::Disconnected).await;

    let opens = h.transport.open_times();
    assert_eq!(opens.len(), 6);
    let gaps: Vec<u128> = opens.windows(2).skip(1).map(|w| (w[1] - w[0]).as_millis()).collect();
    assert_eq!(gaps, vec![2000, 4000, 8000, 16_000]);

    let reconnecting = entries_starting_with(&h.journal, "event:reconnecting");
    let delays: Vec<u64> = reconnecting
        .iter()
        .map(|entry| {
            let payload: serde_json::Value =
                serde_json::from_str(entry.trim_start_matches("event:reconnecting:")).unwrap();
            payload["delay_ms"].as_u64().unwrap()
        })
        .collect();
    assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16_000]);

    let exhausted = entries_starting_with(&h.journal, "event:reconnect_exhausted");
    assert_eq!(exhausted.len(), 1);
    assert!(exhausted[0].contains(r#""attempts":5"#));

    // Exhaustion is terminal until the host asks again
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(h.transport.open_count(), 6);
}

#[tokio::test(start_paused = true)]
async fn first_reconnect_waits_base_delay() {
    let h = harness();
    assert!(h.manager.connect().await);
    let dropped_at = tokio::time::Instant::now();
    h.transport.drop_latest();

    let mut states = h.manager.state_changes();
    wait_for_state(&mut states, ConnectionState::ReconnectWaiting).await;
    wait_for_state(&mut states, ConnectionState::Connected).await;

    let opens = h.transport.open_times();
    assert_eq!(opens.len(), 2);
    assert_eq!((opens[1] - dropped_at).as_millis(), 1000);
}

/// Validates that only a down to up network edge short-circuits the backoff.
///
/// Assertions:
/// - Confirms network type changes while online leave the pending reconnect
///   on its 1s schedule.
/// - Confirms an offline then online transition reconnects immediately.
#[tokio::test(start_paused = true)]
async fn network_type_change_keeps_backoff_schedule() {
    let h = harness();
    assert!(h.manager.connect().await);

    h.transport.fail_all(TransportError::unreachable("server down"));
    let mut states = h.manager.state_changes();
    let dropped_at = tokio::time::Instant::now();
    h.transport.drop_latest();
    wait_for_state(&mut states, ConnectionState::ReconnectWaiting).await;

    for network_type in [NetworkType::Cellular, NetworkType::Ethernet, NetworkType::Wifi] {
        h.network.update(NetworkStatus::online(network_type));
        settle().await;
    }
    assert_eq!(h.transport.open_count(), 1);
    assert_eq!(h.manager.state(), ConnectionState::ReconnectWaiting);

    tokio::time::sleep(Duration::from_millis(999)).await;
    assert_eq!(h.transport.open_count(), 1);

    tokio::time::sleep(Duration::from_millis(1)).await;
    settle().await;
    let opens = h.transport.open_times();
    assert_eq!(opens.len(), 2);
    assert_eq!((opens[1] - dropped_at).as_millis(), 1000);
    assert_eq!(h.manager.state(), ConnectionState::ReconnectWaiting);

    h.network.update(NetworkStatus::offline());
    settle().await;
    h.network.update(NetworkStatus::online(NetworkType::Wifi));
    settle().await;
    assert_eq!(h.transport.open_count(), 3);
}

/// Validates that subscriptions are replayed before inbound events.
///
/// Assertions:
/// - Confirms the subscribe frame for the topic is written on the new
///   channel before the queued update for that topic is dispatched.
#[tokio::test(start_paused = true)]
async fn subscriptions_replayed_before_events_after_reconnect() {
    let h = harness();
    record(&h, "update");

    h.manager.subscribe(topic("shipment:42")).await.unwrap();
    assert!(h.manager.connect().await);

    h.transport.script(OpenScript::Accept(vec![json!({
        "type": "update",
        "topic": "shipment:42",
        "payload": {"status": "delivered"}
    })
    .to_string()]));

    let mut states = h.manager.state_changes();
    h.transport.drop_latest();
    wait_for_state(&mut states, ConnectionState::ReconnectWaiting).await;
    wait_for_state(&mut states, ConnectionState::Connected).await;
    settle().await;

    let journal = h.journal.lock().clone();
    let subscribe = r#"sent:{"type":"subscribe","topic":"shipment:42"}"#;
    let subscribes: Vec<usize> = journal
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.as_str() == subscribe)
        .map(|(index, _)| index)
        .collect();
    let event = journal.iter().position(|entry| entry.starts_with("event:update")).unwrap();

    assert_eq!(subscribes.len(), 2, "{journal:?}");
    assert!(subscribes[1] < event, "{journal:?}");
}

#[tokio::test(start_paused = true)]
async fn subscribe_is_idempotent_and_unknown_unsubscribe_is_silent() {
    let h = harness();
    assert!(h.manager.connect().await);

    h.manager.subscribe(topic("shipment:1")).await.unwrap();
    h.manager.subscribe(topic("shipment:1")).await.unwrap();
    h.manager.unsubscribe(topic("never-subscribed")).await.unwrap();

    assert_eq!(entries_starting_with(&h.journal, "sent:").len(), 1);
    assert_eq!(h.manager.subscriptions().await.unwrap(), vec![topic("shipment:1")]);

    h.manager.unsubscribe(topic("shipment:1")).await.unwrap();
    let sent = entries_starting_with(&h.journal, "sent:");
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1], r#"sent:{"type":"unsubscribe","topic":"shipment:1"}"#);
}

#[tokio::test(start_paused = true)]
async fn updates_for_unsubscribed_topics_are_dropped() {
    let h = harness();
    record(&h, "update");
    record(&h, "notice");
    h.manager.subscribe(topic("shipment:1")).await.unwrap();
    assert!(h.manager.connect().await);

    h.transport.with_latest(|server| {
        server.push(json!({"type": "update", "topic": "shipment:2", "payload": 1}).to_string());
        server.push("not json");
        server.push(json!({"type": "update", "topic": "shipment:1", "payload": 2}).to_string());
        server.push(json!({"type": "notice", "payload": {"text": "maintenance"}}).to_string());
    });
    settle().await;

    let updates = entries_starting_with(&h.journal, "event:update");
    assert_eq!(updates.len(), 1);
    assert!(updates[0].contains("shipment:1"));
    assert_eq!(entries_starting_with(&h.journal, "event:notice").len(), 1);
    assert_eq!(h.manager.state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn disconnect_cancels_pending_reconnect() {
    let h = harness();
    assert!(h.manager.connect().await);

    let mut states = h.manager.state_changes();
    h.transport.fail_all(TransportError::unreachable("server down"));
    h.transport.drop_latest();
    wait_for_state(&mut states, ConnectionState::ReconnectWaiting).await;

    h.manager.disconnect().await;
    assert_eq!(h.manager.state(), ConnectionState::Disconnected);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.transport.open_count(), 1);

    // Intentional disconnect also suppresses auto-connect on network-up
    h.network.update(NetworkStatus::offline());
    h.network.update(NetworkStatus::online(NetworkType::Wifi));
    settle().await;
    assert_eq!(h.transport.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn unauthorized_open_invalidates_credential_before_retrying() {
    let h = harness();
    h.transport.script(OpenScript::Fail(TransportError::unauthorized("token revoked")));

    assert!(!h.manager.connect().await);
    let mut states = h.manager.state_changes();
    wait_for_state(&mut states, ConnectionState::Connected).await;

    let opens = entries_starting_with(&h.journal, "open:");
    assert_eq!(opens, vec!["open:access-1", "open:access-2"]);
    assert_eq!(h.refresher.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn refresh_failure_stops_connecting() {
    let h = harness();
    record(&h, EVENT_CONNECT_FAILED);
    h.refresher.fail_next(CommonError::backend("auth", "revoked", false));

    assert!(!h.manager.connect().await);
    assert_eq!(h.manager.state(), ConnectionState::Disconnected);
    assert_eq!(h.transport.open_count(), 0);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.transport.open_count(), 0);

    let failed = entries_starting_with(&h.journal, "event:connect_failed");
    assert_eq!(failed.len(), 1);
    assert!(failed[0].contains("refresh_failed"));
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_the_actor() {
    let h = harness();
    h.manager.subscribe(topic("shipment:1")).await.unwrap();
    assert!(h.manager.connect().await);

    h.manager.shutdown().await;
    assert_eq!(h.manager.state(), ConnectionState::Disconnected);
    assert!(!h.manager.connect().await);
    assert!(h.manager.subscriptions().await.is_err());
    assert!(h.journal.lock().contains(&"close".to_string()));
}
