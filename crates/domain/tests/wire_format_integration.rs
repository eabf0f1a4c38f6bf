//! Wire-format contracts shared with the backend.

use serde_json::json;
use wavelink_domain::{
    ChannelConfig, ConnectionState, ControlMessage, InboundMessage, NetworkStatus, NetworkType,
    Topic,
};

#[test]
fn control_frames_round_trip_through_json() {
    let topic = Topic::parse("shipment:9").unwrap();
    let frame = ControlMessage::Unsubscribe { topic }.to_frame().unwrap();
    let decoded: ControlMessage = serde_json::from_str(&frame).unwrap();
    assert_eq!(decoded.topic().as_str(), "shipment:9");
    assert!(matches!(decoded, ControlMessage::Unsubscribe { .. }));
}

#[test]
fn inbound_update_keeps_arbitrary_payload() {
    let raw = json!({
        "type": "update",
        "topic": "shipment:9",
        "payload": {"eta": "2026-10-18T10:00:00Z", "stops": [1, 2, 3]}
    })
    .to_string();

    let message = InboundMessage::parse(&raw).unwrap();
    assert_eq!(message.payload["stops"], json!([1, 2, 3]));
}

#[test]
fn partial_config_keeps_other_defaults() {
    let config: ChannelConfig = parse_config(r#"{"base_reconnect_delay_ms": 250}"#);
    assert_eq!(config.base_reconnect_delay_ms, 250);
    assert_eq!(config.max_reconnect_delay_ms, 30_000);
    assert!(config.validate().is_ok());
}

#[test]
fn state_and_network_parse_from_wire_names() {
    assert_eq!("connected".parse::<ConnectionState>(), Ok(ConnectionState::Connected));
    assert_eq!("WIFI".parse::<NetworkType>(), Ok(NetworkType::Wifi));

    let status: NetworkStatus =
        serde_json::from_value(json!({"is_connected": false, "type": "none"})).unwrap();
    assert_eq!(status, NetworkStatus::offline());
}

fn parse_config(raw: &str) -> ChannelConfig {
    serde_json::from_str(raw).unwrap()
}
