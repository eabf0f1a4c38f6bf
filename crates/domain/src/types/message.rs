//! Topics and duplex channel frames
//!
//! Frames are JSON text. Outbound control frames look like
//! `{"type":"subscribe","topic":"shipment:42"}`; inbound frames carry a
//! `type` (the event name), an optional `topic` and a `payload`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, WavelinkError};

/// Subscription key, e.g. a shipment id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    /// Reject empty or whitespace-only names
    pub fn parse<S: Into<String>>(name: S) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(WavelinkError::InvalidInput("topic must not be empty".to_string()));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for Topic {
    type Error = WavelinkError;

    fn try_from(name: &str) -> Result<Self> {
        Self::parse(name)
    }
}

impl TryFrom<String> for Topic {
    type Error = WavelinkError;

    fn try_from(name: String) -> Result<Self> {
        Self::parse(name)
    }
}

/// Outbound control frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    Subscribe { topic: Topic },
    Unsubscribe { topic: Topic },
}

impl ControlMessage {
    pub fn topic(&self) -> &Topic {
        match self {
            Self::Subscribe { topic } | Self::Unsubscribe { topic } => topic,
        }
    }

    /// Encode as a text frame
    pub fn to_frame(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Inbound frame, dispatched under its `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "type")]
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<Topic>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl InboundMessage {
    /// Decode a text frame
    pub fn parse(frame: &str) -> Result<Self> {
        let message: Self = serde_json::from_str(frame)?;
        if message.event.is_empty() {
            return Err(WavelinkError::InvalidInput("inbound frame has an empty type".to_string()));
        }
        Ok(message)
    }

    /// Value handed to dispatcher handlers
    pub fn to_event_payload(&self) -> serde_json::Value {
        match &self.topic {
            Some(topic) => serde_json::json!({ "topic": topic, "payload": self.payload }),
            None => self.payload.clone(),
        }
    }
}
