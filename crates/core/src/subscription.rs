//! Topic subscriptions
//!
//! The registry keeps two sets: the topics the host wants (`desired`) and
//! the topics already subscribed on the current channel session
//! (`applied`). Control messages are produced only for the difference, so
//! repeated calls are idempotent and nothing is sent while offline. The
//! connection actor owns the registry and sends whatever it returns.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;
use wavelink_domain::{ControlMessage, Topic};

#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    desired: BTreeSet<Topic>,
    applied: HashSet<Topic>,
    live: bool,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record interest in `topic`; returns the frame to send, if any.
    pub fn subscribe(&mut self, topic: Topic) -> Option<ControlMessage> {
        self.desired.insert(topic.clone());
        if !self.live || self.applied.contains(&topic) {
            return None;
        }
        self.applied.insert(topic.clone());
        Some(ControlMessage::Subscribe { topic })
    }

    /// Drop interest in `topic`; unknown topics are ignored.
    pub fn unsubscribe(&mut self, topic: &Topic) -> Option<ControlMessage> {
        if !self.desired.remove(topic) {
            debug!(topic = %topic, "unsubscribe of unknown topic ignored");
            return None;
        }
        if self.applied.remove(topic) {
            return Some(ControlMessage::Unsubscribe { topic: topic.clone() });
        }
        None
    }

    /// Start a session: every desired topic is (re)subscribed.
    pub fn replay_all(&mut self) -> Vec<ControlMessage> {
        self.live = true;
        self.applied = self.desired.iter().cloned().collect();
        self.desired.iter().cloned().map(|topic| ControlMessage::Subscribe { topic }).collect()
    }

    /// End the session; desired topics are kept for the next replay.
    pub fn mark_offline(&mut self) {
        self.live = false;
        self.applied.clear();
    }

    /// Forget everything, used on teardown.
    pub fn clear(&mut self) {
        self.mark_offline();
        self.desired.clear();
    }

    pub fn is_subscribed(&self, topic: &Topic) -> bool {
        self.desired.contains(topic)
    }

    pub fn topics(&self) -> Vec<Topic> {
        self.desired.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.desired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.desired.is_empty()
    }
}
