//! Inbound commands to the tank node.
//!
//! The broker delivers a publish in two phases: first the topic, then the
//! payload (possibly in chunks).  [`SubscriptionTopic`] is what the node
//! remembers between the two; [`TankCommand`] is what the payload decodes
//! to once the final chunk arrives.

use crate::config::TopicConfig;

/// Inbound payloads are copied into a buffer this size; excess bytes are
/// dropped.
pub const PAYLOAD_CAP: usize = 15;

/// Which recognised topic the next payload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubscriptionTopic {
    /// Unrecognised topic, or no publish in flight.
    #[default]
    None,
    /// Fill-request topic.
    Request,
    /// Alarm topic.
    Alarm,
}

impl SubscriptionTopic {
    /// Exact, case-sensitive match against the configured inbound topics.
    pub fn classify(topic: &str, topics: &TopicConfig) -> Self {
        if topic == topics.fill_request.as_str() {
            Self::Request
        } else if topic == topics.alarm.as_str() {
            Self::Alarm
        } else {
            Self::None
        }
    }
}

/// Commands the outside world can send into the node core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TankCommand {
    /// Fill request raised (`true`) or withdrawn (`false`).
    FillRequest(bool),
    /// Alarm raised (`true`) or cleared (`false`).
    Alarm(bool),
}

impl TankCommand {
    /// Decode a payload for a topic.  `None` for an unrecognised topic.
    pub fn decode(topic: SubscriptionTopic, payload: &[u8]) -> Option<Self> {
        let on = switch_state(payload);
        match topic {
            SubscriptionTopic::Request => Some(Self::FillRequest(on)),
            SubscriptionTopic::Alarm => Some(Self::Alarm(on)),
            SubscriptionTopic::None => None,
        }
    }
}

/// Copy at most [`PAYLOAD_CAP`] bytes of an inbound payload.
pub fn bounded_payload(data: &[u8]) -> heapless::Vec<u8, PAYLOAD_CAP> {
    let n = data.len().min(PAYLOAD_CAP);
    let mut buf = heapless::Vec::new();
    // Cannot fail: `n` never exceeds capacity.
    let _ = buf.extend_from_slice(&data[..n]);
    buf
}

/// `"ON"` in the first two bytes means on; anything else means off.
pub fn switch_state(payload: &[u8]) -> bool {
    payload.starts_with(b"ON")
}
