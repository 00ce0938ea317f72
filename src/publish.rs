//! Publish policy.
//!
//! Decides what is worth sending after each observation of the gauge and
//! pushes it through the [`MqttPort`].  Everything goes out at-least-once
//! and retained, so a late subscriber always sees the current level,
//! trend and availability.
//!
//! ```text
//!   observe(level)
//!     ├─ level != last_level  ──▶ publish level
//!     └─ trend != last_trend  ──▶ publish trend
//!   (both "last" values updated after every evaluation)
//! ```

use core::fmt::Write;

use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, MqttPort, QoS};
use crate::config::TopicConfig;

/// Payload of the availability announcement.
pub const ONLINE: &str = "ONLINE";
/// Payload of the last-will message.
pub const OFFLINE: &str = "OFFLINE";

/// Delivery guarantee for every outbound message.
pub const PUBLISH_QOS: QoS = QoS::AtLeastOnce;

// ---------------------------------------------------------------------------
// Trend
// ---------------------------------------------------------------------------

/// Direction of level movement between two observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Increase,
    Decrease,
    Stable,
}

impl Trend {
    /// Classify the move from `previous` to `current`.
    pub fn between(previous: u8, current: u8) -> Self {
        match current.cmp(&previous) {
            core::cmp::Ordering::Less => Self::Decrease,
            core::cmp::Ordering::Greater => Self::Increase,
            core::cmp::Ordering::Equal => Self::Stable,
        }
    }

    /// Wire payload.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Increase => "INCREASE",
            Self::Decrease => "DECREASE",
            Self::Stable => "STABLE",
        }
    }
}

// ---------------------------------------------------------------------------
// Publications
// ---------------------------------------------------------------------------

/// Outbound topic role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Availability,
    Level,
    FillState,
}

impl Channel {
    /// Resolve the configured topic name for this role.
    pub fn topic(self, topics: &TopicConfig) -> &str {
        match self {
            Self::Availability => topics.availability.as_str(),
            Self::Level => topics.level.as_str(),
            Self::FillState => topics.fill_state.as_str(),
        }
    }
}

/// One message the policy decided to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub channel: Channel,
    pub payload: heapless::String<12>,
}

impl Publication {
    fn text(channel: Channel, text: &str) -> Self {
        let mut payload = heapless::String::new();
        // Longest payload is "DECREASE"/"INCREASE" (8 bytes).
        let _ = payload.push_str(text);
        Self { channel, payload }
    }

    fn level(level: u8) -> Self {
        let mut payload = heapless::String::new();
        let _ = write!(payload, "{level}");
        Self {
            channel: Channel::Level,
            payload,
        }
    }
}

/// At most an availability, a level and a trend per evaluation.
pub type Publications = heapless::Vec<Publication, 3>;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Remembers what was last sent so nothing is published twice in a row.
#[derive(Debug, Clone)]
pub struct PublishPolicy {
    last_level: u8,
    /// `None` until the first evaluation; never equal to a real trend.
    last_trend: Option<Trend>,
}

impl PublishPolicy {
    /// Start with `initial_level` as the already-published level.
    pub fn new(initial_level: u8) -> Self {
        Self {
            last_level: initial_level,
            last_trend: None,
        }
    }

    /// Evaluate an observation of the gauge.
    pub fn observe(&mut self, level: u8) -> Publications {
        let mut out = Publications::new();

        if level != self.last_level {
            let _ = out.push(Publication::level(level));
        }

        let trend = Trend::between(self.last_level, level);
        if self.last_trend != Some(trend) {
            let _ = out.push(Publication::text(Channel::FillState, trend.as_str()));
            self.last_trend = Some(trend);
        }

        self.last_level = level;
        out
    }

    /// Availability announcement followed by a regular evaluation.
    pub fn announce(&mut self, level: u8) -> Publications {
        let mut out = Publications::new();
        let _ = out.push(Publication::text(Channel::Availability, ONLINE));
        for p in self.observe(level) {
            let _ = out.push(p);
        }
        out
    }

    /// Unconditional `STABLE`, sent when motion is frozen or paused by a
    /// command rather than by the gauge reaching a boundary.
    pub fn force_stable(&mut self) -> Publication {
        self.last_trend = Some(Trend::Stable);
        Publication::text(Channel::FillState, Trend::Stable.as_str())
    }

    pub fn last_published_level(&self) -> u8 {
        self.last_level
    }

    pub fn last_published_trend(&self) -> Option<Trend> {
        self.last_trend
    }
}

/// Push publications through the transport.
///
/// A failed publish is reported and dropped; the next state change
/// supersedes it.
pub fn send(
    publications: &[Publication],
    topics: &TopicConfig,
    out: &mut impl MqttPort,
    sink: &mut impl EventSink,
) {
    for p in publications {
        let topic = p.channel.topic(topics);
        match out.publish(topic, p.payload.as_bytes(), PUBLISH_QOS, true) {
            Ok(()) => sink.emit(&AppEvent::Published(p.clone())),
            Err(error) => sink.emit(&AppEvent::PublishFailed {
                channel: p.channel,
                error,
            }),
        }
    }
}
