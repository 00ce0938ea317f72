//! Node configuration parameters
//!
//! All tunable parameters for the tank node.  Defaults reproduce the
//! deployed firmware; the host binary can override them from a JSON file
//! and the environment.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Fixed-capacity topic string.
pub type Topic = heapless::String<64>;

/// Build a [`Topic`], truncating anything past capacity.
pub fn topic(s: &str) -> Topic {
    let mut t = Topic::new();
    for c in s.chars() {
        if t.push(c).is_err() {
            break;
        }
    }
    t
}

/// Topic names used by the node, outbound and inbound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    /// `ONLINE` on connect, `OFFLINE` as last will.
    pub availability: Topic,
    /// Decimal gauge level, 1–100.
    pub level: Topic,
    /// `INCREASE` / `DECREASE` / `STABLE`.
    pub fill_state: Topic,
    /// Inbound fill request (`ON` / anything else).
    pub fill_request: Topic,
    /// Inbound alarm (`ON` / anything else).
    pub alarm: Topic,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            availability: topic("tank/availability"),
            level: topic("tank/oxygen_level"),
            fill_state: topic("tank/fill_state"),
            fill_request: topic("tank/oxygen_request"),
            alarm: topic("tank/alarm"),
        }
    }
}

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    // --- Broker ---
    /// Broker host name or literal IP address
    pub broker_host: heapless::String<64>,
    /// Broker TCP port
    pub broker_port: u16,
    /// MQTT keep-alive interval (seconds)
    pub keep_alive_secs: u16,
    /// Prefix prepended to the hex hardware ID to form the client ID
    pub client_id_prefix: heapless::String<8>,

    // --- Topics ---
    pub topics: TopicConfig,

    // --- Timing ---
    /// Delay between two gauge steps (milliseconds)
    pub step_interval_ms: u32,
    /// Delay between a fill-request OFF and the start of refilling (milliseconds)
    pub resume_delay_ms: u32,
    /// Reconnect delay after a dropped session (milliseconds)
    pub reconnect_short_ms: u32,
    /// Reconnect delay after a rejected or failed attempt (milliseconds)
    pub reconnect_long_ms: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let mut broker_host = heapless::String::new();
        let _ = broker_host.push_str("broker.hivemq.com");
        let mut client_id_prefix = heapless::String::new();
        let _ = client_id_prefix.push_str("nxp_");

        Self {
            // Broker
            broker_host,
            broker_port: 1883,
            keep_alive_secs: 100,
            client_id_prefix,

            // Topics
            topics: TopicConfig::default(),

            // Timing
            step_interval_ms: 10,
            resume_delay_ms: 5_000,
            reconnect_short_ms: 1_000,
            reconnect_long_ms: 10_000,
        }
    }
}

impl NodeConfig {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broker_host.is_empty() {
            return Err(ConfigError::ValidationFailed("broker_host must not be empty"));
        }
        if self.broker_port == 0 {
            return Err(ConfigError::ValidationFailed("broker_port must be > 0"));
        }
        if self.keep_alive_secs == 0 {
            return Err(ConfigError::ValidationFailed("keep_alive_secs must be > 0"));
        }
        if self.step_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("step_interval_ms must be > 0"));
        }
        if self.reconnect_short_ms == 0 {
            return Err(ConfigError::ValidationFailed("reconnect_short_ms must be > 0"));
        }
        if self.reconnect_long_ms < self.reconnect_short_ms {
            return Err(ConfigError::ValidationFailed(
                "reconnect_long_ms must be >= reconnect_short_ms",
            ));
        }
        let t = &self.topics;
        if [&t.availability, &t.level, &t.fill_state, &t.fill_request, &t.alarm]
            .iter()
            .any(|s| s.is_empty())
        {
            return Err(ConfigError::ValidationFailed("topics must not be empty"));
        }
        if t.fill_request == t.alarm {
            return Err(ConfigError::ValidationFailed(
                "fill_request and alarm topics must differ",
            ));
        }
        Ok(())
    }

    /// Parse a JSON document, filling missing fields from the defaults.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(bytes).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }
}
