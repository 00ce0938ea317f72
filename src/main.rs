//! Tank node main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  RumqttTransport   HostIo / TimerQueue   LogEventSink          │
//! │  (MqttPort)        (TimerPort)           (EventSink)           │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │                TankNode (pure logic)                   │    │
//! │  │  Connection · Modes · Gauge · Publish policy           │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::mpsc;

use anyhow::{Context, Result};
use log::info;

use tanknode::adapters::identity;
use tanknode::adapters::log_sink::LogEventSink;
use tanknode::adapters::mqtt::{RumqttTransport, resolve_broker};
use tanknode::adapters::runtime::Runtime;
use tanknode::app::ports::{LastWill, SessionParams};
use tanknode::app::service::TankNode;
use tanknode::config::NodeConfig;
use tanknode::publish::{OFFLINE, PUBLISH_QOS};

/// Names a JSON file overriding the built-in defaults.
const CONFIG_ENV: &str = "TANKNODE_CONFIG";

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    #[cfg(target_os = "espidf")]
    {
        esp_idf_svc::sys::link_patches();
        esp_idf_logger::init()?;
    }
    #[cfg(not(target_os = "espidf"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("tanknode v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Configuration ──────────────────────────────────────
    let config = load_config()?;

    // ── 3. Session parameters (resolved once, reused on reconnect) ──
    let broker = resolve_broker(&config.broker_host, config.broker_port)
        .with_context(|| format!("resolving {}", config.broker_host))?;
    let client_id = identity::client_id(&config.client_id_prefix, &identity::read_hardware_id());
    let session = SessionParams {
        client_id,
        broker,
        keep_alive_secs: config.keep_alive_secs,
        last_will: LastWill {
            topic: config.topics.availability.clone(),
            payload: OFFLINE,
            qos: PUBLISH_QOS,
            retain: true,
        },
    };
    identity::describe(&session);

    // ── 4. Wire adapters and run ──────────────────────────────
    let (tx, rx) = mpsc::channel();
    let transport = RumqttTransport::new(tx);
    let node = TankNode::new(&config, session);
    Runtime::new(node, transport, rx, LogEventSink::new()).run();

    Ok(())
}

/// Defaults, then the optional JSON file, then `MQTT_HOST` / `MQTT_PORT`.
fn load_config() -> Result<NodeConfig> {
    let mut config = match std::env::var(CONFIG_ENV) {
        Ok(path) => {
            let bytes = std::fs::read(&path).with_context(|| format!("reading {path}"))?;
            let config =
                NodeConfig::from_json(&bytes).with_context(|| format!("parsing {path}"))?;
            info!("config loaded from {}", path);
            config
        }
        Err(_) => {
            info!("{} not set, using defaults", CONFIG_ENV);
            NodeConfig::default()
        }
    };

    if let Ok(host) = std::env::var("MQTT_HOST") {
        config.broker_host = heapless::String::try_from(host.as_str())
            .map_err(|()| anyhow::anyhow!("MQTT_HOST longer than 64 bytes"))?;
    }
    if let Ok(port) = std::env::var("MQTT_PORT") {
        config.broker_port = port.parse().context("MQTT_PORT is not a port number")?;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}
