//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured node events through the
//! `log` facade (ESP-IDF console on the device, `env_logger` on a host).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(mode) => {
                info!("START | initial_mode={:?}", mode);
            }
            AppEvent::ConnectionChanged { from, to } => {
                info!("CONN  | {:?} -> {:?}", from, to);
            }
            AppEvent::ConnectionEventIgnored { status, event } => {
                warn!("CONN  | {:?} ignored while {:?}", event, status);
            }
            AppEvent::ReconnectScheduled { delay_ms } => {
                info!("CONN  | reconnect in {} ms", delay_ms);
            }
            AppEvent::Subscribed { topic, result } => match result {
                Ok(()) => info!("SUB   | {}", topic),
                Err(e) => warn!("SUB   | {} failed: {}", topic, e),
            },
            AppEvent::ModeChanged { from, to } => {
                info!("MODE  | {:?} -> {:?}", from, to);
            }
            AppEvent::CommandReceived(cmd) => {
                info!("CMD   | {:?}", cmd);
            }
            AppEvent::PayloadIgnored { len } => {
                info!("CMD   | {} byte payload on unrecognised topic ignored", len);
            }
            AppEvent::Published(p) => {
                info!("PUB   | {:?} = {}", p.channel, p.payload);
            }
            AppEvent::PublishFailed { channel, error } => {
                warn!("PUB   | {:?} failed: {}", channel, error);
            }
        }
    }
}
