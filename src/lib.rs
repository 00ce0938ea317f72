//! Tank node library.
//!
//! Exposes the node core and its host adapters for integration testing.
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod connection;
pub mod error;
pub mod fsm;
pub mod gauge;
pub mod publish;
pub mod timers;
