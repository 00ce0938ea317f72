//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the business rules for the tank node: command
//! decoding, mode orchestration and the publish cadence.  All interaction
//! with the broker and the timer substrate happens through **port
//! traits** defined in [`ports`], keeping this layer fully testable
//! without a network.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
