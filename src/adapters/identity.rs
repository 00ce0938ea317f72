//! Session identity derived from the chip's factory-burned unique ID.
//!
//! The client identifier is the configured prefix followed by the unique
//! ID in lowercase hex, **last byte first**.  It is derived once at
//! startup and reused for every reconnect, so the broker always sees the
//! same client (and replaces a stale session instead of stacking one).

use core::fmt::Write;

use log::info;

use crate::app::ports::SessionParams;

/// Longest unique ID we accept, in bytes.
pub const MAX_ID_LEN: usize = 16;

/// Raw unique ID bytes, in the order the hardware reports them.
pub type HardwareId = heapless::Vec<u8, MAX_ID_LEN>;

/// Client identifier string; prefix (8) plus two hex digits per ID byte.
pub type ClientId = heapless::String<48>;

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_hardware_id() -> HardwareId {
    let mut mac = [0u8; 6];
    // SAFETY: `mac` is exactly the 6 bytes the call writes.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    HardwareId::from_slice(&mac).unwrap_or_default()
}

/// Simulation: a deterministic fake ID.
#[cfg(not(target_os = "espidf"))]
pub fn read_hardware_id() -> HardwareId {
    HardwareId::from_slice(&[0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]).unwrap_or_default()
}

/// `prefix` + reversed lowercase hex of `id`.
pub fn client_id(prefix: &str, id: &[u8]) -> ClientId {
    let mut out = ClientId::new();
    let _ = out.push_str(prefix);
    for b in id.iter().rev() {
        let _ = write!(out, "{:02x}", b);
    }
    out
}

/// Log the identity a session will present.
pub fn describe(session: &SessionParams) {
    info!(
        "client id {} | broker {} | keep-alive {}s",
        session.client_id,
        session.broker,
        session.keep_alive_secs
    );
}
