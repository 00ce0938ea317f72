//! Fuzz target: inbound publish path of `TankNode`
//!
//! Splits the input into a stream of (topic selector, chunk) records and
//! feeds them through `on_incoming_publish` / `on_incoming_data`,
//! interleaved with timer firings.  Asserts that nothing panics and the
//! gauge stays within bounds.
//!
//! cargo fuzz run fuzz_inbound_payload

#![no_main]

use libfuzzer_sys::fuzz_target;
use tanknode::adapters::identity;
use tanknode::app::events::AppEvent;
use tanknode::app::ports::{
    EventSink, LastWill, MqttPort, QoS, SessionParams, TimerPort, TimerRole,
};
use tanknode::app::service::TankNode;
use tanknode::config::{NodeConfig, topic};
use tanknode::error::TransportError;
use tanknode::gauge::{MAX_LEVEL, MIN_LEVEL};

// ── Inert ports ───────────────────────────────────────────────

struct NullIo {
    armed: [bool; TimerRole::COUNT],
}

impl MqttPort for NullIo {
    fn connect(&mut self, _: &SessionParams) -> Result<(), TransportError> {
        Ok(())
    }
    fn subscribe(&mut self, _: &str, _: QoS) -> Result<(), TransportError> {
        Ok(())
    }
    fn publish(&mut self, _: &str, _: &[u8], _: QoS, _: bool) -> Result<(), TransportError> {
        Ok(())
    }
}

impl TimerPort for NullIo {
    fn schedule(&mut self, role: TimerRole, _: u32) {
        self.armed[role as usize] = true;
    }
    fn cancel(&mut self, role: TimerRole) {
        self.armed[role as usize] = false;
    }
}

struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _: &AppEvent) {}
}

const TOPICS: [&str; 4] = ["tank/oxygen_request", "tank/alarm", "tank/other", ""];

fuzz_target!(|data: &[u8]| {
    let session = SessionParams {
        client_id: identity::client_id("nxp_", &[0x01, 0x02]),
        broker: core::net::SocketAddr::from(([127, 0, 0, 1], 1883)),
        keep_alive_secs: 100,
        last_will: LastWill {
            topic: topic("tank/availability"),
            payload: "OFFLINE",
            qos: QoS::AtLeastOnce,
            retain: true,
        },
    };
    let mut node = TankNode::new(&NodeConfig::default(), session);
    let mut io = NullIo { armed: [false; TimerRole::COUNT] };
    let mut sink = NullSink;
    node.start(&mut io, &mut sink);

    let mut rest = data;
    while let [header, tail @ ..] = rest {
        let len = usize::from(header >> 3).min(tail.len());
        let (chunk, next) = tail.split_at(len);
        rest = next;

        node.on_incoming_publish(TOPICS[usize::from(header & 0b11)]);
        node.on_incoming_data(chunk, header & 0b100 != 0, &mut io, &mut sink);

        // Fire whatever is armed, in role order.
        for role in TimerRole::ALL {
            if io.armed[role as usize] {
                io.armed[role as usize] = false;
                node.on_timer(role, &mut io, &mut sink);
            }
        }

        assert!((MIN_LEVEL..=MAX_LEVEL).contains(&node.level()));
        if node.alarm_active() {
            assert!(!io.armed[TimerRole::Decrease as usize]);
            assert!(!io.armed[TimerRole::Increase as usize]);
        }
    }
});
