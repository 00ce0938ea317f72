//! End-to-end scenarios for the TankNode: connection → commands → gauge
//! → publishes, against the mock transport and a simulated clock.

use super::mock_io::{Harness, IoCall};

use tanknode::app::events::AppEvent;
use tanknode::app::ports::{ConnectionEvent, QoS, TimerRole};
use tanknode::connection::ConnectionStatus;
use tanknode::fsm::ModeId;
use tanknode::publish::Trend;

const FILL_STATE: &str = "tank/fill_state";
const AVAILABILITY: &str = "tank/availability";

// ── Connection lifecycle ─────────────────────────────────────

#[test]
fn start_attempts_one_connection() {
    let mut h = Harness::new();
    h.start();
    assert_eq!(h.io.connects(), 1);
    assert_eq!(h.node.connection_status(), ConnectionStatus::Connecting);
    assert_eq!(h.node.mode(), ModeId::Idle);
    assert_eq!(h.node.level(), 100);
}

#[test]
fn acceptance_subscribes_and_announces_after_callback() {
    let mut h = Harness::new();
    h.start();
    h.accept();

    assert_eq!(
        h.io.subscriptions(),
        vec![
            ("tank/oxygen_request".to_string(), QoS::AtLeastOnce),
            ("tank/alarm".to_string(), QoS::AtLeastOnce),
        ]
    );
    // Deferred through the timer substrate, not published inline.
    assert!(h.io.sent.is_empty());
    assert!(h.is_armed(TimerRole::Announce));

    h.advance(0);
    assert_eq!(h.io.payloads_on(AVAILABILITY), vec!["ONLINE"]);
    assert_eq!(h.io.trends(), vec!["STABLE"]);
    // Level unchanged at 100: not published.
    assert!(h.io.levels().is_empty());
    assert!(h.io.sent.iter().all(|s| s.qos == QoS::AtLeastOnce && s.retain));
}

#[test]
fn online_precedes_first_evaluation() {
    let mut h = Harness::new();
    h.start();
    h.accept();
    h.advance(0);
    let topics: Vec<&str> = h.io.sent.iter().map(|s| s.topic.as_str()).collect();
    assert_eq!(topics, vec![AVAILABILITY, FILL_STATE]);
}

#[test]
fn rejection_retries_after_long_backoff() {
    let mut h = Harness::new();
    h.start();
    h.event(ConnectionEvent::Rejected);
    assert_eq!(h.node.connection_status(), ConnectionStatus::Disconnected);

    h.advance(9_999);
    assert_eq!(h.io.connects(), 1);
    h.advance(1);
    assert_eq!(h.io.connects(), 2);
    assert_eq!(h.node.connection_status(), ConnectionStatus::Connecting);
}

#[test]
fn synchronous_connect_failure_is_a_rejection() {
    let mut h = Harness::new();
    h.io.refuse_connect = true;
    h.start();
    assert_eq!(h.node.connection_status(), ConnectionStatus::Disconnected);
    assert!(
        h.io.calls
            .contains(&IoCall::Schedule { role: TimerRole::Reconnect, delay_ms: 10_000 })
    );
}

#[test]
fn drop_reconnects_after_short_backoff_and_resubscribes() {
    let mut h = Harness::connected();
    h.drop_link();
    assert_eq!(h.node.connection_status(), ConnectionStatus::Disconnected);

    h.advance(1_000);
    assert_eq!(h.io.connects(), 2);
    h.accept();
    h.advance(0);

    assert_eq!(h.io.subscriptions().len(), 4);
    // Trend and level unchanged since the last session: availability only.
    assert_eq!(h.io.payloads_on(AVAILABILITY), vec!["ONLINE"]);
    assert!(h.io.trends().is_empty());
}

#[test]
fn stray_accept_while_connected_is_ignored() {
    let mut h = Harness::connected();
    h.event(ConnectionEvent::Accepted);
    assert_eq!(h.io.subscriptions().len(), 2);
    assert!(
        h.sink
            .events
            .iter()
            .any(|e| matches!(e, AppEvent::ConnectionEventIgnored { .. }))
    );
}

// ── Fill request ─────────────────────────────────────────────

#[test]
fn fill_on_from_full_walks_down_to_one() {
    let mut h = Harness::connected();
    h.fill(true);
    assert!(h.node.fill_requested());
    // First step runs immediately.
    assert_eq!(h.node.level(), 99);

    h.advance(2_000);
    assert_eq!(h.node.level(), 1);

    let expected: Vec<u8> = (1..=99).rev().collect();
    assert_eq!(h.io.levels(), expected);
    assert_eq!(h.io.trends(), vec!["DECREASE", "STABLE"]);
    assert!(!h.is_armed(TimerRole::Decrease));
}

#[test]
fn decrease_steps_every_ten_ms() {
    let mut h = Harness::connected();
    h.fill(true);
    h.advance(9);
    assert_eq!(h.node.level(), 99);
    h.advance(1);
    assert_eq!(h.node.level(), 98);
    h.advance(100);
    assert_eq!(h.node.level(), 88);
}

#[test]
fn repeated_fill_on_does_not_double_the_rate() {
    let mut h = Harness::connected();
    h.fill(true);
    h.advance(5);
    h.fill(true);
    assert_eq!(h.node.level(), 98);
    h.advance(100);
    assert_eq!(h.node.level(), 88);
}

#[test]
fn fill_off_publishes_stable_then_refills_after_delay() {
    let mut h = Harness::connected();
    h.fill(true);
    h.advance(190);
    assert_eq!(h.node.level(), 80);
    h.io.clear_sent();

    h.fill(false);
    assert!(!h.node.fill_requested());
    assert_eq!(h.io.trends(), vec!["STABLE"]);
    assert_eq!(h.node.last_published_trend(), Some(Trend::Stable));

    h.advance(4_999);
    assert_eq!(h.node.level(), 80);
    assert!(h.io.levels().is_empty());

    h.advance(1);
    assert_eq!(h.node.level(), 81);
    assert_eq!(h.io.levels(), vec![81]);
    assert_eq!(h.io.trends(), vec!["STABLE", "INCREASE"]);
}

#[test]
fn refill_stops_at_full() {
    let mut h = Harness::connected();
    h.fill(true);
    h.advance(40);
    assert_eq!(h.node.level(), 95);
    h.fill(false);
    h.advance(5_000 + 200);

    assert_eq!(h.node.level(), 100);
    assert!(!h.is_armed(TimerRole::Increase));
    assert_eq!(h.io.trends().last().map(String::as_str), Some("STABLE"));
}

#[test]
fn fill_on_during_refill_pause_cancels_resume() {
    let mut h = Harness::connected();
    h.fill(true);
    h.advance(50);
    h.fill(false);
    h.advance(1_000);
    h.fill(true);
    assert!(!h.is_armed(TimerRole::Resume));
    assert!(!h.is_armed(TimerRole::Increase));
    assert!(h.is_armed(TimerRole::Decrease));
}

#[test]
fn never_more_than_one_stepper_armed() {
    let mut h = Harness::connected();
    for on in [true, false, true, true, false, false, true] {
        h.fill(on);
        for _ in 0..20 {
            h.advance(250);
            let armed = [TimerRole::Decrease, TimerRole::Increase]
                .iter()
                .filter(|r| h.is_armed(**r))
                .count();
            assert!(armed <= 1);
        }
    }
}

// ── Alarm ────────────────────────────────────────────────────

#[test]
fn alarm_mid_decrease_freezes_then_resumes_from_same_level() {
    let mut h = Harness::connected();
    h.fill(true);
    h.advance(490);
    assert_eq!(h.node.level(), 50);
    h.io.clear_sent();

    h.alarm(true);
    assert!(h.node.alarm_active());
    assert_eq!(h.io.trends(), vec!["STABLE"]);
    assert!(!h.is_armed(TimerRole::Decrease));

    h.advance(60_000);
    assert_eq!(h.node.level(), 50);
    assert!(h.io.levels().is_empty());

    h.alarm(false);
    assert!(!h.node.alarm_active());
    assert_eq!(h.node.mode(), ModeId::Emptying);
    assert_eq!(h.node.level(), 49);
    h.advance(10);
    assert_eq!(h.io.levels(), vec![49, 48]);
    assert_eq!(h.io.trends(), vec!["STABLE", "DECREASE"]);
}

#[test]
fn alarm_during_refill_pause_cancels_resume() {
    let mut h = Harness::connected();
    h.fill(true);
    h.advance(100);
    h.fill(false);
    h.alarm(true);
    assert!(!h.is_armed(TimerRole::Resume));
    let level = h.node.level();

    h.advance(10_000);
    assert_eq!(h.node.level(), level);

    h.alarm(false);
    assert_eq!(h.node.mode(), ModeId::Idle);
    h.advance(10_000);
    assert_eq!(h.node.level(), level);
}

#[test]
fn fill_on_while_alarmed_is_deferred_until_clear() {
    let mut h = Harness::connected();
    h.alarm(true);
    h.fill(true);

    assert!(h.node.fill_requested());
    assert!(!h.is_armed(TimerRole::Decrease));
    h.advance(1_000);
    assert_eq!(h.node.level(), 100);

    h.alarm(false);
    assert_eq!(h.node.level(), 99);
    assert!(h.is_armed(TimerRole::Decrease));
}

#[test]
fn fill_off_while_alarmed_cancels_the_pending_fill() {
    let mut h = Harness::connected();
    h.fill(true);
    h.advance(30);
    h.alarm(true);
    h.io.clear_sent();
    h.fill(false);
    assert!(!h.node.fill_requested());
    assert_eq!(h.io.trends(), vec!["STABLE"]);
    assert!(!h.is_armed(TimerRole::Resume));

    let level = h.node.level();
    h.alarm(false);
    h.advance(10_000);
    assert_eq!(h.node.level(), level);
    assert_eq!(h.node.mode(), ModeId::Idle);
}

#[test]
fn alarm_off_without_alarm_restarts_decrease_once() {
    let mut h = Harness::connected();
    h.fill(true);
    h.advance(5);
    h.alarm(false);
    assert_eq!(h.node.level(), 98);
    h.advance(100);
    assert_eq!(h.node.level(), 88);
}

// ── Inbound parsing ──────────────────────────────────────────

#[test]
fn unrecognised_topic_changes_nothing() {
    let mut h = Harness::connected();
    h.deliver("tank/unknown", b"ON");
    assert_eq!(h.node.mode(), ModeId::Idle);
    assert_eq!(h.node.level(), 100);
    assert!(h.io.sent.is_empty());
    assert!(
        h.sink
            .events
            .iter()
            .any(|e| matches!(e, AppEvent::PayloadIgnored { len: 2 }))
    );
}

#[test]
fn topic_correlation_resets_after_payload() {
    let mut h = Harness::connected();
    h.node.on_incoming_publish("tank/alarm");
    h.node.on_incoming_data(b"ON", true, &mut h.io, &mut h.sink);
    assert!(h.node.alarm_active());

    // A payload without a fresh topic notification is ignored.
    h.node.on_incoming_data(b"OFF", true, &mut h.io, &mut h.sink);
    assert!(h.node.alarm_active());
}

#[test]
fn only_the_final_chunk_is_acted_on() {
    let mut h = Harness::connected();
    h.node.on_incoming_publish("tank/oxygen_request");
    h.node.on_incoming_data(b"ON", false, &mut h.io, &mut h.sink);
    assert_eq!(h.node.mode(), ModeId::Idle);

    h.node.on_incoming_data(b"ON", true, &mut h.io, &mut h.sink);
    assert_eq!(h.node.mode(), ModeId::Emptying);
}

#[test]
fn lowercase_or_garbage_payload_means_off() {
    let mut h = Harness::connected();
    h.fill(true);
    h.deliver("tank/oxygen_request", b"on");
    assert_eq!(h.node.mode(), ModeId::Refilling);
}

#[test]
fn oversized_payload_is_truncated_not_rejected() {
    let mut h = Harness::connected();
    h.deliver("tank/oxygen_request", b"ON-and-a-lot-more-text-than-fits");
    assert_eq!(h.node.mode(), ModeId::Emptying);
}

// ── Publish failures ─────────────────────────────────────────

#[test]
fn publish_failures_are_reported_not_retried() {
    let mut h = Harness::connected();
    h.fill(true);
    h.drop_link();
    let calls_before = h.io.calls.len();
    h.advance(10);

    let failures = h
        .sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::PublishFailed { .. }))
        .count();
    assert!(failures >= 1);
    // Gauge keeps moving while offline.
    assert_eq!(h.node.level(), 98);
    let publishes_after = h.io.calls[calls_before..]
        .iter()
        .filter(|c| matches!(c, IoCall::Publish { .. }))
        .count();
    assert_eq!(publishes_after, 1);
}
