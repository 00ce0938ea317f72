//! Role-keyed one-shot timer queue.
//!
//! Backs the [`TimerPort`](crate::app::ports::TimerPort) on hosts where
//! no RTOS timer service exists.  The queue never reads a clock: the
//! caller passes `now_ms` in, which keeps it deterministic under test.
//!
//! ```text
//!   slots[role] = Some { deadline, seq } | None
//!
//!   schedule(role) ─▶ overwrite slot      (re-arm replaces)
//!   cancel(role)   ─▶ clear slot          (no-op when empty)
//!   pop_expired    ─▶ min (deadline, seq) where deadline <= now
//! ```
//!
//! Ties on the deadline fire in scheduling order.

use log::debug;

use crate::app::ports::TimerRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    deadline_ms: u64,
    /// Monotonic scheduling sequence; breaks deadline ties.
    seq: u64,
}

/// At most one pending deadline per [`TimerRole`].
#[derive(Debug, Clone, Default)]
pub struct TimerQueue {
    slots: [Option<Entry>; TimerRole::COUNT],
    next_seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `role` to fire `delay_ms` after `now_ms`, replacing any pending
    /// deadline for that role.
    pub fn schedule(&mut self, role: TimerRole, delay_ms: u32, now_ms: u64) {
        let entry = Entry {
            deadline_ms: now_ms.saturating_add(u64::from(delay_ms)),
            seq: self.next_seq,
        };
        self.next_seq += 1;
        if self.slots[role as usize].replace(entry).is_some() {
            debug!("timer {:?} re-armed", role);
        }
    }

    /// Disarm `role`.  Returns whether it was pending.
    pub fn cancel(&mut self, role: TimerRole) -> bool {
        self.slots[role as usize].take().is_some()
    }

    pub fn is_armed(&self, role: TimerRole) -> bool {
        self.slots[role as usize].is_some()
    }

    /// Deadline of `role`, if armed.
    #[cfg(test)]
    fn deadline(&self, role: TimerRole) -> Option<u64> {
        self.slots[role as usize].map(|e| e.deadline_ms)
    }

    /// Earliest pending deadline across all roles.
    pub fn next_deadline(&self) -> Option<u64> {
        self.earliest().map(|(_, e)| e.deadline_ms)
    }

    /// Remove and return the role whose deadline comes first, provided it
    /// has passed.  Call repeatedly to drain everything that is due.
    pub fn pop_expired(&mut self, now_ms: u64) -> Option<TimerRole> {
        let (role, entry) = self.earliest()?;
        if entry.deadline_ms > now_ms {
            return None;
        }
        self.slots[role as usize] = None;
        Some(role)
    }

    /// Number of armed roles.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn earliest(&self) -> Option<(TimerRole, Entry)> {
        TimerRole::ALL
            .iter()
            .filter_map(|&role| self.slots[role as usize].map(|e| (role, e)))
            .min_by_key(|(_, e)| (e.deadline_ms, e.seq))
    }
}
