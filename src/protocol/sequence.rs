//! # Sequence Tracking
//!
//! Each message type carries an 8-bit counter that increments by one per
//! frame and wraps `255 -> 0`. Inbound counters are validated against the
//! last one seen for that type; outbound counters are stamped from a
//! separate per-type table.
//!
//! ## Bootstrap
//!
//! The cortex's counters are not known at startup, so the first counter is
//! accepted and adopted. The legacy behavior uses a single first-message
//! flag for all types: only the very first frame is adopted and the other
//! types are compared against an initial counter of 0. That is most likely
//! a defect, and `bootstrap_per_type` seeds every type on its own first
//! frame instead.
//!
//! ## Mismatch
//!
//! A mismatch never stops processing. By default the stored counter is
//! left untouched and the tracker keeps waiting for the expected value,
//! matching the legacy behavior. Opting into
//! `resync_on_mismatch` adopts the received counter instead, so one
//! dropped frame costs exactly one rejection.

use super::frame::{MessageType, MESSAGE_TYPE_COUNT};

/// How the tracker bootstraps and recovers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencePolicy {
    pub bootstrap_per_type: bool,
    pub resync_on_mismatch: bool,
}

impl Default for SequencePolicy {
    fn default() -> Self {
        Self {
            bootstrap_per_type: false,
            resync_on_mismatch: false,
        }
    }
}

/// Result of validating one inbound counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SequenceCheck {
    /// First counter, adopted without comparison
    Bootstrapped,
    /// Counter followed the previous one
    Accepted,
    /// Counter did not follow the previous one
    Mismatch { expected: u8, received: u8 },
    /// Type byte is not a known message type; nothing was recorded
    UntrackedType,
}

impl SequenceCheck {
    /// Whether the frame's counter counts as valid
    pub fn is_valid(&self) -> bool {
        matches!(self, SequenceCheck::Bootstrapped | SequenceCheck::Accepted)
    }
}

/// Inbound counter validation
#[derive(Debug, Clone)]
pub struct SequenceTracker {
    policy: SequencePolicy,
    last: [u8; MESSAGE_TYPE_COUNT],
    seeded: [bool; MESSAGE_TYPE_COUNT],
    first_seen: bool,
}

impl Default for SequenceTracker {
    fn default() -> Self {
        Self::new(SequencePolicy::default())
    }
}

impl SequenceTracker {
    pub fn new(policy: SequencePolicy) -> Self {
        Self {
            policy,
            last: [0; MESSAGE_TYPE_COUNT],
            seeded: [false; MESSAGE_TYPE_COUNT],
            first_seen: false,
        }
    }

    pub fn policy(&self) -> SequencePolicy {
        self.policy
    }

    /// Validate an inbound counter for a raw type byte and record it
    pub fn check(&mut self, message_type: u8, counter: u8) -> SequenceCheck {
        let Some(ty) = MessageType::from_byte(message_type) else {
            return SequenceCheck::UntrackedType;
        };
        let slot = ty.index();

        let bootstrapped = if self.policy.bootstrap_per_type {
            self.seeded[slot]
        } else {
            self.first_seen
        };

        if !bootstrapped {
            self.record(slot, counter);
            return SequenceCheck::Bootstrapped;
        }

        let expected = self.last[slot].wrapping_add(1);
        if counter == expected {
            self.record(slot, counter);
            return SequenceCheck::Accepted;
        }

        if self.policy.resync_on_mismatch {
            self.record(slot, counter);
        }

        SequenceCheck::Mismatch {
            expected,
            received: counter,
        }
    }

    /// Validate an inbound counter, returning only whether it was accepted
    pub fn validate(&mut self, message_type: u8, counter: u8) -> bool {
        self.check(message_type, counter).is_valid()
    }

    /// Last recorded counter for a type
    pub fn last(&self, ty: MessageType) -> u8 {
        self.last[ty.index()]
    }

    fn record(&mut self, slot: usize, counter: u8) {
        self.last[slot] = counter;
        self.seeded[slot] = true;
        self.first_seen = true;
    }
}

/// Outbound counter stamping, one counter per type
#[derive(Debug, Clone, Default)]
pub struct OutboundCounters {
    counters: [u8; MESSAGE_TYPE_COUNT],
}

impl OutboundCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment and return the counter for `ty`, wrapping `255 -> 0`.
    ///
    /// The first value issued for a type is 1.
    pub fn next_outbound(&mut self, ty: MessageType) -> u8 {
        let slot = &mut self.counters[ty.index()];
        *slot = slot.wrapping_add(1);
        *slot
    }
}
