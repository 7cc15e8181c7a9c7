//! Fixed-size ring of display slots for the most recent pulses.
//!
//! Slots are written round-robin and overwritten unconditionally: a pulse
//! beyond the slot count replaces the oldest one even while it is still
//! visible. The growing-ring radius rendering reads here is unrelated to
//! the step-indexed trace.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::graph::Vec3;

/// One pulse as rendering sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseSlot {
    pub origin: Vec3,
    pub color: Rgb,
    /// Clock reading when the pulse was recorded
    pub start: Duration,
    /// Position in the ring, `0..K`
    pub slot: usize,
}

/// Per-frame reading of one slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SlotView {
    Inactive,
    Active {
        origin: Vec3,
        color: Rgb,
        elapsed_secs: f64,
        /// `elapsed × propagation_speed`
        radius: f64,
        /// `elapsed / lifetime`, in [0, 1)
        normalized_age: f64,
    },
}

impl SlotView {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultiPulseRegistry {
    slots: Vec<Option<PulseSlot>>,
    cursor: usize,
}

impl MultiPulseRegistry {
    /// A registry with `capacity` slots (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)],
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slot the next pulse will overwrite.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Write a pulse into the slot under the cursor and advance it.
    /// Returns the slot index written.
    pub fn record(&mut self, origin: Vec3, color: Rgb, start: Duration) -> usize {
        let slot = self.cursor;
        self.slots[slot] = Some(PulseSlot {
            origin,
            color,
            start,
            slot,
        });
        self.cursor = (self.cursor + 1) % self.slots.len();
        slot
    }

    pub fn slot(&self, index: usize) -> Option<&PulseSlot> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn slots(&self) -> &[Option<PulseSlot>] {
        &self.slots
    }

    /// Slots that have ever been written.
    pub fn populated(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Per-slot views at `now`. A slot is active while its age is below
    /// `lifetime`; a zero lifetime never expires.
    pub fn views(&self, now: Duration, lifetime: Duration, speed: f64) -> Vec<SlotView> {
        self.slots
            .iter()
            .map(|slot| match slot {
                Some(s) => {
                    let elapsed = now.saturating_sub(s.start);
                    if !lifetime.is_zero() && elapsed >= lifetime {
                        return SlotView::Inactive;
                    }
                    let elapsed_secs = elapsed.as_secs_f64();
                    let normalized_age = if lifetime.is_zero() {
                        0.0
                    } else {
                        elapsed_secs / lifetime.as_secs_f64()
                    };
                    SlotView::Active {
                        origin: s.origin,
                        color: s.color,
                        elapsed_secs,
                        radius: elapsed_secs * speed,
                        normalized_age,
                    }
                }
                None => SlotView::Inactive,
            })
            .collect()
    }

    pub fn active_count(&self, now: Duration, lifetime: Duration) -> usize {
        self.views(now, lifetime, 0.0)
            .iter()
            .filter(|v| v.is_active())
            .count()
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.cursor = 0;
    }
}

impl Default for MultiPulseRegistry {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f64) -> Vec3 {
        Vec3::new(x, 0.0, 0.0)
    }

    #[test]
    fn test_wraparound_overwrites_oldest() {
        let mut reg = MultiPulseRegistry::new(3);
        for i in 0..4 {
            reg.record(at(i as f64), Rgb::PURPLE, Duration::from_millis(i * 10));
        }
        assert_eq!(reg.populated(), 3);
        // Request #4 landed in request #1's slot
        assert_eq!(reg.slot(0).unwrap().origin, at(3.0));
        assert_eq!(reg.slot(1).unwrap().origin, at(1.0));
        assert_eq!(reg.slot(2).unwrap().origin, at(2.0));
        assert_eq!(reg.cursor(), 1);
    }

    #[test]
    fn test_record_returns_slot_index() {
        let mut reg = MultiPulseRegistry::new(2);
        assert_eq!(reg.record(at(0.0), Rgb::BLUE, Duration::ZERO), 0);
        assert_eq!(reg.record(at(1.0), Rgb::BLUE, Duration::ZERO), 1);
        assert_eq!(reg.record(at(2.0), Rgb::BLUE, Duration::ZERO), 0);
        assert_eq!(reg.slot(0).unwrap().slot, 0);
    }

    #[test]
    fn test_views_radius_and_age() {
        let mut reg = MultiPulseRegistry::new(3);
        reg.record(at(1.0), Rgb::TURQUOISE, Duration::from_secs(1));

        let views = reg.views(Duration::from_secs(3), Duration::from_secs(4), 1.5);
        assert_eq!(views.len(), 3);
        match &views[0] {
            SlotView::Active {
                origin,
                elapsed_secs,
                radius,
                normalized_age,
                ..
            } => {
                assert_eq!(*origin, at(1.0));
                assert!((elapsed_secs - 2.0).abs() < 1e-12);
                assert!((radius - 3.0).abs() < 1e-12);
                assert!((normalized_age - 0.5).abs() < 1e-12);
            }
            other => panic!("expected active slot, got {other:?}"),
        }
        assert_eq!(views[1], SlotView::Inactive);
    }

    #[test]
    fn test_expired_slot_is_inactive() {
        let mut reg = MultiPulseRegistry::new(3);
        reg.record(at(0.0), Rgb::PURPLE, Duration::ZERO);
        let lifetime = Duration::from_secs(2);
        assert_eq!(reg.active_count(Duration::from_secs(1), lifetime), 1);
        assert_eq!(reg.active_count(Duration::from_secs(2), lifetime), 0);
        // Expiry does not free the slot
        assert_eq!(reg.populated(), 1);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut reg = MultiPulseRegistry::new(0);
        assert_eq!(reg.capacity(), 1);
        reg.record(at(0.0), Rgb::PURPLE, Duration::ZERO);
        reg.record(at(1.0), Rgb::PURPLE, Duration::ZERO);
        assert_eq!(reg.slot(0).unwrap().origin, at(1.0));
    }

    #[test]
    fn test_clear() {
        let mut reg = MultiPulseRegistry::default();
        reg.record(at(0.0), Rgb::PURPLE, Duration::ZERO);
        reg.clear();
        assert_eq!(reg.populated(), 0);
        assert_eq!(reg.cursor(), 0);
    }
}
