//! Per-device key state tracking.
//!
//! # Overview (for beginners)
//!
//! When a key is held, the OS keeps re-sending "key down" reports for it
//! (key-repeat).  Receivers only care about the *logical* transitions, so the
//! tracker remembers which keys are currently down on each keyboard and
//! suppresses a down-event for a key that is already down.
//!
//! Key-up events are always forwarded, even for a key the tracker never saw go
//! down.  That way a receiver that missed the original press still learns the
//! key was released.
//!
//! The tracker has exactly one owner (the drain loop) and therefore needs no
//! locking.

use std::collections::{HashMap, HashSet};

use crate::domain::device::DeviceId;
use crate::domain::event::KeyboardEvent;
use crate::keymap::ScanCode;

/// What the caller should do with an event after the tracker has seen it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum KeyTransition {
    /// The event is a logical transition and must be published.
    Forward,
    /// The event is a key-repeat and must be dropped.
    Suppress,
}

/// Tracks which scan codes are currently held on each device.
#[derive(Debug, Default)]
pub struct KeyStateTracker {
    held: HashMap<DeviceId, HashSet<ScanCode>>,
}

impl KeyStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one event and reports whether it should be forwarded.
    ///
    /// - down while up: the key becomes down, [`KeyTransition::Forward`]
    /// - down while down: no change, [`KeyTransition::Suppress`]
    /// - up in any state: the key becomes up, [`KeyTransition::Forward`]
    pub fn apply(&mut self, event: &KeyboardEvent) -> KeyTransition {
        if event.is_key_down {
            let newly_pressed = self
                .held
                .entry(event.source_device_id)
                .or_default()
                .insert(event.scan_code);
            if newly_pressed {
                KeyTransition::Forward
            } else {
                KeyTransition::Suppress
            }
        } else {
            if let Some(keys) = self.held.get_mut(&event.source_device_id) {
                keys.remove(&event.scan_code);
                if keys.is_empty() {
                    self.held.remove(&event.source_device_id);
                }
            }
            KeyTransition::Forward
        }
    }

    /// Returns `true` if `scan_code` is currently held on `device`.
    pub fn is_down(&self, device: DeviceId, scan_code: ScanCode) -> bool {
        self.held
            .get(&device)
            .is_some_and(|keys| keys.contains(&scan_code))
    }

    /// Returns the number of devices with at least one key held.
    pub fn active_devices(&self) -> usize {
        self.held.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KBD: DeviceId = DeviceId(0x0001_0041);

    #[test]
    fn test_first_down_is_forwarded() {
        // Arrange
        let mut tracker = KeyStateTracker::new();

        // Act
        let result = tracker.apply(&KeyboardEvent::down(KBD, ScanCode::KeyA));

        // Assert
        assert_eq!(result, KeyTransition::Forward);
        assert!(tracker.is_down(KBD, ScanCode::KeyA));
    }

    #[test]
    fn test_repeated_down_is_suppressed() {
        let mut tracker = KeyStateTracker::new();
        let _ = tracker.apply(&KeyboardEvent::down(KBD, ScanCode::KeyA));

        let result = tracker.apply(&KeyboardEvent::down(KBD, ScanCode::KeyA));

        assert_eq!(result, KeyTransition::Suppress);
        assert!(tracker.is_down(KBD, ScanCode::KeyA));
    }

    #[test]
    fn test_up_for_never_pressed_key_is_forwarded() {
        let mut tracker = KeyStateTracker::new();

        let result = tracker.apply(&KeyboardEvent::up(KBD, ScanCode::KeyB));

        assert_eq!(result, KeyTransition::Forward);
        assert!(!tracker.is_down(KBD, ScanCode::KeyB));
        assert_eq!(tracker.active_devices(), 0);
    }

    #[test]
    fn test_up_clears_key_and_drops_empty_device_entry() {
        let mut tracker = KeyStateTracker::new();
        let _ = tracker.apply(&KeyboardEvent::down(KBD, ScanCode::ShiftLeft));
        let _ = tracker.apply(&KeyboardEvent::down(KBD, ScanCode::KeyA));

        let _ = tracker.apply(&KeyboardEvent::up(KBD, ScanCode::KeyA));
        assert!(!tracker.is_down(KBD, ScanCode::KeyA));
        assert!(tracker.is_down(KBD, ScanCode::ShiftLeft));
        assert_eq!(tracker.active_devices(), 1);

        let _ = tracker.apply(&KeyboardEvent::up(KBD, ScanCode::ShiftLeft));
        assert!(!tracker.is_down(KBD, ScanCode::ShiftLeft));
        assert_eq!(tracker.active_devices(), 0);
    }

    #[test]
    fn test_unknown_scan_code_is_tracked_like_any_other_key() {
        let mut tracker = KeyStateTracker::new();

        assert_eq!(
            tracker.apply(&KeyboardEvent::down(KBD, ScanCode::Unknown)),
            KeyTransition::Forward
        );
        assert_eq!(
            tracker.apply(&KeyboardEvent::down(KBD, ScanCode::Unknown)),
            KeyTransition::Suppress
        );
    }

    #[test]
    fn test_active_devices_counts_devices_with_held_keys() {
        let mut tracker = KeyStateTracker::new();
        let _ = tracker.apply(&KeyboardEvent::down(KBD, ScanCode::KeyA));
        let _ = tracker.apply(&KeyboardEvent::down(KBD, ScanCode::KeyB));
        let _ = tracker.apply(&KeyboardEvent::down(DeviceId(2), ScanCode::KeyA));

        assert_eq!(tracker.active_devices(), 2);
    }
}
