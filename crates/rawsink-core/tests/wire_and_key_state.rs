//! Integration tests for the rawsink-core public API.
//!
//! These tests drive the same path the drain loop takes (tracker, then encoder)
//! and check the resulting datagrams through the receiver-side decoder.

use rawsink_core::{
    decode_message, encode_message, DeviceId, KeyEventType, KeyStateTracker, KeyTransition, KeyboardEvent,
    ScanCode,
};

/// Runs events through a fresh tracker and returns the forwarded ones.
fn forwarded(events: &[KeyboardEvent]) -> Vec<KeyboardEvent> {
    let mut tracker = KeyStateTracker::new();
    events
        .iter()
        .filter(|e| tracker.apply(e) == KeyTransition::Forward)
        .copied()
        .collect()
}

#[test]
fn test_wire_roundtrip_for_every_event_type_and_key() {
    let ids = [DeviceId(0), DeviceId(1), DeviceId(0x0001_0041), DeviceId(u64::MAX)];
    let codes = ScanCode::ALL.iter().copied().chain(std::iter::once(ScanCode::Unknown));

    for code in codes {
        for id in ids {
            for is_key_down in [false, true] {
                let event = KeyboardEvent {
                    source_device_id: id,
                    scan_code: code,
                    is_key_down,
                };

                let bytes = encode_message(&event);
                let msg = decode_message(&bytes).expect("decode must succeed");

                assert_eq!(bytes.len(), 11);
                assert_eq!(msg.to_event(), event);
                assert_eq!(msg.raw_scan_code, code.as_u16());
            }
        }
    }
}

#[test]
fn test_held_key_repeat_forwards_one_down_and_one_up() {
    // Arrange
    let d = DeviceId(7);
    let events = [
        KeyboardEvent::down(d, ScanCode::KeyA),
        KeyboardEvent::down(d, ScanCode::KeyA),
        KeyboardEvent::down(d, ScanCode::KeyA),
        KeyboardEvent::up(d, ScanCode::KeyA),
    ];

    // Act
    let out = forwarded(&events);

    // Assert
    assert_eq!(out, vec![KeyboardEvent::down(d, ScanCode::KeyA), KeyboardEvent::up(d, ScanCode::KeyA)]);
    let types: Vec<KeyEventType> = out
        .iter()
        .map(|e| decode_message(&encode_message(e)).unwrap().event_type)
        .collect();
    assert_eq!(types, vec![KeyEventType::KeyDown, KeyEventType::KeyUp]);
}

#[test]
fn test_devices_are_tracked_independently() {
    let a = DeviceId(1);
    let b = DeviceId(2);
    let events = [
        KeyboardEvent::down(a, ScanCode::ShiftLeft),
        KeyboardEvent::down(b, ScanCode::ShiftLeft),
        KeyboardEvent::down(a, ScanCode::ShiftLeft),
        KeyboardEvent::up(b, ScanCode::ShiftLeft),
        KeyboardEvent::down(b, ScanCode::ShiftLeft),
    ];

    let out = forwarded(&events);

    assert_eq!(
        out,
        vec![
            KeyboardEvent::down(a, ScanCode::ShiftLeft),
            KeyboardEvent::down(b, ScanCode::ShiftLeft),
            KeyboardEvent::up(b, ScanCode::ShiftLeft),
            KeyboardEvent::down(b, ScanCode::ShiftLeft),
        ]
    );
}

#[test]
fn test_press_release_press_forwards_two_downs() {
    let d = DeviceId(3);
    let events = [
        KeyboardEvent::down(d, ScanCode::Space),
        KeyboardEvent::up(d, ScanCode::Space),
        KeyboardEvent::down(d, ScanCode::Space),
    ];

    let out = forwarded(&events);

    assert_eq!(out.len(), 3);
    assert_eq!(out.iter().filter(|e| e.is_key_down).count(), 2);
}

#[test]
fn test_release_without_press_is_still_published() {
    let out = forwarded(&[KeyboardEvent::up(DeviceId(9), ScanCode::Escape)]);
    assert_eq!(out, vec![KeyboardEvent::up(DeviceId(9), ScanCode::Escape)]);
}
