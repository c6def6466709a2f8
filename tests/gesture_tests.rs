//! Button and gesture state machine tests: middle-button simulation,
//! clickpad zones, tap-and-hold drag lock, and quiet-time suppression.

use elantech_ps2::{
    ElanTouchpad, HardwareProfile, MiddleButtonSim, SimVerdict, TapHold, TapHoldState, Timestamp,
    Tunables,
};
use std::time::Duration;

fn at_ms(ms: u64) -> Timestamp {
    Timestamp::from_nanos(ms * 1_000_000)
}

fn feed(pad: &mut ElanTouchpad, packet: &[u8]) {
    for &byte in packet {
        pad.on_byte(byte);
    }
}

fn status(mask: u8, buttons: u8) -> [u8; 6] {
    [buttons, mask & 0x1f, 0x00, 0x10, 0x00, 0x00]
}

fn head(id: u8, x: u16, y_raw: u16, buttons: u8) -> [u8; 6] {
    [
        buttons,
        (x >> 8) as u8 & 0x0f,
        (x & 0xff) as u8,
        ((id + 1) << 5) | 0x11,
        (y_raw >> 8) as u8 & 0x0f,
        (y_raw & 0xff) as u8,
    ]
}

fn motion(id: u8, dx: i8, dy: i8, buttons: u8) -> [u8; 6] {
    [((id + 1) << 5) | buttons, dx as u8, dy as u8, 0x12, 0x00, 0x00]
}

/// v4 pad with a real middle button (no buttonpad); range 3000x1280.
fn middle_button_pad() -> ElanTouchpad {
    let mut profile =
        HardwareProfile::from_firmware(0x0f2100, [0x00, 0x10, 0x08], [0, 0, 0]).unwrap();
    profile.set_range_from_fw_id([0x5b, 0xb8, 0x00]).unwrap();
    assert!(profile.has_middle_button);
    ElanTouchpad::new(profile, Tunables::default())
}

/// ETD0180: a buttonpad with the full 0..4095 envelope.
fn clickpad() -> ElanTouchpad {
    let profile =
        HardwareProfile::from_firmware(0x381f17, [0x00, 0x10, 0x08], [0, 0, 0]).unwrap();
    assert!(profile.is_buttonpad);
    ElanTouchpad::new(profile, Tunables::default())
}

// --- Middle-button simulation ---

#[test]
fn test_middle_click_synthesized_for_single_finger_chord() {
    let mut pad = middle_button_pad();

    feed(&mut pad, &status(0x01, 0x03));
    feed(&mut pad, &head(0, 1000, 500, 0x03));
    let frames = pad.drain(at_ms(10));
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].button.unwrap().buttons, 0x04);
}

#[test]
fn test_middle_click_suppressed_with_navigation_finger() {
    let mut pad = middle_button_pad();

    // Two fingers: one in the navigation zone (small emitted y), one in
    // the button strip. The 0x3 chord collapses to left only.
    feed(&mut pad, &status(0x03, 0x03));
    feed(&mut pad, &head(0, 1000, 800, 0x03)); // y = 480: navigation zone
    feed(&mut pad, &head(1, 1500, 100, 0x03)); // y = 1180: button strip
    let frames = pad.drain(at_ms(10));
    assert_eq!(frames.len(), 1);
    let report = frames[0].button.unwrap();
    assert_eq!(report.buttons, 0x01);
    assert_ne!(report.buttons & 0x04, 0x04);
}

#[test]
fn test_single_button_deferred_then_chord_completes() {
    let mut pad = middle_button_pad();

    // Left alone: deferred, no button report.
    feed(&mut pad, &status(0x01, 0x01));
    feed(&mut pad, &head(0, 1000, 500, 0x01));
    let frames = pad.drain(at_ms(10));
    assert!(frames[0].button.is_none());
    assert!(pad.button_timer_deadline().is_some());

    // Right joins within the window: middle.
    feed(&mut pad, &motion(0, 1, 0, 0x03));
    let frames = pad.drain(at_ms(50));
    assert_eq!(frames[0].button.unwrap().buttons, 0x04);

    // One released: deferred; both released: middle up.
    feed(&mut pad, &motion(0, 1, 0, 0x01));
    let frames = pad.drain(at_ms(60));
    assert!(frames[0].button.is_none());

    feed(&mut pad, &motion(0, 1, 0, 0x00));
    let frames = pad.drain(at_ms(70));
    assert_eq!(frames[0].button.unwrap().buttons, 0x00);
}

#[test]
fn test_quick_single_click_delivers_press_and_release() {
    let mut pad = middle_button_pad();

    feed(&mut pad, &status(0x01, 0x01));
    feed(&mut pad, &head(0, 1000, 500, 0x01));
    pad.drain(at_ms(10));

    // Released before the second button ever arrived.
    feed(&mut pad, &motion(0, 0, 0, 0x00));
    let frames = pad.drain(at_ms(40));
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].button.unwrap().buttons, 0x01);
    assert_eq!(frames[1].button.unwrap().buttons, 0x00);
}

#[test]
fn test_pending_button_delivered_by_timer() {
    let mut pad = middle_button_pad();

    feed(&mut pad, &status(0x01, 0x02));
    feed(&mut pad, &head(0, 1000, 500, 0x02));
    pad.drain(at_ms(10));

    // Too early: the window is still open.
    assert!(pad.on_button_timer(at_ms(50)).is_none());

    // Expired: the pending right button is delivered as-is.
    let frame = pad.on_button_timer(at_ms(150)).expect("timer delivery");
    assert_eq!(frame.button.unwrap().buttons, 0x02);
}

#[test]
fn test_pending_button_delivered_by_late_packet() {
    let mut pad = middle_button_pad();

    feed(&mut pad, &status(0x01, 0x01));
    feed(&mut pad, &head(0, 1000, 500, 0x01));
    pad.drain(at_ms(10));

    // Same button still held well past the window: delivered, no middle.
    feed(&mut pad, &motion(0, 1, 0, 0x01));
    let frames = pad.drain(at_ms(300));
    assert_eq!(frames[0].button.unwrap().buttons, 0x01);
}

#[test]
fn test_sim_noop_absorbs_invalid_combinations() {
    let mut sim = MiddleButtonSim::new(Duration::from_millis(100));

    // Three buttons at once: passed through untouched until release.
    assert_eq!(sim.on_buttons(0x07, 1, false, at_ms(0)), SimVerdict::Emit(0x07));
    assert_eq!(sim.on_buttons(0x01, 1, false, at_ms(10)), SimVerdict::Emit(0x01));
    assert_eq!(sim.on_buttons(0x00, 1, false, at_ms(20)), SimVerdict::Emit(0x00));

    // Back to normal operation afterwards.
    assert_eq!(sim.on_buttons(0x01, 1, false, at_ms(30)), SimVerdict::Defer);
}

#[test]
fn test_sim_chord_without_fingers_passes_through() {
    let mut sim = MiddleButtonSim::new(Duration::from_millis(100));
    // No finger on the pad (trackpoint-style click): no middle synthesis.
    assert_eq!(
        sim.on_buttons(0x03, 0, false, at_ms(0)),
        SimVerdict::Emit(0x03)
    );
}

// --- Clickpad zones ---

#[test]
fn test_clickpad_left_and_right_zones() {
    let mut pad = clickpad();

    // Button strip is the bottom 20% of Y travel (emitted y >= 3276).
    feed(&mut pad, &status(0x01, 0x01));
    feed(&mut pad, &head(0, 1000, 300, 0x01)); // y = 3795, x left of midpoint
    let frames = pad.drain(at_ms(10));
    assert_eq!(frames.last().unwrap().button.unwrap().buttons, 0x01);
    assert!(frames.last().unwrap().contacts[0].button_down);

    feed(&mut pad, &status(0x00, 0x00));
    pad.drain(at_ms(20));

    feed(&mut pad, &status(0x01, 0x01));
    feed(&mut pad, &head(0, 3000, 300, 0x01)); // right of midpoint
    let frames = pad.drain(at_ms(30));
    assert_eq!(frames.last().unwrap().button.unwrap().buttons, 0x02);
}

#[test]
fn test_clickpad_lone_navigation_press_is_force_click() {
    let mut pad = clickpad();

    feed(&mut pad, &status(0x01, 0x01));
    feed(&mut pad, &head(0, 2000, 1500, 0x01)); // y = 2595: navigation zone
    let frames = pad.drain(at_ms(10));
    let contact = frames.last().unwrap().contacts[0];
    assert!(!contact.button_down);
    assert_eq!(contact.pressure, 255);
}

#[test]
fn test_clickpad_two_navigation_fingers_drag_instead_of_force_click() {
    let mut pad = clickpad();

    feed(&mut pad, &status(0x03, 0x01));
    feed(&mut pad, &head(0, 1500, 1500, 0x01));
    feed(&mut pad, &head(1, 2500, 1400, 0x01));
    let frames = pad.drain(at_ms(10));

    // Left held for the drag (reported once, on the change), and no
    // force-click pressure on anyone.
    assert_eq!(frames[0].button.unwrap().buttons, 0x01);
    let frame = frames.last().unwrap();
    assert!(frame.contacts.iter().all(|c| c.pressure != 255));
    assert!(frame.contacts.iter().all(|c| c.button_down));
}

// --- Tap-and-hold drag lock ---

#[test]
fn test_tap_hold_full_lifecycle() {
    let tunables = Tunables::default();
    let mut tap = TapHold::new();

    assert!(!tap.advance(&tunables, 1, Some((500, 500)), at_ms(0)));
    assert_eq!(tap.state(), TapHoldState::FirstTapDown);

    assert!(!tap.advance(&tunables, 0, None, at_ms(100)));
    assert_eq!(tap.state(), TapHoldState::WaitingSecondTap);

    assert!(!tap.advance(&tunables, 1, Some((520, 510)), at_ms(300)));
    assert_eq!(tap.state(), TapHoldState::SecondTapDown);

    // Held in place past the minimum: drag engages exactly once.
    assert!(tap.advance(&tunables, 1, Some((520, 510)), at_ms(600)));
    assert_eq!(tap.state(), TapHoldState::DragActive);
    assert!(tap.advance(&tunables, 1, Some((900, 400)), at_ms(700)));

    // Lift ends the drag and clears the synthetic button.
    assert!(!tap.advance(&tunables, 0, None, at_ms(800)));
    assert_eq!(tap.state(), TapHoldState::Idle);
}

#[test]
fn test_tap_hold_aborts() {
    let tunables = Tunables::default();

    // Excess movement during the first touch.
    let mut tap = TapHold::new();
    tap.advance(&tunables, 1, Some((500, 500)), at_ms(0));
    tap.advance(&tunables, 1, Some((700, 500)), at_ms(50));
    assert_eq!(tap.state(), TapHoldState::Idle);

    // First touch held too long to count as a tap.
    let mut tap = TapHold::new();
    tap.advance(&tunables, 1, Some((500, 500)), at_ms(0));
    tap.advance(&tunables, 0, None, at_ms(400));
    assert_eq!(tap.state(), TapHoldState::Idle);

    // Second tap lands too far away.
    let mut tap = TapHold::new();
    tap.advance(&tunables, 1, Some((500, 500)), at_ms(0));
    tap.advance(&tunables, 0, None, at_ms(100));
    tap.advance(&tunables, 1, Some((800, 500)), at_ms(200));
    assert_eq!(tap.state(), TapHoldState::Idle);

    // Second tap never arrives.
    let mut tap = TapHold::new();
    tap.advance(&tunables, 1, Some((500, 500)), at_ms(0));
    tap.advance(&tunables, 0, None, at_ms(100));
    tap.advance(&tunables, 0, None, at_ms(700));
    assert_eq!(tap.state(), TapHoldState::Idle);

    // Released before the hold minimum.
    let mut tap = TapHold::new();
    tap.advance(&tunables, 1, Some((500, 500)), at_ms(0));
    tap.advance(&tunables, 0, None, at_ms(100));
    tap.advance(&tunables, 1, Some((500, 500)), at_ms(200));
    tap.advance(&tunables, 0, None, at_ms(250));
    assert_eq!(tap.state(), TapHoldState::Idle);

    // Second finger appears mid-drag.
    let mut tap = TapHold::new();
    tap.advance(&tunables, 1, Some((500, 500)), at_ms(0));
    tap.advance(&tunables, 0, None, at_ms(100));
    tap.advance(&tunables, 1, Some((500, 500)), at_ms(200));
    assert!(tap.advance(&tunables, 1, Some((500, 500)), at_ms(500)));
    assert!(!tap.advance(&tunables, 2, Some((500, 500)), at_ms(550)));
    assert_eq!(tap.state(), TapHoldState::Idle);
}

#[test]
fn test_drag_lock_rides_primary_contact_through_pipeline() {
    let mut pad = clickpad();

    // Tap.
    feed(&mut pad, &status(0x01, 0x00));
    feed(&mut pad, &head(0, 2000, 1000, 0x00));
    pad.drain(at_ms(0));
    feed(&mut pad, &status(0x00, 0x00));
    pad.drain(at_ms(100));

    // Touch again close by, then hold still past the minimum.
    feed(&mut pad, &status(0x01, 0x00));
    feed(&mut pad, &head(0, 2000, 1000, 0x00));
    let frames = pad.drain(at_ms(200));
    assert!(!frames.last().unwrap().contacts[0].button_down);

    feed(&mut pad, &motion(0, 1, 0, 0x00));
    let frames = pad.drain(at_ms(500));
    assert!(frames.last().unwrap().contacts[0].button_down);

    // Lift: drag over.
    feed(&mut pad, &status(0x00, 0x00));
    pad.drain(at_ms(600));
    feed(&mut pad, &status(0x01, 0x00));
    feed(&mut pad, &head(0, 2000, 1000, 0x00));
    let frames = pad.drain(at_ms(1500));
    assert!(!frames.last().unwrap().contacts[0].button_down);
}

// --- Quiet window after typing ---

#[test]
fn test_frames_suppressed_inside_quiet_window() {
    let mut pad = middle_button_pad();
    pad.note_keystroke(at_ms(1000));

    feed(&mut pad, &status(0x00, 0x00));
    assert!(pad.drain(at_ms(1100)).is_empty());

    feed(&mut pad, &status(0x00, 0x00));
    assert_eq!(pad.drain(at_ms(1600)).len(), 1);
}
