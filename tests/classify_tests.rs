//! Unit tests for packet sanity checks and subtype classification.
//!
//! The protocol has no packet-type header, so these bit patterns are the
//! only thing separating real reports from line noise; every branch of the
//! version/CRC/pressure matrix gets a case.

use elantech_ps2::{classify, HardwareProfile, PacketKind};

fn v1_profile(fw: u32) -> HardwareProfile {
    HardwareProfile::from_firmware(fw, [0x00, 0x00, 0x00], [0, 0, 0]).unwrap()
}

fn v2_profile(fw: u32) -> HardwareProfile {
    HardwareProfile::from_firmware(fw, [0x00, 0x20, 0x10], [0, 0, 0]).unwrap()
}

fn v3_profile(fw: u32) -> HardwareProfile {
    let mut profile = HardwareProfile::from_firmware(fw, [0x00, 0x20, 0x10], [0, 0, 0]).unwrap();
    profile.set_range_from_fw_id([0x5b, 0xb8, 0x00]).unwrap();
    profile
}

fn v4_profile(fw: u32, capabilities: [u8; 3]) -> HardwareProfile {
    let mut profile = HardwareProfile::from_firmware(fw, capabilities, [0, 0, 0]).unwrap();
    profile.set_range_from_fw_id([0x5b, 0xb8, 0x00]).unwrap();
    profile
}

#[test]
fn test_v1_parity_old_placement() {
    // fw < 0x020000: p1 in bit 5, p2 in bit 4.
    let profile = v1_profile(0x010000);

    // bytes 1-3 = [0x80, 0x64, 0x32]: parities 0, 0, 0.
    let valid = [0x08, 0x80, 0x64, 0x32, 0x00, 0x00];
    assert_eq!(classify(&profile, &valid), PacketKind::Absolute);

    // Flip one parity bit: rejected.
    let invalid = [0x08 | 0x20, 0x80, 0x64, 0x32, 0x00, 0x00];
    assert_eq!(classify(&profile, &invalid), PacketKind::Unknown);
}

#[test]
fn test_v1_parity_new_placement() {
    // fw >= 0x020000: p1 in bit 4, p2 in bit 5.
    let profile = v1_profile(0x020022);

    // byte 1 = 0x00 has parity 1, so bit 4 must be set.
    let valid = [0x58, 0x00, 0x64, 0x32, 0x00, 0x00];
    assert_eq!(classify(&profile, &valid), PacketKind::Absolute);

    let invalid = [0x48, 0x00, 0x64, 0x32, 0x00, 0x00];
    assert_eq!(classify(&profile, &invalid), PacketKind::Unknown);
}

#[test]
fn test_v1_parity_disabled_accepts_anything() {
    let mut profile = v1_profile(0x010000);
    profile.parity_enabled = false;
    assert_eq!(
        classify(&profile, &[0xff, 0xff, 0xff, 0xff, 0x00, 0x00]),
        PacketKind::Absolute
    );
}

#[test]
fn test_v2_pressure_flavor() {
    // fw >= 0x020800 reports pressure: one signature for all finger counts.
    let profile = v2_profile(0x020800);
    assert!(profile.reports_pressure);

    assert_eq!(
        classify(&profile, &[0x44, 0x10, 0x00, 0x02, 0x10, 0x00]),
        PacketKind::Absolute
    );
    // Wrong byte 3 low nibble.
    assert_eq!(
        classify(&profile, &[0x44, 0x10, 0x00, 0x03, 0x10, 0x00]),
        PacketKind::Unknown
    );
    // Wrong byte 0 constant bits.
    assert_eq!(
        classify(&profile, &[0x48, 0x10, 0x00, 0x02, 0x10, 0x00]),
        PacketKind::Unknown
    );
}

#[test]
fn test_v2_legacy_flavors() {
    let profile = v2_profile(0x020030);
    assert!(!profile.reports_pressure);

    // Two-finger flavor: byte 0 top bits 10.
    assert_eq!(
        classify(&profile, &[0x8c, 0x40, 0x00, 0x18, 0x40, 0x00]),
        PacketKind::Absolute
    );
    assert_eq!(
        classify(&profile, &[0x84, 0x40, 0x00, 0x18, 0x40, 0x00]),
        PacketKind::Unknown
    );

    // One/three-finger flavor.
    assert_eq!(
        classify(&profile, &[0x7c, 0x0f, 0x00, 0x38, 0x0f, 0x00]),
        PacketKind::Absolute
    );
    assert_eq!(
        classify(&profile, &[0x7c, 0x1f, 0x00, 0x38, 0x0f, 0x00]),
        PacketKind::Unknown
    );
}

#[test]
fn test_v2_debounce() {
    let profile = v2_profile(0x020800);
    assert_eq!(
        classify(&profile, &[0x84, 0xff, 0xff, 0x02, 0xff, 0xff]),
        PacketKind::Debounce
    );
}

#[test]
fn test_v3_debounce_wins_over_head() {
    // The debounce packet shares its byte 0 / byte 3 signature with a head
    // packet and must take precedence.
    let profile = v3_profile(0x050f01);
    assert_eq!(
        classify(&profile, &[0xc4, 0xff, 0xff, 0x02, 0xff, 0xff]),
        PacketKind::Debounce
    );
}

#[test]
fn test_v3_head_tail_no_crc() {
    let profile = v3_profile(0x050f01);
    assert!(!profile.crc_enabled);

    assert_eq!(
        classify(&profile, &[0x84, 0x01, 0x00, 0x02, 0x01, 0x00]),
        PacketKind::Head
    );
    assert_eq!(
        classify(&profile, &[0x8c, 0x02, 0x00, 0x0c, 0x02, 0x00]),
        PacketKind::Tail
    );
    assert_eq!(
        classify(&profile, &[0x80, 0x01, 0x00, 0x06, 0x01, 0x00]),
        PacketKind::Trackpoint
    );
    assert_eq!(
        classify(&profile, &[0x80, 0x01, 0x00, 0x00, 0x01, 0x00]),
        PacketKind::Unknown
    );
}

#[test]
fn test_v3_head_tail_crc() {
    let profile = v3_profile(0x054e01);
    assert!(profile.crc_enabled);

    // With CRC the head/tail split lives entirely in byte 3.
    assert_eq!(
        classify(&profile, &[0x00, 0x01, 0x00, 0x08, 0x01, 0x00]),
        PacketKind::Head
    );
    assert_eq!(
        classify(&profile, &[0x00, 0x01, 0x00, 0x09, 0x01, 0x00]),
        PacketKind::Tail
    );
    assert_eq!(
        classify(&profile, &[0x00, 0x01, 0x00, 0x02, 0x01, 0x00]),
        PacketKind::Unknown
    );
}

#[test]
fn test_v4_subtypes() {
    let profile = v4_profile(0x060f00, [0x00, 0x10, 0x08]);
    assert!(!profile.crc_enabled);

    assert_eq!(
        classify(&profile, &[0x00, 0x03, 0x00, 0x10, 0x00, 0x00]),
        PacketKind::Status
    );
    assert_eq!(
        classify(&profile, &[0x00, 0x01, 0x00, 0x31, 0x01, 0x00]),
        PacketKind::HeadV4
    );
    assert_eq!(
        classify(&profile, &[0x20, 0xfe, 0x02, 0x12, 0x00, 0x00]),
        PacketKind::Motion
    );
}

#[test]
fn test_v4_sanity_rejection() {
    let profile = v4_profile(0x060f00, [0x00, 0x10, 0x08]);

    // byte 3 constant bits wrong.
    assert_eq!(
        classify(&profile, &[0x00, 0x03, 0x00, 0x00, 0x00, 0x00]),
        PacketKind::Unknown
    );
    // byte 0 bit 3 set.
    assert_eq!(
        classify(&profile, &[0x08, 0x03, 0x00, 0x10, 0x00, 0x00]),
        PacketKind::Unknown
    );
}

#[test]
fn test_v4_crc_sanity() {
    let profile = v4_profile(0x064e00, [0x00, 0x10, 0x08]);
    assert!(profile.crc_enabled);

    // CRC flavor only checks byte 3 bit 3; byte 0 bit 3 is data.
    assert_eq!(
        classify(&profile, &[0x08, 0x03, 0x00, 0x00, 0x00, 0x00]),
        PacketKind::Status
    );
    assert_eq!(
        classify(&profile, &[0x08, 0x03, 0x00, 0x08, 0x00, 0x00]),
        PacketKind::Unknown
    );
}

#[test]
fn test_v4_trackpoint_interleave() {
    // Trackpoint packets short-circuit the sanity check, but only when the
    // hardware advertises a trackpoint.
    let with_tp = v4_profile(0x060f00, [0x80, 0x10, 0x08]);
    let without_tp = v4_profile(0x060f00, [0x00, 0x10, 0x08]);

    let packet = [0x30, 0x00, 0x00, 0x06, 0x10, 0x20];
    assert_eq!(classify(&with_tp, &packet), PacketKind::Trackpoint);
    assert_eq!(classify(&without_tp, &packet), PacketKind::Unknown);
}

#[test]
fn test_classification_is_idempotent() {
    let profiles = [
        v1_profile(0x010000),
        v2_profile(0x020800),
        v3_profile(0x050f01),
        v4_profile(0x060f00, [0x80, 0x10, 0x08]),
    ];
    let packets = [
        [0x58, 0x00, 0x64, 0x32, 0x00, 0x00],
        [0xc4, 0xff, 0xff, 0x02, 0xff, 0xff],
        [0x00, 0x03, 0x00, 0x10, 0x00, 0x00],
        [0xa5, 0x5a, 0xa5, 0x5a, 0xa5, 0x5a],
    ];

    for profile in &profiles {
        for packet in &packets {
            let first = classify(profile, packet);
            for _ in 0..32 {
                assert_eq!(classify(profile, packet), first);
            }
        }
    }
}
