//! Packet sanity checking and subtype classification.
//!
//! The protocol carries no explicit packet-type header; the constant-bit
//! sanity check *is* the delimiter between real data and garbage. Every
//! revision reuses bit positions but changes their meaning depending on the
//! CRC and pressure capability flags discovered at detection time, so
//! classification branches on the profile, not the version alone.
//!
//! All functions here are pure over `(&HardwareProfile, bytes)`:
//! classifying the same packet against the same profile always yields the
//! same kind.

use crate::consts;
use crate::profile::{HardwareProfile, HardwareVersion};

/// Decoded subtype of a fixed-length raw packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    /// Single-packet absolute report (v1/v2).
    Absolute,
    /// First packet of a v3 two-finger pair, or a v3 single-finger report.
    Head,
    /// Second packet of a v3 two-finger pair.
    Tail,
    /// v4 finger-presence bitmask.
    Status,
    /// v4 absolute coordinate report for one finger.
    HeadV4,
    /// v4 signed delta report for up to two fingers.
    Motion,
    /// Trackpoint packet interleaved on the same wire.
    Trackpoint,
    /// Known noise signature emitted while a contact settles.
    Debounce,
    /// Failed the sanity check; to be dropped.
    Unknown,
}

/// Classifies one complete packet according to the hardware profile.
pub fn classify(profile: &HardwareProfile, packet: &[u8]) -> PacketKind {
    match profile.version {
        HardwareVersion::V1 => classify_v1(profile, packet),
        HardwareVersion::V2 => classify_v2(profile, packet),
        HardwareVersion::V3 => classify_v3(profile, packet),
        HardwareVersion::V4 => classify_v4(profile, packet),
    }
}

fn classify_v1(profile: &HardwareProfile, packet: &[u8]) -> PacketKind {
    if !profile.parity_enabled || check_parity_v1(profile, packet) {
        PacketKind::Absolute
    } else {
        PacketKind::Unknown
    }
}

/// v1 packets carry three parity bits over bytes 1-3; their placement in
/// byte 0 moved between firmware generations.
fn check_parity_v1(profile: &HardwareProfile, packet: &[u8]) -> bool {
    let (p1, p2) = if profile.fw_version < 0x020000 {
        // byte 0:  D   U  p1  p2   1  p3   R   L
        ((packet[0] & 0x20) >> 5, (packet[0] & 0x10) >> 4)
    } else {
        // byte 0: n1  n0  p2  p1   1  p3   R   L
        ((packet[0] & 0x10) >> 4, (packet[0] & 0x20) >> 5)
    };
    let p3 = (packet[0] & 0x04) >> 2;

    consts::PARITY[packet[1] as usize] == p1
        && consts::PARITY[packet[2] as usize] == p2
        && consts::PARITY[packet[3] as usize] == p3
}

fn classify_v2(profile: &HardwareProfile, packet: &[u8]) -> PacketKind {
    if packet[..6] == consts::DEBOUNCE_V2 {
        return PacketKind::Debounce;
    }
    if !profile.parity_enabled || check_constant_bits_v2(profile, packet) {
        PacketKind::Absolute
    } else {
        PacketKind::Unknown
    }
}

/// v2 hardware has two flavors: modules that report pressure share one set
/// of constant bits across all finger counts, older ones use different
/// constants for 1/3-finger and 2-finger packets.
fn check_constant_bits_v2(profile: &HardwareProfile, packet: &[u8]) -> bool {
    if profile.reports_pressure {
        return (packet[0] & 0x0c) == 0x04 && (packet[3] & 0x0f) == 0x02;
    }

    if (packet[0] & 0xc0) == 0x80 {
        return (packet[0] & 0x0c) == 0x0c && (packet[3] & 0x0e) == 0x08;
    }

    (packet[0] & 0x3c) == 0x3c
        && (packet[1] & 0xf0) == 0x00
        && (packet[3] & 0x3e) == 0x38
        && (packet[4] & 0xf0) == 0x00
}

fn classify_v3(profile: &HardwareProfile, packet: &[u8]) -> PacketKind {
    // Debounce shares its byte 0 / byte 3 signature with a head packet, so
    // it has to be ruled out first.
    if packet[..6] == consts::DEBOUNCE_V3 {
        return PacketKind::Debounce;
    }

    if profile.crc_enabled {
        match packet[3] & 0x09 {
            0x08 => PacketKind::Head,
            0x09 => PacketKind::Tail,
            _ => PacketKind::Unknown,
        }
    } else {
        if (packet[0] & 0x0c) == 0x04 && (packet[3] & 0xcf) == 0x02 {
            return PacketKind::Head;
        }
        if (packet[0] & 0x0c) == 0x0c && (packet[3] & 0xce) == 0x0c {
            return PacketKind::Tail;
        }
        if (packet[3] & 0x0f) == 0x06 {
            return PacketKind::Trackpoint;
        }
        PacketKind::Unknown
    }
}

fn classify_v4(profile: &HardwareProfile, packet: &[u8]) -> PacketKind {
    if profile.has_trackpoint && (packet[3] & 0x0f) == 0x06 {
        return PacketKind::Trackpoint;
    }

    // The constant bits are the same for every v4 packet type but depend on
    // the CRC flag and one known IC-7 sample signature.
    let sane = if profile.crc_enabled {
        (packet[3] & 0x08) == 0x00
    } else if profile.ic_version() == 7 && profile.samples[1] == 0x2a {
        (packet[3] & 0x1c) == 0x10
    } else {
        (packet[0] & 0x08) == 0x00 && (packet[3] & 0x1c) == 0x10
    };

    if !sane {
        return PacketKind::Unknown;
    }

    match packet[3] & 0x03 {
        0 => PacketKind::Status,
        1 => PacketKind::HeadV4,
        2 => PacketKind::Motion,
        _ => PacketKind::Unknown,
    }
}
