//! Absolute-mode packet decoders, one per hardware version.
//!
//! v1/v2 hardware reports a single centroid plus a finger count, so
//! multi-finger touches are fanned out into plausible virtual contacts.
//! v3 splits two-finger touches across a head/tail packet pair. v4 reports
//! per-finger state across status/head/motion subtypes and is reassembled
//! through the finger slot table.

use crate::classify::PacketKind;
use crate::consts;
use crate::contact::{ContactPoint, FingerId};
use crate::frame::ButtonReport;
use crate::{ElanTouchpad, Timestamp};
use log::{debug, trace};

/// Virtual contact offsets for fanned-out multi-finger reports.
fn spread_offsets() -> (i32, i32) {
    let h = consts::SPREAD_RADIUS as f64;
    (
        (consts::SPREAD_COS_30 * h) as i32,
        (consts::SPREAD_SIN_30 * h) as i32,
    )
}

fn shifted(value: u32, delta: i32) -> u32 {
    value.saturating_add_signed(delta)
}

impl ElanTouchpad {
    pub(crate) fn report_absolute_v1(&mut self, packet: &[u8], now: Timestamp) {
        let fingers = if self.profile.fw_version < 0x020000 {
            // byte 0:  D   U  p1  p2   1  p3   R   L
            // byte 1:  f   0  th  tw  x9  x8  y9  y8
            (((packet[1] & 0x80) >> 7) + ((packet[1] & 0x30) >> 4)) as usize
        } else {
            // byte 0: n1  n0  p2  p1   1  p3   R   L
            (packet[0] >> 6) as usize
        };

        if self.profile.jumpy_cursor {
            if fingers != 1 {
                self.single_finger_reports = 0;
            } else if self.single_finger_reports < 2 {
                // The first two single-finger reports after a finger-count
                // change misreport coordinates on this firmware.
                self.single_finger_reports += 1;
                trace!("Discarding bogus single-finger report");
                return;
            }
        }

        // byte 2: x7..x0, byte 3: y7..y0, high bits in byte 1
        let x = ((packet[1] as u32 & 0x0c) << 6) | packet[2] as u32;
        let y = self
            .profile
            .y_max
            .saturating_sub(((packet[1] as u32 & 0x03) << 8) | packet[3] as u32);

        self.buttons = packet[0] & 0x03;
        self.place_fanned(fingers, x, y, 0, 0);
        self.last_fingers = fingers;
        self.emit(now);
    }

    pub(crate) fn report_absolute_v2(&mut self, packet: &[u8], now: Timestamp) {
        // byte 0: n1  n0   .   .   .   .   R   L
        let fingers = (packet[0] >> 6) as usize;
        self.buttons = packet[0] & 0x03;

        match fingers {
            1 | 3 => {
                // byte 1: high X bits, byte 2: x7..x0
                let x = ((packet[1] as u32 & 0x0f) << 8) | packet[2] as u32;
                // byte 4: high Y bits, byte 5: y7..y0
                let y = self
                    .profile
                    .y_max
                    .saturating_sub(((packet[4] as u32 & 0x0f) << 8) | packet[5] as u32);
                let (pressure, width) = self.pressure_width(packet);
                self.place_fanned(fingers, x, y, pressure, width);
            }
            2 => {
                // Each finger is reported separately at a quarter of the
                // usual resolution, with the extra bits borrowed from
                // bytes 0 and 3.
                let x1 = (((packet[0] as u32 & 0x10) << 4) | packet[1] as u32) << 2;
                let y1 = self
                    .profile
                    .y_max
                    .saturating_sub((((packet[0] as u32 & 0x20) << 3) | packet[2] as u32) << 2);
                let x2 = (((packet[3] as u32 & 0x10) << 4) | packet[4] as u32) << 2;
                let y2 = self
                    .profile
                    .y_max
                    .saturating_sub((((packet[3] as u32 & 0x20) << 3) | packet[5] as u32) << 2);
                self.place_pair(x1, y1, x2, y2);
            }
            _ => self.clear_fanned_slots(),
        }

        self.last_fingers = fingers;
        self.emit(now);
    }

    pub(crate) fn report_absolute_v3(&mut self, kind: PacketKind, packet: &[u8], now: Timestamp) {
        let fingers = (packet[0] >> 6) as usize;
        self.buttons = packet[0] & 0x03;

        match fingers {
            1 | 3 => {
                let x = ((packet[1] as u32 & 0x0f) << 8) | packet[2] as u32;
                let y_raw = ((packet[4] as u32 & 0x0f) << 8) | packet[5] as u32;
                self.rescale(x, y_raw);
                let y = self.profile.y_max - y_raw;
                let (pressure, width) = self.pressure_width(packet);
                self.place_fanned(fingers, x, y, pressure, width);
            }
            2 => {
                if kind == PacketKind::Head {
                    // First finger only; stash it and wait for the tail.
                    let x = ((packet[1] as u32 & 0x0f) << 8) | packet[2] as u32;
                    let y = self
                        .profile
                        .y_max
                        .saturating_sub(((packet[4] as u32 & 0x0f) << 8) | packet[5] as u32);
                    self.v3_head = (x, y);
                    return;
                }

                let (x1, y1) = self.v3_head;
                let x2 = ((packet[1] as u32 & 0x0f) << 8) | packet[2] as u32;
                let y2_raw = ((packet[4] as u32 & 0x0f) << 8) | packet[5] as u32;
                self.rescale(x2, y2_raw);
                let y2 = self.profile.y_max - y2_raw;
                self.place_pair(x1, y1, x2, y2);
            }
            _ => self.clear_fanned_slots(),
        }

        self.last_fingers = fingers;
        self.emit(now);
    }

    pub(crate) fn report_absolute_v4(&mut self, kind: PacketKind, packet: &[u8], now: Timestamp) {
        match kind {
            PacketKind::Status => self.process_status_v4(packet, now),
            PacketKind::HeadV4 => self.process_head_v4(packet, now),
            PacketKind::Motion => self.process_motion_v4(packet, now),
            _ => unreachable!("v4 dispatch only sees status/head/motion"),
        }
    }

    /// Status: a bitmask of finger-present bits. Clears lifted slots and
    /// records how many head packets to expect before emitting; with no
    /// fingers left there is nothing to wait for, so it emits immediately.
    fn process_status_v4(&mut self, packet: &[u8], now: Timestamp) {
        self.buttons = packet[0] & 0x03;
        let mask = packet[1] & 0x1f;

        for (i, slot) in self.slots.iter_mut() {
            if mask & (1 << i) == 0 {
                if slot.touching {
                    trace!("Finger {} lifted", i);
                }
                slot.lift();
            } else {
                if !slot.touching {
                    slot.fresh = true;
                }
                slot.touching = true;
            }
        }

        self.held_fingers = mask.count_ones() as usize;
        self.head_count = 0;
        self.last_fingers = self.held_fingers;

        if self.held_fingers == 0 {
            self.emit(now);
        }
    }

    /// Head: one finger's absolute coordinate, pressure, and trace width.
    fn process_head_v4(&mut self, packet: &[u8], now: Timestamp) {
        let Some(id) = FingerId::from_packet_field((packet[3] & 0xe0) >> 5) else {
            debug!("Head packet with invalid finger id dropped");
            self.rejected += 1;
            return;
        };

        self.buttons = packet[0] & 0x03;

        let x = ((packet[1] as u32 & 0x0f) << 8) | packet[2] as u32;
        let y_raw = ((packet[4] as u32 & 0x0f) << 8) | packet[5] as u32;
        self.rescale(x, y_raw);
        let y = self.profile.y_max - y_raw;

        let pressure = (packet[1] & 0xf0) | ((packet[4] & 0xf0) >> 4);
        let width = (packet[0] & 0xf0) >> 4;

        let buttons = self.buttons;
        let slot = self.slots.slot_mut(id);
        slot.button = buttons;
        slot.place(
            ContactPoint {
                x,
                y,
                pressure,
                width,
            },
            false,
        );

        if self.profile.is_etd0180() {
            // This firmware delivers almost exclusively motion packets; a
            // head is rare and waiting for a full head count would stall.
            self.head_count = 0;
            self.emit(now);
            return;
        }

        self.head_count += 1;
        if self.head_count >= self.held_fingers {
            self.head_count = 0;
            self.emit(now);
        }
    }

    /// Motion: signed 8-bit deltas for up to two fingers at once; the
    /// weight flag scales the deltas for fast movements.
    fn process_motion_v4(&mut self, packet: &[u8], now: Timestamp) {
        let Some(id) = FingerId::from_packet_field((packet[0] & 0xe0) >> 5) else {
            debug!("Motion packet with invalid primary finger id dropped");
            self.rejected += 1;
            return;
        };
        let sid = match (packet[3] & 0xe0) >> 5 {
            0 => None,
            raw => match FingerId::new(raw - 1) {
                Ok(sid) => Some(sid),
                Err(_) => {
                    debug!("Motion packet with invalid secondary finger id dropped");
                    self.rejected += 1;
                    return;
                }
            },
        };

        self.buttons = packet[0] & 0x03;
        let weight = if packet[0] & 0x10 != 0 {
            consts::MOTION_WEIGHT
        } else {
            1
        };

        let delta_x1 = (packet[1] as i8) as i32;
        let delta_y1 = (packet[2] as i8) as i32;
        let delta_x2 = (packet[4] as i8) as i32;
        let delta_y2 = (packet[5] as i8) as i32;

        let buttons = self.buttons;
        let slot = self.slots.slot_mut(id);
        slot.button = buttons;
        slot.accumulate(delta_x1 * weight, delta_y1 * weight);

        if let Some(sid) = sid {
            let slot = self.slots.slot_mut(sid);
            slot.button = buttons;
            slot.accumulate(delta_x2 * weight, delta_y2 * weight);
        }

        self.emit(now);
    }

    /// Trackpoint packets interleave on the same wire; x and y are 9-bit
    /// two's complement with the sign bits in byte 0 and their inverses in
    /// bytes 1-3, which the signature check verifies.
    pub(crate) fn report_trackpoint(&mut self, packet: &[u8], now: Timestamp) {
        let signature =
            u32::from_le_bytes([packet[0], packet[1], packet[2], packet[3]]) & !0x07u32;
        if !consts::TRACKPOINT_SIGNATURES.contains(&signature) {
            debug!("Unexpected trackpoint packet skipped");
            self.rejected += 1;
            return;
        }

        // Inverted sign bits live in the top of bytes 1 and 2; xoring them
        // back restores the 9-bit two's complement. The y formula also
        // flips the sign, which the wire reports opposite to a relative
        // movement.
        let dx = packet[4] as i32 - (((packet[1] ^ 0x80) as i32) << 1);
        let dy = (((packet[2] ^ 0x80) as i32) << 1) - packet[5] as i32;

        self.push_button_frame(ButtonReport {
            buttons: packet[0] & 0x07,
            dx,
            dy,
            timestamp: now,
        });
    }

    fn pressure_width(&self, packet: &[u8]) -> (u8, u8) {
        if self.profile.reports_pressure {
            (
                (packet[1] & 0xf0) | ((packet[4] & 0xf0) >> 4),
                ((packet[0] & 0x30) >> 2) | ((packet[3] & 0x30) >> 4),
            )
        } else {
            (0, 0)
        }
    }

    fn rescale(&mut self, x: u32, y: u32) {
        if self.profile.rescale(x, y) {
            self.dimensions_changed = true;
        }
    }

    fn clear_fanned_slots(&mut self) {
        for (i, slot) in self.slots.iter_mut() {
            if i < 3 {
                slot.lift();
            }
        }
    }

    /// Places `fingers` virtual contacts around the reported centroid.
    fn place_fanned(&mut self, fingers: usize, x: u32, y: u32, pressure: u8, width: u8) {
        self.clear_fanned_slots();
        let (dx, dy) = spread_offsets();
        let h = consts::SPREAD_RADIUS;
        let buttons = self.buttons;
        let point = |x, y| ContactPoint {
            x,
            y,
            pressure,
            width,
        };

        match fingers {
            1 => {
                let fresh = self.last_fingers != 1 && self.last_fingers != 2;
                let slot = self.slots.at_mut(0);
                slot.button = buttons;
                slot.place(point(x, y), fresh);
            }
            2 => {
                // Only v1 lands here; v2/v3 report both fingers for real.
                let fresh = self.last_fingers != 2;
                let positions = [(x, shifted(y, -h)), (shifted(x, dx), shifted(y, dy))];
                for (i, (px, py)) in positions.into_iter().enumerate() {
                    let slot = self.slots.at_mut(i);
                    slot.button = buttons;
                    slot.place(point(px, py), fresh);
                }
            }
            3 => {
                let fresh = self.last_fingers != 3;
                let positions = [
                    (x, shifted(y, -h)),
                    (shifted(x, -dx), shifted(y, dy)),
                    (shifted(x, dx), shifted(y, dy)),
                ];
                for (i, (px, py)) in positions.into_iter().enumerate() {
                    let slot = self.slots.at_mut(i);
                    slot.button = buttons;
                    slot.place(point(px, py), fresh);
                }
            }
            _ => {}
        }
    }

    /// Places two independently reported contacts (v2/v3 two-finger).
    fn place_pair(&mut self, x1: u32, y1: u32, x2: u32, y2: u32) {
        self.clear_fanned_slots();
        let buttons = self.buttons;
        let fresh0 = self.last_fingers != 1 && self.last_fingers != 2;
        let fresh1 = self.last_fingers != 2;

        let slot = self.slots.at_mut(0);
        slot.button = buttons;
        slot.place(
            ContactPoint {
                x: x1,
                y: y1,
                ..Default::default()
            },
            fresh0,
        );

        let slot = self.slots.at_mut(1);
        slot.button = buttons;
        slot.place(
            ContactPoint {
                x: x2,
                y: y2,
                ..Default::default()
            },
            fresh1,
        );
    }
}
