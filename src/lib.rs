//! # elantech-ps2
//!
//! A Rust crate that decodes the proprietary byte-stream protocol of ELAN
//! PS/2 touchpads (hardware protocol versions 1-4, including the ETD0180
//! variant) into a stable multi-finger contact model with synthesized
//! button and gesture events.
//!
//! The crate owns everything between the raw byte callback and the
//! downstream multitouch consumer:
//!
//! *   Length-driven byte framing into 4- or 6-byte packets.
//! *   A bounded single-producer/single-consumer packet ring decoupling
//!     interrupt-time framing from serialized processing.
//! *   Per-version packet sanity checks (parity, CRC-dependent constant
//!     bits, debounce noise signatures) and subtype classification.
//! *   Absolute-mode decoding for v1-v4, including the v3 head/tail
//!     two-packet reassembly and the v4 status/head/motion sub-decoders
//!     with finger-slot reassembly.
//! *   Dynamic coordinate-range learning: the believed envelope widens
//!     whenever a decoded coordinate exceeds it, and the published
//!     dimensions follow.
//! *   Middle-button simulation and tap-and-hold drag-lock state machines.
//! *   Frame assembly with transducer labeling, thumb detection, and
//!     quiet-time-after-typing suppression.
//!
//! It does *not* talk to the PS/2 port: detection, register setup, and
//! byte transport belong to the host driver, which feeds bytes in through
//! [`ElanTouchpad::on_byte`] and drains frames with
//! [`ElanTouchpad::drain`].
//!
//! ## Concurrency contract
//!
//! `on_byte` is the interrupt-time producer: it never blocks, allocates,
//! or logs. Everything else (`drain`, `on_button_timer`, reconfiguration,
//! `reset`) must run on one serialized consumer context. The packet ring
//! is the only hand-off point between the two.
//!
//! ## Basic usage
//!
//! ```no_run
//! use elantech_ps2::{ElanTouchpad, HardwareProfile, Timestamp, Tunables};
//!
//! fn main() -> elantech_ps2::Result<()> {
//!     // Values from the firmware/capability/sample queries performed by
//!     // the host driver during detection.
//!     let mut profile = HardwareProfile::from_firmware(0x461f00, [0x30, 0x12, 0x0a], [0, 0, 0])?;
//!     profile.set_range_from_fw_id([0x0b, 0x20, 0xe0])?;
//!
//!     let mut touchpad = ElanTouchpad::new(profile, Tunables::default());
//!
//!     // Interrupt context: one byte at a time.
//!     for byte in [0x10u8, 0x00, 0x00, 0x10, 0x00, 0x00] {
//!         touchpad.on_byte(byte);
//!     }
//!
//!     // Consumer context: drain complete packets into frames.
//!     for frame in touchpad.drain(Timestamp::from_nanos(1_000_000)) {
//!         println!("{} contacts", frame.contact_count());
//!     }
//!     Ok(())
//! }
//! ```

use log::{debug, trace, warn};
use std::time::Duration;

pub mod buttons;
pub mod classify;
pub mod consts;
mod contact;
mod decode;
mod error;
mod frame;
mod packet;
mod profile;
pub mod taphold;

pub use buttons::{ButtonSimState, MiddleButtonSim, SimVerdict};
pub use classify::{classify, PacketKind};
pub use contact::{ContactPoint, FingerId, FingerSlot, FingerSlotTable};
pub use error::{Error, Result};
pub use frame::{ButtonReport, Contact, Frame, TransducerLabel};
pub use packet::FrameResult;
pub use profile::{convert_resolution, Dimensions, HardwareProfile, HardwareVersion};
pub use taphold::{TapHold, TapHoldState};

/// A monotonic instant in nanoseconds since an arbitrary epoch.
///
/// Both state machines compare these against tunable durations; the host
/// supplies them from whatever monotonic clock it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub fn from_nanos(nanos: u64) -> Self {
        Timestamp(nanos)
    }

    pub fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Time elapsed since `earlier`, saturating to zero if out of order.
    pub fn elapsed_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }

    pub fn add(&self, duration: Duration) -> Timestamp {
        Timestamp(self.0.saturating_add(duration.as_nanos() as u64))
    }
}

/// Host-configurable behavior constants, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Tunables {
    /// Frames inside this window after a keystroke are suppressed.
    pub quiet_time_after_typing: Duration,
    /// Window for the two halves of a middle-button chord.
    pub middle_button_timeout: Duration,
    /// Maximum tap/hold movement, in coordinate units (compared squared).
    pub tap_distance_threshold: u32,
    /// Longest touch still counting as the first tap.
    pub short_tap_max: Duration,
    /// How long the second tap may lag the first.
    pub second_tap_timeout: Duration,
    /// How long the second touch must hold still to latch the drag.
    pub hold_minimum: Duration,
    /// Synthesize force clicks for a lone pressed navigation-zone finger.
    pub force_touch_mode: bool,
    /// Height of the clickpad button strip as a percentage of Y travel.
    pub clickpad_button_zone_percent: u32,
}

impl Default for Tunables {
    fn default() -> Self {
        Tunables {
            quiet_time_after_typing: Duration::from_millis(500),
            middle_button_timeout: Duration::from_millis(100),
            tap_distance_threshold: 100,
            short_tap_max: Duration::from_millis(300),
            second_tap_timeout: Duration::from_millis(500),
            hold_minimum: Duration::from_millis(200),
            force_touch_mode: true,
            clickpad_button_zone_percent: 20,
        }
    }
}

/// The decoding pipeline for one touchpad.
///
/// Owns all mutable pipeline state explicitly; no stage reaches outside
/// this struct. See the crate docs for the concurrency contract.
#[derive(Debug)]
pub struct ElanTouchpad {
    pub(crate) profile: HardwareProfile,
    pub(crate) tunables: Tunables,

    pub(crate) framer: packet::ByteFramer,
    pub(crate) ring: packet::PacketRing,
    pub(crate) slots: FingerSlotTable,

    // v3 head/tail reassembly: first finger of a two-finger touch, parked
    // until the tail packet arrives.
    pub(crate) v3_head: (u32, u32),
    // v4 emission deferral: fingers promised by the last status packet and
    // head packets seen since.
    pub(crate) held_fingers: usize,
    pub(crate) head_count: usize,
    pub(crate) last_fingers: usize,
    // Jumpy-cursor workaround counter.
    pub(crate) single_finger_reports: u32,

    /// Raw physical button bits from the most recent packet.
    pub(crate) buttons: u8,
    pub(crate) last_buttons: u8,

    pub(crate) middle_sim: MiddleButtonSim,
    pub(crate) tap_hold: TapHold,

    pub(crate) key_time: Option<Timestamp>,
    pub(crate) ignore_input: bool,
    pub(crate) dimensions_changed: bool,

    pub(crate) rejected: u64,
    pub(crate) reported_overflow: u64,
    pub(crate) pending: Vec<Frame>,
}

impl ElanTouchpad {
    pub fn new(profile: HardwareProfile, tunables: Tunables) -> Self {
        let framer = packet::ByteFramer::new(profile.packet_len());
        let middle_sim = MiddleButtonSim::new(tunables.middle_button_timeout);
        ElanTouchpad {
            profile,
            tunables,
            framer,
            ring: packet::PacketRing::new(),
            slots: FingerSlotTable::new(),
            v3_head: (0, 0),
            held_fingers: 0,
            head_count: 0,
            last_fingers: 0,
            single_finger_reports: 0,
            buttons: 0,
            last_buttons: 0,
            middle_sim,
            tap_hold: TapHold::new(),
            key_time: None,
            ignore_input: false,
            dimensions_changed: false,
            rejected: 0,
            reported_overflow: 0,
            pending: Vec::new(),
        }
    }

    /// Hands one raw byte to the framer; on a complete packet, moves it
    /// into the ring. Interrupt context: never blocks, allocates, or logs.
    pub fn on_byte(&mut self, byte: u8) -> FrameResult {
        match self.framer.push(byte) {
            Some(raw) => {
                self.ring.push(raw);
                FrameResult::PacketReady
            }
            None => FrameResult::Buffering,
        }
    }

    /// Drains every complete packet out of the ring, decoding each into
    /// zero or more frames. Consumer context only.
    pub fn drain(&mut self, now: Timestamp) -> Vec<Frame> {
        while let Some(raw) = self.ring.pop() {
            if self.ignore_input {
                // An external pointer is attached: discard without decoding.
                continue;
            }

            let kind = classify::classify(&self.profile, &raw);
            trace!(
                "Packet {:02X?} classified as {:?}",
                &raw[..self.profile.packet_len()],
                kind
            );

            match kind {
                PacketKind::Unknown => {
                    self.rejected += 1;
                    debug!("Invalid packet dropped ({} total)", self.rejected);
                }
                PacketKind::Debounce => {}
                PacketKind::Trackpoint => self.report_trackpoint(&raw, now),
                PacketKind::Absolute => match self.profile.version {
                    HardwareVersion::V1 => self.report_absolute_v1(&raw, now),
                    HardwareVersion::V2 => self.report_absolute_v2(&raw, now),
                    _ => unreachable!("single-packet absolute is v1/v2 only"),
                },
                PacketKind::Head | PacketKind::Tail => {
                    self.report_absolute_v3(kind, &raw, now)
                }
                PacketKind::Status | PacketKind::HeadV4 | PacketKind::Motion => {
                    self.report_absolute_v4(kind, &raw, now)
                }
            }
        }

        let overflow = self.ring.dropped();
        if overflow > self.reported_overflow {
            warn!(
                "Packet ring overflowed, {} packet(s) lost",
                overflow - self.reported_overflow
            );
            self.reported_overflow = overflow;
        }

        std::mem::take(&mut self.pending)
    }

    /// Delivers a pending middle-button decision whose arm window expired
    /// without further packets. The host schedules this from a timer at
    /// [`button_timer_deadline`](Self::button_timer_deadline), on the same
    /// serialized context as `drain`.
    pub fn on_button_timer(&mut self, now: Timestamp) -> Option<Frame> {
        let mask = self.middle_sim.on_timeout(now)?;
        self.last_buttons = mask;
        Some(Frame {
            timestamp: now,
            contacts: Vec::new(),
            button: Some(ButtonReport {
                buttons: mask,
                dx: 0,
                dy: 0,
                timestamp: now,
            }),
            dimensions: None,
        })
    }

    /// When the middle-button machine next needs a timer callback, if ever.
    pub fn button_timer_deadline(&self) -> Option<Timestamp> {
        self.middle_sim.deadline()
    }

    /// Records a keystroke time; frames within the configured quiet window
    /// after it are suppressed.
    pub fn note_keystroke(&mut self, now: Timestamp) {
        self.key_time = Some(now);
    }

    /// Clears the framer cursor, the ring, all finger slots, and both
    /// gesture machines. Invoked on device reset or resume.
    pub fn reset(&mut self) {
        self.framer.reset();
        self.ring.clear();
        self.slots.clear();
        self.v3_head = (0, 0);
        self.held_fingers = 0;
        self.head_count = 0;
        self.last_fingers = 0;
        self.single_finger_reports = 0;
        self.buttons = 0;
        self.middle_sim.reset();
        self.tap_hold.reset();
        self.pending.clear();
        debug!("Pipeline state reset");
    }

    /// While set, packets are drained and discarded without decoding.
    /// Used when an external pointer device is attached.
    pub fn set_ignore_input(&mut self, ignore: bool) {
        self.ignore_input = ignore;
    }

    pub fn profile(&self) -> &HardwareProfile {
        &self.profile
    }

    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    /// Replaces the tunables. Serialized with packet consumption by the
    /// caller, like every other reconfiguration.
    pub fn set_tunables(&mut self, tunables: Tunables) {
        self.middle_sim = MiddleButtonSim::new(tunables.middle_button_timeout);
        self.tunables = tunables;
    }

    /// Currently published logical/physical dimensions.
    pub fn dimensions(&self) -> Dimensions {
        self.profile.dimensions()
    }

    /// Finger slot table, for diagnostics.
    pub fn slots(&self) -> &FingerSlotTable {
        &self.slots
    }

    /// Packets rejected by sanity checks since construction.
    pub fn rejected_packets(&self) -> u64 {
        self.rejected
    }

    /// Packets lost to ring overflow since construction.
    pub fn overflow_packets(&self) -> u64 {
        self.ring.dropped()
    }
}
