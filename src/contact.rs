//! Per-finger contact state, persisted across packets until the finger lifts.

use crate::consts::MAX_FINGERS;
use crate::error::{Error, Result};

/// A valid finger slot index (0-4). Use `FingerId::new(id)` to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FingerId(u8);

impl FingerId {
    /// Creates a finger id, returning an error if out of slot range.
    pub fn new(id: u8) -> Result<Self> {
        if (id as usize) < MAX_FINGERS {
            Ok(FingerId(id))
        } else {
            Err(Error::FingerIdOutOfRange {
                id,
                max: MAX_FINGERS as u8 - 1,
            })
        }
    }

    /// Decodes the protocol's 3-bit finger field (1-based, 0 meaning
    /// "no finger"). Returns `None` for absent or out-of-range ids, which
    /// callers treat as a dropped packet.
    pub(crate) fn from_packet_field(raw: u8) -> Option<Self> {
        if raw == 0 {
            return None;
        }
        FingerId::new(raw - 1).ok()
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// One sampled contact position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContactPoint {
    pub x: u32,
    pub y: u32,
    pub pressure: u8,
    pub width: u8,
}

/// Persistent state of one tracked contact.
///
/// `previous` advances to `current` only when a new update lands, so the
/// first report after a touch begins can suppress the cursor jump from
/// whatever stale position the slot held.
#[derive(Debug, Clone, Copy, Default)]
pub struct FingerSlot {
    pub touching: bool,
    pub current: ContactPoint,
    pub previous: ContactPoint,
    /// Raw button bits captured with the last update for this finger.
    pub button: u8,
    /// Set when the slot was (re)activated and no absolute position has
    /// landed yet; the next absolute update seeds `previous` too.
    pub(crate) fresh: bool,
}

impl FingerSlot {
    /// Places an absolute position. `fresh` seeds `previous` with the new
    /// point instead of the stale one.
    pub(crate) fn place(&mut self, point: ContactPoint, fresh: bool) {
        self.previous = if fresh || self.fresh {
            point
        } else {
            self.current
        };
        self.current = point;
        self.touching = true;
        self.fresh = false;
    }

    /// Accumulates a relative motion delta. Y grows toward the top of the
    /// pad in the wire format, hence the subtraction.
    pub(crate) fn accumulate(&mut self, dx: i32, dy: i32) {
        self.previous = self.current;
        self.current.x = self.current.x.saturating_add_signed(dx);
        self.current.y = self.current.y.saturating_add_signed(-dy);
        self.fresh = false;
    }

    pub(crate) fn lift(&mut self) {
        self.touching = false;
        self.fresh = false;
    }
}

/// The table of all tracked contacts, indexed by protocol-assigned id.
#[derive(Debug, Default)]
pub struct FingerSlotTable {
    slots: [FingerSlot; MAX_FINGERS],
}

impl FingerSlotTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn slot(&self, id: FingerId) -> &FingerSlot {
        &self.slots[id.index()]
    }

    #[inline]
    pub(crate) fn slot_mut(&mut self, id: FingerId) -> &mut FingerSlot {
        &mut self.slots[id.index()]
    }

    /// Unchecked-by-construction access for the fixed virtual-finger
    /// indices the v1-v3 decoders use.
    #[inline]
    pub(crate) fn at_mut(&mut self, index: usize) -> &mut FingerSlot {
        &mut self.slots[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &FingerSlot)> {
        self.slots.iter().enumerate()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut FingerSlot)> {
        self.slots.iter_mut().enumerate()
    }

    pub fn touching_count(&self) -> usize {
        self.slots.iter().filter(|s| s.touching).count()
    }

    /// Lowest-indexed touching slot, if any.
    pub fn primary(&self) -> Option<(usize, &FingerSlot)> {
        self.slots.iter().enumerate().find(|(_, s)| s.touching)
    }

    pub(crate) fn clear(&mut self) {
        self.slots = [FingerSlot::default(); MAX_FINGERS];
    }
}
