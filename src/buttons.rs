//! Clickpad zone mapping and middle-button simulation.

use crate::contact::FingerSlotTable;
use crate::profile::HardwareProfile;
use crate::{Timestamp, Tunables};
use log::debug;
use std::time::Duration;

pub const BUTTON_LEFT: u8 = 0x01;
pub const BUTTON_RIGHT: u8 = 0x02;
pub const BUTTON_MIDDLE: u8 = 0x04;

/// What a clickpad press resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct ClickpadDecision {
    /// Synthetic physical button mask.
    pub mask: u8,
    /// Slot index whose contact should report force-click pressure instead
    /// of a physical button.
    pub force_click: Option<usize>,
}

/// Resolves a clickpad press from finger positions.
///
/// The lower strip of the pad is the button zone, split at the X midpoint
/// into left/right; everything above is the navigation zone. A lone pressed
/// finger in the navigation zone becomes a force click (when enabled);
/// two or more navigation-zone fingers pressing are a drag, not a force
/// click, so multi-finger gestures don't trigger one accidentally.
pub(crate) fn clickpad_decision(
    profile: &HardwareProfile,
    tunables: &Tunables,
    slots: &FingerSlotTable,
    raw_buttons: u8,
) -> ClickpadDecision {
    if raw_buttons == 0 {
        return ClickpadDecision::default();
    }

    let y_range = profile.y_max - profile.y_min;
    // Y grows downward after the coordinate flip, so the button strip is
    // the high end of the range.
    let zone_top =
        profile.y_min + y_range * (100 - tunables.clickpad_button_zone_percent) / 100;
    let x_mid = profile.x_min + (profile.x_max - profile.x_min) / 2;

    let mut mask = 0u8;
    let mut nav_fingers = 0usize;
    let mut nav_slot = None;

    for (i, slot) in slots.iter() {
        if !slot.touching {
            continue;
        }
        if slot.current.y >= zone_top {
            mask |= if slot.current.x < x_mid {
                BUTTON_LEFT
            } else {
                BUTTON_RIGHT
            };
        } else {
            nav_fingers += 1;
            nav_slot.get_or_insert(i);
        }
    }

    if mask != 0 {
        return ClickpadDecision {
            mask,
            force_click: None,
        };
    }

    match nav_fingers {
        0 => ClickpadDecision {
            mask: raw_buttons & (BUTTON_LEFT | BUTTON_RIGHT),
            force_click: None,
        },
        1 if tunables.force_touch_mode => ClickpadDecision {
            mask: 0,
            force_click: nav_slot,
        },
        // Two or more fingers pressing in the navigation zone: drag.
        _ => ClickpadDecision {
            mask: BUTTON_LEFT,
            force_click: None,
        },
    }
}

/// States of the middle-button debounce machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonSimState {
    NoButtons,
    /// One physical button seen; waiting briefly for the second.
    WaitForTwo,
    /// Both seen within the timeout; synthetic middle is down.
    Middle,
    /// One of the two released; waiting briefly for the other.
    WaitForNone,
    /// Absorbing an invalid or delivered-as-is combination until all
    /// buttons release.
    Noop,
}

/// What the machine wants published after a raw button update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimVerdict {
    /// Publish this mask now.
    Emit(u8),
    /// Publish these two masks in order (press then release).
    EmitPair(u8, u8),
    /// Nothing to publish yet.
    Defer,
}

/// Converts "both physical buttons pressed together" into a synthetic
/// middle button.
///
/// Only a lone finger qualifies: with a second finger resting in the
/// navigation zone the chord collapses to a left click, so two-finger
/// operations don't produce accidental middle clicks. The hold timer must
/// fire even when no packet arrives, so the host drives
/// [`on_timeout`](Self::on_timeout) from a timer re-entering the consumer
/// context.
#[derive(Debug)]
pub struct MiddleButtonSim {
    state: ButtonSimState,
    pending: u8,
    armed_at: Timestamp,
    timeout: Duration,
}

impl MiddleButtonSim {
    pub fn new(timeout: Duration) -> Self {
        MiddleButtonSim {
            state: ButtonSimState::NoButtons,
            pending: 0,
            armed_at: Timestamp::ZERO,
            timeout,
        }
    }

    pub fn state(&self) -> ButtonSimState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = ButtonSimState::NoButtons;
        self.pending = 0;
    }

    /// When the armed timer expires, if it is running.
    pub fn deadline(&self) -> Option<Timestamp> {
        match self.state {
            ButtonSimState::WaitForTwo | ButtonSimState::WaitForNone => {
                Some(self.armed_at.add(self.timeout))
            }
            _ => None,
        }
    }

    fn expired(&self, now: Timestamp) -> bool {
        now.elapsed_since(self.armed_at) >= self.timeout
    }

    /// Feeds the raw physical mask plus finger context; both-buttons chords
    /// resolve according to how many fingers are down and whether one of
    /// them rests in the navigation zone.
    pub fn on_buttons(
        &mut self,
        raw: u8,
        fingers: usize,
        nav_finger: bool,
        now: Timestamp,
    ) -> SimVerdict {
        use ButtonSimState::*;

        let both = BUTTON_LEFT | BUTTON_RIGHT;
        match self.state {
            NoButtons => match raw {
                0 => SimVerdict::Emit(0),
                BUTTON_LEFT | BUTTON_RIGHT => {
                    self.pending = raw;
                    self.armed_at = now;
                    self.state = WaitForTwo;
                    SimVerdict::Defer
                }
                r if r == both => self.resolve_chord(fingers, nav_finger),
                r => {
                    self.state = Noop;
                    SimVerdict::Emit(r)
                }
            },
            WaitForTwo => {
                if raw == both {
                    return self.resolve_chord(fingers, nav_finger);
                }
                if raw == 0 {
                    // Released before the second button arrived: deliver the
                    // queued press and its release.
                    let pending = self.pending;
                    self.state = NoButtons;
                    SimVerdict::EmitPair(pending, 0)
                } else if raw == self.pending {
                    if self.expired(now) {
                        let pending = self.pending;
                        self.state = Noop;
                        SimVerdict::Emit(pending)
                    } else {
                        SimVerdict::Defer
                    }
                } else {
                    self.state = Noop;
                    SimVerdict::Emit(raw)
                }
            }
            Middle => match raw {
                0 => {
                    self.state = NoButtons;
                    SimVerdict::Emit(0)
                }
                BUTTON_LEFT | BUTTON_RIGHT => {
                    self.armed_at = now;
                    self.state = WaitForNone;
                    SimVerdict::Defer
                }
                r if r == both => SimVerdict::Defer,
                r => {
                    self.state = Noop;
                    SimVerdict::Emit(r)
                }
            },
            WaitForNone => match raw {
                0 => {
                    self.state = NoButtons;
                    SimVerdict::Emit(0)
                }
                r if r == both => {
                    self.state = Middle;
                    SimVerdict::Defer
                }
                _ if self.expired(now) => {
                    self.state = Noop;
                    SimVerdict::Emit(0)
                }
                _ => SimVerdict::Defer,
            },
            Noop => {
                if raw == 0 {
                    self.state = NoButtons;
                }
                SimVerdict::Emit(raw)
            }
        }
    }

    fn resolve_chord(&mut self, fingers: usize, nav_finger: bool) -> SimVerdict {
        if fingers == 1 {
            debug!("Both buttons within timeout, synthesizing middle click");
            self.state = ButtonSimState::Middle;
            SimVerdict::Emit(BUTTON_MIDDLE)
        } else if nav_finger {
            // A second finger resting in the navigation zone means this is
            // a two-finger operation, not a deliberate middle chord.
            self.state = ButtonSimState::Noop;
            SimVerdict::Emit(BUTTON_LEFT)
        } else {
            self.state = ButtonSimState::Noop;
            SimVerdict::Emit(BUTTON_LEFT | BUTTON_RIGHT)
        }
    }

    /// Timer callback: delivers the pending single-button state as-is when
    /// the arm window expires without a second event.
    pub fn on_timeout(&mut self, now: Timestamp) -> Option<u8> {
        if !self.expired(now) {
            return None;
        }
        match self.state {
            ButtonSimState::WaitForTwo => {
                let pending = self.pending;
                self.state = ButtonSimState::Noop;
                Some(pending)
            }
            ButtonSimState::WaitForNone => {
                self.state = ButtonSimState::Noop;
                Some(0)
            }
            _ => None,
        }
    }
}
