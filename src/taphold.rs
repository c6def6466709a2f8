//! Tap-and-hold drag lock for buttonless operation.
//!
//! A quick tap, a second touch close to it, and a short motionless hold
//! latch a synthetic held left button on the primary finger until the
//! finger lifts. Distance comparisons use squared Euclidean distance.

use crate::{Timestamp, Tunables};
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapHoldState {
    Idle,
    FirstTapDown,
    WaitingSecondTap,
    SecondTapDown,
    DragActive,
}

#[derive(Debug)]
pub struct TapHold {
    state: TapHoldState,
    first_tap_at: Timestamp,
    first_pos: (u32, u32),
    second_tap_at: Timestamp,
    second_pos: (u32, u32),
}

fn distance_squared(a: (u32, u32), b: (u32, u32)) -> u64 {
    let dx = a.0 as i64 - b.0 as i64;
    let dy = a.1 as i64 - b.1 as i64;
    (dx * dx + dy * dy) as u64
}

impl TapHold {
    pub fn new() -> Self {
        TapHold {
            state: TapHoldState::Idle,
            first_tap_at: Timestamp::ZERO,
            first_pos: (0, 0),
            second_tap_at: Timestamp::ZERO,
            second_pos: (0, 0),
        }
    }

    pub fn state(&self) -> TapHoldState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = TapHoldState::Idle;
    }

    /// Advances the machine with the current contact situation. Returns
    /// `true` while the drag lock is active, meaning the caller should
    /// report a held left button on the primary finger.
    pub fn advance(
        &mut self,
        tunables: &Tunables,
        active_fingers: usize,
        primary: Option<(u32, u32)>,
        now: Timestamp,
    ) -> bool {
        use TapHoldState::*;

        let threshold = tunables.tap_distance_threshold as u64;
        let threshold_sq = threshold * threshold;

        match self.state {
            Idle => {
                if active_fingers == 1 {
                    if let Some(pos) = primary {
                        self.state = FirstTapDown;
                        self.first_tap_at = now;
                        self.first_pos = pos;
                    }
                }
            }
            FirstTapDown => {
                if active_fingers == 0 {
                    if now.elapsed_since(self.first_tap_at) < tunables.short_tap_max {
                        self.state = WaitingSecondTap;
                        // Restart the clock for the second-tap window.
                        self.first_tap_at = now;
                    } else {
                        self.state = Idle;
                    }
                } else if active_fingers == 1 {
                    if let Some(pos) = primary {
                        if distance_squared(self.first_pos, pos) > threshold_sq {
                            self.state = Idle;
                        }
                    }
                } else {
                    self.state = Idle;
                }
            }
            WaitingSecondTap => {
                if active_fingers == 1 {
                    if let Some(pos) = primary {
                        let within_time =
                            now.elapsed_since(self.first_tap_at) <= tunables.second_tap_timeout;
                        let within_distance =
                            distance_squared(self.first_pos, pos) <= threshold_sq;
                        if within_time && within_distance {
                            self.state = SecondTapDown;
                            self.second_tap_at = now;
                            self.second_pos = pos;
                        } else {
                            self.state = Idle;
                        }
                    }
                } else if active_fingers > 1
                    || now.elapsed_since(self.first_tap_at) > tunables.second_tap_timeout
                {
                    self.state = Idle;
                }
            }
            SecondTapDown => {
                if active_fingers == 0 {
                    // Released before the hold threshold.
                    self.state = Idle;
                } else if active_fingers == 1 {
                    if let Some(pos) = primary {
                        if now.elapsed_since(self.second_tap_at) >= tunables.hold_minimum {
                            debug!("Drag lock engaged");
                            self.state = DragActive;
                        } else if distance_squared(self.second_pos, pos) > threshold_sq {
                            self.state = Idle;
                        }
                    }
                } else {
                    self.state = Idle;
                }
            }
            DragActive => {
                if active_fingers != 1 {
                    debug!("Drag lock released");
                    self.state = Idle;
                }
            }
        }

        self.state == DragActive
    }
}

impl Default for TapHold {
    fn default() -> Self {
        Self::new()
    }
}
