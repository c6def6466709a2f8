//! Frame assembly: turning the slot table plus button state into the
//! downstream-facing event.

use crate::buttons::{self, SimVerdict};
use crate::profile::Dimensions;
use crate::{ElanTouchpad, Timestamp};

/// Transducer identity assigned to each contact, in slot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransducerLabel {
    Index,
    Middle,
    Ring,
    Thumb,
    Little,
}

fn label_for(position: usize) -> TransducerLabel {
    match position {
        0 => TransducerLabel::Index,
        1 => TransducerLabel::Middle,
        2 => TransducerLabel::Ring,
        3 => TransducerLabel::Thumb,
        4 => TransducerLabel::Little,
        _ => TransducerLabel::Index,
    }
}

/// One emitted contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    /// Protocol slot the contact came from.
    pub slot: u8,
    pub x: u32,
    pub y: u32,
    pub pressure: u8,
    pub width: u8,
    /// Synthetic or physical button held by this finger.
    pub button_down: bool,
    pub label: TransducerLabel,
}

/// Aggregate physical button / trackpoint event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonReport {
    pub buttons: u8,
    pub dx: i32,
    pub dy: i32,
    pub timestamp: Timestamp,
}

/// The committed multi-finger frame handed to the downstream consumer.
///
/// Built fresh for each emission; repeated identical frames are safe to
/// deliver. `dimensions` is set when a rescale widened the coordinate
/// envelope since the previous frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub timestamp: Timestamp,
    pub contacts: Vec<Contact>,
    pub button: Option<ButtonReport>,
    pub dimensions: Option<Dimensions>,
}

impl Frame {
    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }
}

impl ElanTouchpad {
    /// Commits the current slot table as one frame, running the gesture
    /// machines and button logic on the way out.
    pub(crate) fn emit(&mut self, now: Timestamp) {
        // The drag-lock machine runs before quiet-time suppression so its
        // timing survives typing bursts.
        let active = self.slots.touching_count();
        let primary = self
            .slots
            .primary()
            .map(|(_, slot)| (slot.current.x, slot.current.y));
        let drag_active = self
            .tap_hold
            .advance(&self.tunables, active, primary, now);

        if let Some(key_time) = self.key_time {
            if now.elapsed_since(key_time) < self.tunables.quiet_time_after_typing {
                // Palm or typing interference: drop the whole frame.
                return;
            }
        }

        let decision = if self.profile.is_buttonpad {
            buttons::clickpad_decision(&self.profile, &self.tunables, &self.slots, self.buttons)
        } else {
            Default::default()
        };

        // Zone threshold for the middle-button chord gate: any touching
        // finger above the button strip counts as a navigation finger.
        let nav_finger = self.has_navigation_finger();

        let mut contacts = Vec::with_capacity(active);
        for (i, slot) in self.slots.iter() {
            if !slot.touching {
                continue;
            }

            let force_click = decision.force_click == Some(i);
            let button_down = if force_click {
                false
            } else if drag_active && contacts.is_empty() {
                // Primary finger carries the drag lock.
                true
            } else if self.profile.is_buttonpad {
                decision.mask != 0 && slot.button != 0
            } else {
                slot.button != 0
            };

            contacts.push(Contact {
                slot: i as u8,
                x: slot.current.x,
                y: slot.current.y,
                pressure: if force_click { 255 } else { slot.current.pressure },
                width: if force_click { 10 } else { slot.current.width },
                button_down,
                label: label_for(contacts.len()),
            });
        }

        relabel_thumb(&mut contacts);

        let dimensions = if self.dimensions_changed {
            self.dimensions_changed = false;
            Some(self.profile.dimensions())
        } else {
            None
        };

        // Button delivery: at most two masks (a deferred press plus its
        // release can arrive together).
        let mut masks: [Option<u8>; 2] = [None, None];
        if self.profile.is_buttonpad {
            if contacts.is_empty() || decision.mask != self.last_buttons {
                masks[0] = Some(decision.mask);
            }
        } else {
            let raw = self.buttons & 0x03;
            if self.profile.has_middle_button {
                match self.middle_sim.on_buttons(raw, active, nav_finger, now) {
                    SimVerdict::Emit(mask) => {
                        if contacts.is_empty() || mask != self.last_buttons {
                            masks[0] = Some(mask);
                        }
                    }
                    SimVerdict::EmitPair(press, release) => {
                        masks = [Some(press), Some(release)];
                    }
                    SimVerdict::Defer => {}
                }
            } else if contacts.is_empty() || raw != self.last_buttons {
                masks[0] = Some(raw);
            }
        }

        let button_of = |mask: u8| ButtonReport {
            buttons: mask,
            dx: 0,
            dy: 0,
            timestamp: now,
        };

        let frame = Frame {
            timestamp: now,
            contacts,
            button: masks[0].map(button_of),
            dimensions,
        };

        if let Some(mask) = masks[0] {
            self.last_buttons = mask;
        }

        match masks[1] {
            None => self.pending.push(frame),
            Some(release) => {
                let mut follow_up = frame.clone();
                self.pending.push(frame);
                follow_up.button = Some(button_of(release));
                follow_up.dimensions = None;
                self.last_buttons = release;
                self.pending.push(follow_up);
            }
        }
    }

    /// Emits a frame that carries only a button report (trackpoint
    /// passthrough, middle-button timer delivery).
    pub(crate) fn push_button_frame(&mut self, report: ButtonReport) {
        self.last_buttons = report.buttons;
        self.pending.push(Frame {
            timestamp: report.timestamp,
            contacts: Vec::new(),
            button: Some(report),
            dimensions: None,
        });
    }

    fn has_navigation_finger(&self) -> bool {
        let y_range = self.profile.y_max - self.profile.y_min;
        let zone_top = self.profile.y_min
            + y_range * (100 - self.tunables.clickpad_button_zone_percent) / 100;
        self.slots
            .iter()
            .any(|(_, slot)| slot.touching && slot.current.y < zone_top)
    }
}

/// With four or more contacts, the physically lowest finger is most likely
/// the thumb; relabeling it improves pinch/spread recognition downstream.
fn relabel_thumb(contacts: &mut [Contact]) {
    if contacts.len() < 4 {
        return;
    }

    let mut lowest = 0;
    let mut current_thumb = 0;
    for (i, contact) in contacts.iter().enumerate() {
        if contact.y > contacts[lowest].y {
            lowest = i;
        }
        if contact.label == TransducerLabel::Thumb {
            current_thumb = i;
        }
    }

    contacts[current_thumb].label = contacts[lowest].label;
    contacts[lowest].label = TransducerLabel::Thumb;
}
