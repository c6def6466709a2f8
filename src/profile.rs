//! Hardware identification and the mutable coordinate envelope.
//!
//! A [`HardwareProfile`] is built once from the firmware version query and
//! stays immutable afterwards, with one exception: the coordinate bounds,
//! which the rescaler widens in place whenever a decoded coordinate falls
//! outside the envelope the firmware claimed. Firmware-reported ranges are
//! frequently narrower than the real travel, and clamping to a wrong range
//! produces a dead edge; widening on observation avoids that without the
//! resolution loss a fixed oversized range would cause.

use crate::consts;
use crate::error::{Error, Result};
use log::{debug, info};

/// Protocol generation of the touchpad, selected by the IC body nibble of
/// the firmware version. Gates every decoder and classifier below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareVersion {
    V1,
    V2,
    V3,
    V4,
}

/// Published logical and physical dimensions, recomputed from the profile
/// bounds after every rescale.
///
/// Physical sizes are in hundredths of a millimetre.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub logical_max_x: u32,
    pub logical_max_y: u32,
    pub physical_max_x: u32,
    pub physical_max_y: u32,
}

/// Immutable-after-detection descriptor of one touchpad.
///
/// Created by [`HardwareProfile::from_firmware`]; the range/resolution
/// setters exist for queried values the constructor cannot derive. After
/// construction only the rescaler mutates it, and only the bounds.
#[derive(Debug, Clone)]
pub struct HardwareProfile {
    pub version: HardwareVersion,
    /// 24-bit firmware version from the version query.
    pub fw_version: u32,
    pub x_min: u32,
    pub x_max: u32,
    pub y_min: u32,
    pub y_max: u32,
    /// Resolution in dots/mm.
    pub x_res: u32,
    pub y_res: u32,
    /// Column/row trace counts (v4 only, zero otherwise).
    pub x_traces: u32,
    pub y_traces: u32,
    /// Contact width unit derived from the trace pitch (v4 only).
    pub width: u32,
    /// Buttonless surface that synthesizes clicks from position + touch.
    pub is_buttonpad: bool,
    pub has_trackpoint: bool,
    pub has_middle_button: bool,
    pub reports_pressure: bool,
    /// Selects the alternate v3/v4 packet signatures.
    pub crc_enabled: bool,
    pub parity_enabled: bool,
    /// Firmware misreports coordinates at touch start; discard the first
    /// two single-finger reports after a finger-count change.
    pub jumpy_cursor: bool,
    /// Raw capabilities query result.
    pub capabilities: [u8; 3],
    /// Raw sample query result; byte 1 participates in the v4 sanity check.
    pub samples: [u8; 3],
}

/// `(value from firmware) * 10 + 790 = dpi`, then dpi to dots/mm
/// (`* 10 / 254` to stay in integers).
pub fn convert_resolution(units: u32) -> u32 {
    (units * 10 + 790) * 10 / 254
}

impl HardwareProfile {
    /// Derives a profile from the firmware version query result plus the
    /// capabilities and sample query results.
    ///
    /// Coordinate ranges are filled in where they are fixed or derivable
    /// from the capabilities; v3/v4 ranges come from the firmware-id query
    /// via [`set_range_from_fw_id`](Self::set_range_from_fw_id).
    pub fn from_firmware(fw_version: u32, capabilities: [u8; 3], samples: [u8; 3]) -> Result<Self> {
        let ic_version = (fw_version & 0x0f0000) >> 16;

        // Early modules don't obey the IC body rule.
        let version = if fw_version < 0x020030 || fw_version == 0x020600 {
            HardwareVersion::V1
        } else {
            match ic_version {
                2 | 4 => HardwareVersion::V2,
                5 => HardwareVersion::V3,
                6..=15 => HardwareVersion::V4,
                _ => {
                    return Err(Error::UnknownHardwareVersion {
                        fw_version,
                        ic_version,
                    })
                }
            }
        };

        if version == HardwareVersion::V3 && samples[1] == 0x74 {
            return Err(Error::AbsoluteModeBroken { fw_version });
        }

        let is_buttonpad = (fw_version & 0x001000) != 0;

        let mut profile = HardwareProfile {
            version,
            fw_version,
            x_min: 0,
            x_max: 0,
            y_min: 0,
            y_max: 0,
            x_res: consts::DEFAULT_RESOLUTION,
            y_res: consts::DEFAULT_RESOLUTION,
            x_traces: 0,
            y_traces: 0,
            width: 0,
            is_buttonpad,
            has_trackpoint: (capabilities[0] & 0x80) == 0x80,
            // Newer ICs with the SMBus host-notify signature grew a real
            // middle button, unless the pad is a buttonpad.
            has_middle_button: (fw_version & 0x0f2000) == 0x0f2000 && !is_buttonpad,
            reports_pressure: version != HardwareVersion::V1 && fw_version >= 0x020800,
            crc_enabled: (fw_version & 0x4000) == 0x4000,
            parity_enabled: true,
            jumpy_cursor: fw_version == 0x020022 || fw_version == 0x020600,
            capabilities,
            samples,
        };

        match version {
            HardwareVersion::V1 => {
                profile.x_min = consts::v1::X_MIN;
                profile.x_max = consts::v1::X_MAX;
                profile.y_min = consts::v1::Y_MIN;
                profile.y_max = consts::v1::Y_MAX;
            }
            HardwareVersion::V2 => {
                if consts::v2::FIXED_RANGE_FW.contains(&fw_version) {
                    profile.x_min = consts::v2::X_MIN;
                    profile.x_max = consts::v2::X_MAX;
                    profile.y_min = consts::v2::Y_MIN;
                    profile.y_max = consts::v2::Y_MAX;
                } else {
                    match fw_version {
                        0x040216 => {
                            profile.x_max = 819;
                            profile.y_max = 405;
                        }
                        0x040215 | 0x040219 => {
                            profile.x_max = 900;
                            profile.y_max = 500;
                        }
                        _ => {
                            let i = Self::v2_range_offset(fw_version);
                            profile.x_max = (capabilities[1] as u32).saturating_sub(i) * 64;
                            profile.y_max = (capabilities[2] as u32).saturating_sub(i) * 64;
                        }
                    }
                }
            }
            // Ranges come from the firmware-id query.
            HardwareVersion::V3 | HardwareVersion::V4 => {}
        }

        if fw_version == consts::ETD0180_FW_VERSION {
            profile.apply_etd0180_overrides();
        }

        debug!(
            "Derived profile: version {:?}, fw 0x{:06X}, crc={}, pressure={}, buttonpad={}, trackpoint={}",
            profile.version,
            profile.fw_version,
            profile.crc_enabled,
            profile.reports_pressure,
            profile.is_buttonpad,
            profile.has_trackpoint
        );

        Ok(profile)
    }

    fn v2_range_offset(fw_version: u32) -> u32 {
        if fw_version > 0x020800 && fw_version < 0x020900 {
            1
        } else {
            2
        }
    }

    /// ETD0180 firmware lies about both range and resolution; pin the full
    /// 12-bit travel and the faster-cursor resolution once at detection so
    /// decode never re-derives them.
    fn apply_etd0180_overrides(&mut self) {
        self.x_min = 0;
        self.x_max = consts::etd0180::X_MAX;
        self.y_min = 0;
        self.y_max = consts::etd0180::Y_MAX;
        self.x_res = consts::etd0180::RESOLUTION;
        self.y_res = consts::etd0180::RESOLUTION;
    }

    /// Whether this is the ETD0180 variant.
    pub fn is_etd0180(&self) -> bool {
        self.fw_version == consts::ETD0180_FW_VERSION
    }

    /// IC body nibble of the firmware version.
    pub fn ic_version(&self) -> u32 {
        (self.fw_version & 0x0f0000) >> 16
    }

    /// Fixed packet length for this hardware: 4 bytes for v1, 6 for v2-v4.
    pub fn packet_len(&self) -> usize {
        match self.version {
            HardwareVersion::V1 => consts::PACKET_LEN_V1,
            _ => consts::PACKET_LEN_MT,
        }
    }

    /// Applies the v3/v4 coordinate range from the firmware-id query result
    /// and, on v4, derives trace counts and the width unit from the
    /// capabilities. A no-op on ETD0180, whose envelope is pinned.
    pub fn set_range_from_fw_id(&mut self, param: [u8; 3]) -> Result<()> {
        if self.is_etd0180() {
            return Ok(());
        }

        let x_max = ((0x0f & param[0] as u32) << 8) | param[1] as u32;
        let y_max = ((0xf0 & param[0] as u32) << 4) | param[2] as u32;
        if x_max == 0 || y_max == 0 {
            return Err(Error::InvalidCoordinateRange {
                x_min: 0,
                x_max,
                y_min: 0,
                y_max,
            });
        }
        self.x_min = 0;
        self.y_min = 0;
        self.x_max = x_max;
        self.y_max = y_max;

        if self.version == HardwareVersion::V4 {
            let traces = self.capabilities[1];
            if traces < 2 || (traces as u32) > self.x_max {
                return Err(Error::InvalidTraceCount {
                    traces,
                    x_max: self.x_max,
                });
            }
            self.width = self.x_max / (traces as u32 - 1);
            self.x_traces = traces as u32;

            let traces = self.capabilities[2];
            if traces >= 2 && (traces as u32) <= self.y_max {
                self.y_traces = traces as u32;
            }
        }

        Ok(())
    }

    /// Applies the v4 resolution query result. A no-op on ETD0180.
    pub fn set_resolution_from_query(&mut self, param: [u8; 3]) {
        if self.is_etd0180() {
            return;
        }
        self.x_res = convert_resolution(param[1] as u32 & 0x0f);
        self.y_res = convert_resolution((param[1] as u32 & 0xf0) >> 4);
    }

    /// Refines the v2 envelope for fixed-dpi modules using the firmware-id
    /// and sample query results.
    pub fn set_range_v2_fixed_dpi(&mut self, fw_id: [u8; 3], sample: [u8; 3]) {
        let fixed_dpi = fw_id[1] & 0x10 != 0;
        if (self.fw_version >> 16) == 0x14 && fixed_dpi {
            let i = Self::v2_range_offset(self.fw_version);
            self.x_max = (self.capabilities[1] as u32).saturating_sub(i) * sample[1] as u32 / 2;
            self.y_max = (self.capabilities[2] as u32).saturating_sub(i) * sample[2] as u32 / 2;
        }
    }

    /// Overrides the coordinate envelope with host-supplied bounds.
    pub fn set_range(&mut self, x_min: u32, x_max: u32, y_min: u32, y_max: u32) -> Result<()> {
        if x_min >= x_max || y_min >= y_max {
            return Err(Error::InvalidCoordinateRange {
                x_min,
                x_max,
                y_min,
                y_max,
            });
        }
        self.x_min = x_min;
        self.x_max = x_max;
        self.y_min = y_min;
        self.y_max = y_max;
        Ok(())
    }

    /// Widens the envelope to include `(x, y)`. Returns `true` when a bound
    /// moved, meaning the published dimensions changed too.
    ///
    /// Bounds only ever widen: `x_max`/`y_max` are non-decreasing and
    /// `x_min`/`y_min` non-increasing over the life of the profile.
    pub fn rescale(&mut self, x: u32, y: u32) -> bool {
        let mut widened = false;

        if x > self.x_max {
            self.x_max = x;
            widened = true;
        }
        if x < self.x_min {
            self.x_min = x;
            widened = true;
        }
        if y > self.y_max {
            self.y_max = y;
            widened = true;
        }
        if y < self.y_min {
            self.y_min = y;
            widened = true;
        }

        if widened {
            let dims = self.dimensions();
            info!(
                "Rescaled logical range to {}x{}, physical {}x{}",
                dims.logical_max_x, dims.logical_max_y, dims.physical_max_x, dims.physical_max_y
            );
        }

        widened
    }

    /// Current logical and physical dimensions derived from the envelope.
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            logical_max_x: self.x_max - self.x_min,
            logical_max_y: self.y_max - self.y_min,
            physical_max_x: (self.x_max - self.x_min + 1) * 100 / self.x_res,
            physical_max_y: (self.y_max - self.y_min + 1) * 100 / self.y_res,
        }
    }
}
