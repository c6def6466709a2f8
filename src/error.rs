use thiserror::Error;

/// Errors that can occur while building or reconfiguring a touchpad profile.
///
/// Packet-level problems (failed sanity checks, noise signatures, bad finger
/// ids) are deliberately *not* errors: they are dropped on the consumer path
/// and surfaced only through counters and log output.
#[derive(Error, Debug)]
pub enum Error {
    /// The firmware version maps to no known hardware protocol version.
    #[error("Unknown hardware version for firmware 0x{fw_version:06X} (IC body {ic_version})")]
    UnknownHardwareVersion {
        /// The 24-bit firmware version from the version query.
        fw_version: u32,
        /// The IC body nibble extracted from it.
        ic_version: u32,
    },
    /// This v3 module has broken absolute-mode reporting and must fall back
    /// to the standard PS/2 protocol.
    #[error(
        "Absolute mode unusable on firmware 0x{fw_version:06X} (sample signature 0x74); use standard PS/2 protocol"
    )]
    AbsoluteModeBroken {
        /// The firmware version of the rejected module.
        fw_version: u32,
    },
    /// The capability-reported trace count is implausible for the reported
    /// coordinate range.
    #[error("Invalid trace count {traces} for x_max {x_max}")]
    InvalidTraceCount {
        /// Column trace count from the capabilities query.
        traces: u8,
        /// Maximum X coordinate the range query reported.
        x_max: u32,
    },
    /// A coordinate range is empty or inverted.
    #[error("Invalid coordinate range {x_min}..{x_max} x {y_min}..{y_max}")]
    InvalidCoordinateRange {
        x_min: u32,
        x_max: u32,
        y_min: u32,
        y_max: u32,
    },
    /// Finger id is outside the tracked slot range.
    #[error("Finger id {id} out of range (0-{max})")]
    FingerIdOutOfRange {
        /// The invalid id.
        id: u8,
        /// Highest valid id.
        max: u8,
    },
}

/// Result type alias for profile construction and reconfiguration.
pub type Result<T> = std::result::Result<T, Error>;
