//! Replays a captured v4 byte stream through the decoder and prints the
//! resulting frames.
//!
//! Run with `RUST_LOG=debug cargo run --example replay` to watch the
//! classifier and decoders at work.

use elantech_ps2::{ElanTouchpad, HardwareProfile, Timestamp, Tunables};

fn main() -> elantech_ps2::Result<()> {
    env_logger::init();

    // A v4 pad: IC body 6, no CRC, no trackpoint, 3000x1280 units.
    let mut profile = HardwareProfile::from_firmware(0x060f00, [0x00, 0x10, 0x08], [0, 0, 0])?;
    profile.set_range_from_fw_id([0x5b, 0xb8, 0x00])?;
    println!(
        "Profile: {:?}, fw 0x{:06x}, {}x{} units",
        profile.version, profile.fw_version, profile.x_max, profile.y_max
    );

    let mut touchpad = ElanTouchpad::new(profile, Tunables::default());

    // One finger lands at (1000, 780), wanders, then lifts.
    #[rustfmt::skip]
    let capture: &[[u8; 6]] = &[
        [0x00, 0x01, 0x00, 0x10, 0x00, 0x00], // status: finger 0 present
        [0x20, 0x03, 0xe8, 0x31, 0x01, 0xf4], // head: finger 0 at (1000, 780)
        [0x20, 0x05, 0xfd, 0x12, 0x00, 0x00], // motion: +5, +3
        [0x20, 0xfe, 0x02, 0x12, 0x00, 0x00], // motion: -2, -2
        [0x20, 0x0a, 0x00, 0x12, 0x00, 0x00], // motion: +10, 0
        [0x00, 0x00, 0x00, 0x10, 0x00, 0x00], // status: all lifted
    ];

    let mut now = Timestamp::from_nanos(0);
    for packet in capture {
        for &byte in packet {
            touchpad.on_byte(byte);
        }
        now = now.add(std::time::Duration::from_millis(8));
        for frame in touchpad.drain(now) {
            print!("[{:>6}us] {} contact(s)", frame.timestamp.as_nanos() / 1_000, frame.contact_count());
            for contact in &frame.contacts {
                print!("  #{} ({}, {})", contact.slot, contact.x, contact.y);
            }
            if let Some(button) = frame.button {
                print!("  buttons 0x{:02x}", button.buttons);
            }
            println!();
        }
    }

    println!(
        "Done: {} rejected, {} overflowed",
        touchpad.rejected_packets(),
        touchpad.overflow_packets()
    );
    Ok(())
}
