//! Compile-time configuration: the BLE-MIDI preset and loop timing.  Everything here can be
//! overridden by building a [crate::identity::PeripheralIdentity] by hand.

use core::time::Duration;

use crate::descriptors::UUID;

/// Standard BLE-MIDI service.
pub const BLE_MIDI_SERVICE_UUID: UUID = UUID::Long(0x03b80e5a_ede8_4b33_a751_6ce34ec4c700);

/// Standard BLE-MIDI data I/O characteristic.
pub const BLE_MIDI_IO_CHARACTERISTIC_UUID: UUID =
  UUID::Long(0x7772e5db_3868_4112_a1a9_f2669d106bf3);

/// Name advertised by the BLE-MIDI preset.
pub const DEVICE_NAME: &str = "MIDI Bayan";

/// Largest GAP device name.
pub const MAX_DEVICE_NAME_LEN: usize = 248;

/// MIDI I/O characteristic capacity (default ATT MTU of 23 minus the 3 byte ATT header).
pub const MIDI_IO_MAX_LEN: u16 = 20;

/// Delay between two ticks of the lifecycle.  Short enough that note latency is not audible,
/// long enough to leave the CPU idle most of the time.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);
