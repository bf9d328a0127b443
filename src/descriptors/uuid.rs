use core::fmt::{Display, Formatter};

/// Bluetooth base UUID `00000000-0000-1000-8000-00805f9b34fb`, used to expand SIG assigned
/// 16-bit values into their full 128-bit form.
const BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_0080_5f9b_34fb;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum UUID {
  /// For use only with SIG defined services (i.e. registered and publicly well known services).
  Short(u16),

  /// All other BLE UUIDs must be 128-bit
  Long(u128),
}

impl UUID {
  pub fn as_u128(&self) -> u128 {
    match *self {
      UUID::Short(u) => BASE_UUID | (u128::from(u) << 96),
      UUID::Long(u) => u,
    }
  }

  /// Number of bytes this UUID occupies on the air.
  pub fn encoded_len(&self) -> usize {
    match self {
      UUID::Short(_) => 2,
      UUID::Long(_) => 16,
    }
  }

  /// Append the little-endian wire encoding of this UUID.
  pub fn push_into<const N: usize>(&self, out: &mut heapless::Vec<u8, N>) -> Result<(), ()> {
    match *self {
      UUID::Short(u) => out.extend_from_slice(&u.to_le_bytes()),
      UUID::Long(u) => out.extend_from_slice(&u.to_le_bytes()),
    }
  }
}

impl Display for UUID {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    let v = self.as_u128();
    write!(
      f,
      "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
      (v >> 96) as u32,
      (v >> 80) as u16,
      (v >> 64) as u16,
      (v >> 48) as u16,
      v & 0xffff_ffff_ffff,
    )
  }
}
