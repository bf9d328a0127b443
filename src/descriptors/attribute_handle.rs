use core::fmt::Display;
use core::fmt::Formatter;
use core::num::NonZeroU16;

/// ATT handle the radio stack assigned to a characteristic value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttributeHandle(pub NonZeroU16);

impl AttributeHandle {
  /// Handle `0x0000` is reserved by ATT and never assigned.
  pub fn new(raw: u16) -> Option<Self> {
    NonZeroU16::new(raw).map(Self)
  }

  pub fn value(&self) -> u16 {
    self.0.get()
  }
}

impl Display for AttributeHandle {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    write!(f, "0x{:04x}", self.0.get())
  }
}
