use enumset::{enum_set, EnumSet};

use crate::descriptors::uuid::UUID;
use crate::error::{ConfigError, SlotError};

/// Largest attribute value ATT allows.
pub const MAX_ATTRIBUTE_LEN: u16 = 512;

const WRITABLE: EnumSet<GattCharacteristicProperty> =
  enum_set!(GattCharacteristicProperty::Write | GattCharacteristicProperty::WriteNoResponse);

const EXPOSED: EnumSet<GattCharacteristicProperty> =
  enum_set!(GattCharacteristicProperty::Read | GattCharacteristicProperty::Notify);

#[derive(Debug, Clone, PartialEq)]
pub struct GattCharacteristic {
  pub uuid: UUID,
  pub properties: EnumSet<GattCharacteristicProperty>,

  /// Maximum number of value bytes, in the range [1, 512].
  pub max_length: u16,

  /// Fixed-length characteristics only ever hold exactly `max_length` bytes (or nothing before
  /// the first write).
  pub fixed_length: bool,
}

impl Default for GattCharacteristic {
  fn default() -> Self {
    Self {
      uuid: UUID::Long(0),
      properties: EnumSet::new(),
      max_length: 20,
      fixed_length: false,
    }
  }
}

impl GattCharacteristic {
  pub fn new(uuid: UUID, properties: EnumSet<GattCharacteristicProperty>) -> Self {
    Self { uuid, properties, ..Default::default() }
  }

  pub fn with_max_length(mut self, max_length: u16) -> Self {
    self.max_length = max_length;
    self
  }

  pub fn with_fixed_length(mut self, fixed_length: bool) -> Self {
    self.fixed_length = fixed_length;
    self
  }

  /// Can a central write to this characteristic (with or without response)?
  pub fn is_writable(&self) -> bool {
    !self.properties.is_disjoint(WRITABLE)
  }

  /// Can a central observe values written locally, either by reading or through notifications?
  pub fn is_exposed(&self) -> bool {
    !self.properties.is_disjoint(EXPOSED)
  }

  pub fn is_notifiable(&self) -> bool {
    self.properties.contains(GattCharacteristicProperty::Notify)
  }

  pub(crate) fn validate(&self) -> Result<(), ConfigError> {
    if self.properties.is_empty() {
      return Err(ConfigError::NoCapabilities(self.uuid));
    }
    if self.max_length == 0 || self.max_length > MAX_ATTRIBUTE_LEN {
      return Err(ConfigError::InvalidMaxLength { uuid: self.uuid, max_length: self.max_length });
    }
    Ok(())
  }

  /// Check that `value` fits the declared length constraints.  Empty values are always accepted.
  pub fn check_len(&self, value: &[u8]) -> Result<(), SlotError> {
    let len = value.len();
    let max = usize::from(self.max_length);
    if len > max {
      return Err(SlotError::TooLong { uuid: self.uuid, len, max });
    }
    if self.fixed_length && len != 0 && len != max {
      return Err(SlotError::WrongFixedLength { uuid: self.uuid, len, expected: max });
    }
    Ok(())
  }
}

/// Capability flags a characteristic can declare.
#[derive(Debug, enumset::EnumSetType)]
pub enum GattCharacteristicProperty {
  Read,
  Write,
  WriteNoResponse,

  /// Note that setting this property will cause a CCCD descriptor to automatically be added
  /// to the characteristic by the radio stack.
  Notify,
}
