use alloc::vec::Vec;

use crate::descriptors::gatt_characteristic::GattCharacteristic;
use crate::descriptors::uuid::UUID;

#[derive(Debug, Clone, PartialEq)]
pub struct GattService {
  pub uuid: UUID,
  pub characteristics: Vec<GattCharacteristic>,
}

impl Default for GattService {
  fn default() -> Self {
    Self {
      uuid: UUID::Long(0),
      characteristics: Vec::new(),
    }
  }
}

impl GattService {
  pub fn characteristic(&self, uuid: UUID) -> Option<&GattCharacteristic> {
    self.characteristics.iter().find(|c| c.uuid == uuid)
  }
}
