use alloc::vec::Vec;

use crate::descriptors::{AttributeHandle, GattCharacteristic, UUID};
use crate::error::SlotError;

/// Value store for one characteristic.  The slot is owned by the peripheral; the radio stack
/// feeds it inbound writes and the poll loop writes responses into it.
///
/// `last_observed` is only ever advanced by [crate::change_detector::poll] and always holds a
/// copy of some earlier `current_value`.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacteristicSlot {
  handle: AttributeHandle,
  descriptor: GattCharacteristic,
  current_value: Vec<u8>,
  pub(crate) last_observed: Option<Vec<u8>>,
}

impl CharacteristicSlot {
  pub fn new(handle: AttributeHandle, descriptor: GattCharacteristic) -> Self {
    Self {
      handle,
      descriptor,
      current_value: Vec::new(),
      last_observed: None,
    }
  }

  pub fn handle(&self) -> AttributeHandle {
    self.handle
  }

  pub fn uuid(&self) -> UUID {
    self.descriptor.uuid
  }

  pub fn descriptor(&self) -> &GattCharacteristic {
    &self.descriptor
  }

  /// Current value, empty until the first write.
  pub fn read(&self) -> &[u8] {
    &self.current_value
  }

  pub fn last_observed(&self) -> Option<&[u8]> {
    self.last_observed.as_deref()
  }

  /// Local write of a response value.  Only characteristics a central can read or subscribe to
  /// accept these.
  pub fn write(&mut self, value: &[u8]) -> Result<(), SlotError> {
    if !self.descriptor.is_exposed() {
      return Err(SlotError::NotExposed(self.uuid()));
    }
    self.replace(value)
  }

  /// Store a value the radio stack received from the central.  A rejected value leaves the slot
  /// untouched.
  pub fn store_inbound(&mut self, value: &[u8]) -> Result<(), SlotError> {
    if !self.descriptor.is_writable() {
      return Err(SlotError::WriteNotPermitted(self.uuid()));
    }
    self.replace(value)
  }

  fn replace(&mut self, value: &[u8]) -> Result<(), SlotError> {
    self.descriptor.check_len(value)?;
    if self.current_value != value {
      self.current_value.clear();
      self.current_value.extend_from_slice(value);
    }
    Ok(())
  }
}

/// All slots of a peripheral, in the declaration order of their characteristics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotTable {
  slots: Vec<CharacteristicSlot>,
}

impl SlotTable {
  pub fn new(slots: Vec<CharacteristicSlot>) -> Self {
    Self { slots }
  }

  pub fn position(&self, uuid: UUID) -> Option<usize> {
    self.slots.iter().position(|s| s.uuid() == uuid)
  }

  pub fn get(&self, index: usize) -> Option<&CharacteristicSlot> {
    self.slots.get(index)
  }

  pub fn get_mut(&mut self, index: usize) -> Option<&mut CharacteristicSlot> {
    self.slots.get_mut(index)
  }

  pub fn by_uuid(&self, uuid: UUID) -> Option<&CharacteristicSlot> {
    self.slots.iter().find(|s| s.uuid() == uuid)
  }

  pub fn by_handle(&self, handle: AttributeHandle) -> Option<&CharacteristicSlot> {
    self.slots.iter().find(|s| s.handle() == handle)
  }

  pub fn iter(&self) -> impl Iterator<Item = &CharacteristicSlot> {
    self.slots.iter()
  }

  pub fn len(&self) -> usize {
    self.slots.len()
  }

  pub fn is_empty(&self) -> bool {
    self.slots.is_empty()
  }
}
