//! In-memory [RadioStack] that plays both the local BLE stack and the remote central.  Used to
//! exercise the peripheral on the host, in tests and demos.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::advertisement::AdvertisementRequest;
use crate::error::AttError;
use crate::descriptors::{AttributeHandle, GattCharacteristic, GattCharacteristicProperty, GattService, UUID};
use crate::identity::PeripheralIdentity;
use crate::radio::RadioStack;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
  UnknownHandle(AttributeHandle),
  HandleSpaceExhausted,
  AdvertisingFailed,
  DisconnectFailed,
}

#[derive(Debug, Clone)]
struct SimAttribute {
  descriptor: GattCharacteristic,
  value: Vec<u8>,
  subscribed: bool,
}

#[derive(Debug, Default)]
pub struct SimulatedRadio {
  attributes: BTreeMap<AttributeHandle, SimAttribute>,
  connected: bool,
  advertising: Option<AdvertisementRequest>,
  advertise_count: usize,
  disconnect_count: usize,
  pending_advertise_failures: usize,
  fail_disconnect: bool,
  notifications: Vec<(AttributeHandle, Vec<u8>)>,
}

impl SimulatedRadio {
  pub fn new() -> Self {
    Default::default()
  }

  /// A central connects.  Like most stacks, advertising stops on connection.
  pub fn connect_central(&mut self) {
    self.connected = true;
    self.advertising = None;
  }

  /// The link drops, e.g. the central walked out of range.
  pub fn drop_link(&mut self) {
    self.connected = false;
    self.clear_subscriptions();
  }

  /// Make the next `count` advertising attempts fail.
  pub fn fail_next_advertising(&mut self, count: usize) {
    self.pending_advertise_failures = count;
  }

  pub fn fail_disconnect(&mut self, fail: bool) {
    self.fail_disconnect = fail;
  }

  pub fn advertisement(&self) -> Option<&AdvertisementRequest> {
    self.advertising.as_ref()
  }

  pub fn advertise_count(&self) -> usize {
    self.advertise_count
  }

  pub fn disconnect_count(&self) -> usize {
    self.disconnect_count
  }

  pub fn handle_of(&self, uuid: UUID) -> Option<AttributeHandle> {
    self.attributes.iter().find(|(_, a)| a.descriptor.uuid == uuid).map(|(h, _)| *h)
  }

  /// Central-side write (with or without response).
  pub fn central_write(&mut self, uuid: UUID, value: &[u8]) -> Result<(), AttError> {
    let attribute = self.connected_attribute(uuid)?;
    if !attribute.descriptor.is_writable() {
      return Err(AttError::WriteNotPermitted);
    }
    attribute.descriptor.check_len(value)?;
    attribute.value.clear();
    attribute.value.extend_from_slice(value);
    Ok(())
  }

  /// Central-side read.
  pub fn central_read(&mut self, uuid: UUID) -> Result<Vec<u8>, AttError> {
    let attribute = self.connected_attribute(uuid)?;
    if !attribute.descriptor.properties.contains(GattCharacteristicProperty::Read) {
      return Err(AttError::ReadNotPermitted);
    }
    Ok(attribute.value.clone())
  }

  /// Central enables notifications by writing the CCCD.
  pub fn subscribe(&mut self, uuid: UUID) -> Result<(), AttError> {
    let attribute = self.connected_attribute(uuid)?;
    if !attribute.descriptor.is_notifiable() {
      return Err(AttError::RequestNotSupported);
    }
    attribute.subscribed = true;
    Ok(())
  }

  /// Notifications delivered to the central so far, oldest first.
  pub fn notifications(&self) -> &[(AttributeHandle, Vec<u8>)] {
    &self.notifications
  }

  pub fn take_notifications(&mut self) -> Vec<(AttributeHandle, Vec<u8>)> {
    core::mem::take(&mut self.notifications)
  }

  fn connected_attribute(&mut self, uuid: UUID) -> Result<&mut SimAttribute, AttError> {
    if !self.connected {
      return Err(AttError::Unlikely);
    }
    self
      .attributes
      .values_mut()
      .find(|a| a.descriptor.uuid == uuid)
      .ok_or(AttError::AttributeNotFound)
  }

  fn clear_subscriptions(&mut self) {
    for attribute in self.attributes.values_mut() {
      attribute.subscribed = false;
    }
  }
}

impl RadioStack for SimulatedRadio {
  type SystemError = SimError;

  /// Handles are laid out like a real attribute table: the service declaration first, then per
  /// characteristic a declaration, the value and, for notifiable ones, a CCCD.
  fn configure_gatt_server(
    &mut self,
    service: &GattService,
  ) -> Result<Vec<(UUID, AttributeHandle)>, Self::SystemError> {
    self.attributes.clear();
    let mut next: u16 = 1;
    let mut mapping = Vec::with_capacity(service.characteristics.len());
    for characteristic in &service.characteristics {
      let value_handle = next.checked_add(2).ok_or(SimError::HandleSpaceExhausted)?;
      let handle = AttributeHandle::new(value_handle).ok_or(SimError::HandleSpaceExhausted)?;
      let cccd = u16::from(characteristic.is_notifiable());
      next = value_handle.checked_add(cccd).ok_or(SimError::HandleSpaceExhausted)?;

      self.attributes.insert(handle, SimAttribute {
        descriptor: characteristic.clone(),
        value: Vec::new(),
        subscribed: false,
      });
      mapping.push((characteristic.uuid, handle));
    }
    Ok(mapping)
  }

  fn start_advertising(
    &mut self,
    _identity: &PeripheralIdentity,
    advertisement: &AdvertisementRequest,
  ) -> Result<(), Self::SystemError> {
    if self.pending_advertise_failures > 0 {
      self.pending_advertise_failures -= 1;
      return Err(SimError::AdvertisingFailed);
    }
    self.advertising = Some(advertisement.clone());
    self.advertise_count += 1;
    Ok(())
  }

  fn is_connected(&self) -> bool {
    self.connected
  }

  fn is_advertising(&self) -> bool {
    self.advertising.is_some()
  }

  fn disconnect_all(&mut self) -> Result<(), Self::SystemError> {
    if self.fail_disconnect {
      return Err(SimError::DisconnectFailed);
    }
    if self.connected {
      self.disconnect_count += 1;
    }
    self.drop_link();
    Ok(())
  }

  fn read(&mut self, handle: AttributeHandle) -> Result<Vec<u8>, Self::SystemError> {
    self
      .attributes
      .get(&handle)
      .map(|a| a.value.clone())
      .ok_or(SimError::UnknownHandle(handle))
  }

  fn write(&mut self, handle: AttributeHandle, value: &[u8]) -> Result<(), Self::SystemError> {
    let attribute = self.attributes.get_mut(&handle).ok_or(SimError::UnknownHandle(handle))?;
    attribute.value.clear();
    attribute.value.extend_from_slice(value);
    if self.connected && attribute.subscribed {
      self.notifications.push((handle, value.to_vec()));
    }
    Ok(())
  }
}
