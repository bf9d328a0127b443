use alloc::vec::Vec;
use core::fmt::Debug;

use crate::advertisement::AdvertisementRequest;
use crate::descriptors::{AttributeHandle, GattService, UUID};
use crate::identity::PeripheralIdentity;

/// Capabilities the peripheral core needs from the underlying BLE stack (controller, host and
/// GATT server).  Implementations are thin mappings onto a platform library.
///
/// Everything is called from the single control flow that owns the
/// [crate::lifecycle::Peripheral]; no method needs to be reentrant.  A `read` is expected to
/// hand back a consistent snapshot of the attribute value, never a value torn by a concurrent
/// write from the central.
pub trait RadioStack {
  type SystemError: Debug;

  /// Register the single GATT service and return the value handle assigned to each
  /// characteristic.
  fn configure_gatt_server(
    &mut self,
    service: &GattService,
  ) -> Result<Vec<(UUID, AttributeHandle)>, Self::SystemError>;

  /// Start connectable, undirected advertising.  Most stacks stop advertising by themselves when
  /// a central connects.
  fn start_advertising(
    &mut self,
    identity: &PeripheralIdentity,
    advertisement: &AdvertisementRequest,
  ) -> Result<(), Self::SystemError>;

  /// Is a central link currently active?
  fn is_connected(&self) -> bool;

  /// Is the stack still advertising?  Turns false once a central connects, and stays false
  /// after that link drops until [RadioStack::start_advertising] is called again.
  fn is_advertising(&self) -> bool;

  /// Terminate every active link.
  fn disconnect_all(&mut self) -> Result<(), Self::SystemError>;

  /// Current attribute value, as last written by the central or by [RadioStack::write].
  fn read(&mut self, handle: AttributeHandle) -> Result<Vec<u8>, Self::SystemError>;

  /// Replace the attribute value.  The stack notifies the central if it has subscribed to the
  /// characteristic.
  fn write(&mut self, handle: AttributeHandle, value: &[u8]) -> Result<(), Self::SystemError>;
}
