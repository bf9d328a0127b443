//! Error types.  Runtime faults on the radio link are never surfaced through these; they are
//! logged and the peripheral carries on.  These only cover declarations that can never work.

use core::fmt::Debug;

use crate::advertisement::PushError;
use crate::descriptors::UUID;

/// A [crate::identity::PeripheralIdentity] or [crate::service::Route] declaration was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
  #[error("device name must not be empty")]
  EmptyName,

  #[error("device name is {len} bytes, at most {max} are allowed")]
  NameTooLong { len: usize, max: usize },

  #[error("service {0} declares no characteristics")]
  NoCharacteristics(UUID),

  #[error("characteristic {0} is declared more than once")]
  DuplicateCharacteristic(UUID),

  #[error("characteristic {0} declares no capabilities")]
  NoCapabilities(UUID),

  #[error("characteristic {uuid} max length {max_length} is outside 1..=512")]
  InvalidMaxLength { uuid: UUID, max_length: u16 },

  #[error("route references unknown characteristic {0}")]
  UnknownCharacteristic(UUID),

  #[error("characteristic {0} cannot be written by a central")]
  NotWritable(UUID),

  #[error("characteristic {0} can neither be read nor notified")]
  NotExposed(UUID),

  #[error("characteristic {0} cannot be both the input and the output of a route")]
  FeedbackRoute(UUID),

  #[error("characteristic {0} is the input of more than one route")]
  DuplicateRoute(UUID),

  #[error("radio stack did not assign a handle to characteristic {0}")]
  MissingHandle(UUID),

  #[error("advertisement does not fit: {0:?}")]
  Advertisement(PushError),
}

/// A value was refused by a [crate::slot::CharacteristicSlot].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
  #[error("characteristic {0} does not accept writes from a central")]
  WriteNotPermitted(UUID),

  #[error("characteristic {0} is neither readable nor notifiable")]
  NotExposed(UUID),

  #[error("{len} byte value exceeds max length {max} of {uuid}")]
  TooLong { uuid: UUID, len: usize, max: usize },

  #[error("{len} byte value does not match fixed length {expected} of {uuid}")]
  WrongFixedLength { uuid: UUID, len: usize, expected: usize },
}

/// ATT error code a radio stack answers a central with when it refuses a request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[repr(u8)]
pub enum AttError {
  #[error("invalid handle")]
  InvalidHandle = 0x01,

  #[error("read not permitted")]
  ReadNotPermitted = 0x02,

  #[error("write not permitted")]
  WriteNotPermitted = 0x03,

  #[error("request not supported")]
  RequestNotSupported = 0x06,

  #[error("attribute not found")]
  AttributeNotFound = 0x0A,

  #[error("invalid attribute value length")]
  InvalidAttributeValueLength = 0x0D,

  #[error("unlikely error")]
  Unlikely = 0x0E,

  #[error("insufficient resources")]
  InsufficientResources = 0x11,
}

impl From<AttError> for u8 {
  fn from(value: AttError) -> Self {
    value as u8
  }
}

impl From<SlotError> for AttError {
  fn from(value: SlotError) -> Self {
    match value {
      SlotError::WriteNotPermitted(_) => AttError::WriteNotPermitted,
      SlotError::NotExposed(_) => AttError::ReadNotPermitted,
      SlotError::TooLong { .. } => AttError::InvalidAttributeValueLength,
      SlotError::WrongFixedLength { .. } => AttError::InvalidAttributeValueLength,
    }
  }
}

/// Failure to bring up a [crate::lifecycle::Peripheral].
#[derive(Debug, thiserror::Error)]
pub enum PeripheralError<E: Debug> {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error("radio stack failure: {0:?}")]
  Radio(E),
}
