use alloc::string::String;
use alloc::vec;

use enumset::enum_set;

use crate::config;
use crate::descriptors::{GattCharacteristic, GattCharacteristicProperty, GattService, UUID};
use crate::error::ConfigError;

/// Who the peripheral claims to be: the advertised name and the one service it hosts.  Validated
/// once at construction and immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PeripheralIdentity {
  name: String,
  service: GattService,
}

impl PeripheralIdentity {
  pub fn new(name: &str, service: GattService) -> Result<Self, ConfigError> {
    if name.is_empty() {
      return Err(ConfigError::EmptyName);
    }
    if name.len() > config::MAX_DEVICE_NAME_LEN {
      return Err(ConfigError::NameTooLong { len: name.len(), max: config::MAX_DEVICE_NAME_LEN });
    }
    if service.characteristics.is_empty() {
      return Err(ConfigError::NoCharacteristics(service.uuid));
    }
    for (i, characteristic) in service.characteristics.iter().enumerate() {
      characteristic.validate()?;
      if service.characteristics[..i].iter().any(|c| c.uuid == characteristic.uuid) {
        return Err(ConfigError::DuplicateCharacteristic(characteristic.uuid));
      }
    }
    Ok(Self { name: name.into(), service })
  }

  /// The standard BLE-MIDI service with its single data I/O characteristic.
  pub fn ble_midi() -> Self {
    Self {
      name: config::DEVICE_NAME.into(),
      service: GattService {
        uuid: config::BLE_MIDI_SERVICE_UUID,
        characteristics: vec![ble_midi_io_characteristic()],
      },
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn service(&self) -> &GattService {
    &self.service
  }

  pub fn characteristic(&self, uuid: UUID) -> Option<&GattCharacteristic> {
    self.service.characteristic(uuid)
  }
}

/// Read, write without response and notify, up to [config::MIDI_IO_MAX_LEN] variable bytes.
pub fn ble_midi_io_characteristic() -> GattCharacteristic {
  GattCharacteristic::new(
    config::BLE_MIDI_IO_CHARACTERISTIC_UUID,
    enum_set!(
      GattCharacteristicProperty::Read
        | GattCharacteristicProperty::WriteNoResponse
        | GattCharacteristicProperty::Notify
    ),
  )
    .with_max_length(config::MIDI_IO_MAX_LEN)
}
