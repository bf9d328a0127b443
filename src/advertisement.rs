use core::ops::Deref;

use crate::descriptors::UUID;
use crate::identity::PeripheralIdentity;

/// Everything the radio stack needs to start a connectable, undirected advertisement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisementRequest {
  pub payload: AdvertisementPayload,
  pub scan_response_payload: Option<ScanResponsePayload>,
}

impl AdvertisementRequest {
  /// Advertise the identity's service UUID and its name.  The name rides along in the
  /// advertisement if it fits, otherwise it moves to the scan response (shortened if even that
  /// is too small).
  pub fn for_identity(identity: &PeripheralIdentity) -> Result<Self, PushError> {
    let service_uuid = identity.service().uuid;
    let builder = AdvertisementPayloadBuilder::new()
      .set_discover_mode(DiscoverMode::General)
      .set_classic_not_supported(true)
      .push_service_uuids(&[service_uuid])?;

    let name = identity.name();
    if builder.remaining_data_capacity() >= name.len() {
      return Ok(Self {
        payload: builder.push_local_name(name)?.build()?,
        scan_response_payload: None,
      });
    }

    let scan_builder = ScanResponsePayloadBuilder::new().without_flags();
    let room = scan_builder.remaining_data_capacity();
    let scan_response = if name.len() <= room {
      scan_builder.push_local_name(name)?
    } else {
      scan_builder.push_short_name(truncate_on_char_boundary(name, room))?
    };

    Ok(Self {
      payload: builder.build()?,
      scan_response_payload: Some(scan_response.build()?),
    })
  }
}

fn truncate_on_char_boundary(name: &str, max: usize) -> &str {
  let mut end = max.min(name.len());
  while !name.is_char_boundary(end) {
    end -= 1;
  }
  &name[..end]
}

pub type AdvertisementPayloadBuilder = RawAdvertisementBuilder<31>;
pub type ScanResponsePayloadBuilder = RawAdvertisementBuilder<31>;

/// Helper to facilitate creating correctly structured advertisement PDUs.
#[derive(Debug, Default, Clone)]
pub struct RawAdvertisementBuilder<const N: usize> {
  raw: heapless::Vec<u8, N>,
  flags: Option<u8>,
  has_set_flags: bool,
}

impl<const N: usize> RawAdvertisementBuilder<N> {
  pub fn new() -> Self {
    Default::default()
  }

  /// Set the discover mode.
  pub fn set_discover_mode(mut self, discover_mode: DiscoverMode) -> Self {
    let flags = self.flags.get_or_insert(0);
    *flags = (*flags & !DISCOVER_MODE_MASK) | (discover_mode as u8 & DISCOVER_MODE_MASK);
    self
  }

  /// Indicate that Bluetooth Classic (BR/EDR) is _NOT_ supported.
  pub fn set_classic_not_supported(mut self, classic_not_supported: bool) -> Self {
    let flags = self.flags.get_or_insert(0);
    if classic_not_supported {
      *flags |= CLASSIC_NOT_SUPPORTED_MASK;
    } else {
      *flags &= !CLASSIC_NOT_SUPPORTED_MASK;
    }
    self
  }

  /// Scan responses must not carry the flags record.
  pub fn without_flags(mut self) -> Self {
    self.flags = None;
    self.has_set_flags = true;
    self
  }

  /// Number of data bytes a single additional record could still carry, accounting for its
  /// length and type header (and for the pending flags record, if any).
  pub fn remaining_data_capacity(&self) -> usize {
    let pending_flags = if self.flags.is_some() || !self.has_set_flags { 3 } else { 0 };
    N.saturating_sub(self.raw.len() + pending_flags + 2)
  }

  /// Push the complete list of service UUIDs.  All UUIDs must be the same width.
  pub fn push_service_uuids(mut self, uuids: &[UUID]) -> Result<Self, PushError> {
    let size_of_item = Self::require_equal_size(uuids)?;
    let ad_type = match uuids.first().ok_or(PushError::UuidInputError)? {
      UUID::Short(_) => AdType::CompleteServiceUuids16,
      UUID::Long(_) => AdType::CompleteServiceUuids128,
    };

    self = self.push_start_record(ad_type as _, size_of_item * uuids.len())?;
    for uuid in uuids {
      uuid.push_into(&mut self.raw).map_err(|_| PushError::CapacityExceeded)?;
    }

    Ok(self)
  }

  fn require_equal_size(uuids: &[UUID]) -> Result<usize, PushError> {
    let mut num_bytes = None;
    for uuid in uuids {
      let size_of = uuid.encoded_len();
      if num_bytes.get_or_insert(size_of) != &size_of {
        return Err(PushError::UuidInputError);
      }
    }
    num_bytes.ok_or(PushError::UuidInputError)
  }

  /// Push the complete local name.
  pub fn push_local_name(self, name: &str) -> Result<Self, PushError> {
    self.push_raw_ad_type(AdType::LongLocalName as _, name.as_bytes())
  }

  /// Push a shortened local name.  Centrals will read the full name from the built-in GAP
  /// characteristic after connecting.
  pub fn push_short_name(self, name: &str) -> Result<Self, PushError> {
    self.push_raw_ad_type(AdType::ShortLocalName as _, name.as_bytes())
  }

  pub fn push_raw_ad_type(mut self, ad_type: u8, data: &[u8]) -> Result<Self, PushError> {
    self = self.push_start_record(ad_type, data.len())?;
    self.raw.extend_from_slice(data).map_err(|_| PushError::CapacityExceeded)?;

    if ad_type == AdType::Flags as _ {
      self.has_set_flags = true;
    }

    Ok(self)
  }

  fn push_start_record(mut self, ad_type: u8, remaining_size: usize) -> Result<Self, PushError> {
    self = self.flush_pending_record()?;
    self = self.ensure_defaults_set()?;
    self = self.flush_pending_record()?;

    if self.raw.len() + 2 + remaining_size > N {
      return Err(PushError::CapacityExceeded);
    }

    let length = u8::try_from(remaining_size + 1).map_err(|_| PushError::CapacityExceeded)?;
    self.raw.push(length).map_err(|_| PushError::CapacityExceeded)?;
    self.raw.push(ad_type).map_err(|_| PushError::CapacityExceeded)?;
    Ok(self)
  }

  pub fn build(mut self) -> Result<RawAdvertisement<N>, PushError> {
    self = self.ensure_defaults_set()?;
    self = self.flush_pending_record()?;
    Ok(RawAdvertisement(self.raw))
  }

  fn flush_pending_record(mut self) -> Result<Self, PushError> {
    if let Some(flags) = self.flags.take() {
      self.has_set_flags = true;
      self = self.push_raw_ad_type(AdType::Flags as _, &[flags])?;
    }
    Ok(self)
  }

  fn ensure_defaults_set(mut self) -> Result<Self, PushError> {
    if !self.has_set_flags && self.flags.is_none() {
      self = self.set_discover_mode(DiscoverMode::General);
      self = self.set_classic_not_supported(true);
    }
    Ok(self)
  }
}

/// Advertisements consist of one or more ad type units in a TLV-style format (but actually it's
/// LTV).  Note that this list is not exhaustive but is provided as a convenience.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum AdType {
  Flags = 0x01,
  CompleteServiceUuids16 = 0x03,
  CompleteServiceUuids128 = 0x07,
  ShortLocalName = 0x08,
  LongLocalName = 0x09,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushError {
  CapacityExceeded,
  UuidInputError,
}

const DISCOVER_MODE_MASK: u8 = 0b0000_0011;
const CLASSIC_NOT_SUPPORTED_MASK: u8 = 0b0000_0100;

/// Whether and how this peripheral is discovered.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum DiscoverMode {
  /// This device can only be discovered when a central device is following the limited
  /// discovery procedure.
  Limited = 0b0000_0001,

  /// General discovery.  This is the normal discovery mode that most customers would use.
  General = 0b0000_0010,

  /// Device is not discoverable (whether the device is connectable is determined independently).
  None = 0b0000_0000,
}

/// Represents the raw payload for an advertisement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAdvertisement<const N: usize>(pub heapless::Vec<u8, N>);

impl<const N: usize> Deref for RawAdvertisement<N> {
  type Target = [u8];

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

pub type AdvertisementPayload = RawAdvertisement<31>;
pub type ScanResponsePayload = RawAdvertisement<31>;

#[cfg(test)]
mod tests {
  extern crate std;
  extern crate alloc;

  use alloc::vec;
  use alloc::vec::Vec;
  use std::io::Cursor;
  use std::io::Read;

  use byteorder::ReadBytesExt;

  use super::*;
  use crate::config;
  use crate::descriptors::{GattCharacteristic, GattCharacteristicProperty, GattService};

  #[test]
  pub fn test_flags_default_encoding() {
    let adv = AdvertisementPayloadBuilder::new().build().unwrap();

    assert_eq!(&adv[..], &[0x02, 0x01, 0x06]);
  }

  #[test]
  pub fn test_flags_non_default_encoding() {
    let adv = AdvertisementPayloadBuilder::new()
      .set_discover_mode(DiscoverMode::Limited)
      .set_classic_not_supported(true)
      .build()
      .unwrap();

    assert_eq!(&adv[..], &[0x02, 0x01, 0b0000_0101]);
  }

  #[test]
  pub fn test_capacity_exceeded() {
    let result = AdvertisementPayloadBuilder::new()
      .push_service_uuids(&[UUID::Long(1)])
      .unwrap()
      .push_local_name("a name that is far too long");
    assert_eq!(result.err(), Some(PushError::CapacityExceeded));
  }

  #[test]
  pub fn test_mixed_uuid_widths_rejected() {
    let result = AdvertisementPayloadBuilder::new().push_service_uuids(&[UUID::Short(1), UUID::Long(2)]);
    assert_eq!(result.err(), Some(PushError::UuidInputError));
  }

  #[test]
  pub fn test_ble_midi_identity_moves_name_to_scan_response() {
    let request = AdvertisementRequest::for_identity(&PeripheralIdentity::ble_midi()).unwrap();

    let mut iter = AdRecordIter::new(&request.payload);
    assert_eq!(iter.next(), Some(AdRecord::new(AdType::Flags, &[0x06])));
    assert_eq!(
      iter.next(),
      Some(AdRecord::new(
        AdType::CompleteServiceUuids128,
        &config::BLE_MIDI_SERVICE_UUID.as_u128().to_le_bytes()
      ))
    );
    assert_eq!(iter.next(), None);

    let scan_response = request.scan_response_payload.unwrap();
    let mut iter = AdRecordIter::new(&scan_response);
    assert_eq!(iter.next(), Some(AdRecord::new(AdType::LongLocalName, b"MIDI Bayan")));
    assert_eq!(iter.next(), None);
  }

  #[test]
  pub fn test_short_uuid_identity_keeps_name_in_payload() {
    let service = GattService {
      uuid: UUID::Short(0x1234),
      characteristics: vec![GattCharacteristic::new(
        UUID::Short(0x5678),
        GattCharacteristicProperty::Read | GattCharacteristicProperty::Write,
      )],
    };
    let identity = PeripheralIdentity::new("doubler", service).unwrap();
    let request = AdvertisementRequest::for_identity(&identity).unwrap();

    let records: Vec<_> = AdRecordIter::new(&request.payload).collect();
    assert_eq!(
      records,
      vec![
        AdRecord::new(AdType::Flags, &[0x06]),
        AdRecord::new(AdType::CompleteServiceUuids16, &[0x34, 0x12]),
        AdRecord::new(AdType::LongLocalName, b"doubler"),
      ]
    );
    assert!(request.scan_response_payload.is_none());
  }

  #[test]
  pub fn test_long_name_is_shortened() {
    let name = "a peripheral name that does not fit anywhere";
    let identity = PeripheralIdentity::new(name, PeripheralIdentity::ble_midi().service().clone()).unwrap();
    let request = AdvertisementRequest::for_identity(&identity).unwrap();

    let scan_response = request.scan_response_payload.unwrap();
    let mut iter = AdRecordIter::new(&scan_response);
    assert_eq!(iter.next(), Some(AdRecord::new(AdType::ShortLocalName, &name.as_bytes()[..29])));
  }

  struct AdRecordIter<'a> {
    cursor: Cursor<&'a [u8]>,
  }

  impl<'a> AdRecordIter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
      Self {
        cursor: Cursor::new(data),
      }
    }
  }

  impl<'a> Iterator for AdRecordIter<'a> {
    type Item = AdRecord;

    fn next(&mut self) -> Option<Self::Item> {
      let length = self.cursor.read_u8().ok()?;
      if length < 1 {
        return None;
      }
      let ad_type = self.cursor.read_u8().ok()?;
      let mut data = vec![0u8; (length - 1).into()];
      self.cursor.read_exact(&mut data).ok()?;

      Some(AdRecord { ad_type, data })
    }
  }

  #[derive(Debug, Clone, PartialEq, Eq)]
  struct AdRecord {
    ad_type: u8,
    data: Vec<u8>,
  }

  impl AdRecord {
    pub fn new(ad_type: AdType, data: &[u8]) -> Self {
      Self {
        ad_type: ad_type as _,
        data: data.to_vec(),
      }
    }
  }
}
