use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;

use embedded_hal::delay::DelayNs;
use log::{debug, error, info, trace, warn};

use crate::advertisement::AdvertisementRequest;
use crate::config;
use crate::descriptors::UUID;
use crate::error::{ConfigError, PeripheralError};
use crate::identity::PeripheralIdentity;
use crate::radio::RadioStack;
use crate::service::{Route, ServicePollLoop};
use crate::slot::{CharacteristicSlot, SlotTable};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConnectionState {
  /// Not advertising yet, or the last attempt to start advertising failed.
  Idle,

  /// Waiting, without timeout, for a central to connect.
  Advertising,

  /// A central link is active and the poll loop is running.
  Connected,
}

/// Stops [Peripheral::run] at the next tick.  This is the only piece of peripheral state that may
/// be touched from another context (an interrupt, a signal handler, another thread).
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
  pub fn new() -> Self {
    Default::default()
  }

  pub fn cancel(&self) {
    self.0.store(true, Ordering::Release);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::Acquire)
  }
}

/// Single-peer GATT peripheral: owns the radio handle, the connection state and every
/// characteristic slot, and drives advertise → connect → serve → re-advertise forever.
///
/// Slots are never reset on disconnect, so a reconnecting central sees the values left by the
/// previous session.
#[derive(Debug)]
pub struct Peripheral<R: RadioStack> {
  radio: R,
  identity: PeripheralIdentity,
  advertisement: AdvertisementRequest,
  state: ConnectionState,
  slots: SlotTable,
  service: ServicePollLoop,
  poll_interval: Duration,
}

impl<R: RadioStack> Peripheral<R> {
  /// Register the identity's service with the radio and resolve `routes` against it.  Nothing is
  /// advertised until the first [Peripheral::step].
  pub fn new(
    mut radio: R,
    identity: PeripheralIdentity,
    routes: Vec<Route>,
  ) -> Result<Self, PeripheralError<R::SystemError>> {
    let advertisement =
      AdvertisementRequest::for_identity(&identity).map_err(ConfigError::Advertisement)?;
    let handles = radio
      .configure_gatt_server(identity.service())
      .map_err(PeripheralError::Radio)?;

    let slots = identity
      .service()
      .characteristics
      .iter()
      .map(|characteristic| {
        handles
          .iter()
          .find(|(uuid, _)| *uuid == characteristic.uuid)
          .map(|(_, handle)| CharacteristicSlot::new(*handle, characteristic.clone()))
          .ok_or(ConfigError::MissingHandle(characteristic.uuid))
      })
      .collect::<Result<Vec<_>, _>>()?;
    let slots = SlotTable::new(slots);
    let service = ServicePollLoop::bind(routes, &slots)?;

    for slot in slots.iter() {
      debug!("{} -> handle {}", slot.uuid(), slot.handle());
    }

    Ok(Self {
      radio,
      identity,
      advertisement,
      state: ConnectionState::Idle,
      slots,
      service,
      poll_interval: config::POLL_INTERVAL,
    })
  }

  pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
    self.poll_interval = poll_interval;
    self
  }

  pub fn state(&self) -> ConnectionState {
    self.state
  }

  pub fn identity(&self) -> &PeripheralIdentity {
    &self.identity
  }

  pub fn advertisement(&self) -> &AdvertisementRequest {
    &self.advertisement
  }

  pub fn poll_interval(&self) -> Duration {
    self.poll_interval
  }

  pub fn slots(&self) -> &SlotTable {
    &self.slots
  }

  pub fn slot(&self, uuid: UUID) -> Option<&CharacteristicSlot> {
    self.slots.by_uuid(uuid)
  }

  pub fn radio(&self) -> &R {
    &self.radio
  }

  pub fn radio_mut(&mut self) -> &mut R {
    &mut self.radio
  }

  pub fn into_radio(self) -> R {
    self.radio
  }

  /// Advance the lifecycle by one tick and return the resulting state.  Never fails: radio
  /// errors are logged and retried on a later tick.
  pub fn step(&mut self) -> ConnectionState {
    self.state = match self.state {
      ConnectionState::Idle => self.begin_advertising(),
      ConnectionState::Advertising => {
        if self.radio.is_connected() {
          info!("Central connected");
          ConnectionState::Connected
        } else if !self.radio.is_advertising() {
          warn!("Advertising stopped without a connection, restarting");
          self.start_advertising()
        } else {
          trace!("Waiting for connection...");
          ConnectionState::Advertising
        }
      }
      ConnectionState::Connected => {
        if self.radio.is_connected() {
          self.service.poll_once(&mut self.radio, &mut self.slots);
          ConnectionState::Connected
        } else {
          info!("Central disconnected, restarting advertising");
          self.start_advertising()
        }
      }
    };
    self.state
  }

  /// Step forever, sleeping `poll_interval` between ticks, until `cancel` fires.
  pub fn run<D: DelayNs>(&mut self, delay: &mut D, cancel: &CancellationToken) {
    let tick_us = u32::try_from(self.poll_interval.as_micros()).unwrap_or(u32::MAX);
    info!("Starting peripheral \"{}\"", self.identity.name());
    while !cancel.is_cancelled() {
      self.step();
      delay.delay_us(tick_us);
    }
    info!("Peripheral stopped in state {:?}", self.state);
  }

  fn begin_advertising(&mut self) -> ConnectionState {
    if self.radio.is_connected() {
      warn!("Dropping stale connection before advertising");
      if let Err(e) = self.radio.disconnect_all() {
        error!("Failed to drop stale connection: {e:?}");
        return ConnectionState::Idle;
      }
    }
    self.start_advertising()
  }

  fn start_advertising(&mut self) -> ConnectionState {
    match self.radio.start_advertising(&self.identity, &self.advertisement) {
      Ok(()) => {
        info!("Advertising as \"{}\"", self.identity.name());
        ConnectionState::Advertising
      }
      Err(e) => {
        error!("Failed to start advertising: {e:?}");
        ConnectionState::Idle
      }
    }
  }
}
