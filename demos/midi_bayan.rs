use std::thread;
use std::time::Duration;

use ble_midi_peripheral::config;
use ble_midi_peripheral::identity::ble_midi_io_characteristic;
use ble_midi_peripheral::lifecycle::{CancellationToken, Peripheral};
use ble_midi_peripheral::prelude::*;
use ble_midi_peripheral::sim::SimulatedRadio;
use embedded_hal::delay::DelayNs;
use enumset::enum_set;
use log::{error, info};

const VALUE_IN_UUID: UUID = UUID::Long(0x2b1f0001_5d6c_4d8e_9e4b_0c6a1ad0b1a7);
const VALUE_OUT_UUID: UUID = UUID::Long(0x2b1f0002_5d6c_4d8e_9e4b_0c6a1ad0b1a7);

/// Blocking delay on top of the host's scheduler.
struct StdDelay;

impl DelayNs for StdDelay {
  fn delay_ns(&mut self, ns: u32) {
    thread::sleep(Duration::from_nanos(ns.into()));
  }
}

fn main() {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
  if let Err(e) = run_session() {
    error!("{e}");
  }
}

fn double(value: &[u8]) -> Vec<u8> {
  value.iter().map(|v| v.wrapping_mul(2)).collect()
}

fn run_session() -> Result<(), PeripheralError<ble_midi_peripheral::sim::SimError>> {
  let service = GattService {
    uuid: config::BLE_MIDI_SERVICE_UUID,
    characteristics: vec![
      ble_midi_io_characteristic(),
      GattCharacteristic::new(VALUE_IN_UUID, enum_set!(GattCharacteristicProperty::Write)),
      GattCharacteristic::new(VALUE_OUT_UUID, GattCharacteristicProperty::Read | GattCharacteristicProperty::Notify),
    ],
  };
  let identity = PeripheralIdentity::new(config::DEVICE_NAME, service)?;
  let routes = vec![
    Route::midi(config::BLE_MIDI_IO_CHARACTERISTIC_UUID),
    Route::transform(VALUE_IN_UUID, VALUE_OUT_UUID, double),
  ];
  let mut peripheral = Peripheral::new(SimulatedRadio::new(), identity, routes)?;

  // Scripted central: connect, play a note, poke the doubler, walk away and come back.
  peripheral.step();
  peripheral.radio_mut().connect_central();
  peripheral.step();

  let midi = config::BLE_MIDI_IO_CHARACTERISTIC_UUID;
  let script: [(UUID, &[u8]); 4] = [
    (midi, &[0x80, 0x00, 0x90, 0x3C, 0x64]),
    (midi, &[0x80, 0x00, 0x80, 0x3C, 0x00]),
    (midi, &[0x80, 0x00, 0xB0, 0x07, 0x7F]),
    (VALUE_IN_UUID, &[0x01, 0x02, 0x81]),
  ];
  if let Err(e) = peripheral.radio_mut().subscribe(VALUE_OUT_UUID) {
    error!("Subscribe failed: {e:?}");
  }
  for (uuid, value) in script {
    if let Err(e) = peripheral.radio_mut().central_write(uuid, value) {
      error!("Central write to {uuid} failed: {e:?}");
    }
    peripheral.step();
  }
  for (handle, value) in peripheral.radio_mut().take_notifications() {
    info!("Central notified on {handle}: {:02X?}", value);
  }

  peripheral.radio_mut().drop_link();
  peripheral.step();
  peripheral.radio_mut().connect_central();
  peripheral.step();

  // Free-running loop until cancelled from another thread.
  let cancel = CancellationToken::new();
  let remote = cancel.clone();
  let stopper = thread::spawn(move || {
    thread::sleep(Duration::from_millis(200));
    remote.cancel();
  });
  peripheral.run(&mut StdDelay, &cancel);
  if stopper.join().is_err() {
    error!("Stopper thread panicked");
  }
  Ok(())
}
