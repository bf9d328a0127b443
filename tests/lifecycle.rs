use std::cell::RefCell;
use std::rc::Rc;

use ble_midi_peripheral::config;
use ble_midi_peripheral::identity::ble_midi_io_characteristic;
use ble_midi_peripheral::lifecycle::{CancellationToken, ConnectionState, Peripheral};
use ble_midi_peripheral::prelude::*;
use ble_midi_peripheral::sim::SimulatedRadio;
use embedded_hal::delay::DelayNs;
use enumset::enum_set;

const MIDI: UUID = config::BLE_MIDI_IO_CHARACTERISTIC_UUID;
const VALUE_IN: UUID = UUID::Short(0xb001);
const VALUE_OUT: UUID = UUID::Short(0xb002);

type Events = Rc<RefCell<Vec<(UUID, MidiEvent)>>>;

fn identity() -> PeripheralIdentity {
  let service = GattService {
    uuid: config::BLE_MIDI_SERVICE_UUID,
    characteristics: vec![
      ble_midi_io_characteristic(),
      GattCharacteristic::new(VALUE_IN, enum_set!(GattCharacteristicProperty::Write)),
      GattCharacteristic::new(VALUE_OUT, GattCharacteristicProperty::Read | GattCharacteristicProperty::Notify),
    ],
  };
  PeripheralIdentity::new("test bayan", service).unwrap()
}

fn double(value: &[u8]) -> Vec<u8> {
  value.iter().map(|v| v.wrapping_mul(2)).collect()
}

fn peripheral(radio: SimulatedRadio) -> (Peripheral<SimulatedRadio>, Events) {
  let events: Events = Default::default();
  let captured = events.clone();
  let routes = vec![
    Route::midi_with_sink(MIDI, move |uuid: UUID, event: &MidiEvent| {
      captured.borrow_mut().push((uuid, event.clone()));
    }),
    Route::transform(VALUE_IN, VALUE_OUT, double),
  ];
  (Peripheral::new(radio, identity(), routes).unwrap(), events)
}

fn connect(peripheral: &mut Peripheral<SimulatedRadio>) {
  if peripheral.state() == ConnectionState::Idle {
    assert_eq!(peripheral.step(), ConnectionState::Advertising);
  }
  peripheral.radio_mut().connect_central();
  assert_eq!(peripheral.step(), ConnectionState::Connected);
}

fn write_and_poll(peripheral: &mut Peripheral<SimulatedRadio>, uuid: UUID, value: &[u8]) {
  peripheral.radio_mut().central_write(uuid, value).unwrap();
  assert_eq!(peripheral.step(), ConnectionState::Connected);
}

#[test]
fn decodes_notes_written_by_the_central() {
  let (mut peripheral, events) = peripheral(SimulatedRadio::new());
  connect(&mut peripheral);

  write_and_poll(&mut peripheral, MIDI, &[0x80, 0x00, 0x90, 0x3C, 0x64]);
  write_and_poll(&mut peripheral, MIDI, &[0x80, 0x00, 0x80, 0x3C, 0x00]);
  write_and_poll(&mut peripheral, MIDI, &[0x01, 0x02]);

  assert_eq!(
    *events.borrow(),
    vec![
      (MIDI, MidiEvent::NoteOn { channel: 0, note: 60, velocity: 100 }),
      (MIDI, MidiEvent::NoteOff { channel: 0, note: 60, velocity: 0 }),
      (MIDI, MidiEvent::Unrecognized { raw: vec![0x01, 0x02] }),
    ]
  );
}

#[test]
fn repeated_value_surfaces_once() {
  let (mut peripheral, events) = peripheral(SimulatedRadio::new());
  connect(&mut peripheral);

  write_and_poll(&mut peripheral, MIDI, &[5]);
  write_and_poll(&mut peripheral, MIDI, &[5]);
  peripheral.step();
  write_and_poll(&mut peripheral, MIDI, &[7]);

  let raw: Vec<_> = events.borrow().iter().map(|(_, e)| e.clone()).collect();
  assert_eq!(
    raw,
    vec![MidiEvent::Unrecognized { raw: vec![5] }, MidiEvent::Unrecognized { raw: vec![7] }]
  );
  assert_eq!(peripheral.slot(MIDI).unwrap().last_observed(), Some(&[7u8][..]));
}

#[test]
fn writes_between_polls_coalesce() {
  let (mut peripheral, events) = peripheral(SimulatedRadio::new());
  connect(&mut peripheral);

  let radio = peripheral.radio_mut();
  radio.central_write(MIDI, &[0x80, 0x00, 0x90, 0x3C, 0x64]).unwrap();
  radio.central_write(MIDI, &[0x80, 0x00, 0x90, 0x3E, 0x64]).unwrap();
  radio.central_write(MIDI, &[0x80, 0x00, 0x90, 0x40, 0x64]).unwrap();
  peripheral.step();

  assert_eq!(*events.borrow(), vec![(MIDI, MidiEvent::NoteOn { channel: 0, note: 0x40, velocity: 100 })]);
}

#[test]
fn values_survive_reconnection() {
  let (mut peripheral, events) = peripheral(SimulatedRadio::new());
  connect(&mut peripheral);
  write_and_poll(&mut peripheral, MIDI, &[0x80, 0x00, 0x90, 0x3C, 0x64]);
  write_and_poll(&mut peripheral, VALUE_IN, &[0x03]);

  peripheral.radio_mut().drop_link();
  assert_eq!(peripheral.step(), ConnectionState::Advertising);
  assert_eq!(peripheral.radio().advertise_count(), 2);
  assert_eq!(peripheral.slot(MIDI).unwrap().read(), &[0x80, 0x00, 0x90, 0x3C, 0x64]);
  assert_eq!(peripheral.slot(VALUE_OUT).unwrap().read(), &[0x06]);

  connect(&mut peripheral);
  peripheral.step();

  assert_eq!(events.borrow().len(), 1);
  assert_eq!(peripheral.slot(MIDI).unwrap().read(), &[0x80, 0x00, 0x90, 0x3C, 0x64]);
  assert_eq!(peripheral.radio_mut().central_read(VALUE_OUT).unwrap(), vec![0x06]);
}

#[test]
fn transform_responds_and_notifies_subscribers() {
  let (mut peripheral, _) = peripheral(SimulatedRadio::new());
  connect(&mut peripheral);

  write_and_poll(&mut peripheral, VALUE_IN, &[0x01, 0x02, 0x81]);
  assert!(peripheral.radio().notifications().is_empty());
  assert_eq!(peripheral.radio_mut().central_read(VALUE_OUT).unwrap(), vec![0x02, 0x04, 0x02]);

  peripheral.radio_mut().subscribe(VALUE_OUT).unwrap();
  write_and_poll(&mut peripheral, VALUE_IN, &[0x10]);
  let out = peripheral.radio().handle_of(VALUE_OUT).unwrap();
  assert_eq!(peripheral.radio_mut().take_notifications(), vec![(out, vec![0x20])]);
  assert_eq!(peripheral.slot(VALUE_OUT).unwrap().read(), &[0x20]);
}

#[test]
fn nothing_is_polled_before_a_central_connects() {
  let (mut peripheral, events) = peripheral(SimulatedRadio::new());
  peripheral.step();
  let handle = peripheral.radio().handle_of(MIDI).unwrap();
  peripheral.radio_mut().write(handle, &[0x80, 0x00, 0x90, 0x3C, 0x64]).unwrap();

  for _ in 0..10 {
    assert_eq!(peripheral.step(), ConnectionState::Advertising);
  }
  assert!(events.borrow().is_empty());
  assert!(peripheral.slot(MIDI).unwrap().read().is_empty());
}

#[test]
fn stale_connection_is_dropped_before_advertising() {
  let mut radio = SimulatedRadio::new();
  radio.connect_central();
  let (mut peripheral, _) = peripheral(radio);

  assert_eq!(peripheral.step(), ConnectionState::Advertising);
  assert_eq!(peripheral.radio().disconnect_count(), 1);
  assert!(peripheral.radio().is_advertising());
}

#[test]
fn failed_advertising_is_retried() {
  let mut radio = SimulatedRadio::new();
  radio.fail_next_advertising(2);
  let (mut peripheral, _) = peripheral(radio);

  assert_eq!(peripheral.step(), ConnectionState::Idle);
  assert_eq!(peripheral.step(), ConnectionState::Idle);
  assert_eq!(peripheral.step(), ConnectionState::Advertising);
  assert_eq!(peripheral.radio().advertise_count(), 1);
}

#[test]
fn failed_readvertise_after_disconnect_is_retried() {
  let (mut peripheral, _) = peripheral(SimulatedRadio::new());
  connect(&mut peripheral);
  assert_eq!(peripheral.radio().advertise_count(), 1);

  peripheral.radio_mut().fail_next_advertising(1);
  peripheral.radio_mut().drop_link();
  assert_eq!(peripheral.step(), ConnectionState::Idle);
  assert_eq!(peripheral.radio().advertise_count(), 1);
  assert!(!peripheral.radio().is_advertising());

  assert_eq!(peripheral.step(), ConnectionState::Advertising);
  assert_eq!(peripheral.radio().advertise_count(), 2);
  assert!(peripheral.radio().is_advertising());
  assert_eq!(peripheral.radio().disconnect_count(), 0);
}

#[test]
fn connection_dropped_between_ticks_is_readvertised() {
  let (mut peripheral, events) = peripheral(SimulatedRadio::new());
  assert_eq!(peripheral.step(), ConnectionState::Advertising);

  peripheral.radio_mut().connect_central();
  peripheral.radio_mut().drop_link();
  assert_eq!(peripheral.step(), ConnectionState::Advertising);
  assert_eq!(peripheral.radio().advertise_count(), 2);

  connect(&mut peripheral);
  write_and_poll(&mut peripheral, MIDI, &[0x80, 0x00, 0x90, 0x3C, 0x64]);
  assert_eq!(events.borrow().len(), 1);
}

#[test]
fn rejects_route_to_missing_characteristic() {
  let err = Peripheral::new(SimulatedRadio::new(), identity(), vec![Route::midi(UUID::Short(0xdead))]).unwrap_err();
  assert!(matches!(
    err,
    PeripheralError::Config(ConfigError::UnknownCharacteristic(UUID::Short(0xdead)))
  ));
}

struct CancelAfter {
  ticks: usize,
  limit: usize,
  cancel: CancellationToken,
}

impl DelayNs for CancelAfter {
  fn delay_ns(&mut self, _ns: u32) {
    self.tick();
  }

  fn delay_us(&mut self, _us: u32) {
    self.tick();
  }
}

impl CancelAfter {
  fn tick(&mut self) {
    self.ticks += 1;
    if self.ticks == self.limit {
      self.cancel.cancel();
    }
  }
}

#[test]
fn run_stops_when_cancelled() {
  let (mut peripheral, _) = peripheral(SimulatedRadio::new());
  let cancel = CancellationToken::new();
  let mut delay = CancelAfter { ticks: 0, limit: 5, cancel: cancel.clone() };

  peripheral.run(&mut delay, &cancel);

  assert_eq!(delay.ticks, 5);
  assert_eq!(peripheral.state(), ConnectionState::Advertising);
}

#[test]
fn run_returns_immediately_when_already_cancelled() {
  let (mut peripheral, _) = peripheral(SimulatedRadio::new());
  let cancel = CancellationToken::new();
  cancel.cancel();
  let mut delay = CancelAfter { ticks: 0, limit: 1, cancel: cancel.clone() };

  peripheral.run(&mut delay, &cancel);

  assert_eq!(delay.ticks, 0);
  assert_eq!(peripheral.state(), ConnectionState::Idle);
}
