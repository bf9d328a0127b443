//! The per-tick work done while a central is connected: pull watched values from the radio,
//! surface changes and route them either to the MIDI decoder or to a caller supplied transform
//! whose result is written back to an output characteristic.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt::{Debug, Formatter};

use log::{debug, info, warn};

use crate::change_detector;
use crate::descriptors::UUID;
use crate::error::ConfigError;
use crate::midi::{self, HexBytes, MidiEvent, MidiPacket};
use crate::radio::RadioStack;
use crate::slot::SlotTable;

/// Receives every MIDI event decoded from a watched characteristic.
pub trait MidiSink {
  fn on_midi_event(&mut self, characteristic: UUID, event: &MidiEvent);
}

impl<F> MidiSink for F
where
  F: FnMut(UUID, &MidiEvent),
{
  fn on_midi_event(&mut self, characteristic: UUID, event: &MidiEvent) {
    (self)(characteristic, event)
  }
}

/// Logs decoded notes at info level and everything else at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl MidiSink for LogSink {
  fn on_midi_event(&mut self, _characteristic: UUID, event: &MidiEvent) {
    match event {
      MidiEvent::Unrecognized { .. } => debug!("  {event}"),
      _ => info!("  {event}"),
    }
  }
}

/// Derives a response from a surfaced input value.
pub trait ValueTransform {
  fn apply(&mut self, value: &[u8]) -> Vec<u8>;
}

impl<F> ValueTransform for F
where
  F: FnMut(&[u8]) -> Vec<u8>,
{
  fn apply(&mut self, value: &[u8]) -> Vec<u8> {
    (self)(value)
  }
}

/// What to do with the changes surfaced on one watched characteristic.
pub enum Route {
  /// Decode the value as a BLE-MIDI packet.
  Midi { input: UUID, sink: Box<dyn MidiSink> },

  /// Transform the value and write the result to `output`.
  Transform {
    input: UUID,
    output: UUID,
    transform: Box<dyn ValueTransform>,
  },
}

impl Route {
  pub fn midi(input: UUID) -> Self {
    Self::midi_with_sink(input, LogSink)
  }

  pub fn midi_with_sink(input: UUID, sink: impl MidiSink + 'static) -> Self {
    Route::Midi { input, sink: Box::new(sink) }
  }

  pub fn transform(input: UUID, output: UUID, transform: impl ValueTransform + 'static) -> Self {
    Route::Transform { input, output, transform: Box::new(transform) }
  }

  pub fn input(&self) -> UUID {
    match self {
      Route::Midi { input, .. } | Route::Transform { input, .. } => *input,
    }
  }
}

impl Debug for Route {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    match self {
      Route::Midi { input, .. } => f.debug_struct("Midi").field("input", input).finish_non_exhaustive(),
      Route::Transform { input, output, .. } => f
        .debug_struct("Transform")
        .field("input", input)
        .field("output", output)
        .finish_non_exhaustive(),
    }
  }
}

enum Action {
  Midi(Box<dyn MidiSink>),
  Transform { output: usize, transform: Box<dyn ValueTransform> },
}

struct BoundRoute {
  input: usize,
  action: Action,
}

/// Routes resolved against a [SlotTable].
pub struct ServicePollLoop {
  routes: Vec<BoundRoute>,
}

impl Debug for ServicePollLoop {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("ServicePollLoop").field("routes", &self.routes.len()).finish()
  }
}

impl ServicePollLoop {
  /// Resolve every route to slot indices, rejecting routes that could never work: unknown
  /// characteristics, inputs a central cannot write, outputs a central cannot observe, and
  /// outputs that feed back into a watched input.
  pub fn bind(routes: Vec<Route>, slots: &SlotTable) -> Result<Self, ConfigError> {
    let lookup = |uuid: UUID| slots.position(uuid).ok_or(ConfigError::UnknownCharacteristic(uuid));

    let mut bound: Vec<BoundRoute> = Vec::with_capacity(routes.len());
    for route in routes {
      let input_uuid = route.input();
      let input = lookup(input_uuid)?;
      if bound.iter().any(|r| r.input == input) {
        return Err(ConfigError::DuplicateRoute(input_uuid));
      }
      let writable = slots.get(input).map(|s| s.descriptor().is_writable()).unwrap_or(false);
      if !writable {
        return Err(ConfigError::NotWritable(input_uuid));
      }

      let action = match route {
        Route::Midi { sink, .. } => Action::Midi(sink),
        Route::Transform { output: output_uuid, transform, .. } => {
          let output = lookup(output_uuid)?;
          if output == input {
            return Err(ConfigError::FeedbackRoute(output_uuid));
          }
          let exposed = slots.get(output).map(|s| s.descriptor().is_exposed()).unwrap_or(false);
          if !exposed {
            return Err(ConfigError::NotExposed(output_uuid));
          }
          Action::Transform { output, transform }
        }
      };
      bound.push(BoundRoute { input, action });
    }

    for route in &bound {
      if let Action::Transform { output, .. } = route.action {
        if let Some(watched) = bound.iter().find(|r| r.input == output) {
          let uuid = slots.get(watched.input).map(|s| s.uuid()).unwrap_or(UUID::Long(0));
          return Err(ConfigError::FeedbackRoute(uuid));
        }
      }
    }

    Ok(Self { routes: bound })
  }

  /// Run one poll iteration over every route, in declaration order.  Radio failures are logged
  /// and skipped.  Returns the number of changes surfaced.
  pub fn poll_once<R: RadioStack>(&mut self, radio: &mut R, slots: &mut SlotTable) -> usize {
    let mut surfaced = 0;
    for route in &mut self.routes {
      let Some(slot) = slots.get_mut(route.input) else {
        continue;
      };
      let uuid = slot.uuid();

      match radio.read(slot.handle()) {
        Ok(value) => {
          if let Err(e) = slot.store_inbound(&value) {
            warn!("Ignoring inbound value: {e}");
          }
        }
        Err(e) => {
          warn!("Reading {uuid} failed: {e:?}");
          continue;
        }
      }

      let Some(value) = change_detector::poll(slot).map(|v| v.to_vec()) else {
        continue;
      };
      surfaced += 1;
      info!("Received: [{}]", HexBytes(&value));

      match &mut route.action {
        Action::Midi(sink) => {
          if let Some(packet) = MidiPacket::parse(&value) {
            debug!("MIDI data: [{}]", HexBytes(packet.midi_data));
          }
          sink.on_midi_event(uuid, &midi::decode(&value));
        }
        Action::Transform { output, transform } => {
          let response = transform.apply(&value);
          respond(radio, slots, *output, &response);
        }
      }
    }
    surfaced
  }
}

fn respond<R: RadioStack>(radio: &mut R, slots: &mut SlotTable, output: usize, response: &[u8]) {
  let Some(slot) = slots.get_mut(output) else {
    return;
  };
  if let Err(e) = slot.write(response) {
    warn!("Dropping response: {e}");
    return;
  }
  match radio.write(slot.handle(), response) {
    Ok(()) => debug!("Responded on {}: [{}]", slot.uuid(), HexBytes(response)),
    Err(e) => warn!("Writing {} failed: {e:?}", slot.uuid()),
  }
}
