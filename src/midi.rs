//! BLE-MIDI packet decoding.
//!
//! A characteristic write carries a two byte timestamp header followed by MIDI bytes:
//!
//! ```text
//! [timestamp header] [timestamp] [status] [note] [velocity]
//! ```
//!
//! Only Note On and Note Off channel voice messages are decoded; anything else (running status,
//! multiple messages per packet, SysEx...) is handed back as [MidiEvent::Unrecognized].

use alloc::vec::Vec;
use core::fmt::{Display, Formatter};

const STATUS_NOTE_OFF: u8 = 0x80;
const STATUS_NOTE_ON: u8 = 0x90;
const STATUS_TYPE_MASK: u8 = 0xF0;
const CHANNEL_MASK: u8 = 0x0F;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiEvent {
  NoteOn { channel: u8, note: u8, velocity: u8 },
  NoteOff { channel: u8, note: u8, velocity: u8 },

  /// Bytes that could not be decoded: the whole buffer when it is too short to hold a message,
  /// otherwise just the MIDI bytes after the timestamp header.
  Unrecognized { raw: Vec<u8> },
}

impl Display for MidiEvent {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    match self {
      MidiEvent::NoteOn { channel, note, velocity } => {
        write!(f, "Note On: channel={channel}, note={note}, velocity={velocity}")
      }
      MidiEvent::NoteOff { channel, note, velocity } => {
        write!(f, "Note Off: channel={channel}, note={note}, velocity={velocity}")
      }
      MidiEvent::Unrecognized { raw } => write!(f, "Unrecognized: [{}]", HexBytes(raw)),
    }
  }
}

/// View of a BLE-MIDI packet.  The timestamp bytes are carried verbatim: they are neither
/// validated nor reconstructed into an absolute time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiPacket<'a> {
  pub timestamp_header: u8,
  pub timestamp: u8,
  pub midi_data: &'a [u8],
}

impl<'a> MidiPacket<'a> {
  /// Split `buffer` into header and MIDI bytes.  `None` if there is not at least one MIDI byte.
  pub fn parse(buffer: &'a [u8]) -> Option<Self> {
    match buffer {
      [timestamp_header, timestamp, midi_data @ ..] if !midi_data.is_empty() => Some(Self {
        timestamp_header: *timestamp_header,
        timestamp: *timestamp,
        midi_data,
      }),
      _ => None,
    }
  }

  pub fn event(&self) -> MidiEvent {
    decode_message(self.midi_data)
  }
}

/// Decode a raw characteristic value.  Never fails: anything that is not a Note On or Note Off
/// comes back as [MidiEvent::Unrecognized].
pub fn decode(buffer: &[u8]) -> MidiEvent {
  match MidiPacket::parse(buffer) {
    Some(packet) => packet.event(),
    None => MidiEvent::Unrecognized { raw: buffer.to_vec() },
  }
}

fn decode_message(midi_data: &[u8]) -> MidiEvent {
  if let [status, note, velocity, ..] = *midi_data {
    let channel = status & CHANNEL_MASK;
    match status & STATUS_TYPE_MASK {
      STATUS_NOTE_ON => return MidiEvent::NoteOn { channel, note, velocity },
      STATUS_NOTE_OFF => return MidiEvent::NoteOff { channel, note, velocity },
      _ => {}
    }
  }
  MidiEvent::Unrecognized { raw: midi_data.to_vec() }
}

/// Formats bytes as space separated upper-case hex, e.g. `80 00 90 3C 64`.
#[derive(Debug, Clone, Copy)]
pub struct HexBytes<'a>(pub &'a [u8]);

impl Display for HexBytes<'_> {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    for (i, b) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str(" ")?;
      }
      write!(f, "{b:02X}")?;
    }
    Ok(())
  }
}
