//! Surfaces a slot's value once per distinct transition.
//!
//! Values written between two polls coalesce: only the value present at poll time is ever
//! seen.  Empty values mean "no data yet" and are never surfaced.

use crate::slot::CharacteristicSlot;

/// Return the slot's current value if it is non-empty and differs from the last value surfaced,
/// recording it as observed.  Returns `None` otherwise and leaves the slot untouched.
pub fn poll(slot: &mut CharacteristicSlot) -> Option<&[u8]> {
  let current = slot.read();
  if current.is_empty() || slot.last_observed() == Some(current) {
    return None;
  }
  let observed = current.to_vec();
  slot.last_observed = Some(observed);
  slot.last_observed()
}
