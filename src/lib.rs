#![no_std]

extern crate alloc;

pub mod advertisement;
pub mod change_detector;
pub mod config;
pub mod descriptors;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod midi;
pub mod radio;
pub mod service;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod slot;

pub mod prelude {
  pub use crate::advertisement::*;
  pub use crate::descriptors::*;
  pub use crate::error::*;
  pub use crate::identity::*;
  pub use crate::lifecycle::*;
  pub use crate::midi::*;
  pub use crate::radio::*;
  pub use crate::service::*;
  pub use crate::slot::*;
}
