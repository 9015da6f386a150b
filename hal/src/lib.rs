//! Hardware ports for the STi PWM controller
//!
//! The controller core never touches a bus or a clock tree directly. It
//! consumes the two narrow traits defined here, so the same driver logic runs
//! against real MMIO, a regmap-style transport, or the in-memory [`mock`]
//! implementations used by the tests and the `pwm-sim` tool.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod clock;
pub mod error;
pub mod register;

#[cfg(feature = "mock")]
pub mod mock;

// Re-export commonly used types
pub use clock::ClockPort;
pub use error::{HalError, HalResult};
pub use register::RegisterPort;
