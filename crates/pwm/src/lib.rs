//! # sti-pwm
//!
//! Driver core for an STi-style PWM block: up to four output channels that
//! share one prescaler, and up to four capture channels that measure an input
//! waveform's period and duty cycle. The block is reached only through the
//! [`RegisterPort`](sti_pwm_hal::RegisterPort) and
//! [`ClockPort`](sti_pwm_hal::ClockPort) traits.
//!
//! ## Module Overview
//! - [`codec`]      – Register field packing.
//! - [`prescaler`]  – Exact period to prescale mapping.
//! - [`arbiter`]    – Shared-period arbitration and output enable counting.
//! - [`capture`]    – Per-channel edge capture with a blocking waiter.
//! - [`controller`] – Composition root and interrupt dispatch.
//!
//! Caller threads and the interrupt dispatch context share one
//! [`PwmController`] through an `Arc`. Only [`PwmController::capture`] blocks.

pub mod arbiter;
pub mod capture;
pub mod codec;
pub mod config;
pub mod controller;
pub mod error;
pub mod hw;
pub mod layout;
pub mod prescaler;

pub use arbiter::{ArbiterState, ChannelArbiter, OutputConfig};
pub use capture::{CapturePhase, CaptureResult, CaptureSample, CaptureStateMachine, EdgeEvent};
pub use config::{ControllerConfig, ControllerConfigBuilder};
pub use controller::{Polarity, PwmController, PwmState};
pub use error::{PwmError, Result};
pub use hw::Hardware;

#[cfg(test)]
mod tests;
