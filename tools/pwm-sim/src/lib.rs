//! Host-side harness for the STi PWM controller.
//!
//! Wires a [`PwmController`](sti_pwm::PwmController) to the in-memory ports of
//! `sti-pwm-hal` and provides a synthetic input signal, so output settings and
//! capture measurements can be exercised without a board.

mod bench;
mod signal;

pub use bench::{register_name, Bench, OutputReport, SimController};
pub use signal::{CaptureReport, SignalGenerator};

#[cfg(test)]
mod tests;
