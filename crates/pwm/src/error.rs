//! Error taxonomy for controller operations.

use sti_pwm_hal::HalError;
use thiserror::Error;

/// Errors returned by the controller and its components.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PwmError {
    #[error("channel {channel} out of range ({count} available)")]
    InvalidChannel { channel: u32, count: u32 },
    #[error("period {requested} ns conflicts with shared period {current} ns")]
    ConflictingPeriod { requested: u64, current: u64 },
    #[error("period {period} ns is not a multiple of the {unit} ns prescaler step")]
    NotRepresentable { period: u64, unit: u64 },
    #[error("prescale {prescale} exceeds maximum {max}")]
    OutOfRange { prescale: u64, max: u32 },
    #[error("unusable clock rate {0} Hz")]
    InvalidClockRate(u64),
    #[error("duty cycle {duty} ns exceeds period {period} ns")]
    InvalidDuty { duty: u64, period: u64 },
    #[error("only normal polarity is supported")]
    UnsupportedPolarity,
    #[error("capture already in progress on channel {0}")]
    CaptureBusy(u32),
    #[error("capture cancelled")]
    Cancelled,
    #[error("capture channel {channel} reached invalid sample index {index}")]
    InternalFault { channel: u32, index: u8 },
    #[error("capture channels configured without a capture clock")]
    MissingCaptureClock,
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("clock error: {0}")]
    Clock(HalError),
    #[error("bus error: {0}")]
    Bus(#[from] HalError),
}

pub type Result<T> = core::result::Result<T, PwmError>;
