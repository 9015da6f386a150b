//! Period to prescaler mapping.
//!
//! The output counter sweeps `max_counter + 1` clock cycles per period and the
//! prescaler stretches each sweep by `prescale + 1`. The reachable periods are
//! therefore whole multiples of one sweep at prescale 0. Requests between two
//! steps are rejected, never rounded.

use crate::error::{PwmError, Result};

pub const NSEC_PER_SEC: u64 = 1_000_000_000;

/// Nanoseconds per full counter sweep at prescale 0.
///
/// The per-cycle time is truncated to whole nanoseconds before scaling.
pub fn step_ns(clock_rate_hz: u64, max_counter: u32) -> Result<u64> {
    if clock_rate_hz == 0 || clock_rate_hz > NSEC_PER_SEC {
        return Err(PwmError::InvalidClockRate(clock_rate_hz));
    }
    Ok(NSEC_PER_SEC / clock_rate_hz * (u64::from(max_counter) + 1))
}

/// Prescale value producing exactly `period_ns`.
pub fn compute(
    period_ns: u64,
    clock_rate_hz: u64,
    max_counter: u32,
    max_prescale: u32,
) -> Result<u32> {
    let unit = step_ns(clock_rate_hz, max_counter)?;
    if period_ns == 0 || period_ns % unit != 0 {
        return Err(PwmError::NotRepresentable {
            period: period_ns,
            unit,
        });
    }

    let prescale = period_ns / unit - 1;
    if prescale > u64::from(max_prescale) {
        return Err(PwmError::OutOfRange {
            prescale,
            max: max_prescale,
        });
    }
    Ok(prescale as u32)
}

/// Period produced by `prescale`, the inverse of [`compute`].
pub fn period_for(prescale: u32, clock_rate_hz: u64, max_counter: u32) -> Result<u64> {
    Ok(step_ns(clock_rate_hz, max_counter)? * (u64::from(prescale) + 1))
}

/// Duty compare value for `duty_ns` within `period_ns`.
///
/// A value of 0 still yields a one-cycle pulse; `max_counter` keeps the output
/// high for the whole period.
pub fn compare_value(duty_ns: u64, period_ns: u64, max_counter: u32) -> u32 {
    if period_ns == 0 {
        return 0;
    }
    (u128::from(max_counter) * u128::from(duty_ns) / u128::from(period_ns)) as u32
}
