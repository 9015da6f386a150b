//! Shared-period arbitration and output enable counting.
//!
//! All output channels of a block run from one prescaler, so they share one
//! period. A channel may only move the block to a new period when no other
//! configured channel would be disturbed by it. The output-enable bit is
//! likewise shared and reference counted across channels.

use std::sync::Arc;

use log::{debug, error, warn};
use parking_lot::Mutex;
use sti_pwm_hal::{ClockPort, RegisterPort};

use crate::codec::split_prescale;
use crate::error::{PwmError, Result};
use crate::hw::Hardware;
use crate::layout::{
    out_val, MAX_OUTPUT_CHANNELS, PWMCLK_PRESCALE_HIGH, PWMCLK_PRESCALE_LOW, PWM_CPT_INT_EN,
    PWM_OUT_EN,
};
use crate::prescaler;

/// Settings applied to one output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutputConfig {
    pub period_ns: u64,
    pub duty_ns: u64,
    pub prescale: u32,
    pub raw_compare: u32,
}

/// Block-wide output state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArbiterState {
    /// Bit `n` set once channel `n` holds an applied configuration.
    pub configured: u32,
    /// Period last programmed into the prescaler. Stays valid in hardware
    /// after every channel has been freed.
    pub period_ns: Option<u64>,
    pub prescale: u32,
    pub enable_count: u32,
    /// The prescaler registers may not hold `prescale`; the next configure
    /// rewrites them.
    pub prescale_stale: bool,
}

impl ArbiterState {
    pub fn configured_count(&self) -> u32 {
        self.configured.count_ones()
    }

    pub fn is_configured(&self, channel: u32) -> bool {
        channel_bit(channel).is_ok_and(|bit| self.configured & bit != 0)
    }

    /// Period shared by the configured channels, if any.
    pub fn current_period(&self) -> Option<u64> {
        if self.configured == 0 {
            None
        } else {
            self.period_ns
        }
    }
}

fn channel_bit(channel: u32) -> Result<u32> {
    if channel >= MAX_OUTPUT_CHANNELS {
        return Err(PwmError::InvalidChannel {
            channel,
            count: MAX_OUTPUT_CHANNELS,
        });
    }
    Ok(1 << channel)
}

pub struct ChannelArbiter<R, C> {
    hw: Arc<Hardware<R, C>>,
    max_counter: u32,
    max_prescale: u32,
    state: Mutex<ArbiterState>,
}

impl<R: RegisterPort, C: ClockPort> ChannelArbiter<R, C> {
    pub fn new(hw: Arc<Hardware<R, C>>, max_counter: u32, max_prescale: u32) -> Self {
        Self {
            hw,
            max_counter,
            max_prescale,
            state: Mutex::new(ArbiterState::default()),
        }
    }

    pub fn state(&self) -> ArbiterState {
        *self.state.lock()
    }

    pub fn is_output_enabled(&self) -> bool {
        self.state.lock().enable_count > 0
    }

    /// Programs `duty_ns`/`period_ns` on `channel`.
    ///
    /// On any error the arbiter state is left untouched and every clock
    /// reference taken for the register writes has been dropped.
    pub fn configure(&self, channel: u32, duty_ns: u64, period_ns: u64) -> Result<OutputConfig> {
        if duty_ns > period_ns {
            return Err(PwmError::InvalidDuty {
                duty: duty_ns,
                period: period_ns,
            });
        }

        let bit = channel_bit(channel)?;
        let mut state = self.state.lock();
        let ncfg = state.configured_count();
        let period_same = state.period_ns == Some(period_ns);
        let sole_owner = ncfg == 1 && state.configured == bit;

        if !(ncfg == 0 || period_same || sole_owner) {
            let current = state.period_ns.unwrap_or_default();
            error!(
                "failed to configure PWM{channel}: period {period_ns} ns conflicts with {current} ns"
            );
            return Err(PwmError::ConflictingPeriod {
                requested: period_ns,
                current,
            });
        }

        let _clocks = self.hw.enable_clocks()?;

        let prescale = if period_same {
            state.prescale
        } else {
            prescaler::compute(
                period_ns,
                self.hw.pwm_clock().rate_hz(),
                self.max_counter,
                self.max_prescale,
            )?
        };
        let rewrite = !period_same || state.prescale_stale;
        // 0 still yields a one-cycle pulse; max_counter never goes low.
        let raw_compare = prescaler::compare_value(duty_ns, period_ns, self.max_counter);

        if let Err(err) = self.program(channel, rewrite.then_some(prescale), raw_compare) {
            if rewrite {
                self.restore_prescale(&mut state);
            }
            return Err(err);
        }

        state.configured |= bit;
        state.period_ns = Some(period_ns);
        state.prescale = prescale;
        state.prescale_stale = false;
        debug!(
            "PWM{channel}: period {period_ns} ns, duty {duty_ns} ns, prescale {prescale}, compare {raw_compare}"
        );

        Ok(OutputConfig {
            period_ns,
            duty_ns,
            prescale,
            raw_compare,
        })
    }

    fn program(&self, channel: u32, prescale: Option<u32>, raw_compare: u32) -> Result<()> {
        let regs = self.hw.regs();
        if let Some(prescale) = prescale {
            let (low, high) = split_prescale(prescale);
            PWMCLK_PRESCALE_LOW.write(regs, low)?;
            PWMCLK_PRESCALE_HIGH.write(regs, high)?;
        }
        regs.write(out_val(channel), raw_compare)?;
        PWM_CPT_INT_EN.write(regs, 0)?;
        Ok(())
    }

    /// Puts the recorded prescale back after a failed configure. If that
    /// fails too, the next configure rewrites it.
    fn restore_prescale(&self, state: &mut ArbiterState) {
        let regs = self.hw.regs();
        let (low, high) = split_prescale(state.prescale);
        let restored = PWMCLK_PRESCALE_LOW
            .write(regs, low)
            .and_then(|()| PWMCLK_PRESCALE_HIGH.write(regs, high));
        if let Err(err) = restored {
            warn!("failed to restore prescale {}: {err}", state.prescale);
            state.prescale_stale = true;
        }
    }

    /// Takes one output-enable reference. The first one starts the clocks and
    /// sets the output-enable bit.
    pub fn enable(&self, channel: u32) -> Result<()> {
        let mut state = self.state.lock();
        if state.enable_count == 0 {
            let clocks = self.hw.enable_clocks()?;
            if let Err(err) = PWM_OUT_EN.write(self.hw.regs(), 1) {
                error!("failed to enable PWM device {channel}: {err}");
                return Err(err.into());
            }
            clocks.hold();
            debug!("output enabled by PWM{channel}");
        }
        state.enable_count += 1;
        Ok(())
    }

    /// Drops one output-enable reference. The last one clears the
    /// output-enable bit and stops the clocks.
    pub fn disable(&self, channel: u32) -> Result<()> {
        let mut state = self.state.lock();
        if state.enable_count == 0 {
            warn!("PWM{channel}: disable without matching enable");
            return Ok(());
        }

        state.enable_count -= 1;
        if state.enable_count > 0 {
            return Ok(());
        }

        let cleared = PWM_OUT_EN.write(self.hw.regs(), 0);
        self.hw.release_clocks();
        debug!("output disabled by PWM{channel}");
        cleared.map_err(Into::into)
    }

    pub fn free(&self, channel: u32) -> Result<()> {
        let bit = channel_bit(channel)?;
        self.state.lock().configured &= !bit;
        Ok(())
    }
}
