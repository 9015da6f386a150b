//! Composition root: channel validation, interrupt dispatch, state requests.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use sti_pwm_hal::{ClockPort, RegisterPort};

use crate::arbiter::{ArbiterState, ChannelArbiter, OutputConfig};
use crate::capture::{CaptureResult, CaptureStateMachine};
use crate::config::ControllerConfig;
use crate::error::{PwmError, Result};
use crate::hw::Hardware;
use crate::layout::{CPTCLK_PRESCALE, INT_ACK, INT_ACK_MASK, PWM_CPT_INT_EN, PWM_CPT_INT_STAT};

/// Output polarity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Polarity {
    #[default]
    Normal,
    Inversed,
}

/// Requested or current state of one output channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PwmState {
    pub enabled: bool,
    pub polarity: Polarity,
    pub period_ns: u64,
    pub duty_ns: u64,
}

impl PwmState {
    pub fn enabled(period_ns: u64, duty_ns: u64) -> Self {
        Self {
            enabled: true,
            polarity: Polarity::Normal,
            period_ns,
            duty_ns,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }
}

/// One PWM block with its output and capture channels.
///
/// Shared between caller threads and the interrupt dispatch context through
/// an `Arc`; every operation takes `&self`.
pub struct PwmController<R, C> {
    config: ControllerConfig,
    hw: Arc<Hardware<R, C>>,
    arbiter: ChannelArbiter<R, C>,
    captures: Vec<CaptureStateMachine<R, C>>,
    outputs: Vec<Mutex<PwmState>>,
}

impl<R: RegisterPort, C: ClockPort> PwmController<R, C> {
    /// Validates `config`, takes ownership of the ports and resets the
    /// capture and interrupt logic to a known state.
    pub fn new(config: ControllerConfig, regs: R, pwm_clk: C, cpt_clk: Option<C>) -> Result<Self> {
        config.validate()?;
        if config.capture_channels > 0 && cpt_clk.is_none() {
            return Err(PwmError::MissingCaptureClock);
        }

        let hw = Arc::new(Hardware::new(regs, pwm_clk, cpt_clk));
        let arbiter = ChannelArbiter::new(hw.clone(), config.max_counter, config.max_prescale);
        let captures = (0..config.capture_channels)
            .map(|channel| CaptureStateMachine::new(channel, hw.clone()))
            .collect();
        let outputs = (0..config.output_channels)
            .map(|_| Mutex::new(PwmState::default()))
            .collect();

        let controller = Self {
            config,
            hw,
            arbiter,
            captures,
            outputs,
        };
        controller.reset()?;
        info!(
            "{}: {} output, {} capture channels",
            controller.config.name,
            controller.config.output_channels,
            controller.config.capture_channels
        );
        Ok(controller)
    }

    fn reset(&self) -> Result<()> {
        let _clocks = self.hw.enable_clocks()?;
        let regs = self.hw.regs();
        CPTCLK_PRESCALE.write(regs, 0)?;
        PWM_CPT_INT_EN.write(regs, 0)?;
        regs.write(INT_ACK, INT_ACK_MASK)?;
        Ok(())
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn npwm(&self) -> u32 {
        self.config.npwm()
    }

    pub fn arbiter_state(&self) -> ArbiterState {
        self.arbiter.state()
    }

    pub fn is_output_enabled(&self) -> bool {
        self.arbiter.is_output_enabled()
    }

    fn output(&self, channel: u32) -> Result<&Mutex<PwmState>> {
        self.outputs
            .get(channel as usize)
            .ok_or(PwmError::InvalidChannel {
                channel,
                count: self.config.output_channels,
            })
    }

    fn capture_unit(&self, channel: u32) -> Result<&CaptureStateMachine<R, C>> {
        self.captures.get(channel as usize).ok_or_else(|| {
            error!("capture device {channel} is not valid");
            PwmError::InvalidChannel {
                channel,
                count: self.config.capture_channels,
            }
        })
    }

    pub fn configure(&self, channel: u32, duty_ns: u64, period_ns: u64) -> Result<OutputConfig> {
        let mut state = self.output(channel)?.lock();
        let applied = self.arbiter.configure(channel, duty_ns, period_ns)?;
        state.period_ns = period_ns;
        state.duty_ns = duty_ns;
        Ok(applied)
    }

    pub fn enable(&self, channel: u32) -> Result<()> {
        let mut state = self.output(channel)?.lock();
        self.arbiter.enable(channel)?;
        state.enabled = true;
        Ok(())
    }

    /// Drops one reference on the shared output enable, whether or not this
    /// channel took it.
    pub fn disable(&self, channel: u32) -> Result<()> {
        let mut state = self.output(channel)?.lock();
        if !state.enabled {
            debug!("PWM{channel}: disable on a channel that was not enabled");
        }
        state.enabled = false;
        self.arbiter.disable(channel)
    }

    /// Releases the channel's claim on the shared period. Enable state is
    /// left alone.
    pub fn free(&self, channel: u32) -> Result<()> {
        let mut state = self.output(channel)?.lock();
        self.arbiter.free(channel)?;
        state.period_ns = 0;
        state.duty_ns = 0;
        Ok(())
    }

    /// Moves `channel` to `desired`: disable, or configure and then enable
    /// if it was not running yet.
    pub fn apply_state(&self, channel: u32, desired: &PwmState) -> Result<()> {
        let mut current = self.output(channel)?.lock();

        if !desired.enabled {
            if current.enabled {
                current.enabled = false;
                self.arbiter.disable(channel)?;
            }
            return Ok(());
        }

        if desired.polarity != Polarity::Normal {
            return Err(PwmError::UnsupportedPolarity);
        }

        self.arbiter
            .configure(channel, desired.duty_ns, desired.period_ns)?;
        current.period_ns = desired.period_ns;
        current.duty_ns = desired.duty_ns;
        current.polarity = desired.polarity;

        if !current.enabled {
            self.arbiter.enable(channel)?;
            current.enabled = true;
        }
        Ok(())
    }

    pub fn state(&self, channel: u32) -> Result<PwmState> {
        Ok(*self.output(channel)?.lock())
    }

    /// Measures the input on `channel`, blocking for at most `timeout`.
    pub fn capture(&self, channel: u32, timeout: Duration) -> Result<CaptureResult> {
        self.capture_unit(channel)?.start_capture(timeout)
    }

    /// Interrupts a blocked [`capture`](Self::capture) on `channel`.
    pub fn cancel_capture(&self, channel: u32) -> Result<bool> {
        Ok(self.capture_unit(channel)?.cancel())
    }

    pub fn capture_in_progress(&self, channel: u32) -> Result<bool> {
        Ok(self.capture_unit(channel)?.is_busy())
    }

    /// Services the shared interrupt line.
    ///
    /// Pending channels are drained lowest first, then the whole status
    /// register is acknowledged with one write. Returns `false`, without
    /// writing anything, when no capture interrupt was pending.
    pub fn on_interrupt(&self) -> bool {
        let status = match PWM_CPT_INT_STAT.read(self.hw.regs()) {
            Ok(status) => status,
            Err(err) => {
                warn!("{}: failed to read interrupt status: {err}", self.config.name);
                return false;
            }
        };
        if status == 0 {
            return false;
        }

        let mut pending = status;
        while pending != 0 {
            let channel = pending.trailing_zeros();
            match self.captures.get(channel as usize) {
                Some(unit) => {
                    if let Err(err) = unit.on_edge() {
                        error!("capture {channel}: edge handling failed: {err}");
                    }
                }
                None => warn!("spurious capture interrupt on channel {channel}"),
            }
            pending &= !(1 << channel);
        }

        // Just ACK everything.
        if let Err(err) = self.hw.regs().write(INT_ACK, INT_ACK_MASK) {
            error!("{}: failed to acknowledge interrupts: {err}", self.config.name);
        }
        true
    }
}
