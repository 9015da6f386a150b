//! Ports shared by every component of one PWM block.

use log::trace;
use parking_lot::Mutex;
use sti_pwm_hal::{ClockPort, RegisterPort};

use crate::error::{PwmError, Result};
use crate::layout::PWM_CPT_EN;

/// Register window and clocks of one block.
///
/// The capture-enable bit in the control register is shared by every capture
/// channel; `capture_users` counts the channels currently relying on it.
pub struct Hardware<R, C> {
    regs: R,
    pwm_clk: C,
    cpt_clk: Option<C>,
    capture_users: Mutex<u32>,
}

impl<R: RegisterPort, C: ClockPort> Hardware<R, C> {
    pub fn new(regs: R, pwm_clk: C, cpt_clk: Option<C>) -> Self {
        Self {
            regs,
            pwm_clk,
            cpt_clk,
            capture_users: Mutex::new(0),
        }
    }

    pub fn regs(&self) -> &R {
        &self.regs
    }

    pub fn pwm_clock(&self) -> &C {
        &self.pwm_clk
    }

    pub fn capture_clock(&self) -> Option<&C> {
        self.cpt_clk.as_ref()
    }

    /// Enables the output clock, then the capture clock if present.
    ///
    /// Every reference taken is dropped again when the guard goes out of
    /// scope, including when enabling the second clock fails.
    pub fn enable_clocks(&self) -> Result<ClockGuard<'_, C>> {
        let mut guard = ClockGuard { taken: Vec::with_capacity(2) };
        self.pwm_clk.enable().map_err(PwmError::Clock)?;
        guard.taken.push(&self.pwm_clk);
        if let Some(cpt_clk) = &self.cpt_clk {
            cpt_clk.enable().map_err(PwmError::Clock)?;
            guard.taken.push(cpt_clk);
        }
        Ok(guard)
    }

    /// Drops the references left behind by [`ClockGuard::hold`].
    pub fn release_clocks(&self) {
        self.pwm_clk.disable();
        if let Some(cpt_clk) = &self.cpt_clk {
            cpt_clk.disable();
        }
    }

    /// Sets the shared capture-enable bit for the first active capture.
    pub fn acquire_capture_enable(&self) -> Result<()> {
        let mut users = self.capture_users.lock();
        if *users == 0 {
            PWM_CPT_EN.write(&self.regs, 1)?;
        }
        *users += 1;
        trace!("capture enable users: {}", *users);
        Ok(())
    }

    /// Clears the shared capture-enable bit once no capture remains active.
    pub fn release_capture_enable(&self) -> Result<()> {
        let mut users = self.capture_users.lock();
        *users = users.saturating_sub(1);
        trace!("capture enable users: {}", *users);
        if *users == 0 {
            PWM_CPT_EN.write(&self.regs, 0)?;
        }
        Ok(())
    }
}

/// Clock references taken by [`Hardware::enable_clocks`].
pub struct ClockGuard<'a, C: ClockPort> {
    taken: Vec<&'a C>,
}

impl<C: ClockPort> ClockGuard<'_, C> {
    /// Keeps the clocks running past the guard. The caller becomes
    /// responsible for a matching [`Hardware::release_clocks`].
    pub fn hold(mut self) {
        self.taken.clear();
    }
}

impl<C: ClockPort> Drop for ClockGuard<'_, C> {
    fn drop(&mut self) {
        for clk in self.taken.drain(..) {
            clk.disable();
        }
    }
}
