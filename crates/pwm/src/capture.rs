//! Input capture: period and duty measurement on one channel.
//!
//! ```text
//!      _______                   _______
//!     |       |                 |       |
//!   __|       |_________________|       |________
//!     ^0      ^1                ^2
//! ```
//!
//! Capture starts on the first rising edge. Each latched edge stores the
//! counter snapshot and flips the armed edge, so snapshots 0, 1 and 2 bracket
//! one high and one low interval. The third edge disables edge detection and
//! wakes the waiting caller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, trace};
use parking_lot::{Condvar, Mutex};
use sti_pwm_hal::{ClockPort, RegisterPort};

use crate::error::{PwmError, Result};
use crate::hw::Hardware;
use crate::layout::{cpt_edge, cpt_val, CaptureEdge, CPT_EDGE_MASK, PWM_CPT_INT_EN};
use crate::prescaler::NSEC_PER_SEC;

/// Measured input waveform. Both fields are zero when no complete high/low
/// pair was seen before the timeout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CaptureResult {
    pub period_ns: u64,
    pub duty_ns: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Idle,
    Armed,
    Complete,
}

/// What one edge interrupt did to the capture state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeEvent {
    /// No capture armed on this channel.
    Ignored,
    /// Snapshot stored at `index`, armed edge flipped.
    Stored { index: u8 },
    /// Closing snapshot stored, waiter woken.
    Completed,
}

/// Snapshots collected since the capture was armed.
#[derive(Debug, Clone)]
pub struct CaptureSample {
    pub snapshot: [u32; 3],
    pub index: u8,
    pub edge: CaptureEdge,
    pub phase: CapturePhase,
    cancelled: bool,
    holds_enable: bool,
}

impl Default for CaptureSample {
    fn default() -> Self {
        Self {
            snapshot: [0; 3],
            index: 0,
            edge: CaptureEdge::Disabled,
            phase: CapturePhase::Idle,
            cancelled: false,
            holds_enable: false,
        }
    }
}

impl CaptureSample {
    /// High and low interval in capture clock ticks. The counter wraps.
    pub fn intervals(&self) -> (u32, u32) {
        (
            self.snapshot[1].wrapping_sub(self.snapshot[0]),
            self.snapshot[2].wrapping_sub(self.snapshot[1]),
        )
    }
}

fn ticks_to_ns(ticks: u64, rate_hz: u64) -> u64 {
    (u128::from(ticks) * u128::from(NSEC_PER_SEC) / u128::from(rate_hz)) as u64
}

pub struct CaptureStateMachine<R, C> {
    channel: u32,
    hw: Arc<Hardware<R, C>>,
    sample: Mutex<CaptureSample>,
    wake: Condvar,
}

impl<R: RegisterPort, C: ClockPort> CaptureStateMachine<R, C> {
    pub fn new(channel: u32, hw: Arc<Hardware<R, C>>) -> Self {
        Self {
            channel,
            hw,
            sample: Mutex::new(CaptureSample::default()),
            wake: Condvar::new(),
        }
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }

    pub fn sample(&self) -> CaptureSample {
        self.sample.lock().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.sample.lock().phase != CapturePhase::Idle
    }

    /// Arms the channel and blocks until one high/low pair has been
    /// measured, `timeout` expires, or [`cancel`](Self::cancel) is called.
    ///
    /// A capture already running on this channel is rejected, not queued.
    pub fn start_capture(&self, timeout: Duration) -> Result<CaptureResult> {
        let mut sample = self.sample.lock();
        if sample.phase != CapturePhase::Idle {
            return Err(PwmError::CaptureBusy(self.channel));
        }
        *sample = CaptureSample {
            phase: CapturePhase::Armed,
            ..CaptureSample::default()
        };

        let clocks = match self.hw.enable_clocks() {
            Ok(clocks) => clocks,
            Err(err) => {
                sample.phase = CapturePhase::Idle;
                return Err(err);
            }
        };

        if let Err(err) = self.arm(&mut sample) {
            error!("failed to enable PWM capture {}: {err}", self.channel);
            // Cleanup errors are secondary to the arming failure.
            let _ = self.disarm(&mut sample);
            sample.phase = CapturePhase::Idle;
            return Err(err);
        }
        debug!("capture {} armed, timeout {timeout:?}", self.channel);

        // No deadline when the timeout does not fit an `Instant`.
        let deadline = Instant::now().checked_add(timeout);
        while sample.phase == CapturePhase::Armed && !sample.cancelled {
            match deadline {
                Some(deadline) => {
                    if self.wake.wait_until(&mut sample, deadline).timed_out() {
                        break;
                    }
                }
                None => self.wake.wait(&mut sample),
            }
        }

        let cleanup = self.disarm(&mut sample);
        drop(clocks);
        let outcome = self.evaluate(&sample);
        sample.phase = CapturePhase::Idle;
        drop(sample);

        outcome.and_then(|result| cleanup.map(|()| result))
    }

    /// Wakes an armed waiter with [`PwmError::Cancelled`].
    ///
    /// Returns `false` when nothing was armed.
    pub fn cancel(&self) -> bool {
        let mut sample = self.sample.lock();
        if sample.phase != CapturePhase::Armed {
            return false;
        }
        sample.cancelled = true;
        self.wake.notify_all();
        true
    }

    /// Latches the current snapshot. Called from interrupt dispatch; never
    /// blocks beyond the channel's own lock.
    pub fn on_edge(&self) -> Result<EdgeEvent> {
        let mut sample = self.sample.lock();
        if sample.phase != CapturePhase::Armed {
            debug!("capture {}: edge while {:?}, ignored", self.channel, sample.phase);
            return Ok(EdgeEvent::Ignored);
        }

        let regs = self.hw.regs();
        let value = regs.read(cpt_val(self.channel))?;
        trace!(
            "capture {}: edge {} value {value}",
            self.channel,
            sample.index
        );

        match sample.index {
            index @ (0 | 1) => {
                sample.snapshot[usize::from(index)] = value;
                let edge = regs.read(cpt_edge(self.channel))? ^ CPT_EDGE_MASK;
                regs.write(cpt_edge(self.channel), edge)?;
                sample.edge = CaptureEdge::from_bits(edge);
                sample.index += 1;
                Ok(EdgeEvent::Stored { index })
            }
            2 => {
                sample.snapshot[2] = value;
                sample.phase = CapturePhase::Complete;
                self.wake.notify_all();
                sample.edge = CaptureEdge::Disabled;
                regs.write(cpt_edge(self.channel), CaptureEdge::Disabled.bits())?;
                Ok(EdgeEvent::Completed)
            }
            index => {
                error!("capture {}: internal error, index {index}", self.channel);
                sample.edge = CaptureEdge::Disabled;
                regs.write(cpt_edge(self.channel), CaptureEdge::Disabled.bits())?;
                Err(PwmError::InternalFault {
                    channel: self.channel,
                    index,
                })
            }
        }
    }

    fn int_bit(&self) -> u32 {
        PWM_CPT_INT_EN.encode(1 << self.channel)
    }

    fn arm(&self, sample: &mut CaptureSample) -> Result<()> {
        let regs = self.hw.regs();
        regs.write(cpt_edge(self.channel), CaptureEdge::Rising.bits())?;
        sample.edge = CaptureEdge::Rising;
        regs.update_bits(PWM_CPT_INT_EN.reg, self.int_bit(), self.int_bit())?;
        self.hw.acquire_capture_enable()?;
        sample.holds_enable = true;
        Ok(())
    }

    /// Edge detection off first, then the interrupt bit, then the shared
    /// capture enable. Every step runs even when an earlier one fails.
    fn disarm(&self, sample: &mut CaptureSample) -> Result<()> {
        let regs = self.hw.regs();
        let edge = regs.write(cpt_edge(self.channel), CaptureEdge::Disabled.bits());
        sample.edge = CaptureEdge::Disabled;
        let int_en = regs.update_bits(PWM_CPT_INT_EN.reg, self.int_bit(), 0);
        let cpt_en = if sample.holds_enable {
            sample.holds_enable = false;
            self.hw.release_capture_enable()
        } else {
            Ok(())
        };
        edge?;
        int_en?;
        cpt_en
    }

    fn evaluate(&self, sample: &CaptureSample) -> Result<CaptureResult> {
        if sample.phase != CapturePhase::Complete && sample.cancelled {
            debug!("capture {} cancelled", self.channel);
            return Err(PwmError::Cancelled);
        }

        match sample.index {
            // Constant input, a signal below the detectable frequency, or no
            // input at all.
            0 | 1 => Ok(CaptureResult::default()),
            2 if sample.phase == CapturePhase::Complete => {
                let (high, low) = sample.intervals();
                let rate = self
                    .hw
                    .capture_clock()
                    .map(|clk| clk.rate_hz())
                    .ok_or(PwmError::MissingCaptureClock)?;
                if rate == 0 {
                    return Err(PwmError::InvalidClockRate(rate));
                }
                let high = u64::from(high);
                let low = u64::from(low);
                Ok(CaptureResult {
                    period_ns: ticks_to_ns(high + low, rate),
                    duty_ns: ticks_to_ns(high, rate),
                })
            }
            // Timed out waiting for the closing edge.
            2 => Ok(CaptureResult::default()),
            index => {
                error!("capture {}: internal error, index {index}", self.channel);
                Err(PwmError::InternalFault {
                    channel: self.channel,
                    index,
                })
            }
        }
    }
}
