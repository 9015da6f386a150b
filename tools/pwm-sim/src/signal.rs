//! Synthetic square wave fed into a capture channel.

use std::panic;
use std::thread;
use std::time::{Duration, Instant};

use log::{info, trace, warn};
use serde::Serialize;
use sti_pwm::layout::{cpt_val, INT_STA, PWM_CPT_INT_STAT};
use sti_pwm::prescaler::NSEC_PER_SEC;
use sti_pwm::CaptureResult;
use sti_pwm_hal::ClockPort;

use crate::bench::Bench;

/// Square wave as seen by the capture counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SignalGenerator {
    pub period_ns: u64,
    pub duty_ns: u64,
    /// Counter value at the first rising edge.
    pub start_tick: u32,
    /// Edges delivered before the generator stops.
    pub edges: u8,
    #[serde(skip)]
    pub edge_gap: Duration,
}

/// Outcome of one `capture` run.
#[derive(Debug, Serialize)]
pub struct CaptureReport {
    pub channel: u32,
    pub signal: SignalGenerator,
    pub delivered: u8,
    pub result: CaptureResult,
}

impl SignalGenerator {
    pub fn new(period_ns: u64, duty_ns: u64) -> Self {
        Self {
            period_ns,
            duty_ns,
            start_tick: 0,
            edges: 3,
            edge_gap: Duration::from_millis(1),
        }
    }

    /// Counter values of the rising, falling and next rising edge.
    pub fn edge_ticks(&self, clock_hz: u64) -> [u32; 3] {
        let to_ticks =
            |ns: u64| (u128::from(ns) * u128::from(clock_hz) / u128::from(NSEC_PER_SEC)) as u32;
        let high = to_ticks(self.duty_ns);
        let period = to_ticks(self.period_ns);
        [
            self.start_tick,
            self.start_tick.wrapping_add(high),
            self.start_tick.wrapping_add(period),
        ]
    }

    /// Measures this signal on `channel`: the capture blocks on the calling
    /// thread while a generator thread drives the interrupt line.
    pub fn capture(
        &self,
        bench: &Bench,
        channel: u32,
        timeout: Duration,
    ) -> sti_pwm::Result<CaptureReport> {
        let ticks = self.edge_ticks(bench.cpt_clk.rate_hz());
        let generator = {
            let regs = bench.regs.clone();
            let controller = bench.controller.clone();
            let signal = *self;
            thread::spawn(move || -> sti_pwm::Result<u8> {
                let deadline = Instant::now() + timeout;
                while !controller.capture_in_progress(channel)? {
                    if Instant::now() >= deadline {
                        warn!("capture {channel} never armed");
                        return Ok(0);
                    }
                    thread::yield_now();
                }

                let mut delivered = 0;
                for &tick in ticks.iter().take(usize::from(signal.edges)) {
                    thread::sleep(signal.edge_gap);
                    regs.poke(cpt_val(channel), tick);
                    regs.raise(INT_STA, PWM_CPT_INT_STAT.encode(1 << channel));
                    trace!("edge at tick {tick} on capture {channel}");
                    if controller.on_interrupt() {
                        delivered += 1;
                    }
                }
                Ok(delivered)
            })
        };

        let result = bench.controller.capture(channel, timeout);
        let delivered = generator
            .join()
            .unwrap_or_else(|payload| panic::resume_unwind(payload));
        let result = result?;
        let delivered = delivered?;
        info!(
            "capture {channel}: period {} ns, duty {} ns",
            result.period_ns, result.duty_ns
        );

        Ok(CaptureReport {
            channel,
            signal: *self,
            delivered,
            result,
        })
    }
}
