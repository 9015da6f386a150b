#![allow(dead_code)]

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use sti_pwm::layout::{cpt_val, INT_ACK, INT_STA, PWM_CPT_INT_STAT, WINDOW_SIZE};
use sti_pwm::{ControllerConfig, PwmController};
use sti_pwm_hal::mock::{MockClock, MockRegisters};

pub type MockController = PwmController<Arc<MockRegisters>, Arc<MockClock>>;

pub const CLOCK_HZ: u64 = 100_000_000;
/// One counter sweep at 100 MHz.
pub const STEP_NS: u64 = 2_560;

pub struct Rig {
    pub regs: Arc<MockRegisters>,
    pub pwm_clk: Arc<MockClock>,
    pub cpt_clk: Arc<MockClock>,
    pub ctl: Arc<MockController>,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_config(ControllerConfig::default())
    }

    pub fn with_config(config: ControllerConfig) -> Self {
        let regs = Arc::new(MockRegisters::new(WINDOW_SIZE).with_clear_alias(INT_ACK, INT_STA));
        let pwm_clk = Arc::new(MockClock::new("pwm", CLOCK_HZ));
        let cpt_clk = Arc::new(MockClock::new("capture", CLOCK_HZ));
        let ctl = PwmController::new(
            config,
            regs.clone(),
            pwm_clk.clone(),
            Some(cpt_clk.clone()),
        )
        .expect("controller");
        regs.clear_journal();
        Self {
            regs,
            pwm_clk,
            cpt_clk,
            ctl: Arc::new(ctl),
        }
    }

    /// Latches `ticks` on `channel` and runs the interrupt handler, as the
    /// hardware would on an armed edge.
    pub fn edge(&self, channel: u32, ticks: u32) -> bool {
        self.regs.poke(cpt_val(channel), ticks);
        self.regs
            .raise(INT_STA, PWM_CPT_INT_STAT.encode(1 << channel));
        self.ctl.on_interrupt()
    }

    pub fn wait_armed(&self, channel: u32) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !self.ctl.capture_in_progress(channel).unwrap() {
            assert!(Instant::now() < deadline, "capture {channel} never armed");
            thread::sleep(Duration::from_millis(1));
        }
    }

    pub fn clocks_idle(&self) -> bool {
        self.pwm_clk.refs() == 0 && self.cpt_clk.refs() == 0
    }
}
