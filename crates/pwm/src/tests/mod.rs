use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use sti_pwm_hal::mock::{MockClock, MockRegisters};

use crate::capture::{CapturePhase, CaptureStateMachine};
use crate::hw::Hardware;
use crate::layout::{INT_ACK, INT_STA, WINDOW_SIZE};


pub(crate) type MockHardware = Hardware<Arc<MockRegisters>, Arc<MockClock>>;

pub(crate) const CLOCK_HZ: u64 = 100_000_000;

pub(crate) struct Bench {
    pub regs: Arc<MockRegisters>,
    pub pwm_clk: Arc<MockClock>,
    pub cpt_clk: Arc<MockClock>,
    pub hw: Arc<MockHardware>,
}

pub(crate) fn bench() -> Bench {
    let regs = Arc::new(MockRegisters::new(WINDOW_SIZE).with_clear_alias(INT_ACK, INT_STA));
    let pwm_clk = Arc::new(MockClock::new("pwm", CLOCK_HZ));
    let cpt_clk = Arc::new(MockClock::new("capture", CLOCK_HZ));
    let hw = Arc::new(Hardware::new(
        regs.clone(),
        pwm_clk.clone(),
        Some(cpt_clk.clone()),
    ));
    Bench {
        regs,
        pwm_clk,
        cpt_clk,
        hw,
    }
}

/// Spins until a capture on `unit` has finished arming.
pub(crate) fn wait_armed(unit: &CaptureStateMachine<Arc<MockRegisters>, Arc<MockClock>>) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while unit.sample().phase != CapturePhase::Armed {
        assert!(Instant::now() < deadline, "capture never armed");
        thread::sleep(Duration::from_millis(1));
    }
}
