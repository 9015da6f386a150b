use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;
use serde::Serialize;
use sti_pwm::layout::{self, INT_ACK, INT_STA, WINDOW_SIZE};
use sti_pwm::{ControllerConfig, OutputConfig, PwmController, PwmState};
use sti_pwm_hal::mock::{MockClock, MockRegisters};
use sti_pwm_hal::register::REG_STRIDE;

pub type SimController = PwmController<Arc<MockRegisters>, Arc<MockClock>>;

/// Controller on mock ports, with handles kept for inspection.
pub struct Bench {
    pub regs: Arc<MockRegisters>,
    pub pwm_clk: Arc<MockClock>,
    pub cpt_clk: Arc<MockClock>,
    pub controller: Arc<SimController>,
}

/// Outcome of one `output` run.
#[derive(Debug, Serialize)]
pub struct OutputReport {
    pub channel: u32,
    pub state: PwmState,
    pub applied: OutputConfig,
    pub registers: BTreeMap<String, String>,
}

impl Bench {
    /// Both clocks run at `clock_hz`.
    pub fn new(config: ControllerConfig, clock_hz: u64) -> sti_pwm::Result<Self> {
        let regs = Arc::new(MockRegisters::new(WINDOW_SIZE).with_clear_alias(INT_ACK, INT_STA));
        let pwm_clk = Arc::new(MockClock::new("pwm", clock_hz));
        let cpt_clk = Arc::new(MockClock::new("capture", clock_hz));
        let cpt = (config.capture_channels > 0).then(|| cpt_clk.clone());
        let controller = PwmController::new(config, regs.clone(), pwm_clk.clone(), cpt)?;
        debug!(
            "bench ready, {} and {} clocks at {clock_hz} Hz",
            pwm_clk.name(),
            cpt_clk.name()
        );

        Ok(Self {
            regs,
            pwm_clk,
            cpt_clk,
            controller: Arc::new(controller),
        })
    }

    /// Applies `period_ns`/`duty_ns` to `channel` and enables it.
    pub fn run_output(&self, channel: u32, period_ns: u64, duty_ns: u64) -> sti_pwm::Result<OutputReport> {
        let applied = self.controller.configure(channel, duty_ns, period_ns)?;
        self.controller.enable(channel)?;

        Ok(OutputReport {
            channel,
            state: self.controller.state(channel)?,
            applied,
            registers: self.register_dump(),
        })
    }

    /// Every non-zero register in the window, keyed by name.
    pub fn register_dump(&self) -> BTreeMap<String, String> {
        (0..WINDOW_SIZE)
            .step_by(REG_STRIDE as usize)
            .filter_map(|offset| {
                let value = self.regs.peek(offset);
                (value != 0).then(|| (register_name(offset), format!("{value:#010x}")))
            })
            .collect()
    }
}

pub fn register_name(offset: u32) -> String {
    let stride = REG_STRIDE;
    match offset {
        o if o < layout::cpt_val(0) => format!("OUT_VAL{}", o / stride),
        o if o < layout::cpt_edge(0) => format!("CPT_VAL{}", (o - layout::cpt_val(0)) / stride),
        o if o < layout::CTRL => format!("CPT_EDGE{}", (o - layout::cpt_edge(0)) / stride),
        layout::CTRL => "CTRL".into(),
        layout::INT_EN => "INT_EN".into(),
        layout::INT_STA => "INT_STA".into(),
        layout::INT_ACK => "INT_ACK".into(),
        o => format!("{o:#04x}"),
    }
}
