mod common;

use std::sync::Arc;

use sti_pwm::{ControllerConfig, PwmController, PwmError};
use sti_pwm_hal::mock::{MockClock, MockRegisters};

#[test]
fn defaults_describe_full_block() {
    let config = ControllerConfig::default();
    assert_eq!(config.output_channels, 4);
    assert_eq!(config.capture_channels, 4);
    assert_eq!(config.max_counter, 255);
    assert_eq!(config.max_prescale, 0xff);
    assert_eq!(config.npwm(), 4);
}

#[test]
fn builder_sets_every_field() {
    let config = ControllerConfig::builder()
        .name("pwm1")
        .output_channels(1)
        .capture_channels(3)
        .max_counter(127)
        .max_prescale(0x0f)
        .build()
        .unwrap();

    assert_eq!(config.name, "pwm1");
    assert_eq!(config.output_channels, 1);
    assert_eq!(config.capture_channels, 3);
    assert_eq!(config.max_counter, 127);
    assert_eq!(config.max_prescale, 0x0f);
    assert_eq!(config.npwm(), 3);
}

#[test]
fn builder_rejects_invalid_limits() {
    let rejected = [
        ControllerConfig::builder()
            .output_channels(0)
            .capture_channels(0)
            .build(),
        ControllerConfig::builder().output_channels(5).build(),
        ControllerConfig::builder().capture_channels(8).build(),
        ControllerConfig::builder().max_counter(0).build(),
        ControllerConfig::builder().max_prescale(0x100).build(),
    ];

    for result in rejected {
        assert!(matches!(result, Err(PwmError::Config(_))), "{result:?}");
    }
}

#[test]
fn capture_channels_need_capture_clock() {
    let regs = Arc::new(MockRegisters::new(sti_pwm::layout::WINDOW_SIZE));
    let clk = Arc::new(MockClock::new("pwm", common::CLOCK_HZ));

    let err = PwmController::new(ControllerConfig::default(), regs.clone(), clk.clone(), None)
        .err()
        .unwrap();
    assert_eq!(err, PwmError::MissingCaptureClock);
    assert!(regs.journal().is_empty());

    let output_only = ControllerConfig::builder()
        .capture_channels(0)
        .build()
        .unwrap();
    let ctl = PwmController::new(output_only, regs, clk.clone(), None).unwrap();
    ctl.configure(0, 0, common::STEP_NS).unwrap();
    assert_eq!(clk.refs(), 0);
}

#[test]
fn smaller_counter_shrinks_prescaler_step() {
    let rig = common::Rig::with_config(
        ControllerConfig::builder()
            .max_counter(127)
            .build()
            .unwrap(),
    );

    let applied = rig.ctl.configure(0, 640, 1_280 * 3).unwrap();

    assert_eq!(applied.prescale, 2);
    assert_eq!(applied.raw_compare, 127 * 640 / 3_840);
}

#[test]
fn prescale_limit_is_enforced() {
    let rig = common::Rig::with_config(
        ControllerConfig::builder()
            .max_prescale(0x0f)
            .build()
            .unwrap(),
    );

    assert!(rig.ctl.configure(0, 0, common::STEP_NS * 16).is_ok());
    assert_eq!(
        rig.ctl.configure(0, 0, common::STEP_NS * 17),
        Err(PwmError::OutOfRange {
            prescale: 16,
            max: 0x0f
        })
    );
}
