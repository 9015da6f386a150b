use std::time::Duration;

use sti_pwm::{CaptureResult, ControllerConfig};

use crate::{Bench, SignalGenerator};

const CLOCK_HZ: u64 = 100_000_000;

#[test]
fn edge_ticks_follow_duty_and_period() {
    let signal = SignalGenerator {
        start_tick: 100,
        ..SignalGenerator::new(1_000, 400)
    };
    assert_eq!(signal.edge_ticks(CLOCK_HZ), [100, 140, 200]);
}

#[test]
fn edge_ticks_wrap_with_counter() {
    let signal = SignalGenerator {
        start_tick: u32::MAX - 9,
        ..SignalGenerator::new(1_000, 500)
    };
    assert_eq!(signal.edge_ticks(CLOCK_HZ), [u32::MAX - 9, 40, 90]);
}

#[test]
fn capture_measures_generated_signal() {
    let bench = Bench::new(ControllerConfig::default(), CLOCK_HZ).unwrap();
    let signal = SignalGenerator::new(20_000, 5_000);

    let report = signal.capture(&bench, 2, Duration::from_secs(5)).unwrap();

    assert_eq!(report.delivered, 3);
    assert_eq!(
        report.result,
        CaptureResult {
            period_ns: 20_000,
            duty_ns: 5_000
        }
    );
    assert_eq!(bench.cpt_clk.refs(), 0);
}

#[test]
fn quiet_input_times_out_with_zero_result() {
    let bench = Bench::new(ControllerConfig::default(), CLOCK_HZ).unwrap();
    let signal = SignalGenerator {
        edges: 1,
        ..SignalGenerator::new(20_000, 5_000)
    };

    let report = signal
        .capture(&bench, 0, Duration::from_millis(50))
        .unwrap();

    assert_eq!(report.result, CaptureResult::default());
}
