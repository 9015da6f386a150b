//! Channels sharing one block from several threads.

mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{Rig, STEP_NS};
use proptest::prelude::*;
use sti_pwm::layout::*;
use sti_pwm::CaptureResult;

const LONG: Duration = Duration::from_secs(5);

/// Edge tick values per channel: 1000/400 ns on channel 0, 2000/500 ns on 1.
const TICKS: [[u32; 3]; 2] = [[100, 140, 200], [1_000, 1_050, 1_200]];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn interleaved_captures_stay_independent(
        order in Just(vec![0u32, 0, 0, 1, 1, 1]).prop_shuffle()
    ) {
        let rig = Rig::new();
        let waiters: Vec<_> = (0..2)
            .map(|channel| {
                let ctl = rig.ctl.clone();
                thread::spawn(move || ctl.capture(channel, LONG))
            })
            .collect();
        rig.wait_armed(0);
        rig.wait_armed(1);
        prop_assert_eq!(PWM_CPT_INT_EN.decode(rig.regs.peek(INT_EN)), 0b11);

        let mut seen = [0usize; 2];
        for channel in order {
            let n = seen[channel as usize];
            prop_assert!(rig.edge(channel, TICKS[channel as usize][n]));
            seen[channel as usize] += 1;
            if n < 2 {
                // The other capture still relies on the shared enable.
                prop_assert_eq!(PWM_CPT_EN.decode(rig.regs.peek(CTRL)), 1);
            }
        }

        let results: Vec<_> = waiters
            .into_iter()
            .map(|waiter| waiter.join().unwrap())
            .collect();
        prop_assert_eq!(
            results,
            vec![
                Ok(CaptureResult { period_ns: 1_000, duty_ns: 400 }),
                Ok(CaptureResult { period_ns: 2_000, duty_ns: 500 }),
            ]
        );
        prop_assert_eq!(PWM_CPT_EN.decode(rig.regs.peek(CTRL)), 0);
        prop_assert_eq!(rig.regs.peek(INT_EN), 0);
        prop_assert!(rig.clocks_idle());
    }
}

#[test]
fn cancelling_one_capture_keeps_the_other_armed() {
    let rig = Rig::new();
    let first = {
        let ctl = rig.ctl.clone();
        thread::spawn(move || ctl.capture(0, LONG))
    };
    let second = {
        let ctl = rig.ctl.clone();
        thread::spawn(move || ctl.capture(3, LONG))
    };
    rig.wait_armed(0);
    rig.wait_armed(3);

    rig.ctl.cancel_capture(0).unwrap();
    assert!(first.join().unwrap().is_err());

    assert_eq!(PWM_CPT_EN.decode(rig.regs.peek(CTRL)), 1);
    assert_eq!(PWM_CPT_INT_EN.decode(rig.regs.peek(INT_EN)), 1 << 3);

    for ticks in TICKS[0] {
        rig.edge(3, ticks);
    }
    assert_eq!(
        second.join().unwrap(),
        Ok(CaptureResult {
            period_ns: 1_000,
            duty_ns: 400
        })
    );
}

#[test]
fn enable_disable_from_many_threads_balances() {
    let rig = Rig::new();
    rig.ctl.configure(0, STEP_NS / 2, STEP_NS).unwrap();

    let workers: Vec<_> = (0..4)
        .map(|channel| {
            let ctl = Arc::clone(&rig.ctl);
            thread::spawn(move || {
                for _ in 0..50 {
                    ctl.enable(channel).unwrap();
                    ctl.disable(channel).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(rig.ctl.arbiter_state().enable_count, 0);
    assert!(!rig.ctl.is_output_enabled());
    assert_eq!(PWM_OUT_EN.decode(rig.regs.peek(CTRL)), 0);
    assert!(rig.clocks_idle());
    assert_eq!(rig.pwm_clk.underflows(), 0);
}

#[test]
fn configure_races_resolve_to_one_period() {
    let rig = Rig::new();
    let periods = [STEP_NS * 2, STEP_NS * 3];

    let workers: Vec<_> = periods
        .iter()
        .enumerate()
        .map(|(channel, &period)| {
            let ctl = Arc::clone(&rig.ctl);
            thread::spawn(move || ctl.configure(channel as u32, 0, period).is_ok())
        })
        .collect();
    let accepted: Vec<bool> = workers.into_iter().map(|w| w.join().unwrap()).collect();

    assert_eq!(accepted.iter().filter(|&&ok| ok).count(), 1);
    let state = rig.ctl.arbiter_state();
    assert_eq!(state.configured_count(), 1);
    let winner = accepted.iter().position(|&ok| ok).unwrap();
    assert_eq!(state.current_period(), Some(periods[winner]));
}
