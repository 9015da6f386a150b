use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::{Builder, Env};
use pwm_sim::{Bench, SignalGenerator};
use serde::Serialize;
use sti_pwm::ControllerConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "Drive an STi PWM controller on simulated hardware")]
struct Opts {
    /// Controller configuration as JSON; defaults to the full four-channel block
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Rate of both the output and the capture clock
    #[arg(long, default_value_t = 100_000_000, value_name = "HZ")]
    clock_hz: u64,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Configure and enable one output channel, then dump the registers
    Output {
        #[arg(short, long, default_value_t = 0)]
        channel: u32,
        #[arg(long, value_name = "NS")]
        period_ns: u64,
        #[arg(long, value_name = "NS")]
        duty_ns: u64,
    },
    /// Measure a synthetic square wave on one capture channel
    Capture {
        #[arg(short, long, default_value_t = 0)]
        channel: u32,
        #[arg(long, value_name = "NS")]
        period_ns: u64,
        #[arg(long, value_name = "NS")]
        duty_ns: u64,
        /// Edges delivered before the input goes quiet
        #[arg(long, default_value_t = 3)]
        edges: u8,
        /// Counter value at the first rising edge
        #[arg(long, default_value_t = 0)]
        start_tick: u32,
        #[arg(long, default_value_t = 100, value_name = "MS")]
        timeout_ms: u64,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<ControllerConfig> {
    let Some(path) = path else {
        return Ok(ControllerConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config: ControllerConfig = serde_json::from_str(&text)
        .with_context(|| format!("parsing {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

fn emit<T: Serialize>(report: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };
    println!("{json}");
    Ok(())
}

fn main() -> Result<()> {
    Builder::from_env(Env::default().default_filter_or(log::LevelFilter::Warn.as_str())).init();

    let opts = Opts::parse();
    let config = load_config(opts.config.as_ref())?;
    let bench = Bench::new(config, opts.clock_hz).context("creating controller")?;

    match opts.command {
        Command::Output {
            channel,
            period_ns,
            duty_ns,
        } => {
            let report = bench
                .run_output(channel, period_ns, duty_ns)
                .with_context(|| format!("configuring output {channel}"))?;
            emit(&report, opts.pretty)
        }
        Command::Capture {
            channel,
            period_ns,
            duty_ns,
            edges,
            start_tick,
            timeout_ms,
        } => {
            let signal = SignalGenerator {
                edges,
                start_tick,
                ..SignalGenerator::new(period_ns, duty_ns)
            };
            let report = signal
                .capture(&bench, channel, Duration::from_millis(timeout_ms))
                .with_context(|| format!("capturing on channel {channel}"))?;
            emit(&report, opts.pretty)
        }
    }
}
