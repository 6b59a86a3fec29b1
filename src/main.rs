//! Command-line front end.
//!
//! Usage:
//! ```bash
//! rewind-calibrate                       # division channel, depth 9, 1M trials
//! rewind-calibrate -b 4 -c pointer-chase # shallower training, cache channel
//! rewind-calibrate --simulate --json     # no hardware needed
//! rewind-calibrate --histogram 2> hist.tsv
//! ```

use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use rewind_calibrate::measurement::{PriorityGuard, PriorityResult};
use rewind_calibrate::output::{format_histogram, format_report, to_json_pretty};
use rewind_calibrate::preflight::run_all_checks;
use rewind_calibrate::simulation::{SimulatedChannel, SimulationModel, VirtualClock};
use rewind_calibrate::{
    calibrate, CalibrationReport, Calibrator, ChannelKind, Config, ConfigError, CycleCounter,
    TimerKind, DEFAULT_DEPTH, DEFAULT_SEED, DEFAULT_SPACING, DEFAULT_TRIALS, MAX_CYCLES,
};

/// Calibrate the timing threshold of a speculative-execution covert channel
#[derive(Parser, Debug)]
#[command(name = "rewind-calibrate")]
#[command(about = "Train a branch, time the misprediction window, derive a threshold")]
#[command(version)]
struct Args {
    /// Branch-predictor training depth (consistent outcomes before each probe)
    #[arg(short = 'b', long, default_value_t = DEFAULT_DEPTH)]
    depth: usize,

    /// Number of trials; each yields one sample per bit value
    #[arg(short = 'n', long, default_value_t = DEFAULT_TRIALS)]
    trials: usize,

    /// Channel primitive
    #[arg(short, long, value_enum, default_value_t = ChannelArg::Division)]
    channel: ChannelArg,

    /// Cycle counter (auto: counter thread on aarch64, hardware elsewhere)
    #[arg(long, value_enum, default_value_t = TimerArg::Auto)]
    timer: TimerArg,

    /// Busy-wait iterations before each invocation (must be > 13)
    #[arg(long, default_value_t = DEFAULT_SPACING)]
    spacing: usize,

    /// Seed for the pointer-chase permutation and the simulated channel
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Only print the threshold, error rate and transfer rate
    #[arg(short, long)]
    quiet: bool,

    /// Dump the normalized per-cycle histogram to stderr
    #[arg(long)]
    histogram: bool,

    /// Print the report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Use the simulated channel and a virtual clock instead of hardware
    #[arg(long)]
    simulate: bool,

    /// Do not try to raise the process priority
    #[arg(long)]
    no_priority: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ChannelArg {
    Division,
    PointerChase,
}

impl From<ChannelArg> for ChannelKind {
    fn from(arg: ChannelArg) -> Self {
        match arg {
            ChannelArg::Division => ChannelKind::Division,
            ChannelArg::PointerChase => ChannelKind::PointerChase,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TimerArg {
    Auto,
    Hardware,
    CounterThread,
}

impl From<TimerArg> for TimerKind {
    fn from(arg: TimerArg) -> Self {
        match arg {
            TimerArg::Auto => TimerKind::Auto,
            TimerArg::Hardware => TimerKind::Hardware,
            TimerArg::CounterThread => TimerKind::CounterThread,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config {
        depth: args.depth,
        trials: args.trials,
        spacing: args.spacing,
        max_cycles: MAX_CYCLES,
        debug: !args.quiet || args.histogram,
    };
    if let Err(e) = config.validate() {
        tracing::error!("{}", e);
        return ExitCode::from(2);
    }

    let _priority = if args.no_priority {
        None
    } else {
        match PriorityGuard::try_elevate() {
            PriorityResult::Elevated(guard) => Some(guard),
            PriorityResult::NotElevated { reason } => {
                tracing::warn!("Running at normal priority: {}", reason);
                None
            }
        }
    };

    let report = match run(&args, config) {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::from(2);
        }
    };

    if args.json {
        match to_json_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                tracing::error!("Failed to serialize report: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print!("{}", format_report(&report, !args.quiet));
    }

    if args.histogram {
        match &report.histograms {
            Some(dump) => eprint!("{}", format_histogram(dump)),
            None => tracing::warn!("No histogram collected"),
        }
    }

    ExitCode::SUCCESS
}

fn run(args: &Args, config: Config) -> Result<CalibrationReport, ConfigError> {
    if args.simulate {
        tracing::info!(
            "Simulating {} trials at depth {} (seed {:#x})",
            config.trials,
            config.depth,
            args.seed
        );
        let clock = VirtualClock::new();
        let mut channel =
            SimulatedChannel::new(SimulationModel::default(), clock.clone(), args.seed);
        return Calibrator::with_config(config).run(&mut channel, clock);
    }

    let counter = TimerKind::from(args.timer).create_counter();
    run_all_checks(&counter).log();

    let kind = ChannelKind::from(args.channel);
    tracing::info!(
        "Calibrating {} channel: {} trials at depth {}, timer {}",
        kind,
        config.trials,
        config.depth,
        counter.name()
    );
    calibrate(kind, config, args.seed, &counter)
}
