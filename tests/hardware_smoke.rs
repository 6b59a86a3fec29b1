//! Short runs on the real primitives and counter.
//!
//! Whether a threshold separates anything depends on the host CPU, so these
//! only check the shape of the report.

use rewind_calibrate::measurement::TimerKind;
use rewind_calibrate::output::{format_histogram, format_report, to_json};
use rewind_calibrate::{
    calibrate, ChannelKind, Config, HardwareCounter, Outcome, PointerChaseChannel, DEFAULT_SEED,
};

fn small_config() -> Config {
    Config {
        trials: 2_000,
        ..Config::default()
    }
}

fn check_report(kind: ChannelKind) {
    let report = calibrate(kind, small_config(), DEFAULT_SEED, HardwareCounter).expect("valid configuration");

    assert_eq!(report.metadata.channel, kind.to_string());
    assert_eq!(report.metadata.trials, 2_000);
    assert!(report.metadata.runtime_secs > 0.0);
    match kind {
        ChannelKind::Division => assert_eq!(report.metadata.seed, None),
        ChannelKind::PointerChase => assert_eq!(report.metadata.seed, Some(DEFAULT_SEED)),
    }

    match &report.outcome {
        Outcome::Calibrated(c) => {
            assert_eq!(c.zero.samples, 2_000);
            assert_eq!(c.one.samples, 2_000);
            assert!(c.zero.min <= c.zero.p1 && c.zero.p1 <= c.zero.median);
            assert!(c.one.median <= c.one.p99 && c.one.p99 <= c.one.max);
            assert!((0.0..=1.0).contains(&c.error_rate));
        }
        other => panic!("expected a calibration, got {:?}", other),
    }

    let histograms = report.histograms.as_ref().expect("debug is on by default");
    assert_eq!(format_histogram(histograms).lines().count(), 1024);
    assert!(format_report(&report, true).contains("threshold"));
    assert!(to_json(&report).is_ok());
}

#[test]
fn division_channel_smoke() {
    check_report(ChannelKind::Division);
}

#[test]
fn pointer_chase_channel_smoke() {
    check_report(ChannelKind::PointerChase);
}

#[test]
fn pointer_chase_table_is_reproducible() {
    let a = PointerChaseChannel::new(0xABCD);
    let b = PointerChaseChannel::new(0xABCD);
    assert_eq!(a.permutation(), b.permutation());
    assert_eq!(a.permutation().cycle_len(), a.permutation().len());
}

#[test]
fn counter_thread_run() {
    let counter = TimerKind::CounterThread.create_counter();
    let config = Config {
        trials: 200,
        ..Config::default()
    };
    let report = calibrate(ChannelKind::Division, config, DEFAULT_SEED, &counter).expect("valid configuration");
    assert!(report.outcome.calibration().is_some());
}
