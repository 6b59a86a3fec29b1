//! Terminal output formatting with colors.

use colored::Colorize;

use crate::result::{Calibration, CalibrationReport, HistogramDump, Outcome};
use crate::statistics::{ClassSummary, ThresholdRule};

/// Format a report for human-readable terminal output.
///
/// With `debug` set, the per-class percentile lines and error counts are
/// included.
pub fn format_report(report: &CalibrationReport, debug: bool) -> String {
    let mut output = String::new();
    let sep = "\u{2500}".repeat(62);
    let meta = &report.metadata;

    output.push_str("rewind-calibrate\n");
    output.push_str(&sep);
    output.push('\n');
    output.push_str(&format!(
        "  Channel: {}   Timer: {}   Depth: {}   Trials: {}\n\n",
        meta.channel, meta.timer, meta.depth, meta.trials
    ));
    if let Some(seed) = meta.seed {
        output.push_str(&format!("  Seed: {:#x}\n\n", seed));
    }

    match &report.outcome {
        Outcome::InsufficientData {
            zero_samples,
            one_samples,
        } => {
            output.push_str(&format!(
                "  {} not enough probe samples (bit 0: {}, bit 1: {})\n",
                marker(Level::Failure),
                zero_samples,
                one_samples
            ));
        }
        Outcome::Calibrated(calibration) => {
            if debug {
                output.push_str(&format_percentiles(calibration));
            }
            output.push_str(&format!(
                "  {} threshold: {} cycles ({})\n",
                marker(Level::Success),
                calibration.threshold.to_string().bold(),
                format_rule(calibration.rule)
            ));
            if debug {
                output.push_str(&format_error_counts(calibration));
            }
            output.push_str(&format!(
                "  {} error rate: {}\n",
                marker(Level::Info),
                format_error_rate(calibration.error_rate)
            ));
            if !calibration.is_usable() {
                output.push_str(&format!(
                    "  {} misreads too often to carry data on this core\n",
                    marker(Level::Failure)
                ));
            }
        }
    }

    output.push_str(&format!(
        "  {} transfer rate: {:.2} KB/s\n",
        marker(Level::Info),
        meta.kb_per_sec()
    ));
    output.push_str(&sep);
    output.push('\n');

    output
}

/// One line per cycle value: `cycle \t zero \t one \t train`.
pub fn format_histogram(dump: &HistogramDump) -> String {
    let mut output = String::new();
    for (i, ((zero, one), train)) in dump
        .zero
        .iter()
        .zip(&dump.one)
        .zip(&dump.train)
        .enumerate()
    {
        output.push_str(&format!("{}\t{:.5}\t{:.5}\t{:.5}\n", i, zero, one, train));
    }
    output
}

fn format_percentiles(calibration: &Calibration) -> String {
    let mut output = String::new();
    for (bit, summary) in [(0, &calibration.zero), (1, &calibration.one)] {
        output.push_str(&format!(
            "  {} bit {} timing (min, 1pct, median, 99pct, max): {}\n",
            marker(Level::Info),
            bit,
            format_tuple(summary)
        ));
    }
    output
}

fn format_tuple(summary: &ClassSummary) -> String {
    let (min, p1, median, p99, max) = summary.as_tuple();
    format!(
        "({:4}, {:4}, {:4}, {:4}, {:4})",
        min, p1, median, p99, max
    )
}

fn format_error_counts(calibration: &Calibration) -> String {
    let errors = &calibration.errors;
    format!(
        "  {} absent misread: {}/{} ({:.2}%)\n  {} present misread: {}/{} ({:.2}%)\n",
        marker(Level::Info),
        errors.false_positives,
        errors.absent,
        errors.false_positive_rate() * 100.0,
        marker(Level::Info),
        errors.false_negatives,
        errors.present,
        errors.false_negative_rate() * 100.0
    )
}

fn format_error_rate(rate: f64) -> String {
    let text = format!("{:.2}%", rate * 100.0);
    if rate < 0.05 {
        text.green().to_string()
    } else if rate < 0.25 {
        text.yellow().to_string()
    } else {
        text.red().to_string()
    }
}

fn format_rule(rule: ThresholdRule) -> String {
    match rule {
        ThresholdRule::CleanGap => rule.to_string().green().to_string(),
        ThresholdRule::MedianSplit => rule.to_string().yellow().to_string(),
    }
}

enum Level {
    Failure,
    Info,
    Success,
}

fn marker(level: Level) -> String {
    match level {
        Level::Failure => "[-]".red().bold().to_string(),
        Level::Info => "[.]".yellow().bold().to_string(),
        Level::Success => "[+]".green().bold().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibrator::analyze;
    use crate::result::Metadata;
    use crate::types::Polarity;

    fn report(outcome: Outcome) -> CalibrationReport {
        CalibrationReport {
            outcome,
            metadata: Metadata {
                channel: "division".into(),
                timer: "rdtsc".into(),
                depth: 9,
                trials: 1000,
                spacing: 16,
                seed: None,
                runtime_secs: 0.01,
            },
            histograms: None,
        }
    }

    #[test]
    fn test_format_calibrated() {
        colored::control::set_override(false);
        let outcome = analyze(&vec![10; 1000], &vec![50; 1000], Polarity::OneSlower);
        let text = format_report(&report(outcome), true);

        assert!(text.contains("threshold: 30 cycles (clean gap)"), "{}", text);
        assert!(text.contains("bit 0 timing (min, 1pct, median, 99pct, max): (  10,   10,   10,   10,   10)"));
        assert!(text.contains("error rate: 0.00%"));
        assert!(text.contains("transfer rate: 25.00 KB/s"), "{}", text);
        assert!(!text.contains("misreads too often"));
        assert!(!text.contains("Seed"));
    }

    #[test]
    fn test_flags_unusable_channel() {
        colored::control::set_override(false);
        let same = vec![40u64; 500];
        let mut with_seed = report(analyze(&same, &same, Polarity::OneSlower));
        with_seed.metadata.seed = Some(0x2a);

        let text = format_report(&with_seed, false);
        assert!(text.contains("error rate: 50.00%"), "{}", text);
        assert!(text.contains("[-] misreads too often"), "{}", text);
        assert!(text.contains("Seed: 0x2a"), "{}", text);
    }

    #[test]
    fn test_quiet_omits_percentiles() {
        colored::control::set_override(false);
        let outcome = analyze(&vec![10; 100], &vec![50; 100], Polarity::OneSlower);
        let text = format_report(&report(outcome), false);
        assert!(!text.contains("99pct"));
        assert!(text.contains("threshold"));
    }

    #[test]
    fn test_format_insufficient() {
        colored::control::set_override(false);
        let text = format_report(
            &report(Outcome::InsufficientData {
                zero_samples: 0,
                one_samples: 0,
            }),
            true,
        );
        assert!(text.contains("not enough probe samples"));
    }

    #[test]
    fn test_histogram_lines() {
        let dump = HistogramDump {
            zero: vec![0.5, 0.5],
            one: vec![0.0, 1.0],
            train: vec![1.0, 0.0],
            overflow: [0; 3],
        };
        let text = format_histogram(&dump);
        assert_eq!(text, "0\t0.50000\t0.00000\t1.00000\n1\t0.50000\t1.00000\t0.00000\n");
    }
}
