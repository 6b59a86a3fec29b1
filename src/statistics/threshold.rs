//! Threshold selection and error counting.

use serde::{Deserialize, Serialize};

use super::order::ClassSummary;

/// How the threshold was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThresholdRule {
    /// `p99(absent) < p1(present)`: midpoint of the gap.
    CleanGap,
    /// The distributions overlap: midpoint of the medians.
    MedianSplit,
}

impl std::fmt::Display for ThresholdRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThresholdRule::CleanGap => write!(f, "clean gap"),
            ThresholdRule::MedianSplit => write!(f, "median split"),
        }
    }
}

/// Pick the cycle threshold separating the two classes.
///
/// Observations `<= threshold` classify as absent.
pub fn select_threshold(absent: &ClassSummary, present: &ClassSummary) -> (u64, ThresholdRule) {
    if absent.p99 < present.p1 {
        (midpoint(absent.p99, present.p1), ThresholdRule::CleanGap)
    } else {
        (
            midpoint(absent.median, present.median),
            ThresholdRule::MedianSplit,
        )
    }
}

#[inline]
fn midpoint(a: u64, b: u64) -> u64 {
    // (a + b) / 2 without overflow
    a / 2 + b / 2 + (a % 2 + b % 2) / 2
}

/// Misclassifications of both classes against one threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCounts {
    /// Absent observations above the threshold.
    pub false_positives: usize,
    /// Present observations at or below the threshold.
    pub false_negatives: usize,
    /// Absent observations.
    pub absent: usize,
    /// Present observations.
    pub present: usize,
}

impl ErrorCounts {
    /// Balanced error rate `(fp + fn) / (absent + present)`.
    ///
    /// With one sample per class per trial this is `(fp + fn) / (2 * trials)`.
    pub fn rate(&self) -> f64 {
        let total = self.absent + self.present;
        if total == 0 {
            return 0.0;
        }
        (self.false_positives + self.false_negatives) as f64 / total as f64
    }

    /// Share of absent observations misclassified.
    pub fn false_positive_rate(&self) -> f64 {
        ratio(self.false_positives, self.absent)
    }

    /// Share of present observations misclassified.
    pub fn false_negative_rate(&self) -> f64 {
        ratio(self.false_negatives, self.present)
    }
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// Count misclassifications from the ends of two ascending distributions.
pub fn count_errors(absent_sorted: &[u64], present_sorted: &[u64], threshold: u64) -> ErrorCounts {
    let absent_ok = absent_sorted.partition_point(|&c| c <= threshold);
    let false_negatives = present_sorted.partition_point(|&c| c <= threshold);

    ErrorCounts {
        false_positives: absent_sorted.len() - absent_ok,
        false_negatives,
        absent: absent_sorted.len(),
        present: present_sorted.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(sorted: &[u64]) -> ClassSummary {
        ClassSummary::from_sorted(sorted).unwrap()
    }

    #[test]
    fn test_clean_gap() {
        let absent = vec![10u64; 1000];
        let present = vec![50u64; 1000];
        let (t, rule) = select_threshold(&summary(&absent), &summary(&present));
        assert_eq!(t, 30);
        assert_eq!(rule, ThresholdRule::CleanGap);

        let errors = count_errors(&absent, &present, t);
        assert_eq!(errors.false_positives, 0);
        assert_eq!(errors.false_negatives, 0);
        assert_eq!(errors.rate(), 0.0);
    }

    #[test]
    fn test_median_split() {
        let absent: Vec<u64> = (10..=30).collect();
        let present: Vec<u64> = (20..=40).collect();
        let (t, rule) = select_threshold(&summary(&absent), &summary(&present));
        assert_eq!(rule, ThresholdRule::MedianSplit);
        assert_eq!(t, 25);

        let errors = count_errors(&absent, &present, t);
        // 26..=30 above, 20..=25 at or below
        assert_eq!(errors.false_positives, 5);
        assert_eq!(errors.false_negatives, 6);
    }

    #[test]
    fn test_equal_p99_p1_is_not_a_gap() {
        let absent = vec![20u64; 100];
        let present = vec![20u64; 100];
        let (_, rule) = select_threshold(&summary(&absent), &summary(&present));
        assert_eq!(rule, ThresholdRule::MedianSplit);
    }

    #[test]
    fn test_midpoint_no_overflow() {
        assert_eq!(midpoint(u64::MAX, u64::MAX), u64::MAX);
        assert_eq!(midpoint(3, 4), 3);
        assert_eq!(midpoint(3, 5), 4);
        assert_eq!(midpoint(0, 1), 0);
    }

    #[test]
    fn test_count_errors_matches_walk() {
        let absent: Vec<u64> = vec![1, 2, 3, 7, 8, 9];
        let present: Vec<u64> = vec![4, 5, 6, 10, 11, 12];
        for t in 0..14 {
            let errors = count_errors(&absent, &present, t);
            let fp = absent.iter().filter(|&&c| c > t).count();
            let fn_ = present.iter().filter(|&&c| c <= t).count();
            assert_eq!(errors.false_positives, fp, "fp at t={}", t);
            assert_eq!(errors.false_negatives, fn_, "fn at t={}", t);
        }
    }

    #[test]
    fn test_empty_rates() {
        let errors = count_errors(&[], &[], 10);
        assert_eq!(errors.rate(), 0.0);
        assert_eq!(errors.false_positive_rate(), 0.0);
        assert_eq!(errors.false_negative_rate(), 0.0);
    }
}
