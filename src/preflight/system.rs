//! System-level preflight checks.
//!
//! Conditions that make cycle counts drift between trials: frequency scaling,
//! a sibling hyperthread sharing the divider and caches, hypervisor exits and
//! competing load.

use serde::{Deserialize, Serialize};

/// Load average above which the run is likely to be preempted.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
const LOAD_THRESHOLD: f64 = 1.0;

/// Warning from system checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SystemWarning {
    /// CPU frequency governor is not `performance`.
    GovernorNotPerformance {
        /// Current governor setting.
        current: String,
    },

    /// Turbo boost is enabled; cycle counts per invocation vary with it.
    TurboBoostEnabled,

    /// SMT is active; a sibling thread contends for the same core.
    SmtActive,

    /// Running under a hypervisor.
    VirtualMachineDetected,

    /// One-minute load average above the threshold.
    HighSystemLoad {
        /// Current load average.
        load_average: f64,
        /// Threshold exceeded.
        threshold: f64,
    },
}

impl SystemWarning {
    /// System warnings are informational.
    pub fn is_critical(&self) -> bool {
        false
    }

    /// Get a human-readable description of the warning.
    pub fn description(&self) -> String {
        match self {
            SystemWarning::GovernorNotPerformance { current } => format!(
                "CPU frequency governor is '{}'; set 'performance' for stable cycle counts \
                 (sudo cpupower frequency-set -g performance).",
                current
            ),
            SystemWarning::TurboBoostEnabled => {
                "Turbo boost is enabled. Probe latencies will drift with frequency.".to_string()
            }
            SystemWarning::SmtActive => {
                "SMT is active. A sibling thread can contend for the divider and L1; \
                 consider pinning or disabling SMT."
                    .to_string()
            }
            SystemWarning::VirtualMachineDetected => {
                "Running under a hypervisor. The cycle counter may be virtualized and \
                 predictor state may be flushed on exits."
                    .to_string()
            }
            SystemWarning::HighSystemLoad {
                load_average,
                threshold,
            } => format!(
                "High system load: {:.2} (threshold {:.2}). Trials may be preempted.",
                load_average, threshold
            ),
        }
    }
}

/// Perform all system checks.
///
/// On platforms other than Linux, returns an empty vector.
pub fn system_check() -> Vec<SystemWarning> {
    #[allow(unused_mut)]
    let mut warnings = Vec::new();

    #[cfg(target_os = "linux")]
    {
        let read = |path: &str| std::fs::read_to_string(path).ok();

        if let Some(governor) = read("/sys/devices/system/cpu/cpu0/cpufreq/scaling_governor") {
            warnings.extend(governor_warning(&governor));
        }
        if turbo_enabled(
            read("/sys/devices/system/cpu/intel_pstate/no_turbo").as_deref(),
            read("/sys/devices/system/cpu/cpufreq/boost").as_deref(),
        ) {
            warnings.push(SystemWarning::TurboBoostEnabled);
        }
        if read("/sys/devices/system/cpu/smt/active").is_some_and(|v| v.trim() == "1") {
            warnings.push(SystemWarning::SmtActive);
        }
        if read("/proc/cpuinfo").is_some_and(|info| cpuinfo_has_hypervisor(&info)) {
            warnings.push(SystemWarning::VirtualMachineDetected);
        }
        if let Some(loadavg) = read("/proc/loadavg") {
            warnings.extend(load_warning(&loadavg));
        }
    }

    warnings
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn governor_warning(contents: &str) -> Option<SystemWarning> {
    let governor = contents.trim().to_lowercase();
    if governor.is_empty() || governor == "performance" {
        None
    } else {
        Some(SystemWarning::GovernorNotPerformance { current: governor })
    }
}

/// `intel_pstate/no_turbo == 0`, or else `cpufreq/boost == 1`.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn turbo_enabled(intel_no_turbo: Option<&str>, generic_boost: Option<&str>) -> bool {
    match (intel_no_turbo, generic_boost) {
        (Some(no_turbo), _) => no_turbo.trim() == "0",
        (None, Some(boost)) => boost.trim() == "1",
        (None, None) => false,
    }
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn cpuinfo_has_hypervisor(cpuinfo: &str) -> bool {
    cpuinfo
        .lines()
        .filter(|line| line.starts_with("flags"))
        .any(|line| line.split_whitespace().any(|flag| flag == "hypervisor"))
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn load_warning(loadavg: &str) -> Option<SystemWarning> {
    let load = loadavg
        .split_whitespace()
        .next()
        .and_then(|val| val.parse::<f64>().ok())?;

    (load > LOAD_THRESHOLD).then_some(SystemWarning::HighSystemLoad {
        load_average: load,
        threshold: LOAD_THRESHOLD,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_check_runs() {
        // Just verify it doesn't panic
        let _warnings = system_check();
    }

    #[test]
    fn test_governor() {
        assert_eq!(governor_warning("performance\n"), None);
        assert_eq!(
            governor_warning("powersave\n"),
            Some(SystemWarning::GovernorNotPerformance {
                current: "powersave".to_string()
            })
        );
    }

    #[test]
    fn test_turbo_sources() {
        assert!(turbo_enabled(Some("0\n"), None));
        assert!(!turbo_enabled(Some("1\n"), Some("1\n")));
        assert!(turbo_enabled(None, Some("1\n")));
        assert!(!turbo_enabled(None, None));
    }

    #[test]
    fn test_hypervisor_flag() {
        let guest = "processor\t: 0\nflags\t\t: fpu vme de pse tsc hypervisor lahf_lm\n";
        let host = "processor\t: 0\nflags\t\t: fpu vme de pse tsc lahf_lm\n";
        assert!(cpuinfo_has_hypervisor(guest));
        assert!(!cpuinfo_has_hypervisor(host));
    }

    #[test]
    fn test_load() {
        assert_eq!(load_warning("0.42 0.30 0.20 1/300 1234"), None);
        let warning = load_warning("2.50 1.00 0.50 3/300 1234").unwrap();
        assert!(warning.description().contains("2.50"));
        assert!(load_warning("garbage").is_none());
    }

    #[test]
    fn test_warnings_are_not_critical() {
        let warnings = vec![
            SystemWarning::GovernorNotPerformance {
                current: "powersave".to_string(),
            },
            SystemWarning::TurboBoostEnabled,
            SystemWarning::SmtActive,
            SystemWarning::VirtualMachineDetected,
            SystemWarning::HighSystemLoad {
                load_average: 2.0,
                threshold: 1.0,
            },
        ];

        for warning in warnings {
            assert!(
                !warning.is_critical(),
                "System warnings should not be critical"
            );
        }
    }
}
