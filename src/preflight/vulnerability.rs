//! Kernel-reported Spectre status.
//!
//! Linux exposes one line per known CPU vulnerability under
//! `/sys/devices/system/cpu/vulnerabilities/`. A mitigated or unaffected
//! core is expected to calibrate at an error rate near 0.5, so the status is
//! reported up front.

use serde::{Deserialize, Serialize};

/// Spectre variants relevant to branch mistraining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpectreVariant {
    /// Bounds-check bypass.
    V1,
    /// Branch target injection.
    V2,
}

impl SpectreVariant {
    /// Sysfs file name for this variant.
    pub fn sysfs_name(self) -> &'static str {
        match self {
            SpectreVariant::V1 => "spectre_v1",
            SpectreVariant::V2 => "spectre_v2",
        }
    }
}

impl std::fmt::Display for SpectreVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.sysfs_name())
    }
}

/// Parsed status line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VulnerabilityStatus {
    /// "Not affected".
    NotAffected,
    /// "Vulnerable", possibly with detail.
    Vulnerable(String),
    /// "Mitigation: ...".
    Mitigated(String),
    /// Anything else.
    Unknown(String),
}

impl VulnerabilityStatus {
    /// Parse the contents of a sysfs vulnerability file.
    pub fn parse(text: &str) -> Self {
        let line = text.trim();
        if line.eq_ignore_ascii_case("not affected") {
            VulnerabilityStatus::NotAffected
        } else if let Some(detail) = line.strip_prefix("Mitigation:") {
            VulnerabilityStatus::Mitigated(detail.trim().to_string())
        } else if let Some(detail) = line.strip_prefix("Vulnerable") {
            VulnerabilityStatus::Vulnerable(
                detail.trim_start_matches([':', ',', ' ']).to_string(),
            )
        } else {
            VulnerabilityStatus::Unknown(line.to_string())
        }
    }
}

/// Warning from the vulnerability check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnerabilityWarning {
    /// Variant concerned.
    pub variant: SpectreVariant,
    /// Reported status.
    pub status: VulnerabilityStatus,
}

impl VulnerabilityWarning {
    /// Informational only.
    pub fn is_critical(&self) -> bool {
        false
    }

    /// Get a human-readable description of the warning.
    pub fn description(&self) -> String {
        match &self.status {
            VulnerabilityStatus::NotAffected => format!(
                "Kernel reports this CPU as not affected by {}. Expect an error rate near 50%.",
                self.variant
            ),
            VulnerabilityStatus::Mitigated(detail) => format!(
                "Kernel reports {} mitigation: {}. The channel may be degraded.",
                self.variant, detail
            ),
            VulnerabilityStatus::Vulnerable(detail) => {
                format!("Kernel reports {} as vulnerable ({}).", self.variant, detail)
            }
            VulnerabilityStatus::Unknown(line) => {
                format!("Unrecognised {} status: {}", self.variant, line)
            }
        }
    }
}

/// Read the kernel's status for both variants.
///
/// Returns one entry per variant whose status is not plain "Vulnerable".
/// On platforms without the sysfs files, returns an empty vector.
pub fn vulnerability_check() -> Vec<VulnerabilityWarning> {
    [SpectreVariant::V1, SpectreVariant::V2]
        .into_iter()
        .filter_map(|variant| {
            let status = read_status(variant)?;
            tracing::debug!("{}: {:?}", variant, status);
            match status {
                VulnerabilityStatus::Vulnerable(_) => None,
                status => Some(VulnerabilityWarning { variant, status }),
            }
        })
        .collect()
}

fn read_status(variant: SpectreVariant) -> Option<VulnerabilityStatus> {
    let path = format!(
        "/sys/devices/system/cpu/vulnerabilities/{}",
        variant.sysfs_name()
    );
    std::fs::read_to_string(path)
        .ok()
        .map(|text| VulnerabilityStatus::parse(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_lines() {
        assert_eq!(
            VulnerabilityStatus::parse("Not affected\n"),
            VulnerabilityStatus::NotAffected
        );
        assert_eq!(
            VulnerabilityStatus::parse(
                "Mitigation: usercopy/swapgs barriers and __user pointer sanitization\n"
            ),
            VulnerabilityStatus::Mitigated(
                "usercopy/swapgs barriers and __user pointer sanitization".to_string()
            )
        );
        assert_eq!(
            VulnerabilityStatus::parse("Vulnerable"),
            VulnerabilityStatus::Vulnerable(String::new())
        );
        assert_eq!(
            VulnerabilityStatus::parse("Vulnerable: __user pointer sanitization and usercopy barriers only; no swapgs barriers"),
            VulnerabilityStatus::Vulnerable(
                "__user pointer sanitization and usercopy barriers only; no swapgs barriers"
                    .to_string()
            )
        );
        assert!(matches!(
            VulnerabilityStatus::parse("Unknown: Dependent on hypervisor status"),
            VulnerabilityStatus::Unknown(_)
        ));
    }

    #[test]
    fn test_descriptions() {
        let warning = VulnerabilityWarning {
            variant: SpectreVariant::V2,
            status: VulnerabilityStatus::Mitigated("Retpolines".to_string()),
        };
        assert!(warning.description().contains("spectre_v2"));
        assert!(warning.description().contains("Retpolines"));
        assert!(!warning.is_critical());
    }

    #[test]
    fn test_check_runs() {
        // Just verify it doesn't panic
        let _warnings = vulnerability_check();
    }
}
