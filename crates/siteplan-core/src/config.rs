//! Planner tuning loaded from `siteplan.toml`.
//!
//! Every field has a default, so an empty file (or no file) reproduces the
//! stock heuristics.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PlannerConfig {
    /// Diagnostic verbosity, see [`crate::logging`].
    pub verbosity: u8,
    pub critical_path: CriticalPathConfig,
    pub leveling: LevelingConfig,
    pub alternatives: AlternativesConfig,
    pub quality: QualityConfig,
    pub priority: PriorityConfig,
    /// Extra overlap combinations that are always HIGH risk to fast-track.
    pub risk_rules: Vec<RiskRuleConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriticalPathConfig {
    /// Activities with total float up to this many days are near-critical.
    pub near_critical_threshold_days: i64,
}

impl Default for CriticalPathConfig {
    fn default() -> Self {
        Self {
            near_critical_threshold_days: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelingConfig {
    /// Largest single move smoothing makes within an activity's float.
    pub max_smoothing_shift_days: i64,
    /// How far resource-limited scheduling searches for capacity before giving up.
    pub max_search_days: i64,
}

impl Default for LevelingConfig {
    fn default() -> Self {
        Self {
            max_smoothing_shift_days: 2,
            max_search_days: 730,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlternativesConfig {
    /// Feasibility score an alternative must exceed to be selectable on score.
    pub feasibility_threshold: f64,
    /// Fraction of the predecessor that must finish before a fast-tracked successor starts.
    pub fast_track_overlap: f64,
    pub crash_duration_factor: f64,
    pub crash_cost_factor: f64,
    /// Number of lowest-risk pairs the balanced strategy fast-tracks.
    pub balanced_pair_count: usize,
    /// Balanced strategy only redistributes peaks at or below this overallocation.
    pub balanced_max_overallocation: i64,
    /// Evaluate alternatives on the rayon pool.
    pub parallel: bool,
}

impl Default for AlternativesConfig {
    fn default() -> Self {
        Self {
            feasibility_threshold: 70.0,
            fast_track_overlap: 0.5,
            crash_duration_factor: 0.2,
            crash_cost_factor: 0.3,
            balanced_pair_count: 2,
            balanced_max_overallocation: 2,
            parallel: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub base_score: f64,
    /// Deducted per overlapped activity pair.
    pub fast_track_penalty: f64,
    /// Deducted per compressed activity.
    pub crash_penalty: f64,
    /// Scaled by the share of quality requirements met.
    pub requirement_bonus: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            base_score: 80.0,
            fast_track_penalty: 4.0,
            crash_penalty: 3.0,
            requirement_bonus: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    pub duration_weight_per_day: f64,
    /// Currency units that cost one priority point.
    pub cost_penalty_per_unit: f64,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            duration_weight_per_day: 10.0,
            cost_penalty_per_unit: 1000.0,
        }
    }
}

/// A predecessor/successor name pattern pair (regular expressions, case-insensitive).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRuleConfig {
    pub predecessor: String,
    pub successor: String,
}

/// Load planner configuration from a TOML file.
pub fn load_config(path: &Path) -> anyhow::Result<PlannerConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
    parse_config(&content)
        .map_err(|e| anyhow::anyhow!("Invalid config file '{}': {}", path.display(), e))
}

pub fn parse_config(content: &str) -> anyhow::Result<PlannerConfig> {
    let config: PlannerConfig = toml::from_str(content)?;
    if config.alternatives.feasibility_threshold < 0.0
        || config.alternatives.feasibility_threshold > 100.0
    {
        anyhow::bail!(
            "alternatives.feasibility_threshold must be within 0-100, got {}",
            config.alternatives.feasibility_threshold
        );
    }
    if config.leveling.max_smoothing_shift_days < 0 {
        anyhow::bail!("leveling.max_smoothing_shift_days must not be negative");
    }
    for rule in &config.risk_rules {
        regex::Regex::new(&rule.predecessor)?;
        regex::Regex::new(&rule.successor)?;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, PlannerConfig::default());
        assert_eq!(config.critical_path.near_critical_threshold_days, 5);
        assert_eq!(config.leveling.max_smoothing_shift_days, 2);
        assert_eq!(config.alternatives.feasibility_threshold, 70.0);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = parse_config(
            r#"
verbosity = 2

[alternatives]
crash_duration_factor = 0.25
parallel = false

[[risk_rules]]
predecessor = "steel"
successor = "deck"
"#,
        )
        .unwrap();
        assert_eq!(config.verbosity, 2);
        assert_eq!(config.alternatives.crash_duration_factor, 0.25);
        assert!(!config.alternatives.parallel);
        assert_eq!(config.alternatives.crash_cost_factor, 0.3);
        assert_eq!(config.risk_rules.len(), 1);
    }

    #[test]
    fn test_rejects_bad_threshold_and_regex() {
        assert!(parse_config("[alternatives]\nfeasibility_threshold = 140.0").is_err());
        assert!(parse_config("[[risk_rules]]\npredecessor = \"(\"\nsuccessor = \"x\"").is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[critical_path]\nnear_critical_threshold_days = 3").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.critical_path.near_critical_threshold_days, 3);
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/siteplan.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
