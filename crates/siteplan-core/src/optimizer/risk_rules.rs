//! Overlap risk classification for fast-tracking.
//!
//! The keyword table is one implementation of [`OverlapRiskClassifier`]; a
//! classifier driven by a structured activity kind can replace it without
//! touching the analyzers.

use crate::analyzer::report::RiskLevel;
use crate::config::PlannerConfig;
use crate::error::ValidationError;
use crate::model::{Activity, Priority};
use regex::Regex;

/// Known-dangerous predecessor/successor combinations, matched case-insensitively
/// against activity name and trade.
const BUILTIN_RULES: &[(&str, &str)] = &[
    ("concrete", "formwork"),
    ("foundation", "structur"),
    ("design", "construction"),
];

pub trait OverlapRiskClassifier: Send + Sync {
    /// Risk of starting `successor` before `predecessor` finishes, given the saving.
    fn classify(&self, predecessor: &Activity, successor: &Activity, saving_days: i64) -> RiskLevel;
}

struct KeywordRule {
    predecessor: Regex,
    successor: Regex,
}

pub struct KeywordRiskRules {
    rules: Vec<KeywordRule>,
}

impl KeywordRiskRules {
    /// Built-in table plus any `[[risk_rules]]` from the config.
    pub fn from_config(config: &PlannerConfig) -> Result<Self, ValidationError> {
        let extra = config
            .risk_rules
            .iter()
            .map(|r| (r.predecessor.as_str(), r.successor.as_str()));
        let mut rules = Vec::new();
        for (pred, succ) in BUILTIN_RULES.iter().copied().chain(extra) {
            rules.push(KeywordRule {
                predecessor: compile(pred)?,
                successor: compile(succ)?,
            });
        }
        Ok(Self { rules })
    }

    fn flagged(&self, predecessor: &Activity, successor: &Activity) -> bool {
        let pred_text = format!("{} {}", predecessor.name, predecessor.primary_trade);
        let succ_text = format!("{} {}", successor.name, successor.primary_trade);
        self.rules
            .iter()
            .any(|r| r.predecessor.is_match(&pred_text) && r.successor.is_match(&succ_text))
    }
}

fn compile(pattern: &str) -> Result<Regex, ValidationError> {
    Regex::new(&format!("(?i){}", pattern))
        .map_err(|e| ValidationError::InvalidConstraint(format!("risk rule '{}': {}", pattern, e)))
}

impl OverlapRiskClassifier for KeywordRiskRules {
    fn classify(&self, predecessor: &Activity, successor: &Activity, saving_days: i64) -> RiskLevel {
        if self.flagged(predecessor, successor) {
            return RiskLevel::High;
        }
        let base = if saving_days * 2 >= successor.planned_duration_days {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };
        let critical = predecessor.priority == Priority::Critical || successor.priority == Priority::Critical;
        if critical && base == RiskLevel::Medium {
            RiskLevel::High
        } else {
            base
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RiskRuleConfig;
    use chrono::NaiveDate;

    fn act(id: &str, name: &str, trade: &str, days: i64) -> Activity {
        Activity::new(id, name, trade, NaiveDate::from_ymd_opt(2024, 5, 6).unwrap(), days)
    }

    fn rules() -> KeywordRiskRules {
        KeywordRiskRules::from_config(&PlannerConfig::default()).unwrap()
    }

    #[test]
    fn test_keyword_pairs_are_high_risk() {
        let pour = act("p", "Pour Concrete Slab", "concreter", 5);
        let forms = act("f", "Strip formwork L1", "carpenter", 4);
        assert_eq!(rules().classify(&pour, &forms, 1), RiskLevel::High);

        let footing = act("a", "Foundation works", "groundworker", 10);
        let frame = act("b", "Steel structure", "steel erector", 10);
        assert_eq!(rules().classify(&footing, &frame, 1), RiskLevel::High);
    }

    #[test]
    fn test_saving_drives_base_risk() {
        let a = act("a", "Drywall", "drywaller", 6);
        let b = act("b", "Painting", "painter", 6);
        assert_eq!(rules().classify(&a, &b, 2), RiskLevel::Low);
        assert_eq!(rules().classify(&a, &b, 3), RiskLevel::Medium);
    }

    #[test]
    fn test_critical_priority_escalates_medium_only() {
        let a = act("a", "Drywall", "drywaller", 6).with_priority(Priority::Critical);
        let b = act("b", "Painting", "painter", 6);
        assert_eq!(rules().classify(&a, &b, 3), RiskLevel::High);
        assert_eq!(rules().classify(&a, &b, 1), RiskLevel::Low);
    }

    #[test]
    fn test_configured_rules_are_appended() {
        let mut config = PlannerConfig::default();
        config.risk_rules.push(RiskRuleConfig {
            predecessor: "waterproof".to_string(),
            successor: "backfill".to_string(),
        });
        let rules = KeywordRiskRules::from_config(&config).unwrap();
        let a = act("a", "Waterproofing", "applicator", 6);
        let b = act("b", "Backfill", "operator", 6);
        assert_eq!(rules.classify(&a, &b, 1), RiskLevel::High);
    }

    #[test]
    fn test_bad_pattern_is_a_validation_error() {
        let mut config = PlannerConfig::default();
        config.risk_rules.push(RiskRuleConfig {
            predecessor: "(".to_string(),
            successor: "x".to_string(),
        });
        assert!(matches!(
            KeywordRiskRules::from_config(&config),
            Err(ValidationError::InvalidConstraint(_))
        ));
    }
}
