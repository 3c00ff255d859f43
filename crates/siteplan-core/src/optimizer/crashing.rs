//! Crashing: buying duration on critical activities with extra resources.

use crate::analyzer::critical_path::CpmSchedule;
use crate::analyzer::report::RiskLevel;
use crate::config::PlannerConfig;
use crate::error::{Result, ValidationError};
use crate::log_changes;
use crate::model::Activity;
use crate::network::ActivityNetwork;
use crate::optimizer::actions::{action_priority, rank, ActionType, ImplementationEffort, OptimizationAction};
use petgraph::graph::NodeIndex;

/// A fixed way of resourcing an activity harder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrashOption {
    pub name: &'static str,
    /// Whole percent of the duration removed, floored to whole days.
    pub duration_reduction_pct: i64,
    /// Whole percent added to the activity cost.
    pub cost_increase_pct: i64,
    pub risk: RiskLevel,
    pub effort: ImplementationEffort,
    pub prerequisites: &'static [&'static str],
}

pub const CRASH_OPTIONS: [CrashOption; 3] = [
    CrashOption {
        name: "Add 25% resources",
        duration_reduction_pct: 15,
        cost_increase_pct: 25,
        risk: RiskLevel::Low,
        effort: ImplementationEffort::Low,
        prerequisites: &["Additional crew available from the trade contractor", "Work face large enough for a larger crew"],
    },
    CrashOption {
        name: "Add 50% resources",
        duration_reduction_pct: 25,
        cost_increase_pct: 45,
        risk: RiskLevel::Medium,
        effort: ImplementationEffort::Medium,
        prerequisites: &[
            "Second crew mobilised and inducted",
            "Supervision capacity for a split crew",
            "Material deliveries re-sequenced for the higher rate",
        ],
    },
    CrashOption {
        name: "Overtime",
        duration_reduction_pct: 10,
        cost_increase_pct: 15,
        risk: RiskLevel::Medium,
        effort: ImplementationEffort::Low,
        prerequisites: &["Extended-hours permit for the site", "Crew agreement on overtime rates"],
    },
];

impl CrashOption {
    /// Whole days saved; at least one day of work always remains.
    pub fn reduction_days(&self, duration: i64) -> i64 {
        (duration * self.duration_reduction_pct / 100).min(duration - 1).max(0)
    }

    pub fn additional_cost(&self, cost: f64) -> f64 {
        cost * self.cost_increase_pct as f64 / 100.0
    }

    fn action(&self, activity: &Activity, config: &PlannerConfig) -> OptimizationAction {
        let duration_impact = -self.reduction_days(activity.planned_duration_days);
        let cost_impact = self.additional_cost(activity.planned_total_cost);
        OptimizationAction {
            action_type: ActionType::Crash,
            activity_ids: vec![activity.id.clone()],
            description: format!("{} on '{}'", self.name, activity.name),
            duration_impact,
            cost_impact,
            risk_level: self.risk,
            priority: action_priority(ActionType::Crash, duration_impact, cost_impact, self.risk, &config.priority),
            prerequisites: self.prerequisites.iter().map(|p| p.to_string()).collect(),
            implementation_effort: self.effort,
        }
    }
}

fn best_reduction(duration: i64) -> i64 {
    CRASH_OPTIONS
        .iter()
        .map(|o| o.reduction_days(duration))
        .max()
        .unwrap_or(0)
}

/// Crash options for enough critical activities to reach `target_reduction_days`.
pub fn analyze_schedule_crashing(activities: &[Activity], target_reduction_days: i64) -> Result<Vec<OptimizationAction>> {
    if target_reduction_days <= 0 {
        return Err(ValidationError::InvalidCrashTarget(target_reduction_days).into());
    }
    let network = ActivityNetwork::build(activities)?;
    let cpm = CpmSchedule::planned(&network);
    Ok(crashing_actions(&network, &cpm, target_reduction_days, &PlannerConfig::default()))
}

/// Critical activities are taken longest first until their best reductions
/// cover the target; every viable option of each taken activity is returned.
pub fn crashing_actions(
    network: &ActivityNetwork,
    cpm: &CpmSchedule,
    target_reduction_days: i64,
    config: &PlannerConfig,
) -> Vec<OptimizationAction> {
    let mut critical: Vec<NodeIndex> = network
        .graph
        .node_indices()
        .filter(|idx| cpm.is_critical(*idx))
        .collect();
    critical.sort_by_key(|idx| {
        let i = idx.index();
        (std::cmp::Reverse(network.activity(*idx).planned_duration_days), cpm.early_start[i], i)
    });

    let mut covered = 0;
    let mut actions = Vec::new();
    for idx in critical {
        if covered >= target_reduction_days {
            break;
        }
        let activity = network.activity(idx);
        let best = best_reduction(activity.planned_duration_days);
        if best == 0 {
            continue;
        }
        covered += best;
        log_changes!(config.verbosity, "crash candidate '{}' (up to {}d)", activity.id, best);
        actions.extend(
            CRASH_OPTIONS
                .iter()
                .filter(|o| o.reduction_days(activity.planned_duration_days) > 0)
                .map(|o| o.action(activity, config)),
        );
    }
    if covered < target_reduction_days {
        log_changes!(
            config.verbosity,
            "crashing covers {} of {} requested day(s)",
            covered,
            target_reduction_days
        );
    }

    rank(&mut actions);
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::add_days;
    use crate::error::PlanError;
    use chrono::NaiveDate;

    fn d0() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()
    }

    #[test]
    fn test_add_quarter_resources_on_ten_day_activity() {
        let acts = vec![Activity::new("a", "Blockwork", "mason", d0(), 10).with_cost(1000.0)];
        let actions = analyze_schedule_crashing(&acts, 1).unwrap();
        assert_eq!(actions.len(), 3);
        let quarter = actions
            .iter()
            .find(|a| a.description.starts_with("Add 25%"))
            .unwrap();
        assert_eq!(quarter.duration_impact, -1);
        assert!((quarter.cost_impact - 250.0).abs() < 1e-9);
        assert_eq!(quarter.risk_level, RiskLevel::Low);
        assert!(!quarter.prerequisites.is_empty());

        let half = actions.iter().find(|a| a.description.starts_with("Add 50%")).unwrap();
        assert_eq!(half.duration_impact, -2);
        assert!((half.cost_impact - 450.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_positive_target_rejected() {
        let acts = vec![Activity::new("a", "Blockwork", "mason", d0(), 10)];
        let err = analyze_schedule_crashing(&acts, 0).unwrap_err();
        assert_eq!(err, PlanError::Validation(ValidationError::InvalidCrashTarget(0)));
    }

    #[test]
    fn test_only_critical_activities_longest_first() {
        let acts = vec![
            Activity::new("a", "Frame", "carpenter", d0(), 8),
            Activity::new("b", "Roof", "roofer", add_days(d0(), 8), 12).after("a"),
            Activity::new("c", "Landscaping", "landscaper", d0(), 4),
        ];
        // b alone can save 3 days (25% of 12).
        let actions = analyze_schedule_crashing(&acts, 2).unwrap();
        assert!(actions.iter().all(|a| a.activity_ids == vec!["b".to_string()]));

        let actions = analyze_schedule_crashing(&acts, 5).unwrap();
        assert!(actions.iter().any(|a| a.activity_ids == vec!["a".to_string()]));
        assert!(actions.iter().all(|a| a.activity_ids != vec!["c".to_string()]));
    }

    #[test]
    fn test_reduction_keeps_one_day() {
        assert_eq!(CRASH_OPTIONS[1].reduction_days(1), 0);
        assert_eq!(CRASH_OPTIONS[1].reduction_days(4), 1);
    }
}
