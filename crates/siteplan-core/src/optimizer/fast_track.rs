//! Fast-tracking: overlapping finish-to-start pairs.

use crate::analyzer::report::RiskLevel;
use crate::config::PlannerConfig;
use crate::error::{PlanError, Result};
use crate::model::{Activity, DependencyType};
use crate::network::{ActivityNetwork, Link};
use crate::optimizer::actions::{action_priority, rank, ActionType, ImplementationEffort, OptimizationAction};
use crate::optimizer::risk_rules::{KeywordRiskRules, OverlapRiskClassifier};
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

/// Share of the combined cost of both activities spent on coordination.
pub const COORDINATION_COST_RATE: f64 = 0.05;

/// An FS link that could be overlapped.
#[derive(Debug, Clone, PartialEq)]
pub struct FastTrackPair {
    pub edge: EdgeIndex,
    pub predecessor: NodeIndex,
    pub successor: NodeIndex,
    /// `floor(min(0.6 * predecessor, 0.8 * successor))` days.
    pub saving_days: i64,
    pub coordination_cost: f64,
    pub risk: RiskLevel,
}

impl FastTrackPair {
    /// The link replacing the FS link when the successor starts `overlap` of the
    /// way through the predecessor. Never later than the original link allowed.
    pub fn overlap_link(&self, network: &ActivityNetwork, original: &Link, overlap: f64) -> Link {
        let pred_duration = network.activity(self.predecessor).planned_duration_days;
        let lag = ((pred_duration as f64 * overlap).floor() as i64).min(pred_duration + original.lag_days);
        Link {
            dependency_type: DependencyType::StartToStart,
            lag_days: lag,
        }
    }

    pub fn to_action(&self, network: &ActivityNetwork, config: &PlannerConfig) -> OptimizationAction {
        let pred = network.activity(self.predecessor);
        let succ = network.activity(self.successor);
        let duration_impact = -self.saving_days;
        OptimizationAction {
            action_type: ActionType::FastTrack,
            activity_ids: vec![pred.id.clone(), succ.id.clone()],
            description: format!(
                "Start '{}' before '{}' finishes, overlapping up to {} day(s)",
                succ.name, pred.name, self.saving_days
            ),
            duration_impact,
            cost_impact: self.coordination_cost,
            risk_level: self.risk,
            priority: action_priority(
                ActionType::FastTrack,
                duration_impact,
                self.coordination_cost,
                self.risk,
                &config.priority,
            ),
            prerequisites: vec![
                format!("Release the parts of '{}' that '{}' depends on early", pred.name, succ.name),
                format!(
                    "Agree a daily interface meeting between {} and {} crews",
                    pred.primary_trade, succ.primary_trade
                ),
            ],
            implementation_effort: match self.risk {
                RiskLevel::Low => ImplementationEffort::Low,
                RiskLevel::Medium => ImplementationEffort::Medium,
                RiskLevel::High => ImplementationEffort::High,
            },
        }
    }
}

/// Every FS link with a positive saving, in edge order.
pub fn fast_track_pairs(network: &ActivityNetwork, classifier: &dyn OverlapRiskClassifier) -> Vec<FastTrackPair> {
    network
        .graph
        .edge_references()
        .filter(|e| e.weight().dependency_type == DependencyType::FinishToStart)
        .filter_map(|e| {
            let pred = network.activity(e.source());
            let succ = network.activity(e.target());
            let saving = overlap_saving(pred, succ);
            if saving <= 0 {
                return None;
            }
            Some(FastTrackPair {
                edge: e.id(),
                predecessor: e.source(),
                successor: e.target(),
                saving_days: saving,
                coordination_cost: COORDINATION_COST_RATE * (pred.planned_total_cost + succ.planned_total_cost),
                risk: classifier.classify(pred, succ, saving),
            })
        })
        .collect()
}

fn overlap_saving(pred: &Activity, succ: &Activity) -> i64 {
    let by_pred = pred.planned_duration_days as f64 * 0.6;
    let by_succ = succ.planned_duration_days as f64 * 0.8;
    by_pred.min(by_succ).floor() as i64
}

/// Fast-tracking opportunities for the given activities, highest priority first.
pub fn analyze_fast_tracking_opportunities(activities: &[Activity]) -> Result<Vec<OptimizationAction>> {
    let network = ActivityNetwork::build(activities)?;
    let config = PlannerConfig::default();
    let rules = KeywordRiskRules::from_config(&config).map_err(PlanError::from)?;
    Ok(fast_tracking_actions(&network, &rules, &config))
}

pub fn fast_tracking_actions(
    network: &ActivityNetwork,
    classifier: &dyn OverlapRiskClassifier,
    config: &PlannerConfig,
) -> Vec<OptimizationAction> {
    let mut actions: Vec<OptimizationAction> = fast_track_pairs(network, classifier)
        .iter()
        .map(|pair| pair.to_action(network, config))
        .collect();
    rank(&mut actions);
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::add_days;
    use crate::model::Predecessor;
    use chrono::NaiveDate;

    fn d0() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()
    }

    #[test]
    fn test_saving_and_coordination_cost() {
        let acts = vec![
            Activity::new("a", "Drywall", "drywaller", d0(), 10).with_cost(10_000.0),
            Activity::new("b", "Painting", "painter", add_days(d0(), 10), 5)
                .with_cost(4_000.0)
                .after("a"),
        ];
        let actions = analyze_fast_tracking_opportunities(&acts).unwrap();
        assert_eq!(actions.len(), 1);
        let action = &actions[0];
        // min(6, 4) = 4 days
        assert_eq!(action.duration_impact, -4);
        assert!((action.cost_impact - 700.0).abs() < 1e-9);
        assert_eq!(action.activity_ids, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(action.risk_level, RiskLevel::Medium);
        assert_eq!(action.action_type, ActionType::FastTrack);
    }

    #[test]
    fn test_only_finish_to_start_links_are_candidates() {
        let acts = vec![
            Activity::new("a", "Excavate", "operator", d0(), 4),
            Activity::new("b", "Shore", "groundworker", d0(), 4).with_predecessor(Predecessor {
                activity_id: "a".to_string(),
                dependency_type: DependencyType::StartToStart,
                lag_days: 0,
            }),
        ];
        assert!(analyze_fast_tracking_opportunities(&acts).unwrap().is_empty());
    }

    #[test]
    fn test_one_day_activities_have_no_saving() {
        let acts = vec![
            Activity::new("a", "Survey", "surveyor", d0(), 1),
            Activity::new("b", "Set out", "surveyor", add_days(d0(), 1), 1).after("a"),
        ];
        assert!(analyze_fast_tracking_opportunities(&acts).unwrap().is_empty());
    }

    #[test]
    fn test_overlap_link_starts_halfway() {
        let acts = vec![
            Activity::new("a", "Drywall", "drywaller", d0(), 9),
            Activity::new("b", "Painting", "painter", add_days(d0(), 9), 5).after("a"),
        ];
        let net = ActivityNetwork::build(&acts).unwrap();
        let rules = KeywordRiskRules::from_config(&PlannerConfig::default()).unwrap();
        let pairs = fast_track_pairs(&net, &rules);
        let link = net.graph[pairs[0].edge];
        let overlapped = pairs[0].overlap_link(&net, &link, 0.5);
        assert_eq!(overlapped.dependency_type, DependencyType::StartToStart);
        assert_eq!(overlapped.lag_days, 4);
    }
}
