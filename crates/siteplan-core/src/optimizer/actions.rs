//! Recommended schedule changes and their ranking.

use crate::analyzer::report::RiskLevel;
use crate::config::PriorityConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    FastTrack,
    Crash,
    ResourceLevel,
    QualityExtension,
}

impl ActionType {
    /// Penalty subtracted from the priority numerator for the action's risk.
    pub fn risk_penalty(&self, risk: RiskLevel) -> f64 {
        match (self, risk) {
            (_, RiskLevel::Low) => 0.0,
            (ActionType::Crash, RiskLevel::Medium) => 15.0,
            (ActionType::Crash, RiskLevel::High) => 30.0,
            (_, RiskLevel::Medium) => 10.0,
            (_, RiskLevel::High) => 20.0,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ActionType::FastTrack => "Fast-track",
            ActionType::Crash => "Crash",
            ActionType::ResourceLevel => "Level",
            ActionType::QualityExtension => "Quality",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImplementationEffort {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationAction {
    pub action_type: ActionType,
    /// Affected activities; fast-track actions list predecessor then successor.
    pub activity_ids: Vec<String>,
    pub description: String,
    /// Days gained (negative) or lost (positive) on the affected activity.
    pub duration_impact: i64,
    pub cost_impact: f64,
    pub risk_level: RiskLevel,
    /// 1 (lowest) to 10.
    pub priority: u8,
    pub prerequisites: Vec<String>,
    pub implementation_effort: ImplementationEffort,
}

/// `clamp(1, 10, round((|days| * w - cost / c - riskPenalty) / 10))`.
pub fn action_priority(
    action_type: ActionType,
    duration_impact: i64,
    cost_impact: f64,
    risk: RiskLevel,
    weights: &PriorityConfig,
) -> u8 {
    let duration_weight = duration_impact.abs() as f64 * weights.duration_weight_per_day;
    let cost_penalty = if weights.cost_penalty_per_unit > 0.0 {
        cost_impact / weights.cost_penalty_per_unit
    } else {
        0.0
    };
    let raw = (duration_weight - cost_penalty - action_type.risk_penalty(risk)) / 10.0;
    raw.round().clamp(1.0, 10.0) as u8
}

/// Highest priority first, then largest saving, then by activity ids.
pub fn rank(actions: &mut [OptimizationAction]) {
    actions.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.duration_impact.cmp(&b.duration_impact))
            .then_with(|| a.activity_ids.cmp(&b.activity_ids))
    });
}
