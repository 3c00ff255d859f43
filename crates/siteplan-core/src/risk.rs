//! Risk register for a chosen schedule.

use crate::analyzer::report::Severity;
use crate::model::Constraints;
use crate::optimizer::actions::{ActionType, OptimizationAction};
use crate::resources::DemandPeak;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskCategory {
    Schedule,
    Cost,
    Quality,
    Resource,
    External,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Risk {
    pub id: String,
    pub category: RiskCategory,
    pub description: String,
    /// 0-100.
    pub probability: f64,
    pub impact: Severity,
    pub mitigation: String,
    pub contingency: String,
    pub related_activities: Vec<String>,
}

impl Risk {
    /// Probability weighted by impact, used for ordering.
    pub fn exposure(&self) -> f64 {
        self.probability * self.impact.priority() as f64
    }
}

/// What the register looks at: the chosen actions and the outcome they produce.
pub struct RiskAssessment<'a> {
    pub actions: &'a [OptimizationAction],
    pub peaks: &'a [DemandPeak],
    pub optimized_cost: f64,
    pub quality_score: f64,
    pub constraints: &'a Constraints,
}

impl<'a> RiskAssessment<'a> {
    pub fn register(&self) -> Vec<Risk> {
        let mut risks: Vec<Risk> = [
            self.compression_risk(),
            self.resource_risk(),
            self.cost_risk(),
            self.quality_risk(),
            self.milestone_risk(),
        ]
        .into_iter()
        .flatten()
        .collect();

        risks.sort_by(|a, b| b.exposure().total_cmp(&a.exposure()).then_with(|| a.category.cmp(&b.category)));
        for (n, risk) in risks.iter_mut().enumerate() {
            risk.id = format!("RISK-{:03}", n + 1);
        }
        risks
    }

    fn compression_risk(&self) -> Option<Risk> {
        let compressing: Vec<&OptimizationAction> = self.actions.iter().filter(|a| a.duration_impact < 0).collect();
        if compressing.is_empty() {
            return None;
        }
        let count = compressing.len();
        Some(Risk {
            id: String::new(),
            category: RiskCategory::Schedule,
            description: format!(
                "{} compression action(s) leave little slack; a slip on any of them moves the finish date",
                count
            ),
            probability: (count as f64 * 20.0).min(90.0),
            impact: if count >= 3 { Severity::High } else { Severity::Medium },
            mitigation: "Track compressed activities daily and hold interface meetings between overlapping trades"
                .to_string(),
            contingency: "Revert the lowest-priority overlap or crash and re-baseline the finish date".to_string(),
            related_activities: related(&compressing),
        })
    }

    fn resource_risk(&self) -> Option<Risk> {
        if self.peaks.is_empty() {
            return None;
        }
        let types: BTreeSet<&str> = self.peaks.iter().map(|p| p.resource_type.as_str()).collect();
        let worst = self.peaks.iter().map(|p| p.overallocation).max().unwrap_or(0);
        Some(Risk {
            id: String::new(),
            category: RiskCategory::Resource,
            description: format!(
                "Demand exceeds capacity on {} day/type combination(s) ({})",
                self.peaks.len(),
                types.into_iter().collect::<Vec<_>>().join(", ")
            ),
            probability: (self.peaks.len() as f64 * 15.0).min(80.0),
            impact: if worst >= 2 { Severity::High } else { Severity::Medium },
            mitigation: "Confirm additional crews or plant with suppliers before the peak periods".to_string(),
            contingency: "Apply resource-limited scheduling and accept the resulting delay".to_string(),
            related_activities: Vec::new(),
        })
    }

    fn cost_risk(&self) -> Option<Risk> {
        let budget = self.constraints.max_budget;
        if budget <= 0.0 || self.optimized_cost <= budget * 0.9 {
            return None;
        }
        let over = self.optimized_cost > budget;
        Some(Risk {
            id: String::new(),
            category: RiskCategory::Cost,
            description: format!(
                "Forecast cost is {:.0}% of the budget",
                self.optimized_cost / budget * 100.0
            ),
            probability: if over { 80.0 } else { 50.0 },
            impact: if over { Severity::High } else { Severity::Medium },
            mitigation: "Review crash and coordination spend against the schedule benefit".to_string(),
            contingency: "Release contingency or de-scope non-critical work".to_string(),
            related_activities: related(
                &self
                    .actions
                    .iter()
                    .filter(|a| a.cost_impact > 0.0)
                    .collect::<Vec<_>>(),
            ),
        })
    }

    fn quality_risk(&self) -> Option<Risk> {
        let compressing: Vec<&OptimizationAction> = self
            .actions
            .iter()
            .filter(|a| matches!(a.action_type, ActionType::FastTrack | ActionType::Crash))
            .collect();
        if compressing.is_empty() || self.quality_score >= 70.0 {
            return None;
        }
        Some(Risk {
            id: String::new(),
            category: RiskCategory::Quality,
            description: format!(
                "Quality score {:.0} after compressing the programme; rework is more likely",
                self.quality_score
            ),
            probability: (100.0 - self.quality_score).clamp(0.0, 90.0),
            impact: Severity::Medium,
            mitigation: "Add hold points and inspections on overlapped and crashed activities".to_string(),
            contingency: "Budget for rework crews on the affected trades".to_string(),
            related_activities: related(&compressing),
        })
    }

    fn milestone_risk(&self) -> Option<Risk> {
        let fixed: Vec<String> = self
            .constraints
            .fixed_milestones
            .iter()
            .filter(|m| m.flexibility_days == 0)
            .map(|m| m.activity_id.clone())
            .collect();
        if fixed.is_empty() {
            return None;
        }
        Some(Risk {
            id: String::new(),
            category: RiskCategory::External,
            description: format!("{} milestone(s) have no date flexibility", fixed.len()),
            probability: (fixed.len() as f64 * 20.0).min(60.0),
            impact: Severity::High,
            mitigation: "Agree early-warning triggers with the client for fixed milestones".to_string(),
            contingency: "Negotiate partial handover or phased completion".to_string(),
            related_activities: fixed,
        })
    }
}

fn related(actions: &[&OptimizationAction]) -> Vec<String> {
    let ids: BTreeSet<&String> = actions.iter().flat_map(|a| a.activity_ids.iter()).collect();
    ids.into_iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::report::RiskLevel;
    use crate::model::FixedMilestone;
    use crate::optimizer::actions::ImplementationEffort;
    use chrono::NaiveDate;

    fn action(kind: ActionType, id: &str, days: i64) -> OptimizationAction {
        OptimizationAction {
            action_type: kind,
            activity_ids: vec![id.to_string()],
            description: String::new(),
            duration_impact: days,
            cost_impact: 100.0,
            risk_level: RiskLevel::Medium,
            priority: 3,
            prerequisites: vec![],
            implementation_effort: ImplementationEffort::Medium,
        }
    }

    fn peak(day: u32, overallocation: i64) -> DemandPeak {
        DemandPeak {
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            resource_type: "mason".to_string(),
            overallocation,
        }
    }

    #[test]
    fn test_compression_probability_scales_with_count() {
        let constraints = Constraints::new(100, 1e6);
        let actions: Vec<_> = (0..6).map(|i| action(ActionType::Crash, &format!("a{}", i), -1)).collect();
        let register = RiskAssessment {
            actions: &actions,
            peaks: &[],
            optimized_cost: 0.0,
            quality_score: 90.0,
            constraints: &constraints,
        }
        .register();
        assert_eq!(register.len(), 1);
        assert_eq!(register[0].category, RiskCategory::Schedule);
        assert_eq!(register[0].probability, 90.0);
        assert_eq!(register[0].related_activities.len(), 6);
        assert_eq!(register[0].id, "RISK-001");
    }

    #[test]
    fn test_peaks_raise_resource_risk() {
        let constraints = Constraints::new(100, 1e6);
        let peaks = vec![peak(6, 1), peak(7, 2)];
        let register = RiskAssessment {
            actions: &[],
            peaks: &peaks,
            optimized_cost: 0.0,
            quality_score: 90.0,
            constraints: &constraints,
        }
        .register();
        assert_eq!(register[0].category, RiskCategory::Resource);
        assert_eq!(register[0].probability, 30.0);
        assert_eq!(register[0].impact, Severity::High);
    }

    #[test]
    fn test_register_is_sorted_by_exposure() {
        let mut constraints = Constraints::new(100, 1000.0);
        constraints.fixed_milestones.push(FixedMilestone {
            activity_id: "handover".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 9, 2).unwrap(),
            flexibility_days: 0,
        });
        let actions = vec![action(ActionType::FastTrack, "a", -2)];
        let register = RiskAssessment {
            actions: &actions,
            peaks: &[],
            optimized_cost: 1200.0,
            quality_score: 60.0,
            constraints: &constraints,
        }
        .register();
        let categories: Vec<RiskCategory> = register.iter().map(|r| r.category).collect();
        // cost 80*4, quality 40*3, schedule 20*3, external 20*4
        assert_eq!(
            categories,
            vec![
                RiskCategory::Cost,
                RiskCategory::Quality,
                RiskCategory::External,
                RiskCategory::Schedule
            ]
        );
        for pair in register.windows(2) {
            assert!(pair[0].exposure() >= pair[1].exposure());
        }
    }

    #[test]
    fn test_no_risks_for_plain_schedule() {
        let constraints = Constraints::new(100, 1e6);
        let register = RiskAssessment {
            actions: &[],
            peaks: &[],
            optimized_cost: 1000.0,
            quality_score: 90.0,
            constraints: &constraints,
        }
        .register();
        assert!(register.is_empty());
    }
}
