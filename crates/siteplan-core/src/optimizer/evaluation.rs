//! Scoring alternatives against the objective and the constraint ceilings.

use crate::model::{Constraints, NormalizedObjective};
use crate::optimizer::schedule::ScheduleMetrics;

const DURATION_PENALTY_CAP: f64 = 30.0;
const BUDGET_PENALTY_CAP: f64 = 30.0;
const RESOURCE_PENALTY_CAP: f64 = 25.0;
const RESOURCE_PENALTY_PER_CELL: f64 = 5.0;
const MILESTONE_PENALTY_CAP: f64 = 10.0;
const MILESTONE_PENALTY_EACH: f64 = 5.0;

/// `100 - value / ceiling * 100`, floored at 0.
fn ceiling_score(value: f64, ceiling: f64) -> f64 {
    if ceiling <= 0.0 {
        return 0.0;
    }
    (100.0 - value / ceiling * 100.0).max(0.0)
}

/// Overrun as a percentage of the ceiling, capped.
fn overrun_penalty(value: f64, ceiling: f64, cap: f64) -> f64 {
    if ceiling <= 0.0 || value <= ceiling {
        return 0.0;
    }
    ((value - ceiling) / ceiling * 100.0).min(cap)
}

/// Weighted sum of the four component scores, each 0-100.
pub fn objective_score(metrics: &ScheduleMetrics, constraints: &Constraints, weights: &NormalizedObjective) -> f64 {
    let duration = ceiling_score(metrics.duration_days as f64, constraints.max_project_duration as f64);
    let cost = ceiling_score(metrics.total_cost, constraints.max_budget);
    let quality = metrics.quality_score.clamp(0.0, 100.0);
    let resources = metrics.resource_score.clamp(0.0, 100.0);
    weights.time * duration + weights.cost * cost + weights.quality * quality + weights.resources * resources
}

/// 100 minus capped penalties for overruns, overallocation and missed milestones; always 0-100.
pub fn feasibility_score(metrics: &ScheduleMetrics, constraints: &Constraints) -> f64 {
    let duration = overrun_penalty(
        metrics.duration_days as f64,
        constraints.max_project_duration as f64,
        DURATION_PENALTY_CAP,
    );
    let budget = overrun_penalty(metrics.total_cost, constraints.max_budget, BUDGET_PENALTY_CAP);
    let resources = (metrics.overallocated_cells as f64 * RESOURCE_PENALTY_PER_CELL).min(RESOURCE_PENALTY_CAP);
    let milestones = (metrics.missed_milestones as f64 * MILESTONE_PENALTY_EACH).min(MILESTONE_PENALTY_CAP);
    (100.0 - duration - budget - resources - milestones).clamp(0.0, 100.0)
}

/// Scores of one alternative, in generation order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scored {
    pub objective: f64,
    pub feasibility: f64,
}

/// Index of the best alternative.
///
/// The highest objective score among those with feasibility above `threshold`
/// wins; without any, the most feasible one does. Ties go to the earlier entry.
/// `None` only for an empty slice.
pub fn select(scores: &[Scored], threshold: f64) -> Option<usize> {
    let feasible = scores
        .iter()
        .enumerate()
        .filter(|(_, s)| s.feasibility > threshold)
        .fold(None, |best: Option<(usize, &Scored)>, (i, s)| match best {
            Some((_, b)) if b.objective >= s.objective => best,
            _ => Some((i, s)),
        });
    if let Some((i, _)) = feasible {
        return Some(i);
    }
    scores
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, &Scored)>, (i, s)| match best {
            Some((_, b))
                if b.feasibility > s.feasibility
                    || (b.feasibility == s.feasibility && b.objective >= s.objective) =>
            {
                best
            }
            _ => Some((i, s)),
        })
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Objective;

    fn metrics(duration: i64, cost: f64) -> ScheduleMetrics {
        ScheduleMetrics {
            duration_days: duration,
            total_cost: cost,
            quality_score: 80.0,
            resource_score: 50.0,
            overallocated_cells: 0,
            peaks: vec![],
            missed_milestones: 0,
            warnings: vec![],
        }
    }

    #[test]
    fn test_objective_score_weights_components() {
        let constraints = Constraints::new(100, 10_000.0);
        let weights = Objective::new(50.0, 50.0, 0.0, 0.0).normalize().unwrap();
        // duration 100-40 = 60, cost 100-50 = 50
        let score = objective_score(&metrics(40, 5_000.0), &constraints, &weights);
        assert!((score - 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_ceiling_scores_floor_at_zero() {
        let constraints = Constraints::new(10, 1_000.0);
        let weights = Objective::new(100.0, 0.0, 0.0, 0.0).normalize().unwrap();
        assert_eq!(objective_score(&metrics(25, 0.0), &constraints, &weights), 0.0);
    }

    #[test]
    fn test_feasibility_penalties() {
        let constraints = Constraints::new(100, 10_000.0);
        assert_eq!(feasibility_score(&metrics(100, 10_000.0), &constraints), 100.0);
        // 10% late, 20% over budget
        assert!((feasibility_score(&metrics(110, 12_000.0), &constraints) - 70.0).abs() < 1e-9);

        let mut m = metrics(100, 10_000.0);
        m.overallocated_cells = 3;
        m.missed_milestones = 1;
        assert!((feasibility_score(&m, &constraints) - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_feasibility_is_clamped() {
        let constraints = Constraints::new(1, 1.0);
        let mut m = metrics(10_000, 1e12);
        m.overallocated_cells = 1_000;
        m.missed_milestones = 50;
        let score = feasibility_score(&m, &constraints);
        assert!((0.0..=100.0).contains(&score));
        assert!((score - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_select_prefers_feasible_then_score() {
        let scores = vec![
            Scored { objective: 60.0, feasibility: 90.0 },
            Scored { objective: 90.0, feasibility: 50.0 },
            Scored { objective: 70.0, feasibility: 75.0 },
            Scored { objective: 70.0, feasibility: 95.0 },
        ];
        assert_eq!(select(&scores, 70.0), Some(2));
    }

    #[test]
    fn test_select_falls_back_to_most_feasible() {
        let scores = vec![
            Scored { objective: 60.0, feasibility: 40.0 },
            Scored { objective: 90.0, feasibility: 65.0 },
            Scored { objective: 95.0, feasibility: 65.0 },
        ];
        assert_eq!(select(&scores, 70.0), Some(2));
        assert_eq!(select(&[], 70.0), None);
    }

    #[test]
    fn test_threshold_is_strict() {
        let scores = vec![Scored { objective: 99.0, feasibility: 70.0 }, Scored { objective: 10.0, feasibility: 71.0 }];
        assert_eq!(select(&scores, 70.0), Some(1));
    }
}
