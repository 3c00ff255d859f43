//! Multi-objective schedule optimization.
//!
//! Six alternatives are generated from the same baseline, scored against the
//! objective and the constraint ceilings, and the best feasible one is
//! returned with the actions that produce it and a risk register.

pub mod actions;
pub mod alternatives;
pub mod crashing;
pub mod evaluation;
pub mod fast_track;
pub mod risk_rules;
pub mod schedule;

use crate::analyzer::critical_path::CpmSchedule;
use crate::analyzer::report::RiskLevel;
use crate::config::PlannerConfig;
use crate::error::{PlanError, Result, ValidationError};
use crate::model::{Activity, Constraints, NormalizedObjective, Objective, Resource};
use crate::network::ActivityNetwork;
use crate::risk::{Risk, RiskAssessment};
use crate::{log_changes, log_checks};
use actions::{action_priority, rank, ActionType, ImplementationEffort, OptimizationAction};
use alternatives::Strategy;
use evaluation::Scored;
use fast_track::{fast_track_pairs, FastTrackPair};
use rayon::prelude::*;
use risk_rules::{KeywordRiskRules, OverlapRiskClassifier};
use schedule::{PlanningContext, ScheduleDraft, ScheduleMetrics};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Source of elapsed time for `performance.convergenceTime`.
pub trait Clock: Send + Sync {
    /// Milliseconds since an arbitrary fixed origin.
    fn now_ms(&self) -> f64;
}

pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Always reports the same instant, so convergence time is 0 and results are reproducible.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrozenClock;

impl Clock for FrozenClock {
    fn now_ms(&self) -> f64 {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    pub iterations_run: usize,
    /// Milliseconds.
    pub convergence_time: f64,
    /// Objective score gain of the selected alternative over the baseline, percent.
    pub improvement_achieved: f64,
}

/// Scores of one generated alternative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeSummary {
    pub strategy: Strategy,
    pub duration_days: i64,
    pub total_cost: f64,
    pub quality_score: f64,
    pub resource_utilization: f64,
    pub objective_score: f64,
    pub feasibility_score: f64,
    pub feasible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    pub original_duration: i64,
    pub optimized_duration: i64,
    pub duration_saving: i64,
    pub original_cost: f64,
    pub optimized_cost: f64,
    pub cost_saving: f64,
    pub quality_score: f64,
    pub resource_utilization: f64,
    pub feasibility_score: f64,
    pub optimization_actions: Vec<OptimizationAction>,
    pub risks: Vec<Risk>,
    pub performance: Performance,
    pub selected_strategy: Strategy,
    pub alternatives: Vec<AlternativeSummary>,
    pub optimized_schedule: Vec<Activity>,
    pub warnings: Vec<String>,
}

struct Alternative {
    strategy: Strategy,
    draft: ScheduleDraft,
    metrics: ScheduleMetrics,
    scored: Scored,
}

/// Optimize with the default configuration and the system clock.
pub fn optimize_schedule(
    activities: &[Activity],
    objective: &Objective,
    constraints: &Constraints,
) -> Result<OptimizationResult> {
    ScheduleOptimizer::new(activities, constraints.clone(), PlannerConfig::default())?.optimize(objective)
}

pub struct ScheduleOptimizer {
    network: ActivityNetwork,
    constraints: Constraints,
    resources: Vec<Resource>,
    config: PlannerConfig,
    classifier: Box<dyn OverlapRiskClassifier>,
    clock: Box<dyn Clock>,
}

impl ScheduleOptimizer {
    pub fn new(activities: &[Activity], constraints: Constraints, config: PlannerConfig) -> Result<Self> {
        if activities.is_empty() {
            return Err(ValidationError::NoActivities.into());
        }
        constraints.validate()?;
        let network = ActivityNetwork::build(activities)?;
        let classifier = KeywordRiskRules::from_config(&config).map_err(PlanError::from)?;
        Ok(Self {
            network,
            resources: constraints.resources(),
            constraints,
            config,
            classifier: Box::new(classifier),
            clock: Box::new(SystemClock::default()),
        })
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_classifier(mut self, classifier: impl OverlapRiskClassifier + 'static) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    pub fn network(&self) -> &ActivityNetwork {
        &self.network
    }

    pub fn optimize(&self, objective: &Objective) -> Result<OptimizationResult> {
        let weights = objective.normalize()?;
        let started = self.clock.now_ms();
        let verbosity = self.config.verbosity;

        let baseline_cpm = CpmSchedule::planned(&self.network);
        let pairs = fast_track_pairs(&self.network, self.classifier.as_ref());
        let ctx = PlanningContext {
            network: &self.network,
            constraints: &self.constraints,
            resources: &self.resources,
            config: &self.config,
            baseline: &baseline_cpm,
        };

        let alternatives: Vec<Alternative> = if self.config.alternatives.parallel {
            Strategy::ALL[..]
                .par_iter()
                .map(|s| self.evaluate(*s, &ctx, &pairs, &weights))
                .collect()
        } else {
            Strategy::ALL
                .iter()
                .map(|s| self.evaluate(*s, &ctx, &pairs, &weights))
                .collect()
        };

        for alt in &alternatives {
            log_checks!(
                verbosity,
                "{:<18} duration {}d cost {:.0} score {:.1} feasibility {:.1}",
                alt.strategy.name(),
                alt.metrics.duration_days,
                alt.metrics.total_cost,
                alt.scored.objective,
                alt.scored.feasibility
            );
        }

        let scores: Vec<Scored> = alternatives.iter().map(|a| a.scored).collect();
        let threshold = self.config.alternatives.feasibility_threshold;
        let selected = evaluation::select(&scores, threshold).unwrap_or(0);
        let baseline = &alternatives[0];
        let chosen = &alternatives[selected];
        log_changes!(
            verbosity,
            "selected '{}' (score {:.1}, feasibility {:.1})",
            chosen.strategy.name(),
            chosen.scored.objective,
            chosen.scored.feasibility
        );

        let mut actions = self.derive_actions(&baseline.draft, &chosen.draft, &pairs);
        rank(&mut actions);

        let risks = RiskAssessment {
            actions: &actions,
            peaks: &chosen.metrics.peaks,
            optimized_cost: chosen.metrics.total_cost,
            quality_score: chosen.metrics.quality_score,
            constraints: &self.constraints,
        }
        .register();

        let mut warnings = chosen.metrics.warnings.clone();
        if chosen.scored.feasibility <= threshold {
            warnings.push(format!(
                "No alternative reached feasibility above {:.0}; returning the most feasible ({:.1})",
                threshold, chosen.scored.feasibility
            ));
        }

        let convergence_time = (self.clock.now_ms() - started).max(0.0);

        Ok(OptimizationResult {
            original_duration: baseline.metrics.duration_days,
            optimized_duration: chosen.metrics.duration_days,
            duration_saving: baseline.metrics.duration_days - chosen.metrics.duration_days,
            original_cost: baseline.metrics.total_cost,
            optimized_cost: chosen.metrics.total_cost,
            cost_saving: baseline.metrics.total_cost - chosen.metrics.total_cost,
            quality_score: chosen.metrics.quality_score,
            resource_utilization: chosen.metrics.resource_score,
            feasibility_score: chosen.scored.feasibility,
            optimization_actions: actions,
            risks,
            performance: Performance {
                iterations_run: alternatives.len(),
                convergence_time,
                improvement_achieved: improvement(baseline.scored.objective, chosen.scored.objective),
            },
            selected_strategy: chosen.strategy,
            alternatives: alternatives
                .iter()
                .map(|a| AlternativeSummary {
                    strategy: a.strategy,
                    duration_days: a.metrics.duration_days,
                    total_cost: a.metrics.total_cost,
                    quality_score: a.metrics.quality_score,
                    resource_utilization: a.metrics.resource_score,
                    objective_score: a.scored.objective,
                    feasibility_score: a.scored.feasibility,
                    feasible: a.scored.feasibility > threshold,
                })
                .collect(),
            optimized_schedule: chosen.draft.materialize(&self.network),
            warnings,
        })
    }

    fn evaluate(
        &self,
        strategy: Strategy,
        ctx: &PlanningContext,
        pairs: &[FastTrackPair],
        weights: &NormalizedObjective,
    ) -> Alternative {
        let draft = strategy.build(ctx, pairs);
        let metrics = draft.measure(ctx);
        let scored = Scored {
            objective: evaluation::objective_score(&metrics, &self.constraints, weights),
            feasibility: evaluation::feasibility_score(&metrics, &self.constraints),
        };
        Alternative {
            strategy,
            draft,
            metrics,
            scored,
        }
    }

    /// Actions that turn the baseline into `chosen`.
    fn derive_actions(&self, baseline: &ScheduleDraft, chosen: &ScheduleDraft, pairs: &[FastTrackPair]) -> Vec<OptimizationAction> {
        let network = &self.network;
        let priority = &self.config.priority;
        let mut actions = Vec::new();

        for edge in &chosen.overlaps {
            let Some(pair) = pairs.iter().find(|p| p.edge == *edge) else {
                continue;
            };
            let pred = pair.predecessor.index();
            let original = network.graph[*edge];
            let overlapped = chosen.overrides.get(edge).copied().unwrap_or(original);
            let gained = original.earliest_start(0, chosen.durations[pred], 0)
                - overlapped.earliest_start(0, chosen.durations[pred], 0);
            let mut action = pair.to_action(network, &self.config);
            action.duration_impact = -gained;
            action.description = format!(
                "Start '{}' {} day(s) before '{}' finishes",
                network.activity(pair.successor).name,
                gained,
                network.activity(pair.predecessor).name
            );
            action.priority = action_priority(ActionType::FastTrack, -gained, action.cost_impact, pair.risk, priority);
            actions.push(action);
        }

        for idx in &chosen.crashed {
            let i = idx.index();
            let activity = network.activity(*idx);
            let days = chosen.durations[i] - baseline.durations[i];
            let cost = chosen.costs[i] - baseline.costs[i];
            actions.push(OptimizationAction {
                action_type: ActionType::Crash,
                activity_ids: vec![activity.id.clone()],
                description: format!("Crash '{}' from {} to {} day(s)", activity.name, baseline.durations[i], chosen.durations[i]),
                duration_impact: days,
                cost_impact: cost,
                risk_level: RiskLevel::Medium,
                priority: action_priority(ActionType::Crash, days, cost, RiskLevel::Medium, priority),
                prerequisites: vec![
                    format!("Additional {} capacity secured", activity.primary_trade),
                    "Cost increase approved".to_string(),
                ],
                implementation_effort: ImplementationEffort::Medium,
            });
        }

        for idx in &chosen.extended {
            let i = idx.index();
            let activity = network.activity(*idx);
            let days = chosen.durations[i] - baseline.durations[i];
            let cost = chosen.costs[i] - baseline.costs[i];
            actions.push(OptimizationAction {
                action_type: ActionType::QualityExtension,
                activity_ids: vec![activity.id.clone()],
                description: format!("Extend '{}' by {} day(s) for curing and inspection", activity.name, days),
                duration_impact: days,
                cost_impact: cost,
                risk_level: RiskLevel::Low,
                priority: action_priority(ActionType::QualityExtension, days, cost, RiskLevel::Low, priority),
                prerequisites: vec!["Inspector booked for the hold point".to_string()],
                implementation_effort: ImplementationEffort::Low,
            });
        }

        for (idx, shift) in &chosen.leveled {
            let activity = network.activity(*idx);
            actions.push(OptimizationAction {
                action_type: ActionType::ResourceLevel,
                activity_ids: vec![activity.id.clone()],
                description: format!(
                    "Delay '{}' by {} day(s) to relieve {} demand",
                    activity.name, shift, activity.primary_trade
                ),
                duration_impact: 0,
                cost_impact: 0.0,
                risk_level: RiskLevel::Low,
                priority: action_priority(ActionType::ResourceLevel, 0, 0.0, RiskLevel::Low, priority),
                prerequisites: vec![format!("Resequence {} crews", activity.primary_trade)],
                implementation_effort: ImplementationEffort::Low,
            });
        }

        actions
    }
}

/// Percentage gain of `selected` over `baseline`; 0 when the baseline scored 0.
fn improvement(baseline: f64, selected: f64) -> f64 {
    if baseline > 0.0 {
        (selected - baseline) / baseline * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::add_days;
    use chrono::NaiveDate;

    fn d0() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()
    }

    fn project() -> Vec<Activity> {
        vec![
            Activity::new("a", "Drywall", "drywaller", d0(), 10).with_cost(10_000.0),
            Activity::new("b", "Painting", "painter", add_days(d0(), 10), 10)
                .with_cost(5_000.0)
                .after("a"),
            Activity::new("c", "Joinery", "carpenter", d0(), 4).with_cost(2_000.0),
        ]
    }

    fn constraints() -> Constraints {
        let mut c = Constraints::new(30, 30_000.0);
        c.available_workforce = vec![
            Resource::workforce("d1", "drywaller"),
            Resource::workforce("p1", "painter"),
            Resource::workforce("c1", "carpenter"),
        ];
        c
    }

    fn optimizer() -> ScheduleOptimizer {
        ScheduleOptimizer::new(&project(), constraints(), PlannerConfig::default())
            .unwrap()
            .with_clock(FrozenClock)
    }

    #[test]
    fn test_time_weighted_objective_compresses() {
        let result = optimizer().optimize(&Objective::new(100.0, 0.0, 0.0, 0.0)).unwrap();
        assert_eq!(result.original_duration, 20);
        assert!(result.optimized_duration < 20);
        assert_eq!(result.duration_saving, 20 - result.optimized_duration);
        assert!(result.feasibility_score > 70.0);
        assert!(!result.optimization_actions.is_empty());
        assert_eq!(result.performance.iterations_run, 6);
        assert_eq!(result.performance.convergence_time, 0.0);
        assert!(result.performance.improvement_achieved > 0.0);
    }

    #[test]
    fn test_cost_weighted_objective_keeps_baseline() {
        let result = optimizer().optimize(&Objective::new(0.0, 100.0, 0.0, 0.0)).unwrap();
        assert_eq!(result.selected_strategy, Strategy::Baseline);
        assert!(result.optimization_actions.is_empty());
        assert_eq!(result.cost_saving, 0.0);
    }

    #[test]
    fn test_zero_weights_rejected() {
        let err = optimizer().optimize(&Objective::new(0.0, 0.0, 0.0, 0.0)).unwrap_err();
        assert_eq!(err, PlanError::Validation(ValidationError::ZeroObjectiveWeights));
    }

    #[test]
    fn test_empty_project_rejected() {
        let err = ScheduleOptimizer::new(&[], constraints(), PlannerConfig::default())
            .err()
            .unwrap();
        assert_eq!(err, PlanError::Validation(ValidationError::NoActivities));
    }

    #[test]
    fn test_repeated_quality_requirement_rejected() {
        let mut c = constraints();
        for _ in 0..2 {
            c.quality_requirements.push(crate::model::QualityRequirement {
                activity_id: "a".into(),
                min_duration: 10,
                inspection_time: 2,
            });
        }
        let err = ScheduleOptimizer::new(&project(), c, PlannerConfig::default())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            PlanError::Validation(ValidationError::InvalidConstraint(_))
        ));
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let objective = Objective::balanced();
        let parallel = optimizer().optimize(&objective).unwrap();
        let mut config = PlannerConfig::default();
        config.alternatives.parallel = false;
        let sequential = ScheduleOptimizer::new(&project(), constraints(), config)
            .unwrap()
            .with_clock(FrozenClock)
            .optimize(&objective)
            .unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_infeasible_constraints_still_return_most_feasible() {
        let c = Constraints::new(5, 1_000.0);
        let result = ScheduleOptimizer::new(&project(), c, PlannerConfig::default())
            .unwrap()
            .with_clock(FrozenClock)
            .optimize(&Objective::balanced())
            .unwrap();
        assert!(result.feasibility_score <= 70.0);
        assert!(result.feasibility_score >= 0.0);
        let best = result
            .alternatives
            .iter()
            .map(|a| a.feasibility_score)
            .fold(0.0f64, f64::max);
        assert_eq!(result.feasibility_score, best);
        assert!(result.warnings.iter().any(|w| w.contains("most feasible")));
    }

    struct Cautious;

    impl OverlapRiskClassifier for Cautious {
        fn classify(&self, _pred: &Activity, _succ: &Activity, _saving_days: i64) -> RiskLevel {
            RiskLevel::High
        }
    }

    #[test]
    fn test_custom_classifier_rates_every_overlap() {
        let result = optimizer()
            .with_classifier(Cautious)
            .optimize(&Objective::new(100.0, 0.0, 0.0, 0.0))
            .unwrap();
        assert!(result
            .optimization_actions
            .iter()
            .filter(|a| a.action_type == ActionType::FastTrack)
            .all(|a| a.risk_level == RiskLevel::High));
    }

    #[test]
    fn test_improvement_guards_zero_baseline() {
        assert_eq!(improvement(0.0, 50.0), 0.0);
        assert!((improvement(50.0, 60.0) - 20.0).abs() < 1e-9);
    }
}
