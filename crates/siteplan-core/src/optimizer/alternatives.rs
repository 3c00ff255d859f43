//! The six candidate schedules built from the same baseline.

use crate::analyzer::report::RiskLevel;
use crate::log_debug;
use crate::optimizer::fast_track::FastTrackPair;
use crate::optimizer::schedule::{PlanningContext, ScheduleDraft};
use crate::resources::{LevelingStrategy, ResourceLeveler};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    Baseline,
    FastTrack,
    ResourceOptimized,
    QualityFocused,
    Crash,
    Balanced,
}

impl Strategy {
    /// Generation order; also the tie-break order during selection.
    pub const ALL: [Strategy; 6] = [
        Strategy::Baseline,
        Strategy::FastTrack,
        Strategy::ResourceOptimized,
        Strategy::QualityFocused,
        Strategy::Crash,
        Strategy::Balanced,
    ];

    pub fn name(&self) -> &str {
        match self {
            Strategy::Baseline => "baseline",
            Strategy::FastTrack => "fast-track",
            Strategy::ResourceOptimized => "resource-optimized",
            Strategy::QualityFocused => "quality-focused",
            Strategy::Crash => "crash",
            Strategy::Balanced => "balanced",
        }
    }

    /// Build this strategy's schedule from a fresh copy of the baseline.
    pub fn build(&self, ctx: &PlanningContext, pairs: &[FastTrackPair]) -> ScheduleDraft {
        let mut draft = ScheduleDraft::baseline(ctx.network, ctx.baseline);
        match self {
            Strategy::Baseline => {}
            Strategy::FastTrack => {
                let eligible: Vec<&FastTrackPair> = pairs.iter().filter(|p| p.risk != RiskLevel::High).collect();
                overlap(ctx, &mut draft, &eligible);
            }
            Strategy::ResourceOptimized => level(ctx, &mut draft, LevelingStrategy::Auto, None),
            Strategy::QualityFocused => extend_for_quality(ctx, &mut draft),
            Strategy::Crash => crash_critical(ctx, &mut draft),
            Strategy::Balanced => {
                let mut eligible: Vec<&FastTrackPair> = pairs.iter().filter(|p| p.risk != RiskLevel::High).collect();
                eligible.sort_by_key(|p| (p.risk, std::cmp::Reverse(p.saving_days), p.edge.index()));
                eligible.truncate(ctx.config.alternatives.balanced_pair_count);
                overlap(ctx, &mut draft, &eligible);
                level(
                    ctx,
                    &mut draft,
                    LevelingStrategy::Smoothing,
                    Some(ctx.config.alternatives.balanced_max_overallocation),
                );
            }
        }
        draft
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn overlap(ctx: &PlanningContext, draft: &mut ScheduleDraft, pairs: &[&FastTrackPair]) {
    let overlap = ctx.config.alternatives.fast_track_overlap;
    for pair in pairs {
        let original = ctx.network.graph[pair.edge];
        let link = pair.overlap_link(ctx.network, &original, overlap);
        if link.earliest_start(0, draft.durations[pair.predecessor.index()], 0)
            >= original.earliest_start(0, draft.durations[pair.predecessor.index()], 0)
        {
            continue;
        }
        log_debug!(
            ctx.config.verbosity,
            "overlap '{}' -> '{}' (SS+{})",
            ctx.network.activity(pair.predecessor).id,
            ctx.network.activity(pair.successor).id,
            link.lag_days
        );
        draft.overrides.insert(pair.edge, link);
        draft.overlaps.push(pair.edge);
    }
    draft.reschedule(ctx.network);
}

fn level(ctx: &PlanningContext, draft: &mut ScheduleDraft, strategy: LevelingStrategy, limit: Option<i64>) {
    let leveler = ResourceLeveler::new(ctx.network, ctx.resources, ctx.config)
        .with_calendar(ctx.constraints.working_calendar.as_ref());
    let cpm = draft.cpm(ctx.network);
    let placement = match (strategy, limit) {
        (LevelingStrategy::Smoothing, Some(limit)) => {
            leveler.smooth(&cpm, &draft.starts, &draft.durations, &draft.overrides, Some(limit))
        }
        _ => leveler.place(strategy, &cpm, &draft.durations, &draft.overrides).1,
    };
    for (i, (after, before)) in placement.starts.iter().zip(&draft.starts).enumerate() {
        if after != before {
            draft.leveled.insert(NodeIndex::new(i), after - before);
        }
    }
    draft.starts = placement.starts;
}

fn extend_for_quality(ctx: &PlanningContext, draft: &mut ScheduleDraft) {
    for requirement in &ctx.constraints.quality_requirements {
        let Some(idx) = ctx.network.index_of(&requirement.activity_id) else {
            continue;
        };
        let i = idx.index();
        let current = draft.durations[i];
        let extended = current.max(requirement.min_duration) + requirement.inspection_time;
        if extended > current {
            draft.costs[i] += ctx.network.activity(idx).daily_cost() * (extended - current) as f64;
            draft.durations[i] = extended;
            draft.extended.push(idx);
        }
    }
    draft.reschedule(ctx.network);
}

fn crash_critical(ctx: &PlanningContext, draft: &mut ScheduleDraft) {
    let factor = ctx.config.alternatives.crash_duration_factor;
    let cost_factor = ctx.config.alternatives.crash_cost_factor;
    for idx in ctx.network.graph.node_indices() {
        if !ctx.baseline.is_critical(idx) {
            continue;
        }
        let i = idx.index();
        let current = draft.durations[i];
        let reduction = (current as f64 * factor).floor() as i64;
        let crashed = (current - reduction).max(1);
        if crashed < current {
            draft.durations[i] = crashed;
            draft.costs[i] *= 1.0 + cost_factor;
            draft.crashed.push(idx);
        }
    }
    draft.reschedule(ctx.network);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::critical_path::CpmSchedule;
    use crate::calendar::add_days;
    use crate::config::PlannerConfig;
    use crate::model::{Activity, Constraints, QualityRequirement, Resource};
    use crate::network::ActivityNetwork;
    use crate::optimizer::fast_track::fast_track_pairs;
    use crate::optimizer::risk_rules::KeywordRiskRules;
    use chrono::NaiveDate;

    fn d0() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()
    }

    fn activities() -> Vec<Activity> {
        vec![
            Activity::new("a", "Drywall", "drywaller", d0(), 10).with_cost(10_000.0),
            Activity::new("b", "Painting", "painter", add_days(d0(), 10), 10)
                .with_cost(5_000.0)
                .after("a"),
        ]
    }

    fn run(strategy: Strategy, constraints: &Constraints) -> (ActivityNetwork, ScheduleDraft) {
        let net = ActivityNetwork::build(&activities()).unwrap();
        let cpm = CpmSchedule::planned(&net);
        let config = PlannerConfig::default();
        let resources = vec![Resource::workforce("d1", "drywaller"), Resource::workforce("p1", "painter")];
        let rules = KeywordRiskRules::from_config(&config).unwrap();
        let pairs = fast_track_pairs(&net, &rules);
        let ctx = PlanningContext {
            network: &net,
            constraints,
            resources: &resources,
            config: &config,
            baseline: &cpm,
        };
        let draft = strategy.build(&ctx, &pairs);
        (net, draft)
    }

    #[test]
    fn test_fast_track_starts_successor_halfway() {
        let (_, draft) = run(Strategy::FastTrack, &Constraints::new(100, 1e6));
        assert_eq!(draft.starts, vec![0, 5]);
        assert_eq!(draft.finish(), 15);
        assert_eq!(draft.overlaps.len(), 1);
    }

    #[test]
    fn test_crash_shortens_critical_work() {
        let (_, draft) = run(Strategy::Crash, &Constraints::new(100, 1e6));
        assert_eq!(draft.durations, vec![8, 8]);
        assert_eq!(draft.starts, vec![0, 8]);
        assert!((draft.costs[0] - 13_000.0).abs() < 1e-9);
        assert_eq!(draft.crashed.len(), 2);
    }

    #[test]
    fn test_quality_extension_adds_inspection() {
        let mut constraints = Constraints::new(100, 1e6);
        constraints.quality_requirements.push(QualityRequirement {
            activity_id: "a".to_string(),
            min_duration: 12,
            inspection_time: 2,
        });
        let (_, draft) = run(Strategy::QualityFocused, &constraints);
        assert_eq!(draft.durations[0], 14);
        assert!((draft.costs[0] - 14_000.0).abs() < 1e-9);
        assert_eq!(draft.starts[1], 14);
    }

    #[test]
    fn test_alternatives_do_not_share_state() {
        let constraints = Constraints::new(100, 1e6);
        let (net, crash) = run(Strategy::Crash, &constraints);
        let (_, baseline) = run(Strategy::Baseline, &constraints);
        assert_eq!(baseline.durations, net.planned_durations());
        assert_ne!(crash.durations, baseline.durations);
        assert_eq!(net.activity(net.index_of("a").unwrap()).planned_duration_days, 10);
    }
}
