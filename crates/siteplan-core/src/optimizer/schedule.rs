//! Candidate schedules as deltas over the baseline arena, and their metrics.

use crate::analyzer::critical_path::CpmSchedule;
use crate::calendar::{add_days, Day};
use crate::config::PlannerConfig;
use crate::model::{Activity, Constraints, Resource};
use crate::network::{ActivityNetwork, LinkOverrides, ReleaseRule};
use crate::optimizer::fast_track::COORDINATION_COST_RATE;
use crate::resources::{DemandPeak, ResourceProfiler};
use petgraph::graph::{EdgeIndex, NodeIndex};
use std::collections::BTreeMap;

/// Everything a strategy may read. Shared read-only across workers.
pub struct PlanningContext<'a> {
    pub network: &'a ActivityNetwork,
    pub constraints: &'a Constraints,
    pub resources: &'a [Resource],
    pub config: &'a PlannerConfig,
    pub baseline: &'a CpmSchedule,
}

impl<'a> PlanningContext<'a> {
    pub fn profiler(&self) -> ResourceProfiler<'a> {
        ResourceProfiler::new(self.network, self.resources)
            .with_calendar(self.constraints.working_calendar.as_ref())
            .with_verbosity(self.config.verbosity)
    }
}

/// One alternative schedule. The activities themselves are never copied; only
/// per-index starts, durations, costs and link overrides differ from the baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleDraft {
    pub starts: Vec<Day>,
    pub durations: Vec<i64>,
    pub costs: Vec<f64>,
    pub overrides: LinkOverrides,
    /// Links turned from FS into an overlap.
    pub overlaps: Vec<EdgeIndex>,
    pub crashed: Vec<NodeIndex>,
    pub extended: Vec<NodeIndex>,
    /// Start delays introduced by leveling, in days.
    pub leveled: BTreeMap<NodeIndex, i64>,
}

impl ScheduleDraft {
    pub fn baseline(network: &ActivityNetwork, cpm: &CpmSchedule) -> Self {
        Self {
            starts: cpm.early_start.clone(),
            durations: network.planned_durations(),
            costs: network.planned_costs(),
            overrides: LinkOverrides::new(),
            overlaps: Vec::new(),
            crashed: Vec::new(),
            extended: Vec::new(),
            leveled: BTreeMap::new(),
        }
    }

    /// Re-derive starts from durations and links.
    pub fn reschedule(&mut self, network: &ActivityNetwork) {
        self.starts = network.forward_pass(
            &self.durations,
            &network.planned_starts(),
            ReleaseRule::RootsOnly,
            &self.overrides,
        );
    }

    pub fn cpm(&self, network: &ActivityNetwork) -> CpmSchedule {
        CpmSchedule::compute(network, &self.durations, &self.overrides)
    }

    pub fn finish(&self) -> Day {
        self.starts
            .iter()
            .zip(&self.durations)
            .map(|(s, d)| s + d)
            .max()
            .unwrap_or(0)
    }

    pub fn materialize(&self, network: &ActivityNetwork) -> Vec<Activity> {
        network.materialize(&self.starts, &self.durations, &self.costs, &self.overrides)
    }

    pub fn measure(&self, ctx: &PlanningContext) -> ScheduleMetrics {
        let network = ctx.network;
        let quality_cfg = &ctx.config.quality;

        let coordination_cost: f64 = self
            .overlaps
            .iter()
            .filter_map(|e| network.graph.edge_endpoints(*e))
            .map(|(p, s)| COORDINATION_COST_RATE * (self.costs[p.index()] + self.costs[s.index()]))
            .sum();
        let total_cost = self.costs.iter().sum::<f64>() + coordination_cost;

        let requirements = &ctx.constraints.quality_requirements;
        let met_share = if requirements.is_empty() {
            1.0
        } else {
            let met = requirements
                .iter()
                .filter(|q| {
                    network
                        .index_of(&q.activity_id)
                        .is_some_and(|idx| self.durations[idx.index()] >= q.min_duration + q.inspection_time)
                })
                .count();
            met as f64 / requirements.len() as f64
        };
        let quality_score = (quality_cfg.base_score
            - quality_cfg.fast_track_penalty * self.overlaps.len() as f64
            - quality_cfg.crash_penalty * self.crashed.len() as f64
            + quality_cfg.requirement_bonus * met_share)
            .clamp(0.0, 100.0);

        let profile = ctx.profiler().profile(&self.starts, &self.durations);

        let axis = network.axis();
        let missed_milestones = ctx
            .constraints
            .fixed_milestones
            .iter()
            .filter(|m| {
                network.index_of(&m.activity_id).is_some_and(|idx| {
                    let i = idx.index();
                    let finish = axis.date_of(self.starts[i] + self.durations[i]);
                    finish > add_days(m.date, m.flexibility_days)
                })
            })
            .count();

        let project_start = self.starts.iter().copied().min().unwrap_or(0);
        ScheduleMetrics {
            duration_days: self.finish() - project_start,
            total_cost,
            quality_score,
            resource_score: profile.resource_score(),
            overallocated_cells: profile.overallocated_cells(),
            peaks: profile.peaks(),
            missed_milestones,
            warnings: profile.warnings,
        }
    }
}

/// Outcome measures of one schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleMetrics {
    pub duration_days: i64,
    pub total_cost: f64,
    /// 0-100.
    pub quality_score: f64,
    /// 0-100, see [`crate::resources::ResourceProfile::resource_score`].
    pub resource_score: f64,
    pub overallocated_cells: usize,
    pub peaks: Vec<DemandPeak>,
    pub missed_milestones: usize,
    pub warnings: Vec<String>,
}
