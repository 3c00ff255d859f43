//! Resource leveling: smoothing within float, and resource-limited scheduling.

use crate::analyzer::critical_path::CpmSchedule;
use crate::analyzer::report::Severity;
use crate::calendar::Day;
use crate::config::PlannerConfig;
use crate::error::Result;
use crate::model::{Activity, Resource, ResourceAssignment};
use crate::network::{ActivityNetwork, LinkOverrides};
use crate::resources::profile::{demand_types, ResourceProfile, ResourceProfileDay, ResourceProfiler};
use crate::{log_changes, log_checks, log_debug};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LevelingStrategy {
    /// Move activities within their float only; duration never changes.
    Smoothing,
    /// Delay activities until capacity exists; duration may grow.
    ResourceLimited,
    /// Smoothing, then resource-limited scheduling if peaks remain.
    Auto,
}

/// Start days produced by a leveling run.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub starts: Vec<Day>,
    /// Activities whose capacity conflict could not be resolved.
    pub unresolved: Vec<String>,
}

impl Placement {
    pub fn shift_of(&self, original: &[Day], idx: usize) -> i64 {
        self.starts[idx] - original[idx]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelingImprovements {
    /// Reduction of the highest single-type daily demand, percent.
    pub peak_reduction: f64,
    /// Reduction of daily demand variance, percent.
    pub utilization_improvement: f64,
    /// Change in project duration, days.
    pub duration_impact: i64,
    pub cost_impact: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLevelingResult {
    pub strategy: LevelingStrategy,
    pub leveled_schedule: Vec<Activity>,
    /// Days each moved activity was delayed.
    pub shifts: BTreeMap<String, i64>,
    pub resource_profile: Vec<ResourceProfileDay>,
    pub assignments: Vec<ResourceAssignment>,
    pub improvements: LevelingImprovements,
    pub recommendations: Vec<Recommendation>,
    pub warnings: Vec<String>,
}

/// Level resources with the default configuration: smoothing first, then
/// resource-limited scheduling if overallocation remains.
pub fn level_resources(activities: &[Activity], available_resources: &[Resource]) -> Result<ResourceLevelingResult> {
    let network = ActivityNetwork::build(activities)?;
    let config = PlannerConfig::default();
    Ok(ResourceLeveler::new(&network, available_resources, &config).level(LevelingStrategy::Auto))
}

pub struct ResourceLeveler<'a> {
    network: &'a ActivityNetwork,
    profiler: ResourceProfiler<'a>,
    resources: &'a [Resource],
    config: &'a PlannerConfig,
}

impl<'a> ResourceLeveler<'a> {
    pub fn new(network: &'a ActivityNetwork, resources: &'a [Resource], config: &'a PlannerConfig) -> Self {
        Self {
            network,
            profiler: ResourceProfiler::new(network, resources).with_verbosity(config.verbosity),
            resources,
            config,
        }
    }

    pub fn with_calendar(mut self, calendar: Option<&'a crate::calendar::WorkingCalendar>) -> Self {
        self.profiler = self.profiler.with_calendar(calendar);
        self
    }

    pub fn profiler(&self) -> &ResourceProfiler<'a> {
        &self.profiler
    }

    fn demand_on(&self, resource_type: &str, day: Day, starts: &[Day], durations: &[i64]) -> i64 {
        self.network
            .graph
            .node_indices()
            .filter(|idx| {
                let i = idx.index();
                starts[i] <= day
                    && day < starts[i] + durations[i]
                    && demand_types(self.network.activity(*idx)).any(|t| t == resource_type)
            })
            .count() as i64
    }

    /// Shift activities inside their float to flatten demand peaks.
    ///
    /// Each move is at most `max_smoothing_shift_days` and never past the
    /// activity's late start, so the project finish is unchanged. Peaks above
    /// `max_overallocation` are left alone when a limit is given.
    pub fn smooth(
        &self,
        cpm: &CpmSchedule,
        starts: &[Day],
        durations: &[i64],
        overrides: &LinkOverrides,
        max_overallocation: Option<i64>,
    ) -> Placement {
        let verbosity = self.config.verbosity;
        let max_shift = self.config.leveling.max_smoothing_shift_days;
        let mut starts = starts.to_vec();
        let mut total = self.profiler.profile(&starts, durations).total_overallocation();

        let horizon_start = starts.iter().copied().min().unwrap_or(0);
        let horizon_end = cpm.project_finish;
        let types: BTreeSet<String> = self
            .network
            .activities()
            .flat_map(|a| demand_types(a).map(str::to_string).collect::<Vec<_>>())
            .collect();

        for day in horizon_start..horizon_end {
            for resource_type in &types {
                let available = self.profiler.available(resource_type, day);
                let mut excess = self.demand_on(resource_type, day, &starts, durations) - available;
                if excess <= 0 {
                    continue;
                }
                if max_overallocation.is_some_and(|limit| excess > limit) {
                    log_checks!(verbosity, "peak {} on day {} exceeds smoothing limit, skipped", resource_type, day);
                    continue;
                }

                let mut candidates: Vec<NodeIndex> = self
                    .network
                    .graph
                    .node_indices()
                    .filter(|idx| {
                        let i = idx.index();
                        starts[i] <= day
                            && day < starts[i] + durations[i]
                            && cpm.late_start[i] > starts[i]
                            && demand_types(self.network.activity(*idx)).any(|t| t == resource_type)
                    })
                    .collect();
                candidates.sort_by(|a, b| {
                    let fa = cpm.late_start[a.index()] - starts[a.index()];
                    let fb = cpm.late_start[b.index()] - starts[b.index()];
                    fb.cmp(&fa)
                        .then_with(|| self.network.activity(*a).id.cmp(&self.network.activity(*b).id))
                });

                for idx in candidates {
                    if excess <= 0 {
                        break;
                    }
                    let i = idx.index();
                    let shift = (cpm.late_start[i] - starts[i]).min(max_shift);
                    if starts[i] + shift <= day {
                        continue;
                    }

                    let mut trial = starts.clone();
                    trial[i] += shift;
                    self.network.repair_forward(&mut trial, durations, idx, overrides);
                    let trial_total = self.profiler.profile(&trial, durations).total_overallocation();
                    if trial_total >= total {
                        log_debug!(verbosity, "shifting '{}' by {}d does not reduce overallocation", self.network.activity(idx).id, shift);
                        continue;
                    }

                    log_changes!(verbosity, "smoothing: '{}' +{}d ({} peak on day {})", self.network.activity(idx).id, shift, resource_type, day);
                    starts = trial;
                    total = trial_total;
                    excess -= 1;
                }
            }
        }

        Placement {
            starts,
            unresolved: Vec::new(),
        }
    }

    /// Serial schedule generation against a per-day, per-type reservation ledger.
    ///
    /// Eligible activities (all predecessors placed) are taken critical-first,
    /// then by early start. Each is advanced day by day until every resource
    /// type it needs has a free unit for its whole duration.
    pub fn resource_limited(&self, cpm: &CpmSchedule, durations: &[i64], overrides: &LinkOverrides) -> Placement {
        let verbosity = self.config.verbosity;
        let limit = self.config.leveling.max_search_days;
        let n = self.network.len();
        let release = self.network.planned_starts();
        let mut placed: Vec<Option<Day>> = vec![None; n];
        let mut ledger: HashMap<String, BTreeMap<Day, i64>> = HashMap::new();
        let mut unresolved = Vec::new();

        for _ in 0..n {
            let Some(next) = self
                .network
                .graph
                .node_indices()
                .filter(|idx| placed[idx.index()].is_none())
                .filter(|idx| self.network.predecessors(*idx).all(|(p, _, _)| placed[p.index()].is_some()))
                .min_by_key(|idx| {
                    let i = idx.index();
                    (cpm.total_float[i] != 0, cpm.early_start[i], i)
                })
            else {
                break;
            };
            let i = next.index();
            let activity = self.network.activity(next);

            let earliest = self
                .network
                .predecessors(next)
                .map(|(p, edge, link)| {
                    let ps = placed[p.index()].unwrap_or(cpm.early_start[p.index()]);
                    overrides
                        .get(&edge)
                        .unwrap_or(link)
                        .earliest_start(ps, durations[p.index()], durations[i])
                })
                .max()
                .unwrap_or(release[i]);

            let types: Vec<&str> = demand_types(activity).collect();
            let constrained: Vec<&str> = types
                .iter()
                .copied()
                .filter(|t| self.profiler.knows_type(t))
                .collect();

            let fits = |start: Day, ledger: &HashMap<String, BTreeMap<Day, i64>>| {
                constrained.iter().all(|t| {
                    (start..start + durations[i]).all(|d| {
                        let used = ledger.get(*t).and_then(|m| m.get(&d)).copied().unwrap_or(0);
                        used < self.profiler.available(t, d)
                    })
                })
            };

            let mut start = earliest;
            let found = loop {
                if start - earliest > limit {
                    break false;
                }
                if self.profiler.is_working_day(start) && fits(start, &ledger) {
                    break true;
                }
                log_debug!(verbosity, "ledger full for '{}' on day {}", activity.id, start);
                start += 1;
            };
            if !found {
                log_changes!(verbosity, "no capacity for '{}' within {} days; kept at earliest start", activity.id, limit);
                unresolved.push(activity.id.clone());
                start = earliest;
            }
            if start > cpm.early_start[i] {
                log_changes!(verbosity, "resource-limited: '{}' delayed {}d", activity.id, start - cpm.early_start[i]);
            }

            for t in &types {
                let row = ledger.entry((*t).to_string()).or_default();
                for d in start..start + durations[i] {
                    *row.entry(d).or_insert(0) += 1;
                }
            }
            placed[i] = Some(start);
        }

        Placement {
            starts: placed
                .iter()
                .enumerate()
                .map(|(i, s)| s.unwrap_or(cpm.early_start[i]))
                .collect(),
            unresolved,
        }
    }

    /// Run `strategy` over a computed schedule. Returns the strategy actually used.
    pub fn place(
        &self,
        strategy: LevelingStrategy,
        cpm: &CpmSchedule,
        durations: &[i64],
        overrides: &LinkOverrides,
    ) -> (LevelingStrategy, Placement) {
        match strategy {
            LevelingStrategy::Smoothing => (
                strategy,
                self.smooth(cpm, &cpm.early_start, durations, overrides, None),
            ),
            LevelingStrategy::ResourceLimited => (strategy, self.resource_limited(cpm, durations, overrides)),
            LevelingStrategy::Auto => {
                let smoothed = self.smooth(cpm, &cpm.early_start, durations, overrides, None);
                let residual = self.profiler.profile(&smoothed.starts, durations).total_overallocation();
                if residual > 0 {
                    log_checks!(
                        self.config.verbosity,
                        "smoothing left {} overallocated units; switching to resource-limited",
                        residual
                    );
                    (
                        LevelingStrategy::ResourceLimited,
                        self.resource_limited(cpm, durations, overrides),
                    )
                } else {
                    (LevelingStrategy::Smoothing, smoothed)
                }
            }
        }
    }

    /// Level the planned schedule and report the effect.
    pub fn level(&self, strategy: LevelingStrategy) -> ResourceLevelingResult {
        let durations = self.network.planned_durations();
        let cpm = CpmSchedule::planned(self.network);
        let original_profile = self.profiler.profile(&cpm.early_start, &durations);
        let (used, placement) = self.place(strategy, &cpm, &durations, &LinkOverrides::new());
        self.report(used, &cpm, &original_profile, placement, &durations)
    }

    fn report(
        &self,
        strategy: LevelingStrategy,
        cpm: &CpmSchedule,
        original_profile: &ResourceProfile,
        placement: Placement,
        durations: &[i64],
    ) -> ResourceLevelingResult {
        let original = &cpm.early_start;
        let profile = self.profiler.profile(&placement.starts, durations);
        let costs = self.network.planned_costs();
        let leveled_schedule = self
            .network
            .materialize(&placement.starts, durations, &costs, &LinkOverrides::new());

        let shifts: BTreeMap<String, i64> = self
            .network
            .graph
            .node_indices()
            .filter(|idx| placement.shift_of(original, idx.index()) != 0)
            .map(|idx| {
                (
                    self.network.activity(idx).id.clone(),
                    placement.shift_of(original, idx.index()),
                )
            })
            .collect();

        let new_finish = placement
            .starts
            .iter()
            .zip(durations)
            .map(|(s, d)| s + d)
            .max()
            .unwrap_or(cpm.project_finish);
        let new_start = placement.starts.iter().copied().min().unwrap_or(cpm.project_start);
        let duration_impact = (new_finish - new_start) - cpm.duration_days();

        let daily_equipment_cost: f64 = self
            .resources
            .iter()
            .filter(|r| matches!(r, Resource::Equipment(_)))
            .map(Resource::daily_cost)
            .sum();

        let improvements = LevelingImprovements {
            peak_reduction: percent_reduction(
                original_profile.peak_required() as f64,
                profile.peak_required() as f64,
            ),
            utilization_improvement: percent_reduction(
                original_profile.demand_variance(),
                profile.demand_variance(),
            ),
            duration_impact,
            cost_impact: duration_impact as f64 * daily_equipment_cost,
        };

        let mut warnings = profile.warnings.clone();
        for id in &placement.unresolved {
            warnings.push(format!("Could not find capacity for '{}' within the search horizon", id));
        }

        let recommendations = recommend(original_profile, &profile, &improvements, &placement.unresolved);

        ResourceLevelingResult {
            strategy,
            leveled_schedule,
            shifts,
            assignments: self.profiler.assignments(&placement.starts, durations, &profile),
            resource_profile: profile.days,
            improvements,
            recommendations,
            warnings,
        }
    }
}

/// `(before - after) / before * 100`, 0 when there was nothing to reduce.
pub(crate) fn percent_reduction(before: f64, after: f64) -> f64 {
    if before > 0.0 {
        (before - after) / before * 100.0
    } else {
        0.0
    }
}

fn recommend(
    original: &ResourceProfile,
    leveled: &ResourceProfile,
    improvements: &LevelingImprovements,
    unresolved: &[String],
) -> Vec<Recommendation> {
    let mut out = Vec::new();

    for warning in &leveled.warnings {
        out.push(Recommendation {
            severity: Severity::High,
            message: format!("{}. Register crews or plant for it before relying on this plan.", warning),
        });
    }

    let peaks = leveled.peaks();
    if !peaks.is_empty() {
        let mut by_type: BTreeMap<&str, (usize, i64)> = BTreeMap::new();
        for p in &peaks {
            let entry = by_type.entry(p.resource_type.as_str()).or_insert((0, 0));
            entry.0 += 1;
            entry.1 = entry.1.max(p.overallocation);
        }
        for (t, (days, worst)) in by_type {
            out.push(Recommendation {
                severity: Severity::High,
                message: format!(
                    "'{}' remains overallocated on {} day(s) (worst +{}); add capacity or extend working hours",
                    t, days, worst
                ),
            });
        }
    }

    if !unresolved.is_empty() {
        out.push(Recommendation {
            severity: Severity::High,
            message: format!(
                "{} activit{} could not be fitted to available capacity: {}",
                unresolved.len(),
                if unresolved.len() == 1 { "y" } else { "ies" },
                unresolved.join(", ")
            ),
        });
    }

    if improvements.duration_impact > 0 {
        out.push(Recommendation {
            severity: Severity::Medium,
            message: format!(
                "Leveling extends the project by {} day(s); adding capacity on the busiest trades would avoid the delay",
                improvements.duration_impact
            ),
        });
    }

    if improvements.peak_reduction > 0.0 {
        out.push(Recommendation {
            severity: Severity::Low,
            message: format!(
                "Peak daily demand reduced by {:.1}%; adopt the leveled start dates",
                improvements.peak_reduction
            ),
        });
    }

    if original.overallocated_cells() == 0 && out.is_empty() {
        out.push(Recommendation {
            severity: Severity::Info,
            message: "Resource demand is within capacity; no leveling required".to_string(),
        });
    }

    out.sort_by_key(|r| std::cmp::Reverse(r.severity.priority()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{add_days, WorkingCalendar};
    use chrono::NaiveDate;

    fn d0() -> NaiveDate {
        // a Monday
        NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
    }

    fn masons() -> Vec<Resource> {
        vec![Resource::workforce("m1", "mason"), Resource::workforce("m2", "mason")]
    }

    fn walls() -> Vec<Activity> {
        vec![
            Activity::new("A", "Wall A", "mason", d0(), 10),
            Activity::new("B", "Wall B", "mason", add_days(d0(), 2), 6),
            Activity::new("C", "Wall C", "mason", add_days(d0(), 5), 2),
        ]
    }

    #[test]
    fn test_resource_limited_delays_lowest_priority_activity() {
        let net = ActivityNetwork::build(&walls()).unwrap();
        let config = PlannerConfig::default();
        let resources = masons();
        let leveler = ResourceLeveler::new(&net, &resources, &config);
        let cpm = CpmSchedule::planned(&net);
        let placement = leveler.resource_limited(&cpm, &net.planned_durations(), &LinkOverrides::new());
        assert_eq!(placement.starts, vec![0, 2, 8]);
        assert!(placement.unresolved.is_empty());
    }

    #[test]
    fn test_smoothing_stays_within_float() {
        let net = ActivityNetwork::build(&walls()).unwrap();
        let config = PlannerConfig::default();
        let resources = masons();
        let leveler = ResourceLeveler::new(&net, &resources, &config);
        let cpm = CpmSchedule::planned(&net);
        let durations = net.planned_durations();
        let placement = leveler.smooth(&cpm, &cpm.early_start, &durations, &LinkOverrides::new(), None);

        for i in 0..net.len() {
            let shift = placement.starts[i] - cpm.early_start[i];
            assert!(shift >= 0);
            assert!(shift <= cpm.total_float[i]);
        }
        let profile = leveler.profiler().profile(&placement.starts, &durations);
        assert_eq!(profile.total_overallocation(), 0);
        assert_eq!(placement.starts[2], 8);
    }

    #[test]
    fn test_smoothing_respects_overallocation_limit() {
        let net = ActivityNetwork::build(&walls()).unwrap();
        let config = PlannerConfig::default();
        let resources = vec![Resource::workforce("m1", "mason")];
        let leveler = ResourceLeveler::new(&net, &resources, &config);
        let cpm = CpmSchedule::planned(&net);
        // With one mason the day-5 peak is +2, above a limit of 1.
        let placement = leveler.smooth(&cpm, &cpm.early_start, &net.planned_durations(), &LinkOverrides::new(), Some(1));
        assert_eq!(placement.starts[2], cpm.early_start[2]);
    }

    #[test]
    fn test_smoothing_moves_successors_with_their_predecessor() {
        let acts = vec![
            Activity::new("x", "Frame", "carpenter", d0(), 2),
            Activity::new("y", "Paint walls", "painter", add_days(d0(), 2), 8).after("x"),
            Activity::new("a", "Shelving", "carpenter", d0(), 2),
            Activity::new("b", "Paint shelving", "painter", add_days(d0(), 2), 2).after("a"),
        ];
        let net = ActivityNetwork::build(&acts).unwrap();
        let config = PlannerConfig::default();
        let resources = vec![
            Resource::workforce("c1", "carpenter"),
            Resource::workforce("p1", "painter"),
            Resource::workforce("p2", "painter"),
        ];
        let leveler = ResourceLeveler::new(&net, &resources, &config);
        let cpm = CpmSchedule::planned(&net);
        let durations = net.planned_durations();
        let placement = leveler.smooth(&cpm, &cpm.early_start, &durations, &LinkOverrides::new(), None);

        let a = net.index_of("a").unwrap().index();
        let b = net.index_of("b").unwrap().index();
        assert_eq!(placement.starts[a], 2);
        assert_eq!(placement.starts[b], 4);
        assert!(placement.starts[b] <= cpm.late_start[b]);
        let profile = leveler.profiler().profile(&placement.starts, &durations);
        assert_eq!(profile.total_overallocation(), 0);
    }

    #[test]
    fn test_resource_limited_skips_non_working_days() {
        let acts = vec![
            Activity::new("x", "X", "mason", d0(), 3),
            Activity::new("y", "Y", "mason", d0(), 2),
        ];
        let net = ActivityNetwork::build(&acts).unwrap();
        let config = PlannerConfig::default();
        let resources = vec![Resource::workforce("m1", "mason")];
        let calendar = WorkingCalendar {
            working_days: WorkingCalendar::default().working_days,
            holidays: vec![add_days(d0(), 3)],
        };
        let leveler = ResourceLeveler::new(&net, &resources, &config).with_calendar(Some(&calendar));
        let cpm = CpmSchedule::planned(&net);
        let placement = leveler.resource_limited(&cpm, &net.planned_durations(), &LinkOverrides::new());
        // x is critical and goes first; y cannot start on the day-3 holiday.
        assert_eq!(placement.starts, vec![0, 4]);
    }

    #[test]
    fn test_unknown_trade_is_not_blocking() {
        let acts = vec![
            Activity::new("x", "X", "glazier", d0(), 3),
            Activity::new("y", "Y", "glazier", d0(), 3),
        ];
        let result = level_resources(&acts, &masons()).unwrap();
        assert!(result.warnings.iter().any(|w| w.contains("glazier")));
        assert!(result
            .recommendations
            .iter()
            .any(|r| r.severity == Severity::High && r.message.contains("glazier")));
    }

    #[test]
    fn test_level_resources_reports_improvements() {
        let result = level_resources(&walls(), &masons()).unwrap();
        assert_eq!(result.strategy, LevelingStrategy::Smoothing);
        assert_eq!(result.improvements.duration_impact, 0);
        assert!((result.improvements.peak_reduction - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(result.shifts.get("C"), Some(&3));
        assert!(result.resource_profile.iter().all(|d| d.per_resource_type["mason"].overallocation == 0));
        let c = result.leveled_schedule.iter().find(|a| a.id == "C").unwrap();
        assert_eq!(c.planned_start_date, add_days(d0(), 8));
        assert_eq!(c.total_float, Some(0));
    }

    #[test]
    fn test_nothing_to_level() {
        let acts = vec![Activity::new("x", "X", "mason", d0(), 3)];
        let result = level_resources(&acts, &masons()).unwrap();
        assert!(result.shifts.is_empty());
        assert_eq!(result.recommendations.len(), 1);
        assert_eq!(result.recommendations[0].severity, Severity::Info);
    }
}
