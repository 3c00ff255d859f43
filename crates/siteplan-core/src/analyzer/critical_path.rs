use crate::analyzer::report::Severity;
use crate::calendar::Day;
use crate::config::PlannerConfig;
use crate::error::Result;
use crate::model::Activity;
use crate::network::{ActivityNetwork, LinkOverrides, ReleaseRule};
use chrono::NaiveDate;
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Early/late dates and floats for every activity, indexed by arena position.
#[derive(Debug, Clone, PartialEq)]
pub struct CpmSchedule {
    pub early_start: Vec<Day>,
    pub early_finish: Vec<Day>,
    pub late_start: Vec<Day>,
    pub late_finish: Vec<Day>,
    pub total_float: Vec<i64>,
    pub free_float: Vec<i64>,
    pub project_start: Day,
    pub project_finish: Day,
}

impl CpmSchedule {
    /// Forward and backward pass over the given durations and link overrides.
    pub fn compute(network: &ActivityNetwork, durations: &[i64], overrides: &LinkOverrides) -> Self {
        let release = network.planned_starts();
        let early_start = network.forward_pass(durations, &release, ReleaseRule::RootsOnly, overrides);
        let early_finish: Vec<Day> = early_start
            .iter()
            .zip(durations)
            .map(|(s, d)| s + d)
            .collect();

        let project_start = early_start.iter().copied().min().unwrap_or(0);
        let project_finish = early_finish.iter().copied().max().unwrap_or(0);

        let late_finish = network.backward_pass(durations, project_finish, overrides);
        let late_start: Vec<Day> = late_finish
            .iter()
            .zip(durations)
            .map(|(f, d)| f - d)
            .collect();

        let total_float: Vec<i64> = late_start
            .iter()
            .zip(&early_start)
            .map(|(ls, es)| (ls - es).max(0))
            .collect();

        let free_float = network.free_floats(&early_start, durations, &total_float, overrides);

        Self {
            early_start,
            early_finish,
            late_start,
            late_finish,
            total_float,
            free_float,
            project_start,
            project_finish,
        }
    }

    /// CPM over the planned durations.
    pub fn planned(network: &ActivityNetwork) -> Self {
        Self::compute(network, &network.planned_durations(), &LinkOverrides::new())
    }

    pub fn duration_days(&self) -> i64 {
        self.project_finish - self.project_start
    }

    pub fn is_critical(&self, idx: NodeIndex) -> bool {
        self.total_float[idx.index()] == 0
    }

    /// Largest total float, used to normalise the criticality index.
    pub fn max_float(&self) -> i64 {
        self.total_float.iter().copied().max().unwrap_or(0)
    }

    /// 1 for certainly critical, approaching 0 for the activity with the most float.
    pub fn criticality_index(&self, idx: NodeIndex) -> f64 {
        let max_float = self.max_float();
        if max_float == 0 {
            // No activity has float: the whole network is critical.
            return 1.0;
        }
        1.0 - self.total_float[idx.index()] as f64 / max_float as f64
    }
}

/// Per-activity CPM dates as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityTiming {
    pub activity_id: String,
    pub early_start: NaiveDate,
    pub early_finish: NaiveDate,
    pub late_start: NaiveDate,
    pub late_finish: NaiveDate,
    pub total_float: i64,
    pub free_float: i64,
    pub is_critical: bool,
}

/// Activities sharing the same small total float.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearCriticalPath {
    pub total_float: i64,
    pub activities: Vec<String>,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalPathAnalysis {
    pub critical_activities: Vec<String>,
    pub total_float: BTreeMap<String, i64>,
    pub free_float: BTreeMap<String, i64>,
    pub criticality_index: BTreeMap<String, f64>,
    pub near_critical_paths: Vec<NearCriticalPath>,
    pub activity_timings: Vec<ActivityTiming>,
    pub project_start: Option<NaiveDate>,
    pub project_finish: Option<NaiveDate>,
    pub project_duration_days: i64,
}

impl CriticalPathAnalysis {
    fn empty() -> Self {
        Self {
            critical_activities: Vec::new(),
            total_float: BTreeMap::new(),
            free_float: BTreeMap::new(),
            criticality_index: BTreeMap::new(),
            near_critical_paths: Vec::new(),
            activity_timings: Vec::new(),
            project_start: None,
            project_finish: None,
            project_duration_days: 0,
        }
    }

    pub fn is_critical(&self, activity_id: &str) -> bool {
        self.critical_activities.iter().any(|id| id == activity_id)
    }

    pub fn timing(&self, activity_id: &str) -> Option<&ActivityTiming> {
        self.activity_timings
            .iter()
            .find(|t| t.activity_id == activity_id)
    }
}

/// Critical path analysis with the default configuration.
pub fn calculate_critical_path(activities: &[Activity]) -> Result<CriticalPathAnalysis> {
    calculate_critical_path_with(activities, &PlannerConfig::default())
}

pub fn calculate_critical_path_with(
    activities: &[Activity],
    config: &PlannerConfig,
) -> Result<CriticalPathAnalysis> {
    let network = ActivityNetwork::build(activities)?;
    Ok(analyze_network(&network, config))
}

/// Build the caller-facing analysis from an already validated network.
pub fn analyze_network(network: &ActivityNetwork, config: &PlannerConfig) -> CriticalPathAnalysis {
    if network.is_empty() {
        return CriticalPathAnalysis::empty();
    }

    let cpm = CpmSchedule::planned(network);
    let axis = network.axis();

    // Critical activities in schedule order.
    let mut critical: Vec<NodeIndex> = network
        .topological_order()
        .iter()
        .copied()
        .filter(|&idx| cpm.is_critical(idx))
        .collect();
    critical.sort_by_key(|idx| cpm.early_start[idx.index()]);

    let mut total_float = BTreeMap::new();
    let mut free_float = BTreeMap::new();
    let mut criticality_index = BTreeMap::new();
    let mut activity_timings = Vec::with_capacity(network.len());
    let mut by_float: BTreeMap<i64, Vec<String>> = BTreeMap::new();

    for idx in network.graph.node_indices() {
        let i = idx.index();
        let id = network.activity(idx).id.clone();
        let tf = cpm.total_float[i];

        total_float.insert(id.clone(), tf);
        free_float.insert(id.clone(), cpm.free_float[i]);
        criticality_index.insert(id.clone(), cpm.criticality_index(idx));

        if tf > 0 && tf <= config.critical_path.near_critical_threshold_days {
            by_float.entry(tf).or_default().push(id.clone());
        }

        activity_timings.push(ActivityTiming {
            activity_id: id,
            early_start: axis.date_of(cpm.early_start[i]),
            early_finish: axis.date_of(cpm.early_finish[i]),
            late_start: axis.date_of(cpm.late_start[i]),
            late_finish: axis.date_of(cpm.late_finish[i]),
            total_float: tf,
            free_float: cpm.free_float[i],
            is_critical: tf == 0,
        });
    }

    let near_critical_paths = by_float
        .into_iter()
        .map(|(tf, activities)| NearCriticalPath {
            total_float: tf,
            activities,
            severity: near_critical_severity(tf),
        })
        .collect();

    CriticalPathAnalysis {
        critical_activities: critical
            .iter()
            .map(|&idx| network.activity(idx).id.clone())
            .collect(),
        total_float,
        free_float,
        criticality_index,
        near_critical_paths,
        activity_timings,
        project_start: Some(axis.date_of(cpm.project_start)),
        project_finish: Some(axis.date_of(cpm.project_finish)),
        project_duration_days: cpm.duration_days(),
    }
}

fn near_critical_severity(total_float: i64) -> Severity {
    if total_float <= 1 {
        Severity::High
    } else if total_float <= 3 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::add_days;
    use crate::error::PlanError;
    use crate::model::{DependencyType, Predecessor};

    fn day(n: i64) -> NaiveDate {
        add_days(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(), n)
    }

    fn chain() -> Vec<Activity> {
        vec![
            Activity::new("A", "Excavate", "operator", day(0), 5),
            Activity::new("B", "Footings", "concrete", day(5), 3).after("A"),
        ]
    }

    #[test]
    fn test_two_activity_chain_is_fully_critical() {
        let analysis = calculate_critical_path(&chain()).unwrap();
        assert_eq!(analysis.critical_activities, vec!["A", "B"]);
        assert_eq!(analysis.total_float["A"], 0);
        assert_eq!(analysis.total_float["B"], 0);
        assert_eq!(analysis.project_duration_days, 8);
        // maxFloat == 0 branch
        assert_eq!(analysis.criticality_index["A"], 1.0);
        assert_eq!(analysis.criticality_index["B"], 1.0);
        assert!(analysis.near_critical_paths.is_empty());
    }

    #[test]
    fn test_parallel_activity_gets_float() {
        let mut acts = chain();
        acts.push(Activity::new("C", "Site fence", "labourer", day(0), 2));
        let analysis = calculate_critical_path(&acts).unwrap();
        assert_eq!(analysis.total_float["C"], 6);
        assert_eq!(analysis.free_float["C"], 0);
        assert!(!analysis.is_critical("C"));
        assert_eq!(analysis.criticality_index["C"], 0.0);
        let timing = analysis.timing("C").unwrap();
        assert_eq!(timing.late_start, day(6));
        assert_eq!(timing.late_finish, day(8));
    }

    #[test]
    fn test_lag_shifts_successor_and_free_float_respects_it() {
        let acts = vec![
            Activity::new("A", "A", "t", day(0), 4),
            Activity::new("B", "B", "t", day(0), 2),
            Activity::new("C", "C", "t", day(6), 3)
                .with_predecessor(Predecessor {
                    activity_id: "A".into(),
                    dependency_type: DependencyType::FinishToStart,
                    lag_days: 2,
                })
                .after("B"),
        ];
        let analysis = calculate_critical_path(&acts).unwrap();
        let c = analysis.timing("C").unwrap();
        assert_eq!(c.early_start, day(6));
        assert_eq!(analysis.total_float["B"], 4);
        assert_eq!(analysis.free_float["B"], 4);
        assert_eq!(analysis.free_float["A"], 0);
        assert_eq!(analysis.critical_activities, vec!["A", "C"]);
    }

    #[test]
    fn test_near_critical_groups_and_severity() {
        let acts = vec![
            Activity::new("long", "Long", "t", day(0), 10),
            Activity::new("f1", "F1", "t", day(0), 9),
            Activity::new("f3", "F3", "t", day(0), 7),
            Activity::new("f5", "F5", "t", day(0), 5),
            Activity::new("f8", "F8", "t", day(0), 2),
        ];
        let analysis = calculate_critical_path(&acts).unwrap();
        let groups: Vec<(i64, Severity)> = analysis
            .near_critical_paths
            .iter()
            .map(|g| (g.total_float, g.severity))
            .collect();
        assert_eq!(
            groups,
            vec![(1, Severity::High), (3, Severity::Medium), (5, Severity::Low)]
        );
    }

    #[test]
    fn test_start_to_start_link() {
        let acts = vec![
            Activity::new("wall", "Wall", "mason", day(0), 10),
            Activity::new("scaffold", "Scaffold", "scaffolder", day(2), 4).with_predecessor(
                Predecessor {
                    activity_id: "wall".into(),
                    dependency_type: DependencyType::StartToStart,
                    lag_days: 2,
                },
            ),
        ];
        let analysis = calculate_critical_path(&acts).unwrap();
        let s = analysis.timing("scaffold").unwrap();
        assert_eq!(s.early_start, day(2));
        assert_eq!(analysis.total_float["scaffold"], 4);
        assert!(analysis.is_critical("wall"));
    }

    fn linked(id: &str, start: i64, days: i64, pred: &str, dependency_type: DependencyType, lag_days: i64) -> Activity {
        Activity::new(id, id, "t", day(start), days).with_predecessor(Predecessor {
            activity_id: pred.into(),
            dependency_type,
            lag_days,
        })
    }

    #[test]
    fn test_finish_to_finish_network() {
        // B must finish 2 days after A; D may finish with A.
        let acts = vec![
            Activity::new("A", "A", "t", day(0), 4),
            linked("B", 3, 3, "A", DependencyType::FinishToFinish, 2),
            linked("D", 2, 2, "A", DependencyType::FinishToFinish, 0),
        ];
        let analysis = calculate_critical_path(&acts).unwrap();
        assert_eq!(analysis.project_duration_days, 6);
        assert_eq!(analysis.critical_activities, vec!["A", "B"]);

        let b = analysis.timing("B").unwrap();
        assert_eq!(b.early_start, day(3));
        assert_eq!(b.late_finish, day(6));
        let d = analysis.timing("D").unwrap();
        assert_eq!(d.early_start, day(2));
        assert_eq!(d.late_start, day(4));

        assert_eq!(analysis.total_float["A"], 0);
        assert_eq!(analysis.total_float["B"], 0);
        assert_eq!(analysis.total_float["D"], 2);
        assert_eq!(analysis.free_float["A"], 0);
        assert_eq!(analysis.criticality_index["A"], 1.0);
        assert_eq!(analysis.criticality_index["D"], 0.0);
    }

    #[test]
    fn test_start_to_finish_network() {
        // B and C may only finish once A has been running 3 and 7 days.
        let acts = vec![
            Activity::new("A", "A", "t", day(0), 5),
            linked("B", 1, 2, "A", DependencyType::StartToFinish, 3),
            linked("C", 5, 2, "A", DependencyType::StartToFinish, 7),
        ];
        let analysis = calculate_critical_path(&acts).unwrap();
        assert_eq!(analysis.project_duration_days, 7);
        assert_eq!(analysis.critical_activities, vec!["A", "C"]);

        let b = analysis.timing("B").unwrap();
        assert_eq!(b.early_start, day(1));
        assert_eq!(b.late_start, day(5));
        let c = analysis.timing("C").unwrap();
        assert_eq!(c.early_start, day(5));
        assert_eq!(c.late_finish, day(7));
        let a = analysis.timing("A").unwrap();
        assert_eq!(a.late_finish, day(5));

        assert_eq!(analysis.total_float["A"], 0);
        assert_eq!(analysis.total_float["B"], 4);
        assert_eq!(analysis.total_float["C"], 0);
        assert_eq!(analysis.free_float["A"], 0);
        assert_eq!(analysis.free_float["B"], 0);
        assert_eq!(analysis.criticality_index["B"], 0.0);
    }

    #[test]
    fn test_cycle_is_fatal() {
        let acts = vec![
            Activity::new("A", "A", "t", day(0), 1).after("B"),
            Activity::new("B", "B", "t", day(1), 1).after("A"),
        ];
        assert!(matches!(
            calculate_critical_path(&acts),
            Err(PlanError::CircularDependency { .. })
        ));
    }

    #[test]
    fn test_empty_input_gives_empty_analysis() {
        let analysis = calculate_critical_path(&[]).unwrap();
        assert!(analysis.critical_activities.is_empty());
        assert_eq!(analysis.project_duration_days, 0);
        assert!(analysis.project_finish.is_none());
    }

    #[test]
    fn test_serializes_wire_field_names() {
        let analysis = calculate_critical_path(&chain()).unwrap();
        let json = serde_json::to_value(&analysis).unwrap();
        assert!(json.get("criticalActivities").is_some());
        assert!(json.get("totalFloat").is_some());
        assert!(json.get("freeFloat").is_some());
        assert!(json.get("criticalityIndex").is_some());
        assert!(json.get("nearCriticalPaths").is_some());
    }
}
