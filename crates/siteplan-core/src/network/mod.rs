//! The activity network: an indexed arena of activities with precedence links.
//!
//! The network is built once per request and never mutated. Schedules refer to
//! activities by arena index and carry their own start/duration vectors.

pub mod export;

use crate::calendar::{Day, DayAxis};
use crate::error::{PlanError, Result};
use crate::model::{validate_activities, Activity, DependencyType, Predecessor};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeMap, HashMap};

/// A precedence link, stored on the edge predecessor -> successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub dependency_type: DependencyType,
    pub lag_days: i64,
}

impl From<&Predecessor> for Link {
    fn from(p: &Predecessor) -> Self {
        Self {
            dependency_type: p.dependency_type,
            lag_days: p.lag_days,
        }
    }
}

impl Link {
    /// Earliest successor start this link permits.
    pub fn earliest_start(&self, pred_start: Day, pred_duration: i64, succ_duration: i64) -> Day {
        let lag = self.lag_days;
        match self.dependency_type {
            DependencyType::FinishToStart => pred_start + pred_duration + lag,
            DependencyType::StartToStart => pred_start + lag,
            DependencyType::FinishToFinish => pred_start + pred_duration + lag - succ_duration,
            DependencyType::StartToFinish => pred_start + lag - succ_duration,
        }
    }

    /// Latest predecessor finish this link permits.
    pub fn latest_finish(&self, succ_start: Day, succ_duration: i64, pred_duration: i64) -> Day {
        let lag = self.lag_days;
        match self.dependency_type {
            DependencyType::FinishToStart => succ_start - lag,
            DependencyType::StartToStart => succ_start - lag + pred_duration,
            DependencyType::FinishToFinish => succ_start + succ_duration - lag,
            DependencyType::StartToFinish => succ_start + succ_duration - lag + pred_duration,
        }
    }
}

/// Replacement links for individual edges (used by fast-tracked schedules).
pub type LinkOverrides = BTreeMap<EdgeIndex, Link>;

/// How the forward pass treats an activity's own start date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseRule {
    /// Only activities without predecessors start at their release day.
    RootsOnly,
    /// Every activity starts no earlier than its release day.
    Always,
}

#[derive(Debug, Clone)]
pub struct ActivityNetwork {
    pub graph: DiGraph<Activity, Link>,
    pub node_map: HashMap<String, NodeIndex>,
    axis: DayAxis,
    order: Vec<NodeIndex>,
}

impl ActivityNetwork {
    /// Validate the activities, build the arena and sort it topologically.
    ///
    /// A predecessor cycle fails with [`PlanError::CircularDependency`].
    pub fn build(activities: &[Activity]) -> Result<Self> {
        validate_activities(activities)?;

        let mut graph = DiGraph::with_capacity(activities.len(), activities.len());
        let mut node_map = HashMap::with_capacity(activities.len());
        for activity in activities {
            let idx = graph.add_node(activity.clone());
            node_map.insert(activity.id.clone(), idx);
        }

        for activity in activities {
            let to = node_map[&activity.id];
            for pred in &activity.predecessors {
                if pred.activity_id == activity.id {
                    return Err(PlanError::CircularDependency {
                        activity_id: activity.id.clone(),
                    });
                }
                let from = node_map[&pred.activity_id];
                graph.add_edge(from, to, Link::from(pred));
            }
        }

        let order = petgraph::algo::toposort(&graph, None).map_err(|cycle| {
            PlanError::CircularDependency {
                activity_id: graph[cycle.node_id()].id.clone(),
            }
        })?;

        let origin = activities
            .iter()
            .map(|a| a.planned_start_date)
            .min()
            .unwrap_or_default();

        Ok(Self {
            graph,
            node_map,
            axis: DayAxis::new(origin),
            order,
        })
    }

    pub fn axis(&self) -> DayAxis {
        self.axis
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn activity(&self, idx: NodeIndex) -> &Activity {
        &self.graph[idx]
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.node_map.get(id).copied()
    }

    /// Activities in input order.
    pub fn activities(&self) -> impl Iterator<Item = &Activity> {
        self.graph.node_weights()
    }

    pub fn topological_order(&self) -> &[NodeIndex] {
        &self.order
    }

    /// Incoming links as (predecessor, edge, link).
    pub fn predecessors(&self, idx: NodeIndex) -> impl Iterator<Item = (NodeIndex, EdgeIndex, &Link)> {
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (e.source(), e.id(), e.weight()))
    }

    /// Outgoing links as (successor, edge, link).
    pub fn successors(&self, idx: NodeIndex) -> impl Iterator<Item = (NodeIndex, EdgeIndex, &Link)> {
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.target(), e.id(), e.weight()))
    }

    /// Planned start of every activity as a day number.
    pub fn planned_starts(&self) -> Vec<Day> {
        self.graph
            .node_weights()
            .map(|a| self.axis.day_of(a.planned_start_date))
            .collect()
    }

    pub fn planned_durations(&self) -> Vec<i64> {
        self.graph
            .node_weights()
            .map(|a| a.planned_duration_days)
            .collect()
    }

    pub fn planned_costs(&self) -> Vec<f64> {
        self.graph
            .node_weights()
            .map(|a| a.planned_total_cost)
            .collect()
    }

    fn link(&self, edge: EdgeIndex, link: &Link, overrides: &LinkOverrides) -> Link {
        overrides.get(&edge).copied().unwrap_or(*link)
    }

    /// Earliest starts given durations and release days, in topological order.
    pub fn forward_pass(
        &self,
        durations: &[i64],
        release: &[Day],
        rule: ReleaseRule,
        overrides: &LinkOverrides,
    ) -> Vec<Day> {
        let mut start = release.to_vec();
        for &node in &self.order {
            let i = node.index();
            let bound = self
                .predecessors(node)
                .map(|(pred, edge, link)| {
                    self.link(edge, link, overrides).earliest_start(
                        start[pred.index()],
                        durations[pred.index()],
                        durations[i],
                    )
                })
                .max();
            start[i] = match (bound, rule) {
                (None, _) => release[i],
                (Some(b), ReleaseRule::RootsOnly) => b,
                (Some(b), ReleaseRule::Always) => b.max(release[i]),
            };
        }
        start
    }

    /// Latest finishes given early finishes and the project finish seed.
    pub fn backward_pass(
        &self,
        durations: &[i64],
        project_finish: Day,
        overrides: &LinkOverrides,
    ) -> Vec<Day> {
        let mut late_finish = vec![project_finish; self.len()];
        for &node in self.order.iter().rev() {
            let i = node.index();
            let bound = self
                .successors(node)
                .map(|(succ, edge, link)| {
                    let succ_late_start = late_finish[succ.index()] - durations[succ.index()];
                    self.link(edge, link, overrides).latest_finish(
                        succ_late_start,
                        durations[succ.index()],
                        durations[i],
                    )
                })
                .min();
            late_finish[i] = bound.map_or(project_finish, |b| b.min(project_finish));
        }
        late_finish
    }

    /// Free float per activity: the smallest slack on any outgoing link, within `[0, total_float]`.
    ///
    /// Activities without successors have no free float.
    pub fn free_floats(
        &self,
        starts: &[Day],
        durations: &[i64],
        total_float: &[i64],
        overrides: &LinkOverrides,
    ) -> Vec<i64> {
        (0..self.len())
            .map(|i| {
                let node = NodeIndex::new(i);
                let slack = self
                    .successors(node)
                    .map(|(succ, edge, link)| {
                        let s = succ.index();
                        starts[s]
                            - self
                                .link(edge, link, overrides)
                                .earliest_start(starts[i], durations[i], durations[s])
                    })
                    .min();
                slack.map_or(0, |slack| slack.clamp(0, total_float[i]))
            })
            .collect()
    }

    /// Copies of the activities placed at the given starts, with floats measured
    /// against the placement's own finish.
    pub fn materialize(
        &self,
        starts: &[Day],
        durations: &[i64],
        costs: &[f64],
        overrides: &LinkOverrides,
    ) -> Vec<Activity> {
        let finish = starts
            .iter()
            .zip(durations)
            .map(|(s, d)| s + d)
            .max()
            .unwrap_or(0);
        let late_finish = self.backward_pass(durations, finish, overrides);
        let total_float: Vec<i64> = (0..self.len())
            .map(|i| (late_finish[i] - durations[i] - starts[i]).max(0))
            .collect();
        let free_float = self.free_floats(starts, durations, &total_float, overrides);

        self.graph
            .node_indices()
            .map(|idx| {
                let i = idx.index();
                let mut activity = self.graph[idx].clone();
                activity.planned_start_date = self.axis.date_of(starts[i]);
                activity.planned_end_date = self.axis.date_of(starts[i] + durations[i]);
                activity.planned_duration_days = durations[i];
                activity.planned_total_cost = costs[i];
                activity.total_float = Some(total_float[i]);
                activity.free_float = Some(free_float[i]);
                activity.is_critical_path = total_float[i] == 0;
                activity
            })
            .collect()
    }

    /// Push successors later until every link holds, starting from `from`.
    ///
    /// Returns the arena indices that moved.
    pub fn repair_forward(
        &self,
        starts: &mut [Day],
        durations: &[i64],
        from: NodeIndex,
        overrides: &LinkOverrides,
    ) -> Vec<NodeIndex> {
        let mut moved = Vec::new();
        let Some(pos) = self.order.iter().position(|&n| n == from) else {
            return moved;
        };
        for &node in &self.order[pos + 1..] {
            let i = node.index();
            let required = self
                .predecessors(node)
                .map(|(pred, edge, link)| {
                    self.link(edge, link, overrides).earliest_start(
                        starts[pred.index()],
                        durations[pred.index()],
                        durations[i],
                    )
                })
                .max();
            if let Some(required) = required {
                if required > starts[i] {
                    starts[i] = required;
                    moved.push(node);
                }
            }
        }
        moved
    }
}
