//! Per-day demand, availability and utilization by resource type.

use crate::calendar::{Day, DayAxis, WorkingCalendar};
use crate::log_changes;
use crate::model::{Activity, Resource, ResourceAssignment};
use crate::network::ActivityNetwork;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Demand against capacity for one resource type on one day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUsage {
    pub required: i64,
    pub available: i64,
    /// `required / available * 100`, above 100 when overallocated.
    pub utilization: f64,
    pub overallocation: i64,
}

impl ResourceUsage {
    pub fn new(required: i64, available: i64) -> Self {
        let utilization = if available > 0 {
            required as f64 / available as f64 * 100.0
        } else if required > 0 {
            // No capacity at all: saturated, the excess shows as overallocation.
            100.0
        } else {
            0.0
        };
        Self {
            required,
            available,
            utilization,
            overallocation: (required - available).max(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceProfileDay {
    pub date: NaiveDate,
    pub working: bool,
    pub per_resource_type: BTreeMap<String, ResourceUsage>,
}

/// A dated overallocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandPeak {
    pub date: NaiveDate,
    pub resource_type: String,
    pub overallocation: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceProfile {
    pub days: Vec<ResourceProfileDay>,
    pub warnings: Vec<String>,
}

impl ResourceProfile {
    pub fn day(&self, date: NaiveDate) -> Option<&ResourceProfileDay> {
        self.days.iter().find(|d| d.date == date)
    }

    pub fn usage(&self, date: NaiveDate, resource_type: &str) -> Option<&ResourceUsage> {
        self.day(date).and_then(|d| d.per_resource_type.get(resource_type))
    }

    /// Every (day, type) cell with overallocation, in date order.
    pub fn peaks(&self) -> Vec<DemandPeak> {
        self.days
            .iter()
            .flat_map(|day| {
                day.per_resource_type
                    .iter()
                    .filter(|(_, u)| u.overallocation > 0)
                    .map(|(t, u)| DemandPeak {
                        date: day.date,
                        resource_type: t.clone(),
                        overallocation: u.overallocation,
                    })
            })
            .collect()
    }

    pub fn overallocated_cells(&self) -> usize {
        self.days
            .iter()
            .flat_map(|d| d.per_resource_type.values())
            .filter(|u| u.overallocation > 0)
            .count()
    }

    pub fn total_overallocation(&self) -> i64 {
        self.days
            .iter()
            .flat_map(|d| d.per_resource_type.values())
            .map(|u| u.overallocation)
            .sum()
    }

    /// Highest single-type daily demand.
    pub fn peak_required(&self) -> i64 {
        self.days
            .iter()
            .flat_map(|d| d.per_resource_type.values())
            .map(|u| u.required)
            .max()
            .unwrap_or(0)
    }

    fn daily_totals(&self) -> Vec<f64> {
        self.days
            .iter()
            .map(|d| d.per_resource_type.values().map(|u| u.required).sum::<i64>() as f64)
            .collect()
    }

    /// Variance of total daily demand; lower is smoother.
    pub fn demand_variance(&self) -> f64 {
        let totals = self.daily_totals();
        if totals.is_empty() {
            return 0.0;
        }
        let mean = totals.iter().sum::<f64>() / totals.len() as f64;
        totals.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / totals.len() as f64
    }

    /// Mean of per-day utilization clamped to 100, over cells that have capacity.
    ///
    /// `None` when no capacity data exists at all.
    pub fn utilization_score(&self) -> Option<f64> {
        let cells: Vec<f64> = self
            .days
            .iter()
            .flat_map(|d| d.per_resource_type.values())
            .filter(|u| u.available > 0)
            .map(|u| u.utilization.min(100.0))
            .collect();
        if cells.is_empty() {
            None
        } else {
            Some(cells.iter().sum::<f64>() / cells.len() as f64)
        }
    }

    /// Mean over peak of total daily demand, 0-100; 100 is perfectly flat.
    pub fn demand_balance(&self) -> f64 {
        let totals = self.daily_totals();
        let peak = totals.iter().copied().fold(0.0f64, f64::max);
        if peak == 0.0 {
            return 0.0;
        }
        let mean = totals.iter().sum::<f64>() / totals.len() as f64;
        mean / peak * 100.0
    }

    /// Capacity-based utilization when available, demand balance otherwise.
    pub fn resource_score(&self) -> f64 {
        self.utilization_score().unwrap_or_else(|| self.demand_balance())
    }
}

/// Resource types an activity occupies: its trade plus any equipment.
pub fn demand_types(activity: &Activity) -> impl Iterator<Item = &str> {
    std::iter::once(activity.primary_trade.as_str())
        .chain(activity.required_equipment.iter().map(String::as_str))
}

/// Projects demand of a placed schedule against resource availability.
pub struct ResourceProfiler<'a> {
    network: &'a ActivityNetwork,
    by_type: BTreeMap<&'a str, Vec<&'a Resource>>,
    calendar: Option<&'a WorkingCalendar>,
    verbosity: u8,
}

impl<'a> ResourceProfiler<'a> {
    pub fn new(network: &'a ActivityNetwork, resources: &'a [Resource]) -> Self {
        let mut by_type: BTreeMap<&str, Vec<&Resource>> = BTreeMap::new();
        for r in resources {
            by_type.entry(r.resource_type()).or_default().push(r);
        }
        Self {
            network,
            by_type,
            calendar: None,
            verbosity: 0,
        }
    }

    pub fn with_calendar(mut self, calendar: Option<&'a WorkingCalendar>) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn axis(&self) -> DayAxis {
        self.network.axis()
    }

    /// Units of `resource_type` available on `day`. Unknown types have none.
    pub fn available(&self, resource_type: &str, day: Day) -> i64 {
        let date = self.network.axis().date_of(day);
        self.by_type
            .get(resource_type)
            .map(|rs| {
                rs.iter()
                    .filter(|r| r.is_available_on(date))
                    .map(|r| r.capacity_units())
                    .sum()
            })
            .unwrap_or(0)
    }

    /// Whether any resource of this type exists at all.
    pub fn knows_type(&self, resource_type: &str) -> bool {
        self.by_type.contains_key(resource_type)
    }

    pub fn is_working_day(&self, day: Day) -> bool {
        self.calendar
            .map_or(true, |c| c.is_working_day(self.network.axis().date_of(day)))
    }

    /// Daily profile from the earliest start to the latest finish.
    pub fn profile(&self, starts: &[Day], durations: &[i64]) -> ResourceProfile {
        let Some(horizon_start) = starts.iter().copied().min() else {
            return ResourceProfile::default();
        };
        let horizon_end = starts
            .iter()
            .zip(durations)
            .map(|(s, d)| s + d)
            .max()
            .unwrap_or(horizon_start);
        let span = (horizon_end - horizon_start).max(0) as usize;

        let mut demand: BTreeMap<&str, Vec<i64>> = BTreeMap::new();
        for t in self.by_type.keys() {
            demand.insert(*t, vec![0; span]);
        }
        for idx in self.network.graph.node_indices() {
            let activity = self.network.activity(idx);
            let i = idx.index();
            for t in demand_types(activity) {
                let row = demand.entry(t).or_insert_with(|| vec![0; span]);
                for day in starts[i]..starts[i] + durations[i] {
                    row[(day - horizon_start) as usize] += 1;
                }
            }
        }

        let mut warnings = Vec::new();
        let missing: BTreeSet<&str> = demand
            .iter()
            .filter(|(t, row)| !self.knows_type(t) && row.iter().any(|&r| r > 0))
            .map(|(t, _)| *t)
            .collect();
        for t in &missing {
            let msg = format!(
                "No availability data for resource type '{}'; treated as zero capacity",
                t
            );
            log_changes!(self.verbosity, "{}", msg);
            warnings.push(msg);
        }

        let axis = self.network.axis();
        let days = (0..span)
            .map(|offset| {
                let day = horizon_start + offset as Day;
                let per_resource_type = demand
                    .iter()
                    .map(|(t, row)| {
                        (t.to_string(), ResourceUsage::new(row[offset], self.available(t, day)))
                    })
                    .collect();
                ResourceProfileDay {
                    date: axis.date_of(day),
                    working: self.is_working_day(day),
                    per_resource_type,
                }
            })
            .collect();

        ResourceProfile { days, warnings }
    }

    /// One assignment per activity to the first resource of its trade available at its start.
    ///
    /// The allocation is the trade's peak utilization across the activity's window.
    pub fn assignments(&self, starts: &[Day], durations: &[i64], profile: &ResourceProfile) -> Vec<ResourceAssignment> {
        let axis = self.network.axis();
        let mut out = Vec::new();
        for idx in self.network.graph.node_indices() {
            let i = idx.index();
            let activity = self.network.activity(idx);
            let start_date = axis.date_of(starts[i]);
            let Some(resource) = self
                .by_type
                .get(activity.primary_trade.as_str())
                .and_then(|rs| rs.iter().find(|r| r.is_available_on(start_date)))
            else {
                continue;
            };
            let allocation = (starts[i]..starts[i] + durations[i])
                .filter_map(|d| profile.usage(axis.date_of(d), &activity.primary_trade))
                .map(|u| u.utilization)
                .fold(0.0f64, f64::max);
            out.push(ResourceAssignment {
                activity_id: activity.id.clone(),
                resource_id: resource.id().to_string(),
                allocation_percentage: allocation,
                planned_cost: resource.daily_cost() * durations[i] as f64,
            });
        }
        out
    }
}
