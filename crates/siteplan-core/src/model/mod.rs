//! Input data model: activities, resources, constraints and objectives.

pub mod constraints;
pub mod resource;

pub use constraints::{Constraints, FixedMilestone, Objective, NormalizedObjective, QualityRequirement};
pub use resource::{Equipment, Resource, ResourceAssignment, Workforce};

use crate::calendar::{add_days, checked_add_days};
use crate::error::ValidationError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Precedence relationship between two activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DependencyType {
    /// Successor starts after the predecessor finishes.
    #[serde(rename = "FS", alias = "FINISH_TO_START")]
    FinishToStart,
    /// Successor starts after the predecessor starts.
    #[serde(rename = "SS", alias = "START_TO_START")]
    StartToStart,
    /// Successor finishes after the predecessor finishes.
    #[serde(rename = "FF", alias = "FINISH_TO_FINISH")]
    FinishToFinish,
    /// Successor finishes after the predecessor starts.
    #[serde(rename = "SF", alias = "START_TO_FINISH")]
    StartToFinish,
}

impl DependencyType {
    pub fn code(&self) -> &'static str {
        match self {
            DependencyType::FinishToStart => "FS",
            DependencyType::StartToStart => "SS",
            DependencyType::FinishToFinish => "FF",
            DependencyType::StartToFinish => "SF",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// A link to a predecessor activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Predecessor {
    pub activity_id: String,
    #[serde(default = "default_dependency_type")]
    pub dependency_type: DependencyType,
    #[serde(default)]
    pub lag_days: i64,
}

fn default_dependency_type() -> DependencyType {
    DependencyType::FinishToStart
}

impl Predecessor {
    pub fn finish_to_start(activity_id: impl Into<String>) -> Self {
        Self {
            activity_id: activity_id.into(),
            dependency_type: DependencyType::FinishToStart,
            lag_days: 0,
        }
    }
}

/// A schedule activity as supplied by the project repository.
///
/// `total_float`, `free_float` and `is_critical_path` are outputs; they are
/// ignored on input and filled in on leveled schedules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub name: String,
    pub primary_trade: String,
    pub planned_start_date: NaiveDate,
    pub planned_end_date: NaiveDate,
    pub planned_duration_days: i64,
    #[serde(default)]
    pub planned_total_cost: f64,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub predecessors: Vec<Predecessor>,
    /// Equipment types the activity occupies for its whole duration.
    #[serde(default)]
    pub required_equipment: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_float: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_float: Option<i64>,
    #[serde(default)]
    pub is_critical_path: bool,
}

impl Activity {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        primary_trade: impl Into<String>,
        start: NaiveDate,
        duration_days: i64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            primary_trade: primary_trade.into(),
            planned_start_date: start,
            planned_end_date: add_days(start, duration_days),
            planned_duration_days: duration_days,
            planned_total_cost: 0.0,
            priority: Priority::default(),
            predecessors: Vec::new(),
            required_equipment: Vec::new(),
            total_float: None,
            free_float: None,
            is_critical_path: false,
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.planned_total_cost = cost;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn after(mut self, predecessor_id: impl Into<String>) -> Self {
        self.predecessors.push(Predecessor::finish_to_start(predecessor_id));
        self
    }

    pub fn with_predecessor(mut self, predecessor: Predecessor) -> Self {
        self.predecessors.push(predecessor);
        self
    }

    pub fn with_equipment(mut self, equipment_type: impl Into<String>) -> Self {
        self.required_equipment.push(equipment_type.into());
        self
    }

    /// Cost per planned day, 0 for a zero-length activity.
    pub fn daily_cost(&self) -> f64 {
        if self.planned_duration_days > 0 {
            self.planned_total_cost / self.planned_duration_days as f64
        } else {
            0.0
        }
    }
}

/// Reject malformed activity lists before any computation.
pub fn validate_activities(activities: &[Activity]) -> Result<(), ValidationError> {
    let mut ids: HashSet<&str> = HashSet::new();
    for activity in activities {
        if !ids.insert(activity.id.as_str()) {
            return Err(ValidationError::DuplicateActivity(activity.id.clone()));
        }
    }

    for activity in activities {
        if activity.planned_duration_days <= 0 {
            return Err(ValidationError::NonPositiveDuration {
                activity_id: activity.id.clone(),
                days: activity.planned_duration_days,
            });
        }
        if activity.planned_start_date >= activity.planned_end_date {
            return Err(ValidationError::InvalidDateRange {
                activity_id: activity.id.clone(),
                start: activity.planned_start_date,
                end: activity.planned_end_date,
            });
        }
        let Some(end) = checked_add_days(activity.planned_start_date, activity.planned_duration_days) else {
            return Err(ValidationError::DurationOutOfRange {
                activity_id: activity.id.clone(),
                days: activity.planned_duration_days,
            });
        };
        if end != activity.planned_end_date {
            return Err(ValidationError::DurationMismatch {
                activity_id: activity.id.clone(),
                end: activity.planned_end_date,
                days: activity.planned_duration_days,
            });
        }
        if !(activity.planned_total_cost >= 0.0) {
            return Err(ValidationError::NegativeCost {
                activity_id: activity.id.clone(),
                cost: activity.planned_total_cost,
            });
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for pred in &activity.predecessors {
            if !ids.contains(pred.activity_id.as_str()) {
                return Err(ValidationError::UnknownPredecessor {
                    activity_id: activity.id.clone(),
                    predecessor_id: pred.activity_id.clone(),
                });
            }
            if !seen.insert(pred.activity_id.as_str()) {
                return Err(ValidationError::DuplicatePredecessor {
                    activity_id: activity.id.clone(),
                    predecessor_id: pred.activity_id.clone(),
                });
            }
        }
    }

    Ok(())
}
