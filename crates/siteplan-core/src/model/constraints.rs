use crate::calendar::WorkingCalendar;
use crate::error::ValidationError;
use crate::model::Resource;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Minimum-duration and inspection requirements for one activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityRequirement {
    pub activity_id: String,
    #[serde(default)]
    pub min_duration: i64,
    #[serde(default)]
    pub inspection_time: i64,
}

/// A contractual date an activity must finish by, give or take `flexibility_days`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedMilestone {
    pub activity_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub flexibility_days: i64,
}

/// Hard limits a candidate schedule is checked against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    /// Ceiling on project duration in days.
    pub max_project_duration: i64,
    pub max_budget: f64,
    #[serde(default)]
    pub available_workforce: Vec<Resource>,
    #[serde(default)]
    pub available_equipment: Vec<Resource>,
    #[serde(default)]
    pub working_calendar: Option<WorkingCalendar>,
    #[serde(default)]
    pub quality_requirements: Vec<QualityRequirement>,
    #[serde(default)]
    pub fixed_milestones: Vec<FixedMilestone>,
}

impl Constraints {
    pub fn new(max_project_duration: i64, max_budget: f64) -> Self {
        Self {
            max_project_duration,
            max_budget,
            available_workforce: Vec::new(),
            available_equipment: Vec::new(),
            working_calendar: None,
            quality_requirements: Vec::new(),
            fixed_milestones: Vec::new(),
        }
    }

    /// Workforce and equipment as one resource list.
    pub fn resources(&self) -> Vec<Resource> {
        self.available_workforce
            .iter()
            .chain(self.available_equipment.iter())
            .cloned()
            .collect()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_project_duration <= 0 {
            return Err(ValidationError::InvalidConstraint(format!(
                "maxProjectDuration must be positive, got {}",
                self.max_project_duration
            )));
        }
        if !(self.max_budget > 0.0) {
            return Err(ValidationError::InvalidConstraint(format!(
                "maxBudget must be positive, got {}",
                self.max_budget
            )));
        }
        let mut required: HashSet<&str> = HashSet::new();
        for q in &self.quality_requirements {
            if !required.insert(q.activity_id.as_str()) {
                return Err(ValidationError::InvalidConstraint(format!(
                    "more than one quality requirement for '{}'",
                    q.activity_id
                )));
            }
            if q.min_duration < 0 || q.inspection_time < 0 {
                return Err(ValidationError::InvalidConstraint(format!(
                    "quality requirement for '{}' has negative days",
                    q.activity_id
                )));
            }
        }
        for m in &self.fixed_milestones {
            if m.flexibility_days < 0 {
                return Err(ValidationError::InvalidConstraint(format!(
                    "milestone for '{}' has negative flexibility",
                    m.activity_id
                )));
            }
        }
        Ok(())
    }
}

/// Relative importance of the four optimization goals, each 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Objective {
    pub minimize_time: f64,
    pub minimize_cost: f64,
    pub maximize_quality: f64,
    pub balance_resources: f64,
}

/// Objective weights scaled to sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedObjective {
    pub time: f64,
    pub cost: f64,
    pub quality: f64,
    pub resources: f64,
}

impl Objective {
    pub fn new(minimize_time: f64, minimize_cost: f64, maximize_quality: f64, balance_resources: f64) -> Self {
        Self {
            minimize_time,
            minimize_cost,
            maximize_quality,
            balance_resources,
        }
    }

    /// Equal emphasis on every goal.
    pub fn balanced() -> Self {
        Self::new(25.0, 25.0, 25.0, 25.0)
    }

    /// Divide each weight by the sum. A zero sum is rejected, never defaulted.
    pub fn normalize(&self) -> Result<NormalizedObjective, ValidationError> {
        let weights = [
            ("minimizeTime", self.minimize_time),
            ("minimizeCost", self.minimize_cost),
            ("maximizeQuality", self.maximize_quality),
            ("balanceResources", self.balance_resources),
        ];
        for (name, value) in weights {
            if !(0.0..=100.0).contains(&value) {
                return Err(ValidationError::WeightOutOfRange { name, value });
            }
        }

        let sum: f64 = weights.iter().map(|(_, w)| w).sum();
        if sum == 0.0 {
            return Err(ValidationError::ZeroObjectiveWeights);
        }

        Ok(NormalizedObjective {
            time: self.minimize_time / sum,
            cost: self.minimize_cost / sum,
            quality: self.maximize_quality / sum,
            resources: self.balance_resources / sum,
        })
    }
}
