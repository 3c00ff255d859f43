//! What-if simulation of activity changes.
//!
//! Scenarios adjust durations, costs, start dates and trade capacity, then
//! re-run a simplified forward pass:
//! - each activity starts at the later of its own (shifted) start and what its
//!   predecessor links require
//! - no backward pass, so floats and the critical path are not recomputed
//!
//! Results are compared against the same pass over the unchanged plan.

use crate::calendar::Day;
use crate::config::PlannerConfig;
use crate::error::Result;
use crate::log_changes;
use crate::model::{Activity, Resource};
use crate::network::{ActivityNetwork, LinkOverrides, ReleaseRule};
use crate::resources::ResourceProfiler;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Adjustments to one activity. Every delta defaults to zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityChange {
    pub activity_id: String,
    pub duration_delta_days: i64,
    pub cost_delta: f64,
    /// Units of the activity's primary trade added (or removed) for the whole project.
    pub resource_delta: i64,
    pub start_delta_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatIfScenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub changes: Vec<ActivityChange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioMetrics {
    pub duration_days: i64,
    pub finish_date: NaiveDate,
    pub total_cost: f64,
    pub quality_score: f64,
    pub resource_utilization: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub baseline: ScenarioMetrics,
    pub projected: ScenarioMetrics,
    pub duration_delta: i64,
    pub cost_delta: f64,
    pub quality_delta: f64,
    pub resource_utilization_delta: f64,
    pub changes_applied: Vec<String>,
    pub warnings: Vec<String>,
    pub notes: Vec<String>,
}

/// Largest duration or start shift one change may make.
const MAX_CHANGE_DAYS: i64 = 36_500;
/// Largest number of trade units one change may add or remove.
const MAX_RESOURCE_DELTA: i64 = 1_000;

const SIMPLIFIED_PASS_NOTE: &str =
    "Simplified forward pass: floats and the critical path were not recomputed for this scenario";

/// Run every scenario without capacity data; resource utilization falls back
/// to demand balance.
pub fn analyze_what_if_scenarios(activities: &[Activity], scenarios: &[WhatIfScenario]) -> Result<Vec<ScenarioResult>> {
    let simulator = WhatIfSimulator::new(activities)?;
    Ok(scenarios.iter().map(|s| simulator.simulate(s)).collect())
}

pub struct WhatIfSimulator {
    network: ActivityNetwork,
    resources: Vec<Resource>,
    config: PlannerConfig,
}

struct Working {
    release: Vec<Day>,
    durations: Vec<i64>,
    costs: Vec<f64>,
    resources: Vec<Resource>,
    shortened: usize,
}

impl WhatIfSimulator {
    pub fn new(activities: &[Activity]) -> Result<Self> {
        Ok(Self {
            network: ActivityNetwork::build(activities)?,
            resources: Vec::new(),
            config: PlannerConfig::default(),
        })
    }

    pub fn with_resources(mut self, resources: &[Resource]) -> Self {
        self.resources = resources.to_vec();
        self
    }

    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn simulate(&self, scenario: &WhatIfScenario) -> ScenarioResult {
        let mut working = Working {
            release: self.network.planned_starts(),
            durations: self.network.planned_durations(),
            costs: self.network.planned_costs(),
            resources: self.resources.clone(),
            shortened: 0,
        };
        let baseline = self.measure(&working);

        let mut applied = Vec::new();
        let mut warnings = Vec::new();
        for change in &scenario.changes {
            match self.apply(&mut working, change) {
                Ok(mut descriptions) => applied.append(&mut descriptions),
                Err(e) => warnings.push(format!("Skipped: {}", e)),
            }
        }
        let projected = self.measure(&working);
        log_changes!(
            self.config.verbosity,
            "scenario '{}': {}d -> {}d",
            scenario.name,
            baseline.duration_days,
            projected.duration_days
        );

        ScenarioResult {
            scenario_name: scenario.name.clone(),
            duration_delta: projected.duration_days - baseline.duration_days,
            cost_delta: projected.total_cost - baseline.total_cost,
            quality_delta: projected.quality_score - baseline.quality_score,
            resource_utilization_delta: projected.resource_utilization - baseline.resource_utilization,
            baseline,
            projected,
            changes_applied: applied,
            warnings,
            notes: vec![SIMPLIFIED_PASS_NOTE.to_string()],
        }
    }

    /// Check every field of `change` against `working`, then apply it.
    ///
    /// A rejected change leaves `working` untouched.
    fn apply(&self, working: &mut Working, change: &ActivityChange) -> anyhow::Result<Vec<String>> {
        let idx = self
            .network
            .index_of(&change.activity_id)
            .ok_or_else(|| anyhow::anyhow!("activity '{}' not found", change.activity_id))?;
        let i = idx.index();
        let activity = self.network.activity(idx);
        let trade = activity.primary_trade.as_str();

        for (field, delta) in [
            ("duration", change.duration_delta_days),
            ("start", change.start_delta_days),
        ] {
            if delta.unsigned_abs() > MAX_CHANGE_DAYS.unsigned_abs() {
                anyhow::bail!(
                    "'{}' {} change of {} day(s) exceeds the {}-day limit",
                    activity.id,
                    field,
                    delta,
                    MAX_CHANGE_DAYS
                );
            }
        }
        if change.resource_delta.unsigned_abs() > MAX_RESOURCE_DELTA.unsigned_abs() {
            anyhow::bail!(
                "{} capacity change of {} exceeds the {}-unit limit",
                trade,
                change.resource_delta,
                MAX_RESOURCE_DELTA
            );
        }
        if !change.cost_delta.is_finite() {
            anyhow::bail!("'{}' cost change must be a finite number", activity.id);
        }

        let duration = working.durations[i] + change.duration_delta_days;
        if duration < 1 {
            anyhow::bail!(
                "'{}' cannot shrink by {} day(s); it would have no duration left",
                activity.id,
                -change.duration_delta_days
            );
        }
        let present = working.resources.iter().filter(|r| r.resource_type() == trade).count() as i64;
        if present < -change.resource_delta {
            anyhow::bail!(
                "cannot remove {} {} unit(s); only {} available",
                -change.resource_delta,
                trade,
                present
            );
        }

        let mut applied = Vec::new();
        if change.duration_delta_days != 0 {
            if duration < working.durations[i] {
                working.shortened += 1;
            }
            working.durations[i] = duration;
            applied.push(format!("'{}' duration {:+}d", activity.id, change.duration_delta_days));
        }
        if change.cost_delta != 0.0 {
            working.costs[i] = (working.costs[i] + change.cost_delta).max(0.0);
            applied.push(format!("'{}' cost {:+.0}", activity.id, change.cost_delta));
        }
        if change.start_delta_days != 0 {
            working.release[i] += change.start_delta_days;
            applied.push(format!("'{}' start {:+}d", activity.id, change.start_delta_days));
        }
        if change.resource_delta > 0 {
            for n in 0..change.resource_delta {
                working
                    .resources
                    .push(Resource::workforce(format!("{}-whatif-{}", trade, n + 1), trade));
            }
        } else {
            for _ in 0..-change.resource_delta {
                if let Some(pos) = working.resources.iter().rposition(|r| r.resource_type() == trade) {
                    working.resources.remove(pos);
                }
            }
        }
        if change.resource_delta != 0 {
            applied.push(format!("{} capacity {:+}", trade, change.resource_delta));
        }

        Ok(applied)
    }

    fn measure(&self, working: &Working) -> ScenarioMetrics {
        let starts = self.network.forward_pass(
            &working.durations,
            &working.release,
            ReleaseRule::Always,
            &LinkOverrides::new(),
        );
        let project_start = starts.iter().copied().min().unwrap_or(0).min(0);
        let finish = starts
            .iter()
            .zip(&working.durations)
            .map(|(s, d)| s + d)
            .max()
            .unwrap_or(0);

        let quality = &self.config.quality;
        let quality_score = (quality.base_score + quality.requirement_bonus
            - quality.crash_penalty * working.shortened as f64)
            .clamp(0.0, 100.0);

        let profile = ResourceProfiler::new(&self.network, &working.resources)
            .profile(&starts, &working.durations);

        ScenarioMetrics {
            duration_days: finish - project_start,
            finish_date: self.network.axis().date_of(finish),
            total_cost: working.costs.iter().sum(),
            quality_score,
            resource_utilization: profile.resource_score(),
        }
    }
}

/// Parse a change written as `<field> <activity> <delta>`.
///
/// Fields: `duration`, `cost`, `start`, `resource`. Example: `duration frame +3`.
pub fn parse_change(input: &str) -> anyhow::Result<ActivityChange> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    if parts.len() != 3 {
        anyhow::bail!("Expected format: <duration|cost|start|resource> <activity> <delta>");
    }
    let (field, activity_id, delta) = (parts[0], parts[1], parts[2]);
    let mut change = ActivityChange {
        activity_id: activity_id.to_string(),
        ..ActivityChange::default()
    };
    let whole = || {
        delta
            .parse::<i64>()
            .map_err(|_| anyhow::anyhow!("Invalid whole-day delta '{}'", delta))
    };
    match field {
        "duration" => change.duration_delta_days = whole()?,
        "start" => change.start_delta_days = whole()?,
        "resource" => change.resource_delta = whole()?,
        "cost" => {
            change.cost_delta = delta
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid cost delta '{}'", delta))?
        }
        _ => anyhow::bail!(
            "Unknown change '{}'. Available: duration, cost, start, resource",
            field
        ),
    }
    Ok(change)
}
