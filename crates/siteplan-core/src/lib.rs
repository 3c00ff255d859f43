pub mod analyzer;
pub mod calendar;
pub mod config;
pub mod error;
pub mod input;
pub mod logging;
pub mod model;
pub mod network;
pub mod optimizer;
pub mod resources;
pub mod risk;
pub mod whatif;

pub use analyzer::critical_path::{calculate_critical_path, CriticalPathAnalysis};
pub use analyzer::report::{RiskLevel, Severity};
pub use config::PlannerConfig;
pub use error::{PlanError, Result, ValidationError};
pub use model::{validate_activities, Activity, Constraints, DependencyType, Objective, Predecessor, Priority, Resource};
pub use network::ActivityNetwork;
pub use optimizer::actions::OptimizationAction;
pub use optimizer::crashing::analyze_schedule_crashing;
pub use optimizer::fast_track::analyze_fast_tracking_opportunities;
pub use optimizer::{optimize_schedule, FrozenClock, OptimizationResult, ScheduleOptimizer};
pub use resources::{level_resources, ResourceLevelingResult};
pub use whatif::{analyze_what_if_scenarios, ScenarioResult, WhatIfScenario};
