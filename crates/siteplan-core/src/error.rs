use thiserror::Error;

/// Errors raised by the scheduling engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// The predecessor graph contains a cycle. Fatal: the network cannot be scheduled.
    #[error("circular dependency detected involving activity '{activity_id}'")]
    CircularDependency { activity_id: String },

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Input problems detected before any computation starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("no activities supplied")]
    NoActivities,

    #[error("objective weights sum to zero; at least one weight must be positive")]
    ZeroObjectiveWeights,

    #[error("objective weight '{name}' is {value}, expected 0-100")]
    WeightOutOfRange { name: &'static str, value: f64 },

    #[error("activity '{activity_id}' has non-positive duration ({days} days)")]
    NonPositiveDuration { activity_id: String, days: i64 },

    #[error("activity '{activity_id}' duration of {days} days runs past the supported date range")]
    DurationOutOfRange { activity_id: String, days: i64 },

    #[error("activity '{activity_id}' starts on {start} but ends on {end}")]
    InvalidDateRange {
        activity_id: String,
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("activity '{activity_id}' end date {end} does not equal start + {days} days")]
    DurationMismatch {
        activity_id: String,
        end: chrono::NaiveDate,
        days: i64,
    },

    #[error("activity '{activity_id}' has negative planned cost {cost}")]
    NegativeCost { activity_id: String, cost: f64 },

    #[error("activity '{activity_id}' references unknown predecessor '{predecessor_id}'")]
    UnknownPredecessor {
        activity_id: String,
        predecessor_id: String,
    },

    #[error("activity id '{0}' appears more than once")]
    DuplicateActivity(String),

    #[error("activity '{activity_id}' lists predecessor '{predecessor_id}' more than once")]
    DuplicatePredecessor {
        activity_id: String,
        predecessor_id: String,
    },

    #[error("invalid constraint: {0}")]
    InvalidConstraint(String),

    #[error("crash target must be a positive number of days, got {0}")]
    InvalidCrashTarget(i64),
}

pub type Result<T> = std::result::Result<T, PlanError>;
