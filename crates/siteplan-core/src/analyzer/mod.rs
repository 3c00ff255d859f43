pub mod critical_path;
pub mod report;

pub use critical_path::{
    calculate_critical_path, ActivityTiming, CpmSchedule, CriticalPathAnalysis, NearCriticalPath,
};
