pub mod leveler;
pub mod profile;

pub use leveler::{
    level_resources, LevelingImprovements, LevelingStrategy, Placement, Recommendation, ResourceLeveler,
    ResourceLevelingResult,
};
pub use profile::{demand_types, DemandPeak, ResourceProfile, ResourceProfileDay, ResourceProfiler, ResourceUsage};
