//! Project files: activities, resources, constraints, objective and scenarios.

use crate::model::{Activity, Constraints, Objective, Resource};
use crate::whatif::WhatIfScenario;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInput {
    pub activities: Vec<Activity>,
    /// Resources outside the constraints, used by leveling and what-if runs.
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub constraints: Option<Constraints>,
    #[serde(default)]
    pub objective: Option<Objective>,
    #[serde(default)]
    pub scenarios: Vec<WhatIfScenario>,
}

impl ProjectInput {
    /// Explicit resources followed by those listed in the constraints.
    pub fn all_resources(&self) -> Vec<Resource> {
        let mut all = self.resources.clone();
        if let Some(constraints) = &self.constraints {
            all.extend(constraints.resources());
        }
        all
    }
}

/// Load a project from JSON (`.json`) or YAML (anything else).
pub fn load_project(path: &Path) -> anyhow::Result<ProjectInput> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read project file '{}': {}", path.display(), e))?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let project = if is_json {
        parse_json(&content)
    } else {
        parse_yaml(&content)
    };
    project.map_err(|e| anyhow::anyhow!("Failed to parse project file '{}': {}", path.display(), e))
}

pub fn parse_json(content: &str) -> anyhow::Result<ProjectInput> {
    Ok(serde_json::from_str(content)?)
}

pub fn parse_yaml(content: &str) -> anyhow::Result<ProjectInput> {
    Ok(serde_yaml::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DependencyType;
    use std::io::Write;

    const YAML: &str = r#"
activities:
  - id: excavate
    name: Excavation
    primaryTrade: operator
    plannedStartDate: 2024-04-01
    plannedEndDate: 2024-04-04
    plannedDurationDays: 3
    plannedTotalCost: 4500
    requiredEquipment: [excavator]
  - id: footings
    name: Pour footings
    primaryTrade: concreter
    plannedStartDate: 2024-04-04
    plannedEndDate: 2024-04-06
    plannedDurationDays: 2
    priority: CRITICAL
    predecessors:
      - activityId: excavate
        dependencyType: FINISH_TO_START
        lagDays: 0
resources:
  - kind: equipment
    id: ex1
    equipmentType: excavator
    dailyRentalCost: 650
constraints:
  maxProjectDuration: 20
  maxBudget: 50000
  availableWorkforce:
    - kind: workforce
      id: op1
      trade: operator
objective:
  minimizeTime: 40
  minimizeCost: 30
  maximizeQuality: 20
  balanceResources: 10
"#;

    #[test]
    fn test_parse_yaml_project() {
        let project = parse_yaml(YAML).unwrap();
        assert_eq!(project.activities.len(), 2);
        assert_eq!(
            project.activities[1].predecessors[0].dependency_type,
            DependencyType::FinishToStart
        );
        assert_eq!(project.all_resources().len(), 2);
        assert!(project.objective.is_some());
        assert!(project.scenarios.is_empty());
    }

    #[test]
    fn test_unknown_dependency_type_rejected() {
        let bad = YAML.replace("FINISH_TO_START", "AFTER_LUNCH");
        assert!(parse_yaml(&bad).is_err());
    }

    #[test]
    fn test_load_project_by_extension() {
        let project = parse_yaml(YAML).unwrap();
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{}", serde_json::to_string(&project).unwrap()).unwrap();
        let loaded = load_project(file.path()).unwrap();
        assert_eq!(loaded, project);
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = load_project(Path::new("/nonexistent/project.yml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read project file"));
    }
}
