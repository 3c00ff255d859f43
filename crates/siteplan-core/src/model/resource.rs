use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A crew member or crew of a given trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workforce {
    pub id: String,
    pub trade: String,
    #[serde(default)]
    pub hourly_rate: f64,
    #[serde(default)]
    pub available_from: Option<NaiveDate>,
    #[serde(default)]
    pub available_until: Option<NaiveDate>,
    #[serde(default = "default_daily_hours")]
    pub daily_hours: f64,
    #[serde(default = "default_productivity")]
    pub productivity_factor: f64,
}

/// A piece (or fleet) of plant of a given type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    pub id: String,
    pub equipment_type: String,
    #[serde(default)]
    pub daily_rental_cost: f64,
    #[serde(default)]
    pub available_from: Option<NaiveDate>,
    #[serde(default)]
    pub available_until: Option<NaiveDate>,
    /// Units on site each day.
    #[serde(default = "default_units")]
    pub units: u32,
    #[serde(default = "default_productivity")]
    pub productivity_factor: f64,
}

fn default_daily_hours() -> f64 {
    8.0
}

fn default_productivity() -> f64 {
    1.0
}

fn default_units() -> u32 {
    1
}

/// Reference resource data supplied by the resource repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Resource {
    Workforce(Workforce),
    Equipment(Equipment),
}

impl Resource {
    pub fn workforce(id: impl Into<String>, trade: impl Into<String>) -> Self {
        Resource::Workforce(Workforce {
            id: id.into(),
            trade: trade.into(),
            hourly_rate: 0.0,
            available_from: None,
            available_until: None,
            daily_hours: default_daily_hours(),
            productivity_factor: default_productivity(),
        })
    }

    pub fn equipment(id: impl Into<String>, equipment_type: impl Into<String>, units: u32) -> Self {
        Resource::Equipment(Equipment {
            id: id.into(),
            equipment_type: equipment_type.into(),
            daily_rental_cost: 0.0,
            available_from: None,
            available_until: None,
            units,
            productivity_factor: default_productivity(),
        })
    }

    /// Restrict availability to `[from, until]` (inclusive).
    pub fn available_between(mut self, from: NaiveDate, until: NaiveDate) -> Self {
        match &mut self {
            Resource::Workforce(w) => {
                w.available_from = Some(from);
                w.available_until = Some(until);
            }
            Resource::Equipment(e) => {
                e.available_from = Some(from);
                e.available_until = Some(until);
            }
        }
        self
    }

    pub fn id(&self) -> &str {
        match self {
            Resource::Workforce(w) => &w.id,
            Resource::Equipment(e) => &e.id,
        }
    }

    /// Trade for workforce, equipment type for plant.
    pub fn resource_type(&self) -> &str {
        match self {
            Resource::Workforce(w) => &w.trade,
            Resource::Equipment(e) => &e.equipment_type,
        }
    }

    /// Units this resource contributes on a day it is available.
    pub fn capacity_units(&self) -> i64 {
        match self {
            Resource::Workforce(_) => 1,
            Resource::Equipment(e) => i64::from(e.units),
        }
    }

    /// Cost of keeping the resource for one day.
    pub fn daily_cost(&self) -> f64 {
        match self {
            Resource::Workforce(w) => w.hourly_rate * w.daily_hours,
            Resource::Equipment(e) => e.daily_rental_cost * f64::from(e.units),
        }
    }

    pub fn is_available_on(&self, date: NaiveDate) -> bool {
        let (from, until) = match self {
            Resource::Workforce(w) => (w.available_from, w.available_until),
            Resource::Equipment(e) => (e.available_from, e.available_until),
        };
        from.map_or(true, |f| date >= f) && until.map_or(true, |u| date <= u)
    }
}

/// Derived link between an activity and a resource; never persisted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAssignment {
    pub activity_id: String,
    pub resource_id: String,
    /// Above 100 means the resource is overallocated.
    pub allocation_percentage: f64,
    pub planned_cost: f64,
}

impl ResourceAssignment {
    pub fn is_overallocated(&self) -> bool {
        self.allocation_percentage > 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn test_availability_window_is_inclusive() {
        let r = Resource::workforce("m1", "mason").available_between(date(2), date(4));
        assert!(!r.is_available_on(date(1)));
        assert!(r.is_available_on(date(2)));
        assert!(r.is_available_on(date(4)));
        assert!(!r.is_available_on(date(5)));
    }

    #[test]
    fn test_open_window_is_always_available() {
        let r = Resource::equipment("c1", "crane", 2);
        assert!(r.is_available_on(date(1)));
        assert_eq!(r.capacity_units(), 2);
        assert_eq!(r.resource_type(), "crane");
    }

    #[test]
    fn test_resource_tagged_json() {
        let json = r#"[
            {"kind": "workforce", "id": "w1", "trade": "mason", "hourlyRate": 40.0},
            {"kind": "equipment", "id": "e1", "equipmentType": "crane", "dailyRentalCost": 900.0}
        ]"#;
        let resources: Vec<Resource> = serde_json::from_str(json).unwrap();
        assert_eq!(resources[0].daily_cost(), 320.0);
        assert_eq!(resources[1].capacity_units(), 1);
        assert_eq!(resources[1].daily_cost(), 900.0);
    }

    #[test]
    fn test_assignment_overallocation_flag() {
        let a = ResourceAssignment {
            activity_id: "a".into(),
            resource_id: "w1".into(),
            allocation_percentage: 120.0,
            planned_cost: 0.0,
        };
        assert!(a.is_overallocated());
    }
}
