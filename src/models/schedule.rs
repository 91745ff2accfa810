//! Service schedule model.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::names_match;

/// One role filled by one member on a service date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Assignment {
    pub role: String,
    pub name: String,
}

/// All assignments for one service date of a team.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    /// Date key, either `YYYY-MM-DD` or a slot label like `1st Sunday (January 5)`
    pub date: String,
    #[serde(default)]
    pub members: Vec<Assignment>,
    #[serde(default)]
    pub updated_at: String,
}

impl Schedule {
    /// Role held by `name` on this date, compared case-insensitively.
    pub fn role_of(&self, name: &str) -> Option<&str> {
        self.members
            .iter()
            .find(|a| !a.name.trim().is_empty() && names_match(&a.name, name))
            .map(|a| a.role.as_str())
    }

    /// Stored document body.
    pub fn to_document(&self) -> Value {
        json!({
            "date": self.date,
            "members": self.members,
            "updatedAt": self.updated_at,
        })
    }
}

/// Request body for saving a schedule; the date comes from the path.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertScheduleRequest {
    #[serde(default)]
    pub members: Vec<Assignment>,
}

/// Request body for one edit-session step.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleEditRequest {
    /// Current role -> member selections; seeded from the stored schedule when absent
    #[serde(default)]
    pub assignments: Option<Vec<Assignment>>,
    pub role: String,
    /// Empty clears the role
    #[serde(default)]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_of_is_case_insensitive() {
        let schedule = Schedule {
            date: "2025-01-05".to_string(),
            members: vec![
                Assignment {
                    role: "Pianist".to_string(),
                    name: String::new(),
                },
                Assignment {
                    role: "Drummer".to_string(),
                    name: "john".to_string(),
                },
            ],
            updated_at: String::new(),
        };

        assert_eq!(schedule.role_of("John"), Some("Drummer"));
        assert_eq!(schedule.role_of(""), None);
        assert_eq!(schedule.role_of("mary"), None);
    }

    #[test]
    fn test_role_of_matches_non_ascii_case() {
        let schedule = Schedule {
            date: "2025-01-05".to_string(),
            members: vec![Assignment {
                role: "Pianist".to_string(),
                name: "Émile".to_string(),
            }],
            updated_at: String::new(),
        };

        assert_eq!(schedule.role_of("émile"), Some("Pianist"));
        assert_eq!(schedule.role_of("ÉMILE"), Some("Pianist"));
    }
}
