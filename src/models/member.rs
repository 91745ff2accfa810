//! Team member model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A volunteer who can be scheduled into service roles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Document id (not part of the stored body)
    #[serde(default)]
    pub id: String,
    /// Always stored lowercase
    pub name: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unavailable_dates: Option<Vec<String>>,
}

impl Member {
    /// Whether this member may fill `role` (case-insensitive).
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| names_match(r, role))
    }

    /// Stored document body.
    pub fn to_document(&self) -> Value {
        let mut body = json!({
            "name": self.name,
            "roles": self.roles,
            "groups": self.groups,
        });
        if let Some(dates) = &self.unavailable_dates {
            body["unavailableDates"] = json!(dates);
        }
        body
    }
}

/// Request body for adding a member.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemberRequest {
    pub name: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub unavailable_dates: Option<Vec<String>>,
}

impl CreateMemberRequest {
    /// Check the request and build the member to store, with the name lowercased.
    pub fn into_member(self) -> Result<Member, String> {
        let name = normalize_name(&self.name);
        if name.is_empty() {
            return Err("Name is required".to_string());
        }

        if let Some(dates) = &self.unavailable_dates {
            for date in dates {
                if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
                    return Err(format!("Unavailable date '{}' is not YYYY-MM-DD", date));
                }
            }
        }

        Ok(Member {
            id: String::new(),
            name,
            roles: self.roles,
            groups: self.groups,
            unavailable_dates: self.unavailable_dates,
        })
    }
}

/// Canonical form of a member name: trimmed and lowercase.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Case-insensitive match of names and labels, using full Unicode lowercasing.
pub fn names_match(a: &str, b: &str) -> bool {
    normalize_name(a) == normalize_name(b)
}

/// Result of a name existence check.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberExists {
    pub name: String,
    pub exists: bool,
}
