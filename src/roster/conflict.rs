//! Double-booking detection for one service date.

use serde::{Deserialize, Serialize};

use crate::models::{names_match, Assignment};

/// What kind of problem an assignment causes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictKind {
    /// The same person already holds another role on this date.
    SamePerson,
}

/// Conflicts of severity `Error` block saving.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Error,
}

/// A detected double assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    #[serde(rename = "type")]
    pub kind: ConflictKind,
    pub severity: Severity,
    /// Role that was just assigned
    pub role: String,
    /// Role the person already holds
    pub existing_role: String,
    pub name: String,
    pub message: String,
}

impl Conflict {
    fn same_person(role: &str, existing_role: &str, name: &str) -> Self {
        Self {
            kind: ConflictKind::SamePerson,
            severity: Severity::Error,
            role: role.to_string(),
            existing_role: existing_role.to_string(),
            name: name.to_string(),
            message: format!("{} is already assigned as {}", name, existing_role),
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// In-progress role selections for one date.
///
/// Each `assign` replaces the conflict list with the result of checking only the
/// newly assigned name; `clear` empties it without re-checking the remaining pairs.
#[derive(Debug, Clone, Default)]
pub struct EditSession {
    assignments: Vec<Assignment>,
    conflicts: Vec<Conflict>,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a session from stored assignments. A repeated role keeps the last name.
    pub fn from_assignments(assignments: impl IntoIterator<Item = Assignment>) -> Self {
        let mut session = Self::new();
        for assignment in assignments {
            session.put(&assignment.role, assignment.name);
        }
        session
    }

    /// Assign `name` to `role`, returning the conflicts this caused.
    pub fn assign(&mut self, role: &str, name: &str) -> &[Conflict] {
        let name = name.trim();
        if name.is_empty() {
            self.clear(role);
            return &self.conflicts;
        }

        self.conflicts = self
            .assignments
            .iter()
            .find(|a| a.role != role && names_match(&a.name, name))
            .map(|existing| vec![Conflict::same_person(role, &existing.role, name)])
            .unwrap_or_default();

        self.put(role, name.to_string());
        &self.conflicts
    }

    /// Unassign `role` and drop all conflicts.
    pub fn clear(&mut self, role: &str) {
        self.conflicts.clear();
        self.put(role, String::new());
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn can_save(&self) -> bool {
        !self.conflicts.iter().any(Conflict::is_blocking)
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    fn put(&mut self, role: &str, name: String) {
        match self.assignments.iter_mut().find(|a| a.role == role) {
            Some(existing) => existing.name = name,
            None => self.assignments.push(Assignment {
                role: role.to_string(),
                name,
            }),
        }
    }
}

/// Every later assignment whose person already holds an earlier, different role.
pub fn double_bookings(assignments: &[Assignment]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    for (index, current) in assignments.iter().enumerate() {
        let name = current.name.trim();
        if name.is_empty() {
            continue;
        }
        if let Some(earlier) = assignments[..index]
            .iter()
            .find(|a| a.role != current.role && names_match(&a.name, name))
        {
            conflicts.push(Conflict::same_person(&current.role, &earlier.role, name));
        }
    }
    conflicts
}

/// First role label that appears more than once, if any.
pub fn duplicate_role(assignments: &[Assignment]) -> Option<&str> {
    assignments.iter().enumerate().find_map(|(index, current)| {
        assignments[..index]
            .iter()
            .any(|a| a.role == current.role)
            .then_some(current.role.as_str())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(role: &str, name: &str) -> Assignment {
        Assignment {
            role: role.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_same_person_two_roles_yields_one_conflict() {
        let mut session = EditSession::new();
        assert!(session.assign("Guitarist", "john").is_empty());

        let conflicts = session.assign("Drummer", "john");
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].existing_role, "Guitarist");
        assert_eq!(conflicts[0].role, "Drummer");
        assert_eq!(conflicts[0].kind, ConflictKind::SamePerson);
        assert_eq!(conflicts[0].message, "john is already assigned as Guitarist");
        assert!(!session.can_save());
    }

    #[test]
    fn test_non_ascii_names_compare_case_insensitively() {
        let mut session = EditSession::new();
        session.assign("Pianist", "Émile");

        let conflicts = session.assign("Drummer", "émile");
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].existing_role, "Pianist");

        let submitted = vec![assignment("Pianist", "ÉMILE"), assignment("Drummer", "émile")];
        assert_eq!(double_bookings(&submitted).len(), 1);
    }

    #[test]
    fn test_clearing_role_removes_conflict() {
        let mut session = EditSession::new();
        session.assign("Guitarist", "john");
        session.assign("Drummer", "john");
        assert!(!session.can_save());

        session.clear("Guitarist");
        assert!(session.conflicts().is_empty());
        assert!(session.can_save());
        assert_eq!(session.assignments()[0], assignment("Guitarist", ""));
    }

    #[test]
    fn test_empty_name_acts_as_clear() {
        let mut session = EditSession::new();
        session.assign("Guitarist", "john");
        session.assign("Drummer", "john");

        assert!(session.assign("Drummer", "  ").is_empty());
        assert!(session.can_save());
    }

    #[test]
    fn test_conflict_check_is_case_insensitive() {
        let mut session = EditSession::from_assignments(vec![assignment("Pianist", "mary")]);
        assert_eq!(session.assign("Vocalist", "Mary").len(), 1);
    }

    #[test]
    fn test_reassigning_same_role_is_not_a_conflict() {
        let mut session = EditSession::new();
        session.assign("Pianist", "mary");
        assert!(session.assign("Pianist", "mary").is_empty());
        assert_eq!(session.assignments().len(), 1);
    }

    #[test]
    fn test_next_clean_assignment_drops_previous_conflict() {
        // Only the latest assignment is checked.
        let mut session = EditSession::new();
        session.assign("Guitarist", "john");
        session.assign("Drummer", "john");
        assert!(session.assign("Bassist", "lee").is_empty());
        assert!(session.can_save());
    }

    #[test]
    fn test_double_bookings_full_check() {
        let members = vec![
            assignment("Lead Singer", "anna"),
            assignment("Guitarist", "john"),
            assignment("Drummer", "John"),
            assignment("Pianist", ""),
            assignment("Bassist", ""),
        ];
        let conflicts = double_bookings(&members);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].role, "Drummer");
        assert_eq!(conflicts[0].existing_role, "Guitarist");
    }

    #[test]
    fn test_duplicate_role() {
        let members = vec![
            assignment("Guitarist", "john"),
            assignment("Drummer", "lee"),
            assignment("Guitarist", "anna"),
        ];
        assert_eq!(duplicate_role(&members), Some("Guitarist"));
        assert_eq!(duplicate_role(&members[..2]), None);
    }

    #[test]
    fn test_conflict_serializes_like_client_expects() {
        let conflict = Conflict::same_person("Drummer", "Guitarist", "john");
        let value = serde_json::to_value(&conflict).unwrap();
        assert_eq!(value["type"], "SAME_PERSON");
        assert_eq!(value["severity"], "ERROR");
        assert_eq!(value["existingRole"], "Guitarist");
    }
}
