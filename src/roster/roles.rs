//! Role catalog per team and role eligibility.

use serde::Serialize;

use crate::models::{names_match, Member};

pub const PRAISE_TEAM: &str = "praise_team";
pub const AUDIO_VIDEO_TEAM: &str = "audio_video";
pub const GENERAL_TEAM: &str = "general";

const PRAISE_ROLES: &[&str] = &[
    "Lead Singer",
    "Vocalist",
    "Vocalist 2",
    "Guitarist",
    "Bassist",
    "Drummer",
    "Pianist",
];
const AV_ROLES: &[&str] = &["PPT", "Audio/Video"];
const GENERAL_ROLES: &[&str] = &["Offering", "Usher", "Doxology", "Scripture Reading"];

/// Second vocal slot; filled from the same pool as `Vocalist`.
const SECOND_VOCALIST: &str = "Vocalist 2";

/// Service groups members sign up for, and the organization each one maps to.
pub const SERVICE_GROUPS: &[(&str, &str)] = &[
    ("162nd Chinese", "162nd"),
    ("162nd English", "162nd En"),
    ("137th Chinese", "137th"),
];

/// Roles shown for a team; unknown teams get the praise team roles.
pub fn roles_for_team(team: &str) -> &'static [&'static str] {
    match team {
        PRAISE_TEAM => PRAISE_ROLES,
        AUDIO_VIDEO_TEAM => AV_ROLES,
        GENERAL_TEAM => GENERAL_ROLES,
        other => {
            tracing::debug!("Unknown team {:?}, showing {} roles", other, PRAISE_TEAM);
            PRAISE_ROLES
        }
    }
}

/// The member role that qualifies someone for a schedule role.
pub fn eligibility_role(role: &str) -> &str {
    if names_match(role, SECOND_VOCALIST) {
        "Vocalist"
    } else {
        role
    }
}

/// Members who can fill `role`.
pub fn eligible_members(members: Vec<Member>, role: &str) -> Vec<Member> {
    let wanted = eligibility_role(role.trim());
    members.into_iter().filter(|m| m.has_role(wanted)).collect()
}

/// Organization id a service group belongs to.
pub fn organization_for_group(group: &str) -> Option<&'static str> {
    SERVICE_GROUPS
        .iter()
        .find(|(name, _)| names_match(name, group))
        .map(|(_, org)| *org)
}

/// Role list of a team.
#[derive(Debug, Clone, Serialize)]
pub struct TeamRoles {
    pub team: String,
    pub roles: Vec<String>,
}

impl TeamRoles {
    pub fn for_team(team: &str) -> Self {
        Self {
            team: team.to_string(),
            roles: roles_for_team(team).iter().map(|r| r.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str, roles: &[&str]) -> Member {
        Member {
            id: name.to_string(),
            name: name.to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            groups: Vec::new(),
            unavailable_dates: None,
        }
    }

    #[test]
    fn test_roles_for_team() {
        assert_eq!(roles_for_team("audio_video"), &["PPT", "Audio/Video"]);
        assert_eq!(roles_for_team("general").len(), 4);
        assert_eq!(roles_for_team("praise_team")[2], "Vocalist 2");
        assert_eq!(roles_for_team("unknown"), roles_for_team("praise_team"));
    }

    #[test]
    fn test_second_vocalist_uses_vocalist_pool() {
        let members = vec![
            member("anna", &["Vocalist"]),
            member("ben", &["Drummer"]),
            member("cara", &["vocalist", "Pianist"]),
        ];
        let names: Vec<_> = eligible_members(members, "Vocalist 2")
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["anna", "cara"]);
    }

    #[test]
    fn test_organization_for_group() {
        assert_eq!(organization_for_group("162nd English"), Some("162nd En"));
        assert_eq!(organization_for_group("137th chinese"), Some("137th"));
        assert_eq!(organization_for_group("Youth"), None);
    }
}
