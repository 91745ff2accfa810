//! Roster repository over the document store.
//!
//! Members live under `organizations/{org}/members`, schedules under
//! `organizations/{org}/teams/{team}/schedules/{date}`.

use chrono::Utc;

use super::{collection_path, DocumentStore};
use crate::errors::AppError;
use crate::models::{normalize_name, Member, Schedule};
use crate::roster::eligible_members;

/// Data access for members and schedules.
#[derive(Clone)]
pub struct Repository {
    docs: DocumentStore,
}

impl Repository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self {
            docs: DocumentStore::new(pool),
        }
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        self.docs.revision_id().await
    }

    // ==================== MEMBER OPERATIONS ====================

    /// List all members of an organization.
    pub async fn list_members(&self, org: &str) -> Result<Vec<Member>, AppError> {
        let collection = members_path(org)?;
        self.docs
            .list(&collection)
            .await?
            .iter()
            .map(member_from_document)
            .collect()
    }

    /// Add a member, rejecting case-insensitive duplicates.
    pub async fn add_member(&self, org: &str, member: &Member) -> Result<Member, AppError> {
        let collection = members_path(org)?;
        let stored = Member {
            id: String::new(),
            name: normalize_name(&member.name),
            ..member.clone()
        };

        let Some(id) = self
            .docs
            .add_unique(&collection, "name", &stored.name, stored.to_document())
            .await?
        else {
            return Err(AppError::Duplicate(format!(
                "Member '{}' already exists in {}",
                stored.name, org
            )));
        };
        tracing::info!("Added member {} ({}) to {}", stored.name, id, org);

        Ok(Member { id, ..stored })
    }

    /// Case-insensitive name lookup.
    pub async fn member_exists(&self, org: &str, name: &str) -> Result<bool, AppError> {
        let collection = members_path(org)?;
        let matches = self
            .docs
            .where_eq(&collection, "name", &normalize_name(name))
            .await?;
        Ok(!matches.is_empty())
    }

    /// Members of an organization who can fill `role`.
    pub async fn members_for_role(&self, org: &str, role: &str) -> Result<Vec<Member>, AppError> {
        let members = self.list_members(org).await?;
        Ok(eligible_members(members, role))
    }

    // ==================== SCHEDULE OPERATIONS ====================

    /// List all schedules of a team.
    pub async fn list_schedules(&self, org: &str, team: &str) -> Result<Vec<Schedule>, AppError> {
        let collection = schedules_path(org, team)?;
        self.docs
            .list(&collection)
            .await?
            .iter()
            .map(|doc| doc.decode())
            .collect()
    }

    /// Get the schedule stored under a date key.
    pub async fn get_schedule(
        &self,
        org: &str,
        team: &str,
        date: &str,
    ) -> Result<Option<Schedule>, AppError> {
        let collection = schedules_path(org, team)?;
        self.docs
            .get(&collection, date)
            .await?
            .map(|doc| doc.decode())
            .transpose()
    }

    /// Merge-write a schedule keyed by its date. Last write wins.
    pub async fn upsert_schedule(
        &self,
        org: &str,
        team: &str,
        schedule: &Schedule,
    ) -> Result<Schedule, AppError> {
        let collection = schedules_path(org, team)?;
        let stored = Schedule {
            updated_at: Utc::now().to_rfc3339(),
            ..schedule.clone()
        };

        let body = self
            .docs
            .set(&collection, &stored.date, stored.to_document())
            .await?;
        tracing::debug!("Saved schedule {} for {}/{}", stored.date, org, team);

        Ok(serde_json::from_value(body)?)
    }
}

fn members_path(org: &str) -> Result<String, AppError> {
    collection_path(&["organizations", org, "members"])
}

fn schedules_path(org: &str, team: &str) -> Result<String, AppError> {
    collection_path(&["organizations", org, "teams", team, "schedules"])
}

fn member_from_document(doc: &super::Document) -> Result<Member, AppError> {
    let mut member: Member = doc.decode()?;
    member.id = doc.id.clone();
    Ok(member)
}
