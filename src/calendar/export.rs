//! Export of one member's assignments to their calendar.

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;

use super::error::CalendarError;
use super::session::CalendarSession;
use super::types::EventRequest;
use crate::models::Schedule;
use crate::roster::parse_slot_date;

pub const NO_EVENTS_NOTICE: &str = "No scheduled events found for the selected member.";
pub const EXPORTED_NOTICE: &str = "Events have been added to your calendar!";

/// An event derived from one schedule entry.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedEvent {
    pub schedule_date: String,
    pub date: NaiveDate,
    pub role: String,
    pub event: EventRequest,
}

/// Events for `member` plus the schedule keys that could not be dated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportPlan {
    pub matched: usize,
    pub events: Vec<PlannedEvent>,
    pub skipped: Vec<String>,
}

/// Pick the schedules `member` serves in and turn them into events.
pub fn plan_events(schedules: &[Schedule], member: &str, year: i32, tz: Tz) -> ExportPlan {
    let mut plan = ExportPlan::default();

    for schedule in schedules {
        let Some(role) = schedule.role_of(member) else {
            continue;
        };
        plan.matched += 1;

        let Some(date) = parse_slot_date(&schedule.date, year) else {
            tracing::debug!("No date found in schedule key {:?}", schedule.date);
            plan.skipped.push(schedule.date.clone());
            continue;
        };

        match EventRequest::for_service(role, date, tz) {
            Some(event) => plan.events.push(PlannedEvent {
                schedule_date: schedule.date.clone(),
                date,
                role: role.to_string(),
                event,
            }),
            None => plan.skipped.push(schedule.date.clone()),
        }
    }

    plan
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ExportStatus {
    Exported,
    NoEvents,
}

/// What an export did, with the notice to show the user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportReport {
    pub status: ExportStatus,
    pub member: String,
    pub inserted: usize,
    pub event_ids: Vec<String>,
    pub skipped: Vec<String>,
    pub notice: String,
}

/// Pushes schedule assignments through the shared calendar session.
pub struct CalendarExporter<'a> {
    session: &'a CalendarSession,
    timezone: Tz,
}

impl<'a> CalendarExporter<'a> {
    pub fn new(session: &'a CalendarSession, timezone: Tz) -> Self {
        Self { session, timezone }
    }

    /// Insert one event per schedule `member` appears in.
    ///
    /// The first failed insert aborts the rest of the batch.
    pub async fn export(
        &self,
        schedules: &[Schedule],
        member: &str,
        year: i32,
    ) -> Result<ExportReport, CalendarError> {
        self.session.ensure_initialized().await?;

        let plan = plan_events(schedules, member, year, self.timezone);
        if plan.matched == 0 {
            tracing::info!("No events found for member {}", member);
            return Ok(ExportReport {
                status: ExportStatus::NoEvents,
                member: member.to_string(),
                inserted: 0,
                event_ids: Vec::new(),
                skipped: Vec::new(),
                notice: NO_EVENTS_NOTICE.to_string(),
            });
        }

        let mut event_ids = Vec::with_capacity(plan.events.len());
        for planned in &plan.events {
            tracing::info!(
                "Adding {} on {} ({}) for {}",
                planned.role,
                planned.schedule_date,
                planned.date,
                member
            );
            match self.session.insert_event(&planned.event).await {
                Ok(inserted) => event_ids.push(inserted.id),
                Err(e @ CalendarError::ConsentRequired { .. }) if event_ids.is_empty() => {
                    return Err(e)
                }
                Err(e) => {
                    tracing::error!(
                        "Calendar export for {} stopped after {} event(s): {}",
                        member,
                        event_ids.len(),
                        e
                    );
                    return Err(CalendarError::BatchAborted {
                        inserted: event_ids.len(),
                        source: Box::new(e),
                    });
                }
            }
        }

        Ok(ExportReport {
            status: ExportStatus::Exported,
            member: member.to_string(),
            inserted: event_ids.len(),
            event_ids,
            skipped: plan.skipped,
            notice: EXPORTED_NOTICE.to_string(),
        })
    }
}
