//! Calendar API payloads.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Calendar all exports go to.
pub const PRIMARY_CALENDAR: &str = "primary";

const SERVICE_START_HOUR: u32 = 10;
const SERVICE_END_HOUR: u32 = 12;
const MINUTES_PER_DAY: u32 = 24 * 60;

/// Reminder lead times in days before the service.
const REMINDER_DAYS: [u32; 2] = [7, 2];

/// Event body sent to `events.insert`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    pub summary: String,
    pub description: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
    pub reminders: Reminders,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    pub date_time: String,
    pub time_zone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reminders {
    pub use_default: bool,
    pub overrides: Vec<ReminderOverride>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReminderMethod {
    Email,
    Popup,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReminderOverride {
    pub method: ReminderMethod,
    pub minutes: u32,
}

impl Reminders {
    /// Email and popup reminders one week and two days ahead.
    pub fn service_defaults() -> Self {
        let overrides = REMINDER_DAYS
            .iter()
            .flat_map(|days| {
                [ReminderMethod::Email, ReminderMethod::Popup].map(|method| ReminderOverride {
                    method,
                    minutes: days * MINUTES_PER_DAY,
                })
            })
            .collect();

        Self {
            use_default: false,
            overrides,
        }
    }
}

impl EventRequest {
    /// Event for serving as `role` on `date`, 10:00-12:00 local time.
    ///
    /// Returns `None` if the local window does not exist in `tz`.
    pub fn for_service(role: &str, date: NaiveDate, tz: Tz) -> Option<Self> {
        let start = local_time(date, SERVICE_START_HOUR, tz)?;
        let end = local_time(date, SERVICE_END_HOUR, tz)?;

        Some(Self {
            summary: format!("Church Service - {}", role),
            description: format!("Serving as {} at church", role),
            start: EventDateTime {
                date_time: start.to_rfc3339(),
                time_zone: tz.name().to_string(),
            },
            end: EventDateTime {
                date_time: end.to_rfc3339(),
                time_zone: tz.name().to_string(),
            },
            reminders: Reminders::service_defaults(),
        })
    }
}

fn local_time(date: NaiveDate, hour: u32, tz: Tz) -> Option<DateTime<Tz>> {
    let time = NaiveTime::from_hms_opt(hour, 0, 0)?;
    tz.from_local_datetime(&date.and_time(time)).earliest()
}

/// The part of an inserted event we report back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InsertedEvent {
    pub id: String,
    #[serde(default)]
    pub html_link: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// OAuth token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_reminders() {
        let reminders = Reminders::service_defaults();
        assert!(!reminders.use_default);
        assert_eq!(
            reminders.overrides,
            vec![
                ReminderOverride { method: ReminderMethod::Email, minutes: 10080 },
                ReminderOverride { method: ReminderMethod::Popup, minutes: 10080 },
                ReminderOverride { method: ReminderMethod::Email, minutes: 2880 },
                ReminderOverride { method: ReminderMethod::Popup, minutes: 2880 },
            ]
        );
    }

    #[test]
    fn test_event_for_service_uses_local_window() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        let event = EventRequest::for_service("Drummer", date, chrono_tz::America::Los_Angeles)
            .unwrap();

        assert_eq!(event.summary, "Church Service - Drummer");
        assert_eq!(event.description, "Serving as Drummer at church");
        assert_eq!(event.start.date_time, "2025-01-05T10:00:00-08:00");
        assert_eq!(event.end.date_time, "2025-01-05T12:00:00-08:00");
        assert_eq!(event.start.time_zone, "America/Los_Angeles");
    }

    #[test]
    fn test_event_serializes_camel_case() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let event = EventRequest::for_service("PPT", date, chrono_tz::UTC).unwrap();
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["start"]["dateTime"], "2025-06-01T10:00:00+00:00");
        assert_eq!(value["start"]["timeZone"], "UTC");
        assert_eq!(value["reminders"]["useDefault"], false);
        assert_eq!(value["reminders"]["overrides"][1]["method"], "popup");
    }
}
