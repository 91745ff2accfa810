//! Google Calendar export.
//!
//! `client` talks to the OAuth and Calendar HTTP endpoints, `session` owns the
//! process-wide initialization flag and cached access token, and `export`
//! turns a member's schedule assignments into calendar events.

mod client;
mod error;
mod export;
mod session;
mod types;

pub use client::GoogleCalendar;
pub use error::CalendarError;
pub use export::{CalendarExporter, ExportReport};
pub use session::CalendarSession;

#[cfg(test)]
pub(crate) use session::testing;
