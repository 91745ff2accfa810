//! Roster domain logic: edit-session conflict detection, the service calendar
//! (quarters and Sunday slots) and the role catalog.

mod conflict;
mod roles;
mod service_calendar;

pub use conflict::*;
pub use roles::*;
pub use service_calendar::*;
