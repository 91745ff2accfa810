//! Data models for the roster backend.
//!
//! Field names serialize as camelCase to match the stored documents and the web client.

mod member;
mod schedule;

pub use member::*;
pub use schedule::*;
