//! Calendar-specific error types.

use thiserror::Error;

/// Notice shown when a batch export stops early.
pub const EXPORT_FAILED_NOTICE: &str = "Failed to add events to calendar. Please try again.";

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Calendar integration is not configured: {0} is missing")]
    NotConfigured(&'static str),

    #[error("OAuth consent required")]
    ConsentRequired { authorization_url: Option<String> },

    #[error("OAuth state did not match the pending consent request")]
    StateMismatch,

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Authentication required")]
    AuthRequired,

    #[error("Token expired")]
    TokenExpired,

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("Calendar client initialization failed: {0}")]
    InitFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Export aborted after {inserted} event(s): {source}")]
    BatchAborted {
        inserted: usize,
        #[source]
        source: Box<CalendarError>,
    },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl CalendarError {
    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotConfigured(var) => format!("Calendar export is not set up ({} missing)", var),
            Self::ConsentRequired { .. } => {
                "Please grant access to your Google Calendar and try again.".to_string()
            }
            Self::StateMismatch => "The calendar sign-in request expired. Please retry.".to_string(),
            Self::TokenExchange(_) => "Could not complete Google sign-in".to_string(),
            Self::AuthRequired => "Please sign in to your Google account".to_string(),
            Self::TokenExpired => "Your session has expired. Please sign in again.".to_string(),
            Self::RateLimited(secs) => format!("Too many requests. Please wait {} seconds.", secs),
            Self::InitFailed(_) | Self::BatchAborted { .. } => EXPORT_FAILED_NOTICE.to_string(),
            Self::ApiError(msg) => format!("Calendar error: {}", msg),
            Self::NetworkError(_) => "Network error. Check your connection.".to_string(),
        }
    }

    /// Whether the cached access token must be dropped after this error.
    pub fn invalidates_token(&self) -> bool {
        !matches!(
            self,
            Self::NotConfigured(_) | Self::ConsentRequired { .. } | Self::StateMismatch
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_user_messages() {
        let err = CalendarError::AuthRequired;
        assert!(err.user_message().contains("sign in"));

        let err = CalendarError::RateLimited(30);
        assert!(err.user_message().contains("30"));

        let err = CalendarError::BatchAborted {
            inserted: 2,
            source: Box::new(CalendarError::TokenExpired),
        };
        assert_eq!(err.user_message(), EXPORT_FAILED_NOTICE);
        assert!(err.to_string().contains("after 2 event(s)"));
    }

    #[test]
    fn test_invalidates_token() {
        assert!(CalendarError::TokenExpired.invalidates_token());
        assert!(CalendarError::ApiError("500".into()).invalidates_token());
        assert!(!CalendarError::StateMismatch.invalidates_token());
    }
}
