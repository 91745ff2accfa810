//! Google OAuth and Calendar API client.

use async_trait::async_trait;
use tracing::instrument;

use super::error::CalendarError;
use super::types::{EventRequest, InsertedEvent, TokenResponse};
use crate::config::GoogleConfig;

const CALENDAR_EVENTS_SCOPE: &str = "https://www.googleapis.com/auth/calendar.events";

/// External calendar operations the session drives.
#[async_trait]
pub trait CalendarBackend: Send + Sync {
    /// One-time client setup.
    async fn initialize(&self) -> Result<(), CalendarError>;

    /// Consent page URL carrying `state` for CSRF protection.
    fn authorization_url(&self, state: &str) -> Result<String, CalendarError>;

    /// Trade an authorization code for an access token.
    async fn exchange_code(&self, code: &str) -> Result<String, CalendarError>;

    async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &EventRequest,
    ) -> Result<InsertedEvent, CalendarError>;
}

/// Google implementation of [`CalendarBackend`].
pub struct GoogleCalendar {
    client: reqwest::Client,
    config: GoogleConfig,
}

impl GoogleCalendar {
    pub fn new(config: GoogleConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn client_id(&self) -> Result<&str, CalendarError> {
        self.config
            .client_id
            .as_deref()
            .ok_or(CalendarError::NotConfigured("GOOGLE_CLIENT_ID"))
    }

    /// Helper to handle API responses and errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, CalendarError> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| CalendarError::ApiError(format!("JSON parse error: {}", e)))
        } else if status.as_u16() == 401 {
            Err(CalendarError::TokenExpired)
        } else if status.as_u16() == 403 {
            Err(CalendarError::AuthRequired)
        } else if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            Err(CalendarError::RateLimited(retry_after))
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(CalendarError::ApiError(format!("{}: {}", status, text)))
        }
    }
}

#[async_trait]
impl CalendarBackend for GoogleCalendar {
    #[instrument(skip(self), level = "info")]
    async fn initialize(&self) -> Result<(), CalendarError> {
        self.client_id()?;

        let response = self.client.get(&self.config.discovery_url).send().await?;
        if !response.status().is_success() {
            return Err(CalendarError::InitFailed(format!(
                "discovery document returned {}",
                response.status()
            )));
        }

        tracing::info!("Calendar API client initialized");
        Ok(())
    }

    fn authorization_url(&self, state: &str) -> Result<String, CalendarError> {
        let client_id = self.client_id()?;

        Ok(format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&access_type=offline&prompt=consent",
            self.config.auth_url,
            urlencoding::encode(client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(CALENDAR_EVENTS_SCOPE),
            urlencoding::encode(state),
        ))
    }

    #[instrument(skip(self, code), level = "info")]
    async fn exchange_code(&self, code: &str) -> Result<String, CalendarError> {
        let client_id = self.client_id()?;
        let client_secret = self
            .config
            .client_secret
            .as_deref()
            .ok_or(CalendarError::NotConfigured("GOOGLE_CLIENT_SECRET"))?;

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CalendarError::TokenExchange(error_text));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| CalendarError::TokenExchange(format!("JSON parse error: {}", e)))?;
        tracing::info!(expires_in = ?token.expires_in, "Access token obtained");

        Ok(token.access_token)
    }

    #[instrument(skip(self, access_token, event), fields(summary = %event.summary), level = "info")]
    async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &EventRequest,
    ) -> Result<InsertedEvent, CalendarError> {
        let url = format!(
            "{}/calendars/{}/events",
            self.config.api_base,
            urlencoding::encode(calendar_id),
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(event)
            .send()
            .await?;

        self.handle_response(response).await
    }
}
