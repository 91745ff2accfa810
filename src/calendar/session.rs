//! Process-wide calendar session state.
//!
//! Initialization happens once and is idempotent on re-entry; it has its own cell so
//! a slow discovery fetch never blocks token or consent state. An access token
//! obtained through consent is reused until any API call fails, after which the
//! next use asks for consent again.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OnceCell};

use super::client::CalendarBackend;
use super::error::CalendarError;
use super::types::{EventRequest, InsertedEvent, PRIMARY_CALENDAR};

#[derive(Debug, Default)]
struct SessionState {
    access_token: Option<String>,
    pending_state: Option<String>,
}

/// Lazily initialized calendar client shared by all requests.
pub struct CalendarSession {
    backend: Arc<dyn CalendarBackend>,
    retry_delay: Duration,
    initialized: OnceCell<()>,
    state: Mutex<SessionState>,
}

impl CalendarSession {
    pub fn new(backend: Arc<dyn CalendarBackend>, retry_delay: Duration) -> Self {
        Self {
            backend,
            retry_delay,
            initialized: OnceCell::new(),
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Initialize the backend once; a failure is retried a single time after `retry_delay`.
    ///
    /// Concurrent callers wait on the same attempt. A failed attempt leaves the session
    /// uninitialized so a later call tries again.
    pub async fn ensure_initialized(&self) -> Result<(), CalendarError> {
        self.initialized
            .get_or_try_init(|| self.initialize_with_retry())
            .await?;
        Ok(())
    }

    async fn initialize_with_retry(&self) -> Result<(), CalendarError> {
        match self.backend.initialize().await {
            Ok(()) => {}
            // Missing credentials will not appear on a retry.
            Err(e @ CalendarError::NotConfigured(_)) => return Err(e),
            Err(e) => {
                tracing::warn!(
                    "Calendar initialization failed ({}), retrying in {:?}",
                    e,
                    self.retry_delay
                );
                tokio::time::sleep(self.retry_delay).await;
                self.backend.initialize().await.map_err(|e| match e {
                    CalendarError::NotConfigured(_) => e,
                    other => CalendarError::InitFailed(other.to_string()),
                })?;
            }
        }

        tracing::info!("Calendar session initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.initialized()
    }

    pub async fn has_token(&self) -> bool {
        self.state.lock().await.access_token.is_some()
    }

    /// Start a consent round and return the URL the user must visit.
    pub async fn begin_consent(&self) -> Result<String, CalendarError> {
        let csrf = uuid::Uuid::new_v4().to_string();
        let url = self.backend.authorization_url(&csrf)?;
        self.state.lock().await.pending_state = Some(csrf);
        Ok(url)
    }

    /// Finish consent with the code and state returned to the redirect URI.
    pub async fn complete_consent(&self, code: &str, returned_state: &str) -> Result<(), CalendarError> {
        {
            let mut state = self.state.lock().await;
            if state.pending_state.as_deref() != Some(returned_state) {
                return Err(CalendarError::StateMismatch);
            }
            state.pending_state = None;
        }

        let token = self.backend.exchange_code(code).await?;
        self.state.lock().await.access_token = Some(token);
        tracing::info!("Calendar consent granted");
        Ok(())
    }

    /// Drop the cached token so the next use requests consent.
    pub async fn invalidate(&self) {
        self.state.lock().await.access_token = None;
        tracing::info!("Calendar access token invalidated");
    }

    /// Insert one event into the primary calendar using the cached token.
    pub async fn insert_event(&self, event: &EventRequest) -> Result<InsertedEvent, CalendarError> {
        let token = self.state.lock().await.access_token.clone();
        let Some(token) = token else {
            let authorization_url = self.begin_consent().await.ok();
            return Err(CalendarError::ConsentRequired { authorization_url });
        };

        match self
            .backend
            .insert_event(&token, PRIMARY_CALENDAR, event)
            .await
        {
            Ok(inserted) => Ok(inserted),
            Err(e) => {
                if e.invalidates_token() {
                    self.invalidate().await;
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory backend used by session, export and HTTP tests.

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    pub struct FakeBackend {
        /// Report missing credentials from `initialize`.
        pub unconfigured: bool,
        pub init_failures: AtomicUsize,
        pub init_calls: AtomicUsize,
        pub exchange_calls: AtomicUsize,
        /// Fail the insert with this 1-based call number.
        pub fail_insert_at: Option<usize>,
        pub inserted: StdMutex<Vec<(String, EventRequest)>>,
    }

    impl FakeBackend {
        pub fn failing_init(times: usize) -> Self {
            Self {
                init_failures: AtomicUsize::new(times),
                ..Self::default()
            }
        }

        pub fn insert_count(&self) -> usize {
            self.inserted.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CalendarBackend for FakeBackend {
        async fn initialize(&self) -> Result<(), CalendarError> {
            self.init_calls.fetch_add(1, Ordering::SeqCst);
            if self.unconfigured {
                return Err(CalendarError::NotConfigured("GOOGLE_CLIENT_ID"));
            }
            let remaining = self.init_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.init_failures.store(remaining - 1, Ordering::SeqCst);
                return Err(CalendarError::ApiError("scripts not loaded".to_string()));
            }
            Ok(())
        }

        fn authorization_url(&self, state: &str) -> Result<String, CalendarError> {
            Ok(format!("https://consent.example/auth?state={}", state))
        }

        async fn exchange_code(&self, code: &str) -> Result<String, CalendarError> {
            self.exchange_calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("token-for-{}", code))
        }

        async fn insert_event(
            &self,
            access_token: &str,
            _calendar_id: &str,
            event: &EventRequest,
        ) -> Result<InsertedEvent, CalendarError> {
            let mut inserted = self.inserted.lock().unwrap();
            if self.fail_insert_at == Some(inserted.len() + 1) {
                return Err(CalendarError::ApiError("500: backend error".to_string()));
            }
            inserted.push((access_token.to_string(), event.clone()));
            Ok(InsertedEvent {
                id: format!("evt{}", inserted.len()),
                html_link: None,
                status: Some("confirmed".to_string()),
            })
        }
    }

    /// Pull the `state` query value out of a consent URL.
    pub fn state_from_url(url: &str) -> String {
        url.split("state=").nth(1).unwrap_or_default().to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use chrono::NaiveDate;

    use super::testing::{state_from_url, FakeBackend};
    use super::*;

    fn session(backend: Arc<FakeBackend>) -> CalendarSession {
        CalendarSession::new(backend, Duration::from_millis(1))
    }

    fn event() -> EventRequest {
        let date = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        EventRequest::for_service("Pianist", date, chrono_tz::UTC).unwrap()
    }

    #[tokio::test]
    async fn test_initialization_is_idempotent() {
        let backend = Arc::new(FakeBackend::default());
        let session = session(backend.clone());

        session.ensure_initialized().await.unwrap();
        session.ensure_initialized().await.unwrap();

        assert!(session.is_initialized());
        assert_eq!(backend.init_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_initialization_retried_once() {
        let backend = Arc::new(FakeBackend::failing_init(1));
        let session = session(backend.clone());

        session.ensure_initialized().await.unwrap();
        assert_eq!(backend.init_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_initialization_gives_up_after_retry() {
        let backend = Arc::new(FakeBackend::failing_init(2));
        let session = session(backend.clone());

        let err = session.ensure_initialized().await.unwrap_err();
        assert!(matches!(err, CalendarError::InitFailed(_)));
        assert!(!session.is_initialized());
        assert_eq!(backend.init_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_not_configured_is_not_retried() {
        let backend = Arc::new(FakeBackend {
            unconfigured: true,
            ..FakeBackend::default()
        });
        // A retry would wait out this delay.
        let session = CalendarSession::new(backend.clone(), Duration::from_secs(60));

        let err = tokio::time::timeout(Duration::from_secs(5), session.ensure_initialized())
            .await
            .expect("initialization waited for a retry")
            .unwrap_err();

        assert!(matches!(err, CalendarError::NotConfigured(_)));
        assert_eq!(backend.init_calls.load(Ordering::SeqCst), 1);
        assert!(!session.is_initialized());
    }

    #[tokio::test]
    async fn test_token_state_readable_during_initialization() {
        let backend = Arc::new(FakeBackend::failing_init(1));
        let session = Arc::new(CalendarSession::new(backend, Duration::from_millis(300)));

        let init = tokio::spawn({
            let session = session.clone();
            async move { session.ensure_initialized().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The retry sleep is in progress; token state must still answer promptly.
        let has_token = tokio::time::timeout(Duration::from_millis(100), session.has_token())
            .await
            .expect("token state blocked by initialization");
        assert!(!has_token);

        init.await.unwrap().unwrap();
        assert!(session.is_initialized());
    }

    #[tokio::test]
    async fn test_insert_without_token_requires_consent() {
        let backend = Arc::new(FakeBackend::default());
        let session = session(backend.clone());

        let err = session.insert_event(&event()).await.unwrap_err();
        match err {
            CalendarError::ConsentRequired { authorization_url } => {
                assert!(authorization_url.unwrap().contains("state="));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(backend.insert_count(), 0);
    }

    #[tokio::test]
    async fn test_consent_then_token_reused() {
        let backend = Arc::new(FakeBackend::default());
        let session = session(backend.clone());

        let url = session.begin_consent().await.unwrap();
        session
            .complete_consent("abc", &state_from_url(&url))
            .await
            .unwrap();

        session.insert_event(&event()).await.unwrap();
        session.insert_event(&event()).await.unwrap();

        assert_eq!(backend.exchange_calls.load(Ordering::SeqCst), 1);
        let inserted = backend.inserted.lock().unwrap();
        assert_eq!(inserted.len(), 2);
        assert!(inserted.iter().all(|(token, _)| token == "token-for-abc"));
    }

    #[tokio::test]
    async fn test_state_mismatch_rejected() {
        let backend = Arc::new(FakeBackend::default());
        let session = session(backend.clone());

        session.begin_consent().await.unwrap();
        let err = session.complete_consent("abc", "forged").await.unwrap_err();

        assert!(matches!(err, CalendarError::StateMismatch));
        assert!(!session.has_token().await);
        assert_eq!(backend.exchange_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_api_error_invalidates_token() {
        let backend = Arc::new(FakeBackend {
            fail_insert_at: Some(1),
            ..FakeBackend::default()
        });
        let session = session(backend.clone());

        let url = session.begin_consent().await.unwrap();
        session
            .complete_consent("abc", &state_from_url(&url))
            .await
            .unwrap();
        assert!(session.has_token().await);

        assert!(session.insert_event(&event()).await.is_err());
        assert!(!session.has_token().await);
    }
}
