//! Authentication state
//!
//! [`SessionState`] is the session container handed to every command that
//! talks to the backend. It owns the lifecycle of the bearer token and the
//! cached user profile:
//!
//! - **hydrate** -- load the persisted token, confirm it with `GET /auth/me`,
//!   and drop it if the backend rejects it
//! - **establish** -- login, OTP login and registration all end by persisting
//!   the token and profile together
//! - **teardown** -- [`SessionState::logout`] clears both persisted entries
//!   and the in-memory session
//!
//! Every request that can establish a session is tagged with a monotonically
//! increasing sequence number. When an older request resolves after a newer
//! one was issued (or after logout), its result is discarded with
//! [`RemindrError::Superseded`] instead of overwriting fresher state.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::api::types::{ProfileUpdate, UserProfile};
use crate::api::BackendApi;
use crate::error::{RemindrError, Result};

pub mod store;
pub mod validate;

pub use store::{
    FileSessionStore, KeyringSessionStore, MemorySessionStore, SessionPersistence, StoredSession,
};

/// An active session
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Bearer token sent with every authenticated request
    pub token: String,
    /// Profile of the logged-in user
    pub user: UserProfile,
}

#[derive(Debug, Default)]
struct Inner {
    session: Option<Session>,
    latest_seq: u64,
}

/// Returns true when `err` is a backend authentication failure
pub fn is_unauthorized(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<RemindrError>(),
        Some(RemindrError::Authentication(_))
    )
}

/// Session container.
///
/// Cloning is cheap and shares state; all clones observe the same login.
#[derive(Clone)]
pub struct SessionState {
    api: Arc<dyn BackendApi>,
    persistence: Arc<dyn SessionPersistence>,
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl SessionState {
    /// Create an empty, logged-out container.
    ///
    /// Call [`SessionState::hydrate`] to pick up a persisted session.
    pub fn new(api: Arc<dyn BackendApi>, persistence: Arc<dyn SessionPersistence>) -> Self {
        Self {
            api,
            persistence,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The backend this session talks to
    pub fn api(&self) -> Arc<dyn BackendApi> {
        Arc::clone(&self.api)
    }

    fn begin(&self) -> u64 {
        let mut inner = self.lock();
        inner.latest_seq += 1;
        inner.latest_seq
    }

    fn establish(&self, seq: u64, token: String, user: UserProfile) -> Result<UserProfile> {
        let mut inner = self.lock();
        if inner.latest_seq != seq {
            tracing::debug!(
                "Discarding stale session response (seq {} < {})",
                seq,
                inner.latest_seq
            );
            return Err(RemindrError::Superseded.into());
        }
        self.persistence.save(&StoredSession {
            token: token.clone(),
            user: Some(user.clone()),
        })?;
        inner.session = Some(Session {
            token,
            user: user.clone(),
        });
        tracing::info!("Session established for {}", user.email);
        Ok(user)
    }

    /// Restore the persisted session, if any.
    ///
    /// Returns `Ok(true)` when a session is active afterwards. A token the
    /// backend rejects is cleared. If the backend is unreachable the cached
    /// profile is used as-is.
    ///
    /// # Errors
    ///
    /// Returns the backend error when it is unreachable and no profile was
    /// cached, or a persistence error.
    pub async fn hydrate(&self) -> Result<bool> {
        let Some(stored) = self.persistence.load()? else {
            tracing::debug!("No persisted session");
            return Ok(false);
        };

        let seq = self.begin();
        match self.api.current_user(&stored.token).await {
            Ok(user) => {
                self.establish(seq, stored.token, user)?;
                Ok(true)
            }
            Err(e) if is_unauthorized(&e) => {
                tracing::warn!("Persisted session was rejected: {}", e);
                self.clear_local()?;
                Ok(false)
            }
            Err(e) => match stored.user {
                Some(user) => {
                    tracing::warn!("Could not confirm session ({}), using cached profile", e);
                    self.establish(seq, stored.token, user)?;
                    Ok(true)
                }
                None => Err(e),
            },
        }
    }

    /// Whether a session is active
    pub fn is_authenticated(&self) -> bool {
        self.lock().session.is_some()
    }

    /// Profile of the logged-in user
    pub fn user(&self) -> Option<UserProfile> {
        self.lock().session.as_ref().map(|s| s.user.clone())
    }

    /// Bearer token of the active session
    ///
    /// # Errors
    ///
    /// Returns [`RemindrError::NotAuthenticated`] when logged out.
    pub fn token(&self) -> Result<String> {
        self.lock()
            .session
            .as_ref()
            .map(|s| s.token.clone())
            .ok_or_else(|| RemindrError::NotAuthenticated.into())
    }

    /// Password login
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile> {
        let email = validate::normalize_email(email)?;
        if password.is_empty() {
            return Err(RemindrError::Validation("Password is required".to_string()).into());
        }
        let seq = self.begin();
        tracing::info!("Logging in as {}", email);
        let token = self.api.login(&email, password).await?;
        let user = self.api.current_user(&token.access_token).await?;
        self.establish(seq, token.access_token, user)
    }

    /// Ask the backend to email a login code
    pub async fn request_login_otp(&self, email: &str) -> Result<()> {
        let email = validate::normalize_email(email)?;
        tracing::info!("Requesting login code for {}", email);
        self.api.request_login_otp(&email).await
    }

    /// Passwordless login with an emailed code
    pub async fn login_with_otp(&self, email: &str, otp: &str) -> Result<UserProfile> {
        let email = validate::normalize_email(email)?;
        let otp = validate::validate_otp(otp)?;
        let seq = self.begin();
        let token = self.api.login_with_otp(&email, &otp).await?;
        let user = self.api.current_user(&token.access_token).await?;
        self.establish(seq, token.access_token, user)
    }

    /// Password registration followed by login with the same credentials
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<UserProfile> {
        let email = validate::normalize_email(email)?;
        validate::validate_password(password)?;
        let full_name = full_name.map(str::trim).filter(|n| !n.is_empty());
        let seq = self.begin();
        tracing::info!("Registering {}", email);
        self.api.register(&email, password, full_name).await?;
        let token = self.api.login(&email, password).await?;
        let user = self.api.current_user(&token.access_token).await?;
        self.establish(seq, token.access_token, user)
    }

    /// Ask the backend to email a registration code
    pub async fn request_registration_otp(&self, email: &str) -> Result<()> {
        let email = validate::normalize_email(email)?;
        tracing::info!("Requesting registration code for {}", email);
        self.api.request_registration_otp(&email).await
    }

    /// Registration with an emailed code; the password is optional
    pub async fn register_with_otp(
        &self,
        email: &str,
        otp: &str,
        full_name: Option<&str>,
        password: Option<&str>,
    ) -> Result<UserProfile> {
        let email = validate::normalize_email(email)?;
        let otp = validate::validate_otp(otp)?;
        if let Some(password) = password {
            validate::validate_password(password)?;
        }
        let full_name = full_name.map(str::trim).filter(|n| !n.is_empty());
        let seq = self.begin();
        let token = self
            .api
            .register_with_otp(&email, &otp, full_name, password)
            .await?;
        let user = self.api.current_user(&token.access_token).await?;
        self.establish(seq, token.access_token, user)
    }

    /// Re-fetch the profile from `GET /auth/me`
    pub async fn refresh_profile(&self) -> Result<UserProfile> {
        let token = self.token()?;
        let seq = self.begin();
        let user = self.api.current_user(&token).await?;
        self.establish(seq, token, user)
    }

    /// Change display name and/or email via `PUT /auth/me`
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<UserProfile> {
        let token = self.token()?;
        let update = ProfileUpdate {
            full_name: update.full_name.map(|n| n.trim().to_string()),
            email: update
                .email
                .as_deref()
                .map(validate::normalize_email)
                .transpose()?,
        };
        if update.is_empty() {
            return Err(RemindrError::Validation("Nothing to update".to_string()).into());
        }
        let seq = self.begin();
        let user = self.api.update_profile(&token, &update).await?;
        self.establish(seq, token, user)
    }

    /// Clear the persisted token and profile and end the session.
    ///
    /// Any login still in flight is discarded when it resolves.
    pub fn logout(&self) -> Result<()> {
        self.begin();
        self.clear_local()?;
        tracing::info!("Logged out");
        Ok(())
    }

    fn clear_local(&self) -> Result<()> {
        self.persistence.clear()?;
        self.lock().session = None;
        Ok(())
    }

    /// End the session locally if `err` says the token is no longer valid.
    ///
    /// Returns true when the session was cleared.
    pub fn expire_if_unauthorized(&self, err: &anyhow::Error) -> bool {
        if !is_unauthorized(err) || !self.is_authenticated() {
            return false;
        }
        tracing::warn!("Backend rejected the session token, logging out");
        if let Err(e) = self.logout() {
            tracing::error!("Failed to clear session: {}", e);
        }
        true
    }
}
