//! In-process fake backend for unit and integration tests
//!
//! [`FakeBackend`] implements [`BackendApi`] against in-memory state so that
//! session, reminder and analysis workflows can be driven without a server.
//! It behaves like an echoing backend: created reminders are stored exactly
//! as submitted and returned by later list calls.
//!
//! Analysis responses are scripted with [`FakeBackend::push_analysis`]; each
//! scripted response may carry a delay, which makes out-of-order responses
//! reproducible under `tokio::time::pause`. Every call is recorded and can be
//! inspected with [`FakeBackend::calls`].
//!
//! # Example
//!
//! ```
//! use remindr::api::{BackendApi, FakeBackend};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let backend = FakeBackend::new();
//! backend.add_user("ada@example.com", "secret1", Some("Ada"));
//!
//! let token = backend.login("ada@example.com", "secret1").await.unwrap();
//! let me = backend.current_user(&token.access_token).await.unwrap();
//! assert_eq!(me.full_name.as_deref(), Some("Ada"));
//! # }
//! ```

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::api::types::{
    AnalysisResult, ProfileUpdate, RawAnalysisResponse, RawSuggestion, Reminder,
    ReminderCreate, ReminderUpdate, TokenResponse, UserProfile,
};
use crate::api::BackendApi;
use crate::error::{RemindrError, Result};

/// One-time code accepted by the fake for every OTP flow
pub const FAKE_OTP: &str = "123456";

/// A scripted analysis reply
#[derive(Debug, Clone)]
struct ScriptedAnalysis {
    delay: Duration,
    outcome: std::result::Result<RawAnalysisResponse, (u16, String)>,
}

#[derive(Debug, Default)]
struct FakeState {
    users: HashMap<String, (UserProfile, Option<String>)>,
    tokens: HashMap<String, String>,
    reminders: HashMap<String, Vec<Reminder>>,
    pending_otps: HashMap<String, String>,
    analysis_script: VecDeque<ScriptedAnalysis>,
    calls: Vec<String>,
    next_user_id: i64,
    next_reminder_id: i64,
    next_token: u64,
}

/// In-memory [`BackendApi`] implementation.
///
/// Cloning shares state, so a test can keep one handle for assertions while
/// the code under test owns another.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    /// Create an empty backend with no users
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        // A poisoned lock only happens after a panicking test; keep going
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: impl Into<String>) {
        self.lock().calls.push(call.into());
    }

    /// Register a user directly, bypassing the API
    pub fn add_user(&self, email: &str, password: &str, full_name: Option<&str>) -> UserProfile {
        let mut state = self.lock();
        state.next_user_id += 1;
        let profile = UserProfile {
            id: state.next_user_id,
            email: email.to_string(),
            full_name: full_name.map(str::to_string),
            created_at: Utc::now(),
        };
        state
            .users
            .insert(email.to_string(), (profile.clone(), Some(password.to_string())));
        profile
    }

    /// Issue a token for an existing user, bypassing the API
    pub fn issue_token(&self, email: &str) -> String {
        let mut state = self.lock();
        state.next_token += 1;
        let token = format!("fake-token-{}", state.next_token);
        state.tokens.insert(token.clone(), email.to_string());
        token
    }

    /// Invalidate a token as if it had expired server-side
    pub fn revoke_token(&self, token: &str) {
        self.lock().tokens.remove(token);
    }

    /// Queue an analysis response returned after `delay`
    pub fn push_analysis(&self, response: RawAnalysisResponse, delay: Duration) {
        self.lock().analysis_script.push_back(ScriptedAnalysis {
            delay,
            outcome: Ok(response),
        });
    }

    /// Queue an analysis response carrying only a suggestion
    pub fn push_suggestion(&self, suggestion: RawSuggestion, delay: Duration) {
        self.push_analysis(
            RawAnalysisResponse {
                scheduling_suggestion: Some(suggestion),
                ..Default::default()
            },
            delay,
        );
    }

    /// Queue an analysis failure with the given status and detail
    pub fn push_analysis_error(&self, status: u16, detail: &str) {
        self.lock().analysis_script.push_back(ScriptedAnalysis {
            delay: Duration::ZERO,
            outcome: Err((status, detail.to_string())),
        });
    }

    /// Every call made so far, as `METHOD /path` strings
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Number of recorded calls matching `call` exactly
    pub fn count_calls(&self, call: &str) -> usize {
        self.lock().calls.iter().filter(|c| c.as_str() == call).count()
    }

    /// Texts sent to `/analyze/text`, in call order
    pub fn analyzed_texts(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| c.strip_prefix("POST /analyze/text "))
            .map(str::to_string)
            .collect()
    }

    /// Server-side reminders of a user
    pub fn reminders_of(&self, email: &str) -> Vec<Reminder> {
        self.lock().reminders.get(email).cloned().unwrap_or_default()
    }

    fn email_for(&self, token: &str) -> Result<String> {
        self.lock()
            .tokens
            .get(token)
            .cloned()
            .ok_or_else(|| RemindrError::Authentication("Could not validate credentials".into()).into())
    }

    fn with_reminder<T>(
        &self,
        token: &str,
        id: i64,
        f: impl FnOnce(&mut Reminder) -> T,
    ) -> Result<T> {
        let email = self.email_for(token)?;
        let mut state = self.lock();
        let reminder = state
            .reminders
            .get_mut(&email)
            .and_then(|list| list.iter_mut().find(|r| r.id == id))
            .ok_or_else(not_found)?;
        Ok(f(reminder))
    }

    async fn scripted_analysis(&self, text: &str) -> Result<AnalysisResult> {
        let next = self.lock().analysis_script.pop_front();
        let scripted = next.unwrap_or(ScriptedAnalysis {
            delay: Duration::ZERO,
            outcome: Ok(RawAnalysisResponse::default()),
        });
        if !scripted.delay.is_zero() {
            tokio::time::sleep(scripted.delay).await;
        }
        match scripted.outcome {
            Ok(mut raw) => {
                if raw.text.is_none() {
                    raw.text = Some(text.to_string());
                }
                Ok(AnalysisResult::from_raw(raw)?)
            }
            Err((status, message)) => Err(RemindrError::Api { status, message }.into()),
        }
    }
}

fn not_found() -> RemindrError {
    RemindrError::Api {
        status: 404,
        message: "Reminder not found".to_string(),
    }
}

fn bad_request(message: &str) -> anyhow::Error {
    RemindrError::Api {
        status: 400,
        message: message.to_string(),
    }
    .into()
}

#[async_trait]
impl BackendApi for FakeBackend {
    async fn login(&self, email: &str, password: &str) -> Result<TokenResponse> {
        self.record("POST /auth/login");
        let valid = matches!(
            self.lock().users.get(email),
            Some((_, Some(stored))) if stored == password
        );
        if !valid {
            return Err(
                RemindrError::Authentication("Incorrect email or password".to_string()).into(),
            );
        }
        Ok(TokenResponse {
            access_token: self.issue_token(email),
            token_type: "bearer".to_string(),
        })
    }

    async fn request_login_otp(&self, email: &str) -> Result<()> {
        self.record("POST /auth/request-login-otp");
        let mut state = self.lock();
        if !state.users.contains_key(email) {
            return Err(RemindrError::Api {
                status: 404,
                message: "User not found".to_string(),
            }
            .into());
        }
        state
            .pending_otps
            .insert(email.to_string(), FAKE_OTP.to_string());
        Ok(())
    }

    async fn login_with_otp(&self, email: &str, otp: &str) -> Result<TokenResponse> {
        self.record("POST /auth/login-with-otp");
        let valid = self.lock().pending_otps.get(email).map(String::as_str) == Some(otp);
        if !valid {
            return Err(bad_request("Invalid or expired OTP"));
        }
        self.lock().pending_otps.remove(email);
        Ok(TokenResponse {
            access_token: self.issue_token(email),
            token_type: "bearer".to_string(),
        })
    }

    async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<UserProfile> {
        self.record("POST /auth/register");
        if self.lock().users.contains_key(email) {
            return Err(bad_request("Email already registered"));
        }
        Ok(self.add_user(email, password, full_name))
    }

    async fn request_registration_otp(&self, email: &str) -> Result<()> {
        self.record("POST /auth/request-registration-otp");
        let mut state = self.lock();
        if state.users.contains_key(email) {
            return Err(bad_request("Email already registered"));
        }
        state
            .pending_otps
            .insert(email.to_string(), FAKE_OTP.to_string());
        Ok(())
    }

    async fn register_with_otp(
        &self,
        email: &str,
        otp: &str,
        full_name: Option<&str>,
        password: Option<&str>,
    ) -> Result<TokenResponse> {
        self.record("POST /auth/register-with-otp");
        let valid = self.lock().pending_otps.get(email).map(String::as_str) == Some(otp);
        if !valid {
            return Err(bad_request("Invalid or expired OTP"));
        }
        self.lock().pending_otps.remove(email);
        let profile = self.add_user(email, password.unwrap_or_default(), full_name);
        if password.is_none() {
            if let Some(entry) = self.lock().users.get_mut(&profile.email) {
                entry.1 = None;
            }
        }
        Ok(TokenResponse {
            access_token: self.issue_token(email),
            token_type: "bearer".to_string(),
        })
    }

    async fn current_user(&self, token: &str) -> Result<UserProfile> {
        self.record("GET /auth/me");
        let email = self.email_for(token)?;
        self.lock()
            .users
            .get(&email)
            .map(|(profile, _)| profile.clone())
            .ok_or_else(|| RemindrError::Authentication("User no longer exists".into()).into())
    }

    async fn update_profile(&self, token: &str, update: &ProfileUpdate) -> Result<UserProfile> {
        self.record("PUT /auth/me");
        let email = self.email_for(token)?;
        let mut state = self.lock();
        let (mut profile, password) = state
            .users
            .remove(&email)
            .ok_or_else(|| RemindrError::Authentication("User no longer exists".into()))?;
        if let Some(name) = &update.full_name {
            profile.full_name = Some(name.clone());
        }
        if let Some(new_email) = &update.email {
            profile.email = new_email.clone();
            if let Some(list) = state.reminders.remove(&email) {
                state.reminders.insert(new_email.clone(), list);
            }
            for owner in state.tokens.values_mut() {
                if *owner == email {
                    *owner = new_email.clone();
                }
            }
        }
        state
            .users
            .insert(profile.email.clone(), (profile.clone(), password));
        Ok(profile)
    }

    async fn list_reminders(&self, token: &str) -> Result<Vec<Reminder>> {
        self.record("GET /reminders");
        let email = self.email_for(token)?;
        Ok(self.reminders_of(&email))
    }

    async fn upcoming_reminders(&self, token: &str) -> Result<Vec<Reminder>> {
        self.record("GET /reminders/upcoming");
        let email = self.email_for(token)?;
        let now = Utc::now();
        let mut upcoming: Vec<Reminder> = self
            .reminders_of(&email)
            .into_iter()
            .filter(|r| r.is_upcoming(now))
            .collect();
        upcoming.sort_by_key(|r| r.scheduled_for);
        Ok(upcoming)
    }

    async fn get_reminder(&self, token: &str, id: i64) -> Result<Reminder> {
        self.record(format!("GET /reminders/{}", id));
        self.with_reminder(token, id, |r| r.clone())
    }

    async fn create_reminder(&self, token: &str, reminder: &ReminderCreate) -> Result<Reminder> {
        self.record("POST /reminders");
        reminder.validate()?;
        let email = self.email_for(token)?;
        let mut state = self.lock();
        state.next_reminder_id += 1;
        let created = Reminder {
            id: state.next_reminder_id,
            title: reminder.title.clone(),
            description: reminder.description.clone(),
            scheduled_for: reminder.scheduled_for,
            created_at: Utc::now(),
            updated_at: None,
            is_completed: false,
            is_important: reminder.is_important,
            original_text: reminder.original_text.clone(),
            confidence_score: reminder.confidence_score,
            source_type: reminder.source_type,
            image_url: reminder.image_url.clone(),
        };
        state
            .reminders
            .entry(email)
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn update_reminder(
        &self,
        token: &str,
        id: i64,
        update: &ReminderUpdate,
    ) -> Result<Reminder> {
        self.record(format!("PUT /reminders/{}", id));
        update.validate()?;
        let update = update.clone();
        self.with_reminder(token, id, move |r| {
            if let Some(title) = update.title {
                r.title = title;
            }
            if let Some(description) = update.description {
                r.description = Some(description);
            }
            if let Some(when) = update.scheduled_for {
                r.scheduled_for = when;
            }
            if let Some(done) = update.is_completed {
                r.is_completed = done;
            }
            if let Some(important) = update.is_important {
                r.is_important = important;
            }
            if let Some(text) = update.original_text {
                r.original_text = Some(text);
            }
            if let Some(score) = update.confidence_score {
                r.confidence_score = Some(score);
            }
            if let Some(source) = update.source_type {
                r.source_type = Some(source);
            }
            r.updated_at = Some(Utc::now());
            r.clone()
        })
    }

    async fn delete_reminder(&self, token: &str, id: i64) -> Result<()> {
        self.record(format!("DELETE /reminders/{}", id));
        let email = self.email_for(token)?;
        let mut state = self.lock();
        let list = state.reminders.entry(email).or_default();
        let before = list.len();
        list.retain(|r| r.id != id);
        if list.len() == before {
            return Err(not_found().into());
        }
        Ok(())
    }

    async fn complete_reminder(&self, token: &str, id: i64) -> Result<Reminder> {
        self.record(format!("POST /reminders/{}/complete", id));
        self.with_reminder(token, id, |r| {
            r.is_completed = true;
            r.updated_at = Some(Utc::now());
            r.clone()
        })
    }

    async fn uncomplete_reminder(&self, token: &str, id: i64) -> Result<Reminder> {
        self.record(format!("POST /reminders/{}/uncomplete", id));
        self.with_reminder(token, id, |r| {
            r.is_completed = false;
            r.updated_at = Some(Utc::now());
            r.clone()
        })
    }

    async fn analyze_text(&self, token: &str, text: &str) -> Result<AnalysisResult> {
        self.record(format!("POST /analyze/text {}", text));
        self.email_for(token)?;
        self.scripted_analysis(text).await
    }

    async fn analyze_voice(&self, token: &str, audio: &Path) -> Result<AnalysisResult> {
        self.record("POST /analyze/voice");
        self.email_for(token)?;
        let name = audio
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.scripted_analysis(&format!("transcript of {}", name)).await
    }

    async fn analyze_image(&self, token: &str, image: &Path) -> Result<AnalysisResult> {
        self.record("POST /analyze/image");
        self.email_for(token)?;
        let name = image
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.scripted_analysis(&format!("text found in {}", name)).await
    }
}
