//! Reminder backend API abstraction
//!
//! The backend owns transcription, OCR, NLP, credential storage and reminder
//! persistence. This module defines the [`BackendApi`] trait that the rest of
//! the client talks to, plus two implementations:
//!
//! - [`http`] -- [`HttpBackend`], the real reqwest client
//! - [`fake`] -- [`FakeBackend`], an in-process stand-in for tests and demos
//!
//! All authenticated calls take the bearer token explicitly; the API layer
//! holds no session state of its own.

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;

pub mod fake;
pub mod http;
pub mod types;

pub use fake::FakeBackend;
pub use http::HttpBackend;
pub use types::{
    AnalysisResult, Priority, ProfileUpdate, Reminder, ReminderCreate, ReminderUpdate,
    SchedulingSuggestion, SourceType, TokenResponse, UserProfile,
};

/// Contract the client requires from the reminder backend
#[async_trait]
pub trait BackendApi: Send + Sync {
    // -- auth ---------------------------------------------------------------

    /// `POST /auth/login`
    async fn login(&self, email: &str, password: &str) -> Result<TokenResponse>;

    /// `POST /auth/request-login-otp`
    async fn request_login_otp(&self, email: &str) -> Result<()>;

    /// `POST /auth/login-with-otp`
    async fn login_with_otp(&self, email: &str, otp: &str) -> Result<TokenResponse>;

    /// `POST /auth/register`
    async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<UserProfile>;

    /// `POST /auth/request-registration-otp`
    async fn request_registration_otp(&self, email: &str) -> Result<()>;

    /// `POST /auth/register-with-otp`
    async fn register_with_otp(
        &self,
        email: &str,
        otp: &str,
        full_name: Option<&str>,
        password: Option<&str>,
    ) -> Result<TokenResponse>;

    /// `GET /auth/me`
    async fn current_user(&self, token: &str) -> Result<UserProfile>;

    /// `PUT /auth/me`
    async fn update_profile(&self, token: &str, update: &ProfileUpdate) -> Result<UserProfile>;

    // -- reminders ------------------------------------------------------------

    /// `GET /reminders`
    async fn list_reminders(&self, token: &str) -> Result<Vec<Reminder>>;

    /// `GET /reminders/upcoming`
    async fn upcoming_reminders(&self, token: &str) -> Result<Vec<Reminder>>;

    /// `GET /reminders/{id}`
    async fn get_reminder(&self, token: &str, id: i64) -> Result<Reminder>;

    /// `POST /reminders`
    async fn create_reminder(&self, token: &str, reminder: &ReminderCreate) -> Result<Reminder>;

    /// `PUT /reminders/{id}`
    async fn update_reminder(
        &self,
        token: &str,
        id: i64,
        update: &ReminderUpdate,
    ) -> Result<Reminder>;

    /// `DELETE /reminders/{id}`
    async fn delete_reminder(&self, token: &str, id: i64) -> Result<()>;

    /// `POST /reminders/{id}/complete`
    async fn complete_reminder(&self, token: &str, id: i64) -> Result<Reminder>;

    /// `POST /reminders/{id}/uncomplete`
    async fn uncomplete_reminder(&self, token: &str, id: i64) -> Result<Reminder>;

    // -- analysis -------------------------------------------------------------

    /// `POST /analyze/text`
    async fn analyze_text(&self, token: &str, text: &str) -> Result<AnalysisResult>;

    /// `POST /analyze/voice`
    async fn analyze_voice(&self, token: &str, audio: &Path) -> Result<AnalysisResult>;

    /// `POST /analyze/image`
    async fn analyze_image(&self, token: &str, image: &Path) -> Result<AnalysisResult>;
}
