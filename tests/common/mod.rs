use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use remindr::api::types::RawSuggestion;
use remindr::api::FakeBackend;
use remindr::reminders::{ReminderStore, SharedReminderStore};
use remindr::session::{MemorySessionStore, SessionState};

#[allow(dead_code)]
pub const EMAIL: &str = "ada@example.com";
#[allow(dead_code)]
pub const PASSWORD: &str = "secret1";

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// A fake backend with one registered user and a session logged in as them
#[allow(dead_code)]
pub async fn logged_in() -> (FakeBackend, SessionState, SharedReminderStore) {
    let backend = FakeBackend::new();
    backend.add_user(EMAIL, PASSWORD, Some("Ada"));
    let session = SessionState::new(
        Arc::new(backend.clone()),
        Arc::new(MemorySessionStore::new()),
    );
    session
        .login(EMAIL, PASSWORD)
        .await
        .expect("login against fake backend");
    let store = ReminderStore::new(session.api()).shared();
    (backend, session, store)
}

/// Suggestion for tomorrow at 09:00 with the given confidence
#[allow(dead_code)]
pub fn suggestion(title: &str, confidence: f64) -> RawSuggestion {
    let tomorrow = chrono::Local::now().date_naive() + chrono::Duration::days(1);
    RawSuggestion {
        detected_date: Some(tomorrow.format("%Y-%m-%d").to_string()),
        detected_time: Some("09:00".to_string()),
        suggested_title: Some(title.to_string()),
        confidence: Some(confidence),
    }
}
