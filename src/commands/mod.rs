/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `auth`     : login, registration, one-time codes and logout
- `profile`  : show and update the logged-in user
- `reminders`: list, show, add, edit, delete and complete reminders
- `analyze`  : one-shot analysis and the interactive composer
- `watch`    : live countdowns with due alerts

Every handler receives an [`AppContext`] and enters a route first, so that
protected commands fail with a login hint when no session exists.
*/

use rustyline::completion::Completer;
use rustyline::config::Configurer;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{ColorMode, DefaultEditor, Editor, Helper};
use std::borrow::Cow;
use std::sync::Arc;

use crate::api::{BackendApi, HttpBackend};
use crate::config::Config;
use crate::error::{RemindrError, Result};
use crate::notice::Notice;
use crate::reminders::{ReminderStore, SharedReminderStore};
use crate::router::{self, Route};
use crate::session::{store, SessionPersistence, SessionState};

pub mod analyze;
pub mod reminders;
pub mod watch;

/// State shared by every command handler
pub struct AppContext {
    pub config: Config,
    pub session: SessionState,
    pub reminders: SharedReminderStore,
}

impl AppContext {
    /// Wire the context from explicit parts
    pub fn new(
        config: Config,
        api: Arc<dyn BackendApi>,
        persistence: Arc<dyn SessionPersistence>,
    ) -> Self {
        let session = SessionState::new(Arc::clone(&api), persistence);
        let reminders = ReminderStore::new(api).shared();
        Self {
            config,
            session,
            reminders,
        }
    }

    /// Build the HTTP backend and session storage named by `config`
    pub fn from_config(config: Config) -> Result<Self> {
        let api: Arc<dyn BackendApi> = Arc::new(HttpBackend::new(&config.api)?);
        let persistence = store::open(&config.session)?;
        Ok(Self::new(config, api, persistence))
    }

    /// Restore the session and apply the route guard.
    ///
    /// Returns `Ok(false)` when an auth route was redirected because a
    /// session is already active.
    ///
    /// # Errors
    ///
    /// Returns [`RemindrError::NotAuthenticated`] for a protected route
    /// without a session.
    pub async fn enter(&self, route: Route) -> Result<bool> {
        if let Err(e) = self.session.hydrate().await {
            if route.is_protected() {
                return Err(e);
            }
            tracing::warn!("Could not restore session: {}", e);
        }

        let resolved = router::resolve(route, self.session.is_authenticated());
        tracing::debug!("Route {} resolved to {}", route, resolved);
        match resolved {
            Route::Login if route.is_protected() => Err(RemindrError::NotAuthenticated.into()),
            Route::Dashboard if route.is_auth() => {
                let name = self
                    .session
                    .user()
                    .map(|u| u.display_name().to_string())
                    .unwrap_or_default();
                Notice::info(format!(
                    "Already logged in as {}. Run `remindr logout` to switch accounts.",
                    name
                ))
                .print();
                Ok(false)
            }
            _ => Ok(true),
        }
    }
}

/// Read one line, using `value` when it was already supplied
pub(crate) fn prompt_if_missing(value: Option<String>, label: &str) -> Result<String> {
    if let Some(value) = value {
        return Ok(value);
    }
    let mut rl = DefaultEditor::new()?;
    let line = rl.readline(&format!("{}: ", label))?;
    Ok(line.trim().to_string())
}

/// Hides typed characters by redrawing the line as `*`
struct PasswordMask;

impl Highlighter for PasswordMask {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        Cow::Owned("*".repeat(line.chars().count()))
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Completer for PasswordMask {
    type Candidate = String;
}

impl Hinter for PasswordMask {
    type Hint = String;
}

impl Validator for PasswordMask {}

impl Helper for PasswordMask {}

/// Read a password without echoing it, using `value` when already supplied
pub(crate) fn prompt_password_if_missing(value: Option<String>, label: &str) -> Result<String> {
    if let Some(value) = value {
        return Ok(value);
    }
    let mut rl: Editor<PasswordMask, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(PasswordMask));
    rl.set_color_mode(ColorMode::Forced);
    rl.set_auto_add_history(false);
    let line = rl.readline(&format!("{}: ", label))?;
    Ok(line)
}

/// Parse an optional priority argument, falling back to the configured default
pub(crate) fn parse_priority(
    value: Option<&str>,
    config: &Config,
) -> Result<crate::api::types::Priority> {
    match value {
        Some(p) => Ok(p.parse()?),
        None => Ok(config.analysis.default_priority),
    }
}

/// Auth commands
pub mod auth {
    use super::*;
    use colored::Colorize;

    /// Password login
    pub async fn login(
        ctx: &AppContext,
        email: Option<String>,
        password: Option<String>,
    ) -> Result<()> {
        if !ctx.enter(Route::Login).await? {
            return Ok(());
        }
        let email = prompt_if_missing(email, "Email")?;
        let password = prompt_password_if_missing(password, "Password")?;
        let user = ctx.session.login(&email, &password).await?;
        Notice::success(format!("Welcome back, {}", user.display_name())).print();
        Ok(())
    }

    /// Email a one-time code for login or registration
    pub async fn request_otp(ctx: &AppContext, email: Option<String>, register: bool) -> Result<()> {
        let route = if register {
            Route::Register
        } else {
            Route::Login
        };
        if !ctx.enter(route).await? {
            return Ok(());
        }
        let email = prompt_if_missing(email, "Email")?;
        if register {
            ctx.session.request_registration_otp(&email).await?;
        } else {
            ctx.session.request_login_otp(&email).await?;
        }
        let next = if register {
            "remindr register-otp"
        } else {
            "remindr login-otp"
        };
        Notice::success(format!(
            "Code sent to {}. Continue with {}",
            email.trim(),
            next.cyan()
        ))
        .print();
        Ok(())
    }

    /// Login with a one-time code
    pub async fn login_otp(
        ctx: &AppContext,
        email: Option<String>,
        otp: Option<String>,
    ) -> Result<()> {
        if !ctx.enter(Route::Login).await? {
            return Ok(());
        }
        let email = prompt_if_missing(email, "Email")?;
        let otp = prompt_if_missing(otp, "Code")?;
        let user = ctx.session.login_with_otp(&email, &otp).await?;
        Notice::success(format!("Welcome back, {}", user.display_name())).print();
        Ok(())
    }

    /// Password registration
    pub async fn register(
        ctx: &AppContext,
        email: Option<String>,
        password: Option<String>,
        name: Option<String>,
    ) -> Result<()> {
        if !ctx.enter(Route::Register).await? {
            return Ok(());
        }
        let email = prompt_if_missing(email, "Email")?;
        let password = prompt_password_if_missing(password, "Password")?;
        let user = ctx
            .session
            .register(&email, &password, name.as_deref())
            .await?;
        Notice::success(format!("Account created. Welcome, {}", user.display_name())).print();
        Ok(())
    }

    /// Registration with a one-time code
    pub async fn register_otp(
        ctx: &AppContext,
        email: Option<String>,
        otp: Option<String>,
        name: Option<String>,
        password: Option<String>,
    ) -> Result<()> {
        if !ctx.enter(Route::Register).await? {
            return Ok(());
        }
        let email = prompt_if_missing(email, "Email")?;
        let otp = prompt_if_missing(otp, "Code")?;
        let user = ctx
            .session
            .register_with_otp(&email, &otp, name.as_deref(), password.as_deref())
            .await?;
        Notice::success(format!("Account created. Welcome, {}", user.display_name())).print();
        Ok(())
    }

    /// Clear the stored session
    pub async fn logout(ctx: &AppContext) -> Result<()> {
        ctx.session.logout()?;
        ctx.reminders.lock().await.clear();
        Notice::success("Logged out").print();
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::api::FakeBackend;
        use crate::session::MemorySessionStore;

        fn context(backend: &FakeBackend, store: &MemorySessionStore) -> AppContext {
            AppContext::new(
                Config::default(),
                Arc::new(backend.clone()),
                Arc::new(store.clone()),
            )
        }

        #[tokio::test]
        async fn test_login_with_arguments_persists_session() {
            let backend = FakeBackend::new();
            backend.add_user("ada@example.com", "secret1", None);
            let store = MemorySessionStore::new();
            let ctx = context(&backend, &store);

            login(
                &ctx,
                Some("ada@example.com".into()),
                Some("secret1".into()),
            )
            .await
            .unwrap();
            assert!(store.snapshot().is_some());
        }

        #[tokio::test]
        async fn test_login_when_logged_in_is_redirected() {
            let backend = FakeBackend::new();
            backend.add_user("ada@example.com", "secret1", None);
            let store = MemorySessionStore::new();
            let ctx = context(&backend, &store);
            ctx.session.login("ada@example.com", "secret1").await.unwrap();

            let before = backend.count_calls("POST /auth/login");
            login(&ctx, Some("ada@example.com".into()), Some("secret1".into()))
                .await
                .unwrap();
            assert_eq!(backend.count_calls("POST /auth/login"), before);
        }

        #[tokio::test]
        async fn test_logout_then_protected_route_fails() {
            let backend = FakeBackend::new();
            backend.add_user("ada@example.com", "secret1", None);
            let store = MemorySessionStore::new();
            let ctx = context(&backend, &store);
            ctx.session.login("ada@example.com", "secret1").await.unwrap();

            logout(&ctx).await.unwrap();
            assert!(store.snapshot().is_none());
            let err = ctx.enter(Route::Dashboard).await.unwrap_err();
            assert!(matches!(
                err.downcast_ref::<RemindrError>(),
                Some(RemindrError::NotAuthenticated)
            ));
        }
    }
}

/// Profile commands
pub mod profile {
    use super::*;
    use crate::api::types::ProfileUpdate;
    use colored::Colorize;

    /// Print the logged-in user
    pub async fn whoami(ctx: &AppContext, json: bool) -> Result<()> {
        ctx.enter(Route::Settings).await?;
        let user = ctx.session.refresh_profile().await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&user)?);
            return Ok(());
        }
        println!("{} {}", "Name:".bold(), user.display_name());
        println!("{} {}", "Email:".bold(), user.email);
        println!("{} {}", "User id:".bold(), user.id);
        println!(
            "{} {}",
            "Member since:".bold(),
            user.created_at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d")
        );
        Ok(())
    }

    /// Change display name and/or email
    pub async fn update(ctx: &AppContext, name: Option<String>, email: Option<String>) -> Result<()> {
        ctx.enter(Route::Settings).await?;
        let user = ctx
            .session
            .update_profile(ProfileUpdate {
                full_name: name,
                email,
            })
            .await?;
        Notice::success(format!("Profile updated for {}", user.display_name())).print();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_mask_hides_every_character() {
        let mask = PasswordMask;
        assert_eq!(mask.highlight("secret1", 7), "*******");
        assert_eq!(mask.highlight("pässwörd", 0), "********");
        assert_eq!(mask.highlight("", 0), "");
        assert!(mask.highlight_char("s", 1, false));
    }
}
