//! Reminder management commands
//!
//! All of these live on the dashboard route and therefore need a session.

use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use prettytable::{format, row, Table};

use super::AppContext;
use crate::analysis::combine_schedule;
use crate::api::types::{parse_date, parse_time, Reminder, ReminderCreate, ReminderUpdate};
use crate::error::{RemindrError, Result};
use crate::notice::Notice;
use crate::reminders::countdown::format_countdown;
use crate::reminders::filter::{self, ReminderFilter, SortKey};
use crate::router::Route;

/// Changes requested by `remindr edit`
#[derive(Debug, Clone, Default)]
pub struct EditArgs {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub important: Option<bool>,
}

fn parse_date_arg(value: Option<&str>) -> Result<Option<chrono::NaiveDate>> {
    value
        .map(|d| {
            parse_date(d).ok_or_else(|| {
                RemindrError::Validation(format!("'{}' is not a date (expected YYYY-MM-DD)", d))
                    .into()
            })
        })
        .transpose()
}

fn parse_time_arg(value: Option<&str>) -> Result<Option<chrono::NaiveTime>> {
    value
        .map(|t| {
            parse_time(t).ok_or_else(|| {
                RemindrError::Validation(format!("'{}' is not a time (expected HH:MM)", t)).into()
            })
        })
        .transpose()
}

fn local(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn status(reminder: &Reminder, now: DateTime<Utc>) -> String {
    if reminder.is_completed {
        "done".green().to_string()
    } else {
        let countdown = format_countdown(now, reminder.scheduled_for);
        if reminder.scheduled_for <= now {
            countdown.red().bold().to_string()
        } else {
            countdown
        }
    }
}

fn print_table(reminders: &[Reminder], now: DateTime<Utc>) {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(row![
        "ID".bold(),
        "Title".bold(),
        "When".bold(),
        "Status".bold(),
        "!".bold()
    ]);

    for reminder in reminders {
        let title = if reminder.title.chars().count() > 40 {
            format!("{}...", reminder.title.chars().take(37).collect::<String>())
        } else {
            reminder.title.clone()
        };
        let flag = if reminder.is_important {
            "!".yellow().bold().to_string()
        } else {
            String::new()
        };
        table.add_row(row![
            reminder.id.to_string().cyan(),
            title,
            local(reminder.scheduled_for),
            status(reminder, now),
            flag
        ]);
    }
    table.printstd();
}

fn print_list(reminders: &[Reminder], json: bool, empty: &str) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(reminders)?);
    } else if reminders.is_empty() {
        println!("{}", empty.yellow());
    } else {
        print_table(reminders, Utc::now());
    }
    Ok(())
}

fn print_reminder(reminder: &Reminder) {
    let now = Utc::now();
    println!("{} {}", format!("#{}", reminder.id).cyan(), reminder.title.bold());
    if let Some(description) = &reminder.description {
        println!("  {}", description);
    }
    println!("  {} {}", "When:".bold(), local(reminder.scheduled_for));
    println!("  {} {}", "Status:".bold(), status(reminder, now));
    if reminder.is_important {
        println!("  {} yes", "Important:".bold());
    }
    if let Some(source) = reminder.source_type {
        println!("  {} {}", "Source:".bold(), source);
    }
    if let Some(text) = &reminder.original_text {
        println!("  {} {}", "Original text:".bold(), text.dimmed());
    }
    if let Some(score) = reminder.confidence_score {
        println!("  {} {:.0}%", "Confidence:".bold(), score * 100.0);
    }
    if let Some(url) = &reminder.image_url {
        println!("  {} {}", "Image:".bold(), url);
    }
}

/// `remindr list`
pub async fn list(ctx: &AppContext, filter: &str, sort: &str, json: bool) -> Result<()> {
    let filter: ReminderFilter = filter.parse()?;
    let sort: SortKey = sort.parse()?;
    ctx.enter(Route::Dashboard).await?;
    let token = ctx.session.token()?;

    let mut store = ctx.reminders.lock().await;
    store.refresh(&token).await?;
    let shown = filter::apply(store.reminders(), filter, sort, Utc::now());
    tracing::debug!("Showing {} reminders ({}, by {})", shown.len(), filter, sort);
    print_list(&shown, json, "No reminders found.")
}

/// `remindr upcoming`
pub async fn upcoming(ctx: &AppContext, json: bool) -> Result<()> {
    ctx.enter(Route::Dashboard).await?;
    let token = ctx.session.token()?;
    let upcoming = ctx.reminders.lock().await.upcoming(&token).await?;
    print_list(&upcoming, json, "Nothing coming up.")
}

/// `remindr show`
pub async fn show(ctx: &AppContext, id: i64, json: bool) -> Result<()> {
    ctx.enter(Route::Dashboard).await?;
    let token = ctx.session.token()?;
    let reminder = ctx.reminders.lock().await.fetch(&token, id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&reminder)?);
    } else {
        print_reminder(&reminder);
    }
    Ok(())
}

/// `remindr add`
pub async fn add(
    ctx: &AppContext,
    title: String,
    date: Option<String>,
    time: Option<String>,
    description: Option<String>,
    important: bool,
) -> Result<()> {
    let date = parse_date_arg(date.as_deref())?;
    let time = parse_time_arg(time.as_deref())?;
    if date.is_none() && time.is_none() {
        return Err(RemindrError::Validation(
            "Give a --date, a --time or both".to_string(),
        )
        .into());
    }
    ctx.enter(Route::Dashboard).await?;
    let token = ctx.session.token()?;

    let mut create = ReminderCreate::new(title.trim(), combine_schedule(date, time, &Local::now()));
    create.description = description.filter(|d| !d.trim().is_empty());
    create.is_important = important;

    let created = ctx.reminders.lock().await.create(&token, &create).await?;
    Notice::success(format!(
        "Created #{} '{}' for {}",
        created.id,
        created.title,
        local(created.scheduled_for)
    ))
    .print();
    Ok(())
}

/// `remindr edit`
pub async fn edit(ctx: &AppContext, id: i64, args: EditArgs) -> Result<()> {
    let date = parse_date_arg(args.date.as_deref())?;
    let time = parse_time_arg(args.time.as_deref())?;
    ctx.enter(Route::Dashboard).await?;
    let token = ctx.session.token()?;

    let mut store = ctx.reminders.lock().await;
    let scheduled_for = if date.is_some() || time.is_some() {
        let current = store.fetch(&token, id).await?;
        Some(combine_schedule(
            date,
            time,
            &current.scheduled_for.with_timezone(&Local),
        ))
    } else {
        None
    };

    let update = ReminderUpdate {
        title: args.title.map(|t| t.trim().to_string()),
        description: args.description,
        scheduled_for,
        is_important: args.important,
        ..Default::default()
    };
    let updated = store.update(&token, id, &update).await?;
    Notice::success(format!("Updated #{} '{}'", updated.id, updated.title)).print();
    Ok(())
}

/// `remindr delete`
pub async fn delete(ctx: &AppContext, id: i64) -> Result<()> {
    ctx.enter(Route::Dashboard).await?;
    let token = ctx.session.token()?;
    ctx.reminders.lock().await.delete(&token, id).await?;
    Notice::success(format!("Deleted #{}", id)).print();
    Ok(())
}

/// `remindr complete` / `remindr uncomplete`
pub async fn set_completed(ctx: &AppContext, id: i64, done: bool) -> Result<()> {
    ctx.enter(Route::Dashboard).await?;
    let token = ctx.session.token()?;
    let reminder = ctx
        .reminders
        .lock()
        .await
        .set_completed(&token, id, done)
        .await?;
    let state = if done { "done" } else { "open" };
    Notice::success(format!("Marked #{} '{}' {}", reminder.id, reminder.title, state)).print();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FakeBackend;
    use crate::config::Config;
    use crate::session::MemorySessionStore;
    use std::sync::Arc;

    async fn logged_in() -> (FakeBackend, AppContext) {
        let backend = FakeBackend::new();
        backend.add_user("ada@example.com", "secret1", None);
        let ctx = AppContext::new(
            Config::default(),
            Arc::new(backend.clone()),
            Arc::new(MemorySessionStore::new()),
        );
        ctx.session.login("ada@example.com", "secret1").await.unwrap();
        (backend, ctx)
    }

    #[tokio::test]
    async fn test_add_requires_date_or_time() {
        let (backend, ctx) = logged_in().await;
        let result = add(&ctx, "Nap".into(), None, None, None, false).await;
        assert!(result.is_err());
        assert_eq!(backend.count_calls("POST /reminders"), 0);
    }

    #[tokio::test]
    async fn test_add_rejects_bad_date() {
        let (_backend, ctx) = logged_in().await;
        let err = add(&ctx, "Nap".into(), Some("tomorrow".into()), None, None, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("tomorrow"));
    }

    #[tokio::test]
    async fn test_add_then_edit_keeps_time_when_only_date_changes() {
        let (backend, ctx) = logged_in().await;
        add(
            &ctx,
            "Dentist".into(),
            Some("2030-05-01".into()),
            Some("09:30".into()),
            Some("bring card".into()),
            true,
        )
        .await
        .unwrap();
        let created = backend.reminders_of("ada@example.com").remove(0);
        assert!(created.is_important);
        assert_eq!(created.description.as_deref(), Some("bring card"));

        edit(
            &ctx,
            created.id,
            EditArgs {
                date: Some("2030-05-02".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let edited = backend.reminders_of("ada@example.com").remove(0);
        assert_eq!(
            edited.scheduled_for - created.scheduled_for,
            chrono::Duration::days(1)
        );
    }

    #[tokio::test]
    async fn test_list_rejects_unknown_filter_before_network() {
        let (backend, ctx) = logged_in().await;
        let before = backend.calls().len();
        assert!(list(&ctx, "someday", "date", false).await.is_err());
        assert_eq!(backend.calls().len(), before);
    }

    #[tokio::test]
    async fn test_complete_and_delete() {
        let (backend, ctx) = logged_in().await;
        add(&ctx, "Trash".into(), None, Some("20:00".into()), None, false)
            .await
            .unwrap();
        let id = backend.reminders_of("ada@example.com")[0].id;

        set_completed(&ctx, id, true).await.unwrap();
        assert!(backend.reminders_of("ada@example.com")[0].is_completed);
        delete(&ctx, id).await.unwrap();
        assert!(backend.reminders_of("ada@example.com").is_empty());
    }
}
