//! Analysis commands
//!
//! `analyze` sends one piece of input to the backend and prints what it
//! found. `compose` is the interactive counterpart: every line typed updates
//! the buffer of the debounced workflow, which creates (and then keeps
//! updating) a reminder once the backend is confident about the schedule.

use chrono::Local;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::Path;

use super::{parse_priority, AppContext};
use crate::analysis::{
    self, reminder_from_suggestion, AnalysisEvent, AnalysisHandle, AnalysisOptions,
};
use crate::api::types::{AnalysisResult, Priority, SourceType};
use crate::cli::{AnalyzeCommand, SaveArgs};
use crate::error::{RemindrError, Result};
use crate::notice::Notice;
use crate::router::Route;

fn print_result(result: &AnalysisResult, threshold: f64) {
    println!("{}", "Detected text:".bold());
    println!("  {}", result.text);

    match &result.suggestion {
        Some(s) => {
            println!("{}", "Scheduling suggestion:".bold());
            if let Some(title) = &s.suggested_title {
                println!("  Title:      {}", title);
            }
            if let Some(date) = s.detected_date {
                println!("  Date:       {}", date);
            }
            if let Some(time) = s.detected_time {
                println!("  Time:       {}", time.format("%H:%M"));
            }
            let confidence = format!("{:.0}%", s.confidence * 100.0);
            if s.exceeds(threshold) {
                println!("  Confidence: {}", confidence.green());
            } else {
                println!("  Confidence: {} (too low to schedule)", confidence.yellow());
            }
        }
        None => println!("{}", "No date or time detected.".yellow()),
    }
}

fn check_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(RemindrError::Validation(format!("{} is not a file", path.display())).into());
    }
    Ok(())
}

/// `remindr analyze {text|voice|image}`
pub async fn run(ctx: &AppContext, command: AnalyzeCommand) -> Result<()> {
    ctx.enter(Route::Dashboard).await?;
    let token = ctx.session.token()?;
    let api = ctx.session.api();

    let (result, source, save) = match command {
        AnalyzeCommand::Text { text, save } => {
            if text.trim().is_empty() {
                return Err(RemindrError::Validation("Text cannot be empty".to_string()).into());
            }
            tracing::info!("Analyzing {} characters of text", text.chars().count());
            (api.analyze_text(&token, &text).await?, SourceType::Text, save)
        }
        AnalyzeCommand::Voice { file, save } => {
            check_file(&file)?;
            tracing::info!("Analyzing recording {}", file.display());
            (api.analyze_voice(&token, &file).await?, SourceType::Voice, save)
        }
        AnalyzeCommand::Image { file, save } => {
            check_file(&file)?;
            tracing::info!("Analyzing image {}", file.display());
            (api.analyze_image(&token, &file).await?, SourceType::Image, save)
        }
    };

    save_result(ctx, &token, result, source, save).await
}

async fn save_result(
    ctx: &AppContext,
    token: &str,
    result: AnalysisResult,
    source: SourceType,
    args: SaveArgs,
) -> Result<()> {
    let threshold = ctx.config.analysis.confidence_threshold;
    let priority = parse_priority(args.priority.as_deref(), &ctx.config)?;

    let accepted = result
        .suggestion
        .as_ref()
        .filter(|s| s.exceeds(threshold))
        .map(|s| reminder_from_suggestion(s, &result.text, source, priority, &Local::now()));

    let created = match (&accepted, args.save) {
        (Some(create), true) => Some(ctx.reminders.lock().await.create(token, create).await?),
        _ => None,
    };

    if args.json {
        let body = serde_json::json!({
            "text": result.text,
            "analysis": result.analysis,
            "suggestion": result.suggestion.as_ref().map(|s| serde_json::json!({
                "detected_date": s.detected_date,
                "detected_time": s.detected_time,
                "suggested_title": s.suggested_title,
                "confidence": s.confidence,
            })),
            "reminder": created,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    print_result(&result, threshold);
    match (created, accepted, args.save) {
        (Some(reminder), _, _) => {
            Notice::success(format!("Created reminder #{} '{}'", reminder.id, reminder.title))
                .print()
        }
        (None, Some(_), false) => {
            Notice::info("Run again with --save to create this reminder").print()
        }
        (None, None, true) => {
            Notice::warning("Not confident enough to schedule; nothing was saved").print()
        }
        _ => {}
    }
    Ok(())
}

/// Print one workflow event; returns false once the task has stopped
fn render_event(event: Option<AnalysisEvent>) -> bool {
    match event {
        None => return false,
        Some(AnalysisEvent::Busy) => println!("{}", "analyzing...".dimmed()),
        Some(AnalysisEvent::Idle) => {}
        Some(AnalysisEvent::Analyzed(result)) => {
            if let Some(s) = &result.suggestion {
                tracing::debug!("Suggestion confidence {:.2}", s.confidence);
            }
        }
        Some(AnalysisEvent::Created(r)) => Notice::success(format!(
            "Scheduled #{} '{}' for {}",
            r.id,
            r.title,
            r.scheduled_for.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        ))
        .print(),
        Some(AnalysisEvent::Updated(r)) => Notice::success(format!(
            "Rescheduled #{} '{}' for {}",
            r.id,
            r.title,
            r.scheduled_for.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        ))
        .print(),
        Some(AnalysisEvent::BelowThreshold { confidence }) => {
            let msg = match confidence {
                Some(c) => format!("No clear schedule yet ({:.0}% confident)", c * 100.0),
                None => "No date or time detected yet".to_string(),
            };
            println!("{}", msg.dimmed());
        }
        Some(AnalysisEvent::Notice(notice)) => notice.print(),
    }
    true
}

fn drain(handle: &mut AnalysisHandle) {
    while let Some(event) = handle.try_next_event() {
        render_event(Some(event));
    }
}

fn print_compose_help() {
    println!("{}", "Type your reminder. Each line is added to the text.".bold());
    println!("  {}  analyze now", "/now".cyan());
    println!("  {}  start a new reminder", "/new".cyan());
    println!("  {}  show the current text", "/show".cyan());
    println!("  {}  set priority (low, medium, high)", "/priority <p>".cyan());
    println!("  {}  leave", "/quit".cyan());
}

/// `remindr compose`
pub async fn compose(ctx: &AppContext, priority: Option<String>) -> Result<()> {
    ctx.enter(Route::Dashboard).await?;
    let mut options = AnalysisOptions::from(&ctx.config.analysis);
    options.priority = parse_priority(priority.as_deref(), &ctx.config)?;
    let mut handle = analysis::spawn(ctx.session.clone(), ctx.reminders.clone(), options);

    // The line editor blocks, so it runs on its own thread and feeds lines back
    let (line_tx, mut line_rx) = tokio::sync::mpsc::unbounded_channel::<Option<String>>();
    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                tracing::error!("Could not start line editor: {}", e);
                let _ = line_tx.send(None);
                return;
            }
        };
        loop {
            match rl.readline("> ") {
                Ok(line) => {
                    let _ = rl.add_history_entry(line.as_str());
                    let quit = line.trim() == "/quit";
                    if line_tx.send(Some(line)).is_err() || quit {
                        return;
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    let _ = line_tx.send(None);
                    return;
                }
                Err(e) => {
                    tracing::warn!("Line editor failed: {}", e);
                    let _ = line_tx.send(None);
                    return;
                }
            }
        }
    });

    print_compose_help();
    let mut buffer = String::new();
    loop {
        tokio::select! {
            line = line_rx.recv() => {
                let Some(Some(line)) = line else { break };
                let trimmed = line.trim();
                match trimmed {
                    "/quit" => break,
                    "/now" => handle.analyze_now()?,
                    "/show" => println!("{}", buffer.dimmed()),
                    "/help" => print_compose_help(),
                    "/new" => {
                        buffer.clear();
                        handle.reset()?;
                        println!("{}", "Started a new reminder".dimmed());
                    }
                    _ if trimmed.starts_with("/priority") => {
                        let value = trimmed.trim_start_matches("/priority").trim();
                        match value.parse::<Priority>() {
                            Ok(p) => {
                                handle.set_priority(p)?;
                                println!("{}", format!("Priority set to {}", p).dimmed());
                            }
                            Err(e) => Notice::error(RemindrError::user_message(&e)).print(),
                        }
                    }
                    "" => {}
                    _ => {
                        if !buffer.is_empty() {
                            buffer.push('\n');
                        }
                        buffer.push_str(&line);
                        handle.edit(buffer.clone())?;
                    }
                }
            }
            event = handle.next_event() => {
                if !render_event(event) {
                    break;
                }
            }
        }
    }

    drain(&mut handle);
    handle.shutdown().await;
    Ok(())
}
