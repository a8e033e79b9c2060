//! `remindr watch`: live countdowns with one-time due alerts

use colored::Colorize;
use std::sync::Arc;

use super::AppContext;
use crate::error::Result;
use crate::reminders::countdown::{AlertMonitor, TickReport};
use crate::reminders::TerminalNotifier;
use crate::router::Route;

fn render(report: &TickReport, fired: &[String]) {
    // Redraw in place: clear screen, cursor home
    print!("\x1b[2J\x1b[H");
    println!("{}", "Upcoming reminders (Ctrl-C to stop)".bold());
    if report.countdowns.is_empty() {
        println!("{}", "Nothing open.".yellow());
    }
    for line in &report.countdowns {
        let countdown = if line.countdown == crate::reminders::countdown::DUE_LABEL {
            line.countdown.red().bold().to_string()
        } else {
            line.countdown.clone()
        };
        println!("  {:>5}  {:<40}  {}", line.id.to_string().cyan(), line.title, countdown);
    }
    if !fired.is_empty() {
        println!();
        println!("{}", "Alerted:".red().bold());
        for title in fired {
            println!("  {}", title);
        }
    }
}

/// Refresh the list once, then tick until Ctrl-C
pub async fn run(ctx: &AppContext) -> Result<()> {
    ctx.enter(Route::Dashboard).await?;
    let token = ctx.session.token()?;
    ctx.reminders.lock().await.refresh(&token).await?;

    let alerts = &ctx.config.alerts;
    let notifier = Arc::new(TerminalNotifier::new(alerts.enabled, alerts.bell));
    let monitor = AlertMonitor::new(ctx.reminders.clone(), notifier, alerts.tick());

    tracing::info!("Watching reminders");
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };
    let mut fired: Vec<String> = Vec::new();
    monitor
        .run_until(shutdown, |report| {
            fired.extend(report.alerted.iter().map(|r| r.title.clone()));
            render(report, &fired);
        })
        .await;
    Ok(())
}
