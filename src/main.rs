//! Remindr - reminders from voice, text and images
//!
#![doc = "Remindr - reminders from voice, text and images"]
#![doc = "Main entry point for the Remindr command-line client."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use remindr::cli::{Cli, Commands};
use remindr::commands::{self, AppContext};
use remindr::config::Config;
use remindr::notice::Notice;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration; the output format is not known yet, so warnings
    // go through a plain stderr subscriber
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = tracing::subscriber::with_default(bootstrap_subscriber(cli.verbose), || {
        Config::load(config_path, &cli)
    })?;

    // Initialize tracing
    init_tracing(cli.verbose, config.logging.json);

    // Validate configuration
    config.validate()?;

    let ctx = AppContext::from_config(config)?;
    if let Err(e) = dispatch(&ctx, cli.command).await {
        tracing::debug!("Command failed: {:#}", e);
        ctx.session.expire_if_unauthorized(&e);
        Notice::from_error(&e).print();
        std::process::exit(1);
    }
    Ok(())
}

async fn dispatch(ctx: &AppContext, command: Commands) -> Result<()> {
    match command {
        Commands::Login { email, password } => {
            tracing::info!("Starting password login");
            commands::auth::login(ctx, email, password).await
        }
        Commands::RequestOtp { email, register } => {
            tracing::info!("Requesting one-time code");
            commands::auth::request_otp(ctx, email, register).await
        }
        Commands::LoginOtp { email, otp } => {
            tracing::info!("Starting one-time code login");
            commands::auth::login_otp(ctx, email, otp).await
        }
        Commands::Register {
            email,
            password,
            name,
        } => {
            tracing::info!("Starting registration");
            commands::auth::register(ctx, email, password, name).await
        }
        Commands::RegisterOtp {
            email,
            otp,
            name,
            password,
        } => {
            tracing::info!("Starting one-time code registration");
            commands::auth::register_otp(ctx, email, otp, name, password).await
        }
        Commands::Logout => commands::auth::logout(ctx).await,
        Commands::Whoami { json } => commands::profile::whoami(ctx, json).await,
        Commands::Profile { name, email } => {
            tracing::info!("Updating profile");
            commands::profile::update(ctx, name, email).await
        }
        Commands::List { filter, sort, json } => {
            commands::reminders::list(ctx, &filter, &sort, json).await
        }
        Commands::Upcoming { json } => commands::reminders::upcoming(ctx, json).await,
        Commands::Show { id, json } => commands::reminders::show(ctx, id, json).await,
        Commands::Add {
            title,
            date,
            time,
            description,
            important,
        } => commands::reminders::add(ctx, title, date, time, description, important).await,
        Commands::Edit {
            id,
            title,
            description,
            date,
            time,
            important,
            not_important,
        } => {
            let important = match (important, not_important) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            let args = commands::reminders::EditArgs {
                title,
                description,
                date,
                time,
                important,
            };
            commands::reminders::edit(ctx, id, args).await
        }
        Commands::Delete { id } => commands::reminders::delete(ctx, id).await,
        Commands::Complete { id } => commands::reminders::set_completed(ctx, id, true).await,
        Commands::Uncomplete { id } => commands::reminders::set_completed(ctx, id, false).await,
        Commands::Analyze { command } => {
            tracing::info!("Starting analysis");
            commands::analyze::run(ctx, command).await
        }
        Commands::Compose { priority } => {
            tracing::info!("Starting interactive composer");
            commands::analyze::compose(ctx, priority).await
        }
        Commands::Watch => commands::watch::run(ctx).await,
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    let default = if verbose { "remindr=debug" } else { "remindr=info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Text subscriber used while the configuration is loading
fn bootstrap_subscriber(verbose: bool) -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .finish()
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool, json: bool) {
    let registry = tracing_subscriber::registry().with(env_filter(verbose));
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
