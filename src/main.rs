//! Surebet Alert Bot
//!
//! Follows a Telegram alert channel and places the matching bets in a DevTools-driven browser.

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use surebet_bot::{
    config::Config,
    driver::CdpBrowser,
    monitor::start_dashboard,
    session::BotSession,
    storage::{Database, StateRepository},
    types::{LogLevel, SettingsUpdate},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "surebet-bot")]
#[command(about = "Follows surebet alerts on Telegram and places the bets in a browser")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Keep state in memory only
    #[arg(long)]
    ephemeral: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot with the operator API
    Run {
        /// Start polling even if the bot was stopped last time
        #[arg(long)]
        start: bool,
    },
    /// Show bot status
    Status,
    /// Save operator settings
    SaveConfig {
        #[arg(long)]
        bot_token: Option<String>,
        #[arg(long)]
        chat_id: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        stake: Option<Decimal>,
    },
    /// Log in to the bookmaker in the browser
    Login,
    /// Check the Telegram bot token and show recent messages
    TestTelegram,
    /// Stake on the selection currently in the basket
    ManualBet {
        /// Stake, defaults to the configured one
        amount: Option<Decimal>,
    },
    /// List open browser tabs
    DebugTabs,
    /// Dump the structure of the bookmaker page
    DebugPage,
    /// Release the queue slot left by an interrupted bet
    ClearMarker,
    /// Show the operator log
    Logs {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("surebet_bot=info")),
        )
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;
    let session = open_session(config.clone(), cli.ephemeral).await?;

    match cli.command {
        Commands::Run { start } => run_bot(config, session, start).await,
        Commands::Status => show_status(&session).await,
        Commands::SaveConfig {
            bot_token,
            chat_id,
            email,
            password,
            stake,
        } => {
            let update = SettingsUpdate {
                bot_token,
                chat_id,
                email,
                password,
                default_stake: stake,
            };
            let settings = session.save_settings(update).await?;
            println!("Settings saved: {:?}", settings);
            Ok(())
        }
        Commands::Login => {
            let outcome = session.login().await?;
            match outcome.error {
                None if outcome.success => println!("✅ Logged in"),
                error => println!("❌ Login failed: {}", error.unwrap_or_default()),
            }
            Ok(())
        }
        Commands::TestTelegram => test_telegram(&session).await,
        Commands::ManualBet { amount } => {
            let result = session.manual_bet(amount).await?;
            println!("{}", surebet_bot::notify::result_text(&result));
            Ok(())
        }
        Commands::DebugTabs => {
            let tabs = session.debug_tabs().await?;
            println!("\n🗂  Browser Tabs\n");
            for tab in &tabs {
                println!(
                    "  [{}] {:?}{}{} - {}",
                    tab.id,
                    tab.page_type,
                    if tab.bookmaker { " bookmaker" } else { "" },
                    if tab.has_agent { " agent" } else { "" },
                    tab.url
                );
            }
            Ok(())
        }
        Commands::DebugPage => {
            let report = session.debug_page().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::ClearMarker => {
            match session.clear_marker().await? {
                Some(key) => println!("Released slot held by job {}", key),
                None => println!("No in-flight marker"),
            }
            Ok(())
        }
        Commands::Logs { limit } => {
            for entry in session.logs(limit).await {
                let icon = match entry.level {
                    LogLevel::Info => "ℹ️",
                    LogLevel::Success => "✅",
                    LogLevel::Warn => "⚠️",
                    LogLevel::Error => "❌",
                };
                println!(
                    "{} {} {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    icon,
                    entry.message
                );
            }
            Ok(())
        }
    }
}

async fn open_session(config: Config, ephemeral: bool) -> anyhow::Result<Arc<BotSession>> {
    let repo = if ephemeral {
        tracing::warn!("Ephemeral mode: state is not persisted");
        StateRepository::in_memory()
    } else {
        StateRepository::new(Arc::new(Database::connect(&config.database.path).await?))
    };
    let browser = Arc::new(CdpBrowser::new(
        &config.driver.cdp_url,
        config.driver.call_timeout(),
    ));
    Ok(BotSession::new(config, repo, browser).await?)
}

async fn run_bot(config: Config, session: Arc<BotSession>, start: bool) -> anyhow::Result<()> {
    tracing::info!("Starting surebet bot");

    if config.dashboard.enabled {
        let dashboard_session = session.clone();
        let bind = config.dashboard.bind.clone();
        tokio::spawn(async move {
            if let Err(e) = start_dashboard(dashboard_session, &bind).await {
                tracing::error!("Dashboard stopped: {}", e);
            }
        });
    }

    let settings = session.settings().await;
    if start || settings.active {
        if let Err(e) = session.start().await {
            tracing::error!("Could not start polling: {}", e);
        }
    } else {
        tracing::info!("Bot idle; start it with POST /start or `run --start`");
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    // Polling resumes on the next run; queued bets are dropped with the process
    session.halt();
    tokio::time::sleep(Duration::from_millis(200)).await;
    Ok(())
}

async fn show_status(session: &BotSession) -> anyhow::Result<()> {
    let status = session.status().await?;

    println!("\n🤖 Bot Status\n");
    println!("Active: {}", status.active);
    println!("Logged in: {}", status.logged_in);
    println!("Telegram configured: {}", status.telegram_configured);
    println!("Default stake: {}€", status.default_stake);
    println!("Cursor: {}", status.cursor);
    println!("Queued: {}", status.queued);
    match status.in_flight {
        Some(key) => println!("In flight: job {} (use clear-marker if the bot was interrupted)", key),
        None => println!("In flight: none"),
    }

    Ok(())
}

async fn test_telegram(session: &BotSession) -> anyhow::Result<()> {
    let probe = session.test_telegram().await?;

    println!("\n📡 Telegram\n");
    println!(
        "Bot: {}{}",
        probe.bot_name,
        probe
            .username
            .map(|u| format!(" (@{})", u))
            .unwrap_or_default()
    );
    if probe.recent.is_empty() {
        println!("No recent messages");
    } else {
        println!("Recent messages:");
        for text in &probe.recent {
            println!("  {}", text.replace('\n', " "));
        }
    }

    Ok(())
}
