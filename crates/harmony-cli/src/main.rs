use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use harmony_core::{init_tracing, ConfigManager, EmailGateway, Role, Settings, User};
use harmony_notify::{executor_from_config, IssueSnapshot, NotificationEngine, NotificationFeed};
use harmony_store::{InMemoryNotificationStore, InMemoryUserDirectory, RecordingEmailGateway, SmtpEmailGateway};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "harmony")]
#[command(about = "Mellon Harmony - notification engine tooling", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format (json, pretty)
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Environment name used to pick the config overlay
    #[arg(long, global = true, env = "HARMONY_ENV")]
    env: Option<String>,

    /// Directory holding default.toml / {env}.toml / local.toml
    #[arg(long, global = true, env = "HARMONY_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective configuration (secrets are never shown)
    Config,

    /// Send a test email through the configured SMTP server
    TestEmail {
        /// Recipient; defaults to the SMTP user
        to: Option<String>,
    },

    /// Run an end-to-end fan-out against in-memory adapters
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = ConfigManager::load(cli.config_dir.clone(), cli.env.clone())
        .context("Failed to load configuration")?;
    init_tracing(&settings.logging).context("Failed to initialize logging")?;

    match execute_command(&cli, &settings).await {
        Ok(output) => {
            print_output(&cli.output, &output)?;
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

async fn execute_command(cli: &Cli, settings: &Settings) -> Result<serde_json::Value> {
    match &cli.command {
        Commands::Config => execute_config_command(settings),
        Commands::TestEmail { to } => execute_test_email_command(settings, to.clone()).await,
        Commands::Demo => execute_demo_command(settings).await,
    }
}

fn execute_config_command(settings: &Settings) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(settings)?;
    value["smtp_configured"] = json!(settings.smtp.is_configured());
    Ok(value)
}

async fn execute_test_email_command(
    settings: &Settings,
    to: Option<String>,
) -> Result<serde_json::Value> {
    anyhow::ensure!(
        settings.smtp.is_configured(),
        "SMTP is not configured: set HARMONY__SMTP__USER and HARMONY__SMTP__PASSWORD"
    );

    let to = to.unwrap_or_else(|| settings.smtp.user.clone());
    let gateway = SmtpEmailGateway::from_settings(settings).context("Failed to set up SMTP")?;

    info!(host = %settings.smtp.host, port = settings.smtp.port, "testing SMTP connection");
    gateway
        .transport()
        .test_connection()
        .await
        .with_context(|| {
            format!(
                "Could not connect to {}:{}. Check the host and port, and use an app password if the provider requires one",
                settings.smtp.host, settings.smtp.port
            )
        })?;

    gateway
        .send_email(
            &to,
            "Mellon Harmony test email",
            "If you can read this, SMTP is configured correctly.",
        )
        .await
        .with_context(|| format!("Failed to send test email to {}", to))?;

    Ok(json!({
        "sent_to": to,
        "host": settings.smtp.host,
        "port": settings.smtp.port,
        "sender": settings.smtp.sender_address(),
    }))
}

/// A regular user files an issue under a project, assigns it, and every
/// affected user's feed is printed.
async fn execute_demo_command(settings: &Settings) -> Result<serde_json::Value> {
    let admin = User::new("Ada Admin", "ada@example.com", Role::Admin);
    let lead = User::new("Lee Lead", "lee@example.com", Role::TeamLead);
    let author = User::new("Uma Author", "uma@example.com", Role::User);
    let assignee = User::new("Ugo Assignee", "ugo@example.com", Role::User);
    let member = User::new("Uli Member", "uli@example.com", Role::User);
    let users = vec![
        admin.clone(),
        lead.clone(),
        author.clone(),
        assignee.clone(),
        member.clone(),
    ];

    let store = Arc::new(InMemoryNotificationStore::new());
    let email = Arc::new(RecordingEmailGateway::recording());
    let engine = NotificationEngine::new(
        store.clone(),
        Arc::new(InMemoryUserDirectory::with_users(users.clone())),
        email.clone(),
        executor_from_config(&settings.dispatch),
    );

    let mut issue = IssueSnapshot::new("Checkout fails on Safari", author.id);
    issue.assigned_to = Some(assignee.id);
    issue.project_id = Some(Uuid::new_v4());

    let mut reports = Vec::new();
    for outcome in engine
        .issue_created(author.id, &issue, &[author.id, member.id])
        .await
    {
        if let Some(handle) = outcome.handle() {
            reports.push(handle.wait().await);
        }
    }

    let feed = NotificationFeed::new(store);
    let mut feeds = serde_json::Map::new();
    for user in &users {
        let notifications = feed.list(user.id).await?;
        feeds.insert(user.name.clone(), serde_json::to_value(notifications)?);
    }

    Ok(json!({
        "executor": engine.executor().name(),
        "reports": reports,
        "emails_recorded": email.sent().len(),
        "feeds": feeds,
    }))
}

fn print_output(format: &OutputFormat, value: &serde_json::Value) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Pretty => {
            print_pretty(value)?;
        }
    }
    Ok(())
}

fn print_pretty(value: &serde_json::Value) -> Result<()> {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map {
                let key_colored = key.cyan().bold();
                match val {
                    serde_json::Value::String(s) => {
                        println!("{}: {}", key_colored, s.green());
                    }
                    serde_json::Value::Number(n) => {
                        println!("{}: {}", key_colored, n.to_string().yellow());
                    }
                    serde_json::Value::Bool(b) => {
                        let val_colored = if *b { "true".green() } else { "false".red() };
                        println!("{}: {}", key_colored, val_colored);
                    }
                    serde_json::Value::Null => {
                        println!("{}: {}", key_colored, "-".dimmed());
                    }
                    _ => {
                        println!("{}:", key_colored);
                        println!("{}", serde_json::to_string_pretty(val)?);
                    }
                }
            }
        }
        _ => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
    }
    Ok(())
}
