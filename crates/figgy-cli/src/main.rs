use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use figgy_core::config::{Settings, expand_path};
use figgy_core::types::{LogFilters, LogsPage, Pagination, Payload, Role};
use figgy_gateway::GatewayClient;
use figgy_server::AppState;

mod logging;

#[derive(Parser)]
#[command(
    name = "figgy",
    about = "Backend for the OpenClaw web portal: log search, sessions, config and queue settings over the gateway",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (default: ~/.figgy/config.json)
    #[arg(short, long, global = true, env = "FIGGY_CONFIG")]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port to listen on (default: 8000)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Search chat logs across sessions
    Logs {
        /// Substring of the session key
        #[arg(long)]
        session: Option<String>,

        /// Exact channel name
        #[arg(long)]
        channel: Option<String>,

        /// user, assistant, system or tool
        #[arg(long)]
        role: Option<Role>,

        /// Case-insensitive text search
        #[arg(short, long)]
        search: Option<String>,

        #[arg(long, default_value_t = 100)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Include tool call messages
        #[arg(long)]
        include_tools: bool,

        /// Print the raw JSON page
        #[arg(long)]
        json: bool,
    },

    /// List sessions
    Sessions {
        /// Only sessions active in the last N minutes
        #[arg(long)]
        active_minutes: Option<u32>,

        #[arg(long)]
        json: bool,
    },

    /// Gateway configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show message queue settings and the sessions they apply to
    Queue,

    /// Check gateway health
    Health,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current config and its hash
    Get,
    /// Apply a JSON delta against the hash from `config get`
    Patch {
        #[arg(long)]
        base_hash: String,

        /// JSON object to merge into the config
        patch: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config_path = cli
        .config
        .as_deref()
        .map(expand_path)
        .unwrap_or_else(Settings::default_path);
    let mut settings = Settings::load(&config_path)
        .with_context(|| format!("loading settings from {}", config_path.display()))?;

    let rejected = logging::init_logging(cli.verbose, settings.logging.as_ref())?;
    for directive in rejected {
        warn!(%directive, "Ignoring invalid log filter");
    }

    if let Commands::Serve { port: Some(port) } = &cli.command {
        settings.server.port = *port;
    }
    check_settings(&settings, &config_path)?;

    match cli.command {
        Commands::Serve { .. } => {
            info!(
                config = %config_path.display(),
                gateway = %settings.gateway_url(),
                "Starting Figgy API"
            );
            let state = Arc::new(AppState::from_settings(settings));
            figgy_server::start_server(state).await?;
        }
        Commands::Logs {
            session,
            channel,
            role,
            search,
            limit,
            offset,
            include_tools,
            json,
        } => {
            let client = GatewayClient::from_settings(&settings);
            let filters = LogFilters {
                session_key: session,
                channel,
                role,
                search,
                include_tools,
            };
            let page = client
                .logs()
                .query(&filters, Pagination::new(limit, offset))
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&page)?);
            } else {
                print_logs(&page, offset);
            }
        }
        Commands::Sessions {
            active_minutes,
            json,
        } => {
            let client = GatewayClient::from_settings(&settings);
            let sessions = client.sessions().list_sessions(active_minutes).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&sessions)?);
            } else if sessions.is_empty() {
                println!("No sessions.");
            } else {
                for s in &sessions {
                    println!(
                        "{:<48} {:<10} {:<20} {}",
                        s.key,
                        s.channel.as_deref().unwrap_or("-"),
                        format_time(s.updated_at),
                        s.name()
                    );
                }
            }
        }
        Commands::Config { action } => {
            let client = GatewayClient::from_settings(&settings);
            match action {
                ConfigAction::Get => {
                    let snapshot = client.config().get().await?;
                    println!("{}", serde_json::to_string_pretty(&snapshot)?);
                }
                ConfigAction::Patch { base_hash, patch } => {
                    let delta: Payload =
                        serde_json::from_str(&patch).context("patch must be a JSON object")?;
                    match client.config().patch(&delta, &base_hash).await {
                        Ok(outcome) => {
                            println!("{}", serde_json::to_string_pretty(&outcome)?);
                        }
                        Err(e) if e.is_stale_hash() => {
                            anyhow::bail!(
                                "{e}\nThe config changed since hash {base_hash}; run `figgy config get` and retry."
                            );
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        }
        Commands::Queue => {
            let client = GatewayClient::from_settings(&settings);
            let status = client.queue().status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::Health => {
            let client = GatewayClient::from_settings(&settings);
            let health = client.health().health().await;
            println!("{}", serde_json::to_string_pretty(&health)?);
            if !health.ok {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Log warnings; refuse to run on errors.
fn check_settings(settings: &Settings, path: &Path) -> anyhow::Result<()> {
    let (warnings, errors) = settings.validate();
    for w in &warnings {
        warn!(config = %path.display(), "{w}");
    }
    if !errors.is_empty() {
        anyhow::bail!(
            "invalid settings in {}:\n  {}",
            path.display(),
            errors.join("\n  ")
        );
    }
    Ok(())
}

fn print_logs(page: &LogsPage, offset: usize) {
    if page.messages.is_empty() {
        println!("No messages.");
        return;
    }
    for m in &page.messages {
        let first_line = m.content.lines().next().unwrap_or_default();
        println!(
            "{} [{:<9}] {} ({}): {}",
            format_time(m.timestamp),
            m.role.as_str(),
            m.session_name.as_deref().unwrap_or(&m.session_key),
            m.channel.as_deref().unwrap_or("-"),
            first_line
        );
    }
    let shown_to = offset + page.messages.len();
    println!(
        "-- {}-{} of {}{}",
        offset + 1,
        shown_to,
        page.total,
        if page.has_more { " (more with --offset)" } else { "" }
    );
}

fn format_time(epoch_ms: Option<i64>) -> String {
    epoch_ms
        .and_then(chrono::DateTime::from_timestamp_millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".repeat(19))
}
