//! `rho` binary: thin command surface over the orchestration runtime.
//! All invariants live in the library crates; this file only wires
//! arguments to operations and prints JSON results.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use rho_config::{
    update_from_credentials, write_credentials_file, ConfigResolver, CredentialsBootstrap,
};
use rho_events::ActionLog;
use rho_runtime::{analyze_issue, create_issue, service_health, update_issue, ServiceContext};

const DEFAULT_LOG_LIMIT: usize = 25;

#[derive(Debug, Parser)]
#[command(
    name = "rho",
    about = "Prompt-driven issue tracker orchestration service",
    version
)]
struct Cli {
    #[arg(
        long,
        env = "RHO_CREDENTIALS_FILE",
        default_value = "storage/credentials.toml",
        help = "Path to the persisted credentials record"
    )]
    credentials: PathBuf,

    #[arg(
        long,
        env = "RHO_MANIFEST_FILE",
        default_value = "storage/manifest.toml",
        help = "Path to the defaults manifest"
    )]
    manifest: PathBuf,

    #[arg(
        long,
        env = "RHO_LOG_FILE",
        default_value = "storage/actions.jsonl",
        help = "Path to the append-only action log"
    )]
    log_file: PathBuf,

    #[arg(long, help = "Force the deterministic mock generator backend")]
    mock: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a tracker issue from a natural language prompt.
    Create {
        #[arg(long, help = "Natural language description of the issue")]
        prompt: String,
    },
    /// Update an existing issue from a natural language prompt.
    Update {
        #[arg(long, help = "Tracker issue id")]
        issue: u64,
        #[arg(long, help = "Natural language description of the changes")]
        prompt: String,
    },
    /// Analyze an existing issue and print the insight payload.
    Analyze {
        #[arg(long, help = "Tracker issue id")]
        issue: u64,
    },
    /// Probe collaborator services and print a health report.
    Health,
    /// Print recent action log entries, most recent first.
    Log {
        #[arg(long, default_value_t = DEFAULT_LOG_LIMIT, help = "Maximum entries to print")]
        limit: usize,
    },
    /// Look up a named prompt template from the defaults manifest.
    Template {
        #[arg(long, help = "Template name")]
        name: String,
    },
    /// Write a starter credentials record and reload configuration.
    InitCredentials {
        #[arg(long, help = "Tracker base URL")]
        tracker_url: String,
        #[arg(long, help = "Tracker API key")]
        tracker_api_key: String,
        #[arg(long, help = "Bridge endpoint override")]
        bridge_url: Option<String>,
        #[arg(long, help = "Rate budget per minute")]
        rate_limit: Option<u32>,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let rendered =
        serde_json::to_string_pretty(value).context("failed to render result as JSON")?;
    println!("{rendered}");
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let resolver = ConfigResolver::new(cli.credentials.clone(), cli.manifest.clone());
    let action_log = ActionLog::new(cli.log_file.clone());
    let ctx = ServiceContext::new(resolver, action_log, cli.mock);

    match cli.command {
        Command::Create { prompt } => {
            let created = create_issue(&ctx, &prompt).await?;
            print_json(&created)
        }
        Command::Update { issue, prompt } => {
            let message = update_issue(&ctx, issue, &prompt).await?;
            print_json(&serde_json::json!({"success": true, "message": message}))
        }
        Command::Analyze { issue } => {
            let analysis = analyze_issue(&ctx, issue).await?;
            print_json(&analysis)
        }
        Command::Health => {
            let report = service_health(&ctx).await;
            print_json(&report)
        }
        Command::Log { limit } => {
            let (entries, malformed) = ctx.action_log().read(limit)?;
            if malformed > 0 {
                tracing::warn!(malformed, "skipped malformed action log lines");
            }
            print_json(&entries)
        }
        Command::Template { name } => {
            match ctx.resolver().prompt_template(&name)? {
                Some(template) => print_json(&template),
                None => bail!("template `{name}` not found in the defaults manifest"),
            }
        }
        Command::InitCredentials {
            tracker_url,
            tracker_api_key,
            bridge_url,
            rate_limit,
        } => {
            let bootstrap = CredentialsBootstrap {
                tracker_url,
                tracker_api_key,
                bridge_url,
                rate_limit_per_minute: rate_limit,
            };
            write_credentials_file(cli.credentials.as_path(), &bootstrap)?;
            update_from_credentials(ctx.resolver())?;
            print_json(&serde_json::json!({
                "success": true,
                "message": format!("credentials written to {}", cli.credentials.display()),
            }))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run(cli).await
}
