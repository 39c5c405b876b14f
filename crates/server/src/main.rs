//! SonarCloud MCP server (stdio).

mod handler;
mod prompt;

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use rmcp::ServiceExt as _;
use sonar_mcp_tools::Dispatcher;
use sonar_mcp_tools::config::{self, ConfigSources, PartialConfig, Prompter};
use std::io::IsTerminal as _;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Expose SonarCloud code-quality operations as MCP tools over stdio.
///
/// Connection settings are taken from flags, then SONARCLOUD_* (or legacy SONARQUBE_*)
/// environment variables, then the config file, then an interactive prompt.
#[derive(Debug, Parser)]
#[command(name = "sonar-mcp-server", version)]
struct Cli {
    /// SonarCloud user token.
    #[arg(long)]
    token: Option<String>,

    /// SonarCloud organization key.
    #[arg(long)]
    organization: Option<String>,

    /// Base URL of the SonarCloud / SonarQube instance.
    #[arg(long)]
    url: Option<String>,

    /// JSON file with `token`, `organization` and `url`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Default log filter when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone()));
    // stdout carries MCP; logs must go to stderr.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);
    match cli.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("sonar-mcp-server: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let sources = ConfigSources {
        cli: PartialConfig::new(cli.token, cli.organization, cli.url),
        config_path: cli.config,
    };

    // Prompting blocks on stdin; keep it off the async workers.
    let config = tokio::task::spawn_blocking(move || {
        let interactive = std::io::stdin().is_terminal();
        let mut terminal = prompt::TerminalPrompter;
        let prompter: Option<&mut dyn Prompter> = if interactive {
            Some(&mut terminal)
        } else {
            None
        };
        config::resolve(sources, |k| std::env::var(k).ok(), prompter)
    })
    .await
    .context("configuration task")??;

    info!(
        base_url = %config.base_url,
        organization = config.organization.as_deref().unwrap_or_default(),
        "configuration resolved"
    );

    let dispatcher = Dispatcher::connect(config).context("build SonarCloud client")?;
    let service = handler::SonarMcpServer::new(dispatcher)
        .serve(rmcp::transport::stdio())
        .await
        .context("start MCP stdio transport")?;
    service.waiting().await.context("MCP service task")?;
    info!("stdin closed; shutting down");
    Ok(())
}
