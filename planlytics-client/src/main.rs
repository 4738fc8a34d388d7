//! planlytics - command-line client for the PlanLytics gateway
//!
//! `planlytics analyze <FILE>` uploads a plan document, runs the analysis
//! and prints the row count and export links. `planlytics chat` talks to
//! the agent/homechat endpoints.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use planlytics_client::render::{render_chat, render_snapshot};
use planlytics_client::{
    AnalysisOutcome, ChatChannel, ChatEndpoint, ChatOutcome, ExportLink, HttpTransport,
    UploadController, UploadFile, UploadOutcome,
};
use planlytics_common::api::ChatRequest;
use planlytics_common::config::{load_toml_config, resolve_gateway_url};
use tracing::{info, warn};

/// Command-line arguments for planlytics
#[derive(Parser, Debug)]
#[command(name = "planlytics")]
#[command(about = "Upload plan documents to a PlanLytics gateway and fetch the analysis")]
#[command(version)]
struct Cli {
    /// Gateway base URL
    #[arg(long, global = true, env = "PLANLYTICS_GATEWAY_URL")]
    gateway_url: Option<String>,

    /// TOML config file (defaults to the platform config location)
    #[arg(long, global = true, env = "PLANLYTICS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a file, analyze it and print the export links
    Analyze {
        file: PathBuf,

        /// Also download every export artifact into this directory
        #[arg(long)]
        download_dir: Option<PathBuf>,
    },

    /// Send one message to an AI chat endpoint
    Chat {
        message: String,

        /// agent or homechat
        #[arg(long, default_value = "agent")]
        endpoint: ChatEndpoint,

        /// Extra context passed along with the message
        #[arg(long)]
        context: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let loaded = load_toml_config(cli.config.as_deref());
    let config = &loaded.config;

    // Logs go to stderr so stdout stays clean for rendered output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();
    loaded.log_source();

    let gateway_url = resolve_gateway_url(cli.gateway_url.as_deref(), config);
    info!("Gateway: {}", gateway_url);

    let transport = Arc::new(
        HttpTransport::new(gateway_url.clone())
            .with_context(|| format!("Failed to create client for {}", gateway_url))?,
    );

    match cli.command {
        Command::Analyze { file, download_dir } => {
            run_analyze(transport, &file, download_dir.as_deref()).await
        }
        Command::Chat {
            message,
            endpoint,
            context,
        } => run_chat(transport, endpoint, message, context).await,
    }
}

async fn run_analyze(
    transport: Arc<HttpTransport>,
    path: &Path,
    download_dir: Option<&Path>,
) -> Result<ExitCode> {
    let file = UploadFile::from_path(path).await?;
    let controller = UploadController::new(transport.clone());
    controller.select_file(file).await;

    if !matches!(controller.submit_upload().await, UploadOutcome::Stored(_)) {
        print_lines(&render_snapshot(&controller.snapshot().await));
        return Ok(ExitCode::FAILURE);
    }

    let outcome = controller.request_analysis().await;
    print_lines(&render_snapshot(&controller.snapshot().await));

    let AnalysisOutcome::Completed(result) = outcome else {
        return Ok(ExitCode::FAILURE);
    };

    if let Some(dir) = download_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        for link in &result.export_links {
            download_export(&transport, link, dir).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn download_export(transport: &HttpTransport, link: &ExportLink, dir: &Path) -> Result<()> {
    let name = link
        .file_name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("export.{}", link.format.extension()));
    let target = dir.join(name);

    let bytes = transport
        .download(&link.href)
        .await
        .with_context(|| format!("Failed to download {}", link.url))?;
    tokio::fs::write(&target, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", target.display()))?;

    println!("Saved {} ({} bytes)", target.display(), bytes.len());
    Ok(())
}

async fn run_chat(
    transport: Arc<HttpTransport>,
    endpoint: ChatEndpoint,
    message: String,
    context: Option<String>,
) -> Result<ExitCode> {
    let channel = ChatChannel::new(transport);
    let payload = serde_json::to_value(ChatRequest { message, context })
        .context("Failed to encode chat request")?;

    let outcome = channel.send(endpoint, &payload).await;
    print_lines(&render_chat(&outcome));

    match outcome {
        ChatOutcome::Reply(_) => Ok(ExitCode::SUCCESS),
        ChatOutcome::RateLimited(_) => {
            warn!("Chat disabled by rate limit");
            Ok(ExitCode::FAILURE)
        }
        _ => Ok(ExitCode::FAILURE),
    }
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}
