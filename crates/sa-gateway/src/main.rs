//! skill-assessor: WhatsApp Job Skill Assessment Main Binary
//!
//! Usage:
//!   skill-assessor           - Start server mode (Twilio WhatsApp webhook)
//!   skill-assessor --cli     - Start interactive CLI mode
//!   skill-assessor --help    - Show help

mod cli;

use std::sync::Arc;

use sa_core::{AssessmentPipeline, Config};
use sa_whatsapp::WhatsAppBot;
use tracing_subscriber::EnvFilter;

/// Run mode
enum RunMode {
    /// Server mode (WhatsApp webhook)
    Server,
    /// Interactive CLI mode
    Cli,
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = parse_args(std::env::args().skip(1));

    match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("skill-assessor {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting skill-assessor...");
    tracing::info!("Model: {}", config.gemini.model);

    let pipeline = AssessmentPipeline::from_config(&config)
        .map_err(|e| anyhow::anyhow!("Failed to create assessment pipeline: {}", e))?;

    match mode {
        RunMode::Cli => {
            tracing::info!("Running in CLI mode");
            cli::run_cli(pipeline).await
        }
        RunMode::Server => run_server(config, pipeline).await,
        _ => Ok(()),
    }
}

/// Parse command line arguments
fn parse_args(args: impl IntoIterator<Item = String>) -> RunMode {
    for arg in args {
        match arg.as_str() {
            "--cli" | "-c" => return RunMode::Cli,
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ => {}
        }
    }

    RunMode::Server
}

/// Print help message
fn print_help() {
    println!("skill-assessor - WhatsApp Job Skill Assessment");
    println!();
    println!("Usage:");
    println!("  skill-assessor           Start server mode (Twilio WhatsApp webhook)");
    println!("  skill-assessor --cli     Start interactive CLI mode");
    println!("  skill-assessor --help    Show this help message");
    println!("  skill-assessor --version Show version");
    println!();
    println!("Configuration is read from {} when present, else from the environment.", sa_core::config::CONFIG_FILE);
    println!();
    println!("Environment Variables:");
    println!("  GEMINI_API_KEY / GOOGLE_API_KEY  Gemini API key (required)");
    println!("  GEMINI_MODEL                     Model name (default: gemini-2.0-flash)");
    println!("  GEMINI_BASE_URL                  Custom API endpoint");
    println!("  TWILIO_ACCOUNT_SID               Twilio account SID (server mode)");
    println!("  TWILIO_AUTH_TOKEN                Twilio auth token (server mode)");
    println!("  TWILIO_WHATSAPP_NUMBER           Sender number (default: sandbox +14155238886)");
    println!("  HOST                             Bind address (default: 0.0.0.0)");
    println!("  PORT                             Webhook port (default: 5000)");
    println!("  WEBHOOK_VALIDATE_SIGNATURE       Verify X-Twilio-Signature (default: false)");
    println!("  WEBHOOK_PUBLIC_URL               Public webhook URL used for signatures");
    println!("  PROMPTS_DIR                      Knowledge base override directory");
    println!("  MAX_MESSAGE_LENGTH               Outbound message limit (default: 1600)");
}

/// Run server mode (WhatsApp webhook)
async fn run_server(config: Config, pipeline: AssessmentPipeline) -> anyhow::Result<()> {
    config
        .validate_for_server()
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    let bot = WhatsAppBot::new(&config, Arc::new(pipeline))
        .map_err(|e| anyhow::anyhow!("Failed to create WhatsApp bot: {}", e))?;

    let handle = tokio::spawn(async move {
        if let Err(e) = bot.start().await {
            tracing::error!("WhatsApp bot error: {}", e);
        }
    });
    tracing::info!(
        "WhatsApp webhook listening on {}:{} (POST /twilio-webhook)",
        config.server.host,
        config.server.port
    );
    tracing::info!("Press Ctrl+C to exit");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");

    handle.abort();

    tracing::info!("Shutdown complete");
    Ok(())
}
