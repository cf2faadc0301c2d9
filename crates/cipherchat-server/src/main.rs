// ============================================
// File: crates/cipherchat-server/src/main.rs
// ============================================
//! # cipherchat Entry Point
//!
//! ## Creation Reason
//! Command-line entry point: configuration checks, an in-process
//! two-party demonstration, and the long-running service.
//!
//! ## Main Functionality
//! - CLI argument parsing with clap
//! - Logging initialization with tracing
//! - Configuration loading
//! - Server execution
//!
//! ## Usage
//! ```bash
//! cipherchat validate --config cipherchat.toml   # Validate config file
//! cipherchat demo                               # Alice and Bob exchange keys
//! cipherchat serve --config cipherchat.toml      # Run until Ctrl+C
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - A missing config file falls back to defaults; an invalid one is fatal
//! - `RUST_LOG` overrides `logging.level`
//!
//! ## Last Modified
//! v0.1.0 - Initial CLI implementation

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cipherchat_common::types::ParticipantId;
use cipherchat_relay::RelayEvent;
use cipherchat_server::services::RespondOutcome;
use cipherchat_server::{Server, ServerConfig};

// ============================================
// CLI Definition
// ============================================

/// cipherchat end-to-end key exchange service
#[derive(Parser, Debug)]
#[command(name = "cipherchat")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "cipherchat.toml")]
        config: PathBuf,
    },

    /// Run a two-party key exchange and message in-process
    Demo {
        /// Path to configuration file
        #[arg(short, long, default_value = "cipherchat.toml")]
        config: PathBuf,

        /// Message Alice sends to Bob
        #[arg(short, long, default_value = "hello")]
        message: String,
    },

    /// Start the service and wait for Ctrl+C
    Serve {
        /// Path to configuration file
        #[arg(short, long, default_value = "cipherchat.toml")]
        config: PathBuf,
    },
}

// ============================================
// Main
// ============================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { config } => cmd_validate(&config).await,
        Commands::Demo { config, message } => cmd_demo(&config, &message).await,
        Commands::Serve { config } => cmd_serve(&config).await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        eprintln!("❌ {e:#}");
        std::process::exit(1);
    }
}

// ============================================
// Commands
// ============================================

/// Validates configuration file.
async fn cmd_validate(config_path: &Path) -> anyhow::Result<()> {
    init_logging("info");

    if !config_path.exists() {
        println!("⚠️  Config file not found: {}", config_path.display());
        println!("   Server will use default values.");
        return Ok(());
    }

    let config = ServerConfig::load(config_path).await?;

    println!("✅ Configuration is valid");
    println!();
    println!("Session:");
    println!("   TTL:             {}s", config.session.ttl_secs);
    println!("   Sweep Interval:  {}s", config.session.sweep_interval_secs);
    println!("   Max Sessions:    {}", config.session.max_sessions);
    println!("   Reuse Policy:    {:?}", config.session.reuse_policy);
    println!();
    println!("Relay:");
    println!("   Queue Depth:     {}", config.relay.queue_depth);
    println!("   Presence Check:  {}", config.relay.presence_precheck);
    println!();

    Ok(())
}

/// Runs the Alice/Bob scenario against an in-process server.
async fn cmd_demo(config_path: &Path, message: &str) -> anyhow::Result<()> {
    let config = load_or_default_config(config_path).await?;
    init_logging(&config.logging.level);

    let server = Server::new(config);
    server.start();

    let alice = ParticipantId::new("alice")?;
    let bob = ParticipantId::new("bob")?;
    let mut alice_conn = server.relay().connect(&alice);
    let mut bob_conn = server.relay().connect(&bob);
    let coordinator = server.coordinator();

    // Alice → Bob: request
    let outcome = coordinator.initiate(&alice, &bob).await?;
    let request = bob_conn.recv().await?;
    println!("→ bob    {}", request.to_json()?);
    let kind = request.kind();

    let RelayEvent::KeyExchangeRequest {
        public_key: offered,
        session_id,
        ..
    } = request
    else {
        anyhow::bail!("expected keyExchangeRequest, got {kind}");
    };

    // Bob → Alice: accept
    let answer = coordinator
        .respond(&bob, &session_id, &offered.to_wire(), true)
        .await?;
    if !matches!(answer, RespondOutcome::Accepted { .. }) {
        anyhow::bail!("bob declined");
    }

    let response = alice_conn.recv().await?;
    println!("→ alice  {}", response.to_json()?);
    let kind = response.kind();

    let RelayEvent::KeyExchangeResponse {
        public_key: Some(bob_public),
        ..
    } = response
    else {
        anyhow::bail!("expected accepted keyExchangeResponse, got {kind}");
    };

    coordinator.complete(&alice, &outcome.session_id, &bob_public.to_wire())?;
    println!(
        "✅ Session established: {}",
        coordinator.has_active_session(&alice, &bob)
    );

    // Alice → Bob: message
    coordinator
        .send_message(&alice, &bob, message.as_bytes())
        .await?;
    let delivered = bob_conn.recv().await?;
    println!("→ bob    {}", delivered.to_json()?);
    let kind = delivered.kind();

    let RelayEvent::Message { payload, .. } = delivered else {
        anyhow::bail!("expected newMessage, got {kind}");
    };
    let plaintext = coordinator.decrypt(&payload, &alice, &bob)?;
    println!(
        "✅ Bob decrypted: {}",
        String::from_utf8(plaintext).context("message is not UTF-8")?
    );

    coordinator.teardown(&alice, &bob)?;
    server.stop().await;
    Ok(())
}

/// Starts the service.
async fn cmd_serve(config_path: &Path) -> anyhow::Result<()> {
    let config = load_or_default_config(config_path).await?;
    init_logging(&config.logging.level);

    info!("Starting cipherchat...");

    let server = Server::new(config);
    server.run().await?;

    Ok(())
}

// ============================================
// Helper Functions
// ============================================

/// Initializes the tracing subscriber.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .ok();
}

/// Loads config, or returns defaults if the file does not exist.
async fn load_or_default_config(path: &Path) -> anyhow::Result<ServerConfig> {
    if path.exists() {
        Ok(ServerConfig::load(path).await?)
    } else {
        Ok(ServerConfig::default())
    }
}
