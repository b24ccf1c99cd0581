//! Traxx CLI entry point

mod cli;

use crate::cli::{Cli, Commands, SigningArgs};
use anyhow::{Context, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use clap::Parser;
use rand::Rng;
use std::io::Write;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use traxx::auth::{
    unix_now, ExpiryPolicy, SigningContext, StreamKey, StreamKeyAuthority, SEPARATOR,
};
use traxx::server::{run_http_server, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Serve { bind } => serve(&cli.signing, bind).await,
        Commands::Issue { user } => issue(&cli.signing, user),
        Commands::Verify { key, user } => verify(&cli.signing, &key, user),
        Commands::Inspect { key } => inspect(&key),
        Commands::GenSecret => gen_secret(),
    }
}

/// Build the authority from CLI/env configuration. Fails if no secret is
/// configured and the insecure fallback was not requested.
fn build_authority(args: &SigningArgs) -> Result<StreamKeyAuthority> {
    let expiry = ExpiryPolicy::new(
        Duration::from_secs(args.max_age),
        Duration::from_secs(args.clock_skew),
    );
    let context = SigningContext::resolve(args.secret.clone(), args.allow_insecure_secret)
        .context("Cannot sign stream keys")?
        .with_expiry(expiry);

    Ok(StreamKeyAuthority::new(context))
}

async fn serve(args: &SigningArgs, bind: String) -> Result<()> {
    let authority = build_authority(args)?;
    let bind_addr: SocketAddr = bind.parse().context("Invalid bind address")?;

    if authority.context().is_insecure() {
        warn!("Serving with the development secret; do not expose this instance");
    }

    info!(
        addr = %bind,
        max_age_secs = args.max_age,
        clock_skew_secs = args.clock_skew,
        "Traxx stream key service starting"
    );

    // Run server with graceful shutdown on signals
    tokio::select! {
        result = run_http_server(bind_addr, AppState::new(authority)) => {
            result?;
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received, stopping server");
        }
    }

    info!("Traxx stream key service stopped");
    Ok(())
}

fn issue(args: &SigningArgs, user: u64) -> Result<()> {
    let authority = build_authority(args)?;
    let key = authority.issue(user);

    println!("{}", key);
    println!();
    println!("User:      {}", key.subject_id());
    println!("Issued at: {}", key.issued_at());
    println!("Expires:   {}", key.expires_at(Duration::from_secs(args.max_age)));

    Ok(())
}

fn verify(args: &SigningArgs, key: &str, user: u64) -> Result<()> {
    let authority = build_authority(args)?;
    let max_age = authority.context().expiry().max_age;

    match authority.check(key, user, max_age, unix_now()) {
        Ok(_) => {
            println!("valid");
            Ok(())
        }
        Err(e) => {
            println!("invalid: {}", e);
            Err(anyhow::anyhow!("Stream key rejected ({})", e.reason()))
        }
    }
}

fn inspect(key: &str) -> Result<()> {
    let mut out = std::io::stdout().lock();
    write_inspection(&mut out, key, unix_now()).context("Failed to write report")
}

/// Print the fields of `key` and its format verdict. No secret involved.
fn write_inspection(out: &mut impl Write, key: &str, now: u64) -> std::io::Result<()> {
    writeln!(out, "Stream key")?;
    writeln!(out, "==========")?;

    let parsed = match key.parse::<StreamKey>() {
        Ok(parsed) => parsed,
        Err(_) => {
            writeln!(out, "Format:    invalid")?;
            for (i, field) in key.split(SEPARATOR).enumerate() {
                writeln!(out, "Field {}:   {:?}", i + 1, field)?;
            }
            return Ok(());
        }
    };

    writeln!(out, "Format:    valid")?;
    writeln!(out, "User:      {}", parsed.subject_id())?;
    writeln!(out, "Issued at: {}", parsed.issued_at())?;
    if parsed.issued_at() <= now {
        writeln!(out, "Age:       {}s", now - parsed.issued_at())?;
    } else {
        writeln!(out, "Age:       issued {}s in the future", parsed.issued_at() - now)?;
    }
    writeln!(out, "Signature: {}", parsed.signature())?;
    writeln!(out, "(signature not checked)")?;

    Ok(())
}

fn gen_secret() -> Result<()> {
    let mut rng = rand::rng();
    let mut bytes = [0u8; 32];
    rng.fill(&mut bytes);

    println!("{}", URL_SAFE_NO_PAD.encode(bytes));
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
