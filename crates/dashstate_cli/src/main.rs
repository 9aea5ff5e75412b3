//! CLI probe for `dashstate_core`.
//!
//! # Responsibility
//! - Verify core crate linkage without the Flutter/FFI runtime.
//! - Run one auth status verification against a live dashboard backend.
//! - Keep output as deterministic `key=value` lines.

use clap::{Parser, Subcommand};
use dashstate_core::config::{ENV_BASE_URL, ENV_LOGIN_ROUTE, ENV_ORDERING};
use dashstate_core::{
    AuthSyncConfig, AuthSynchronizer, HttpAuthTransport, RedirectQueue, VerifyTrigger,
};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "dashstate", version, about = "Dashboard state core probe")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Prints core ping and version.
    Ping,
    /// Runs one auth status verification and prints the session.
    AuthStatus(AuthStatusArgs),
}

#[derive(Debug, clap::Args)]
struct AuthStatusArgs {
    /// Dashboard backend origin, e.g. `https://dash.example.com`.
    #[arg(long, env = ENV_BASE_URL)]
    base_url: String,
    /// Route the probe pretends to be on.
    #[arg(long, default_value = "/")]
    route: String,
    #[arg(long, env = ENV_LOGIN_ROUTE)]
    login_route: Option<String>,
    /// `latest_issued` or `last_completed`.
    #[arg(long, env = ENV_ORDERING)]
    ordering: Option<String>,
    /// Absolute directory for rolling log files; logging is off when unset.
    #[arg(long)]
    log_dir: Option<String>,
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Command::Ping => {
            println!("dashstate_core ping={}", dashstate_core::ping());
            println!("dashstate_core version={}", dashstate_core::core_version());
            ExitCode::SUCCESS
        }
        Command::AuthStatus(args) => match auth_status(args).await {
            Ok(true) => ExitCode::SUCCESS,
            Ok(false) => ExitCode::from(2),
            Err(message) => {
                eprintln!("error={message}");
                ExitCode::FAILURE
            }
        },
    }
}

/// Returns whether the session ended up authenticated.
async fn auth_status(args: AuthStatusArgs) -> Result<bool, String> {
    if let Some(log_dir) = args.log_dir.as_deref() {
        dashstate_core::init_logging(&args.log_level, log_dir).map_err(|err| err.to_string())?;
    }

    let config = AuthSyncConfig::from_lookup(|key| match key {
        ENV_BASE_URL => Some(args.base_url.clone()),
        ENV_LOGIN_ROUTE => args.login_route.clone(),
        ENV_ORDERING => args.ordering.clone(),
        _ => std::env::var(key).ok(),
    })
    .map_err(|err| err.to_string())?;
    let transport = HttpAuthTransport::new(&config).map_err(|err| err.to_string())?;
    let navigator = Arc::new(RedirectQueue::new(args.route.as_str()));
    let synchronizer = AuthSynchronizer::new(&config, Arc::new(transport), navigator.clone());

    let session = synchronizer.verify(VerifyTrigger::Manual).await;

    println!("status_url={}", config.status_url());
    println!("ordering={}", config.ordering.as_str());
    println!("phase={}", session.phase().as_str());
    println!("authenticated={}", session.is_authenticated());
    if let Some(user) = session.user() {
        println!("user_id={}", user.user_id);
        if let Some(name) = user.display_name.as_deref() {
            println!("display_name={name}");
        }
        println!("linked_identities={}", user.linked_identities.len());
    }
    if let Some(failure) = session.last_failure() {
        println!("failure={failure}");
    }
    if let Some(route) = navigator.take_redirect() {
        println!("redirect={route}");
    }
    Ok(session.is_authenticated())
}
