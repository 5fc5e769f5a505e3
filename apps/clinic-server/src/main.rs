mod config;
mod logging;
mod signals;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use clap::{Parser, Subcommand};
use clinic_auth::{AuthState, JwtCodec, auth_middleware};
use clinic_crm::CrmModule;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;

/// Clinic CRM server
#[derive(Parser)]
#[command(name = "clinic-server")]
#[command(about = "Clinic CRM server - leads, patients and sales for many clinics")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port override for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and exit
    Check,
    /// Apply database migrations and exit
    Migrate,
    /// Print a bearer token for an existing staff member
    IssueToken {
        /// Clinic slug
        #[arg(long)]
        clinic: String,
        #[arg(long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli_overrides(cli.port, cli.verbose);

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    logging::init(&config.logging);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(&config),
        Commands::Migrate => migrate(&config).await,
        Commands::IssueToken { clinic, email } => issue_token(config, &clinic, &email).await,
    }
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    config.bind_addr()?;
    println!("Configuration is valid");
    println!("{}", config.to_yaml()?);
    Ok(())
}

async fn migrate(config: &AppConfig) -> Result<()> {
    let db = clinic_db::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    CrmModule::migrate(&db).await
}

async fn issue_token(config: AppConfig, clinic: &str, email: &str) -> Result<()> {
    let db = clinic_db::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    let codec = JwtCodec::new(&config.auth);
    let module = CrmModule::init(db, config.crm);
    let actor = module
        .service()
        .staff_actor(clinic, email)
        .await
        .with_context(|| format!("no active user '{email}' in clinic '{clinic}'"))?;
    println!("{}", codec.issue(&actor)?);
    Ok(())
}

fn build_router(module: &CrmModule, codec: Arc<JwtCodec>, ip_hash_salt: &str) -> Router {
    module
        .register_rest(Router::new())
        .route("/health", get(|| async { "ok" }))
        .layer(from_fn_with_state(
            AuthState::new(codec, module.actor_resolver(), ip_hash_salt),
            auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

async fn run_server(config: AppConfig) -> Result<()> {
    tracing::info!("Clinic CRM server starting");
    let addr = config.bind_addr()?;

    let db = clinic_db::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    CrmModule::migrate(&db).await?;

    let codec = Arc::new(JwtCodec::new(&config.auth));
    let module = CrmModule::init(db, config.crm);
    let router = build_router(&module, codec, &config.auth.ip_hash_salt);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "HTTP server listening");

    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(signals::shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}
