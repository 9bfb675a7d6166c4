//! `intake` binary: serves the HTTP gateway or classifies file names.

mod config;

use clap::{Parser, Subcommand};
use config::IntakeConfig;
use intake_core::{classify, CommandGrammar};
use intake_dispatch::{IntakeService, ServiceDeps, WebhookDeliverer};
use intake_gateway::GatewayServer;
use intake_session::InMemorySessionStore;
use intake_storage::LocalFolderGateway;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "intake", about = "Intake: session lifecycle and idempotent dispatch server")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "intake.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print the category assigned to each file name
    Classify {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is normal outside development.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port } => {
            let mut config = IntakeConfig::load(&cli.config).await?;
            config.apply_env(|key| std::env::var(key).ok());
            config.validate()?;
            serve(config, host, port).await?;
        }
        Commands::Classify { names } => {
            for name in &names {
                println!("{name}\t{}", classify(name));
            }
        }
    }

    Ok(())
}

async fn serve(config: IntakeConfig, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let host = host.unwrap_or(config.server.host);
    let port = port.unwrap_or(config.server.port);

    tokio::fs::create_dir_all(&config.data_dir).await?;
    let audit = config.audit.build(&config.data_dir)?;
    info!(kind = ?config.audit.kind, "Audit sink ready");

    let list_timeout = config.storage.list_timeout();
    let storage = Arc::new(LocalFolderGateway::new(config.storage).await?);
    info!(root = %storage.root().display(), "Storage root ready");

    let deliverer = Arc::new(WebhookDeliverer::new(
        config.dispatch.downstream_url.clone(),
        config.dispatch.request_timeout(),
    )?);

    let service = Arc::new(IntakeService::new(
        ServiceDeps {
            store: Arc::new(InMemorySessionStore::new()),
            storage,
            audit,
            deliverer,
        },
        &config.dispatch,
        CommandGrammar::new(&config.commands),
        list_timeout,
    ));

    let sweeper = {
        let service = service.clone();
        let ttl = config.sessions.ttl();
        let mut interval = tokio::time::interval(config.sessions.sweep_interval());
        tokio::spawn(async move {
            loop {
                interval.tick().await;
                service.evict_idle(ttl);
            }
        })
    };

    let app = GatewayServer::build(service.clone());
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Intake server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    service.shutdown().await;
    info!("Intake server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining deliveries");
}
