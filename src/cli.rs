use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::classifier::Classifier;
use crate::config::{load_config, load_config_from, ComplianceConfig};
use crate::errors::ComplianceResult;
use crate::integrity;
use crate::ledger::LedgerGateway;
use crate::ledger_sled::SledLedger;
use crate::policy::hash_password;
use crate::record::LogRecord;
use crate::simulate::Simulator;
use crate::web::{build_router, with_cors};

/// Top-level CLI for the compliance ledger
#[derive(Parser)]
#[command(
    name = "compliance_ledger",
    version,
    about = "Compliance log ingestion, classification and audit ledger"
)]
pub struct Cli {
    /// Configuration file (defaults to $COMPLIANCE_CONFIG or compliance.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Host/IP to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides server.port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Classify a message with the built-in or a custom rule table
    Classify {
        message: String,
        #[arg(long)]
        rules: Option<String>,
    },

    /// Recompute every record hash in a local ledger and report mismatches
    Verify {
        #[arg(long, default_value = "data/ledger")]
        path: String,
    },

    /// Dump every record of a local ledger as JSON
    Export {
        #[arg(short, long)]
        output: String,
        #[arg(long, default_value = "data/ledger")]
        path: String,
    },

    /// Print the SHA-256 digest to put in auth.users[].password_sha256
    HashPassword { password: String },

    /// Submit random sample events as a collector
    Simulate {
        #[arg(long, default_value = "http://localhost:5000")]
        url: String,
        #[arg(long, default_value = "collector")]
        username: String,
        #[arg(long, default_value = "collector123")]
        password: String,
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
}

/// Install the fmt subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn tokio_runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")
}

async fn serve(config: ComplianceConfig, addr: String) -> anyhow::Result<()> {
    let state = Arc::new(AppState::from_config(&config).context("Failed to initialize server state")?);
    let app = with_cors(build_router(state), &config.server.cors_origin);

    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .with_context(|| format!("Invalid bind address {addr}"))?;
    let listener = tokio::net::TcpListener::bind(socket_addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("HTTP server listening on http://{addr}");
    axum::serve(listener, app).await.context("Server error")
}

async fn load_records(path: &str) -> ComplianceResult<Vec<LogRecord>> {
    let ledger = SledLedger::open(path)?;
    ledger.get_all().await
}

pub fn dispatch(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { host, port } => {
            let config = match &cli.config {
                Some(path) => load_config_from(path),
                None => load_config(),
            }
            .context("Failed to load config")?;
            init_tracing(&config.log_level);

            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let addr = format!("{host}:{port}");

            tokio_runtime()?.block_on(serve(config, addr))
        }
        Commands::Classify { message, rules } => {
            let classifier = match rules {
                Some(path) => Classifier::from_file(&path)?,
                None => Classifier::default(),
            };
            let classification = classifier.classify(&message);
            println!("{}", serde_json::to_string_pretty(&classification)?);
            Ok(())
        }
        Commands::Verify { path } => {
            init_tracing("warn");
            let records = tokio_runtime()?.block_on(load_records(&path))?;

            let tampered: Vec<&str> = records
                .iter()
                .filter(|r| !integrity::verify(r))
                .map(|r| r.log_id.as_str())
                .collect();
            for id in &tampered {
                println!("TAMPERED {id}");
            }
            println!(
                "{} records checked, {} tampered",
                records.len(),
                tampered.len()
            );
            if tampered.is_empty() {
                Ok(())
            } else {
                Err(anyhow!("integrity check failed for {} records", tampered.len()))
            }
        }
        Commands::Export { output, path } => {
            init_tracing("warn");
            let records = tokio_runtime()?.block_on(load_records(&path))?;
            let json = serde_json::to_string_pretty(&records)?;
            std::fs::write(&output, json).with_context(|| format!("Failed to write {output}"))?;
            println!("Exported {} records to {output}", records.len());
            Ok(())
        }
        Commands::HashPassword { password } => {
            println!("{}", hash_password(&password));
            Ok(())
        }
        Commands::Simulate {
            url,
            username,
            password,
            count,
        } => {
            init_tracing("info");
            let accepted = Simulator::new(&url).run(&username, &password, count)?;
            println!("{accepted}/{count} events accepted");
            Ok(())
        }
    }
}
