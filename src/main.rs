//! Relabeler - mutating admission webhook for pod labels

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use relabeler::codec::ReviewCodec;
use relabeler::decision::RuleSet;
use relabeler::events::{EventSink, FileEventSink, NoopEventSink};
use relabeler::pipeline::Pipeline;
use relabeler::server;
use relabeler::DEFAULT_WEBHOOK_PORT;

/// Relabeler - mutating admission webhook for pod labels
#[derive(Parser, Debug)]
#[command(name = "relabeler", version, about, long_about = None)]
struct Cli {
    /// Path to the TLS certificate
    #[arg(long, default_value = "/etc/webhook/certs/tls.crt")]
    cert: PathBuf,

    /// Path to the TLS private key
    #[arg(long, default_value = "/etc/webhook/certs/tls.key")]
    key: PathBuf,

    /// Port the webhook server listens on
    #[arg(long, default_value_t = DEFAULT_WEBHOOK_PORT)]
    port: u16,

    /// Log level used when RUST_LOG is not set (debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// File the audit trail is appended to; empty disables it
    #[arg(long, default_value = "events.txt")]
    events_file: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install crypto provider - FIPS-validated aws-lc-rs
    // This MUST succeed before any rustls config is built.
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!(
            "CRITICAL: Failed to install FIPS-validated crypto provider: {:?}. \
             The webhook cannot terminate TLS without a working provider.",
            e
        );
        std::process::exit(1);
    }

    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let sink: Arc<dyn EventSink> = if cli.events_file.is_empty() {
        tracing::info!("audit trail disabled");
        Arc::new(NoopEventSink)
    } else {
        tracing::info!(file = %cli.events_file, "recording audit events");
        Arc::new(FileEventSink::new(&cli.events_file))
    };

    // One codec and one rule set for the process lifetime, shared
    // read-only by every request
    let pipeline = Arc::new(Pipeline::new(ReviewCodec::new(), RuleSet::new(), sink));

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    server::serve(addr, &cli.cert, &cli.key, pipeline).await?;
    Ok(())
}

/// Initialize tracing with JSON output; RUST_LOG wins over --log-level
fn init_tracing(level: &str) {
    let default = level.parse::<tracing::Level>().unwrap_or(tracing::Level::INFO);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default.to_string()));
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(filter)
        .init();
}
