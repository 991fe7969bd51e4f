//! openai-proxy - pass-through proxy for OpenAI-compatible completion APIs

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use openai_proxy::config::{Config, TokenSource};

#[derive(Parser)]
#[command(name = "openai-proxy")]
#[command(about = "Pass-through proxy for OpenAI-compatible completion APIs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the proxy server
    Serve {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: String,

        /// Override listen address
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Validate configuration file
    Check {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: String,
    },
}

/// Initialize tracing; RUST_LOG wins over the configured level.
fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("openai_proxy={level},tower_http={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, listen } => {
            let mut loaded = Config::from_file(&config)?;
            init_tracing(&loaded.logging.level);
            tracing::info!(config = %config, "Loaded configuration");

            if let Some(addr) = listen {
                tracing::info!(listen = %addr, "Override listen address");
                loaded.server.listen = addr;
            }

            if loaded.upstream.token_source == TokenSource::Default {
                tracing::warn!("No upstream auth token configured - sending placeholder token");
            } else {
                tracing::info!(
                    token_source = %loaded.upstream.token_source,
                    "Resolved upstream auth token"
                );
            }

            openai_proxy::proxy::run_server(loaded).await
        }

        Commands::Check { config } => {
            let loaded = Config::from_file(&config)?;

            println!("Configuration OK: {}", config);
            println!("  listen:       {}", loaded.server.listen);
            println!("  route prefix: {}", loaded.server.route_prefix);
            println!("  upstream:     {}", loaded.upstream.base_url);
            println!("  auth token:   {}", loaded.upstream.token_source);
            println!(
                "  timeouts:     {}s request, {}s connect",
                loaded.upstream.timeout_secs, loaded.upstream.connect_timeout_secs
            );
            Ok(())
        }
    }
}
