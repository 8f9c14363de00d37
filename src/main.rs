//! dashgate CLI - Static file server and DashScope chat proxy.

use clap::{Parser, Subcommand};
use dashgate::api::{AppState, Gateway};
use dashgate::config::{Config, LogVerbosity};
use dashgate::{http, logger, server};
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dashgate")]
#[command(about = "Static file server and DashScope chat proxy")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind
        #[arg(long)]
        host: Option<IpAddr>,

        /// Directory served for GET requests
        #[arg(long)]
        public_dir: Option<PathBuf>,

        /// Log verbosity level
        #[arg(short, long, value_enum)]
        log_level: Option<LogLevel>,

        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show current configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum LogLevel {
    Minimal,
    Compact,
    Verbose,
}

impl From<LogLevel> for LogVerbosity {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Minimal => LogVerbosity::Minimal,
            LogLevel::Compact => LogVerbosity::Compact,
            LogLevel::Verbose => LogVerbosity::Verbose,
        }
    }
}

struct ServeArgs {
    port: Option<u16>,
    host: Option<IpAddr>,
    public_dir: Option<PathBuf>,
    log_level: Option<LogLevel>,
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { port, host, public_dir, log_level, config }) => {
            run_server(ServeArgs { port, host, public_dir, log_level, config }).await?;
        }
        Some(Commands::Config { path }) => {
            show_config(path)?;
        }
        None => {
            run_server(ServeArgs {
                port: None,
                host: None,
                public_dir: None,
                log_level: None,
                config: None,
            })
            .await?;
        }
    }

    Ok(())
}

async fn run_server(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    }
    .with_env_overrides();

    // Command-line flags win over file and environment.
    if let Some(port) = args.port {
        config.gateway.port = port;
    }
    if let Some(host) = args.host {
        config.gateway.host = host;
    }
    if let Some(dir) = args.public_dir {
        config.gateway.public_dir = dir;
    }
    if let Some(level) = args.log_level {
        config.logging.verbosity = level.into();
    }

    logger::init(&config.logging)?;

    if config.api_key().is_none() {
        tracing::warn!("DASHSCOPE_API_KEY is not set; proxy endpoints will answer 500");
    }

    let addr = config.listen_addr();
    let banner = logger::banner(&config, addr);
    let state = AppState::new(config, http::create_client()?)?;
    let gateway = Gateway::new(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("{}", banner);
    tracing::info!("Gateway listening on {}", addr);

    server::serve(listener, gateway, server::shutdown_signal()).await?;

    println!("\nGateway stopped.");
    Ok(())
}

fn show_config(show_path: bool) -> anyhow::Result<()> {
    if show_path {
        println!("{}", Config::default_path().display());
        return Ok(());
    }

    let mut config = Config::load()?.with_env_overrides();
    if config.api_key().is_some() {
        config.upstream.api_key = Some("<redacted>".to_string());
    }
    println!("{}", config.to_toml()?);
    Ok(())
}
