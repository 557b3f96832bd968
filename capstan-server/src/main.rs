//! Capstan Server Binary
//!
//! Loads configuration, initializes tracing, and runs the dispatch server.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use capstan_config::{CapstanConfig, ConfigLoader, LogFormat};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Server bind address override
    #[arg(short, long)]
    bind: Option<String>,

    /// Server port override
    #[arg(short, long)]
    port: Option<u16>,

    /// Process tool override
    #[arg(long)]
    process_exe: Option<String>,

    /// Print a sample configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        println!("{}", CapstanConfig::generate_sample());
        return Ok(());
    }

    let mut config = ConfigLoader::new().load(cli.config.as_ref())?;
    apply_cli_overrides(&mut config, &cli);

    init_tracing(&config);

    capstan_server::serve(config).await?;
    Ok(())
}

/// Apply CLI argument overrides to configuration
fn apply_cli_overrides(config: &mut CapstanConfig, cli: &Cli) {
    let server = config.server.get_or_insert_with(Default::default);

    if let Some(bind) = &cli.bind {
        server.bind_address = bind.clone();
    }

    if let Some(port) = cli.port {
        server.port = port;
    }

    if let Some(process_exe) = &cli.process_exe {
        config.tools.process_exe = process_exe.clone();
    }
}

/// Initialize tracing with environment variable override support
fn init_tracing(config: &CapstanConfig) {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_filter_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_file(config.logging.include_location)
        .with_line_number(config.logging.include_location);

    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Text => builder.init(),
    }
}
