use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use ledgerd_core::config::{ConfigLoader, NodeSettings};
use ledgerd_core::crypto::ensure_dev_stores;
use ledgerd_core::{LedgerdError, LedgerdResult};

#[derive(Parser)]
#[command(name = "ledgerd")]
#[command(about = "Distributed ledger node", long_about = None)]
struct Cli {
    /// Node base directory containing node.conf and node data
    #[arg(long, default_value = ".")]
    base_directory: PathBuf,

    /// Explicit configuration file (defaults to <base-directory>/node.conf)
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Tolerate a missing node.conf and fall back to packaged defaults
    #[arg(long)]
    allow_missing_config: bool,

    /// Provision development key and trust stores before startup
    #[arg(long)]
    dev: bool,

    /// Print the resolved configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> LedgerdResult<()> {
    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(
        "ledgerd=info"
            .parse()
            .map_err(|e| LedgerdError::ConfigError(format!("Invalid log directive: {}", e)))?,
    );
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let mut loader =
        ConfigLoader::new(&cli.base_directory).allow_missing_config(cli.allow_missing_config);
    if let Some(ref config_file) = cli.config_file {
        loader = loader.config_file(config_file);
    }
    let config = loader.load()?;

    if cli.print_config {
        println!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let settings = NodeSettings::from_config(&config)?;

    if cli.dev || settings.dev_mode {
        info!("Development mode: provisioning key and trust stores");
        ensure_dev_stores(&settings.store, &settings.my_legal_name)?;
    }

    info!(
        legal_name = %settings.my_legal_name,
        base_directory = %settings.base_directory.display(),
        "Node bootstrap complete"
    );
    Ok(())
}
