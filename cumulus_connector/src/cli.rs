use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "cumulus-connector",
    version,
    about = "Mirrors control-plane tenants, users and entitlements into an external system"
)]
pub struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, default_value = "config.yaml")]
    pub config: PathBuf,
}
