use std::{fmt, path::PathBuf};

#[derive(Debug, clap::Parser)]
#[clap(name = "limit-orders", about = "Inspect limit orders and their packed fields")]
pub struct Args {
    /// Path to the TOML configuration file. Defaults are used without one.
    #[clap(long, env)]
    pub config: Option<PathBuf>,

    /// The log filter. Overrides the one from the configuration file.
    #[clap(long, env)]
    pub log: Option<String>,

    /// At which log level logs should be printed to stderr instead of stdout.
    #[clap(long, env)]
    pub stderr_threshold: Option<tracing::Level>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Prints the EIP-712 hash of the order in a JSON file.
    OrderHash { order: PathBuf },
    /// Decodes a maker traits word given as decimal or 0x prefixed hex.
    MakerTraits { word: String },
    /// Decodes a taker traits word given as decimal or 0x prefixed hex.
    TakerTraits { word: String },
    /// Decodes hex encoded extension bytes.
    Extension { bytes: String },
}

impl fmt::Display for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "config: {:?}", self.config)?;
        writeln!(f, "log: {:?}", self.log)?;
        writeln!(f, "stderr_threshold: {:?}", self.stderr_threshold)?;
        write!(f, "command: {:?}", self.command)
    }
}
