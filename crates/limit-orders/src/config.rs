use {
    anyhow::{Context, Result},
    model::Domain,
    serde::Deserialize,
    std::path::Path,
};

/// Contents of the TOML configuration file. Every key is optional.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// The EIP-712 domain orders are signed for.
    #[serde(default)]
    pub domain: Domain,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Output log events as JSON.
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_filter() -> String {
    "warn,limit_orders=info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            domain: Domain::default(),
            log_filter: default_log_filter(),
            log_json: false,
        }
    }
}

/// Loads the configuration from a TOML file.
pub fn load(path: &Path) -> Result<Config> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("I/O error while reading {path:?}"))?;
    toml::de::from_str(&data).with_context(|| format!("TOML syntax error while reading {path:?}"))
}
