use {
    super::{
        extract,
        services::report,
        source,
    },
    anyhow::Result,
    config as config_rs,
    config_rs::{
        Environment,
        File,
    },
    serde::Deserialize,
    std::path::Path,
};

/// Configuration for all components of the syncer
#[derive(Deserialize, Debug, Default)]
pub struct Config {
    #[serde(default)]
    pub source:  source::Config,
    #[serde(default)]
    pub updater: source::UpdaterConfig,
    #[serde(default)]
    pub extract: extract::Config,
    #[serde(default)]
    pub report:  report::Config,
}

impl Config {
    pub fn new(config_file: impl AsRef<Path>) -> Result<Self> {
        // Build a new configuration object, allowing the default values to be
        // overridden by those in the config_file or "HOURS_SYNC_"-prefixed
        // environment variables, e.g. HOURS_SYNC_SOURCE__CACHE_TTL=1m.
        config_rs::Config::builder()
            .add_source(File::from(config_file.as_ref()))
            .add_source(
                Environment::with_prefix("hours_sync")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
            .map_err(|e| e.into())
    }
}
