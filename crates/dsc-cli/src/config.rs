//! Configuration for dscctl

use dsc_gate::GateConfig;
use serde::{Deserialize, Serialize};

/// Tool configuration: gate settings shared by `verify` and `simulate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub gate: GateConfig,
}

impl CliConfig {
    /// Defaults, then the file, then `DSC_*` environment variables
    /// (`DSC_GATE__MAX_STATES=5000`). A file that was asked for must exist.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&CliConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("DSC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
