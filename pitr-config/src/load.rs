use serde::de::DeserializeOwned;
use std::path::Path;

use crate::environment::Environment;

/// Directory holding the configuration files, relative to the working directory.
const CONFIGURATION_DIR: &str = "configuration";

/// Configuration file loaded for every environment.
const BASE_CONFIG_FILE: &str = "base.yaml";

/// Prefix of the environment variables overriding configuration values.
const ENV_PREFIX: &str = "APP";

const ENV_PREFIX_SEPARATOR: &str = "_";

/// Separator for nested keys, e.g. `APP_STORAGE__BUCKET` sets `storage.bucket`.
const ENV_SEPARATOR: &str = "__";

/// Loads the configuration from the `configuration` directory of the current working directory.
///
/// See [`load_config_from`] for the order in which sources are applied.
pub fn load_config<T>() -> Result<T, config::ConfigError>
where
    T: DeserializeOwned,
{
    let base_path = std::env::current_dir().map_err(|err| {
        config::ConfigError::Message(format!("failed to determine the current directory: {err}"))
    })?;

    load_config_from(&base_path.join(CONFIGURATION_DIR))
}

/// Loads hierarchical configuration from `configuration_directory`.
///
/// Sources are applied in this order, later ones overriding earlier ones:
/// 1. `base.yaml`
/// 2. `{environment}.yaml`, where the environment comes from `APP_ENVIRONMENT` (optional file)
/// 3. environment variables prefixed with `APP_`, nested keys separated by `__`
pub fn load_config_from<T>(configuration_directory: &Path) -> Result<T, config::ConfigError>
where
    T: DeserializeOwned,
{
    let environment =
        Environment::load().map_err(|err| config::ConfigError::Message(err.to_string()))?;
    let environment_filename = format!("{environment}.yaml");

    let settings = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join(BASE_CONFIG_FILE),
        ))
        .add_source(
            config::File::from(configuration_directory.join(environment_filename))
                .required(false),
        )
        // E.g. `APP_SOURCE__SERVICE_NAME=cluster1-pxc` sets `source.service_name`.
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_PREFIX_SEPARATOR)
                .separator(ENV_SEPARATOR),
        )
        .build()?;

    settings.try_deserialize::<T>()
}
