//! Project config file source: ebx.toml and ebx.{env}.toml in a project directory.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use std::path::Path;

/// Add project config files to builder.
/// Precedence: ebx.toml (base) then ebx.{EBX_ENV}.toml (env-specific).
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    project_dir: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let env_name = std::env::var("EBX_ENV").unwrap_or_else(|_| "development".to_string());

    let mut builder = builder;

    let base_config_path = project_dir.join("ebx.toml");
    if base_config_path.exists() {
        builder = builder.add_source(File::from(base_config_path).required(false));
    }

    let env_config_path = project_dir.join(format!("ebx.{}.toml", env_name));
    if env_config_path.exists() {
        builder = builder.add_source(File::from(env_config_path).required(false));
    }

    Ok(builder)
}
