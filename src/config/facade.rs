//! Configuration loading facade over the layered sources.

use super::merge::merge_policy;
use super::sources::{environment, global_file, project_file};
use super::EbxConfig;
use crate::error::ApiError;
use config::File;
use std::path::Path;
use tracing::debug;

/// Loads [`EbxConfig`] from defaults, files and environment.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a project directory.
    ///
    /// Precedence (lowest to highest): defaults, global file, `ebx.toml`,
    /// `ebx.{EBX_ENV}.toml`, `EBX_` environment variables.
    pub fn load(project_dir: &Path) -> Result<EbxConfig, ApiError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = project_file::add_to_builder(builder, project_dir)?;
        let builder = environment::add_to_builder(builder);

        let config: EbxConfig = builder.build()?.try_deserialize()?;
        debug!(project_dir = %project_dir.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load configuration from an explicit file. The file must exist; the global
    /// file and environment still apply around it.
    pub fn load_from_file(path: &Path) -> Result<EbxConfig, ApiError> {
        if !path.exists() {
            return Err(ApiError::ConfigError(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = builder.add_source(File::from(path).required(true));
        let builder = environment::add_to_builder(builder);

        let config: EbxConfig = builder.build()?.try_deserialize()?;
        debug!(config_path = %path.display(), "Configuration loaded");
        Ok(config)
    }
}
