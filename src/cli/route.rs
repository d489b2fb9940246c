//! CLI route: single route table and run context. Dispatches to the resource
//! client and presentation.

use crate::cli::help::{command_name, is_mutating};
use crate::cli::parse::{Commands, ConfigCommands, WaitArgs};
use crate::cli::presentation::{
    format_boxes, format_config_validation, format_deleted, format_instance, format_instances,
    format_monitor, format_profiles, format_stack, format_updates, format_workspaces,
};
use crate::client::Client;
use crate::config::{ConfigLoader, EbxConfig};
use crate::deploy::DeployOptions;
use crate::error::ApiError;
use crate::monitor::ProgressMonitor;
use std::path::PathBuf;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Runtime context for CLI execution: the loaded configuration and output mode.
pub struct RunContext {
    config: EbxConfig,
    config_path: Option<PathBuf>,
    json: bool,
}

impl RunContext {
    /// Load configuration from `config_path` when given, otherwise from the
    /// layered sources rooted at `project_dir`.
    pub fn new(
        project_dir: PathBuf,
        config_path: Option<PathBuf>,
        json: bool,
    ) -> Result<Self, ApiError> {
        let config = match &config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&project_dir)?,
        };
        Ok(Self {
            config,
            config_path,
            json,
        })
    }

    /// Run context over an already loaded configuration.
    pub fn from_config(config: EbxConfig, json: bool) -> Self {
        Self {
            config,
            config_path: None,
            json,
        }
    }

    pub fn config(&self) -> &EbxConfig {
        &self.config
    }

    fn client(&self) -> Result<Client, ApiError> {
        Client::from_config(&self.config)
    }

    /// Execute a command and return its rendered output.
    pub async fn execute(
        &self,
        command: &Commands,
        cancel: &CancellationToken,
    ) -> Result<String, ApiError> {
        let name = command_name(command);
        let started = Instant::now();
        debug!(command = %name, mutating = is_mutating(command), "Executing command");

        let result = self.dispatch(command, cancel).await;

        info!(
            command = %name,
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    async fn dispatch(
        &self,
        command: &Commands,
        cancel: &CancellationToken,
    ) -> Result<String, ApiError> {
        match command {
            Commands::Config { command } => self.handle_config(command),
            Commands::Workspaces => {
                let workspaces = self.client()?.workspaces().await?;
                Ok(format_workspaces(&workspaces, self.json))
            }
            Commands::Boxes { workspace } => {
                let boxes = self.client()?.boxes(workspace).await?;
                Ok(format_boxes(&boxes, self.json))
            }
            Commands::Profiles { workspace, box_id } => {
                let profiles = self.client()?.profiles(workspace, box_id).await?;
                Ok(format_profiles(&profiles, self.json))
            }
            Commands::Instance { id } => {
                let client = self.client()?;
                let instance = client.instance(id).await?;
                Ok(format_instance(&instance, client.endpoint(), self.json))
            }
            Commands::Instances { workspace, ids } => {
                let client = self.client()?;
                let instances = if ids.is_empty() {
                    client.instances(workspace).await?
                } else {
                    client.instances_by_ids(workspace, ids).await?
                };
                Ok(format_instances(&instances, client.endpoint(), self.json))
            }
            Commands::Find { ids } => {
                let client = self.client()?;
                let instances = client.find_instances(ids).await?;
                Ok(format_instances(&instances, client.endpoint(), self.json))
            }
            Commands::Stack { id, instance } => {
                let client = self.client()?;
                let stack = if *instance {
                    let instance = client.instance(id).await?;
                    client.instance_box_stack(&instance).await?
                } else {
                    client.box_stack(id).await?
                };
                Ok(format_stack(&stack, self.json))
            }
            Commands::Deploy {
                profile,
                workspace,
                environment,
                box_version,
                instances,
                variables,
                wait,
            } => {
                let client = self.client()?;
                let options = DeployOptions {
                    profile_id: profile.clone(),
                    workspace_id: workspace.clone(),
                    environment: environment.clone(),
                    box_version: box_version.clone(),
                    instances: *instances,
                    variables: variables.clone(),
                };
                let monitor = client.deploy(&options).await?;
                self.finish(&client, monitor, wait, cancel).await
            }
            Commands::Reconfigure {
                id,
                variables,
                wait,
            } => {
                let client = self.client()?;
                let monitor = client.reconfigure(id, variables).await?;
                self.finish(&client, monitor, wait, cancel).await
            }
            Commands::Reinstall {
                id,
                variables,
                wait,
            } => {
                let client = self.client()?;
                let monitor = client.reinstall(id, variables).await?;
                self.finish(&client, monitor, wait, cancel).await
            }
            Commands::Poweron { id, wait } => {
                let client = self.client()?;
                let monitor = client.poweron(id).await?;
                self.finish(&client, monitor, wait, cancel).await
            }
            Commands::Shutdown { id, wait } => {
                let client = self.client()?;
                let monitor = client.shutdown(id).await?;
                self.finish(&client, monitor, wait, cancel).await
            }
            Commands::Terminate { id, force, wait } => {
                let client = self.client()?;
                let monitor = if *force {
                    client.force_terminate(id).await?
                } else {
                    client.terminate(id).await?
                };
                self.finish(&client, monitor, wait, cancel).await
            }
            Commands::Delete { id } => {
                self.client()?.delete(id).await?;
                Ok(format_deleted(id, self.json))
            }
            Commands::Update { ids, variables } => {
                let updates = self.client()?.update_instances(ids, variables).await?;
                Ok(format_updates(&updates, self.json))
            }
        }
    }

    async fn finish(
        &self,
        client: &Client,
        monitor: ProgressMonitor,
        wait: &WaitArgs,
        cancel: &CancellationToken,
    ) -> Result<String, ApiError> {
        if wait.wait {
            let timeout = wait.timeout.unwrap_or(self.config.monitor.timeout_minutes);
            monitor.wait_for_done(timeout, cancel).await?;
        }
        let page = client.page_url(monitor.resource_url());
        Ok(format_monitor(&monitor, page, wait.wait, self.json))
    }

    fn handle_config(&self, command: &ConfigCommands) -> Result<String, ApiError> {
        match command {
            ConfigCommands::Show => {
                let rendered = toml::to_string_pretty(&self.config).map_err(|e| {
                    ApiError::ConfigError(format!("Failed to render configuration: {}", e))
                })?;
                match &self.config_path {
                    Some(path) => Ok(format!("# {}\n{}", path.display(), rendered)),
                    None => Ok(rendered),
                }
            }
            ConfigCommands::Validate => match self.config.validate() {
                Ok(()) => Ok(format_config_validation(&[])),
                Err(errors) => Err(ApiError::ConfigError(format_config_validation(&errors))),
            },
        }
    }
}
