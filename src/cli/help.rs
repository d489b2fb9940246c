//! Stable command names used in log records.

use crate::cli::parse::{Commands, ConfigCommands};

/// Command name string for logging (e.g. "terminate", "config.show").
pub fn command_name(command: &Commands) -> String {
    match command {
        Commands::Workspaces => "workspaces".to_string(),
        Commands::Boxes { .. } => "boxes".to_string(),
        Commands::Profiles { .. } => "profiles".to_string(),
        Commands::Instance { .. } => "instance".to_string(),
        Commands::Instances { .. } => "instances".to_string(),
        Commands::Find { .. } => "find".to_string(),
        Commands::Stack { .. } => "stack".to_string(),
        Commands::Deploy { .. } => "deploy".to_string(),
        Commands::Reconfigure { .. } => "reconfigure".to_string(),
        Commands::Reinstall { .. } => "reinstall".to_string(),
        Commands::Poweron { .. } => "poweron".to_string(),
        Commands::Shutdown { .. } => "shutdown".to_string(),
        Commands::Terminate { force: true, .. } => "terminate.force".to_string(),
        Commands::Terminate { .. } => "terminate".to_string(),
        Commands::Delete { .. } => "delete".to_string(),
        Commands::Update { .. } => "update".to_string(),
        Commands::Config { command } => format!("config.{}", config_command_name(command)),
    }
}

pub fn config_command_name(command: &ConfigCommands) -> &'static str {
    match command {
        ConfigCommands::Show => "show",
        ConfigCommands::Validate => "validate",
    }
}

/// Whether the command changes server-side state.
pub fn is_mutating(command: &Commands) -> bool {
    matches!(
        command,
        Commands::Deploy { .. }
            | Commands::Reconfigure { .. }
            | Commands::Reinstall { .. }
            | Commands::Poweron { .. }
            | Commands::Shutdown { .. }
            | Commands::Terminate { .. }
            | Commands::Delete { .. }
            | Commands::Update { .. }
    )
}
