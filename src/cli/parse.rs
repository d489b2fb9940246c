//! CLI parse: clap types for ebx. No behavior beyond argument parsing.

use crate::types::Variable;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// ebx - drive ElasticBox instances from the command line
#[derive(Parser, Debug)]
#[command(name = "ebx", version)]
#[command(about = "Deploy, reconfigure and tear down ElasticBox instances")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project directory searched for ebx.toml
    #[arg(long, default_value = ".")]
    pub project: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Print results as JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,
}

/// Waiting for a lifecycle operation to finish.
#[derive(Args, Debug, Clone, Default)]
pub struct WaitArgs {
    /// Block until the operation finishes
    #[arg(long)]
    pub wait: bool,

    /// Minutes to wait before giving up (0 waits indefinitely)
    #[arg(long, requires = "wait")]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List workspaces
    Workspaces,
    /// List the boxes of a workspace
    Boxes { workspace: String },
    /// List the profiles a workspace can deploy a box with
    Profiles {
        workspace: String,
        #[arg(long = "box")]
        box_id: String,
    },
    /// Show an instance
    Instance { id: String },
    /// List instances of a workspace
    Instances {
        workspace: String,
        /// Restrict to these instance ids
        #[arg(long = "id")]
        ids: Vec<String>,
    },
    /// Find instances by id across every workspace
    Find {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Show the box stack of a box, or of an instance with --instance
    Stack {
        id: String,
        #[arg(long)]
        instance: bool,
    },
    /// Deploy a profile
    Deploy {
        #[arg(long)]
        profile: String,
        #[arg(long)]
        workspace: String,
        #[arg(long)]
        environment: String,
        /// Box version to deploy instead of the profile's
        #[arg(long)]
        box_version: Option<String>,
        #[arg(long, default_value_t = 1)]
        instances: u32,
        /// Variable override, name[@scope]=value
        #[arg(long = "var", value_parser = parse_variable)]
        variables: Vec<Variable>,
        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Reconfigure an instance
    Reconfigure {
        id: String,
        #[arg(long = "var", value_parser = parse_variable)]
        variables: Vec<Variable>,
        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Reinstall an instance
    Reinstall {
        id: String,
        #[arg(long = "var", value_parser = parse_variable)]
        variables: Vec<Variable>,
        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Power an instance on
    Poweron {
        id: String,
        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Shut an instance down
    Shutdown {
        id: String,
        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Terminate an instance
    Terminate {
        id: String,
        /// Skip the graceful terminate
        #[arg(long)]
        force: bool,
        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Delete an instance record
    Delete { id: String },
    /// Apply variable overrides to instances without running an operation
    Update {
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(long = "var", value_parser = parse_variable, required = true)]
        variables: Vec<Variable>,
    },
    /// Inspect the effective configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the merged configuration (password omitted)
    Show,
    /// Check the configuration for problems
    Validate,
}

/// Parse `name[@scope]=value`.
pub fn parse_variable(raw: &str) -> Result<Variable, String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name[@scope]=value, got '{}'", raw))?;
    let (name, scope) = match key.split_once('@') {
        Some((name, scope)) => (name.trim(), Some(scope.trim())),
        None => (key.trim(), None),
    };
    if name.is_empty() {
        return Err(format!("variable name missing in '{}'", raw));
    }

    let variable = Variable::new(name, value);
    Ok(match scope {
        Some(scope) if !scope.is_empty() => variable.with_scope(scope),
        _ => variable,
    })
}
