//! CLI domain: parse, route, help, output, and presentation only.
//! No lifecycle logic; the route table dispatches to the resource client.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::{command_name, is_mutating};
pub use output::{exit_code, map_error};
pub use parse::{parse_variable, Cli, Commands, ConfigCommands, WaitArgs};
pub use route::RunContext;
