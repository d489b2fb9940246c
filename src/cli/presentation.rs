//! CLI presentation: table and json formatters per command family.

mod lifecycle;
mod resources;

pub use lifecycle::{format_config_validation, format_deleted, format_monitor, format_updates};
pub use resources::{
    format_boxes, format_instance, format_instances, format_profiles, format_stack,
    format_workspaces,
};

use comfy_table::Table;
use serde::Serialize;

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

pub(crate) fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(header);
    table
}
