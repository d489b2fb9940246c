//! Lifecycle command presentation.

use super::{table, to_json};
use crate::client::InstanceUpdate;
use crate::config::ValidationError;
use crate::monitor::ProgressMonitor;
use serde_json::json;

pub fn format_monitor(
    monitor: &ProgressMonitor,
    page_url: Option<String>,
    waited: bool,
    json: bool,
) -> String {
    let status = if monitor.is_completed() || waited {
        "done"
    } else {
        "submitted"
    };
    if json {
        return to_json(&json!({
            "instance": monitor.resource_url(),
            "page": page_url,
            "status": status,
            "state": monitor.last_observed_state().map(|s| s.as_str()),
            "submitted_at": monitor.created_at().to_rfc3339(),
        }));
    }
    let mut output = format!("Instance: {}\nStatus: {}\n", monitor.resource_url(), status);
    if let Some(page) = page_url {
        output.push_str(&format!("Page: {}\n", page));
    }
    output
}

pub fn format_updates(updates: &[InstanceUpdate], json: bool) -> String {
    if json {
        let rows: Vec<_> = updates
            .iter()
            .map(|u| {
                json!({
                    "instance": u.instance.id,
                    "updated": u.report.updated.iter().map(|k| k.to_string()).collect::<Vec<_>>(),
                    "materialized": u.report.materialized.iter().map(|k| k.to_string()).collect::<Vec<_>>(),
                    "dropped": u.report.dropped.iter().map(|k| k.to_string()).collect::<Vec<_>>(),
                })
            })
            .collect();
        return to_json(&rows);
    }
    if updates.is_empty() {
        return "No matching instances found.".to_string();
    }
    let mut table = table(vec!["Instance", "Updated", "Added", "Dropped"]);
    for update in updates {
        let dropped: Vec<String> = update.report.dropped.iter().map(|k| k.to_string()).collect();
        table.add_row(vec![
            update.instance.id.clone(),
            update.report.updated.len().to_string(),
            update.report.materialized.len().to_string(),
            if dropped.is_empty() {
                "-".to_string()
            } else {
                dropped.join(", ")
            },
        ]);
    }
    table.to_string()
}

pub fn format_deleted(instance_id: &str, json: bool) -> String {
    if json {
        return to_json(&json!({ "instance": instance_id, "status": "deleted" }));
    }
    format!("Deleted instance {}", instance_id)
}

pub fn format_config_validation(errors: &[ValidationError]) -> String {
    if errors.is_empty() {
        return "Configuration is valid.".to_string();
    }
    let mut output = format!("Configuration has {} problem(s):\n", errors.len());
    for error in errors {
        output.push_str(&format!("  - {}\n", error));
    }
    output
}
