//! Read command presentation: workspaces, boxes, profiles, instances, stacks.

use super::{table, to_json};
use crate::stack::BoxStack;
use crate::types::{BoxDefinition, Instance, Profile, Workspace};
use crate::urls::Endpoint;
use serde_json::json;

pub fn format_workspaces(workspaces: &[Workspace], json: bool) -> String {
    if json {
        return to_json(workspaces);
    }
    if workspaces.is_empty() {
        return "No workspaces found.".to_string();
    }
    let mut table = table(vec!["ID", "Name"]);
    for workspace in workspaces {
        table.add_row(vec![&workspace.id, &workspace.name]);
    }
    table.to_string()
}

pub fn format_boxes(boxes: &[BoxDefinition], json: bool) -> String {
    if json {
        return to_json(boxes);
    }
    if boxes.is_empty() {
        return "No boxes found.".to_string();
    }
    let mut table = table(vec!["ID", "Name", "Owner", "Variables"]);
    for definition in boxes {
        table.add_row(vec![
            definition.id.clone(),
            definition.name.clone(),
            definition.owner.clone().unwrap_or_else(|| "-".to_string()),
            definition.variables.len().to_string(),
        ]);
    }
    table.to_string()
}

pub fn format_profiles(profiles: &[Profile], json: bool) -> String {
    if json {
        return to_json(profiles);
    }
    if profiles.is_empty() {
        return "No profiles found.".to_string();
    }
    let mut table = table(vec!["ID", "Name", "Box version", "Schema"]);
    for profile in profiles {
        table.add_row(vec![
            profile.id.as_str(),
            profile.name.as_str(),
            profile.box_version().unwrap_or("-"),
            profile.schema.as_str(),
        ]);
    }
    table.to_string()
}

pub fn format_instances(instances: &[Instance], endpoint: &Endpoint, json: bool) -> String {
    if json {
        return to_json(instances);
    }
    if instances.is_empty() {
        return "No instances found.".to_string();
    }
    let mut table = table(vec!["ID", "Name", "State", "Operation", "Page"]);
    for instance in instances {
        table.add_row(vec![
            instance.id.clone(),
            instance.name.clone(),
            instance.state.to_string(),
            instance.operation_name().to_string(),
            endpoint
                .instance_page_url(instance)
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    format!("{}\n\nTotal: {} instance(s)", table, instances.len())
}

pub fn format_instance(instance: &Instance, endpoint: &Endpoint, json: bool) -> String {
    if json {
        return to_json(instance);
    }
    let mut output = format!("Instance: {} ({})\n", instance.name, instance.id);
    output.push_str(&format!("State: {}\n", instance.state));
    output.push_str(&format!("Operation: {}\n", instance.operation_name()));
    output.push_str(&format!("Updated: {}\n", instance.updated));
    if let Some(page) = endpoint.instance_page_url(instance) {
        output.push_str(&format!("Page: {}\n", page));
    }
    if !instance.variables.is_empty() {
        let mut table = table(vec!["Variable", "Value"]);
        for variable in &instance.variables {
            table.add_row(vec![variable.key().to_string(), variable.text().into_owned()]);
        }
        output.push('\n');
        output.push_str(&table.to_string());
    }
    output
}

pub fn format_stack(stack: &BoxStack, json: bool) -> String {
    if json {
        let entries: Vec<_> = stack
            .entries()
            .iter()
            .map(|entry| {
                json!({
                    "id": entry.definition.id,
                    "name": entry.definition.name,
                    "scope": entry.scope,
                    "variables": entry.definition.variables,
                })
            })
            .collect();
        return to_json(&entries);
    }
    if stack.is_empty() {
        return "Empty box stack.".to_string();
    }
    let mut table = table(vec!["Box", "Name", "Scope", "Variables"]);
    for entry in stack.entries() {
        let scope = if entry.scope.is_empty() {
            "-".to_string()
        } else {
            entry.scope.clone()
        };
        table.add_row(vec![
            entry.definition.id.clone(),
            entry.definition.name.clone(),
            scope,
            entry.definition.variables.len().to_string(),
        ]);
    }
    table.to_string()
}
