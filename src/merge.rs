//! Variable overrides
//!
//! Overrides are matched against variables by name and scope, an absent scope
//! being the same as "".

use crate::stack::DeclaredVariables;
use crate::types::{Variable, VariableKey};
use tracing::{debug, warn};

/// What [`merge_overrides`] did with each override.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Existing variables whose value was overwritten
    pub updated: Vec<VariableKey>,
    /// Declared variables copied onto the instance
    pub materialized: Vec<VariableKey>,
    /// Overrides matching nothing, left out
    pub dropped: Vec<VariableKey>,
}

impl MergeReport {
    pub fn has_changes(&self) -> bool {
        !self.updated.is_empty() || !self.materialized.is_empty()
    }
}

/// Apply overrides to an instance's variables.
///
/// An override matching an instance variable overwrites its value. One that is
/// only declared in the box stack is materialised from the declaration, once per
/// key. Anything else is dropped with a warning.
pub fn merge_overrides(
    variables: &mut Vec<Variable>,
    declared: &DeclaredVariables,
    overrides: &[Variable],
) -> MergeReport {
    let mut report = MergeReport::default();

    for override_var in overrides {
        if let Some(existing) = variables.iter_mut().find(|v| v.matches(override_var)) {
            existing.value = override_var.value.clone();
            report.updated.push(override_var.key());
            continue;
        }

        let key = override_var.key();
        match declared.get(&key) {
            Some(declaration) => {
                let mut materialized = declaration.clone();
                materialized.strip_empty_scope();
                materialized.value = override_var.value.clone();
                debug!(variable = %key, "Materialising declared variable");
                variables.push(materialized);
                report.materialized.push(key);
            }
            None => {
                warn!(variable = %key, "Override matches no instance or declared variable, dropping");
                report.dropped.push(key);
            }
        }
    }

    report
}

/// Legacy profile update: overwrite matching variables, append the rest.
pub fn splice_overrides(variables: &mut Vec<Variable>, overrides: &[Variable]) {
    for override_var in overrides {
        match variables.iter_mut().find(|v| v.matches(override_var)) {
            Some(existing) => existing.value = override_var.value.clone(),
            None => {
                let mut appended = override_var.clone();
                appended.strip_empty_scope();
                variables.push(appended);
            }
        }
    }
}

/// Remove overrides that are not declared anywhere in the stack. Returns the
/// keys that were removed.
pub fn retain_declared(overrides: &mut Vec<Variable>, declared: &DeclaredVariables) -> Vec<VariableKey> {
    let mut removed = Vec::new();
    overrides.retain(|v| {
        let key = v.key();
        if declared.contains(&key) {
            true
        } else {
            warn!(variable = %key, "Removing undeclared override");
            removed.push(key);
            false
        }
    });
    removed
}

pub fn drop_empty_values(overrides: &mut Vec<Variable>) -> Vec<VariableKey> {
    let mut removed = Vec::new();
    overrides.retain(|v| {
        if v.text().is_empty() {
            removed.push(v.key());
            false
        } else {
            true
        }
    });
    removed
}
