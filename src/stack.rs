//! Box stacks and declared variables
//!
//! A box stack is the ordered dependency closure of a box: the box itself first,
//! then every box it pulls in through `Box`-typed variables, depth first. Each
//! entry carries the scope its variables live under, which is the chain of
//! referencing variable names joined with `.`.

use crate::error::ApiError;
use crate::types::{BoxDefinition, Instance, Variable, VariableKey};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Where boxes missing from an instance's own box list are fetched from.
#[async_trait]
pub trait BoxSource: Send + Sync {
    async fn fetch_box(&self, box_id: &str) -> Result<BoxDefinition, ApiError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackEntry {
    pub definition: BoxDefinition,
    pub scope: String,
}

impl StackEntry {
    /// Scope a variable of this entry is declared under: its own scope when it
    /// has one, the entry's otherwise.
    pub fn effective_scope<'a>(&'a self, variable: &'a Variable) -> &'a str {
        match variable.scope.as_deref() {
            Some(scope) if !scope.is_empty() => scope,
            _ => &self.scope,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoxStack {
    entries: Vec<StackEntry>,
}

struct Frame {
    definition: BoxDefinition,
    scope: String,
    ancestors: Vec<String>,
}

impl BoxStack {
    /// Stack as returned by `GET /services/boxes/{id}/stack`. The server has
    /// already scoped the variables, so entries carry the root scope.
    pub fn from_definitions(definitions: Vec<BoxDefinition>) -> Self {
        Self {
            entries: definitions
                .into_iter()
                .map(|definition| StackEntry {
                    definition,
                    scope: String::new(),
                })
                .collect(),
        }
    }

    /// Stack of an instance's main box. Boxes carried on the instance are used
    /// as-is; anything else is fetched from `source`.
    pub async fn for_instance(instance: &Instance, source: &dyn BoxSource) -> Result<Self, ApiError> {
        let root = match instance.main_box() {
            Some(root) => root.clone(),
            None => {
                warn!(instance = %instance.id, "Instance carries no boxes");
                return Ok(Self::default());
            }
        };
        Self::resolve(root, &instance.boxes, source).await
    }

    /// Walk the references of `root` depth first. References back to a box
    /// already on the current path are skipped.
    pub async fn resolve(
        root: BoxDefinition,
        known: &[BoxDefinition],
        source: &dyn BoxSource,
    ) -> Result<Self, ApiError> {
        let mut cache: HashMap<String, BoxDefinition> = known
            .iter()
            .map(|definition| (definition.id.clone(), definition.clone()))
            .collect();

        let mut entries = Vec::new();
        let mut pending = vec![Frame {
            definition: root,
            scope: String::new(),
            ancestors: Vec::new(),
        }];

        while let Some(frame) = pending.pop() {
            let mut path = frame.ancestors;
            path.push(frame.definition.id.clone());

            let mut children = Vec::new();
            for variable in &frame.definition.variables {
                if !variable.is_box_reference() {
                    continue;
                }
                let target = variable.text();
                let child_id: &str = &target;
                if child_id.is_empty() {
                    continue;
                }
                if path.iter().any(|id| id == child_id) {
                    debug!(box_id = %child_id, via = %variable.name, "Skipping cyclic box reference");
                    continue;
                }

                let child = match cache.get(child_id) {
                    Some(definition) => definition.clone(),
                    None => {
                        let definition = source.fetch_box(child_id).await?;
                        cache.insert(child_id.to_string(), definition.clone());
                        definition
                    }
                };

                let scope = if frame.scope.is_empty() {
                    variable.name.clone()
                } else {
                    format!("{}.{}", frame.scope, variable.name)
                };
                children.push(Frame {
                    definition: child,
                    scope,
                    ancestors: path.clone(),
                });
            }

            entries.push(StackEntry {
                definition: frame.definition,
                scope: frame.scope,
            });
            // reversed so the first reference is visited next
            pending.extend(children.into_iter().rev());
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[StackEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn box_ids(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|entry| entry.definition.id.as_str())
            .collect()
    }

    /// Every variable declared anywhere in the stack, under its effective scope.
    pub fn declared_variables(&self) -> DeclaredVariables {
        let mut declared = DeclaredVariables::default();
        for entry in &self.entries {
            for variable in &entry.definition.variables {
                let scope = entry.effective_scope(variable);
                let mut scoped = variable.clone();
                scoped.scope = if scope.is_empty() {
                    None
                } else {
                    Some(scope.to_string())
                };
                declared.insert(scoped);
            }
        }
        declared
    }
}

/// Declared variables keyed by (name, scope). The first declaration of a key
/// wins; iteration follows declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeclaredVariables {
    index: HashMap<VariableKey, usize>,
    variables: Vec<Variable>,
}

impl DeclaredVariables {
    /// Returns false when the key was already declared.
    pub fn insert(&mut self, variable: Variable) -> bool {
        let key = variable.key();
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key, self.variables.len());
        self.variables.push(variable);
        true
    }

    pub fn get(&self, key: &VariableKey) -> Option<&Variable> {
        self.index.get(key).map(|&i| &self.variables[i])
    }

    pub fn contains(&self, key: &VariableKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }
}

impl FromIterator<Variable> for DeclaredVariables {
    fn from_iter<I: IntoIterator<Item = Variable>>(iter: I) -> Self {
        let mut declared = DeclaredVariables::default();
        for variable in iter {
            declared.insert(variable);
        }
        declared
    }
}
