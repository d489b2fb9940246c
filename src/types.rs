//! Control-plane data model
//!
//! Typed views of the JSON documents exchanged with the ElasticBox API. Every
//! document keeps the fields the client does not model in a flattened `extra`
//! map, so an instance or profile fetched from the server can be sent back in
//! an update or deploy request without losing anything.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt;

/// Server-side processing state of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    Processing,
    Done,
    Unavailable,
}

impl InstanceState {
    pub fn as_str(self) -> &'static str {
        match self {
            InstanceState::Processing => "processing",
            InstanceState::Done => "done",
            InstanceState::Unavailable => "unavailable",
        }
    }

    /// Done and unavailable are the states in which an operation has concluded.
    pub fn is_finished(self) -> bool {
        FINISH_STATES.contains(&self)
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last operation performed on an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceOperation {
    Deploy,
    Reinstall,
    Reconfigure,
    Poweron,
    Shutdown,
    ShutdownService,
    Terminate,
    TerminateService,
    Snapshot,
}

impl InstanceOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            InstanceOperation::Deploy => "deploy",
            InstanceOperation::Reinstall => "reinstall",
            InstanceOperation::Reconfigure => "reconfigure",
            InstanceOperation::Poweron => "poweron",
            InstanceOperation::Shutdown => "shutdown",
            InstanceOperation::ShutdownService => "shutdown_service",
            InstanceOperation::Terminate => "terminate",
            InstanceOperation::TerminateService => "terminate_service",
            InstanceOperation::Snapshot => "snapshot",
        }
    }

    /// Look up a known operation by its wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        let operation = match name {
            "deploy" => InstanceOperation::Deploy,
            "reinstall" => InstanceOperation::Reinstall,
            "reconfigure" => InstanceOperation::Reconfigure,
            "poweron" => InstanceOperation::Poweron,
            "shutdown" => InstanceOperation::Shutdown,
            "shutdown_service" => InstanceOperation::ShutdownService,
            "terminate" => InstanceOperation::Terminate,
            "terminate_service" => InstanceOperation::TerminateService,
            "snapshot" => InstanceOperation::Snapshot,
            _ => return None,
        };
        Some(operation)
    }

    /// Operations after which the instance is considered running.
    pub fn is_on(self) -> bool {
        ON_OPERATIONS.contains(&self)
    }
}

impl fmt::Display for InstanceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const FINISH_STATES: &[InstanceState] = &[InstanceState::Done, InstanceState::Unavailable];

pub const ON_OPERATIONS: &[InstanceOperation] = &[
    InstanceOperation::Deploy,
    InstanceOperation::Poweron,
    InstanceOperation::Reinstall,
    InstanceOperation::Reconfigure,
    InstanceOperation::Snapshot,
];

pub const SHUTDOWN_OPERATIONS: &[InstanceOperation] = &[
    InstanceOperation::Shutdown,
    InstanceOperation::ShutdownService,
];

pub const TERMINATE_OPERATIONS: &[InstanceOperation] = &[
    InstanceOperation::Terminate,
    InstanceOperation::TerminateService,
];

/// Opaque server-assigned modification marker. Only ever compared for equality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(pub Value);

impl Revision {
    pub fn new(value: impl Into<Value>) -> Self {
        Revision(value.into())
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{}", other),
        }
    }
}

/// Identity of a variable: name plus scope, with an absent scope equal to "".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableKey {
    pub name: String,
    pub scope: String,
}

impl fmt::Display for VariableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scope.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}@{}", self.name, self.scope)
        }
    }
}

/// A box or instance variable.
///
/// The value is kept as the JSON the server sent, so numbers and booleans go
/// back out with their original type. Overrides always carry strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub value: Value,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: None,
            value: Value::String(value.into()),
            kind: None,
            extra: Map::new(),
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Textual form of the value: strings as-is, null as "", anything else
    /// as its JSON rendering.
    pub fn text(&self) -> Cow<'_, str> {
        match &self.value {
            Value::String(s) => Cow::Borrowed(s.as_str()),
            Value::Null => Cow::Borrowed(""),
            other => Cow::Owned(other.to_string()),
        }
    }

    /// Scope with the unscoped default normalised to "".
    pub fn scope_str(&self) -> &str {
        self.scope.as_deref().unwrap_or("")
    }

    pub fn key(&self) -> VariableKey {
        VariableKey {
            name: self.name.clone(),
            scope: self.scope_str().to_string(),
        }
    }

    pub fn matches(&self, other: &Variable) -> bool {
        self.name == other.name && self.scope_str() == other.scope_str()
    }

    /// Remove an empty scope marker so the variable serialises unscoped.
    pub fn strip_empty_scope(&mut self) {
        if self.scope.as_deref() == Some("") {
            self.scope = None;
        }
    }

    /// Variables of type `Box` reference another box by id.
    pub fn is_box_reference(&self) -> bool {
        self.kind.as_deref() == Some("Box")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxMember {
    pub workspace: String,
    #[serde(default)]
    pub role: String,
}

/// A box definition, as returned by the box, versions and stack endpoints and
/// as embedded in an instance's `boxes` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<BoxMember>,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BoxDefinition {
    /// Whether `workspace_id` owns the box or collaborates on it.
    pub fn can_change(&self, workspace_id: &str) -> bool {
        if self.owner.as_deref() == Some(workspace_id) {
            return true;
        }
        self.members
            .iter()
            .any(|m| m.workspace == workspace_id && m.role == "collaborator")
    }
}

/// A deployed instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub state: InstanceState,
    /// Wire name of the last operation, kept verbatim since the server may
    /// report operations this client has no variant for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    pub updated: Revision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub boxes: Vec<BoxDefinition>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Instance {
    /// The primary box is the first entry of the instance's box list.
    pub fn main_box(&self) -> Option<&BoxDefinition> {
        self.boxes.first()
    }

    /// The last operation, when it is one this client knows.
    pub fn last_operation(&self) -> Option<InstanceOperation> {
        self.operation.as_deref().and_then(InstanceOperation::from_name)
    }

    pub fn operation_name(&self) -> &str {
        self.operation.as_deref().unwrap_or("none")
    }
}

/// Box reference inside a profile.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoxReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The provider-specific section of a profile (`profile` in JSON).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServiceProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instances: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A sub-instance of a legacy (pre 2014-05-24 schema) profile.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LegacyProfileInstance {
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(rename = "profile", default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceProfile>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Deployment profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub schema: String,
    #[serde(rename = "box", default, skip_serializing_if = "Option::is_none")]
    pub box_ref: Option<BoxReference>,
    #[serde(rename = "profile", default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceProfile>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instances: Vec<LegacyProfileInstance>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Profile {
    pub fn box_version(&self) -> Option<&str> {
        self.box_ref.as_ref().and_then(|b| b.version.as_deref())
    }
}
