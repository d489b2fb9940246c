//! Endpoint URL construction for the control-plane API.

use crate::types::{Instance, InstanceOperation};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left unescaped in a path segment or query value.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn encode(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// How an instance is removed by `DELETE /services/instances/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOperation {
    Terminate,
    ForceTerminate,
    Delete,
}

impl DeleteOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            DeleteOperation::Terminate => "terminate",
            DeleteOperation::ForceTerminate => "force_terminate",
            DeleteOperation::Delete => "delete",
        }
    }
}

/// Base URL of an ElasticBox deployment with a trailing `/` trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: String,
}

impl Endpoint {
    pub fn new(url: &str) -> Self {
        Self {
            base: url.trim_end_matches('/').to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.base
    }

    /// Absolute URLs pass through; paths starting with `/` are joined to the base.
    pub fn resolve(&self, path_or_url: &str) -> String {
        if path_or_url.starts_with('/') {
            format!("{}{}", self.base, path_or_url)
        } else {
            path_or_url.to_string()
        }
    }

    pub fn token_url(&self) -> String {
        format!("{}/services/security/token", self.base)
    }

    pub fn workspaces_url(&self) -> String {
        format!("{}/services/workspaces", self.base)
    }

    pub fn workspace_boxes_url(&self, workspace_id: &str) -> String {
        format!("{}/services/workspaces/{}/boxes", self.base, encode(workspace_id))
    }

    pub fn box_url(&self, box_id: &str) -> String {
        format!("{}/services/boxes/{}", self.base, encode(box_id))
    }

    pub fn box_versions_url(&self, box_id: &str) -> String {
        format!("{}/versions", self.box_url(box_id))
    }

    pub fn box_stack_url(&self, box_id: &str) -> String {
        format!("{}/stack", self.box_url(box_id))
    }

    pub fn workspace_profiles_url(&self, workspace_id: &str, box_version: Option<&str>) -> String {
        let url = format!(
            "{}/services/workspaces/{}/profiles",
            self.base,
            encode(workspace_id)
        );
        match box_version {
            Some(version) => format!("{}?box_version={}", url, encode(version)),
            None => url,
        }
    }

    pub fn profile_url(&self, profile_id: &str) -> String {
        format!("{}/services/profiles/{}", self.base, encode(profile_id))
    }

    pub fn instances_url(&self) -> String {
        format!("{}/services/instances", self.base)
    }

    pub fn instance_url(&self, instance_id: &str) -> String {
        format!("{}/{}", self.instances_url(), encode(instance_id))
    }

    pub fn instance_operation_url(&self, instance_id: &str, operation: InstanceOperation) -> String {
        format!("{}/{}", self.instance_url(instance_id), operation.as_str())
    }

    pub fn instance_delete_url(&self, instance_id: &str, operation: DeleteOperation) -> String {
        format!(
            "{}?operation={}",
            self.instance_url(instance_id),
            operation.as_str()
        )
    }

    /// Instances of a workspace, optionally restricted to a batch of ids.
    pub fn workspace_instances_url(&self, workspace_id: &str, ids: Option<&[String]>) -> String {
        let url = format!(
            "{}/services/workspaces/{}/instances",
            self.base,
            encode(workspace_id)
        );
        match ids {
            Some(ids) => {
                let csv: Vec<String> = ids.iter().map(|id| encode(id)).collect();
                format!("{}?ids={}", url, csv.join(","))
            }
            None => url,
        }
    }

    /// Web console page for an instance resource URL of this endpoint.
    pub fn page_url(&self, resource_url: &str) -> Option<String> {
        let prefix = format!("{}/services/instances/", self.base);
        if !resource_url.starts_with(&prefix) {
            return None;
        }
        let id = resource_id(resource_url);
        if id.is_empty() {
            return None;
        }
        Some(format!("{}/#/instances/{}/i", self.base, id))
    }

    /// Web console page for an instance, with its name slugged into the URL.
    pub fn instance_page_url(&self, instance: &Instance) -> Option<String> {
        let uri = instance.uri.as_deref()?;
        if !uri.starts_with("/services/instances/") {
            return None;
        }
        let slug: String = instance
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
            .collect();
        Some(format!("{}/#/instances/{}/{}", self.base, instance.id, slug))
    }
}

/// Last path segment of a resource URL.
pub fn resource_id(resource_url: &str) -> &str {
    resource_url
        .rsplit_once('/')
        .map(|(_, id)| id)
        .unwrap_or(resource_url)
}
