//! ElasticBox resource client
//!
//! [`Client`] reads workspaces, boxes, profiles and instances and drives the
//! instance lifecycle (see [`lifecycle`]). Every client owns its own session
//! token but can share one transport, and therefore one connection pool, with
//! other clients.

use crate::config::EbxConfig;
use crate::error::ApiError;
use crate::executor::{Credentials, RequestExecutor};
use crate::merge::{merge_overrides, MergeReport};
use crate::stack::{BoxSource, BoxStack};
use crate::transport::{Method, ReqwestTransport, Transport};
use crate::types::{BoxDefinition, Instance, Profile, Variable, Workspace};
use crate::urls::Endpoint;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub mod lifecycle;

/// Result of an instance update.
#[derive(Debug, Clone)]
pub struct InstanceUpdate {
    /// The instance as stored by the server after the update
    pub instance: Instance,
    pub report: MergeReport,
}

#[derive(Debug, Clone)]
pub struct Client {
    executor: Arc<RequestExecutor>,
    endpoint: Endpoint,
    batch_size: usize,
    poll_interval: Duration,
}

/// Reject a blank identifier before it reaches a URL.
pub(crate) fn require_id(value: &str, what: &'static str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        Err(ApiError::BlankIdentifier(what))
    } else {
        Ok(())
    }
}

impl Client {
    /// Build a client on an existing transport. The configuration is validated
    /// first.
    pub fn new(config: &EbxConfig, transport: Arc<dyn Transport>) -> Result<Self, ApiError> {
        config.ensure_valid()?;
        let endpoint = Endpoint::new(config.connection.url.trim());
        let credentials = Credentials::new(
            config.connection.email.clone(),
            config.connection.password.clone(),
        );
        Ok(Self {
            executor: Arc::new(RequestExecutor::new(
                transport,
                endpoint.clone(),
                credentials,
            )),
            endpoint,
            batch_size: config.connection.batch_size,
            poll_interval: config.monitor.poll_interval(),
        })
    }

    /// Build a client with its own `reqwest` transport.
    pub fn from_config(config: &EbxConfig) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::shared(&config.transport)?;
        Self::new(config, transport)
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Authenticate now instead of on the first request.
    pub async fn connect(&self) -> Result<(), ApiError> {
        self.executor.connect().await
    }

    pub async fn workspaces(&self) -> Result<Vec<Workspace>, ApiError> {
        self.executor.get_json(&self.endpoint.workspaces_url()).await
    }

    pub async fn boxes(&self, workspace_id: &str) -> Result<Vec<BoxDefinition>, ApiError> {
        require_id(workspace_id, "workspaceId")?;
        self.executor
            .get_json(&self.endpoint.workspace_boxes_url(workspace_id))
            .await
    }

    pub async fn get_box(&self, box_id: &str) -> Result<BoxDefinition, ApiError> {
        require_id(box_id, "boxId")?;
        self.executor.get_json(&self.endpoint.box_url(box_id)).await
    }

    pub async fn box_versions(&self, box_id: &str) -> Result<Vec<BoxDefinition>, ApiError> {
        require_id(box_id, "boxId")?;
        self.executor
            .get_json(&self.endpoint.box_versions_url(box_id))
            .await
    }

    /// Profiles of a workspace for a box.
    ///
    /// When the workspace can only read the box, profiles attached to any of
    /// the box's versions are included as well.
    pub async fn profiles(&self, workspace_id: &str, box_id: &str) -> Result<Vec<Profile>, ApiError> {
        require_id(workspace_id, "workspaceId")?;
        require_id(box_id, "boxId")?;

        let mut profiles: Vec<Profile> = self
            .executor
            .get_json(&self.endpoint.workspace_profiles_url(workspace_id, Some(box_id)))
            .await?;

        let definition = self.get_box(box_id).await?;
        if definition.can_change(workspace_id) {
            return Ok(profiles);
        }

        let versions = self.box_versions(box_id).await?;
        if versions.is_empty() {
            return Ok(profiles);
        }
        let version_ids: HashSet<&str> = versions.iter().map(|v| v.id.as_str()).collect();

        let all: Vec<Profile> = self
            .executor
            .get_json(&self.endpoint.workspace_profiles_url(workspace_id, None))
            .await?;
        let mut seen: HashSet<String> = profiles.iter().map(|p| p.id.clone()).collect();
        for profile in all {
            let matches_version = profile
                .box_version()
                .map(|version| version_ids.contains(version))
                .unwrap_or(false);
            if matches_version && seen.insert(profile.id.clone()) {
                profiles.push(profile);
            }
        }
        debug!(workspace = %workspace_id, box_id = %box_id, count = profiles.len(), "Collected profiles for read-only box");
        Ok(profiles)
    }

    pub async fn profile(&self, profile_id: &str) -> Result<Profile, ApiError> {
        require_id(profile_id, "profileId")?;
        self.executor
            .get_json(&self.endpoint.profile_url(profile_id))
            .await
    }

    pub async fn instance(&self, instance_id: &str) -> Result<Instance, ApiError> {
        require_id(instance_id, "instanceId")?;
        self.executor
            .get_json(&self.endpoint.instance_url(instance_id))
            .await
    }

    pub async fn instances(&self, workspace_id: &str) -> Result<Vec<Instance>, ApiError> {
        require_id(workspace_id, "workspaceId")?;
        self.executor
            .get_json(&self.endpoint.workspace_instances_url(workspace_id, None))
            .await
    }

    /// Instances of a workspace with the given ids, queried in batches of at
    /// most `batch_size` ids. Results keep batch order.
    pub async fn instances_by_ids(
        &self,
        workspace_id: &str,
        instance_ids: &[String],
    ) -> Result<Vec<Instance>, ApiError> {
        require_id(workspace_id, "workspaceId")?;
        let mut instances = Vec::new();
        for batch in instance_ids.chunks(self.batch_size.max(1)) {
            let url = self
                .endpoint
                .workspace_instances_url(workspace_id, Some(batch));
            let found: Vec<Instance> = self.executor.get_json(&url).await?;
            instances.extend(found);
        }
        Ok(instances)
    }

    /// Look instances up across every workspace. Only ids not found yet are
    /// queried, and the search stops once all of them have been found.
    pub async fn find_instances(&self, instance_ids: &[String]) -> Result<Vec<Instance>, ApiError> {
        let mut outstanding: Vec<String> = Vec::new();
        for id in instance_ids {
            if !outstanding.contains(id) {
                outstanding.push(id.clone());
            }
        }

        let mut found: Vec<Instance> = Vec::new();
        if outstanding.is_empty() {
            return Ok(found);
        }

        for workspace in self.workspaces().await? {
            let batch = self.instances_by_ids(&workspace.id, &outstanding).await?;
            for instance in batch {
                if let Some(pos) = outstanding.iter().position(|id| *id == instance.id) {
                    outstanding.remove(pos);
                    found.push(instance);
                }
            }
            if outstanding.is_empty() {
                break;
            }
        }

        if !outstanding.is_empty() {
            debug!(missing = ?outstanding, "Instances not found in any workspace");
        }
        Ok(found)
    }

    /// Dependency closure of a box as computed by the server.
    pub async fn box_stack(&self, box_id: &str) -> Result<BoxStack, ApiError> {
        require_id(box_id, "boxId")?;
        let definitions: Vec<BoxDefinition> = self
            .executor
            .get_json(&self.endpoint.box_stack_url(box_id))
            .await?;
        Ok(BoxStack::from_definitions(definitions))
    }

    /// Box stack of an instance, built from the boxes the instance carries.
    pub async fn instance_box_stack(&self, instance: &Instance) -> Result<BoxStack, ApiError> {
        BoxStack::for_instance(instance, self).await
    }

    /// Apply variable overrides to an instance and store it.
    pub async fn update_instance(
        &self,
        mut instance: Instance,
        overrides: &[Variable],
    ) -> Result<InstanceUpdate, ApiError> {
        require_id(&instance.id, "instanceId")?;

        let mut report = MergeReport::default();
        if !overrides.is_empty() {
            let declared = self.instance_box_stack(&instance).await?.declared_variables();
            report = merge_overrides(&mut instance.variables, &declared, overrides);
        }

        let url = self.endpoint.instance_url(&instance.id);
        let stored: Instance = self.executor.send_json(Method::Put, &url, &instance).await?;
        info!(
            instance = %stored.id,
            updated = report.updated.len(),
            materialized = report.materialized.len(),
            dropped = report.dropped.len(),
            "Updated instance"
        );
        Ok(InstanceUpdate {
            instance: stored,
            report,
        })
    }

    /// Apply the same overrides to several instances, wherever they live.
    pub async fn update_instances(
        &self,
        instance_ids: &[String],
        overrides: &[Variable],
    ) -> Result<Vec<InstanceUpdate>, ApiError> {
        for id in instance_ids {
            require_id(id, "instanceId")?;
        }
        let instances = self.find_instances(instance_ids).await?;
        let mut updates = Vec::with_capacity(instances.len());
        for instance in instances {
            updates.push(self.update_instance(instance, overrides).await?);
        }
        Ok(updates)
    }

    /// Web console page for an instance resource URL.
    pub fn page_url(&self, resource_url: &str) -> Option<String> {
        self.endpoint.page_url(resource_url)
    }

    pub(crate) fn executor(&self) -> &Arc<RequestExecutor> {
        &self.executor
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

#[async_trait]
impl BoxSource for Client {
    async fn fetch_box(&self, box_id: &str) -> Result<BoxDefinition, ApiError> {
        self.get_box(box_id).await
    }
}
