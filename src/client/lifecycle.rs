//! Instance lifecycle operations
//!
//! Each operation is issued once and answered with a [`ProgressMonitor`]
//! seeded with the instance revision the operation started from.

use super::{require_id, Client};
use crate::deploy::{build_deploy_request, DeployOptions};
use crate::error::ApiError;
use crate::monitor::ProgressMonitor;
use crate::transport::Method;
use crate::types::{
    Instance, InstanceOperation, InstanceState, Revision, Variable, TERMINATE_OPERATIONS,
    SHUTDOWN_OPERATIONS,
};
use crate::urls::DeleteOperation;
use tracing::info;

/// Graceful terminate only applies to a running instance, or to one whose
/// previous terminate left it unavailable. Anything else is forced.
pub fn terminate_operation(instance: &Instance) -> DeleteOperation {
    let graceful = match (instance.state, instance.last_operation()) {
        (InstanceState::Done, Some(operation)) => operation.is_on(),
        (InstanceState::Unavailable, Some(InstanceOperation::Terminate)) => true,
        _ => false,
    };
    if graceful {
        DeleteOperation::Terminate
    } else {
        DeleteOperation::ForceTerminate
    }
}

impl Client {
    fn monitor(
        &self,
        resource_url: String,
        baseline: Revision,
        accepted: &[InstanceOperation],
    ) -> ProgressMonitor {
        ProgressMonitor::new(self.executor().clone(), resource_url, baseline, accepted)
            .with_poll_interval(self.poll_interval())
    }

    /// Deploy a profile into a workspace.
    pub async fn deploy(&self, options: &DeployOptions) -> Result<ProgressMonitor, ApiError> {
        require_id(&options.profile_id, "profileId")?;
        require_id(&options.workspace_id, "workspaceId")?;

        let profile = self.profile(&options.profile_id).await?;
        let (strategy, request) = build_deploy_request(profile, options)?;

        let instance: Instance = self
            .executor()
            .send_json(Method::Post, &self.endpoint().instances_url(), &request)
            .await?;

        let uri = instance.uri.clone().ok_or_else(|| ApiError::Decode {
            url: self.endpoint().instances_url(),
            message: "deployed instance carries no uri".to_string(),
        })?;
        info!(
            instance = %instance.id,
            profile = %options.profile_id,
            workspace = %options.workspace_id,
            strategy = ?strategy,
            "Deploy requested"
        );
        Ok(self.monitor(
            self.endpoint().resolve(&uri),
            instance.updated,
            &[InstanceOperation::Deploy],
        ))
    }

    /// Issue `PUT /services/instances/{id}/{operation}`, applying overrides
    /// first, and return the instance as it stands afterwards.
    async fn run_operation(
        &self,
        instance: Instance,
        operation: InstanceOperation,
        overrides: &[Variable],
    ) -> Result<Instance, ApiError> {
        let instance_id = instance.id.clone();
        if !overrides.is_empty() {
            self.update_instance(instance, overrides).await?;
        }

        let url = self
            .endpoint()
            .instance_operation_url(&instance_id, operation);
        self.executor().send_empty(Method::Put, &url).await?;
        info!(instance = %instance_id, operation = %operation, "Operation requested");

        self.instance(&instance_id).await
    }

    async fn operate(
        &self,
        instance_id: &str,
        operation: InstanceOperation,
        overrides: &[Variable],
        accepted: &[InstanceOperation],
    ) -> Result<ProgressMonitor, ApiError> {
        let instance = self.instance(instance_id).await?;
        let instance = self.run_operation(instance, operation, overrides).await?;
        Ok(self.monitor(
            self.endpoint().instance_url(instance_id),
            instance.updated,
            accepted,
        ))
    }

    pub async fn reconfigure(
        &self,
        instance_id: &str,
        overrides: &[Variable],
    ) -> Result<ProgressMonitor, ApiError> {
        self.operate(
            instance_id,
            InstanceOperation::Reconfigure,
            overrides,
            &[InstanceOperation::Reconfigure],
        )
        .await
    }

    pub async fn reinstall(
        &self,
        instance_id: &str,
        overrides: &[Variable],
    ) -> Result<ProgressMonitor, ApiError> {
        self.operate(
            instance_id,
            InstanceOperation::Reinstall,
            overrides,
            &[InstanceOperation::Reinstall],
        )
        .await
    }

    /// Power an instance on. An instance that is already on, or on its way,
    /// gets a completed monitor and no request.
    pub async fn poweron(&self, instance_id: &str) -> Result<ProgressMonitor, ApiError> {
        let instance = self.instance(instance_id).await?;
        let url = self.endpoint().instance_url(instance_id);

        let already_on = instance.last_operation().map(|op| op.is_on()).unwrap_or(false)
            && matches!(
                instance.state,
                InstanceState::Done | InstanceState::Processing
            );
        if already_on {
            info!(instance = %instance_id, "Instance already powered on");
            return Ok(ProgressMonitor::completed(url));
        }

        let instance = self
            .run_operation(instance, InstanceOperation::Poweron, &[])
            .await?;
        Ok(self.monitor(url, instance.updated, &[InstanceOperation::Poweron]))
    }

    pub async fn shutdown(&self, instance_id: &str) -> Result<ProgressMonitor, ApiError> {
        self.operate(
            instance_id,
            InstanceOperation::Shutdown,
            &[],
            SHUTDOWN_OPERATIONS,
        )
        .await
    }

    /// Terminate gracefully when the instance allows it, forcibly otherwise.
    pub async fn terminate(&self, instance_id: &str) -> Result<ProgressMonitor, ApiError> {
        let instance = self.instance(instance_id).await?;
        let operation = terminate_operation(&instance);
        self.delete_tracked(instance, operation).await
    }

    pub async fn force_terminate(&self, instance_id: &str) -> Result<ProgressMonitor, ApiError> {
        let instance = self.instance(instance_id).await?;
        self.delete_tracked(instance, DeleteOperation::ForceTerminate)
            .await
    }

    async fn delete_tracked(
        &self,
        instance: Instance,
        operation: DeleteOperation,
    ) -> Result<ProgressMonitor, ApiError> {
        let url = self.endpoint().instance_delete_url(&instance.id, operation);
        self.executor().send_empty(Method::Delete, &url).await?;
        info!(instance = %instance.id, operation = operation.as_str(), "Terminate requested");
        Ok(self.monitor(
            self.endpoint().instance_url(&instance.id),
            instance.updated,
            TERMINATE_OPERATIONS,
        ))
    }

    /// Remove an instance record. Nothing to wait for.
    pub async fn delete(&self, instance_id: &str) -> Result<(), ApiError> {
        require_id(instance_id, "instanceId")?;
        let url = self
            .endpoint()
            .instance_delete_url(instance_id, DeleteOperation::Delete);
        self.executor().send_empty(Method::Delete, &url).await?;
        info!(instance = %instance_id, "Delete requested");
        Ok(())
    }
}
