//! Deploy request shaping
//!
//! Profiles carry a schema URL of the form
//! `http://elasticbox.net/schemas/<yyyy-mm-dd>/<document>`. Profiles dated after
//! 2014-05-23 deploy with an explicit variables array; older ones carry their
//! variables on the first sub-instance and use the legacy request document.

use crate::error::ApiError;
use crate::merge::splice_overrides;
use crate::types::{Profile, Variable};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const BASE_SCHEMA_URL: &str = "http://elasticbox.net/schemas/";
pub const DEPLOY_INSTANCE_REQUEST: &str = "deploy-instance-request";
pub const DEPLOY_SERVICE_REQUEST: &str = "deploy-service-request";

/// Last schema date that still uses the legacy request layout.
const LEGACY_CUTOFF: (i32, u32, u32) = (2014, 5, 23);

/// Dated schema version taken from a schema URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaVersion {
    raw: String,
    date: NaiveDate,
}

impl SchemaVersion {
    pub fn parse(version: &str) -> Result<Self, ApiError> {
        let date = NaiveDate::parse_from_str(version, "%Y-%m-%d").map_err(|e| {
            ApiError::MalformedSchema(format!("invalid schema version '{}': {}", version, e))
        })?;
        Ok(Self {
            raw: version.to_string(),
            date,
        })
    }

    /// Extract the version segment that follows the schema base URL.
    pub fn from_schema_url(url: &str) -> Result<Self, ApiError> {
        let rest = url
            .strip_prefix(BASE_SCHEMA_URL)
            .ok_or_else(|| ApiError::MalformedSchema(format!("unexpected schema URL '{}'", url)))?;
        let version = rest
            .split_once('/')
            .map(|(version, _)| version)
            .ok_or_else(|| ApiError::MalformedSchema(format!("unexpected schema URL '{}'", url)))?;
        Self::parse(version)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    fn request_schema(&self, document: &str) -> String {
        format!("{}{}/{}", BASE_SCHEMA_URL, self.raw, document)
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Request layout used for a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStrategy {
    /// Explicit `variables` array and `deploy-instance-request` document
    Modern,
    /// Overrides spliced into the first sub-instance, `deploy-service-request`
    Legacy,
}

impl DeployStrategy {
    pub fn for_version(version: &SchemaVersion) -> Self {
        let (y, m, d) = LEGACY_CUTOFF;
        match NaiveDate::from_ymd_opt(y, m, d) {
            Some(cutoff) if version.date() > cutoff => DeployStrategy::Modern,
            _ => DeployStrategy::Legacy,
        }
    }
}

/// What to deploy and where.
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    pub profile_id: String,
    pub workspace_id: String,
    pub environment: String,
    /// Pin the profile's box to a specific version (modern profiles only)
    pub box_version: Option<String>,
    pub instances: u32,
    pub variables: Vec<Variable>,
}

/// Body of `POST /services/instances`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployRequest {
    pub schema: String,
    pub environment: String,
    pub owner: String,
    pub profile: Profile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<Variable>>,
}

/// Shape the deploy request for `profile`, choosing the layout from its schema.
pub fn build_deploy_request(
    mut profile: Profile,
    options: &DeployOptions,
) -> Result<(DeployStrategy, DeployRequest), ApiError> {
    let version = SchemaVersion::from_schema_url(&profile.schema)?;
    let strategy = DeployStrategy::for_version(&version);

    let mut variables = options.variables.clone();
    for variable in &mut variables {
        variable.strip_empty_scope();
    }

    let (schema, variables) = match strategy {
        DeployStrategy::Modern => {
            shape_modern(&mut profile, options);
            (
                version.request_schema(DEPLOY_INSTANCE_REQUEST),
                Some(variables),
            )
        }
        DeployStrategy::Legacy => {
            shape_legacy(&mut profile, options, &variables)?;
            (version.request_schema(DEPLOY_SERVICE_REQUEST), None)
        }
    };

    let request = DeployRequest {
        schema,
        environment: options.environment.clone(),
        owner: options.workspace_id.clone(),
        profile,
        variables,
    };
    Ok((strategy, request))
}

fn shape_modern(profile: &mut Profile, options: &DeployOptions) {
    if let Some(version) = &options.box_version {
        profile.box_ref.get_or_insert_with(Default::default).version = Some(version.clone());
    }
    if let Some(service) = profile.service.as_mut() {
        if service.instances.is_some() {
            service.instances = Some(options.instances);
        }
    }
}

fn shape_legacy(
    profile: &mut Profile,
    options: &DeployOptions,
    overrides: &[Variable],
) -> Result<(), ApiError> {
    let main_instance = profile.instances.first_mut().ok_or_else(|| {
        ApiError::MalformedSchema(format!(
            "legacy profile {} has no instances to deploy",
            profile.id
        ))
    })?;
    splice_overrides(&mut main_instance.variables, overrides);
    if let Some(service) = main_instance.service.as_mut() {
        if service.instances.is_some() {
            service.instances = Some(options.instances);
        }
    }
    Ok(())
}
