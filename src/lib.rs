//! ebx: ElasticBox instance lifecycle client
//!
//! Async client for the ElasticBox control-plane API. Deploys profiles, drives
//! instances through reconfigure, reinstall, power and terminate operations,
//! and tracks each operation with a pollable [`monitor::ProgressMonitor`].

pub mod cli;
pub mod client;
pub mod config;
pub mod deploy;
pub mod error;
pub mod executor;
pub mod logging;
pub mod merge;
pub mod monitor;
pub mod stack;
pub mod transport;
pub mod types;
pub mod urls;

pub use client::{Client, InstanceUpdate};
pub use config::EbxConfig;
pub use deploy::{DeployOptions, DeployStrategy};
pub use error::ApiError;
pub use monitor::{wait_all, ProgressMonitor};
pub use transport::{ReqwestTransport, Transport};
pub use types::{Instance, InstanceOperation, InstanceState, Variable};
