//! Capabilities the reconciler delegates to, and the registry that holds them.

use super::choice::ServiceKind;
use super::prompt::PromptError;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Failure inside a delegated capability.
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("{0}")]
    Failed(String),
}

/// Nothing to choose from.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmptySet {
    #[error("There are no {service} resources configured in your project currently")]
    ProjectResources { service: ServiceKind },

    #[error("You do not have any {service} tables configured for the selected region")]
    RegionTables { service: ServiceKind, region: String },

    #[error("No regions are available")]
    Regions,
}

/// Errors raised while reconciling one table.
///
/// Everything except `Prompt` is recoverable: it is reported and the operator
/// is asked for a source kind again.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("{capability} not installed in the CLI. Please install it to use this feature")]
    CapabilityUnavailable { capability: &'static str },

    #[error(transparent)]
    EmptyResultSet(#[from] EmptySet),

    #[error("{capability} failed: {source}")]
    CapabilityFailed {
        capability: &'static str,
        #[source]
        source: CapabilityError,
    },

    #[error("Invalid option selected")]
    InvalidSelection,

    #[error(transparent)]
    Prompt(#[from] PromptError),
}

impl ReconcileError {
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Prompt(_))
    }

    pub(crate) fn failed(capability: &'static str) -> impl FnOnce(CapabilityError) -> Self {
        move |source| Self::CapabilityFailed { capability, source }
    }
}

/// Configured project resources, grouped by category then resource name.
///
/// Each entry is the raw metadata object; only `service` is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectMeta {
    pub categories: IndexMap<String, IndexMap<String, Value>>,
}

impl ProjectMeta {
    /// Resource names in `category` whose `service` matches, in file order.
    pub fn resources_of(&self, category: &str, service: &str) -> Vec<String> {
        self.categories
            .get(category)
            .map(|resources| {
                resources
                    .iter()
                    .filter(|(_, meta)| meta.get("service").and_then(Value::as_str) == Some(service))
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A table found in the cloud inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DiscoveredTable {
    pub name: String,
    pub arn: String,
    pub region: String,
}

static NON_ALPHANUMERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("[^0-9a-zA-Z]").unwrap_or_else(|_| unreachable!("literal pattern"))
});

/// Strip everything but ASCII letters and digits.
pub fn sanitize_resource_name(name: &str) -> String {
    NON_ALPHANUMERIC.replace_all(name, "").into_owned()
}

impl DiscoveredTable {
    /// `"<name> (<arn>)"`
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.arn)
    }

    pub fn resource_name(&self) -> String {
        sanitize_resource_name(&self.name)
    }
}

pub trait ProjectMetadata {
    fn load(&self) -> Result<ProjectMeta, CapabilityError>;
}

pub trait StorageProvisioner {
    /// Create a storage resource and return its name.
    fn provision(&self, provider: &str, service: ServiceKind) -> Result<String, CapabilityError>;
}

pub trait CloudInventory {
    fn regions(&self) -> Result<Vec<String>, CapabilityError>;
    fn tables(&self, region: &str) -> Result<Vec<DiscoveredTable>, CapabilityError>;
}

/// Capabilities resolved once at startup.
pub struct CapabilityRegistry {
    pub metadata: Box<dyn ProjectMetadata>,
    pub inventory: Box<dyn CloudInventory>,
    /// Absent when the storage plugin is not installed
    pub provisioner: Option<Box<dyn StorageProvisioner>>,
}

impl CapabilityRegistry {
    pub fn new(metadata: Box<dyn ProjectMetadata>, inventory: Box<dyn CloudInventory>) -> Self {
        Self {
            metadata,
            inventory,
            provisioner: None,
        }
    }

    pub fn with_provisioner(mut self, provisioner: Box<dyn StorageProvisioner>) -> Self {
        self.provisioner = Some(provisioner);
        self
    }
}
