//! Settings: file names, stage toggles, and reconciliation defaults.
//!
//! Everything that used to be a module-level constant lives here and is
//! threaded into the pipeline entry point. Every field has a default, so an
//! empty (or absent) settings file is valid.

use super::types::ParametersStore;
use crate::reconcile::choice::ServiceKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root settings document (`schemaform.yaml`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub layout: ProjectLayout,

    #[serde(default)]
    pub transform: TransformSettings,

    #[serde(default)]
    pub reconcile: ReconcileSettings,
}

/// Where things live inside a project and a resource directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectLayout {
    /// Category whose resources are compiled
    #[serde(default = "default_category")]
    pub category: String,

    #[serde(default = "default_parameters_file")]
    pub parameters_file: String,

    #[serde(default = "default_template_file")]
    pub template_file: String,

    #[serde(default = "default_schema_file")]
    pub schema_file: String,

    /// Build output directory inside the resource directory
    #[serde(default = "default_build_dir")]
    pub build_dir: String,

    /// Backend directory, relative to the project root
    #[serde(default = "default_backend_dir")]
    pub backend_dir: String,

    /// Project metadata file, relative to the project root
    #[serde(default = "default_project_meta_file")]
    pub project_meta_file: String,
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self {
            category: default_category(),
            parameters_file: default_parameters_file(),
            template_file: default_template_file(),
            schema_file: default_schema_file(),
            build_dir: default_build_dir(),
            backend_dir: default_backend_dir(),
            project_meta_file: default_project_meta_file(),
        }
    }
}

fn default_category() -> String {
    "api".to_string()
}

fn default_parameters_file() -> String {
    "parameters.json".to_string()
}

fn default_template_file() -> String {
    "cloudformation-template.json".to_string()
}

fn default_schema_file() -> String {
    "schema.graphql".to_string()
}

fn default_build_dir() -> String {
    "build".to_string()
}

fn default_backend_dir() -> String {
    "amplify/backend".to_string()
}

fn default_project_meta_file() -> String {
    "amplify/backend/amplify-meta.json".to_string()
}

/// Stage toggles and generated-resource defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformSettings {
    /// API name (default: the resource directory name)
    #[serde(default)]
    pub api_name: Option<String>,

    #[serde(default = "default_capacity")]
    pub read_capacity: u32,

    #[serde(default = "default_capacity")]
    pub write_capacity: u32,

    /// Include the relationship stage
    #[serde(default = "default_true")]
    pub connections: bool,

    /// Parameter holding the user pool ID that enables the auth stage
    #[serde(default = "default_auth_parameter")]
    pub auth_parameter: String,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            api_name: None,
            read_capacity: default_capacity(),
            write_capacity: default_capacity(),
            connections: true,
            auth_parameter: default_auth_parameter(),
        }
    }
}

fn default_capacity() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

fn default_auth_parameter() -> String {
    "AuthCognitoUserPoolId".to_string()
}

/// Reconciliation defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileSettings {
    /// Provider handed to the storage provisioner
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Project metadata category holding storage resources
    #[serde(default = "default_storage_category")]
    pub storage_category: String,

    #[serde(default)]
    pub service: ServiceKind,

    /// Register the storage provisioning capability
    #[serde(default = "default_true")]
    pub storage_plugin: bool,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            storage_category: default_storage_category(),
            service: ServiceKind::default(),
            storage_plugin: true,
        }
    }
}

fn default_provider() -> String {
    "awscloudformation".to_string()
}

fn default_storage_category() -> String {
    "storage".to_string()
}

impl Settings {
    /// Load settings from YAML.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        Self::parse(&content)
    }

    pub fn parse(yaml: &str) -> Result<Self, String> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))
    }
}

/// Per-run transform configuration: settings plus values read from the
/// parameters mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformConfig {
    pub api_name: String,
    pub read_capacity: u32,
    pub write_capacity: u32,
    pub connections: bool,
    /// Present and non-empty only when the auth stage should run
    pub auth_user_pool_id: Option<String>,
}

impl TransformConfig {
    pub fn new(api_name: &str) -> Self {
        Self {
            api_name: api_name.to_string(),
            read_capacity: default_capacity(),
            write_capacity: default_capacity(),
            connections: true,
            auth_user_pool_id: None,
        }
    }

    /// Resolve from settings and the loaded parameters.
    pub fn resolve(settings: &TransformSettings, parameters: &ParametersStore, default_name: &str) -> Self {
        let auth_user_pool_id = parameters
            .get(&settings.auth_parameter)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Self {
            api_name: settings
                .api_name
                .clone()
                .unwrap_or_else(|| default_name.to_string()),
            read_capacity: settings.read_capacity,
            write_capacity: settings.write_capacity,
            connections: settings.connections,
            auth_user_pool_id,
        }
    }

    pub fn with_auth(mut self, user_pool_id: &str) -> Self {
        self.auth_user_pool_id = Some(user_pool_id.to_string()).filter(|s| !s.is_empty());
        self
    }
}
