//! File-backed capability adapters.

use super::capability::{
    CapabilityError, CloudInventory, DiscoveredTable, ProjectMeta, ProjectMetadata,
    StorageProvisioner,
};
use super::choice::ServiceKind;
use crate::core::persistence::{to_pretty_json, write_atomic};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};

/// Regions offered when no inventory snapshot is configured.
pub const AWS_REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "ca-central-1",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "eu-central-1",
    "eu-north-1",
    "ap-south-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "sa-east-1",
];

fn read_meta(path: &Path) -> Result<ProjectMeta, CapabilityError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ProjectMeta::default()),
        Err(e) => {
            return Err(CapabilityError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };
    serde_json::from_str(&content).map_err(|e| CapabilityError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Project metadata read from the project's metadata JSON file.
#[derive(Debug, Clone)]
pub struct FileProjectMetadata {
    path: PathBuf,
}

impl FileProjectMetadata {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ProjectMetadata for FileProjectMetadata {
    fn load(&self) -> Result<ProjectMeta, CapabilityError> {
        read_meta(&self.path)
    }
}

/// Adds a storage entry to the project metadata file.
#[derive(Debug, Clone)]
pub struct ProjectStorageProvisioner {
    path: PathBuf,
    category: String,
}

impl ProjectStorageProvisioner {
    pub fn new(path: impl Into<PathBuf>, category: &str) -> Self {
        Self {
            path: path.into(),
            category: category.to_string(),
        }
    }
}

impl StorageProvisioner for ProjectStorageProvisioner {
    /// Registers `<service><N>` with the first unused N, starting at 1.
    fn provision(&self, provider: &str, service: ServiceKind) -> Result<String, CapabilityError> {
        let mut meta = read_meta(&self.path)?;
        let resources = meta.categories.entry(self.category.clone()).or_default();
        let prefix = service.as_str().to_lowercase();
        let name = (1..)
            .map(|n| format!("{}{}", prefix, n))
            .find(|candidate| !resources.contains_key(candidate))
            .ok_or_else(|| CapabilityError::Failed("no free resource name".to_string()))?;
        resources.insert(
            name.clone(),
            json!({ "service": service.as_str(), "providerPlugin": provider }),
        );

        let text = to_pretty_json(&meta).map_err(|e| CapabilityError::Failed(e.to_string()))?;
        write_atomic(&self.path, &text).map_err(|e| CapabilityError::Failed(e.to_string()))?;
        tracing::info!(resource = %name, category = %self.category, "storage resource added");
        Ok(name)
    }
}

/// Inventory snapshot file: `{"regions": [...], "tables": [{"Name", "Arn", "Region"}]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub tables: Vec<DiscoveredTable>,
}

/// Cloud inventory served from a snapshot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotInventory {
    snapshot: InventorySnapshot,
}

impl SnapshotInventory {
    /// Built-in region list and no tables.
    pub fn builtin() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: InventorySnapshot) -> Self {
        Self { snapshot }
    }

    pub fn load(path: &Path) -> Result<Self, CapabilityError> {
        let content = std::fs::read_to_string(path).map_err(|e| CapabilityError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let snapshot = serde_json::from_str(&content).map_err(|e| CapabilityError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Self { snapshot })
    }
}

impl CloudInventory for SnapshotInventory {
    fn regions(&self) -> Result<Vec<String>, CapabilityError> {
        if self.snapshot.regions.is_empty() {
            return Ok(AWS_REGIONS.iter().map(|r| r.to_string()).collect());
        }
        Ok(self.snapshot.regions.clone())
    }

    fn tables(&self, region: &str) -> Result<Vec<DiscoveredTable>, CapabilityError> {
        Ok(self
            .snapshot
            .tables
            .iter()
            .filter(|t| t.region == region)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let meta = FileProjectMetadata::new(dir.path().join("amplify-meta.json"));
        assert_eq!(meta.load().unwrap(), ProjectMeta::default());
    }

    #[test]
    fn test_metadata_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("amplify-meta.json");
        std::fs::write(&path, "not json").unwrap();
        let err = FileProjectMetadata::new(&path).load().unwrap_err();
        assert!(matches!(err, CapabilityError::Parse { .. }));
    }

    #[test]
    fn test_provisioner_picks_first_unused_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backend/amplify-meta.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{"storage": {"dynamodb1": {"service": "DynamoDB"}, "dynamodb3": {"service": "DynamoDB"}}}"#,
        )
        .unwrap();
        let p = ProjectStorageProvisioner::new(&path, "storage");
        assert_eq!(p.provision("awscloudformation", ServiceKind::DynamoDb).unwrap(), "dynamodb2");
        assert_eq!(p.provision("awscloudformation", ServiceKind::DynamoDb).unwrap(), "dynamodb4");

        let meta = FileProjectMetadata::new(&path).load().unwrap();
        assert_eq!(
            meta.resources_of("storage", "DynamoDB"),
            vec!["dynamodb1", "dynamodb3", "dynamodb2", "dynamodb4"]
        );
        assert_eq!(
            meta.categories["storage"]["dynamodb2"]["providerPlugin"],
            "awscloudformation"
        );
    }

    #[test]
    fn test_provisioner_creates_metadata_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("amplify-meta.json");
        let p = ProjectStorageProvisioner::new(&path, "storage");
        assert_eq!(p.provision("awscloudformation", ServiceKind::DynamoDb).unwrap(), "dynamodb1");
        assert!(path.exists());
    }

    #[test]
    fn test_builtin_inventory() {
        let inv = SnapshotInventory::builtin();
        let regions = inv.regions().unwrap();
        assert_eq!(regions.len(), AWS_REGIONS.len());
        assert_eq!(regions[0], "us-east-1");
        assert!(inv.tables("us-east-1").unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_inventory_filters_by_region() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        std::fs::write(
            &path,
            r#"{
                "regions": ["us-east-1", "eu-west-1"],
                "tables": [
                    {"Name": "orders", "Arn": "arn:aws:dynamodb:us-east-1:1:table/orders", "Region": "us-east-1"},
                    {"Name": "users", "Arn": "arn:aws:dynamodb:eu-west-1:1:table/users", "Region": "eu-west-1"}
                ]
            }"#,
        )
        .unwrap();
        let inv = SnapshotInventory::load(&path).unwrap();
        assert_eq!(inv.regions().unwrap(), vec!["us-east-1", "eu-west-1"]);
        let tables = inv.tables("eu-west-1").unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "users");
        assert!(inv.tables("ap-south-1").unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SnapshotInventory::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, CapabilityError::Io { .. }));
    }
}
