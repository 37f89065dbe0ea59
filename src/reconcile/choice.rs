//! Reconciliation choices and the closed kinds they are built from.

use crate::core::types::{get_att, ResourceType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Storage service whose generated tables can be overridden.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceKind {
    #[default]
    #[serde(rename = "DynamoDB")]
    DynamoDb,
}

impl ServiceKind {
    /// Service tag as it appears in project metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DynamoDb => "DynamoDB",
        }
    }

    /// Resource type of the tables this service generates.
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Self::DynamoDb => ResourceType::DynamoDbTable,
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a replacement table comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// A table already configured in the current project
    CurrentProject,
    /// A table provisioned now through the storage capability
    NewResource,
    /// A table already deployed in the cloud account
    CloudResource,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [Self::CurrentProject, Self::NewResource, Self::CloudResource];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CurrentProject => "currentProject",
            Self::NewResource => "newResource",
            Self::CloudResource => "cloudResource",
        }
    }

    /// Menu label for a service.
    pub fn label(&self, service: ServiceKind) -> String {
        match self {
            Self::CurrentProject => format!("Use {} table configured in the current project", service),
            Self::NewResource => format!("Create a new {} table", service),
            Self::CloudResource => format!("Use a {} table already deployed on AWS", service),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Symbolic pointer to an attribute of a project resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeReference {
    pub target_resource: String,
    pub attribute: String,
}

impl AttributeReference {
    /// `Arn` of a resource in the storage category: `storage<name>`.
    pub fn storage_arn(category: &str, resource_name: &str) -> Self {
        Self {
            target_resource: format!("{}{}", category, resource_name),
            attribute: "Arn".to_string(),
        }
    }

    /// `{"Fn::GetAtt": [target, attribute]}`
    pub fn to_value(&self) -> Value {
        get_att(&self.target_resource, &self.attribute)
    }
}

/// Outcome of one pass through the source-kind branches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationChoice {
    ReuseExisting {
        resource_name: String,
        reference: AttributeReference,
    },
    ProvisionNew {
        resource_name: String,
        reference: AttributeReference,
    },
    /// Carries the table ARN itself rather than a reference.
    BindExternal {
        arn: String,
        region: String,
        table_name: String,
        resource_name: String,
    },
}

impl ReconciliationChoice {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::ReuseExisting { .. } => SourceKind::CurrentProject,
            Self::ProvisionNew { .. } => SourceKind::NewResource,
            Self::BindExternal { .. } => SourceKind::CloudResource,
        }
    }

    /// Value that would stand in for the generated table: a `Fn::GetAtt`
    /// reference for project tables, the raw ARN for deployed ones.
    pub fn substitution_value(&self) -> Value {
        match self {
            Self::ReuseExisting { reference, .. } | Self::ProvisionNew { reference, .. } => {
                reference.to_value()
            }
            Self::BindExternal { arn, .. } => Value::String(arn.clone()),
        }
    }
}

/// A choice applied to one generated table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOverride {
    pub logical_id: String,
    pub choice: ReconciliationChoice,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_service_kind_serde() {
        assert_eq!(serde_json::to_value(ServiceKind::DynamoDb).unwrap(), json!("DynamoDB"));
        let parsed: ServiceKind = serde_json::from_value(json!("DynamoDB")).unwrap();
        assert_eq!(parsed, ServiceKind::DynamoDb);
        assert_eq!(ServiceKind::default().resource_type(), ResourceType::DynamoDbTable);
    }

    #[test]
    fn test_source_kind_from_index() {
        assert_eq!(SourceKind::from_index(0), Some(SourceKind::CurrentProject));
        assert_eq!(SourceKind::from_index(2), Some(SourceKind::CloudResource));
        assert_eq!(SourceKind::from_index(3), None);
        assert_eq!(
            SourceKind::NewResource.label(ServiceKind::DynamoDb),
            "Create a new DynamoDB table"
        );
    }

    #[test]
    fn test_substitution_shapes_differ() {
        let reuse = ReconciliationChoice::ReuseExisting {
            resource_name: "notes".into(),
            reference: AttributeReference::storage_arn("storage", "notes"),
        };
        assert_eq!(
            reuse.substitution_value(),
            json!({"Fn::GetAtt": ["storagenotes", "Arn"]})
        );
        assert_eq!(reuse.kind(), SourceKind::CurrentProject);

        let bind = ReconciliationChoice::BindExternal {
            arn: "arn:aws:dynamodb:us-east-1:1:table/t".into(),
            region: "us-east-1".into(),
            table_name: "t".into(),
            resource_name: "t".into(),
        };
        assert_eq!(bind.substitution_value(), json!("arn:aws:dynamodb:us-east-1:1:table/t"));
    }
}
