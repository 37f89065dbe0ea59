//! Resource document types.
//!
//! A resource document maps logical IDs to resource definitions. Order is
//! part of the contract: entries appear in stage order, then in the order
//! each stage contributed them, so regenerated templates diff cleanly.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Unique key of one generated resource within a document.
pub type LogicalId = String;

/// Parameters mapping persisted next to the template.
pub type ParametersStore = IndexMap<String, Value>;

/// CloudFormation template format version stamped on every document.
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

// ============================================================================
// Resource types
// ============================================================================

/// Every resource type the pipeline can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    #[serde(rename = "AWS::AppSync::GraphQLApi")]
    GraphQlApi,
    #[serde(rename = "AWS::AppSync::GraphQLSchema")]
    GraphQlSchema,
    #[serde(rename = "AWS::AppSync::ApiKey")]
    ApiKey,
    #[serde(rename = "AWS::AppSync::DataSource")]
    DataSource,
    #[serde(rename = "AWS::AppSync::Resolver")]
    Resolver,
    #[serde(rename = "AWS::IAM::Role")]
    IamRole,
    #[serde(rename = "AWS::DynamoDB::Table")]
    DynamoDbTable,
}

impl ResourceType {
    pub const ALL: [ResourceType; 7] = [
        Self::GraphQlApi,
        Self::GraphQlSchema,
        Self::ApiKey,
        Self::DataSource,
        Self::Resolver,
        Self::IamRole,
        Self::DynamoDbTable,
    ];

    /// The CloudFormation type tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GraphQlApi => "AWS::AppSync::GraphQLApi",
            Self::GraphQlSchema => "AWS::AppSync::GraphQLSchema",
            Self::ApiKey => "AWS::AppSync::ApiKey",
            Self::DataSource => "AWS::AppSync::DataSource",
            Self::Resolver => "AWS::AppSync::Resolver",
            Self::IamRole => "AWS::IAM::Role",
            Self::DynamoDbTable => "AWS::DynamoDB::Table",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown resource type: {}", s))
    }
}

// ============================================================================
// Definitions and documents
// ============================================================================

/// A single resource: type tag plus ordered properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDefinition {
    #[serde(rename = "Type")]
    pub resource_type: ResourceType,

    #[serde(rename = "Properties", default)]
    pub properties: IndexMap<String, Value>,
}

impl ResourceDefinition {
    pub fn new(resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            properties: IndexMap::new(),
        }
    }

    /// Builder-style property setter.
    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// The compiled template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDocument {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,

    #[serde(rename = "Resources", default)]
    pub resources: IndexMap<LogicalId, ResourceDefinition>,
}

impl Default for ResourceDocument {
    fn default() -> Self {
        Self {
            format_version: TEMPLATE_FORMAT_VERSION.to_string(),
            resources: IndexMap::new(),
        }
    }
}

impl ResourceDocument {
    pub fn get(&self, id: &str) -> Option<&ResourceDefinition> {
        self.resources.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.resources.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Logical IDs in document order.
    pub fn ids(&self) -> impl Iterator<Item = &LogicalId> {
        self.resources.keys()
    }
}

// ============================================================================
// Intrinsic helpers
// ============================================================================

/// `{"Fn::GetAtt": [id, attribute]}`
pub fn get_att(id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [id, attribute] })
}

/// `{"Ref": id}`
pub fn reference(id: &str) -> Value {
    json!({ "Ref": id })
}

// ============================================================================
// Tests
// ============================================================================
