//! The transformer stage contract.
//!
//! A stage reads the shared build context, may register artifacts for later
//! stages, and returns a contribution: new resources plus amendments to
//! resources earlier stages created. Stages declare what they need and what
//! they provide so the registry can check ordering before anything runs.

use super::context::TransformContext;
use super::error::Result;
use super::types::{LogicalId, ResourceDefinition};
use serde_json::Value;
use std::fmt;

/// Artifacts a stage can depend on or make available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// The GraphQL API, its key and its schema resource
    Api,
    /// Object and enum types registered in the context
    TypeRegistry,
    /// One table and data source per model type
    ModelTables,
    /// Resolvers attached to the API
    Resolvers,
    /// Relationship resolvers and indexes
    Connections,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api => write!(f, "api"),
            Self::TypeRegistry => write!(f, "type-registry"),
            Self::ModelTables => write!(f, "model-tables"),
            Self::Resolvers => write!(f, "resolvers"),
            Self::Connections => write!(f, "connections"),
        }
    }
}

/// Where a directive may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveLocation {
    Object,
    Field,
}

impl fmt::Display for DirectiveLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object => write!(f, "types"),
            Self::Field => write!(f, "fields"),
        }
    }
}

/// A directive handled by a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectiveSpec {
    pub name: &'static str,
    pub location: DirectiveLocation,
}

/// Set one property on a resource already in the document.
#[derive(Debug, Clone, PartialEq)]
pub struct Amendment {
    pub target: LogicalId,
    pub property: String,
    pub value: Value,
}

impl Amendment {
    pub fn new(target: &str, property: &str, value: Value) -> Self {
        Self {
            target: target.to_string(),
            property: property.to_string(),
            value,
        }
    }
}

/// Everything one stage adds to the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contribution {
    pub entries: Vec<(LogicalId, ResourceDefinition)>,
    pub amendments: Vec<Amendment>,
}

impl Contribution {
    pub fn add(&mut self, id: impl Into<LogicalId>, definition: ResourceDefinition) {
        self.entries.push((id.into(), definition));
    }

    pub fn amend(&mut self, amendment: Amendment) {
        self.amendments.push(amendment);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.amendments.is_empty()
    }
}

/// One ordered unit of the compilation pipeline.
pub trait TransformerStage {
    /// Stable name used in diagnostics and collision reports.
    fn name(&self) -> &str;

    fn requires(&self) -> &[Capability] {
        &[]
    }

    fn provides(&self) -> &[Capability] {
        &[]
    }

    fn directives(&self) -> &[DirectiveSpec] {
        &[]
    }

    /// Terminal stages must be the last entry of the pipeline.
    fn terminal(&self) -> bool {
        false
    }

    fn contribute(&self, ctx: &mut TransformContext<'_>) -> Result<Contribution>;
}
