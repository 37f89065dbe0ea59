//! Shared build context for one transform run.
//!
//! Owned by a single engine invocation. Holds the parsed schema, the
//! document accumulated so far, and the artifacts stages register for the
//! stages after them.

use super::error::{Result, TransformError};
use super::parser::{ObjectType, Schema};
use super::stage::Contribution;
use super::types::{LogicalId, ResourceDocument};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// CRUD operation served by a generated resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    List,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Self::Get,
        Self::List,
        Self::Create,
        Self::Update,
        Self::Delete,
    ];

    /// Root type the resolver is attached to.
    pub fn root_type(&self) -> &'static str {
        match self {
            Self::Get | Self::List => "Query",
            Self::Create | Self::Update | Self::Delete => "Mutation",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "Get"),
            Self::List => write!(f, "List"),
            Self::Create => write!(f, "Create"),
            Self::Update => write!(f, "Update"),
            Self::Delete => write!(f, "Delete"),
        }
    }
}

/// Resources generated for one `@model` type.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifacts {
    pub type_name: String,
    pub table: LogicalId,
    pub role: LogicalId,
    pub data_source: LogicalId,
    pub resolvers: Vec<(Operation, LogicalId)>,
}

pub struct TransformContext<'a> {
    schema: &'a Schema,
    document: ResourceDocument,
    owners: HashMap<LogicalId, String>,
    types: IndexMap<String, ObjectType>,
    enums: Vec<String>,
    models: IndexMap<String, ModelArtifacts>,
    connections: Vec<LogicalId>,
}

impl<'a> TransformContext<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            document: ResourceDocument::default(),
            owners: HashMap::new(),
            types: IndexMap::new(),
            enums: Vec::new(),
            models: IndexMap::new(),
            connections: Vec::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        self.schema
    }

    /// Document as merged so far (earlier stages only).
    pub fn document(&self) -> &ResourceDocument {
        &self.document
    }

    // -- Type registry --

    /// Register every object and enum type of the schema.
    pub fn register_types(&mut self) {
        for object in self.schema.object_types() {
            self.types.insert(object.name.clone(), object.clone());
        }
        self.enums = self.schema.enums().map(|e| e.name.clone()).collect();
    }

    pub fn object_types(&self) -> impl Iterator<Item = &ObjectType> {
        self.types.values()
    }

    pub fn object_type(&self, name: &str) -> Option<&ObjectType> {
        self.types.get(name)
    }

    pub fn is_enum(&self, name: &str) -> bool {
        self.enums.iter().any(|e| e == name)
    }

    // -- Model artifacts --

    pub fn register_model(&mut self, artifacts: ModelArtifacts) {
        self.models.insert(artifacts.type_name.clone(), artifacts);
    }

    pub fn model(&self, type_name: &str) -> Option<&ModelArtifacts> {
        self.models.get(type_name)
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelArtifacts> {
        self.models.values()
    }

    // -- Connection artifacts --

    pub fn register_connection(&mut self, resolver: LogicalId) {
        self.connections.push(resolver);
    }

    pub fn connections(&self) -> &[LogicalId] {
        &self.connections
    }

    /// Merge a stage's contribution all-or-nothing.
    ///
    /// Every new ID must be absent from the document and unique within the
    /// contribution, and every amendment target must already exist.
    pub(crate) fn merge(&mut self, stage: &str, contribution: Contribution) -> Result<()> {
        let mut incoming: HashSet<&str> = HashSet::new();
        for (id, _) in &contribution.entries {
            if let Some(first) = self.owners.get(id) {
                return Err(TransformError::Collision {
                    id: id.clone(),
                    first: first.clone(),
                    second: stage.to_string(),
                });
            }
            if !incoming.insert(id.as_str()) {
                return Err(TransformError::Collision {
                    id: id.clone(),
                    first: stage.to_string(),
                    second: stage.to_string(),
                });
            }
        }
        for amendment in &contribution.amendments {
            if !self.document.contains(&amendment.target) {
                return Err(TransformError::Amendment {
                    stage: stage.to_string(),
                    target: amendment.target.clone(),
                });
            }
        }

        for (id, definition) in contribution.entries {
            self.owners.insert(id.clone(), stage.to_string());
            self.document.resources.insert(id, definition);
        }
        for amendment in contribution.amendments {
            if let Some(definition) = self.document.resources.get_mut(&amendment.target) {
                definition
                    .properties
                    .insert(amendment.property, amendment.value);
            }
        }
        Ok(())
    }

    pub(crate) fn into_document(self) -> ResourceDocument {
        self.document
    }
}
