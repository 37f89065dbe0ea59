//! Transformer registry: the ordered, validated stage list.
//!
//! Ordering contracts are checked once, when the registry is built:
//! every capability a stage requires must be provided by an earlier stage,
//! a terminal stage must come last, and stage names are unique.

use super::config::TransformConfig;
use super::error::{Result, TransformError};
use super::stage::{Capability, DirectiveSpec, TransformerStage};
use crate::stages::{ApiStage, AuthStage, ConnectionStage, ModelStage};
use std::collections::HashSet;
use std::fmt;

/// The built-in stages, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Api,
    Model,
    Connection,
    Auth,
}

impl StageKind {
    pub const ALL: [StageKind; 4] = [Self::Api, Self::Model, Self::Connection, Self::Auth];

    /// Whether the configuration includes this stage.
    pub fn enabled(&self, config: &TransformConfig) -> bool {
        match self {
            Self::Api | Self::Model => true,
            Self::Connection => config.connections,
            Self::Auth => config.auth_user_pool_id.is_some(),
        }
    }

    pub fn build(&self, config: &TransformConfig) -> Option<Box<dyn TransformerStage>> {
        if !self.enabled(config) {
            return None;
        }
        Some(match self {
            Self::Api => Box::new(ApiStage::new(&config.api_name)),
            Self::Model => Box::new(ModelStage::new(config)),
            Self::Connection => Box::new(ConnectionStage),
            Self::Auth => Box::new(AuthStage::new(config.auth_user_pool_id.as_deref()?)),
        })
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api => write!(f, "api"),
            Self::Model => write!(f, "model"),
            Self::Connection => write!(f, "connection"),
            Self::Auth => write!(f, "auth"),
        }
    }
}

pub struct TransformerRegistry {
    stages: Vec<Box<dyn TransformerStage>>,
}

impl fmt::Debug for TransformerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl TransformerRegistry {
    /// Build a registry from an explicit stage list, validating its contracts.
    pub fn new(stages: Vec<Box<dyn TransformerStage>>) -> Result<Self> {
        let mut provided: HashSet<Capability> = HashSet::new();
        let mut names: HashSet<String> = HashSet::new();
        let last = stages.len().saturating_sub(1);

        for (i, stage) in stages.iter().enumerate() {
            if !names.insert(stage.name().to_string()) {
                return Err(TransformError::Pipeline(format!(
                    "stage '{}' appears more than once",
                    stage.name()
                )));
            }
            for required in stage.requires() {
                if !provided.contains(required) {
                    return Err(TransformError::Pipeline(format!(
                        "stage '{}' requires '{}', which no earlier stage provides",
                        stage.name(),
                        required
                    )));
                }
            }
            if stage.terminal() && i != last {
                return Err(TransformError::Pipeline(format!(
                    "stage '{}' must run last",
                    stage.name()
                )));
            }
            provided.extend(stage.provides().iter().copied());
        }

        Ok(Self { stages })
    }

    /// The standard pipeline for a configuration.
    pub fn standard(config: &TransformConfig) -> Result<Self> {
        let stages = StageKind::ALL
            .iter()
            .filter_map(|kind| kind.build(config))
            .collect();
        Self::new(stages)
    }

    pub fn stages(&self) -> &[Box<dyn TransformerStage>] {
        &self.stages
    }

    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Union of directives handled by the configured stages.
    pub fn directives(&self) -> Vec<DirectiveSpec> {
        self.stages
            .iter()
            .flat_map(|s| s.directives().iter().copied())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
