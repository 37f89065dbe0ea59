//! schemaform: compile annotated GraphQL schemas into CloudFormation
//! resource documents.
//!
//! An ordered, contract-checked pipeline of transformer stages turns the
//! schema into a template; an interactive reconciler then offers to replace
//! the generated DynamoDB tables with existing ones.

pub mod cli;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod reconcile;
pub mod stages;
