//! Core logic: schema parsing, stages, the transform engine, and persistence.

pub mod classifier;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod parser;
pub mod persistence;
pub mod registry;
pub mod stage;
pub mod types;
