//! Transform engine: run the registry's stages over a schema.
//!
//! parse → check directives against the configured stages → for each stage:
//! contribute → merge (all-or-nothing). No I/O; the same inputs always yield
//! the same document.

use super::context::TransformContext;
use super::error::{Result, TransformError};
use super::parser::{self, Directive, Schema};
use super::registry::TransformerRegistry;
use super::stage::{DirectiveLocation, DirectiveSpec};
use super::types::ResourceDocument;
use tracing::debug;

/// Compile schema text into a resource document.
pub fn transform(schema_src: &str, registry: &TransformerRegistry) -> Result<ResourceDocument> {
    let schema = parser::parse_schema(schema_src)?;
    transform_schema(&schema, registry)
}

/// Compile an already parsed schema.
pub fn transform_schema(schema: &Schema, registry: &TransformerRegistry) -> Result<ResourceDocument> {
    check_directives(schema, &registry.directives())?;

    let mut ctx = TransformContext::new(schema);
    for stage in registry.stages() {
        let contribution = stage.contribute(&mut ctx)?;
        debug!(
            stage = stage.name(),
            entries = contribution.entries.len(),
            amendments = contribution.amendments.len(),
            "merging stage contribution"
        );
        ctx.merge(stage.name(), contribution)?;
    }

    let document = ctx.into_document();
    debug!(resources = document.len(), "transform complete");
    Ok(document)
}

/// Every directive must be handled by a configured stage at that location.
fn check_directives(schema: &Schema, handled: &[DirectiveSpec]) -> Result<()> {
    for object in schema.object_types() {
        for directive in &object.directives {
            check_directive(directive, DirectiveLocation::Object, handled)?;
        }
        for field in &object.fields {
            for directive in &field.directives {
                check_directive(directive, DirectiveLocation::Field, handled)?;
            }
        }
    }
    Ok(())
}

fn check_directive(directive: &Directive, location: DirectiveLocation, handled: &[DirectiveSpec]) -> Result<()> {
    let specs: Vec<_> = handled.iter().filter(|s| s.name == directive.name).collect();
    if specs.is_empty() {
        return Err(TransformError::schema_at(
            directive.line,
            format!(
                "directive @{} is not supported by the configured transformers",
                directive.name
            ),
        ));
    }
    if !specs.iter().any(|s| s.location == location) {
        return Err(TransformError::schema_at(
            directive.line,
            format!(
                "directive @{} is not allowed on {}",
                directive.name, location
            ),
        ));
    }
    Ok(())
}
