//! Base structural stage: registers types and creates the API.

use super::{API_ID, API_KEY_ID, SCHEMA_ID};
use crate::core::context::TransformContext;
use crate::core::error::Result;
use crate::core::parser::print_schema;
use crate::core::stage::{Capability, Contribution, TransformerStage};
use crate::core::types::{get_att, ResourceDefinition, ResourceType};
use serde_json::json;

pub struct ApiStage {
    api_name: String,
}

impl ApiStage {
    pub fn new(api_name: &str) -> Self {
        Self {
            api_name: api_name.to_string(),
        }
    }
}

impl TransformerStage for ApiStage {
    fn name(&self) -> &str {
        "api"
    }

    fn provides(&self) -> &[Capability] {
        &[Capability::Api, Capability::TypeRegistry]
    }

    fn contribute(&self, ctx: &mut TransformContext<'_>) -> Result<Contribution> {
        ctx.register_types();

        let mut c = Contribution::default();
        c.add(
            API_ID,
            ResourceDefinition::new(ResourceType::GraphQlApi)
                .with("Name", json!(self.api_name))
                .with("AuthenticationType", json!("API_KEY")),
        );
        c.add(
            API_KEY_ID,
            ResourceDefinition::new(ResourceType::ApiKey)
                .with("ApiId", get_att(API_ID, "ApiId"))
                .with("Description", json!(format!("{} API key", self.api_name))),
        );
        c.add(
            SCHEMA_ID,
            ResourceDefinition::new(ResourceType::GraphQlSchema)
                .with("ApiId", get_att(API_ID, "ApiId"))
                .with("Definition", json!(print_schema(ctx.schema()))),
        );
        Ok(c)
    }
}
