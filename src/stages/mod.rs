//! Transformer stages: one module per resource family.
//!
//! Each stage produces CloudFormation resources plus the VTL mapping
//! templates its resolvers need:
//! 1. `api`: the GraphQL API, API key, and schema
//! 2. `model`: tables, roles, data sources, CRUD resolvers
//! 3. `connection`: relationship resolvers and indexes
//! 4. `auth`: user-pool auth and resolver authorization checks

pub mod api;
pub mod auth;
pub mod connection;
pub mod model;

pub use api::ApiStage;
pub use auth::AuthStage;
pub use connection::ConnectionStage;
pub use model::ModelStage;

/// Logical ID of the GraphQL API.
pub const API_ID: &str = "GraphQLApi";

/// Logical ID of the API key.
pub const API_KEY_ID: &str = "GraphQLApiKey";

/// Logical ID of the schema resource.
pub const SCHEMA_ID: &str = "GraphQLSchema";

/// `Blog` → `blog`
pub(crate) fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `posts` → `Posts`
pub(crate) fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_helpers() {
        assert_eq!(lower_first("BlogPost"), "blogPost");
        assert_eq!(upper_first("posts"), "Posts");
        assert_eq!(lower_first(""), "");
        assert_eq!(upper_first(""), "");
    }
}
