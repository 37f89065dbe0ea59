//! `@connection` stage: resolvers for relationship fields between models.
//!
//! - `[Child] @connection` on a parent queries a child-table index keyed on
//!   `{parent}{Field}Id`; the index is added to the child table.
//! - `Target @connection` resolves with a GetItem on the target table. With a
//!   `name` shared by a list field on the target, the key is that list side's.

use super::model::resolver;
use super::{lower_first, upper_first};
use crate::core::context::TransformContext;
use crate::core::error::{Result, TransformError};
use crate::core::parser::{FieldDefinition, ObjectType};
use crate::core::stage::{
    Amendment, Capability, Contribution, DirectiveLocation, DirectiveSpec, TransformerStage,
};
use crate::core::types::LogicalId;
use indexmap::IndexMap;
use serde_json::{json, Value};

const DIRECTIVES: &[DirectiveSpec] = &[DirectiveSpec {
    name: "connection",
    location: DirectiveLocation::Field,
}];

const QUERY_REQUEST: &str = r##"{
  "version": "2017-02-28",
  "operation": "Query",
  "index": "%INDEX%",
  "query": {
    "expression": "#connectionAttribute = :connectionAttribute",
    "expressionNames": { "#connectionAttribute": "%KEY%" },
    "expressionValues": { ":connectionAttribute": { "S": "$ctx.source.id" } }
  },
  "limit": $util.defaultIfNull($ctx.args.limit, 10),
  "nextToken": $util.toJson($util.defaultIfNullOrEmpty($ctx.args.nextToken, null))
}"##;

const GET_REQUEST: &str = r#"{
  "version": "2017-02-28",
  "operation": "GetItem",
  "key": {
    "id": $util.dynamodb.toDynamoDBJson($util.defaultIfNullOrBlank($ctx.source.%KEY%, "___xamznone____"))
  }
}"#;

const LIST_RESPONSE: &str = "$util.toJson($ctx.result.items)";

pub struct ConnectionStage;

/// One resolved `@connection` field.
#[derive(Debug, Clone, PartialEq)]
struct Relation {
    parent: String,
    field: String,
    target: String,
    key: String,
    /// Index name for list relations
    index: Option<String>,
}

fn connection_name(object: &ObjectType, field: &FieldDefinition) -> Result<Option<String>> {
    let Some(directive) = field.directive("connection") else {
        return Ok(None);
    };
    for arg in directive.arguments.keys() {
        if arg != "name" {
            return Err(TransformError::schema_at(
                directive.line,
                format!(
                    "@connection on '{}.{}': unknown argument '{}'",
                    object.name, field.name, arg
                ),
            ));
        }
    }
    match directive.argument("name") {
        None => Ok(None),
        Some(value) => value.as_str().map(|s| Some(s.to_string())).ok_or_else(|| {
            TransformError::schema_at(
                directive.line,
                format!(
                    "@connection on '{}.{}': name must be a string",
                    object.name, field.name
                ),
            )
        }),
    }
}

/// The list field on `target` that shares a connection name with `field`.
fn paired_list_field<'a>(target: &'a ObjectType, parent: &str, name: &str) -> Result<Option<&'a FieldDefinition>> {
    for candidate in &target.fields {
        if candidate.field_type.named_type() != parent {
            continue;
        }
        if connection_name(target, candidate)?.as_deref() == Some(name) && candidate.field_type.is_list() {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

fn resolve_relation(ctx: &TransformContext<'_>, object: &ObjectType, field: &FieldDefinition) -> Result<Relation> {
    let line = field.line;
    if ctx.model(&object.name).is_none() {
        return Err(TransformError::schema_at(
            line,
            format!(
                "@connection field '{}.{}' must belong to a @model type",
                object.name, field.name
            ),
        ));
    }
    let target_name = field.field_type.named_type();
    let target = match (ctx.model(target_name), ctx.object_type(target_name)) {
        (Some(_), Some(t)) => t,
        _ => {
            return Err(TransformError::schema_at(
                line,
                format!(
                    "@connection field '{}.{}' must reference a @model type, found '{}'",
                    object.name, field.name, target_name
                ),
            ))
        }
    };
    let name = connection_name(object, field)?;

    if field.field_type.is_list() {
        if let Some(n) = &name {
            let other_list = target.fields.iter().any(|f| {
                f.field_type.is_list()
                    && f.field_type.named_type() == object.name
                    && matches!(connection_name(target, f), Ok(Some(ref m)) if m == n)
            });
            if other_list && target.name != object.name {
                return Err(TransformError::schema_at(
                    line,
                    format!("@connection '{}': many-to-many connections are not supported", n),
                ));
            }
        }
        let key = format!("{}{}Id", lower_first(&object.name), upper_first(&field.name));
        let index = format!(
            "gsi-{}",
            name.clone()
                .unwrap_or_else(|| format!("{}{}", object.name, upper_first(&field.name)))
        );
        return Ok(Relation {
            parent: object.name.clone(),
            field: field.name.clone(),
            target: target.name.clone(),
            key,
            index: Some(index),
        });
    }

    let paired = match &name {
        Some(n) => paired_list_field(target, &object.name, n)?,
        None => None,
    };
    let key = match paired {
        Some(list_field) => format!("{}{}Id", lower_first(&target.name), upper_first(&list_field.name)),
        None => format!("{}{}Id", lower_first(&object.name), upper_first(&field.name)),
    };
    Ok(Relation {
        parent: object.name.clone(),
        field: field.name.clone(),
        target: target.name.clone(),
        key,
        index: None,
    })
}

impl TransformerStage for ConnectionStage {
    fn name(&self) -> &str {
        "connection"
    }

    fn requires(&self) -> &[Capability] {
        &[Capability::TypeRegistry, Capability::ModelTables]
    }

    fn provides(&self) -> &[Capability] {
        &[Capability::Connections, Capability::Resolvers]
    }

    fn directives(&self) -> &[DirectiveSpec] {
        DIRECTIVES
    }

    fn contribute(&self, ctx: &mut TransformContext<'_>) -> Result<Contribution> {
        let mut relations = Vec::new();
        // (child type, index name) → declaring field
        let mut index_owners: IndexMap<(String, String), String> = IndexMap::new();
        for object in ctx.object_types() {
            for field in &object.fields {
                if field.directive("connection").is_none() {
                    continue;
                }
                let rel = resolve_relation(ctx, object, field)?;
                if let Some(index) = &rel.index {
                    let owner = format!("{}.{}", rel.parent, rel.field);
                    let key = (rel.target.clone(), index.clone());
                    if let Some(first) = index_owners.get(&key) {
                        return Err(TransformError::schema_at(
                            field.line,
                            format!(
                                "@connection index '{}' on '{}' is declared by both '{}' and '{}'",
                                index, rel.target, first, owner
                            ),
                        ));
                    }
                    index_owners.insert(key, owner);
                }
                relations.push(rel);
            }
        }

        let mut c = Contribution::default();
        // child table → (attribute definitions, global secondary indexes)
        let mut indexes: IndexMap<LogicalId, (Vec<Value>, Vec<Value>)> = IndexMap::new();
        let mut registered = Vec::new();

        for rel in &relations {
            let Some(target) = ctx.model(&rel.target) else {
                continue;
            };
            let id = format!("{}{}Resolver", rel.parent, upper_first(&rel.field));
            let definition = match &rel.index {
                Some(index) => {
                    let request = QUERY_REQUEST.replace("%INDEX%", index).replace("%KEY%", &rel.key);
                    let table = ctx.document().get(&target.table);
                    let entry = indexes.entry(target.table.clone()).or_insert_with(|| {
                        let attrs = table
                            .and_then(|t| t.property("AttributeDefinitions"))
                            .and_then(Value::as_array)
                            .cloned()
                            .unwrap_or_default();
                        let gsis = table
                            .and_then(|t| t.property("GlobalSecondaryIndexes"))
                            .and_then(Value::as_array)
                            .cloned()
                            .unwrap_or_default();
                        (attrs, gsis)
                    });
                    let throughput = table
                        .and_then(|t| t.property("ProvisionedThroughput"))
                        .cloned()
                        .unwrap_or(Value::Null);
                    entry.0.push(json!({ "AttributeName": rel.key, "AttributeType": "S" }));
                    entry.1.push(json!({
                        "IndexName": index,
                        "KeySchema": [{ "AttributeName": rel.key, "KeyType": "HASH" }],
                        "Projection": { "ProjectionType": "ALL" },
                        "ProvisionedThroughput": throughput
                    }));
                    resolver(&rel.parent, &rel.field, &target.data_source, &request)
                        .with("ResponseMappingTemplate", json!(LIST_RESPONSE))
                }
                None => {
                    let request = GET_REQUEST.replace("%KEY%", &rel.key);
                    resolver(&rel.parent, &rel.field, &target.data_source, &request)
                }
            };
            c.add(id.clone(), definition);
            registered.push(id);
        }

        for (table, (attrs, gsis)) in indexes {
            c.amend(Amendment::new(&table, "AttributeDefinitions", Value::Array(attrs)));
            c.amend(Amendment::new(&table, "GlobalSecondaryIndexes", Value::Array(gsis)));
        }
        for id in registered {
            ctx.register_connection(id);
        }
        Ok(c)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::config::TransformConfig;
    use crate::core::engine::transform;
    use crate::core::registry::TransformerRegistry;
    use crate::core::types::ResourceDocument;
    use serde_json::{json, Value};

    const BLOG: &str = r#"
type Blog @model {
  id: ID!
  name: String!
  posts: [Post] @connection(name: "BlogPosts")
}

type Post @model {
  id: ID!
  title: String!
  blog: Blog @connection(name: "BlogPosts")
  comments: [Comment] @connection
}

type Comment @model {
  id: ID!
  content: String
}
"#;

    fn compile(src: &str) -> ResourceDocument {
        let reg = TransformerRegistry::standard(&TransformConfig::new("blogapi")).unwrap();
        transform(src, &reg).unwrap()
    }

    fn template(doc: &ResourceDocument, id: &str) -> String {
        doc.get(id)
            .and_then(|d| d.property("RequestMappingTemplate"))
            .and_then(Value::as_str)
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_connection_resolvers_follow_model_resources() {
        let doc = compile(BLOG);
        let ids: Vec<_> = doc.ids().map(|s| s.as_str()).collect();
        let tail = &ids[ids.len() - 3..];
        assert_eq!(tail, &["BlogPostsResolver", "PostBlogResolver", "PostCommentsResolver"]);
    }

    #[test]
    fn test_list_connection_queries_child_index() {
        let doc = compile(BLOG);
        let req = template(&doc, "BlogPostsResolver");
        assert!(req.contains("\"index\": \"gsi-BlogPosts\""));
        assert!(req.contains("\"#connectionAttribute\": \"blogPostsId\""));
        let posts = doc.get("BlogPostsResolver").unwrap();
        assert_eq!(posts.property("TypeName").unwrap(), "Blog");
        assert_eq!(posts.property("FieldName").unwrap(), "posts");
        assert_eq!(
            posts.property("DataSourceName").unwrap(),
            &json!({"Fn::GetAtt": ["PostDataSource", "Name"]})
        );
    }

    #[test]
    fn test_named_single_side_uses_list_key() {
        let doc = compile(BLOG);
        let req = template(&doc, "PostBlogResolver");
        assert!(req.contains("$ctx.source.blogPostsId"));
        assert!(req.contains("GetItem"));
    }

    #[test]
    fn test_child_table_gets_index() {
        let doc = compile(BLOG);
        let post = doc.get("PostTable").unwrap();
        let gsis = post.property("GlobalSecondaryIndexes").unwrap().as_array().unwrap();
        assert_eq!(gsis.len(), 1);
        assert_eq!(gsis[0]["IndexName"], "gsi-BlogPosts");
        let attrs = post.property("AttributeDefinitions").unwrap();
        assert_eq!(
            attrs,
            &json!([
                {"AttributeName": "id", "AttributeType": "S"},
                {"AttributeName": "blogPostsId", "AttributeType": "S"}
            ])
        );
        let comment = doc.get("CommentTable").unwrap();
        let gsis = comment.property("GlobalSecondaryIndexes").unwrap();
        assert_eq!(gsis[0]["IndexName"], "gsi-PostComments");
        assert!(doc.get("BlogTable").unwrap().property("GlobalSecondaryIndexes").is_none());
    }

    #[test]
    fn test_connection_to_non_model_rejected() {
        let reg = TransformerRegistry::standard(&TransformConfig::new("a")).unwrap();
        let src = "type A @model { id: ID! b: B @connection }\ntype B { id: ID! }";
        let err = transform(src, &reg).unwrap_err();
        assert!(err.to_string().contains("must reference a @model type"));
    }

    #[test]
    fn test_connection_on_non_model_rejected() {
        let reg = TransformerRegistry::standard(&TransformConfig::new("a")).unwrap();
        let src = "type A { id: ID! b: B @connection }\ntype B @model { id: ID! }";
        let err = transform(src, &reg).unwrap_err();
        assert!(err.to_string().contains("must belong to a @model type"));
    }

    #[test]
    fn test_many_to_many_rejected() {
        let reg = TransformerRegistry::standard(&TransformConfig::new("a")).unwrap();
        let src = r#"
type A @model { id: ID! bs: [B] @connection(name: "AB") }
type B @model { id: ID! as: [A] @connection(name: "AB") }
"#;
        let err = transform(src, &reg).unwrap_err();
        assert!(err.to_string().contains("many-to-many"));
    }

    #[test]
    fn test_bad_connection_arguments() {
        let reg = TransformerRegistry::standard(&TransformConfig::new("a")).unwrap();
        let src = "type A @model { id: ID! b: [B] @connection(name: 3) }\ntype B @model { id: ID! }";
        assert!(transform(src, &reg).unwrap_err().to_string().contains("must be a string"));
        let src = "type A @model { id: ID! b: [B] @connection(keyField: \"x\") }\ntype B @model { id: ID! }";
        assert!(transform(src, &reg).unwrap_err().to_string().contains("unknown argument"));
    }

    #[test]
    fn test_connection_stage_disabled() {
        let mut cfg = TransformConfig::new("a");
        cfg.connections = false;
        let reg = TransformerRegistry::standard(&cfg).unwrap();
        let err = transform(BLOG, &reg).unwrap_err();
        assert!(err.to_string().contains("@connection is not supported"));
    }

    #[test]
    fn test_shared_index_name_on_child_rejected() {
        let reg = TransformerRegistry::standard(&TransformConfig::new("a")).unwrap();
        let src = r#"
type A @model { id: ID! ps: [P] @connection(name: "X") }
type B @model { id: ID! ps: [P] @connection(name: "X") }
type P @model { id: ID! }
"#;
        let err = transform(src, &reg).unwrap_err().to_string();
        assert!(err.contains("index 'gsi-X' on 'P'"), "{}", err);
        assert!(err.contains("'A.ps'") && err.contains("'B.ps'"), "{}", err);
        assert!(err.contains("(line 3)"), "{}", err);
    }

    #[test]
    fn test_same_name_on_different_children_allowed() {
        let doc = compile(
            r#"
type A @model { id: ID! ps: [P] @connection(name: "X") }
type B @model { id: ID! qs: [Q] @connection(name: "X") }
type P @model { id: ID! }
type Q @model { id: ID! }
"#,
        );
        for table in ["PTable", "QTable"] {
            let gsis = doc.get(table).unwrap().property("GlobalSecondaryIndexes").unwrap();
            assert_eq!(gsis[0]["IndexName"], "gsi-X");
        }
    }
}
