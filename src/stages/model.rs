//! `@model` stage: one table, role, data source, and five CRUD resolvers per
//! model type.

use super::{API_ID, SCHEMA_ID};
use crate::core::config::TransformConfig;
use crate::core::context::{ModelArtifacts, Operation, TransformContext};
use crate::core::error::{Result, TransformError};
use crate::core::parser::{is_builtin_scalar, ObjectType, TypeRef};
use crate::core::stage::{
    Amendment, Capability, Contribution, DirectiveLocation, DirectiveSpec, TransformerStage,
};
use crate::core::types::{get_att, reference, ResourceDefinition, ResourceType};
use serde_json::{json, Value};

const DIRECTIVES: &[DirectiveSpec] = &[DirectiveSpec {
    name: "model",
    location: DirectiveLocation::Object,
}];

const GET_REQUEST: &str = r#"{
  "version": "2017-02-28",
  "operation": "GetItem",
  "key": {
    "id": $util.dynamodb.toDynamoDBJson($ctx.args.id)
  }
}"#;

const LIST_REQUEST: &str = r#"{
  "version": "2017-02-28",
  "operation": "Scan",
  "limit": $util.defaultIfNull($ctx.args.limit, 10),
  "nextToken": $util.toJson($util.defaultIfNullOrEmpty($ctx.args.nextToken, null))
}"#;

const CREATE_REQUEST: &str = r##"$util.qr($ctx.args.input.put("createdAt", $util.time.nowISO8601()))
$util.qr($ctx.args.input.put("updatedAt", $util.time.nowISO8601()))
{
  "version": "2017-02-28",
  "operation": "PutItem",
  "key": {
    "id": $util.dynamodb.toDynamoDBJson($util.defaultIfNullOrBlank($ctx.args.input.id, $util.autoId()))
  },
  "attributeValues": $util.dynamodb.toMapValuesJson($ctx.args.input),
  "condition": {
    "expression": "attribute_not_exists(#id)",
    "expressionNames": { "#id": "id" }
  }
}"##;

const UPDATE_REQUEST: &str = r##"$util.qr($ctx.args.input.put("updatedAt", $util.time.nowISO8601()))
#set($update = { "expression": "SET", "expressionNames": {}, "expressionValues": {} })
#foreach($entry in $ctx.args.input.entrySet())
#if($entry.key != "id")
#set($update.expression = "$update.expression #$entry.key = :$entry.key,")
$util.qr($update.expressionNames.put("#$entry.key", $entry.key))
$util.qr($update.expressionValues.put(":$entry.key", $util.dynamodb.toDynamoDB($entry.value)))
#end
#end
#set($update.expression = $update.expression.replaceAll(",$", ""))
{
  "version": "2017-02-28",
  "operation": "UpdateItem",
  "key": {
    "id": $util.dynamodb.toDynamoDBJson($ctx.args.input.id)
  },
  "update": $util.toJson($update),
  "condition": {
    "expression": "attribute_exists(#id)",
    "expressionNames": { "#id": "id" }
  }
}"##;

const DELETE_REQUEST: &str = r##"{
  "version": "2017-02-28",
  "operation": "DeleteItem",
  "key": {
    "id": $util.dynamodb.toDynamoDBJson($ctx.args.input.id)
  },
  "condition": {
    "expression": "attribute_exists(#id)",
    "expressionNames": { "#id": "id" }
  }
}"##;

/// Existence condition shared by the update and delete templates.
pub const EXISTS_CONDITION: &str = r##""condition": {
    "expression": "attribute_exists(#id)",
    "expressionNames": { "#id": "id" }
  }"##;

/// Response template shared by every generated resolver.
pub const RESPONSE_TEMPLATE: &str = "$util.toJson($ctx.result)";

pub struct ModelStage {
    api_name: String,
    read_capacity: u32,
    write_capacity: u32,
}

impl ModelStage {
    pub fn new(config: &TransformConfig) -> Self {
        Self {
            api_name: config.api_name.clone(),
            read_capacity: config.read_capacity,
            write_capacity: config.write_capacity,
        }
    }
}

/// GraphQL field name for an operation on a model type.
pub fn operation_field(op: Operation, type_name: &str) -> String {
    match op {
        Operation::Get => format!("get{}", type_name),
        Operation::List => format!("list{}s", type_name),
        Operation::Create => format!("create{}", type_name),
        Operation::Update => format!("update{}", type_name),
        Operation::Delete => format!("delete{}", type_name),
    }
}

/// Logical ID of the resolver for an operation on a model type.
pub fn resolver_id(op: Operation, type_name: &str) -> String {
    format!("{}{}Resolver", op, type_name)
}

fn request_template(op: Operation) -> &'static str {
    match op {
        Operation::Get => GET_REQUEST,
        Operation::List => LIST_REQUEST,
        Operation::Create => CREATE_REQUEST,
        Operation::Update => UPDATE_REQUEST,
        Operation::Delete => DELETE_REQUEST,
    }
}

fn check_model(object: &ObjectType) -> Result<()> {
    if let Some(directive) = object.directive("model") {
        if !directive.arguments.is_empty() {
            return Err(TransformError::schema_at(
                directive.line,
                format!("@model on '{}' takes no arguments", object.name),
            ));
        }
    }
    let id_ok = object
        .field("id")
        .map(|f| f.field_type.nullable() == &TypeRef::Named("ID".to_string()) && f.field_type.is_non_null())
        .unwrap_or(false);
    if !id_ok {
        return Err(TransformError::schema_at(
            object.line,
            format!("@model type '{}' must declare 'id: ID!'", object.name),
        ));
    }
    Ok(())
}

impl ModelStage {
    fn table(&self, type_name: &str) -> ResourceDefinition {
        ResourceDefinition::new(ResourceType::DynamoDbTable)
            .with("TableName", json!(format!("{}-{}", type_name, self.api_name)))
            .with(
                "AttributeDefinitions",
                json!([{ "AttributeName": "id", "AttributeType": "S" }]),
            )
            .with(
                "KeySchema",
                json!([{ "AttributeName": "id", "KeyType": "HASH" }]),
            )
            .with(
                "ProvisionedThroughput",
                json!({
                    "ReadCapacityUnits": self.read_capacity,
                    "WriteCapacityUnits": self.write_capacity
                }),
            )
            .with(
                "StreamSpecification",
                json!({ "StreamViewType": "NEW_AND_OLD_IMAGES" }),
            )
    }

    fn role(&self, type_name: &str, table_id: &str) -> ResourceDefinition {
        let table_arn = get_att(table_id, "Arn");
        ResourceDefinition::new(ResourceType::IamRole)
            .with("RoleName", json!(format!("{}Role-{}", type_name, self.api_name)))
            .with(
                "AssumeRolePolicyDocument",
                json!({
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Effect": "Allow",
                        "Principal": { "Service": "appsync.amazonaws.com" },
                        "Action": "sts:AssumeRole"
                    }]
                }),
            )
            .with(
                "Policies",
                json!([{
                    "PolicyName": "DynamoDBAccess",
                    "PolicyDocument": {
                        "Version": "2012-10-17",
                        "Statement": [{
                            "Effect": "Allow",
                            "Action": [
                                "dynamodb:BatchGetItem",
                                "dynamodb:BatchWriteItem",
                                "dynamodb:PutItem",
                                "dynamodb:DeleteItem",
                                "dynamodb:GetItem",
                                "dynamodb:Scan",
                                "dynamodb:Query",
                                "dynamodb:UpdateItem"
                            ],
                            "Resource": [
                                table_arn.clone(),
                                { "Fn::Join": ["/", [table_arn, "index/*"]] }
                            ]
                        }]
                    }
                }]),
            )
    }

    fn data_source(&self, type_name: &str, table_id: &str, role_id: &str) -> ResourceDefinition {
        ResourceDefinition::new(ResourceType::DataSource)
            .with("ApiId", get_att(API_ID, "ApiId"))
            .with("Name", json!(format!("{}Table", type_name)))
            .with("Type", json!("AMAZON_DYNAMODB"))
            .with("ServiceRoleArn", get_att(role_id, "Arn"))
            .with(
                "DynamoDBConfig",
                json!({
                    "AwsRegion": reference("AWS::Region"),
                    "TableName": reference(table_id)
                }),
            )
    }
}

/// Build a resolver definition; shared with the connection stage.
pub fn resolver(
    type_name: &str,
    field_name: &str,
    data_source_id: &str,
    request: &str,
) -> ResourceDefinition {
    ResourceDefinition::new(ResourceType::Resolver)
        .with("ApiId", get_att(API_ID, "ApiId"))
        .with("DataSourceName", get_att(data_source_id, "Name"))
        .with("TypeName", json!(type_name))
        .with("FieldName", json!(field_name))
        .with("RequestMappingTemplate", json!(request))
        .with("ResponseMappingTemplate", json!(RESPONSE_TEMPLATE))
}

/// Generated SDL for the model types' connection, input, and root types.
fn generated_sdl(ctx: &TransformContext<'_>, models: &[&ObjectType]) -> String {
    let is_input_field = |t: &TypeRef| {
        let named = t.named_type();
        is_builtin_scalar(named) || ctx.is_enum(named)
    };

    let mut blocks = Vec::new();
    for object in models {
        let name = &object.name;
        blocks.push(format!(
            "type Model{}Connection {{\n  items: [{}]\n  nextToken: String\n}}",
            name, name
        ));

        let mut create = format!("input Create{}Input {{\n  id: ID\n", name);
        let mut update = format!("input Update{}Input {{\n  id: ID!\n", name);
        for field in object.fields.iter().filter(|f| f.name != "id" && is_input_field(&f.field_type)) {
            create.push_str(&format!("  {}: {}\n", field.name, field.field_type));
            update.push_str(&format!("  {}: {}\n", field.name, field.field_type.nullable()));
        }
        create.push('}');
        update.push('}');
        blocks.push(create);
        blocks.push(update);
        blocks.push(format!("input Delete{}Input {{\n  id: ID\n}}", name));
    }

    let mut query = String::from("type Query {\n");
    let mut mutation = String::from("type Mutation {\n");
    for object in models {
        let name = &object.name;
        query.push_str(&format!(
            "  {}(id: ID!): {}\n",
            operation_field(Operation::Get, name),
            name
        ));
        query.push_str(&format!(
            "  {}(limit: Int, nextToken: String): Model{}Connection\n",
            operation_field(Operation::List, name),
            name
        ));
        for op in [Operation::Create, Operation::Update, Operation::Delete] {
            mutation.push_str(&format!(
                "  {}(input: {}{}Input!): {}\n",
                operation_field(op, name),
                op,
                name,
                name
            ));
        }
    }
    query.push('}');
    mutation.push('}');
    blocks.push(query);
    blocks.push(mutation);

    blocks.join("\n\n")
}

impl TransformerStage for ModelStage {
    fn name(&self) -> &str {
        "model"
    }

    fn requires(&self) -> &[Capability] {
        &[Capability::Api, Capability::TypeRegistry]
    }

    fn provides(&self) -> &[Capability] {
        &[Capability::ModelTables, Capability::Resolvers]
    }

    fn directives(&self) -> &[DirectiveSpec] {
        DIRECTIVES
    }

    fn contribute(&self, ctx: &mut TransformContext<'_>) -> Result<Contribution> {
        let models: Vec<ObjectType> = ctx
            .object_types()
            .filter(|o| o.has_directive("model"))
            .cloned()
            .collect();

        let mut c = Contribution::default();
        let mut artifacts = Vec::new();
        for object in &models {
            check_model(object)?;
            let name = &object.name;
            let table_id = format!("{}Table", name);
            let role_id = format!("{}IAMRole", name);
            let ds_id = format!("{}DataSource", name);

            c.add(table_id.clone(), self.table(name));
            c.add(role_id.clone(), self.role(name, &table_id));
            c.add(ds_id.clone(), self.data_source(name, &table_id, &role_id));

            let mut resolvers = Vec::new();
            for op in Operation::ALL {
                let id = resolver_id(op, name);
                c.add(
                    id.clone(),
                    resolver(
                        op.root_type(),
                        &operation_field(op, name),
                        &ds_id,
                        request_template(op),
                    ),
                );
                resolvers.push((op, id));
            }

            artifacts.push(ModelArtifacts {
                type_name: name.clone(),
                table: table_id,
                role: role_id,
                data_source: ds_id,
                resolvers,
            });
        }

        if !models.is_empty() {
            let refs: Vec<&ObjectType> = models.iter().collect();
            let base = ctx
                .document()
                .get(SCHEMA_ID)
                .and_then(|d| d.property("Definition"))
                .and_then(Value::as_str)
                .ok_or_else(|| TransformError::Amendment {
                    stage: self.name().to_string(),
                    target: SCHEMA_ID.to_string(),
                })?;
            let definition = format!("{}\n\n{}", base, generated_sdl(ctx, &refs));
            c.amend(Amendment::new(SCHEMA_ID, "Definition", json!(definition)));
        }

        for a in artifacts {
            ctx.register_model(a);
        }
        Ok(c)
    }
}
