//! `@auth` stage: switches the API to Cognito user pools and guards the
//! resolvers of `@auth` model types.
//!
//! Rules are `{allow: owner, ownerField: "..."}` and
//! `{allow: groups, groups: [...]}`. Group membership is checked in every
//! request template and stashed for the response side. Owner rules inject the
//! owner on create, condition updates and deletes on it, and filter reads.

use super::model::{EXISTS_CONDITION, RESPONSE_TEMPLATE};
use super::API_ID;
use crate::core::context::{Operation, TransformContext};
use crate::core::error::{Result, TransformError};
use crate::core::parser::{DirectiveValue, ObjectType};
use crate::core::stage::{
    Amendment, Capability, Contribution, DirectiveLocation, DirectiveSpec, TransformerStage,
};
use crate::core::types::reference;
use serde_json::{json, Value};

const DIRECTIVES: &[DirectiveSpec] = &[DirectiveSpec {
    name: "auth",
    location: DirectiveLocation::Object,
}];

const DEFAULT_OWNER_FIELD: &str = "owner";

pub struct AuthStage {
    user_pool_id: String,
}

impl AuthStage {
    pub fn new(user_pool_id: &str) -> Self {
        Self {
            user_pool_id: user_pool_id.to_string(),
        }
    }
}

/// Parsed `@auth` rules for one type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthRules {
    pub owner_field: Option<String>,
    pub groups: Vec<String>,
}

fn rule_error(object: &ObjectType, line: usize, detail: &str) -> TransformError {
    TransformError::schema_at(line, format!("@auth on '{}': {}", object.name, detail))
}

/// Parse the `rules` argument of an `@auth` directive.
pub fn parse_rules(object: &ObjectType) -> Result<Option<AuthRules>> {
    let Some(directive) = object.directive("auth") else {
        return Ok(None);
    };
    let line = directive.line;
    if let Some(extra) = directive.arguments.keys().find(|k| *k != "rules") {
        return Err(rule_error(object, line, &format!("unknown argument '{}'", extra)));
    }
    let rules = directive
        .argument("rules")
        .and_then(DirectiveValue::as_list)
        .ok_or_else(|| rule_error(object, line, "rules must be a list"))?;
    if rules.is_empty() {
        return Err(rule_error(object, line, "at least one rule is required"));
    }

    let mut parsed = AuthRules::default();
    for rule in rules {
        let fields = rule
            .as_object()
            .ok_or_else(|| rule_error(object, line, "each rule must be an object"))?;
        let allow = fields
            .get("allow")
            .and_then(DirectiveValue::as_str)
            .ok_or_else(|| rule_error(object, line, "each rule needs an 'allow' strategy"))?;
        match allow {
            "owner" => {
                if parsed.owner_field.is_some() {
                    return Err(rule_error(object, line, "only one owner rule is allowed"));
                }
                let field = match fields.get("ownerField") {
                    None => DEFAULT_OWNER_FIELD.to_string(),
                    Some(v) => v
                        .as_str()
                        .ok_or_else(|| rule_error(object, line, "ownerField must be a string"))?
                        .to_string(),
                };
                parsed.owner_field = Some(field);
            }
            "groups" => {
                let groups = fields
                    .get("groups")
                    .and_then(DirectiveValue::as_list)
                    .filter(|g| !g.is_empty())
                    .ok_or_else(|| rule_error(object, line, "groups rule needs a non-empty 'groups' list"))?;
                for g in groups {
                    let name = g
                        .as_str()
                        .ok_or_else(|| rule_error(object, line, "group names must be strings"))?;
                    if !parsed.groups.iter().any(|existing| existing == name) {
                        parsed.groups.push(name.to_string());
                    }
                }
            }
            other => {
                return Err(rule_error(
                    object,
                    line,
                    &format!("unsupported auth strategy '{}'", other),
                ))
            }
        }
    }
    Ok(Some(parsed))
}

fn group_check(groups: &[String]) -> String {
    let mut out = String::from("#set($isStaticGroupAuthorized = false)\n");
    if !groups.is_empty() {
        let list = serde_json::to_string(groups).unwrap_or_else(|_| "[]".to_string());
        out.push_str(
            "#set($userGroups = $util.defaultIfNull($ctx.identity.claims.get(\"cognito:groups\"), []))\n",
        );
        out.push_str(&format!("#foreach($group in {})\n", list));
        out.push_str("#if($userGroups.contains($group))\n#set($isStaticGroupAuthorized = true)\n#end\n#end\n");
    }
    out.push_str("$util.qr($ctx.stash.put(\"isStaticGroupAuthorized\", $isStaticGroupAuthorized))\n");
    out
}

/// Request template with the authorization prelude for one operation.
fn guard_request(op: Operation, rules: &AuthRules, request: &str) -> String {
    let mut out = group_check(&rules.groups);
    let Some(owner) = &rules.owner_field else {
        out.push_str("#if(!$isStaticGroupAuthorized)\n$util.unauthorized()\n#end\n");
        out.push_str(request);
        return out;
    };
    match op {
        Operation::Create => {
            out.push_str(&format!(
                "#if(!$isStaticGroupAuthorized)\n$util.qr($ctx.args.input.put(\"{}\", $ctx.identity.username))\n#end\n",
                owner
            ));
            out.push_str(request);
        }
        Operation::Update | Operation::Delete => {
            out.push_str(
                "#set($authCondition = { \"expression\": \"attribute_exists(#id)\", \"expressionNames\": { \"#id\": \"id\" } })\n",
            );
            out.push_str("#if(!$isStaticGroupAuthorized)\n");
            out.push_str("#set($authCondition.expression = \"attribute_exists(#id) AND #owner = :owner\")\n");
            out.push_str(&format!(
                "$util.qr($authCondition.expressionNames.put(\"#owner\", \"{}\"))\n",
                owner
            ));
            out.push_str(
                "$util.qr($authCondition.put(\"expressionValues\", { \":owner\": $util.dynamodb.toDynamoDB($ctx.identity.username) }))\n#end\n",
            );
            out.push_str(&request.replace(
                EXISTS_CONDITION,
                "\"condition\": $util.toJson($authCondition)",
            ));
        }
        Operation::Get | Operation::List => out.push_str(request),
    }
    out
}

/// Response template enforcing ownership on reads.
fn guard_response(op: Operation, rules: &AuthRules) -> Option<String> {
    let owner = rules.owner_field.as_ref()?;
    match op {
        Operation::Get => Some(format!(
            "#if($util.isNull($ctx.result) || $ctx.stash.isStaticGroupAuthorized || $ctx.result.{} == $ctx.identity.username)\n{}\n#else\n$util.unauthorized()\n#end",
            owner, RESPONSE_TEMPLATE
        )),
        Operation::List => Some(format!(
            "#set($items = [])\n#foreach($item in $ctx.result.items)\n#if($ctx.stash.isStaticGroupAuthorized || $item.{} == $ctx.identity.username)\n$util.qr($items.add($item))\n#end\n#end\n$util.toJson({{ \"items\": $items, \"nextToken\": $ctx.result.nextToken }})",
            owner
        )),
        _ => None,
    }
}

impl TransformerStage for AuthStage {
    fn name(&self) -> &str {
        "auth"
    }

    fn requires(&self) -> &[Capability] {
        &[Capability::Api, Capability::Resolvers]
    }

    fn directives(&self) -> &[DirectiveSpec] {
        DIRECTIVES
    }

    fn terminal(&self) -> bool {
        true
    }

    fn contribute(&self, ctx: &mut TransformContext<'_>) -> Result<Contribution> {
        let mut c = Contribution::default();
        c.amend(Amendment::new(
            API_ID,
            "AuthenticationType",
            json!("AMAZON_COGNITO_USER_POOLS"),
        ));
        c.amend(Amendment::new(
            API_ID,
            "UserPoolConfig",
            json!({
                "UserPoolId": self.user_pool_id,
                "AwsRegion": reference("AWS::Region"),
                "DefaultAction": "ALLOW"
            }),
        ));

        for object in ctx.object_types() {
            let Some(rules) = parse_rules(object)? else {
                continue;
            };
            let model = ctx.model(&object.name).ok_or_else(|| {
                TransformError::schema_at(
                    object.line,
                    format!("@auth type '{}' must also be a @model type", object.name),
                )
            })?;
            for (op, id) in &model.resolvers {
                let Some(resolver) = ctx.document().get(id) else {
                    continue;
                };
                let request = resolver
                    .property("RequestMappingTemplate")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                c.amend(Amendment::new(
                    id,
                    "RequestMappingTemplate",
                    json!(guard_request(*op, &rules, request)),
                ));
                if let Some(response) = guard_response(*op, &rules) {
                    c.amend(Amendment::new(id, "ResponseMappingTemplate", json!(response)));
                }
            }
        }
        Ok(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::TransformConfig;
    use crate::core::engine::transform;
    use crate::core::parser::parse_schema;
    use crate::core::registry::TransformerRegistry;
    use crate::core::types::ResourceDocument;

    fn compile(src: &str) -> ResourceDocument {
        let cfg = TransformConfig::new("notes").with_auth("us-east-1_pool");
        let reg = TransformerRegistry::standard(&cfg).unwrap();
        transform(src, &reg).unwrap()
    }

    fn prop<'a>(doc: &'a ResourceDocument, id: &str, key: &str) -> &'a str {
        doc.get(id).and_then(|d| d.property(key)).and_then(Value::as_str).unwrap()
    }

    fn rules_of(src: &str) -> Result<Option<AuthRules>> {
        let schema = parse_schema(src).unwrap();
        let object = schema.object_types().next().unwrap().clone();
        parse_rules(&object)
    }

    #[test]
    fn test_api_switches_to_user_pools() {
        let doc = compile("type Note @model { id: ID! }");
        let api = doc.get("GraphQLApi").unwrap();
        assert_eq!(api.property("AuthenticationType").unwrap(), "AMAZON_COGNITO_USER_POOLS");
        assert_eq!(
            api.property("UserPoolConfig").unwrap(),
            &json!({
                "UserPoolId": "us-east-1_pool",
                "AwsRegion": {"Ref": "AWS::Region"},
                "DefaultAction": "ALLOW"
            })
        );
        // no @auth types: resolvers untouched
        assert!(!prop(&doc, "GetNoteResolver", "RequestMappingTemplate").contains("isStaticGroupAuthorized"));
    }

    #[test]
    fn test_auth_adds_no_resources() {
        let plain = {
            let reg = TransformerRegistry::standard(&TransformConfig::new("notes")).unwrap();
            transform("type Note @model { id: ID! }", &reg).unwrap()
        };
        let authed = compile("type Note @model @auth(rules: [{allow: owner}]) { id: ID! }");
        let a: Vec<_> = plain.ids().collect();
        let b: Vec<_> = authed.ids().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_owner_rule_guards_resolvers() {
        let doc = compile("type Note @model @auth(rules: [{allow: owner, ownerField: \"author\"}]) { id: ID! }");
        let create = prop(&doc, "CreateNoteResolver", "RequestMappingTemplate");
        assert!(create.contains("$ctx.args.input.put(\"author\", $ctx.identity.username)"));
        assert!(create.ends_with('}'));

        let update = prop(&doc, "UpdateNoteResolver", "RequestMappingTemplate");
        assert!(update.contains("\"condition\": $util.toJson($authCondition)"));
        assert!(!update.contains(EXISTS_CONDITION));
        let delete = prop(&doc, "DeleteNoteResolver", "RequestMappingTemplate");
        assert!(delete.contains("expressionNames.put(\"#owner\", \"author\")"));

        let get = prop(&doc, "GetNoteResolver", "ResponseMappingTemplate");
        assert!(get.contains("$ctx.result.author == $ctx.identity.username"));
        let list = prop(&doc, "ListNoteResolver", "ResponseMappingTemplate");
        assert!(list.contains("$item.author == $ctx.identity.username"));
        assert_eq!(
            prop(&doc, "CreateNoteResolver", "ResponseMappingTemplate"),
            RESPONSE_TEMPLATE
        );
    }

    #[test]
    fn test_groups_rule_denies_non_members() {
        let doc = compile("type Note @model @auth(rules: [{allow: groups, groups: [\"Admin\", \"Ops\"]}]) { id: ID! }");
        let get = prop(&doc, "GetNoteResolver", "RequestMappingTemplate");
        assert!(get.starts_with("#set($isStaticGroupAuthorized = false)"));
        assert!(get.contains("#foreach($group in [\"Admin\",\"Ops\"])"));
        assert!(get.contains("$util.unauthorized()"));
        assert_eq!(prop(&doc, "GetNoteResolver", "ResponseMappingTemplate"), RESPONSE_TEMPLATE);
    }

    #[test]
    fn test_only_auth_types_are_guarded() {
        let doc = compile(
            "type Note @model @auth(rules: [{allow: owner}]) { id: ID! }\ntype Tag @model { id: ID! }",
        );
        assert!(prop(&doc, "GetNoteResolver", "RequestMappingTemplate").contains("isStaticGroupAuthorized"));
        assert!(!prop(&doc, "GetTagResolver", "RequestMappingTemplate").contains("isStaticGroupAuthorized"));
    }

    #[test]
    fn test_parse_rules() {
        let rules = rules_of("type N @model @auth(rules: [{allow: owner}, {allow: groups, groups: [\"A\", \"A\", \"B\"]}]) { id: ID! }")
            .unwrap()
            .unwrap();
        assert_eq!(rules.owner_field.as_deref(), Some("owner"));
        assert_eq!(rules.groups, vec!["A", "B"]);
        assert!(rules_of("type N @model { id: ID! }").unwrap().is_none());
    }

    #[test]
    fn test_malformed_rules() {
        let cases = [
            ("@auth", "rules must be a list"),
            ("@auth(rules: [])", "at least one rule"),
            ("@auth(rules: [\"owner\"])", "must be an object"),
            ("@auth(rules: [{ownerField: \"x\"}])", "needs an 'allow'"),
            ("@auth(rules: [{allow: public}])", "unsupported auth strategy 'public'"),
            ("@auth(rules: [{allow: groups}])", "non-empty 'groups'"),
            ("@auth(rules: [{allow: owner}, {allow: owner}])", "only one owner rule"),
            ("@auth(rules: [{allow: owner}], mode: x)", "unknown argument 'mode'"),
        ];
        for (directive, expected) in cases {
            let src = format!("type N @model {} {{ id: ID! }}", directive);
            let err = rules_of(&src).unwrap_err();
            assert!(err.to_string().contains(expected), "{}: {}", directive, err);
        }
    }

    #[test]
    fn test_auth_without_model_rejected() {
        let cfg = TransformConfig::new("n").with_auth("pool");
        let reg = TransformerRegistry::standard(&cfg).unwrap();
        let err = transform("type N @auth(rules: [{allow: owner}]) { id: ID! }", &reg).unwrap_err();
        assert!(err.to_string().contains("must also be a @model type"));
    }
}
