//! Schema parsing and validation.
//!
//! Parses the annotated GraphQL SDL subset the pipeline compiles:
//! - `type` definitions with directives on the type and its fields
//! - `enum` definitions
//! - `#` comments and `"..."`/`"""..."""` descriptions (ignored)
//!
//! Structural validation (duplicate names, dangling type references,
//! reserved root types) happens here. Which directives are legal depends on
//! the configured stages and is checked by the engine.

use super::error::{Result, TransformError};
use indexmap::IndexMap;
use std::fmt;

/// Scalars available without declaration.
pub const BUILTIN_SCALARS: &[&str] = &[
    "ID",
    "String",
    "Int",
    "Float",
    "Boolean",
    "AWSDate",
    "AWSTime",
    "AWSDateTime",
    "AWSTimestamp",
    "AWSEmail",
    "AWSJSON",
    "AWSURL",
    "AWSPhone",
    "AWSIPAddress",
];

/// Root types generated by the pipeline; users may not declare them.
pub const RESERVED_TYPES: &[&str] = &["Query", "Mutation", "Subscription"];

/// Deepest list type or directive value the parser accepts.
pub const MAX_NESTING: usize = 64;

pub fn is_builtin_scalar(name: &str) -> bool {
    BUILTIN_SCALARS.contains(&name)
}

// ============================================================================
// AST
// ============================================================================

/// A parsed, structurally valid schema. Definitions keep declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub types: Vec<TypeDefinition>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefinition {
    Object(ObjectType),
    Enum(EnumType),
}

impl TypeDefinition {
    pub fn name(&self) -> &str {
        match self {
            Self::Object(o) => &o.name,
            Self::Enum(e) => &e.name,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Self::Object(o) => o.line,
            Self::Enum(e) => e.line,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectType {
    pub name: String,
    pub directives: Vec<Directive>,
    pub fields: Vec<FieldDefinition>,
    pub line: usize,
}

impl ObjectType {
    pub fn directive(&self, name: &str) -> Option<&Directive> {
        self.directives.iter().find(|d| d.name == name)
    }

    pub fn has_directive(&self, name: &str) -> bool {
        self.directive(name).is_some()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    pub field_type: TypeRef,
    pub directives: Vec<Directive>,
    pub line: usize,
}

impl FieldDefinition {
    pub fn directive(&self, name: &str) -> Option<&Directive> {
        self.directives.iter().find(|d| d.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    pub name: String,
    pub values: Vec<String>,
    pub line: usize,
}

/// Field type reference: `Name`, `Name!`, `[Name]`, `[Name!]!`, ...
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    /// The innermost named type.
    pub fn named_type(&self) -> &str {
        match self {
            Self::Named(n) => n,
            Self::List(inner) | Self::NonNull(inner) => inner.named_type(),
        }
    }

    /// True for list types, looking through an outer `!`.
    pub fn is_list(&self) -> bool {
        match self {
            Self::List(_) => true,
            Self::NonNull(inner) => inner.is_list(),
            Self::Named(_) => false,
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }

    /// The same type with an outer `!` removed.
    pub fn nullable(&self) -> &TypeRef {
        match self {
            Self::NonNull(inner) => inner,
            other => other,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(n) => write!(f, "{}", n),
            Self::List(inner) => write!(f, "[{}]", inner),
            Self::NonNull(inner) => write!(f, "{}!", inner),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub name: String,
    pub arguments: IndexMap<String, DirectiveValue>,
    pub line: usize,
}

impl Directive {
    pub fn argument(&self, name: &str) -> Option<&DirectiveValue> {
        self.arguments.get(name)
    }
}

/// GraphQL input value used in directive arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveValue {
    String(String),
    Int(i64),
    Float(f64),
    Boolean(bool),
    Enum(String),
    Null,
    List(Vec<DirectiveValue>),
    Object(IndexMap<String, DirectiveValue>),
}

impl DirectiveValue {
    /// String or enum literal as text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[DirectiveValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, DirectiveValue>> {
        match self {
            Self::Object(fields) => Some(fields),
            _ => None,
        }
    }
}

impl Schema {
    pub fn object_types(&self) -> impl Iterator<Item = &ObjectType> {
        self.types.iter().filter_map(|t| match t {
            TypeDefinition::Object(o) => Some(o),
            TypeDefinition::Enum(_) => None,
        })
    }

    pub fn enums(&self) -> impl Iterator<Item = &EnumType> {
        self.types.iter().filter_map(|t| match t {
            TypeDefinition::Enum(e) => Some(e),
            TypeDefinition::Object(_) => None,
        })
    }

    pub fn object(&self, name: &str) -> Option<&ObjectType> {
        self.object_types().find(|o| o.name == name)
    }

    pub fn is_enum(&self, name: &str) -> bool {
        self.enums().any(|e| e.name == name)
    }
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String),
    Str(String),
    Int(i64),
    Float(f64),
    Punct(char),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(n) => write!(f, "'{}'", n),
            Self::Str(_) => write!(f, "string"),
            Self::Int(i) => write!(f, "'{}'", i),
            Self::Float(x) => write!(f, "'{}'", x),
            Self::Punct(c) => write!(f, "'{}'", c),
        }
    }
}

#[derive(Debug, Clone)]
struct Lexed {
    token: Token,
    line: usize,
}

fn tokenize(src: &str) -> Result<Vec<Lexed>> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut line = 1;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' => {
                line += 1;
                i += 1;
            }
            c if c.is_whitespace() || c == ',' || c == '\u{feff}' => i += 1,
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '{' | '}' | '(' | ')' | '[' | ']' | ':' | '!' | '@' | '=' | '|' | '&' => {
                tokens.push(Lexed {
                    token: Token::Punct(c),
                    line,
                });
                i += 1;
            }
            '"' => {
                let start_line = line;
                let block = chars.get(i + 1) == Some(&'"') && chars.get(i + 2) == Some(&'"');
                let text = if block {
                    i += 3;
                    let mut s = String::new();
                    loop {
                        if i >= chars.len() {
                            return Err(TransformError::schema_at(
                                start_line,
                                "unterminated block string",
                            ));
                        }
                        if chars[i] == '"'
                            && chars.get(i + 1) == Some(&'"')
                            && chars.get(i + 2) == Some(&'"')
                        {
                            i += 3;
                            break;
                        }
                        if chars[i] == '\n' {
                            line += 1;
                        }
                        s.push(chars[i]);
                        i += 1;
                    }
                    s
                } else {
                    i += 1;
                    let mut s = String::new();
                    loop {
                        match chars.get(i) {
                            None | Some('\n') => {
                                return Err(TransformError::schema_at(
                                    start_line,
                                    "unterminated string",
                                ))
                            }
                            Some('"') => {
                                i += 1;
                                break;
                            }
                            Some('\\') => {
                                let escaped = match chars.get(i + 1) {
                                    Some('n') => '\n',
                                    Some('t') => '\t',
                                    Some('"') => '"',
                                    Some('\\') => '\\',
                                    Some('/') => '/',
                                    other => {
                                        return Err(TransformError::schema_at(
                                            line,
                                            format!("invalid escape sequence {:?}", other),
                                        ))
                                    }
                                };
                                s.push(escaped);
                                i += 2;
                            }
                            Some(&ch) => {
                                s.push(ch);
                                i += 1;
                            }
                        }
                    }
                    s
                };
                tokens.push(Lexed {
                    token: Token::Str(text),
                    line: start_line,
                });
            }
            c if c == '-' || c.is_ascii_digit() => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let token = if text.contains('.') {
                    text.parse::<f64>().map(Token::Float).ok()
                } else {
                    text.parse::<i64>().map(Token::Int).ok()
                };
                let token = token.ok_or_else(|| {
                    TransformError::schema_at(line, format!("invalid number '{}'", text))
                })?;
                tokens.push(Lexed { token, line });
            }
            c if c == '_' || c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && (chars[i] == '_' || chars[i].is_ascii_alphanumeric()) {
                    i += 1;
                }
                tokens.push(Lexed {
                    token: Token::Name(chars[start..i].iter().collect()),
                    line,
                });
            }
            other => {
                return Err(TransformError::schema_at(
                    line,
                    format!("unexpected character '{}'", other),
                ))
            }
        }
    }

    Ok(tokens)
}

// ============================================================================
// Parser
// ============================================================================

struct Parser {
    tokens: Vec<Lexed>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|l| &l.token)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|l| l.line)
            .unwrap_or(1)
    }

    fn next(&mut self) -> Result<Token> {
        let lexed = self
            .tokens
            .get(self.pos)
            .ok_or_else(|| TransformError::schema_at(self.line(), "unexpected end of schema"))?;
        self.pos += 1;
        Ok(lexed.token.clone())
    }

    fn at_punct(&self, c: char) -> bool {
        self.peek() == Some(&Token::Punct(c))
    }

    fn expect_punct(&mut self, c: char) -> Result<()> {
        let line = self.line();
        match self.next()? {
            Token::Punct(p) if p == c => Ok(()),
            other => Err(TransformError::schema_at(
                line,
                format!("expected '{}', found {}", c, other),
            )),
        }
    }

    fn expect_name(&mut self) -> Result<String> {
        let line = self.line();
        match self.next()? {
            Token::Name(n) => Ok(n),
            other => Err(TransformError::schema_at(
                line,
                format!("expected a name, found {}", other),
            )),
        }
    }

    fn skip_description(&mut self) {
        if matches!(self.peek(), Some(Token::Str(_))) {
            self.pos += 1;
        }
    }

    fn parse_document(&mut self) -> Result<Schema> {
        let mut types = Vec::new();
        loop {
            self.skip_description();
            if self.peek().is_none() {
                break;
            }
            let line = self.line();
            let keyword = self.expect_name()?;
            let definition = match keyword.as_str() {
                "type" => TypeDefinition::Object(self.parse_object(line)?),
                "enum" => TypeDefinition::Enum(self.parse_enum(line)?),
                "input" | "interface" | "union" | "scalar" | "schema" | "extend"
                | "directive" => {
                    return Err(TransformError::schema_at(
                        line,
                        format!("'{}' definitions are not supported", keyword),
                    ))
                }
                other => {
                    return Err(TransformError::schema_at(
                        line,
                        format!("expected a type definition, found '{}'", other),
                    ))
                }
            };
            types.push(definition);
        }
        Ok(Schema { types })
    }

    fn parse_object(&mut self, line: usize) -> Result<ObjectType> {
        let name = self.expect_name()?;
        if self.peek() == Some(&Token::Name("implements".to_string())) {
            return Err(TransformError::schema_at(
                self.line(),
                format!("type '{}': interfaces are not supported", name),
            ));
        }
        let directives = self.parse_directives()?;
        self.expect_punct('{')?;

        let mut fields = Vec::new();
        while !self.at_punct('}') {
            self.skip_description();
            let field_line = self.line();
            let field_name = self.expect_name()?;
            if self.at_punct('(') {
                return Err(TransformError::schema_at(
                    field_line,
                    format!("field '{}.{}': field arguments are not supported", name, field_name),
                ));
            }
            self.expect_punct(':')?;
            let field_type = self.parse_type_ref(0)?;
            let field_directives = self.parse_directives()?;
            fields.push(FieldDefinition {
                name: field_name,
                field_type,
                directives: field_directives,
                line: field_line,
            });
        }
        self.expect_punct('}')?;

        Ok(ObjectType {
            name,
            directives,
            fields,
            line,
        })
    }

    fn parse_enum(&mut self, line: usize) -> Result<EnumType> {
        let name = self.expect_name()?;
        if self.at_punct('@') {
            return Err(TransformError::schema_at(
                self.line(),
                format!("enum '{}': directives on enums are not supported", name),
            ));
        }
        self.expect_punct('{')?;
        let mut values = Vec::new();
        while !self.at_punct('}') {
            self.skip_description();
            values.push(self.expect_name()?);
        }
        self.expect_punct('}')?;
        Ok(EnumType { name, values, line })
    }

    fn parse_type_ref(&mut self, depth: usize) -> Result<TypeRef> {
        let base = if self.at_punct('[') {
            if depth >= MAX_NESTING {
                return Err(TransformError::schema_at(self.line(), "type nesting too deep"));
            }
            self.pos += 1;
            let inner = self.parse_type_ref(depth + 1)?;
            self.expect_punct(']')?;
            TypeRef::List(Box::new(inner))
        } else {
            TypeRef::Named(self.expect_name()?)
        };
        if self.at_punct('!') {
            self.pos += 1;
            return Ok(TypeRef::NonNull(Box::new(base)));
        }
        Ok(base)
    }

    fn parse_directives(&mut self) -> Result<Vec<Directive>> {
        let mut directives = Vec::new();
        while self.at_punct('@') {
            let line = self.line();
            self.pos += 1;
            let name = self.expect_name()?;
            let mut arguments = IndexMap::new();
            if self.at_punct('(') {
                self.pos += 1;
                while !self.at_punct(')') {
                    let arg_line = self.line();
                    let arg = self.expect_name()?;
                    self.expect_punct(':')?;
                    let value = self.parse_value(0)?;
                    if arguments.insert(arg.clone(), value).is_some() {
                        return Err(TransformError::schema_at(
                            arg_line,
                            format!("@{}: duplicate argument '{}'", name, arg),
                        ));
                    }
                }
                self.expect_punct(')')?;
            }
            directives.push(Directive {
                name,
                arguments,
                line,
            });
        }
        Ok(directives)
    }

    fn parse_value(&mut self, depth: usize) -> Result<DirectiveValue> {
        let line = self.line();
        if depth >= MAX_NESTING {
            return Err(TransformError::schema_at(line, "value nesting too deep"));
        }
        match self.next()? {
            Token::Str(s) => Ok(DirectiveValue::String(s)),
            Token::Int(i) => Ok(DirectiveValue::Int(i)),
            Token::Float(x) => Ok(DirectiveValue::Float(x)),
            Token::Name(n) => Ok(match n.as_str() {
                "true" => DirectiveValue::Boolean(true),
                "false" => DirectiveValue::Boolean(false),
                "null" => DirectiveValue::Null,
                _ => DirectiveValue::Enum(n),
            }),
            Token::Punct('[') => {
                let mut items = Vec::new();
                while !self.at_punct(']') {
                    items.push(self.parse_value(depth + 1)?);
                }
                self.expect_punct(']')?;
                Ok(DirectiveValue::List(items))
            }
            Token::Punct('{') => {
                let mut fields = IndexMap::new();
                while !self.at_punct('}') {
                    let key = self.expect_name()?;
                    self.expect_punct(':')?;
                    let value = self.parse_value(depth + 1)?;
                    fields.insert(key, value);
                }
                self.expect_punct('}')?;
                Ok(DirectiveValue::Object(fields))
            }
            other => Err(TransformError::schema_at(
                line,
                format!("expected a value, found {}", other),
            )),
        }
    }
}

/// Parse and structurally validate a schema.
pub fn parse_schema(src: &str) -> Result<Schema> {
    let tokens = tokenize(src)?;
    let mut parser = Parser { tokens, pos: 0 };
    let schema = parser.parse_document()?;
    validate_schema(&schema)?;
    Ok(schema)
}

/// Structural checks that do not depend on which stages are configured.
pub fn validate_schema(schema: &Schema) -> Result<()> {
    let mut seen: IndexMap<&str, usize> = IndexMap::new();
    for def in &schema.types {
        if RESERVED_TYPES.contains(&def.name()) {
            return Err(TransformError::schema_at(
                def.line(),
                format!("'{}' is generated and may not be declared", def.name()),
            ));
        }
        if is_builtin_scalar(def.name()) {
            return Err(TransformError::schema_at(
                def.line(),
                format!("'{}' redefines a built-in scalar", def.name()),
            ));
        }
        if let Some(first) = seen.insert(def.name(), def.line()) {
            return Err(TransformError::schema_at(
                def.line(),
                format!("type '{}' already declared at line {}", def.name(), first),
            ));
        }
    }

    for e in schema.enums() {
        if e.values.is_empty() {
            return Err(TransformError::schema_at(
                e.line,
                format!("enum '{}' has no values", e.name),
            ));
        }
    }

    for object in schema.object_types() {
        if object.fields.is_empty() {
            return Err(TransformError::schema_at(
                object.line,
                format!("type '{}' has no fields", object.name),
            ));
        }
        let mut field_names: Vec<&str> = Vec::new();
        for field in &object.fields {
            if field_names.contains(&field.name.as_str()) {
                return Err(TransformError::schema_at(
                    field.line,
                    format!("field '{}.{}' declared twice", object.name, field.name),
                ));
            }
            field_names.push(&field.name);

            let target = field.field_type.named_type();
            if !is_builtin_scalar(target) && !seen.contains_key(target) {
                return Err(TransformError::schema_at(
                    field.line,
                    format!(
                        "field '{}.{}' references unknown type '{}'",
                        object.name, field.name, target
                    ),
                ));
            }
        }
    }

    Ok(())
}

// ============================================================================
// Printing
// ============================================================================

/// Print an object type without directives.
pub fn print_object(object: &ObjectType) -> String {
    let mut out = format!("type {} {{\n", object.name);
    for field in &object.fields {
        out.push_str(&format!("  {}: {}\n", field.name, field.field_type));
    }
    out.push('}');
    out
}

pub fn print_enum(e: &EnumType) -> String {
    let mut out = format!("enum {} {{\n", e.name);
    for value in &e.values {
        out.push_str(&format!("  {}\n", value));
    }
    out.push('}');
    out
}

/// Print every definition, directive-free, separated by blank lines.
pub fn print_schema(schema: &Schema) -> String {
    schema
        .types
        .iter()
        .map(|t| match t {
            TypeDefinition::Object(o) => print_object(o),
            TypeDefinition::Enum(e) => print_enum(e),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOG: &str = r#"
# Blog schema
type Blog @model {
  id: ID!
  name: String!
  posts: [Post] @connection(name: "BlogPosts")
}

"A post"
type Post @model @auth(rules: [{allow: owner}, {allow: groups, groups: ["Admin"]}]) {
  id: ID!
  title: String!
  status: Status
  blog: Blog @connection(name: "BlogPosts")
}

enum Status {
  DRAFT
  PUBLISHED
}
"#;

    #[test]
    fn test_parse_blog_schema() {
        let schema = parse_schema(BLOG).unwrap();
        assert_eq!(schema.types.len(), 3);
        let names: Vec<_> = schema.object_types().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["Blog", "Post"]);
        assert!(schema.is_enum("Status"));

        let blog = schema.object("Blog").unwrap();
        assert!(blog.has_directive("model"));
        let posts = blog.field("posts").unwrap();
        assert!(posts.field_type.is_list());
        assert_eq!(posts.field_type.named_type(), "Post");
        let conn = posts.directive("connection").unwrap();
        assert_eq!(conn.argument("name").and_then(|v| v.as_str()), Some("BlogPosts"));
    }

    #[test]
    fn test_parse_nested_directive_values() {
        let schema = parse_schema(BLOG).unwrap();
        let post = schema.object("Post").unwrap();
        let auth = post.directive("auth").unwrap();
        let rules = auth.argument("rules").and_then(|v| v.as_list()).unwrap();
        assert_eq!(rules.len(), 2);
        let first = rules[0].as_object().unwrap();
        assert_eq!(first["allow"], DirectiveValue::Enum("owner".into()));
        let groups = rules[1].as_object().unwrap()["groups"].as_list().unwrap();
        assert_eq!(groups, &[DirectiveValue::String("Admin".into())]);
    }

    #[test]
    fn test_type_ref_display() {
        let schema = parse_schema("type A { xs: [String!]! y: Int }").unwrap();
        let a = schema.object("A").unwrap();
        assert_eq!(a.fields[0].field_type.to_string(), "[String!]!");
        assert!(a.fields[0].field_type.is_list());
        assert!(a.fields[0].field_type.is_non_null());
        assert_eq!(a.fields[1].field_type.to_string(), "Int");
        assert!(!a.fields[1].field_type.is_list());
    }

    #[test]
    fn test_unknown_type_reference() {
        let err = parse_schema("type A @model { id: ID! ghost: Ghost }").unwrap_err();
        assert!(err.to_string().contains("unknown type 'Ghost'"));
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_duplicate_type() {
        let err = parse_schema("type A { id: ID }\ntype A { id: ID }").unwrap_err();
        assert!(err.to_string().contains("already declared at line 1"));
        assert!(err.to_string().contains("(line 2)"));
    }

    #[test]
    fn test_duplicate_field() {
        let err = parse_schema("type A { id: ID id: String }").unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn test_reserved_root_type() {
        let err = parse_schema("type Query { hello: String }").unwrap_err();
        assert!(err.to_string().contains("generated"));
    }

    #[test]
    fn test_unsupported_definitions() {
        for src in [
            "input CreateA { id: ID }",
            "interface Node { id: ID! }",
            "scalar Date",
            "union U = A | B",
        ] {
            let err = parse_schema(src).unwrap_err();
            assert!(err.to_string().contains("not supported"), "{}", src);
        }
    }

    #[test]
    fn test_field_arguments_unsupported() {
        let err = parse_schema("type A { items(limit: Int): [String] }").unwrap_err();
        assert!(err.to_string().contains("field arguments"));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse_schema("type A { id ID }").is_err());
        assert!(parse_schema("type A { id: ID ").is_err());
        assert!(parse_schema("type { id: ID }").is_err());
        assert!(parse_schema("type A { id: ID } $").is_err());
        assert!(parse_schema("type A @model(name: \"x) { id: ID }").is_err());
    }

    #[test]
    fn test_empty_enum_and_type() {
        assert!(parse_schema("enum E { }").is_err());
        assert!(parse_schema("type A { }").is_err());
    }

    #[test]
    fn test_empty_schema_is_valid() {
        let schema = parse_schema("# nothing here\n").unwrap();
        assert!(schema.types.is_empty());
    }

    #[test]
    fn test_print_strips_directives() {
        let schema = parse_schema(BLOG).unwrap();
        let printed = print_schema(&schema);
        assert!(!printed.contains('@'));
        assert!(printed.starts_with("type Blog {\n  id: ID!\n"));
        assert!(printed.contains("  posts: [Post]\n"));
        assert!(printed.ends_with("enum Status {\n  DRAFT\n  PUBLISHED\n}"));
    }

    #[test]
    fn test_block_string_description() {
        let src = "\"\"\"\nMulti-line\ndescription\n\"\"\"\ntype A {\n  id: ID\n  bad: Nope\n}";
        let err = parse_schema(src).unwrap_err();
        // Line counting survives the block string
        assert!(err.to_string().contains("(line 7)"), "{}", err);
    }

    #[test]
    fn test_type_nesting_limit() {
        let nested = |depth: usize| {
            format!("type A {{ xs: {}String{} }}", "[".repeat(depth), "]".repeat(depth))
        };
        assert!(parse_schema(&nested(MAX_NESTING)).is_ok());
        let err = parse_schema(&nested(200_000)).unwrap_err();
        assert!(err.to_string().contains("type nesting too deep"), "{}", err);
    }

    #[test]
    fn test_value_nesting_limit() {
        let nested = |depth: usize| {
            format!("type A @model(x: {}1{}) {{ id: ID! }}", "[".repeat(depth), "]".repeat(depth))
        };
        assert!(parse_schema(&nested(MAX_NESTING - 1)).is_ok());
        let err = parse_schema(&nested(200_000)).unwrap_err();
        assert!(err.to_string().contains("value nesting too deep"), "{}", err);
    }
}
