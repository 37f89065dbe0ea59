//! Compile pipeline: locate the resource directory, transform its schema,
//! write the template, offer table overrides, write the parameters.

use crate::core::classifier::find_by_type;
use crate::core::config::{Settings, TransformConfig};
use crate::core::engine::transform;
use crate::core::hasher::{hash_existing, hash_string};
use crate::core::persistence::{load_parameters, save_parameters, write_atomic, write_template};
use crate::core::registry::TransformerRegistry;
use crate::core::types::{LogicalId, ParametersStore, ResourceDocument};
use crate::error::{Error, Result};
use crate::reconcile::{CapabilityRegistry, Prompter, ReconcileOutcome, Reconciler};
use crate::stages::SCHEMA_ID;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

/// Service tag of compilable API resources in project metadata.
const APPSYNC_SERVICE: &str = "AppSync";

/// Per-invocation inputs.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Explicit resource directory; otherwise found through project metadata
    pub resource_dir: Option<PathBuf>,
    /// Project root that layout paths are relative to
    pub project_dir: PathBuf,
    /// Parameters to use instead of the parameters file
    pub parameters: Option<ParametersStore>,
    /// Skip table reconciliation
    pub no_config: bool,
}

impl CompileOptions {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            ..Self::default()
        }
    }
}

/// What a compile run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileReport {
    pub resource_dir: PathBuf,
    pub template_path: PathBuf,
    /// BLAKE3 digest of the written template
    pub digest: String,
    /// False when the template on disk already had this content
    pub template_changed: bool,
    pub resources: usize,
    /// Generated storage tables, in document order
    pub tables: Vec<LogicalId>,
    /// Overrides chosen by the operator; not merged into the parameters
    pub reconciliation: ReconcileOutcome,
}

/// Explicit directory, else the first AppSync resource of the API category.
pub fn resolve_resource_dir(
    settings: &Settings,
    options: &CompileOptions,
    capabilities: &CapabilityRegistry,
) -> Result<Option<PathBuf>> {
    if let Some(dir) = &options.resource_dir {
        return Ok(Some(dir.clone()));
    }
    let layout = &settings.layout;
    let meta = capabilities.metadata.load()?;
    Ok(meta
        .resources_of(&layout.category, APPSYNC_SERVICE)
        .into_iter()
        .next()
        .map(|name| {
            options
                .project_dir
                .join(&layout.backend_dir)
                .join(&layout.category)
                .join(name)
        }))
}

fn schema_definition(document: &ResourceDocument) -> Option<&str> {
    document
        .get(SCHEMA_ID)
        .and_then(|d| d.property("Definition"))
        .and_then(Value::as_str)
}

/// Run the full pipeline. `Ok(None)` means there was nothing to compile.
pub fn compile(
    settings: &Settings,
    options: &CompileOptions,
    capabilities: &CapabilityRegistry,
    prompter: &mut dyn Prompter,
) -> Result<Option<CompileReport>> {
    let Some(resource_dir) = resolve_resource_dir(settings, options, capabilities)? else {
        info!("no {} resource to compile", APPSYNC_SERVICE);
        return Ok(None);
    };
    let layout = &settings.layout;
    let parameters_path = resource_dir.join(&layout.parameters_file);
    let parameters = match &options.parameters {
        Some(p) => p.clone(),
        None => load_parameters(&parameters_path),
    };

    let default_name = dir_name(&resource_dir);
    let config = TransformConfig::resolve(&settings.transform, &parameters, &default_name);
    let registry = TransformerRegistry::standard(&config)?;
    info!(dir = %resource_dir.display(), stages = ?registry.names(), "compiling schema");

    let schema_path = resource_dir.join(&layout.schema_file);
    let schema = std::fs::read_to_string(&schema_path).map_err(|e| Error::io(&schema_path, e))?;
    let document = transform(&schema, &registry)?;

    let template_path = resource_dir.join(&layout.template_file);
    let previous = hash_existing(&template_path)?;
    let text = write_template(&template_path, &document)?;
    let digest = hash_string(&text);
    let template_changed = previous.as_deref() != Some(digest.as_str());
    if let Some(definition) = schema_definition(&document) {
        let build_schema = resource_dir.join(&layout.build_dir).join(&layout.schema_file);
        write_atomic(&build_schema, definition)?;
    }
    info!(
        path = %template_path.display(),
        resources = document.len(),
        digest = %digest,
        changed = template_changed,
        "template written"
    );

    let tables = find_by_type(&document, settings.reconcile.service.resource_type());
    let reconciliation = if options.no_config {
        ReconcileOutcome::default()
    } else {
        Reconciler::new(&settings.reconcile, capabilities).run(&tables, prompter)?
    };
    for o in &reconciliation.overrides {
        info!(table = %o.logical_id, value = %o.choice.substitution_value(), "override not applied to parameters");
    }

    save_parameters(&parameters_path, &parameters)?;

    Ok(Some(CompileReport {
        resource_dir,
        template_path,
        digest,
        template_changed,
        resources: document.len(),
        tables,
        reconciliation,
    }))
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "api".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::persistence::read_template;
    use crate::core::types::ResourceType;
    use crate::reconcile::capability::fakes::{FakeInventory, FakeMetadata};
    use crate::reconcile::project::FileProjectMetadata;
    use crate::reconcile::prompt::scripted::{Answer, ScriptedPrompter};
    use serde_json::json;

    const TWO_MODELS: &str = "type Blog @model {\n  id: ID!\n  name: String!\n}\n\ntype Comment @model {\n  id: ID!\n  content: String\n}\n";

    fn caps() -> CapabilityRegistry {
        CapabilityRegistry::new(
            Box::new(FakeMetadata::storage(&[("notes", "DynamoDB")])),
            Box::new(FakeInventory::default()),
        )
    }

    fn resource_dir(root: &Path, schema: &str, params: Option<&str>) -> PathBuf {
        let dir = root.join("blogapi");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("schema.graphql"), schema).unwrap();
        if let Some(p) = params {
            std::fs::write(dir.join("parameters.json"), p).unwrap();
        }
        dir
    }

    fn options(dir: &Path) -> CompileOptions {
        CompileOptions {
            resource_dir: Some(dir.to_path_buf()),
            ..CompileOptions::new(dir)
        }
    }

    #[test]
    fn test_two_models_declined_override() {
        let root = tempfile::tempdir().unwrap();
        let params = "{\n    \"AppSyncApiName\": \"blogapi\"\n}";
        let dir = resource_dir(root.path(), TWO_MODELS, Some(params));
        let mut prompter = ScriptedPrompter::new([Answer::Confirm(false)]);

        let report = compile(&Settings::default(), &options(&dir), &caps(), &mut prompter)
            .unwrap()
            .unwrap();

        assert_eq!(report.tables, vec!["BlogTable", "CommentTable"]);
        assert!(!report.reconciliation.accepted);
        assert_eq!(prompter.asked.len(), 1);

        let doc = read_template(&dir.join("cloudformation-template.json")).unwrap();
        assert_eq!(find_by_type(&doc, ResourceType::DynamoDbTable), vec!["BlogTable", "CommentTable"]);
        assert!(doc.get("GraphQLApi").unwrap().property("UserPoolConfig").is_none());
        assert_eq!(std::fs::read_to_string(dir.join("parameters.json")).unwrap(), params);
        assert!(dir.join("build/schema.graphql").exists());
    }

    #[test]
    fn test_auth_enabled_by_parameter() {
        let root = tempfile::tempdir().unwrap();
        let dir = resource_dir(
            root.path(),
            "type Note @model @auth(rules: [{allow: owner}]) { id: ID! }",
            Some(r#"{"AuthCognitoUserPoolId": "us-east-1_xyz"}"#),
        );
        let mut prompter = ScriptedPrompter::new([Answer::Confirm(false)]);
        compile(&Settings::default(), &options(&dir), &caps(), &mut prompter).unwrap();
        let doc = read_template(&dir.join("cloudformation-template.json")).unwrap();
        let api = doc.get("GraphQLApi").unwrap();
        assert_eq!(api.property("UserPoolConfig").unwrap()["UserPoolId"], "us-east-1_xyz");
    }

    #[test]
    fn test_blank_auth_parameter_matches_no_auth() {
        let root = tempfile::tempdir().unwrap();
        let with_blank = resource_dir(&root.path().join("a"), TWO_MODELS, Some(r#"{"AuthCognitoUserPoolId": ""}"#));
        let without = resource_dir(&root.path().join("b"), TWO_MODELS, None);
        for dir in [&with_blank, &without] {
            let mut opts = options(dir);
            opts.no_config = true;
            let mut prompter = ScriptedPrompter::new(Vec::new());
            compile(&Settings::default(), &opts, &caps(), &mut prompter).unwrap();
        }
        assert_eq!(
            std::fs::read_to_string(with_blank.join("cloudformation-template.json")).unwrap(),
            std::fs::read_to_string(without.join("cloudformation-template.json")).unwrap()
        );
    }

    #[test]
    fn test_schema_error_writes_nothing() {
        let root = tempfile::tempdir().unwrap();
        let dir = resource_dir(root.path(), "type Blog @searchable { id: ID! }", Some("{}"));
        let mut prompter = ScriptedPrompter::new(Vec::new());
        let err = compile(&Settings::default(), &options(&dir), &caps(), &mut prompter).unwrap_err();
        assert!(matches!(err, Error::Transform(_)));
        assert!(!dir.join("cloudformation-template.json").exists());
        assert!(!dir.join("build").exists());
        assert_eq!(std::fs::read_to_string(dir.join("parameters.json")).unwrap(), "{}");
    }

    #[test]
    fn test_no_config_skips_prompts() {
        let root = tempfile::tempdir().unwrap();
        let dir = resource_dir(root.path(), TWO_MODELS, None);
        let mut opts = options(&dir);
        opts.no_config = true;
        let mut prompter = ScriptedPrompter::new(Vec::new());
        let report = compile(&Settings::default(), &opts, &caps(), &mut prompter).unwrap().unwrap();
        assert_eq!(report.tables.len(), 2);
        assert!(prompter.asked.is_empty());
        assert!(prompter.infos.is_empty());
        // missing parameters are written back as an empty mapping
        assert_eq!(std::fs::read_to_string(dir.join("parameters.json")).unwrap(), "{}");
    }

    #[test]
    fn test_invalid_parameters_fall_back_to_empty() {
        let root = tempfile::tempdir().unwrap();
        let dir = resource_dir(root.path(), TWO_MODELS, Some("{ broken"));
        let mut opts = options(&dir);
        opts.no_config = true;
        let mut prompter = ScriptedPrompter::new(Vec::new());
        assert!(compile(&Settings::default(), &opts, &caps(), &mut prompter).unwrap().is_some());
        assert_eq!(std::fs::read_to_string(dir.join("parameters.json")).unwrap(), "{}");
    }

    #[test]
    fn test_explicit_parameters_win() {
        let root = tempfile::tempdir().unwrap();
        let dir = resource_dir(root.path(), TWO_MODELS, Some(r#"{"a": 1}"#));
        let mut opts = options(&dir);
        opts.no_config = true;
        let mut explicit = ParametersStore::new();
        explicit.insert("b".into(), json!(2));
        opts.parameters = Some(explicit);
        let mut prompter = ScriptedPrompter::new(Vec::new());
        compile(&Settings::default(), &opts, &caps(), &mut prompter).unwrap();
        assert_eq!(
            load_parameters(&dir.join("parameters.json")),
            [("b".to_string(), json!(2))].into_iter().collect::<ParametersStore>()
        );
    }

    #[test]
    fn test_template_changed_tracking() {
        let root = tempfile::tempdir().unwrap();
        let dir = resource_dir(root.path(), TWO_MODELS, None);
        let mut opts = options(&dir);
        opts.no_config = true;
        let settings = Settings::default();
        let mut prompter = ScriptedPrompter::new(Vec::new());
        let first = compile(&settings, &opts, &caps(), &mut prompter).unwrap().unwrap();
        let second = compile(&settings, &opts, &caps(), &mut prompter).unwrap().unwrap();
        assert!(first.template_changed);
        assert!(!second.template_changed);
        assert_eq!(first.digest, second.digest);
    }

    #[test]
    fn test_overrides_reported_not_persisted() {
        let root = tempfile::tempdir().unwrap();
        let dir = resource_dir(root.path(), TWO_MODELS, Some("{}"));
        let answers = [
            Answer::Confirm(true),
            Answer::Select(0),
            Answer::Select(0),
            Answer::Select(0),
            Answer::Confirm(false),
        ];
        let mut prompter = ScriptedPrompter::new(answers);
        let report = compile(&Settings::default(), &options(&dir), &caps(), &mut prompter)
            .unwrap()
            .unwrap();
        assert_eq!(report.reconciliation.overrides.len(), 1);
        assert_eq!(report.reconciliation.overrides[0].logical_id, "BlogTable");
        assert_eq!(std::fs::read_to_string(dir.join("parameters.json")).unwrap(), "{}");
    }

    #[test]
    fn test_resource_dir_from_project_metadata() {
        let root = tempfile::tempdir().unwrap();
        let project = root.path();
        let meta_path = project.join("amplify/backend/amplify-meta.json");
        std::fs::create_dir_all(meta_path.parent().unwrap()).unwrap();
        std::fs::write(
            &meta_path,
            r#"{"api": {"rest": {"service": "API Gateway"}, "blog": {"service": "AppSync"}}}"#,
        )
        .unwrap();
        let dir = project.join("amplify/backend/api/blog");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("schema.graphql"), "type Note @model { id: ID! }").unwrap();

        let caps = CapabilityRegistry::new(
            Box::new(FileProjectMetadata::new(&meta_path)),
            Box::new(FakeInventory::default()),
        );
        let mut opts = CompileOptions::new(project);
        opts.no_config = true;
        let mut prompter = ScriptedPrompter::new(Vec::new());
        let report = compile(&Settings::default(), &opts, &caps, &mut prompter).unwrap().unwrap();
        assert_eq!(report.resource_dir, dir);
        let doc = read_template(&report.template_path).unwrap();
        assert_eq!(doc.get("NoteTable").unwrap().property("TableName").unwrap(), "Note-blog");
    }

    #[test]
    fn test_nothing_to_compile() {
        let root = tempfile::tempdir().unwrap();
        let caps = CapabilityRegistry::new(
            Box::new(FileProjectMetadata::new(root.path().join("missing.json"))),
            Box::new(FakeInventory::default()),
        );
        let mut prompter = ScriptedPrompter::new(Vec::new());
        let report = compile(
            &Settings::default(),
            &CompileOptions::new(root.path()),
            &caps,
            &mut prompter,
        )
        .unwrap();
        assert!(report.is_none());
        assert!(prompter.asked.is_empty());
    }
}
