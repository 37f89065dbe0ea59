//! CLI subcommands: init, compile, validate, classify.

use crate::core::classifier::{find_by_tag, summarize};
use crate::core::config::{Settings, TransformConfig};
use crate::core::engine::transform;
use crate::core::persistence::read_json;
use crate::core::registry::TransformerRegistry;
use crate::core::types::ParametersStore;
use crate::error::{Error, Result};
use crate::pipeline::{compile, CompileOptions, CompileReport};
use crate::reconcile::project::{FileProjectMetadata, ProjectStorageProvisioner, SnapshotInventory};
use crate::reconcile::{CapabilityRegistry, TerminalPrompter};
use clap::Subcommand;
use std::path::{Path, PathBuf};

/// Settings file looked up in the project root.
pub const SETTINGS_FILE: &str = "schemaform.yaml";

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a settings file with every default spelled out
    Init {
        /// Project directory (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Compile the API schema into a template and offer table overrides
    Compile {
        /// Resource directory (default: the project's AppSync resource)
        #[arg(long)]
        resource_dir: Option<PathBuf>,

        /// Project root
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Settings file (default: schemaform.yaml in the project root)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Cloud inventory snapshot for deployed-table lookups
        #[arg(long)]
        inventory: Option<PathBuf>,

        /// Skip table reconciliation
        #[arg(long)]
        no_config: bool,
    },

    /// Transform a schema in memory and print a resource summary
    Validate {
        /// Schema file
        #[arg(short, long)]
        schema: PathBuf,

        /// Cognito user pool ID; enables the auth stage
        #[arg(long)]
        auth_pool_id: Option<String>,

        /// Settings file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List the logical IDs of a written template with a resource type
    Classify {
        /// Template file
        #[arg(short, long)]
        template: PathBuf,

        /// Resource type tag, e.g. AWS::DynamoDB::Table
        #[arg(long = "type")]
        resource_type: String,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Compile {
            resource_dir,
            project_dir,
            config,
            inventory,
            no_config,
        } => {
            let options = CompileOptions {
                resource_dir,
                project_dir,
                parameters: None,
                no_config,
            };
            cmd_compile(&options, config.as_deref(), inventory.as_deref())
        }
        Commands::Validate {
            schema,
            auth_pool_id,
            config,
        } => cmd_validate(&schema, auth_pool_id.as_deref(), config.as_deref()),
        Commands::Classify {
            template,
            resource_type,
        } => cmd_classify(&template, &resource_type),
    }
}

/// Explicit settings file, else `schemaform.yaml` in `root` when present.
fn load_settings(explicit: Option<&Path>, root: &Path) -> Result<Settings> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let default = root.join(SETTINGS_FILE);
            if !default.exists() {
                return Ok(Settings::default());
            }
            default
        }
    };
    Settings::load(&path).map_err(|message| Error::Settings { path, message })
}

fn cmd_init(path: &Path) -> Result<()> {
    let settings_path = path.join(SETTINGS_FILE);
    if settings_path.exists() {
        return Err(Error::Usage(format!("{} already exists", settings_path.display())));
    }
    let yaml = serde_yaml_ng::to_string(&Settings::default()).map_err(|e| Error::Settings {
        path: settings_path.clone(),
        message: e.to_string(),
    })?;
    std::fs::create_dir_all(path).map_err(|e| Error::io(path, e))?;
    std::fs::write(&settings_path, yaml).map_err(|e| Error::io(&settings_path, e))?;
    println!("Created {}", settings_path.display());
    Ok(())
}

fn capabilities(settings: &Settings, project_dir: &Path, inventory: Option<&Path>) -> Result<CapabilityRegistry> {
    let meta_path = project_dir.join(&settings.layout.project_meta_file);
    let inventory = match inventory {
        Some(path) => SnapshotInventory::load(path)?,
        None => SnapshotInventory::builtin(),
    };
    let mut registry = CapabilityRegistry::new(
        Box::new(FileProjectMetadata::new(&meta_path)),
        Box::new(inventory),
    );
    if settings.reconcile.storage_plugin {
        registry = registry.with_provisioner(Box::new(ProjectStorageProvisioner::new(
            &meta_path,
            &settings.reconcile.storage_category,
        )));
    }
    Ok(registry)
}

fn cmd_compile(options: &CompileOptions, config: Option<&Path>, inventory: Option<&Path>) -> Result<()> {
    let settings = load_settings(config, &options.project_dir)?;
    let capabilities = capabilities(&settings, &options.project_dir, inventory)?;
    let mut prompter = TerminalPrompter;
    match compile(&settings, options, &capabilities, &mut prompter)? {
        Some(report) => print_report(&report),
        None => println!("No AppSync resource to compile"),
    }
    Ok(())
}

fn print_report(report: &CompileReport) {
    println!(
        "Compiled {} ({} resources)",
        report.resource_dir.display(),
        report.resources
    );
    println!(
        "  Template: {} [{}]{}",
        report.template_path.display(),
        report.digest,
        if report.template_changed { "" } else { " (unchanged)" }
    );
    for o in &report.reconciliation.overrides {
        println!("  {} -> {}", o.logical_id, o.choice.substitution_value());
    }
}

fn cmd_validate(schema: &Path, auth_pool_id: Option<&str>, config: Option<&Path>) -> Result<()> {
    let root = schema.parent().unwrap_or(Path::new("."));
    let settings = load_settings(config, root)?;
    let src = std::fs::read_to_string(schema).map_err(|e| Error::io(schema, e))?;
    let mut transform_config = TransformConfig::resolve(&settings.transform, &ParametersStore::new(), &api_name(root));
    if let Some(id) = auth_pool_id {
        transform_config = transform_config.with_auth(id);
    }
    let registry = TransformerRegistry::standard(&transform_config)?;
    let document = transform(&src, &registry)?;

    println!(
        "OK: {} ({} resources, stages: {})",
        schema.display(),
        document.len(),
        registry.names().join(", ")
    );
    for (resource_type, count) in summarize(&document) {
        println!("  {:<28} {}", resource_type.as_str(), count);
    }
    Ok(())
}

fn api_name(dir: &Path) -> String {
    dir.canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "api".to_string())
}

fn cmd_classify(template: &Path, tag: &str) -> Result<()> {
    let template = read_json(template)?;
    for id in find_by_tag(&template, tag) {
        println!("{}", id);
    }
    Ok(())
}
