//! Interactive table reconciliation.
//!
//! After a gate question the reconciler loops through three states:
//! `ChooseTarget` picks a generated table, `ChooseSourceKind` resolves a
//! replacement through one of three branches, `AskContinue` decides whether
//! to go round again. Recoverable branch failures are reported and lead back
//! to `ChooseSourceKind`; only prompt failures end the session with an error.

pub mod capability;
pub mod choice;
pub mod project;
pub mod prompt;

pub use capability::{CapabilityError, CapabilityRegistry, EmptySet, ReconcileError};
pub use choice::{AttributeReference, ReconciliationChoice, ServiceKind, SourceKind, TableOverride};
pub use prompt::{PromptError, Prompter, TerminalPrompter};

use crate::core::config::ReconcileSettings;
use crate::core::types::LogicalId;
use tracing::{info, warn};

const STORAGE_PLUGIN: &str = "Storage plugin";

/// Position in the reconciliation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ChooseTarget,
    ChooseSourceKind { target: usize },
    AskContinue,
}

/// What the operator decided.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// The gate question was answered yes
    pub accepted: bool,
    /// One entry per completed branch, in the order chosen
    pub overrides: Vec<TableOverride>,
}

pub struct Reconciler<'a> {
    settings: &'a ReconcileSettings,
    capabilities: &'a CapabilityRegistry,
}

impl<'a> Reconciler<'a> {
    pub fn new(settings: &'a ReconcileSettings, capabilities: &'a CapabilityRegistry) -> Self {
        Self {
            settings,
            capabilities,
        }
    }

    /// Offer overrides for `tables`. No prompt is issued when `tables` is empty.
    pub fn run(
        &self,
        tables: &[LogicalId],
        prompter: &mut dyn Prompter,
    ) -> Result<ReconcileOutcome, PromptError> {
        let mut outcome = ReconcileOutcome::default();
        if tables.is_empty() {
            return Ok(outcome);
        }

        let service = self.settings.service;
        prompter.info(&format!(
            "We've detected {} {} resources which would be created for you as a part of the AppSync service.",
            tables.len(),
            service
        ));
        if !prompter.confirm("Do you want to use your own tables instead?", false)? {
            return Ok(outcome);
        }
        outcome.accepted = true;

        let targets: Vec<String> = tables.to_vec();
        let kinds: Vec<String> = SourceKind::ALL.iter().map(|k| k.label(service)).collect();
        let mut state = State::ChooseTarget;
        loop {
            state = match state {
                State::ChooseTarget => {
                    let index = prompter.select("Choose a table to configure:", &targets)?;
                    if index < targets.len() {
                        State::ChooseSourceKind { target: index }
                    } else {
                        self.report(prompter, &ReconcileError::InvalidSelection);
                        State::ChooseTarget
                    }
                }
                State::ChooseSourceKind { target } => {
                    let message = format!("Choose a {} data source option", service);
                    let index = prompter.select(&message, &kinds)?;
                    let result = match SourceKind::from_index(index) {
                        Some(kind) => self.resolve(kind, prompter),
                        None => Err(ReconcileError::InvalidSelection),
                    };
                    match result {
                        Ok(choice) => {
                            let logical_id = targets[target].clone();
                            info!(
                                table = %logical_id,
                                kind = %choice.kind(),
                                value = %choice.substitution_value(),
                                "table override chosen"
                            );
                            outcome.overrides.push(TableOverride { logical_id, choice });
                            State::AskContinue
                        }
                        Err(ReconcileError::Prompt(e)) => return Err(e),
                        Err(e) => {
                            self.report(prompter, &e);
                            State::ChooseSourceKind { target }
                        }
                    }
                }
                State::AskContinue => {
                    if prompter.confirm("Do you want to configure more tables?", false)? {
                        State::ChooseTarget
                    } else {
                        break;
                    }
                }
            };
        }
        Ok(outcome)
    }

    fn report(&self, prompter: &mut dyn Prompter, error: &ReconcileError) {
        warn!(error = %error, "reconciliation branch failed");
        prompter.error(&error.to_string());
    }

    fn resolve(
        &self,
        kind: SourceKind,
        prompter: &mut dyn Prompter,
    ) -> Result<ReconciliationChoice, ReconcileError> {
        match kind {
            SourceKind::CurrentProject => self.reuse_existing(prompter),
            SourceKind::NewResource => self.provision_new(prompter),
            SourceKind::CloudResource => self.bind_external(prompter),
        }
    }

    fn reuse_existing(
        &self,
        prompter: &mut dyn Prompter,
    ) -> Result<ReconciliationChoice, ReconcileError> {
        let service = self.settings.service;
        let meta = self
            .capabilities
            .metadata
            .load()
            .map_err(ReconcileError::failed("project metadata"))?;
        let names = meta.resources_of(&self.settings.storage_category, service.as_str());
        if names.is_empty() {
            return Err(EmptySet::ProjectResources { service }.into());
        }
        let message = format!("Choose from one of the already configured {} tables", service);
        let index = prompter.select(&message, &names)?;
        let name = names.get(index).ok_or(ReconcileError::InvalidSelection)?;
        Ok(ReconciliationChoice::ReuseExisting {
            resource_name: name.clone(),
            reference: AttributeReference::storage_arn(&self.settings.storage_category, name),
        })
    }

    fn provision_new(
        &self,
        prompter: &mut dyn Prompter,
    ) -> Result<ReconciliationChoice, ReconcileError> {
        let provisioner = self
            .capabilities
            .provisioner
            .as_ref()
            .ok_or(ReconcileError::CapabilityUnavailable {
                capability: STORAGE_PLUGIN,
            })?;
        let name = provisioner
            .provision(&self.settings.provider, self.settings.service)
            .map_err(ReconcileError::failed("storage provisioning"))?;
        prompter.success(&format!(
            "Successfully added {} table {} locally",
            self.settings.service, name
        ));
        Ok(ReconciliationChoice::ProvisionNew {
            reference: AttributeReference::storage_arn(&self.settings.storage_category, &name),
            resource_name: name,
        })
    }

    fn bind_external(
        &self,
        prompter: &mut dyn Prompter,
    ) -> Result<ReconciliationChoice, ReconcileError> {
        let service = self.settings.service;
        let inventory = &self.capabilities.inventory;
        let regions = inventory
            .regions()
            .map_err(ReconcileError::failed("region listing"))?;
        if regions.is_empty() {
            return Err(EmptySet::Regions.into());
        }
        let index = prompter.select("Please select a region:", &regions)?;
        let region = regions.get(index).ok_or(ReconcileError::InvalidSelection)?;

        let tables = inventory
            .tables(region)
            .map_err(ReconcileError::failed("table listing"))?;
        if tables.is_empty() {
            return Err(EmptySet::RegionTables {
                service,
                region: region.clone(),
            }
            .into());
        }
        let labels: Vec<String> = tables.iter().map(|t| t.label()).collect();
        let message = format!("Please select a {} table:", service);
        let index = prompter.select(&message, &labels)?;
        let table = tables.get(index).ok_or(ReconcileError::InvalidSelection)?;
        Ok(ReconciliationChoice::BindExternal {
            arn: table.arn.clone(),
            region: table.region.clone(),
            table_name: table.name.clone(),
            resource_name: table.resource_name(),
        })
    }
}
