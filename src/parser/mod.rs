//! Workflow document parsing and validation.
//!
//! [`parse`] reads a YAML document into the raw [`document`] shapes, then a
//! [`Validator`] checks every rule and builds the typed model in one pass.
//! Errors accumulate; a workflow is only returned when none were found.

pub mod document;
mod validate;

use tracing::trace;

use crate::{
    error::ValidationErrors,
    model::{Contract, Workflow},
};

pub use validate::{IDENT_PATTERN, KEBAB_PATTERN, SECRET_REF_PATTERN, VERSION_PATTERN, Validator, validate_contract};

/// Parse and validate a workflow document.
///
/// Returns every violation found, in check order, or the validated workflow.
pub fn parse(input: &str) -> Result<Workflow, ValidationErrors> {
    let doc: document::WorkflowDocument = serde_yaml::from_str(input).map_err(yaml_error)?;

    let mut validator = Validator::new();
    let workflow = validator.workflow(doc);
    let workflow = validator.finish(workflow)?;

    trace!(
        "parsed workflow {} v{}: {} triggers, {} nodes, {} edges",
        workflow.name,
        workflow.version,
        workflow.triggers.len(),
        workflow.nodes.len(),
        workflow.edges.len()
    );
    Ok(workflow)
}

/// Parse and validate a standalone contract section.
pub fn parse_contract(input: &str) -> Result<Contract, ValidationErrors> {
    let doc: document::ContractDocument = serde_yaml::from_str(input).map_err(yaml_error)?;
    validate_contract(doc)
}

fn yaml_error(err: serde_yaml::Error) -> ValidationErrors {
    ValidationErrors(vec![format!("YAML parse error: {}", err)])
}
