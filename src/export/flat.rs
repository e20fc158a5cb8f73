use serde::{Deserialize, Serialize};

use super::before::{lower_before_actions, WorkerAction};
use super::{phase_log_context, PaginationRecord};
use crate::error::{WorkflowError, WorkflowResult};
use crate::utils::is_blank;
use crate::workflow::{ExtractType, PhaseConfig, PhaseKind, ScrapingWorkflow, StepKind};

/// Legacy contract: one scope and one repeater per phase, steps projected
/// into a flat field list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatContract {
    pub playwright: bool,
    pub discovery: FlatPhase,
    pub processing: Vec<FlatProcessingPhase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatPhase {
    pub before: Vec<WorkerAction>,
    pub scope: Option<String>,
    pub repeater: Option<String>,
    pub fields: Vec<FlatField>,
    pub pagination: Option<PaginationRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatProcessingPhase {
    pub url_type: String,
    #[serde(flatten)]
    pub phase: FlatPhase,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlatField {
    pub name: String,
    pub selector: String,
    #[serde(rename = "type")]
    pub field_type: ExtractType,
}

impl FlatField {
    fn new(name: impl Into<String>, selector: &str, field_type: ExtractType) -> Self {
        Self {
            name: name.into(),
            selector: selector.to_string(),
            field_type,
        }
    }
}

/// Compile a workflow into the legacy flat contract.
///
/// Fails when a phase has more than one top-level scope or when its scope has
/// children, since neither fits the flat shape.
pub fn compile_flat(workflow: &ScrapingWorkflow) -> WorkflowResult<FlatContract> {
    let discovery = compile_phase(&PhaseKind::Discovery, &workflow.discovery)?;

    let processing = workflow
        .url_types
        .iter()
        .map(|url_type| {
            Ok(FlatProcessingPhase {
                url_type: url_type.name.clone(),
                phase: compile_phase(&PhaseKind::Processing(url_type), &url_type.processing)?,
            })
        })
        .collect::<WorkflowResult<Vec<_>>>()?;

    Ok(FlatContract {
        playwright: workflow.playwright_enabled,
        discovery,
        processing,
    })
}

fn compile_phase(kind: &PhaseKind<'_>, phase: &PhaseConfig) -> WorkflowResult<FlatPhase> {
    let before = lower_before_actions(&phase.before);

    let scope = match phase.chain.as_slice() {
        [] => {
            return Ok(FlatPhase {
                before,
                scope: None,
                repeater: None,
                fields: Vec::new(),
                pagination: None,
            })
        }
        [scope] => scope,
        scopes => {
            return Err(WorkflowError::MultipleTopLevelScopes {
                phase: kind.to_string(),
                count: scopes.len(),
            })
        }
    };

    if !scope.children.is_empty() {
        return Err(WorkflowError::NestedScopesUnsupported {
            phase: kind.to_string(),
            scope_id: scope.id.clone(),
        });
    }

    let fields: Vec<FlatField> = scope
        .repeater
        .as_ref()
        .map(|repeater| {
            repeater
                .steps
                .iter()
                .flat_map(|step| step_fields(&step.kind))
                .collect()
        })
        .unwrap_or_default();

    let context = phase_log_context("compile_flat", kind).with_number_field("fields", fields.len() as i64);
    crate::log_debug!(context, "Phase compiled");

    Ok(FlatPhase {
        before,
        scope: Some(scope.css_selector.clone()),
        repeater: scope.repeater.as_ref().map(|repeater| repeater.css_selector.clone()),
        fields,
        pagination: scope.pagination.as_ref().map(PaginationRecord::from),
    })
}

/// Project one repeater step onto flat fields
pub fn step_fields(step: &StepKind) -> Vec<FlatField> {
    match step {
        StepKind::SourceUrl { selector, .. } => {
            vec![FlatField::new("source_url", selector, ExtractType::Href)]
        }
        StepKind::DocumentUrl { selector } => {
            vec![FlatField::new("document_url", selector, ExtractType::Href)]
        }
        StepKind::DownloadFile {
            url_selector,
            filename_selector,
        } => {
            let mut fields = vec![FlatField::new("file_url", url_selector, ExtractType::Href)];
            if !is_blank(filename_selector) {
                fields.push(FlatField::new("file_name", filename_selector, ExtractType::Text));
            }
            fields
        }
        StepKind::DataExtract {
            key,
            selector,
            extract_type,
        } => vec![FlatField::new(key.clone(), selector, *extract_type)],
    }
}
