use serde::{Deserialize, Serialize};

use super::before::{lower_before_actions, WorkerAction};
use super::{phase_log_context, PaginationRecord, UrlTypeResolver};
use crate::utils::is_blank;
use crate::workflow::{ExtractType, PhaseConfig, PhaseKind, Repeater, ScopeModule, ScrapingWorkflow, StepKind};

/// Schema version stamped on nested contracts
pub const SCHEMA_VERSION: u32 = 2;

/// Filename selector telling the worker to name a file after its own URL
pub const SELF_FILENAME: &str = "self";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedContract {
    pub schema_version: u32,
    pub playwright: bool,
    pub discovery: NestedPhase,
    pub processing: Vec<NestedProcessingPhase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedPhase {
    pub before: Vec<WorkerAction>,
    pub chain: Vec<ScopeRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedProcessingPhase {
    pub url_type: String,
    pub before: Vec<WorkerAction>,
    pub chain: Vec<ScopeRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeRecord {
    pub selector: String,
    pub label: String,
    pub repeater: Option<RepeaterRecord>,
    pub pagination: Option<PaginationRecord>,
    pub children: Vec<ScopeRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeaterRecord {
    pub selector: String,
    pub label: String,
    pub steps: Vec<WorkerStep>,
}

/// Worker-side record for one repeater step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerStep {
    SourceUrl {
        selector: String,
        extract: ExtractType,
        url_type: String,
    },
    DocumentUrl {
        selector: String,
        filename_selector: String,
    },
    DownloadFile {
        url_selector: String,
        filename_selector: String,
    },
    DataExtract {
        key: String,
        extract: ExtractType,
        selector: String,
    },
}

/// Compile a workflow into the nested (`schema_version: 2`) contract
pub fn compile_nested(workflow: &ScrapingWorkflow) -> NestedContract {
    let resolver = UrlTypeResolver::new(workflow);

    NestedContract {
        schema_version: SCHEMA_VERSION,
        playwright: workflow.playwright_enabled,
        discovery: compile_phase(&PhaseKind::Discovery, &workflow.discovery, &resolver),
        processing: workflow
            .url_types
            .iter()
            .map(|url_type| {
                let phase = compile_phase(&PhaseKind::Processing(url_type), &url_type.processing, &resolver);
                NestedProcessingPhase {
                    url_type: url_type.name.clone(),
                    before: phase.before,
                    chain: phase.chain,
                }
            })
            .collect(),
    }
}

fn compile_phase(kind: &PhaseKind<'_>, phase: &PhaseConfig, resolver: &UrlTypeResolver<'_>) -> NestedPhase {
    let compiled = NestedPhase {
        before: lower_before_actions(&phase.before),
        chain: phase.chain.iter().map(|scope| compile_scope(scope, resolver)).collect(),
    };

    let context = phase_log_context("compile_nested", kind)
        .with_number_field("top_level_scopes", compiled.chain.len() as i64);
    crate::log_debug!(context, "Phase compiled");
    compiled
}

fn compile_scope(scope: &ScopeModule, resolver: &UrlTypeResolver<'_>) -> ScopeRecord {
    ScopeRecord {
        selector: scope.css_selector.clone(),
        label: scope.label.clone(),
        repeater: scope
            .repeater
            .as_ref()
            .map(|repeater| compile_repeater(repeater, resolver)),
        pagination: scope.pagination.as_ref().map(PaginationRecord::from),
        children: scope
            .children
            .iter()
            .map(|child| compile_scope(child, resolver))
            .collect(),
    }
}

fn compile_repeater(repeater: &Repeater, resolver: &UrlTypeResolver<'_>) -> RepeaterRecord {
    RepeaterRecord {
        selector: repeater.css_selector.clone(),
        label: repeater.label.clone(),
        steps: repeater
            .steps
            .iter()
            .map(|step| compile_step(&step.kind, resolver))
            .collect(),
    }
}

/// Lower a single repeater step
pub fn compile_step(step: &StepKind, resolver: &UrlTypeResolver<'_>) -> WorkerStep {
    match step {
        StepKind::SourceUrl {
            selector,
            extract_type,
            url_type_id,
        } => WorkerStep::SourceUrl {
            selector: selector.clone(),
            extract: *extract_type,
            url_type: resolver.resolve(url_type_id.as_deref()),
        },
        StepKind::DocumentUrl { selector } => WorkerStep::DocumentUrl {
            selector: selector.clone(),
            filename_selector: SELF_FILENAME.to_string(),
        },
        StepKind::DownloadFile {
            url_selector,
            filename_selector,
        } => WorkerStep::DownloadFile {
            url_selector: url_selector.clone(),
            filename_selector: if is_blank(filename_selector) {
                SELF_FILENAME.to_string()
            } else {
                filename_selector.clone()
            },
        },
        StepKind::DataExtract {
            key,
            selector,
            extract_type,
        } => WorkerStep::DataExtract {
            key: key.clone(),
            extract: *extract_type,
            selector: selector.clone(),
        },
    }
}
