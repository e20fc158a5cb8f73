use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::WorkflowResult;
use crate::export::{CompiledContract, ContractVersion};

pub mod generator;
pub mod ids;
pub mod parser;
pub mod tree;
pub mod validator;

pub use ids::{IdGenerator, IdStrategy, RandomIds, SequentialIds};
pub use validator::{ValidationReport, WorkflowValidator};

/// A complete scraping workflow as authored in the editor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapingWorkflow {
    pub discovery: PhaseConfig,
    #[serde(default)]
    pub url_types: Vec<UrlType>,
    #[serde(default)]
    pub playwright_enabled: bool,
}

/// Named classification for discovered URLs, selecting the processing phase
/// that handles them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UrlType {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub processing: PhaseConfig,
}

/// Actions to run on phase entry plus the forest of extraction scopes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseConfig {
    #[serde(default)]
    pub before: Vec<BeforeAction>,
    #[serde(default)]
    pub chain: Vec<ScopeModule>,
}

/// A CSS-selected element establishing the context for nested extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeModule {
    pub id: String,
    #[serde(default)]
    pub css_selector: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub pagination: Option<Pagination>,
    #[serde(default)]
    pub repeater: Option<Repeater>,
    #[serde(default)]
    pub children: Vec<ScopeModule>,
}

/// Per-item iteration unit within a scope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Repeater {
    pub id: String,
    #[serde(default)]
    pub css_selector: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub steps: Vec<RepeaterStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub css_selector: String,
    pub max_pages: u32,
}

/// One step executed for every repeated item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeaterStep {
    pub id: String,
    #[serde(flatten)]
    pub kind: StepKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    /// Discovers a page to crawl and tags it with a URL type
    SourceUrl {
        #[serde(default)]
        selector: String,
        #[serde(default = "ExtractType::href")]
        extract_type: ExtractType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url_type_id: Option<String>,
    },
    /// Records a URL as an ingestible document
    DocumentUrl {
        #[serde(default)]
        selector: String,
    },
    /// Captures a downloadable asset and its display name
    DownloadFile {
        #[serde(default)]
        url_selector: String,
        #[serde(default)]
        filename_selector: String,
    },
    /// Extracts a named scalar field
    DataExtract {
        #[serde(default)]
        key: String,
        #[serde(default)]
        selector: String,
        extract_type: ExtractType,
    },
}

impl StepKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            StepKind::SourceUrl { .. } => "source_url",
            StepKind::DocumentUrl { .. } => "document_url",
            StepKind::DownloadFile { .. } => "download_file",
            StepKind::DataExtract { .. } => "data_extract",
        }
    }

    /// Steps that hand a URL onward: a sub-page to crawl or a document to ingest
    pub fn is_link_step(&self) -> bool {
        matches!(self, StepKind::SourceUrl { .. } | StepKind::DocumentUrl { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractType {
    Text,
    Href,
}

impl ExtractType {
    fn href() -> Self {
        ExtractType::Href
    }
}

impl fmt::Display for ExtractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractType::Text => write!(f, "text"),
            ExtractType::Href => write!(f, "href"),
        }
    }
}

/// Pre-navigation action run once when a phase begins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BeforeAction {
    RemoveElement {
        #[serde(default)]
        css_selector: String,
    },
    WaitTimeout {
        #[serde(default)]
        ms: u64,
    },
    WaitSelector {
        #[serde(default)]
        css_selector: String,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
    WaitNetwork {
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
    Click {
        #[serde(default)]
        css_selector: String,
        #[serde(default)]
        wait_after_ms: u64,
    },
    Scroll {
        #[serde(default = "default_scroll_times")]
        times: u32,
        #[serde(default)]
        wait_after_ms: u64,
    },
    Fill {
        #[serde(default)]
        css_selector: String,
        #[serde(default)]
        value: String,
        #[serde(default)]
        wait_after_ms: u64,
    },
    SelectOption {
        #[serde(default)]
        css_selector: String,
        #[serde(default)]
        value: String,
        #[serde(default)]
        wait_after_ms: u64,
    },
    Evaluate {
        #[serde(default)]
        script: String,
        #[serde(default)]
        wait_after_ms: u64,
    },
    Screenshot {
        #[serde(default)]
        name: String,
        #[serde(default)]
        full_page: bool,
    },
    /// Any action this build does not recognise, kept verbatim so that
    /// saving the workflow writes it back unchanged
    #[serde(untagged)]
    Unknown(serde_json::Value),
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_scroll_times() -> u32 {
    1
}

impl BeforeAction {
    pub fn type_name(&self) -> &'static str {
        match self {
            BeforeAction::RemoveElement { .. } => "remove_element",
            BeforeAction::WaitTimeout { .. } => "wait_timeout",
            BeforeAction::WaitSelector { .. } => "wait_selector",
            BeforeAction::WaitNetwork { .. } => "wait_network",
            BeforeAction::Click { .. } => "click",
            BeforeAction::Scroll { .. } => "scroll",
            BeforeAction::Fill { .. } => "fill",
            BeforeAction::SelectOption { .. } => "select_option",
            BeforeAction::Evaluate { .. } => "evaluate",
            BeforeAction::Screenshot { .. } => "screenshot",
            BeforeAction::Unknown(_) => "unknown",
        }
    }

    /// Whether the action needs a scripted browser engine to run
    pub fn requires_scripted_browser(&self) -> bool {
        match self {
            BeforeAction::RemoveElement { .. } | BeforeAction::WaitTimeout { .. } => false,
            BeforeAction::WaitSelector { .. }
            | BeforeAction::WaitNetwork { .. }
            | BeforeAction::Click { .. }
            | BeforeAction::Scroll { .. }
            | BeforeAction::Fill { .. }
            | BeforeAction::SelectOption { .. }
            | BeforeAction::Evaluate { .. }
            | BeforeAction::Screenshot { .. } => true,
            // Lowered to a plain wait
            BeforeAction::Unknown(_) => false,
        }
    }

    /// The CSS selector field, for actions that carry one
    pub fn css_selector(&self) -> Option<&str> {
        match self {
            BeforeAction::RemoveElement { css_selector }
            | BeforeAction::WaitSelector { css_selector, .. }
            | BeforeAction::Click { css_selector, .. }
            | BeforeAction::Fill { css_selector, .. }
            | BeforeAction::SelectOption { css_selector, .. } => Some(css_selector.as_str()),
            BeforeAction::WaitTimeout { .. }
            | BeforeAction::WaitNetwork { .. }
            | BeforeAction::Scroll { .. }
            | BeforeAction::Evaluate { .. }
            | BeforeAction::Screenshot { .. }
            | BeforeAction::Unknown(_) => None,
        }
    }
}

/// Which phase of a workflow a `PhaseConfig` belongs to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhaseKind<'a> {
    Discovery,
    Processing(&'a UrlType),
}

impl fmt::Display for PhaseKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseKind::Discovery => write!(f, "Discovery"),
            PhaseKind::Processing(url_type) => write!(f, "Processing ({})", url_type.name),
        }
    }
}

impl PhaseConfig {
    /// All repeater steps in the phase, in pre-order
    pub fn steps(&self) -> Vec<&RepeaterStep> {
        tree::flatten_steps(&self.chain)
    }

    pub fn has_steps(&self) -> bool {
        !self.steps().is_empty()
    }

    pub fn has_source_url_step(&self) -> bool {
        self.steps()
            .iter()
            .any(|step| matches!(step.kind, StepKind::SourceUrl { .. }))
    }
}

impl ScrapingWorkflow {
    /// Discovery followed by every processing phase in declaration order
    pub fn phases(&self) -> Vec<(PhaseKind<'_>, &PhaseConfig)> {
        let mut phases = vec![(PhaseKind::Discovery, &self.discovery)];
        phases.extend(
            self.url_types
                .iter()
                .map(|url_type| (PhaseKind::Processing(url_type), &url_type.processing)),
        );
        phases
    }

    /// Look up a URL type by id
    pub fn url_type(&self, id: &str) -> Option<&UrlType> {
        self.url_types.iter().find(|url_type| url_type.id == id)
    }

    /// Create a workflow from a JSON string
    pub fn from_json(json: &str) -> WorkflowResult<Self> {
        parser::WorkflowParser::parse_json(json)
    }

    /// Convert the workflow to a JSON string
    pub fn to_json(&self) -> WorkflowResult<String> {
        parser::WorkflowParser::to_json(self)
    }

    /// Create a workflow from a YAML string
    pub fn from_yaml(yaml: &str) -> WorkflowResult<Self> {
        parser::WorkflowParser::parse_yaml(yaml)
    }

    /// Convert the workflow to a YAML string
    pub fn to_yaml(&self) -> WorkflowResult<String> {
        parser::WorkflowParser::to_yaml(self)
    }

    /// Validate the workflow
    pub fn validate(&self) -> ValidationReport {
        WorkflowValidator::new().validate(self)
    }

    /// Compile the workflow into a worker contract
    pub fn compile(&self, version: ContractVersion) -> WorkflowResult<CompiledContract> {
        crate::export::compile(self, version)
    }
}
