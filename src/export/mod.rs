use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

pub mod before;
pub mod envelope;
pub mod flat;
pub mod nested;

pub use before::{lower_before_action, lower_before_actions, WorkerAction};
pub use envelope::{build_envelope, SubmissionEnvelope};
pub use flat::{compile_flat, FlatContract, FlatField};
pub use nested::{compile_nested, NestedContract, WorkerStep};

use crate::config::CompilerConfig;
use crate::error::{WorkflowError, WorkflowResult};
use crate::logging::{LogContext, PerformanceLogger};
use crate::workflow::{Pagination, PhaseKind, ScrapingWorkflow};

/// Shape of the contract handed to the worker fleet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractVersion {
    /// Legacy single-scope contract
    Flat,
    /// Recursive `schema_version: 2` contract
    #[default]
    Nested,
}

impl ContractVersion {
    /// Value of the `schema_version` field, if the contract carries one
    pub fn schema_version(&self) -> Option<u32> {
        match self {
            ContractVersion::Flat => None,
            ContractVersion::Nested => Some(nested::SCHEMA_VERSION),
        }
    }
}

impl std::str::FromStr for ContractVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "flat" | "legacy" | "v1" => Ok(ContractVersion::Flat),
            "nested" | "v2" => Ok(ContractVersion::Nested),
            _ => Err(anyhow::anyhow!("Invalid contract version: {}", s)),
        }
    }
}

impl std::fmt::Display for ContractVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContractVersion::Flat => write!(f, "flat"),
            ContractVersion::Nested => write!(f, "nested"),
        }
    }
}

/// Log context for one compiled phase, tagged with the phase name
pub(crate) fn phase_log_context(operation: &str, kind: &PhaseKind<'_>) -> LogContext {
    LogContext::new("export", operation).with_phase(kind.to_string())
}

/// `{selector, max_pages}` record shared by both contract shapes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationRecord {
    pub selector: String,
    pub max_pages: u32,
}

impl From<&Pagination> for PaginationRecord {
    fn from(pagination: &Pagination) -> Self {
        Self {
            selector: pagination.css_selector.clone(),
            max_pages: pagination.max_pages,
        }
    }
}

/// A compiled worker contract of either shape
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CompiledContract {
    Flat(FlatContract),
    Nested(NestedContract),
}

impl CompiledContract {
    pub fn version(&self) -> ContractVersion {
        match self {
            CompiledContract::Flat(_) => ContractVersion::Flat,
            CompiledContract::Nested(_) => ContractVersion::Nested,
        }
    }

    pub fn to_value(&self) -> WorkflowResult<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| WorkflowError::export(e.to_string()))
    }
}

/// Maps symbolic URL-type references onto the names the worker keys on
pub struct UrlTypeResolver<'a> {
    workflow: &'a ScrapingWorkflow,
}

impl<'a> UrlTypeResolver<'a> {
    pub fn new(workflow: &'a ScrapingWorkflow) -> Self {
        Self { workflow }
    }

    /// Resolve a `url_type_id` to its URL type name.
    ///
    /// Unknown ids are passed through as-is; a missing id means the first
    /// declared URL type, so single-type workflows need not tag every step.
    pub fn resolve(&self, url_type_id: Option<&str>) -> String {
        match url_type_id {
            Some(id) => match self.workflow.url_type(id) {
                Some(url_type) => url_type.name.clone(),
                None => {
                    debug!("URL type '{}' not found, using the raw id", id);
                    id.to_string()
                }
            },
            None => self
                .workflow
                .url_types
                .first()
                .map(|url_type| url_type.name.clone())
                .unwrap_or_default(),
        }
    }
}

/// Compile an already validated workflow into the requested contract.
///
/// Validation is not repeated here; assumptions of the flat contract that do
/// not hold are reported as usage errors.
pub fn compile(workflow: &ScrapingWorkflow, version: ContractVersion) -> WorkflowResult<CompiledContract> {
    let context = LogContext::new("export", "compile")
        .with_string_field("contract", version.to_string())
        .with_number_field("url_types", workflow.url_types.len() as i64);
    let timer = PerformanceLogger::new(context);

    let result = match version {
        ContractVersion::Flat => compile_flat(workflow).map(CompiledContract::Flat),
        ContractVersion::Nested => Ok(CompiledContract::Nested(compile_nested(workflow))),
    };

    match &result {
        Ok(_) => timer.finish("Workflow compiled"),
        Err(e) => timer.finish_with_error("Workflow compilation failed", e),
    }
    result
}

/// Compiler front end for applications: validates, compiles and writes
/// contracts according to the compiler configuration.
pub struct ContractCompiler {
    config: CompilerConfig,
}

impl ContractCompiler {
    pub fn new(config: &CompilerConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Validate, then compile. Returns the contract and validation warnings.
    pub fn compile_validated(
        &self,
        workflow: &ScrapingWorkflow,
        version: Option<ContractVersion>,
    ) -> WorkflowResult<(CompiledContract, Vec<String>)> {
        let warnings = workflow.validate().into_result()?;
        let version = version.unwrap_or(self.config.default_contract);
        let contract = compile(workflow, version)?;
        Ok((contract, warnings))
    }

    /// Render a contract (or an envelope wrapping one) as JSON
    pub fn render<T: Serialize>(&self, payload: &T) -> WorkflowResult<String> {
        let rendered = if self.config.pretty_output {
            serde_json::to_string_pretty(payload)
        } else {
            serde_json::to_string(payload)
        };
        rendered.map_err(|e| WorkflowError::export(e.to_string()))
    }

    /// Write a rendered payload to disk
    pub async fn write<T: Serialize>(&self, payload: &T, output_path: &Path) -> WorkflowResult<u64> {
        let rendered = self.render(payload)?;

        tokio::fs::write(output_path, &rendered)
            .await
            .map_err(|source| WorkflowError::file_system(output_path, source))?;

        info!("Contract written to {} ({} bytes)", output_path.display(), rendered.len());
        Ok(rendered.len() as u64)
    }
}
