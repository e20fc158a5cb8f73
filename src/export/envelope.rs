use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{CompiledContract, ContractVersion};
use crate::error::WorkflowResult;
use crate::utils::current_timestamp;
use crate::workflow::ScrapingWorkflow;

/// Document stored alongside a source record by the persistence service.
///
/// `config` is the compiled contract the worker fleet reads; `workflow` is the
/// authoring model, kept so the editor can reopen the workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionEnvelope {
    pub source_id: String,
    pub workflow_name: String,
    pub contract_version: ContractVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u32>,
    pub compiled_at: String,
    pub config: Value,
    pub workflow: ScrapingWorkflow,
}

/// Wrap a compiled contract with its metadata
pub fn build_envelope(
    source_id: impl Into<String>,
    workflow_name: impl Into<String>,
    workflow: &ScrapingWorkflow,
    contract: &CompiledContract,
) -> WorkflowResult<SubmissionEnvelope> {
    let version = contract.version();
    let envelope = SubmissionEnvelope {
        source_id: source_id.into(),
        workflow_name: workflow_name.into(),
        contract_version: version,
        schema_version: version.schema_version(),
        compiled_at: current_timestamp(),
        config: contract.to_value()?,
        workflow: workflow.clone(),
    };

    debug!(
        "Built submission envelope for source {} ({} contract)",
        envelope.source_id, envelope.contract_version
    );
    Ok(envelope)
}
