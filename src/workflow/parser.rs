use std::path::Path;
use tracing::debug;

use crate::error::{WorkflowError, WorkflowResult};
use crate::logging::LogContext;
use crate::utils::get_file_extension;
use crate::workflow::ScrapingWorkflow;

/// On-disk representation of a workflow document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Pick the format from a file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> WorkflowResult<Self> {
        match get_file_extension(&path).as_deref() {
            Some("json") => Ok(DocumentFormat::Json),
            Some("yaml") | Some("yml") => Ok(DocumentFormat::Yaml),
            other => Err(WorkflowError::UnsupportedFormat {
                extension: other.unwrap_or("").to_string(),
            }),
        }
    }
}

/// Workflow parser for converting between document formats
pub struct WorkflowParser;

impl WorkflowParser {
    /// Parse a workflow from a YAML string
    pub fn parse_yaml(yaml: &str) -> WorkflowResult<ScrapingWorkflow> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse a workflow from a JSON string
    pub fn parse_json(json: &str) -> WorkflowResult<ScrapingWorkflow> {
        Ok(serde_json::from_str(json)?)
    }

    /// Convert a workflow to YAML
    pub fn to_yaml(workflow: &ScrapingWorkflow) -> WorkflowResult<String> {
        Ok(serde_yaml::to_string(workflow)?)
    }

    /// Convert a workflow to JSON
    pub fn to_json(workflow: &ScrapingWorkflow) -> WorkflowResult<String> {
        Ok(serde_json::to_string_pretty(workflow)?)
    }

    pub fn parse(content: &str, format: DocumentFormat) -> WorkflowResult<ScrapingWorkflow> {
        match format {
            DocumentFormat::Json => Self::parse_json(content),
            DocumentFormat::Yaml => Self::parse_yaml(content),
        }
    }

    pub fn render(workflow: &ScrapingWorkflow, format: DocumentFormat) -> WorkflowResult<String> {
        match format {
            DocumentFormat::Json => Self::to_json(workflow),
            DocumentFormat::Yaml => Self::to_yaml(workflow),
        }
    }

    /// Load a workflow document, choosing the format by extension
    pub async fn load_file<P: AsRef<Path>>(path: P) -> WorkflowResult<ScrapingWorkflow> {
        let path = path.as_ref();
        let format = DocumentFormat::from_path(path)?;
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| WorkflowError::file_system(path, source))?;

        let context = LogContext::new("workflow", "load")
            .with_workflow(path.display().to_string())
            .with_string_field("format", format!("{:?}", format))
            .with_number_field("bytes", content.len() as i64);
        crate::log_debug!(context, "Parsing workflow document");
        Self::parse(&content, format)
    }

    /// Save a workflow document, choosing the format by extension
    pub async fn save_file<P: AsRef<Path>>(workflow: &ScrapingWorkflow, path: P) -> WorkflowResult<()> {
        let path = path.as_ref();
        let format = DocumentFormat::from_path(path)?;
        let content = Self::render(workflow, format)?;

        tokio::fs::write(path, content)
            .await
            .map_err(|source| WorkflowError::file_system(path, source))?;

        debug!("Saved workflow document: {}", path.display());
        Ok(())
    }
}
