use thiserror::Error;

/// Error types for ScrapeFlow
#[derive(Error, Debug)]
pub enum WorkflowError {
    // Document errors
    #[error("Workflow parsing error: {message}")]
    Parsing { message: String },

    #[error("Unsupported workflow document format: {extension}")]
    UnsupportedFormat { extension: String },

    // Validation errors
    #[error("Workflow validation failed: {message}")]
    Validation { message: String },

    // Compiler usage errors
    #[error("{phase} has {count} top-level scopes; the flat contract supports exactly one")]
    MultipleTopLevelScopes { phase: String, count: usize },

    #[error("{phase}: scope '{scope_id}' has child scopes, which the flat contract cannot represent")]
    NestedScopesUnsupported { phase: String, scope_id: String },

    // Export errors
    #[error("Export error: {message}")]
    Export { message: String },

    #[error("File system error at {path}: {source}")]
    FileSystem {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl WorkflowError {
    /// Create a parsing error
    pub fn parsing(message: impl Into<String>) -> Self {
        Self::Parsing { message: message.into() }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    /// Create an export error
    pub fn export(message: impl Into<String>) -> Self {
        Self::Export { message: message.into() }
    }

    pub fn file_system(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::FileSystem {
            path: path.display().to_string(),
            source,
        }
    }

    /// Whether the error is a programmer-facing misuse of the compiler
    /// rather than a problem with the authored workflow.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::MultipleTopLevelScopes { .. } | Self::NestedScopesUnsupported { .. }
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Parsing { .. } | Self::UnsupportedFormat { .. } => "document",
            Self::Validation { .. } => "validation",
            Self::MultipleTopLevelScopes { .. } | Self::NestedScopesUnsupported { .. } => "compiler",
            Self::Export { .. } | Self::FileSystem { .. } => "export",
        }
    }
}

impl From<serde_json::Error> for WorkflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::parsing(err.to_string())
    }
}

impl From<serde_yaml::Error> for WorkflowError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::parsing(err.to_string())
    }
}

/// Result type alias for ScrapeFlow
pub type WorkflowResult<T> = std::result::Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = WorkflowError::validation("missing selector");
        assert_eq!(error.category(), "validation");
        assert!(!error.is_usage_error());
    }

    #[test]
    fn test_file_system_error_keeps_io_cause() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only volume");
        let error = WorkflowError::file_system(std::path::Path::new("/data/flow.json"), io);

        assert_eq!(error.category(), "export");
        assert!(error.to_string().contains("/data/flow.json"));
        assert!(error.to_string().contains("read-only volume"));
        let cause = error.source().and_then(|s| s.downcast_ref::<std::io::Error>());
        assert_eq!(cause.map(|e| e.kind()), Some(std::io::ErrorKind::PermissionDenied));
    }

    #[test]
    fn test_usage_errors() {
        let error = WorkflowError::MultipleTopLevelScopes {
            phase: "Discovery".to_string(),
            count: 2,
        };
        assert!(error.is_usage_error());
        assert_eq!(error.category(), "compiler");
        assert!(error.to_string().contains("Discovery has 2 top-level scopes"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: WorkflowError = json_error.into();
        assert_eq!(error.category(), "document");
    }
}
