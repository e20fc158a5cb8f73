//! Utility functions and helpers

use std::path::Path;

/// Check if string is empty or whitespace only
pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Get current timestamp as string
pub fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Get file extension
pub fn get_file_extension<P: AsRef<Path>>(path: P) -> Option<String> {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
}

/// Truncate string to specified length
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_blank() {
        assert!(is_blank(""));
        assert!(is_blank("  \t\n"));
        assert!(!is_blank(" a "));
    }

    #[test]
    fn test_get_file_extension() {
        assert_eq!(get_file_extension("flow.YAML"), Some("yaml".to_string()));
        assert_eq!(get_file_extension("/tmp/flow.json"), Some("json".to_string()));
        assert_eq!(get_file_extension("Makefile"), None);
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("hi", 8), "hi");
    }

    #[test]
    fn test_current_timestamp_is_rfc3339() {
        let timestamp = current_timestamp();
        assert!(chrono::DateTime::parse_from_rfc3339(&timestamp).is_ok());
    }
}
