use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::export::ContractVersion;
use crate::logging::LoggingConfig;
use crate::workflow::generator::DEFAULT_MAX_PAGES;
use crate::workflow::IdStrategy;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub compiler: CompilerConfig,
    pub editor: EditorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Contract emitted when the caller does not pick one
    pub default_contract: ContractVersion,
    pub pretty_output: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            default_contract: ContractVersion::Nested,
            pretty_output: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Page limit given to newly created pagination blocks
    pub default_max_pages: u32,
    pub id_strategy: IdStrategy,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_max_pages: DEFAULT_MAX_PAGES,
            id_strategy: IdStrategy::Random,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location, falling back to defaults
    /// when no file exists yet.
    ///
    /// Nothing is logged here: this runs before the subscriber is installed.
    pub async fn load() -> Result<Self> {
        let config_path = get_config_path();

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from specific file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Invalid configuration file {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Write the default configuration to the default location on first run.
    /// Returns the path when a file was created.
    pub async fn write_defaults_if_missing() -> Result<Option<PathBuf>> {
        let config_path = get_config_path();
        let created = Self::write_defaults_to(&config_path).await?;
        Ok(created.then_some(config_path))
    }

    /// Write the default configuration to `config_path` unless a file is already there
    pub async fn write_defaults_to(config_path: &Path) -> Result<bool> {
        if tokio::fs::try_exists(config_path).await? {
            return Ok(false);
        }
        Self::default().save_to(config_path).await?;
        Ok(true)
    }

    pub async fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = toml::to_string_pretty(self)?;
        tokio::fs::write(config_path, content)
            .await
            .with_context(|| format!("Failed to write configuration file {}", config_path.display()))?;

        info!("Configuration saved to: {}", config_path.display());
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.editor.default_max_pages == 0 {
            return Err(anyhow::anyhow!("Editor default_max_pages must be > 0"));
        }

        if self.logging.level.trim().is_empty() {
            return Err(anyhow::anyhow!("Logging level must not be empty"));
        }

        if self.logging.file_enabled && self.logging.max_files == 0 {
            return Err(anyhow::anyhow!("Logging max_files must be > 0 when file logging is enabled"));
        }

        Ok(())
    }
}

/// Get the configuration file path
pub fn get_config_path() -> PathBuf {
    directories::ProjectDirs::from("com", "scrapeflow", "studio")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("scrapeflow.toml"))
}

/// Environment-based configuration overrides
pub struct ConfigOverrides;

impl ConfigOverrides {
    /// Apply `SCRAPEFLOW_*` environment variable overrides to configuration.
    ///
    /// Returns one message per ignored variable, for the caller to log once
    /// logging is up.
    pub fn apply(config: &mut AppConfig) -> Vec<String> {
        Self::apply_from(config, |key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`; unparsable values are ignored
    pub fn apply_from<F>(config: &mut AppConfig, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut ignored = Vec::new();

        if let Some(log_level) = lookup("SCRAPEFLOW_LOG_LEVEL") {
            config.logging.level = log_level;
        }

        if let Some(contract) = lookup("SCRAPEFLOW_CONTRACT") {
            match contract.parse::<ContractVersion>() {
                Ok(version) => config.compiler.default_contract = version,
                Err(e) => ignored.push(format!("Ignoring SCRAPEFLOW_CONTRACT: {}", e)),
            }
        }

        if let Some(pretty) = lookup("SCRAPEFLOW_PRETTY") {
            config.compiler.pretty_output = matches!(pretty.to_lowercase().as_str(), "true" | "1" | "yes");
        }

        if let Some(max_pages) = lookup("SCRAPEFLOW_MAX_PAGES") {
            match max_pages.parse::<u32>() {
                Ok(pages) if pages > 0 => config.editor.default_max_pages = pages,
                _ => ignored.push(format!("Ignoring SCRAPEFLOW_MAX_PAGES: {}", max_pages)),
            }
        }

        if let Some(strategy) = lookup("SCRAPEFLOW_ID_STRATEGY") {
            match strategy.parse::<IdStrategy>() {
                Ok(strategy) => config.editor.id_strategy = strategy,
                Err(e) => ignored.push(format!("Ignoring SCRAPEFLOW_ID_STRATEGY: {}", e)),
            }
        }

        ignored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.compiler.default_contract, ContractVersion::Nested);
        assert_eq!(config.editor.default_max_pages, DEFAULT_MAX_PAGES);
    }

    #[test]
    fn test_zero_max_pages_rejected() {
        let mut config = AppConfig::default();
        config.editor.default_max_pages = 0;
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.compiler.default_contract = ContractVersion::Flat;
        config.editor.id_strategy = IdStrategy::Sequential;
        config.save_to(&path).await.unwrap();

        let loaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(loaded.compiler.default_contract, ContractVersion::Flat);
        assert_eq!(loaded.editor.id_strategy, IdStrategy::Sequential);
    }

    #[tokio::test]
    async fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "[compiler]\npretty_output = false\n\n[logging]\nlevel = \"debug\"\n")
            .await
            .unwrap();

        let loaded = AppConfig::load_from_file(&path).await.unwrap();
        assert!(!loaded.compiler.pretty_output);
        assert_eq!(loaded.compiler.default_contract, ContractVersion::Nested);
        assert_eq!(loaded.logging.level, "debug");
        assert!(loaded.logging.console_enabled);
        assert!(!loaded.logging.file_enabled);
        assert_eq!(loaded.editor.default_max_pages, DEFAULT_MAX_PAGES);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SCRAPEFLOW_LOG_LEVEL", "debug"),
            ("SCRAPEFLOW_CONTRACT", "legacy"),
            ("SCRAPEFLOW_PRETTY", "false"),
            ("SCRAPEFLOW_MAX_PAGES", "12"),
            ("SCRAPEFLOW_ID_STRATEGY", "sequential"),
        ]);

        let mut config = AppConfig::default();
        let ignored = ConfigOverrides::apply_from(&mut config, |key| env.get(key).map(|v| v.to_string()));

        assert!(ignored.is_empty());
        assert_eq!(config.editor.id_strategy, IdStrategy::Sequential);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.compiler.default_contract, ContractVersion::Flat);
        assert!(!config.compiler.pretty_output);
        assert_eq!(config.editor.default_max_pages, 12);
    }

    #[test]
    fn test_invalid_overrides_ignored() {
        let mut config = AppConfig::default();
        let ignored = ConfigOverrides::apply_from(&mut config, |key| match key {
            "SCRAPEFLOW_CONTRACT" => Some("v9".to_string()),
            "SCRAPEFLOW_MAX_PAGES" => Some("0".to_string()),
            "SCRAPEFLOW_ID_STRATEGY" => Some("counter".to_string()),
            _ => None,
        });

        assert_eq!(config.compiler.default_contract, ContractVersion::Nested);
        assert_eq!(config.editor.default_max_pages, DEFAULT_MAX_PAGES);
        assert_eq!(config.editor.id_strategy, IdStrategy::Random);
        assert_eq!(ignored.len(), 3);
        assert!(ignored[0].starts_with("Ignoring SCRAPEFLOW_CONTRACT"));
    }

    #[tokio::test]
    async fn test_defaults_written_only_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("studio").join("config.toml");

        assert!(AppConfig::write_defaults_to(&path).await.unwrap());
        tokio::fs::write(&path, "[editor]\ndefault_max_pages = 9\n").await.unwrap();
        assert!(!AppConfig::write_defaults_to(&path).await.unwrap());

        let loaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(loaded.editor.default_max_pages, 9);
    }

    #[tokio::test]
    async fn test_unwritable_defaults_reported_to_caller() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        tokio::fs::write(&blocker, "").await.unwrap();

        let result = AppConfig::write_defaults_to(&blocker.join("config.toml")).await;
        assert!(result.is_err());
    }
}
