use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, ScholarError};
use crate::persona::AgentMode;

/// Top-level configuration for the ScholarSync application.
///
/// Loaded from `~/.scholarsync/config.toml` by default. Every section falls
/// back to its defaults when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScholarConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl ScholarConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ScholarConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ScholarError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory holding the SQLite database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Address the HTTP server binds to.
    pub host: String,
    /// HTTP server port.
    pub port: u16,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.scholarsync/data".to_string(),
            log_level: "info".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Language-model service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL of the Gemini REST API.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// API key. When absent, `api_key_env` is consulted.
    pub api_key: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Request timeout in seconds for a single model round trip.
    pub request_timeout_secs: u64,
    /// Enable the model's web-search grounding tool.
    pub search_grounding: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-pro".to_string(),
            api_key: None,
            api_key_env: "GEMINI_API_KEY".to_string(),
            request_timeout_secs: 120,
            search_grounding: true,
        }
    }
}

impl ModelConfig {
    /// The configured API key, or the value of `api_key_env` if unset.
    ///
    /// Blank keys are treated as missing.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// Chat and prompt-building settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Agent mode used when a request does not name one.
    pub default_agent_mode: AgentMode,
    /// Characters of note content included in the project context.
    pub note_preview_chars: usize,
    /// Characters of a citation abstract included in the project context.
    pub abstract_preview_chars: usize,
    /// Maximum notes and citations listed per context section.
    pub max_context_items: usize,
    /// Maximum user message length in characters.
    pub max_message_length: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_agent_mode: AgentMode::Librarian,
            note_preview_chars: 200,
            abstract_preview_chars: 300,
            max_context_items: 50,
            max_message_length: 8000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = ScholarConfig::default();
        assert_eq!(config.general.data_dir, "~/.scholarsync/data");
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.port, 3000);
        assert_eq!(config.model.model, "gemini-2.5-pro");
        assert_eq!(config.model.api_key_env, "GEMINI_API_KEY");
        assert!(config.model.search_grounding);
        assert_eq!(config.chat.default_agent_mode, AgentMode::Librarian);
        assert_eq!(config.chat.note_preview_chars, 200);
        assert_eq!(config.chat.max_context_items, 50);
    }

    #[test]
    fn test_config_load_partial_toml() {
        let content = r#"
[general]
port = 8080

[model]
model = "gemini-2.5-flash"
search_grounding = false

[chat]
default_agent_mode = "scribe"
"#;
        let file = create_temp_config(content);
        let config = ScholarConfig::load(file.path()).unwrap();

        assert_eq!(config.general.port, 8080);
        assert_eq!(config.general.host, "127.0.0.1");
        assert_eq!(config.model.model, "gemini-2.5-flash");
        assert!(!config.model.search_grounding);
        assert_eq!(config.model.request_timeout_secs, 120);
        assert_eq!(config.chat.default_agent_mode, AgentMode::Scribe);
        assert_eq!(config.chat.abstract_preview_chars, 300);
    }

    #[test]
    fn test_config_load_missing_file_is_error() {
        let result = ScholarConfig::load(Path::new("/does/not/exist/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let file = create_temp_config("this is {{ not valid TOML");
        let result = ScholarConfig::load(file.path());
        assert!(matches!(result, Err(ScholarError::Config(_))));
    }

    #[test]
    fn test_config_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = ScholarConfig::load(file.path()).unwrap();
        assert_eq!(config.general.data_dir, "~/.scholarsync/data");
        assert_eq!(config.chat.max_message_length, 8000);
    }

    #[test]
    fn test_config_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("dir").join("config.toml");

        let mut config = ScholarConfig::default();
        config.chat.default_agent_mode = AgentMode::Reviewer;
        config.save(&path).unwrap();

        assert!(path.exists());
        let reloaded = ScholarConfig::load(&path).unwrap();
        assert_eq!(reloaded.chat.default_agent_mode, AgentMode::Reviewer);
        assert_eq!(reloaded.general.log_level, "info");
    }

    #[test]
    fn test_resolve_api_key_prefers_explicit_key() {
        let config = ModelConfig {
            api_key: Some("explicit".to_string()),
            api_key_env: "SCHOLARSYNC_TEST_UNSET_KEY_A".to_string(),
            ..ModelConfig::default()
        };
        assert_eq!(config.resolve_api_key().as_deref(), Some("explicit"));
    }

    #[test]
    fn test_resolve_api_key_blank_is_missing() {
        let config = ModelConfig {
            api_key: Some("   ".to_string()),
            api_key_env: "SCHOLARSYNC_TEST_UNSET_KEY_B".to_string(),
            ..ModelConfig::default()
        };
        assert!(config.resolve_api_key().is_none());
    }
}
