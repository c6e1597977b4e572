//! Server configuration.
//!
//! The config file carries the advertised server identity, the tool response
//! truncation limit, and a declarative prompt list, so the shipped binary can
//! serve a useful prompt set without any embedding code. Tools always come
//! from code: they need handlers.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{PixelsmithError, Result};
use crate::mcp::prompts::{Prompt, PromptArgument};

/// Default name of the configuration file.
pub const CONFIG_FILENAME: &str = "pixelsmith.json";

/// Configuration for a pixelsmith server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Schema version of the configuration.
    pub version: u32,
    /// Server name advertised in the `initialize` handshake.
    pub server_name: String,
    /// Server version advertised in the `initialize` handshake.
    pub server_version: String,
    /// Maximum character length for a tool response before truncation.
    pub max_response_chars: usize,
    /// Prompts to register at startup.
    pub prompts: Vec<Prompt>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server_name: "pixelsmith".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            max_response_chars: 15_000,
            prompts: default_prompts(),
        }
    }
}

/// The prompt set shipped with the default configuration.
fn default_prompts() -> Vec<Prompt> {
    vec![
        Prompt {
            name: "generate_image_prompt".to_string(),
            title: "Generate image".to_string(),
            description: "Prompt template for generating an image of a subject".to_string(),
            arguments: vec![
                PromptArgument {
                    name: "subject".to_string(),
                    description: "What the image should depict".to_string(),
                    required: true,
                },
                PromptArgument {
                    name: "style".to_string(),
                    description: "Optional art style, e.g. watercolor or pixel art".to_string(),
                    required: false,
                },
            ],
            template: "Generate a {{subject}} rendered in {{style}} style".to_string(),
        },
        Prompt {
            name: "describe_image_prompt".to_string(),
            title: "Describe image".to_string(),
            description: "Prompt template for describing an image file".to_string(),
            arguments: vec![PromptArgument {
                name: "path".to_string(),
                description: "Path of the image to describe".to_string(),
                required: true,
            }],
            template: "Describe the contents of the image at {{path}} in detail".to_string(),
        },
    ]
}

/// Loads the configuration from disk.
///
/// If the file does not exist, returns the default configuration.
pub fn load_config(path: &Path) -> Result<ServerConfig> {
    if !path.exists() {
        return Ok(ServerConfig::default());
    }

    let contents = fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| PixelsmithError::Config {
        message: format!("failed to parse {}: {}", path.display(), e),
    })
}

/// Writes the configuration to disk as pretty-printed JSON.
pub fn save_config(path: &Path, config: &ServerConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_json::to_string_pretty(config)?;
    fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.version, 1);
        assert_eq!(config.server_name, "pixelsmith");
        assert_eq!(config.max_response_chars, 15_000);
        assert!(!config.prompts.is_empty());
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let dir = tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);

        let mut config = ServerConfig::default();
        config.server_name = "pixelsmith-dev".to_string();
        config.prompts.truncate(1);

        save_config(&path, &config).unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_rejects_invalid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, "{not json").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, PixelsmithError::Config { .. }));
    }

    #[test]
    fn test_default_prompts_have_unique_names() {
        let prompts = default_prompts();
        let mut names: Vec<&str> = prompts.iter().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), prompts.len());
    }
}
