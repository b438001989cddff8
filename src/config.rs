//! Configuration types for the chart bridge.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AltairError, Result};
use crate::live::types::Modality;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AltairConfig {
    /// Live session settings.
    pub live: LiveConfig,
    /// Tool-call handling settings.
    pub tools: ToolsConfig,
    /// Chart output settings.
    pub chart: ChartConfig,
    /// Persona (system instruction) settings.
    pub persona: PersonaConfig,
}

/// Live session settings sent during setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    /// Model identifier, including the `models/` prefix.
    pub model: String,
    /// Prebuilt voice used for audio responses.
    pub voice: String,
    /// Response modality requested from the model.
    pub response_modality: Modality,
    /// Whether the platform web search tool is enabled.
    pub enable_search: bool,
    /// WebSocket endpoint for the bidirectional generate-content service.
    pub endpoint: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            model: "models/gemini-2.0-flash-exp".to_owned(),
            voice: "Aoede".to_owned(),
            response_modality: Modality::Audio,
            enable_search: true,
            endpoint: "wss://generativelanguage.googleapis.com/ws/\
                       google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent"
                .to_owned(),
            api_key_env: "GEMINI_API_KEY".to_owned(),
        }
    }
}

/// Tool-call handling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Delay before tool calls are acknowledged back to the session, in ms.
    pub ack_delay_ms: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self { ack_delay_ms: 200 }
    }
}

impl ToolsConfig {
    /// Acknowledgment delay as a [`Duration`].
    pub fn ack_delay(&self) -> Duration {
        Duration::from_millis(self.ack_delay_ms)
    }
}

/// Chart output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// HTML document the chart is rendered into.
    pub output: PathBuf,
    /// DOM id of the mount `<div>` inside the document.
    pub element_id: String,
    /// Document title.
    pub title: String,
    /// Major version of the vega runtime loaded from the CDN.
    pub vega_version: String,
    /// Major version of vega-lite loaded from the CDN.
    pub vega_lite_version: String,
    /// Major version of vega-embed loaded from the CDN.
    pub vega_embed_version: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("altair-chart.html"),
            element_id: "vega-embed".to_owned(),
            title: "Altair".to_owned(),
            vega_version: "5".to_owned(),
            vega_lite_version: "5".to_owned(),
            vega_embed_version: "6".to_owned(),
        }
    }
}

/// Persona settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    /// Markdown file replacing the built-in persona script.
    pub path: Option<PathBuf>,
    /// Extra free-text instructions appended after the persona.
    pub add_on: String,
}

impl AltairConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| AltairError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Serialize to pretty TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| AltairError::Config(e.to_string()))
    }

    /// Returns the default config file path: `<config dir>/altair-live/config.toml`.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("altair-live")
            .join("config.toml")
    }

    /// Read the API key from the environment variable named in `[live]`.
    ///
    /// # Errors
    ///
    /// Returns a config error if the variable is unset or empty.
    pub fn api_key(&self) -> Result<String> {
        match std::env::var(&self.live.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(AltairError::Config(format!(
                "API key not set: export {}",
                self.live.api_key_env
            ))),
        }
    }
}
