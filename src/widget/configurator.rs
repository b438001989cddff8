//! Session configurator: applies model, voice, persona and tools on mount.

use std::time::Duration;

use crate::chart::session_tools;
use crate::config::AltairConfig;
use crate::error::Result;
use crate::live::LiveSession;
use crate::live::types::{Content, LiveConnectConfig, Modality, SpeechConfig};
use crate::persona;

/// Fixed settings the widget applies to its session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Model identifier.
    pub model: String,
    /// Response modality.
    pub response_modality: Modality,
    /// Prebuilt voice name.
    pub voice: String,
    /// System instruction text (the persona script).
    pub system_instruction: String,
    /// Whether platform web search is enabled alongside `render_altair`.
    pub enable_search: bool,
    /// Delay before tool calls are acknowledged.
    pub ack_delay: Duration,
}

impl SessionSettings {
    /// Build settings from config, assembling the persona instruction.
    ///
    /// # Errors
    ///
    /// Returns a persona error if a configured persona file cannot be read.
    pub fn from_config(config: &AltairConfig) -> Result<Self> {
        Ok(Self {
            model: config.live.model.clone(),
            response_modality: config.live.response_modality,
            voice: config.live.voice.clone(),
            system_instruction: persona::assemble_instruction(&config.persona)?,
            enable_search: config.live.enable_search,
            ack_delay: config.tools.ack_delay(),
        })
    }

    /// The session-wide configuration derived from these settings.
    pub fn connect_config(&self) -> LiveConnectConfig {
        LiveConnectConfig {
            response_modalities: vec![self.response_modality],
            speech_config: Some(SpeechConfig::prebuilt(&self.voice)),
            system_instruction: Some(Content::text(&self.system_instruction)),
            tools: session_tools(self.enable_search),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        let config = AltairConfig::default();
        Self {
            model: config.live.model,
            response_modality: config.live.response_modality,
            voice: config.live.voice,
            system_instruction: persona::DEFAULT_PERSONA.trim().to_owned(),
            enable_search: config.live.enable_search,
            ack_delay: config.tools.ack_delay(),
        }
    }
}

/// Select the model and set the session-wide configuration.
pub fn configure_session(session: &dyn LiveSession, settings: &SessionSettings) {
    session.set_model(&settings.model);
    session.set_config(settings.connect_config());
    tracing::info!(
        model = %settings.model,
        voice = %settings.voice,
        search = settings.enable_search,
        "live session configured"
    );
}
