//! Persona script used as the live session's system instruction.
//!
//! The instruction is assembled from two layers:
//!
//! 1. **Persona**: the built-in [`DEFAULT_PERSONA`], or a markdown file named
//!    by `[persona] path` in the config.
//! 2. **User add-on**: optional free text from `[persona] add_on`.
//!
//! The text is opaque to this crate; it is stored and forwarded unchanged.

use std::path::Path;

use crate::config::PersonaConfig;
use crate::error::{AltairError, Result};

/// The chart assistant persona, compiled into the binary from
/// `Personality/altair-assistant.md`.
pub const DEFAULT_PERSONA: &str = include_str!("../Personality/altair-assistant.md");

/// Load the persona text from `path`, or the built-in persona when `None`.
///
/// # Errors
///
/// Returns [`AltairError::Persona`] if an explicitly configured file cannot
/// be read or is empty.
pub fn load_persona(path: Option<&Path>) -> Result<String> {
    let Some(path) = path else {
        return Ok(DEFAULT_PERSONA.to_owned());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| AltairError::Persona(format!("cannot read {}: {e}", path.display())))?;
    if text.trim().is_empty() {
        return Err(AltairError::Persona(format!(
            "persona file is empty: {}",
            path.display()
        )));
    }
    Ok(text)
}

/// Assemble the full system instruction from persona and add-on.
///
/// Empty sections are skipped so the result never contains double blank lines
/// between layers.
///
/// # Errors
///
/// Propagates [`load_persona`] failures.
pub fn assemble_instruction(config: &PersonaConfig) -> Result<String> {
    let persona = load_persona(config.path.as_deref())?;
    let add_on = config.add_on.trim();

    let mut parts: Vec<&str> = Vec::with_capacity(2);
    let persona_trimmed = persona.trim();
    if !persona_trimmed.is_empty() {
        parts.push(persona_trimmed);
    }
    if !add_on.is_empty() {
        parts.push(add_on);
    }
    Ok(parts.join("\n\n"))
}
