use serde::{ Deserialize, Serialize };
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;
use log::info;

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are an expert AI healthcare assistant. Provide accurate, concise, and empathetic responses \
to user queries related to health, wellness, and medical guidance. Always respond in English.";

pub const DEFAULT_GREETING: &str =
    "Hi! I'm your HealthCare Assistant. How can I assist you today? 🩺";

#[derive(Debug)]
pub enum PromptError {
    EmptyField(&'static str),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::EmptyField(key) => write!(f, "Prompt field '{}' must not be empty", key),
            PromptError::IoError(e) => write!(f, "Prompt file IO error: {}", e),
            PromptError::JsonError(e) => write!(f, "Prompt JSON parsing error: {}", e),
        }
    }
}

impl Error for PromptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PromptError::IoError(e) => Some(e),
            PromptError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PromptError {
    fn from(err: std::io::Error) -> Self {
        PromptError::IoError(err)
    }
}

impl From<serde_json::Error> for PromptError {
    fn from(err: serde_json::Error) -> Self {
        PromptError::JsonError(err)
    }
}

/// Fixed texts of the assistant: the instruction prompt sent to the model and
/// the copy shown by the widget.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PromptConfig {
    pub system_prompt: String,
    pub greeting: String,
    pub title: String,
    pub caption: String,
    pub input_placeholder: String,
    pub capabilities: Vec<String>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            greeting: DEFAULT_GREETING.to_string(),
            title: "🩺 HealthCare Assistant".to_string(),
            caption: "🌟 Your AI-Powered Healthcare Companion".to_string(),
            input_placeholder: "Type your health-related question here...".to_string(),
            capabilities: vec![
                "🩹 Symptom Analysis".to_string(),
                "💊 Medication Guidance".to_string(),
                "📋 Health Record Management".to_string(),
                "💡 Wellness Recommendations".to_string()
            ],
        }
    }
}

impl PromptConfig {
    fn validate(&self) -> Result<(), PromptError> {
        if self.system_prompt.trim().is_empty() {
            return Err(PromptError::EmptyField("system_prompt"));
        }
        if self.greeting.trim().is_empty() {
            return Err(PromptError::EmptyField("greeting"));
        }
        Ok(())
    }
}

pub fn load_prompts_from_str(json: &str) -> Result<PromptConfig, PromptError> {
    let config: PromptConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

/// Reads overrides from `path`; fields absent from the file keep their
/// built-in values.
pub fn load_prompts<P: AsRef<Path>>(path: P) -> Result<PromptConfig, PromptError> {
    let file_content = fs::read_to_string(&path)?;
    let config = load_prompts_from_str(&file_content)?;
    info!("Loaded prompts from {}", path.as_ref().display());
    Ok(config)
}

pub fn load_prompts_or_default(path: Option<&str>) -> Result<PromptConfig, PromptError> {
    match path {
        Some(p) if !p.trim().is_empty() => load_prompts(p),
        _ => {
            info!("No prompts file configured, using built-in prompts");
            Ok(PromptConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = load_prompts_from_str(r#"{"greeting":"Hello!"}"#).unwrap();
        assert_eq!(config.greeting, "Hello!");
        assert_eq!(config.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(config.capabilities.len(), 4);
    }

    #[test]
    fn blank_system_prompt_is_rejected() {
        let err = load_prompts_from_str(r#"{"system_prompt":"   "}"#).unwrap_err();
        assert!(matches!(err, PromptError::EmptyField("system_prompt")));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_prompts("/definitely/not/here/prompts.json").unwrap_err();
        assert!(matches!(err, PromptError::IoError(_)));
    }

    #[test]
    fn no_path_uses_defaults() {
        assert_eq!(load_prompts_or_default(None).unwrap(), PromptConfig::default());
        assert_eq!(load_prompts_or_default(Some("")).unwrap(), PromptConfig::default());
    }
}
