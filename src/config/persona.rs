use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::fs;
use std::sync::Arc;
use log::info;

const BUILTIN_PERSONA: &str = include_str!("../../json/persona.json");

#[derive(Debug)]
pub enum PersonaError {
    MissingField(&'static str),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
}

impl fmt::Display for PersonaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersonaError::MissingField(key) => write!(f, "Persona field '{}' is empty", key),
            PersonaError::IoError(e) => write!(f, "Persona file IO error: {}", e),
            PersonaError::JsonError(e) => write!(f, "Persona JSON parsing error: {}", e),
        }
    }
}

impl Error for PersonaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PersonaError::IoError(e) => Some(e),
            PersonaError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PersonaError {
    fn from(err: std::io::Error) -> Self {
        PersonaError::IoError(err)
    }
}

impl From<serde_json::Error> for PersonaError {
    fn from(err: serde_json::Error) -> Self {
        PersonaError::JsonError(err)
    }
}

/// Server-owned knowledge prompt. Loaded once at startup and shared read-only.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PersonaContext {
    pub owner: String,
    pub system_prompt: String,
    pub instruction_preamble: String,
    pub acknowledgement: String,
}

impl PersonaContext {
    fn validate(&self) -> Result<(), PersonaError> {
        if self.system_prompt.trim().is_empty() {
            return Err(PersonaError::MissingField("system_prompt"));
        }
        if self.instruction_preamble.trim().is_empty() {
            return Err(PersonaError::MissingField("instruction_preamble"));
        }
        if self.acknowledgement.trim().is_empty() {
            return Err(PersonaError::MissingField("acknowledgement"));
        }
        Ok(())
    }

    /// Text of the synthetic instruction turn that opens every conversation.
    pub fn instruction(&self) -> String {
        format!("{}\n\n{}", self.instruction_preamble, self.system_prompt)
    }
}

pub fn parse_persona(content: &str) -> Result<PersonaContext, PersonaError> {
    let persona: PersonaContext = serde_json::from_str(content)?;
    persona.validate()?;
    Ok(persona)
}

pub fn builtin_persona() -> Result<Arc<PersonaContext>, PersonaError> {
    parse_persona(BUILTIN_PERSONA).map(Arc::new)
}

pub fn load_persona(path: Option<&str>) -> Result<Arc<PersonaContext>, Box<dyn Error + Send + Sync>> {
    let persona = match path {
        Some(path) => {
            let file_content = fs
                ::read_to_string(path)
                .map_err(|e| format!("Failed to read persona file '{}': {}", path, e))?;
            parse_persona(&file_content).map_err(|e|
                format!("Failed to parse persona file '{}': {}", path, e)
            )?
        }
        None => parse_persona(BUILTIN_PERSONA)?,
    };
    info!(
        "Persona loaded for '{}' ({} chars of context)",
        persona.owner,
        persona.system_prompt.chars().count()
    );
    Ok(Arc::new(persona))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_persona_is_valid() {
        let persona = builtin_persona().unwrap();
        assert_eq!(persona.owner, "Trần Hoàng Huy");
        assert!(persona.system_prompt.contains("QUY TẮC TRẢ LỜI"));
    }

    #[test]
    fn instruction_frames_prompt_after_preamble() {
        let persona = builtin_persona().unwrap();
        let instruction = persona.instruction();
        assert!(instruction.starts_with(
            "Đây là thông tin hệ thống. Bạn PHẢI tuân thủ tuyệt đối các quy tắc và thông tin sau:\n\n"
        ));
        assert!(instruction.ends_with(&persona.system_prompt));
    }

    #[test]
    fn empty_acknowledgement_is_rejected() {
        let raw = r#"{"owner":"x","system_prompt":"p","instruction_preamble":"i","acknowledgement":" "}"#;
        let err = parse_persona(raw).unwrap_err();
        assert!(matches!(err, PersonaError::MissingField("acknowledgement")));
    }

    #[test]
    fn missing_file_is_reported_with_path() {
        let err = load_persona(Some("/nonexistent/persona.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/persona.json"));
    }
}
