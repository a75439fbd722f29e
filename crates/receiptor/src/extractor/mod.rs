//! LLM-based field extraction from OCR text.
//!
//! A [`FieldExtractor`] builds a fixed prompt around the raw OCR text,
//! hands it to one of two interchangeable [`ChatBackend`]s (hosted or
//! local, chosen once at construction), and parses the JSON-shaped reply
//! into three optional fields. Callers treat any [`ExtractError`] as
//! "no fields found" — extraction failure is a degraded result, not a
//! pipeline error.

pub mod backend;
pub mod parse;
pub mod prompt;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::config::{Config, LlmMode};

pub use backend::{ChatBackend, CloudBackend, LocalBackend};

/// The extracted field triple. Fields are independently nullable: a model
/// may legitimately find a merchant but no total. The default value is the
/// all-null triple used for every failure path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub merchant: Option<String>,
    pub date: Option<String>,
    pub total: Option<String>,
}

/// Errors from LLM invocation or response parsing.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Cloud mode selected but no API key configured. Raised per call so
    /// jobs still complete (with null fields) under misconfiguration.
    #[error("API key not configured for cloud mode")]
    MissingCredential,

    #[error("LLM request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("LLM reply is not valid JSON: {0}")]
    ResponseParse(String),
}

/// Builds the prompt, invokes the configured backend, and parses the reply.
pub struct FieldExtractor {
    backend: Box<dyn ChatBackend>,
}

impl FieldExtractor {
    pub fn new(backend: Box<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    /// Selects the backend once from configuration.
    pub fn from_config(config: &Config) -> Self {
        let backend: Box<dyn ChatBackend> = match config.llm_mode {
            LlmMode::Cloud => {
                // SecretString is deliberately not Clone; re-wrap the key.
                let api_key = config
                    .openai_api_key
                    .as_ref()
                    .map(|k| SecretString::from(k.expose_secret().to_string()));
                Box::new(CloudBackend::new(api_key))
            }
            LlmMode::Local => Box::new(LocalBackend::new(&config.ollama_base_url)),
        };
        Self::new(backend)
    }

    /// Name of the active backend, for diagnostics.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Runs one extraction over the given OCR text (which may be empty).
    ///
    /// Returns the parsed triple, or the failure reason. Missing keys in a
    /// well-formed reply map to `None`, not an error.
    pub fn extract(&self, ocr_text: &str) -> Result<ExtractedFields, ExtractError> {
        let _span = tracing::info_span!("extractor", backend = self.backend.name()).entered();

        let user_prompt = prompt::build_prompt(ocr_text);
        let content = self.backend.complete(prompt::SYSTEM_PROMPT, &user_prompt)?;

        parse::parse_fields(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Backend returning a canned reply, for exercising the extractor
    /// without a network.
    struct StubBackend {
        reply: Result<String, &'static str>,
    }

    impl ChatBackend for StubBackend {
        fn complete(&self, _system: &str, _user: &str) -> Result<String, ExtractError> {
            match &self.reply {
                Ok(content) => Ok(content.clone()),
                Err(msg) => Err(ExtractError::ResponseParse(msg.to_string())),
            }
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    #[test]
    fn test_extract_well_formed_reply() {
        let extractor = FieldExtractor::new(Box::new(StubBackend {
            reply: Ok(
                r#"{"merchant":"Walmart","date":"01.02.2024","total":"23.45"}"#.to_string(),
            ),
        }));

        let fields = extractor.extract("Walmart\n01.02.2024\nTOTAL 23.45").unwrap();
        assert_eq!(fields.merchant.as_deref(), Some("Walmart"));
        assert_eq!(fields.date.as_deref(), Some("01.02.2024"));
        assert_eq!(fields.total.as_deref(), Some("23.45"));
    }

    #[test]
    fn test_extract_fenced_reply() {
        let extractor = FieldExtractor::new(Box::new(StubBackend {
            reply: Ok("```json\n{\"merchant\":\"Aldi\"}\n```".to_string()),
        }));

        let fields = extractor.extract("Aldi").unwrap();
        assert_eq!(fields.merchant.as_deref(), Some("Aldi"));
        assert!(fields.date.is_none());
        assert!(fields.total.is_none());
    }

    #[test]
    fn test_extract_backend_failure_propagates_reason() {
        let extractor = FieldExtractor::new(Box::new(StubBackend {
            reply: Err("connection refused"),
        }));

        assert!(extractor.extract("anything").is_err());
    }

    #[test]
    fn test_extract_malformed_reply_is_error_not_panic() {
        let extractor = FieldExtractor::new(Box::new(StubBackend {
            reply: Ok("Sorry, I could not find a receipt in this text.".to_string()),
        }));

        assert!(matches!(
            extractor.extract("gibberish"),
            Err(ExtractError::ResponseParse(_))
        ));
    }

    #[test]
    fn test_extract_empty_ocr_text_is_valid_input() {
        let extractor = FieldExtractor::new(Box::new(StubBackend {
            reply: Ok("{}".to_string()),
        }));

        let fields = extractor.extract("").unwrap();
        assert_eq!(fields, ExtractedFields::default());
    }
}
