//! Runtime configuration for the receipt pipeline.
//!
//! All knobs live in an explicit [`Config`] struct that is resolved once at
//! startup (usually via [`Config::from_env`]) and handed to the components
//! that need it. Nothing in the pipeline reads the process environment ad
//! hoc, which keeps the core testable without env mutation.

use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;

/// Which LLM backend the field extractor dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmMode {
    /// Hosted chat-completion API (requires an API key).
    Cloud,
    /// Local inference endpoint (Ollama-compatible).
    #[default]
    Local,
}

impl FromStr for LlmMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cloud" => Ok(LlmMode::Cloud),
            "local" => Ok(LlmMode::Local),
            other => Err(format!("unknown LLM mode '{}'", other)),
        }
    }
}

/// Default base URL for the local inference service.
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Default directory containing uploaded receipt images.
pub const DEFAULT_UPLOADS_DIR: &str = "uploads";

#[derive(Debug)]
pub struct Config {
    /// Extraction backend selector, resolved once at startup.
    pub llm_mode: LlmMode,
    /// API key for the cloud backend. Its absence is only an error when a
    /// cloud extraction is actually attempted.
    pub openai_api_key: Option<SecretString>,
    /// Base URL of the local inference service.
    pub ollama_base_url: String,
    /// Tesseract language codes, joined with `+` for the engine.
    pub ocr_languages: Vec<String>,
    /// Root directory the stored receipt filenames resolve under.
    pub uploads_dir: PathBuf,
    /// Number of worker threads processing receipts.
    pub worker_count: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_mode: LlmMode::default(),
            openai_api_key: None,
            ollama_base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
            ocr_languages: vec!["eng".to_string()],
            uploads_dir: PathBuf::from(DEFAULT_UPLOADS_DIR),
            worker_count: num_cpus::get(),
        }
    }
}

impl Config {
    /// Builds a configuration from process environment variables, falling
    /// back to defaults for anything unset. An unrecognized `LLM_MODE`
    /// falls back to local with a warning rather than failing startup.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(mode) = std::env::var("LLM_MODE") {
            match mode.parse() {
                Ok(m) => config.llm_mode = m,
                Err(e) => log::warn!("{}, using local mode", e),
            }
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                config.openai_api_key = Some(SecretString::from(key));
            }
        }
        if let Ok(url) = std::env::var("OLLAMA_BASE_URL") {
            if !url.is_empty() {
                config.ollama_base_url = url;
            }
        }
        if let Ok(dir) = std::env::var("UPLOADS_DIR") {
            if !dir.is_empty() {
                config.uploads_dir = PathBuf::from(dir);
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm_mode, LlmMode::Local);
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.ollama_base_url, DEFAULT_OLLAMA_BASE_URL);
        assert_eq!(config.ocr_languages, vec!["eng".to_string()]);
        assert_eq!(config.uploads_dir, PathBuf::from("uploads"));
        assert!(config.worker_count > 0);
    }

    #[test]
    fn test_llm_mode_parsing() {
        assert_eq!("cloud".parse::<LlmMode>().unwrap(), LlmMode::Cloud);
        assert_eq!("local".parse::<LlmMode>().unwrap(), LlmMode::Local);
        assert_eq!("CLOUD".parse::<LlmMode>().unwrap(), LlmMode::Cloud);
        assert!("openai".parse::<LlmMode>().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        std::env::set_var("LLM_MODE", "cloud");
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        std::env::set_var("OLLAMA_BASE_URL", "http://llm.internal:11434");
        std::env::set_var("UPLOADS_DIR", "/srv/uploads");

        let config = Config::from_env();
        assert_eq!(config.llm_mode, LlmMode::Cloud);
        assert!(config.openai_api_key.is_some());
        assert_eq!(config.ollama_base_url, "http://llm.internal:11434");
        assert_eq!(config.uploads_dir, PathBuf::from("/srv/uploads"));

        std::env::remove_var("LLM_MODE");
        std::env::remove_var("OPENAI_API_KEY");
        std::env::remove_var("OLLAMA_BASE_URL");
        std::env::remove_var("UPLOADS_DIR");
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_mode_falls_back_to_local() {
        std::env::set_var("LLM_MODE", "mainframe");
        let config = Config::from_env();
        assert_eq!(config.llm_mode, LlmMode::Local);
        std::env::remove_var("LLM_MODE");
    }
}
