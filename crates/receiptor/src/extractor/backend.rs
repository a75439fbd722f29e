//! The two interchangeable chat-completion backends.
//!
//! Both take the same (system, user) message pair and return the model's
//! raw reply text; everything else — prompt wording, reply parsing — lives
//! in the extractor so the backends stay thin wire adapters.

use std::time::Duration;

use log::{debug, info, warn};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::ExtractError;

/// Fixed model for the hosted backend.
const CLOUD_MODEL: &str = "gpt-3.5-turbo";

/// Fixed model for the local backend.
const LOCAL_MODEL: &str = "llama3.2";

/// Hosted chat-completions endpoint.
const CLOUD_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Generous timeout for local inference, which can take minutes on CPU.
const LOCAL_TIMEOUT: Duration = Duration::from_secs(120);

/// Cap on reply length for the deterministic extraction task.
const CLOUD_MAX_TOKENS: u32 = 256;

/// Maximum reply prefix length echoed into logs.
const LOG_REPLY_PREFIX_CHARS: usize = 200;

/// A chat-completion provider. Implementations must never assume
/// sub-second latency; they run inside blocking worker threads.
pub trait ChatBackend: Send + Sync {
    /// Sends one (system, user) message pair and returns the reply text.
    fn complete(&self, system: &str, user: &str) -> Result<String, ExtractError>;

    /// Short backend name for diagnostics.
    fn name(&self) -> &'static str;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

fn two_messages<'a>(system: &'a str, user: &'a str) -> [ChatMessage<'a>; 2] {
    [
        ChatMessage {
            role: "system",
            content: system,
        },
        ChatMessage {
            role: "user",
            content: user,
        },
    ]
}

fn truncate_for_log(content: &str) -> String {
    if content.chars().count() > LOG_REPLY_PREFIX_CHARS {
        let prefix: String = content.chars().take(LOG_REPLY_PREFIX_CHARS).collect();
        format!("{}... (truncated)", prefix)
    } else {
        content.to_string()
    }
}

/// Hosted chat-completion API backend (deterministic sampling, bounded
/// output). The credential may be absent at construction; each call then
/// fails with [`ExtractError::MissingCredential`] instead of aborting the
/// whole pipeline.
pub struct CloudBackend {
    client: reqwest::blocking::Client,
    api_key: Option<SecretString>,
}

#[derive(Serialize)]
struct CloudChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CloudChatResponse {
    choices: Vec<CloudChoice>,
}

#[derive(Deserialize)]
struct CloudChoice {
    message: CloudChoiceMessage,
}

#[derive(Deserialize)]
struct CloudChoiceMessage {
    #[serde(default)]
    content: String,
}

impl CloudBackend {
    pub fn new(api_key: Option<SecretString>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            api_key,
        }
    }
}

impl ChatBackend for CloudBackend {
    fn complete(&self, system: &str, user: &str) -> Result<String, ExtractError> {
        let api_key = self.api_key.as_ref().ok_or(ExtractError::MissingCredential)?;

        let request = CloudChatRequest {
            model: CLOUD_MODEL,
            messages: two_messages(system, user),
            temperature: 0.0,
            max_tokens: CLOUD_MAX_TOKENS,
        };

        debug!("Sending extraction request to cloud LLM ({})", CLOUD_MODEL);
        let response: CloudChatResponse = self
            .client
            .post(CLOUD_API_URL)
            .bearer_auth(api_key.expose_secret())
            .json(&request)
            .send()?
            .error_for_status()?
            .json()?;

        let content = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_else(|| "{}".to_string());

        Ok(content)
    }

    fn name(&self) -> &'static str {
        "cloud"
    }
}

/// Local HTTP inference backend speaking the Ollama chat protocol:
/// POST `{base_url}/api/chat` with `format: "json"` and `stream: false`.
pub struct LocalBackend {
    client: reqwest::blocking::Client,
    chat_url: String,
}

#[derive(Serialize)]
struct LocalChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    format: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct LocalChatResponse {
    #[serde(default)]
    message: Option<LocalChatMessage>,
}

#[derive(Deserialize)]
struct LocalChatMessage {
    #[serde(default)]
    content: String,
}

impl LocalBackend {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(LOCAL_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!(
                    "Failed to build HTTP client with {}s timeout, using defaults: {}",
                    LOCAL_TIMEOUT.as_secs(),
                    e
                );
                reqwest::blocking::Client::new()
            });

        Self {
            client,
            chat_url: format!("{}/api/chat", base_url.trim_end_matches('/')),
        }
    }
}

impl ChatBackend for LocalBackend {
    fn complete(&self, system: &str, user: &str) -> Result<String, ExtractError> {
        let request = LocalChatRequest {
            model: LOCAL_MODEL,
            messages: two_messages(system, user),
            format: "json",
            stream: false,
        };

        info!("Sending extraction request to local LLM at {}", self.chat_url);
        let response: LocalChatResponse = self
            .client
            .post(&self.chat_url)
            .json(&request)
            .send()?
            .error_for_status()?
            .json()?;

        // Missing content degrades to an empty object, which parses to the
        // null triple downstream.
        let content = response
            .message
            .map(|m| m.content)
            .unwrap_or_else(|| "{}".to_string());

        debug!(
            "Received response from local LLM: {}",
            truncate_for_log(&content)
        );

        Ok(content)
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
