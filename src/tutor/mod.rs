//! AI tutor: exercise feedback, explanatory figures and the course assistant.
//!
//! None of these fail outward. A missing key, a network error or an empty
//! reply all turn into a fixed message (or `None` for figures), so the
//! course stays usable offline.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::config::Config;
use crate::execution::ExecutionResult;
use crate::llm::{ChatMessage, ChatOptions, LlmClient};
use crate::role;

pub mod assistant;
pub mod links;

pub use assistant::ChatAssistant;
pub use links::{parse_segments, Segment};

pub const MISSING_KEY: &str =
    "API key is missing. Unable to provide AI feedback. Set API_KEY (or GEMINI_API_KEY) in your environment or .pycourserc.";
pub const CONNECTION_ERROR: &str =
    "Error connecting to AI tutor. Please check your internet connection or API quota.";
pub const NO_RESPONSE: &str = "No response from AI.";

/// A generated image, kept base64-encoded as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Figure {
    pub mime_type: String,
    pub data: String,
}

impl Figure {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        STANDARD.decode(self.data.trim()).context("figure is not valid base64")
    }

    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            _ => "png",
        }
    }
}

pub struct Tutor {
    client: LlmClient,
    opts: ChatOptions,
}

impl Tutor {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        Ok(Self { client: LlmClient::from_config(cfg)?, opts: ChatOptions::from_config(cfg) })
    }

    pub fn client(&self) -> &LlmClient {
        &self.client
    }

    pub fn options(&self) -> &ChatOptions {
        &self.opts
    }

    /// Grade an exercise attempt from its source and what running it produced.
    pub async fn check_exercise(&self, instruction: &str, code: &str, result: &ExecutionResult) -> String {
        if !self.client.has_api_key() {
            return MISSING_KEY.to_string();
        }
        let prompt = role::grading_prompt(instruction, code, &result.output, result.error.as_deref());
        match self.client.complete(vec![ChatMessage::user(prompt)], self.opts.clone()).await {
            Ok(text) if text.trim().is_empty() => NO_RESPONSE.to_string(),
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "exercise feedback request failed");
                CONNECTION_ERROR.to_string()
            }
        }
    }

    /// Illustration for a visual prompt; `None` when unavailable for any reason.
    pub async fn generate_figure(&self, prompt: &str) -> Option<Figure> {
        if !self.client.has_api_key() {
            return None;
        }
        match self.client.generate_image(prompt).await {
            Ok((mime_type, data)) => Some(Figure { mime_type, data }),
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "figure generation failed");
                None
            }
        }
    }
}
