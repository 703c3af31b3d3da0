//! Reqwest-based client for an OpenAI-compatible endpoint (Gemini by default):
//! streamed chat completions plus image generation.

use std::{pin::Pin, time::Duration};

use anyhow::{anyhow, Context, Result};
use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt as _;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl ChatOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            model: cfg.get("DEFAULT_MODEL").unwrap_or_else(|| "gemini-2.5-flash".into()),
            temperature: 0.7,
            top_p: 1.0,
            max_tokens: 1024,
        }
    }
}

#[derive(Debug)]
pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    image_model: String,
}

impl LlmClient {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let timeout = cfg.get_u64("REQUEST_TIMEOUT").unwrap_or(60);
        let base_url = cfg
            .get("API_BASE_URL")
            .filter(|v| !v.trim().is_empty() && v != "default")
            .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta/openai".into())
            .trim_end_matches('/')
            .to_string();
        let image_model = cfg.get("IMAGE_MODEL").unwrap_or_else(|| "imagen-3.0-generate-002".into());

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()?;

        Ok(Self { http, base_url, api_key: cfg.api_key(), image_model })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn headers(&self, accept: &'static str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static(accept));
        if let Some(key) = &self.api_key {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", key))?);
        }
        Ok(headers)
    }

    pub fn chat_stream(
        &self,
        messages: Vec<ChatMessage>,
        opts: ChatOptions,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>> {
        let http = self.http.clone();
        let url = format!("{}/chat/completions", self.base_url);
        let headers = self.headers("text/event-stream");

        Box::pin(try_stream! {
            let headers = headers?;
            let body = serde_json::json!({
                "model": opts.model,
                "temperature": opts.temperature,
                "top_p": opts.top_p,
                "messages": messages,
                "stream": true,
                "max_tokens": opts.max_tokens
            });

            let resp = http
                .post(url)
                .headers(headers)
                .json(&body)
                .send()
                .await
                .context("failed to send chat request")?;

            if !resp.status().is_success() {
                let status = resp.status();
                Err(anyhow!("LLM error: {}", status))?;
            }

            let mut lines = LineBuffer::default();
            let mut stream = resp.bytes_stream();

            while let Some(chunk) = stream.next().await {
                let bytes = chunk.context("stream error")?;
                for line in lines.push(&bytes) {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with(':') { continue; }
                    let Some(payload) = line.strip_prefix("data:") else { continue };
                    let payload = payload.trim();
                    if payload == "[DONE]" { yield StreamEvent::Done; return; }
                    // malformed lines are skipped
                    if let Ok(chunk) = serde_json::from_str::<Chunk>(payload) {
                        for choice in chunk.choices {
                            if let Some(content) = choice.delta.and_then(|d| d.content) {
                                if !content.is_empty() {
                                    yield StreamEvent::Content(content);
                                }
                            }
                        }
                    }
                }
            }
            yield StreamEvent::Done;
        })
    }

    /// Collect a streamed completion into one string.
    pub async fn complete(&self, messages: Vec<ChatMessage>, opts: ChatOptions) -> Result<String> {
        let mut stream = self.chat_stream(messages, opts);
        let mut text = String::new();
        while let Some(event) = stream.next().await {
            match event? {
                StreamEvent::Content(piece) => text.push_str(&piece),
                StreamEvent::Done => break,
            }
        }
        Ok(text)
    }

    /// Generate one image; returns its MIME type and base64 payload.
    pub async fn generate_image(&self, prompt: &str) -> Result<(String, String)> {
        let url = format!("{}/images/generations", self.base_url);
        let body = serde_json::json!({
            "model": self.image_model,
            "prompt": prompt,
            "n": 1,
            "response_format": "b64_json"
        });
        let resp = self
            .http
            .post(url)
            .headers(self.headers("application/json")?)
            .json(&body)
            .send()
            .await
            .context("failed to send image request")?;
        if !resp.status().is_success() {
            return Err(anyhow!("image generation error: {}", resp.status()));
        }
        let images: ImageResponse = resp.json().await.context("invalid image response")?;
        images
            .data
            .into_iter()
            .find_map(|img| img.b64_json)
            .map(|data| ("image/png".to_string(), data))
            .ok_or_else(|| anyhow!("no image in response"))
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum StreamEvent {
    Content(String),
    Done,
}

// Minimal chunk structures for OpenAI-like streaming
#[derive(Debug, Deserialize)]
struct Chunk {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    delta: Option<Delta>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    b64_json: Option<String>,
}

/// Splits a byte stream into lines, decoding each line only once it is complete
/// so multi-byte characters split across chunks survive.
#[derive(Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line[..pos]).into_owned());
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_characters_are_reassembled() {
        let text = "data: Wände\n".as_bytes();
        // cut inside the two-byte 'ä'
        let cut = text.iter().position(|&b| b == 0xC3).expect("umlaut") + 1;
        let mut lines = LineBuffer::default();
        assert!(lines.push(&text[..cut]).is_empty());
        assert_eq!(lines.push(&text[cut..]), vec!["data: Wände".to_string()]);
    }

    #[test]
    fn several_lines_in_one_chunk() {
        let mut lines = LineBuffer::default();
        assert_eq!(lines.push(b"a\nb\nc"), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(lines.push(b"\n"), vec!["c".to_string()]);
    }
}
