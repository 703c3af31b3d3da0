//! Conversational course assistant with in-memory history.

use anyhow::Result;

use crate::config::Config;
use crate::course::Course;
use crate::llm::{ChatMessage, ChatOptions, LlmClient};
use crate::role;

use super::MISSING_KEY;

pub const TROUBLE_CONNECTING: &str = "I'm having trouble connecting right now. Please try again.";

pub struct ChatAssistant {
    client: LlmClient,
    opts: ChatOptions,
    history: Vec<ChatMessage>,
}

impl ChatAssistant {
    pub fn new(client: LlmClient, opts: ChatOptions, course: &Course) -> Self {
        Self { client, opts, history: vec![ChatMessage::system(role::assistant_instruction(course))] }
    }

    pub fn from_config(cfg: &Config, course: &Course) -> Result<Self> {
        Ok(Self::new(LlmClient::from_config(cfg)?, ChatOptions::from_config(cfg), course))
    }

    /// Conversation so far, system instruction first.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn clear(&mut self) {
        self.history.truncate(1);
    }

    /// Send one user message and return the reply.
    ///
    /// Failed exchanges are dropped from the history so a retry starts clean.
    pub async fn send(&mut self, message: &str) -> String {
        if !self.client.has_api_key() {
            return MISSING_KEY.to_string();
        }
        self.history.push(ChatMessage::user(message));
        match self.client.complete(self.history.clone(), self.opts.clone()).await {
            Ok(reply) if !reply.trim().is_empty() => {
                self.history.push(ChatMessage::assistant(reply.clone()));
                reply
            }
            Ok(_) => {
                self.history.pop();
                TROUBLE_CONNECTING.to_string()
            }
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "assistant request failed");
                self.history.pop();
                TROUBLE_CONNECTING.to_string()
            }
        }
    }
}
