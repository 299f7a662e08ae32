//! Mistral chat completion interpreter
//!
//! This module provides an implementation of the Interpreter trait that asks
//! a Mistral chat model to pull the series identity out of a filename.

use super::{Interpreter, InterpreterError, InterpreterResponse, instruction_prompt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_BASE_URL: &str = "https://api.mistral.ai/v1";

const SYSTEM_PROMPT: &str = "You are a TV series filename parser. Extract the series name, \
season number, episode number and episode title from filenames. Respond in JSON format.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    /// Usually a string, but may be a list of content chunks
    content: Value,
}

/// Interpreter backed by the Mistral chat completion API
pub struct MistralInterpreter {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl MistralInterpreter {
    /// Creates a new interpreter using the given API key and model name
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Overrides the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Converts the reply content into a raw interpreter response
    fn convert_content(content: Value) -> Result<InterpreterResponse, InterpreterError> {
        match content {
            Value::String(text) => Ok(InterpreterResponse::Text(text)),
            Value::Object(_) => Ok(InterpreterResponse::Structured(content)),
            Value::Array(chunks) => {
                let text: String = chunks
                    .iter()
                    .filter_map(|chunk| chunk.get("text").and_then(Value::as_str))
                    .collect();
                Ok(InterpreterResponse::Text(text))
            }
            other => Err(InterpreterError::ParseError {
                reason: "Unexpected message content".to_string(),
                response: other.to_string(),
            }),
        }
    }
}

impl Interpreter for MistralInterpreter {
    fn interpret(&self, filename: &str) -> Result<InterpreterResponse, InterpreterError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: instruction_prompt(filename),
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: 0.0,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| InterpreterError::ServiceError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(InterpreterError::ServiceError(format!(
                "HTTP {} {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        let body = response
            .text()
            .map_err(|e| InterpreterError::ServiceError(e.to_string()))?;

        let chat: ChatResponse =
            serde_json::from_str(&body).map_err(|e| InterpreterError::ParseError {
                reason: e.to_string(),
                response: body.clone(),
            })?;

        let choice = chat
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| InterpreterError::ParseError {
                reason: "Response contained no choices".to_string(),
                response: body.clone(),
            })?;

        Self::convert_content(choice.message.content)
    }
}
