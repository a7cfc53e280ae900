//! OpenRouter API data models
//!
//! Request/response types for chat completions, the request builder callers
//! fill before each send, and the explicit shape checks applied in both
//! directions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, ServiceError};

/// Model used when the caller does not pick one
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Chat message role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message
    System,
    /// User message
    User,
}

/// A chat message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// The role of the message author
    pub role: Role,

    /// The content of the message
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Sampling parameters sent with every request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ModelParameters {
    /// Sampling temperature (0.0-2.0)
    pub temperature: f32,

    /// Top-p sampling (0.0-1.0)
    pub top_p: f32,

    /// Frequency penalty (-2.0-2.0)
    pub frequency_penalty: f32,

    /// Presence penalty (-2.0-2.0)
    pub presence_penalty: f32,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

impl ModelParameters {
    /// Overlay the supplied values, keeping the current ones elsewhere
    pub fn merged(self, update: &ModelParametersUpdate) -> Self {
        Self {
            temperature: update.temperature.unwrap_or(self.temperature),
            top_p: update.top_p.unwrap_or(self.top_p),
            frequency_penalty: update.frequency_penalty.unwrap_or(self.frequency_penalty),
            presence_penalty: update.presence_penalty.unwrap_or(self.presence_penalty),
        }
    }

    fn validate(&self) -> Result<()> {
        check_range("temperature", self.temperature, 0.0, 2.0)?;
        check_range("top_p", self.top_p, 0.0, 1.0)?;
        check_range("frequency_penalty", self.frequency_penalty, -2.0, 2.0)?;
        check_range("presence_penalty", self.presence_penalty, -2.0, 2.0)
    }
}

fn check_range(name: &str, value: f32, min: f32, max: f32) -> Result<()> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ServiceError::validation(format!(
            "{} must be between {} and {}, got {}",
            name, min, max, value
        )))
    }
}

/// Partial sampling parameters for `ChatRequestBuilder::set_model`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModelParametersUpdate {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
}

impl ModelParametersUpdate {
    pub fn temperature(mut self, value: f32) -> Self {
        self.temperature = Some(value);
        self
    }

    pub fn top_p(mut self, value: f32) -> Self {
        self.top_p = Some(value);
        self
    }

    pub fn frequency_penalty(mut self, value: f32) -> Self {
        self.frequency_penalty = Some(value);
        self
    }

    pub fn presence_penalty(mut self, value: f32) -> Self {
        self.presence_penalty = Some(value);
        self
    }
}

/// Structured-output directive
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseFormat {
    /// Always `json_schema`
    #[serde(rename = "type")]
    pub format_type: String,

    /// Caller-provided JSON schema object
    pub json_schema: Value,
}

impl ResponseFormat {
    pub fn json_schema(schema: Map<String, Value>) -> Self {
        Self {
            format_type: "json_schema".to_string(),
            json_schema: Value::Object(schema),
        }
    }
}

/// Chat completion request body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    /// The messages to generate chat completions for
    pub messages: Vec<ChatMessage>,

    /// ID of the model to use
    pub model: String,

    /// Sampling parameters, flattened into the top-level body
    #[serde(flatten)]
    pub parameters: ModelParameters,

    /// Optional structured-output directive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

impl ChatRequest {
    /// Check the request shape before it goes on the wire
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(ServiceError::validation("model must not be empty"));
        }

        if self.messages.is_empty() {
            return Err(ServiceError::validation("messages must not be empty"));
        }

        let mut seen_user = false;
        for (index, message) in self.messages.iter().enumerate() {
            if message.content.trim().is_empty() {
                return Err(ServiceError::validation(format!(
                    "messages[{}].content must not be empty",
                    index
                )));
            }
            match message.role {
                Role::User => seen_user = true,
                Role::System if seen_user => {
                    return Err(ServiceError::validation(format!(
                        "messages[{}]: system message must precede user messages",
                        index
                    )));
                }
                Role::System => {}
            }
        }

        if !seen_user {
            return Err(ServiceError::validation(
                "messages must contain at least one user message",
            ));
        }

        self.parameters.validate()?;

        if let Some(ref format) = self.response_format {
            if format.format_type != "json_schema" {
                return Err(ServiceError::validation(format!(
                    "response_format.type must be json_schema, got {}",
                    format.format_type
                )));
            }
            if !format.json_schema.is_object() {
                return Err(ServiceError::validation(
                    "response_format.json_schema must be an object",
                ));
            }
        }

        Ok(())
    }
}

/// A message in a chat completion response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatResponseMessage {
    /// Content of the message
    pub content: String,
}

/// A chat completion choice
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatChoice {
    /// The generated message
    pub message: ChatResponseMessage,
}

/// Chat completion response, reduced to the fields the client relies on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    /// Choices generated
    pub choices: Vec<ChatChoice>,
}

impl ChatResponse {
    /// Validate a decoded JSON body field by field and extract the choices
    ///
    /// Unknown fields are ignored. An empty `choices` array is a valid shape;
    /// the caller decides what emptiness means.
    pub fn from_value(value: &Value) -> Result<Self> {
        let body = value
            .as_object()
            .ok_or_else(|| ServiceError::validation("response body must be a JSON object"))?;

        let choices = body
            .get("choices")
            .ok_or_else(|| ServiceError::validation("response is missing choices"))?
            .as_array()
            .ok_or_else(|| ServiceError::validation("choices must be an array"))?;

        let choices = choices
            .iter()
            .enumerate()
            .map(|(index, choice)| {
                let content = choice
                    .get("message")
                    .and_then(Value::as_object)
                    .ok_or_else(|| {
                        ServiceError::validation(format!("choices[{}].message is missing", index))
                    })?
                    .get("content")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        ServiceError::validation(format!(
                            "choices[{}].message.content must be a string",
                            index
                        ))
                    })?;
                Ok(ChatChoice {
                    message: ChatResponseMessage {
                        content: content.to_string(),
                    },
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { choices })
    }
}

/// Request description owned by the caller and passed to every send
///
/// Setters validate eagerly and leave the builder untouched on failure, so
/// one builder can be reused as a template across calls.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequestBuilder {
    system_message: Option<String>,
    user_message: Option<String>,
    response_format: Option<Map<String, Value>>,
    model: String,
    parameters: ModelParameters,
}

impl Default for ChatRequestBuilder {
    fn default() -> Self {
        Self {
            system_message: None,
            user_message: None,
            response_format: None,
            model: DEFAULT_MODEL.to_string(),
            parameters: ModelParameters::default(),
        }
    }
}

impl ChatRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the system message that provides context for the model
    pub fn set_system_message(&mut self, message: impl Into<String>) -> Result<()> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ServiceError::InvalidSystemMessage);
        }
        self.system_message = Some(message);
        Ok(())
    }

    /// Set the user message to be processed by the model
    pub fn set_user_message(&mut self, message: impl Into<String>) -> Result<()> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ServiceError::InvalidUserMessage);
        }
        self.user_message = Some(message);
        Ok(())
    }

    /// Set the JSON schema for structured responses
    pub fn set_response_format(&mut self, schema: Value) -> Result<()> {
        match schema {
            Value::Object(map) => {
                self.response_format = Some(map);
                Ok(())
            }
            other => Err(ServiceError::InvalidResponseFormat(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Set the model and merge any supplied sampling parameters
    pub fn set_model(
        &mut self,
        name: impl Into<String>,
        parameters: Option<ModelParametersUpdate>,
    ) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ServiceError::InvalidModelName);
        }
        self.model = name;
        if let Some(update) = parameters {
            self.parameters = self.parameters.merged(&update);
        }
        Ok(())
    }

    pub fn system_message(&self) -> Option<&str> {
        self.system_message.as_deref()
    }

    pub fn user_message(&self) -> Option<&str> {
        self.user_message.as_deref()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn parameters(&self) -> &ModelParameters {
        &self.parameters
    }

    pub fn has_response_format(&self) -> bool {
        self.response_format.is_some()
    }

    /// Assemble the wire request; the system message, if any, comes first
    pub fn build(&self) -> Result<ChatRequest> {
        let user_message = self
            .user_message
            .as_ref()
            .ok_or(ServiceError::MissingUserMessage)?;

        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = self.system_message {
            messages.push(ChatMessage::system(system.clone()));
        }
        messages.push(ChatMessage::user(user_message.clone()));

        Ok(ChatRequest {
            messages,
            model: self.model.clone(),
            parameters: self.parameters,
            response_format: self.response_format.clone().map(ResponseFormat::json_schema),
        })
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
