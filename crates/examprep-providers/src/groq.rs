use async_trait::async_trait;
use examprep_core::{Completion, Error, Result, TextGenerator, TokenUsage};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Groq API endpoint URL.
const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
/// Default model for Groq.
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
/// Env var key for Groq API key.
const ENV_GROQ_API_KEY: &str = "GROQ_API_KEY";
/// System message sent ahead of every prompt.
const SYSTEM_PROMPT: &str = "You are a precise assistant for exam preparation. \
                             Follow the requested output format exactly.";

/// Groq API provider.
///
/// One instance holds one HTTP client and key, and is reused for every
/// generation and grading call of a session.
pub struct GroqProvider {
    /// HTTP client for API requests.
    client: Client,
    /// Groq API key.
    api_key: String,
    /// Model name to use.
    model: String,
    /// Sampling temperature.
    temperature: f32,
    /// Completion token limit.
    max_tokens: usize,
}

impl GroqProvider {
    /// Creates a new `GroqProvider` with the given API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the provided API key is empty.
    pub fn with_api_key_direct(api_key: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::MissingApiKey(ENV_GROQ_API_KEY.to_owned()));
        }

        Ok(Self {
            client: Client::default(),
            api_key,
            model: DEFAULT_MODEL.to_owned(),
            temperature: 0.7,
            max_tokens: 8000,
        })
    }

    /// Sets the model to use for generation.
    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Model this provider sends requests to.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Chat request wrapping `prompt` behind the system message.
    fn build_request<'req>(&'req self, prompt: &'req str) -> GroqRequest<'req> {
        GroqRequest {
            model: &self.model,
            messages: vec![
                GroqMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                GroqMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// Request payload sent to the Groq chat completion API.
#[derive(Debug, Serialize)]
struct GroqRequest<'req> {
    /// Model identifier provided by the Groq service.
    model: &'req str,
    /// Messages that form the conversation context for the request.
    messages: Vec<GroqMessage<'req>>,
    /// Sampling temperature controlling response randomness.
    temperature: f32,
    /// Maximum number of tokens allowed in the completion.
    max_tokens: usize,
}

/// Message delivered to the Groq API.
#[derive(Debug, Serialize)]
struct GroqMessage<'req> {
    /// Role of the message author (for example `system` or `user`).
    role: &'static str,
    /// Textual content of the message.
    content: &'req str,
}

/// Response payload returned by Groq.
#[derive(Debug, Deserialize)]
struct GroqResponse {
    /// List of candidate completions.
    choices: Vec<GroqChoice>,
    /// Token accounting information for the request.
    usage: Option<GroqUsage>,
}

/// A single completion choice returned by Groq.
#[derive(Debug, Deserialize)]
struct GroqChoice {
    /// Message generated for the choice.
    message: GroqResponseMessage,
}

/// Response message containing the generated text.
#[derive(Debug, Deserialize)]
struct GroqResponseMessage {
    /// Generated text content.
    content: String,
}

/// Token usage metrics for a Groq response.
#[derive(Debug, Deserialize)]
struct GroqUsage {
    /// Number of tokens in the prompt portion of the request.
    prompt_tokens: u64,
    /// Number of tokens produced in the completion.
    completion_tokens: u64,
}

#[async_trait]
impl TextGenerator for GroqProvider {
    async fn invoke(&self, prompt: &str) -> Result<Completion> {
        let start = Instant::now();
        let request = self.build_request(prompt);

        let response = self
            .client
            .post(GROQ_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|err| Error::Provider(format!("Groq API request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_owned());
            return Err(status_error(status, &error_text));
        }

        let groq_response: GroqResponse = response
            .json()
            .await
            .map_err(|err| Error::InvalidResponse(format!("Failed to parse Groq response: {err}")))?;

        let latency_ms = start.elapsed().as_millis() as u64;

        let text = groq_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::InvalidResponse("No response from Groq".to_owned()))?;

        let tokens_used = groq_response
            .usage
            .map(|usage| TokenUsage {
                input: usage.prompt_tokens,
                output: usage.completion_tokens,
            })
            .unwrap_or_default();

        debug!(
            "Groq/{} answered in {latency_ms}ms ({} tokens)",
            self.model,
            tokens_used.total()
        );

        Ok(Completion {
            text,
            provider: format!("Groq/{}", self.model),
            tokens_used,
            latency_ms,
        })
    }
}

/// Client errors other than rate limiting mean the request itself is wrong
/// (bad key, unknown model) and are not retried.
fn status_error(status: StatusCode, body: &str) -> Error {
    let message = format!("Groq API error {status}: {body}");
    if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
        Error::Config(message)
    } else {
        Error::Provider(message)
    }
}
