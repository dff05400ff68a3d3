use std::collections::VecDeque;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use log::debug;
use reqwest::{Client, Response};

use crate::config::Config;
use crate::error::{AnalysisError, Result};
use crate::llm::sse::SseDecoder;
use crate::llm::types::{GenerateContentRequest, GenerateContentResponse};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Ordered, finite stream of response units from a streaming completion.
pub type UnitStream = BoxStream<'static, Result<GenerateContentResponse>>;

/// The two operations the relay needs from a generative-language provider.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Generates one complete completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Starts a streaming completion. Units arrive in provider order and may
    /// carry no text.
    async fn generate_stream(&self, prompt: &str) -> Result<UnitStream>;
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: Some(api_key.into()),
            base_url: GEMINI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// A missing key is accepted here; requests fail with `MissingApiKey` instead.
    pub fn from_config(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self, method: &str, query: Option<&str>) -> String {
        let url = format!("{}/models/{}:{}", self.base_url, self.model, method);
        match query {
            Some(query) => format!("{}?{}", url, query),
            None => url,
        }
    }

    /// The key travels in a header so it never appears in a URL, and so never
    /// in a `reqwest::Error` message.
    async fn post(&self, url: &str, prompt: &str) -> Result<Response> {
        let api_key = self.api_key.as_deref().ok_or(AnalysisError::MissingApiKey)?;
        let payload = GenerateContentRequest::from_prompt(prompt);
        let res = self
            .client
            .post(url)
            .header(API_KEY_HEADER, api_key)
            .json(&payload)
            .send()
            .await
            .map_err(strip_url)?;
        let status = res.status();

        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(AnalysisError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        Ok(res)
    }
}

fn strip_url(err: reqwest::Error) -> AnalysisError {
    AnalysisError::Http(err.without_url())
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = self.endpoint("generateContent", None);
        debug!("Requesting completion from model {}", self.model);

        let body: GenerateContentResponse = self
            .post(&url, prompt)
            .await?
            .json()
            .await
            .map_err(strip_url)?;
        body.full_text().ok_or(AnalysisError::EmptyResponse)
    }

    async fn generate_stream(&self, prompt: &str) -> Result<UnitStream> {
        let url = self.endpoint("streamGenerateContent", Some("alt=sse"));
        debug!("Opening completion stream from model {}", self.model);

        let res = self.post(&url, prompt).await?;
        let state = StreamState {
            body: res.bytes_stream().map(|chunk| chunk.map(|b| b.to_vec())).boxed(),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            finished: false,
        };

        Ok(stream::try_unfold(state, next_unit).boxed())
    }
}

struct StreamState {
    body: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    finished: bool,
}

async fn next_unit(
    mut state: StreamState,
) -> Result<Option<(GenerateContentResponse, StreamState)>> {
    loop {
        if let Some(data) = state.pending.pop_front() {
            if data == "[DONE]" {
                continue;
            }
            let unit: GenerateContentResponse = serde_json::from_str(&data)?;
            return Ok(Some((unit, state)));
        }

        if state.finished {
            return Ok(None);
        }

        match state.body.next().await {
            Some(chunk) => {
                let chunk = chunk.map_err(strip_url)?;
                state.pending.extend(state.decoder.push(&chunk));
            }
            None => {
                state.pending.extend(state.decoder.finish());
                state.finished = true;
            }
        }
    }
}
