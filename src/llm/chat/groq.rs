use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{ Stream, StreamExt };
use log::{ info, trace, warn };
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };
use std::fmt;
use tokio::sync::mpsc;

use super::{ create_streaming_response, ChatClient, ChatError, FragmentStream };
use crate::llm::{ CompletionParams, LlmConfig, DEFAULT_BASE_URL, DEFAULT_MODEL };
use crate::models::chat::Message;

pub struct GroqChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct GroqRequest<'a> {
    messages: &'a [Message],
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

#[derive(Deserialize)]
struct GroqStreamResponse {
    #[serde(default)]
    choices: Vec<GroqStreamChoice>,
    error: Option<GroqApiError>,
}

#[derive(Deserialize)]
struct GroqStreamChoice {
    #[serde(default)]
    delta: GroqDelta,
}

#[derive(Deserialize, Default)]
struct GroqDelta {
    content: Option<String>,
}

#[derive(Deserialize)]
struct GroqApiError {
    message: String,
}

/// Extracts the text of the first choice of one SSE payload. A chunk whose
/// delta carries no content counts as an empty fragment; a chunk with no
/// choices at all yields nothing.
fn parse_chunk(data: &str) -> Result<Option<String>, ChatError> {
    let chunk: GroqStreamResponse = serde_json::from_str(data)?;
    if let Some(err) = chunk.error {
        return Err(ChatError::Stream(err.message));
    }
    Ok(
        chunk.choices
            .into_iter()
            .next()
            .map(|choice| choice.delta.content.unwrap_or_default())
    )
}

/// Reframes a raw SSE body into events and forwards each fragment. An event
/// may span several body chunks. Stops at `[DONE]`, at the end of the body
/// or after sending the first error.
async fn forward_events<S, B, E>(body: S, tx: mpsc::Sender<Result<String, ChatError>>)
where
    S: Stream<Item = Result<B, E>> + Send,
    B: AsRef<[u8]> + Send,
    E: fmt::Display + Send,
{
    let mut events = Box::pin(body.eventsource());

    while let Some(event) = events.next().await {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                let _ = tx.send(Err(ChatError::Stream(e.to_string()))).await;
                return;
            }
        };

        trace!("Groq SSE: {}", event.data);
        if event.data.trim().is_empty() {
            continue;
        }
        if event.data == "[DONE]" {
            return;
        }

        match parse_chunk(&event.data) {
            Ok(Some(fragment)) => {
                if tx.send(Ok(fragment)).await.is_err() {
                    return;
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Failed to handle Groq chunk: {}, error: {}", event.data, e);
                let _ = tx.send(Err(e)).await;
                return;
            }
        }
    }
}

impl GroqChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>
    ) -> Result<Self, ChatError> {
        let model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| ChatError::Config(format!("Invalid API key format: {}", e)))?
        );

        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            model,
            base_url: api_url,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, ChatError> {
        let api_key = config.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ChatError::Config("Groq API key is required".to_string()))?;

        Self::new(api_key, config.completion_model.clone(), config.base_url.clone())
    }
}

#[async_trait]
impl ChatClient for GroqChatClient {
    async fn stream_chat(
        &self,
        messages: &[Message],
        params: &CompletionParams
    ) -> Result<FragmentStream, ChatError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let req = GroqRequest {
            messages,
            model: &params.model,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            top_p: params.top_p,
            stream: true,
            stop: params.stop.as_deref(),
        };

        info!(
            "Starting Groq stream request to {} (model {}, {} messages)",
            url,
            params.model,
            messages.len()
        );

        let resp = self.http.post(&url).json(&req).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("Groq API rejected request with {}: {}", status, body);
            return Err(ChatError::Api { status: status.as_u16(), body });
        }

        Ok(create_streaming_response(move |tx| forward_events(resp.bytes_stream(), tx)))
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}
