pub mod groq;

use async_trait::async_trait;
use futures::{ Stream, StreamExt, Future };
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::{ CompletionParams, LlmConfig };
use crate::models::chat::Message;
use self::groq::GroqChatClient;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API returned {status}: {body}")]
    Api {
        status: u16,
        body: String,
    },
    #[error("stream error: {0}")]
    Stream(String),
    #[error("malformed stream chunk: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Lazily produced text fragments of one completion.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send>>;

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Starts a streaming completion. Errors that happen before the first
    /// fragment (connection, auth, bad status) are returned here; later
    /// failures arrive as an `Err` item and end the stream.
    async fn stream_chat(
        &self,
        messages: &[Message],
        params: &CompletionParams
    ) -> Result<FragmentStream, ChatError>;

    fn get_model(&self) -> String;

    fn get_base_url(&self) -> Option<String>;
}

/// Consumes every fragment in order and returns their concatenation.
pub async fn drain_stream(mut stream: FragmentStream) -> Result<String, ChatError> {
    let mut buffer = ReplyBuffer::default();
    while let Some(fragment) = stream.next().await {
        buffer.push(&fragment?);
    }
    Ok(buffer.finish())
}

/// Accumulates fragments for callers that render them as they arrive.
#[derive(Debug, Default)]
pub struct ReplyBuffer {
    text: String,
    fragments: usize,
}

impl ReplyBuffer {
    pub fn push(&mut self, fragment: &str) {
        self.text.push_str(fragment);
        self.fragments += 1;
    }

    pub fn fragments(&self) -> usize {
        self.fragments
    }

    pub fn finish(self) -> String {
        self.text
    }
}

pub fn create_streaming_response<F, Fut>(response_fn: F) -> FragmentStream
where
    F: FnOnce(mpsc::Sender<Result<String, ChatError>>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        response_fn(tx).await;
    });

    Box::pin(ReceiverStream::new(rx))
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, ChatError> {
    let client = GroqChatClient::from_config(config)?;
    Ok(Arc::new(client))
}
