#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream;
use healthcare_assistant::llm::chat::{ ChatClient, ChatError, FragmentStream };
use healthcare_assistant::llm::CompletionParams;
use healthcare_assistant::models::chat::Message;
use std::collections::VecDeque;
use std::sync::Mutex;

/// What the fake API does for one request.
pub enum Script {
    Reply(Vec<&'static str>),
    RejectRequest,
    BreakAfter(Vec<&'static str>),
}

/// Chat client that plays back canned replies and remembers every request.
pub struct ScriptedClient {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedClient {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for ScriptedClient {
    async fn stream_chat(
        &self,
        messages: &[Message],
        _params: &CompletionParams
    ) -> Result<FragmentStream, ChatError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let script = self.scripts.lock().unwrap().pop_front().expect("no script left");

        match script {
            Script::Reply(parts) => {
                let items: Vec<Result<String, ChatError>> = parts
                    .into_iter()
                    .map(|p| Ok(p.to_string()))
                    .collect();
                Ok(Box::pin(stream::iter(items)))
            }
            Script::RejectRequest =>
                Err(ChatError::Api { status: 401, body: "invalid api key".into() }),
            Script::BreakAfter(parts) => {
                let mut items: Vec<Result<String, ChatError>> = parts
                    .into_iter()
                    .map(|p| Ok(p.to_string()))
                    .collect();
                items.push(Err(ChatError::Stream("connection reset".into())));
                Ok(Box::pin(stream::iter(items)))
            }
        }
    }

    fn get_model(&self) -> String {
        "scripted".to_string()
    }

    fn get_base_url(&self) -> Option<String> {
        None
    }
}

pub const SYSTEM_PROMPT: &str = "You are a careful assistant.";
pub const GREETING: &str = "Hi! How can I help?";
