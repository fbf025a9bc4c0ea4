//! Turns a session transcript into a completion request and folds the
//! streamed reply back into the transcript.

use crate::llm::chat::{ drain_stream, ChatClient, ChatError, FragmentStream };
use crate::llm::CompletionParams;
use crate::models::chat::{ Message, Role, Turn };
use crate::session::{ Session, Transcript };
use log::{ debug, error, info };
use std::sync::Arc;

/// How much of the transcript is resent with each request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryWindow {
    #[default]
    Unbounded,
    LastTurns(usize),
}

impl HistoryWindow {
    /// `0` means no limit.
    pub fn from_limit(limit: usize) -> Self {
        if limit == 0 { HistoryWindow::Unbounded } else { HistoryWindow::LastTurns(limit) }
    }

    fn apply<'a>(&self, turns: &'a [Turn]) -> &'a [Turn] {
        match *self {
            HistoryWindow::Unbounded => turns,
            HistoryWindow::LastTurns(n) => &turns[turns.len().saturating_sub(n)..],
        }
    }
}

/// Maps the legacy `ai` label onto `assistant`.
pub fn normalize(role: Role) -> Role {
    match role {
        Role::Ai => Role::Assistant,
        other => other,
    }
}

pub fn build_outbound(
    transcript: &Transcript,
    system_prompt: &str,
    window: HistoryWindow
) -> Vec<Message> {
    let turns = window.apply(transcript.all());
    let mut messages = Vec::with_capacity(turns.len() + 1);
    messages.push(Message {
        role: Role::System.as_str().to_string(),
        content: system_prompt.to_string(),
    });
    for turn in turns {
        messages.push(Message {
            role: normalize(turn.role).as_str().to_string(),
            content: turn.content.clone(),
        });
    }
    messages
}

pub struct CompletionBridge {
    client: Arc<dyn ChatClient>,
    system_prompt: String,
    params: CompletionParams,
    window: HistoryWindow,
}

impl CompletionBridge {
    pub fn new(
        client: Arc<dyn ChatClient>,
        system_prompt: String,
        params: CompletionParams,
        window: HistoryWindow
    ) -> Self {
        Self { client, system_prompt, params, window }
    }

    pub fn outbound(&self, transcript: &Transcript) -> Vec<Message> {
        build_outbound(transcript, &self.system_prompt, self.window)
    }

    /// Opens a completion for the current transcript and hands back the raw
    /// fragments. Nothing is written to the transcript.
    pub async fn stream(&self, transcript: &Transcript) -> Result<FragmentStream, ChatError> {
        let messages = self.outbound(transcript);
        debug!("Sending {} messages for a {}-turn transcript", messages.len(), transcript.len());
        self.client.stream_chat(&messages, &self.params).await
    }

    pub async fn complete(&self, messages: &[Message]) -> Result<String, ChatError> {
        let stream = self.client.stream_chat(messages, &self.params).await?;
        drain_stream(stream).await
    }

    /// Records the user's text and opens the completion for it. The caller
    /// drains the stream and hands the text to `record_reply`.
    pub async fn open_turn(
        &self,
        session: &mut Session,
        user_text: &str
    ) -> Result<FragmentStream, ChatError> {
        session.append(Turn::user(user_text));
        self.stream(session.transcript()).await
    }

    pub fn record_reply(&self, session: &mut Session, reply: &str) {
        info!("Session {}: reply of {} bytes", session.id(), reply.len());
        session.append(Turn::assistant(reply));
    }

    /// Records the user's text, waits for the full reply and records it.
    /// On failure the reply is not recorded; the user turn stays.
    pub async fn respond(&self, session: &mut Session, user_text: &str) -> Result<String, ChatError> {
        let result = async {
            drain_stream(self.open_turn(session, user_text).await?).await
        }.await;

        match result {
            Ok(reply) => {
                self.record_reply(session, &reply);
                Ok(reply)
            }
            Err(e) => {
                error!("Session {}: completion failed: {}", session.id(), e);
                Err(e)
            }
        }
    }
}
