use crate::models::chat::Turn;
use log::debug;
use uuid::Uuid;

/// Ordered, append-only record of one conversation.
#[derive(Clone, Debug, Default)]
pub struct Transcript(Vec<Turn>);

impl Transcript {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Starts a transcript with the assistant greeting as its first turn.
    pub fn with_greeting(greeting: &str) -> Self {
        Self(vec![Turn::assistant(greeting)])
    }

    pub fn append(&mut self, turn: Turn) {
        self.0.push(turn)
    }

    pub fn all(&self) -> &[Turn] {
        &self.0
    }

    pub fn last(&self) -> Option<&Turn> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.0.iter()
    }
}

/// One live conversation. Lives as long as the connection that created it.
#[derive(Clone, Debug)]
pub struct Session {
    id: String,
    transcript: Transcript,
}

impl Session {
    pub fn new(greeting: &str) -> Self {
        let id = Uuid::new_v4().to_string();
        debug!("Opening session {}", id);
        Self {
            id,
            transcript: Transcript::with_greeting(greeting),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn append(&mut self, turn: Turn) {
        self.transcript.append(turn)
    }
}
