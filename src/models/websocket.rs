use serde::{ Serialize, Deserialize };
use super::chat::Turn;

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "chat")] Chat {
        content: String,
        /// Forward fragments as they arrive instead of only the final reply.
        #[serde(default)]
        stream: bool,
    },
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "transcript")] Transcript {
        session_id: String,
        turns: Vec<Turn>,
    },
    #[serde(rename = "processing")]
    Processing,
    #[serde(rename = "partial")] Partial {
        content: String,
    },
    #[serde(rename = "response")] Response {
        content: String,
        timestamp: i64,
    },
    #[serde(rename = "error")] Error {
        message: String,
    },
}
