use crate::bridge::CompletionBridge;
use crate::cli::Args;
use crate::llm::chat::ReplyBuffer;
use crate::models::websocket::{ ClientMessage, ServerMessage };
use crate::session::Session;
use super::tls::tls_acceptor;

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::io::{ AsyncRead, AsyncWrite };
use tokio_tungstenite::{ accept_async, WebSocketStream };
use tokio_tungstenite::tungstenite::protocol::Message;

use chrono::Utc;
use futures::{ Sink, SinkExt, StreamExt };
use log::{ info, warn, error, debug };

const MAX_MESSAGE_SIZE: usize = 1 * 1024 * 1024;

pub async fn start_ws_server(
    addr: &str,
    bridge: Arc<CompletionBridge>,
    greeting: String,
    args: Args,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let tls_acceptor = tls_acceptor(&args)?;
    let listener = TcpListener::bind(addr).await?;

    let protocol = if tls_acceptor.is_some() { "wss" } else { "ws" };
    info!("{} server listening on: {}", protocol.to_uppercase(), addr);

    loop {
        let (stream, peer) = listener.accept().await?;

        info!("Incoming connection from: {}", peer);
        let bridge_clone = Arc::clone(&bridge);
        let greeting_clone = greeting.clone();
        let tls_acceptor_clone = tls_acceptor.clone();

        tokio::spawn(async move {
            let process_result = if let Some(acceptor) = tls_acceptor_clone {
                match acceptor.accept(stream).await {
                    Ok(tls_stream) => {
                        info!("TLS handshake successful for {}", peer);
                        process_connection(peer, tls_stream, bridge_clone, greeting_clone).await
                    }
                    Err(e) => {
                        error!("TLS handshake error for {}: {}", peer, e);
                        Err(Box::new(e) as Box<dyn Error + Send + Sync>)
                    }
                }
            } else {
                process_connection(peer, stream, bridge_clone, greeting_clone).await
            };

            if let Err(e) = process_result {
                error!("Failed to process connection for {}: {}", peer, e);
            }
        });
    }
}

async fn process_connection<S>(
    peer: SocketAddr,
    stream: S,
    bridge: Arc<CompletionBridge>,
    greeting: String
) -> Result<(), Box<dyn Error + Send + Sync>>
    where S: AsyncRead + AsyncWrite + Unpin + Send + 'static
{
    match accept_async(stream).await {
        Ok(ws) => {
            handle_connection(peer, ws, bridge, &greeting).await;
            Ok(())
        }
        Err(e) => {
            error!("Handshake failed for {}: {}", peer, e);
            Err(Box::new(e) as _)
        }
    }
}

async fn send_json<T>(tx: &mut T, msg: &ServerMessage) -> Result<(), Box<dyn Error + Send + Sync>>
    where T: Sink<Message> + Unpin, T::Error: Error + Send + Sync + 'static
{
    let json = serde_json::to_string(msg)?;
    tx.send(Message::Text(json)).await.map_err(|e| Box::new(e) as _)
}

fn transcript_message(session: &Session) -> ServerMessage {
    ServerMessage::Transcript {
        session_id: session.id().to_string(),
        turns: session.transcript().all().to_vec(),
    }
}

/// Runs one user turn. Remote failures are reported to the client as an
/// `error` frame and leave the session without an assistant reply; only
/// socket failures are returned.
async fn handle_chat<T>(
    bridge: &CompletionBridge,
    session: &mut Session,
    content: &str,
    forward_fragments: bool,
    tx: &mut T
) -> Result<(), Box<dyn Error + Send + Sync>>
    where T: Sink<Message> + Unpin, T::Error: Error + Send + Sync + 'static
{
    send_json(tx, &ServerMessage::Processing).await?;

    let reply = if forward_fragments {
        match bridge.open_turn(session, content).await {
            Ok(mut stream) => {
                let mut buffer = ReplyBuffer::default();
                let mut failure = None;
                while let Some(fragment) = stream.next().await {
                    match fragment {
                        Ok(text) => {
                            if !text.is_empty() {
                                send_json(tx, &ServerMessage::Partial { content: text.clone() }).await?;
                            }
                            buffer.push(&text);
                        }
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                    }
                }
                match failure {
                    None => {
                        debug!("Session {}: {} fragments", session.id(), buffer.fragments());
                        let reply = buffer.finish();
                        bridge.record_reply(session, &reply);
                        Ok(reply)
                    }
                    Some(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    } else {
        bridge.respond(session, content).await
    };

    match reply {
        Ok(content) => {
            send_json(tx, &ServerMessage::Response { content, timestamp: Utc::now().timestamp() }).await?;
            send_json(tx, &transcript_message(session)).await
        }
        Err(e) => {
            error!("Session {}: completion error: {}", session.id(), e);
            send_json(tx, &ServerMessage::Error { message: format!("Error processing message: {}", e) }).await
        }
    }
}

pub async fn handle_connection<S>(
    peer: SocketAddr,
    websocket: WebSocketStream<S>,
    bridge: Arc<CompletionBridge>,
    greeting: &str
)
    where S: AsyncRead + AsyncWrite + Unpin
{
    let (mut tx, mut rx) = websocket.split();
    let mut session = Session::new(greeting);
    info!("Assigned session {} to {}", session.id(), peer);

    if let Err(e) = send_json(&mut tx, &transcript_message(&session)).await {
        error!("Error sending transcript to {}: {}", peer, e);
        return;
    }

    while let Some(msg) = rx.next().await {
        match msg {
            Ok(message) => {
                if message.len() > MAX_MESSAGE_SIZE {
                    warn!(
                        "Message from {} exceeds size limit ({} > {})",
                        peer,
                        message.len(),
                        MAX_MESSAGE_SIZE
                    );
                    let error_msg = ServerMessage::Error {
                        message: "Message too large".to_string(),
                    };
                    if send_json(&mut tx, &error_msg).await.is_err() {
                        error!("Failed to send size limit error to {}", peer);
                    }
                    break;
                }

                match message {
                    Message::Text(text) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Chat { content, stream }) => {
                                if
                                    let Err(e) = handle_chat(
                                        &bridge,
                                        &mut session,
                                        &content,
                                        stream,
                                        &mut tx
                                    ).await
                                {
                                    error!("Error sending reply to {}: {}", peer, e);
                                    break;
                                }
                            }
                            Err(e) => {
                                error!("Failed to parse message from {}: {}", peer, e);
                                let error_msg = ServerMessage::Error {
                                    message: format!("Failed to parse message: {}", e),
                                };
                                if let Err(e) = send_json(&mut tx, &error_msg).await {
                                    error!("Error sending parse error to {}: {}", peer, e);
                                    break;
                                }
                            }
                        }
                    }
                    Message::Close(_) => {
                        info!("Received close frame from {}", peer);
                        break;
                    }
                    Message::Ping(ping_data) => {
                        if tx.send(Message::Pong(ping_data)).await.is_err() {
                            error!("Failed to send pong to {}", peer);
                            break;
                        }
                    }
                    Message::Pong(_) => {}
                    Message::Binary(_) => {
                        warn!("Ignoring binary message from {}", peer);
                    }
                    Message::Frame(_) => {}
                }
            }
            Err(e) => {
                match e {
                    | tokio_tungstenite::tungstenite::Error::ConnectionClosed
                    | tokio_tungstenite::tungstenite::Error::Protocol(_)
                    | tokio_tungstenite::tungstenite::Error::Utf8 => {
                        info!("WebSocket connection closed or protocol error for {}: {}", peer, e);
                    }
                    tokio_tungstenite::tungstenite::Error::Io(ref io_err) if
                        io_err.kind() == std::io::ErrorKind::ConnectionReset
                    => {
                        info!("WebSocket connection reset by peer {}", peer);
                    }
                    _ => {
                        error!("Error receiving message from {}: {}", peer, e);
                    }
                }
                break;
            }
        }
    }
    info!(
        "WebSocket connection closed for {} (session {}, {} turns)",
        peer,
        session.id(),
        session.transcript().len()
    );
}
