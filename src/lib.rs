pub mod bridge;
pub mod cli;
pub mod config;
pub mod llm;
pub mod models;
pub mod server;
pub mod session;

use bridge::CompletionBridge;
use cli::Args;
use config::prompt::load_prompts_or_default;
use llm::chat::new_client as new_chat_client;
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("WebSocket Address: {}", args.server_addr);
    info!("Widget HTTP Port: {}", args.http_port);
    info!("Widget WebSocket URL: {}", args.ws_url());
    info!("Chat Base URL: {}", args.groq_base_url);
    info!("Chat Model: {}", args.chat_model);
    info!(
        "Sampling: temperature={}, max_tokens={}, top_p={}",
        args.chat_temperature,
        args.chat_max_tokens,
        args.chat_top_p
    );
    info!("History Window: {:?}", args.history_window());
    info!("Prompts Path: {}", args.prompts_path.as_deref().unwrap_or("built-in"));
    info!("TLS Enabled: {}", args.tls_enabled());
    info!("-------------------------");

    let prompts = load_prompts_or_default(args.prompts_path.as_deref())?;
    let chat_client = new_chat_client(&args.llm_config())?;
    info!(
        "Chat client configured: Model={}, BaseURL={}",
        chat_client.get_model(),
        chat_client.get_base_url().as_deref().unwrap_or("adapter default")
    );
    let bridge = Arc::new(
        CompletionBridge::new(
            chat_client,
            prompts.system_prompt.clone(),
            args.completion_params(),
            args.history_window()
        )
    );

    let addr = args.server_addr.clone();
    let server = Server::new(addr, bridge, prompts, args);
    server.run().await?;

    Ok(())
}
