pub mod api;
pub mod tls;
pub mod websocket;

use crate::bridge::CompletionBridge;
use crate::cli::Args;
use crate::config::prompt::PromptConfig;
use api::WidgetConfig;
use std::error::Error;
use std::sync::Arc;

pub struct Server {
    addr: String,
    bridge: Arc<CompletionBridge>,
    prompts: PromptConfig,
    args: Args,
}

impl Server {
    pub fn new(
        addr: String,
        bridge: Arc<CompletionBridge>,
        prompts: PromptConfig,
        args: Args,
    ) -> Self {
        Self {
            addr,
            bridge,
            prompts,
            args,
        }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.start_http_server().await?;
        self.start_ws_server().await
    }

    async fn start_http_server(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        api::start_http_server(
            self.args.http_port,
            WidgetConfig::new(&self.prompts, &self.args),
            self.args.clone(),
        ).await
    }

    async fn start_ws_server(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        websocket::start_ws_server(
            &self.addr,
            self.bridge.clone(),
            self.prompts.greeting.clone(),
            self.args.clone(),
        ).await
    }
}
