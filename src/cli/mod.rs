use clap::Parser;
use crate::bridge::HistoryWindow;
use crate::llm::{ CompletionParams, LlmConfig, DEFAULT_BASE_URL, DEFAULT_MODEL };

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Chat LLM Provider Args ---
    /// Bearer key for the Groq API. Startup fails without it.
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub groq_api_key: Option<String>,

    /// Base URL of the OpenAI-compatible chat completions API.
    #[arg(long, env = "GROQ_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub groq_base_url: String,

    /// Model name for chat completion.
    #[arg(long, env = "CHAT_MODEL", default_value = DEFAULT_MODEL)]
    pub chat_model: String,

    /// Sampling temperature.
    #[arg(long, env = "CHAT_TEMPERATURE", default_value = "1")]
    pub chat_temperature: f32,

    /// Maximum number of tokens generated per reply.
    #[arg(long, env = "CHAT_MAX_TOKENS", default_value = "1024")]
    pub chat_max_tokens: u32,

    /// Nucleus sampling probability mass.
    #[arg(long, env = "CHAT_TOP_P", default_value = "1")]
    pub chat_top_p: f32,

    /// Number of most recent transcript turns resent with each request. 0 resends the whole transcript.
    #[arg(long, env = "HISTORY_WINDOW", default_value = "0")]
    pub history_window: usize,

    /// Optional JSON file overriding the system prompt, greeting and widget copy.
    #[arg(long, env = "PROMPTS_PATH")]
    pub prompts_path: Option<String>,

    // --- Server Args ---
    /// Host address and port for the WebSocket chat server.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    /// Port of the HTTP server delivering the widget page.
    #[arg(long, env = "HTTP_PORT", default_value = "8080")]
    pub http_port: u16,

    /// WebSocket URL the widget page connects to. Derived from SERVER_ADDR when unset.
    #[arg(long, env = "PUBLIC_WS_URL")]
    pub public_ws_url: Option<String>,

    /// Optional path to the TLS certificate file (PEM format) for enabling WSS/HTTPS. Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format) for enabling WSS/HTTPS. Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

impl Args {
    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig {
            api_key: self.groq_api_key.clone().filter(|k| !k.trim().is_empty()),
            completion_model: Some(self.chat_model.clone()),
            base_url: Some(self.groq_base_url.clone()),
        }
    }

    pub fn completion_params(&self) -> CompletionParams {
        CompletionParams {
            model: self.chat_model.clone(),
            temperature: self.chat_temperature,
            max_tokens: self.chat_max_tokens,
            top_p: self.chat_top_p,
            stop: None,
        }
    }

    pub fn history_window(&self) -> HistoryWindow {
        HistoryWindow::from_limit(self.history_window)
    }

    pub fn tls_enabled(&self) -> bool {
        self.enable_tls && self.tls_cert_path.is_some() && self.tls_key_path.is_some()
    }

    pub fn ws_url(&self) -> String {
        match &self.public_ws_url {
            Some(url) if !url.trim().is_empty() => url.clone(),
            _ => {
                let scheme = if self.tls_enabled() { "wss" } else { "ws" };
                format!("{}://{}", scheme, self.server_addr)
            }
        }
    }
}
