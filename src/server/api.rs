use crate::cli::Args;
use crate::config::prompt::PromptConfig;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    routing::get,
    Router,
    Json,
    extract::State,
    response::{ Html, IntoResponse },
};
use serde::Serialize;
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, error };

const WIDGET_PAGE: &str = include_str!("../../static/index.html");

#[derive(Serialize, Debug, Clone)]
pub struct WidgetConfig {
    pub title: String,
    pub caption: String,
    pub input_placeholder: String,
    pub capabilities: Vec<String>,
    pub greeting: String,
    pub model: String,
    pub ws_url: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Clone)]
struct AppState {
    widget: Arc<WidgetConfig>,
}

impl WidgetConfig {
    pub fn new(prompts: &PromptConfig, args: &Args) -> Self {
        Self {
            title: prompts.title.clone(),
            caption: prompts.caption.clone(),
            input_placeholder: prompts.input_placeholder.clone(),
            capabilities: prompts.capabilities.clone(),
            greeting: prompts.greeting.clone(),
            model: args.chat_model.clone(),
            ws_url: args.ws_url(),
        }
    }
}

pub fn router(widget: WidgetConfig) -> Router {
    let app_state = AppState {
        widget: Arc::new(widget),
    };

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/", get(widget_page_handler))
        .route("/api/widget", get(widget_config_handler))
        .route("/api/health", get(health_handler))
        .layer(cors)
        .with_state(app_state)
}

pub async fn start_http_server(
    http_port: u16,
    widget: WidgetConfig,
    args: Args,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = format!("0.0.0.0:{}", http_port).parse::<SocketAddr>()?;
    let app = router(widget);

    match (args.enable_tls, &args.tls_cert_path, &args.tls_key_path) {
        (true, Some(cert_path), Some(key_path)) => {
            let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                cert_path,
                key_path
            ).await?;

            info!("Starting HTTPS widget server on: https://{}", addr);
            tokio::spawn(async move {
                let result = axum_server::bind_rustls(addr, tls_config)
                    .serve(app.into_make_service())
                    .await;

                if let Err(e) = result {
                    error!("HTTPS server error: {}", e);
                }
            });
        }
        _ => {
            let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e|
                format!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e)
            )?;

            info!("Starting HTTP widget server on: http://{}", addr);
            tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, app.into_make_service()).await {
                    error!("HTTP server error: {}", e);
                }
            });
        }
    }

    Ok(())
}

async fn widget_page_handler() -> Html<&'static str> {
    Html(WIDGET_PAGE)
}

async fn widget_config_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.widget.as_ref().clone())
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
