use std::env;
use std::sync::Arc;

use log::info;
use teloxide::prelude::*;

#[cfg(feature = "axum-server")]
use axum::{Router, response::Html, routing::get, routing::post};
#[cfg(feature = "axum-server")]
use log::warn;

use crate::handlers::{DealContext, handle_message};

#[cfg(feature = "axum-server")]
pub const KEEP_ALIVE_BODY: &str = "Bot is running!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentMode {
    Webhook,
    Polling,
}

impl std::fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeploymentMode::Webhook => write!(f, "WEBHOOK (Production)"),
            DeploymentMode::Polling => write!(f, "POLLING (Development)"),
        }
    }
}

pub fn is_production_environment(lookup: impl Fn(&str) -> Option<String>) -> bool {
    let flag = |key: &str, expected: &str| lookup(key).is_some_and(|v| v == expected);

    // Common hosting markers
    lookup("RAILWAY_ENVIRONMENT").is_some() ||
    lookup("HEROKU_APP_NAME").is_some() ||
    flag("ENVIRONMENT", "production") ||
    // Cloud-assigned port plus a public URL
    (lookup("PORT").is_some() && lookup("WEBHOOK_URL").is_some()) ||
    // Manual override
    flag("WEBHOOK_MODE", "true")
}

pub fn detect_deployment_mode_from(lookup: impl Fn(&str) -> Option<String>) -> DeploymentMode {
    if is_production_environment(lookup) {
        DeploymentMode::Webhook
    } else {
        DeploymentMode::Polling
    }
}

pub fn detect_deployment_mode() -> DeploymentMode {
    detect_deployment_mode_from(|key| env::var(key).ok())
}

#[cfg(feature = "axum-server")]
async fn health_check() -> Html<&'static str> {
    Html(KEEP_ALIVE_BODY)
}

#[cfg(feature = "axum-server")]
fn keep_alive_router() -> Router {
    Router::new().route("/", get(health_check))
}

/// Serves the keep-alive endpoint in the background so hosts that probe
/// HTTP keep the polling process up. Failing to bind only costs the probe.
#[cfg(feature = "axum-server")]
pub fn spawn_keep_alive(port: u16) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await {
            Ok(listener) => listener,
            Err(e) => {
                warn!("⚠️ Keep-alive server could not bind to port {port}: {e}");
                return;
            }
        };

        info!("💓 Keep-alive server listening on port {port}");
        if let Err(e) = axum::serve(listener, keep_alive_router()).await {
            warn!("⚠️ Keep-alive server stopped: {e}");
        }
    })
}

#[cfg(feature = "axum-server")]
pub async fn run_webhook_mode(
    bot: Bot,
    ctx: Arc<DealContext>,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    use axum::Json;
    use axum::extract::State;

    async fn webhook_handler(
        State((bot, ctx)): State<(Bot, Arc<DealContext>)>,
        Json(update): Json<teloxide::types::Update>,
    ) -> &'static str {
        info!("🔗 Webhook received update: {:?}", update.id);

        if let teloxide::types::UpdateKind::Message(message) = update.kind {
            if let Err(e) = handle_message(bot, message, ctx).await {
                warn!("❌ Failed to handle webhook message: {e}");
            }
        } else {
            info!("🔄 Received non-message update in webhook");
        }
        "OK"
    }

    let webhook_url = env::var("WEBHOOK_URL")
        .map_err(|_| "WEBHOOK_URL must be set for webhook mode")?;

    info!("🌐 Production environment detected - running in WEBHOOK mode");
    info!("🔗 Setting up webhook at: {webhook_url}");

    bot.set_webhook(webhook_url.parse()?)
        .await
        .map_err(|e| format!("Failed to set webhook: {e}"))?;

    let app = Router::new()
        .route("/", get(health_check))
        .route("/webhook", post(webhook_handler))
        .with_state((bot, ctx));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .map_err(|e| format!("Failed to bind to port: {e}"))?;

    info!("👂 Webhook server listening on port {port} - ready to receive updates!");

    axum::serve(listener, app)
        .await
        .map_err(|e| format!("Server failed: {e}").into())
}

pub async fn run_polling_mode(bot: Bot, ctx: Arc<DealContext>, port: u16) {
    info!("🔄 Development environment detected - running in POLLING mode");

    #[cfg(feature = "axum-server")]
    spawn_keep_alive(port);
    #[cfg(not(feature = "axum-server"))]
    info!("🚫 axum-server feature disabled - no keep-alive endpoint on port {port}");

    info!("👂 Starting polling loop - ready to receive updates!");

    let handler = Update::filter_message().endpoint(handle_message);
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![ctx])
        .build()
        .dispatch()
        .await;
}
