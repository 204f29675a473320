use std::sync::Arc;

use log::{error, info};
use teloxide::prelude::*;

mod commands;
mod config;
mod deployment;
mod handlers;
mod template;

use config::BotConfig;
use deployment::{DeploymentMode, detect_deployment_mode, run_polling_mode};
use handlers::DealContext;

#[cfg(feature = "axum-server")]
use deployment::run_webhook_mode;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    pretty_env_logger::init();
    info!("Starting deal loot bot...");

    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("⚠️ {e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(&config.bot_token);
    let ctx = Arc::new(DealContext::from_config(&config));
    info!(
        "📣 Promoting {} - relay destination: {:?}",
        ctx.formatter.channel(),
        ctx.relay
    );

    let deployment_mode = detect_deployment_mode();
    info!("🚀 Bot deployment detection: {deployment_mode}");

    let result = match deployment_mode {
        DeploymentMode::Webhook => {
            #[cfg(feature = "axum-server")]
            {
                run_webhook_mode(bot, ctx, config.port).await
            }
            #[cfg(not(feature = "axum-server"))]
            {
                panic!("Production environment detected but axum-server feature not enabled. Compile with --features axum-server");
            }
        }
        DeploymentMode::Polling => {
            run_polling_mode(bot, ctx, config.port).await;
            Ok(())
        }
    };

    if let Err(e) = result {
        panic!("Bot failed to start: {e}");
    }
}
