//! Lexis - chat front ends over a spreadsheet of articles.
//!
//! Entry point. Loads config, wires the fetcher, cache, sessions, and engine,
//! optionally warms the cache, then runs the selected adapter until Ctrl-C.

mod cli;

use std::sync::Arc;

use clap::Parser;

use lexis_api::AppState;
use lexis_chat::{LookupEngine, NavigationTokens, PaginationSession, ReplyRenderer};
use lexis_core::config::LexisConfig;
use lexis_core::types::Article;
use lexis_source::{ContentCache, HttpTableFetcher};
use lexis_telegram::{BotApi, TelegramBot};

use cli::{CliArgs, Command};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = LexisConfig::load_or_default(&config_file);
    if let Some(url) = args.resolve_source_url() {
        config.source.url = Some(url);
    }
    let command = args.command();
    if let Command::Serve { .. } = command {
        config.server.port = args.resolve_port(config.server.port);
    }

    // Tracing.
    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    tracing::info!("Starting Lexis v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Invalid configuration");
        return Err(e.into());
    }

    // Core.
    let fetcher = Arc::new(HttpTableFetcher::new(config.source.timeout())?);
    let cache = Arc::new(ContentCache::from_config(fetcher, &config)?);
    tracing::info!(url = %cache.source().url, "Article source configured");

    if let Command::Fetch { json } = command {
        return fetch_once(&cache, json).await;
    }

    let sessions = Arc::new(PaginationSession::new(config.pagination.page_size));
    let tokens = NavigationTokens::from_config(&config.pagination);
    let engine = Arc::new(LookupEngine::new(Arc::clone(&cache), sessions, tokens));

    if config.general.warm_cache {
        match cache.load().await {
            Ok(table) => tracing::info!(entries = table.len(), "Cache warmed"),
            Err(e) => tracing::warn!(error = %e, "Cache warm-up failed; will retry on first request"),
        }
    }

    match command {
        Command::Serve { .. } => {
            let state = AppState::new(config, engine);
            lexis_api::start_server(state, shutdown_signal()).await?;
        }
        Command::Telegram => {
            let token = cli::resolve_bot_token().ok_or("TELEGRAM_BOT_TOKEN is not set")?;
            let api = BotApi::new(
                &config.telegram.api_base,
                &token,
                config.telegram.poll_timeout_secs,
            )?;
            let renderer = ReplyRenderer::new(config.messages.clone(), engine.tokens());
            let bot = TelegramBot::new(api, engine, renderer, &config.telegram);
            bot.run(shutdown_signal()).await;
        }
        Command::Fetch { .. } => {}
    }

    tracing::info!("Lexis stopped");
    Ok(())
}

/// Load the table once and print it to stdout.
async fn fetch_once(cache: &ContentCache, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let table = cache.load().await?;

    if json {
        let articles: Vec<Article> = table
            .keys()
            .iter()
            .filter_map(|key| {
                table.get(key).map(|value| Article {
                    key: key.clone(),
                    value: value.to_string(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&articles)?);
    } else {
        println!("{} articles", table.len());
        for key in table.keys() {
            println!("{}", key);
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
