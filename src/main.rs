use std::sync::Arc;

use pebble_bot::music::progress::ProgressBars;
use pebble_bot::music::source::YtDlp;
use pebble_bot::music::PlayerRegistry;
use pebble_bot::store::Store;
use pebble_bot::{commands, config, events, Data};
use poise::serenity_prelude as serenity;
use songbird::SerenityInit;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    let store = match Store::new(&config.db_path) {
        Ok(store) => {
            tracing::info!("database ready: {}", config.db_path);
            store
        }
        Err(e) => {
            tracing::error!("failed to open database {}: {e}", config.db_path);
            return;
        }
    };

    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::GUILD_VOICE_STATES;

    let settings = config.player_settings();
    let download_dir = config.download_dir.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            pre_command: |ctx| {
                Box::pin(async move {
                    tracing::info!(
                        "/{} invoked by {} (guild: {:?}, channel: {})",
                        ctx.command().qualified_name,
                        ctx.author().name,
                        ctx.guild_id(),
                        ctx.channel_id(),
                    );
                })
            },
            event_handler: |ctx, event, framework, data| {
                Box::pin(events::handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let progress_bars = match store.progress_bars() {
                    Ok(images) => {
                        tracing::info!("loaded {} progress bar images", images.len());
                        ProgressBars::new(images)
                    }
                    Err(e) => {
                        tracing::warn!("failed to load progress bars, using text bars: {e}");
                        ProgressBars::default()
                    }
                };

                tracing::info!("bot is ready");
                Ok(Data {
                    players: PlayerRegistry::new(),
                    store,
                    ytdlp: Arc::new(YtDlp::new(download_dir)),
                    progress_bars: Arc::new(progress_bars),
                    settings,
                })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .register_songbird()
        .await
        .expect("failed to build the Discord client");

    if let Err(e) = client.start().await {
        tracing::error!("client error: {e}");
    }
}
