use std::time::Duration;

use poise::serenity_prelude as serenity;
use serenity::model::id::GuildId;
use tracing::info;

use crate::utils::voice;
use crate::{Data, Error};

const ALONE_GRACE: Duration = Duration::from_secs(30);

pub async fn handle(
    ctx: &serenity::Context,
    _old: &Option<serenity::VoiceState>,
    new: &serenity::VoiceState,
    data: &Data,
) -> Result<(), Error> {
    let Some(guild_id) = new.guild_id else {
        return Ok(());
    };
    if data.players.get(guild_id).await.is_none() {
        return Ok(());
    }

    // Kicked or disconnected from voice by someone else.
    if new.user_id == ctx.cache.current_user().id && new.channel_id.is_none() {
        info!("bot was disconnected from voice (guild: {guild_id})");
        stop_player(data, guild_id).await;
        return Ok(());
    }

    let Some(manager) = songbird::get(ctx).await else {
        return Ok(());
    };
    let Some(bot_channel) = voice::bot_channel(&manager, guild_id).await else {
        return Ok(());
    };

    if voice::listeners(ctx, guild_id, bot_channel) > 0 {
        return Ok(());
    }

    let ctx = ctx.clone();
    let players = data.players.clone();
    tokio::spawn(async move {
        tokio::time::sleep(ALONE_GRACE).await;

        let still_alone = match voice::bot_channel(&manager, guild_id).await {
            Some(channel) => voice::listeners(&ctx, guild_id, channel) == 0,
            None => false,
        };
        if still_alone {
            info!("left alone in voice, leaving (guild: {guild_id})");
            if let Some(player) = players.remove(guild_id).await {
                let _ = player.stop().await;
            }
        }
    });

    Ok(())
}

async fn stop_player(data: &Data, guild_id: GuildId) {
    if let Some(player) = data.players.remove(guild_id).await {
        let _ = player.stop().await;
    }
}
