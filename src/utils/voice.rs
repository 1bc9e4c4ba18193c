use std::sync::Arc;

use poise::serenity_prelude as serenity;
use serenity::model::id::{ChannelId, GuildId, UserId};
use songbird::Songbird;
use thiserror::Error;
use tracing::warn;

use crate::music::player::SongbirdSink;
use crate::music::presenter::ChannelSurface;
use crate::music::{MusicError, PlayerHandle, PlayerParts};
use crate::Data;

/// Reasons a user may not drive the player right now. All of them are shown to the user.
#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("Join a voice channel first!")]
    NotInVoice,
    #[error("You must be in the same voice channel as the bot.")]
    DifferentChannel,
    #[error("Could not join your voice channel.")]
    JoinFailed,
    #[error("Voice is not available right now.")]
    Unavailable,
    #[error(transparent)]
    Music(#[from] MusicError),
}

pub fn user_channel(ctx: &serenity::Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = ctx.cache.guild(guild_id)?;
    guild.voice_states.get(&user_id).and_then(|vs| vs.channel_id)
}

pub async fn bot_channel(manager: &Songbird, guild_id: GuildId) -> Option<ChannelId> {
    let call = manager.get(guild_id)?;
    let channel = call.lock().await.current_channel()?;
    Some(ChannelId::new(channel.0.get()))
}

/// Number of non-bot members in `channel_id`.
pub fn listeners(ctx: &serenity::Context, guild_id: GuildId, channel_id: ChannelId) -> usize {
    let current_user = ctx.cache.current_user().id;
    let Some(guild) = ctx.cache.guild(guild_id) else {
        return 0;
    };
    guild
        .voice_states
        .values()
        .filter(|vs| vs.channel_id == Some(channel_id) && vs.user_id != current_user)
        .filter(|vs| {
            let is_bot = vs
                .member
                .as_ref()
                .or_else(|| guild.members.get(&vs.user_id))
                .is_some_and(|m| m.user.bot);
            !is_bot
        })
        .count()
}

async fn manager(ctx: &serenity::Context) -> Result<Arc<Songbird>, VoiceError> {
    songbird::get(ctx).await.ok_or(VoiceError::Unavailable)
}

/// The running player, if `user_id` shares its voice channel.
pub async fn controllable_player(
    ctx: &serenity::Context,
    data: &Data,
    guild_id: GuildId,
    user_id: UserId,
) -> Result<PlayerHandle, VoiceError> {
    let handle = data
        .players
        .get(guild_id)
        .await
        .ok_or(MusicError::NotRunning)?;
    let manager = manager(ctx).await?;

    let user = user_channel(ctx, guild_id, user_id).ok_or(VoiceError::NotInVoice)?;
    match bot_channel(&manager, guild_id).await {
        Some(bot) if bot == user => Ok(handle),
        _ => Err(VoiceError::DifferentChannel),
    }
}

/// Joins the user's voice channel and spawns a player if none is running.
///
/// The status message of a new player is posted in `text_channel`.
pub async fn join_player(
    ctx: &serenity::Context,
    data: &Data,
    guild_id: GuildId,
    user_id: UserId,
    text_channel: ChannelId,
) -> Result<PlayerHandle, VoiceError> {
    let user = user_channel(ctx, guild_id, user_id).ok_or(VoiceError::NotInVoice)?;
    let manager = manager(ctx).await?;

    if let Some(handle) = data.players.get(guild_id).await {
        return match bot_channel(&manager, guild_id).await {
            Some(bot) if bot == user => Ok(handle),
            _ => Err(VoiceError::DifferentChannel),
        };
    }

    let call = manager.join(guild_id, user).await.map_err(|e| {
        warn!("failed to join voice channel {user} (guild: {guild_id}): {e}");
        VoiceError::JoinFailed
    })?;

    let handle = data
        .players
        .get_or_spawn(guild_id, &data.settings, || PlayerParts {
            sink: Arc::new(SongbirdSink::new(guild_id, Arc::clone(&manager), call)),
            fetcher: Arc::clone(&data.ytdlp) as _,
            surface: Arc::new(ChannelSurface::new(Arc::clone(&ctx.http), text_channel)),
            progress_bars: Arc::clone(&data.progress_bars),
        })
        .await;
    Ok(handle)
}
