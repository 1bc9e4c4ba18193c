use super::{acknowledge, reply_error, reply_voice_error};
use crate::utils::voice::{self, VoiceError};
use crate::{Context, Error};

async fn play_impl(ctx: Context<'_>, song: String) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in a server")?;

    if voice::user_channel(ctx.serenity_context(), guild_id, ctx.author().id).is_none() {
        return reply_error(ctx, &VoiceError::NotInVoice.to_string()).await;
    }

    // yt-dlp routinely takes longer than the 3 s interaction deadline.
    ctx.defer_ephemeral().await?;

    let track = match ctx.data().ytdlp.resolve(&song).await {
        Ok(track) => track,
        Err(e) => return reply_voice_error(ctx, e.into()).await,
    };

    let player = match voice::join_player(
        ctx.serenity_context(),
        ctx.data(),
        guild_id,
        ctx.author().id,
        ctx.channel_id(),
    )
    .await
    {
        Ok(player) => player,
        Err(e) => return reply_voice_error(ctx, e).await,
    };

    let title = track.title.clone();
    let result = player.enqueue(vec![track]).await;
    acknowledge(ctx, result, |position| match position {
        0 => format!("▶️ Now playing **{title}**."),
        _ => format!("✅ Added **{title}** to the queue (#{position})."),
    })
    .await
}

/// Play a song or add it to the queue
#[poise::command(slash_command, guild_only)]
pub async fn play(
    ctx: Context<'_>,
    #[description = "Song name or URL"] song: String,
) -> Result<(), Error> {
    play_impl(ctx, song).await
}
