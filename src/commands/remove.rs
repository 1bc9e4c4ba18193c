use poise::CreateReply;

use super::{controllable_player, reply_voice_error};
use crate::music::MusicError;
use crate::utils::{components, embed};
use crate::{Context, Error};

async fn remove_impl(ctx: Context<'_>) -> Result<(), Error> {
    let Some(player) = controllable_player(ctx).await? else {
        return Ok(());
    };

    let snapshot = match player.snapshot().await {
        Ok(snapshot) => snapshot,
        Err(e) => return reply_voice_error(ctx, e.into()).await,
    };
    if snapshot.queue.is_empty() {
        return reply_voice_error(ctx, MusicError::QueueEmpty.into()).await;
    }

    ctx.send(
        CreateReply::default()
            .embed(embed::info(
                "Remove a song",
                &format!("{} song(s) in the queue.", snapshot.queue.len()),
            ))
            .components(components::queue_remove_menu(&snapshot.queue))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Pick a song to remove from the queue
#[poise::command(slash_command, guild_only)]
pub async fn remove_song_from_queue(ctx: Context<'_>) -> Result<(), Error> {
    remove_impl(ctx).await
}
