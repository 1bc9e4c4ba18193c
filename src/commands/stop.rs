use poise::CreateReply;

use super::controllable_player;
use crate::utils::{components, embed};
use crate::{Context, Error};

async fn stop_impl(ctx: Context<'_>) -> Result<(), Error> {
    if controllable_player(ctx).await?.is_none() {
        return Ok(());
    }

    // The buttons are handled in events::component.
    ctx.send(
        CreateReply::default()
            .embed(embed::info(
                "Stop playback?",
                "This clears the queue and leaves the voice channel.",
            ))
            .components(components::stop_confirmation())
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Stop playback, clear the queue and leave the voice channel
#[poise::command(slash_command, guild_only)]
pub async fn stop(ctx: Context<'_>) -> Result<(), Error> {
    stop_impl(ctx).await
}
