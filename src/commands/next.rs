use super::{acknowledge, controllable_player};
use crate::{Context, Error};

async fn next_impl(ctx: Context<'_>) -> Result<(), Error> {
    let Some(player) = controllable_player(ctx).await? else {
        return Ok(());
    };

    let result = player.skip().await;
    acknowledge(ctx, result, |()| "⏭ Skipped to the next song.".to_string()).await
}

/// Skip to the next song in the queue
#[poise::command(slash_command, guild_only)]
pub async fn next(ctx: Context<'_>) -> Result<(), Error> {
    next_impl(ctx).await
}
