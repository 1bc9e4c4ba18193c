use super::{acknowledge, controllable_player};
use crate::{Context, Error};

async fn clear_queue_impl(ctx: Context<'_>) -> Result<(), Error> {
    let Some(player) = controllable_player(ctx).await? else {
        return Ok(());
    };

    let result = player.clear_queue().await;
    acknowledge(ctx, result, |removed| {
        format!("🗑 Cleared {removed} song(s) from the queue.")
    })
    .await
}

/// Remove every song waiting in the queue
#[poise::command(slash_command, guild_only)]
pub async fn clear_queue(ctx: Context<'_>) -> Result<(), Error> {
    clear_queue_impl(ctx).await
}
