use super::{acknowledge, controllable_player};
use crate::{Context, Error};

async fn previous_impl(ctx: Context<'_>) -> Result<(), Error> {
    let Some(player) = controllable_player(ctx).await? else {
        return Ok(());
    };

    let result = player.previous().await;
    acknowledge(ctx, result, |track| format!("⏮ Back to **{}**", track.title)).await
}

/// Play the previous song again
#[poise::command(slash_command, guild_only)]
pub async fn previous(ctx: Context<'_>) -> Result<(), Error> {
    previous_impl(ctx).await
}
