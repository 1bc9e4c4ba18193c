use super::{acknowledge, controllable_player};
use crate::{Context, Error};

async fn pause_impl(ctx: Context<'_>) -> Result<(), Error> {
    let Some(player) = controllable_player(ctx).await? else {
        return Ok(());
    };

    let result = player.toggle_pause().await;
    acknowledge(ctx, result, |paused| {
        if paused {
            "⏸ Paused.".to_string()
        } else {
            "▶ Resumed.".to_string()
        }
    })
    .await
}

/// Pause or resume playback
#[poise::command(slash_command, guild_only)]
pub async fn pause(ctx: Context<'_>) -> Result<(), Error> {
    pause_impl(ctx).await
}
