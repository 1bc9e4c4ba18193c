use super::{acknowledge, controllable_player};
use crate::{Context, Error};

async fn loop_impl(ctx: Context<'_>) -> Result<(), Error> {
    let Some(player) = controllable_player(ctx).await? else {
        return Ok(());
    };

    let result = player.toggle_loop().await;
    acknowledge(ctx, result, |enabled| {
        if enabled {
            "🔁 Loop enabled. The current song will repeat.".to_string()
        } else {
            "➡ Loop disabled.".to_string()
        }
    })
    .await
}

/// Toggle repeating the current song
#[poise::command(slash_command, guild_only, rename = "loop")]
pub async fn loop_cmd(ctx: Context<'_>) -> Result<(), Error> {
    loop_impl(ctx).await
}
