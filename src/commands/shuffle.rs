use super::{acknowledge, controllable_player};
use crate::{Context, Error};

async fn shuffle_impl(ctx: Context<'_>) -> Result<(), Error> {
    let Some(player) = controllable_player(ctx).await? else {
        return Ok(());
    };

    let result = player.shuffle().await;
    acknowledge(ctx, result, |shuffled| {
        if shuffled {
            "🔀 Queue shuffled.".to_string()
        } else {
            "Not enough songs in the queue to shuffle.".to_string()
        }
    })
    .await
}

/// Shuffle the queue
#[poise::command(slash_command, guild_only)]
pub async fn shuffle(ctx: Context<'_>) -> Result<(), Error> {
    shuffle_impl(ctx).await
}
