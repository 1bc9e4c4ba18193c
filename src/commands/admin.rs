use tracing::{error, info};

use super::{reply_error, reply_success};
use crate::{Context, Error};

async fn reload_impl(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let images = match data.store.progress_bars() {
        Ok(images) => images,
        Err(e) => {
            error!("failed to load progress bars: {e}");
            return reply_error(ctx, "Could not read the progress bars from the database.").await;
        }
    };
    let count = images.len();
    data.progress_bars.replace(images);

    info!("progress bars reloaded: {count} images");
    reply_success(ctx, &format!("Reloaded {count} progress bar image(s).")).await
}

/// Reload the progress bar images from the database
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    default_member_permissions = "ADMINISTRATOR"
)]
pub async fn reload_progress_bars(ctx: Context<'_>) -> Result<(), Error> {
    reload_impl(ctx).await
}
