use poise::CreateReply;
use serenity::builder::CreateEmbed;

use crate::{Context, Error};

async fn help_impl(ctx: Context<'_>) -> Result<(), Error> {
    let music_cmds = "\
`/play` Play a song or add it to the queue
`/previous` Play the previous song again
`/next` Skip to the next song
`/pause` Pause or resume
`/loop` Repeat the current song
`/shuffle` Shuffle the queue
`/stop` Stop and leave the voice channel
`/clear_queue` Empty the queue
`/remove_song_from_queue` Remove one queued song";

    let playlist_cmds = "\
`/load_playlist` Replace the queue with a saved playlist
`/create_playlist` Create a playlist
`/delete_playlist` Delete a playlist
`/add_to_playlist` Save a song to a playlist
`/remove_song` Remove a song from a playlist";

    let embed = CreateEmbed::new()
        .title("Pebble Help")
        .field("Music", music_cmds, false)
        .field("Playlists", playlist_cmds, false)
        .color(0x8E4CD0);

    ctx.send(CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Show the available commands
#[poise::command(slash_command, guild_only)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    help_impl(ctx).await
}
