use poise::CreateReply;
use tracing::error;

use super::{acknowledge, reply_error, reply_success, reply_voice_error};
use crate::music::Track;
use crate::store::SavedSong;
use crate::utils::voice::{self, VoiceError};
use crate::utils::{components, embed};
use crate::{Context, Error};

const STORE_FAILURE: &str = "Something went wrong with your playlists. Try again later.";

async fn autocomplete_playlist(ctx: Context<'_>, partial: &str) -> impl Iterator<Item = String> {
    let user_id = ctx.author().id.to_string();
    let names = ctx
        .data()
        .store
        .playlist_names(&user_id, partial)
        .unwrap_or_else(|e| {
            error!("playlist autocomplete failed: {e}");
            Vec::new()
        });
    names.into_iter().take(25)
}

async fn load_impl(ctx: Context<'_>, playlist: String) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in a server")?;
    let user_id = ctx.author().id.to_string();

    if voice::user_channel(ctx.serenity_context(), guild_id, ctx.author().id).is_none() {
        return reply_error(ctx, &VoiceError::NotInVoice.to_string()).await;
    }

    let songs = match ctx.data().store.playlist_songs(&user_id, &playlist) {
        Ok(songs) => songs,
        Err(e) => {
            error!("failed to read playlist {playlist}: {e}");
            return reply_error(ctx, STORE_FAILURE).await;
        }
    };
    if songs.is_empty() {
        return reply_error(ctx, &format!("Playlist **{playlist}** is empty or does not exist."))
            .await;
    }

    let player = match voice::join_player(
        ctx.serenity_context(),
        ctx.data(),
        guild_id,
        ctx.author().id,
        ctx.channel_id(),
    )
    .await
    {
        Ok(player) => player,
        Err(e) => return reply_voice_error(ctx, e).await,
    };

    let tracks: Vec<Track> = songs
        .into_iter()
        .map(|song| Track::from_saved(song.title, song.url))
        .collect();
    let count = tracks.len();
    let result = player.replace_queue(tracks).await.map(|_| count);
    acknowledge(ctx, result, |count| {
        format!("📂 Loaded {count} song(s) from **{playlist}**.")
    })
    .await
}

/// Replace the queue with one of your playlists
#[poise::command(slash_command, guild_only)]
pub async fn load_playlist(
    ctx: Context<'_>,
    #[description = "The playlist to load"]
    #[autocomplete = "autocomplete_playlist"]
    playlist: String,
) -> Result<(), Error> {
    load_impl(ctx, playlist).await
}

async fn create_impl(ctx: Context<'_>, name: String) -> Result<(), Error> {
    let user_id = ctx.author().id.to_string();
    let name = name.trim();
    if name.is_empty() {
        return reply_error(ctx, "The playlist name cannot be empty.").await;
    }

    match ctx.data().store.create_playlist(&user_id, name) {
        Ok(true) => reply_success(ctx, &format!("Playlist **{name}** created.")).await,
        Ok(false) => reply_error(ctx, &format!("Playlist **{name}** already exists.")).await,
        Err(e) => {
            error!("failed to create playlist {name}: {e}");
            reply_error(ctx, STORE_FAILURE).await
        }
    }
}

/// Create a new playlist
#[poise::command(slash_command)]
pub async fn create_playlist(
    ctx: Context<'_>,
    #[description = "Name of the playlist"]
    #[max_length = 50]
    name: String,
) -> Result<(), Error> {
    create_impl(ctx, name).await
}

async fn delete_impl(ctx: Context<'_>, playlist: String) -> Result<(), Error> {
    let user_id = ctx.author().id.to_string();
    match ctx.data().store.delete_playlist(&user_id, &playlist) {
        Ok(true) => reply_success(ctx, &format!("Playlist **{playlist}** has been deleted.")).await,
        Ok(false) => reply_error(ctx, &format!("Playlist **{playlist}** does not exist.")).await,
        Err(e) => {
            error!("failed to delete playlist {playlist}: {e}");
            reply_error(ctx, STORE_FAILURE).await
        }
    }
}

/// Delete one of your playlists
#[poise::command(slash_command)]
pub async fn delete_playlist(
    ctx: Context<'_>,
    #[description = "The playlist to delete"]
    #[autocomplete = "autocomplete_playlist"]
    playlist: String,
) -> Result<(), Error> {
    delete_impl(ctx, playlist).await
}

async fn add_impl(ctx: Context<'_>, song: String, playlist: String) -> Result<(), Error> {
    let data = ctx.data();
    let user_id = ctx.author().id.to_string();

    match data.store.playlist_exists(&user_id, &playlist) {
        Ok(true) => {}
        Ok(false) => {
            return reply_error(ctx, &format!("Playlist **{playlist}** does not exist.")).await;
        }
        Err(e) => {
            error!("failed to read playlist {playlist}: {e}");
            return reply_error(ctx, STORE_FAILURE).await;
        }
    }

    ctx.defer_ephemeral().await?;
    let track = match data.ytdlp.resolve(&song).await {
        Ok(track) => track,
        Err(e) => return reply_voice_error(ctx, e.into()).await,
    };

    let saved = SavedSong {
        title: track.title,
        url: track.webpage_url,
    };
    match data.store.add_song(&user_id, &playlist, &saved) {
        Ok(true) => {
            reply_success(ctx, &format!("**{}** added to **{playlist}**.", saved.title)).await
        }
        Ok(false) => {
            reply_error(ctx, &format!("**{}** is already in **{playlist}**.", saved.title)).await
        }
        Err(e) => {
            error!("failed to add a song to {playlist}: {e}");
            reply_error(ctx, STORE_FAILURE).await
        }
    }
}

/// Save a song to one of your playlists
#[poise::command(slash_command)]
pub async fn add_to_playlist(
    ctx: Context<'_>,
    #[description = "Song name or URL"] song: String,
    #[description = "The playlist to add the song to"]
    #[autocomplete = "autocomplete_playlist"]
    playlist: String,
) -> Result<(), Error> {
    add_impl(ctx, song, playlist).await
}

async fn remove_song_impl(ctx: Context<'_>, playlist: String) -> Result<(), Error> {
    let user_id = ctx.author().id.to_string();
    let songs = match ctx.data().store.playlist_songs(&user_id, &playlist) {
        Ok(songs) => songs,
        Err(e) => {
            error!("failed to read playlist {playlist}: {e}");
            return reply_error(ctx, STORE_FAILURE).await;
        }
    };
    if songs.is_empty() {
        return reply_error(ctx, "No songs found in this playlist.").await;
    }

    // The selection is handled in events::component.
    ctx.send(
        CreateReply::default()
            .embed(embed::info(
                "Remove a song",
                &format!("Select a song to remove from **{playlist}**."),
            ))
            .components(components::playlist_song_menu(&playlist, &songs))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Remove a song from one of your playlists
#[poise::command(slash_command)]
pub async fn remove_song(
    ctx: Context<'_>,
    #[description = "The playlist to remove a song from"]
    #[autocomplete = "autocomplete_playlist"]
    playlist: String,
) -> Result<(), Error> {
    remove_song_impl(ctx, playlist).await
}
