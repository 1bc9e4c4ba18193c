mod admin;
mod clear_queue;
mod help;
mod loop_cmd;
mod next;
mod pause;
mod play;
mod playlist;
mod previous;
mod remove;
mod shuffle;
mod stop;

use poise::CreateReply;

use crate::music::{MusicError, PlayerHandle};
use crate::utils::embed;
use crate::utils::voice::{self, VoiceError};
use crate::{Context, Data, Error};

pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        help::help(),
        play::play(),
        previous::previous(),
        next::next(),
        pause::pause(),
        loop_cmd::loop_cmd(),
        shuffle::shuffle(),
        stop::stop(),
        clear_queue::clear_queue(),
        remove::remove_song_from_queue(),
        playlist::load_playlist(),
        playlist::create_playlist(),
        playlist::delete_playlist(),
        playlist::add_to_playlist(),
        playlist::remove_song(),
        admin::reload_progress_bars(),
    ]
}

async fn reply_error(ctx: Context<'_>, message: &str) -> Result<(), Error> {
    ctx.send(
        CreateReply::default()
            .embed(embed::error(message))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

async fn reply_success(ctx: Context<'_>, message: &str) -> Result<(), Error> {
    ctx.send(
        CreateReply::default()
            .embed(embed::success(message))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Reports a voice or player failure to the user if it is theirs to fix.
async fn reply_voice_error(ctx: Context<'_>, err: VoiceError) -> Result<(), Error> {
    match err {
        VoiceError::Music(e) if !e.is_user_facing() => Err(e.into()),
        e => reply_error(ctx, &e.to_string()).await,
    }
}

/// Answers a player request with `message` or the user-facing error.
async fn acknowledge<T>(
    ctx: Context<'_>,
    result: Result<T, MusicError>,
    message: impl FnOnce(T) -> String,
) -> Result<(), Error> {
    match result {
        Ok(value) => reply_success(ctx, &message(value)).await,
        Err(e) => reply_voice_error(ctx, e.into()).await,
    }
}

/// The guild's player if the author may control it; otherwise replies and returns `None`.
async fn controllable_player(ctx: Context<'_>) -> Result<Option<PlayerHandle>, Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in a server")?;
    match voice::controllable_player(ctx.serenity_context(), ctx.data(), guild_id, ctx.author().id)
        .await
    {
        Ok(handle) => Ok(Some(handle)),
        Err(e) => {
            reply_voice_error(ctx, e).await?;
            Ok(None)
        }
    }
}
