use poise::serenity_prelude as serenity;
use serenity::builder::{
    CreateEmbed, CreateInteractionResponse, CreateInteractionResponseMessage,
};
use serenity::model::application::{ComponentInteraction, ComponentInteractionDataKind};
use serenity::model::id::GuildId;
use tracing::{error, info};

use crate::music::{MusicError, PlayerHandle};
use crate::utils::voice::{self, VoiceError};
use crate::utils::{components, embed};
use crate::{Data, Error};

async fn respond_ephemeral(
    ctx: &serenity::Context,
    interaction: &ComponentInteraction,
    message: &str,
) -> Result<(), Error> {
    let response = CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .embed(embed::error(message))
            .ephemeral(true),
    );
    interaction.create_response(&ctx.http, response).await?;
    Ok(())
}

/// Replaces the interacted message and drops its components.
async fn update_message(
    ctx: &serenity::Context,
    interaction: &ComponentInteraction,
    embed: CreateEmbed,
) -> Result<(), Error> {
    let response = CreateInteractionResponse::UpdateMessage(
        CreateInteractionResponseMessage::new()
            .embed(embed)
            .components(Vec::new()),
    );
    interaction.create_response(&ctx.http, response).await?;
    Ok(())
}

/// The player re-renders the status message itself; the press only needs acknowledging.
async fn acknowledge(ctx: &serenity::Context, interaction: &ComponentInteraction) -> Result<(), Error> {
    interaction
        .create_response(&ctx.http, CreateInteractionResponse::Acknowledge)
        .await?;
    Ok(())
}

async fn report(
    ctx: &serenity::Context,
    interaction: &ComponentInteraction,
    err: VoiceError,
) -> Result<(), Error> {
    match err {
        VoiceError::Music(e) if !e.is_user_facing() => Err(e.into()),
        e => respond_ephemeral(ctx, interaction, &e.to_string()).await,
    }
}

fn selected_value(interaction: &ComponentInteraction) -> Option<&str> {
    match &interaction.data.kind {
        ComponentInteractionDataKind::StringSelect { values } => {
            values.first().map(String::as_str)
        }
        _ => None,
    }
}

pub async fn handle(
    ctx: &serenity::Context,
    interaction: &ComponentInteraction,
    data: &Data,
) -> Result<(), Error> {
    let custom_id = interaction.data.custom_id.as_str();

    if let Some(playlist) = custom_id.strip_prefix(components::PLAYLIST_SONG_REMOVE) {
        return remove_playlist_song(ctx, interaction, data, playlist).await;
    }
    if custom_id == components::STOP_CANCEL {
        return update_message(ctx, interaction, embed::success("Cancelled.")).await;
    }

    let is_player_control = [
        components::PREVIOUS,
        components::PAUSE,
        components::NEXT,
        components::LOOP,
        components::SHUFFLE,
        components::STOP_CONFIRM,
        components::QUEUE_REMOVE,
    ]
    .contains(&custom_id);
    if !is_player_control {
        return Ok(());
    }

    let guild_id = interaction
        .guild_id
        .ok_or("This button only works in a server")?;
    let player =
        match voice::controllable_player(ctx, data, guild_id, interaction.user.id).await {
            Ok(player) => player,
            Err(e) => return report(ctx, interaction, e).await,
        };

    info!(
        "button {custom_id} pressed by {} (guild: {guild_id})",
        interaction.user.name
    );

    match custom_id {
        components::STOP_CONFIRM => stop(ctx, interaction, data, guild_id, &player).await,
        components::QUEUE_REMOVE => remove_queued(ctx, interaction, &player).await,
        _ => {
            let result = match custom_id {
                components::PREVIOUS => player.previous().await.map(drop),
                components::PAUSE => player.toggle_pause().await.map(drop),
                components::NEXT => player.skip().await,
                components::LOOP => player.toggle_loop().await.map(drop),
                _ => player.shuffle().await.map(drop),
            };
            match result {
                Ok(()) => acknowledge(ctx, interaction).await,
                Err(e) => report(ctx, interaction, e.into()).await,
            }
        }
    }
}

async fn stop(
    ctx: &serenity::Context,
    interaction: &ComponentInteraction,
    data: &Data,
    guild_id: GuildId,
    player: &PlayerHandle,
) -> Result<(), Error> {
    let result = player.stop().await;
    data.players.remove(guild_id).await;
    if let Err(e) = result {
        return report(ctx, interaction, e.into()).await;
    }

    update_message(
        ctx,
        interaction,
        embed::success("⏹ Stopped playback and left the voice channel."),
    )
    .await
}

async fn remove_queued(
    ctx: &serenity::Context,
    interaction: &ComponentInteraction,
    player: &PlayerHandle,
) -> Result<(), Error> {
    let Some(index) = selected_value(interaction).and_then(|v| v.parse::<usize>().ok()) else {
        return Ok(());
    };

    match player.remove_at(index).await {
        Ok(track) => {
            update_message(
                ctx,
                interaction,
                embed::success(&format!("Removed **{}** from the queue.", track.title)),
            )
            .await
        }
        Err(e @ MusicError::IndexOutOfRange { .. }) => {
            update_message(ctx, interaction, embed::error(&e.to_string())).await
        }
        Err(e) => report(ctx, interaction, e.into()).await,
    }
}

async fn remove_playlist_song(
    ctx: &serenity::Context,
    interaction: &ComponentInteraction,
    data: &Data,
    playlist: &str,
) -> Result<(), Error> {
    let Some(url) = selected_value(interaction) else {
        return Ok(());
    };
    let user_id = interaction.user.id.to_string();

    match data.store.remove_song(&user_id, playlist, url) {
        Ok(true) => {
            update_message(
                ctx,
                interaction,
                embed::success(&format!("Song removed from **{playlist}**.")),
            )
            .await
        }
        Ok(false) => {
            update_message(
                ctx,
                interaction,
                embed::error("That song is no longer in the playlist."),
            )
            .await
        }
        Err(e) => {
            error!("failed to remove a song from {playlist}: {e}");
            respond_ephemeral(
                ctx,
                interaction,
                "Something went wrong with your playlists. Try again later.",
            )
            .await
        }
    }
}
