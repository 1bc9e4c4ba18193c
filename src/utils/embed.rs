use serenity::builder::{CreateEmbed, CreateEmbedFooter};

use crate::music::presenter::PlayerView;
use crate::music::progress::{format_duration, text_bar};

const PLAYER_COLOR: u32 = 0x8E4CD0;
const SUCCESS_COLOR: u32 = 0x57F287;
const ERROR_COLOR: u32 = 0xED4245;

pub fn player(view: &PlayerView) -> CreateEmbed {
    let mut embed = CreateEmbed::new().title("Now Playing").color(PLAYER_COLOR);

    embed = match &view.now_playing {
        Some(track) => {
            let mut description = format!("[{}]({})", track.title, track.webpage_url);
            if view.progress_image.is_none() {
                description.push_str(&format!("\n{}", text_bar(track.percentage)));
            }
            embed
                .description(description)
                .field("Duration", format_duration(track.duration_seconds), true)
        }
        None => embed.description("No song currently playing."),
    };

    if let Some(url) = &view.progress_image {
        embed = embed.image(url);
    }

    let mut status = Vec::new();
    if view.paused {
        status.push("⏸ Paused");
    }
    if view.loop_enabled {
        status.push("🔁 Loop on");
    }
    if !view.controls_enabled {
        status.push("Disconnected");
    }

    embed = embed.field("Queue", view.queue_preview(), false);
    if !status.is_empty() {
        embed = embed.footer(CreateEmbedFooter::new(status.join(" · ")));
    }
    embed
}

pub fn success(message: &str) -> CreateEmbed {
    CreateEmbed::new().description(message).color(SUCCESS_COLOR)
}

pub fn info(title: &str, message: &str) -> CreateEmbed {
    CreateEmbed::new()
        .title(title)
        .description(message)
        .color(PLAYER_COLOR)
}

pub fn error(message: &str) -> CreateEmbed {
    CreateEmbed::new()
        .title("❌ Error")
        .description(message)
        .color(ERROR_COLOR)
}
