use serenity::builder::{
    CreateActionRow, CreateButton, CreateSelectMenu, CreateSelectMenuKind,
    CreateSelectMenuOption,
};
use serenity::model::application::ButtonStyle;

use crate::music::presenter::PlayerView;
use crate::music::Track;
use crate::store::SavedSong;

pub const PREVIOUS: &str = "music_previous";
pub const PAUSE: &str = "music_pause";
pub const NEXT: &str = "music_next";
pub const LOOP: &str = "music_loop";
pub const SHUFFLE: &str = "music_shuffle";
pub const STOP_CONFIRM: &str = "music_stop_confirm";
pub const STOP_CANCEL: &str = "music_stop_cancel";
pub const QUEUE_REMOVE: &str = "music_queue_remove";
pub const PLAYLIST_SONG_REMOVE: &str = "playlist_song_remove:";

/// Discord caps select menus at 25 options.
pub const SELECT_LIMIT: usize = 25;

pub fn player_controls(view: &PlayerView) -> Vec<CreateActionRow> {
    let disabled = !view.controls_enabled;
    let loop_style = if view.loop_enabled {
        ButtonStyle::Success
    } else {
        ButtonStyle::Secondary
    };
    let pause_style = if view.paused {
        ButtonStyle::Success
    } else {
        ButtonStyle::Primary
    };

    vec![CreateActionRow::Buttons(vec![
        CreateButton::new(PREVIOUS)
            .emoji('⏮')
            .style(ButtonStyle::Secondary)
            .disabled(disabled),
        CreateButton::new(PAUSE)
            .emoji('⏯')
            .style(pause_style)
            .disabled(disabled),
        CreateButton::new(NEXT)
            .emoji('⏭')
            .style(ButtonStyle::Secondary)
            .disabled(disabled),
        CreateButton::new(LOOP)
            .emoji('🔁')
            .style(loop_style)
            .disabled(disabled),
        CreateButton::new(SHUFFLE)
            .emoji('🔀')
            .style(ButtonStyle::Secondary)
            .disabled(disabled),
    ])]
}

pub fn stop_confirmation() -> Vec<CreateActionRow> {
    vec![CreateActionRow::Buttons(vec![
        CreateButton::new(STOP_CONFIRM)
            .label("Stop")
            .style(ButtonStyle::Danger),
        CreateButton::new(STOP_CANCEL)
            .label("Cancel")
            .style(ButtonStyle::Secondary),
    ])]
}

pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars - 3).collect();
        format!("{truncated}...")
    }
}

/// Select menu over the first queued tracks; option values are queue indices.
pub fn queue_remove_menu(queue: &[Track]) -> Vec<CreateActionRow> {
    let options: Vec<CreateSelectMenuOption> = queue
        .iter()
        .take(SELECT_LIMIT)
        .enumerate()
        .map(|(i, track)| {
            CreateSelectMenuOption::new(
                truncate_str(&format!("{}. {}", i + 1, track.title), 100),
                i.to_string(),
            )
        })
        .collect();

    let placeholder = if queue.len() > SELECT_LIMIT {
        format!("Remove a song (first {SELECT_LIMIT} of {})", queue.len())
    } else {
        "Remove a song".to_string()
    };

    let menu = CreateSelectMenu::new(QUEUE_REMOVE, CreateSelectMenuKind::String { options })
        .placeholder(placeholder);
    vec![CreateActionRow::SelectMenu(menu)]
}

/// Select menu over a saved playlist; option values are song URLs.
pub fn playlist_song_menu(playlist: &str, songs: &[SavedSong]) -> Vec<CreateActionRow> {
    let options: Vec<CreateSelectMenuOption> = songs
        .iter()
        .take(SELECT_LIMIT)
        .map(|song| {
            CreateSelectMenuOption::new(truncate_str(&song.title, 100), song.url.clone())
        })
        .collect();

    let menu = CreateSelectMenu::new(
        format!("{PLAYLIST_SONG_REMOVE}{playlist}"),
        CreateSelectMenuKind::String { options },
    )
    .placeholder(truncate_str(&format!("Remove a song from {playlist}"), 150));
    vec![CreateActionRow::SelectMenu(menu)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("short", 10), "short");
        assert_eq!(truncate_str("abcdefghij", 10), "abcdefghij");
        assert_eq!(truncate_str("abcdefghijk", 10), "abcdefg...");
        assert_eq!(truncate_str("àèìòùàèìòùà", 10), "àèìòùàè...");
    }
}
