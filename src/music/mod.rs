pub mod error;
pub mod player;
pub mod presenter;
pub mod progress;
pub mod queue;
pub mod session;
pub mod source;

use std::collections::HashMap;
use std::sync::Arc;

use serenity::model::id::GuildId;
use tokio::sync::RwLock;

pub use error::MusicError;
pub use session::{PlayerHandle, PlayerParts, PlayerSettings, QueueSnapshot};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
    /// Extractor id, used to name the scratch file. Unknown for saved playlist songs.
    pub source_id: Option<String>,
    pub source_url: String,
    pub title: String,
    pub duration_seconds: u64,
    pub webpage_url: String,
}

impl Track {
    /// A song saved in a playlist only carries its title and page URL.
    pub fn from_saved(title: String, url: String) -> Self {
        Self {
            source_id: None,
            source_url: url.clone(),
            title,
            duration_seconds: 0,
            webpage_url: url,
        }
    }
}

/// Live player sessions, one per guild.
#[derive(Clone, Default)]
pub struct PlayerRegistry {
    sessions: Arc<RwLock<HashMap<GuildId, PlayerHandle>>>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The running session for `guild_id`, if its task is still alive.
    pub async fn get(&self, guild_id: GuildId) -> Option<PlayerHandle> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&guild_id)
            .filter(|handle| !handle.is_closed())
            .cloned()
    }

    /// Returns the running session or spawns a new one from `parts`.
    ///
    /// `parts` is only invoked when a session has to be created.
    pub async fn get_or_spawn<F>(
        &self,
        guild_id: GuildId,
        settings: &PlayerSettings,
        parts: F,
    ) -> PlayerHandle
    where
        F: FnOnce() -> PlayerParts,
    {
        let mut sessions = self.sessions.write().await;
        if let Some(handle) = sessions.get(&guild_id).filter(|h| !h.is_closed()) {
            return handle.clone();
        }

        let handle = session::spawn(guild_id, settings.clone(), parts());
        sessions.insert(guild_id, handle.clone());
        handle
    }

    pub async fn remove(&self, guild_id: GuildId) -> Option<PlayerHandle> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&guild_id)
    }
}
