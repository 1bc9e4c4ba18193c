use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use serenity::model::id::GuildId;
use songbird::events::{Event, EventContext, EventHandler, TrackEvent};
use songbird::input::{File, Input};
use songbird::tracks::{PlayMode, Track as SongbirdTrack, TrackHandle};
use songbird::{Call, Songbird};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::error::MusicError;
use super::session::{AudioSink, PlaybackDone};

struct TrackEndNotifier {
    done: PlaybackDone,
}

#[async_trait]
impl EventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let error = match ctx {
            EventContext::Track(tracks) => tracks.iter().find_map(|(state, _)| match &state.playing {
                PlayMode::Errored(e) => Some(format!("{e:?}")),
                _ => None,
            }),
            _ => None,
        };

        self.done.finish(error);
        None
    }
}

/// Voice connection of one guild.
pub struct SongbirdSink {
    guild_id: GuildId,
    manager: Arc<Songbird>,
    call: Arc<Mutex<Call>>,
    current: StdMutex<Option<TrackHandle>>,
}

impl SongbirdSink {
    pub fn new(guild_id: GuildId, manager: Arc<Songbird>, call: Arc<Mutex<Call>>) -> Self {
        Self {
            guild_id,
            manager,
            call,
            current: StdMutex::new(None),
        }
    }

    fn current(&self) -> Option<TrackHandle> {
        self.current.lock().ok().and_then(|guard| guard.clone())
    }

    fn set_current(&self, handle: Option<TrackHandle>) {
        if let Ok(mut guard) = self.current.lock() {
            *guard = handle;
        }
    }
}

#[async_trait]
impl AudioSink for SongbirdSink {
    async fn play(&self, path: &Path, done: PlaybackDone) -> Result<(), MusicError> {
        let input: Input = File::new(path.to_path_buf()).into();

        let track_handle = {
            let mut handler = self.call.lock().await;
            handler.play_only(SongbirdTrack::new(input))
        }; // handler lock dropped here

        // End fires on natural end and on stop; Error on decode failure.
        for event in [TrackEvent::End, TrackEvent::Error] {
            track_handle
                .add_event(
                    Event::Track(event),
                    TrackEndNotifier { done: done.clone() },
                )
                .map_err(|e| MusicError::Sink(e.to_string()))?;
        }

        self.set_current(Some(track_handle));
        debug!("sink playing {} (guild: {})", path.display(), self.guild_id);
        Ok(())
    }

    async fn stop(&self) {
        if let Some(handle) = self.current() {
            let _ = handle.stop();
        }
    }

    async fn set_paused(&self, paused: bool) {
        if let Some(handle) = self.current() {
            let result = if paused { handle.pause() } else { handle.play() };
            if let Err(e) = result {
                warn!("failed to toggle pause (guild: {}): {e}", self.guild_id);
            }
        }
    }

    async fn disconnect(&self) {
        self.set_current(None);
        if let Err(e) = self.manager.remove(self.guild_id).await {
            debug!("voice disconnect (guild: {}): {e}", self.guild_id);
        }
    }
}
