use std::sync::Arc;

use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use serenity::builder::{CreateMessage, EditMessage};
use serenity::model::id::{ChannelId, MessageId};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::error::MusicError;
use super::progress::ProgressBars;
use super::queue::PlaybackState;
use crate::utils::{components, embed};

const QUEUE_PREVIEW_LEN: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NowPlayingView {
    pub title: String,
    pub webpage_url: String,
    pub percentage: u8,
    pub duration_seconds: u64,
}

/// Everything the status message shows, detached from Discord types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerView {
    pub now_playing: Option<NowPlayingView>,
    pub upcoming: Vec<String>,
    pub queued: usize,
    pub loop_enabled: bool,
    pub paused: bool,
    pub progress_image: Option<String>,
    pub controls_enabled: bool,
}

impl PlayerView {
    pub fn from_state(state: &PlaybackState, bars: &ProgressBars, now: Instant) -> Self {
        let Some(track) = state.now_playing() else {
            let mut idle = Self::idle(bars);
            idle.loop_enabled = state.loop_enabled();
            return idle;
        };

        let percentage = state.percentage_at(now);
        Self {
            now_playing: Some(NowPlayingView {
                title: track.title.clone(),
                webpage_url: track.webpage_url.clone(),
                percentage,
                duration_seconds: track.duration_seconds,
            }),
            upcoming: state
                .queue()
                .iter()
                .take(QUEUE_PREVIEW_LEN)
                .map(|t| t.title.clone())
                .collect(),
            queued: state.queue().len(),
            loop_enabled: state.loop_enabled(),
            paused: state.is_paused(),
            progress_image: bars.url_for(percentage),
            controls_enabled: true,
        }
    }

    pub fn idle(bars: &ProgressBars) -> Self {
        Self {
            now_playing: None,
            upcoming: Vec::new(),
            queued: 0,
            loop_enabled: false,
            paused: false,
            progress_image: bars.url_for(100),
            controls_enabled: true,
        }
    }

    pub fn retired(mut self) -> Self {
        self.controls_enabled = false;
        self
    }

    pub fn is_idle(&self) -> bool {
        self.now_playing.is_none()
    }

    pub fn queue_preview(&self) -> String {
        if self.upcoming.is_empty() {
            return "Use `/play` to add a Song!".to_string();
        }

        let mut preview = String::new();
        for (i, title) in self.upcoming.iter().enumerate() {
            preview.push_str(&format!("{}. {title}\n", i + 1));
        }
        if self.queued > self.upcoming.len() {
            preview.push_str(&format!(
                "...and {} more!",
                self.queued - self.upcoming.len()
            ));
        }
        preview
    }
}

/// Where the status message lives. Posting returns the handle later edits use.
#[async_trait]
pub trait StatusSurface: Send + Sync {
    async fn post(&self, view: &PlayerView) -> Result<MessageId, MusicError>;
    async fn edit(&self, message: MessageId, view: &PlayerView) -> Result<(), MusicError>;
}

/// Status message posted in a guild text channel.
pub struct ChannelSurface {
    http: Arc<serenity::Http>,
    channel_id: ChannelId,
}

impl ChannelSurface {
    pub fn new(http: Arc<serenity::Http>, channel_id: ChannelId) -> Self {
        Self { http, channel_id }
    }
}

fn surface_error(err: serenity::Error) -> MusicError {
    if let serenity::Error::Http(http_err) = &err {
        if http_err.status_code().map(|s| s.as_u16()) == Some(404) {
            return MusicError::DisplayNotFound;
        }
    }
    MusicError::DisplayFailed(err.to_string())
}

#[async_trait]
impl StatusSurface for ChannelSurface {
    async fn post(&self, view: &PlayerView) -> Result<MessageId, MusicError> {
        let message = CreateMessage::new()
            .embed(embed::player(view))
            .components(components::player_controls(view));
        self.channel_id
            .send_message(&*self.http, message)
            .await
            .map(|m| m.id)
            .map_err(surface_error)
    }

    async fn edit(&self, message: MessageId, view: &PlayerView) -> Result<(), MusicError> {
        let edit = EditMessage::new()
            .embed(embed::player(view))
            .components(components::player_controls(view));
        self.channel_id
            .edit_message(&*self.http, message, edit)
            .await
            .map(|_| ())
            .map_err(surface_error)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresenterPhase {
    NoMessage,
    Displaying,
    Idle,
}

/// Keeps at most one live status message and edits it in place.
pub struct Presenter {
    surface: Arc<dyn StatusSurface>,
    message: Option<MessageId>,
    phase: PresenterPhase,
}

impl Presenter {
    pub fn new(surface: Arc<dyn StatusSurface>) -> Self {
        Self {
            surface,
            message: None,
            phase: PresenterPhase::NoMessage,
        }
    }

    pub fn phase(&self) -> PresenterPhase {
        self.phase
    }

    pub fn message(&self) -> Option<MessageId> {
        self.message
    }

    /// Posts the status message if there is none yet, otherwise edits it.
    pub async fn show(&mut self, view: &PlayerView) {
        if self.message.is_some() {
            self.refresh(view).await;
            return;
        }

        match self.surface.post(view).await {
            Ok(id) => {
                self.message = Some(id);
                self.phase = phase_for(view);
            }
            Err(e) => warn!("failed to post player message: {e}"),
        }
    }

    /// Edits the existing message. Without one this does nothing.
    pub async fn refresh(&mut self, view: &PlayerView) {
        let Some(id) = self.message else {
            return;
        };

        match self.surface.edit(id, view).await {
            Ok(()) => self.phase = phase_for(view),
            Err(MusicError::DisplayNotFound) => {
                debug!("player message {id} was deleted, dropping handle");
                self.message = None;
                self.phase = PresenterPhase::NoMessage;
            }
            Err(e) => warn!("failed to edit player message: {e}"),
        }
    }

    /// Final edit with the controls disabled; the handle is released either way.
    pub async fn retire(&mut self, view: &PlayerView) {
        if let Some(id) = self.message.take() {
            if let Err(e) = self.surface.edit(id, view).await {
                debug!("could not retire player message {id}: {e}");
            }
        }
        self.phase = PresenterPhase::NoMessage;
    }
}

fn phase_for(view: &PlayerView) -> PresenterPhase {
    if view.is_idle() {
        PresenterPhase::Idle
    } else {
        PresenterPhase::Displaying
    }
}
