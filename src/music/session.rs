//! Per-guild player task.
//!
//! Every command, button press, download result and sink completion for a
//! guild is a [`Control`] message on one inbox, applied in arrival order by a
//! single task that owns the [`PlaybackState`]. Each playback start gets a
//! fresh token; completions and downloads carrying an older token are stale
//! and ignored, so stopping a track to jump elsewhere never advances twice.

use std::future::pending;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serenity::model::id::GuildId;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::error::MusicError;
use super::presenter::{PlayerView, Presenter, PresenterPhase, StatusSurface};
use super::progress::ProgressBars;
use super::queue::PlaybackState;
use super::source::{FetchedAudio, TrackFetcher};
use super::Track;

/// Plays local files and reports back exactly once per started file.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&self, path: &Path, done: PlaybackDone) -> Result<(), MusicError>;
    async fn stop(&self);
    async fn set_paused(&self, paused: bool);
    async fn disconnect(&self);
}

/// Completion callback handed to the sink for one playback start.
#[derive(Clone)]
pub struct PlaybackDone {
    token: u64,
    inbox: mpsc::UnboundedSender<Control>,
}

impl PlaybackDone {
    pub fn finish(&self, error: Option<String>) {
        let _ = self.inbox.send(Control::TrackEnded {
            token: self.token,
            error,
        });
    }
}

#[derive(Clone, Debug)]
pub struct PlayerSettings {
    pub progress_interval: Duration,
    pub idle_timeout: Duration,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            progress_interval: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(120),
        }
    }
}

pub struct PlayerParts {
    pub sink: Arc<dyn AudioSink>,
    pub fetcher: Arc<dyn TrackFetcher>,
    pub surface: Arc<dyn StatusSurface>,
    pub progress_bars: Arc<ProgressBars>,
}

#[derive(Clone, Debug)]
pub struct QueueSnapshot {
    pub now_playing: Option<Track>,
    pub queue: Vec<Track>,
    pub history_len: usize,
    pub loop_enabled: bool,
    pub paused: bool,
    pub percentage: u8,
}

type Reply<T> = oneshot::Sender<Result<T, MusicError>>;

enum Control {
    Enqueue {
        tracks: Vec<Track>,
        replace: bool,
        reply: Reply<usize>,
    },
    Previous {
        reply: Reply<Track>,
    },
    Skip {
        reply: Reply<()>,
    },
    TogglePause {
        reply: Reply<bool>,
    },
    ToggleLoop {
        reply: Reply<bool>,
    },
    Shuffle {
        reply: Reply<bool>,
    },
    ClearQueue {
        reply: Reply<usize>,
    },
    RemoveAt {
        index: usize,
        reply: Reply<Track>,
    },
    Snapshot {
        reply: Reply<QueueSnapshot>,
    },
    Stop {
        reply: Reply<()>,
    },
    Fetched {
        token: u64,
        result: Result<FetchedAudio, MusicError>,
    },
    TrackEnded {
        token: u64,
        error: Option<String>,
    },
}

/// Cheap handle to a guild's player task.
#[derive(Clone)]
pub struct PlayerHandle {
    guild_id: GuildId,
    inbox: mpsc::UnboundedSender<Control>,
}

impl PlayerHandle {
    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn is_closed(&self) -> bool {
        self.inbox.is_closed()
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Control) -> Result<T, MusicError> {
        let (tx, rx) = oneshot::channel();
        self.inbox
            .send(make(tx))
            .map_err(|_| MusicError::NotRunning)?;
        rx.await.map_err(|_| MusicError::NotRunning)?
    }

    /// Appends tracks; returns the queue length afterwards. A track that
    /// started playing right away no longer counts as queued.
    pub async fn enqueue(&self, tracks: Vec<Track>) -> Result<usize, MusicError> {
        self.request(|reply| Control::Enqueue {
            tracks,
            replace: false,
            reply,
        })
        .await
    }

    pub async fn replace_queue(&self, tracks: Vec<Track>) -> Result<usize, MusicError> {
        self.request(|reply| Control::Enqueue {
            tracks,
            replace: true,
            reply,
        })
        .await
    }

    pub async fn previous(&self) -> Result<Track, MusicError> {
        self.request(|reply| Control::Previous { reply }).await
    }

    pub async fn skip(&self) -> Result<(), MusicError> {
        self.request(|reply| Control::Skip { reply }).await
    }

    /// Returns true when the player is paused afterwards.
    pub async fn toggle_pause(&self) -> Result<bool, MusicError> {
        self.request(|reply| Control::TogglePause { reply }).await
    }

    pub async fn toggle_loop(&self) -> Result<bool, MusicError> {
        self.request(|reply| Control::ToggleLoop { reply }).await
    }

    pub async fn shuffle(&self) -> Result<bool, MusicError> {
        self.request(|reply| Control::Shuffle { reply }).await
    }

    pub async fn clear_queue(&self) -> Result<usize, MusicError> {
        self.request(|reply| Control::ClearQueue { reply }).await
    }

    pub async fn remove_at(&self, index: usize) -> Result<Track, MusicError> {
        self.request(|reply| Control::RemoveAt { index, reply }).await
    }

    pub async fn snapshot(&self) -> Result<QueueSnapshot, MusicError> {
        self.request(|reply| Control::Snapshot { reply }).await
    }

    pub async fn stop(&self) -> Result<(), MusicError> {
        self.request(|reply| Control::Stop { reply }).await
    }
}

enum Playback {
    Stopped,
    Fetching { token: u64 },
    Playing { token: u64, path: PathBuf },
}

struct PlayerTask {
    guild_id: GuildId,
    settings: PlayerSettings,
    state: PlaybackState,
    playback: Playback,
    last_token: u64,
    idle_deadline: Option<Instant>,
    sink: Arc<dyn AudioSink>,
    fetcher: Arc<dyn TrackFetcher>,
    progress_bars: Arc<ProgressBars>,
    presenter: Presenter,
    inbox: mpsc::UnboundedSender<Control>,
}

pub fn spawn(guild_id: GuildId, settings: PlayerSettings, parts: PlayerParts) -> PlayerHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let task = PlayerTask {
        guild_id,
        settings,
        state: PlaybackState::new(),
        playback: Playback::Stopped,
        last_token: 0,
        idle_deadline: None,
        sink: parts.sink,
        fetcher: parts.fetcher,
        progress_bars: parts.progress_bars,
        presenter: Presenter::new(parts.surface),
        inbox: tx.clone(),
    };
    tokio::spawn(task.run(rx));
    info!("player started (guild: {guild_id})");

    PlayerHandle {
        guild_id,
        inbox: tx,
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

impl PlayerTask {
    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<Control>) {
        let interval = self.settings.progress_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let idle_deadline = self.idle_deadline;
            tokio::select! {
                control = inbox.recv() => {
                    let Some(control) = control else { break };
                    if self.handle(control).await.is_break() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if self.ticking() {
                        self.render().await;
                    }
                }
                _ = sleep_until_deadline(idle_deadline) => {
                    info!("idle timeout, leaving voice (guild: {})", self.guild_id);
                    self.teardown().await;
                    break;
                }
            }
        }

        // Downloads that finished before the task stopped are still queued.
        inbox.close();
        while let Ok(control) = inbox.try_recv() {
            if let Control::Fetched {
                result: Ok(fetched),
                ..
            } = control
            {
                self.fetcher.discard(&fetched.path).await;
            }
        }

        debug!("player task finished (guild: {})", self.guild_id);
    }

    fn ticking(&self) -> bool {
        self.presenter.phase() == PresenterPhase::Displaying
            && self.state.now_playing().is_some()
            && !self.state.is_paused()
    }

    async fn handle(&mut self, control: Control) -> ControlFlow<()> {
        match control {
            Control::Enqueue {
                tracks,
                replace,
                reply,
            } => {
                if replace {
                    self.state.replace_queue(tracks);
                } else {
                    for track in tracks {
                        self.state.enqueue(track);
                    }
                }
                self.idle_deadline = None;

                if self.state.now_playing().is_none() && matches!(self.playback, Playback::Stopped)
                {
                    self.advance_and_play().await;
                }
                let _ = reply.send(Ok(self.state.queue().len()));

                let view = self.view();
                self.presenter.show(&view).await;
            }
            Control::Previous { reply } => {
                let previous = self.state.go_previous().cloned();
                match previous {
                    Ok(track) => {
                        self.idle_deadline = None;
                        self.begin_current().await;
                        let _ = reply.send(Ok(track));
                        self.render().await;
                    }
                    Err(e) => {
                        let _ = reply.send(Err(e));
                    }
                }
            }
            Control::Skip { reply } => {
                if let Err(e) = self.state.check_skip() {
                    let _ = reply.send(Err(e));
                    return ControlFlow::Continue(());
                }

                match self.playback {
                    // The sink's completion for this token does the advancing.
                    Playback::Playing { .. } => self.sink.stop().await,
                    Playback::Fetching { .. } | Playback::Stopped => {
                        self.advance_and_play().await;
                    }
                }
                let _ = reply.send(Ok(()));
                self.render().await;
            }
            Control::TogglePause { reply } => {
                if self.state.now_playing().is_none() {
                    let _ = reply.send(Err(MusicError::NothingPlaying));
                    return ControlFlow::Continue(());
                }

                let now = Instant::now();
                let paused = !self.state.is_paused();
                if paused {
                    self.state.pause_at(now);
                } else {
                    self.state.resume_at(now);
                }
                self.sink.set_paused(paused).await;
                let _ = reply.send(Ok(paused));
                self.render().await;
            }
            Control::ToggleLoop { reply } => {
                let _ = reply.send(Ok(self.state.toggle_loop()));
                self.render().await;
            }
            Control::Shuffle { reply } => {
                let _ = reply.send(Ok(self.state.shuffle()));
                self.render().await;
            }
            Control::ClearQueue { reply } => {
                let _ = reply.send(Ok(self.state.clear_queue()));
                self.render().await;
            }
            Control::RemoveAt { index, reply } => {
                let result = self.state.remove_at(index);
                let changed = result.is_ok();
                let _ = reply.send(result);
                if changed {
                    self.render().await;
                }
            }
            Control::Snapshot { reply } => {
                let _ = reply.send(Ok(self.snapshot()));
            }
            Control::Stop { reply } => {
                self.teardown().await;
                let _ = reply.send(Ok(()));
                return ControlFlow::Break(());
            }
            Control::Fetched { token, result } => self.on_fetched(token, result).await,
            Control::TrackEnded { token, error } => self.on_track_ended(token, error).await,
        }

        ControlFlow::Continue(())
    }

    async fn on_fetched(&mut self, token: u64, result: Result<FetchedAudio, MusicError>) {
        if !matches!(self.playback, Playback::Fetching { token: current } if current == token) {
            debug!("ignoring stale download result (token {token})");
            if let Ok(fetched) = result {
                self.discard_unless_playing(&fetched.path).await;
            }
            return;
        }

        let FetchedAudio {
            path,
            duration_seconds,
        } = match result {
            Ok(fetched) => fetched,
            Err(e) => {
                error!("download failed (guild: {}): {e}", self.guild_id);
                self.skip_unplayable().await;
                return;
            }
        };

        let done = PlaybackDone {
            token,
            inbox: self.inbox.clone(),
        };
        match self.sink.play(&path, done).await {
            Ok(()) => {
                if let Some(seconds) = duration_seconds {
                    self.state.fill_duration(seconds);
                }
                self.state.restart_clock_at(Instant::now());
                if let Some(track) = self.state.now_playing() {
                    info!("now playing: {}", track.title);
                }
                self.playback = Playback::Playing { token, path };
                self.render().await;
            }
            Err(e) => {
                error!("playback failed (guild: {}): {e}", self.guild_id);
                self.fetcher.discard(&path).await;
                self.skip_unplayable().await;
            }
        }
    }

    async fn on_track_ended(&mut self, token: u64, error: Option<String>) {
        let path = match &self.playback {
            Playback::Playing {
                token: current,
                path,
            } if *current == token => path.clone(),
            _ => {
                debug!("ignoring stale completion (token {token})");
                return;
            }
        };

        if let Some(e) = error {
            warn!("track ended with error (guild: {}): {e}", self.guild_id);
            self.fetcher.discard(&path).await;
            self.skip_unplayable().await;
            return;
        }
        if !self.state.loop_enabled() {
            self.fetcher.discard(&path).await;
        }

        self.playback = Playback::Stopped;
        self.advance_and_play().await;
        self.render().await;
    }

    /// Treats an unplayable track as finished without letting loop replay it.
    async fn skip_unplayable(&mut self) {
        self.state.retire_current();
        self.playback = Playback::Stopped;
        self.advance_and_play().await;
        self.render().await;
    }

    async fn discard_unless_playing(&self, path: &Path) {
        let in_use = matches!(
            &self.playback,
            Playback::Playing { path: current, .. } if current == path
        );
        if !in_use {
            self.fetcher.discard(path).await;
        }
    }

    async fn advance_and_play(&mut self) {
        if self.state.advance().is_some() {
            self.begin_current().await;
        } else {
            self.playback = Playback::Stopped;
            self.idle_deadline = Some(Instant::now() + self.settings.idle_timeout);
            debug!("queue drained (guild: {})", self.guild_id);
        }
    }

    /// Starts downloading the now-playing track under a fresh token.
    async fn begin_current(&mut self) {
        let Some(track) = self.state.now_playing().cloned() else {
            return;
        };

        self.last_token += 1;
        let token = self.last_token;
        let previous = std::mem::replace(&mut self.playback, Playback::Fetching { token });
        if matches!(previous, Playback::Playing { .. }) {
            self.sink.stop().await;
        }

        let fetcher = Arc::clone(&self.fetcher);
        let inbox = self.inbox.clone();
        tokio::spawn(async move {
            let result = fetcher.fetch(&track).await;
            // The player is gone; nobody will play or delete this file.
            if let Err(mpsc::error::SendError(Control::Fetched {
                result: Ok(fetched),
                ..
            })) = inbox.send(Control::Fetched { token, result })
            {
                fetcher.discard(&fetched.path).await;
            }
        });
    }

    fn view(&self) -> PlayerView {
        PlayerView::from_state(&self.state, &self.progress_bars, Instant::now())
    }

    async fn render(&mut self) {
        let view = self.view();
        self.presenter.refresh(&view).await;
    }

    fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            now_playing: self.state.now_playing().cloned(),
            queue: self.state.queue().iter().cloned().collect(),
            history_len: self.state.history().len(),
            loop_enabled: self.state.loop_enabled(),
            paused: self.state.is_paused(),
            percentage: self.state.percentage_at(Instant::now()),
        }
    }

    async fn teardown(&mut self) {
        self.last_token += 1;
        if let Playback::Playing { path, .. } =
            std::mem::replace(&mut self.playback, Playback::Stopped)
        {
            self.sink.stop().await;
            self.fetcher.discard(&path).await;
        }

        self.state.reset();
        self.idle_deadline = None;

        let view = PlayerView::idle(&self.progress_bars).retired();
        self.presenter.retire(&view).await;
        self.sink.disconnect().await;
        info!("player stopped (guild: {})", self.guild_id);
    }
}
