use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pebble_bot::music::presenter::{PlayerView, StatusSurface};
use pebble_bot::music::progress::ProgressBars;
use pebble_bot::music::queue::PlaybackState;
use pebble_bot::music::session::{self, AudioSink, PlaybackDone};
use pebble_bot::music::source::{FetchedAudio, TrackFetcher};
use pebble_bot::music::{
    MusicError, PlayerHandle, PlayerParts, PlayerRegistry, PlayerSettings, Track,
};
use serenity::model::id::{GuildId, MessageId};
use tokio::time::Instant;

fn test_track(name: &str, duration_seconds: u64) -> Track {
    Track {
        source_id: Some(name.to_lowercase()),
        source_url: format!("https://youtube.com/watch?v={name}"),
        title: name.to_string(),
        duration_seconds,
        webpage_url: format!("https://youtube.com/watch?v={name}"),
    }
}

fn scratch_path(title: &str) -> PathBuf {
    PathBuf::from(format!("/scratch/{}.m4a", title.to_lowercase()))
}

#[derive(Default)]
struct FakeSink {
    played: Mutex<Vec<PathBuf>>,
    current: Mutex<Option<PlaybackDone>>,
    paused: AtomicBool,
    disconnected: AtomicBool,
}

impl FakeSink {
    fn played(&self) -> Vec<PathBuf> {
        self.played.lock().unwrap().clone()
    }

    /// The current track plays to its natural end.
    fn finish_current(&self) {
        if let Some(done) = self.current.lock().unwrap().take() {
            done.finish(None);
        }
    }

    /// The voice driver gives up on the current track mid-stream.
    fn fail_current(&self, message: &str) {
        if let Some(done) = self.current.lock().unwrap().take() {
            done.finish(Some(message.to_string()));
        }
    }
}

#[async_trait]
impl AudioSink for FakeSink {
    async fn play(&self, path: &Path, done: PlaybackDone) -> Result<(), MusicError> {
        self.played.lock().unwrap().push(path.to_path_buf());
        *self.current.lock().unwrap() = Some(done);
        Ok(())
    }

    // Stopping reports completion, like the voice driver does.
    async fn stop(&self) {
        self.finish_current();
    }

    async fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    async fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct FakeFetcher {
    broken: HashSet<String>,
    delay: Option<Duration>,
    discarded: Mutex<Vec<PathBuf>>,
}

impl FakeFetcher {
    fn discarded(&self) -> Vec<PathBuf> {
        self.discarded.lock().unwrap().clone()
    }
}

#[async_trait]
impl TrackFetcher for FakeFetcher {
    async fn fetch(&self, track: &Track) -> Result<FetchedAudio, MusicError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.broken.contains(&track.title) {
            return Err(MusicError::Sink(format!("{} is unavailable", track.title)));
        }
        let mut fetched = FetchedAudio::new(scratch_path(&track.title));
        if track.duration_seconds == 0 {
            fetched.duration_seconds = Some(240);
        }
        Ok(fetched)
    }

    async fn discard(&self, path: &Path) {
        self.discarded.lock().unwrap().push(path.to_path_buf());
    }
}

#[derive(Default)]
struct FakeSurface {
    posts: AtomicUsize,
    edits: Mutex<Vec<PlayerView>>,
    deleted: AtomicBool,
}

impl FakeSurface {
    fn edit_count(&self) -> usize {
        self.edits.lock().unwrap().len()
    }

    fn last_edit(&self) -> Option<PlayerView> {
        self.edits.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl StatusSurface for FakeSurface {
    async fn post(&self, _view: &PlayerView) -> Result<MessageId, MusicError> {
        let n = self.posts.fetch_add(1, Ordering::SeqCst) as u64;
        self.deleted.store(false, Ordering::SeqCst);
        Ok(MessageId::new(1000 + n))
    }

    async fn edit(&self, _message: MessageId, view: &PlayerView) -> Result<(), MusicError> {
        if self.deleted.load(Ordering::SeqCst) {
            return Err(MusicError::DisplayNotFound);
        }
        self.edits.lock().unwrap().push(view.clone());
        Ok(())
    }
}

struct Harness {
    player: PlayerHandle,
    sink: Arc<FakeSink>,
    fetcher: Arc<FakeFetcher>,
    surface: Arc<FakeSurface>,
}

fn harness_with(fetcher: FakeFetcher) -> Harness {
    let sink = Arc::new(FakeSink::default());
    let fetcher = Arc::new(fetcher);
    let surface = Arc::new(FakeSurface::default());
    let parts = PlayerParts {
        sink: sink.clone(),
        fetcher: fetcher.clone(),
        surface: surface.clone(),
        progress_bars: Arc::new(ProgressBars::default()),
    };
    let player = session::spawn(GuildId::new(1), PlayerSettings::default(), parts);
    Harness {
        player,
        sink,
        fetcher,
        surface,
    }
}

fn harness() -> Harness {
    harness_with(FakeFetcher::default())
}

/// Lets the player task and its download tasks run until they are all waiting.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

async fn now_playing(player: &PlayerHandle) -> Option<String> {
    player
        .snapshot()
        .await
        .unwrap()
        .now_playing
        .map(|t| t.title)
}

async fn queued(player: &PlayerHandle) -> Vec<String> {
    player
        .snapshot()
        .await
        .unwrap()
        .queue
        .into_iter()
        .map(|t| t.title)
        .collect()
}

#[test]
fn test_queue_scenario_with_previous() {
    // enqueue A (100 s) and B (50 s), play, skip to B, then go back to A
    let t0 = Instant::now();
    let mut state = PlaybackState::new();
    state.enqueue(test_track("A", 100));
    state.enqueue(test_track("B", 50));
    assert!(state.now_playing().is_none());

    state.advance_at(t0);
    assert_eq!(state.now_playing().unwrap().title, "A");
    assert_eq!(state.queue().len(), 1);
    assert!(state.history().is_empty());
    assert_eq!(state.percentage_at(t0 + Duration::from_secs(50)), 50);

    assert!(state.check_skip().is_ok());
    state.advance_at(t0 + Duration::from_secs(50));
    assert_eq!(state.now_playing().unwrap().title, "B");
    assert_eq!(state.history()[0].title, "A");
    assert!(state.queue().is_empty());

    state.go_previous().unwrap();
    assert_eq!(state.now_playing().unwrap().title, "A");
    assert_eq!(state.queue()[0].title, "B");
    assert!(state.history().is_empty());

    // advance after previous restores B
    assert_eq!(state.advance().unwrap().title, "B");
}

#[test]
fn test_queue_length_accounting() {
    let mut state = PlaybackState::new();
    for name in ["A", "B", "C", "D"] {
        state.enqueue(test_track(name, 60));
    }
    state.advance();
    state.advance();
    state.remove_at(0).unwrap();
    assert!(state.remove_at(5).is_err());

    // 4 enqueued - 2 advances - 1 removal
    assert_eq!(state.queue().len(), 1);
    assert_eq!(state.queue()[0].title, "D");
}

#[test]
fn test_pause_does_not_count_towards_progress() {
    let t0 = Instant::now();
    let mut paused = PlaybackState::new();
    let mut straight = PlaybackState::new();
    paused.enqueue(test_track("A", 100));
    straight.enqueue(test_track("A", 100));
    paused.advance_at(t0);
    straight.advance_at(t0);

    paused.pause_at(t0 + Duration::from_secs(20));
    paused.resume_at(t0 + Duration::from_secs(35));

    assert_eq!(
        paused.percentage_at(t0 + Duration::from_secs(75)),
        straight.percentage_at(t0 + Duration::from_secs(60))
    );
}

#[tokio::test(start_paused = true)]
async fn test_play_skip_previous_flow() {
    // /play A, /play B, /next, /previous
    let h = harness();
    h.player
        .enqueue(vec![test_track("A", 100)])
        .await
        .unwrap();
    assert_eq!(h.player.enqueue(vec![test_track("B", 50)]).await.unwrap(), 1);
    settle().await;

    assert_eq!(now_playing(&h.player).await.as_deref(), Some("A"));
    assert_eq!(queued(&h.player).await, ["B"]);
    assert_eq!(h.sink.played(), [scratch_path("A")]);
    assert_eq!(h.surface.posts.load(Ordering::SeqCst), 1);

    h.player.skip().await.unwrap();
    settle().await;
    assert_eq!(now_playing(&h.player).await.as_deref(), Some("B"));
    assert!(queued(&h.player).await.is_empty());
    assert_eq!(h.fetcher.discarded.lock().unwrap().as_slice(), [scratch_path("A")]);

    let previous = h.player.previous().await.unwrap();
    assert_eq!(previous.title, "A");
    settle().await;

    // The completion reported by stopping B is stale and must not advance again.
    let snapshot = h.player.snapshot().await.unwrap();
    assert_eq!(snapshot.now_playing.unwrap().title, "A");
    assert_eq!(snapshot.queue.len(), 1);
    assert_eq!(snapshot.history_len, 0);
    assert_eq!(
        h.sink.played(),
        [scratch_path("A"), scratch_path("B"), scratch_path("A")]
    );
    assert_eq!(h.surface.posts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_user_facing_refusals() {
    let h = harness();
    assert!(matches!(h.player.skip().await, Err(MusicError::QueueEmpty)));
    assert!(matches!(h.player.previous().await, Err(MusicError::NoHistory)));
    assert!(matches!(
        h.player.toggle_pause().await,
        Err(MusicError::NothingPlaying)
    ));
    assert!(matches!(
        h.player.remove_at(0).await,
        Err(MusicError::IndexOutOfRange { index: 0, len: 0 })
    ));

    h.player.enqueue(vec![test_track("A", 60)]).await.unwrap();
    settle().await;
    // Only the current track, nothing to skip to
    assert!(matches!(h.player.skip().await, Err(MusicError::QueueEmpty)));
    assert_eq!(now_playing(&h.player).await.as_deref(), Some("A"));
}

#[tokio::test(start_paused = true)]
async fn test_loop_replays_current_song() {
    // /play A, /play B, /loop, A ends naturally
    let h = harness();
    h.player
        .enqueue(vec![test_track("A", 60), test_track("B", 60)])
        .await
        .unwrap();
    settle().await;

    assert!(h.player.toggle_loop().await.unwrap());
    h.sink.finish_current();
    settle().await;

    assert_eq!(now_playing(&h.player).await.as_deref(), Some("A"));
    assert_eq!(queued(&h.player).await, ["B"]);
    assert_eq!(h.sink.played(), [scratch_path("A"), scratch_path("A")]);
    assert!(h.fetcher.discarded.lock().unwrap().is_empty());

    // /loop again, A ends, B follows
    assert!(!h.player.toggle_loop().await.unwrap());
    h.sink.finish_current();
    settle().await;
    assert_eq!(now_playing(&h.player).await.as_deref(), Some("B"));
}

#[tokio::test(start_paused = true)]
async fn test_unplayable_track_is_skipped() {
    let fetcher = FakeFetcher {
        broken: HashSet::from(["Broken".to_string()]),
        ..Default::default()
    };
    let h = harness_with(fetcher);
    h.player.toggle_loop().await.unwrap();
    h.player
        .enqueue(vec![test_track("Broken", 60), test_track("Good", 60)])
        .await
        .unwrap();
    settle().await;

    // Loop does not keep retrying a track that cannot be downloaded.
    let snapshot = h.player.snapshot().await.unwrap();
    assert_eq!(snapshot.now_playing.unwrap().title, "Good");
    assert_eq!(snapshot.history_len, 1);
    assert_eq!(h.sink.played(), [scratch_path("Good")]);
}

#[tokio::test(start_paused = true)]
async fn test_playback_error_with_loop_moves_on() {
    let h = harness();
    h.player
        .enqueue(vec![test_track("A", 60), test_track("B", 60)])
        .await
        .unwrap();
    settle().await;
    assert!(h.player.toggle_loop().await.unwrap());

    h.sink.fail_current("decode error");
    settle().await;

    let snapshot = h.player.snapshot().await.unwrap();
    assert_eq!(snapshot.now_playing.unwrap().title, "B");
    assert_eq!(snapshot.history_len, 1);
    assert!(snapshot.loop_enabled);
    assert_eq!(h.sink.played(), [scratch_path("A"), scratch_path("B")]);
    assert_eq!(h.fetcher.discarded(), [scratch_path("A")]);
}

#[tokio::test(start_paused = true)]
async fn test_skip_during_download_discards_stale_file() {
    let fetcher = FakeFetcher {
        delay: Some(Duration::from_secs(5)),
        ..Default::default()
    };
    let h = harness_with(fetcher);
    h.player
        .enqueue(vec![test_track("A", 60), test_track("B", 60)])
        .await
        .unwrap();

    // A is still downloading.
    h.player.skip().await.unwrap();
    assert!(h.sink.played().is_empty());

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(now_playing(&h.player).await.as_deref(), Some("B"));
    assert_eq!(h.sink.played(), [scratch_path("B")]);
    assert_eq!(h.fetcher.discarded(), [scratch_path("A")]);
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_download_discards_file() {
    let fetcher = FakeFetcher {
        delay: Some(Duration::from_secs(5)),
        ..Default::default()
    };
    let h = harness_with(fetcher);
    h.player.enqueue(vec![test_track("A", 60)]).await.unwrap();
    h.player.stop().await.unwrap();
    assert!(h.fetcher.discarded().is_empty());

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(h.sink.played().is_empty());
    assert_eq!(h.fetcher.discarded(), [scratch_path("A")]);
}

#[tokio::test(start_paused = true)]
async fn test_enqueue_reports_position_after_start() {
    let h = harness();
    // Starts right away, so nothing is waiting.
    assert_eq!(h.player.enqueue(vec![test_track("A", 60)]).await.unwrap(), 0);
    assert_eq!(h.player.enqueue(vec![test_track("B", 60)]).await.unwrap(), 1);
    assert_eq!(
        h.player
            .enqueue(vec![test_track("C", 60), test_track("D", 60)])
            .await
            .unwrap(),
        3
    );
}

#[tokio::test(start_paused = true)]
async fn test_pause_toggle_and_progress_ticks() {
    let h = harness();
    h.player.enqueue(vec![test_track("A", 100)]).await.unwrap();
    settle().await;

    let before = h.surface.edit_count();
    tokio::time::sleep(Duration::from_secs(10)).await;
    settle().await;
    assert!(h.surface.edit_count() > before);
    let pct = h.surface.last_edit().unwrap().now_playing.unwrap().percentage;
    assert!((9..=10).contains(&pct), "unexpected percentage {pct}");

    assert!(h.player.toggle_pause().await.unwrap());
    assert!(h.sink.paused.load(Ordering::SeqCst));
    settle().await;

    // No progress updates while paused.
    let paused_edits = h.surface.edit_count();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.surface.edit_count(), paused_edits);
    assert!(h.player.snapshot().await.unwrap().paused);

    assert!(!h.player.toggle_pause().await.unwrap());
    assert!(!h.sink.paused.load(Ordering::SeqCst));
    let pct = h.player.snapshot().await.unwrap().percentage;
    assert!((9..=11).contains(&pct), "unexpected percentage {pct}");
}

#[tokio::test(start_paused = true)]
async fn test_idle_timeout_disconnects() {
    let h = harness();
    h.player.enqueue(vec![test_track("A", 60)]).await.unwrap();
    settle().await;

    h.sink.finish_current();
    settle().await;
    let idle = h.surface.last_edit().unwrap();
    assert!(idle.is_idle());
    assert!(idle.controls_enabled);

    // A new song within the timeout keeps the player alive.
    tokio::time::sleep(Duration::from_secs(60)).await;
    h.player.enqueue(vec![test_track("B", 600)]).await.unwrap();
    tokio::time::sleep(Duration::from_secs(100)).await;
    assert_eq!(now_playing(&h.player).await.as_deref(), Some("B"));
    assert!(!h.sink.disconnected.load(Ordering::SeqCst));

    h.sink.finish_current();
    tokio::time::sleep(Duration::from_secs(121)).await;

    assert!(h.sink.disconnected.load(Ordering::SeqCst));
    assert!(!h.surface.last_edit().unwrap().controls_enabled);
    assert!(matches!(
        h.player.snapshot().await,
        Err(MusicError::NotRunning)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_stop_tears_down() {
    let h = harness();
    h.player
        .enqueue(vec![test_track("A", 60), test_track("B", 60)])
        .await
        .unwrap();
    settle().await;

    h.player.stop().await.unwrap();
    settle().await;

    assert!(h.sink.disconnected.load(Ordering::SeqCst));
    assert_eq!(h.fetcher.discarded.lock().unwrap().as_slice(), [scratch_path("A")]);
    assert!(!h.surface.last_edit().unwrap().controls_enabled);
    assert!(h.player.is_closed());
    assert!(matches!(h.player.skip().await, Err(MusicError::NotRunning)));
}

#[tokio::test(start_paused = true)]
async fn test_deleted_status_message_is_reposted() {
    let h = harness();
    h.player.enqueue(vec![test_track("A", 600)]).await.unwrap();
    settle().await;
    assert_eq!(h.surface.posts.load(Ordering::SeqCst), 1);

    h.surface.deleted.store(true, Ordering::SeqCst);
    // The next edit finds the message gone; the player keeps going silently.
    h.player.toggle_loop().await.unwrap();
    assert_eq!(now_playing(&h.player).await.as_deref(), Some("A"));
    assert_eq!(h.surface.posts.load(Ordering::SeqCst), 1);

    h.player.enqueue(vec![test_track("B", 60)]).await.unwrap();
    settle().await;
    assert_eq!(h.surface.posts.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_load_playlist_replaces_queue() {
    let h = harness();
    h.player
        .enqueue(vec![test_track("A", 60), test_track("B", 60)])
        .await
        .unwrap();
    settle().await;

    let saved = vec![
        Track::from_saved("X".to_string(), "https://youtube.com/watch?v=x".to_string()),
        Track::from_saved("Y".to_string(), "https://youtube.com/watch?v=y".to_string()),
    ];
    assert_eq!(h.player.replace_queue(saved).await.unwrap(), 2);
    assert_eq!(now_playing(&h.player).await.as_deref(), Some("A"));
    assert_eq!(queued(&h.player).await, ["X", "Y"]);

    // Saved songs learn their duration once downloaded.
    h.sink.finish_current();
    settle().await;
    let snapshot = h.player.snapshot().await.unwrap();
    let current = snapshot.now_playing.unwrap();
    assert_eq!(current.title, "X");
    assert_eq!(current.duration_seconds, 240);

    assert_eq!(h.player.clear_queue().await.unwrap(), 1);
    assert!(queued(&h.player).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_registry_reuses_running_player() {
    let registry = PlayerRegistry::new();
    let guild = GuildId::new(7);
    let settings = PlayerSettings::default();
    let parts = || PlayerParts {
        sink: Arc::new(FakeSink::default()),
        fetcher: Arc::new(FakeFetcher::default()),
        surface: Arc::new(FakeSurface::default()),
        progress_bars: Arc::new(ProgressBars::default()),
    };

    let first = registry.get_or_spawn(guild, &settings, parts).await;
    first.enqueue(vec![test_track("A", 60)]).await.unwrap();

    let second = registry
        .get_or_spawn(guild, &settings, || panic!("player should be reused"))
        .await;
    assert_eq!(second.guild_id(), guild);
    assert_eq!(now_playing(&second).await.as_deref(), Some("A"));

    first.stop().await.unwrap();
    settle().await;
    assert!(registry.get(guild).await.is_none());

    let third = registry.get_or_spawn(guild, &settings, parts).await;
    assert!(!third.is_closed());
    assert!(registry.remove(guild).await.is_some());
}
