use std::collections::VecDeque;

use rand::seq::SliceRandom;
use tokio::time::Instant;

use super::error::MusicError;
use super::progress::ProgressClock;
use super::Track;

/// Queue, history and now-playing slot for one guild.
///
/// `clock` is set exactly when `now_playing` is set.
#[derive(Debug, Default)]
pub struct PlaybackState {
    queue: VecDeque<Track>,
    history: Vec<Track>,
    now_playing: Option<Track>,
    loop_enabled: bool,
    clock: Option<ProgressClock>,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self) -> &VecDeque<Track> {
        &self.queue
    }

    pub fn history(&self) -> &[Track] {
        &self.history
    }

    pub fn now_playing(&self) -> Option<&Track> {
        self.now_playing.as_ref()
    }

    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    pub fn is_paused(&self) -> bool {
        self.clock.is_some_and(|c| c.is_paused())
    }

    pub fn is_idle(&self) -> bool {
        self.now_playing.is_none() && self.queue.is_empty()
    }

    /// Returns the new queue length.
    pub fn enqueue(&mut self, track: Track) -> usize {
        self.queue.push_back(track);
        self.queue.len()
    }

    pub fn replace_queue(&mut self, tracks: Vec<Track>) -> usize {
        self.queue = tracks.into();
        self.queue.len()
    }

    pub fn advance(&mut self) -> Option<&Track> {
        self.advance_at(Instant::now())
    }

    pub fn advance_at(&mut self, now: Instant) -> Option<&Track> {
        if let Some(current) = self.now_playing.take() {
            if self.loop_enabled {
                self.queue.push_front(current);
            } else {
                self.history.push(current);
            }
        }

        self.now_playing = self.queue.pop_front();
        self.clock = self
            .now_playing
            .as_ref()
            .map(|_| ProgressClock::started_at(now));
        self.now_playing.as_ref()
    }

    pub fn go_previous(&mut self) -> Result<&Track, MusicError> {
        self.go_previous_at(Instant::now())
    }

    pub fn go_previous_at(&mut self, now: Instant) -> Result<&Track, MusicError> {
        let previous = self.history.pop().ok_or(MusicError::NoHistory)?;
        if let Some(current) = self.now_playing.take() {
            self.queue.push_front(current);
        }
        self.clock = Some(ProgressClock::started_at(now));
        Ok(&*self.now_playing.insert(previous))
    }

    /// Moves a track that could not be played to history, ignoring the loop flag.
    pub fn retire_current(&mut self) {
        if let Some(current) = self.now_playing.take() {
            self.history.push(current);
        }
        self.clock = None;
    }

    /// Restarts the clock when audio actually begins, after the download.
    pub fn restart_clock_at(&mut self, now: Instant) {
        if self.now_playing.is_some() {
            self.clock = Some(ProgressClock::started_at(now));
        }
    }

    /// Sets the now-playing duration if it was unknown, as for saved playlist songs.
    pub fn fill_duration(&mut self, seconds: u64) {
        if let Some(track) = self.now_playing.as_mut().filter(|t| t.duration_seconds == 0) {
            track.duration_seconds = seconds;
        }
    }

    /// Skipping only stops the sink; the completion it triggers is what advances.
    pub fn check_skip(&self) -> Result<(), MusicError> {
        if self.queue.is_empty() {
            return Err(MusicError::QueueEmpty);
        }
        Ok(())
    }

    pub fn toggle_loop(&mut self) -> bool {
        self.loop_enabled = !self.loop_enabled;
        self.loop_enabled
    }

    /// Returns false when there were fewer than two tracks to shuffle.
    pub fn shuffle(&mut self) -> bool {
        if self.queue.len() < 2 {
            return false;
        }
        self.queue
            .make_contiguous()
            .shuffle(&mut rand::thread_rng());
        true
    }

    pub fn remove_at(&mut self, index: usize) -> Result<Track, MusicError> {
        let len = self.queue.len();
        self.queue
            .remove(index)
            .ok_or(MusicError::IndexOutOfRange { index, len })
    }

    pub fn clear_queue(&mut self) -> usize {
        let removed = self.queue.len();
        self.queue.clear();
        removed
    }

    pub fn pause_at(&mut self, now: Instant) {
        if let Some(clock) = self.clock.as_mut() {
            clock.pause_at(now);
        }
    }

    pub fn resume_at(&mut self, now: Instant) {
        if let Some(clock) = self.clock.as_mut() {
            clock.resume_at(now);
        }
    }

    pub fn percentage_at(&self, now: Instant) -> u8 {
        match (&self.now_playing, &self.clock) {
            (Some(track), Some(clock)) => clock.percentage_at(now, track.duration_seconds),
            _ => 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
