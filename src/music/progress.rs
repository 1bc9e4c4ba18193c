use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use tokio::time::Instant;

/// Wall-clock bookkeeping for the track that is currently loaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressClock {
    started_at: Instant,
    accumulated_pause: Duration,
    paused_since: Option<Instant>,
}

impl ProgressClock {
    pub fn started_at(now: Instant) -> Self {
        Self {
            started_at: now,
            accumulated_pause: Duration::ZERO,
            paused_since: None,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused_since.is_some()
    }

    pub fn pause_at(&mut self, now: Instant) {
        if self.paused_since.is_none() {
            self.paused_since = Some(now);
        }
    }

    pub fn resume_at(&mut self, now: Instant) {
        if let Some(since) = self.paused_since.take() {
            self.accumulated_pause += now.saturating_duration_since(since);
        }
    }

    /// Time spent actually playing. A pause that is still in progress does not count.
    pub fn elapsed_at(&self, now: Instant) -> Duration {
        let pausing = self
            .paused_since
            .map_or(Duration::ZERO, |since| now.saturating_duration_since(since));
        now.saturating_duration_since(self.started_at)
            .saturating_sub(self.accumulated_pause)
            .saturating_sub(pausing)
    }

    pub fn percentage_at(&self, now: Instant, duration_seconds: u64) -> u8 {
        percentage(self.elapsed_at(now), duration_seconds)
    }
}

/// `floor(100 * elapsed / duration)` clamped to 0..=100; unknown duration is 0.
pub fn percentage(elapsed: Duration, duration_seconds: u64) -> u8 {
    if duration_seconds == 0 {
        return 0;
    }
    let pct = elapsed.as_millis() * 100 / (u128::from(duration_seconds) * 1000);
    pct.min(100) as u8
}

pub fn format_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

pub fn text_bar(percentage: u8) -> String {
    const WIDTH: usize = 20;
    let filled = usize::from(percentage.min(100)) * WIDTH / 100;
    format!(
        "{}{} {percentage}%",
        "▰".repeat(filled),
        "▱".repeat(WIDTH - filled)
    )
}

/// Pre-rendered progress bar images, one per percentage, shared by every guild.
#[derive(Default)]
pub struct ProgressBars {
    images: RwLock<HashMap<u8, String>>,
}

impl ProgressBars {
    pub fn new(images: HashMap<u8, String>) -> Self {
        Self {
            images: RwLock::new(images),
        }
    }

    pub fn replace(&self, images: HashMap<u8, String>) {
        match self.images.write() {
            Ok(mut guard) => *guard = images,
            Err(poisoned) => *poisoned.into_inner() = images,
        }
    }

    pub fn url_for(&self, percentage: u8) -> Option<String> {
        match self.images.read() {
            Ok(guard) => guard.get(&percentage).cloned(),
            Err(poisoned) => poisoned.into_inner().get(&percentage).cloned(),
        }
    }

    pub fn len(&self) -> usize {
        self.images.read().map_or(0, |guard| guard.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
