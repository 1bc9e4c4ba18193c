use thiserror::Error;

#[derive(Debug, Error)]
pub enum MusicError {
    #[error("No results found for the song: {0}")]
    ResolutionFailure(String),
    #[error("No previous song in history.")]
    NoHistory,
    #[error("The queue is empty.")]
    QueueEmpty,
    #[error("Nothing is playing right now.")]
    NothingPlaying,
    #[error("There is no song at position {index} (queue has {len}).")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("status message no longer exists")]
    DisplayNotFound,
    #[error("failed to update status message: {0}")]
    DisplayFailed(String),
    #[error("playback failed: {0}")]
    Sink(String),
    #[error("database error: {0}")]
    Store(#[from] rusqlite::Error),
    #[error("The player is not running in this server.")]
    NotRunning,
}

impl MusicError {
    /// Errors the invoking user caused; reported ephemerally with no state change.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::ResolutionFailure(_)
                | Self::NoHistory
                | Self::QueueEmpty
                | Self::NothingPlaying
                | Self::IndexOutOfRange { .. }
                | Self::NotRunning
        )
    }
}
