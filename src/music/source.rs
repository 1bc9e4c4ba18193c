use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use super::error::MusicError;
use super::Track;

const AUDIO_FORMAT: &str = "bestaudio[ext=m4a]/bestaudio/best";

/// A downloaded scratch file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedAudio {
    pub path: PathBuf,
    /// Set when the download learned a duration the track did not carry.
    pub duration_seconds: Option<u64>,
}

impl FetchedAudio {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            duration_seconds: None,
        }
    }
}

/// Turns a queued track into a local file the sink can play.
#[async_trait]
pub trait TrackFetcher: Send + Sync {
    async fn fetch(&self, track: &Track) -> Result<FetchedAudio, MusicError>;
    async fn discard(&self, path: &Path);
}

#[derive(Deserialize)]
struct YtDlpOutput {
    id: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
    url: Option<String>,
    webpage_url: Option<String>,
    original_url: Option<String>,
}

pub fn search_query(query: &str) -> String {
    let query = query.trim();
    let is_url = query.starts_with("http://") || query.starts_with("https://");
    if is_url {
        query.to_string()
    } else {
        format!("ytsearch1:{query}")
    }
}

fn track_from_output(info: YtDlpOutput, query: &str) -> Track {
    let webpage_url = info
        .webpage_url
        .or(info.original_url)
        .unwrap_or_else(|| query.to_string());

    Track {
        source_id: info.id,
        source_url: info.url.unwrap_or_else(|| webpage_url.clone()),
        title: info.title.unwrap_or_else(|| "Unknown Title".to_string()),
        duration_seconds: info.duration.map_or(0, |d| d.max(0.0) as u64),
        webpage_url,
    }
}

/// Parses the `<duration>|<filepath>` line printed after a download.
fn parse_download_line(line: &str) -> Option<FetchedAudio> {
    let (duration, path) = line.trim().split_once('|')?;
    if path.is_empty() {
        return None;
    }
    Some(FetchedAudio {
        path: PathBuf::from(path),
        duration_seconds: duration
            .parse::<f64>()
            .ok()
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| d as u64),
    })
}

/// yt-dlp backed resolver and download stage.
pub struct YtDlp {
    download_dir: PathBuf,
}

impl YtDlp {
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
        }
    }

    pub async fn resolve(&self, query: &str) -> Result<Track, MusicError> {
        let search = search_query(query);
        let output = Command::new("yt-dlp")
            .args([
                "-j",
                "-f",
                AUDIO_FORMAT,
                "--no-playlist",
                "--no-warnings",
                search.as_str(),
            ])
            .output()
            .await
            .map_err(|e| MusicError::ResolutionFailure(format!("failed to run yt-dlp: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MusicError::ResolutionFailure(stderr.trim().to_string()));
        }

        // A search with no hits exits 0 with empty output.
        let first_line = output
            .stdout
            .split(|b| *b == b'\n')
            .find(|line| !line.is_empty())
            .ok_or_else(|| MusicError::ResolutionFailure(query.to_string()))?;

        let info: YtDlpOutput = serde_json::from_slice(first_line)
            .map_err(|e| MusicError::ResolutionFailure(e.to_string()))?;
        Ok(track_from_output(info, query))
    }

    fn cached_path(&self, track: &Track) -> Option<PathBuf> {
        let id = track.source_id.as_deref()?;
        let path = self.download_dir.join(format!("{id}.m4a"));
        path.exists().then_some(path)
    }
}

#[async_trait]
impl TrackFetcher for YtDlp {
    async fn fetch(&self, track: &Track) -> Result<FetchedAudio, MusicError> {
        if let Some(path) = self.cached_path(track) {
            debug!("using cached file: {}", path.display());
            return Ok(FetchedAudio::new(path));
        }

        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| MusicError::Sink(e.to_string()))?;

        let template = self.download_dir.join("%(id)s.m4a");
        let template = template.to_string_lossy();
        let output = Command::new("yt-dlp")
            .args([
                "-f",
                AUDIO_FORMAT,
                "--no-playlist",
                "--no-warnings",
                "--no-simulate",
                "--print",
                "after_move:%(duration)s|%(filepath)s",
                "-o",
                &*template,
                track.webpage_url.as_str(),
            ])
            .output()
            .await
            .map_err(|e| MusicError::Sink(format!("failed to run yt-dlp: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MusicError::Sink(stderr.trim().to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let fetched = stdout
            .lines()
            .rev()
            .find_map(parse_download_line)
            .ok_or_else(|| MusicError::Sink(format!("no file for {}", track.title)))?;

        debug!("downloaded: {}", fetched.path.display());
        Ok(fetched)
    }

    async fn discard(&self, path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("failed to remove scratch file {}: {e}", path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_wraps_plain_text() {
        assert_eq!(
            search_query("  never gonna give you up "),
            "ytsearch1:never gonna give you up"
        );
        assert_eq!(
            search_query("https://youtu.be/dQw4w9WgXcQ"),
            "https://youtu.be/dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_track_from_output_full() {
        let info: YtDlpOutput = serde_json::from_str(
            r#"{"id":"abc","title":"Song","duration":212.6,
                "url":"https://media/abc.m4a","webpage_url":"https://www.youtube.com/watch?v=abc"}"#,
        )
        .unwrap();
        let track = track_from_output(info, "song");
        assert_eq!(track.source_id.as_deref(), Some("abc"));
        assert_eq!(track.title, "Song");
        assert_eq!(track.duration_seconds, 212);
        assert_eq!(track.source_url, "https://media/abc.m4a");
        assert_eq!(track.webpage_url, "https://www.youtube.com/watch?v=abc");
    }

    #[test]
    fn test_track_from_output_missing_fields() {
        let info: YtDlpOutput = serde_json::from_str("{}").unwrap();
        let track = track_from_output(info, "https://example.com/x");
        assert_eq!(track.title, "Unknown Title");
        assert_eq!(track.duration_seconds, 0);
        assert_eq!(track.webpage_url, "https://example.com/x");
        assert_eq!(track.source_url, "https://example.com/x");
        assert!(track.source_id.is_none());
    }

    #[test]
    fn test_parse_download_line() {
        assert_eq!(
            parse_download_line("212.6|/data/music/abc.m4a\n"),
            Some(FetchedAudio {
                path: PathBuf::from("/data/music/abc.m4a"),
                duration_seconds: Some(212),
            })
        );
        assert_eq!(
            parse_download_line("NA|/data/music/a|b.m4a"),
            Some(FetchedAudio::new("/data/music/a|b.m4a"))
        );
        assert_eq!(parse_download_line("[download] 100%"), None);
        assert_eq!(parse_download_line("12|"), None);
    }

    #[test]
    fn test_cached_path_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let ytdlp = YtDlp::new(dir.path());
        let mut track = Track::from_saved("Song".into(), "https://example.com/abc".into());
        assert!(ytdlp.cached_path(&track).is_none());

        track.source_id = Some("abc".into());
        assert!(ytdlp.cached_path(&track).is_none());

        std::fs::write(dir.path().join("abc.m4a"), b"").unwrap();
        assert_eq!(ytdlp.cached_path(&track), Some(dir.path().join("abc.m4a")));
    }

    #[tokio::test]
    async fn test_discard_missing_file_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let ytdlp = YtDlp::new(dir.path());
        let path = dir.path().join("abc.m4a");
        std::fs::write(&path, b"data").unwrap();

        ytdlp.discard(&path).await;
        assert!(!path.exists());
        ytdlp.discard(&path).await;
    }
}
