use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};

use crate::music::MusicError;
use crate::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedSong {
    pub title: String,
    pub url: String,
}

/// SQLite store. Every call opens its own connection and closes it on return.
#[derive(Clone, Debug)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    /// Creates the parent directory and the tables if they are missing.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let store = Self { path };
        store.open()?.execute_batch(
            "CREATE TABLE IF NOT EXISTS playlists (
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                PRIMARY KEY (user_id, name)
            );
            CREATE TABLE IF NOT EXISTS songs (
                user_id TEXT NOT NULL,
                playlist_name TEXT NOT NULL,
                title TEXT NOT NULL,
                url TEXT NOT NULL,
                PRIMARY KEY (user_id, playlist_name, url),
                FOREIGN KEY (user_id, playlist_name)
                    REFERENCES playlists (user_id, name) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS progress_bars (
                percentage INTEGER PRIMARY KEY,
                url TEXT NOT NULL
            );",
        )?;
        Ok(store)
    }

    fn open(&self) -> Result<Connection, rusqlite::Error> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    /// Returns false when the user already has a playlist with that name.
    pub fn create_playlist(&self, user_id: &str, name: &str) -> Result<bool, MusicError> {
        let conn = self.open()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO playlists (user_id, name) VALUES (?1, ?2)",
            params![user_id, name],
        )?;
        Ok(inserted > 0)
    }

    pub fn delete_playlist(&self, user_id: &str, name: &str) -> Result<bool, MusicError> {
        let conn = self.open()?;
        conn.execute(
            "DELETE FROM songs WHERE user_id = ?1 AND playlist_name = ?2",
            params![user_id, name],
        )?;
        let deleted = conn.execute(
            "DELETE FROM playlists WHERE user_id = ?1 AND name = ?2",
            params![user_id, name],
        )?;
        Ok(deleted > 0)
    }

    pub fn playlist_exists(&self, user_id: &str, name: &str) -> Result<bool, MusicError> {
        let conn = self.open()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM playlists WHERE user_id = ?1 AND name = ?2",
                params![user_id, name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Playlist names of a user containing `partial`, case-insensitively.
    pub fn playlist_names(
        &self,
        user_id: &str,
        partial: &str,
    ) -> Result<Vec<String>, MusicError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT name FROM playlists
             WHERE user_id = ?1 AND instr(lower(name), lower(?2)) > 0
             ORDER BY name",
        )?;
        let names = stmt
            .query_map(params![user_id, partial], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    /// Returns false when the song is already in the playlist.
    pub fn add_song(
        &self,
        user_id: &str,
        playlist: &str,
        song: &SavedSong,
    ) -> Result<bool, MusicError> {
        let conn = self.open()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO songs (user_id, playlist_name, title, url)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, playlist, song.title, song.url],
        )?;
        Ok(inserted > 0)
    }

    pub fn playlist_songs(
        &self,
        user_id: &str,
        playlist: &str,
    ) -> Result<Vec<SavedSong>, MusicError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT title, url FROM songs
             WHERE user_id = ?1 AND playlist_name = ?2
             ORDER BY rowid",
        )?;
        let songs = stmt
            .query_map(params![user_id, playlist], |row| {
                Ok(SavedSong {
                    title: row.get(0)?,
                    url: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(songs)
    }

    pub fn remove_song(
        &self,
        user_id: &str,
        playlist: &str,
        url: &str,
    ) -> Result<bool, MusicError> {
        let conn = self.open()?;
        let deleted = conn.execute(
            "DELETE FROM songs WHERE user_id = ?1 AND playlist_name = ?2 AND url = ?3",
            params![user_id, playlist, url],
        )?;
        Ok(deleted > 0)
    }

    /// Percentage -> image URL. Rows outside 0..=100 are skipped.
    pub fn progress_bars(&self) -> Result<HashMap<u8, String>, MusicError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare("SELECT percentage, url FROM progress_bars")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(pct, url)| u8::try_from(pct).ok().filter(|p| *p <= 100).map(|p| (p, url)))
            .collect())
    }
}
