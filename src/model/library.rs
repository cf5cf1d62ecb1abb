//! Data access capability: tracks, playlists, likes and listening history
//!
//! [`LibraryData`] is what the controller consumes. [`JsonLibrary`] is the bundled
//! store, kept in memory and written to a JSON file after every mutation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::PlayerError;
use super::types::{Playlist, Track};

/// Everything the browse screens and the bootstrap need in one read
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LibrarySnapshot {
    pub tracks: Vec<Track>,
    pub playlists: Vec<Playlist>,
    pub liked: Vec<Track>,
    pub last_played: Option<Track>,
}

#[async_trait]
pub trait LibraryData: Send + Sync {
    async fn snapshot(&self) -> Result<LibrarySnapshot>;
    /// Flip the like flag, returning the new value
    async fn toggle_like(&self, track_id: &str) -> Result<bool>;
    async fn create_playlist(&self, name: &str) -> Result<Playlist>;
    async fn delete_playlist(&self, playlist_id: &str) -> Result<()>;
    async fn rename_playlist(&self, playlist_id: &str, name: &str) -> Result<()>;
    async fn add_track_to_playlist(&self, playlist_id: &str, track_id: &str) -> Result<()>;
    async fn remove_track_from_playlist(&self, playlist_id: &str, track_id: &str) -> Result<()>;
    /// Open a listening-history entry for the track
    async fn record_history(&self, track_id: &str) -> Result<()>;
    /// Close the open history entry, if any
    async fn stop_current_tracking(&self) -> Result<()>;
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
struct PlaylistRecord {
    id: String,
    name: String,
    track_ids: Vec<String>,
    created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub track_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
struct LibraryFile {
    #[serde(default)]
    tracks: Vec<Track>,
    #[serde(default)]
    playlists: Vec<PlaylistRecord>,
    #[serde(default)]
    liked: Vec<String>,
    #[serde(default)]
    history: Vec<HistoryEntry>,
}

impl LibraryFile {
    fn track(&self, track_id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == track_id)
    }

    fn require_track(&self, track_id: &str) -> Result<(), PlayerError> {
        self.track(track_id)
            .map(|_| ())
            .ok_or_else(|| PlayerError::TrackNotFound(track_id.to_string()))
    }

    fn playlist_mut(&mut self, playlist_id: &str) -> Result<&mut PlaylistRecord, PlayerError> {
        self.playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .ok_or_else(|| PlayerError::PlaylistNotFound(playlist_id.to_string()))
    }

    fn close_open_entry(&mut self, now: DateTime<Utc>) -> bool {
        match self.history.last_mut() {
            Some(entry) if entry.ended_at.is_none() => {
                entry.ended_at = Some(now);
                true
            }
            _ => false,
        }
    }

    /// Tracks with `is_liked` derived from the liked set
    fn resolve(&self, ids: &[String]) -> Vec<Track> {
        let liked: HashSet<&str> = self.liked.iter().map(String::as_str).collect();
        ids.iter()
            .filter_map(|id| self.track(id))
            .map(|track| Track {
                is_liked: liked.contains(track.id.as_str()),
                ..track.clone()
            })
            .collect()
    }

    fn snapshot(&self) -> LibrarySnapshot {
        let all_ids: Vec<String> = self.tracks.iter().map(|t| t.id.clone()).collect();
        let playlists = self
            .playlists
            .iter()
            .map(|p| Playlist {
                id: p.id.clone(),
                name: p.name.clone(),
                tracks: self.resolve(&p.track_ids),
            })
            .collect();
        let last_played = self
            .history
            .last()
            .and_then(|entry| self.resolve(std::slice::from_ref(&entry.track_id)).pop());

        LibrarySnapshot {
            tracks: self.resolve(&all_ids),
            playlists,
            liked: self.resolve(&self.liked),
            last_played,
        }
    }
}

/// JSON-file backed library
#[derive(Clone)]
pub struct JsonLibrary {
    path: Option<PathBuf>,
    state: Arc<RwLock<LibraryFile>>,
}

impl JsonLibrary {
    /// Open the store at `path`; a missing file starts an empty library.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            tracing::info!(path = %path.display(), "No library file yet, starting empty");
            LibraryFile::default()
        };

        Ok(Self {
            path: Some(path),
            state: Arc::new(RwLock::new(state)),
        })
    }

    /// Library that never touches disk
    #[cfg(test)]
    pub fn in_memory(tracks: Vec<Track>) -> Self {
        Self {
            path: None,
            state: Arc::new(RwLock::new(LibraryFile {
                tracks,
                ..LibraryFile::default()
            })),
        }
    }

    #[cfg(test)]
    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.state.read().await.history.clone()
    }

    /// Apply `change` to a copy of the state and keep it only once it is saved.
    async fn mutate<T, F>(&self, change: F) -> Result<T>
    where
        F: FnOnce(&mut LibraryFile) -> Result<T> + Send,
        T: Send,
    {
        let mut state = self.state.write().await;
        let mut draft = state.clone();
        let value = change(&mut draft)?;
        if draft != *state {
            self.save(&draft)?;
            *state = draft;
        }
        Ok(value)
    }

    fn save(&self, state: &LibraryFile) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        write_json(path, state)
    }
}

fn write_json(path: &Path, state: &LibraryFile) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let content = serde_json::to_string_pretty(state)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[async_trait]
impl LibraryData for JsonLibrary {
    async fn snapshot(&self) -> Result<LibrarySnapshot> {
        Ok(self.state.read().await.snapshot())
    }

    async fn toggle_like(&self, track_id: &str) -> Result<bool> {
        self.mutate(|state| {
            state.require_track(track_id)?;
            match state.liked.iter().position(|id| id == track_id) {
                Some(position) => {
                    state.liked.remove(position);
                    Ok(false)
                }
                None => {
                    state.liked.push(track_id.to_string());
                    Ok(true)
                }
            }
        })
        .await
    }

    async fn create_playlist(&self, name: &str) -> Result<Playlist> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PlayerError::InvalidPlaylistName.into());
        }

        let record = PlaylistRecord {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            track_ids: Vec::new(),
            created_at: Utc::now(),
        };
        let playlist = Playlist {
            id: record.id.clone(),
            name: record.name.clone(),
            tracks: Vec::new(),
        };
        self.mutate(move |state| {
            state.playlists.push(record);
            Ok(())
        })
        .await?;
        Ok(playlist)
    }

    async fn delete_playlist(&self, playlist_id: &str) -> Result<()> {
        self.mutate(|state| {
            let before = state.playlists.len();
            state.playlists.retain(|p| p.id != playlist_id);
            if state.playlists.len() == before {
                return Err(PlayerError::PlaylistNotFound(playlist_id.to_string()).into());
            }
            Ok(())
        })
        .await
    }

    async fn rename_playlist(&self, playlist_id: &str, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PlayerError::InvalidPlaylistName.into());
        }

        self.mutate(|state| {
            state.playlist_mut(playlist_id)?.name = name.to_string();
            Ok(())
        })
        .await
    }

    async fn add_track_to_playlist(&self, playlist_id: &str, track_id: &str) -> Result<()> {
        self.mutate(|state| {
            state.require_track(track_id)?;
            let playlist = state.playlist_mut(playlist_id)?;
            if !playlist.track_ids.iter().any(|id| id == track_id) {
                playlist.track_ids.push(track_id.to_string());
            }
            Ok(())
        })
        .await
    }

    async fn remove_track_from_playlist(&self, playlist_id: &str, track_id: &str) -> Result<()> {
        self.mutate(|state| {
            state.playlist_mut(playlist_id)?.track_ids.retain(|id| id != track_id);
            Ok(())
        })
        .await
    }

    async fn record_history(&self, track_id: &str) -> Result<()> {
        self.mutate(|state| {
            state.require_track(track_id)?;

            let now = Utc::now();
            state.close_open_entry(now);
            state.history.push(HistoryEntry {
                track_id: track_id.to_string(),
                started_at: now,
                ended_at: None,
            });
            if let Some(track) = state.tracks.iter_mut().find(|t| t.id == track_id) {
                track.play_count += 1;
            }
            Ok(())
        })
        .await
    }

    async fn stop_current_tracking(&self) -> Result<()> {
        self.mutate(|state| {
            state.close_open_entry(Utc::now());
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::track_index::tests::track;

    fn library() -> JsonLibrary {
        JsonLibrary::in_memory(vec![track("a"), track("b"), track("c")])
    }

    #[tokio::test]
    async fn like_toggles_and_is_reflected_everywhere() {
        let library = library();
        let playlist = library.create_playlist("Mix").await.unwrap();
        library.add_track_to_playlist(&playlist.id, "b").await.unwrap();

        assert!(library.toggle_like("b").await.unwrap());
        let snapshot = library.snapshot().await.unwrap();
        assert!(snapshot.tracks[1].is_liked);
        assert_eq!(snapshot.liked.len(), 1);
        assert!(snapshot.playlists[0].tracks[0].is_liked);

        assert!(!library.toggle_like("b").await.unwrap());
        assert!(library.snapshot().await.unwrap().liked.is_empty());
    }

    #[tokio::test]
    async fn like_unknown_track_fails() {
        let err = library().toggle_like("nope").await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<PlayerError>(),
            Some(&PlayerError::TrackNotFound("nope".to_string()))
        );
    }

    #[tokio::test]
    async fn playlist_lifecycle() {
        let library = library();
        let playlist = library.create_playlist("  Road trip ").await.unwrap();
        assert_eq!(playlist.name, "Road trip");

        library.add_track_to_playlist(&playlist.id, "a").await.unwrap();
        library.add_track_to_playlist(&playlist.id, "a").await.unwrap();
        library.add_track_to_playlist(&playlist.id, "c").await.unwrap();
        library.rename_playlist(&playlist.id, "Drive").await.unwrap();

        let snapshot = library.snapshot().await.unwrap();
        assert_eq!(snapshot.playlists[0].name, "Drive");
        let ids: Vec<_> = snapshot.playlists[0].tracks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);

        library.remove_track_from_playlist(&playlist.id, "a").await.unwrap();
        assert_eq!(library.snapshot().await.unwrap().playlists[0].tracks.len(), 1);

        library.delete_playlist(&playlist.id).await.unwrap();
        assert!(library.snapshot().await.unwrap().playlists.is_empty());
        assert!(library.delete_playlist(&playlist.id).await.is_err());
    }

    #[tokio::test]
    async fn blank_playlist_names_are_rejected() {
        let library = library();
        assert!(library.create_playlist("   ").await.is_err());
        let playlist = library.create_playlist("ok").await.unwrap();
        assert!(library.rename_playlist(&playlist.id, "").await.is_err());
    }

    #[tokio::test]
    async fn history_tracks_last_played_and_play_count() {
        let library = library();
        assert_eq!(library.snapshot().await.unwrap().last_played, None);

        library.record_history("a").await.unwrap();
        library.record_history("c").await.unwrap();

        let history = library.history().await;
        assert_eq!(history.len(), 2);
        assert!(history[0].ended_at.is_some());
        assert!(history[1].ended_at.is_none());

        let snapshot = library.snapshot().await.unwrap();
        assert_eq!(snapshot.last_played.unwrap().id, "c");
        assert_eq!(snapshot.tracks[0].play_count, 1);

        library.stop_current_tracking().await.unwrap();
        assert!(library.history().await[1].ended_at.is_some());
    }

    #[tokio::test]
    async fn failed_save_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.json");

        let library = JsonLibrary::open(&path).unwrap();
        {
            let mut state = library.state.write().await;
            state.tracks = vec![track("a"), track("b")];
        }
        let playlist = library.create_playlist("Mix").await.unwrap();

        // A directory where the file should be makes every write fail
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert!(library.toggle_like("a").await.is_err());
        assert!(library.add_track_to_playlist(&playlist.id, "b").await.is_err());
        assert!(library.record_history("b").await.is_err());

        let snapshot = library.snapshot().await.unwrap();
        assert!(snapshot.liked.is_empty());
        assert!(!snapshot.tracks[0].is_liked);
        assert!(snapshot.playlists[0].tracks.is_empty());
        assert_eq!(snapshot.last_played, None);
        assert_eq!(snapshot.tracks[1].play_count, 0);
    }

    #[tokio::test]
    async fn persists_to_disk_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/library.json");

        let library = JsonLibrary::open(&path).unwrap();
        {
            let mut state = library.state.write().await;
            state.tracks = vec![track("a"), track("b")];
        }
        library.toggle_like("a").await.unwrap();
        library.record_history("b").await.unwrap();

        let reopened = JsonLibrary::open(&path).unwrap();
        let snapshot = reopened.snapshot().await.unwrap();
        assert_eq!(snapshot.liked[0].id, "a");
        assert_eq!(snapshot.last_played.unwrap().id, "b");
    }
}
