//! Ordered, circular track queue used for next/previous resolution

use crate::error::PlayerError;
use super::types::Track;

/// Tracks in browse order. Lookups go by `Track::id`, never by instance, since
/// the same track arrives as separate copies from the feed and from playlists.
#[derive(Clone, Debug, Default)]
pub struct TrackIndex {
    tracks: Vec<Track>,
}

impl TrackIndex {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn tracks_mut(&mut self) -> &mut [Track] {
        &mut self.tracks
    }

    pub fn position_of(&self, track_id: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == track_id)
    }

    /// Next track, wrapping from the last back to the first
    pub fn successor(&self, track_id: &str) -> Result<&Track, PlayerError> {
        let position = self.locate(track_id)?;
        Ok(&self.tracks[(position + 1) % self.tracks.len()])
    }

    /// Previous track, wrapping from the first to the last
    pub fn predecessor(&self, track_id: &str) -> Result<&Track, PlayerError> {
        let position = self.locate(track_id)?;
        let len = self.tracks.len();
        Ok(&self.tracks[(position + len - 1) % len])
    }

    fn locate(&self, track_id: &str) -> Result<usize, PlayerError> {
        if self.tracks.is_empty() {
            return Err(PlayerError::EmptyIndex);
        }
        self.position_of(track_id)
            .ok_or_else(|| PlayerError::TrackNotFound(track_id.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            file_id: format!("file-{id}"),
            img_id: format!("img-{id}"),
            title: format!("Song {id}"),
            artist: "Artist".to_string(),
            album: None,
            play_count: 0,
            is_liked: false,
        }
    }

    fn index(ids: &[&str]) -> TrackIndex {
        TrackIndex::new(ids.iter().map(|id| track(id)).collect())
    }

    #[test]
    fn successor_wraps_to_first() {
        let index = index(&["a", "b", "c"]);
        assert_eq!(index.successor("a").unwrap().id, "b");
        assert_eq!(index.successor("c").unwrap().id, "a");
    }

    #[test]
    fn predecessor_wraps_to_last() {
        let index = index(&["a", "b", "c"]);
        assert_eq!(index.predecessor("b").unwrap().id, "a");
        assert_eq!(index.predecessor("a").unwrap().id, "c");
    }

    #[test]
    fn n_steps_return_to_start() {
        let index = index(&["a", "b", "c", "d", "e"]);
        for start in ["a", "c", "e"] {
            let mut id = start.to_string();
            for _ in 0..index.len() {
                id = index.successor(&id).unwrap().id.clone();
            }
            assert_eq!(id, start);

            for _ in 0..index.len() {
                id = index.predecessor(&id).unwrap().id.clone();
            }
            assert_eq!(id, start);
        }
    }

    #[test]
    fn single_track_is_its_own_neighbour() {
        let index = index(&["solo"]);
        assert_eq!(index.successor("solo").unwrap().id, "solo");
        assert_eq!(index.predecessor("solo").unwrap().id, "solo");
    }

    #[test]
    fn lookup_is_by_id_not_instance() {
        let index = index(&["a", "b"]);
        let mut copy = track("b");
        copy.is_liked = true;
        assert_eq!(index.position_of(&copy.id), Some(1));
    }

    #[test]
    fn unknown_or_empty_fails_cleanly() {
        assert_eq!(
            index(&["a"]).successor("zzz").unwrap_err(),
            PlayerError::TrackNotFound("zzz".to_string())
        );
        assert_eq!(TrackIndex::default().predecessor("a").unwrap_err(), PlayerError::EmptyIndex);
    }
}
