//! Media index over a local music directory.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    media::{MediaIndex, SortOrder, TrackId},
};
use core_async::sync::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::{debug, warn};

/// File extensions treated as audio when scanning.
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "oga", "opus", "m4a", "aac", "wav"];

#[derive(Debug, Clone)]
struct Entry {
    path: PathBuf,
    file_name: String,
    album: Option<String>,
    artist: Option<String>,
    modified: SystemTime,
}

/// Tokio-based media index for desktop.
///
/// Tracks are the audio files found under `root`, recursively. A track's
/// identifier is derived from its path relative to `root`, so it stays the
/// same across rescans and restarts. Album and artist are taken from the
/// `Artist/Album/file` directory layout most music folders follow.
pub struct DirectoryMediaIndex {
    root: PathBuf,
    entries: RwLock<HashMap<TrackId, Entry>>,
}

impl DirectoryMediaIndex {
    /// Create an index over `root`. Nothing is read until the first query.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Create an index over the user's music directory.
    pub fn music_dir() -> Result<Self> {
        let root = dirs::audio_dir().ok_or_else(|| {
            BridgeError::NotAvailable("No music directory for this user".to_string())
        })?;
        Ok(Self::new(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Identifier for a file at `relative` under the root.
    pub fn track_id_for(relative: &Path) -> TrackId {
        let mut hasher = Sha256::new();
        hasher.update(relative.to_string_lossy().as_bytes());
        let digest = hasher.finalize();

        let mut raw = [0u8; 8];
        raw.copy_from_slice(&digest[..8]);
        TrackId::new(i64::from_be_bytes(raw) & i64::MAX)
    }

    /// Rescan the directory, replacing the known entries.
    pub async fn refresh(&self) -> Result<usize> {
        let scanned = self.scan().await?;
        let count = scanned.len();
        *self.entries.write().await = scanned;
        debug!(root = ?self.root, count, "Music directory scanned");
        Ok(count)
    }

    async fn scan(&self) -> Result<HashMap<TrackId, Entry>> {
        if !fs::try_exists(&self.root).await? {
            return Err(BridgeError::QueryFailed(format!(
                "Music directory does not exist: {}",
                self.root.display()
            )));
        }

        let mut found = HashMap::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut reader = match fs::read_dir(&dir).await {
                Ok(reader) => reader,
                Err(e) if dir != self.root => {
                    warn!(path = ?dir, error = %e, "Skipping unreadable directory");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            while let Some(item) = reader.next_entry().await? {
                let path = item.path();
                let metadata = item.metadata().await?;

                if metadata.is_dir() {
                    pending.push(path);
                    continue;
                }
                if !is_audio(&path) {
                    continue;
                }

                let Ok(relative) = path.strip_prefix(&self.root) else {
                    continue;
                };
                let id = Self::track_id_for(relative);
                found.insert(id, entry_for(&path, relative, &metadata));
            }
        }

        Ok(found)
    }

    async fn ensure_scanned(&self) -> Result<()> {
        if self.entries.read().await.is_empty() {
            self.refresh().await?;
        }
        Ok(())
    }

    async fn lookup<F>(&self, id: TrackId, field: F) -> Result<Option<String>>
    where
        F: FnOnce(&Entry) -> Option<String>,
    {
        self.ensure_scanned().await?;
        let entries = self.entries.read().await;
        Ok(entries.get(&id).and_then(field))
    }
}

fn is_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn entry_for(path: &Path, relative: &Path, metadata: &std::fs::Metadata) -> Entry {
    let mut folders = relative
        .parent()
        .into_iter()
        .flat_map(|parent| parent.iter())
        .rev()
        .map(|name| name.to_string_lossy().into_owned());

    let album = folders.next();
    let artist = folders.next();

    Entry {
        path: path.to_path_buf(),
        file_name: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        album,
        artist,
        modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
    }
}

#[async_trait]
impl MediaIndex for DirectoryMediaIndex {
    async fn list_tracks(&self, order: SortOrder) -> Result<Vec<TrackId>> {
        self.refresh().await?;
        let entries = self.entries.read().await;

        let mut tracks: Vec<(&TrackId, &Entry)> = entries.iter().collect();
        match order {
            SortOrder::DateAdded => tracks.sort_by(|(_, a), (_, b)| {
                a.modified.cmp(&b.modified).then(a.path.cmp(&b.path))
            }),
            SortOrder::DisplayName => tracks.sort_by(|(_, a), (_, b)| {
                a.file_name
                    .to_lowercase()
                    .cmp(&b.file_name.to_lowercase())
                    .then(a.path.cmp(&b.path))
            }),
        }

        Ok(tracks.into_iter().map(|(id, _)| *id).collect())
    }

    async fn data_path(&self, id: TrackId) -> Result<Option<String>> {
        self.lookup(id, |entry| Some(entry.path.to_string_lossy().into_owned()))
            .await
    }

    async fn display_name(&self, id: TrackId) -> Result<Option<String>> {
        self.lookup(id, |entry| Some(entry.file_name.clone())).await
    }

    async fn album_name(&self, id: TrackId) -> Result<Option<String>> {
        self.lookup(id, |entry| entry.album.clone()).await
    }

    async fn artist_name(&self, id: TrackId) -> Result<Option<String>> {
        self.lookup(id, |entry| entry.artist.clone()).await
    }
}
