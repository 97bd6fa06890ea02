use uuid::Uuid;

use crate::item::Asset;

const VIDEO_EXTENSIONS: [&str; 5] = [".mp4", ".mov", ".webm", ".ogg", ".m4v"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn from_mime(mime: &str) -> Self {
        if mime.to_lowercase().starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }

    /// Kind for an already-stored asset, inferred from the file extension on
    /// its name or URL.
    pub fn from_source(name: &str, url: &str) -> Self {
        let looks_like_video = |value: &str| {
            let value = value.to_lowercase();
            VIDEO_EXTENSIONS.iter().any(|ext| value.ends_with(ext))
        };
        if looks_like_video(name) || looks_like_video(url) {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    Uploading,
    Success,
    Error { message: String },
}

/// Stable handle for one attachment row. In-flight entries carry a random
/// temporary key; confirmed entries are re-keyed by their persisted asset id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryKey(String);

impl EntryKey {
    fn temporary() -> Self {
        EntryKey(Uuid::new_v4().to_string())
    }

    fn persisted(asset_id: &str) -> Self {
        EntryKey(asset_id.to_string())
    }
}

/// One attachment in the list: either a server-confirmed asset or a local
/// upload somewhere in its uploading -> success/error lifecycle.
#[derive(Debug, Clone)]
pub struct UploadEntry {
    pub key: EntryKey,
    pub url: String,
    pub name: String,
    pub kind: MediaKind,
    pub local: bool,
    pub status: UploadStatus,
}

/// The attachment list plus the index of the entry shown in the preview.
/// Invariant: the list is exactly the server-confirmed assets from the last
/// hydration plus every locally-picked file since, in pick order; entries
/// move uploading -> success/error and are never dropped on failure.
#[derive(Debug, Clone, Default)]
pub struct MediaLibrary {
    entries: Vec<UploadEntry>,
    active: usize,
}

impl MediaLibrary {
    /// Replace the list with the item's stored assets. Resets the active
    /// selection.
    pub fn hydrate(&mut self, assets: &[Asset]) {
        self.entries = assets
            .iter()
            .map(|asset| {
                let url = asset.best_url().unwrap_or_default().to_string();
                UploadEntry {
                    key: EntryKey::persisted(&asset.id),
                    kind: MediaKind::from_source(&asset.name, &url),
                    url,
                    name: asset.name.clone(),
                    local: false,
                    status: UploadStatus::Success,
                }
            })
            .collect();
        self.active = 0;
    }

    /// Append an optimistic uploading entry and hand back its temporary key.
    /// `source_url` is a locally-resolvable reference shown until the server
    /// confirms a real URL.
    pub fn begin_upload(&mut self, name: &str, source_url: &str, kind: MediaKind) -> EntryKey {
        let key = EntryKey::temporary();
        self.entries.push(UploadEntry {
            key: key.clone(),
            url: source_url.to_string(),
            name: name.to_string(),
            kind,
            local: true,
            status: UploadStatus::Uploading,
        });
        key
    }

    /// Swap the optimistic entry for the server-confirmed asset, re-keying it
    /// by the persisted id. Position in the list is preserved.
    pub fn complete_upload(&mut self, key: &EntryKey, asset: &Asset) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.key == *key) else {
            return false;
        };
        if let Some(url) = asset.best_url() {
            entry.url = url.to_string();
        }
        if !asset.name.is_empty() {
            entry.name = asset.name.clone();
        }
        entry.key = EntryKey::persisted(&asset.id);
        entry.local = false;
        entry.status = UploadStatus::Success;
        true
    }

    /// Mark one entry failed. The entry stays visible so the failure can be
    /// seen and retried by hand.
    pub fn fail_upload(&mut self, key: &EntryKey, message: impl Into<String>) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.key == *key) else {
            return false;
        };
        entry.local = false;
        entry.status = UploadStatus::Error {
            message: message.into(),
        };
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.active = 0;
    }

    pub fn entries(&self) -> &[UploadEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_pending(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.status == UploadStatus::Uploading)
    }

    pub fn active(&self) -> Option<&UploadEntry> {
        self.entries.get(self.active)
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn select_next(&mut self) {
        if !self.entries.is_empty() {
            self.active = (self.active + 1) % self.entries.len();
        }
    }

    pub fn select_previous(&mut self) {
        if !self.entries.is_empty() {
            self.active = (self.active + self.entries.len() - 1) % self.entries.len();
        }
    }
}
