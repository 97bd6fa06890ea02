use futures::stream::{FuturesUnordered, StreamExt};
use time::OffsetDateTime;

use crate::columns;
use crate::config::ColumnOptions;
use crate::item::Item;
use crate::media::MediaKind;
use crate::remote::{self, ApiError, FilePayload, PlatformClient};

mod actions;
pub mod state;

pub use actions::ActionDispatcher;
pub use state::{ComposerState, Notice, NoticeKind, PageState};

/// One file the user picked for upload: display name, optional MIME type,
/// a locally-resolvable source reference shown while in flight, and bytes.
#[derive(Debug, Clone)]
pub struct PickedFile {
    pub name: String,
    pub mime: Option<String>,
    pub source: String,
    pub bytes: Vec<u8>,
}

/// Guards a fetch against identifier changes: results are only applied if no
/// newer load began while the fetch was in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

#[derive(Clone, Copy)]
enum MutationTarget {
    Preview,
    Media,
}

/// Headless item-page session: holds the page state and runs every remote
/// interaction through an injected client. All awaits interleave on one
/// cooperative task; there is no shared mutable state beyond `PageState`.
pub struct ItemSession {
    state: PageState,
    columns: ColumnOptions,
    generation: u64,
}

impl ItemSession {
    pub fn new(columns: ColumnOptions) -> Self {
        Self {
            state: PageState::default(),
            columns,
            generation: 0,
        }
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut PageState {
        &mut self.state
    }

    /// Start a load. Any ticket issued earlier is invalidated.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        self.state.loading = true;
        self.state.error = None;
        LoadTicket {
            generation: self.generation,
        }
    }

    /// Apply a resolved fetch. Returns false (and changes nothing) when the
    /// ticket is stale.
    pub fn apply_load(&mut self, ticket: LoadTicket, result: Result<Item, ApiError>) -> bool {
        if ticket.generation != self.generation {
            tracing::debug!(
                reason = "stale_load_discarded",
                "identifier changed before the fetch resolved; dropping result"
            );
            return false;
        }
        self.state.loading = false;
        match result {
            Ok(item) => {
                let copy = columns::extract_prompts_and_hooks(&item.column_values);
                self.state.composer = ComposerState::from_copy(copy);
                self.state.media.hydrate(&item.assets);
                self.state.error = None;
                self.state.item = Some(item);
            }
            Err(err) => {
                self.state.error = Some(err.to_string());
            }
        }
        true
    }

    /// Fetch an item and hydrate prompts, hooks and the media list from it.
    pub async fn load<C: PlatformClient>(&mut self, client: &C, item_id: &str) -> bool {
        let ticket = self.begin_load();
        let result = remote::fetch_item_smart(client, item_id).await;
        self.apply_load(ticket, result)
    }

    /// Resolve the item and target column for a mutation, surfacing a notice
    /// when either is missing. The save/clear/upload paths must fail visibly
    /// here rather than write to an arbitrary column.
    fn mutation_target(&mut self, target: MutationTarget) -> Option<(Item, String)> {
        let Some(item) = self.state.item.clone() else {
            self.state
                .push_notice(NoticeKind::Error, "No item loaded; fetch the item first");
            return None;
        };
        let picked = match target {
            MutationTarget::Preview => {
                columns::pick_preview_column(&item.column_values, &self.columns.preview_column_id)
            }
            MutationTarget::Media => {
                columns::pick_media_column(&item.column_values, &self.columns.media_column_id)
            }
        };
        let Some(column) = picked else {
            let err = match target {
                MutationTarget::Preview => ApiError::MissingColumn("preview"),
                MutationTarget::Media => ApiError::MissingColumn("media"),
            };
            self.state.push_notice(NoticeKind::Error, err.to_string());
            return None;
        };
        let column_id = column.id.clone();
        Some((item, column_id))
    }

    /// Write the effective preview text to the preview column. On success the
    /// in-memory item is patched and the composer returns to clean.
    pub async fn save_preview<C: PlatformClient>(&mut self, client: &C) -> bool {
        let Some((item, column_id)) = self.mutation_target(MutationTarget::Preview) else {
            return false;
        };
        let text = self.state.composer.effective_preview().trim().to_string();
        let result = ActionDispatcher::new(client)
            .save_preview(&item, &column_id, &text)
            .await;
        match result {
            Ok(value) => {
                if let Some(item) = self.state.item.as_mut() {
                    item.patch_column_text(&column_id, &text, &value);
                }
                self.state.composer.mark_saved(OffsetDateTime::now_utc());
                self.state
                    .push_notice(NoticeKind::Success, "Preview saved");
                true
            }
            Err(err) => {
                tracing::error!(?err, "failed to save preview column");
                self.state
                    .push_notice(NoticeKind::Error, format!("Save failed: {err}"));
                false
            }
        }
    }

    /// Upload the picked files concurrently. Each file gets its own
    /// optimistic entry immediately; completions are applied in whatever
    /// order the uploads finish, keyed so interleaving cannot touch an
    /// unrelated entry. A failure marks only its own entry.
    pub async fn upload_files<C: PlatformClient>(&mut self, client: &C, files: Vec<PickedFile>) {
        if files.is_empty() {
            return;
        }
        let Some((item, column_id)) = self.mutation_target(MutationTarget::Media) else {
            return;
        };

        let item = &item;
        let mut inflight = FuturesUnordered::new();
        for file in files {
            let kind = file
                .mime
                .as_deref()
                .map(MediaKind::from_mime)
                .unwrap_or_else(|| MediaKind::from_source(&file.name, &file.source));
            let key = self.state.media.begin_upload(&file.name, &file.source, kind);
            let column_id = column_id.clone();
            inflight.push(async move {
                let PickedFile {
                    name, mime, bytes, ..
                } = file;
                let payload = FilePayload {
                    name: name.clone(),
                    mime,
                    bytes,
                };
                let outcome = ActionDispatcher::new(client)
                    .upload_file(item, &column_id, payload)
                    .await;
                (key, name, outcome)
            });
        }

        while let Some((key, name, outcome)) = inflight.next().await {
            match outcome {
                Ok(asset) => {
                    self.state.media.complete_upload(&key, &asset);
                    self.state
                        .push_notice(NoticeKind::Success, format!("Uploaded: {name}"));
                }
                Err(err) => {
                    tracing::error!(?err, file = %name, "upload failed");
                    self.state.media.fail_upload(&key, err.to_string());
                    self.state
                        .push_notice(NoticeKind::Error, format!("Upload failed: {name}"));
                }
            }
        }
    }

    /// Empty the media column remotely, then mirror locally. The local list
    /// is only touched once the mutation confirms.
    pub async fn clear_media<C: PlatformClient>(&mut self, client: &C) -> bool {
        let Some((item, column_id)) = self.mutation_target(MutationTarget::Media) else {
            return false;
        };
        match ActionDispatcher::new(client).clear_media(&item, &column_id).await {
            Ok(()) => {
                self.state.media.clear();
                self.state
                    .push_notice(NoticeKind::Success, "All media cleared");
                true
            }
            Err(err) => {
                tracing::error!(?err, "failed to clear media column");
                self.state
                    .push_notice(NoticeKind::Error, format!("Failed to clear media: {err}"));
                false
            }
        }
    }
}
