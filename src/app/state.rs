use time::OffsetDateTime;

use crate::columns::ItemCopy;
use crate::item::Item;
use crate::media::MediaLibrary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Transient user-visible outcome of a save/upload/clear, drained by the
/// presentation layer.
#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// Preview composition with a manual-override escape hatch.
///
/// While clean, the rendered preview is a pure function of the active hook
/// and prompt. A direct edit captures the text as an override and marks the
/// state dirty; from then on selection changes leave the override alone, and
/// only a successful save returns to clean.
#[derive(Debug, Clone, Default)]
pub struct ComposerState {
    prompts: [String; 3],
    hooks: Vec<String>,
    active_prompt: usize,
    active_hook: Option<usize>,
    dirty: bool,
    override_text: String,
    saved_at: Option<OffsetDateTime>,
}

impl ComposerState {
    pub fn from_copy(copy: ItemCopy) -> Self {
        let active_hook = if copy.hooks.is_empty() { None } else { Some(0) };
        Self {
            prompts: copy.prompts,
            hooks: copy.hooks,
            active_prompt: 0,
            active_hook,
            dirty: false,
            override_text: String::new(),
            saved_at: None,
        }
    }

    pub fn prompts(&self) -> &[String; 3] {
        &self.prompts
    }

    pub fn hooks(&self) -> &[String] {
        &self.hooks
    }

    pub fn active_prompt(&self) -> usize {
        self.active_prompt
    }

    pub fn active_hook(&self) -> Option<usize> {
        self.active_hook
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn saved_at(&self) -> Option<OffsetDateTime> {
        self.saved_at
    }

    pub fn select_prompt(&mut self, index: usize) -> bool {
        if index >= self.prompts.len() {
            return false;
        }
        self.active_prompt = index;
        if !self.dirty {
            self.override_text.clear();
        }
        true
    }

    pub fn select_hook(&mut self, index: usize) -> bool {
        if index >= self.hooks.len() {
            return false;
        }
        self.active_hook = Some(index);
        if !self.dirty {
            self.override_text.clear();
        }
        true
    }

    /// A direct edit of the rendered preview: the text becomes authoritative
    /// until the next successful save.
    pub fn edit_preview(&mut self, text: impl Into<String>) {
        self.dirty = true;
        self.override_text = text.into();
    }

    /// Hook + blank line + prompt; absent parts are omitted.
    pub fn composed(&self) -> String {
        let hook = self
            .active_hook
            .and_then(|index| self.hooks.get(index))
            .map(|hook| hook.trim())
            .unwrap_or("");
        let prompt = self
            .prompts
            .get(self.active_prompt)
            .map(|prompt| prompt.trim())
            .unwrap_or("");
        [hook, prompt]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// The text the preview surface shows: the override while dirty, the
    /// composed text otherwise.
    pub fn effective_preview(&self) -> String {
        if self.dirty {
            self.override_text.clone()
        } else {
            self.composed()
        }
    }

    pub fn mark_saved(&mut self, at: OffsetDateTime) {
        self.dirty = false;
        self.override_text.clear();
        self.saved_at = Some(at);
    }
}

/// Everything one item page holds in memory. Scoped to a single session;
/// nothing here is persisted.
#[derive(Debug, Clone, Default)]
pub struct PageState {
    pub item: Option<Item>,
    pub loading: bool,
    pub error: Option<String>,
    pub composer: ComposerState,
    pub media: MediaLibrary,
    notices: Vec<Notice>,
}

impl PageState {
    pub fn push_notice(&mut self, kind: NoticeKind, message: impl Into<String>) {
        self.notices.push(Notice {
            kind,
            message: message.into(),
        });
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}
