use once_cell::sync::Lazy;
use regex::Regex;

use crate::item::ColumnValue;

/// Column type tags the platform uses for plain/long/rich text columns.
/// Both dash and underscore spellings occur across deployments.
pub const TEXTUAL_COLUMN_TYPES: [&str; 5] =
    ["text", "long-text", "long_text", "rich-text", "rich_text"];

const HOOK_LIMIT: usize = 10;

static PROMPT_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"(?i)prompt\s*1").expect("prompt 1 pattern"),
        Regex::new(r"(?i)prompt\s*2").expect("prompt 2 pattern"),
        Regex::new(r"(?i)prompt\s*3").expect("prompt 3 pattern"),
    ]
});

static HOOK_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)hook").expect("hook pattern"));

static PREVIEW_TITLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)linkedin preview|linkedin\s*copy|preview|linkedin")
        .expect("preview title pattern")
});

static MEDIA_TITLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)media").expect("media title pattern"));

// Hook columns hold one free-text blob; fragments are delimited by newlines,
// "3. "-style numeric markers, or bullet characters at line start or after
// whitespace.
static HOOK_SPLIT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)\r?\n|(?:^|\s)\d+\.\s+|(?:^|\s)[•\-–]\s+").expect("hook split pattern")
});

/// Prompt and hook text pulled out of an item's columns. Absent matches are
/// empty, never errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemCopy {
    pub prompts: [String; 3],
    pub hooks: Vec<String>,
}

pub fn is_textual(kind: &str) -> bool {
    let kind = kind.to_lowercase();
    TEXTUAL_COLUMN_TYPES.contains(&kind.as_str())
}

/// Locate a column by fuzzy match: first column whose title matches, else
/// first column whose id matches. Id hits are logged so silent heuristic
/// fallbacks stay auditable.
fn column_by_pattern<'a>(cols: &'a [ColumnValue], pattern: &Regex) -> Option<&'a ColumnValue> {
    if let Some(cv) = cols.iter().find(|cv| pattern.is_match(cv.title())) {
        return Some(cv);
    }
    let by_id = cols.iter().find(|cv| pattern.is_match(&cv.id));
    if let Some(cv) = by_id {
        tracing::debug!(
            reason = "column_matched_by_id",
            column = %cv.id,
            pattern = %pattern.as_str(),
            "no title matched, fell back to column id"
        );
    }
    by_id
}

/// Pull the three prompt texts and the decomposed hook list out of a column
/// set. Pure and total: missing columns yield empty strings / an empty list.
pub fn extract_prompts_and_hooks(cols: &[ColumnValue]) -> ItemCopy {
    let mut prompts: [String; 3] = Default::default();
    for (slot, pattern) in prompts.iter_mut().zip(PROMPT_PATTERNS.iter()) {
        if let Some(cv) = column_by_pattern(cols, pattern) {
            *slot = cv.text().to_string();
        }
    }

    let hooks = column_by_pattern(cols, &HOOK_PATTERN)
        .map(|cv| split_hooks(cv.text()))
        .unwrap_or_default();

    ItemCopy { prompts, hooks }
}

/// Decompose a free-text hook blob into at most `HOOK_LIMIT` trimmed
/// fragments, preserving order. Lossy by design: anything the delimiters do
/// not segment stays joined rather than being dropped.
pub fn split_hooks(raw: &str) -> Vec<String> {
    HOOK_SPLIT_PATTERN
        .split(raw)
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .take(HOOK_LIMIT)
        .map(ToOwned::to_owned)
        .collect()
}

/// Pick the column the composed preview is written to. Ordered rule table,
/// first match wins: the pinned internal id (when textual), then a textual
/// column with a preview-ish title, then any textual column at all. The last
/// rule is a guess, so selecting through it emits a structured warning.
pub fn pick_preview_column<'a>(
    cols: &'a [ColumnValue],
    pinned_id: &str,
) -> Option<&'a ColumnValue> {
    type Rule<'p> = (&'static str, Box<dyn Fn(&ColumnValue) -> bool + 'p>);
    let rules: [Rule<'_>; 3] = [
        (
            "pinned_id",
            Box::new(|cv: &ColumnValue| {
                cv.id.eq_ignore_ascii_case(pinned_id) && is_textual(cv.kind())
            }),
        ),
        (
            "title_match",
            Box::new(|cv: &ColumnValue| {
                is_textual(cv.kind()) && PREVIEW_TITLE_PATTERN.is_match(cv.title())
            }),
        ),
        ("any_textual", Box::new(|cv: &ColumnValue| is_textual(cv.kind()))),
    ];

    for (purpose, matches) in &rules {
        if let Some(cv) = cols.iter().find(|&cv| matches(cv)) {
            if *purpose == "any_textual" {
                tracing::warn!(
                    reason = "preview_column_fallback",
                    column = %cv.id,
                    title = %cv.title(),
                    kind = %cv.kind(),
                    "no pinned or titled preview column; selected first textual column"
                );
            }
            return Some(cv);
        }
    }

    tracing::warn!(
        reason = "preview_column_missing",
        candidates = cols.len(),
        "no textual column available for the preview"
    );
    None
}

/// Pick the file column media uploads target: the pinned internal id, else
/// the first column titled like "Media".
pub fn pick_media_column<'a>(cols: &'a [ColumnValue], pinned_id: &str) -> Option<&'a ColumnValue> {
    if let Some(cv) = cols.iter().find(|cv| cv.id.eq_ignore_ascii_case(pinned_id)) {
        return Some(cv);
    }
    if let Some(cv) = cols
        .iter()
        .find(|cv| MEDIA_TITLE_PATTERN.is_match(cv.title()))
    {
        tracing::debug!(
            reason = "media_column_by_title",
            column = %cv.id,
            "pinned media column absent, matched by title"
        );
        return Some(cv);
    }
    tracing::warn!(
        reason = "media_column_missing",
        candidates = cols.len(),
        "no media column resolvable on this item"
    );
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Column;

    fn cv(id: &str, title: &str, kind: &str, text: &str) -> ColumnValue {
        ColumnValue {
            id: id.into(),
            text: Some(text.into()),
            column: Some(Column {
                title: title.into(),
                kind: kind.into(),
            }),
            value: None,
        }
    }

    #[test]
    fn numbered_hook_lines_split_into_fragments() {
        let hooks = split_hooks("1. A\n2. B\n3. C");
        assert_eq!(hooks, vec!["A", "B", "C"]);
    }

    #[test]
    fn bullet_and_dash_markers_split_hooks() {
        assert_eq!(split_hooks("• one • two"), vec!["one", "two"]);
        assert_eq!(split_hooks("- alpha\n- beta"), vec!["alpha", "beta"]);
        assert_eq!(split_hooks("– eins – zwei"), vec!["eins", "zwei"]);
    }

    #[test]
    fn intra_word_dashes_and_decimals_survive_splitting() {
        assert_eq!(
            split_hooks("Send an e-mail in 3.5 minutes"),
            vec!["Send an e-mail in 3.5 minutes"]
        );
    }

    #[test]
    fn hooks_are_capped_at_ten_in_original_order() {
        let raw = (1..=14)
            .map(|n| format!("{n}. hook {n}"))
            .collect::<Vec<_>>()
            .join("\n");
        let hooks = split_hooks(&raw);
        assert_eq!(hooks.len(), 10);
        assert_eq!(hooks[0], "hook 1");
        assert_eq!(hooks[9], "hook 10");
    }

    #[test]
    fn extracts_prompts_by_title_with_id_fallback() {
        let cols = vec![
            cv("c1", "Prompt 1", "long-text", "first"),
            cv("prompt 3", "Something else", "text", "third"),
            cv("c2", "10 Hooks", "long-text", "1. A\n2. B"),
        ];
        let copy = extract_prompts_and_hooks(&cols);
        assert_eq!(copy.prompts[0], "first");
        assert_eq!(copy.prompts[1], "");
        assert_eq!(copy.prompts[2], "third");
        assert_eq!(copy.hooks, vec!["A", "B"]);
    }

    #[test]
    fn missing_everything_yields_empty_copy() {
        let copy = extract_prompts_and_hooks(&[]);
        assert_eq!(copy, ItemCopy::default());
    }

    #[test]
    fn pinned_id_beats_preview_title() {
        let cols = vec![
            cv("other", "LinkedIn Preview", "long-text", ""),
            cv("text_mkx3qq8w", "Random", "text", ""),
        ];
        let picked = pick_preview_column(&cols, "text_mkx3qq8w").expect("column");
        assert_eq!(picked.id, "text_mkx3qq8w");
    }

    #[test]
    fn preview_title_beats_plain_textual_fallback() {
        let cols = vec![
            cv("a", "Notes", "text", ""),
            cv("b", "LinkedIn Copy", "long_text", ""),
        ];
        let picked = pick_preview_column(&cols, "text_mkx3qq8w").expect("column");
        assert_eq!(picked.id, "b");
    }

    #[test]
    fn lone_unrelated_textual_column_is_the_fallback() {
        let cols = vec![cv("a", "Notes", "rich_text", "")];
        let picked = pick_preview_column(&cols, "text_mkx3qq8w").expect("column");
        assert_eq!(picked.id, "a");
    }

    #[test]
    fn no_textual_columns_yields_none() {
        let cols = vec![cv("a", "Preview", "status", ""), cv("b", "Media", "file", "")];
        assert!(pick_preview_column(&cols, "text_mkx3qq8w").is_none());
    }

    #[test]
    fn pinned_id_without_textual_type_is_skipped() {
        let cols = vec![
            cv("text_mkx3qq8w", "Pinned", "status", ""),
            cv("b", "Preview", "text", ""),
        ];
        let picked = pick_preview_column(&cols, "text_mkx3qq8w").expect("column");
        assert_eq!(picked.id, "b");
    }

    #[test]
    fn media_column_prefers_pinned_id_then_title() {
        let cols = vec![
            cv("files_misc", "Media", "file", ""),
            cv("file_mkwyrehq", "Attachments", "file", ""),
        ];
        let picked = pick_media_column(&cols, "file_mkwyrehq").expect("column");
        assert_eq!(picked.id, "file_mkwyrehq");

        let title_only = vec![cv("files_misc", "Media Files", "file", "")];
        let picked = pick_media_column(&title_only, "file_mkwyrehq").expect("column");
        assert_eq!(picked.id, "files_misc");

        assert!(pick_media_column(&[], "file_mkwyrehq").is_none());
    }
}
