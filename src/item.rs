use serde::Deserialize;

/// One item fetched from the platform, with its column values and stored
/// assets. Items are always fetched fresh; nothing here is persisted locally.
#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub board: Option<BoardRef>,
    #[serde(default)]
    pub column_values: Vec<ColumnValue>,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoardRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Per-item value instance of a board column. `value` carries the platform's
/// JSON-encoded structured payload and is opaque to us except when we write
/// it back after a save.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnValue {
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub column: Option<Column>,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Column {
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

/// A file already stored against an item on the platform.
#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub url_thumbnail: Option<String>,
    #[serde(default)]
    pub public_url: Option<String>,
}

impl Asset {
    /// URL variants in order of usefulness: public, direct, thumbnail.
    pub fn best_url(&self) -> Option<&str> {
        self.public_url
            .as_deref()
            .or(self.url.as_deref())
            .or(self.url_thumbnail.as_deref())
            .filter(|url| !url.is_empty())
    }
}

/// Bare id/name pair returned by the board items-page query.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemSummary {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl ColumnValue {
    pub fn title(&self) -> &str {
        self.column.as_ref().map(|c| c.title.as_str()).unwrap_or("")
    }

    pub fn kind(&self) -> &str {
        self.column.as_ref().map(|c| c.kind.as_str()).unwrap_or("")
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

impl Item {
    /// The mutation endpoints type the item id as an integer in some
    /// deployments; parse eagerly so a non-numeric id fails before any call.
    pub fn id_as_int(&self) -> Option<i64> {
        self.id.trim().parse::<i64>().ok()
    }

    pub fn board_id(&self) -> Option<&str> {
        self.board.as_ref().map(|b| b.id.as_str())
    }

    /// Apply a saved column value locally so the session reflects the
    /// persisted state without a re-fetch.
    pub fn patch_column_text(&mut self, column_id: &str, text: &str, value: &str) {
        if let Some(cv) = self.column_values.iter_mut().find(|cv| cv.id == column_id) {
            cv.text = Some(text.to_string());
            cv.value = Some(value.to_string());
        }
    }
}
