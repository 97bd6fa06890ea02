use serde_json::json;

use crate::item::{Asset, Item};
use crate::remote::{self, upload, ApiError, FilePayload, PlatformClient};

/// Thin mutation dispatcher over the injected platform client. Validates the
/// identifiers a mutation needs before anything goes over the wire.
pub struct ActionDispatcher<'a, C> {
    client: &'a C,
}

impl<'a, C: PlatformClient> ActionDispatcher<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Write the preview text into the given column. Returns the
    /// JSON-encoded value that was written so the caller can mirror it into
    /// local state.
    pub async fn save_preview(
        &self,
        item: &Item,
        column_id: &str,
        text: &str,
    ) -> Result<String, ApiError> {
        let board_id = item.board_id().ok_or(ApiError::MissingIdentifier("board"))?;
        let value = json!({ "text": text }).to_string();
        remote::change_column_value(self.client, &item.id, board_id, column_id, &value).await?;
        Ok(value)
    }

    /// Empty the file column. Succeeds only on a confirming id from the
    /// mutation; callers keep local state untouched otherwise.
    pub async fn clear_media(&self, item: &Item, column_id: &str) -> Result<(), ApiError> {
        let board_id = item.board_id().ok_or(ApiError::MissingIdentifier("board"))?;
        let value = json!({ "files": [] }).to_string();
        remote::change_column_value(self.client, &item.id, board_id, column_id, &value).await?;
        Ok(())
    }

    /// Push one file into the file column, then resolve the stored asset so
    /// the caller gets real URLs back.
    pub async fn upload_file(
        &self,
        item: &Item,
        column_id: &str,
        file: FilePayload,
    ) -> Result<Asset, ApiError> {
        let asset_id = upload::add_file_to_column(self.client, &item.id, column_id, file).await?;
        remote::fetch_asset(self.client, &asset_id).await
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::{json, Value};

    use super::*;
    use crate::item::BoardRef;
    use crate::remote::testing::ScriptedClient;

    fn item(board: Option<BoardRef>) -> Item {
        Item {
            id: "123".into(),
            name: "Launch post".into(),
            board,
            column_values: Vec::new(),
            assets: Vec::new(),
        }
    }

    fn board() -> Option<BoardRef> {
        Some(BoardRef {
            id: "77".into(),
            name: "Content".into(),
        })
    }

    #[tokio::test]
    async fn save_preview_sends_a_json_text_value() {
        let client =
            ScriptedClient::new(|_, _, _| Ok(json!({ "change_column_value": { "id": "5" } })));
        let value = ActionDispatcher::new(&client)
            .save_preview(&item(board()), "text_a", "Hi\n\nWorld")
            .await
            .expect("saved");
        assert_eq!(
            serde_json::from_str::<Value>(&value).expect("json"),
            json!({ "text": "Hi\n\nWorld" })
        );
        let calls = client.api_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1["columnId"], "text_a");
        assert_eq!(calls[0].1["boardId"], "77");
    }

    #[tokio::test]
    async fn mutations_refuse_to_run_without_a_board_id() {
        let client = ScriptedClient::new(|_, _, _| Ok(json!({})));
        let dispatcher = ActionDispatcher::new(&client);
        let orphan = item(None);

        let err = dispatcher
            .save_preview(&orphan, "text_a", "x")
            .await
            .unwrap_err();
        assert_matches!(err, ApiError::MissingIdentifier("board"));
        let err = dispatcher.clear_media(&orphan, "file_a").await.unwrap_err();
        assert_matches!(err, ApiError::MissingIdentifier("board"));
        assert!(client.api_calls().is_empty());
    }

    #[tokio::test]
    async fn upload_resolves_the_confirmed_asset() {
        let client = ScriptedClient::new(|_, _, variables| {
            assert_eq!(variables["ids"], json!(["42"]));
            Ok(json!({ "assets": [{
                "id": "42",
                "name": "pic.png",
                "public_url": "https://cdn/pic.png",
            }]}))
        })
        .with_upload(|_, _, _| Ok(json!({ "add_file_to_column": { "id": "42" } })));

        let asset = ActionDispatcher::new(&client)
            .upload_file(
                &item(board()),
                "file_a",
                FilePayload {
                    name: "pic.png".into(),
                    mime: None,
                    bytes: Vec::new(),
                },
            )
            .await
            .expect("asset");
        assert_eq!(asset.id, "42");
        assert_eq!(asset.best_url(), Some("https://cdn/pic.png"));
    }
}
