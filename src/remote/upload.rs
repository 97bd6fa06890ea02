//! File-to-column uploads per the GraphQL multipart request convention:
//! an `operations` JSON document with a null `file` variable, a `map` tying
//! form part "0" to that variable, and the file bytes as part "0".

use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};

use super::{queries, value_as_id, ApiError, PlatformClient};

/// One picked file ready to go over the wire.
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

pub(crate) fn multipart_form(
    query: &str,
    variables: Value,
    file: FilePayload,
) -> Result<Form, ApiError> {
    let operations = serde_json::to_string(&json!({ "query": query, "variables": variables }))
        .map_err(|err| ApiError::Decode(err.to_string()))?;
    let map = serde_json::to_string(&json!({ "0": ["variables.file"] }))
        .map_err(|err| ApiError::Decode(err.to_string()))?;

    let mut part = Part::bytes(file.bytes).file_name(file.name);
    if let Some(mime) = &file.mime {
        part = part.mime_str(mime)?;
    }

    Ok(Form::new()
        .text("operations", operations)
        .text("map", map)
        .part("0", part))
}

/// Attach a file to an item's file column and return the persisted asset id.
/// The mutation only reports the id; URL variants need a follow-up
/// `fetch_asset` lookup.
pub async fn add_file_to_column<C: PlatformClient>(
    client: &C,
    item_id: &str,
    column_id: &str,
    file: FilePayload,
) -> Result<String, ApiError> {
    let variables = json!({
        "file": null,
        "itemId": item_id,
        "columnId": column_id,
    });
    let data = client
        .upload(queries::ADD_FILE_TO_COLUMN_MUTATION, variables, file)
        .await?;
    data.pointer("/add_file_to_column/id")
        .and_then(value_as_id)
        .ok_or_else(|| ApiError::Api("upload returned no asset id".into()))
}
