use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::{json, Value};
use thiserror::Error;

use crate::item::{Asset, Item, ItemSummary};

pub mod queries;
pub mod upload;

pub use upload::FilePayload;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("api error: {0}")]
    Api(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("missing {0} identifier for mutation")]
    MissingIdentifier(&'static str),
    #[error("no {0} column resolvable on this item")]
    MissingColumn(&'static str),
    #[error("malformed api response: {0}")]
    Decode(String),
}

/// Capability surface handed to everything that talks to the platform.
/// Injected rather than ambient so fetch/mutation behaviour is testable
/// against a scripted implementation.
#[allow(async_fn_in_trait)]
pub trait PlatformClient {
    async fn api(&self, query: &str, variables: Value) -> Result<Value, ApiError>;
    async fn upload(
        &self,
        query: &str,
        variables: Value,
        file: FilePayload,
    ) -> Result<Value, ApiError>;
}

/// Production client: GraphQL POSTs and multipart uploads against the
/// platform's API origin.
pub struct HttpPlatformClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
}

impl HttpPlatformClient {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            token: token.into(),
        }
    }
}

impl PlatformClient for HttpPlatformClient {
    async fn api(&self, query: &str, variables: Value) -> Result<Value, ApiError> {
        let body = json!({ "query": query, "variables": variables });
        let response = self
            .http
            .post(self.endpoint.as_str())
            .header(AUTHORIZATION, &self.token)
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?;
        decode_envelope(response.json().await?)
    }

    async fn upload(
        &self,
        query: &str,
        variables: Value,
        file: FilePayload,
    ) -> Result<Value, ApiError> {
        let form = upload::multipart_form(query, variables, file)?;
        let response = self
            .http
            .post(self.endpoint.as_str())
            .header(AUTHORIZATION, &self.token)
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await?;
        decode_envelope(response.json().await?)
    }
}

/// Unwrap a GraphQL response envelope: surface the first reported error,
/// otherwise hand back the `data` payload.
fn decode_envelope(envelope: Value) -> Result<Value, ApiError> {
    if let Some(message) = error_message(&envelope) {
        return Err(ApiError::Api(message));
    }
    envelope
        .get("data")
        .cloned()
        .ok_or_else(|| ApiError::Decode("response carried no data".into()))
}

// The raw API reports `errors: [{message}]`; the host SDK shape is a single
// top-level `error`. Accept both.
fn error_message(envelope: &Value) -> Option<String> {
    if let Some(first) = envelope
        .get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
    {
        return Some(
            first
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| first.to_string()),
        );
    }
    match envelope.get("error") {
        Some(Value::String(message)) if !message.is_empty() => Some(message.clone()),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    }
}

static SCHEMA_MISMATCH_PATTERNS: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        Regex::new(r"(?i)expected type \[Int!?\]!?").expect("schema mismatch pattern"),
        Regex::new(r#"(?i)expecting type "\[Int!?\]!?""#).expect("schema mismatch pattern"),
    ]
});

/// Does this error text say the identifier argument should have been an
/// integer list? Deployments phrase it two ways.
pub fn is_integer_schema_mismatch(message: &str) -> bool {
    SCHEMA_MISMATCH_PATTERNS
        .iter()
        .any(|pattern| pattern.is_match(message))
}

/// Fetch one item, adapting to the deployment's identifier schema: try the
/// `[ID!]`-typed query first and, only when the API rejects it with an
/// integer-type mismatch AND the identifier parses as an integer, retry once
/// with the `[Int!]`-typed query. Everything else propagates unchanged.
pub async fn fetch_item_smart<C: PlatformClient>(
    client: &C,
    item_id: &str,
) -> Result<Item, ApiError> {
    let first = client
        .api(queries::ITEM_QUERY_ID, json!({ "itemIds": [item_id] }))
        .await
        .and_then(|data| first_item(data, item_id));
    let err = match first {
        Ok(item) => return Ok(item),
        Err(err) => err,
    };

    let id_as_int = item_id
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|_| is_integer_schema_mismatch(&err.to_string()));
    let Some(id_as_int) = id_as_int else {
        return Err(err);
    };

    tracing::warn!(
        reason = "item_query_schema_fallback",
        item = %item_id,
        error = %err,
        "identifier rejected as [ID!], retrying with integer-typed ids"
    );
    let data = client
        .api(queries::ITEM_QUERY_INT, json!({ "itemIds": [id_as_int] }))
        .await?;
    first_item(data, item_id)
}

fn first_item(data: Value, item_id: &str) -> Result<Item, ApiError> {
    let Some(raw) = data
        .get("items")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
    else {
        return Err(ApiError::NotFound(format!("item {item_id}")));
    };
    serde_json::from_value(raw.clone()).map_err(|err| ApiError::Decode(err.to_string()))
}

/// First page of items on a board. An unknown board yields an empty list.
pub async fn fetch_board_items<C: PlatformClient>(
    client: &C,
    board_id: &str,
    limit: usize,
) -> Result<Vec<ItemSummary>, ApiError> {
    let data = client
        .api(
            queries::BOARD_ITEMS_QUERY,
            json!({ "boardId": board_id, "limit": limit }),
        )
        .await?;
    let Some(raw) = data.pointer("/boards/0/items_page/items") else {
        return Ok(Vec::new());
    };
    serde_json::from_value(raw.clone()).map_err(|err| ApiError::Decode(err.to_string()))
}

/// Resolve an asset's URL variants after an upload has confirmed its id.
pub async fn fetch_asset<C: PlatformClient>(client: &C, asset_id: &str) -> Result<Asset, ApiError> {
    let data = client
        .api(queries::ASSETS_QUERY, json!({ "ids": [asset_id] }))
        .await?;
    let Some(raw) = data
        .get("assets")
        .and_then(Value::as_array)
        .and_then(|assets| assets.first())
    else {
        return Err(ApiError::NotFound(format!("asset {asset_id}")));
    };
    serde_json::from_value(raw.clone()).map_err(|err| ApiError::Decode(err.to_string()))
}

/// Write a JSON-encoded column value. Only a response carrying a confirming
/// id counts as success; callers must not commit local state without one.
pub async fn change_column_value<C: PlatformClient>(
    client: &C,
    item_id: &str,
    board_id: &str,
    column_id: &str,
    value: &str,
) -> Result<String, ApiError> {
    let data = client
        .api(
            queries::CHANGE_COLUMN_VALUE_MUTATION,
            json!({
                "itemId": item_id,
                "boardId": board_id,
                "columnId": column_id,
                "value": value,
            }),
        )
        .await?;
    data.pointer("/change_column_value/id")
        .and_then(value_as_id)
        .ok_or_else(|| ApiError::Api("column mutation returned no confirming id".into()))
}

// Ids come back as strings on some deployments and as numbers on others.
pub(crate) fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    type ApiHandler = Box<dyn Fn(usize, &str, &Value) -> Result<Value, ApiError> + Send + Sync>;
    type UploadHandler = Box<dyn Fn(&str, &Value, &FilePayload) -> Result<Value, ApiError> + Send + Sync>;

    /// Scripted in-memory client: answers `api`/`upload` through closures and
    /// records every call for assertions.
    pub(crate) struct ScriptedClient {
        api_handler: ApiHandler,
        upload_handler: UploadHandler,
        api_calls: Mutex<Vec<(String, Value)>>,
        upload_calls: Mutex<Vec<(String, Value, String)>>,
    }

    impl ScriptedClient {
        pub fn new(
            api: impl Fn(usize, &str, &Value) -> Result<Value, ApiError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                api_handler: Box::new(api),
                upload_handler: Box::new(|_, _, _| Err(ApiError::Api("upload not scripted".into()))),
                api_calls: Mutex::new(Vec::new()),
                upload_calls: Mutex::new(Vec::new()),
            }
        }

        pub fn with_upload(
            mut self,
            upload: impl Fn(&str, &Value, &FilePayload) -> Result<Value, ApiError>
                + Send
                + Sync
                + 'static,
        ) -> Self {
            self.upload_handler = Box::new(upload);
            self
        }

        pub fn api_calls(&self) -> Vec<(String, Value)> {
            self.api_calls.lock().expect("api call log").clone()
        }

        pub fn uploaded_file_names(&self) -> Vec<String> {
            self.upload_calls
                .lock()
                .expect("upload call log")
                .iter()
                .map(|(_, _, name)| name.clone())
                .collect()
        }
    }

    impl PlatformClient for ScriptedClient {
        async fn api(&self, query: &str, variables: Value) -> Result<Value, ApiError> {
            let index = {
                let mut calls = self.api_calls.lock().expect("api call log");
                calls.push((query.to_string(), variables.clone()));
                calls.len() - 1
            };
            (self.api_handler)(index, query, &variables)
        }

        async fn upload(
            &self,
            query: &str,
            variables: Value,
            file: FilePayload,
        ) -> Result<Value, ApiError> {
            self.upload_calls.lock().expect("upload call log").push((
                query.to_string(),
                variables.clone(),
                file.name.clone(),
            ));
            (self.upload_handler)(query, &variables, &file)
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::testing::ScriptedClient;
    use super::*;

    fn item_payload(id: &str) -> Value {
        json!({
            "items": [{
                "id": id,
                "name": "Launch post",
                "board": { "id": "77", "name": "Content" },
                "column_values": [],
                "assets": [],
            }]
        })
    }

    #[test]
    fn recognises_both_schema_mismatch_phrasings() {
        assert!(is_integer_schema_mismatch(
            "Variable $itemIds of type [ID!] was provided invalid value, expected type [Int!]!"
        ));
        assert!(is_integer_schema_mismatch(
            r#"Argument 'ids' on Field 'items' has an invalid value, expecting type "[Int!]!""#
        ));
        assert!(!is_integer_schema_mismatch("No item via ID schema"));
    }

    #[tokio::test]
    async fn smart_fetch_returns_first_attempt_without_fallback() {
        let client = ScriptedClient::new(|_, _, _| Ok(item_payload("123")));
        let item = fetch_item_smart(&client, "123").await.expect("item");
        assert_eq!(item.id, "123");
        let calls = client.api_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, queries::ITEM_QUERY_ID);
        assert_eq!(calls[0].1, json!({ "itemIds": ["123"] }));
    }

    #[tokio::test]
    async fn smart_fetch_retries_with_integer_ids_on_schema_mismatch() {
        let client = ScriptedClient::new(|index, _, _| {
            if index == 0 {
                Err(ApiError::Api("expected type [Int!]!".into()))
            } else {
                Ok(item_payload("123"))
            }
        });
        let item = fetch_item_smart(&client, "123").await.expect("item");
        assert_eq!(item.id, "123");
        let calls = client.api_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].0, queries::ITEM_QUERY_INT);
        assert_eq!(calls[1].1, json!({ "itemIds": [123] }));
    }

    #[tokio::test]
    async fn smart_fetch_propagates_unrelated_errors_without_retry() {
        let client = ScriptedClient::new(|_, _, _| Err(ApiError::Api("rate limited".into())));
        let err = fetch_item_smart(&client, "123").await.unwrap_err();
        assert_matches!(err, ApiError::Api(message) if message == "rate limited");
        assert_eq!(client.api_calls().len(), 1);
    }

    #[tokio::test]
    async fn smart_fetch_does_not_retry_non_numeric_identifiers() {
        let client = ScriptedClient::new(|_, _, _| Err(ApiError::Api("expected type [Int!]!".into())));
        let err = fetch_item_smart(&client, "pulse-9").await.unwrap_err();
        assert_matches!(err, ApiError::Api(_));
        assert_eq!(client.api_calls().len(), 1);
    }

    #[tokio::test]
    async fn smart_fetch_maps_empty_result_to_not_found() {
        let client = ScriptedClient::new(|_, _, _| Ok(json!({ "items": [] })));
        let err = fetch_item_smart(&client, "123").await.unwrap_err();
        assert_matches!(err, ApiError::NotFound(_));
        assert_eq!(client.api_calls().len(), 1);
    }

    #[tokio::test]
    async fn board_items_flatten_the_items_page() {
        let client = ScriptedClient::new(|_, _, _| {
            Ok(json!({
                "boards": [{ "items_page": { "items": [
                    { "id": "1", "name": "First" },
                    { "id": "2", "name": "Second" },
                ]}}]
            }))
        });
        let items = fetch_board_items(&client, "77", 200).await.expect("items");
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].name, "Second");

        let empty = ScriptedClient::new(|_, _, _| Ok(json!({ "boards": [] })));
        assert!(fetch_board_items(&empty, "0", 200).await.expect("items").is_empty());
    }

    #[tokio::test]
    async fn column_mutation_requires_a_confirming_id() {
        let confirmed = ScriptedClient::new(|_, _, _| {
            Ok(json!({ "change_column_value": { "id": "555" } }))
        });
        let id = change_column_value(&confirmed, "1", "77", "text_a", "{}")
            .await
            .expect("id");
        assert_eq!(id, "555");

        let unconfirmed =
            ScriptedClient::new(|_, _, _| Ok(json!({ "change_column_value": null })));
        let err = change_column_value(&unconfirmed, "1", "77", "text_a", "{}")
            .await
            .unwrap_err();
        assert_matches!(err, ApiError::Api(_));
    }

    #[test]
    fn envelope_surfaces_graphql_and_sdk_error_shapes() {
        let graphql = json!({ "errors": [{ "message": "boom" }], "data": null });
        assert_matches!(decode_envelope(graphql), Err(ApiError::Api(message)) if message == "boom");

        let sdk = json!({ "error": "denied" });
        assert_matches!(decode_envelope(sdk), Err(ApiError::Api(message)) if message == "denied");

        let clean = json!({ "errors": [], "data": { "ok": true } });
        assert_eq!(decode_envelope(clean).expect("data"), json!({ "ok": true }));
    }

    #[test]
    fn ids_decode_from_strings_and_numbers() {
        assert_eq!(value_as_id(&json!("9")), Some("9".into()));
        assert_eq!(value_as_id(&json!(9)), Some("9".into()));
        assert_eq!(value_as_id(&json!("")), None);
        assert_eq!(value_as_id(&Value::Null), None);
    }
}
