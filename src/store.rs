//! # Table store
//!
//! Hosted table storage reached over REST.
//!
//! Holds all persisted state in three tables — `admins`, `clients` and
//! `intake_forms` — behind a query-builder dialect: filters become
//! `column=eq.value` query parameters, writes are `POST`/`PATCH` with a
//! JSON body, and a `Prefer` header controls upsert resolution and whether
//! the affected rows come back in the response.
//!
//! ## Requirements
//!
//! - One call per logical step, no batching, no caching
//! - Conflict resolution on the store's uniqueness constraints
//!   (`clients.mobile`, `intake_forms.client_id`, `admins.username`)
//! - Store failures surface verbatim to the caller
//!
//! ## Schema expectations
//!
//! - `admins`: id, username (unique), password
//! - `clients`: id, client_id, name, mobile (unique), created_at
//! - `intake_forms`: id, client_id (unique), the form columns,
//!   admin_signature, status, created_at, updated_at
use reqwest::{Client, Method, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("store payload could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("{0}")]
    Api(String),

    #[error("expected a {0} row, found none")]
    RowMissing(&'static str),
}

/// How an insert behaves when it lands on an existing row.
#[derive(Clone, Copy)]
pub enum OnConflict {
    /// Overwrite the columns carried by the payload, keep the rest.
    MergeDuplicates,
    /// Keep the existing row untouched; the response carries no row.
    IgnoreDuplicates,
}

impl OnConflict {
    fn as_str(self) -> &'static str {
        match self {
            OnConflict::MergeDuplicates => "merge-duplicates",
            OnConflict::IgnoreDuplicates => "ignore-duplicates",
        }
    }
}

pub struct Store {
    http: Client,
    rest_url: String,
    api_key: String,
}

impl Store {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: Client::new(),
            rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        }
    }

    pub fn from(&self, table: &'static str) -> Query<'_> {
        Query {
            store: self,
            table,
            pairs: Vec::new(),
            columns: "*",
            order: None,
        }
    }
}

pub struct Query<'a> {
    store: &'a Store,
    table: &'static str,
    pairs: Vec<(String, String)>,
    columns: &'static str,
    order: Option<String>,
}

impl Query<'_> {
    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.pairs.push((column.to_string(), format!("eq.{value}")));
        self
    }

    pub fn select(mut self, columns: &'static str) -> Self {
        self.columns = columns;
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order = Some(format!("{column}.desc"));
        self
    }

    pub async fn fetch_all<T: DeserializeOwned>(self) -> Result<Vec<T>, StoreError> {
        let response = self.execute(Method::GET, None, None).await?;

        Ok(response.json().await?)
    }

    pub async fn maybe_single<T: DeserializeOwned>(self) -> Result<Option<T>, StoreError> {
        Ok(self.fetch_all().await?.into_iter().next())
    }

    pub async fn single<T: DeserializeOwned>(self) -> Result<T, StoreError> {
        let table = self.table;

        self.maybe_single().await?.ok_or(StoreError::RowMissing(table))
    }

    /// Insert one row, resolving collisions on `conflict_column` per the
    /// store's uniqueness constraint. With [`OnConflict::IgnoreDuplicates`]
    /// a skipped insert yields `None`.
    pub async fn upsert<T, B>(
        mut self,
        row: &B,
        conflict_column: &str,
        resolution: OnConflict,
    ) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        self.pairs
            .push(("on_conflict".to_string(), conflict_column.to_string()));

        let prefer = format!("resolution={},return=representation", resolution.as_str());
        let body = serde_json::to_value([row])?;
        let response = self.execute(Method::POST, Some(prefer), Some(body)).await?;
        let mut rows: Vec<T> = response.json().await?;

        Ok(rows.pop())
    }

    /// Apply a partial overwrite to every row matching the filters,
    /// returning the rows as they stand afterwards.
    pub async fn update<T, B>(self, patch: &B) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let body = serde_json::to_value(patch)?;
        let prefer = "return=representation".to_string();
        let response = self.execute(Method::PATCH, Some(prefer), Some(body)).await?;

        Ok(response.json().await?)
    }

    fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.pairs.clone();
        pairs.push(("select".to_string(), self.columns.to_string()));

        if let Some(order) = &self.order {
            pairs.push(("order".to_string(), order.clone()));
        }

        pairs
    }

    async fn execute(
        self,
        method: Method,
        prefer: Option<String>,
        body: Option<Value>,
    ) -> Result<Response, StoreError> {
        let url = format!("{}/{}", self.store.rest_url, self.table);

        let mut request = self
            .store
            .http
            .request(method, url)
            .header("apikey", &self.store.api_key)
            .bearer_auth(&self.store.api_key)
            .query(&self.query_pairs());

        if let Some(prefer) = prefer {
            request = request.header("Prefer", prefer);
        }

        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();

        Err(StoreError::Api(api_message(status, &body)))
    }
}

/// The store reports failures as `{"message": ...}` bodies; fall back to the
/// raw body, then to the bare status, so the caller always gets something.
fn api_message(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string());

    if detail.is_empty() {
        format!("store returned {status}")
    } else {
        detail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::new("http://localhost:54321/", "secret")
    }

    #[test]
    fn test_rest_url_trims_trailing_slash() {
        assert_eq!(store().rest_url, "http://localhost:54321/rest/v1");
    }

    #[test]
    fn test_query_pairs_default_select() {
        let store = store();
        let query = store.from("clients");

        assert_eq!(
            query.query_pairs(),
            vec![("select".to_string(), "*".to_string())]
        );
    }

    #[test]
    fn test_query_pairs_filters_and_order() {
        let store = store();
        let query = store
            .from("clients")
            .eq("client_id", "A1B2C3")
            .eq("mobile", "9001")
            .order_desc("created_at");

        assert_eq!(
            query.query_pairs(),
            vec![
                ("client_id".to_string(), "eq.A1B2C3".to_string()),
                ("mobile".to_string(), "eq.9001".to_string()),
                ("select".to_string(), "*".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_pairs_narrowed_select() {
        let store = store();
        let query = store.from("intake_forms").select("id,client_id,created_at");

        assert_eq!(
            query.query_pairs(),
            vec![("select".to_string(), "id,client_id,created_at".to_string())]
        );
    }

    #[test]
    fn test_api_message_prefers_store_message() {
        let body = r#"{"code":"23505","message":"duplicate key value"}"#;

        assert_eq!(
            api_message(StatusCode::CONFLICT, body),
            "duplicate key value"
        );
    }

    #[test]
    fn test_api_message_falls_back_to_body_then_status() {
        assert_eq!(
            api_message(StatusCode::BAD_GATEWAY, "upstream unreachable"),
            "upstream unreachable"
        );
        assert_eq!(
            api_message(StatusCode::BAD_GATEWAY, ""),
            "store returned 502 Bad Gateway"
        );
    }

    #[test]
    fn test_conflict_resolutions() {
        assert_eq!(OnConflict::MergeDuplicates.as_str(), "merge-duplicates");
        assert_eq!(OnConflict::IgnoreDuplicates.as_str(), "ignore-duplicates");
    }
}
