//! PostgREST row store.
//!
//! Reads the hosted `destination_views`, `destination_visits` and
//! `destinations` tables over the REST interface exposed by the backend.
//! Raw rows are normalized into engine events at this boundary.

use super::rows::{DestinationRow, ViewRow, VisitRow};
use super::{EventFilter, EventStore, StoreError, StoreResult};
use crate::models::{Category, Destination, EventKind, ViewEvent, VisitEvent};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

const DESTINATIONS_TABLE: &str = "destinations";

/// Row store backed by a PostgREST endpoint.
#[derive(Debug, Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    row_cap: usize,
}

impl RestStore {
    /// Create a store for `base_url` (the project URL, without `/rest/v1`).
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
        row_cap: usize,
    ) -> StoreResult<Self> {
        if base_url.trim().is_empty() {
            return Err(StoreError::NotConfigured("missing store URL".to_string()));
        }
        if api_key.trim().is_empty() {
            return Err(StoreError::NotConfigured("missing API key".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| StoreError::Http {
                table: "client".to_string(),
                source,
            })?;

        info!("Using row store at {}", base_url);

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            row_cap,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn get_rows<R: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(String, String)],
    ) -> StoreResult<Vec<R>> {
        debug!("GET {} {:?}", table, params);

        let response = self
            .request(Method::GET, table)
            .query(params)
            .send()
            .await
            .map_err(|source| StoreError::Http {
                table: table.to_string(),
                source,
            })?;

        let response = check_status(table, response).await?;

        response
            .json::<Vec<R>>()
            .await
            .map_err(|e| StoreError::Decode {
                table: table.to_string(),
                message: e.to_string(),
            })
    }

    /// Exact row count via `HEAD` with `Prefer: count=exact`.
    async fn count_rows(&self, table: &str, params: &[(String, String)]) -> StoreResult<u64> {
        debug!("HEAD {} {:?}", table, params);

        let response = self
            .request(Method::HEAD, table)
            .header("Prefer", "count=exact")
            .query(params)
            .send()
            .await
            .map_err(|source| StoreError::Http {
                table: table.to_string(),
                source,
            })?;

        let response = check_status(table, response).await?;

        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| StoreError::Decode {
                table: table.to_string(),
                message: "missing or invalid Content-Range header".to_string(),
            })
    }
}

async fn check_status(table: &str, response: Response) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        table: table.to_string(),
        status: status.as_u16(),
        body,
    })
}

fn timestamp_param(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// PostgREST filter for a canonical category, as a `(key, value)` pair.
///
/// The column may hold either the code or the label in any casing, so known
/// categories match both spellings through `ilike`.
fn category_param(category: &Category) -> (String, String) {
    match category {
        Category::Other(raw) => ("category".to_string(), format!("ilike.{}", raw)),
        known => (
            "or".to_string(),
            format!(
                "(category.ilike.{},category.ilike.\"{}\")",
                known.code(),
                known.label()
            ),
        ),
    }
}

/// Filter parameters shared by row and count queries.
fn filter_params(kind: EventKind, filter: &EventFilter) -> Vec<(String, String)> {
    let ts = kind.timestamp_column();
    let mut params = Vec::new();

    if let Some(since) = filter.since {
        params.push((ts.to_string(), format!("gte.{}", timestamp_param(since))));
    }
    if let Some(until) = filter.until {
        params.push((ts.to_string(), format!("lt.{}", timestamp_param(until))));
    }
    if let Some(ref category) = filter.category {
        params.push(category_param(category));
    }
    if kind == EventKind::Visit {
        if let Some(ref types) = filter.visit_types {
            let list: Vec<&str> = types.iter().map(|t| t.as_str()).collect();
            params.push(("visit_type".to_string(), format!("in.({})", list.join(","))));
        }
    }

    params
}

/// Full parameter list for a capped, most-recent-first row query.
pub(crate) fn event_query(
    kind: EventKind,
    filter: &EventFilter,
    row_cap: usize,
) -> Vec<(String, String)> {
    let select = match kind {
        EventKind::View => "destination_name,category,municipality,viewed_at",
        EventKind::Visit => "destination_name,category,municipality,visited_at,visit_type",
    };

    let mut params = vec![("select".to_string(), select.to_string())];
    params.extend(filter_params(kind, filter));
    params.push((
        "order".to_string(),
        format!("{}.desc", kind.timestamp_column()),
    ));
    params.push((
        "limit".to_string(),
        filter.effective_limit(row_cap).to_string(),
    ));
    params
}

/// Total from a `Content-Range` header such as `0-24/3573` or `*/0`.
pub(crate) fn parse_content_range(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

#[async_trait]
impl EventStore for RestStore {
    async fn fetch_views(&self, filter: &EventFilter) -> StoreResult<Vec<ViewEvent>> {
        let params = event_query(EventKind::View, filter, self.row_cap);
        let rows: Vec<ViewRow> = self.get_rows(EventKind::View.table(), &params).await?;
        Ok(rows.into_iter().map(ViewEvent::from).collect())
    }

    async fn fetch_visits(&self, filter: &EventFilter) -> StoreResult<Vec<VisitEvent>> {
        let params = event_query(EventKind::Visit, filter, self.row_cap);
        let rows: Vec<VisitRow> = self.get_rows(EventKind::Visit.table(), &params).await?;
        Ok(rows.into_iter().map(VisitEvent::from).collect())
    }

    async fn count(&self, kind: EventKind, filter: &EventFilter) -> StoreResult<u64> {
        self.count_rows(kind.table(), &filter_params(kind, filter)).await
    }

    async fn fetch_destinations(&self) -> StoreResult<Vec<Destination>> {
        let params = vec![
            ("select".to_string(), "name,category,location".to_string()),
            ("limit".to_string(), self.row_cap.to_string()),
        ];
        let rows: Vec<DestinationRow> = self.get_rows(DESTINATIONS_TABLE, &params).await?;
        Ok(rows.into_iter().map(Destination::from).collect())
    }

    async fn count_destinations(&self) -> StoreResult<u64> {
        self.count_rows(DESTINATIONS_TABLE, &[]).await
    }
}
