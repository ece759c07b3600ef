use crate::document::{SearchDocument, SearchQuery, SearchResult};
use crate::error::SearchSyncError;
use crate::port::SearchIndexPort;
use archive_models::Id;
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// ExternalIndex talks to an external Meilisearch-shaped HTTP service —
/// the `meili_service` the original delegated full-text search to whenever
/// `search_backend == "meili"`. `index_ready` is cached per process the
/// same way the teacher caches loaded settings: a `OnceCell`-guarded flag
/// that short-circuits the provisioning call after the first success.
pub struct ExternalIndex {
    client: reqwest::Client,
    base_url: String,
    index_uid: String,
    api_key: Option<String>,
    index_ready: AtomicBool,
}

static DEFAULT_CLIENT: OnceCell<reqwest::Client> = OnceCell::new();

impl ExternalIndex {
    pub fn new(base_url: impl Into<String>, index_uid: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        let client = DEFAULT_CLIENT
            .get_or_init(|| {
                reqwest::Client::builder()
                    .timeout(timeout)
                    .build()
                    .expect("reqwest client config is valid")
            })
            .clone();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            index_uid: index_uid.into(),
            api_key,
            index_ready: AtomicBool::new(false),
        }
    }

    fn headers(&self) -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(key) = &self.api_key {
            if let Ok(value) = reqwest::header::HeaderValue::from_str(&format!("Bearer {key}")) {
                headers.insert(reqwest::header::AUTHORIZATION, value);
            }
        }
        headers
    }

    async fn request_json(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, SearchSyncError> {
        let url = format!("{}{path}", self.base_url);
        let mut req = self.client.request(method, url).headers(self.headers());
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await?;
        let status = response.status();
        if status.as_u16() >= 400 {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_owned());
            return Err(SearchSyncError::Backend {
                status: status.as_u16(),
                message,
            });
        }
        if response.content_length() == Some(0) {
            return Ok(serde_json::Value::Null);
        }
        Ok(response.json().await.unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait]
impl SearchIndexPort for ExternalIndex {
    async fn ensure_index(&self) -> Result<(), SearchSyncError> {
        if self.index_ready.load(Ordering::Acquire) {
            return Ok(());
        }

        let create = self
            .request_json(
                reqwest::Method::POST,
                "/indexes",
                Some(serde_json::json!({"uid": self.index_uid, "primaryKey": "id"})),
            )
            .await;
        if let Err(SearchSyncError::Backend { status, .. }) = &create {
            if *status != 409 {
                create?;
            }
        } else {
            create?;
        }

        self.request_json(
            reqwest::Method::PATCH,
            &format!("/indexes/{}/settings", self.index_uid),
            Some(serde_json::json!({
                "searchableAttributes": ["title", "description", "summary", "caption_raw", "category", "tags", "source_ref"],
                "filterableAttributes": ["category_id", "category", "review_status", "source", "source_ref", "event_date", "tag_slugs", "is_uncategorized"],
                "sortableAttributes": ["event_date", "ingested_at", "title", "created_at"],
            })),
        )
        .await?;

        self.index_ready.store(true, Ordering::Release);
        Ok(())
    }

    async fn upsert_many(&self, documents: &[SearchDocument]) -> Result<usize, SearchSyncError> {
        if documents.is_empty() {
            return Ok(0);
        }
        self.ensure_index().await?;
        let payload = serde_json::to_value(documents).map_err(|err| SearchSyncError::Backend {
            status: 0,
            message: err.to_string(),
        })?;
        self.request_json(
            reqwest::Method::POST,
            &format!("/indexes/{}/documents", self.index_uid),
            Some(payload),
        )
        .await?;
        Ok(documents.len())
    }

    async fn delete_one(&self, id: Id) -> Result<(), SearchSyncError> {
        self.ensure_index().await?;
        self.request_json(
            reqwest::Method::DELETE,
            &format!("/indexes/{}/documents/{id}", self.index_uid),
            None,
        )
        .await?;
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResult, SearchSyncError> {
        self.ensure_index().await?;

        let filter_expr = build_filter_expression(query);
        let mut body = serde_json::json!({
            "q": query.text,
            "offset": query.offset(),
            "limit": query.size.max(1),
            "sort": [format!("{}:{}", query.sort_by.as_str(), query.sort_order.as_str())],
        });
        if let Some(expr) = filter_expr {
            body["filter"] = serde_json::Value::String(expr);
        }

        let result = self
            .request_json(
                reqwest::Method::POST,
                &format!("/indexes/{}/search", self.index_uid),
                Some(body),
            )
            .await?;

        let ids = result["hits"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|hit| hit.get("id").and_then(|v| v.as_str()))
            .filter_map(|raw| raw.parse::<uuid::Uuid>().ok())
            .map(Id::from_uuid)
            .collect::<Vec<_>>();
        let total = result["totalHits"]
            .as_u64()
            .or_else(|| result["estimatedTotalHits"].as_u64())
            .unwrap_or(ids.len() as u64);

        Ok(SearchResult { ids, total })
    }
}

fn escape_filter_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn build_filter_expression(query: &SearchQuery) -> Option<String> {
    let filter = &query.filter;
    let mut clauses = Vec::new();

    if let Some(category_id) = filter.category_id {
        clauses.push(format!(r#"category_id = "{category_id}""#));
    }
    if let Some(tag_slug) = &filter.tag_slug {
        clauses.push(format!(r#"tag_slugs = "{}""#, escape_filter_value(tag_slug)));
    }
    if let Some(from) = filter.event_date_from {
        clauses.push(format!(r#"event_date >= "{from}""#));
    }
    if let Some(to) = filter.event_date_to {
        clauses.push(format!(r#"event_date <= "{to}""#));
    }
    if let Some(status) = filter.review_status {
        clauses.push(format!(r#"review_status = "{}""#, status.as_str()));
    }

    if clauses.is_empty() {
        None
    } else {
        Some(clauses.join(" AND "))
    }
}
