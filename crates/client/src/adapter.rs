use futures::future::try_join_all;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zipview_core::ZipviewError;
use zipview_core::config::Config;
use zipview_core::model::jaeger::Trace;
use zipview_core::model::zipkin::{DependencyLink, ZipkinSpan};
use zipview_core::query::{SearchQuery, translate_query};
use zipview_core::transform::{transform_trace, transform_traces};
use zipview_core::url::prefix_url;

use crate::http::{FetchClient, HttpError};

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Transform(#[from] ZipviewError),

    #[error("invalid Zipkin api url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

pub type Result<T> = std::result::Result<T, AdapterError>;

/// Response envelope the Jaeger UI expects around every payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiEnvelope<T> {
    pub data: T,
}

impl<T> ApiEnvelope<T> {
    fn new(data: T) -> Self {
        Self { data }
    }
}

/// Trace ids as the Jaeger UI passes them when comparing traces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TraceIds {
    #[serde(rename = "traceID")]
    pub trace_id: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OperationsQuery<'a> {
    service_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DependenciesQuery {
    end_ts: u64,
    lookback: u64,
}

/// Serves Jaeger-shaped data from a Zipkin v2 backend.
#[derive(Debug, Clone)]
pub struct ZipkinAdapter {
    client: FetchClient,
    api_base: Url,
    dependency_lookback_ms: u64,
}

impl ZipkinAdapter {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = FetchClient::new(cfg.request_timeout, &cfg.headers)?;
        let api_base = format!(
            "{}{}",
            cfg.base_url.trim_end_matches('/'),
            prefix_url(&cfg.site_prefix, Some(&cfg.api_root))
        );
        let api_base = Url::parse(&api_base).map_err(|e| AdapterError::InvalidUrl {
            url: api_base.clone(),
            reason: e.to_string(),
        })?;
        if api_base.cannot_be_a_base() {
            return Err(AdapterError::InvalidUrl {
                url: api_base.to_string(),
                reason: "not a hierarchical url".to_string(),
            });
        }
        Ok(Self {
            client,
            api_base,
            dependency_lookback_ms: cfg.dependency_lookback_ms(),
        })
    }

    pub fn api_base(&self) -> &str {
        self.api_base.as_str().trim_end_matches('/')
    }

    pub async fn fetch_trace(&self, id: &str) -> Result<ApiEnvelope<Vec<Trace>>> {
        let spans = self.fetch_spans(id).await?;
        Ok(ApiEnvelope::new(vec![transform_trace(&spans)?]))
    }

    /// Fetches every trace concurrently; the first failure aborts the whole set.
    pub async fn fetch_traces(&self, ids: &TraceIds) -> Result<ApiEnvelope<Vec<Trace>>> {
        let fetched = try_join_all(ids.trace_id.iter().map(|id| self.fetch_spans(id))).await?;
        tracing::debug!(count = fetched.len(), "fetched traces");
        Ok(ApiEnvelope::new(transform_traces(&fetched)?))
    }

    pub async fn archive_trace(&self, id: &str) -> Result<ApiEnvelope<serde_json::Value>> {
        let url = self.item_url("archive", id);
        let data = self.client.post_json(&url).await?;
        Ok(ApiEnvelope::new(data))
    }

    pub async fn search_traces(&self, query: &SearchQuery) -> Result<ApiEnvelope<Vec<Trace>>> {
        let zipkin_query = translate_query(query);
        tracing::debug!(query = ?zipkin_query, "searching traces");
        let raw: Vec<Vec<ZipkinSpan>> = self
            .client
            .get_json(&self.url("/traces"), Some(&zipkin_query))
            .await?;
        Ok(ApiEnvelope::new(transform_traces(&raw)?))
    }

    pub async fn fetch_services(&self) -> Result<ApiEnvelope<Vec<String>>> {
        let services = self
            .client
            .get_json::<_, ()>(&self.url("/services"), None)
            .await?;
        Ok(ApiEnvelope::new(services))
    }

    pub async fn fetch_service_operations(&self, service: &str) -> Result<ApiEnvelope<Vec<String>>> {
        let query = OperationsQuery {
            service_name: service,
        };
        let operations = self
            .client
            .get_json(&self.url("/spans"), Some(&query))
            .await?;
        Ok(ApiEnvelope::new(operations))
    }

    /// `end_ts` defaults to now and `lookback` to the configured window, both in ms.
    pub async fn fetch_dependencies(
        &self,
        end_ts: Option<u64>,
        lookback: Option<u64>,
    ) -> Result<ApiEnvelope<Vec<DependencyLink>>> {
        let query = DependenciesQuery {
            end_ts: end_ts.unwrap_or_else(now_ms),
            lookback: lookback.unwrap_or(self.dependency_lookback_ms),
        };
        let links = self
            .client
            .get_json(&self.url("/dependencies"), Some(&query))
            .await?;
        Ok(ApiEnvelope::new(links))
    }

    async fn fetch_spans(&self, id: &str) -> std::result::Result<Vec<ZipkinSpan>, HttpError> {
        self.client
            .get_json::<_, ()>(&self.item_url("trace", id), None)
            .await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base())
    }

    /// `{api}/{collection}/{id}` with `id` percent-encoded as one path segment.
    fn item_url(&self, collection: &str, id: &str) -> String {
        let mut url = self.api_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(collection).push(id);
        }
        url.to_string()
    }
}

fn now_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}
