use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Request};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Failure reported by the backend with an HTTP status of 400 or above.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StatusError {
    pub status: u16,
    pub status_text: String,
    /// Raw body, or the pretty-printed form when it was JSON.
    pub body: String,
    pub url: String,
    pub query: Option<String>,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error(transparent)]
    Status(Box<StatusError>),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to build http client: {0}")]
    Build(#[source] reqwest::Error),
}

impl HttpError {
    pub fn status(&self) -> Option<&StatusError> {
        match self {
            HttpError::Status(e) => Some(&**e),
            _ => None,
        }
    }
}

/// Thin JSON client. Every request carries the configured credential headers.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: Client,
}

impl FetchClient {
    pub fn new(timeout: Duration, headers: &[(String, String)]) -> Result<Self, HttpError> {
        let http = Client::builder()
            .timeout(timeout)
            .default_headers(build_headers(headers))
            .build()
            .map_err(HttpError::Build)?;
        Ok(Self { http })
    }

    pub async fn get_json<T, Q>(&self, url: &str, query: Option<&Q>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let mut builder = self.http.request(Method::GET, url);
        if let Some(query) = query {
            builder = builder.query(query);
        }
        let request = builder.build().map_err(|source| HttpError::Transport {
            url: url.to_string(),
            source,
        })?;
        self.execute(request).await
    }

    pub async fn post_json<T>(&self, url: &str) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        let request = self
            .http
            .request(Method::POST, url)
            .build()
            .map_err(|source| HttpError::Transport {
                url: url.to_string(),
                source,
            })?;
        self.execute(request).await
    }

    async fn execute<T>(&self, request: Request) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        let url = request.url().to_string();
        let query = request.url().query().map(str::to_string);
        tracing::debug!(method = %request.method(), url = %url, "zipkin request");

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|source| HttpError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| HttpError::Transport {
                url: url.clone(),
                source,
            })?;

        if status.as_u16() >= 400 {
            let status_text = status.canonical_reason().unwrap_or_default().to_string();
            tracing::warn!(status = status.as_u16(), url = %url, "zipkin request failed");
            return Err(HttpError::Status(Box::new(status_error(
                status.as_u16(),
                status_text,
                &body,
                url,
                query,
            ))));
        }

        // Zipkin answers some POSTs with an empty 2xx body.
        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(body).map_err(|source| HttpError::Decode { url, source })
    }
}

fn status_error(
    status: u16,
    status_text: String,
    body: &str,
    url: String,
    query: Option<String>,
) -> StatusError {
    let json = serde_json::from_str::<serde_json::Value>(body).ok();
    let message = json
        .as_ref()
        .and_then(backend_message)
        .or_else(|| (!body.trim().is_empty()).then(|| body.to_string()))
        .unwrap_or_else(|| format!("{status} {status_text}").trim_end().to_string());
    let body = json
        .as_ref()
        .and_then(|v| serde_json::to_string_pretty(v).ok())
        .unwrap_or_else(|| body.to_string());

    StatusError {
        status,
        status_text,
        body,
        url,
        query,
        message,
    }
}

/// Prefers `{code, msg}`, then `{errors: [...]}`.
fn backend_message(json: &serde_json::Value) -> Option<String> {
    if let (Some(code), Some(msg)) = (json.get("code"), json.get("msg").and_then(|m| m.as_str())) {
        let code = code
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| code.to_string());
        return Some(format!("{code} - {msg}"));
    }

    let errors = json.get("errors")?.as_array()?;
    let messages: Vec<String> = errors
        .iter()
        .map(|e| match e {
            serde_json::Value::String(s) => s.clone(),
            other => other
                .get("msg")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| other.to_string()),
        })
        .collect();
    (!messages.is_empty()).then(|| messages.join("; "))
}

fn build_headers(headers: &[(String, String)]) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (k, v) in headers {
        let name = HeaderName::try_from(k.as_str());
        let value = HeaderValue::try_from(v.as_str());
        match (name, value) {
            (Ok(name), Ok(mut value)) => {
                value.set_sensitive(true);
                out.insert(name, value);
            }
            _ => {
                tracing::warn!(header = %k, "ignored invalid request header");
            }
        }
    }
    out
}
