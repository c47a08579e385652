use serde::{Deserialize, Serialize};

use crate::duration::parse_duration;

/// Service value the Jaeger UI sends when no service filter is selected.
pub const ALL_SERVICES: &str = "all";

/// Search parameters as the Jaeger UI sends them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub min_duration: Option<String>,
    #[serde(default)]
    pub max_duration: Option<String>,
    /// End of the search window in microseconds.
    pub end: u64,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub lookback: Option<String>,
    pub service: String,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            operation: None,
            min_duration: None,
            max_duration: None,
            end: 0,
            limit: None,
            tags: None,
            lookback: None,
            service: ALL_SERVICES.to_string(),
        }
    }
}

/// Query string parameters for Zipkin's `GET /traces`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ZipkinQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_name: Option<String>,
    /// Microseconds, as Zipkin stores span durations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<u64>,
    pub end_ts: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookback: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
}

pub fn translate_query(query: &SearchQuery) -> ZipkinQuery {
    ZipkinQuery {
        span_name: query.operation.clone(),
        min_duration: parse_duration(query.min_duration.as_deref(), true),
        max_duration: parse_duration(query.max_duration.as_deref(), true),
        end_ts: query.end / 1000,
        limit: query.limit,
        annotation_query: query.tags.clone(),
        lookback: parse_duration(query.lookback.as_deref(), false),
        service_name: (query.service != ALL_SERVICES).then(|| query.service.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> SearchQuery {
        SearchQuery {
            operation: Some("GET /api".to_string()),
            min_duration: Some("500us".to_string()),
            max_duration: Some("2s".to_string()),
            end: 1_700_000_000_123_456,
            limit: Some(20),
            tags: Some("error and http.status_code=500".to_string()),
            lookback: Some("1h".to_string()),
            service: "svcA".to_string(),
        }
    }

    #[test]
    fn maps_every_field() {
        let q = translate_query(&base());
        assert_eq!(
            q,
            ZipkinQuery {
                span_name: Some("GET /api".to_string()),
                min_duration: Some(500),
                max_duration: Some(2_000_000),
                end_ts: 1_700_000_000_123,
                limit: Some(20),
                annotation_query: Some("error and http.status_code=500".to_string()),
                lookback: Some(3_600_000),
                service_name: Some("svcA".to_string()),
            }
        );
    }

    #[test]
    fn all_service_omits_service_name() {
        let q = translate_query(&SearchQuery {
            service: "all".to_string(),
            ..base()
        });
        assert_eq!(q.service_name, None);
        let json = serde_json::to_value(&q).unwrap();
        assert!(json.get("serviceName").is_none());
    }

    #[test]
    fn end_is_truncated_to_millis() {
        for (end, expected) in [(0, 0), (999, 0), (1_000, 1), (1_999, 1), (2_000, 2)] {
            let q = translate_query(&SearchQuery { end, ..base() });
            assert_eq!(q.end_ts, expected, "end={end}");
        }
    }

    #[test]
    fn lookback_only_when_present_and_valid() {
        for lookback in [None, Some(String::new()), Some("custom".to_string())] {
            let q = translate_query(&SearchQuery { lookback, ..base() });
            assert_eq!(q.lookback, None);
        }
    }

    #[test]
    fn invalid_durations_are_omitted() {
        let q = translate_query(&SearchQuery {
            min_duration: Some("0ms".to_string()),
            max_duration: None,
            ..base()
        });
        assert_eq!(q.min_duration, None);
        assert_eq!(q.max_duration, None);
    }

    #[test]
    fn durations_keep_microsecond_precision() {
        let q = translate_query(&SearchQuery {
            min_duration: Some("1500us".to_string()),
            max_duration: Some("999us".to_string()),
            ..base()
        });
        assert_eq!(q.min_duration, Some(1_500));
        assert_eq!(q.max_duration, Some(999));
    }

    #[test]
    fn does_not_mutate_input() {
        let input = base();
        let copy = input.clone();
        let _ = translate_query(&input);
        assert_eq!(input, copy);
    }

    #[test]
    fn serializes_zipkin_names() {
        let json = serde_json::to_value(translate_query(&base())).unwrap();
        let keys: Vec<&str> = json
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        for key in [
            "spanName",
            "minDuration",
            "maxDuration",
            "endTs",
            "limit",
            "annotationQuery",
            "lookback",
            "serviceName",
        ] {
            assert!(keys.contains(&key), "missing {key}");
        }
    }
}
