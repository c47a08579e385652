use indexmap::IndexMap;
use zipview_core::model::zipkin::{Annotation, Endpoint, SpanKind, ZipkinSpan};

const BASE_TS: u64 = 1_769_904_000_000_000;

/// A three-span trace: an API root, a cache call on the same service and a
/// queue consumer on a second service.
pub fn sample_trace(trace_id: &str) -> Vec<ZipkinSpan> {
    let mut root_tags = IndexMap::new();
    root_tags.insert("http.method".to_string(), "GET".to_string());
    root_tags.insert("http.path".to_string(), "/v1/orders".to_string());
    root_tags.insert("error".to_string(), "true".to_string());

    let mut cache_tags = IndexMap::new();
    cache_tags.insert("peer".to_string(), "redis:6379".to_string());

    vec![
        ZipkinSpan {
            id: "a1b2c3d4e5f60001".to_string(),
            trace_id: trace_id.to_string(),
            parent_id: None,
            name: "get /v1/orders".to_string(),
            kind: Some(SpanKind::Server),
            timestamp: BASE_TS,
            duration: 1_800_000,
            local_endpoint: Some(endpoint("api", Some("10.0.0.1"))),
            tags: Some(root_tags),
            ..ZipkinSpan::default()
        },
        ZipkinSpan {
            id: "a1b2c3d4e5f60002".to_string(),
            trace_id: trace_id.to_string(),
            parent_id: Some("a1b2c3d4e5f60001".to_string()),
            name: "cache.get".to_string(),
            kind: Some(SpanKind::Client),
            timestamp: BASE_TS + 900_000,
            duration: 700_000,
            local_endpoint: Some(endpoint("api", Some("10.0.0.2"))),
            remote_endpoint: Some(endpoint("redis", None)),
            tags: Some(cache_tags),
            annotations: Some(vec![
                Annotation {
                    timestamp: BASE_TS + 950_000,
                    value: "retrying attempt=2".to_string(),
                },
                Annotation {
                    timestamp: BASE_TS + 1_200_000,
                    value: "context deadline exceeded".to_string(),
                },
            ]),
            ..ZipkinSpan::default()
        },
        ZipkinSpan {
            id: "a1b2c3d4e5f60003".to_string(),
            trace_id: trace_id.to_string(),
            parent_id: Some("a1b2c3d4e5f60001".to_string()),
            name: "orders.process".to_string(),
            kind: Some(SpanKind::Consumer),
            timestamp: BASE_TS + 1_000_000,
            duration: 400_000,
            local_endpoint: Some(endpoint("worker", None)),
            ..ZipkinSpan::default()
        },
    ]
}

/// The same trace as Zipkin would serialize it.
pub fn sample_trace_json(trace_id: &str) -> serde_json::Value {
    serde_json::to_value(sample_trace(trace_id)).unwrap()
}

fn endpoint(service: &str, ipv4: Option<&str>) -> Endpoint {
    Endpoint {
        service_name: service.to_string(),
        ipv4: ipv4.map(str::to_string),
        ..Endpoint::default()
    }
}
