use std::collections::BTreeMap;

use crate::annotation::parse_fields;
use crate::error::{Result, ZipviewError};
use crate::model::jaeger::{KeyValue, Log, Process, ProcessTag, RefType, Reference, Span, Trace};
use crate::model::zipkin::{Endpoint, SpanKind, ZipkinSpan};

pub fn transform_span(span: &ZipkinSpan) -> Result<Span> {
    let endpoint = local_endpoint(span)?;

    let logs = span
        .annotations
        .iter()
        .flatten()
        .map(|a| Log {
            timestamp: a.timestamp,
            fields: parse_fields(&a.value),
        })
        .collect();

    let tags = span
        .tags
        .iter()
        .flatten()
        .map(|(key, value)| KeyValue {
            key: key.clone(),
            value: value.clone(),
        })
        .collect();

    let references = span
        .parent_id
        .as_ref()
        .map(|parent_id| Reference {
            ref_type: if span.kind == Some(SpanKind::Consumer) {
                RefType::FollowsFrom
            } else {
                RefType::ChildOf
            },
            trace_id: span.trace_id.clone(),
            span_id: parent_id.clone(),
        })
        .into_iter()
        .collect();

    Ok(Span {
        span_id: span.id.clone(),
        trace_id: span.trace_id.clone(),
        process_id: endpoint.service_name.clone(),
        operation_name: span.name.clone(),
        start_time: span.timestamp,
        duration: span.duration,
        logs,
        tags,
        references,
    })
}

/// Builds one trace from spans that share a trace id.
///
/// When several spans come from the same service, the process entry of the
/// last one wins.
pub fn transform_trace(spans: &[ZipkinSpan]) -> Result<Trace> {
    let first = spans.first().ok_or(ZipviewError::EmptyTrace)?;

    if let Some(stray) = spans.iter().find(|s| s.trace_id != first.trace_id) {
        return Err(ZipviewError::MixedTrace {
            expected: first.trace_id.clone(),
            found: stray.trace_id.clone(),
            span_id: stray.id.clone(),
        });
    }

    let mut processes = BTreeMap::new();
    for span in spans {
        let endpoint = local_endpoint(span)?;
        processes.insert(endpoint.service_name.clone(), process_for(endpoint));
    }

    Ok(Trace {
        trace_id: first.trace_id.clone(),
        spans: spans.iter().map(transform_span).collect::<Result<Vec<_>>>()?,
        processes,
    })
}

pub fn transform_traces(traces: &[Vec<ZipkinSpan>]) -> Result<Vec<Trace>> {
    traces.iter().map(|t| transform_trace(t)).collect()
}

fn local_endpoint(span: &ZipkinSpan) -> Result<&Endpoint> {
    span.local_endpoint
        .as_ref()
        .ok_or_else(|| ZipviewError::InvalidSpan {
            span_id: span.id.clone(),
            reason: "missing localEndpoint".to_string(),
        })
}

fn process_for(endpoint: &Endpoint) -> Process {
    Process {
        service_name: endpoint.service_name.clone(),
        tags: vec![
            ProcessTag {
                key: "hostname".to_string(),
                value: Some(endpoint.service_name.clone()),
            },
            ProcessTag {
                key: "ip".to_string(),
                value: endpoint.ipv4.clone(),
            },
        ],
    }
}
