use std::collections::{HashMap, HashSet};

use owo_colors::OwoColorize;
use zipview_core::model::jaeger::{RefType, Span, Trace};
use zipview_core::model::zipkin::DependencyLink;

pub fn print_traces_human(traces: &[Trace], color: bool) {
    for trace in traces {
        for line in render_trace(trace, color) {
            println!("{line}");
        }
    }
    println!("-- {} traces --", traces.len());
}

pub fn print_names_human(names: &[String], label: &str) {
    for name in names {
        println!("{name}");
    }
    println!("-- {} {label} --", names.len());
}

pub fn print_dependencies_human(links: &[DependencyLink]) {
    for link in links {
        let errors = link
            .error_count
            .map(|e| format!(" errors={e}"))
            .unwrap_or_default();
        println!(
            "{} -> {} calls={}{errors}",
            link.parent, link.child, link.call_count
        );
    }
    println!("-- {} links --", links.len());
}

pub fn render_trace(trace: &Trace, color: bool) -> Vec<String> {
    let start = trace.spans.iter().map(|s| s.start_time).min().unwrap_or(0);
    let end = trace
        .spans
        .iter()
        .map(|s| s.start_time.saturating_add(s.duration))
        .max()
        .unwrap_or(0);

    let mut lines = vec![format!(
        "TRACE {} duration={}ms spans={} services={}",
        trace.trace_id,
        end.saturating_sub(start) / 1000,
        trace.spans.len(),
        trace.processes.len()
    )];
    render_span_tree(&trace.spans, color, &mut lines);
    lines
}

fn render_span_tree(spans: &[Span], color: bool, out: &mut Vec<String>) {
    let known: HashSet<&str> = spans.iter().map(|s| s.span_id.as_str()).collect();
    let mut children: HashMap<Option<&str>, Vec<&Span>> = HashMap::new();
    for span in spans {
        // Spans whose parent is not part of the trace are drawn as roots.
        let parent = span
            .references
            .first()
            .map(|r| r.span_id.as_str())
            .filter(|p| known.contains(p));
        children.entry(parent).or_default().push(span);
    }
    if let Some(roots) = children.get(&None) {
        for root in roots {
            render_node(root, &children, 0, color, out);
        }
    }
}

fn render_node(
    span: &Span,
    children: &HashMap<Option<&str>, Vec<&Span>>,
    depth: usize,
    color: bool,
    out: &mut Vec<String>,
) {
    let indent = "  ".repeat(depth);
    let service = if color {
        span.process_id.cyan().to_string()
    } else {
        span.process_id.clone()
    };
    let follows = match span.references.first().map(|r| r.ref_type) {
        Some(RefType::FollowsFrom) => " (follows)",
        _ => "",
    };
    out.push(format!(
        "{indent}{service} {} ({}ms){follows}",
        span.operation_name,
        span.duration / 1000
    ));
    for log in &span.logs {
        let fields = log
            .fields
            .iter()
            .map(|f| format!("{}={}", f.key, f.value))
            .collect::<Vec<_>>()
            .join(" ");
        out.push(format!("{indent}  @{} {fields}", log.timestamp));
    }

    if let Some(kids) = children.get(&Some(span.span_id.as_str())) {
        for child in kids {
            render_node(child, children, depth + 1, color, out);
        }
    }
}
