mod output;
mod telemetry;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use zipview_client::{ApiEnvelope, TraceIds, ZipkinAdapter};
use zipview_core::config::Config;
use zipview_core::duration::parse_duration;
use zipview_core::model::jaeger::Trace;
use zipview_core::model::zipkin::ZipkinSpan;
use zipview_core::query::{ALL_SERVICES, SearchQuery};
use zipview_core::transform::{transform_trace, transform_traces};

use crate::output::{print_dependencies_human, print_names_human, print_traces_human};
use crate::telemetry::init_cli_tracing;

#[derive(Parser, Debug)]
#[command(name = "zipview")]
#[command(about = "Read Zipkin traces in the Jaeger UI trace model")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    backend: BackendArgs,
}

#[derive(Args, Debug)]
struct BackendArgs {
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[arg(long, global = true)]
    site_prefix: Option<String>,

    #[arg(long, global = true)]
    api_root: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(flatten)]
    Remote(RemoteCommand),
    #[command(about = "Convert a Zipkin JSON file without contacting a backend")]
    Convert { path: PathBuf },
}

/// Commands that talk to a Zipkin backend.
#[derive(Subcommand, Debug)]
enum RemoteCommand {
    #[command(about = "Fetch one trace by id")]
    Trace { trace_id: String },
    #[command(about = "Fetch several traces by id")]
    Traces {
        #[arg(required = true)]
        trace_ids: Vec<String>,
    },
    #[command(about = "Search traces using Jaeger-style parameters")]
    Search {
        #[arg(long, default_value = ALL_SERVICES)]
        service: String,
        #[arg(long)]
        operation: Option<String>,
        #[arg(long, help = "Minimum span duration (e.g. 500us, 2ms)")]
        min_duration: Option<String>,
        #[arg(long, help = "Maximum span duration (e.g. 2s)")]
        max_duration: Option<String>,
        #[arg(long, help = "End of the window in microseconds since epoch (default: now)")]
        end: Option<u64>,
        #[arg(long, default_value_t = 20)]
        limit: u32,
        #[arg(long, help = "Zipkin annotation query, e.g. \"error and http.method=GET\"")]
        tags: Option<String>,
        #[arg(long, default_value = "1h")]
        lookback: String,
    },
    #[command(about = "List service names")]
    Services,
    #[command(about = "List span names recorded for a service")]
    Operations { service: String },
    #[command(about = "Fetch the service dependency graph")]
    Dependencies {
        #[arg(long, help = "End of the window in milliseconds since epoch (default: now)")]
        end_ts: Option<u64>,
        #[arg(long, help = "Window length (e.g. 1d); defaults to the configured lookback")]
        lookback: Option<String>,
    },
    #[command(about = "Archive a trace")]
    Archive { trace_id: String },
}

/// Zipkin JSON is either one trace (a span list) or a list of traces.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ZipkinDocument {
    Trace(Vec<ZipkinSpan>),
    Traces(Vec<Vec<ZipkinSpan>>),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_cli_tracing();

    match cli.command {
        Commands::Convert { path } => {
            let traces = convert_file(&path)?;
            print_traces(&ApiEnvelope { data: traces }, cli.json)
        }
        Commands::Remote(command) => run_remote(command, &cli.backend, cli.json).await,
    }
}

async fn run_remote(command: RemoteCommand, backend: &BackendArgs, json: bool) -> anyhow::Result<()> {
    let cfg = load_config(backend)?;
    let adapter = ZipkinAdapter::new(&cfg)?;
    tracing::debug!(api_base = %adapter.api_base(), "using zipkin backend");

    match command {
        RemoteCommand::Trace { trace_id } => {
            let envelope = adapter
                .fetch_trace(&trace_id)
                .await
                .with_context(|| format!("fetch trace {trace_id}"))?;
            print_traces(&envelope, json)
        }
        RemoteCommand::Traces { trace_ids } => {
            let envelope = adapter
                .fetch_traces(&TraceIds {
                    trace_id: trace_ids,
                })
                .await
                .context("fetch traces")?;
            print_traces(&envelope, json)
        }
        RemoteCommand::Search {
            service,
            operation,
            min_duration,
            max_duration,
            end,
            limit,
            tags,
            lookback,
        } => {
            let query = SearchQuery {
                operation,
                min_duration,
                max_duration,
                end: end.unwrap_or_else(now_micros),
                limit: Some(limit),
                tags,
                lookback: Some(lookback),
                service,
            };
            let envelope = adapter
                .search_traces(&query)
                .await
                .context("search traces")?;
            print_traces(&envelope, json)
        }
        RemoteCommand::Services => {
            let envelope = adapter.fetch_services().await.context("fetch services")?;
            print_envelope(&envelope, json, |v| print_names_human(v, "services"))
        }
        RemoteCommand::Operations { service } => {
            let envelope = adapter
                .fetch_service_operations(&service)
                .await
                .with_context(|| format!("fetch operations for {service}"))?;
            print_envelope(&envelope, json, |v| print_names_human(v, "operations"))
        }
        RemoteCommand::Dependencies { end_ts, lookback } => {
            let lookback = lookback
                .map(|l| {
                    parse_duration(Some(l.as_str()), false)
                        .with_context(|| format!("invalid lookback: {l}"))
                })
                .transpose()?;
            let envelope = adapter
                .fetch_dependencies(end_ts, lookback)
                .await
                .context("fetch dependencies")?;
            print_envelope(&envelope, json, |v| print_dependencies_human(v))
        }
        RemoteCommand::Archive { trace_id } => {
            let envelope = adapter
                .archive_trace(&trace_id)
                .await
                .with_context(|| format!("archive trace {trace_id}"))?;
            print_envelope(&envelope, json, |_| println!("archived {trace_id}"))
        }
    }
}

fn load_config(backend: &BackendArgs) -> anyhow::Result<Config> {
    let mut cfg = Config::load().context("load config")?;
    if let Some(v) = &backend.base_url {
        cfg.base_url = v.clone();
    }
    if let Some(v) = &backend.site_prefix {
        cfg.site_prefix = v.clone();
    }
    if let Some(v) = &backend.api_root {
        cfg.api_root = v.clone();
    }
    Ok(cfg)
}

fn convert_file(path: &Path) -> anyhow::Result<Vec<Trace>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read {}", path.display()))?;
    let document: ZipkinDocument = serde_json::from_str(&raw)
        .with_context(|| format!("parse Zipkin JSON in {}", path.display()))?;
    let traces = match document {
        ZipkinDocument::Trace(spans) => vec![transform_trace(&spans)?],
        ZipkinDocument::Traces(traces) => transform_traces(&traces)?,
    };
    Ok(traces)
}

fn print_traces(envelope: &ApiEnvelope<Vec<Trace>>, json: bool) -> anyhow::Result<()> {
    let color = std::io::stdout().is_terminal();
    print_envelope(envelope, json, |v| print_traces_human(v, color))
}

fn print_envelope<T, F>(envelope: &ApiEnvelope<T>, json: bool, human: F) -> anyhow::Result<()>
where
    T: Serialize,
    F: FnOnce(&T),
{
    if json {
        println!("{}", serde_json::to_string_pretty(envelope)?);
    } else {
        human(&envelope.data);
    }
    Ok(())
}

fn now_micros() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_micros()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zipkin_document_accepts_single_trace() {
        let raw = serde_json::to_string(&testkit::sample_trace("t1")).unwrap();
        let doc: ZipkinDocument = serde_json::from_str(&raw).unwrap();
        assert!(matches!(doc, ZipkinDocument::Trace(spans) if spans.len() == 3));
    }

    #[test]
    fn zipkin_document_accepts_trace_list() {
        let raw = serde_json::to_string(&vec![
            testkit::sample_trace("t1"),
            testkit::sample_trace("t2"),
        ])
        .unwrap();
        let doc: ZipkinDocument = serde_json::from_str(&raw).unwrap();
        assert!(matches!(doc, ZipkinDocument::Traces(traces) if traces.len() == 2));
    }

    #[test]
    fn search_defaults() {
        let cli = Cli::try_parse_from(["zipview", "search"]).unwrap();
        let Commands::Remote(RemoteCommand::Search {
            service,
            limit,
            lookback,
            ..
        }) = cli.command
        else {
            panic!("expected search command");
        };
        assert_eq!(service, "all");
        assert_eq!(limit, 20);
        assert_eq!(lookback, "1h");
    }

    #[test]
    fn convert_is_a_local_command() {
        let cli = Cli::try_parse_from(["zipview", "convert", "trace.json"]).unwrap();
        assert!(matches!(cli.command, Commands::Convert { path } if path == Path::new("trace.json")));
    }

    #[test]
    fn traces_requires_ids() {
        assert!(Cli::try_parse_from(["zipview", "traces"]).is_err());
    }
}
