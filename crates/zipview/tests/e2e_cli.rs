use std::net::TcpListener;
use std::path::Path;
use std::process::{Command, Output};

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_zipview")
}

fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn run(temp: &Path, args: &[&str]) -> Output {
    Command::new(bin())
        .args(args)
        .env("ZIPVIEW_CONFIG", temp.join("missing.toml"))
        .env_remove("ZIPVIEW_BASE_URL")
        .env_remove("ZIPVIEW_HEADERS")
        .env("RUST_LOG", "off")
        .output()
        .unwrap()
}

fn write_json(temp: &Path, name: &str, value: &serde_json::Value) -> String {
    let path = temp.join(name);
    std::fs::write(&path, serde_json::to_vec(value).unwrap()).unwrap();
    path.display().to_string()
}

#[test]
fn convert_single_trace_prints_jaeger_envelope() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let path = write_json(temp.path(), "trace.json", &testkit::sample_trace_json("abc123"));

    let out = run(temp.path(), &["--json", "convert", &path]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let doc: serde_json::Value = serde_json::from_slice(&out.stdout)?;
    let trace = &doc["data"][0];
    assert_eq!(trace["traceID"], "abc123");
    assert_eq!(trace["spans"].as_array().map(Vec::len), Some(3));
    assert_eq!(trace["spans"][2]["references"][0]["refType"], "FOLLOWS_FROM");
    assert!(trace["processes"]["api"].is_object());
    assert!(trace["processes"]["worker"].is_object());
    Ok(())
}

#[test]
fn convert_trace_list_keeps_order() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let doc = serde_json::json!([
        testkit::sample_trace_json("t2"),
        testkit::sample_trace_json("t1")
    ]);
    let path = write_json(temp.path(), "traces.json", &doc);

    let out = run(temp.path(), &["--json", "convert", &path]);
    assert!(out.status.success());

    let doc: serde_json::Value = serde_json::from_slice(&out.stdout)?;
    assert_eq!(doc["data"][0]["traceID"], "t2");
    assert_eq!(doc["data"][1]["traceID"], "t1");
    Ok(())
}

#[test]
fn convert_human_output_draws_span_tree() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let path = write_json(temp.path(), "trace.json", &testkit::sample_trace_json("t1"));

    let out = run(temp.path(), &["convert", &path]);
    assert!(out.status.success());

    let stdout = String::from_utf8(out.stdout)?;
    assert!(stdout.starts_with("TRACE t1 duration=1800ms spans=3 services=2"));
    assert!(stdout.contains("\n  worker orders.process (400ms) (follows)\n"));
    assert!(stdout.ends_with("-- 1 traces --\n"));
    Ok(())
}

#[test]
fn convert_rejects_empty_trace() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let path = write_json(temp.path(), "empty.json", &serde_json::json!([]));

    let out = run(temp.path(), &["convert", &path]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("empty span list"));
    Ok(())
}

#[test]
fn unreachable_backend_fails_with_context() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let base = format!("http://127.0.0.1:{}", closed_port());

    let out = run(temp.path(), &["--base-url", &base, "services"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("fetch services"));
    Ok(())
}
