// url-status-lib/tests/integration.rs

//! End-to-end runs of the engine against a local mock HTTP server.

use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;

use url_status_lib::{
    CheckConfig, OutputFormat, ResultSink, StatusChecker, UrlStatusError, WorkSource, WorkerPool,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mock_site() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/good"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/moved"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/good"))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    server
}

/// Run the pool over `input` and return the output lines.
///
/// The sink writes into one end of an in-memory pipe; the other end is
/// drained concurrently so the run never blocks on a full buffer.
async fn run(config: &CheckConfig, input: String) -> Result<Vec<String>, UrlStatusError> {
    let checker = StatusChecker::from_config(config)?;
    let source = WorkSource::new(std::io::Cursor::new(input.into_bytes()));

    let (mut reader, writer) = tokio::io::duplex(64 * 1024);
    let sink = ResultSink::new(writer, config.format).with_csv_headers(config.csv_headers);

    let collector = tokio::spawn(async move {
        let mut output = String::new();
        reader.read_to_string(&mut output).await.map(|_| output)
    });

    WorkerPool::from_config(config).run(source, checker, sink).await?;

    let output = collector.await.unwrap().unwrap();
    Ok(output.lines().map(str::to_string).collect())
}

#[tokio::test]
async fn test_mixed_urls_produce_one_record_each() {
    let server = mock_site().await;
    let base = server.uri();
    let schemeless = base.trim_start_matches("http://");

    let input = format!(
        "{base}/good\n\n{base}/missing\n  {base}/moved  \n{schemeless}/good\nmalformed::url\n{base}/slow\n",
    );

    let config = CheckConfig::default()
        .with_concurrency(2)
        .with_timeout(Duration::from_millis(500));
    let lines = run(&config, input).await.unwrap();

    assert_eq!(lines.len(), 6, "{:#?}", lines);
    assert!(lines.contains(&format!("{base}/good,200")));
    assert!(lines.contains(&format!("{base}/missing,404")));
    assert!(lines.contains(&format!("{base}/moved,200")));
    assert!(lines.contains(&format!("{schemeless}/good,200")));
    assert!(lines
        .iter()
        .any(|l| l.starts_with("malformed::url,") && l.contains("ERROR: ")));
    let timed_out = format!("{base}/slow,ERROR: Timeout after 500ms during: HEAD {base}/slow");
    assert!(lines.contains(&timed_out), "{:#?}", lines);
}

#[tokio::test]
async fn test_json_output_with_large_pool() {
    let server = mock_site().await;
    let input: String = (0..40).map(|_| format!("{}/good\n", server.uri())).collect();

    let config = CheckConfig::default()
        .with_concurrency(200)
        .with_format(OutputFormat::Json);
    let lines = run(&config, input).await.unwrap();

    assert_eq!(lines.len(), 40);
    for line in lines {
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["status"], 200);
    }
}

#[tokio::test]
async fn test_domain_rate_limit_spaces_requests() {
    let server = mock_site().await;
    // The mock server listens on 127.0.0.1
    let input: String = (0..3).map(|_| format!("{}/good\n", server.uri())).collect();

    let config = CheckConfig::default()
        .with_concurrency(3)
        .with_rate_limits(vec!["127.0.0.1:4".to_string(), "unrelated.example:0.1".to_string()]);

    let start = Instant::now();
    let lines = run(&config, input).await.unwrap();

    assert_eq!(lines.len(), 3);
    // Three requests at 4/s need at least two 250ms gaps
    assert!(start.elapsed() >= Duration::from_millis(500));
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_bad_rate_fails_before_any_work() {
    let config = CheckConfig::default().with_rate_limits(vec!["example.com:often".to_string()]);
    let err = run(&config, "http://example.com\n".to_string())
        .await
        .unwrap_err();

    assert!(err.is_configuration());
    assert_eq!(err.to_string(), "Invalid rate format: \"example.com:often\"");
}
