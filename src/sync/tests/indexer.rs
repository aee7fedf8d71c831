//! Listing indexer tests: observation recording, success window, extraction.

use crate::config::SourceEntry;
use crate::sync::indexer::index_source;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

const LISTING: &str = r#"
<html><body>
<h1>Index of /maps</h1>
<a href="../">Parent Directory</a>
<a href="dm_lockdown.bsp.bz2">dm_lockdown.bsp.bz2</a>
<a href="ctf_turbine.bsp">ctf_turbine.bsp</a>
<a href="dm_lockdown.bsp.bz2">dm_lockdown.bsp.bz2</a>
<a href="thumbnails/">thumbnails/</a>
<a href="checksums.md5">checksums.md5</a>
</body></html>
"#;

#[tokio::test]
async fn successful_index_records_observation_and_links() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/maps/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
        .expect(1)
        .mount(&server)
        .await;

    let mut source = SourceEntry::new(format!("{}/maps/", server.uri()));
    let links = index_source(&reqwest::Client::new(), &mut source, TIMEOUT)
        .await
        .unwrap();

    assert!(source.last_ok);
    assert!(source.last_latency_ms >= 0);
    assert_eq!(
        links,
        vec![
            format!("{}/maps/dm_lockdown.bsp.bz2", server.uri()),
            format!("{}/maps/ctf_turbine.bsp", server.uri()),
        ]
    );
}

#[tokio::test]
async fn failed_index_still_records_observation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/maps/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut source = SourceEntry::new(format!("{}/maps/", server.uri()));
    source.last_ok = true; // stale observation from an earlier run

    let result = index_source(&reqwest::Client::new(), &mut source, TIMEOUT).await;

    assert!(result.is_err());
    assert!(!source.last_ok, "failure must overwrite the stale flag");
    assert!(
        source.last_latency_ms >= 0,
        "latency is recorded even on failure"
    );
}

#[tokio::test]
async fn transport_error_is_failure_not_panic() {
    // Nothing listens on this port.
    let mut source = SourceEntry::new("http://127.0.0.1:9/maps/");
    let result =
        index_source(&reqwest::Client::new(), &mut source, Duration::from_millis(500)).await;

    assert!(result.is_err());
    assert!(!source.last_ok);
}

#[tokio::test]
async fn redirect_class_status_counts_as_success() {
    // 200-399 is the success window; a 304 body is empty so no links.
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/maps/"))
        .respond_with(ResponseTemplate::new(304))
        .mount(&server)
        .await;

    let mut source = SourceEntry::new(format!("{}/maps/", server.uri()));
    let links = index_source(&reqwest::Client::new(), &mut source, TIMEOUT)
        .await
        .unwrap();

    assert!(source.last_ok);
    assert!(links.is_empty());
}
