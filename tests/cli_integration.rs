//! CLI integration tests
//!
//! Exercises the script-mode binary end to end.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn test_version_flag() {
    let mut cmd = cargo_bin_cmd!("fetch-relay");
    cmd.arg("--version");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_lists_subcommands() {
    let mut cmd = cargo_bin_cmd!("fetch-relay");
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("page"))
        .stdout(predicate::str::contains("resolve"));
}

#[test]
fn test_page_help_lists_escalation_flags() {
    let mut cmd = cargo_bin_cmd!("fetch-relay");
    cmd.args(["page", "--help"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--remote-render"))
        .stdout(predicate::str::contains("--headless"));
}

#[test]
fn test_invalid_url_exits_with_error() {
    let mut cmd = cargo_bin_cmd!("fetch-relay");
    cmd.args(["page", "not a url"]);

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid URL"));
}

#[test]
fn test_invalid_config_exits_with_error() {
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, "[fetch]\ncache_ttl_secs = 0").unwrap();

    let mut cmd = cargo_bin_cmd!("fetch-relay");
    cmd.args(["--config", config.path().to_str().unwrap(), "page", "https://a.example/"]);

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[tokio::test]
async fn test_page_prints_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/film"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Film</h1>"))
        .mount(&server)
        .await;

    let url = format!("{}/film", server.uri());
    let output = tokio::task::spawn_blocking(move || {
        cargo_bin_cmd!("fetch-relay")
            .args(["page", url.as_str()])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "<h1>Film</h1>");
}

#[tokio::test]
async fn test_resolve_prints_json() {
    let server = MockServer::start().await;
    let video = format!("{}/media/film.mp4", server.uri());
    Mock::given(method("GET"))
        .and(path("/film"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!(r#"<video src="{}"></video>"#, video)),
        )
        .mount(&server)
        .await;

    let url = format!("{}/film", server.uri());
    let output = tokio::task::spawn_blocking(move || {
        cargo_bin_cmd!("fetch-relay")
            .args(["resolve", url.as_str()])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["video_url"], video);
    assert_eq!(json["direct"], false);
}
