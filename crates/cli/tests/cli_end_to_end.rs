use assert_cmd::Command;
use httpmock::MockServer;
use predicates::str::contains;
use std::path::Path;
use tempfile::TempDir;

const LAST_MODIFIED: &str = "Tue, 01 Jan 2020 00:00:00 GMT";

fn lastmod() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("lastmod"));
    cmd.env_remove("LASTMOD_CONFIG_FILE")
        .env_remove("LASTMOD_CACHE_PATH")
        .env_remove("LASTMOD_DB")
        .env_remove("RUST_LOG");
    cmd
}

fn with_paths(cmd: &mut Command, dir: &Path) {
    cmd.arg("-p").arg(dir.join("payloads")).arg("-d").arg(dir.join("meta.sqlite"));
}

#[test]
fn fetch_then_revalidate_prints_same_body() {
    let dir = TempDir::new().expect("tmp dir");
    let server = MockServer::start();
    let mut fresh = server.mock(|when, then| {
        when.method("GET").path("/a").header_missing("if-modified-since");
        then.status(200).header("Last-Modified", LAST_MODIFIED).body("hello");
    });

    let mut cmd = lastmod();
    with_paths(&mut cmd, dir.path());
    cmd.arg(server.url("/a")).assert().success().stdout("hello\n");
    fresh.assert();
    fresh.delete();

    let revalidated = server.mock(|when, then| {
        when.method("GET").path("/a").header("if-modified-since", LAST_MODIFIED);
        then.status(304);
    });

    let mut cmd = lastmod();
    with_paths(&mut cmd, dir.path());
    cmd.arg(server.url("/a")).assert().success().stdout("hello\n");
    revalidated.assert();
}

#[test]
fn config_file_supplies_paths() {
    let dir = TempDir::new().expect("tmp dir");
    let config = dir.path().join("lastmod.toml");
    std::fs::write(
        &config,
        format!(
            "[lastmod]\ncache_path = {:?}\ndb = {:?}\n",
            dir.path().join("payloads").display().to_string(),
            dir.path().join("meta.sqlite").display().to_string(),
        ),
    )
    .expect("write config");

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET").path("/c");
        then.status(200).body("from config");
    });

    lastmod()
        .arg("-c")
        .arg(&config)
        .arg(server.url("/c"))
        .assert()
        .success()
        .stdout("from config\n");
    mock.assert();
    assert!(dir.path().join("meta.sqlite").exists());
}

#[test]
fn missing_paths_fail_fast() {
    lastmod()
        .arg("http://127.0.0.1:1/never")
        .assert()
        .failure()
        .code(1)
        .stderr(contains("missing required configuration"));
}

#[test]
fn http_error_exits_non_zero() {
    let dir = TempDir::new().expect("tmp dir");
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/gone");
        then.status(404);
    });

    let mut cmd = lastmod();
    with_paths(&mut cmd, dir.path());
    cmd.arg(server.url("/gone"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("HTTP_ERROR: status 404"));
}

#[test]
fn not_modified_without_cache_exits_non_zero() {
    let dir = TempDir::new().expect("tmp dir");
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/a");
        then.status(304);
    });

    let mut cmd = lastmod();
    with_paths(&mut cmd, dir.path());
    cmd.arg(server.url("/a"))
        .assert()
        .failure()
        .stderr(contains("CACHE_MISS"));
}
