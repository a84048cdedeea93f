//! Integration tests for the bomx CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd. The
//! model endpoint is a wiremock server; HOME and XDG dirs point into a temp
//! directory so no real config or key is ever picked up.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/models/gemini-2.5-flash:generateContent";

/// Helper to get a bomx command isolated from the user's environment
fn bomx(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bomx").unwrap();
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("GOOGLE_API_KEY")
        .env_remove("BOMX_MODEL")
        .env_remove("BOMX_ENDPOINT")
        .env_remove("BOMX_TIMEOUT_SECS")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

/// Write a small valid PNG into `dir`
fn write_png(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    image::DynamicImage::new_rgb8(24, 16)
        .save_with_format(&path, image::ImageFormat::Png)
        .unwrap();
    path
}

fn gemini_reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{
            "content": {"parts": [{"text": text}], "role": "model"},
            "finishReason": "STOP"
        }]
    }))
}

/// Run a blocking assert_cmd closure off the async test runtime
async fn blocking<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    tokio::task::spawn_blocking(f).await.unwrap()
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    let tmp = TempDir::new().unwrap();
    bomx(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("BOM Extractor"))
        .stdout(predicate::str::contains("extract"))
        .stdout(predicate::str::contains("session"));
}

#[test]
fn test_version_displays() {
    let tmp = TempDir::new().unwrap();
    bomx(tmp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bomx"));
}

#[test]
fn test_unknown_command_fails() {
    let tmp = TempDir::new().unwrap();
    bomx(tmp.path())
        .arg("unknown-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().unwrap();
    bomx(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bomx"));
}

// ============================================================================
// Init / Config Tests
// ============================================================================

#[test]
fn test_init_creates_project() {
    let tmp = TempDir::new().unwrap();
    bomx(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized bomx project"));

    assert!(tmp.path().join(".bomx/config.yaml").exists());
    let secrets = fs::read_to_string(tmp.path().join(".bomx/secrets.yaml")).unwrap();
    assert!(secrets.contains("general:"));
    let gitignore = fs::read_to_string(tmp.path().join(".bomx/.gitignore")).unwrap();
    assert!(gitignore.contains("secrets.yaml"));
}

#[test]
fn test_init_twice_warns() {
    let tmp = TempDir::new().unwrap();
    bomx(tmp.path()).arg("init").assert().success();
    bomx(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_init_force_keeps_secrets() {
    let tmp = TempDir::new().unwrap();
    bomx(tmp.path()).arg("init").assert().success();
    let secrets = tmp.path().join(".bomx/secrets.yaml");
    fs::write(&secrets, "general:\n  GOOGLE_API_KEY: \"kept\"\n").unwrap();

    bomx(tmp.path()).args(["init", "--force"]).assert().success();
    assert!(fs::read_to_string(&secrets).unwrap().contains("kept"));
}

#[test]
fn test_config_set_and_show() {
    let tmp = TempDir::new().unwrap();
    bomx(tmp.path()).arg("init").assert().success();

    bomx(tmp.path())
        .args(["config", "set", "model", "gemini-2.5-pro"])
        .assert()
        .success();
    bomx(tmp.path())
        .args(["config", "show", "model"])
        .assert()
        .success()
        .stdout(predicate::str::diff("gemini-2.5-pro\n"));

    bomx(tmp.path())
        .args(["config", "set", "timeout_secs", "30"])
        .assert()
        .success();
    bomx(tmp.path())
        .args(["config", "show", "timeout_secs"])
        .assert()
        .success()
        .stdout(predicate::str::diff("30\n"));
}

#[test]
fn test_config_env_overrides_file() {
    let tmp = TempDir::new().unwrap();
    bomx(tmp.path()).arg("init").assert().success();
    bomx(tmp.path())
        .args(["config", "set", "model", "from-file"])
        .assert()
        .success();

    bomx(tmp.path())
        .env("BOMX_MODEL", "from-env")
        .args(["config", "show", "model"])
        .assert()
        .success()
        .stdout(predicate::str::diff("from-env\n"));
}

#[test]
fn test_config_set_rejects_bad_values() {
    let tmp = TempDir::new().unwrap();
    bomx(tmp.path()).arg("init").assert().success();

    bomx(tmp.path())
        .args(["config", "set", "timeout_secs", "soon"])
        .assert()
        .failure();
    bomx(tmp.path())
        .args(["config", "set", "GOOGLE_API_KEY", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_config_unset() {
    let tmp = TempDir::new().unwrap();
    bomx(tmp.path()).arg("init").assert().success();
    bomx(tmp.path())
        .args(["config", "set", "model", "custom"])
        .assert()
        .success();
    bomx(tmp.path())
        .args(["config", "unset", "model"])
        .assert()
        .success();
    bomx(tmp.path())
        .args(["config", "show", "model"])
        .assert()
        .success()
        .stdout(predicate::str::diff("gemini-2.5-flash\n"));
}

#[test]
fn test_config_set_outside_project_fails() {
    let tmp = TempDir::new().unwrap();
    bomx(tmp.path())
        .args(["config", "set", "model", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not in a bomx project"));
}

#[test]
fn test_config_keys_lists_all() {
    let tmp = TempDir::new().unwrap();
    bomx(tmp.path())
        .args(["config", "keys"])
        .assert()
        .success()
        .stdout(predicate::str::contains("model"))
        .stdout(predicate::str::contains("timeout_secs"))
        .stdout(predicate::str::contains("wrap_width"));
}

// ============================================================================
// Extract Error Paths
// ============================================================================

#[test]
fn test_extract_rejects_unsupported_type() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("diagram.gif"), b"GIF89a").unwrap();

    bomx(tmp.path())
        .env("GOOGLE_API_KEY", "test-key")
        .env("BOMX_ENDPOINT", "http://127.0.0.1:9")
        .args(["extract", "diagram.gif", "--no-input"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("bomx::image::invalid"));
}

#[test]
fn test_extract_rejects_undecodable_png() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("broken.png"), b"definitely not a png").unwrap();

    bomx(tmp.path())
        .env("GOOGLE_API_KEY", "test-key")
        .args(["extract", "broken.png", "--no-input"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid image"));
}

#[test]
fn test_extract_missing_credential() {
    let tmp = TempDir::new().unwrap();
    write_png(tmp.path(), "diagram.png");

    bomx(tmp.path())
        .args(["extract", "diagram.png", "--no-input"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("bomx::credential::missing"))
        .stderr(predicate::str::contains("GOOGLE_API_KEY"));
}

#[test]
fn test_extract_connection_failure_is_inference_error() {
    let tmp = TempDir::new().unwrap();
    write_png(tmp.path(), "diagram.png");

    bomx(tmp.path())
        .env("GOOGLE_API_KEY", "test-key")
        .env("BOMX_ENDPOINT", "http://127.0.0.1:9")
        .env("BOMX_TIMEOUT_SECS", "5")
        .args(["extract", "diagram.png", "--no-input"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("An error occurred"));
}

// ============================================================================
// Extract Against a Mock Model
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_extract_prints_csv_and_writes_exports() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(gemini_reply(
            "```json\n[{\"id\":\"1\",\"part_name\":\"Bolt\",\"quantity\":4},\n {\"id\":\"2\",\"part_name\":\"Nut\"}]\n```",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    write_png(tmp.path(), "diagram.png");
    let root = tmp.path().to_path_buf();
    let uri = server.uri();

    blocking(move || {
        bomx(&root)
            .env("GOOGLE_API_KEY", "test-key")
            .env("BOMX_ENDPOINT", uri)
            .args(["extract", "diagram.png", "--no-input", "--csv", "--json"])
            .assert()
            .success()
            .stderr(predicate::str::contains("BOM Generated Successfully!"))
            .stdout(predicate::str::contains("id,part_name,quantity,description"))
            .stdout(predicate::str::contains("1,Bolt,4,"))
            .stdout(predicate::str::contains("2,Nut,,"));
    })
    .await;

    let csv = fs::read_to_string(tmp.path().join("bom.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines, ["id,part_name,quantity,description", "1,Bolt,4,", "2,Nut,,"]);

    let exported: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(tmp.path().join("bom.json")).unwrap()).unwrap();
    assert_eq!(
        exported,
        json!([
            {"id": "1", "part_name": "Bolt", "quantity": 4},
            {"id": "2", "part_name": "Nut"}
        ])
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_extract_json_format_to_stdout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(gemini_reply("[{\"id\":\"A\",\"part_name\":\"Frame\",\"quantity\":1}]"))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    write_png(tmp.path(), "diagram.png");
    let root = tmp.path().to_path_buf();
    let uri = server.uri();

    let output = blocking(move || {
        bomx(&root)
            .env("GOOGLE_API_KEY", "test-key")
            .env("BOMX_ENDPOINT", uri)
            .args(["--format", "json", "extract", "diagram.png", "--no-input"])
            .output()
            .unwrap()
    })
    .await;

    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed, json!([{"id": "A", "part_name": "Frame", "quantity": 1}]));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_extract_empty_result_warns_and_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(gemini_reply("```json\n[]\n```"))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    write_png(tmp.path(), "diagram.png");
    let root = tmp.path().to_path_buf();
    let uri = server.uri();

    blocking(move || {
        bomx(&root)
            .env("GOOGLE_API_KEY", "test-key")
            .env("BOMX_ENDPOINT", uri)
            .args(["extract", "diagram.png", "--no-input", "--csv"])
            .assert()
            .success()
            .stderr(predicate::str::contains("No data found in the response."))
            .stdout(predicate::str::is_empty());
    })
    .await;

    assert!(!tmp.path().join("bom.csv").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_extract_prose_reply_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(gemini_reply("I could not find any parts in this image."))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    write_png(tmp.path(), "diagram.png");
    let root = tmp.path().to_path_buf();
    let uri = server.uri();

    blocking(move || {
        bomx(&root)
            .env("GOOGLE_API_KEY", "test-key")
            .env("BOMX_ENDPOINT", uri)
            .args(["extract", "diagram.png", "--no-input"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to parse JSON response."))
            .stderr(predicate::str::contains("could not find any parts"));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_extract_truncated_reply_is_shown_in_full() {
    let mut reply = String::from("[{\"id\":\"1\",\"part_name\":\"FIRST-LINE-MARKER\",\"quantity\":1},\n");
    for i in 2..=24 {
        reply.push_str(&format!("{{\"id\":\"{i}\",\"part_name\":\"Bolt {i}\",\"quantity\":{i}}},\n"));
    }
    reply.push_str("{\"id\":\"25\",\"part_name\":\"Wash");

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(gemini_reply(&reply))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    write_png(tmp.path(), "diagram.png");
    let root = tmp.path().to_path_buf();
    let uri = server.uri();

    blocking(move || {
        bomx(&root)
            .env("GOOGLE_API_KEY", "test-key")
            .env("BOMX_ENDPOINT", uri)
            .args(["extract", "diagram.png", "--no-input"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Raw Response"))
            .stderr(predicate::str::contains("FIRST-LINE-MARKER"))
            .stderr(predicate::str::contains("Bolt 12"))
            .stderr(predicate::str::contains("Failed to parse JSON response."));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_extract_raw_flag_with_prose_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(gemini_reply("Sorry, this drawing has no legible parts."))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    write_png(tmp.path(), "diagram.png");
    let root = tmp.path().to_path_buf();
    let uri = server.uri();

    blocking(move || {
        bomx(&root)
            .env("GOOGLE_API_KEY", "test-key")
            .env("BOMX_ENDPOINT", uri)
            .args(["extract", "diagram.png", "--no-input", "--raw"])
            .assert()
            .failure()
            .stdout(predicate::str::is_empty())
            .stderr(predicate::str::contains("Raw Response"))
            .stderr(predicate::str::contains("Sorry, this drawing has no legible parts."));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_extract_object_reply_is_not_a_list() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(gemini_reply("{\"parts\": []}"))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    write_png(tmp.path(), "diagram.png");
    let root = tmp.path().to_path_buf();
    let uri = server.uri();

    blocking(move || {
        bomx(&root)
            .env("GOOGLE_API_KEY", "test-key")
            .env("BOMX_ENDPOINT", uri)
            .args(["extract", "diagram.png", "--no-input"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("bomx::parse::not_a_list"));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_extract_api_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": 403, "message": "Permission denied"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    write_png(tmp.path(), "diagram.png");
    let root = tmp.path().to_path_buf();
    let uri = server.uri();

    blocking(move || {
        bomx(&root)
            .env("GOOGLE_API_KEY", "test-key")
            .env("BOMX_ENDPOINT", uri)
            .args(["extract", "diagram.png", "--no-input"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Permission denied"));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_extract_uses_project_secrets_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-goog-api-key", "from-secrets"))
        .respond_with(gemini_reply("[]"))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    write_png(tmp.path(), "diagram.png");
    let root = tmp.path().to_path_buf();
    let uri = server.uri();

    blocking(move || {
        bomx(&root).arg("init").assert().success();
        fs::write(
            root.join(".bomx/secrets.yaml"),
            "general:\n  GOOGLE_API_KEY: \"from-secrets\"\n",
        )
        .unwrap();

        // The secrets file wins over the environment
        bomx(&root)
            .env("GOOGLE_API_KEY", "from-env")
            .env("BOMX_ENDPOINT", uri)
            .args(["extract", "diagram.png", "--no-input"])
            .assert()
            .success();
    })
    .await;
}

#[test]
fn test_session_requires_terminal() {
    let tmp = TempDir::new().unwrap();
    bomx(tmp.path())
        .arg("session")
        .assert()
        .failure()
        .stderr(predicate::str::contains("interactive terminal"));
}
