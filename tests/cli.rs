use axum::{routing::post, Json, Router};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const KEY_VAR: &str = "DOC_INTAKE_CLI_TEST_KEY";

fn intake_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("intake");
    path
}

/// Temp workspace with a SQLite-backed config. `llm_url` points the OpenAI
/// provider at a local mock.
fn setup_test_env(llm_url: Option<&str>) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let mut config_content = format!(
        r#"[storage]
backend = "sqlite"
sqlite_path = "{}/data/intake.sqlite"

[history]
display_limit = 5

[llm]
provider = "openai"
api_key_env = "{}"
timeout_secs = 10
"#,
        root.display(),
        KEY_VAR
    );
    if let Some(url) = llm_url {
        config_content.push_str(&format!("url = \"{}\"\n", url));
    }

    let config_path = config_dir.join("intake.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_intake_with_env(
    config_path: &Path,
    args: &[&str],
    env: &[(&str, &str)],
) -> (String, String, bool) {
    let binary = intake_binary();
    let mut cmd = Command::new(&binary);
    cmd.arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove(KEY_VAR)
        .env("RUST_LOG", "warn");
    // Keep a stray .env in the working directory out of the picture.
    if let Some(dir) = config_path.parent() {
        cmd.current_dir(dir);
    }
    for (k, v) in env {
        cmd.env(k, v);
    }
    let output = cmd
        .output()
        .unwrap_or_else(|e| panic!("Failed to run intake binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn run_intake(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    run_intake_with_env(config_path, args, &[])
}

/// OpenAI-compatible `/v1/chat/completions` that classifies everything as a
/// TEXT complaint and returns a fixed summary.
async fn spawn_mock_llm() -> String {
    async fn chat(Json(body): Json<Value>) -> Json<Value> {
        let prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
        let content = if prompt.starts_with("Classify") {
            "```json\n{\"format\": \"TEXT\", \"intent\": \"COMPLAINT\", \"confidence\": 0.87}\n```"
        } else {
            "{\"summary\": \"Customer reports a late parcel\", \"key_topics\": [\"delivery\"], \"sentiment\": \"NEGATIVE\", \"action_items\": [\"refund\"]}"
        };
        Json(json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        }))
    }

    let app = Router::new().route("/v1/chat/completions", post(chat));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/v1", addr)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env(None);

    let (stdout, stderr, success) = run_intake(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/intake.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env(None);

    let (_, _, success1) = run_intake(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_intake(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_init_memory_backend_is_noop() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("intake.toml");
    fs::write(&config_path, "[storage]\nbackend = \"memory\"\n").unwrap();

    let (stdout, _, success) = run_intake(&config_path, &["init"]);
    assert!(success);
    assert!(stdout.contains("needs no initialization"));
}

#[test]
fn test_history_empty() {
    let (_tmp, config_path) = setup_test_env(None);
    run_intake(&config_path, &["init"]);

    let (stdout, stderr, success) = run_intake(&config_path, &["history"]);
    assert!(success, "history failed: {}", stderr);
    assert!(stdout.contains("No documents processed yet."));
}

#[test]
fn test_result_missing_fails() {
    let (_tmp, config_path) = setup_test_env(None);
    run_intake(&config_path, &["init"]);

    let (_, stderr, success) = run_intake(&config_path, &["result", "no-such-task"]);
    assert!(!success);
    assert!(stderr.contains("No result found for task: no-such-task"));
}

#[test]
fn test_source_set_show_delete() {
    let (_tmp, config_path) = setup_test_env(None);
    run_intake(&config_path, &["init"]);

    let (stdout, stderr, success) = run_intake(
        &config_path,
        &["source", "set", "msg-1", "--type", "email", "--thread", "th-9"],
    );
    assert!(success, "source set failed: {}", stderr);
    assert!(stdout.contains("Recorded source msg-1"));

    let (stdout, _, success) = run_intake(&config_path, &["source", "show", "msg-1"]);
    assert!(success);
    assert!(stdout.contains("type:       email"));
    assert!(stdout.contains("thread:     th-9"));

    let (_, _, success) = run_intake(&config_path, &["source", "delete", "msg-1"]);
    assert!(success);

    let (_, stderr, success) = run_intake(&config_path, &["source", "show", "msg-1"]);
    assert!(!success);
    assert!(stderr.contains("No data stored for source: msg-1"));
}

#[test]
fn test_invalid_config_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("intake.toml");
    fs::write(&config_path, "[storage]\nbackend = \"mongo\"\n").unwrap();

    let (_, stderr, success) = run_intake(&config_path, &["history"]);
    assert!(!success);
    assert!(stderr.contains("Unknown storage backend"));
}

#[test]
fn test_process_without_api_key_fails_before_work() {
    let (tmp, config_path) = setup_test_env(None);
    run_intake(&config_path, &["init"]);
    let input = tmp.path().join("note.txt");
    fs::write(&input, "hello").unwrap();

    let (_, stderr, success) = run_intake(&config_path, &["process", input.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains(KEY_VAR));

    let (stdout, _, _) = run_intake(&config_path, &["history"]);
    assert!(stdout.contains("No documents processed yet."));
}

#[test]
fn test_process_unsupported_extension_fails() {
    let (tmp, config_path) = setup_test_env(None);
    run_intake(&config_path, &["init"]);
    let input = tmp.path().join("report.docx");
    fs::write(&input, "PK\u{3}\u{4}").unwrap();

    let (_, stderr, success) = run_intake_with_env(
        &config_path,
        &["process", input.to_str().unwrap()],
        &[(KEY_VAR, "sk-test")],
    );
    assert!(!success);
    assert!(stderr.contains("Unsupported file type: docx"));
}

#[test]
fn test_process_invalid_json_fails() {
    let (tmp, config_path) = setup_test_env(None);
    run_intake(&config_path, &["init"]);
    let input = tmp.path().join("order.json");
    fs::write(&input, "{ \"po\": ").unwrap();

    let (_, stderr, success) = run_intake_with_env(
        &config_path,
        &["process", input.to_str().unwrap()],
        &[(KEY_VAR, "sk-test")],
    );
    assert!(!success);
    assert!(stderr.contains("Invalid JSON format"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_process_then_history_and_result() {
    let llm_url = spawn_mock_llm().await;
    let (tmp, config_path) = setup_test_env(Some(&llm_url));
    let input = tmp.path().join("complaint.txt");
    fs::write(&input, "My parcel is two weeks late. Please refund me.").unwrap();

    let (stdout, stderr, success) = tokio::task::spawn_blocking({
        let config_path = config_path.clone();
        let input = input.clone();
        move || {
            run_intake(&config_path, &["init"]);
            run_intake_with_env(
                &config_path,
                &["process", input.to_str().unwrap()],
                &[(KEY_VAR, "sk-test")],
            )
        }
    })
    .await
    .unwrap();
    assert!(success, "process failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("\"format\": \"TEXT\""));
    assert!(stdout.contains("\"intent\": \"COMPLAINT\""));
    assert!(stdout.contains("Customer reports a late parcel"));
    assert!(stdout.contains("document type: TEXT"));

    let task_id = stdout
        .lines()
        .find_map(|l| l.strip_prefix("task_id: "))
        .expect("task id line")
        .trim()
        .to_string();

    let (history_out, result_out) = tokio::task::spawn_blocking({
        let config_path = config_path.clone();
        let task_id = task_id.clone();
        move || {
            let (history_out, _, ok1) = run_intake(&config_path, &["history", "--limit", "3"]);
            let (result_out, _, ok2) = run_intake(&config_path, &["result", &task_id]);
            assert!(ok1 && ok2);
            (history_out, result_out)
        }
    })
    .await
    .unwrap();

    assert!(history_out.contains(&task_id));
    assert!(history_out.contains("complaint.txt"));
    assert!(history_out.contains("COMPLAINT"));
    assert!(result_out.contains("format:     TEXT"));
    assert!(result_out.contains("\"sentiment\": \"NEGATIVE\""));
}

#[test]
fn test_without_config_file_writes_persist() {
    let tmp = TempDir::new().unwrap();
    // Nonexistent file: built-in defaults, working directory is `tmp`.
    let config_path = tmp.path().join("missing.toml");

    let (stdout, stderr, success) = run_intake(
        &config_path,
        &["source", "set", "s1", "--type", "email"],
    );
    assert!(success, "source set failed: stdout={}, stderr={}", stdout, stderr);

    let (stdout, stderr, success) = run_intake(&config_path, &["source", "show", "s1"]);
    assert!(success, "source show failed: {}", stderr);
    assert!(stdout.contains("type:       email"));
    assert!(tmp.path().join("data/intake.sqlite").exists());
}
