//! Configuration system tests
//!
//! Tests configuration loading, validation, and environment overrides

mod common;

use common::ConfigFixture;
use predicates::prelude::*;
use tempfile::TempDir;

fn validate(fixture: &ConfigFixture) -> assert_cmd::assert::Assert {
    common::bin_cmd("fellowship-agent", &fixture.temp_dir)
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
}

fn show(fixture: &ConfigFixture) -> assert_cmd::Command {
    let mut cmd = common::bin_cmd("fellowship-agent", &fixture.temp_dir);
    cmd.args(["config", "show", "--config", fixture.path()]);
    cmd
}

// ─────────────────────────────────────────────────────────────────
// Valid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_minimal_config() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[agent]

[dapr]

[llm]

[logging]
"#,
    );

    validate(&fixture).success();
}

#[test]
fn test_empty_config_uses_defaults() {
    let fixture = ConfigFixture::new();
    fixture.write_config("");

    show(&fixture)
        .assert()
        .success()
        .stdout(predicate::str::contains("app_port = 8001"))
        .stdout(predicate::str::contains("memory_max_messages = 50"));
}

#[test]
fn test_full_config() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[agent]
app_host = "0.0.0.0"
app_port = 9001
memory_max_messages = 20

[dapr]
http_endpoint = "http://localhost:3601"
timeout_secs = 10
sidecar_wait_secs = 5
registry_retries = 3

[llm]
base_url = "https://inference.example.com/models"
timeout_secs = 60
max_retries = 1
max_tokens = 256
temperature = 0.2

[logging]
level = "debug"
file = "/tmp/fellowship-agent.log"
max_file_size_mb = 50
max_files = 3
json_format = true
"#,
    );

    validate(&fixture).success();
    show(&fixture)
        .assert()
        .success()
        .stdout(predicate::str::contains("app_port = 9001"))
        .stdout(predicate::str::contains("http://localhost:3601"));
}

// ─────────────────────────────────────────────────────────────────
// Invalid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_invalid_dapr_endpoint_scheme() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[dapr]
http_endpoint = "grpc://127.0.0.1:50001"
"#,
    );

    validate(&fixture).code(10).stderr(predicate::str::contains("dapr.http_endpoint"));
}

#[test]
fn test_invalid_temperature() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[llm]
temperature = 3.5
"#,
    );

    validate(&fixture).failure();
}

#[test]
fn test_zero_app_port() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[agent]
app_port = 0
"#,
    );

    validate(&fixture).failure();
}

#[test]
fn test_zero_workflow_cap() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[agent]
max_workflow_instances = 0
"#,
    );

    validate(&fixture).code(10).stderr(predicate::str::contains("max_workflow_instances"));
}

#[test]
fn test_unbounded_llm_retries_rejected() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[llm]
max_retries = 60
"#,
    );

    validate(&fixture).code(10);
}

#[test]
fn test_invalid_log_level() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[logging]
level = "invalid_level"
"#,
    );

    validate(&fixture).failure();
}

#[test]
fn test_malformed_toml() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[dapr
http_endpoint = "http://127.0.0.1:3500"
"#,
    );

    validate(&fixture).code(10);
}

// ─────────────────────────────────────────────────────────────────
// Environment Override Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_dapr_port_override() {
    let fixture = ConfigFixture::new();
    fixture.write_config("");

    show(&fixture)
        .env("DAPR_HTTP_PORT", "3999")
        .assert()
        .success()
        .stdout(predicate::str::contains("http://127.0.0.1:3999"));
}

#[test]
fn test_app_port_override_beats_file() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[agent]
app_port = 9001
"#,
    );

    show(&fixture)
        .env("APP_PORT", "8123")
        .assert()
        .success()
        .stdout(predicate::str::contains("app_port = 8123"));
}

#[test]
fn test_config_found_in_working_directory() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("fellowship-agent.toml"),
        "[agent]\nmemory_max_messages = 7\n",
    )
    .unwrap();

    common::bin_cmd("fellowship-agent", &dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("memory_max_messages = 7"));
}

#[test]
fn test_dotenv_applies_to_config_show() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(".env"), "APP_PORT=8555\n").unwrap();

    common::bin_cmd("fellowship-agent", &dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("app_port = 8555"));
}
