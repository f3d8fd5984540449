//! Binary behaviour that needs no network access

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn tailrotate() -> Command {
    let mut cmd = Command::cargo_bin("tailrotate").unwrap();
    cmd.env_clear().env("TAILROTATE_LOG", "warn");
    cmd
}

#[test]
fn help_lists_subcommands() {
    tailrotate()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("rotate"))
        .stdout(predicate::str::contains("event"));
}

#[test]
fn missing_oauth_secret_is_reported_first() {
    tailrotate()
        .args(["rotate", "--secret-id", "s", "--token", "v1", "--step", "createSecret"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("OAUTH_SECRET_ARN"));
}

#[test]
fn environment_supplies_settings() {
    tailrotate()
        .env("OAUTH_SECRET_ARN", "arn:oauth")
        .env("TAILNET", "example.com")
        .args(["rotate", "--secret-id", "s", "--token", "v1", "--step", "createSecret"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("TAG_NAME"));
}

#[test]
fn config_file_is_layered_under_flags() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
oauth_secret_arn = "arn:oauth"
tailnet = "example.com"
tag_name = "fleet"
tailscale_api_url = "https://api.tailscale.com/api/v2"
"#
    )
    .unwrap();

    tailrotate()
        .arg("--config")
        .arg(file.path())
        .args(["--api-url", "ftp://nowhere", "rotate"])
        .args(["--secret-id", "s", "--token", "v1", "--step", "createSecret"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("TAILSCALE_API_URL"));
}

#[test]
fn numeric_tag_and_tailnet_are_accepted() {
    // Loading succeeds, so the first failure is the timeout bound
    tailrotate()
        .env("OAUTH_SECRET_ARN", "arn:oauth")
        .env("TAILNET", "42")
        .env("TAG_NAME", "2024")
        .env("TAILSCALE_HTTP_TIMEOUT", "90s")
        .args(["rotate", "--secret-id", "s", "--token", "v1", "--step", "testSecret"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("between 1 and 60 seconds"))
        .stderr(predicate::str::contains("invalid type").not());
}

#[test]
fn unparsable_timeout_fails_to_load() {
    tailrotate()
        .env("OAUTH_SECRET_ARN", "arn:oauth")
        .env("TAILNET", "example.com")
        .env("TAG_NAME", "fleet")
        .env("TAILSCALE_HTTP_TIMEOUT", "soon")
        .args(["rotate", "--secret-id", "s", "--token", "v1", "--step", "testSecret"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not load rotation configuration"));
}

#[test]
fn out_of_range_timeout_is_rejected() {
    tailrotate()
        .env("OAUTH_SECRET_ARN", "arn:oauth")
        .env("TAILNET", "example.com")
        .env("TAG_NAME", "fleet")
        .env("TAILSCALE_HTTP_TIMEOUT", "5m")
        .args(["rotate", "--secret-id", "s", "--token", "v1", "--step", "testSecret"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("between 1 and 60 seconds"));
}

#[test]
fn missing_config_file_fails() {
    tailrotate()
        .args(["--config", "/nonexistent/tailrotate.toml", "event"])
        .write_stdin(r#"{"SecretId": "s", "ClientRequestToken": "v1", "Step": "testSecret"}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn malformed_event_is_rejected_before_config() {
    tailrotate()
        .arg("event")
        .write_stdin(r#"{"SecretId": "s"}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not parse rotation event"));
}

#[test]
fn event_file_is_read() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"SecretId": "s", "ClientRequestToken": "v1", "Step": "finishSecret"}}"#
    )
    .unwrap();

    tailrotate()
        .arg("event")
        .arg("--file")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("OAUTH_SECRET_ARN"));
}
