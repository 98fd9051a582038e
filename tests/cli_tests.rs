use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const CONFIG: &str = r#"
max_dump: 20
dispatchers:
  - kind: telegram
    chat_id: "@notices"
notice_sources:
  - name: Exams
    url: http://www.ipu.ac.in/exam_notices.php
    dispatchers: [telegram]
  - name: Blog
    url: https://example.com/feed.xml
    reader: rss
    dispatchers: [telegram]
    max_dump: 5
"#;

fn relay_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("notice-relay").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("CONFIG_FILE")
        .env_remove("TG_BOT_TOKEN")
        .env("NOTICE_DUMP_DIR", dir.path().join("dump"))
        .env("RUST_LOG", "off");
    cmd
}

fn write_config(dir: &TempDir) -> String {
    let path = dir.path().join("config.yml");
    std::fs::write(&path, CONFIG).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn test_help_shows_dry_run_flag() {
    let dir = TempDir::new().unwrap();

    relay_cmd(&dir)
        .arg("run")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--skip-notify"));
}

#[test]
fn test_skip_notify_flag_description() {
    let dir = TempDir::new().unwrap();

    relay_cmd(&dir)
        .arg("run")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Skip notifications but still record new notices as sent"));
}

#[test]
fn test_dry_run_conflicts_with_skip_notify() {
    let dir = TempDir::new().unwrap();

    relay_cmd(&dir)
        .arg("run")
        .arg("--dry-run")
        .arg("--skip-notify")
        .assert()
        .failure();
}

#[test]
fn test_missing_config_fails() {
    let dir = TempDir::new().unwrap();

    relay_cmd(&dir)
        .arg("--config")
        .arg(dir.path().join("missing.yml"))
        .arg("run")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("missing.yml"));
}

#[test]
fn test_run_without_token_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    relay_cmd(&dir)
        .arg("--config")
        .arg(&config)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("TG_BOT_TOKEN"));
}

#[test]
fn test_list_shows_sources() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    relay_cmd(&dir)
        .arg("list")
        .env("CONFIG_FILE", &config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exams [html_table]"))
        .stdout(predicate::str::contains("Blog [rss]"))
        .stdout(predicate::str::contains("History: 0/20"))
        .stdout(predicate::str::contains("History: 0/5"));

    assert!(!dir.path().join("dump").exists());
}

mod failure_log {
    use super::*;

    #[test]
    fn test_empty_failure_log() {
        let dir = TempDir::new().unwrap();

        relay_cmd(&dir)
            .arg("failures")
            .assert()
            .success()
            .stdout(predicate::str::contains("No failed deliveries"));

        assert!(!dir.path().join("dump").exists());
    }

    #[test]
    fn test_failures_respects_limit() {
        let dir = TempDir::new().unwrap();
        let dump = dir.path().join("dump");
        std::fs::create_dir_all(&dump).unwrap();
        std::fs::write(
            dump.join("failed.jsonl"),
            concat!(
                r#"{"content":{"title":"Old circular","date":"01-01-2024","link":"http://x/a.pdf"},"failed_dispatchers":["telegram"]}"#,
                "\n",
                r#"{"content":{"title":"New circular","date":"02-01-2024","link":"http://x/b.pdf"},"failed_dispatchers":["telegram","archive"]}"#,
                "\n"
            ),
        )
        .unwrap();

        relay_cmd(&dir)
            .arg("failures")
            .arg("--limit")
            .arg("1")
            .assert()
            .success()
            .stdout(predicate::str::contains("2 total"))
            .stdout(predicate::str::contains("New circular"))
            .stdout(predicate::str::contains("telegram, archive"))
            .stdout(predicate::str::contains("Old circular").not());
    }
}
