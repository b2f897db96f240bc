//! CLI commands that need neither Postgres nor Kafka.

use std::io::Write;

use assert_cmd::Command;
use ords_testkit::{order_payload, sample_order};
use predicates::prelude::*;

#[allow(deprecated)]
fn ords() -> Command {
    Command::cargo_bin("ords").expect("ords binary")
}

fn temp_file(contents: &[u8]) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().expect("tempfile");
    f.write_all(contents).expect("write tempfile");
    f
}

#[test]
fn order_validate_accepts_a_valid_document() {
    let f = temp_file(&order_payload(&sample_order("cli-ok")));
    ords()
        .args(["order", "validate"])
        .arg(f.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("valid=true order_uid=cli-ok"));
}

#[test]
fn order_validate_names_the_offending_field() {
    let mut o = sample_order("cli-bad");
    o.delivery.phone.clear();
    let f = temp_file(&order_payload(&o));
    ords()
        .args(["order", "validate"])
        .arg(f.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("field=delivery.phone"));
}

#[test]
fn order_validate_rejects_non_json() {
    let f = temp_file(b"definitely not json");
    ords()
        .args(["order", "validate"])
        .arg(f.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid order document"));
}

#[test]
fn config_hash_is_stable_across_key_order() {
    let a = temp_file(b"cache:\n  capacity: 5\nkafka:\n  topic: t1\n");
    let b = temp_file(b"kafka:\n  topic: t1\ncache:\n  capacity: 5\n");

    let out_a = ords().arg("config-hash").arg(a.path()).output().expect("run");
    let out_b = ords().arg("config-hash").arg(b.path()).output().expect("run");
    assert!(out_a.status.success());

    let first_line = |o: &std::process::Output| {
        String::from_utf8_lossy(&o.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string()
    };
    assert!(first_line(&out_a).starts_with("config_hash="));
    assert_eq!(first_line(&out_a), first_line(&out_b));
}

#[test]
fn config_hash_refuses_literal_database_url() {
    let f = temp_file(b"postgres:\n  url_env: postgres://user:pw@localhost/db\n");
    ords()
        .arg("config-hash")
        .arg(f.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_SECRET_DETECTED"));
}

#[test]
fn db_commands_resolve_the_url_through_config() {
    let f = temp_file(b"postgres:\n  url_env: ORDS_TEST_UNSET_DB_URL\n  max_connections: 2\n");
    ords()
        .env_remove("ORDS_TEST_UNSET_DB_URL")
        .arg("--config")
        .arg(f.path())
        .args(["db", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("SECRETS_MISSING"))
        .stderr(predicate::str::contains("ORDS_TEST_UNSET_DB_URL"));
}

#[test]
fn order_show_rejects_an_invalid_config_before_connecting() {
    let f = temp_file(b"cache:\n  capacity: 0\n");
    ords()
        .args(["order", "show", "any-uid", "--config"])
        .arg(f.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("cache.capacity"));
}
