//! Corruption recovery tests for the lingopet binary.
//!
//! These tests verify the system can handle:
//! - Corrupted store files
//! - Unreadable word records
//! - Corrupted review log lines
//! - Stale daily counters

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::io::Write as IoWrite;
use std::path::Path;
use tempfile::TempDir;

fn cli(data_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("lingopet"));
    cmd.arg("--data-dir")
        .arg(data_dir)
        .env("XDG_CONFIG_HOME", data_dir.join("config"));
    cmd
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn add_word(data_dir: &Path, word: &str) {
    cli(data_dir)
        .args(["add", word, "--definition", "d", "--translation", "t"])
        .args(["--example", "e"])
        .assert()
        .success();
}

fn read_store(data_dir: &Path) -> Value {
    let contents = fs::read_to_string(data_dir.join("store.json")).expect("Failed to read store");
    serde_json::from_str(&contents).expect("Store is not valid JSON")
}

fn write_store(data_dir: &Path, store: &Value) {
    fs::write(data_dir.join("store.json"), store.to_string()).expect("Failed to write store");
}

#[test]
fn test_corrupted_store_file() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    fs::write(data_dir.join("store.json"), "{ invalid json }}}}")
        .expect("Failed to write corrupted store");

    cli(data_dir)
        .arg("due")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing due"));

    // Writing replaces the corrupted file with a valid one
    add_word(data_dir, "Neu");
    let store = read_store(data_dir);
    assert_eq!(store["words"].as_array().map(Vec::len), Some(1));
}

#[test]
fn test_unreadable_word_record_is_skipped_and_kept() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    add_word(data_dir, "Apfel");

    let mut store = read_store(data_dir);
    store["words"]
        .as_array_mut()
        .unwrap()
        .insert(0, json!({ "word": "broken", "reviewLevel": "high" }));
    write_store(data_dir, &store);

    cli(data_dir)
        .arg("due")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 words due"))
        .stdout(predicate::str::contains("Apfel"));

    cli(data_dir)
        .args(["review", "--auto-grade", "correct"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Review complete"));

    let store = read_store(data_dir);
    let words = store["words"].as_array().unwrap();
    assert_eq!(words.len(), 2);
    assert_eq!(words[0]["word"], "broken");
    assert_eq!(words[1]["reviewLevel"], 1);
}

#[test]
fn test_unknown_word_fields_survive_review() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    add_word(data_dir, "Vogel");

    let mut store = read_store(data_dir);
    store["words"][0]["favorite"] = json!(true);
    store["words"][0]["tags"] = json!(["animals"]);
    write_store(data_dir, &store);

    cli(data_dir)
        .args(["review", "--auto-grade", "correct"])
        .assert()
        .success();

    let word = &read_store(data_dir)["words"][0];
    assert_eq!(word["reviewLevel"], 1);
    assert_eq!(word["favorite"], true);
    assert_eq!(word["tags"], json!(["animals"]));
}

#[test]
fn test_words_key_with_wrong_shape_is_an_error() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    write_store(data_dir, &json!({ "words": 5 }));

    cli(data_dir)
        .arg("due")
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected an array"));
}

#[test]
fn test_corrupted_review_log_lines() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    add_word(data_dir, "Fisch");

    // Partial last line (simulating crash during write)
    let log_path = data_dir.join("reviews.jsonl");
    let mut file = fs::File::create(&log_path).unwrap();
    writeln!(file, "{{ invalid json }}").unwrap();
    write!(file, r#"{{"id":"partial"#).unwrap();
    drop(file);

    cli(data_dir)
        .args(["review", "--auto-grade", "correct"])
        .assert()
        .success();

    let log = fs::read_to_string(&log_path).unwrap();
    assert!(log.starts_with("{ invalid json }"));
    let last = log.lines().last().unwrap();
    let record: Value = serde_json::from_str(last).expect("New record shares a torn line");
    assert_eq!(record["kind"]["type"], "graded");
}

#[test]
fn test_stale_daily_counters_reset() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    write_store(
        data_dir,
        &json!({ "stats": { "date": "2000-01-01", "reviews": 9, "wordsAdded": 9 } }),
    );

    cli(data_dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Reviews:     0"))
        .stdout(predicate::str::contains("Words added: 0"));

    add_word(data_dir, "Heute");
    assert_eq!(read_store(data_dir)["stats"]["wordsAdded"], 1);
}

#[test]
fn test_missing_data_dir_is_created() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("nested").join("lingopet");

    add_word(&data_dir, "Haus");
    assert!(data_dir.join("store.json").exists());
}
