//! Concurrency tests for the stride binary.
//!
//! These tests verify that multiple processes can safely:
//! - Write to the activity WAL simultaneously (file locking)
//! - Read state while a refresh is running

use assert_cmd::Command;
use chrono::Utc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn cli() -> Command {
    Command::cargo_bin("stride").expect("Failed to find stride binary")
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

#[test]
fn test_concurrent_activity_logging() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();
    let today = Utc::now().date_naive();

    // Log with slight delays (more realistic than thundering herd)
    let handles: Vec<_> = (0..5)
        .map(|i: u64| {
            let data_dir = data_dir.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(i * 5));
                cli()
                    .arg("log")
                    .arg("--data-dir")
                    .arg(&data_dir)
                    .arg("--sport")
                    .arg("run")
                    .arg("--minutes")
                    .arg("30")
                    .arg("--rpe")
                    .arg("5")
                    .arg("--date")
                    .arg(today.to_string())
                    .assert()
                    .success();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Logging thread panicked");
    }

    // All five lines made it into the WAL intact
    let wal_content =
        std::fs::read_to_string(data_dir.join("wal/activities.wal")).expect("Failed to read WAL");
    assert_eq!(wal_content.lines().count(), 5);

    // And the refresh sums them into one day
    cli()
        .arg("refresh")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success();
}

#[test]
fn test_refresh_while_logging() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();
    let today = Utc::now().date_naive();

    cli()
        .arg("log")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--sport")
        .arg("run")
        .arg("--minutes")
        .arg("40")
        .arg("--rpe")
        .arg("5")
        .arg("--date")
        .arg(today.to_string())
        .assert()
        .success();

    let log_dir = data_dir.clone();
    let logger = thread::spawn(move || {
        cli()
            .arg("log")
            .arg("--data-dir")
            .arg(&log_dir)
            .arg("--sport")
            .arg("bike")
            .arg("--minutes")
            .arg("60")
            .arg("--rpe")
            .arg("4")
            .arg("--date")
            .arg(today.to_string())
            .assert()
            .success();
    });

    cli()
        .arg("refresh")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success();

    logger.join().expect("Logging thread panicked");
}
