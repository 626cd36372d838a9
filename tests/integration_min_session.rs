// Minimal integration test that drives the compiled binary through a PTY.
// This exercises the real event loop and crossterm input handling across
// the main boundaries without relying on internal modules.
//
// Notes:
// - Requires a TTY; uses expectrl which allocates a pseudo terminal.
// - Marked Unix-only and ignored by default to avoid CI/platform issues.
// - Run manually via: `cargo test --test integration_min_session -- --ignored`.

#![cfg(unix)]

use std::time::Duration;

use expectrl::{spawn, Eof};

#[test]
#[ignore]
fn minimal_session_completes_and_exits() -> Result<(), Box<dyn std::error::Error>> {
    let bin = assert_cmd::cargo::cargo_bin("gincana");
    // Memory store keeps the run from touching the real results file
    let cmd = format!(
        "{} -a agente01 -p hola --countdown 0 -s 5 --store memory",
        bin.display()
    );

    let mut p = spawn(cmd)?;

    std::thread::sleep(Duration::from_millis(200));

    p.send("hola")?;
    p.send("\r")?;

    std::thread::sleep(Duration::from_millis(200));

    // ESC quits from the results screen
    p.send("\x1b")?;

    p.expect(Eof)?;
    Ok(())
}

#[test]
fn ranking_mode_runs_without_a_tty() {
    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join("resultados.csv");

    assert_cmd::Command::cargo_bin("gincana")
        .unwrap()
        .env("GINCANA_LOG", "off")
        .args(["--ranking", "--store", "csv", "--results"])
        .arg(&results)
        .assert()
        .success();
}

#[test]
fn check_store_reports_rows_of_the_results_file() {
    use gincana::{
        record::build_at,
        store::{CsvResultStore, ResultStore},
    };

    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join("resultados.csv");
    let record = build_at(
        "agente01",
        "hola mundo",
        "hola mundo",
        10.0,
        None,
        None,
        &[],
        chrono::Local::now(),
    );
    CsvResultStore::new(&results).append(&record).unwrap();

    let output = assert_cmd::Command::cargo_bin("gincana")
        .unwrap()
        .env("GINCANA_LOG", "off")
        .args(["--check-store", "--store", "csv", "--results"])
        .arg(&results)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let stdout = String::from_utf8(output).unwrap();
    assert!(stdout.contains("csv store ok: 1 result(s)"));
    assert!(stdout.contains("agente01"));
}

#[test]
fn check_store_fails_when_the_store_cannot_be_opened() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "").unwrap();

    assert_cmd::Command::cargo_bin("gincana")
        .unwrap()
        .env("GINCANA_LOG", "off")
        .args(["--check-store", "--store", "sqlite", "--results"])
        .arg(blocker.join("results.db"))
        .assert()
        .failure();
}
