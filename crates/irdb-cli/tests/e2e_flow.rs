//! End-to-end integration tests for the complete analysis flow.
//!
//! Tests the full pipeline: import → analyze → export, driving the real
//! binary over a temporary database file.

use std::fmt::Write as _;
use std::process::Command;

use tempfile::TempDir;

fn irdb_binary() -> String {
    env!("CARGO_BIN_EXE_irdb").to_string()
}

/// A noisy NEC capture: off-nominal leading pair and data widths that should
/// all snap back to canonical values.
fn noisy_nec_fields() -> String {
    let mut stream = String::from("339,173");
    for bit in 0..32u32 {
        let _ = write!(stream, ",21,{}", if bit % 2 == 0 { 22 } else { 63 });
    }
    stream.push_str(",21,1500");
    format!("100014|38400|Full_Repeat|POWER|{stream}|339,88,22,3650|")
}

/// The same code after adjustment: exact preamble, canonical symbol widths,
/// derived final gap, canonical repeat stream, template carrier.
fn adjusted_nec_fields() -> String {
    let mut stream = String::from("342,171");
    for bit in 0..32u32 {
        let _ = write!(stream, ",21,{}", if bit % 2 == 0 { 21 } else { 64 });
    }
    stream.push_str(",21,1538");
    format!("100014|38000|Full_Repeat|POWER|{stream}|342,86,21,3655|")
}

/// A code no catalog entry matches.
fn mystery_fields() -> String {
    "999990|40000|Repeat|MYST|10,10,10,10,10,10|20,20|".to_string()
}

fn write_input(temp: &TempDir) -> std::path::PathBuf {
    let input = temp.path().join("codes.db");
    let content = format!("# test database\n{}\n{}\n", noisy_nec_fields(), mystery_fields());
    std::fs::write(&input, content).unwrap();
    input
}

#[test]
fn analyze_rewrites_identified_codes() {
    let temp = TempDir::new().unwrap();
    let input = write_input(&temp);
    let output = temp.path().join("corrected.db");

    let result = Command::new(irdb_binary())
        .arg("analyze")
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .output()
        .expect("failed to run irdb analyze");
    assert!(
        result.status.success(),
        "analyze should succeed: {}",
        String::from_utf8_lossy(&result.stderr)
    );

    let exported = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = exported.split("\r\n").collect();

    // The NEC code comes back fully normalized.
    assert_eq!(lines[0], adjusted_nec_fields());

    // The unidentified code passes through untouched.
    assert_eq!(lines[1], mystery_fields());

    // The statistics summary lands on stderr.
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("1 codes identified as NEC"));
    assert!(stderr.contains("1 codes not identified out of 2 (50%)"));
}

#[test]
fn analyze_reads_stdin_and_writes_stdout() {
    use std::io::Write as _;
    use std::process::Stdio;

    let mut child = Command::new(irdb_binary())
        .arg("analyze")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn irdb analyze");
    child
        .stdin
        .as_mut()
        .unwrap()
        .write_all(format!("{}\n", noisy_nec_fields()).as_bytes())
        .unwrap();
    let result = child.wait_with_output().unwrap();

    assert!(result.status.success());
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert_eq!(stdout, format!("{}\r\n", adjusted_nec_fields()));
}

#[test]
fn stats_reports_match_table() {
    let temp = TempDir::new().unwrap();
    let input = write_input(&temp);

    let result = Command::new(irdb_binary())
        .arg("stats")
        .arg("--input")
        .arg(&input)
        .output()
        .expect("failed to run irdb stats");
    assert!(result.status.success());

    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("--- codes identified per protocol ---"));
    assert!(stdout.contains("1 codes identified as NEC"));
    assert!(stdout.contains("0 codes identified as Sony SIRCS"));
    assert!(stdout.contains("1 codes not identified out of 2 (50%)"));
}

#[test]
fn show_dumps_fingerprints() {
    let temp = TempDir::new().unwrap();
    let input = write_input(&temp);

    let result = Command::new(irdb_binary())
        .arg("show")
        .arg("--input")
        .arg(&input)
        .output()
        .expect("failed to run irdb show");
    assert!(result.status.success());

    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("protocol: NEC"));
    assert!(stdout.contains("encoding space varies, symbol count 32"));
    assert!(stdout.contains("set 100014 (NEC TV)"));
    assert!(stdout.contains("protocol: ### not identified ###"));
}

#[test]
fn show_filters_by_set() {
    let temp = TempDir::new().unwrap();
    let input = write_input(&temp);

    let result = Command::new(irdb_binary())
        .arg("show")
        .arg("--input")
        .arg(&input)
        .arg("--set")
        .arg("999990")
        .output()
        .expect("failed to run irdb show");
    assert!(result.status.success());

    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(!stdout.contains("protocol: NEC"));
    assert!(stdout.contains("MYST"));
}
