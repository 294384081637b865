#![cfg(feature = "cli")]

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

const AUTH_FRAME: &str = "7E01020006014530399195003F717361757468597E";

const JT808_LAYOUT: &str = include_str!("../layouts/jt808.json");

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "pckmatch-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn pckmatch(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pckmatch"))
        .args(args)
        .output()
        .expect("pckmatch should run")
}

fn json_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be json"))
        .collect()
}

#[test]
fn split_prints_one_json_line_per_frame() {
    let dir = unique_temp_dir("split");
    let input = dir.join("dump.bin");
    std::fs::write(&input, hex::decode(AUTH_FRAME.repeat(3)).unwrap()).unwrap();

    let output = pckmatch(&[
        "--format",
        "json",
        "split",
        "--hex",
        "--start",
        "7e",
        "--end",
        "7e",
        input.to_str().unwrap(),
    ]);

    assert!(output.status.success());
    let frames = json_lines(&output);
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[2]["index"], 2);
    assert_eq!(frames[0]["size"], 21);
    assert_eq!(frames[0]["hex"], AUTH_FRAME.to_ascii_lowercase());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn split_reads_stdin_and_honours_count() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_pckmatch"))
        .args(["--format", "raw", "split", "--end", ";", "--count", "2"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("split should start");
    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(b"a;bb;ccc;")
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    assert_eq!(output.stdout, b"a;bb;");
}

#[test]
fn match_decodes_fields_with_layout() {
    let dir = unique_temp_dir("match");
    let layout = dir.join("jt808.json");
    std::fs::write(&layout, JT808_LAYOUT).unwrap();
    let input = dir.join("dump.bin");
    std::fs::write(&input, hex::decode(AUTH_FRAME).unwrap()).unwrap();

    let output = pckmatch(&[
        "--format",
        "json",
        "match",
        "--layout",
        layout.to_str().unwrap(),
        input.to_str().unwrap(),
    ]);

    assert!(output.status.success());
    let decoded = json_lines(&output);
    assert_eq!(decoded.len(), 1);
    let fields = decoded[0]["fields"].as_array().unwrap();
    let names: Vec<&str> = fields.iter().map(|f| f["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["code", "props", "mobile", "msgno", "rest", "check"]);
    assert_eq!(fields[2]["value"], "014530399195");
    assert_eq!(fields[3]["value"], 63);
    assert_eq!(fields[4]["value"], hex::encode("qsauth"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn match_rejects_invalid_layout() {
    let dir = unique_temp_dir("bad-layout");
    let layout = dir.join("bad.json");
    std::fs::write(&layout, r#"{ "framing": {}, "fields": [] }"#).unwrap();

    let output = pckmatch(&["match", "--layout", layout.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&output.stderr).contains("layout rejected"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn index_then_find() {
    let dir = unique_temp_dir("index");
    let records = dir.join("records.txt");
    let keys = dir.join("keys.txt");
    let index = dir.join("regions.idx");
    std::fs::write(&records, "Beijing\nShanghai\n").unwrap();
    std::fs::write(&keys, "# key record\n13000000 0\n13500000 1\n19999999 0\n").unwrap();

    let output = pckmatch(&[
        "--format",
        "json",
        "index",
        "--records",
        records.to_str().unwrap(),
        "--keys",
        keys.to_str().unwrap(),
        "-o",
        index.to_str().unwrap(),
        "--stamp",
        "26011500",
    ]);
    assert!(output.status.success());
    let summary = json_lines(&output);
    assert_eq!(summary[0]["keys"], 3);
    assert_eq!(summary[0]["version"], "26011500");

    let hit = pckmatch(&["--format", "json", "find", index.to_str().unwrap(), "13800000"]);
    assert!(hit.status.success());
    let found = json_lines(&hit);
    assert_eq!(found[0]["found"], true);
    assert_eq!(found[0]["record"], "Shanghai");

    let miss = pckmatch(&["--format", "json", "find", index.to_str().unwrap(), "12000000"]);
    assert_eq!(miss.status.code(), Some(1));
    assert_eq!(json_lines(&miss)[0]["found"], false);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_input_returns_66() {
    let output = pckmatch(&["split", "--end", "\n", "/nonexistent/pckmatch-input.bin"]);
    assert_eq!(output.status.code(), Some(66));
}

#[test]
fn version_reports_package_version() {
    let output = pckmatch(&["version"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("pckmatch {}", env!("CARGO_PKG_VERSION"))
    );
}
