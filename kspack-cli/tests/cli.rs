use predicates::prelude::*;
use serde_json::{json, Value};
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

struct SampleFile {
    dir: TempDir,
    json_path: PathBuf,
    ksp_path: PathBuf,
}

fn sample_document() -> Value {
    json!({
        "Name": "a",
        "N": 100,
        "tags": ["x", "y"],
        "nested": {"ok": true, "ratio": 0.5, "missing": null},
    })
}

fn build_sample_file() -> Result<SampleFile, Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let json_path = dir.path().join("input.json");
    let ksp_path = dir.path().join("output.ksp");
    fs::write(&json_path, serde_json::to_vec(&sample_document())?)?;

    assert_cmd::Command::cargo_bin("kspack")?
        .args([
            "encode",
            json_path.to_str().unwrap(),
            "-o",
            ksp_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    Ok(SampleFile {
        dir,
        json_path,
        ksp_path,
    })
}

#[test]
fn encode_decode_roundtrip() -> Result<(), Box<dyn Error>> {
    let sample = build_sample_file()?;
    let bytes = fs::read(&sample.ksp_path)?;
    assert_eq!(bytes[0], 0x10, "root entry is an object");

    let decoded_path = sample.dir.path().join("decoded.json");
    assert_cmd::Command::cargo_bin("kspack")?
        .args([
            "decode",
            sample.ksp_path.to_str().unwrap(),
            "-o",
            decoded_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    let decoded: Value = serde_json::from_slice(&fs::read(&decoded_path)?)?;
    assert_eq!(decoded, sample_document());
    Ok(())
}

#[test]
fn decode_pretty_to_stdout() -> Result<(), Box<dyn Error>> {
    let sample = build_sample_file()?;
    let output = assert_cmd::Command::cargo_bin("kspack")?
        .args(["decode", sample.ksp_path.to_str().unwrap(), "--pretty"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output)?;
    assert!(stdout.lines().count() > 1);
    let decoded: Value = serde_json::from_str(&stdout)?;
    assert_eq!(decoded, sample_document());
    Ok(())
}

#[test]
fn encode_with_json_codec() -> Result<(), Box<dyn Error>> {
    let sample = build_sample_file()?;
    let output = assert_cmd::Command::cargo_bin("kspack")?
        .args([
            "encode",
            sample.json_path.to_str().unwrap(),
            "--codec",
            "json",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: Value = serde_json::from_slice(&output)?;
    assert_eq!(value, sample_document());
    Ok(())
}

#[test]
fn dump_lists_entries() -> Result<(), Box<dyn Error>> {
    let sample = build_sample_file()?;
    let output = assert_cmd::Command::cargo_bin("kspack")?
        .args(["dump", sample.ksp_path.to_str().unwrap()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output)?;
    let lines: Vec<_> = stdout.lines().collect();
    assert!(lines[0].starts_with("00000000 object count=4"));
    assert!(stdout.contains("short-string \"Name\" len=2 = \"a\""));
    assert!(stdout.contains("\"N\" = 100"));
    assert!(stdout.contains("null \"missing\" = null"));
    Ok(())
}

#[test]
fn codecs_lists_builtin() -> Result<(), Box<dyn Error>> {
    assert_cmd::Command::cargo_bin("kspack")?
        .arg("codecs")
        .assert()
        .success()
        .stdout(predicate::eq("json\nkspack\n"));
    Ok(())
}

#[test]
fn unknown_codec_fails() -> Result<(), Box<dyn Error>> {
    let sample = build_sample_file()?;
    assert_cmd::Command::cargo_bin("kspack")?
        .args([
            "encode",
            sample.json_path.to_str().unwrap(),
            "--codec",
            "msgpack",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Available codecs: json, kspack"));
    Ok(())
}

#[test]
fn truncated_input_fails() -> Result<(), Box<dyn Error>> {
    let sample = build_sample_file()?;
    let mut bytes = fs::read(&sample.ksp_path)?;
    bytes.truncate(bytes.len() - 3);
    fs::write(&sample.ksp_path, &bytes)?;

    assert_cmd::Command::cargo_bin("kspack")?
        .args(["decode", sample.ksp_path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unexpected end"));
    Ok(())
}

#[test]
fn max_depth_is_enforced() -> Result<(), Box<dyn Error>> {
    let sample = build_sample_file()?;
    assert_cmd::Command::cargo_bin("kspack")?
        .args([
            "decode",
            sample.ksp_path.to_str().unwrap(),
            "--max-depth",
            "1",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Depth limit exceeded"));
    Ok(())
}

#[test]
fn max_input_bytes_is_enforced() -> Result<(), Box<dyn Error>> {
    let sample = build_sample_file()?;
    assert_cmd::Command::cargo_bin("kspack")?
        .args([
            "dump",
            sample.ksp_path.to_str().unwrap(),
            "--max-input-bytes",
            "8",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Limit exceeded"));
    Ok(())
}

#[test]
fn missing_input_fails() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("absent.json");
    assert_cmd::Command::cargo_bin("kspack")?
        .args(["encode", missing.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.json"));
    Ok(())
}
