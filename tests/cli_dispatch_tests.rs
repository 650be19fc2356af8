use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::{json, Value};
use tempfile::TempDir;

use exportify::store::id_path;

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_wof-exportify")
}

fn record_path(repo: &Path, id: i64) -> PathBuf {
    repo.join("data").join(id_path(id).expect("valid id"))
}

fn write_record(repo: &Path, id: i64, name: &str) {
    let path = record_path(repo, id);
    fs::create_dir_all(path.parent().expect("record has a parent dir")).unwrap();
    let doc = json!({
        "type": "Feature",
        "properties": {
            "wof:id": id,
            "wof:name": name,
            "wof:parent_id": -1,
            "wof:hierarchy": [],
            "mz:is_current": 1,
            "edtf:inception": "2001",
            "edtf:cessation": ".."
        },
        "geometry": {"type": "Point", "coordinates": [0.0, 0.0]}
    });
    fs::write(path, serde_json::to_vec_pretty(&doc).unwrap()).unwrap();
}

fn read_record(repo: &Path, id: i64) -> Value {
    let body = fs::read(record_path(repo, id)).expect("record should exist");
    serde_json::from_slice(&body).expect("record should be json")
}

fn run(repo: &Path, args: &[&str]) -> Output {
    Command::new(bin())
        .arg("-s")
        .arg(repo)
        .args(args)
        .env_remove("WOF_READER_URI")
        .env_remove("WOF_WRITER_URI")
        .env_remove("WOF_EXPORTER_URI")
        .output()
        .expect("wof-exportify should run")
}

#[test]
fn deprecate_rewrites_both_records() {
    let repo = TempDir::new().unwrap();
    write_record(repo.path(), 101, "Old");
    write_record(repo.path(), 200, "New");

    let output = run(
        repo.path(),
        &["deprecate", "--id", "101", "--superseded-by", "200", "--date", "2020-01-01"],
    );
    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));

    let old = read_record(repo.path(), 101);
    assert_eq!(old["properties"]["edtf:deprecated"], "2020-01-01");
    assert_eq!(old["properties"]["mz:is_current"], 0);
    assert_eq!(old["properties"]["wof:superseded_by"], json!([200]));
    assert!(old["properties"]["wof:lastmodified"].is_i64());

    let new = read_record(repo.path(), 200);
    assert_eq!(new["properties"]["wof:supersedes"], json!([101]));
}

#[test]
fn clone_prints_the_new_id() {
    let repo = TempDir::new().unwrap();
    write_record(repo.path(), 101, "Old");

    let output = run(
        repo.path(),
        &[
            "--exporter-uri",
            "whosonfirst://?id-start=1000",
            "clone",
            "--id",
            "101",
            "--supersedes",
            "--string-property",
            "properties.wof:name=Newer",
        ],
    );
    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "1000");

    let clone = read_record(repo.path(), 1000);
    assert_eq!(clone["properties"]["wof:name"], "Newer");
    assert_eq!(clone["properties"]["wof:supersedes"], json!([101]));
    assert_eq!(
        read_record(repo.path(), 101)["properties"]["wof:superseded_by"],
        json!([1000])
    );
}

#[test]
fn missing_ids_are_a_usage_error() {
    let repo = TempDir::new().unwrap();
    let output = run(repo.path(), &["deprecate"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn conflicting_clone_flags_fail_before_reading() {
    let repo = TempDir::new().unwrap();
    let output = run(
        repo.path(),
        &["clone", "--id", "404", "--supersedes", "--superseded"],
    );
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot both supersede"));
}

#[test]
fn bad_dates_are_a_usage_error() {
    let repo = TempDir::new().unwrap();
    write_record(repo.path(), 101, "Old");
    let before = fs::read(record_path(repo.path(), 101)).unwrap();

    let output = run(repo.path(), &["cessate", "--id", "101", "--date", "someday"]);
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(fs::read(record_path(repo.path(), 101)).unwrap(), before);
}

#[test]
fn unknown_records_fail_with_an_error() {
    let repo = TempDir::new().unwrap();
    let output = run(repo.path(), &["export", "--id", "404"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("404"));
}

#[test]
fn create_copies_the_parent_hierarchy() {
    let repo = TempDir::new().unwrap();
    write_record(repo.path(), 85633041, "United States");

    let output = run(
        repo.path(),
        &[
            "--exporter-uri",
            "whosonfirst://?id-start=5000",
            "create",
            "--geometry",
            r#"{"type":"Point","coordinates":[-122.38,37.61]}"#,
            "--string-property",
            "properties.wof:name=Gate A1",
            "--int-property",
            "properties.wof:parent_id=85633041",
        ],
    );
    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "5000");

    let created = read_record(repo.path(), 5000);
    assert_eq!(created["properties"]["wof:name"], "Gate A1");
    assert_eq!(created["properties"]["wof:parent_id"], 85633041);
    assert_eq!(created["geometry"]["type"], "Point");
}

#[test]
fn invalid_geometry_is_a_usage_error() {
    let repo = TempDir::new().unwrap();
    let output = run(repo.path(), &["create", "--geometry", r#"{"type":"Point"}"#]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn help_exits_cleanly() {
    let output = Command::new(bin()).arg("--help").output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("supersede-with-parent"));
}
