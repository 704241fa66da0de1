use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tempfile::{NamedTempFile, TempDir};

fn csv2json(db: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("csv2json"));
    cmd.arg("--db").arg(db);
    cmd
}

fn write_csv(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn help_works() -> Result<(), Box<dyn std::error::Error>> {
    Command::new(assert_cmd::cargo::cargo_bin!("csv2json"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"));
    Ok(())
}

#[test]
fn convert_prints_nested_json() -> Result<(), Box<dyn std::error::Error>> {
    let mut tmp = NamedTempFile::new()?;
    write!(tmp, "id,user.name,user.tags[0],user.tags[1]\n7,ann,a,b\n")?;

    let output = Command::new(assert_cmd::cargo::cargo_bin!("csv2json"))
        .arg("convert")
        .arg(tmp.path())
        .output()?;
    assert!(output.status.success());
    let v: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(v, serde_json::json!([{"id": "7", "user": {"name": "ann", "tags": ["a", "b"]}}]));
    Ok(())
}

#[test]
fn convert_reads_stdin_with_separator() -> Result<(), Box<dyn std::error::Error>> {
    assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("csv2json"))
        .args(["convert", "--separator", "|"])
        .write_stdin("a|b\n1|2\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"[{"a":"1","b":"2"}]"#));
    Ok(())
}

#[test]
fn convert_empty_input_fails() -> Result<(), Box<dyn std::error::Error>> {
    assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("csv2json"))
        .arg("convert")
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("header"));
    Ok(())
}

#[test]
fn import_list_get() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let db = dir.path().join("files.db");
    let csv = write_csv(&dir, "people.csv", "name;city\nann;oslo\nbo;rome\n");

    csv2json(&db)
        .args(["import", "--separator", ";"])
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("file 1 saved"));

    let output = csv2json(&db).arg("list").output()?;
    assert!(output.status.success());
    let list: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(list[0]["name"], serde_json::json!("people"));
    assert_eq!(list[0]["id"], serde_json::json!(1));

    let output = csv2json(&db).args(["get", "people", "--key", "city", "--value", "rome"]).output()?;
    assert!(output.status.success());
    let v: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(v, serde_json::json!([{"name": "bo", "city": "rome"}]));
    Ok(())
}

#[test]
fn get_missing_and_import_non_csv_fail() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let db = dir.path().join("files.db");
    let txt = write_csv(&dir, "notes.txt", "a\n1\n");

    csv2json(&db)
        .args(["get", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ghost not found"));
    csv2json(&db)
        .arg("import")
        .arg(&txt)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a csv file"));
    Ok(())
}
