#![allow(missing_docs, clippy::expect_used, clippy::unwrap_used)]

mod common;

use common::{icpfind_cmd, write_cache};
use predicates::prelude::*;
use serde_json::Value;
use tempfile::tempdir;

const CACHE: &str = r#"{
  "Example Technology": [
    {"domain": "shop.example.cn", "licence": "京ICP备2号", "main_licence": {"unit": "Example Technology"}},
    {"domain": "example.cn", "licence": "京ICP备1号", "main_licence": {"unit": "Example Technology"}}
  ],
  "Acme": [
    {"domain": "acme.com", "licence": "沪ICP备9号"}
  ]
}"#;

#[test]
fn summarize_lists_entities_and_totals() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let cache = write_cache(dir.path(), CACHE);

    let output = icpfind_cmd()
        .arg("-s")
        .arg("--cache-file")
        .arg(&cache)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output)?;

    let acme = stdout.find("Acme (1 filing(s))").expect("Acme listed");
    let example = stdout
        .find("Example Technology (2 filing(s))")
        .expect("Example listed");
    assert!(acme < example, "entities are sorted by name");

    let first = stdout.find("  example.cn ").expect("example.cn listed");
    let second = stdout.find("shop.example.cn").expect("shop listed");
    assert!(first < second, "records are sorted by licence");
    assert!(stdout.contains("2 entities, 3 filing(s)"));
    Ok(())
}

#[test]
fn summarize_json() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let cache = write_cache(dir.path(), CACHE);

    let output = icpfind_cmd()
        .args(["-s", "--format", "json", "--cache-file"])
        .arg(&cache)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: Value = serde_json::from_slice(&output)?;

    assert_eq!(value["summary"]["entities"], 2);
    assert_eq!(value["summary"]["records"], 3);
    assert_eq!(value["entities"][0]["entity"], "Acme");
    Ok(())
}

#[test]
fn summarize_missing_or_corrupt_cache_is_empty() -> anyhow::Result<()> {
    let dir = tempdir()?;

    icpfind_cmd()
        .arg("-s")
        .arg("--cache-file")
        .arg(dir.path().join("absent.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("is empty"));

    let corrupt = write_cache(dir.path(), "{ not json");
    icpfind_cmd()
        .arg("-s")
        .arg("--cache-file")
        .arg(&corrupt)
        .assert()
        .success()
        .stdout(predicate::str::contains("is empty"));
    Ok(())
}

#[test]
fn search_matches_names_and_domains_case_insensitively() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let cache = write_cache(dir.path(), CACHE);

    icpfind_cmd()
        .args(["--search", "EXAMPLE", "--cache-file"])
        .arg(&cache)
        .assert()
        .success()
        .stdout(predicate::str::contains("Entities matching 'EXAMPLE'"))
        .stdout(predicate::str::contains("Domains matching 'EXAMPLE'"))
        .stdout(predicate::str::contains("(Example Technology)"))
        .stdout(predicate::str::contains("acme.com").not());
    Ok(())
}

#[test]
fn search_takes_precedence_over_summarize_and_query() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let cache = write_cache(dir.path(), CACHE);

    let output = icpfind_cmd()
        .args(["Acme", "-s", "--search", "acme", "--format", "json", "--cache-file"])
        .arg(&cache)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: Value = serde_json::from_slice(&output)?;

    assert_eq!(value["term"], "acme");
    assert_eq!(value["entities"][0]["entity"], "Acme");
    assert_eq!(value["domains"][0]["domain"], "acme.com");
    Ok(())
}

#[test]
fn search_without_matches() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let cache = write_cache(dir.path(), CACHE);

    icpfind_cmd()
        .args(["--search", "nothing-here", "--cache-file"])
        .arg(&cache)
        .assert()
        .success()
        .stdout(predicate::str::contains("No cached entities or domains match"));
    Ok(())
}
