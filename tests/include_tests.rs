//! Integration tests for `include` handling.

use layered_config::config::{Configurer, EnvironmentMap, Resolver};
use layered_config::error::{ConfigError, ErrorCode};
use serde_json::json;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn env(pairs: &[(&str, &str)]) -> EnvironmentMap {
    EnvironmentMap::new(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        HashMap::new(),
    )
}

/// Root with two includes in subdirectories.
fn include_fixture(temp: &TempDir) -> PathBuf {
    write(
        temp.path(),
        "include1/.rr-include.yaml",
        r#"
version: '2023.3.5'
http:
  address: ${HTTP_ADDRESS:-127.0.0.1:15389}
reload:
  interval: 10s
"#,
    );
    write(
        temp.path(),
        "include2/.rr-include.yaml",
        r#"
version: '2023.3.5'
logs:
  encoding: console
"#,
    );
    write(
        temp.path(),
        ".rr.yaml",
        r#"
version: '2023.3.5'
include:
  - include1/.rr-include.yaml
  - include2/.rr-include.yaml
reload:
  patterns: [".php"]
"#,
    )
}

#[test]
fn test_include_merge() {
    let temp = TempDir::new().unwrap();
    let root = include_fixture(&temp);

    let r = Resolver::builder()
        .path(&root)
        .prefix("rr")
        .host_version("2023.3.5")
        .env(env(&[]))
        .resolve()
        .unwrap();

    assert_eq!(r.get("http.address"), Some(&json!("127.0.0.1:15389")));
    assert_eq!(r.get("reload.interval"), Some(&json!("10s")));
    assert_eq!(r.get("logs.encoding"), Some(&json!("console")));
    assert_eq!(r.get("reload.patterns"), Some(&json!([".php"])));
}

#[test]
fn test_included_files_use_same_environment() {
    let temp = TempDir::new().unwrap();
    let root = include_fixture(&temp);

    let r = Resolver::builder()
        .path(&root)
        .prefix("rr")
        .host_version("2023.3.5")
        .env(env(&[("HTTP_ADDRESS", "0.0.0.0:80"), ("RR_LOGS_ENCODING", "json")]))
        .resolve()
        .unwrap();

    assert_eq!(r.get("http.address"), Some(&json!("0.0.0.0:80")));
    // Prefix binding applies to included files too
    assert_eq!(r.get("logs.encoding"), Some(&json!("json")));
}

#[test]
fn test_include_wins_over_root_and_flags() {
    let temp = TempDir::new().unwrap();
    let root = include_fixture(&temp);

    let r = Resolver::builder()
        .path(&root)
        .prefix("rr")
        .host_version("2023.3.5")
        .env(env(&[]))
        .flag("reload.interval=1s")
        .flag("logs.level=debug")
        .resolve()
        .unwrap();

    assert_eq!(r.get("reload.interval"), Some(&json!("10s")));
    assert_eq!(r.get("logs.level"), Some(&json!("debug")));
}

#[test]
fn test_includes_disabled() {
    let temp = TempDir::new().unwrap();
    let root = include_fixture(&temp);

    let r = Resolver::builder()
        .path(&root)
        .prefix("rr")
        .host_version("2023.3.5")
        .env(env(&[]))
        .includes(false)
        .resolve()
        .unwrap();

    assert!(!r.has("http.address"));
    assert!(!r.has("logs"));
    assert_eq!(r.get("reload.patterns"), Some(&json!([".php"])));
}

#[test]
fn test_include_version_mismatch() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "include1/.rr-include.yaml",
        "version: '2023.3.4'\nlogs:\n  level: info\n",
    );
    let root = write(
        temp.path(),
        ".rr.yaml",
        "version: '2023.3.5'\ninclude:\n  - include1/.rr-include.yaml\n",
    );

    let err = Resolver::builder()
        .path(&root)
        .prefix("rr")
        .host_version("2023.3.5")
        .env(env(&[]))
        .resolve()
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::IncludeVersionMismatch);
    match err {
        ConfigError::IncludeVersionMismatch {
            expected, found, ..
        } => {
            assert_eq!(expected, "2023.3.5");
            assert_eq!(found, "2023.3.4");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_include_version_must_match_exactly() {
    let temp = TempDir::new().unwrap();
    // Compatible but spelled differently still counts as a mismatch
    write(temp.path(), "a.yaml", "version: '2.7.0'\n");
    let root = write(temp.path(), ".rr.yaml", "version: '2.7'\ninclude: a.yaml\n");

    let err = Resolver::builder()
        .path(&root)
        .prefix("rr")
        .host_version("2.7")
        .env(env(&[]))
        .resolve()
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::IncludeVersionMismatch);
}

#[test]
fn test_missing_include_file() {
    let temp = TempDir::new().unwrap();
    let root = write(
        temp.path(),
        ".rr.yaml",
        "version: '2.7'\ninclude: [missing.yaml]\n",
    );

    let err = Resolver::builder()
        .path(&root)
        .prefix("rr")
        .env(env(&[]))
        .resolve()
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConfigNotFound);
}

#[test]
fn test_include_list_from_override() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "extra.yaml", "version: '2.7'\nkv:\n  driver: memory\n");
    let root = write(temp.path(), ".rr.yaml", "version: '2.7'\n");

    let r = Resolver::builder()
        .path(&root)
        .prefix("rr")
        .env(env(&[]))
        .flag("include=extra.yaml")
        .resolve()
        .unwrap();
    assert_eq!(r.get("kv.driver"), Some(&json!("memory")));
}

#[test]
fn test_included_files_see_env_file() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), ".env", "RELOAD_INTERVAL=30s\n");
    write(
        temp.path(),
        "include1/.rr-include.yaml",
        "version: '2.7'\nreload:\n  interval: ${RELOAD_INTERVAL}\n",
    );
    let root = write(
        temp.path(),
        ".rr.yaml",
        "version: '2.7'\nenv_file: .env\ninclude:\n  - include1/.rr-include.yaml\n",
    );

    let r = Resolver::builder()
        .path(&root)
        .prefix("rr")
        .env(env(&[]))
        .resolve()
        .unwrap();
    assert_eq!(r.get("reload.interval"), Some(&json!("30s")));

    // The process environment still wins over the dotenv file
    let r = Resolver::builder()
        .path(&root)
        .prefix("rr")
        .env(env(&[("RELOAD_INTERVAL", "5s")]))
        .resolve()
        .unwrap();
    assert_eq!(r.get("reload.interval"), Some(&json!("5s")));
}

#[test]
fn test_include_with_dotted_keys() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "a.yaml",
        "version: '2.7'\nheaders:\n  'X.Host': '${HOST:-example.com}'\n",
    );
    let root = write(
        temp.path(),
        ".rr.yaml",
        "version: '2.7'\ninclude: [a.yaml]\nheaders:\n  'X.Id': root\n",
    );

    let r = Resolver::builder()
        .path(&root)
        .prefix("rr")
        .env(env(&[]))
        .resolve()
        .unwrap();
    assert_eq!(
        r.tree().to_value()["headers"],
        json!({"X.Id": "root", "X.Host": "example.com"})
    );
}
