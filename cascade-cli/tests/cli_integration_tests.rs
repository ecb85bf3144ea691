//! Runs the `cascade` binary against temporary projects

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A project with a `cascade.yaml` and a three-layer cache configuration.
fn project() -> TempDir {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "cascade.yaml", "application: frontend\nenvironment: prod\n");
    write(
        temp.path(),
        "lib/framework/data/config/cache.yml",
        "all: {activate: on, lifetime: 0}\n",
    );
    write(temp.path(), "config/cache.yml", "all: {lifetime: 60}\n");
    write(
        temp.path(),
        "apps/frontend/modules/blog/config/cache.yml",
        "all: {lifetime: 30}\n",
    );
    temp
}

fn cascade(project: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cascade").unwrap();
    cmd.env_remove("RUST_LOG")
        .arg("--project")
        .arg(project.path());
    cmd
}

#[test]
fn test_help() {
    Command::cargo_bin("cascade")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("cache"));
}

#[test]
fn test_resolve_lists_layers_in_order() {
    let project = project();
    let output = cascade(&project)
        .args(["resolve", "modules/blog/config/cache.yml", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let layers: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let origins: Vec<&str> = layers
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["origin"]["layer"].as_str().unwrap())
        .collect();
    assert_eq!(origins, vec!["framework", "project", "module"]);
}

#[test]
fn test_compile_applies_precedence() {
    let project = project();
    cascade(&project)
        .args(["compile", "modules/blog/config/cache.yml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kind: cache"))
        .stdout(predicate::str::contains("lifetime: 30"));
}

#[test]
fn test_cache_status_follows_compilation() {
    let project = project();
    let path = "modules/blog/config/cache.yml";

    cascade(&project)
        .args(["cache", "status", path])
        .assert()
        .success()
        .stdout(predicate::str::contains("uncompiled"));

    cascade(&project)
        .args(["compile", path, "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"lifetime\": 30"));

    cascade(&project)
        .args(["cache", "status", path])
        .assert()
        .success()
        .stdout(predicate::str::contains("fresh"));

    assert!(project
        .path()
        .join("cache/config/frontend/prod/modules/blog/config/cache.yml.cache.yml")
        .is_file());

    cascade(&project)
        .args(["cache", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 1 compiled artifact(s)"));
}

#[test]
fn test_no_cache_leaves_cache_empty() {
    let project = project();
    let path = "modules/blog/config/cache.yml";
    cascade(&project)
        .args(["compile", path, "--no-cache"])
        .assert()
        .success();
    cascade(&project)
        .args(["cache", "status", path])
        .assert()
        .success()
        .stdout(predicate::str::contains("uncompiled"));
}

#[test]
fn test_env_flag_overrides_settings_file() {
    let project = project();
    cascade(&project)
        .args(["--env", "staging", "cache", "status", "config/settings.yml", "--format", "yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("frontend/staging"));
}

#[test]
fn test_configuration_error_exits_with_one() {
    let project = project();
    write(
        project.path(),
        "apps/frontend/modules/blog/config/cache.yml",
        "all: {lifetime: forever}\n",
    );
    cascade(&project)
        .args(["compile", "modules/blog/config/cache.yml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("lifetime"));
}

#[test]
fn test_invalid_logical_path_exits_with_one() {
    let project = project();
    cascade(&project)
        .args(["resolve", "../escape.yml"])
        .assert()
        .code(1);
}

#[test]
fn test_failed_startup_check_exits_with_two() {
    let project = project();
    write(
        project.path(),
        "cascade.yaml",
        r#"
application: frontend
runtime:
  settings:
    magic_quotes_gpc: {value: "1", overridable: false}
"#,
    );
    write(project.path(), "config/php.yml", "check: {magic_quotes_gpc: off}\n");

    cascade(&project)
        .arg("check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("magic_quotes_gpc"));
}

#[test]
fn test_check_applies_overrides() {
    let project = project();
    write(
        project.path(),
        "cascade.yaml",
        r#"
application: frontend
runtime:
  settings:
    display_errors: {value: "1"}
"#,
    );
    write(project.path(), "config/php.yml", "set: {display_errors: off}\n");

    cascade(&project)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 runtime override(s) applied"));
}

#[test]
fn test_project_root_is_discovered_from_subdirectory() {
    let project = project();
    let nested = project.path().join("apps/frontend/modules/blog");

    Command::cargo_bin("cascade")
        .unwrap()
        .env_remove("RUST_LOG")
        .current_dir(&nested)
        .args(["resolve", "modules/blog/config/cache.yml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("framework"))
        .stdout(predicate::str::contains("module"));
}

#[test]
fn test_malformed_settings_do_not_block_cache_commands() {
    let project = project();
    write(project.path(), "config/settings.yml", "all: [unclosed\n");

    cascade(&project)
        .args(["cache", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 0 compiled artifact(s)"));

    cascade(&project)
        .args(["cache", "status", "config/settings.yml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("uncompiled"));

    cascade(&project)
        .args(["resolve", "modules/blog/config/cache.yml"])
        .assert()
        .success();
}

#[test]
fn test_no_cache_view_compile_leaves_cache_empty() {
    let project = project();
    write(
        project.path(),
        "apps/frontend/modules/blog/config/view.yml",
        "indexSuccess: {layout: site}\n",
    );
    let path = "modules/blog/config/view.yml";

    cascade(&project)
        .args(["compile", path, "--no-cache"])
        .assert()
        .success();

    cascade(&project)
        .args(["cache", "status", "config/settings.yml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("uncompiled"));
    cascade(&project)
        .args(["cache", "status", path])
        .assert()
        .success()
        .stdout(predicate::str::contains("uncompiled"));
    assert!(!project.path().join("cache").exists());
}

#[test]
fn test_lookup_template_prefers_application_module() {
    let project = project();
    write(
        project.path(),
        "lib/framework/data/modules/blog/templates/indexSuccess.php",
        "core",
    );
    write(
        project.path(),
        "apps/frontend/modules/blog/templates/indexSuccess.php",
        "app",
    );

    cascade(&project)
        .args(["lookup", "template", "blog", "indexSuccess.php"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            Path::new("apps/frontend/modules/blog/templates")
                .join("indexSuccess.php")
                .display()
                .to_string(),
        ));
}

#[test]
fn test_lookup_missing_template_lists_searched_directories() {
    let project = project();
    cascade(&project)
        .args(["lookup", "template", "blog", "missingSuccess.php"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("missingSuccess.php"))
        .stderr(predicate::str::contains(
            Path::new("apps/frontend/modules/blog/templates")
                .display()
                .to_string(),
        ));
}
