#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn engkit(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("engkit").unwrap();
    cmd.current_dir(dir.path())
        .env("ENGKIT_ROOT", dir.path())
        .env_remove("ENGKIT_PROJECTS_DIR")
        .env_remove("ENGKIT_TOOLKIT_DIR");
    cmd
}

/// Scaffold `name` under `dir` without git and return its path.
fn init_project(dir: &TempDir, name: &str) -> std::path::PathBuf {
    engkit(dir)
        .args(["init", name, "--no-git"])
        .assert()
        .success();
    dir.path().join(name)
}

fn project_cmd(project: &Path) -> Command {
    let mut cmd = Command::cargo_bin("engkit").unwrap();
    cmd.current_dir(project)
        .env("ENGKIT_ROOT", project)
        .env_remove("ENGKIT_TOOLKIT_DIR");
    cmd
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_project_tree() {
    let dir = TempDir::new().unwrap();
    engkit(&dir)
        .args(["init", "pump-design", "--no-git", "-t", "mechanical"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[1/7]"))
        .stdout(predicate::str::contains("PROJECT INITIALIZED: pump-design"));

    let project = dir.path().join("pump-design");
    for rel in [
        "CONTEXT.md",
        "CLAUDE.md",
        "WORKFLOW.md",
        "project_params.py",
        ".gitignore",
        ".claude/settings.json",
        ".claude/settings.local.json",
        ".engkit/config.yaml",
        "requirements-engineering.txt",
    ] {
        assert!(project.join(rel).is_file(), "missing {rel}");
    }
    assert!(!project.join(".git").exists());

    let context = std::fs::read_to_string(project.join("CONTEXT.md")).unwrap();
    assert!(context.contains("pump-design"));
    assert!(!context.contains("{{PROJECT_NAME}}"));

    let config: serde_yaml::Value =
        serde_yaml::from_str(&std::fs::read_to_string(project.join(".engkit/config.yaml")).unwrap())
            .unwrap();
    assert_eq!(config["project"]["kind"].as_str(), Some("mechanical"));
    assert_eq!(
        config["toolkit_version"].as_str(),
        Some(env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn init_settings_register_hooks() {
    let dir = TempDir::new().unwrap();
    let project = init_project(&dir, "turbine");
    let settings = std::fs::read_to_string(project.join(".claude/settings.json")).unwrap();
    for name in [
        "context-update",
        "doc-before-design",
        "context-before-work",
        "bash-safety",
    ] {
        assert!(
            settings.contains(&format!("engkit hook {name}")),
            "{name} not registered"
        );
    }
}

#[test]
fn init_dry_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    engkit(&dir)
        .args(["init", "motor", "--dry-run", "--full"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DRY RUN"))
        .stdout(predicate::str::contains("motor engineering project"));
    assert!(!dir.path().join("motor").exists());
}

#[test]
fn init_rejects_invalid_name() {
    let dir = TempDir::new().unwrap();
    engkit(&dir)
        .args(["init", "9lives", "--no-git"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
    assert!(!dir.path().join("9lives").exists());
}

#[test]
fn init_rejects_existing_target() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("taken")).unwrap();
    engkit(&dir)
        .args(["init", "taken", "--no-git"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn init_honours_projects_dir() {
    let dir = TempDir::new().unwrap();
    let parent = dir.path().join("projects");
    std::fs::create_dir(&parent).unwrap();
    engkit(&dir)
        .env("ENGKIT_PROJECTS_DIR", &parent)
        .args(["init", "valve", "--no-git"])
        .assert()
        .success();
    assert!(parent.join("valve/CONTEXT.md").is_file());
}

#[test]
fn init_json_reports_project() {
    let dir = TempDir::new().unwrap();
    let out = engkit(&dir)
        .args(["init", "rotor", "--no-git", "--json", "--rag", "--dashboard"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["name"], "rotor");
    assert_eq!(report["knowledge_index"], true);
    assert!(dir.path().join("rotor/dashboard.html").is_file());
    assert!(dir.path().join("rotor/.engkit/knowledge/manifest.json").is_file());
}

// ---------------------------------------------------------------------------
// verify
// ---------------------------------------------------------------------------

#[test]
fn verify_fresh_project_is_valid() {
    let dir = TempDir::new().unwrap();
    let project = init_project(&dir, "pump");
    project_cmd(&project)
        .arg("verify")
        .assert()
        .success()
        .stdout(predicate::str::contains("[Structure]"))
        .stdout(predicate::str::contains("STATUS: VALID"));
}

#[test]
fn verify_strict_fails_on_git_warnings() {
    let dir = TempDir::new().unwrap();
    let project = init_project(&dir, "pump");
    project_cmd(&project)
        .args(["verify", "--strict"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("INVALID (strict mode)"));
}

#[test]
fn verify_missing_core_file_is_invalid() {
    let dir = TempDir::new().unwrap();
    let project = init_project(&dir, "pump");
    std::fs::remove_file(project.join("WORKFLOW.md")).unwrap();
    project_cmd(&project)
        .arg("verify")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("[FAIL]"))
        .stdout(predicate::str::contains("STATUS: INVALID"));
}

#[test]
fn verify_json_report() {
    let dir = TempDir::new().unwrap();
    let project = init_project(&dir, "pump");
    let out = project_cmd(&project)
        .args(["verify", "--json"])
        .output()
        .unwrap();
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["errors"], 0);
    assert_eq!(report["sections"][0]["name"], "Structure");
}

#[test]
fn verify_nonexistent_path_errors() {
    let dir = TempDir::new().unwrap();
    engkit(&dir)
        .args(["verify", "no-such-project"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

// ---------------------------------------------------------------------------
// update
// ---------------------------------------------------------------------------

#[test]
fn update_up_to_date_without_force() {
    let dir = TempDir::new().unwrap();
    let project = init_project(&dir, "pump");
    engkit(&dir)
        .args(["update", "pump"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already up to date"));
    assert!(project.join("CONTEXT.md").is_file());
}

#[test]
fn update_force_preserves_user_files() {
    let dir = TempDir::new().unwrap();
    let project = init_project(&dir, "pump");

    let local = project.join(".claude/settings.local.json");
    std::fs::write(&local, "{\"permissions\": {\"allow\": [\"Bash(ls)\"]}}").unwrap();
    std::fs::write(project.join("scripts/my_tool.py"), "print('mine')\n").unwrap();
    std::fs::write(project.join("CONTEXT.md"), "# my own context\n").unwrap();
    std::fs::remove_dir_all(project.join(".claude/commands")).unwrap();

    engkit(&dir)
        .args(["update", "pump", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kept:    scripts/my_tool.py"));

    assert!(std::fs::read_to_string(&local).unwrap().contains("Bash(ls)"));
    assert!(project.join("scripts/my_tool.py").is_file());
    assert!(project.join(".claude/commands/prime.md").is_file());
    assert_eq!(
        std::fs::read_to_string(project.join("CONTEXT.md")).unwrap(),
        "# my own context\n"
    );
}

#[test]
fn update_dry_run_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let project = init_project(&dir, "pump");
    std::fs::remove_dir_all(project.join("templates")).unwrap();
    engkit(&dir)
        .args(["update", "pump", "--force", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DRY RUN"));
    assert!(!project.join("templates").exists());
}

#[test]
fn update_requires_context_md() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("plain")).unwrap();
    engkit(&dir)
        .args(["update", "plain"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONTEXT.md"));
}

#[test]
fn update_stamps_version_on_legacy_project() {
    let dir = TempDir::new().unwrap();
    let project = dir.path().join("legacy");
    std::fs::create_dir(&project).unwrap();
    std::fs::write(project.join("CONTEXT.md"), "# legacy\n").unwrap();

    engkit(&dir)
        .args(["update", "legacy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vunknown"));
    let config = std::fs::read_to_string(project.join(".engkit/config.yaml")).unwrap();
    assert!(config.contains(env!("CARGO_PKG_VERSION")));
    assert!(project.join(".claude/settings.json").is_file());
}

// ---------------------------------------------------------------------------
// dashboard
// ---------------------------------------------------------------------------

#[test]
fn dashboard_renders_context() {
    let dir = TempDir::new().unwrap();
    let project = init_project(&dir, "pump");
    std::fs::write(
        project.join("CONTEXT.md"),
        "# Pump\n\n## Project State\n\n**Current Phase:** Detailed <design>\n\n\
         ## Critical Parameters\n\n| Parameter | Value | Source |\n|---|---|---|\n\
         | Flow | 12 L/s | DEC-001 |\n\n## System Status\n\n\
         | System | Status | Documentation |\n|---|---|---|\n\
         | impeller | Concept complete | docs/systems/impeller |\n",
    )
    .unwrap();

    project_cmd(&project)
        .arg("dashboard")
        .assert()
        .success()
        .stdout(predicate::str::contains("complete: 100%"));

    let html = std::fs::read_to_string(project.join("dashboard.html")).unwrap();
    assert!(html.contains("Detailed &lt;design&gt;"));
    assert!(html.contains("12 L/s"));
}

#[test]
fn dashboard_custom_output() {
    let dir = TempDir::new().unwrap();
    let project = init_project(&dir, "pump");
    let out = dir.path().join("status.html");
    project_cmd(&project)
        .args(["dashboard", "--output"])
        .arg(&out)
        .assert()
        .success();
    assert!(out.is_file());
    assert!(!project.join("dashboard.html").exists());
}

#[test]
fn dashboard_relative_output_lands_in_project_root() {
    let dir = TempDir::new().unwrap();
    let project = init_project(&dir, "valve");
    engkit(&dir)
        .arg("--root")
        .arg(&project)
        .args(["dashboard", "-o", "reports/status.html"])
        .assert()
        .success()
        .stdout(predicate::str::contains("reports/status.html"));
    assert!(project.join("reports/status.html").is_file());
    assert!(!dir.path().join("reports").exists());
}

// ---------------------------------------------------------------------------
// knowledge
// ---------------------------------------------------------------------------

#[test]
fn knowledge_index_and_query() {
    let dir = TempDir::new().unwrap();
    let project = init_project(&dir, "turbine");
    let reference = project.join("docs/reference");
    std::fs::write(
        reference.join("combustor-notes.md"),
        "# Combustor\n\nThe annular combustor liner uses effusion cooling holes \
         to keep wall temperature below 1100 K at full power.\n",
    )
    .unwrap();
    std::fs::write(
        reference.join("bearings.txt"),
        "Rolling element bearings on the shaft are oil lubricated.\n",
    )
    .unwrap();
    std::fs::write(reference.join("datasheet.pdf"), b"%PDF-1.4").unwrap();

    project_cmd(&project)
        .args(["knowledge", "index"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Indexed 2 documents"))
        .stdout(predicate::str::contains("datasheet.pdf"));

    project_cmd(&project)
        .args(["knowledge", "query", "liner cooling"])
        .assert()
        .success()
        .stdout(predicate::str::contains("combustor-notes.md"));

    project_cmd(&project)
        .args(["knowledge", "system", "combustor", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"file\": \"combustor-notes.md\""));
}

#[test]
fn knowledge_query_without_index_fails() {
    let dir = TempDir::new().unwrap();
    let project = init_project(&dir, "turbine");
    project_cmd(&project)
        .args(["knowledge", "query", "anything"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("engkit knowledge index"));
}

// ---------------------------------------------------------------------------
// hooks
// ---------------------------------------------------------------------------

#[test]
fn hook_bash_safety_blocks_root_delete() {
    let dir = TempDir::new().unwrap();
    let payload = serde_json::json!({
        "hook_event_name": "PreToolUse",
        "cwd": dir.path(),
        "tool_name": "Bash",
        "tool_input": { "command": "rm -rf /" }
    });
    let out = engkit(&dir)
        .args(["hook", "bash-safety"])
        .write_stdin(payload.to_string())
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0));
    let response: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(
        response["hookSpecificOutput"]["permissionDecision"],
        "deny"
    );
}

#[test]
fn hook_bash_safety_warns_on_force_push() {
    let dir = TempDir::new().unwrap();
    let payload = serde_json::json!({
        "hook_event_name": "PreToolUse",
        "cwd": dir.path(),
        "tool_name": "Bash",
        "tool_input": { "command": "git push --force origin main" }
    });
    engkit(&dir)
        .args(["hook", "bash-safety"])
        .write_stdin(payload.to_string())
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Warning"));
}

#[test]
fn hook_malformed_input_allows() {
    let dir = TempDir::new().unwrap();
    for name in [
        "context-update",
        "doc-before-design",
        "context-before-work",
        "bash-safety",
    ] {
        engkit(&dir)
            .args(["hook", name])
            .write_stdin("not json at all")
            .assert()
            .code(0)
            .stdout(predicate::str::is_empty());
    }
}

#[test]
fn hook_unknown_name_is_rejected() {
    let dir = TempDir::new().unwrap();
    engkit(&dir)
        .args(["hook", "no-such-hook"])
        .write_stdin("{}")
        .assert()
        .failure();
}

#[test]
fn hook_design_edit_blocked_without_understanding() {
    let dir = TempDir::new().unwrap();
    let project = init_project(&dir, "turbine");
    let target = project.join("design/combustor/liner.step");
    let payload = serde_json::json!({
        "hook_event_name": "PreToolUse",
        "cwd": project,
        "tool_name": "Write",
        "tool_input": { "file_path": target }
    });
    let out = engkit(&dir)
        .args(["hook", "doc-before-design"])
        .write_stdin(payload.to_string())
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0));
    let response: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let reason = response["hookSpecificOutput"]["permissionDecisionReason"]
        .as_str()
        .unwrap();
    assert!(reason.contains("combustor"));
}

#[test]
fn hook_design_prompt_blocked_on_template_context() {
    let dir = TempDir::new().unwrap();
    let project = init_project(&dir, "turbine");
    let payload = serde_json::json!({
        "hook_event_name": "UserPromptSubmit",
        "cwd": project,
        "prompt": "Size the combustor liner for the new operating point"
    });
    let out = engkit(&dir)
        .args(["hook", "context-before-work"])
        .write_stdin(payload.to_string())
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0));
    let response: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(response["decision"], "block");
}

#[test]
fn hook_stop_allows_fresh_context() {
    let dir = TempDir::new().unwrap();
    let project = init_project(&dir, "turbine");
    let payload = serde_json::json!({
        "hook_event_name": "Stop",
        "cwd": project,
        "session_id": "abc"
    });
    engkit(&dir)
        .args(["hook", "context-update"])
        .write_stdin(payload.to_string())
        .assert()
        .code(0)
        .stdout(predicate::str::is_empty());
}
