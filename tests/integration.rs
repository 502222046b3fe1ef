/// Integration test suite for the `watch-node-modules` binary.
///
/// All tests invoke the compiled binary via subprocess. `CARGO_BIN_EXE_watch-node-modules`
/// is set by Cargo during `cargo test` to point to the binary for the current profile.
///
/// The `watch` subcommand blocks until Ctrl-C, so it is covered through the library in
/// `tests/scenarios.rs` rather than here.
use std::path::{Path, PathBuf};
use std::process::Command;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_watch-node-modules"))
}

/// Run a command and assert it exits successfully.
/// Returns stdout as a String.
fn run_success(args: &[&str]) -> String {
    let out = Command::new(binary())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to invoke watch-node-modules binary");
    let stdout = String::from_utf8_lossy(&out.stdout).to_string();
    let stderr = String::from_utf8_lossy(&out.stderr).to_string();
    assert!(
        out.status.success(),
        "command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
        args,
        out.status,
        stdout,
        stderr
    );
    stdout
}

/// Run a command and assert it exits with a non-zero status.
/// Returns (stdout, stderr) as Strings.
fn run_failure(args: &[&str]) -> (String, String) {
    let out = Command::new(binary())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to invoke watch-node-modules binary");
    let stdout = String::from_utf8_lossy(&out.stdout).to_string();
    let stderr = String::from_utf8_lossy(&out.stderr).to_string();
    assert!(
        !out.status.success(),
        "command {:?} expected to fail but exited successfully\nstdout: {}\nstderr: {}",
        args,
        stdout,
        stderr
    );
    (stdout, stderr)
}

fn install(root: &Path, package: &str) -> PathBuf {
    let dir = root.join("node_modules").join(package);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("package.json"), format!(r#"{{"name":"{package}"}}"#)).unwrap();
    std::fs::write(dir.join("index.js"), "module.exports = 1;\n").unwrap();
    dir
}

// ---------------------------------------------------------------------------
// resolve
// ---------------------------------------------------------------------------

/// test_resolve_lists_install_directory: text output names the target and its root.
#[test]
fn test_resolve_lists_install_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = install(tmp.path(), "left-pad");
    let cwd = tmp.path().to_str().unwrap();

    let stdout = run_success(&["resolve", "left-pad", "--cwd", cwd]);
    assert!(stdout.contains("left-pad"), "stdout: {}", stdout);
    assert!(
        stdout.contains(&dir.display().to_string()),
        "root missing from output\nstdout: {}",
        stdout
    );
}

/// test_resolve_json_output: --json yields an array of {target, roots}.
#[test]
fn test_resolve_json_output() {
    let tmp = tempfile::tempdir().unwrap();
    install(tmp.path(), "@scope/pkg");
    let cwd = tmp.path().to_str().unwrap();

    let stdout = run_success(&["resolve", "@scope/pkg", "missing", "--cwd", cwd, "--json"]);
    let parsed: serde_json::Value =
        serde_json::from_str(&stdout).expect("resolve --json output is not valid JSON");
    let entries = parsed.as_array().expect("expected a JSON array");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["target"], "@scope/pkg");
    assert_eq!(entries[0]["roots"].as_array().unwrap().len(), 1);
    assert_eq!(entries[1]["target"], "missing");
    assert!(entries[1]["roots"].as_array().unwrap().is_empty());
}

/// test_resolve_missing_package_is_not_an_error: discovery gaps are reported, not fatal.
#[test]
fn test_resolve_missing_package_is_not_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let cwd = tmp.path().to_str().unwrap();
    let stdout = run_success(&["resolve", "nowhere", "--cwd", cwd]);
    assert!(stdout.contains("(not found)"), "stdout: {}", stdout);
}

/// test_resolve_requires_packages: clap rejects an empty package list.
#[test]
fn test_resolve_requires_packages() {
    let (_, stderr) = run_failure(&["resolve"]);
    assert!(!stderr.is_empty());
}

// ---------------------------------------------------------------------------
// inspect
// ---------------------------------------------------------------------------

/// test_inspect_json_fragments: scoped package fragment uses the cache-key form.
#[test]
fn test_inspect_json_fragments() {
    let tmp = tempfile::tempdir().unwrap();
    let cwd = tmp.path().to_str().unwrap();

    let stdout = run_success(&[
        "inspect",
        "node_modules/@scope/pkg/dist/x.js",
        "--cwd",
        cwd,
        "--json",
    ]);
    let parsed: serde_json::Value =
        serde_json::from_str(&stdout).expect("inspect --json output is not valid JSON");
    assert_eq!(parsed["package_fragment"], "@scope_pkg");
    assert_eq!(parsed["file_fragment"], "x.js");
    let absolute = parsed["absolute"].as_str().unwrap();
    assert!(absolute.starts_with(cwd), "absolute: {}", absolute);
}

/// test_inspect_text_output: text mode prints every slot.
#[test]
fn test_inspect_text_output() {
    let tmp = tempfile::tempdir().unwrap();
    let cwd = tmp.path().to_str().unwrap();

    let stdout = run_success(&["inspect", "src/app.js", "--cwd", cwd]);
    assert!(stdout.contains("absolute:"));
    assert!(stdout.contains("resolved (/):"));
    assert!(stdout.contains("package fragment: -"));
    assert!(stdout.contains("file fragment:    app.js"));
}

// ---------------------------------------------------------------------------
// watch
// ---------------------------------------------------------------------------

/// test_watch_without_packages_fails: no CLI packages and no config file.
#[test]
fn test_watch_without_packages_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let cwd = tmp.path().to_str().unwrap();
    let (_, stderr) = run_failure(&["watch", "--cwd", cwd]);
    assert!(stderr.contains("no packages to watch"), "stderr: {}", stderr);
}

/// test_watch_with_nothing_installed_fails: every target unresolved means nothing to watch.
#[test]
fn test_watch_with_nothing_installed_fails() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(
        tmp.path().join("watch-node-modules.toml"),
        "packages = [\"left-pad\"]\n",
    )
    .unwrap();
    let cwd = tmp.path().to_str().unwrap();
    let (_, stderr) = run_failure(&["watch", "--cwd", cwd]);
    assert!(stderr.contains("nothing to watch"), "stderr: {}", stderr);
}
