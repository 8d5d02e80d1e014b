//! End-to-end tests for the hive binary
//!
//! Every test runs the binary against its own temporary config, cache and
//! project directories.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn hive(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hive"))
        .args(args)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_CACHE_HOME", home.join("cache"))
        .env("HIVE_PROJECT_CONFIG_DIR", home.join("project"))
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run hive")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn config_show_uses_isolated_defaults() {
    let home = TempDir::new().unwrap();
    let output = hive(home.path(), &["config", "show"]);

    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("[git]"));
    assert!(stdout.contains("program = \"git\""));
    assert!(stdout.contains(&home.path().join("cache").display().to_string()));
}

#[test]
fn config_paths_lists_effective_locations() {
    let home = TempDir::new().unwrap();
    std::fs::create_dir_all(home.path().join("project")).unwrap();
    std::fs::write(
        home.path().join("project/config.toml"),
        "[paths]\nreferences_file = \"/srv/hive/refs.json\"\n",
    )
    .unwrap();

    let output = hive(home.path(), &["config", "paths"]);
    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("References file"));
    assert!(stdout.contains("/srv/hive/refs.json"));
    assert!(stdout.contains(&home.path().join("cache/hive/packages").display().to_string()));
    assert!(stdout.contains("present"));
}

#[test]
fn project_config_overrides_defaults() {
    let home = TempDir::new().unwrap();
    std::fs::create_dir_all(home.path().join("project")).unwrap();
    std::fs::write(
        home.path().join("project/config.toml"),
        "[git]\nprogram = \"my-git\"\n",
    )
    .unwrap();

    let output = hive(home.path(), &["config", "show"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("program = \"my-git\""));
}

#[test]
fn reference_lifecycle() {
    let home = TempDir::new().unwrap();

    let output = hive(home.path(), &["refs", "list"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("No package references"));

    let output = hive(
        home.path(),
        &["refs", "add", "--provider", "local", "-c", "path=/ext", "-c", "version=v1"],
    );
    assert!(output.status.success());
    let id = stdout(&output).trim().to_string();
    assert_eq!(id.len(), 36);

    let output = hive(home.path(), &["refs", "show", &id]);
    assert!(output.status.success());
    let shown = stdout(&output);
    assert!(shown.contains("local"));
    assert!(shown.contains("path = /ext"));

    let output = hive(
        home.path(),
        &["refs", "update", &id, "--provider", "local", "-c", "path=/other"],
    );
    assert!(output.status.success());
    assert!(stdout(&hive(home.path(), &["refs", "show", &id])).contains("path = /other"));

    let output = hive(home.path(), &["refs", "remove", &id]);
    assert!(output.status.success());

    let output = hive(home.path(), &["refs", "show", &id]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
}

#[test]
fn local_versions_are_listed() {
    let home = TempDir::new().unwrap();
    let packages = TempDir::new().unwrap();
    std::fs::create_dir(packages.path().join("v0.1.0")).unwrap();
    std::fs::create_dir(packages.path().join("v0.2.0")).unwrap();

    let path = format!("path={}", packages.path().display());
    let output = hive(home.path(), &["refs", "add", "--provider", "local", "-c", &path]);
    let id = stdout(&output).trim().to_string();

    let output = hive(home.path(), &["refs", "versions", &id]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "v0.2.0\nv0.1.0\n");
}

#[test]
fn run_builtin_host_info() {
    let home = TempDir::new().unwrap();
    let output = hive(home.path(), &["run", "hive.HostInfo"]);

    assert!(output.status.success());
    assert!(stdout(&output).starts_with("hive "));
}

#[test]
fn load_reports_broken_packages_and_keeps_builtin() {
    let home = TempDir::new().unwrap();
    let packages = TempDir::new().unwrap();
    let version = packages.path().join("v1");
    std::fs::create_dir_all(&version).unwrap();
    std::fs::write(
        version.join("build.sh"),
        "touch \"$1/libbroken.so\" \"$1/broken.dylib\" \"$1/broken.dll\"\n\
         echo 'name = \"broken\"' > \"$1/broken.extension.toml\"\n",
    )
    .unwrap();

    let path = format!("path={}", packages.path().display());
    let output = hive(
        home.path(),
        &[
            "refs",
            "add",
            "--provider",
            "local",
            "-c",
            &path,
            "-c",
            "version=v1",
            "-c",
            "entrypoint=build.sh",
        ],
    );
    assert!(output.status.success());

    let output = hive(home.path(), &["load"]);
    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("hive.HostInfo"));
    assert!(stdout.contains("1 package(s) failed to load"));
}
