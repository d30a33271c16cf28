// CLI integration tests for platform naming and library resolution.
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_partition-link");
    let mut command = Command::new(exe);
    for key in [
        "PARTITION_LINK_BASE_NAME",
        "PARTITION_LINK_LIBRARY_PATH",
        "PARTITION_LINK_RESOURCE_DIR",
        "PARTITION_LINK_OS_NAME",
        "RUST_LOG",
    ] {
        command.env_remove(key);
    }
    command
}

fn parse_json(value: &str) -> Value {
    serde_json::from_str(value).expect("valid json")
}

fn stdout_json(output: &Output) -> Value {
    let text = String::from_utf8_lossy(&output.stdout);
    parse_json(text.lines().next().expect("json line"))
}

fn stderr_json(output: &Output) -> Value {
    let text = String::from_utf8_lossy(&output.stderr);
    parse_json(text.lines().last().expect("json line"))
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("utf8 path")
}

#[test]
fn platform_reports_suffix_for_each_os_family() {
    let cases = [
        ("Windows 10", "foo.dll", "windows"),
        ("Mac OS X", "foo.dylib", "apple"),
        ("Linux", "foo.so", "other"),
    ];
    for (os_name, key, platform) in cases {
        let output = cmd()
            .args(["platform", "--os-name", os_name, "--base-name", "foo"])
            .output()
            .expect("platform");
        assert!(output.status.success());
        let json = stdout_json(&output);
        assert_eq!(json["resource_key"], key);
        assert_eq!(json["platform"], platform);
        assert_eq!(json["base_name"], "foo");
    }
}

#[test]
fn platform_reads_environment_defaults() {
    let output = cmd()
        .args(["platform"])
        .env("PARTITION_LINK_BASE_NAME", "libenv")
        .env("PARTITION_LINK_OS_NAME", "windows server")
        .output()
        .expect("platform");
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["resource_key"], "libenv.dll");
}

#[test]
fn resolve_without_library_fails_with_library_load() {
    let temp = tempfile::tempdir().expect("tempdir");
    let lib_dir = temp.path().join("lib");
    let bundle_dir = temp.path().join("bundle");
    std::fs::create_dir_all(&lib_dir).expect("mkdir");
    std::fs::create_dir_all(&bundle_dir).expect("mkdir");

    let output = cmd()
        .args([
            "resolve",
            "--base-name",
            "libpartition_link_missing",
            "--library-dir",
            path_arg(&lib_dir),
            "--resource-dir",
            path_arg(&bundle_dir),
        ])
        .output()
        .expect("resolve");

    assert_eq!(output.status.code(), Some(4));
    assert!(output.stdout.is_empty());
    let err = stderr_json(&output);
    assert_eq!(err["error"]["kind"], "LibraryLoad");
    let message = err["error"]["message"].as_str().expect("message");
    assert!(message.contains("libpartition_link_missing"));
    assert!(message.contains("search-path"));
    assert!(message.contains("embedded-resource"));
    assert!(err["error"]["hint"].as_str().is_some());
}

#[test]
fn resolve_with_corrupt_bundle_reports_extraction_cause() {
    let temp = tempfile::tempdir().expect("tempdir");
    let bundle_dir = temp.path().join("bundle");
    std::fs::create_dir_all(&bundle_dir).expect("mkdir");
    std::fs::write(bundle_dir.join("libcorrupt.so"), b"definitely not a library").expect("write");

    let output = cmd()
        .args([
            "resolve",
            "--os-name",
            "Linux",
            "--base-name",
            "libcorrupt",
            "--resource-dir",
            path_arg(&bundle_dir),
        ])
        .output()
        .expect("resolve");

    assert_eq!(output.status.code(), Some(4));
    let err = stderr_json(&output);
    assert_eq!(err["error"]["kind"], "LibraryLoad");
    let causes = err["error"]["causes"].as_array().expect("causes");
    assert!(
        causes
            .iter()
            .any(|cause| cause.as_str().unwrap_or("").starts_with("ResourceExtraction"))
    );
}

#[test]
fn unknown_subcommand_is_usage_error() {
    let output = cmd().args(["frobnicate"]).output().expect("run");
    assert_eq!(output.status.code(), Some(2));
    let err = stderr_json(&output);
    assert_eq!(err["error"]["kind"], "Usage");
}

/// A shared object already mapped into this test process, safe to load a second copy of.
#[cfg(target_os = "linux")]
fn mapped_shared_object(name_prefix: &str) -> Option<PathBuf> {
    let maps = std::fs::read_to_string("/proc/self/maps").ok()?;
    maps.lines()
        .filter_map(|line| line.split_whitespace().nth(5))
        .map(PathBuf::from)
        .find(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(name_prefix))
        })
}

#[cfg(target_os = "linux")]
#[test]
fn resolve_extracts_bundled_library_when_search_path_misses() {
    let Some(real_lib) = mapped_shared_object("libgcc_s.so") else {
        return;
    };
    let temp = tempfile::tempdir().expect("tempdir");
    let bundle_dir = temp.path().join("bundle");
    std::fs::create_dir_all(&bundle_dir).expect("mkdir");
    std::fs::copy(&real_lib, bundle_dir.join("libbundled_demo.so")).expect("copy");

    let output = cmd()
        .args([
            "resolve",
            "--os-name",
            "Linux",
            "--base-name",
            "libbundled_demo",
            "--resource-dir",
            path_arg(&bundle_dir),
        ])
        .output()
        .expect("resolve");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let json = stdout_json(&output);
    assert_eq!(json["loaded"], true);
    assert_eq!(json["origin"], "embedded-resource");
    assert_eq!(json["attempts"][0]["strategy"], "search-path");
    assert_eq!(json["attempts"][0]["outcome"], "failed");
    assert_eq!(json["attempts"][1]["outcome"], "loaded");

    let extracted = PathBuf::from(json["path"].as_str().expect("path"));
    let name = extracted.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("libbundled_demo"));
    assert!(name.ends_with(".so"));
    // Deleted by the exit hook once the CLI process ends.
    assert!(!extracted.exists());
}
