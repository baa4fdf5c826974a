use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

fn temp_workspace() -> TempDir {
    tempfile::tempdir().expect("create tempdir")
}

fn write_input(workspace: &TempDir, text: &str) -> String {
    let path = workspace.path().join("input.txt");
    fs::write(&path, text).expect("write input");
    path.to_str().expect("utf-8 path").to_string()
}

fn count(input: &str, workers: &str) -> (String, String) {
    let output = Command::cargo_bin("wordfreq")
        .expect("binary exists")
        .args(["--no-progress", input, workers])
        .assert()
        .success()
        .get_output()
        .clone();
    (
        String::from_utf8(output.stdout).expect("stdout is UTF-8"),
        String::from_utf8(output.stderr).expect("stderr is UTF-8"),
    )
}

#[test]
fn mixed_case_words_are_merged() {
    let workspace = temp_workspace();
    let input = write_input(&workspace, "Ab, ab AB.");
    let (stdout, stderr) = count(&input, "1");
    assert_eq!(stdout, "ab=3\n");
    assert!(stderr.contains("real number of workers is 1"));
    assert!(stderr.contains("found 3 words"));
}

#[test]
fn report_does_not_depend_on_worker_count() {
    let workspace = temp_workspace();
    let text = "The quick brown fox jumps over the lazy dog. The dog sleeps; the fox runs!\n"
        .repeat(50);
    let input = write_input(&workspace, &text);
    let (baseline, _) = count(&input, "1");
    assert!(baseline.starts_with("brown=50\ndog=100\n"));
    for workers in ["2", "3", "7", "16"] {
        let (stdout, _) = count(&input, workers);
        assert_eq!(stdout, baseline, "workers={workers}");
    }
}

#[test]
fn empty_file_prints_nothing() {
    let workspace = temp_workspace();
    let input = write_input(&workspace, "");
    let (stdout, stderr) = count(&input, "4");
    assert_eq!(stdout, "");
    assert!(stderr.contains("found 0 words"));
}

#[test]
fn tiny_file_reduces_workers() {
    let workspace = temp_workspace();
    let input = write_input(&workspace, "one two six");
    let (stdout, stderr) = count(&input, "10");
    assert_eq!(stdout, "one=1\nsix=1\ntwo=1\n");
    assert!(stderr.contains("reducing to"));
    assert!(stderr.contains("found 3 words"));
}

#[test]
fn thread_cap_and_metrics_file() {
    let workspace = temp_workspace();
    let input = write_input(&workspace, "cat cats dog cat cats dog cat");
    let metrics_path = workspace.path().join("metrics.json");
    let output = Command::cargo_bin("wordfreq")
        .expect("binary exists")
        .args([
            "--no-progress",
            "--quiet",
            "--threads",
            "0",
            "--metrics",
            metrics_path.to_str().unwrap(),
            &input,
            "3",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(
        String::from_utf8(output).unwrap(),
        "cat=3\ncats=2\ndog=2\n"
    );

    let metrics: Value =
        serde_json::from_slice(&fs::read(&metrics_path).expect("metrics written"))
            .expect("metrics are JSON");
    assert_eq!(metrics["total_words"], 7);
    assert_eq!(metrics["requested_workers"], 3);
    let chunks = metrics["chunks"].as_array().expect("chunks array");
    assert!(!chunks.is_empty());
    assert!(chunks.iter().all(|chunk| chunk["execution"] == "Fallback"));
}

#[test]
fn huge_worker_counts_are_bounded_by_input() {
    let workspace = temp_workspace();
    let input = write_input(&workspace, "a b c");
    for workers in ["100000000000", "18446744073709551615"] {
        let (stdout, stderr) = count(&input, workers);
        assert_eq!(stdout, "a=1\nb=1\nc=1\n", "workers={workers}");
        assert!(stderr.contains("found 3 words"));
    }
}

#[test]
fn usage_errors_exit_with_one() {
    let workspace = temp_workspace();
    let input = write_input(&workspace, "words");
    let cases: Vec<Vec<&str>> = vec![
        vec![],
        vec![input.as_str()],
        vec![input.as_str(), "many"],
        vec![input.as_str(), "0"],
        vec![input.as_str(), "2", "extra"],
    ];
    for args in cases {
        Command::cargo_bin("wordfreq")
            .expect("binary exists")
            .args(&args)
            .assert()
            .code(1);
    }
}

#[test]
fn unreadable_file_exits_with_one() {
    let workspace = temp_workspace();
    let missing = workspace.path().join("missing.txt");
    let output = Command::cargo_bin("wordfreq")
        .expect("binary exists")
        .args(["--no-progress", missing.to_str().unwrap(), "2"])
        .assert()
        .code(1)
        .get_output()
        .clone();
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("failed to count words"));
}

#[test]
fn failed_count_with_spinner_still_exits_with_one() {
    let workspace = temp_workspace();
    let missing = workspace.path().join("missing.txt");
    let output = Command::cargo_bin("wordfreq")
        .expect("binary exists")
        .args([missing.to_str().unwrap(), "2"])
        .assert()
        .code(1)
        .get_output()
        .clone();
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("failed to count words"));
    assert!(!stderr.contains("counting words..."));
}
