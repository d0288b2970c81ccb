// End-to-end tests: run the `oxldut` binary against a mock catalog.
//
// Run with: cargo test -p drivercore-cli --test run_tests -- --nocapture

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use httpmock::prelude::*;
use serde_json::{json, Value};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

/// Command isolated from the user's config dir and environment.
fn oxldut(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_oxldut"));
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("OXLDUT_ENDPOINT")
        .env_remove("OXLDUT_LOG")
        .env_remove("RUST_LOG");
    cmd
}

fn run(home: &Path, args: &[&str]) -> Output {
    oxldut(home).args(args).output().expect("spawn oxldut")
}

fn code(output: &Output) -> i32 {
    output.status.code().expect("exit code")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn json_stdout(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim())
        .unwrap_or_else(|e| panic!("stdout must be one JSON value: {e}\nstdout:\n{stdout}"))
}

fn record(id: i64, uid: &str, releases: &[&str]) -> Value {
    let parts: Vec<&str> = uid.split("::").collect();
    json!({
        "id": id,
        "uid": uid,
        "oem": parts[0],
        "make": parts[1],
        "model": parts[2],
        "lastUpdated": "2022-01-01T00:00:00",
        "supportedWinRelease": releases,
    })
}

// ===========================================================================
// Create / update / skip
// ===========================================================================

#[test]
fn release_flag_feed_creates_new_models() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    let lookups = server.mock(|when, then| {
        when.method(GET).path_includes("/api/DriverCore/uid/");
        then.status(200).json_body(json!([]));
    });
    let creates = server.mock(|when, then| {
        when.method(POST).path("/api/DriverCore");
        then.status(201).json_body(json!({ "id": 500 }));
    });

    let csv = fixture("hp-release-flags.csv");
    let output = run(
        home.path(),
        &["--csv", csv.to_str().unwrap(), "--oem", "HP", "--endpoint", &server.base_url(), "--json"],
    );

    assert_eq!(code(&output), 0, "stderr: {}", stderr(&output));
    lookups.assert_calls(3);
    creates.assert_calls(3);

    let report = json_stdout(&output);
    assert_eq!(report["summary"]["rows_read"], 4);
    assert_eq!(report["summary"]["created"], 3);
    assert_eq!(report["summary"]["no_release"], 1);
    assert_eq!(report["meta"]["oem"], "HP");

    let uids: Vec<&str> = report["outcomes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["uid"].as_str().unwrap())
        .collect();
    assert_eq!(
        uids,
        vec![
            "HP::EliteBook::840_G8",
            "HP::ProBook::450_G9_15in",
            "HP::Compaq::6910p",
            "HP::ZBook::Firefly_14",
        ]
    );
    assert_eq!(report["outcomes"][0]["outcome"], "created");
    assert_eq!(report["outcomes"][0]["id"], 500);
    assert_eq!(report["outcomes"][2]["releases"], json!(["Windows 7"]));
    assert!(stderr(&output).contains("created  HP::EliteBook::840_G8"));
}

#[test]
fn existing_model_is_merged() {
    let home = tempfile::tempdir().unwrap();
    let csv = home.path().join("hp.csv");
    std::fs::write(&csv, "HP,EliteBook,840 G8,No,No,No,Yes\n").unwrap();

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/DriverCore/uid/HP::EliteBook::840_G8");
        then.status(200)
            .json_body(json!([record(42, "HP::EliteBook::840_G8", &["Windows 10"])]));
    });
    let update = server.mock(|when, then| {
        when.method(PUT).path("/api/DriverCore/42");
        then.status(204);
    });
    let create = server.mock(|when, then| {
        when.method(POST).path("/api/DriverCore");
        then.status(201);
    });

    let output = run(
        home.path(),
        &["--csv", csv.to_str().unwrap(), "--oem", "HP", "--endpoint", &server.base_url(), "--json"],
    );

    assert_eq!(code(&output), 0, "stderr: {}", stderr(&output));
    update.assert();
    create.assert_calls(0);

    let report = json_stdout(&output);
    let outcome = &report["outcomes"][0];
    assert_eq!(outcome["outcome"], "updated");
    assert_eq!(outcome["id"], 42);
    assert_eq!(outcome["releases"], json!(["Windows 10", "Windows 11"]));
}

#[test]
fn duplicate_uid_is_skipped_and_strict_exit_reports_it() {
    let home = tempfile::tempdir().unwrap();
    let csv = home.path().join("hp.csv");
    std::fs::write(&csv, "HP,EliteBook,840 G8,No,No,Yes,No\n").unwrap();

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/DriverCore/uid/HP::EliteBook::840_G8");
        then.status(200).json_body(json!([
            record(3, "HP::EliteBook::840_G8", &["Windows 10"]),
            record(9, "HP::EliteBook::840_G8", &["Windows 11"]),
        ]));
    });
    let create = server.mock(|when, then| {
        when.method(POST).path("/api/DriverCore");
        then.status(201);
    });
    let update = server.mock(|when, then| {
        when.method(PUT).path_includes("/api/DriverCore/");
        then.status(204);
    });

    let base = server.base_url();
    let args = ["--csv", csv.to_str().unwrap(), "--oem", "HP", "--endpoint", base.as_str()];

    let lenient = run(home.path(), &args);
    assert_eq!(code(&lenient), 0);
    assert!(stderr(&lenient).contains("2 catalog records share this uid"));

    let mut strict_args = args.to_vec();
    strict_args.push("--strict-exit");
    let strict = run(home.path(), &strict_args);
    assert_eq!(code(&strict), 1);

    create.assert_calls(0);
    update.assert_calls(0);
}

#[test]
fn dated_feed_uses_path_release_and_row_date() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/DriverCore/uid/Dell::OptiPlex::7090_Tower");
        then.status(404);
    });
    let create = server.mock(|when, then| {
        when.method(POST).path("/api/DriverCore").json_body(json!({
            "id": 0,
            "uid": "Dell::OptiPlex::7090_Tower",
            "oem": "Dell",
            "make": "OptiPlex",
            "model": "7090 Tower",
            "lastUpdated": "2023-03-15T00:00:00Z",
            "supportedWinRelease": ["Windows 10"],
        }));
        then.status(201).json_body(record(7, "Dell::OptiPlex::7090_Tower", &["Windows 10"]));
    });

    let csv = fixture("dell-win10.csv");
    let output = run(
        home.path(),
        &["--csv", csv.to_str().unwrap(), "--oem", "Dell", "--endpoint", &server.base_url()],
    );

    assert_eq!(code(&output), 0, "stderr: {}", stderr(&output));
    create.assert();
}

#[test]
fn xml_feed_maps_builds_to_releases() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path_includes("/api/DriverCore/uid/Microsoft::Surface::");
        then.status(200).json_body(json!([]));
    });
    let create = server.mock(|when, then| {
        when.method(POST).path("/api/DriverCore");
        then.status(201);
    });

    let xml = fixture("surface.xml");
    let output = run(
        home.path(),
        &["--xml", xml.to_str().unwrap(), "--oem", "Microsoft", "--endpoint", &server.base_url(), "--json"],
    );

    assert_eq!(code(&output), 0, "stderr: {}", stderr(&output));
    create.assert_calls(2);

    let report = json_stdout(&output);
    let outcomes = report["outcomes"].as_array().unwrap();
    assert_eq!(outcomes[0]["uid"], "Microsoft::Surface::Surface_Laptop_4");
    assert_eq!(outcomes[0]["releases"], json!(["Windows 10", "Windows 11"]));
    // "22H2" maps to nothing; no path hint, so the newest release
    assert_eq!(outcomes[1]["releases"], json!(["Windows 11"]));
    assert!(outcomes[1].get("id").is_none());
}

// ===========================================================================
// Malformed rows
// ===========================================================================

fn mock_empty_catalog(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(GET).path_includes("/api/DriverCore/uid/");
        then.status(200).json_body(json!([]));
    });
    server.mock(|when, then| {
        when.method(POST).path("/api/DriverCore");
        then.status(201);
    })
}

#[test]
fn short_row_skipped_by_default() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    let create = mock_empty_catalog(&server);

    let csv = fixture("lenovo-short-row.csv");
    let output = run(
        home.path(),
        &["--csv", csv.to_str().unwrap(), "--oem", "Lenovo", "--endpoint", &server.base_url(), "--json"],
    );

    assert_eq!(code(&output), 0, "stderr: {}", stderr(&output));
    create.assert_calls(3);
    let report = json_stdout(&output);
    assert_eq!(report["summary"]["malformed"], 1);
    assert!(report.get("aborted").is_none());
}

#[test]
fn short_row_aborts_under_abort_policy() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    let create = mock_empty_catalog(&server);

    let csv = fixture("lenovo-short-row.csv");
    let output = run(
        home.path(),
        &[
            "--csv", csv.to_str().unwrap(),
            "--oem", "Lenovo",
            "--endpoint", &server.base_url(),
            "--on-malformed", "abort",
            "--json",
        ],
    );

    assert_eq!(code(&output), 4, "stderr: {}", stderr(&output));
    // Both releases of the first row landed before the bad row.
    create.assert_calls(2);
    let report = json_stdout(&output);
    assert!(report["aborted"].as_str().unwrap().contains("row 3"));
    assert!(stderr(&output).contains("run aborted"));
}

#[test]
fn abort_policy_from_config_file() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    mock_empty_catalog(&server);

    let config = home.path().join("run.toml");
    std::fs::write(
        &config,
        format!("[catalog]\nendpoint = \"{}\"\n\n[ingest]\non_malformed = \"abort\"\n", server.base_url()),
    )
    .unwrap();

    let csv = fixture("lenovo-short-row.csv");
    let output = run(
        home.path(),
        &["--csv", csv.to_str().unwrap(), "--oem", "Lenovo", "--config", config.to_str().unwrap()],
    );
    assert_eq!(code(&output), 4, "stderr: {}", stderr(&output));
}

// ===========================================================================
// Remote failures
// ===========================================================================

#[test]
fn unreachable_catalog_records_failures_and_continues() {
    let home = tempfile::tempdir().unwrap();
    let csv = fixture("hp-release-flags.csv");
    let args = ["--csv", csv.to_str().unwrap(), "--oem", "HP", "--endpoint", "http://127.0.0.1:9", "--json"];

    let output = run(home.path(), &args);
    assert_eq!(code(&output), 0, "stderr: {}", stderr(&output));
    let report = json_stdout(&output);
    assert_eq!(report["summary"]["failed"], 3);
    assert_eq!(report["outcomes"][0]["stage"], "lookup");
    assert_eq!(report["outcomes"][0]["payload"]["uid"], "HP::EliteBook::840_G8");

    let mut strict = args.to_vec();
    strict.push("--strict-exit");
    assert_eq!(code(&run(home.path(), &strict)), 1);
}

#[test]
fn output_file_written() {
    let home = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    mock_empty_catalog(&server);

    let out = home.path().join("report.json");
    let csv = fixture("dell-win10.csv");
    let output = run(
        home.path(),
        &[
            "--csv", csv.to_str().unwrap(),
            "--oem", "Dell",
            "--endpoint", &server.base_url(),
            "--output", out.to_str().unwrap(),
            "--quiet",
        ],
    );

    assert_eq!(code(&output), 0, "stderr: {}", stderr(&output));
    assert!(output.stdout.is_empty());
    let written: Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written["summary"]["created"], 1);
    assert_eq!(written["meta"]["inferred_release"], "Windows 10");
}

// ===========================================================================
// Usage, input and config errors
// ===========================================================================

#[test]
fn csv_and_xml_together_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["--csv", "a.csv", "--xml", "b.xml", "--oem", "HP"]);
    assert_eq!(code(&output), 2);
}

#[test]
fn missing_input_flag_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    assert_eq!(code(&run(home.path(), &["--oem", "HP"])), 2);
}

#[test]
fn missing_oem_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    let csv = fixture("dell-win10.csv");
    assert_eq!(code(&run(home.path(), &["--csv", csv.to_str().unwrap()])), 2);
    assert_eq!(code(&run(home.path(), &["--csv", csv.to_str().unwrap(), "--oem", " "])), 2);
}

#[test]
fn layout_requires_csv() {
    let home = tempfile::tempdir().unwrap();
    let xml = fixture("surface.xml");
    let output = run(home.path(), &["--xml", xml.to_str().unwrap(), "--oem", "Microsoft", "--layout", "dated"]);
    assert_eq!(code(&output), 2);
}

#[test]
fn missing_input_file_exits_3() {
    let home = tempfile::tempdir().unwrap();
    let missing = home.path().join("nope.csv");
    let output = run(home.path(), &["--csv", missing.to_str().unwrap(), "--oem", "HP"]);
    assert_eq!(code(&output), 3);
    assert!(stderr(&output).contains("input file not found"));
}

#[test]
fn invalid_config_exits_5() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("bad.toml");
    std::fs::write(&config, "[catalog]\ntimeout_secs = 0\n").unwrap();
    let csv = fixture("dell-win10.csv");

    let output = run(
        home.path(),
        &["--csv", csv.to_str().unwrap(), "--oem", "Dell", "--config", config.to_str().unwrap()],
    );
    assert_eq!(code(&output), 5);
    assert!(stderr(&output).contains("timeout_secs"));
}

#[test]
fn version_flag() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["--version"]);
    assert_eq!(code(&output), 0);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}
