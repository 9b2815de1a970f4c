use assert_cmd::Command;
use predicates::str::contains;

const SAMPLE: &str = r#"{
    "Title": "Soil moisture campaign 2021",
    "Description": "Hourly soil moisture readings.",
    "Creator": [{"Name": {"Given_Name": "Ada", "Family_Name": "Vermeer"}, "Affiliation": ["VU"]}],
    "Data_Access_Restriction": "Open - freely retrievable",
    "Retention_Period": 10
}"#;

fn cmd() -> Command {
    Command::cargo_bin("readymeta").unwrap()
}

#[test]
fn converts_the_given_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("dataset.json");
    std::fs::write(&input, SAMPLE).unwrap();

    cmd()
        .arg(&input)
        .assert()
        .success()
        .stdout(contains("dataset.pdf"))
        .stdout(contains("dataset.md"))
        .stdout(contains("warnings were generated"));

    let pdf = std::fs::read(dir.path().join("dataset.pdf")).unwrap();
    assert!(pdf.starts_with(b"%PDF-"));
    let markdown = std::fs::read_to_string(dir.path().join("dataset.md")).unwrap();
    assert!(markdown.contains("- Creator: Ada Vermeer"));
}

#[test]
fn falls_back_to_the_default_file_name() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("yoda-metadata.json"), SAMPLE).unwrap();

    cmd()
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(contains("Filename argument not provided, using default: yoda-metadata.json"));

    assert!(dir.path().join("yoda-metadata.pdf").exists());
    assert!(dir.path().join("yoda-metadata.md").exists());
}

#[test]
fn missing_input_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();

    cmd()
        .arg(dir.path().join("absent.json"))
        .assert()
        .failure()
        .stderr(contains("failed to convert"));

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn malformed_json_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.json");
    std::fs::write(&input, "{\"Title\": [").unwrap();

    cmd()
        .arg(&input)
        .assert()
        .failure()
        .stderr(contains("metadata decode error"));

    assert!(!dir.path().join("broken.pdf").exists());
}

#[test]
fn optional_outputs_follow_flags() {
    let dir = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let input = dir.path().join("dataset.json");
    std::fs::write(&input, SAMPLE).unwrap();

    cmd()
        .arg(&input)
        .arg("--output-dir")
        .arg(out.path())
        .args(["--no-markdown", "--normalized-json"])
        .assert()
        .success()
        .stdout(contains("dataset.normalized.json"));

    assert!(out.path().join("dataset.pdf").exists());
    assert!(!out.path().join("dataset.md").exists());
    let normalized = std::fs::read_to_string(out.path().join("dataset.normalized.json")).unwrap();
    assert!(normalized.contains("\"Title\": \"Soil moisture campaign 2021\""));
    assert!(!normalized.contains("Remarks"));
}
