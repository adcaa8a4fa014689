use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

fn recon() -> Command {
    Command::cargo_bin("recon").unwrap()
}

#[test]
fn test_help_lists_commands() {
    recon()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("index"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_missing_ledger_fails() {
    let dir = tempfile::tempdir().unwrap();
    recon()
        .args(["run", "--ledger"])
        .arg(dir.path().join("nope.csv"))
        .arg("--corpus")
        .arg(dir.path())
        .arg("-o")
        .arg(dir.path().join("out"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("input not found"));
}

#[test]
fn test_run_with_empty_corpus_reports_missing_documents() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = dir.path().join("ledger.csv");
    fs::write(
        &ledger,
        "row_id,number,date,net\n1,FV/1/2024,2024-01-05,100.00\n2,FV/2/2024,2024-01-06,200.00\n",
    )
    .unwrap();
    let corpus = dir.path().join("corpus");
    fs::create_dir_all(&corpus).unwrap();
    let out = dir.path().join("out");

    recon()
        .args(["run", "--ledger"])
        .arg(&ledger)
        .arg("--corpus")
        .arg(&corpus)
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Reconciled 2 rows"));

    let verdicts = fs::read_to_string(out.join("verdicts.jsonl")).unwrap();
    assert_eq!(verdicts.lines().count(), 2);
    assert!(verdicts.lines().all(|l| l.contains("\"overall\":\"missing_pdf\"")));

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("summary.json")).unwrap()).unwrap();
    assert_eq!(summary["missing_evidence"], 2);
}

#[test]
fn test_index_records_unreadable_documents() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = dir.path().join("corpus");
    fs::create_dir_all(&corpus).unwrap();
    fs::write(corpus.join("broken.pdf"), "this is not a pdf").unwrap();
    let output = dir.path().join("index.csv");

    recon()
        .arg("index")
        .arg(&corpus)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 with errors"));

    let index = fs::read_to_string(&output).unwrap();
    let mut lines = index.lines();
    assert_eq!(
        lines.next(),
        Some("path,filename,invoice_number,issue_date,net_amount,currency,seller_guess,error")
    );
    assert!(lines.next().unwrap().contains("broken.pdf"));
}

#[test]
fn test_missing_corpus_fails() {
    let dir = tempfile::tempdir().unwrap();
    recon()
        .arg("index")
        .arg(dir.path().join("absent"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("input not found"));
}
