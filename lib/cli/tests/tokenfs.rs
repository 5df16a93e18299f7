use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[test]
fn version_string() {
    Command::cargo_bin("tokenfs")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("tokenfs {VERSION}")));
}

#[test]
fn lists_files_from_stdin_session() {
    Command::cargo_bin("tokenfs")
        .unwrap()
        .env_remove("RUST_LOG")
        .write_stdin("touch /f\nwrite /f 0 the quick brown fox\nls\n")
        .assert()
        .success()
        .stdout("20 bytes\n.\n..\nthe quick brown fox. \n");
}

#[test]
fn reports_errors_and_keeps_going() {
    Command::cargo_bin("tokenfs")
        .unwrap()
        .write_stdin("read /missing\ntouch /f\nstat /f\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("line 1"))
        .stdout(predicate::str::contains("2 file f len=0"));
}

#[test]
fn runs_script_file() {
    let mut script = tempfile::NamedTempFile::new().unwrap();
    writeln!(script, "mkdir /d").unwrap();
    writeln!(script, "touch /d/words").unwrap();
    writeln!(script, "write /d/words 0 alpha beta").unwrap();
    writeln!(script, "read /d/words").unwrap();
    writeln!(script, "read /d/words").unwrap();
    script.flush().unwrap();

    Command::cargo_bin("tokenfs")
        .unwrap()
        .arg("--script")
        .arg(script.path())
        .assert()
        .success()
        .stdout("11 bytes\nalpha\nbeta\n");
}

#[test]
fn rejects_invalid_config() {
    Command::cargo_bin("tokenfs")
        .unwrap()
        .args(["--readdir-batch", "0"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid store configuration"));
}
