use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn apm(storage: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("apm").unwrap();
    cmd.env("APM_STORAGE_PATH", storage.path().join("storage.json"))
        .env_remove("APM_SERVER")
        .env_remove("APM_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn prints_version() {
    let dir = TempDir::new().unwrap();
    apm(&dir)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn whoami_without_session_fails() {
    let dir = TempDir::new().unwrap();
    apm(&dir)
        .arg("whoami")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not logged in"));
}

#[test]
fn login_requires_a_server() {
    let dir = TempDir::new().unwrap();
    apm(&dir)
        .args(["login", "--email", "a@b.com", "--password", "secret1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No server given"));
}

#[test]
fn logout_without_session_succeeds() {
    let dir = TempDir::new().unwrap();
    apm(&dir).arg("logout").assert().success();
}

#[test]
fn upload_rejects_unknown_format() {
    let dir = TempDir::new().unwrap();
    apm(&dir)
        .args(["upload", "shapefile", "scan.shp"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}
