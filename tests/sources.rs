use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("paper-digest").expect("binary");
    cmd.env_clear().env("NO_COLOR", "1");
    cmd
}

#[test]
fn help_mentions_subcommands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("run")
                .and(predicate::str::contains("check"))
                .and(predicate::str::contains("sources")),
        );
}

#[test]
fn sources_lists_defaults() {
    let tmp = tempfile::tempdir().expect("tempdir");
    cmd()
        .current_dir(tmp.path())
        .arg("sources")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("https://arxiv.org/list/cond-mat/new")
                .and(predicate::str::contains("(html)"))
                .and(predicate::str::contains("https://feeds.aps.org/rss/recent/prl.xml"))
                .and(predicate::str::contains("nature-journal")),
        );
    assert!(!tmp.path().join("state").exists());
}

#[test]
fn empty_url_disables_a_source() {
    cmd()
        .args(["--arxiv-url", "", "--nature-mode", "rss", "sources"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("arxiv ")
                .not()
                .and(predicate::str::contains("(rss)")),
        );
}

#[test]
fn invalid_nature_mode_is_rejected() {
    cmd()
        .args(["--nature-mode", "atom", "sources"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("atom"));
}
