use std::net::TcpListener;
use std::path::Path;

use assert_cmd::Command;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ARXIV: &str = r#"<html><body><dl>
  <dt><a href="https://arxiv.org/abs/2401.00001">arXiv:2401.00001</a></dt>
  <dd>
    <div class="list-title mathjax">Title: Spin-Orbit Torque MRAM</div>
    <div class="list-authors"><a>Alice</a>, <a>Bob</a></div>
    <p class="mathjax">Abstract: Already delivered yesterday.</p>
    <div class="list-date">Submitted on 15 Jan 2024</div>
  </dd>
  <dt><a href="https://arxiv.org/abs/2401.00003">arXiv:2401.00003</a></dt>
  <dd>
    <div class="list-title mathjax">Title: Spintronics with magnons</div>
    <div class="list-authors"><a>Carol</a></div>
    <p class="mathjax">Abstract: Magnon currents.</p>
    <div class="list-date">Submitted on 16 Jan 2024</div>
  </dd>
  <dt><a href="https://arxiv.org/abs/2401.00004">arXiv:2401.00004</a></dt>
  <dd>
    <div class="list-title mathjax">Title: Thermal conduction in films</div>
    <p class="mathjax">Abstract: Nothing relevant.</p>
  </dd>
</dl></body></html>"#;

const NATURE: &str = r#"<html><body>
  <article class="c-article-item">
    <h3><a href="https://www.nature.com/articles/s41467-024-00010?utm_source=listing">MRAM at room temperature</a></h3>
    <p class="c-article-item__description">Switching without fields.</p>
    <ul class="c-article-item__authors"><li>Dana</li></ul>
    <time datetime="2024-01-17">17 January 2024</time>
  </article>
</body></html>"#;

const PRL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns="http://purl.org/rss/1.0/"
         xmlns:dc="http://purl.org/dc/elements/1.1/"
         xmlns:prism="http://prismstandard.org/namespaces/basic/2.0/">
  <item rdf:about="http://link.aps.org/doi/10.1103/PhysRevLett.132.000001">
    <title>Altermagnetic MRAM bits</title>
    <description>Spin splitting.</description>
    <dc:creator>Evan</dc:creator>
    <dc:creator>Frank</dc:creator>
    <dc:subject>Condensed Matter and Materials</dc:subject>
    <prism:publicationDate>2024-01-18</prism:publicationDate>
  </item>
  <item rdf:about="http://link.aps.org/doi/10.1103/PhysRevLett.132.000002">
    <title>MRAM for axion searches</title>
    <dc:subject>Particles and Fields</dc:subject>
  </item>
</rdf:RDF>"#;

const NATURE_JOURNAL: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <item>
    <title>MRAM at room temperature</title>
    <link>https://www.nature.com/articles/s41467-024-00010</link>
    <category>Physics</category>
  </item>
</channel></rss>"#;

/// Mount the fixture pages on a mock server; unknown paths get a 404.
async fn serve() -> MockServer {
    let server = MockServer::start().await;
    for (route, body) in [
        ("/arxiv", ARXIV),
        ("/nature", NATURE),
        ("/prl.xml", PRL),
        ("/nature.rss", NATURE_JOURNAL),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
    }
    server
}

/// A local port with nothing listening on it.
fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind spare port");
    listener.local_addr().expect("spare port address").port()
}

fn digest_cmd(cwd: &Path, base: &str) -> Command {
    let mut cmd = Command::cargo_bin("paper-digest").expect("binary");
    cmd.env_clear()
        .current_dir(cwd)
        .env("NO_COLOR", "1")
        .env("KEYWORDS", "MRAM, spintronics")
        .env("ARXIV_URL", format!("{base}/arxiv"))
        .env("NATURE_URL", format!("{base}/nature"))
        .env("NATURE_MODE", "html")
        .env("APS_PRL_RSS_URL", format!("{base}/prl.xml"))
        .env("APS_PRL_SECTION_FILTER", "Condensed Matter")
        .env("NATURE_JOURNAL_RSS_URL", format!("{base}/nature.rss"))
        .env("STATE_FILE", "state/seen.json")
        .env("SMTP_HOST", "127.0.0.1")
        .env("SMTP_PORT", closed_port().to_string())
        .env("EMAIL_FROM", "digest@example.com")
        .env("EMAIL_TO", "reader@example.com");
    cmd
}

fn write_state(cwd: &Path, contents: &str) -> std::path::PathBuf {
    let path = cwd.join("state").join("seen.json");
    std::fs::create_dir_all(path.parent().expect("state dir")).expect("create state dir");
    std::fs::write(&path, contents).expect("write state");
    path
}

const SEEN_ONE: &str = "{\n  \"seen_links\": [\n    \"https://arxiv.org/abs/2401.00001\"\n  ]\n}";

#[tokio::test]
async fn check_prints_only_unseen_matches() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::tempdir()?;
    let state = write_state(tmp.path(), SEEN_ONE);
    let server = serve().await;
    let base = server.uri();

    let output = digest_cmd(tmp.path(), &base).arg("check").output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    let stderr = String::from_utf8(strip_ansi_escapes::strip(output.stderr))?;

    assert!(stdout.contains("Paper Digest (3)"), "stdout=\n{}", stdout);
    assert!(stdout.contains("Title: Spintronics with magnons"), "stdout=\n{}", stdout);
    assert!(
        stdout.contains("Link: https://www.nature.com/articles/s41467-024-00010\n"),
        "stdout=\n{}",
        stdout
    );
    assert!(stdout.contains("Authors: Evan, Frank"), "stdout=\n{}", stdout);
    assert!(!stdout.contains("2401.00001"), "seen paper was reported. stdout=\n{}", stdout);
    assert!(!stdout.contains("axion"), "section filter ignored. stdout=\n{}", stdout);

    assert!(
        stderr.contains("arxiv ✓ 2")
            && stderr.contains("nature ✓ 1")
            && stderr.contains("aps-prl ✓ 1")
            && stderr.contains("nature-journal ✓ 1")
            && stderr.contains("new 3"),
        "stderr summary mismatch. stderr=\n{}",
        stderr
    );

    assert_eq!(std::fs::read_to_string(&state)?, SEEN_ONE);
    Ok(())
}

#[tokio::test]
async fn check_json_emits_one_object_per_paper() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::tempdir()?;
    let server = serve().await;
    let base = server.uri();

    let output = digest_cmd(tmp.path(), &base)
        .args(["check", "--json"])
        .output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;

    let papers: Vec<serde_json::Value> = stdout
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    let sources: Vec<&str> = papers
        .iter()
        .filter_map(|p| p["source"].as_str())
        .collect();
    assert_eq!(sources, ["arxiv", "arxiv", "nature", "aps-prl"]);
    assert_eq!(papers[3]["published_date"], "2024-01-18");
    assert_eq!(papers[2]["keywords_matched"], serde_json::json!(["mram"]));

    // No state file is created by a check.
    assert!(!tmp.path().join("state").exists());
    Ok(())
}

#[tokio::test]
async fn failed_send_exits_one_and_records_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::tempdir()?;
    let state = write_state(tmp.path(), SEEN_ONE);
    let server = serve().await;
    let base = server.uri();

    let output = digest_cmd(tmp.path(), &base).arg("run").output()?;
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(strip_ansi_escapes::strip(output.stderr))?;
    assert!(stderr.contains("failed to send digest"), "stderr=\n{}", stderr);
    assert!(stderr.contains("send failed"), "stderr=\n{}", stderr);

    assert_eq!(std::fs::read_to_string(&state)?, SEEN_ONE);
    Ok(())
}

#[tokio::test]
async fn corrupted_state_starts_fresh() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::tempdir()?;
    let state = write_state(tmp.path(), "{ this is not json");
    let server = serve().await;
    let base = server.uri();

    // Default subcommand is `run`.
    let output = digest_cmd(tmp.path(), &base).output()?;
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(strip_ansi_escapes::strip(output.stderr))?;
    assert!(stderr.contains("starting fresh"), "stderr=\n{}", stderr);
    assert!(stderr.contains("new 4"), "stderr=\n{}", stderr);

    let on_disk: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&state)?)?;
    assert_eq!(on_disk, serde_json::json!({ "seen_links": [] }));
    Ok(())
}

#[test]
fn unreachable_sources_are_not_fatal() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::tempdir()?;
    let dead = format!("http://127.0.0.1:{}", closed_port());

    let output = digest_cmd(tmp.path(), &dead).arg("run").output()?;
    assert!(output.status.success());
    let stderr = String::from_utf8(strip_ansi_escapes::strip(output.stderr))?;
    assert!(stderr.contains("failed to fetch source"), "stderr=\n{}", stderr);
    assert!(
        stderr.contains("new 0") && stderr.contains("nothing new"),
        "stderr summary mismatch. stderr=\n{}",
        stderr
    );

    let on_disk: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(tmp.path().join("state/seen.json"))?)?;
    assert_eq!(on_disk, serde_json::json!({ "seen_links": [] }));
    Ok(())
}

#[tokio::test]
async fn missing_pages_count_as_failures() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::tempdir()?;
    let server = serve().await;
    let base = server.uri();

    let output = digest_cmd(tmp.path(), &base)
        .env("ARXIV_URL", format!("{base}/does-not-exist"))
        .arg("check")
        .output()?;
    assert!(output.status.success());
    let stderr = String::from_utf8(strip_ansi_escapes::strip(output.stderr))?;
    assert!(stderr.contains("failed to fetch source"), "stderr=\n{}", stderr);
    assert!(stderr.contains("arxiv ✓ 0"), "stderr=\n{}", stderr);
    Ok(())
}

#[tokio::test]
async fn unusable_state_path_is_fatal() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::tempdir()?;
    std::fs::write(tmp.path().join("blocker"), "not a directory")?;
    let server = serve().await;

    let output = digest_cmd(tmp.path(), &server.uri())
        .env("STATE_FILE", "blocker/seen.json")
        .arg("run")
        .output()?;
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(strip_ansi_escapes::strip(output.stderr))?;
    assert!(
        stderr.contains("fatal error while running digest"),
        "stderr=\n{}",
        stderr
    );
    assert!(!stderr.contains("new "), "no summary expected. stderr=\n{}", stderr);
    assert_eq!(std::fs::read_to_string(tmp.path().join("blocker"))?, "not a directory");
    Ok(())
}
