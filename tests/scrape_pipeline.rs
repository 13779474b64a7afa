use std::fs;
use std::io::Read as _;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use predicates::prelude::*;
use serde_json::{Value, json};

const SIGN_IN_PAGE: &str = r#"<!doctype html>
<html>
  <head><meta name="csrf-token" content="meta-token"></head>
  <body>
    <form action="/accounts/sign_in" method="post">
      <input type="hidden" name="authenticity_token" value="form-token" />
      <input type="email" name="account[email]" />
      <input type="password" name="account[password]" />
    </form>
  </body>
</html>
"#;

const FAILED_SIGN_IN_PAGE: &str =
    r#"<html><body><p class="alert">Invalid Email or password.</p></body></html>"#;

fn lessons_page_one() -> Value {
    json!({
        "lessons": [
            {
                "id": 1,
                "title": "Hello World",
                "level": "Newbie",
                "synopsis": "Greetings",
                "crd_url": "/crd/1.json",
                "audio_url": "https://cdn.test/1.mp3",
                "has_course": true,
                "course_position": 1,
                "course": {"title": "Trip", "slug": "trip", "description": "Two friends travel."},
                "release_at_formatted": "Jan 2, 2024",
            },
            {
                "id": 2,
                "title": "Members Only",
                "level": "Newbie",
                "locked": true,
                "crd_url": "/crd/2.json",
            },
        ],
        "next_page_url": "/lessons.json?page=2",
    })
}

fn lessons_page_two() -> Value {
    json!({
        "lessons": [
            {
                "id": 3,
                "title": "Broken",
                "level": "Elementary",
                "crd_url": "/crd/broken.json",
            },
            {
                "id": 4,
                "title": "Trip Two",
                "level": "Newbie",
                "crd_url": "/crd/4.json",
                "has_course": true,
                "course_position": 2,
                "course": {"title": "Trip", "slug": "trip", "description": "Two friends travel."},
            },
            {
                "id": 5,
                "title": "No Content",
                "level": "Intermediate",
            },
        ],
        "next_page_url": null,
    })
}

fn crd(first: &str, second: &str) -> Value {
    json!({
        "words": [
            {"hanzi": first, "pinyin": "nǐ hǎo", "meaning": "hello", "hsk": 1},
            {"hanzi": "。"},
            {"hanzi": second, "pinyin": "xiè xie", "meaning": "thanks", "hsk": 1},
        ],
        "sentence_indices": [0, 2],
        "sentence_translations": ["Hello.", "Thanks."],
        "syllable_times": [0.0, 0.4, 0.8, 1.2],
    })
}

fn header(name: &str, value: &str) -> tiny_http::Header {
    tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes()).expect("build header")
}

fn json_response(status: u16, body: &Value) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    tiny_http::Response::from_string(body.to_string())
        .with_status_code(status)
        .with_header(header("Content-Type", "application/json"))
}

/// Stub provider: sign-in form, a two-page lesson index gated on the session
/// cookie, and CRD payloads (one of which always fails).
fn spawn_provider() -> (String, mpsc::Sender<()>, thread::JoinHandle<()>) {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("start tiny_http server");
    let base_url = format!("http://{}", server.server_addr());
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

    let handle = thread::spawn(move || {
        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }
            let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                Ok(Some(req)) => req,
                Ok(None) => continue,
                Err(_) => break,
            };

            let method = request.method().clone();
            let url = request.url().to_string();
            let cookie = request
                .headers()
                .iter()
                .find(|h| h.field.equiv("Cookie"))
                .map(|h| h.value.as_str().to_owned())
                .unwrap_or_default();
            let authed = cookie.contains("_session=signed-in");

            let response = match (method, url.as_str()) {
                (tiny_http::Method::Get, "/accounts/sign_in") => {
                    tiny_http::Response::from_string(SIGN_IN_PAGE)
                        .with_header(header("Content-Type", "text/html"))
                        .with_header(header("Set-Cookie", "_session=anonymous; path=/"))
                }
                (tiny_http::Method::Post, "/accounts/sign_in") => {
                    let mut body = String::new();
                    let _ = request.as_reader().read_to_string(&mut body);
                    let ok = body.contains("authenticity_token=form-token")
                        && body.contains("reader%40example.test")
                        && body.contains("hunter2")
                        && cookie.contains("_session=anonymous");
                    if ok {
                        tiny_http::Response::from_string("")
                            .with_status_code(302)
                            .with_header(header("Location", "/"))
                            .with_header(header("Set-Cookie", "_session=signed-in; path=/"))
                    } else {
                        tiny_http::Response::from_string(FAILED_SIGN_IN_PAGE)
                            .with_status_code(200)
                    }
                }
                (_, "/lessons.json") if authed => json_response(200, &lessons_page_one()),
                (_, "/lessons.json?page=2") if authed => json_response(200, &lessons_page_two()),
                (_, u) if u.starts_with("/lessons.json") => {
                    json_response(401, &json!({"error": "unauthorized"}))
                }
                (_, "/crd/1.json") => json_response(200, &crd("你好", "谢谢")),
                (_, "/crd/4.json") => json_response(200, &crd("您好", "多谢")),
                (_, "/crd/broken.json") => json_response(500, &json!({"error": "boom"})),
                _ => json_response(404, &json!({"error": "not found"})),
            };
            let _ = request.respond(response);
        }
    });

    (base_url, shutdown_tx, handle)
}

fn scrape_cmd(origin: &str, out: &std::path::Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("hanzi-reader");
    cmd.env_remove("DUCHINESE_EMAIL")
        .env_remove("DUCHINESE_PASSWORD")
        .env_remove("DUCHINESE_SESSION_COOKIE")
        .arg("scrape")
        .arg("--origin")
        .arg(origin)
        .arg("--output-dir")
        .arg(out)
        .arg("--concurrency")
        .arg("2")
        .arg("--retries")
        .arg("1")
        .arg("--retry-base-ms")
        .arg("1")
        .arg("--page-delay-ms")
        .arg("0");
    cmd
}

fn read_json(path: &std::path::Path) -> Value {
    let bytes = fs::read(path).unwrap_or_else(|err| panic!("read {}: {err}", path.display()));
    serde_json::from_slice(&bytes).expect("parse json")
}

#[test]
fn scrape_writes_lessons_and_reports_failures() {
    let (origin, shutdown, handle) = spawn_provider();
    let temp = tempfile::TempDir::new().expect("tempdir");
    let out = temp.path().join("output");

    scrape_cmd(&origin, &out)
        .env("DUCHINESE_EMAIL", "reader@example.test")
        .env("DUCHINESE_PASSWORD", "hunter2")
        .assert()
        .success()
        .stdout(predicate::str::contains("=== COMPLETE ==="))
        .stdout(predicate::str::contains("Processed: 2"))
        .stdout(predicate::str::contains("Skipped:   2"))
        .stdout(predicate::str::contains("Failed:    1"))
        .stdout(predicate::str::contains("Total:     5"))
        .stdout(predicate::str::contains("  - [3] Broken: "));

    let index = read_json(&out.join("lessons.json"));
    let ids: Vec<u64> = index
        .as_array()
        .expect("index array")
        .iter()
        .map(|l| l["id"].as_u64().expect("id"))
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);

    let lesson = read_json(&out.join("lessons/1.json"));
    assert_eq!(lesson["title"], "Hello World");
    assert_eq!(lesson["date"], "Jan 2, 2024");
    assert_eq!(lesson["series"], json!({"title": "Trip", "chapter": 1, "totalChapters": 2}));
    assert_eq!(lesson["fullText"]["simplified"], "你好。谢谢");
    let sentences = lesson["sentences"].as_array().expect("sentences");
    assert_eq!(sentences.len(), 2);
    assert_eq!(sentences[0]["english"], "Hello.");
    assert_eq!(sentences[0]["audioTime"], json!(0.0));
    assert_eq!(sentences[1]["english"], "Thanks.");
    assert_eq!(sentences[1]["audioTime"], json!(0.4));

    assert!(out.join("lessons/4.json").is_file());
    assert!(!out.join("lessons/2.json").exists());
    assert!(!out.join("lessons/3.json").exists());
    assert!(!out.join("lessons/5.json").exists());

    let text = fs::read_to_string(out.join("by-level/newbie/1-hello-world.txt")).expect("level text");
    assert!(text.starts_with("=== LESSON METADATA ===\nTitle: Hello World\n"));
    assert!(text.contains("Series: Trip (Chapter 1 of 2)"));
    assert!(text.contains("Audio: https://cdn.test/1.mp3"));
    assert_eq!(
        fs::read_to_string(out.join("by-series/trip/01-hello-world.txt")).expect("series text"),
        text
    );
    assert!(out.join("by-series/trip/02-trip-two.txt").is_file());

    let info = fs::read_to_string(out.join("by-series/trip/_series-info.txt")).expect("series info");
    assert_eq!(
        info,
        "=== SERIES: Trip ===\nTwo friends travel.\n\n=== CHAPTERS ===\n1. Hello World\n2. Trip Two\n"
    );

    let _ = shutdown.send(());
    let _ = handle.join();
}

#[test]
fn skip_existing_and_no_text_with_session_cookie() {
    let (origin, shutdown, handle) = spawn_provider();
    let temp = tempfile::TempDir::new().expect("tempdir");
    let out = temp.path().join("output");

    scrape_cmd(&origin, &out)
        .env("DUCHINESE_SESSION_COOKIE", "_session=signed-in")
        .arg("--level")
        .arg("newbie")
        .arg("--no-text")
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed: 2"))
        .stdout(predicate::str::contains("Skipped:   1"))
        .stdout(predicate::str::contains("Total:     3"));
    assert!(out.join("lessons/1.json").is_file());
    assert!(!out.join("by-level").exists());
    assert!(!out.join("by-series").exists());

    scrape_cmd(&origin, &out)
        .env("DUCHINESE_SESSION_COOKIE", "_session=signed-in")
        .arg("--level")
        .arg("newbie")
        .arg("--no-text")
        .arg("--skip-existing")
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed: 0"))
        .stdout(predicate::str::contains("Skipped:   3"));

    let _ = shutdown.send(());
    let _ = handle.join();
}

#[test]
fn show_prints_stored_lesson_text() {
    let (origin, shutdown, handle) = spawn_provider();
    let temp = tempfile::TempDir::new().expect("tempdir");
    let out = temp.path().join("output");

    scrape_cmd(&origin, &out)
        .env("DUCHINESE_SESSION_COOKIE", "_session=signed-in")
        .arg("--limit")
        .arg("1")
        .assert()
        .success()
        .stdout(predicate::str::contains("Total:     1"));

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("hanzi-reader");
    cmd.arg("show")
        .arg("--output-dir")
        .arg(&out)
        .arg("--id")
        .arg("1")
        .assert()
        .success()
        .stdout(predicate::str::contains("=== SENTENCE BY SENTENCE ==="))
        .stdout(predicate::str::contains("你好 (nǐ hǎo) - hello [HSK 1]"));

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("hanzi-reader");
    cmd.arg("show")
        .arg("--output-dir")
        .arg(&out)
        .arg("--id")
        .arg("99")
        .assert()
        .failure()
        .stderr(predicate::str::contains("lesson 99 not found"));

    let _ = shutdown.send(());
    let _ = handle.join();
}

#[test]
fn missing_credentials_exit_non_zero() {
    let temp = tempfile::TempDir::new().expect("tempdir");
    scrape_cmd("http://127.0.0.1:9", &temp.path().join("output"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing credentials"));
}

#[test]
fn rejected_sign_in_is_fatal() {
    let (origin, shutdown, handle) = spawn_provider();
    let temp = tempfile::TempDir::new().expect("tempdir");

    scrape_cmd(&origin, &temp.path().join("output"))
        .env("DUCHINESE_EMAIL", "reader@example.test")
        .env("DUCHINESE_PASSWORD", "wrong")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "authentication failed: Invalid Email or password.",
        ));

    let _ = shutdown.send(());
    let _ = handle.join();
}

#[test]
fn stale_session_aborts_the_crawl() {
    let (origin, shutdown, handle) = spawn_provider();
    let temp = tempfile::TempDir::new().expect("tempdir");

    scrape_cmd(&origin, &temp.path().join("output"))
        .env("DUCHINESE_SESSION_COOKIE", "_session=expired")
        .assert()
        .failure()
        .stderr(predicate::str::contains("fetch lessons page 1"))
        .stderr(predicate::str::contains("HTTP 401"));

    let _ = shutdown.send(());
    let _ = handle.join();
}
