//! End-to-end tests against a real server bound to an ephemeral port

use reqwest::blocking::Client;
use serde_json::{json, Value};
use textstamp::rendering::{BaseImage, Compositor, FontLibrary};
use textstamp::server::{Server, ServerHandle};
use textstamp::template::TemplateCache;
use textstamp::{ServerConfig, StampService};

fn start_server(dir: &tempfile::TempDir, max_body_bytes: usize) -> ServerHandle {
    let config = ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        template_path: dir.path().join("template.png"),
        public_dir: Some(dir.path().to_path_buf()),
        workers: 4,
        max_body_bytes,
        ..Default::default()
    };
    let service = StampService::with_parts(
        TemplateCache::new(&config.template_path),
        Compositor::new(FontLibrary::empty()),
    );
    Server::bind(config, service)
        .expect("bind")
        .spawn()
        .expect("spawn")
}

#[test]
fn full_generate_flow() {
    let dir = tempfile::tempdir().unwrap();
    let server = start_server(&dir, 1024 * 1024);
    let base = server.base_url();
    let client = Client::new();

    // Not initialized yet
    let resp = client
        .post(format!("{}/generate", base))
        .json(&json!({ "text": "hello" }))
        .send()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
    assert_eq!(resp.json::<Value>().unwrap()["error"], "Template not initialized");

    let resp = client.get(format!("{}/check-template", base)).send().unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
    assert_eq!(resp.json::<Value>().unwrap(), json!({ "exists": true, "created": true }));

    let resp = client
        .post(format!("{}/generate", base))
        .json(&json!({ "text": "   " }))
        .send()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    assert_eq!(resp.json::<Value>().unwrap()["error"], "Text is required");

    let resp = client
        .post(format!("{}/generate", base))
        .json(&json!({ "text": "Hello world", "fontSize": "32", "position": "bottom", "align": "left" }))
        .send()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let headers = resp.headers().clone();
    assert_eq!(headers.get("content-type").unwrap(), "image/png");
    assert_eq!(
        headers.get("content-disposition").unwrap(),
        "attachment; filename=\"generated-image.png\""
    );
    let bytes = resp.bytes().unwrap();
    assert_eq!(
        headers.get("content-length").unwrap().to_str().unwrap(),
        bytes.len().to_string()
    );
    let image = BaseImage::from_png(&bytes).unwrap();
    assert_eq!((image.width(), image.height()), (800, 600));

    server.shutdown();
}

#[test]
fn form_bodies_are_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let server = start_server(&dir, 1024 * 1024);
    let base = server.base_url();
    let client = Client::new();

    client.get(format!("{}/check-template", base)).send().unwrap();
    let resp = client
        .post(format!("{}/generate", base))
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body("text=from+the+form&fontSize=40&color=%23000000")
        .send()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    server.shutdown();
}

#[test]
fn oversized_body_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let server = start_server(&dir, 64);
    let client = Client::new();
    let text = "x".repeat(200);
    let resp = client
        .post(format!("{}/generate", server.base_url()))
        .json(&json!({ "text": text }))
        .send()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 413);
    server.shutdown();
}

#[test]
fn concurrent_check_template_creates_once() {
    let dir = tempfile::tempdir().unwrap();
    let server = start_server(&dir, 1024 * 1024);
    let url = format!("{}/check-template", server.base_url());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let url = url.clone();
            std::thread::spawn(move || {
                let resp = Client::new().get(url).send().unwrap();
                assert_eq!(resp.status().as_u16(), 200);
                resp.json::<Value>().unwrap()
            })
        })
        .collect();

    let created = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|body| body["created"] == json!(true))
        .count();
    assert_eq!(created, 1);
    server.shutdown();
}
