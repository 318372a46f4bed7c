//! Shared fixtures: an in-process chat-completions endpoint and generated PDFs.

#![allow(dead_code)]

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use lopdf::{content::Content, content::Operation, Dictionary, Document, Object, Stream};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const CHAT_PATH: &str = "/v1/chat/completions";

/// Serialises tests that load pdfium; init/teardown is process-global.
pub static PDFIUM_LOCK: Mutex<()> = Mutex::new(());

/// Skip this test if pdfium cannot be bound, otherwise hold [`PDFIUM_LOCK`].
macro_rules! skip_unless_pdfium {
    () => {{
        let guard = common::PDFIUM_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = pdfask::pipeline::render::bind_pdfium() {
            println!("SKIP: pdfium not available: {e}");
            return;
        }
        guard
    }};
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("pdfask=debug"))
        .with_test_writer()
        .try_init();
}

// ── Mock endpoint ────────────────────────────────────────────────────────────

/// How the mock answers each request.
#[derive(Clone, Debug)]
pub enum Reply {
    /// HTTP 200 with a well-formed completion carrying this text.
    Answer(&'static str),
    /// This status with this raw body.
    Status(u16, &'static str),
    /// HTTP 200 with this raw body.
    Raw200(&'static str),
    /// HTTP 200 echoing the first image URL; the first arrival is delayed.
    EchoImageUrl { slow_first: Duration },
    /// The n-th arrival (1-based) fails with `status`; the rest answer `answer <arrival>`.
    FailNth { n: usize, status: u16, body: &'static str },
    /// Sleep, then answer.
    Sleep(Duration),
}

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct MockState {
    reply: Reply,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

pub struct MockEndpoint {
    pub url: String,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockEndpoint {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

pub async fn spawn_mock(reply: Reply) -> MockEndpoint {
    let hits = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        reply,
        hits: Arc::clone(&hits),
        requests: Arc::clone(&requests),
    };

    let app = Router::new().route(CHAT_PATH, post(chat)).with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockEndpoint {
        url: format!("http://{addr}{CHAT_PATH}"),
        hits,
        requests,
    }
}

/// A URL on which nothing is listening.
pub async fn refused_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}{CHAT_PATH}")
}

async fn chat(State(mock): State<MockState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let arrival = mock.hits.fetch_add(1, Ordering::SeqCst) + 1;
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };
    mock.requests.lock().unwrap().push(RecordedRequest {
        authorization: header_value(header::AUTHORIZATION),
        content_type: header_value(header::CONTENT_TYPE),
        body: body.clone(),
    });

    match mock.reply {
        Reply::Answer(text) => completion(text),
        Reply::Status(code, raw) => (StatusCode::from_u16(code).unwrap(), raw).into_response(),
        Reply::Raw200(raw) => (StatusCode::OK, raw).into_response(),
        Reply::EchoImageUrl { slow_first } => {
            if arrival == 1 {
                tokio::time::sleep(slow_first).await;
            }
            let url = body["messages"][0]["content"][1]["image_url"]["url"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            completion(&url)
        }
        Reply::FailNth { n, status, body: raw } => {
            if arrival == n {
                (StatusCode::from_u16(status).unwrap(), raw).into_response()
            } else {
                completion(&format!("answer {arrival}"))
            }
        }
        Reply::Sleep(d) => {
            tokio::time::sleep(d).await;
            completion("late")
        }
    }
}

fn completion(text: &str) -> Response {
    Json(json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 100, "completion_tokens": 5, "total_tokens": 105}
    }))
    .into_response()
}

// ── PDF fixtures ─────────────────────────────────────────────────────────────

fn media_box() -> Object {
    Object::Array(vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(612),
        Object::Integer(792),
    ])
}

fn text_ops(label: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(24)]),
        Operation::new("Td", vec![Object::Integer(100), Object::Integer(700)]),
        Operation::new(
            "Tj",
            vec![Object::String(label.as_bytes().to_vec(), lopdf::StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
    ]
}

fn finish(mut doc: Document, pages_id: lopdf::ObjectId, page_ids: Vec<lopdf::ObjectId>) -> Vec<u8> {
    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(page_ids.len() as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]);
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

fn font_resources(doc: &mut Document) -> Dictionary {
    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));
    Dictionary::from_iter(vec![(
        "Font",
        Object::Dictionary(Dictionary::from_iter(vec![("F1", Object::Reference(font_id))])),
    )])
}

/// A text-only PDF with `num_pages` pages reading "Page 1", "Page 2", …
pub fn create_test_pdf(num_pages: u32) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let resources = font_resources(&mut doc);
    let resources_id = doc.add_object(resources);

    let mut page_ids = Vec::new();
    for i in 0..num_pages {
        let content = Content {
            operations: text_ops(&format!("Page {}", i + 1)),
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("MediaBox", media_box()),
            ("Resources", Object::Reference(resources_id)),
            ("Contents", Object::Reference(content_id)),
        ]);
        page_ids.push(doc.add_object(page));
    }

    finish(doc, pages_id, page_ids)
}

/// A two-page PDF: page 1 draws one 4×4 RGB image XObject, page 2 is text only.
pub fn create_pdf_with_image() -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        Dictionary::from_iter(vec![
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Image".to_vec())),
            ("Width", Object::Integer(4)),
            ("Height", Object::Integer(4)),
            ("ColorSpace", Object::Name(b"DeviceRGB".to_vec())),
            ("BitsPerComponent", Object::Integer(8)),
        ]),
        [200u8, 30, 30].repeat(16),
    ));

    let mut image_resources = font_resources(&mut doc);
    image_resources.set(
        "XObject",
        Object::Dictionary(Dictionary::from_iter(vec![("Im1", Object::Reference(image_id))])),
    );
    let text_resources = font_resources(&mut doc);

    let image_content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Integer(200),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(200),
                    Object::Integer(100),
                    Object::Integer(400),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im1".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let text_content = Content {
        operations: text_ops("No pictures here"),
    };

    let mut page_ids = Vec::new();
    for (content, resources) in [(image_content, image_resources), (text_content, text_resources)] {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("MediaBox", media_box()),
            ("Resources", Object::Dictionary(resources)),
            ("Contents", Object::Reference(content_id)),
        ]);
        page_ids.push(doc.add_object(page));
    }

    finish(doc, pages_id, page_ids)
}
