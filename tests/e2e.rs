//! End-to-end tests for doc2chat.
//!
//! Everything except the `engine_*` tests runs against a fake Ollama server
//! (axum on an ephemeral port) and needs no external software.
//!
//! The `engine_*` tests call the real Tesseract binary and pdfium library.
//! They are gated behind `E2E_ENABLED` so they do not run in CI unless
//! explicitly requested:
//!
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=/usr/local/lib cargo test --test e2e -- --nocapture

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use doc2chat::pipeline::extract::{PdfExtractor, PdfiumLibrary, TesseractEngine};
use doc2chat::{
    ChatConfig, ChatService, DocumentKind, ExtractError, ExtractionStatus, ExtractorRegistry,
    FallbackReason, InferenceBackend, OllamaClient, ReplySource, TextExtractor, UploadedDocument,
    MAX_CONTEXT_CHARS,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Prompts received by the fake server, in order.
type Received = Arc<Mutex<Vec<String>>>;

/// Fake Ollama: answers `/api/generate` after `delay` with a fixed reply.
async fn fake_ollama(reply: &'static str, delay: Duration) -> (String, Received) {
    let received: Received = Arc::default();

    let app = Router::new()
        .route(
            "/api/tags",
            get(|| async { Json(json!({"models": [{"name": "llama3.2"}]})) }),
        )
        .route(
            "/api/generate",
            post(
                move |State(seen): State<Received>, Json(body): Json<Value>| async move {
                    seen.lock()
                        .unwrap()
                        .push(body["prompt"].as_str().unwrap_or_default().to_string());
                    tokio::time::sleep(delay).await;
                    Json(json!({"response": reply, "done": true}))
                },
            ),
        )
        .with_state(Arc::clone(&received));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    (format!("http://{addr}"), received)
}

/// Base URL nothing listens on.
async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn service_at(base_url: &str) -> ChatService {
    let config = ChatConfig::builder()
        .base_url(base_url)
        .generate_timeout_secs(1)
        .build()
        .unwrap();
    ChatService::new(config).unwrap()
}

fn txt(name: &str, body: &str) -> UploadedDocument {
    UploadedDocument::new(name, body.as_bytes().to_vec())
}

/// Skip this test unless E2E_ENABLED is set.
macro_rules! e2e_skip_unless_enabled {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run engine tests");
            return;
        }
    }};
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn text_upload_is_extracted_and_sent_to_model() {
    let (url, received) = fake_ollama("It says hello.", Duration::ZERO).await;
    let svc = service_at(&url);

    let doc = txt("hello.txt", "hello world");
    let up = svc.upload(svc.new_session(), doc).await;
    let result = &up.outcomes[0].result;
    assert_eq!(result.text, "hello world");
    assert_eq!(result.status, ExtractionStatus::Ok);

    let resp = svc.send(up.session, "What does it say?").await;
    assert_eq!(resp.reply, "It says hello.");
    assert_eq!(resp.source, ReplySource::Model);

    let prompts = received.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].starts_with("What does it say?\n\nReference from uploaded documents:\n"));
    assert!(prompts[0].contains("\n--- hello.txt (Text File) ---\nhello world"));
}

#[tokio::test]
async fn zero_byte_text_file_is_empty_with_placeholder() {
    let svc = service_at(&dead_url().await);
    let up = svc.upload(svc.new_session(), txt("blank.txt", "")).await;

    let result = &up.outcomes[0].result;
    assert_eq!(result.status, ExtractionStatus::Empty);
    assert_eq!(result.display_text(), "No text found in TXT file.");
}

#[tokio::test]
async fn backend_timeout_gives_canned_reply() {
    let (url, _) = fake_ollama("too late", Duration::from_secs(5)).await;
    let svc = service_at(&url);

    let resp = svc.send(svc.new_session(), "hello?").await;
    assert!(matches!(
        resp.source,
        ReplySource::Fallback(FallbackReason::GenerationFailed(_))
    ));
    assert!(doc2chat::prompts::GREETING_FALLBACKS.contains(&resp.reply.as_str()));
    assert_eq!(resp.session.conversation.len(), 2);
}

#[tokio::test]
async fn unreachable_backend_gives_document_aware_reply() {
    let svc = service_at(&dead_url().await);
    let doc = txt("notes.txt", "Q3 revenue grew 12%");
    let up = svc.upload(svc.new_session(), doc).await;
    let resp = svc.send(up.session, "How did revenue do?").await;

    assert_eq!(
        resp.source,
        ReplySource::Fallback(FallbackReason::BackendDown)
    );
    let candidates = doc2chat::prompts::document_fallbacks(1, "How did revenue do?");
    assert!(candidates.contains(&resp.reply));
}

#[tokio::test]
async fn long_documents_are_cut_per_document() {
    let (url, received) = fake_ollama("ok", Duration::ZERO).await;
    let svc = service_at(&url);

    let long = "x".repeat(MAX_CONTEXT_CHARS * 2);
    let up = svc
        .upload_all(
            svc.new_session(),
            vec![txt("long.txt", &long), txt("short.txt", "tiny")],
        )
        .await;
    svc.send(up.session, "compare").await;

    let prompt = received.lock().unwrap()[0].clone();
    let expected_long = format!(
        "\n--- long.txt (Text File) ---\n{}...\n--- short.txt (Text File) ---\ntiny",
        "x".repeat(MAX_CONTEXT_CHARS)
    );
    assert!(prompt.ends_with(&expected_long), "prompt was: {prompt}");
}

#[tokio::test]
async fn unknown_extension_never_reaches_an_extractor() {
    struct Counting(Arc<AtomicUsize>, DocumentKind);

    impl TextExtractor for Counting {
        fn kind(&self) -> DocumentKind {
            self.1
        }
        fn name(&self) -> &str {
            "counting"
        }
        fn extract_text(&self, _bytes: &[u8]) -> Result<String, ExtractError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok("text".into())
        }
    }

    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = ExtractorRegistry::new();
    for kind in DocumentKind::SUPPORTED {
        registry.register(Arc::new(Counting(Arc::clone(&calls), kind)));
    }
    let backend: Arc<dyn InferenceBackend> = Arc::new(
        OllamaClient::new(
            dead_url().await,
            Duration::from_millis(200),
            Duration::from_secs(1),
        )
        .unwrap(),
    );
    let svc = ChatService::with_parts(ChatConfig::default(), registry, backend);

    let doc = UploadedDocument::new("sheet.xlsx", vec![1, 2, 3]);
    let up = svc.upload(svc.new_session(), doc).await;
    let result = &up.outcomes[0].result;
    assert_eq!(result.status, ExtractionStatus::Unsupported);
    assert!(result.display_text().starts_with("Unsupported file type: "));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn same_name_keeps_first_result_across_new_chat() {
    let svc = service_at(&dead_url().await);
    let doc = txt("notes.txt", "version one");
    let up = svc.upload(svc.new_session(), doc).await;

    let mut session = up.session;
    assert!(session.new_chat().is_some());
    assert!(session.documents.is_empty());

    let again = svc.upload(session, txt("notes.txt", "version two")).await;
    assert!(again.outcomes[0].duplicate);
    assert_eq!(again.outcomes[0].result.text, "version one");
    assert_eq!(again.session.documents.len(), 1);
    assert_eq!(again.session.archived_len(), 1);
}

#[tokio::test]
async fn docx_upload_lists_paragraphs_then_cells() {
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
<w:p><w:r><w:t>Heading</w:t></w:r></w:p>
</w:body></w:document>"#;
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("word/document.xml", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    let bytes = writer.finish().unwrap().into_inner();

    let svc = service_at(&dead_url().await);
    let up = svc
        .upload(svc.new_session(), UploadedDocument::new("memo.docx", bytes))
        .await;
    assert_eq!(up.outcomes[0].result.text, "Heading\nCell");
}

// ── Real engines (E2E_ENABLED) ───────────────────────────────────────────────

/// A one-page PDF with no content stream, i.e. no text layer.
const BLANK_PDF: &str = "%PDF-1.4
1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj
2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj
3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >> endobj
trailer << /Root 1 0 R >>
%%EOF
";

#[tokio::test]
async fn engine_pdf_without_text_layer_is_empty() {
    e2e_skip_unless_enabled!();

    let svc = service_at(&dead_url().await);
    assert!(
        svc.registry().is_available(DocumentKind::Pdf),
        "pdfium not found; set PDFIUM_LIB_PATH"
    );

    let up = svc
        .upload(
            svc.new_session(),
            UploadedDocument::new("report.pdf", BLANK_PDF.as_bytes().to_vec()),
        )
        .await;
    let result = &up.outcomes[0].result;
    assert_eq!(result.status, ExtractionStatus::Empty);
    assert_eq!(result.display_text(), "No extractable text found in PDF.");
}

#[test]
fn engine_pdf_ocr_failure_fails_the_document() {
    e2e_skip_unless_enabled!();

    let scratch = tempfile::tempdir().unwrap();
    let scratch_dir = Some(scratch.path().to_path_buf());
    let engine = TesseractEngine::new("/nonexistent/doc2chat-test/tesseract", "eng")
        .with_scratch_dir(scratch_dir.clone());
    let extractor = PdfExtractor::new(PdfiumLibrary::default(), Some(Arc::new(engine)))
        .with_scratch_dir(scratch_dir);

    let out = extractor.extract(BLANK_PDF.as_bytes());
    match out.status {
        ExtractionStatus::Failed(reason) => assert!(reason.contains("cannot run"), "got: {reason}"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn engine_blank_image_has_no_text() {
    e2e_skip_unless_enabled!();

    let svc = service_at(&dead_url().await);
    assert!(
        svc.registry().is_available(DocumentKind::Image),
        "tesseract not found on PATH"
    );

    let img = image::RgbImage::from_pixel(200, 80, image::Rgb([255, 255, 255]));
    let mut png = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();

    let up = svc
        .upload(svc.new_session(), UploadedDocument::new("blank.png", png))
        .await;
    let result = &up.outcomes[0].result;
    assert_eq!(result.status, ExtractionStatus::Empty);
    assert_eq!(result.display_text(), "No text found in the image.");
}
