//! HTTP-level tests for the files service, run against a canned completion
//! backend.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use slate_files::search::{CompletionBackend, RelevantFile, SearchError, SearchVerdict};
use slate_files::{app, db, AppState};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Records every prompt it judges and returns a fixed verdict.
struct CannedBackend {
    prompts: Mutex<Vec<String>>,
    verdict: SearchVerdict,
}

impl CannedBackend {
    fn new(verdict: SearchVerdict) -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            verdict,
        }
    }
}

#[async_trait]
impl CompletionBackend for CannedBackend {
    async fn judge(&self, prompt: &str) -> Result<SearchVerdict, SearchError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.verdict.clone())
    }
}

fn verdict_for(filename: &str, answer: &str) -> SearchVerdict {
    SearchVerdict {
        answer: answer.to_string(),
        relevant_files: vec![RelevantFile {
            filename: filename.to_string(),
            match_reason: "contains the queried statement".to_string(),
            score: 0.95,
        }],
    }
}

struct TestService {
    _dir: tempfile::TempDir,
    uploads: std::path::PathBuf,
    backend: Arc<CannedBackend>,
    app: Router,
}

fn service_with(verdict: SearchVerdict) -> TestService {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("files.db");
    let pool = db::create_pool(db_path.to_str().unwrap()).unwrap();
    let backend = Arc::new(CannedBackend::new(verdict));
    let uploads = dir.path().join("uploads");

    let state = AppState {
        pool,
        upload_dir: uploads.to_string_lossy().into_owned(),
        backend: Arc::clone(&backend) as Arc<dyn CompletionBackend>,
    };

    TestService {
        _dir: dir,
        uploads,
        backend,
        app: app(state),
    }
}

fn service() -> TestService {
    service_with(verdict_for("unused.txt", "unused"))
}

const BOUNDARY: &str = "XSLATEBOUNDARY";

fn multipart_upload(filename: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_check_returns_ok() {
    let service = service();
    let response = service
        .app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn upload_then_list_then_fetch() {
    let service = service();

    let response = service
        .app
        .clone()
        .oneshot(multipart_upload("notes.txt", b"the whiteboard is green"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["filename"], "notes.txt");
    assert_eq!(json["message"], "File uploaded successfully");

    let response = service
        .app
        .clone()
        .oneshot(Request::builder().uri("/files").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json, serde_json::json!(["notes.txt"]));

    let response = service
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/uploads/notes.txt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/plain"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"the whiteboard is green");
}

#[tokio::test]
async fn upload_without_file_field_is_rejected() {
    let service = service();

    let body = format!("--{BOUNDARY}--\r\n");
    let response = service
        .app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn upload_selects_the_field_named_file() {
    let service = service();

    // A text part precedes the file part, as browser forms often send.
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"description\"\r\n\r\nlecture notes\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"notes.txt\"\r\nContent-Type: text/plain\r\n\r\nhello\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let response = service
        .app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["filename"], "notes.txt");
}

#[tokio::test]
async fn upload_with_empty_filename_is_rejected() {
    let service = service();
    let response = service
        .app
        .oneshot(multipart_upload("", b"content"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_with_empty_bytes_is_rejected() {
    let service = service();
    let response = service
        .app
        .oneshot(multipart_upload("empty.txt", b""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_filename_conflicts() {
    let service = service();

    let response = service
        .app
        .clone()
        .oneshot(multipart_upload("dup.txt", b"first"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = service
        .app
        .oneshot(multipart_upload("dup.txt", b"second"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // The rejected upload leaves nothing behind on disk.
    let stored: Vec<_> = std::fs::read_dir(&service.uploads)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert!(stored[0]
        .file_name()
        .to_string_lossy()
        .ends_with("_dup.txt"));
}

#[tokio::test]
async fn fetching_unknown_file_is_404() {
    let service = service();
    let response = service
        .app
        .oneshot(
            Request::builder()
                .uri("/uploads/ghost.txt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn search_without_query_is_rejected() {
    let service = service();
    let response = service
        .app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/search")
                .header("content-type", "application/json")
                .body(Body::from(r#"{}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn pdf_upload_is_searchable() {
    let answer = "The mitochondria is the powerhouse of the cell";
    let service = service_with(verdict_for("bio.pdf", answer));

    let pdf = format!(
        "%PDF-1.4\n1 0 obj\nstream\nBT ({answer}) Tj ET\nendstream\nendobj\n"
    );
    let response = service
        .app
        .clone()
        .oneshot(multipart_upload("bio.pdf", pdf.as_bytes()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = service
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/search")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"query":"what powers the cell?"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["query"], "what powers the cell?");
    assert!(!json["answer"].as_str().unwrap().is_empty());
    assert_eq!(json["relevantFiles"][0]["filename"], "bio.pdf");

    // The backend saw the PDF-derived extraction under its filename header.
    let prompts = service.backend.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("=== bio.pdf ==="));
    assert!(prompts[0].contains(answer));
}

#[tokio::test]
async fn unsupported_format_uploads_but_is_not_searched() {
    let service = service_with(verdict_for("none", "nothing matched"));

    let response = service
        .app
        .clone()
        .oneshot(multipart_upload("photo.png", &[137, 80, 78, 71, 13, 10]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = service
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/search")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"query":"anything"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // No extraction exists, so the prompt carries no document section.
    let prompts = service.backend.prompts.lock().unwrap();
    assert!(!prompts[0].contains("=== photo.png ==="));
}
