//! End-to-end tests for the API client against an in-process mock backend.
//!
//! Run with: cargo test -p spendboard-api --test client

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use spendboard_api::{
    ApiClient, ApiError, RetryPolicy, SelectedFile, UploadState, UploadWorkflow,
};
use spendboard_core::{Category, DateRange, RangePreset};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

// ============================================================================
// Mock backend
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
enum UploadMode {
    #[default]
    Ok,
    /// 413 with an empty body
    TooLarge,
    /// 400 with a `detail` string
    Rejected,
    /// 500 naming the missing key
    MissingKey,
}

#[derive(Debug, Clone, PartialEq)]
struct ReceivedPart {
    field: String,
    file_name: Option<String>,
    content_type: Option<String>,
    len: usize,
}

#[derive(Default)]
struct Recorded {
    transaction_queries: Vec<HashMap<String, String>>,
    /// Number of leading `/transactions` calls that answer 503
    fail_first: usize,
    upload_mode: UploadMode,
    uploads: Vec<Vec<ReceivedPart>>,
    healthy: bool,
}

type Shared = Arc<Mutex<Recorded>>;

struct MockBackend {
    addr: SocketAddr,
    state: Shared,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockBackend {
    async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(Recorded {
            healthy: true,
            ..Recorded::default()
        }));

        let app = Router::new()
            .route("/transactions", get(handle_transactions))
            .route("/upload", post(handle_upload))
            .route("/health", get(handle_health))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn client(&self) -> ApiClient {
        ApiClient::new(&self.url(), Duration::from_secs(5)).unwrap()
    }

    fn with<R>(&self, f: impl FnOnce(&mut Recorded) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn handle_transactions(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mut rec = state.lock().unwrap();
    rec.transaction_queries.push(params);
    if rec.transaction_queries.len() <= rec.fail_first {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    Json(json!({
        "transactions": [
            {
                "id": "txn_1",
                "date": "2024-03-01",
                "amount": 15000000,
                "merchant_canonical": "PT Maju",
                "description_raw": "GAJI MARET",
                "category": "Income",
                "is_recurring": true,
                "recurring_frequency": "monthly"
            },
            {
                "id": "txn_2",
                "date": "2024-03-05",
                "amount": -85000,
                "merchant_canonical": "Kopi Kenangan",
                "description_raw": "QRIS KOPI KENANGAN",
                "category": "Food & Dining",
                "is_recurring": false,
                "source": { "file": "bca_march.pdf" }
            },
            {
                "id": "txn_3",
                "date": "2024-03-09",
                "amount": -42000,
                "merchant_canonical": "Somewhere",
                "description_raw": "TRF",
                "category": "Gifts",
                "is_recurring": false
            }
        ],
        "total": 3
    }))
    .into_response()
}

async fn handle_upload(State(state): State<Shared>, mut multipart: Multipart) -> Response {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let len = field.bytes().await.unwrap().len();
        parts.push(ReceivedPart {
            field: field_name,
            file_name,
            content_type,
            len,
        });
    }

    let mut rec = state.lock().unwrap();
    let count = parts.len();
    rec.uploads.push(parts);

    match rec.upload_mode {
        UploadMode::Ok => Json(json!({
            "success": true,
            "import_id": "imp_20240315",
            "parsed_count": 17 * count,
            "message": format!("Processed {count} file(s)"),
        }))
        .into_response(),
        UploadMode::TooLarge => StatusCode::PAYLOAD_TOO_LARGE.into_response(),
        UploadMode::Rejected => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "File scan.pdf is password protected" })),
        )
            .into_response(),
        UploadMode::MissingKey => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": "OPENAI_API_KEY is not set" })),
        )
            .into_response(),
    }
}

async fn handle_health(State(state): State<Shared>) -> Response {
    if state.lock().unwrap().healthy {
        Json(json!({ "status": "ok" })).into_response()
    } else {
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

fn march() -> DateRange {
    RangePreset::ThisMonth.resolve(chrono::NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
}

fn fast_retries(retries: u32) -> RetryPolicy {
    RetryPolicy {
        retries,
        initial_backoff: Duration::from_millis(5),
        max_backoff: Duration::from_millis(20),
    }
}

fn pdf(dir: &std::path::Path, name: &str, bytes: &[u8]) -> SelectedFile {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    SelectedFile::from_path(path)
}

// ============================================================================
// Transactions
// ============================================================================

#[tokio::test]
async fn test_transactions_sends_range_as_query() {
    let server = MockBackend::start().await;
    let list = server.client().get_transactions(&march()).await.unwrap();

    let queries = server.with(|r| r.transaction_queries.clone());
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].get("start").map(String::as_str), Some("2024-03-01"));
    assert_eq!(queries[0].get("end").map(String::as_str), Some("2024-03-31"));

    assert_eq!(list.total, Some(3));
    assert_eq!(list.transactions.len(), 3);
    assert_eq!(list.transactions[1].category, Category::FoodDining);
    assert_eq!(
        list.transactions[1].source.as_ref().map(|s| s.file.as_str()),
        Some("bca_march.pdf")
    );
    // unrecognised label degrades instead of failing the response
    assert_eq!(list.transactions[2].category, Category::Other);
}

#[tokio::test]
async fn test_transactions_retry_until_success() {
    let server = MockBackend::start().await;
    server.with(|r| r.fail_first = 2);

    let list = server
        .client()
        .get_transactions_with_retry(&march(), &fast_retries(3))
        .await
        .unwrap();

    assert_eq!(list.transactions.len(), 3);
    assert_eq!(server.with(|r| r.transaction_queries.len()), 3);
}

#[tokio::test]
async fn test_transactions_give_up_after_four_attempts() {
    let server = MockBackend::start().await;
    server.with(|r| r.fail_first = 10);

    let err = server
        .client()
        .get_transactions_with_retry(&march(), &fast_retries(3))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert_eq!(err.to_string(), "Failed to fetch transactions: 503");
    assert_eq!(server.with(|r| r.transaction_queries.len()), 4);
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let server = MockBackend::start().await;
    let url = server.url();
    drop(server);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let client = ApiClient::new(&url, Duration::from_secs(2)).unwrap();
    let err = client.get_transactions(&march()).await.unwrap_err();
    assert!(matches!(err, ApiError::Transport { .. }), "got {err:?}");
}

// ============================================================================
// Upload
// ============================================================================

#[tokio::test]
async fn test_upload_posts_repeated_files_field() {
    let server = MockBackend::start().await;
    let dir = tempfile::tempdir().unwrap();
    let selection = vec![
        pdf(dir.path(), "bca_jan.pdf", b"%PDF-1.4 january"),
        pdf(dir.path(), "readme.txt", b"not a statement"),
        pdf(dir.path(), "bca_feb.pdf", b"%PDF-1.4 feb"),
    ];

    let client = server.client();
    let mut wf = UploadWorkflow::new();
    let state = wf.run(&client, &selection).await.clone();

    let uploads = server.with(|r| r.uploads.clone());
    assert_eq!(uploads.len(), 1);
    let parts = &uploads[0];
    assert_eq!(parts.len(), 2);
    assert!(parts.iter().all(|p| p.field == "files"));
    assert!(parts
        .iter()
        .all(|p| p.content_type.as_deref() == Some("application/pdf")));
    assert_eq!(parts[0].file_name.as_deref(), Some("bca_jan.pdf"));
    assert_eq!(parts[1].file_name.as_deref(), Some("bca_feb.pdf"));
    assert_eq!(parts[0].len, b"%PDF-1.4 january".len());

    match state {
        UploadState::Success(out) => {
            assert_eq!(out.response.parsed_count, 34);
            assert_eq!(out.response.import_id, "imp_20240315");
        }
        other => panic!("expected success, got {other:?}"),
    }
    assert_eq!(wf.take_notices().len(), 1);
    assert!(wf.take_refetch());
}

#[tokio::test]
async fn test_upload_413_without_detail_uses_fallback_message() {
    let server = MockBackend::start().await;
    server.with(|r| r.upload_mode = UploadMode::TooLarge);
    let dir = tempfile::tempdir().unwrap();
    let files = spendboard_api::read_files(&[pdf(dir.path(), "huge.pdf", b"%PDF")])
        .await
        .unwrap();

    let err = server.client().upload_pdfs(&files).await.unwrap_err();
    assert_eq!(err.status(), Some(413));
    assert_eq!(err.to_string(), "Upload failed: 413");
}

#[tokio::test]
async fn test_upload_detail_becomes_message() {
    let server = MockBackend::start().await;
    server.with(|r| r.upload_mode = UploadMode::Rejected);
    let dir = tempfile::tempdir().unwrap();

    let client = server.client();
    let mut wf = UploadWorkflow::new();
    match wf.run(&client, &[pdf(dir.path(), "scan.pdf", b"%PDF")]).await {
        UploadState::Error(fb) => {
            assert_eq!(fb.title, "Upload Failed");
            assert_eq!(fb.details.as_deref(), Some("File scan.pdf is password protected"));
        }
        other => panic!("expected error, got {other:?}"),
    }
    // upload is never retried
    assert_eq!(server.with(|r| r.uploads.len()), 1);
}

#[tokio::test]
async fn test_upload_missing_key_is_configuration_error() {
    let server = MockBackend::start().await;
    server.with(|r| r.upload_mode = UploadMode::MissingKey);
    let dir = tempfile::tempdir().unwrap();

    let client = server.client();
    let mut wf = UploadWorkflow::new();
    match wf.run(&client, &[pdf(dir.path(), "a.pdf", b"%PDF")]).await {
        UploadState::Error(fb) => assert_eq!(fb.title, "Configuration Error"),
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_non_pdf_selection_never_reaches_backend() {
    let server = MockBackend::start().await;
    let dir = tempfile::tempdir().unwrap();

    let client = server.client();
    let mut wf = UploadWorkflow::new();
    wf.run(&client, &[pdf(dir.path(), "export.csv", b"a,b")]).await;

    assert_eq!(wf.state(), &UploadState::Idle);
    assert!(server.with(|r| r.uploads.is_empty()));
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_ok() {
    let server = MockBackend::start().await;
    let health = server.client().health_check().await.unwrap();
    assert!(health.is_healthy());
}

#[tokio::test]
async fn test_health_failure_message() {
    let server = MockBackend::start().await;
    server.with(|r| r.healthy = false);
    let err = server.client().health_check().await.unwrap_err();
    assert_eq!(err.to_string(), "Health check failed: 500");
}
