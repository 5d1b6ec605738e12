use spendboard_api::{send_files, ApiClient, ApiError, RetryPolicy, SelectedFile, UploadResponse};
use spendboard_core::{DateRange, Transaction};
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone)]
pub enum WorkerRequest {
    Fetch { request_id: u64, range: DateRange },
    Upload { files: Vec<SelectedFile> },
}

#[derive(Debug)]
pub enum WorkerEvent {
    Fetched {
        request_id: u64,
        result: Result<Vec<Transaction>, String>,
    },
    Uploaded(Result<UploadResponse, ApiError>),
}

/// Serve dashboard requests until the UI drops its sender.
///
/// Requests run concurrently and are never cancelled; the UI keeps only the
/// fetch result whose `request_id` is the latest it issued.
pub async fn run_worker(
    client: ApiClient,
    policy: RetryPolicy,
    mut rx: mpsc::UnboundedReceiver<WorkerRequest>,
    tx: std::sync::mpsc::Sender<WorkerEvent>,
) {
    while let Some(req) = rx.recv().await {
        let client = client.clone();
        let tx2 = tx.clone();

        match req {
            WorkerRequest::Fetch { request_id, range } => {
                tokio::spawn(async move {
                    debug!("fetch #{request_id} for {} to {}", range.start, range.end);
                    let result = client
                        .get_transactions_with_retry(&range, &policy)
                        .await
                        .map(|list| list.transactions)
                        .map_err(|e| e.to_string());
                    let _ = tx2.send(WorkerEvent::Fetched { request_id, result });
                });
            }
            WorkerRequest::Upload { files } => {
                tokio::spawn(async move {
                    let result = send_files(&client, &files).await;
                    let _ = tx2.send(WorkerEvent::Uploaded(result));
                });
            }
        }
    }
}
