//! spendboard-api: HTTP access to the statement backend and the upload
//! workflow built on top of it.

pub mod client;
pub mod error;
pub mod files;
pub mod retry;
pub mod upload;

pub use client::{ApiClient, HealthStatus, TransactionList, UploadResponse, DEFAULT_BASE_URL};
pub use error::{ApiError, Result};
pub use files::{read_files, PdfFile, SelectedFile, PDF_CONTENT_TYPE};
pub use retry::RetryPolicy;
pub use upload::{send_files, UploadOutcome, UploadState, UploadWorkflow, Uploader};
