//! HTTP client for the statement backend.
//!
//! Endpoints:
//! - `GET  /transactions?start=YYYY-MM-DD&end=YYYY-MM-DD`
//! - `POST /upload` (multipart, repeated `files` field)
//! - `GET  /health`

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use spendboard_core::{DateRange, Transaction};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{ApiError, Result};
use crate::files::{PdfFile, PDF_CONTENT_TYPE};
use crate::retry::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionList {
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub total: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    pub import_id: String,
    pub parsed_count: u64,
    pub message: String,
    #[serde(default)]
    pub files_processed: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "ok"
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Transactions dated within `range` (inclusive)
    pub async fn get_transactions(&self, range: &DateRange) -> Result<TransactionList> {
        let url = self.url("/transactions");
        debug!("GET {url} start={} end={}", range.start_param(), range.end_param());

        let resp = self
            .http
            .get(&url)
            .query(&[("start", range.start_param()), ("end", range.end_param())])
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.clone(),
                source,
            })?;

        let list: TransactionList =
            decode(resp, &url, |status| format!("Failed to fetch transactions: {status}")).await?;
        debug!("received {} transactions", list.transactions.len());
        let outside = list
            .transactions
            .iter()
            .filter(|t| !range.contains(t.date))
            .count();
        if outside > 0 {
            warn!("{outside} transactions fall outside {} to {}", range.start, range.end);
        }
        Ok(list)
    }

    /// [`ApiClient::get_transactions`] with retries
    pub async fn get_transactions_with_retry(
        &self,
        range: &DateRange,
        policy: &RetryPolicy,
    ) -> Result<TransactionList> {
        policy
            .run("fetch transactions", move || self.get_transactions(range))
            .await
    }

    /// Post statement PDFs for extraction. Never retried.
    pub async fn upload_pdfs(&self, files: &[PdfFile]) -> Result<UploadResponse> {
        let url = self.url("/upload");
        let mut form = Form::new();
        for f in files {
            let part = Part::bytes(f.bytes.clone())
                .file_name(f.name.clone())
                .mime_str(PDF_CONTENT_TYPE)
                .map_err(|source| ApiError::Transport {
                    url: url.clone(),
                    source,
                })?;
            form = form.part("files", part);
        }
        debug!("POST {url} with {} file(s)", files.len());

        let resp = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.clone(),
                source,
            })?;

        let out: UploadResponse = decode(resp, &url, |status| format!("Upload failed: {status}")).await?;
        info!(
            "upload {} parsed {} transactions",
            out.import_id, out.parsed_count
        );
        Ok(out)
    }

    pub async fn health_check(&self) -> Result<HealthStatus> {
        let url = self.url("/health");
        debug!("GET {url}");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.clone(),
                source,
            })?;
        decode(resp, &url, |status| format!("Health check failed: {status}")).await
    }
}

/// Decode a 2xx JSON body, or turn the response into [`ApiError::Status`]
/// using the body's `detail` when present.
async fn decode<T: DeserializeOwned>(
    resp: Response,
    url: &str,
    fallback: impl FnOnce(u16) -> String,
) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let code = status.as_u16();
        let body = resp.text().await.unwrap_or_default();
        let message = error_detail(&body).unwrap_or_else(|| fallback(code));
        debug!("{url} returned {code}: {message}");
        return Err(ApiError::Status {
            status: code,
            message,
        });
    }

    resp.json::<T>().await.map_err(|source| ApiError::Decode {
        url: url.to_string(),
        source,
    })
}

/// `detail` from an error body; FastAPI sends a string, or a list for
/// validation errors.
fn error_detail(body: &str) -> Option<String> {
    let v: Value = serde_json::from_str(body).ok()?;
    match v.get("detail")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Null => None,
        Value::String(_) => None,
        other => Some(other.to_string()),
    }
}
