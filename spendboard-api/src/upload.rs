//! Statement upload workflow.
//!
//! ```text
//! Idle --begin--> Uploading --finish--> Success | Error
//!   ^                                        |
//!   +----------------- reset ----------------+
//! ```
//!
//! `begin` filters the selection down to PDFs. A selection with no PDF stays
//! `Idle` and queues an invalid-format notice without touching the network.
//! A successful upload asks for a transaction refetch and schedules the jump
//! back to the dashboard; an error is classified into modal text that closes
//! itself after a while.

use spendboard_core::{classify_upload_error, Feedback};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::client::{ApiClient, UploadResponse};
use crate::error::Result;
use crate::files::{read_files, PdfFile, SelectedFile};

/// Delay between a successful upload and the automatic return to the dashboard
pub const REDIRECT_DELAY: Duration = Duration::from_millis(3000);
/// How long the error modal stays up unless dismissed
pub const ERROR_MODAL_TIMEOUT: Duration = Duration::from_millis(5000);

/// Anything that can post statement PDFs. [`ApiClient`] in production.
pub trait Uploader {
    fn upload(&self, files: Vec<PdfFile>) -> impl Future<Output = Result<UploadResponse>> + Send;
}

impl Uploader for ApiClient {
    fn upload(&self, files: Vec<PdfFile>) -> impl Future<Output = Result<UploadResponse>> + Send {
        async move { self.upload_pdfs(&files).await }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub response: UploadResponse,
    pub feedback: Feedback,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UploadState {
    #[default]
    Idle,
    Uploading {
        files: Vec<String>,
    },
    Success(UploadOutcome),
    Error(Feedback),
}

impl UploadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Success(_) | UploadState::Error(_))
    }
}

#[derive(Debug, Default)]
pub struct UploadWorkflow {
    state: UploadState,
    notices: Vec<Feedback>,
    refetch_requested: bool,
    redirect_at: Option<Instant>,
    error_closes_at: Option<Instant>,
}

impl UploadWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn is_uploading(&self) -> bool {
        matches!(self.state, UploadState::Uploading { .. })
    }

    /// Start an upload for `selection`.
    ///
    /// Returns the PDFs to send, or `None` when nothing should be posted:
    /// no PDF in the selection, or an upload already in flight.
    pub fn begin(&mut self, selection: &[SelectedFile]) -> Option<Vec<SelectedFile>> {
        if self.is_uploading() {
            return None;
        }

        let pdfs: Vec<SelectedFile> = selection.iter().filter(|f| f.is_pdf()).cloned().collect();
        if pdfs.is_empty() {
            warn!("no PDF among {} selected file(s)", selection.len());
            self.notices.push(Feedback::invalid_file_format());
            return None;
        }
        if pdfs.len() < selection.len() {
            self.notices
                .push(Feedback::files_skipped(selection.len(), pdfs.len()));
        }

        self.redirect_at = None;
        self.error_closes_at = None;
        self.state = UploadState::Uploading {
            files: pdfs.iter().map(|f| f.name.clone()).collect(),
        };
        Some(pdfs)
    }

    /// Record the upload result. Ignored unless an upload is in flight.
    pub fn finish(&mut self, result: Result<UploadResponse>, now: Instant) -> &UploadState {
        let files = match &self.state {
            UploadState::Uploading { files } => files.join(", "),
            _ => return &self.state,
        };

        match result {
            Ok(response) => {
                let processed = response.files_processed.clone().unwrap_or(files);
                info!(
                    "import {} parsed {} transactions from {processed}",
                    response.import_id, response.parsed_count
                );
                let feedback = Feedback::upload_succeeded(response.parsed_count, &processed);
                self.refetch_requested = true;
                self.redirect_at = Some(now + REDIRECT_DELAY);
                self.state = UploadState::Success(UploadOutcome { response, feedback });
            }
            Err(e) => {
                warn!("upload failed: {e}");
                self.error_closes_at = Some(now + ERROR_MODAL_TIMEOUT);
                self.state = UploadState::Error(classify_upload_error(&e.to_string()));
            }
        }
        &self.state
    }

    /// Notices queued by [`UploadWorkflow::begin`], oldest first
    pub fn take_notices(&mut self) -> Vec<Feedback> {
        std::mem::take(&mut self.notices)
    }

    /// True once per successful upload
    pub fn take_refetch(&mut self) -> bool {
        std::mem::take(&mut self.refetch_requested)
    }

    /// True once when the scheduled dashboard redirect is due
    pub fn poll_redirect(&mut self, now: Instant) -> bool {
        match self.redirect_at {
            Some(at) if now >= at => {
                self.redirect_at = None;
                true
            }
            _ => false,
        }
    }

    /// Any user action before the redirect fires cancels it
    pub fn cancel_redirect(&mut self) {
        self.redirect_at = None;
    }

    pub fn redirect_pending(&self) -> bool {
        self.redirect_at.is_some()
    }

    /// Close the error modal once its timeout has passed. Returns true if it closed.
    pub fn poll_error_timeout(&mut self, now: Instant) -> bool {
        match self.error_closes_at {
            Some(at) if now >= at => {
                self.dismiss_error();
                true
            }
            _ => false,
        }
    }

    pub fn dismiss_error(&mut self) {
        self.error_closes_at = None;
        if matches!(self.state, UploadState::Error(_)) {
            self.state = UploadState::Idle;
        }
    }

    /// Back to `Idle` from a finished upload ("Upload More Files")
    pub fn reset(&mut self) {
        if self.state.is_terminal() {
            self.state = UploadState::Idle;
        }
        self.redirect_at = None;
        self.error_closes_at = None;
    }

    /// Drive a whole upload: filter, read, post, record.
    pub async fn run<U: Uploader>(&mut self, uploader: &U, selection: &[SelectedFile]) -> &UploadState {
        let Some(pdfs) = self.begin(selection) else {
            return &self.state;
        };
        let result = send_files(uploader, &pdfs).await;
        self.finish(result, Instant::now())
    }
}

/// Read the selected PDFs and post them in one request
pub async fn send_files<U: Uploader>(uploader: &U, pdfs: &[SelectedFile]) -> Result<UploadResponse> {
    let files = read_files(pdfs).await?;
    uploader.upload(files).await
}
