//! User-facing feedback: modal/notice text for the upload flow and fetches.
//!
//! Classification is cosmetic; it never drives recovery.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Success,
    Warning,
    Error,
}

/// Title, message and optional detail line shown in a modal or toast
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feedback {
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub details: Option<String>,
}

impl Feedback {
    fn new(severity: Severity, title: &str, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            severity,
            title: title.to_string(),
            message: message.into(),
            details,
        }
    }

    /// No PDF survived file-type filtering
    pub fn invalid_file_format() -> Self {
        Self::new(
            Severity::Error,
            "Invalid File Format",
            "Please select PDF files only. Other file formats are not supported.",
            Some("Only PDF files can be processed for transaction extraction".to_string()),
        )
    }

    /// Some, but not all, selected files were PDFs
    pub fn files_skipped(selected: usize, processing: usize) -> Self {
        Self::new(
            Severity::Warning,
            "Some Files Skipped",
            format!(
                "{} non-PDF files were skipped. Only PDF files will be processed.",
                selected.saturating_sub(processing)
            ),
            Some(format!(
                "Selected: {selected} files, Processing: {processing} PDF files"
            )),
        )
    }

    pub fn upload_succeeded(parsed_count: u64, files: &str) -> Self {
        Self::new(
            Severity::Success,
            "Upload Successful",
            format!("Successfully processed {parsed_count} transactions from {files}."),
            None,
        )
    }

    pub fn transactions_failed(reason: impl Into<String>) -> Self {
        Self::new(
            Severity::Error,
            "Failed to Load Transactions",
            "Failed to load transactions. Please try again.",
            Some(reason.into()),
        )
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Map an upload error message to modal text by substring.
///
/// The HTTP-status branches only match the generic `Upload failed: {code}`
/// message, i.e. when the backend sent no `detail`.
pub fn classify_upload_error(message: &str) -> Feedback {
    let message = if message.trim().is_empty() {
        "An unknown error occurred"
    } else {
        message
    };

    if message.contains("OPENAI_API_KEY") {
        return Feedback::new(
            Severity::Error,
            "Configuration Error",
            "The server is missing required AI configuration. Please contact your administrator.",
            Some("Missing OpenAI API key configuration on the server".to_string()),
        );
    }

    if message.contains("Upload failed: 500") {
        return Feedback::new(
            Severity::Error,
            "Server Error",
            "The server encountered an internal error while processing your files.",
            Some("HTTP 500 Internal Server Error".to_string()),
        );
    }

    if message.contains("Upload failed: 413") {
        return Feedback::new(
            Severity::Error,
            "File Too Large",
            "One or more files are too large. Please try with smaller PDF files.",
            Some("Request payload too large".to_string()),
        );
    }

    if message.contains("Upload failed: 400") {
        return Feedback::new(
            Severity::Error,
            "Invalid File Format",
            "Please ensure you're uploading valid PDF files only.",
            Some("Bad request - invalid file format".to_string()),
        );
    }

    Feedback::new(
        Severity::Error,
        "Upload Failed",
        "Failed to process your files. Please check your files and try again.",
        Some(message.to_string()),
    )
}
