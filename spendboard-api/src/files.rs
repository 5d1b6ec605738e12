//! Local statement files picked for upload.

use futures_util::future::try_join_all;
use std::path::{Path, PathBuf};

use crate::error::{ApiError, Result};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// A file the user picked, with the content type a file picker would report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub name: String,
    pub content_type: &'static str,
}

impl SelectedFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let content_type = content_type_for(&path);
        Self {
            path,
            name,
            content_type,
        }
    }

    pub fn is_pdf(&self) -> bool {
        self.content_type == PDF_CONTENT_TYPE
    }
}

/// Statement bytes ready to be posted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Content type from the file extension (case-insensitive)
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => PDF_CONTENT_TYPE,
        "csv" => "text/csv",
        "txt" => "text/plain",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

/// Read all selected files concurrently
pub async fn read_files(files: &[SelectedFile]) -> Result<Vec<PdfFile>> {
    try_join_all(files.iter().map(|f| async move {
        let bytes = tokio::fs::read(&f.path).await.map_err(|source| ApiError::Io {
            path: f.path.clone(),
            source,
        })?;
        Ok::<_, ApiError>(PdfFile {
            name: f.name.clone(),
            bytes,
        })
    }))
    .await
}
