//! Document text extraction: turns an uploaded résumé file into plain text.
//!
//! PDFs go through `pdf-extract` on a blocking thread; UTF-8 text passes through.

pub mod handlers;

use bytes::Bytes;
use tracing::{info, warn};

use crate::errors::AppError;

/// Upload ceiling for `/api/extract-text`.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const PDF_MAGIC: &[u8] = b"%PDF-";

const EMPTY_TEXT_MESSAGE: &str =
    "No text could be extracted from the file. Please paste your résumé text manually.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    PlainText,
}

pub fn detect_kind(file_name: Option<&str>, data: &[u8]) -> DocumentKind {
    let named_pdf = file_name
        .map(|n| n.to_ascii_lowercase().ends_with(".pdf"))
        .unwrap_or(false);
    if data.starts_with(PDF_MAGIC) || named_pdf {
        DocumentKind::Pdf
    } else {
        DocumentKind::PlainText
    }
}

fn unreadable_pdf(cause: &dyn std::fmt::Display) -> AppError {
    warn!("PDF extraction failed: {cause}");
    AppError::Validation(format!("Could not read PDF file. {EMPTY_TEXT_MESSAGE}"))
}

/// Extracts trimmed text from an uploaded document.
pub async fn extract_text(file_name: Option<&str>, data: Bytes) -> Result<String, AppError> {
    let kind = detect_kind(file_name, &data);
    info!("Extracting text from {:?} upload ({} bytes)", kind, data.len());

    let text = match kind {
        DocumentKind::Pdf => {
            // pdf-extract is CPU-bound and can panic on damaged files.
            let parsed =
                tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data)).await;
            match parsed {
                Ok(Ok(text)) => text,
                Ok(Err(e)) => return Err(unreadable_pdf(&e)),
                Err(e) => return Err(unreadable_pdf(&e)),
            }
        }
        DocumentKind::PlainText => String::from_utf8(data.to_vec()).map_err(|_| {
            AppError::Validation("Unsupported file type. Upload a PDF or a UTF-8 text file.".into())
        })?,
    };

    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::Validation(EMPTY_TEXT_MESSAGE.into()));
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_detected_by_magic_or_name() {
        assert_eq!(detect_kind(None, b"%PDF-1.7\n..."), DocumentKind::Pdf);
        assert_eq!(detect_kind(Some("CV.PDF"), b"whatever"), DocumentKind::Pdf);
        assert_eq!(
            detect_kind(Some("resume.txt"), b"Jane Roe"),
            DocumentKind::PlainText
        );
    }

    #[tokio::test]
    async fn test_plain_text_is_trimmed() {
        let text = extract_text(Some("resume.txt"), Bytes::from_static(b"\n  Jane Roe\nEngineer \n"))
            .await
            .unwrap();
        assert_eq!(text, "Jane Roe\nEngineer");
    }

    #[tokio::test]
    async fn test_blank_text_asks_for_manual_paste() {
        let err = extract_text(None, Bytes::from_static(b"   \n\t"))
            .await
            .unwrap_err();
        match err {
            AppError::Validation(msg) => assert!(msg.contains("paste your résumé text manually")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_utf8_text_is_rejected() {
        let err = extract_text(Some("resume.doc"), Bytes::from_static(&[0xff, 0xfe, 0x00, 0x41]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_damaged_pdf_is_a_validation_error() {
        let err = extract_text(Some("resume.pdf"), Bytes::from_static(b"%PDF-1.4 truncated"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
