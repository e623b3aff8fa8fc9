use thiserror::Error;

/// Telegram bots cannot download files above this size.
pub const MAX_DOCUMENT_BYTES: u32 = 20 * 1024 * 1024;

pub const PDF_MIME: &str = "application/pdf";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Only PDF documents are supported.")]
    NotPdf,
    #[error("The document is too large ({0} bytes), the limit is 20 MB.")]
    TooLarge(u32),
    #[error("Could not download the document: {0}")]
    Download(String),
    #[error("Could not read the document: {0}")]
    Unreadable(String),
    #[error("The document contains no text.")]
    Empty,
}

/// Extracts the text of every page of a PDF, pages joined in order.
pub fn extract_text(bytes: &[u8]) -> Result<String, DocumentError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| DocumentError::Unreadable(e.to_string()))?;

    if text.trim().is_empty() {
        return Err(DocumentError::Empty);
    }

    Ok(text.trim().to_string())
}

/// Only PDF documents are accepted, recognized by MIME type or file name.
pub fn is_pdf(mime_type: Option<&str>, file_name: Option<&str>) -> bool {
    match mime_type {
        Some(mime) => mime.eq_ignore_ascii_case(PDF_MIME),
        None => file_name.map_or(false, |name| name.to_lowercase().ends_with(".pdf")),
    }
}
