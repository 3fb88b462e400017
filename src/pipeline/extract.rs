//! PDF text extraction via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which uses thread-local
//! state and blocks while parsing. `tokio::task::spawn_blocking` keeps that
//! work off the async worker threads.
//!
//! Pages are read in order and joined with single spaces; pages whose text
//! layer is empty (scans, blank separators) are skipped. Any pdfium failure
//! is a hard error rather than text fed to the model.

use crate::error::FlashcardError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit pdfium library file.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Extract the text layer of an in-memory PDF.
pub async fn extract_pdf_text(
    bytes: Vec<u8>,
    source_name: &str,
    lib_path: Option<&Path>,
) -> Result<String, FlashcardError> {
    let name = source_name.to_string();
    let lib = lib_path.map(Path::to_path_buf);

    tokio::task::spawn_blocking(move || extract_blocking(bytes, &name, lib.as_deref()))
        .await
        .map_err(|e| FlashcardError::Internal(format!("Extraction task panicked: {}", e)))?
}

fn extract_blocking(
    bytes: Vec<u8>,
    source_name: &str,
    lib_path: Option<&Path>,
) -> Result<String, FlashcardError> {
    let pdfium = bind_pdfium(lib_path)?;

    let document = pdfium
        .load_pdf_from_byte_vec(bytes, None)
        .map_err(|e| FlashcardError::ExtractionFailed {
            source_name: source_name.to_string(),
            detail: format!("{:?}", e),
        })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF '{}' loaded: {} pages", source_name, total_pages);

    let mut texts = Vec::with_capacity(total_pages);
    for (idx, page) in pages.iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| FlashcardError::ExtractionFailed {
                source_name: source_name.to_string(),
                detail: format!("page {}: {:?}", idx + 1, e),
            })?
            .all();

        if text.trim().is_empty() {
            debug!("Page {}: no extractable text, skipped", idx + 1);
            continue;
        }
        texts.push(text);
    }

    Ok(join_pages(&texts))
}

/// Join per-page text with single spaces.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Bind to pdfium: explicit path, then `PDFIUM_LIB_PATH`, then the system library.
fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, FlashcardError> {
    let explicit = lib_path.map(Path::to_path_buf).or_else(|| {
        std::env::var_os(PDFIUM_LIB_PATH_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    });

    let bindings = match explicit {
        Some(path) => {
            let path = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            debug!("Binding pdfium from {}", path.display());
            Pdfium::bind_to_library(&path)
        }
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| FlashcardError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_joined_with_single_space() {
        assert_eq!(join_pages(&["Page one.", "Page two."]), "Page one. Page two.");
        assert_eq!(join_pages::<&str>(&[]), "");
    }

    #[tokio::test]
    async fn missing_library_is_binding_error() {
        let err = extract_pdf_text(
            b"%PDF-1.4".to_vec(),
            "doc.pdf",
            Some(Path::new("/definitely/not/libpdfium.so")),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, FlashcardError::PdfiumBindingFailed(_)));
    }

    macro_rules! skip_without_pdfium {
        () => {
            if std::env::var_os(PDFIUM_LIB_PATH_ENV).map_or(true, |v| v.is_empty()) {
                println!("SKIP: set {} to run pdfium tests", PDFIUM_LIB_PATH_ENV);
                return;
            }
        };
    }

    /// Two-page PDF: page 1 has no content stream, page 2 shows `text`.
    fn blank_then_text_pdf(text: &str) -> Vec<u8> {
        let stream = format!("BT /F1 12 Tf 20 100 Td ({}) Tj ET", text);
        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 300 200] >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 300 200] \
             /Resources << /Font << /F1 5 0 R >> >> /Contents 6 0 R >>"
                .to_string(),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
            format!("<< /Length {} >>\nstream\n{}\nendstream", stream.len(), stream),
        ];

        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }
        let xref_at = pdf.len();
        pdf.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
        for offset in offsets {
            pdf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        pdf.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                objects.len() + 1,
                xref_at
            )
            .as_bytes(),
        );
        pdf
    }

    #[tokio::test]
    async fn unreadable_bytes_are_extraction_error() {
        skip_without_pdfium!();
        let err = extract_pdf_text(b"this is not a pdf".to_vec(), "notes.pdf", None)
            .await
            .unwrap_err();
        match err {
            FlashcardError::ExtractionFailed { source_name, .. } => {
                assert_eq!(source_name, "notes.pdf")
            }
            other => panic!("expected ExtractionFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn blank_pages_are_skipped() {
        skip_without_pdfium!();
        let pdf = blank_then_text_pdf("Plants make sugar.");
        let text = extract_pdf_text(pdf, "plants.pdf", None).await.unwrap();
        assert!(!text.starts_with(' '), "blank page left a separator: {text:?}");
        assert_eq!(text.trim(), "Plants make sugar.");
    }
}
