//! Input resolution: validate a request and turn it into one text string.
//!
//! A request carries pasted text, a file, or both. A file wins when present.
//! Files are accepted by extension only (`.txt` or `.pdf`, case-insensitive);
//! text files must be UTF-8 and PDFs go through [`crate::pipeline::extract`].
//! Content that is empty after extraction is rejected before any model call.

use crate::config::DEFAULT_SUBJECT;
use crate::error::FlashcardError;
use crate::pipeline::extract;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A document supplied with the request.
#[derive(Debug, Clone)]
pub enum SourceFile {
    /// A file on local disk.
    Path(PathBuf),
    /// An uploaded file held in memory.
    Upload { file_name: String, bytes: Vec<u8> },
}

impl SourceFile {
    /// The name used for type detection and error messages.
    pub fn name(&self) -> String {
        match self {
            SourceFile::Path(p) => p
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| p.display().to_string()),
            SourceFile::Upload { file_name, .. } => file_name.clone(),
        }
    }
}

/// One flashcard generation request.
#[derive(Debug, Clone, Default)]
pub struct FlashcardRequest {
    pub subject: String,
    pub text: Option<String>,
    pub file: Option<SourceFile>,
}

impl FlashcardRequest {
    pub fn from_text(subject: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            text: Some(text.into()),
            file: None,
        }
    }

    pub fn from_file(subject: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            subject: subject.into(),
            text: None,
            file: Some(SourceFile::Path(path.into())),
        }
    }

    pub fn from_upload(
        subject: impl Into<String>,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            subject: subject.into(),
            text: None,
            file: Some(SourceFile::Upload {
                file_name: file_name.into(),
                bytes,
            }),
        }
    }

    /// The subject to use, with blank subjects mapped to `"General"`.
    pub fn effective_subject(&self) -> String {
        let s = self.subject.trim();
        if s.is_empty() {
            DEFAULT_SUBJECT.to_string()
        } else {
            s.to_string()
        }
    }
}

/// Supported document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    Text,
    Pdf,
}

impl SourceKind {
    /// Detect the kind from a file name's extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" => Some(SourceKind::Text),
            "pdf" => Some(SourceKind::Pdf),
            _ => None,
        }
    }
}

/// Content extracted from a request, ready for chunking.
#[derive(Debug, Clone)]
pub struct Content {
    pub text: String,
    /// `None` when the content came from pasted text.
    pub kind: Option<SourceKind>,
    pub source_name: String,
}

/// Validate `request` and load its content.
///
/// # Errors
/// - [`FlashcardError::NoContent`] when neither text nor file is given
/// - [`FlashcardError::UnsupportedFileType`] for anything but `.txt` / `.pdf`
/// - [`FlashcardError::EmptyContent`] when nothing but whitespace was found
/// - I/O, UTF-8 and PDF extraction errors from reading the file
pub async fn resolve_content(
    request: &FlashcardRequest,
    pdfium_lib_path: Option<&Path>,
) -> Result<Content, FlashcardError> {
    let text = request.text.as_deref().filter(|t| !t.is_empty());

    let content = match (&request.file, text) {
        (Some(file), _) => load_file(file, pdfium_lib_path).await?,
        (None, Some(text)) => Content {
            text: text.to_string(),
            kind: None,
            source_name: "text input".to_string(),
        },
        (None, None) => return Err(FlashcardError::NoContent),
    };

    if content.text.trim().is_empty() {
        return Err(FlashcardError::EmptyContent {
            source_name: content.source_name,
        });
    }

    info!(
        "Resolved {} characters from {}",
        content.text.chars().count(),
        content.source_name
    );
    Ok(content)
}

async fn load_file(
    file: &SourceFile,
    pdfium_lib_path: Option<&Path>,
) -> Result<Content, FlashcardError> {
    let source_name = file.name();
    let kind = SourceKind::from_file_name(&source_name).ok_or_else(|| {
        FlashcardError::UnsupportedFileType {
            file_name: source_name.clone(),
        }
    })?;

    let bytes = match file {
        SourceFile::Path(path) => read_local(path).await?,
        SourceFile::Upload { bytes, .. } => bytes.clone(),
    };
    debug!("Loaded {} bytes from {}", bytes.len(), source_name);

    let text = match kind {
        SourceKind::Text => String::from_utf8(bytes).map_err(|_| FlashcardError::InvalidUtf8 {
            source_name: source_name.clone(),
        })?,
        SourceKind::Pdf => extract::extract_pdf_text(bytes, &source_name, pdfium_lib_path).await?,
    };

    Ok(Content {
        text,
        kind: Some(kind),
        source_name,
    })
}

async fn read_local(path: &Path) -> Result<Vec<u8>, FlashcardError> {
    tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => FlashcardError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => FlashcardError::FileNotFound {
            path: path.to_path_buf(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_detection() {
        assert_eq!(SourceKind::from_file_name("notes.txt"), Some(SourceKind::Text));
        assert_eq!(SourceKind::from_file_name("Paper.PDF"), Some(SourceKind::Pdf));
        assert_eq!(SourceKind::from_file_name("slides.pptx"), None);
        assert_eq!(SourceKind::from_file_name("README"), None);
        assert_eq!(SourceKind::from_file_name(".txt"), None);
    }

    #[test]
    fn test_effective_subject() {
        assert_eq!(FlashcardRequest::from_text("", "x").effective_subject(), "General");
        assert_eq!(FlashcardRequest::from_text("  ", "x").effective_subject(), "General");
        assert_eq!(
            FlashcardRequest::from_text(" Biology ", "x").effective_subject(),
            "Biology"
        );
    }

    #[tokio::test]
    async fn no_text_and_no_file_is_rejected() {
        let req = FlashcardRequest {
            subject: "S".into(),
            text: Some(String::new()),
            file: None,
        };
        assert!(matches!(
            resolve_content(&req, None).await,
            Err(FlashcardError::NoContent)
        ));
    }

    #[tokio::test]
    async fn unsupported_upload_is_rejected() {
        let req = FlashcardRequest::from_upload("S", "notes.docx", b"hello".to_vec());
        assert!(matches!(
            resolve_content(&req, None).await,
            Err(FlashcardError::UnsupportedFileType { .. })
        ));
    }

    #[tokio::test]
    async fn whitespace_only_text_is_empty_content() {
        let req = FlashcardRequest::from_text("S", " \n\t ");
        assert!(matches!(
            resolve_content(&req, None).await,
            Err(FlashcardError::EmptyContent { .. })
        ));
    }

    #[tokio::test]
    async fn pasted_text_is_used_verbatim() {
        let req = FlashcardRequest::from_text("S", "  Cells divide. ");
        let content = resolve_content(&req, None).await.unwrap();
        assert_eq!(content.text, "  Cells divide. ");
        assert_eq!(content.kind, None);
    }

    #[tokio::test]
    async fn file_takes_precedence_over_text() {
        let req = FlashcardRequest {
            subject: "S".into(),
            text: Some("pasted".into()),
            file: Some(SourceFile::Upload {
                file_name: "notes.txt".into(),
                bytes: "from file".as_bytes().to_vec(),
            }),
        };
        let content = resolve_content(&req, None).await.unwrap();
        assert_eq!(content.text, "from file");
        assert_eq!(content.kind, Some(SourceKind::Text));
        assert_eq!(content.source_name, "notes.txt");
    }

    #[tokio::test]
    async fn txt_must_be_utf8() {
        let req = FlashcardRequest::from_upload("S", "bad.txt", vec![0xff, 0xfe, 0x00]);
        assert!(matches!(
            resolve_content(&req, None).await,
            Err(FlashcardError::InvalidUtf8 { .. })
        ));
    }

    #[tokio::test]
    async fn local_txt_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "Photosynthesis uses light.").unwrap();
        let content = resolve_content(&FlashcardRequest::from_file("Bio", &path), None)
            .await
            .unwrap();
        assert_eq!(content.text, "Photosynthesis uses light.");
    }

    #[tokio::test]
    async fn missing_local_file() {
        let req = FlashcardRequest::from_file("S", "/definitely/not/here.txt");
        assert!(matches!(
            resolve_content(&req, None).await,
            Err(FlashcardError::FileNotFound { .. })
        ));
    }
}
