//! Document Loader: turns an uploaded PDF or DOCX into plain text.
//!
//! The upload is written to a scoped temp file that the converter reads by path.
//! The async side owns the file and removes it once the conversion settles or the
//! timeout fires, whether the converter succeeded, failed or panicked.

use std::fmt;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use quick_xml::events::Event;
use quick_xml::Reader;
use tempfile::NamedTempFile;
use tracing::{debug, error, warn};

use crate::extraction::ExtractionError;

/// Upload formats the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Case-insensitive match on a bare extension (`"PDF"`, `"docx"`).
    pub fn from_extension(extension: &str) -> Result<Self, ExtractionError> {
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Ok(DocumentFormat::Pdf),
            "docx" => Ok(DocumentFormat::Docx),
            other => Err(ExtractionError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Format from the extension of a file name such as `"cv.final.PDF"`.
    pub fn from_file_name(file_name: &str) -> Result<Self, ExtractionError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_extension(extension)
    }

    pub fn extension(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Converts a document on disk to plain text. Runs on the blocking pool.
pub trait DocumentConverter: Send + Sync {
    fn parse(&self, path: &Path) -> Result<String, String>;
}

/// PDF text via `pdf-extract`. Pages are joined with single spaces.
pub struct PdfConverter;

impl DocumentConverter for PdfConverter {
    fn parse(&self, path: &Path) -> Result<String, String> {
        let text = pdf_extract::extract_text(path).map_err(|e| e.to_string())?;
        Ok(join_nonempty(text.split('\u{c}')))
    }
}

/// DOCX text from `word/document.xml`: one entry per `w:p` paragraph.
pub struct DocxConverter;

impl DocumentConverter for DocxConverter {
    fn parse(&self, path: &Path) -> Result<String, String> {
        let file = std::fs::File::open(path).map_err(|e| e.to_string())?;
        let mut archive = zip::ZipArchive::new(file).map_err(|e| e.to_string())?;
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .map_err(|e| e.to_string())?
            .read_to_string(&mut xml)
            .map_err(|e| e.to_string())?;
        let paragraphs = docx_paragraphs(&xml)?;
        Ok(join_nonempty(paragraphs.iter().map(String::as_str)))
    }
}

fn docx_paragraphs(xml: &str) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text = true,
            Event::End(e) if e.name().as_ref() == b"w:t" => in_text = false,
            Event::Text(t) if in_text => {
                current.push_str(&t.unescape().map_err(|e| e.to_string())?);
            }
            Event::Empty(e) if e.name().as_ref() == b"w:tab" => current.push('\t'),
            Event::Empty(e) if e.name().as_ref() == b"w:br" => current.push(' '),
            Event::End(e) if e.name().as_ref() == b"w:p" => {
                paragraphs.push(std::mem::take(&mut current));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }
    Ok(paragraphs)
}

fn join_nonempty<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Dispatches uploads to the converter for their format.
#[derive(Clone)]
pub struct DocumentLoader {
    pdf: Arc<dyn DocumentConverter>,
    docx: Arc<dyn DocumentConverter>,
    scratch_dir: Option<PathBuf>,
    timeout: Duration,
}

impl DocumentLoader {
    pub fn new(
        pdf: Arc<dyn DocumentConverter>,
        docx: Arc<dyn DocumentConverter>,
        scratch_dir: Option<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            pdf,
            docx,
            scratch_dir,
            timeout,
        }
    }

    /// Loader backed by `pdf-extract` and the DOCX reader.
    pub fn standard(scratch_dir: Option<PathBuf>, timeout: Duration) -> Self {
        Self::new(
            Arc::new(PdfConverter),
            Arc::new(DocxConverter),
            scratch_dir,
            timeout,
        )
    }

    /// Extracts plain text from `content`. Unsupported extensions are rejected
    /// before anything touches the filesystem.
    pub async fn load(&self, content: &[u8], extension: &str) -> Result<String, ExtractionError> {
        let format = DocumentFormat::from_extension(extension)?;
        let converter = match format {
            DocumentFormat::Pdf => Arc::clone(&self.pdf),
            DocumentFormat::Docx => Arc::clone(&self.docx),
        };

        let temp_path = self
            .scoped_temp_file(format, content)
            .map_err(|e| ExtractionError::DocumentLoadFailure(format!("temp file: {e}")))?
            .into_temp_path();
        debug!(path = %temp_path.display(), %format, "Parsing uploaded document");

        let path = temp_path.to_path_buf();
        let task = tokio::task::spawn_blocking(move || converter.parse(&path));
        let outcome = tokio::time::timeout(self.timeout, task).await;

        // Removed here on every outcome; a timed-out converter may still be running.
        if let Err(e) = temp_path.close() {
            warn!("Failed to remove upload temp file: {e}");
        }

        match outcome {
            Err(_) => Err(ExtractionError::UpstreamTimeout {
                stage: "document conversion",
                after: self.timeout,
            }),
            Ok(Err(join_error)) => {
                error!("Document converter task failed: {join_error}");
                Err(ExtractionError::DocumentLoadFailure(join_error.to_string()))
            }
            Ok(Ok(Err(message))) => {
                error!("Error loading {format} document: {message}");
                Err(ExtractionError::DocumentLoadFailure(message))
            }
            Ok(Ok(Ok(text))) => Ok(text),
        }
    }

    fn scoped_temp_file(
        &self,
        format: DocumentFormat,
        content: &[u8],
    ) -> std::io::Result<NamedTempFile> {
        let suffix = format!(".{}", format.extension());
        let mut builder = tempfile::Builder::new();
        builder.prefix("upload-").suffix(&suffix);
        let mut file = match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(content)?;
        file.flush()?;
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records the path it was handed and whether the file existed at that point.
    struct RecordingConverter {
        result: Result<String, String>,
        seen: Mutex<Option<(PathBuf, bool)>>,
    }

    impl RecordingConverter {
        fn new(result: Result<String, String>) -> Arc<Self> {
            Arc::new(Self {
                result,
                seen: Mutex::new(None),
            })
        }
    }

    impl DocumentConverter for RecordingConverter {
        fn parse(&self, path: &Path) -> Result<String, String> {
            *self.seen.lock().unwrap() = Some((path.to_path_buf(), path.exists()));
            self.result.clone()
        }
    }

    struct PanickingConverter;

    /// Holds the blocking thread well past any test timeout.
    struct SlowConverter(Duration);

    impl DocumentConverter for SlowConverter {
        fn parse(&self, _: &Path) -> Result<String, String> {
            std::thread::sleep(self.0);
            Ok("too late".to_string())
        }
    }

    impl DocumentConverter for PanickingConverter {
        fn parse(&self, _: &Path) -> Result<String, String> {
            panic!("converter blew up");
        }
    }

    fn loader_in(dir: &Path, converter: Arc<dyn DocumentConverter>) -> DocumentLoader {
        DocumentLoader::new(
            Arc::clone(&converter),
            converter,
            Some(dir.to_path_buf()),
            Duration::from_secs(5),
        )
    }

    fn dir_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[test]
    fn test_format_from_extension_is_case_insensitive() {
        assert_eq!(DocumentFormat::from_extension("PDF").unwrap(), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::from_extension("Docx").unwrap(), DocumentFormat::Docx);
        assert!(matches!(
            DocumentFormat::from_extension("doc"),
            Err(ExtractionError::UnsupportedFormat(ext)) if ext == "doc"
        ));
    }

    #[test]
    fn test_format_from_file_name() {
        assert_eq!(
            DocumentFormat::from_file_name("cv.final.PDF").unwrap(),
            DocumentFormat::Pdf
        );
        assert!(DocumentFormat::from_file_name("resume").is_err());
    }

    #[tokio::test]
    async fn test_successful_load_removes_temp_file() {
        let scratch = tempfile::tempdir().unwrap();
        let recorder = RecordingConverter::new(Ok("Ada Lovelace".to_string()));
        let loader = loader_in(scratch.path(), recorder.clone());

        let text = loader.load(b"%PDF-1.4", "pdf").await.unwrap();

        assert_eq!(text, "Ada Lovelace");
        let (path, existed) = recorder.seen.lock().unwrap().clone().unwrap();
        assert!(existed, "converter must see the uploaded bytes on disk");
        assert_eq!(path.extension().unwrap(), "pdf");
        assert!(!path.exists());
        assert!(dir_is_empty(scratch.path()));
    }

    #[tokio::test]
    async fn test_failed_load_removes_temp_file() {
        let scratch = tempfile::tempdir().unwrap();
        let recorder = RecordingConverter::new(Err("corrupt xref table".to_string()));
        let loader = loader_in(scratch.path(), recorder.clone());

        let err = loader.load(b"garbage", "docx").await.unwrap_err();

        assert!(matches!(err, ExtractionError::DocumentLoadFailure(ref m) if m.contains("xref")));
        assert!(dir_is_empty(scratch.path()));
    }

    #[tokio::test]
    async fn test_panicking_converter_removes_temp_file() {
        let scratch = tempfile::tempdir().unwrap();
        let loader = loader_in(scratch.path(), Arc::new(PanickingConverter));

        let err = loader.load(b"%PDF", "pdf").await.unwrap_err();

        assert!(matches!(err, ExtractionError::DocumentLoadFailure(_)));
        assert!(dir_is_empty(scratch.path()));
    }

    #[tokio::test]
    async fn test_timed_out_load_removes_temp_file() {
        let scratch = tempfile::tempdir().unwrap();
        let loader = DocumentLoader::new(
            Arc::new(SlowConverter(Duration::from_millis(500))),
            Arc::new(SlowConverter(Duration::from_millis(500))),
            Some(scratch.path().to_path_buf()),
            Duration::from_millis(50),
        );

        let err = loader.load(b"%PDF-1.4", "pdf").await.unwrap_err();

        assert!(matches!(
            err,
            ExtractionError::UpstreamTimeout { stage: "document conversion", .. }
        ));
        assert_eq!(err.to_string(), "document conversion timed out after 50ms");
        assert!(dir_is_empty(scratch.path()), "temp file must not outlive the timeout");
    }

    #[tokio::test]
    async fn test_unsupported_format_never_reaches_converter() {
        let scratch = tempfile::tempdir().unwrap();
        let recorder = RecordingConverter::new(Ok(String::new()));
        let loader = loader_in(scratch.path(), recorder.clone());

        let err = loader.load(b"hello", "txt").await.unwrap_err();

        assert!(matches!(err, ExtractionError::UnsupportedFormat(_)));
        assert!(recorder.seen.lock().unwrap().is_none());
        assert!(dir_is_empty(scratch.path()));
    }

    #[test]
    fn test_docx_converter_reads_paragraphs_in_order() {
        let scratch = tempfile::tempdir().unwrap();
        let path = scratch.path().join("resume.docx");
        let file = std::fs::File::create(&path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file("word/document.xml", zip::write::FileOptions::default())
            .unwrap();
        zip.write_all(
            br#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Ada Lovelace</w:t></w:r></w:p>
    <w:p><w:r><w:t xml:space="preserve">Skills: </w:t></w:r><w:r><w:t>Rust &amp; SQL</w:t></w:r></w:p>
    <w:p></w:p>
    <w:p><w:r><w:t>ada@example.com</w:t><w:tab/><w:t>555-123-4567</w:t></w:r></w:p>
  </w:body>
</w:document>"#,
        )
        .unwrap();
        zip.finish().unwrap();

        let text = DocxConverter.parse(&path).unwrap();

        assert_eq!(
            text,
            "Ada Lovelace Skills: Rust & SQL ada@example.com\t555-123-4567"
        );
    }

    #[test]
    fn test_docx_converter_rejects_non_zip() {
        let scratch = tempfile::tempdir().unwrap();
        let path = scratch.path().join("resume.docx");
        std::fs::write(&path, b"not a zip archive").unwrap();
        assert!(DocxConverter.parse(&path).is_err());
    }
}
