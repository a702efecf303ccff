use crate::crawler::{ExtractedContent, MediaKind};
use crate::storage::categories::FileCategory;
use crate::storage::traits::{ArtifactSink, StorageError, StorageResult};
use crate::url::sanitize_filename;
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

const TEXT_DIR: &str = "text";
const FILES_DIR: &str = "files";
const RULE_WIDTH: usize = 100;
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Writes artifacts under a crawl root
///
/// Layout:
///
/// ```text
/// <root>/text/<name>.txt                  extracted text (HTML and PDF)
/// <root>/files/<category>/<name>.<ext>    original binaries
/// ```
#[derive(Debug, Clone)]
pub struct FsArtifactSink {
    root: PathBuf,
    max_length: usize,
}

impl FsArtifactSink {
    /// Creates the sink and every directory it writes to
    ///
    /// # Arguments
    ///
    /// * `root` - The crawl root
    /// * `max_length` - Upper bound on generated file names (without extension)
    ///
    /// # Returns
    ///
    /// * `Ok(FsArtifactSink)` - All directories exist
    /// * `Err(StorageError)` - The root is not writable
    pub fn new(root: &Path, max_length: usize) -> StorageResult<Self> {
        let sink = Self {
            root: root.to_path_buf(),
            max_length,
        };

        create_dir(&sink.text_dir())?;
        for category in FileCategory::ALL {
            create_dir(&sink.category_dir(category))?;
        }

        tracing::debug!(root = %root.display(), "Artifact directories ready");
        Ok(sink)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn text_dir(&self) -> PathBuf {
        self.root.join(TEXT_DIR)
    }

    pub fn files_dir(&self) -> PathBuf {
        self.root.join(FILES_DIR)
    }

    pub fn category_dir(&self, category: FileCategory) -> PathBuf {
        self.files_dir().join(category.as_str())
    }

    fn artifact_name(&self, url: &str) -> StorageResult<String> {
        let name = sanitize_filename(url, self.max_length);
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(StorageError::InvalidName(name));
        }
        Ok(name)
    }

    fn write_text(&self, url: &str, name: &str, kind: MediaKind, body: &str) -> StorageResult<PathBuf> {
        let path = self.text_dir().join(format!("{}.txt", name));
        let content = format_text_artifact(url, kind, Local::now(), body);
        write_file(&path, content.as_bytes())?;
        tracing::info!("Saved text: {} -> {}", url, path.display());
        Ok(path)
    }

    fn write_binary(
        &self,
        url: &str,
        name: &str,
        extension: &str,
        kind: MediaKind,
        bytes: &[u8],
    ) -> StorageResult<PathBuf> {
        let category = categorize(extension, url, kind);
        let path = self
            .category_dir(category)
            .join(format!("{}.{}", name, extension));
        write_file(&path, bytes)?;
        tracing::info!("Saved {} file: {} -> {}", category, url, path.display());
        Ok(path)
    }
}

impl ArtifactSink for FsArtifactSink {
    fn save(&self, url: &str, content: &ExtractedContent) -> StorageResult<Vec<PathBuf>> {
        let name = self.artifact_name(url)?;

        match content {
            ExtractedContent::Html { text } => {
                Ok(vec![self.write_text(url, &name, MediaKind::Html, text)?])
            }
            ExtractedContent::Pdf { text, bytes } => {
                let text_path = self.write_text(url, &name, MediaKind::Pdf, text)?;
                let pdf_path = self.write_binary(url, &name, "pdf", MediaKind::Pdf, bytes)?;
                Ok(vec![text_path, pdf_path])
            }
            ExtractedContent::Image { bytes, mime } => {
                let extension = image_extension(mime);
                Ok(vec![self.write_binary(
                    url,
                    &name,
                    &extension,
                    MediaKind::Image,
                    bytes,
                )?])
            }
            ExtractedContent::Document { bytes, mime } => {
                let extension = document_extension(mime);
                Ok(vec![self.write_binary(
                    url,
                    &name,
                    extension,
                    MediaKind::Document,
                    bytes,
                )?])
            }
        }
    }
}

/// Wraps extracted text in the artifact header and footer
///
/// ```text
/// URL: <url>
/// Timestamp: YYYY-MM-DD HH:MM:SS
/// Content Type: html
/// ====...====
///
/// <body>
///
/// ====...====
/// End of content: <url>
/// ```
pub fn format_text_artifact(url: &str, kind: MediaKind, timestamp: DateTime<Local>, body: &str) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    format!(
        "URL: {url}\nTimestamp: {}\nContent Type: {}\n{rule}\n\n{body}\n\n{rule}\nEnd of content: {url}",
        timestamp.format("%Y-%m-%d %H:%M:%S"),
        kind.as_str(),
    )
}

/// Category from the artifact extension, then the URL's extension, then the media kind
fn categorize(extension: &str, url: &str, kind: MediaKind) -> FileCategory {
    FileCategory::from_extension(extension)
        .or_else(|| FileCategory::from_url(url))
        .unwrap_or(match kind {
            MediaKind::Pdf | MediaKind::Document => FileCategory::Document,
            MediaKind::Image => FileCategory::Image,
            MediaKind::Html => FileCategory::Code,
            MediaKind::Unsupported => FileCategory::Other,
        })
}

/// `image/png` -> `png`, `image/svg+xml` -> `svg`
fn image_extension(mime: &str) -> String {
    let subtype = mime
        .split(';')
        .next()
        .and_then(|main| main.split('/').nth(1))
        .map(|sub| sub.split('+').next().unwrap_or(sub).trim().to_ascii_lowercase())
        .unwrap_or_default();

    if subtype.is_empty() || !subtype.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.') {
        "bin".to_string()
    } else {
        subtype
    }
}

fn document_extension(mime: &str) -> &'static str {
    if mime.to_ascii_lowercase().contains(DOCX_MIME) {
        "docx"
    } else {
        "doc"
    }
}

fn create_dir(path: &Path) -> StorageResult<()> {
    fs::create_dir_all(path).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    fs::write(path, bytes).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn create_sink() -> (TempDir, FsArtifactSink) {
        let dir = TempDir::new().unwrap();
        let sink = FsArtifactSink::new(dir.path(), 100).unwrap();
        (dir, sink)
    }

    #[test]
    fn test_directories_created_up_front() {
        let (dir, _sink) = create_sink();
        assert!(dir.path().join("text").is_dir());
        for category in FileCategory::ALL {
            assert!(dir.path().join("files").join(category.as_str()).is_dir());
        }
    }

    #[test]
    fn test_unwritable_root_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("occupied");
        fs::write(&blocker, "a file, not a directory").unwrap();

        let result = FsArtifactSink::new(&blocker, 100);
        assert!(matches!(result, Err(StorageError::Io { .. })));
    }

    #[test]
    fn test_save_html() {
        let (dir, sink) = create_sink();
        let content = ExtractedContent::Html {
            text: "Hello\nWorld".to_string(),
        };

        let paths = sink.save("https://example.com/about", &content).unwrap();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].starts_with(dir.path().join("text")));

        let written = fs::read_to_string(&paths[0]).unwrap();
        assert!(written.starts_with("URL: https://example.com/about\n"));
        assert!(written.contains("Content Type: html\n"));
        assert!(written.contains("\n\nHello\nWorld\n\n"));
        assert!(written.ends_with("End of content: https://example.com/about"));
    }

    #[test]
    fn test_save_pdf_writes_text_and_original() {
        let (dir, sink) = create_sink();
        let content = ExtractedContent::Pdf {
            text: "page one".to_string(),
            bytes: Bytes::from_static(b"%PDF-1.4 fake"),
        };

        let paths = sink.save("https://example.com/files/report.pdf", &content).unwrap();
        assert_eq!(paths.len(), 2);

        assert!(paths[0].starts_with(dir.path().join("text")));
        assert!(fs::read_to_string(&paths[0]).unwrap().contains("Content Type: pdf"));

        assert!(paths[1].starts_with(dir.path().join("files").join("document")));
        assert_eq!(paths[1].extension().unwrap(), "pdf");
        assert_eq!(fs::read(&paths[1]).unwrap(), b"%PDF-1.4 fake");
    }

    #[test]
    fn test_save_image_extension_from_mime() {
        let (dir, sink) = create_sink();
        let content = ExtractedContent::Image {
            bytes: Bytes::from_static(&[0x89, b'P', b'N', b'G']),
            mime: "image/png".to_string(),
        };

        let paths = sink.save("https://example.com/logo", &content).unwrap();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].starts_with(dir.path().join("files").join("image")));
        assert_eq!(paths[0].extension().unwrap(), "png");
    }

    #[test]
    fn test_unknown_image_subtype_still_filed_as_image() {
        let (dir, sink) = create_sink();
        let content = ExtractedContent::Image {
            bytes: Bytes::from_static(b"RIFF"),
            mime: "image/webp".to_string(),
        };

        let paths = sink.save("https://example.com/photo", &content).unwrap();
        assert!(paths[0].starts_with(dir.path().join("files").join("image")));
        assert_eq!(paths[0].extension().unwrap(), "webp");
    }

    #[test]
    fn test_save_document() {
        let (dir, sink) = create_sink();
        let docx = ExtractedContent::Document {
            bytes: Bytes::from_static(b"PK"),
            mime: DOCX_MIME.to_string(),
        };
        let doc = ExtractedContent::Document {
            bytes: Bytes::from_static(b"\xD0\xCF"),
            mime: "application/msword".to_string(),
        };

        let docx_paths = sink.save("https://example.com/a", &docx).unwrap();
        let doc_paths = sink.save("https://example.com/b", &doc).unwrap();

        assert_eq!(docx_paths[0].extension().unwrap(), "docx");
        assert_eq!(doc_paths[0].extension().unwrap(), "doc");
        assert!(docx_paths[0].starts_with(dir.path().join("files").join("document")));
    }

    #[test]
    fn test_format_text_artifact() {
        let timestamp = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let text = format_text_artifact("https://example.com/", MediaKind::Html, timestamp, "body");
        let rule = "=".repeat(100);

        let expected = format!(
            "URL: https://example.com/\nTimestamp: 2024-03-09 14:05:07\nContent Type: html\n{rule}\n\nbody\n\n{rule}\nEnd of content: https://example.com/"
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension("image/jpeg"), "jpeg");
        assert_eq!(image_extension("image/svg+xml"), "svg");
        assert_eq!(image_extension("image/PNG; q=1"), "png");
        assert_eq!(image_extension("image/"), "bin");
    }

    #[test]
    fn test_categorize_fallbacks() {
        assert_eq!(categorize("pdf", "https://example.com/x", MediaKind::Pdf), FileCategory::Document);
        assert_eq!(categorize("bin", "https://example.com/a.zip", MediaKind::Image), FileCategory::Archive);
        assert_eq!(categorize("webp", "https://example.com/a", MediaKind::Image), FileCategory::Image);
    }
}
