//! PDF text extraction with an OCR fallback
//!
//! The text layer is read with `pdf-extract`. Scanned documents have no text
//! layer; for those, pages are rendered with `pdftoppm` (poppler-utils) and
//! recognised with `tesseract`, both run as child processes with a timeout.
//! Every failure degrades to empty text: a PDF is still saved even when nothing
//! could be read from it.

use crate::config::PdfConfig;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tempfile::TempDir;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::oneshot;

const RENDER_TOOL: &str = "pdftoppm";
const OCR_TOOL: &str = "tesseract";
const PAGE_PREFIX: &str = "page";
const TEXT_LAYER: &str = "pdf-extract";

/// Errors from PDF extraction; always recovered to empty text by the caller
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("text layer extraction failed: {0}")]
    Extraction(String),

    #[error("text layer extraction panicked")]
    Panicked,

    #[error("{tool} failed: {message}")]
    Tool { tool: &'static str, message: String },

    #[error("{tool} timed out after {}s", timeout.as_secs())]
    Timeout {
        tool: &'static str,
        timeout: Duration,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Extracts text from PDF documents
#[derive(Debug, Clone)]
pub struct PdfExtractor {
    config: PdfConfig,
}

impl PdfExtractor {
    pub fn new(config: PdfConfig) -> Self {
        Self { config }
    }

    /// Extracts text, falling back to OCR when the text layer is empty
    ///
    /// # Returns
    ///
    /// The extracted text; empty when nothing could be read
    pub async fn extract_text(&self, bytes: Bytes) -> String {
        match self.text_layer(bytes.clone()).await {
            Ok(text) if !text.trim().is_empty() => return text,
            Ok(_) => tracing::info!("PDF has no text layer"),
            Err(e) => tracing::warn!("PDF text layer unreadable: {}", e),
        }

        if !self.config.ocr_enabled {
            return String::new();
        }

        tracing::info!("Falling back to OCR");
        match self.ocr(&bytes).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("PDF OCR failed: {}", e);
                String::new()
            }
        }
    }

    /// Reads the embedded text layer on a dedicated thread
    ///
    /// The parse cannot be interrupted. After `ocr-timeout` it is abandoned and
    /// left to finish on its own thread, which never holds up process exit.
    pub async fn text_layer(&self, bytes: Bytes) -> Result<String, PdfError> {
        let timeout = Duration::from_secs(self.config.ocr_timeout);
        let result = on_detached_thread(TEXT_LAYER, timeout, move || {
            pdf_extract::extract_text_from_mem(&bytes).map_err(|e| e.to_string())
        })
        .await?;

        result.map_err(PdfError::Extraction)
    }

    /// Renders up to `ocr-max-pages` pages and recognises each one
    pub async fn ocr(&self, bytes: &[u8]) -> Result<String, PdfError> {
        let workdir = TempDir::new()?;
        let input = workdir.path().join("input.pdf");
        tokio::fs::write(&input, bytes).await?;

        let prefix = workdir.path().join(PAGE_PREFIX);
        let render_args = render_args(&input, &prefix, self.config.ocr_dpi, self.config.ocr_max_pages);
        self.run(RENDER_TOOL, &render_args).await?;

        let pages = rendered_pages(workdir.path())?;
        tracing::debug!("Rendered {} page(s) for OCR", pages.len());

        let mut text = String::new();
        for (index, page) in pages.iter().enumerate() {
            tracing::info!("OCR page {}", index + 1);
            let args = ocr_args(page, &self.config.ocr_languages);
            let output = self.run(OCR_TOOL, &args).await?;
            text.push_str(&String::from_utf8_lossy(&output.stdout));
            text.push('\n');
        }

        Ok(text)
    }

    async fn run(&self, tool: &'static str, args: &[String]) -> Result<Output, PdfError> {
        let timeout = Duration::from_secs(self.config.ocr_timeout);

        let child = Command::new(tool)
            .args(args)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(timeout, child)
            .await
            .map_err(|_| PdfError::Timeout { tool, timeout })?
            .map_err(|e| PdfError::Tool {
                tool,
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(PdfError::Tool {
                tool,
                message: format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(output)
    }
}

/// Runs `work` on a plain OS thread and waits at most `timeout` for it
///
/// Unlike `spawn_blocking`, the thread is not owned by the runtime, so an
/// abandoned call does not delay runtime shutdown.
async fn on_detached_thread<T, F>(
    label: &'static str,
    timeout: Duration,
    work: F,
) -> Result<T, PdfError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    std::thread::Builder::new()
        .name(label.to_string())
        .spawn(move || {
            let _ = tx.send(work());
        })?;

    match tokio::time::timeout(timeout, rx).await {
        Ok(Ok(value)) => Ok(value),
        // Sender dropped without a value: the work panicked
        Ok(Err(_)) => Err(PdfError::Panicked),
        Err(_) => {
            tracing::warn!("{} still running after {}s, abandoning it", label, timeout.as_secs());
            Err(PdfError::Timeout {
                tool: label,
                timeout,
            })
        }
    }
}

fn render_args(input: &Path, prefix: &Path, dpi: u32, max_pages: u32) -> Vec<String> {
    vec![
        "-r".to_string(),
        dpi.to_string(),
        "-png".to_string(),
        "-f".to_string(),
        "1".to_string(),
        "-l".to_string(),
        max_pages.max(1).to_string(),
        input.display().to_string(),
        prefix.display().to_string(),
    ]
}

fn ocr_args(image: &Path, languages: &[String]) -> Vec<String> {
    vec![
        image.display().to_string(),
        "stdout".to_string(),
        "-l".to_string(),
        languages.join("+"),
        "--oem".to_string(),
        "3".to_string(),
        "--psm".to_string(),
        "6".to_string(),
    ]
}

/// Rendered page images in page order
///
/// `pdftoppm` zero-pads page numbers to a common width, so name order is page order.
fn rendered_pages(dir: &Path) -> Result<Vec<PathBuf>, PdfError> {
    let mut pages: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension().map(|ext| ext == "png").unwrap_or(false)
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| name.starts_with(PAGE_PREFIX))
                    .unwrap_or(false)
        })
        .collect();
    pages.sort();
    Ok(pages)
}
