//! Response classification and the values workers hand back to the engine

use crate::FetchError;
use bytes::Bytes;
use reqwest::StatusCode;
use std::fmt;

const MSWORD_MIME: &str = "application/msword";
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Media kind of a fetched response, decided from its Content-Type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Html,
    Pdf,
    Image,
    Document,
    Unsupported,
}

impl MediaKind {
    /// Classifies a Content-Type header value
    ///
    /// Only the main type before `;` is considered, trimmed and lower-cased.
    /// A missing header is `Unsupported`.
    ///
    /// # Examples
    ///
    /// ```
    /// use tidemark::crawler::MediaKind;
    ///
    /// assert_eq!(MediaKind::from_content_type(Some("text/html; charset=UTF-8")), MediaKind::Html);
    /// assert_eq!(MediaKind::from_content_type(Some("image/webp")), MediaKind::Image);
    /// assert_eq!(MediaKind::from_content_type(None), MediaKind::Unsupported);
    /// ```
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(content_type) = content_type else {
            return Self::Unsupported;
        };

        let main_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match main_type.as_str() {
            "text/html" => Self::Html,
            "application/pdf" => Self::Pdf,
            MSWORD_MIME | DOCX_MIME => Self::Document,
            t if t.starts_with("image/") => Self::Image,
            _ => Self::Unsupported,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::Document => "document",
            Self::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A successful response, body fully read
#[derive(Debug, Clone)]
pub struct ClassifiedResponse {
    /// URL that was requested
    pub url: String,
    /// URL after redirects
    pub final_url: String,
    pub status: StatusCode,
    /// Raw Content-Type header, if any
    pub content_type: Option<String>,
    pub kind: MediaKind,
    pub body: Bytes,
}

impl ClassifiedResponse {
    /// Main type of the Content-Type header, lower-cased (`image/png`)
    pub fn mime(&self) -> String {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|main| main.trim().to_ascii_lowercase())
            .unwrap_or_default()
    }
}

/// Content extracted from one URL
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedContent {
    Html { text: String },
    Pdf { text: String, bytes: Bytes },
    Image { bytes: Bytes, mime: String },
    Document { bytes: Bytes, mime: String },
}

impl ExtractedContent {
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Html { .. } => MediaKind::Html,
            Self::Pdf { .. } => MediaKind::Pdf,
            Self::Image { .. } => MediaKind::Image,
            Self::Document { .. } => MediaKind::Document,
        }
    }
}

/// What a worker reports back for one URL
#[derive(Debug)]
pub enum TaskOutcome {
    /// Fetched and extracted
    Extracted(ExtractedContent),
    /// Refused by the URL policy, never fetched
    Rejected,
    /// Fetched, but the media type is not one the crawler keeps
    Unsupported { content_type: Option<String> },
    /// Gave up fetching
    Failed(FetchError),
}
