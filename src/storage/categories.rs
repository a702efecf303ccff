use std::fmt;
use std::path::Path;
use url::Url;

/// Directory a binary artifact is filed under in `files/`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileCategory {
    Document,
    Spreadsheet,
    Presentation,
    Archive,
    Image,
    Audio,
    Video,
    Code,
    Data,
    Ebook,
    Other,
}

impl FileCategory {
    /// Every category; each gets its own directory
    pub const ALL: [FileCategory; 11] = [
        Self::Document,
        Self::Spreadsheet,
        Self::Presentation,
        Self::Archive,
        Self::Image,
        Self::Audio,
        Self::Video,
        Self::Code,
        Self::Data,
        Self::Ebook,
        Self::Other,
    ];

    /// Directory name of the category
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Spreadsheet => "spreadsheet",
            Self::Presentation => "presentation",
            Self::Archive => "archive",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Code => "code",
            Self::Data => "data",
            Self::Ebook => "ebook",
            Self::Other => "other",
        }
    }

    /// Extensions (without the dot) filed under this category
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Document => &["pdf", "doc", "docx", "txt", "rtf", "odt"],
            Self::Spreadsheet => &["xls", "xlsx", "csv", "ods"],
            Self::Presentation => &["ppt", "pptx", "odp"],
            Self::Archive => &["zip", "rar", "7z", "tar", "gz"],
            Self::Image => &["jpg", "jpeg", "png", "gif", "bmp", "svg"],
            Self::Audio => &["mp3", "wav", "ogg", "m4a"],
            Self::Video => &["mp4", "avi", "mkv", "mov"],
            Self::Code => &["py", "js", "html", "css", "java", "cpp", "h"],
            Self::Data => &["json", "xml", "yaml", "sql"],
            Self::Ebook => &["epub", "mobi", "azw"],
            Self::Other => &[],
        }
    }

    /// Looks up the category of an extension, with or without a leading dot
    ///
    /// # Examples
    ///
    /// ```
    /// use tidemark::storage::FileCategory;
    ///
    /// assert_eq!(FileCategory::from_extension(".PDF"), Some(FileCategory::Document));
    /// assert_eq!(FileCategory::from_extension("webp"), None);
    /// ```
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        if ext.is_empty() {
            return None;
        }

        Self::ALL
            .into_iter()
            .find(|category| category.extensions().contains(&ext.as_str()))
    }

    /// Looks up the category from the extension of a URL's path
    pub fn from_url(url: &str) -> Option<Self> {
        let parsed = Url::parse(url).ok()?;
        let ext = Path::new(parsed.path()).extension()?.to_str()?;
        Self::from_extension(ext)
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
