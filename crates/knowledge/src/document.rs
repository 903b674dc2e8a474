//! Corpus loading and text extraction.
//!
//! A [`DocumentStore`] turns a directory of files into [`Document`]s. The
//! directory itself must be readable; individual files that cannot be decoded
//! are skipped with a warning so one bad file never aborts a load.

use ragline_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Markdown,
    Html,
    Pdf,
    Docx,
}

impl ContentType {
    /// Detect content type from a lowercase file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "txt" | "text" => Some(Self::Text),
            "md" | "markdown" => Some(Self::Markdown),
            "html" | "htm" => Some(Self::Html),
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }
}

/// A loaded source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Path relative to the corpus root, with `/` separators
    pub id: String,

    /// Extracted text
    pub content: String,

    /// `title`, `source`, `file_name`, `content_type`, `size_bytes`
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    /// Build a document from in-memory text, mainly for tests and tooling.
    pub fn from_text(id: impl Into<String>, content: impl Into<String>) -> Self {
        let id = id.into();
        let title = Path::new(&id)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&id)
            .to_string();
        let content = content.into();

        let mut metadata = BTreeMap::new();
        metadata.insert("title".to_string(), title);
        metadata.insert("source".to_string(), id.clone());
        metadata.insert("file_name".to_string(), id.clone());
        metadata.insert(
            "content_type".to_string(),
            ContentType::Text.as_str().to_string(),
        );
        metadata.insert("size_bytes".to_string(), content.len().to_string());

        Self {
            id,
            content,
            metadata,
        }
    }

    /// Human-readable title, falling back to the id.
    pub fn title(&self) -> &str {
        self.metadata
            .get("title")
            .map(String::as_str)
            .unwrap_or(&self.id)
    }
}

/// Options controlling which files are loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Descend into subdirectories
    pub recursive: bool,

    /// Accepted file extensions, lowercase, without the dot
    pub extensions: Vec<String>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            extensions: ["txt", "md", "markdown", "html", "htm", "pdf", "docx"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Loads documents from a directory on disk.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    options: LoaderOptions,
}

impl DocumentStore {
    pub fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// Load every supported file in `dir`, sorted by document id.
    ///
    /// Legacy binary Word `.doc` files are not extracted; like any other
    /// unsupported extension they are skipped with a warning. Save them as
    /// `.docx` to include them.
    ///
    /// # Errors
    /// `AppError::FileAccess` when `dir` is missing, not a directory, or
    /// cannot be listed.
    pub fn load(&self, dir: &Path) -> AppResult<Vec<Document>> {
        let meta = fs::metadata(dir).map_err(|e| {
            AppError::FileAccess(format!("Cannot access corpus directory {:?}: {}", dir, e))
        })?;
        if !meta.is_dir() {
            return Err(AppError::FileAccess(format!(
                "Corpus path {:?} is not a directory",
                dir
            )));
        }
        fs::read_dir(dir).map_err(|e| {
            AppError::FileAccess(format!("Cannot read corpus directory {:?}: {}", dir, e))
        })?;

        let max_depth = if self.options.recursive { usize::MAX } else { 1 };
        let mut documents = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            match self.load_file(dir, entry.path()) {
                Ok(Some(document)) => documents.push(document),
                Ok(None) => {}
                Err(e) => tracing::warn!("Skipping {:?}: {}", entry.path(), e),
            }
        }

        documents.sort_by(|a, b| a.id.cmp(&b.id));
        tracing::info!("Loaded {} documents from {:?}", documents.len(), dir);
        Ok(documents)
    }

    /// Load a single file. Returns `Ok(None)` for files that are skipped by
    /// policy (unsupported extension, no text).
    pub fn load_file(&self, root: &Path, path: &Path) -> AppResult<Option<Document>> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let content_type = match ContentType::from_extension(&ext) {
            Some(ct) if self.options.extensions.contains(&ext) => ct,
            _ => {
                tracing::warn!("Skipping unsupported file: {:?}", path);
                return Ok(None);
            }
        };

        let bytes = fs::read(path)
            .map_err(|e| AppError::FileAccess(format!("Failed to read {:?}: {}", path, e)))?;
        let content = extract_text(&bytes, content_type)?;

        if content.trim().is_empty() {
            tracing::warn!("Skipping {:?}: no extractable text", path);
            return Ok(None);
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        let id = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let mut metadata = BTreeMap::new();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| id.clone());
        metadata.insert("title".to_string(), stem);
        metadata.insert("source".to_string(), path.display().to_string());
        metadata.insert(
            "file_name".to_string(),
            path.file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default(),
        );
        metadata.insert(
            "content_type".to_string(),
            content_type.as_str().to_string(),
        );
        metadata.insert("size_bytes".to_string(), bytes.len().to_string());

        tracing::debug!("Loaded {} ({} bytes)", id, bytes.len());
        Ok(Some(Document {
            id,
            content,
            metadata,
        }))
    }
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
}

/// Extract plain text from raw file bytes.
pub fn extract_text(bytes: &[u8], content_type: ContentType) -> AppResult<String> {
    match content_type {
        ContentType::Text => decode_utf8(bytes),
        ContentType::Markdown => decode_utf8(bytes).map(|raw| clean_markdown(&raw)),
        ContentType::Html => decode_utf8(bytes).map(|raw| clean_html(&raw)),
        ContentType::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| AppError::FileAccess(format!("PDF extraction failed: {}", e))),
        ContentType::Docx => extract_docx(bytes),
    }
}

fn decode_utf8(bytes: &[u8]) -> AppResult<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| AppError::FileAccess(format!("File is not valid UTF-8: {}", e)))
}

/// Clean markdown by removing heading markers and fence lines.
///
/// Blank lines are kept so paragraph boundaries survive for chunking.
fn clean_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for line in text.lines() {
        let trimmed = line.trim_start();

        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            continue;
        }

        if trimmed.starts_with('#') {
            let heading = trimmed.trim_start_matches('#');
            if heading.is_empty() || heading.starts_with(' ') {
                result.push_str(heading.trim());
                result.push('\n');
                continue;
            }
        }

        result.push_str(line.trim_end());
        result.push('\n');
    }

    result.trim().to_string()
}

const BLOCK_TAGS: &[&str] = &[
    "p", "br", "div", "li", "tr", "h1", "h2", "h3", "h4", "h5", "h6", "section", "article",
    "header", "footer", "ul", "ol", "table", "blockquote", "pre",
];

fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    haystack.len() >= prefix.len()
        && haystack.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Clean HTML by stripping tags, scripts and styles.
fn clean_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('<') {
        result.push_str(&rest[..open]);
        rest = &rest[open..];

        let skip_until = if starts_with_ignore_case(rest, "<script") {
            Some("</script>")
        } else if starts_with_ignore_case(rest, "<style") {
            Some("</style>")
        } else if rest.starts_with("<!--") {
            Some("-->")
        } else {
            None
        };

        if let Some(end_marker) = skip_until {
            let lower = rest.to_ascii_lowercase();
            match lower.find(end_marker) {
                Some(end) => rest = &rest[end + end_marker.len()..],
                None => rest = "",
            }
            continue;
        }

        let close = match rest.find('>') {
            Some(close) => close,
            None => {
                rest = "";
                break;
            }
        };

        let name: String = rest[1..close]
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        if BLOCK_TAGS.contains(&name.as_str()) {
            result.push('\n');
        }

        rest = &rest[close + 1..];
    }
    result.push_str(rest);

    collapse_blank_lines(&decode_entities(&result))
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn collapse_blank_lines(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut blank_run = 0;

    for line in text.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            blank_run += 1;
            if blank_run == 1 && !result.is_empty() {
                result.push('\n');
            }
            continue;
        }
        blank_run = 0;
        result.push_str(&line);
        result.push('\n');
    }

    result.trim().to_string()
}

/// Extract text runs from a DOCX archive's `word/document.xml`.
fn extract_docx(bytes: &[u8]) -> AppResult<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| AppError::FileAccess(format!("Invalid DOCX archive: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| AppError::FileAccess(format!("DOCX has no document body: {}", e)))?
        .read_to_string(&mut xml)
        .map_err(|e| AppError::FileAccess(format!("Failed to read DOCX body: {}", e)))?;

    Ok(docx_xml_to_text(&xml))
}

fn docx_xml_to_text(xml: &str) -> String {
    let mut result = String::new();
    let mut rest = xml;
    let mut in_text = false;

    while let Some(open) = rest.find('<') {
        if in_text {
            result.push_str(&decode_entities(&rest[..open]));
        }
        let close = match rest[open..].find('>') {
            Some(close) => open + close,
            None => break,
        };

        let tag = &rest[open + 1..close];
        let name = tag
            .trim_end_matches('/')
            .split_whitespace()
            .next()
            .unwrap_or("");
        match name {
            "w:t" => in_text = !tag.ends_with('/'),
            "/w:t" => in_text = false,
            "/w:p" | "w:br" | "w:cr" => result.push('\n'),
            "w:tab" => result.push('\t'),
            _ => {}
        }

        rest = &rest[close + 1..];
    }

    result.trim().to_string()
}
