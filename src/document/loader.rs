//! Loading documents from disk
//!
//! Plain text (`.txt`, `.md`) is parsed as-is. CSV exports are flattened:
//! the non-empty cells of each row are joined with spaces and rows become
//! separate paragraphs.

use super::{Document, SourceFormat};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Default size ceiling for a single document (10 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Extensions the loader understands
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "csv"];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("file too large ({size} bytes); maximum is {max} bytes")]
    TooLarge { size: u64, max: u64 },

    #[error("unsupported file format: {extension} (supported: .txt, .md, .csv)")]
    Unsupported { extension: String },

    #[error("{} contains no readable content", .0.display())]
    Empty(PathBuf),

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Whether the loader would accept this path by extension
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Load and parse a document, enforcing `max_size` bytes
pub fn load_document(path: &Path, max_size: u64) -> Result<Document, LoadError> {
    let meta = match fs::metadata(path) {
        Ok(m) if m.is_file() => m,
        Ok(_) => return Err(LoadError::NotFound(path.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(LoadError::NotFound(path.to_path_buf()))
        }
        Err(source) => {
            return Err(LoadError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if meta.len() > max_size {
        return Err(LoadError::TooLarge {
            size: meta.len(),
            max: max_size,
        });
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let format = match extension.as_str() {
        "txt" | "md" => SourceFormat::Plain,
        "csv" => SourceFormat::Tabular,
        _ => {
            return Err(LoadError::Unsupported {
                extension: if extension.is_empty() {
                    "(none)".to_string()
                } else {
                    format!(".{}", extension)
                },
            })
        }
    };

    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = decode(bytes, path);
    let text = match format {
        SourceFormat::Plain => text,
        SourceFormat::Tabular => flatten_csv(&text),
    };

    if text.trim().is_empty() {
        return Err(LoadError::Empty(path.to_path_buf()));
    }

    let doc = Document::parse_with_format(text, format);
    debug!(
        path = %path.display(),
        words = doc.word_count(),
        sentences = doc.sentence_count(),
        sections = doc.sections().len(),
        "loaded document"
    );
    Ok(doc)
}

/// UTF-8 with a Latin-1 fallback; a leading BOM is dropped
fn decode(bytes: Vec<u8>, path: &Path) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(s),
        Err(e) => {
            warn!(path = %path.display(), "not valid UTF-8, decoding as Latin-1");
            e.into_bytes().into_iter().map(char::from).collect()
        }
    }
}

/// Join the non-empty cells of each row with spaces, rows separated by a blank line
pub fn flatten_csv(text: &str) -> String {
    parse_csv(text)
        .into_iter()
        .map(|row| {
            row.iter()
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|row| !row.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Minimal CSV reader: comma separated, double-quoted fields with `""` escapes
fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    rows
}
