//! Normalized document model
//!
//! A [`Document`] is built once from raw text and caches everything the
//! analyzers need: leading metadata, labelled sections, sentences and words
//! (with byte offsets back into the raw text for locations and context).

pub mod loader;

pub use loader::{load_document, LoadError, DEFAULT_MAX_FILE_SIZE};

use crate::{GradeBand, Location};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Where the text came from before normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    #[default]
    Plain,
    /// Cells extracted from a spreadsheet/CSV export
    Tabular,
}

/// Leading `key: value` metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Any other leading key/value pairs, keys lowercased
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl Metadata {
    /// Record a leading pair; returns whether `key` is a known alias.
    /// Unknown keys are kept in `extra` but their line stays in the body.
    fn set(&mut self, key: &str, value: &str) -> bool {
        let value = value.trim().to_string();
        let slot = match key {
            "title" | "lesson" | "chapter" => &mut self.title,
            "author" | "by" | "written by" => &mut self.author,
            "subject" | "topic" | "course" => &mut self.subject,
            "grade level" | "grade" | "level" => &mut self.grade_level,
            "date" | "created" | "published" => &mut self.date,
            other => {
                self.extra.entry(other.to_string()).or_insert(value);
                return false;
            }
        };
        if slot.is_none() {
            *slot = Some(value);
        }
        true
    }

}

/// A labelled section of the document body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Header text without trailing colon or `#` markers; empty for text before the first header
    pub label: String,
    pub body: String,
    /// Byte offset of the first body line in the raw text
    #[serde(skip)]
    pub offset: usize,
}

impl Section {
    /// Lowercased label for matching
    pub fn normalized_label(&self) -> String {
        self.label.to_lowercase()
    }
}

/// A word with its display form, matching form and byte offset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub normalized: String,
    pub offset: usize,
}

/// A sentence and the range of its words in [`Document::words`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub text: String,
    pub offset: usize,
    pub words: std::ops::Range<usize>,
    /// Index into [`Document::sections`]
    pub section: usize,
}

/// Normalized representation of one loaded educational resource
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    raw: String,
    format: SourceFormat,
    metadata: Metadata,
    sections: Vec<Section>,
    sentences: Vec<Sentence>,
    words: Vec<Word>,
    label_terms: Vec<Vec<String>>,
    line_starts: Vec<usize>,
}

fn word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\p{L}\p{N}]+(?:['\u{2019}][\p{L}]+)*").expect("valid word regex"))
}

fn terminator_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]+(?:\s+|$)").expect("valid terminator regex"))
}

fn metadata_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z][A-Za-z]*(?: [A-Za-z]+){0,2})\s*:\s*(\S.*?)\s*$")
            .expect("valid metadata regex")
    })
}

fn bullet_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:[-*+\u{2022}]|\d{1,3}[.)]|[a-zA-Z][.)])\s+").expect("valid bullet regex")
    })
}

/// Split text into words (lowercase-normalized) without building a document
pub fn tokenize(text: &str) -> Vec<String> {
    word_regex()
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Returns the byte length of a list marker at the start of `line`, if any
pub fn bullet_prefix_len(line: &str) -> Option<usize> {
    bullet_regex().find(line).map(|m| m.end())
}

/// Returns the header label if `line` looks like a section header
pub fn header_label(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.len() > 60 {
        return None;
    }
    if let Some(rest) = trimmed.strip_prefix('#') {
        let label = rest.trim_start_matches('#').trim();
        return (!label.is_empty()).then(|| label.trim_end_matches(':').trim().to_string());
    }
    let word_count = trimmed.split_whitespace().count();
    if word_count > 6 || bullet_prefix_len(trimmed).is_some() {
        return None;
    }
    if let Some(label) = trimmed.strip_suffix(':') {
        let label = label.trim();
        if !label.is_empty() && !label.contains(['.', '!', '?', ':']) {
            return Some(label.to_string());
        }
        return None;
    }
    let letters: Vec<char> = trimmed.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() >= 3
        && letters.iter().all(|c| c.is_uppercase())
        && !trimmed.ends_with(['.', '!', '?'])
    {
        return Some(trimmed.to_string());
    }
    None
}

struct Fragment<'a> {
    text: &'a str,
    offset: usize,
}

impl Document {
    /// Parse plain text into a document
    pub fn parse(raw: impl Into<String>) -> Self {
        Self::parse_with_format(raw, SourceFormat::Plain)
    }

    /// Parse text, recording the format it was extracted from
    pub fn parse_with_format(raw: impl Into<String>, format: SourceFormat) -> Self {
        let raw = raw.into();
        let line_starts = std::iter::once(0)
            .chain(raw.match_indices('\n').map(|(i, _)| i + 1))
            .collect::<Vec<_>>();

        let lines: Vec<(usize, &str)> = line_starts
            .iter()
            .map(|&start| {
                let end = raw[start..].find('\n').map(|i| start + i).unwrap_or(raw.len());
                (start, raw[start..end].trim_end_matches('\r'))
            })
            .collect();

        // Leading key: value lines; only known keys leave the body
        let mut metadata = Metadata::default();
        let mut consumed = vec![false; lines.len()];
        let mut idx = 0;
        while idx < lines.len() && lines[idx].1.trim().is_empty() {
            idx += 1;
        }
        while idx < lines.len() {
            let Some(caps) = metadata_regex().captures(lines[idx].1) else {
                break;
            };
            let key = caps[1].to_ascii_lowercase();
            consumed[idx] = metadata.set(&key, &caps[2]);
            idx += 1;
        }

        // Sections
        let mut sections: Vec<Section> = Vec::new();
        let mut section_lines: Vec<Vec<(usize, &str)>> = Vec::new();
        let body_lines = lines
            .iter()
            .zip(&consumed)
            .filter(|(_, consumed)| !**consumed)
            .map(|(line, _)| *line);
        for (offset, line) in body_lines {
            if let Some(label) = header_label(line) {
                sections.push(Section {
                    label,
                    body: String::new(),
                    offset: offset + line.len(),
                });
                section_lines.push(Vec::new());
                continue;
            }
            if sections.is_empty() {
                if line.trim().is_empty() {
                    continue;
                }
                sections.push(Section {
                    label: String::new(),
                    body: String::new(),
                    offset,
                });
                section_lines.push(Vec::new());
            }
            if let Some(current) = section_lines.last_mut() {
                current.push((offset, line));
            }
        }
        for (section, body_lines) in sections.iter_mut().zip(&section_lines) {
            let body = body_lines
                .iter()
                .map(|(_, l)| *l)
                .collect::<Vec<_>>()
                .join("\n");
            section.body = body.trim().to_string();
            if let Some((first, _)) = body_lines.iter().find(|(_, l)| !l.trim().is_empty()) {
                section.offset = *first;
            }
        }

        // Sentences and words
        let mut words = Vec::new();
        let mut sentences = Vec::new();
        for (section_idx, body_lines) in section_lines.iter().enumerate() {
            for block in Self::blocks(body_lines) {
                Self::segment_block(&block, section_idx, &mut words, &mut sentences);
            }
        }

        let label_terms = sections
            .iter()
            .filter(|s| !s.label.is_empty())
            .map(|s| tokenize(&s.label))
            .collect();

        Self {
            raw,
            format,
            metadata,
            sections,
            sentences,
            words,
            label_terms,
            line_starts,
        }
    }

    /// Group body lines into blocks: blank lines and list items start new blocks
    fn blocks<'a>(lines: &[(usize, &'a str)]) -> Vec<Vec<Fragment<'a>>> {
        let mut blocks = Vec::new();
        let mut current: Vec<Fragment<'a>> = Vec::new();
        for &(offset, line) in lines {
            if line.trim().is_empty() {
                if !current.is_empty() {
                    blocks.push(std::mem::take(&mut current));
                }
                continue;
            }
            if let Some(marker) = bullet_prefix_len(line) {
                if !current.is_empty() {
                    blocks.push(std::mem::take(&mut current));
                }
                blocks.push(vec![Fragment {
                    text: &line[marker..],
                    offset: offset + marker,
                }]);
                continue;
            }
            current.push(Fragment { text: line, offset });
        }
        if !current.is_empty() {
            blocks.push(current);
        }
        blocks
    }

    fn segment_block(
        block: &[Fragment<'_>],
        section: usize,
        words: &mut Vec<Word>,
        sentences: &mut Vec<Sentence>,
    ) {
        let mut pieces: Vec<&str> = Vec::new();
        let mut start_offset: Option<usize> = None;
        let mut first_word = words.len();

        let mut flush = |pieces: &mut Vec<&str>,
                         start_offset: &mut Option<usize>,
                         first_word: &mut usize,
                         words: &mut Vec<Word>| {
            if words.len() > *first_word {
                let text = pieces
                    .iter()
                    .map(|p| p.trim())
                    .filter(|p| !p.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                sentences.push(Sentence {
                    text,
                    offset: start_offset.unwrap_or(0),
                    words: *first_word..words.len(),
                    section,
                });
            }
            pieces.clear();
            *start_offset = None;
            *first_word = words.len();
        };

        for fragment in block {
            let mut cursor = 0;
            let mut segments: Vec<(usize, usize, bool)> = terminator_regex()
                .find_iter(fragment.text)
                .map(|m| {
                    let seg = (cursor, m.end(), true);
                    cursor = m.end();
                    seg
                })
                .collect();
            if cursor < fragment.text.len() {
                segments.push((cursor, fragment.text.len(), false));
            }
            for (start, end, terminated) in segments {
                let piece = &fragment.text[start..end];
                for m in word_regex().find_iter(piece) {
                    let offset = fragment.offset + start + m.start();
                    if start_offset.is_none() {
                        start_offset = Some(offset);
                    }
                    words.push(Word {
                        text: m.as_str().to_string(),
                        normalized: m.as_str().to_lowercase(),
                        offset,
                    });
                }
                pieces.push(piece);
                if terminated {
                    flush(&mut pieces, &mut start_offset, &mut first_word, words);
                }
            }
        }
        flush(&mut pieces, &mut start_offset, &mut first_word, words);
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn sentence_count(&self) -> usize {
        self.sentences.len()
    }

    /// Words belonging to one sentence
    pub fn sentence_words(&self, sentence: &Sentence) -> &[Word] {
        &self.words[sentence.words.clone()]
    }

    /// Body lines of every section (headers and metadata excluded)
    pub fn body_lines(&self) -> impl Iterator<Item = &str> {
        self.sections
            .iter()
            .flat_map(|s| s.body.lines())
            .filter(|l| !l.trim().is_empty())
    }

    /// Target grade band declared in the metadata, if any
    pub fn target_grade_band(&self) -> Option<GradeBand> {
        self.metadata.grade_level.as_deref().and_then(GradeBand::parse)
    }

    /// Whole-word / whole-phrase match against the normalized word stream and section labels
    pub fn contains_phrase(&self, phrase: &str) -> bool {
        let needle = tokenize(phrase);
        if needle.is_empty() {
            return false;
        }
        let in_body = self
            .words
            .windows(needle.len())
            .any(|w| w.iter().zip(&needle).all(|(a, b)| a.normalized == *b));
        in_body
            || self
                .label_terms
                .iter()
                .any(|label| label.windows(needle.len()).any(|w| w == needle.as_slice()))
    }

    /// 1-indexed line/column of a byte offset in the raw text
    pub fn location_of(&self, offset: usize) -> Location {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let start = self.line_starts.get(line_idx).copied().unwrap_or(0);
        let end = offset.min(self.raw.len());
        let column = self.raw.get(start..end).map(|s| s.chars().count()).unwrap_or(0) + 1;
        Location::new(line_idx + 1, column)
    }

    /// Up to `radius` characters either side of `start..end`, whitespace collapsed
    pub fn context(&self, start: usize, end: usize, radius: usize) -> String {
        let before: String = {
            let head = self.raw.get(..start).unwrap_or("");
            let mut chars: Vec<char> = head.chars().rev().take(radius).collect();
            chars.reverse();
            chars.into_iter().collect()
        };
        let matched = self.raw.get(start..end).unwrap_or("");
        let after: String = self
            .raw
            .get(end..)
            .unwrap_or("")
            .chars()
            .take(radius)
            .collect();
        format!("{}{}{}", before, matched, after)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// SHA-256 of the raw text, hex encoded
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.raw.as_bytes());
        hex::encode(hasher.finalize())
    }
}
