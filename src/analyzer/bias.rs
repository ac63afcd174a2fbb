//! Bias and sensitivity detection
//!
//! Scans the raw document text for configured terms and patterns. Every
//! occurrence is recorded with its location and surrounding context, and the
//! summed severity is subtracted from a perfect score.

use super::Analyzer;
use crate::{AnalysisResult, Component, Document, EngineError, Finding, Location};
use anyhow::{bail, Context};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

const BUILTIN_TERMS: &str = include_str!("../../data/bias_terms.json");

/// Term-list key holding inclusive wording rather than biased wording
const INCLUSIVE_KEY: &str = "inclusive";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiasCategory {
    Gender,
    Racial,
    Age,
    Cultural,
    #[serde(other)]
    Other,
}

impl BiasCategory {
    /// Category for a term-list key; unknown keys map to `Other`
    pub fn from_key(key: &str) -> Self {
        match key.trim().to_ascii_lowercase().as_str() {
            "gender" => BiasCategory::Gender,
            "racial" | "race" | "ethnic" | "ethnicity" => BiasCategory::Racial,
            "age" => BiasCategory::Age,
            "cultural" | "culture" => BiasCategory::Cultural,
            _ => BiasCategory::Other,
        }
    }
}

impl std::fmt::Display for BiasCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BiasCategory::Gender => write!(f, "gender"),
            BiasCategory::Racial => write!(f, "racial"),
            BiasCategory::Age => write!(f, "age"),
            BiasCategory::Cultural => write!(f, "cultural"),
            BiasCategory::Other => write!(f, "other"),
        }
    }
}

fn default_severity() -> f64 {
    5.0
}

#[derive(Debug, Deserialize)]
struct TermSpec {
    term: Option<String>,
    pattern: Option<String>,
    #[serde(default = "default_severity")]
    severity: f64,
    suggestion: Option<String>,
}

/// A compiled term or pattern
#[derive(Debug, Clone)]
pub struct BiasTerm {
    pub category: BiasCategory,
    /// The configured term or pattern text
    pub source: String,
    pub severity: f64,
    pub suggestion: Option<String>,
    regex: Regex,
}

impl BiasTerm {
    /// Whole-word, case-insensitive literal term (inner whitespace is flexible)
    pub fn term(category: BiasCategory, term: &str, severity: f64) -> anyhow::Result<Self> {
        let term = term.trim();
        if term.is_empty() {
            bail!("empty bias term in category {}", category);
        }
        let body = term
            .split_whitespace()
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(r"\s+");
        let starts_word = term.chars().next().is_some_and(|c| c.is_alphanumeric());
        let ends_word = term.chars().last().is_some_and(|c| c.is_alphanumeric());
        let pattern = format!(
            "{}{}{}",
            if starts_word { r"\b" } else { "" },
            body,
            if ends_word { r"\b" } else { "" }
        );
        Self::compile(category, term, &pattern, severity)
    }

    /// Case-insensitive regular expression
    pub fn pattern(category: BiasCategory, pattern: &str, severity: f64) -> anyhow::Result<Self> {
        Self::compile(category, pattern, pattern, severity)
    }

    fn compile(
        category: BiasCategory,
        source: &str,
        pattern: &str,
        severity: f64,
    ) -> anyhow::Result<Self> {
        if !severity.is_finite() || severity < 0.0 {
            bail!("invalid severity {} for bias term '{}'", severity, source);
        }
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .with_context(|| format!("Invalid bias pattern '{}' in category {}", source, category))?;
        Ok(Self {
            category,
            source: source.to_string(),
            severity,
            suggestion: None,
            regex,
        })
    }

    pub fn with_suggestion(mut self, suggestion: Option<String>) -> Self {
        self.suggestion = suggestion;
        self
    }
}

impl TermSpec {
    fn compile(self, key: &str, category: BiasCategory) -> anyhow::Result<BiasTerm> {
        let term = match (self.term, self.pattern) {
            (Some(term), None) => BiasTerm::term(category, &term, self.severity)?,
            (None, Some(pattern)) => BiasTerm::pattern(category, &pattern, self.severity)?,
            (Some(_), Some(_)) => {
                bail!("bias entry in '{}' has both \"term\" and \"pattern\"", key)
            }
            (None, None) => bail!("bias entry in '{}' needs \"term\" or \"pattern\"", key),
        };
        Ok(term.with_suggestion(self.suggestion))
    }
}

/// Inclusive wording; counted and reported, never scored
#[derive(Debug, Clone)]
pub struct InclusiveMarker {
    pub source: String,
    regex: Regex,
}

impl From<BiasTerm> for InclusiveMarker {
    fn from(term: BiasTerm) -> Self {
        Self {
            source: term.source,
            regex: term.regex,
        }
    }
}

/// Compiled term lists, grouped by category
#[derive(Debug, Clone, Default)]
pub struct BiasTermLists {
    terms: Vec<BiasTerm>,
    inclusive: Vec<InclusiveMarker>,
}

impl BiasTermLists {
    pub fn new(terms: Vec<BiasTerm>) -> Self {
        Self {
            terms,
            inclusive: Vec::new(),
        }
    }

    pub fn with_inclusive(mut self, markers: Vec<InclusiveMarker>) -> Self {
        self.inclusive = markers;
        self
    }

    /// The term lists shipped with the crate
    pub fn builtin() -> Self {
        Self::from_json(BUILTIN_TERMS).unwrap_or_else(|e| {
            tracing::error!(error = %e, "built-in bias term lists are invalid");
            Self::default()
        })
    }

    /// Parse and compile `{ "<category>": [ {"term"|"pattern", "severity"} ] }`
    ///
    /// The `inclusive` key lists wording to credit instead of penalize.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let raw: BTreeMap<String, Vec<TermSpec>> =
            serde_json::from_str(json).context("Invalid bias term list JSON")?;
        let mut terms = Vec::new();
        let mut inclusive = Vec::new();
        for (key, specs) in raw {
            if key.trim().eq_ignore_ascii_case(INCLUSIVE_KEY) {
                for spec in specs {
                    inclusive.push(spec.compile(&key, BiasCategory::Other)?.into());
                }
                continue;
            }
            let category = BiasCategory::from_key(&key);
            for spec in specs {
                terms.push(spec.compile(&key, category)?);
            }
        }
        Ok(Self { terms, inclusive })
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read bias term lists: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to load bias term lists: {}", path.display()))
    }

    pub fn terms(&self) -> &[BiasTerm] {
        &self.terms
    }

    pub fn inclusive(&self) -> &[InclusiveMarker] {
        &self.inclusive
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// One occurrence of a biased term
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BiasFinding {
    pub category: BiasCategory,
    /// Text as it appears in the document
    pub matched: String,
    /// Configured term or pattern that matched
    pub term: String,
    pub context: String,
    pub location: Location,
    pub severity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip)]
    pub offset: usize,
}

/// Overall level of concern
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiasConcern {
    None,
    Minor,
    Moderate,
    Significant,
}

impl BiasConcern {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            BiasConcern::None
        } else if score >= 75.0 {
            BiasConcern::Minor
        } else if score >= 50.0 {
            BiasConcern::Moderate
        } else {
            BiasConcern::Significant
        }
    }
}

impl std::fmt::Display for BiasConcern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BiasConcern::None => write!(f, "no concerns"),
            BiasConcern::Minor => write!(f, "minor concerns"),
            BiasConcern::Moderate => write!(f, "moderate concerns"),
            BiasConcern::Significant => write!(f, "significant concerns"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BiasConfig {
    /// Score points removed per unit of severity
    pub k: f64,
    /// Characters of context either side of a match
    pub context_chars: usize,
    /// Findings at or above this severity always produce a recommendation
    pub review_severity: f64,
}

impl Default for BiasConfig {
    fn default() -> Self {
        Self {
            k: 1.0,
            context_chars: 40,
            review_severity: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BiasResult {
    pub score: f64,
    pub concern: BiasConcern,
    pub total_severity: f64,
    /// Occurrences in document order
    pub matches: Vec<BiasFinding>,
    pub findings: Vec<Finding>,
    pub review_severity: f64,
    /// Occurrences of inclusive wording
    pub inclusive_count: usize,
    /// Inclusive wording as it appears, in document order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inclusive_phrases: Vec<String>,
}

impl BiasResult {
    /// Matches grouped by category, document order within each
    pub fn by_category(&self) -> BTreeMap<BiasCategory, Vec<&BiasFinding>> {
        let mut grouped: BTreeMap<BiasCategory, Vec<&BiasFinding>> = BTreeMap::new();
        for m in &self.matches {
            grouped.entry(m.category).or_default().push(m);
        }
        grouped
    }

    /// Categories with at least one match at or above the review severity
    pub fn categories_for_review(&self) -> Vec<BiasCategory> {
        let mut categories: Vec<BiasCategory> = self
            .matches
            .iter()
            .filter(|m| m.severity >= self.review_severity)
            .map(|m| m.category)
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }

    pub fn render(&self) -> String {
        let mut out = format!("Bias & sensitivity: {:.1}/100 ({})\n", self.score, self.concern);
        if self.inclusive_count > 0 {
            out.push_str(&format!("  Inclusive language: {} phrase(s)\n", self.inclusive_count));
        }
        if self.matches.is_empty() {
            out.push_str("  No flagged language found\n");
            return out;
        }
        for (category, matches) in self.by_category() {
            out.push_str(&format!("  {} ({}):\n", category, matches.len()));
            for m in matches {
                out.push_str(&format!(
                    "    {}:{} \"{}\" (severity {}) ... {} ...\n",
                    m.location.line, m.location.column, m.matched, m.severity, m.context
                ));
                if let Some(s) = &m.suggestion {
                    out.push_str(&format!("      consider: {}\n", s));
                }
            }
        }
        out
    }
}

/// Scan a document with default scoring settings
pub fn scan(doc: &Document, terms: &BiasTermLists) -> BiasResult {
    scan_with(doc, terms, &BiasConfig::default())
}

fn scan_with(doc: &Document, terms: &BiasTermLists, config: &BiasConfig) -> BiasResult {
    let raw = doc.raw();
    let mut matches: Vec<(usize, usize, BiasFinding)> = Vec::new();
    for (idx, term) in terms.terms().iter().enumerate() {
        for m in term.regex.find_iter(raw) {
            if m.as_str().trim().is_empty() {
                continue;
            }
            matches.push((
                m.start(),
                idx,
                BiasFinding {
                    category: term.category,
                    matched: m.as_str().to_string(),
                    term: term.source.clone(),
                    context: doc.context(m.start(), m.end(), config.context_chars),
                    location: doc.location_of(m.start()),
                    severity: term.severity,
                    suggestion: term.suggestion.clone(),
                    offset: m.start(),
                },
            ));
        }
    }
    matches.sort_by_key(|(start, idx, _)| (*start, *idx));
    let matches: Vec<BiasFinding> = matches.into_iter().map(|(_, _, f)| f).collect();

    let total_severity: f64 = matches.iter().map(|m| m.severity).sum();
    let score = (100.0 - total_severity * config.k).clamp(0.0, 100.0);

    let mut inclusive: Vec<(usize, String)> = terms
        .inclusive()
        .iter()
        .flat_map(|marker| marker.regex.find_iter(raw))
        .filter(|m| !m.as_str().trim().is_empty())
        .map(|m| (m.start(), m.as_str().to_string()))
        .collect();
    inclusive.sort();

    let mut findings: Vec<Finding> = matches
        .iter()
        .map(|m| {
            let message = format!("{} language: \"{}\"", m.category, m.matched);
            let finding = if m.severity >= config.review_severity {
                Finding::concern(message)
            } else {
                Finding::warning(message)
            };
            let finding = finding.at(m.location);
            match &m.suggestion {
                Some(s) => finding.with_suggestion(format!("Consider \"{}\"", s)),
                None => finding.with_suggestion("Rephrase in neutral, inclusive terms"),
            }
        })
        .collect();
    findings.extend(inclusive.iter().map(|(start, phrase)| {
        Finding::info(format!("Inclusive language: \"{}\"", phrase)).at(doc.location_of(*start))
    }));

    BiasResult {
        score,
        concern: BiasConcern::from_score(score),
        total_severity,
        matches,
        findings,
        review_severity: config.review_severity,
        inclusive_count: inclusive.len(),
        inclusive_phrases: inclusive.into_iter().map(|(_, phrase)| phrase).collect(),
    }
}

/// Bias detector holding compiled term lists
#[derive(Debug, Clone)]
pub struct BiasDetector {
    terms: Arc<BiasTermLists>,
    config: BiasConfig,
}

impl Default for BiasDetector {
    fn default() -> Self {
        Self::new(BiasTermLists::builtin())
    }
}

impl BiasDetector {
    pub fn new(terms: impl Into<Arc<BiasTermLists>>) -> Self {
        Self {
            terms: terms.into(),
            config: BiasConfig::default(),
        }
    }

    pub fn with_config(mut self, config: BiasConfig) -> Self {
        self.config = config;
        self
    }

    pub fn terms(&self) -> &BiasTermLists {
        &self.terms
    }

    pub fn scan(&self, doc: &Document) -> BiasResult {
        scan_with(doc, &self.terms, &self.config)
    }
}

impl Analyzer for BiasDetector {
    fn component(&self) -> Component {
        Component::Bias
    }

    fn analyze(&self, doc: &Document) -> Result<AnalysisResult, EngineError> {
        Ok(AnalysisResult::Bias(self.scan(doc)))
    }
}
