//! eduscore: quality evaluator for educational resources
//!
//! This library scores a single educational document along four independent
//! dimensions (curriculum coverage, readability, pedagogical structure and
//! bias/sensitivity) and combines them into an overall evaluation with
//! actionable recommendations.

pub mod analyzer;
pub mod config;
pub mod document;
pub mod error;
pub mod logging;
pub mod reporter;
pub mod session;

pub use analyzer::bias::{BiasCategory, BiasFinding, BiasResult, BiasTermLists};
pub use analyzer::curriculum::{CurriculumFramework, CurriculumResult};
pub use analyzer::pedagogy::PedagogyResult;
pub use analyzer::readability::ReadabilityResult;
pub use analyzer::scoring::{Aggregator, OverallEvaluation, Recommendation};
pub use document::Document;
pub use error::EngineError;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The four scoring dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Curriculum,
    Readability,
    Pedagogy,
    Bias,
}

impl Component {
    pub const ALL: [Component; 4] = [
        Component::Curriculum,
        Component::Readability,
        Component::Pedagogy,
        Component::Bias,
    ];

    /// Parse a component name as given on the command line
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "curriculum" | "alignment" => Some(Component::Curriculum),
            "readability" => Some(Component::Readability),
            "pedagogy" | "pedagogical" => Some(Component::Pedagogy),
            "bias" | "sensitivity" => Some(Component::Bias),
            _ => None,
        }
    }

    /// Human-readable title
    pub fn title(&self) -> &'static str {
        match self {
            Component::Curriculum => "Curriculum Alignment",
            Component::Readability => "Readability",
            Component::Pedagogy => "Pedagogical Quality",
            Component::Bias => "Bias & Sensitivity",
        }
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Component::Curriculum => write!(f, "curriculum"),
            Component::Readability => write!(f, "readability"),
            Component::Pedagogy => write!(f, "pedagogy"),
            Component::Bias => write!(f, "bias"),
        }
    }
}

/// Parse a comma-separated component list ("readability,bias")
pub fn parse_components(list: &str) -> Result<BTreeSet<Component>, String> {
    let mut out = BTreeSet::new();
    for name in list.split(',').filter(|s| !s.trim().is_empty()) {
        match Component::parse(name) {
            Some(c) => {
                out.insert(c);
            }
            None => return Err(format!("unknown component: {}", name.trim())),
        }
    }
    if out.is_empty() {
        return Err("no components given".to_string());
    }
    Ok(out)
}

/// Qualitative band shared by curriculum, pedagogy and the overall verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl Band {
    pub fn from_score(score: f64, thresholds: &BandThresholds) -> Self {
        if score >= thresholds.excellent {
            Band::Excellent
        } else if score >= thresholds.good {
            Band::Good
        } else if score >= thresholds.fair {
            Band::Fair
        } else {
            Band::Poor
        }
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Band::Excellent => write!(f, "excellent"),
            Band::Good => write!(f, "good"),
            Band::Fair => write!(f, "fair"),
            Band::Poor => write!(f, "poor"),
        }
    }
}

/// Score thresholds for [`Band`] (inclusive lower bounds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandThresholds {
    pub excellent: f64,
    pub good: f64,
    pub fair: f64,
}

impl Default for BandThresholds {
    fn default() -> Self {
        Self {
            excellent: 90.0,
            good: 75.0,
            fair: 50.0,
        }
    }
}

/// School grade bands used for readability labels and curriculum lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeBand {
    Elementary,
    #[serde(alias = "middle")]
    MiddleSchool,
    #[serde(alias = "high")]
    HighSchool,
    College,
}

impl GradeBand {
    /// Band for a (possibly fractional) US grade level
    pub fn from_grade(grade: f64) -> Self {
        if grade < 6.0 {
            GradeBand::Elementary
        } else if grade < 9.0 {
            GradeBand::MiddleSchool
        } else if grade < 13.0 {
            GradeBand::HighSchool
        } else {
            GradeBand::College
        }
    }

    /// Grade range covered by the band, as `[start, end)`
    pub fn range(&self) -> (f64, f64) {
        match self {
            GradeBand::Elementary => (0.0, 6.0),
            GradeBand::MiddleSchool => (6.0, 9.0),
            GradeBand::HighSchool => (9.0, 13.0),
            GradeBand::College => (13.0, 17.0),
        }
    }

    /// Distance in grades from `grade` to the closed range `[start, end]`.
    /// Both ends count as inside, so a grade exactly at `end` is 0 away.
    pub fn distance(&self, grade: f64) -> f64 {
        let (start, end) = self.range();
        if grade < start {
            start - grade
        } else if grade > end {
            grade - end
        } else {
            0.0
        }
    }

    /// Parse free-form grade metadata: "4", "Grade 7", "6-8", "K", "middle school", "college"
    pub fn parse(value: &str) -> Option<Self> {
        let lower = value.trim().to_ascii_lowercase();
        if lower.is_empty() {
            return None;
        }
        for (needle, band) in [
            ("elementary", GradeBand::Elementary),
            ("primary", GradeBand::Elementary),
            ("middle", GradeBand::MiddleSchool),
            ("high", GradeBand::HighSchool),
            ("secondary", GradeBand::HighSchool),
            ("college", GradeBand::College),
            ("university", GradeBand::College),
            ("undergraduate", GradeBand::College),
        ] {
            if lower.contains(needle) {
                return Some(band);
            }
        }
        if lower == "k" || lower.starts_with("k-") || lower == "kindergarten" {
            return Some(GradeBand::Elementary);
        }
        // First number wins ("6-8" -> 6)
        let digits: String = lower
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse::<u32>().ok().map(|g| Self::from_grade(g as f64))
    }

    /// Framework key ("elementary", "middle_school", ...)
    pub fn key(&self) -> &'static str {
        match self {
            GradeBand::Elementary => "elementary",
            GradeBand::MiddleSchool => "middle_school",
            GradeBand::HighSchool => "high_school",
            GradeBand::College => "college",
        }
    }
}

impl std::fmt::Display for GradeBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GradeBand::Elementary => write!(f, "Elementary (K-5)"),
            GradeBand::MiddleSchool => write!(f, "Middle School (6-8)"),
            GradeBand::HighSchool => write!(f, "High School (9-12)"),
            GradeBand::College => write!(f, "College"),
        }
    }
}

/// Severity of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Concern,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Concern => write!(f, "concern"),
        }
    }
}

/// A non-fatal observation attached to an analysis result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Finding {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
            location: None,
            suggestion: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::info(message)
        }
    }

    pub fn concern(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Concern,
            ..Self::info(message)
        }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.location {
            Some(loc) => write!(f, "[{}] {}:{} {}", self.severity, loc.line, loc.column, self.message),
            None => write!(f, "[{}] {}", self.severity, self.message),
        }
    }
}

/// Location in the raw document text (1-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Result of one analyzer invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "component", rename_all = "lowercase")]
pub enum AnalysisResult {
    Curriculum(CurriculumResult),
    Readability(ReadabilityResult),
    Pedagogy(PedagogyResult),
    Bias(BiasResult),
}

impl AnalysisResult {
    pub fn component(&self) -> Component {
        match self {
            AnalysisResult::Curriculum(_) => Component::Curriculum,
            AnalysisResult::Readability(_) => Component::Readability,
            AnalysisResult::Pedagogy(_) => Component::Pedagogy,
            AnalysisResult::Bias(_) => Component::Bias,
        }
    }

    /// Score in [0, 100] as consumed by the aggregator
    pub fn score(&self) -> f64 {
        match self {
            AnalysisResult::Curriculum(r) => r.alignment_score,
            AnalysisResult::Readability(r) => r.appropriateness,
            AnalysisResult::Pedagogy(r) => r.score,
            AnalysisResult::Bias(r) => r.score,
        }
    }

    /// Qualitative label for the score
    pub fn label(&self) -> String {
        match self {
            AnalysisResult::Curriculum(r) => r.band.to_string(),
            AnalysisResult::Readability(r) => r.grade_band.to_string(),
            AnalysisResult::Pedagogy(r) => r.band.to_string(),
            AnalysisResult::Bias(r) => r.concern.to_string(),
        }
    }

    pub fn findings(&self) -> &[Finding] {
        match self {
            AnalysisResult::Curriculum(r) => &r.findings,
            AnalysisResult::Readability(r) => &r.findings,
            AnalysisResult::Pedagogy(r) => &r.findings,
            AnalysisResult::Bias(r) => &r.findings,
        }
    }

    /// Plain-text rendering (scores, label, findings)
    pub fn render(&self) -> String {
        match self {
            AnalysisResult::Curriculum(r) => r.render(),
            AnalysisResult::Readability(r) => r.render(),
            AnalysisResult::Pedagogy(r) => r.render(),
            AnalysisResult::Bias(r) => r.render(),
        }
    }
}

/// The analyses run so far for one document (any subset of the four)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curriculum: Option<CurriculumResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readability: Option<ReadabilityResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pedagogy: Option<PedagogyResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bias: Option<BiasResult>,
}

impl AnalysisSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a result, replacing any earlier result for the same component
    pub fn insert(&mut self, result: AnalysisResult) {
        match result {
            AnalysisResult::Curriculum(r) => self.curriculum = Some(r),
            AnalysisResult::Readability(r) => self.readability = Some(r),
            AnalysisResult::Pedagogy(r) => self.pedagogy = Some(r),
            AnalysisResult::Bias(r) => self.bias = Some(r),
        }
    }

    pub fn with(mut self, result: AnalysisResult) -> Self {
        self.insert(result);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.curriculum.is_none()
            && self.readability.is_none()
            && self.pedagogy.is_none()
            && self.bias.is_none()
    }

    pub fn len(&self) -> usize {
        self.components().len()
    }

    /// Components present, in canonical order
    pub fn components(&self) -> Vec<Component> {
        Component::ALL
            .into_iter()
            .filter(|c| self.score(*c).is_some())
            .collect()
    }

    /// Aggregator-facing score of a component, if it was run
    pub fn score(&self, component: Component) -> Option<f64> {
        match component {
            Component::Curriculum => self.curriculum.as_ref().map(|r| r.alignment_score),
            Component::Readability => self.readability.as_ref().map(|r| r.appropriateness),
            Component::Pedagogy => self.pedagogy.as_ref().map(|r| r.score),
            Component::Bias => self.bias.as_ref().map(|r| r.score),
        }
    }

    /// Owned copies of the stored results, in canonical order
    pub fn results(&self) -> Vec<AnalysisResult> {
        let mut out = Vec::new();
        if let Some(r) = &self.curriculum {
            out.push(AnalysisResult::Curriculum(r.clone()));
        }
        if let Some(r) = &self.readability {
            out.push(AnalysisResult::Readability(r.clone()));
        }
        if let Some(r) = &self.pedagogy {
            out.push(AnalysisResult::Pedagogy(r.clone()));
        }
        if let Some(r) = &self.bias {
            out.push(AnalysisResult::Bias(r.clone()));
        }
        out
    }
}

/// Round to `places` decimals for display and stable JSON output
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
