//! Curriculum alignment
//!
//! Matches the document against the required topics a framework lists for
//! its subject and grade band.

use super::Analyzer;
use crate::{round_to, AnalysisResult, Band, BandThresholds, Component, Document, EngineError, Finding, GradeBand};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

const BUILTIN_FRAMEWORK: &str = include_str!("../../data/curriculum.json");

/// A required topic and the phrases that count as covering it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Topic {
    pub name: String,
    pub keywords: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TopicSpec {
    Name(String),
    Detailed {
        topic: String,
        #[serde(default)]
        keywords: Vec<String>,
    },
}

impl From<TopicSpec> for Topic {
    fn from(spec: TopicSpec) -> Self {
        match spec {
            TopicSpec::Name(name) => Topic {
                keywords: vec![name.clone()],
                name,
            },
            TopicSpec::Detailed { topic, keywords } => {
                let keywords = if keywords.is_empty() {
                    vec![topic.clone()]
                } else {
                    keywords
                };
                Topic {
                    name: topic,
                    keywords,
                }
            }
        }
    }
}

/// Normalize a subject name: lowercase, spaces/hyphens/underscores equivalent
pub fn normalize_subject(subject: &str) -> String {
    subject
        .trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Required topics by subject and grade band
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurriculumFramework {
    subjects: BTreeMap<String, BTreeMap<GradeBand, Vec<Topic>>>,
}

impl CurriculumFramework {
    /// The framework shipped with the crate
    pub fn builtin() -> Self {
        Self::from_json(BUILTIN_FRAMEWORK).unwrap_or_else(|e| {
            tracing::error!(error = %e, "built-in curriculum framework is invalid");
            Self::default()
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, BTreeMap<GradeBand, Vec<TopicSpec>>> =
            serde_json::from_str(json).context("Invalid curriculum framework JSON")?;
        let mut subjects: BTreeMap<String, BTreeMap<GradeBand, Vec<Topic>>> = BTreeMap::new();
        for (subject, bands) in raw {
            let entry = subjects.entry(normalize_subject(&subject)).or_default();
            for (band, topics) in bands {
                entry
                    .entry(band)
                    .or_default()
                    .extend(topics.into_iter().map(Topic::from));
            }
        }
        Ok(Self { subjects })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read curriculum framework: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to load curriculum framework: {}", path.display()))
    }

    /// Known subjects (normalized)
    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.subjects.keys().map(String::as_str)
    }

    /// Required topics for a subject and grade band, in framework order
    pub fn topics(&self, subject: &str, band: GradeBand) -> Option<&[Topic]> {
        self.subjects
            .get(&normalize_subject(subject))
            .and_then(|bands| bands.get(&band))
            .map(Vec::as_slice)
    }

    /// Coverage of every subject, at one grade band or across all of them
    pub fn subject_alignments(
        &self,
        doc: &Document,
        band: Option<GradeBand>,
    ) -> Vec<SubjectAlignment> {
        self.subjects
            .iter()
            .filter_map(|(subject, bands)| {
                let topics: Vec<&Topic> = match band {
                    Some(band) => bands.get(&band).into_iter().flatten().collect(),
                    None => bands.values().flatten().collect(),
                };
                if topics.is_empty() {
                    return None;
                }
                let covered: Vec<String> = topics
                    .iter()
                    .filter(|topic| topic.keywords.iter().any(|k| doc.contains_phrase(k)))
                    .map(|topic| topic.name.clone())
                    .collect();
                let score = round_to(100.0 * covered.len() as f64 / topics.len() as f64, 2);
                Some(SubjectAlignment {
                    subject: subject.clone(),
                    grade_band: band,
                    covered_topics: covered,
                    total_topics: topics.len(),
                    score,
                })
            })
            .collect()
    }
}

/// Coverage of one framework subject, reported when the document names none
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAlignment {
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade_band: Option<GradeBand>,
    pub covered_topics: Vec<String>,
    pub total_topics: usize,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade_band: Option<GradeBand>,
    /// False when the framework had no entry for this subject/grade
    pub framework_available: bool,
    pub covered_topics: Vec<String>,
    pub missing_topics: Vec<String>,
    pub total_topics: usize,
    pub alignment_score: f64,
    pub band: Band,
    /// Per-subject coverage when no subject was declared; never scored
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subject_alignments: Vec<SubjectAlignment>,
    pub findings: Vec<Finding>,
}

impl CurriculumResult {
    /// Subject with the highest coverage, first in name order on ties
    pub fn closest_subject(&self) -> Option<&SubjectAlignment> {
        self.subject_alignments
            .iter()
            .filter(|a| !a.covered_topics.is_empty())
            .fold(None, |best: Option<&SubjectAlignment>, a| match best {
                Some(b) if b.score >= a.score => Some(b),
                _ => Some(a),
            })
    }

    pub fn coverage_ratio(&self) -> f64 {
        if self.total_topics == 0 {
            return 1.0;
        }
        self.covered_topics.len() as f64 / self.total_topics as f64
    }

    pub fn render(&self) -> String {
        let mut out = format!(
            "Curriculum alignment: {:.2}/100 ({})\n",
            self.alignment_score, self.band
        );
        let subject = self.subject.as_deref().unwrap_or("unknown subject");
        match self.grade_band {
            Some(band) => out.push_str(&format!("  Framework: {} / {}\n", subject, band)),
            None => out.push_str(&format!("  Framework: {} / unknown grade\n", subject)),
        }
        if self.framework_available {
            out.push_str(&format!(
                "  Covered {}/{} topics\n",
                self.covered_topics.len(),
                self.total_topics
            ));
            if !self.covered_topics.is_empty() {
                out.push_str(&format!("  Covered: {}\n", self.covered_topics.join(", ")));
            }
            if !self.missing_topics.is_empty() {
                out.push_str(&format!("  Missing: {}\n", self.missing_topics.join(", ")));
            }
        }
        for alignment in &self.subject_alignments {
            out.push_str(&format!(
                "  {}: {}/{} topics ({:.2}%)\n",
                alignment.subject,
                alignment.covered_topics.len(),
                alignment.total_topics,
                alignment.score
            ));
        }
        for finding in &self.findings {
            out.push_str(&format!("  - {}\n", finding));
        }
        out
    }
}

/// Check a document against a framework, using its own subject/grade metadata
pub fn check(doc: &Document, framework: &CurriculumFramework) -> CurriculumResult {
    CurriculumChecker::new(framework.clone()).check(doc)
}

/// Curriculum checker with optional subject/grade overrides
#[derive(Debug, Clone)]
pub struct CurriculumChecker {
    framework: Arc<CurriculumFramework>,
    subject: Option<String>,
    grade: Option<GradeBand>,
    bands: BandThresholds,
}

impl Default for CurriculumChecker {
    fn default() -> Self {
        Self::new(CurriculumFramework::builtin())
    }
}

impl CurriculumChecker {
    pub fn new(framework: impl Into<Arc<CurriculumFramework>>) -> Self {
        Self {
            framework: framework.into(),
            subject: None,
            grade: None,
            bands: BandThresholds::default(),
        }
    }

    /// Override the subject taken from document metadata
    pub fn with_subject(mut self, subject: Option<String>) -> Self {
        self.subject = subject;
        self
    }

    /// Override the grade band taken from document metadata
    pub fn with_grade(mut self, grade: Option<GradeBand>) -> Self {
        self.grade = grade;
        self
    }

    pub fn with_bands(mut self, bands: BandThresholds) -> Self {
        self.bands = bands;
        self
    }

    pub fn framework(&self) -> &CurriculumFramework {
        &self.framework
    }

    pub fn check(&self, doc: &Document) -> CurriculumResult {
        let subject = self
            .subject
            .clone()
            .or_else(|| doc.metadata().subject.clone())
            .map(|s| normalize_subject(&s))
            .filter(|s| !s.is_empty());
        let grade_band = self.grade.or_else(|| doc.target_grade_band());

        let topics = match (&subject, grade_band) {
            (Some(s), Some(g)) => self.framework.topics(s, g),
            _ => None,
        };

        let Some(topics) = topics.filter(|t| !t.is_empty()) else {
            let reason = match (&subject, grade_band) {
                (None, _) => "document declares no subject".to_string(),
                (Some(_), None) => "document declares no grade level".to_string(),
                (Some(s), Some(g)) => format!("no topics listed for {} at {}", s, g.key()),
            };
            let subject_alignments = if subject.is_none() {
                self.framework.subject_alignments(doc, grade_band)
            } else {
                Vec::new()
            };
            let mut result = CurriculumResult {
                subject,
                grade_band,
                framework_available: false,
                covered_topics: Vec::new(),
                missing_topics: Vec::new(),
                total_topics: 0,
                alignment_score: 100.0,
                band: Band::from_score(100.0, &self.bands),
                subject_alignments,
                findings: vec![Finding::info(format!(
                    "No curriculum framework available ({}); alignment not assessed",
                    reason
                ))],
            };
            if let Some(best) = result.closest_subject() {
                let note = Finding::info(format!(
                    "Closest subject: {} ({} of {} topics)",
                    best.subject,
                    best.covered_topics.len(),
                    best.total_topics
                ))
                .with_suggestion("Declare a Subject: line to score curriculum alignment");
                result.findings.push(note);
            }
            return result;
        };

        let (covered, missing): (Vec<&Topic>, Vec<&Topic>) = topics
            .iter()
            .partition(|topic| topic.keywords.iter().any(|k| doc.contains_phrase(k)));

        let total = topics.len();
        let alignment_score = round_to(100.0 * covered.len() as f64 / total as f64, 2);
        let covered_topics: Vec<String> = covered.iter().map(|t| t.name.clone()).collect();
        let missing_topics: Vec<String> = missing.iter().map(|t| t.name.clone()).collect();

        let mut findings = vec![Finding::info(format!(
            "Covers {} of {} required topics",
            covered_topics.len(),
            total
        ))];
        if !missing_topics.is_empty() {
            findings.push(
                Finding::warning(format!("Missing topics: {}", missing_topics.join(", ")))
                    .with_suggestion("Add content or examples for the missing topics"),
            );
        }

        CurriculumResult {
            subject,
            grade_band,
            framework_available: true,
            covered_topics,
            missing_topics,
            total_topics: total,
            alignment_score,
            band: Band::from_score(alignment_score, &self.bands),
            subject_alignments: Vec::new(),
            findings,
        }
    }
}

impl Analyzer for CurriculumChecker {
    fn component(&self) -> Component {
        Component::Curriculum
    }

    fn analyze(&self, doc: &Document) -> Result<AnalysisResult, EngineError> {
        Ok(AnalysisResult::Curriculum(self.check(doc)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arithmetic() -> CurriculumFramework {
        CurriculumFramework::from_json(
            r#"{"Mathematics": {"elementary": ["addition", "subtraction", "multiplication"]}}"#,
        )
        .unwrap()
    }

    #[test]
    fn partial_coverage() {
        let doc = Document::parse(
            "Subject: Mathematics\nGrade: 3\n\nToday we practice addition. Then we try subtraction.",
        );
        let r = check(&doc, &arithmetic());
        assert!(r.framework_available);
        assert_eq!(r.alignment_score, 66.67);
        assert_eq!(r.covered_topics, vec!["addition", "subtraction"]);
        assert_eq!(r.missing_topics, vec!["multiplication"]);
        assert_eq!(r.band, Band::Fair);
    }

    #[test]
    fn leading_focus_line_counts_toward_coverage() {
        let framework =
            CurriculumFramework::from_json(r#"{"math": {"elementary": ["fractions"]}}"#).unwrap();
        let doc = Document::parse(
            "Subject: math\nGrade: 3\nFocus: adding fractions with pictures\n\nWe draw pizzas.",
        );
        let r = check(&doc, &framework);
        assert_eq!(r.alignment_score, 100.0);
        assert!(r.missing_topics.is_empty());
    }

    #[test]
    fn subject_names_are_normalized() {
        let framework =
            CurriculumFramework::from_json(r#"{"language_arts": {"middle_school": ["essays"]}}"#)
                .unwrap();
        assert!(framework.topics("Language Arts", GradeBand::MiddleSchool).is_some());
        assert!(framework.topics("language-arts", GradeBand::MiddleSchool).is_some());
    }

    #[test]
    fn keyword_variants_count_as_coverage() {
        let framework = CurriculumFramework::from_json(
            r#"{"math": {"elementary": [{"topic": "multiplication", "keywords": ["times tables", "multiply"]}]}}"#,
        )
        .unwrap();
        let doc = Document::parse("Subject: math\nGrade: 2\n\nWe learn our times tables.");
        let r = check(&doc, &framework);
        assert_eq!(r.alignment_score, 100.0);
        assert_eq!(r.band, Band::Excellent);
    }

    #[test]
    fn unknown_subject_scores_100_with_note() {
        let doc = Document::parse("Subject: Astrology\nGrade: 4\n\nStars are bright.");
        let r = check(&doc, &arithmetic());
        assert!(!r.framework_available);
        assert_eq!(r.alignment_score, 100.0);
        assert_eq!(r.total_topics, 0);
        assert!(r.findings[0].message.contains("No curriculum framework"));
    }

    #[test]
    fn missing_metadata_scores_100() {
        let r = check(&Document::parse("Just some text."), &arithmetic());
        assert_eq!(r.alignment_score, 100.0);
        assert!(r.findings[0].message.contains("no subject"));
    }

    #[test]
    fn undeclared_subject_reports_per_subject_coverage() {
        let framework = CurriculumFramework::from_json(
            r#"{"math": {"elementary": ["addition", "subtraction"]},
                "science": {"elementary": ["plants", "weather", "rocks"]}}"#,
        )
        .unwrap();
        let doc = Document::parse("Grade: 2\n\nPlants need rain. Rain is weather.");
        let r = check(&doc, &framework);
        assert!(!r.framework_available);
        assert_eq!(r.alignment_score, 100.0);
        assert_eq!(r.subject_alignments.len(), 2);
        let science = &r.subject_alignments[1];
        assert_eq!(science.subject, "science");
        assert_eq!(science.covered_topics, vec!["plants", "weather"]);
        assert_eq!(science.score, 66.67);
        assert_eq!(r.subject_alignments[0].score, 0.0);
        assert_eq!(r.closest_subject().map(|a| a.subject.as_str()), Some("science"));
        assert!(r.findings.iter().any(|f| f.message == "Closest subject: science (2 of 3 topics)"));
    }

    #[test]
    fn undeclared_subject_and_grade_spans_all_bands() {
        let framework = CurriculumFramework::from_json(
            r#"{"math": {"elementary": ["addition"], "high_school": ["calculus"]}}"#,
        )
        .unwrap();
        let r = check(&Document::parse("We study calculus today."), &framework);
        assert_eq!(r.subject_alignments.len(), 1);
        assert_eq!(r.subject_alignments[0].grade_band, None);
        assert_eq!(r.subject_alignments[0].total_topics, 2);
        assert_eq!(r.subject_alignments[0].covered_topics, vec!["calculus"]);
    }

    #[test]
    fn declared_subject_has_no_per_subject_breakdown() {
        let doc = Document::parse("Subject: Astrology\nGrade: 4\n\nWe practice addition.");
        let r = check(&doc, &arithmetic());
        assert!(r.subject_alignments.is_empty());
        assert_eq!(r.findings.len(), 1);
    }

    #[test]
    fn overrides_replace_metadata() {
        let doc = Document::parse("We learn multiplication.");
        let r = CurriculumChecker::new(arithmetic())
            .with_subject(Some("mathematics".to_string()))
            .with_grade(Some(GradeBand::Elementary))
            .check(&doc);
        assert_eq!(r.covered_topics, vec!["multiplication"]);
    }

    #[test]
    fn builtin_framework_loads() {
        let framework = CurriculumFramework::builtin();
        let subjects: Vec<&str> = framework.subjects().collect();
        assert_eq!(
            subjects,
            vec!["language_arts", "mathematics", "science", "social_studies"]
        );
        for subject in &subjects {
            for band in [GradeBand::Elementary, GradeBand::MiddleSchool, GradeBand::HighSchool] {
                assert!(framework.topics(subject, band).is_some_and(|t| !t.is_empty()));
            }
        }
    }

    #[test]
    fn invalid_framework_is_error() {
        assert!(CurriculumFramework::from_json("[1, 2]").is_err());
        assert!(CurriculumFramework::from_json(r#"{"math": {"grade_99": []}}"#).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_score_monotone_in_coverage(mask in prop::collection::vec(any::<bool>(), 5)) {
            let names = ["addition", "subtraction", "multiplication", "division", "fractions"];
            let framework = CurriculumFramework::from_json(
                r#"{"math": {"elementary": ["addition", "subtraction", "multiplication", "division", "fractions"]}}"#,
            ).unwrap();
            let mentioned: Vec<&str> = names.iter().zip(&mask).filter(|(_, m)| **m).map(|(n, _)| *n).collect();
            let base = format!("Subject: math\nGrade: 1\n\nWe study {}.", mentioned.join(" and "));
            let base_score = check(&Document::parse(base.as_str()), &framework).alignment_score;

            if let Some(extra) = names.iter().zip(&mask).find(|(_, m)| !**m).map(|(n, _)| *n) {
                let more = format!("{} Also {}.", base, extra);
                let more_score = check(&Document::parse(more.as_str()), &framework).alignment_score;
                prop_assert!(more_score >= base_score);
            }
            prop_assert!((0.0..=100.0).contains(&base_score));
        }
    }
}
