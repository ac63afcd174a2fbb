//! Pedagogical structure analysis
//!
//! Counts markers of good lesson design (stated objectives, worked examples,
//! assessment prompts, recognisable structure) and turns each count into a
//! saturating 0-10 sub-score.

use super::Analyzer;
use crate::document::bullet_prefix_len;
use crate::{round_to, AnalysisResult, Band, BandThresholds, Component, Document, EngineError, Finding};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// The four pedagogical aspects
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aspect {
    Objectives,
    Examples,
    Assessment,
    Structure,
}

impl Aspect {
    pub const ALL: [Aspect; 4] = [
        Aspect::Objectives,
        Aspect::Examples,
        Aspect::Assessment,
        Aspect::Structure,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Aspect::Objectives => "Learning objectives",
            Aspect::Examples => "Examples",
            Aspect::Assessment => "Assessment",
            Aspect::Structure => "Structural clarity",
        }
    }

    /// Targeted advice when this aspect is weak
    pub fn suggestion(&self) -> &'static str {
        match self {
            Aspect::Objectives => {
                "State clear learning objectives (\"Students will be able to ...\")"
            }
            Aspect::Examples => "Add worked examples or illustrations of the key concepts",
            Aspect::Assessment => "Include practice questions, exercises or a short quiz",
            Aspect::Structure => {
                "Organize the content into sections such as Introduction, Examples, Practice and Summary"
            }
        }
    }
}

impl std::fmt::Display for Aspect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())
    }
}

/// Per-aspect numbers (weights or saturation points)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AspectValues {
    pub objectives: f64,
    pub examples: f64,
    pub assessment: f64,
    pub structure: f64,
}

impl AspectValues {
    pub fn get(&self, aspect: Aspect) -> f64 {
        match aspect {
            Aspect::Objectives => self.objectives,
            Aspect::Examples => self.examples,
            Aspect::Assessment => self.assessment,
            Aspect::Structure => self.structure,
        }
    }

    fn sum(&self) -> f64 {
        Aspect::ALL.iter().map(|a| self.get(*a)).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PedagogyConfig {
    pub weights: AspectValues,
    /// Marker count at which a sub-score reaches 10
    pub saturation: AspectValues,
    /// Sub-scores below this are called out in findings and recommendations
    pub weak_below: f64,
}

impl Default for PedagogyConfig {
    fn default() -> Self {
        Self {
            weights: AspectValues {
                objectives: 0.3,
                examples: 0.25,
                assessment: 0.25,
                structure: 0.2,
            },
            saturation: AspectValues {
                objectives: 3.0,
                examples: 4.0,
                assessment: 4.0,
                structure: 4.0,
            },
            weak_below: 5.0,
        }
    }
}

impl PedagogyConfig {
    /// Weights scaled to sum to 1 (equal weights if they sum to zero)
    pub fn normalized_weights(&self) -> AspectValues {
        let w = self.weights;
        let total = w.sum();
        if total <= 0.0 || !total.is_finite() {
            return AspectValues {
                objectives: 0.25,
                examples: 0.25,
                assessment: 0.25,
                structure: 0.25,
            };
        }
        AspectValues {
            objectives: w.objectives.max(0.0) / total,
            examples: w.examples.max(0.0) / total,
            assessment: w.assessment.max(0.0) / total,
            structure: w.structure.max(0.0) / total,
        }
    }
}

/// Saturating sub-score in [0, 10]
pub fn sub_score(count: usize, saturation: f64) -> f64 {
    let saturation = saturation.max(1.0);
    10.0 * (count as f64).min(saturation) / saturation
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubScore {
    pub aspect: Aspect,
    /// Markers found
    pub count: usize,
    /// 0-10
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PedagogyResult {
    pub sub_scores: Vec<SubScore>,
    pub score: f64,
    pub band: Band,
    /// Recognised section types present
    pub structure_sections: Vec<String>,
    pub findings: Vec<Finding>,
    #[serde(skip)]
    weak_below: f64,
}

impl PedagogyResult {
    pub fn sub_score(&self, aspect: Aspect) -> Option<&SubScore> {
        self.sub_scores.iter().find(|s| s.aspect == aspect)
    }

    /// Sub-scores from weakest to strongest (stable for ties)
    pub fn weakest(&self) -> Vec<&SubScore> {
        let mut sorted: Vec<&SubScore> = self.sub_scores.iter().collect();
        sorted.sort_by(|a, b| a.score.total_cmp(&b.score));
        sorted
    }

    /// Sub-scores under the weak threshold, or the single weakest if none are
    pub fn weak_aspects(&self) -> Vec<&SubScore> {
        let weakest = self.weakest();
        let weak: Vec<&SubScore> = weakest
            .iter()
            .copied()
            .filter(|s| s.score < self.weak_below)
            .collect();
        if weak.is_empty() {
            weakest.into_iter().take(1).collect()
        } else {
            weak
        }
    }

    pub fn render(&self) -> String {
        let mut out = format!("Pedagogical quality: {:.1}/100 ({})\n", self.score, self.band);
        for sub in &self.sub_scores {
            out.push_str(&format!(
                "  {:<20} {:>4.1}/10  ({} found)\n",
                sub.aspect.title(),
                sub.score,
                sub.count
            ));
        }
        if !self.structure_sections.is_empty() {
            out.push_str(&format!("  Sections: {}\n", self.structure_sections.join(", ")));
        }
        for finding in &self.findings {
            out.push_str(&format!("  - {}\n", finding));
        }
        out
    }
}

fn objective_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:(?:students?|learners?|you) (?:will|should|can)(?: be able to)?|by the end of (?:this|the) (?:lesson|unit|chapter|module|activity)|(?:learning )?(?:objectives?|outcomes?)|(?:lesson )?goals?)\b",
        )
        .expect("valid objective regex")
    })
}

fn example_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:for example|for instance|such as|e\.g\.|worked example|case study|illustration|(?:example|problem) \d+)",
        )
        .expect("valid example regex")
    })
}

fn assessment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:quiz(?:zes)?|exercises?|practice problems?|practice|assessments?|check your understanding|review questions|test yourself|worksheet)\b",
        )
        .expect("valid assessment regex")
    })
}

/// Recognised section types and the label words that identify them
const STRUCTURE_SECTIONS: &[(&str, &[&str])] = &[
    ("introduction", &["introduction", "intro"]),
    ("overview", &["overview"]),
    ("objectives", &["objective", "objectives", "goals", "outcomes"]),
    ("background", &["background"]),
    ("examples", &["example", "examples"]),
    ("practice", &["practice", "exercises"]),
    ("activities", &["activity", "activities"]),
    ("assessment", &["assessment", "quiz", "test"]),
    ("summary", &["summary", "recap"]),
    ("conclusion", &["conclusion"]),
    ("review", &["review"]),
    ("key points", &["key points", "key ideas"]),
    ("vocabulary", &["vocabulary", "glossary", "key terms"]),
];

fn label_matches(label: &str, needles: &[&str]) -> bool {
    let words = crate::document::tokenize(label);
    let joined = words.join(" ");
    needles.iter().any(|needle| {
        if needle.contains(' ') {
            joined.contains(needle)
        } else {
            words.iter().any(|w| w == needle)
        }
    })
}

/// Pedagogical analyzer
#[derive(Debug, Clone, Default)]
pub struct PedagogicalAnalyzer {
    config: PedagogyConfig,
    bands: BandThresholds,
}

impl PedagogicalAnalyzer {
    pub fn new(config: PedagogyConfig) -> Self {
        Self {
            config,
            bands: BandThresholds::default(),
        }
    }

    pub fn with_bands(mut self, bands: BandThresholds) -> Self {
        self.bands = bands;
        self
    }

    fn count_markers(&self, doc: &Document) -> ([usize; 4], Vec<String>) {
        let body = doc
            .sections()
            .iter()
            .map(|s| s.body.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let labels: Vec<&str> = doc
            .sections()
            .iter()
            .map(|s| s.label.as_str())
            .filter(|l| !l.is_empty())
            .collect();

        let objectives = objective_regex().find_iter(&body).count()
            + labels
                .iter()
                .filter(|l| label_matches(l, &["objective", "objectives", "goals", "outcomes", "aims"]))
                .count();

        let bullets = doc
            .body_lines()
            .filter(|line| bullet_prefix_len(line).is_some())
            .count();
        let examples = example_regex().find_iter(&body).count()
            + bullets
            + labels
                .iter()
                .filter(|l| label_matches(l, &["example", "examples"]))
                .count();

        let questions = doc
            .sentences()
            .iter()
            .filter(|s| s.text.trim_end().ends_with('?'))
            .count();
        let assessment = assessment_regex().find_iter(&body).count()
            + questions
            + labels
                .iter()
                .filter(|l| label_matches(l, &["assessment", "quiz", "exercises", "practice"]))
                .count();

        let present: BTreeSet<&str> = STRUCTURE_SECTIONS
            .iter()
            .filter(|(_, needles)| labels.iter().any(|l| label_matches(l, needles)))
            .map(|(name, _)| *name)
            .collect();
        let structure_sections: Vec<String> = STRUCTURE_SECTIONS
            .iter()
            .map(|(name, _)| *name)
            .filter(|name| present.contains(name))
            .map(str::to_string)
            .collect();

        (
            [objectives, examples, assessment, structure_sections.len()],
            structure_sections,
        )
    }

    pub fn evaluate(&self, doc: &Document) -> PedagogyResult {
        let (counts, structure_sections) = self.count_markers(doc);
        let weights = self.config.normalized_weights();

        let sub_scores: Vec<SubScore> = Aspect::ALL
            .iter()
            .zip(counts)
            .map(|(&aspect, count)| SubScore {
                aspect,
                count,
                score: round_to(sub_score(count, self.config.saturation.get(aspect)), 2),
            })
            .collect();

        let weighted: f64 = sub_scores
            .iter()
            .map(|s| weights.get(s.aspect) * s.score)
            .sum();
        let score = round_to((10.0 * weighted).clamp(0.0, 100.0), 2);

        let mut findings = Vec::new();
        for sub in &sub_scores {
            let message = format!(
                "{}: {} indicator{} ({:.1}/10)",
                sub.aspect.title(),
                sub.count,
                if sub.count == 1 { "" } else { "s" },
                sub.score
            );
            if sub.score < self.config.weak_below {
                findings.push(Finding::warning(message).with_suggestion(sub.aspect.suggestion()));
            } else {
                findings.push(Finding::info(message));
            }
        }

        PedagogyResult {
            sub_scores,
            score,
            band: Band::from_score(score, &self.bands),
            structure_sections,
            findings,
            weak_below: self.config.weak_below,
        }
    }
}

impl Analyzer for PedagogicalAnalyzer {
    fn component(&self) -> Component {
        Component::Pedagogy
    }

    fn analyze(&self, doc: &Document) -> Result<AnalysisResult, EngineError> {
        Ok(AnalysisResult::Pedagogy(self.evaluate(doc)))
    }
}
