//! Aggregation of component scores into an overall evaluation

use crate::analyzer::readability::Direction;
use crate::config::ScoringConfig;
use crate::{AnalysisSet, Band, BandThresholds, Component, EngineError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Relative weight of each component in the composite
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComponentWeights {
    pub curriculum: f64,
    pub readability: f64,
    pub pedagogy: f64,
    pub bias: f64,
}

impl Default for ComponentWeights {
    fn default() -> Self {
        Self {
            curriculum: 0.3,
            readability: 0.2,
            pedagogy: 0.3,
            bias: 0.2,
        }
    }
}

impl ComponentWeights {
    pub fn get(&self, component: Component) -> f64 {
        match component {
            Component::Curriculum => self.curriculum,
            Component::Readability => self.readability,
            Component::Pedagogy => self.pedagogy,
            Component::Bias => self.bias,
        }
    }

    /// Weights of the present components, rescaled to sum to 1
    pub fn effective(&self, present: &[Component]) -> BTreeMap<Component, f64> {
        let total: f64 = present.iter().map(|c| self.get(*c).max(0.0)).sum();
        present
            .iter()
            .map(|&c| {
                let w = if total > 0.0 && total.is_finite() {
                    self.get(c).max(0.0) / total
                } else {
                    1.0 / present.len() as f64
                };
                (c, w)
            })
            .collect()
    }
}

/// One actionable recommendation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// None for the overall "meets thresholds" note
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<Component>,
    /// Points below the good threshold (negative when above it)
    pub deviation: f64,
    pub message: String,
}

impl Recommendation {
    fn new(component: Component, deviation: f64, message: impl Into<String>) -> Self {
        Self {
            component: Some(component),
            deviation,
            message: message.into(),
        }
    }
}

/// Composite result of one aggregation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallEvaluation {
    pub component_scores: BTreeMap<Component, f64>,
    pub weights: BTreeMap<Component, f64>,
    pub composite: f64,
    pub verdict: Band,
    pub recommendations: Vec<Recommendation>,
    /// Analyses that could not run, and why
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl OverallEvaluation {
    pub fn score(&self, component: Component) -> Option<f64> {
        self.component_scores.get(&component).copied()
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn render(&self) -> String {
        let mut out = format!(
            "Overall quality: {:.1}/100 ({})\n  {}\n",
            self.composite,
            self.verdict,
            verdict_description(self.verdict)
        );
        for (component, score) in &self.component_scores {
            let weight = self.weights.get(component).copied().unwrap_or(0.0);
            out.push_str(&format!(
                "  {:<22} {:>5.1}  (weight {:.2})\n",
                component.title(),
                score,
                weight
            ));
        }
        for note in &self.notes {
            out.push_str(&format!("  note: {}\n", note));
        }
        out.push_str("Recommendations:\n");
        for (i, rec) in self.recommendations.iter().enumerate() {
            out.push_str(&format!("  {}. {}\n", i + 1, rec.message));
        }
        out
    }
}

/// One-line description of a verdict band
pub fn verdict_description(band: Band) -> &'static str {
    match band {
        Band::Excellent => "Excellent - ready to use with learners",
        Band::Good => "Good - solid resource with minor room for improvement",
        Band::Fair => "Fair - usable, but several areas need strengthening",
        Band::Poor => "Poor - significant revision recommended",
    }
}

/// Combines any subset of component results into an [`OverallEvaluation`]
#[derive(Debug, Clone)]
pub struct Aggregator {
    weights: ComponentWeights,
    bands: BandThresholds,
    long_sentence_words: f64,
    short_sentence_words: f64,
    complex_syllables_per_word: f64,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::from_config(&ScoringConfig::default())
    }
}

impl Aggregator {
    pub fn new(weights: ComponentWeights, bands: BandThresholds) -> Self {
        Self {
            weights,
            bands,
            ..Self::default()
        }
    }

    pub fn from_config(config: &ScoringConfig) -> Self {
        Self {
            weights: config.weights,
            bands: config.bands,
            long_sentence_words: config.readability.long_sentence_words,
            short_sentence_words: config.readability.short_sentence_words,
            complex_syllables_per_word: config.readability.complex_syllables_per_word,
        }
    }

    pub fn aggregate(&self, set: &AnalysisSet) -> Result<OverallEvaluation, EngineError> {
        if set.is_empty() {
            return Err(EngineError::InsufficientAnalysis);
        }

        let present = set.components();
        let weights = self.weights.effective(&present);
        let component_scores: BTreeMap<Component, f64> = present
            .iter()
            .filter_map(|&c| set.score(c).map(|s| (c, s)))
            .collect();

        let composite = component_scores
            .iter()
            .map(|(c, s)| weights.get(c).copied().unwrap_or(0.0) * s)
            .sum::<f64>()
            .clamp(0.0, 100.0);

        Ok(OverallEvaluation {
            component_scores,
            weights,
            composite,
            verdict: Band::from_score(composite, &self.bands),
            recommendations: self.recommendations(set),
            notes: Vec::new(),
        })
    }

    /// Rule-based recommendations, worst component first
    pub fn recommendations(&self, set: &AnalysisSet) -> Vec<Recommendation> {
        let good = self.bands.good;
        let mut recs = Vec::new();

        if let Some(r) = &set.curriculum {
            if r.alignment_score < good && !r.missing_topics.is_empty() {
                recs.push(Recommendation::new(
                    Component::Curriculum,
                    good - r.alignment_score,
                    format!("Add coverage for: {}", r.missing_topics.join(", ")),
                ));
            }
        }

        if let Some(r) = &set.readability {
            if r.appropriateness < good {
                let deviation = good - r.appropriateness;
                let message = match (r.direction(), r.target_band) {
                    (Some(Direction::TooHard), Some(band)) => format!(
                        "Text reads at grade {:.1}, above the {} target; simplify vocabulary and sentence structure",
                        r.flesch_kincaid_grade, band
                    ),
                    (Some(Direction::TooHard), None) => format!(
                        "Text is {} to read (reading ease {:.1}); simplify vocabulary and sentence structure",
                        r.reading_ease, r.flesch_reading_ease
                    ),
                    (Some(Direction::TooEasy), Some(band)) => format!(
                        "Text reads at grade {:.1}, below the {} target; introduce subject vocabulary and more developed sentences",
                        r.effective_grade(), band
                    ),
                    _ => "Adjust the reading level to the intended audience".to_string(),
                };
                recs.push(Recommendation::new(Component::Readability, deviation, message));

                let too_easy = r.direction() == Some(Direction::TooEasy);
                if r.words_per_sentence > self.long_sentence_words {
                    recs.push(Recommendation::new(
                        Component::Readability,
                        deviation,
                        format!(
                            "Shorten sentences (currently {:.1} words on average)",
                            r.words_per_sentence
                        ),
                    ));
                } else if too_easy && r.words_per_sentence < self.short_sentence_words {
                    recs.push(Recommendation::new(
                        Component::Readability,
                        deviation,
                        format!(
                            "Combine very short sentences (currently {:.1} words on average)",
                            r.words_per_sentence
                        ),
                    ));
                }
                if !too_easy && r.syllables_per_word > self.complex_syllables_per_word {
                    recs.push(Recommendation::new(
                        Component::Readability,
                        deviation,
                        format!(
                            "Prefer shorter words (currently {:.2} syllables per word)",
                            r.syllables_per_word
                        ),
                    ));
                }
            }
        }

        if let Some(r) = &set.pedagogy {
            if r.score < good {
                for sub in r.weak_aspects() {
                    recs.push(Recommendation::new(
                        Component::Pedagogy,
                        good - r.score,
                        format!(
                            "{} ({:.1}/10): {}",
                            sub.aspect.title(),
                            sub.score,
                            sub.aspect.suggestion()
                        ),
                    ));
                }
            }
        }

        if let Some(r) = &set.bias {
            let grouped = r.by_category();
            let mut categories = r.categories_for_review();
            if r.score < good {
                categories.extend(grouped.keys().copied());
                categories.sort();
                categories.dedup();
            }
            for category in categories {
                let mut terms: Vec<&str> = grouped
                    .get(&category)
                    .map(|ms| ms.iter().map(|m| m.matched.as_str()).collect())
                    .unwrap_or_default();
                let mut seen = HashSet::new();
                terms.retain(|t| seen.insert(t.to_lowercase()));
                recs.push(Recommendation::new(
                    Component::Bias,
                    good - r.score,
                    format!(
                        "Review language in category {} ({})",
                        category,
                        terms.join(", ")
                    ),
                ));
            }
        }

        // Stable: order within a component is preserved
        recs.sort_by(|a, b| b.deviation.total_cmp(&a.deviation));

        if recs.is_empty() {
            recs.push(Recommendation {
                component: None,
                deviation: 0.0,
                message: "All analyzed components meet quality thresholds".to_string(),
            });
        }
        recs
    }
}
