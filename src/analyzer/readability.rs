//! Readability analysis
//!
//! Computes the classic grade-level formulas (Flesch-Kincaid, Flesch Reading
//! Ease, Gunning Fog, SMOG) from the document's cached sentences and words,
//! and turns them into a grade-appropriateness score for aggregation.

use super::Analyzer;
use crate::document::Sentence;
use crate::{round_to, AnalysisResult, Component, Document, EngineError, Finding, GradeBand};
use serde::{Deserialize, Serialize};

/// Words with this many syllables or more count as complex (Fog) / polysyllabic (SMOG)
const COMPLEX_WORD_SYLLABLES: usize = 3;

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y')
}

/// Heuristic syllable count
///
/// Counts maximal vowel runs, drops a silent final `e` (its own run, word
/// longer than three letters, not a consonant + `le` ending) and never
/// returns less than 1 for a non-empty word.
pub fn count_syllables(word: &str) -> usize {
    if word.is_empty() {
        return 0;
    }
    let letters: Vec<char> = word
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(|c| c.to_lowercase())
        .collect();

    let mut runs: usize = 0;
    let mut prev_vowel = false;
    for &c in &letters {
        let vowel = is_vowel(c);
        if vowel && !prev_vowel {
            runs += 1;
        }
        prev_vowel = vowel;
    }

    let n = letters.len();
    if n > 3 && letters[n - 1] == 'e' && !is_vowel(letters[n - 2]) {
        let consonant_le = letters[n - 2] == 'l' && !is_vowel(letters[n - 3]);
        if !consonant_le {
            runs = runs.saturating_sub(1);
        }
    }
    runs.max(1)
}

/// Raw counts over a run of sentences
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStats {
    pub sentences: usize,
    pub words: usize,
    pub syllables: usize,
    pub complex_words: usize,
}

impl TextStats {
    pub fn collect<'a>(doc: &Document, sentences: impl IntoIterator<Item = &'a Sentence>) -> Self {
        let mut stats = TextStats::default();
        for sentence in sentences {
            stats.sentences += 1;
            for word in doc.sentence_words(sentence) {
                let syllables = count_syllables(&word.text);
                stats.words += 1;
                stats.syllables += syllables;
                if syllables >= COMPLEX_WORD_SYLLABLES {
                    stats.complex_words += 1;
                }
            }
        }
        stats
    }

    pub fn words_per_sentence(&self) -> f64 {
        if self.sentences == 0 {
            return 0.0;
        }
        self.words as f64 / self.sentences as f64
    }

    pub fn syllables_per_word(&self) -> f64 {
        if self.words == 0 {
            return 0.0;
        }
        self.syllables as f64 / self.words as f64
    }

    pub fn flesch_kincaid_grade(&self) -> f64 {
        0.39 * self.words_per_sentence() + 11.8 * self.syllables_per_word() - 15.59
    }

    pub fn flesch_reading_ease(&self) -> f64 {
        206.835 - 1.015 * self.words_per_sentence() - 84.6 * self.syllables_per_word()
    }

    pub fn gunning_fog(&self) -> f64 {
        let complex_ratio = if self.words == 0 {
            0.0
        } else {
            self.complex_words as f64 / self.words as f64
        };
        0.4 * (self.words_per_sentence() + 100.0 * complex_ratio)
    }

    pub fn smog_index(&self) -> f64 {
        if self.sentences == 0 {
            return 0.0;
        }
        3.1291 + 1.0430 * (30.0 * self.complex_words as f64 / self.sentences as f64).sqrt()
    }
}

/// Flesch Reading Ease label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingEase {
    VeryEasy,
    Easy,
    FairlyEasy,
    Standard,
    FairlyDifficult,
    Difficult,
    VeryDifficult,
}

impl ReadingEase {
    pub fn from_score(ease: f64) -> Self {
        if ease >= 90.0 {
            ReadingEase::VeryEasy
        } else if ease >= 80.0 {
            ReadingEase::Easy
        } else if ease >= 70.0 {
            ReadingEase::FairlyEasy
        } else if ease >= 60.0 {
            ReadingEase::Standard
        } else if ease >= 50.0 {
            ReadingEase::FairlyDifficult
        } else if ease >= 30.0 {
            ReadingEase::Difficult
        } else {
            ReadingEase::VeryDifficult
        }
    }
}

impl std::fmt::Display for ReadingEase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReadingEase::VeryEasy => "very easy",
            ReadingEase::Easy => "easy",
            ReadingEase::FairlyEasy => "fairly easy",
            ReadingEase::Standard => "standard",
            ReadingEase::FairlyDifficult => "fairly difficult",
            ReadingEase::Difficult => "difficult",
            ReadingEase::VeryDifficult => "very difficult",
        };
        write!(f, "{}", s)
    }
}

/// How closely the grade-level formulas agree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Agreement {
    High,
    Moderate,
    Low,
}

impl Agreement {
    pub fn from_grades(grades: &[f64]) -> Self {
        let min = grades.iter().copied().fold(f64::INFINITY, f64::min);
        let max = grades.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let spread = if grades.is_empty() { 0.0 } else { max - min };
        if spread <= 2.0 {
            Agreement::High
        } else if spread <= 4.0 {
            Agreement::Moderate
        } else {
            Agreement::Low
        }
    }
}

impl std::fmt::Display for Agreement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Agreement::High => write!(f, "high"),
            Agreement::Moderate => write!(f, "moderate"),
            Agreement::Low => write!(f, "low (content may be complex)"),
        }
    }
}

/// Which way the text misses its audience
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    TooHard,
    TooEasy,
}

/// One row of the grade-appropriateness table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AppropriatenessStep {
    /// Largest grade distance (inclusive) this row covers
    pub within: f64,
    pub score: f64,
}

/// Readability tuning, part of the scoring config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReadabilityConfig {
    /// Distance-to-score table, checked in order
    pub appropriateness: Vec<AppropriatenessStep>,
    /// Score when the distance exceeds every row
    pub beyond: f64,
    pub long_sentence_words: f64,
    pub short_sentence_words: f64,
    pub complex_syllables_per_word: f64,
    pub simple_syllables_per_word: f64,
}

impl Default for ReadabilityConfig {
    fn default() -> Self {
        Self {
            appropriateness: vec![
                AppropriatenessStep { within: 0.0, score: 100.0 },
                AppropriatenessStep { within: 1.0, score: 85.0 },
                AppropriatenessStep { within: 2.0, score: 70.0 },
                AppropriatenessStep { within: 4.0, score: 50.0 },
            ],
            beyond: 25.0,
            long_sentence_words: 20.0,
            short_sentence_words: 8.0,
            complex_syllables_per_word: 2.0,
            simple_syllables_per_word: 1.3,
        }
    }
}

impl ReadabilityConfig {
    /// Score for a grade distance from the target band
    pub fn appropriateness_for(&self, distance: f64) -> f64 {
        self.appropriateness
            .iter()
            .find(|step| distance <= step.within)
            .map(|step| step.score)
            .unwrap_or(self.beyond)
    }
}

/// Readability of one section
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionReadability {
    pub label: String,
    pub sentences: usize,
    pub words: usize,
    pub flesch_kincaid_grade: f64,
    pub flesch_reading_ease: f64,
    pub grade_band: GradeBand,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadabilityResult {
    pub stats: TextStats,
    pub words_per_sentence: f64,
    pub syllables_per_word: f64,
    /// Raw formula values (not clamped)
    pub flesch_kincaid_grade: f64,
    pub flesch_reading_ease: f64,
    pub gunning_fog: f64,
    pub smog_index: f64,
    pub average_grade: f64,
    pub agreement: Agreement,
    pub reading_ease: ReadingEase,
    pub grade_band: GradeBand,
    pub recommended_audience: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_band: Option<GradeBand>,
    /// Grade-appropriateness score in [0, 100]
    pub appropriateness: f64,
    pub findings: Vec<Finding>,
}

impl ReadabilityResult {
    /// Flesch-Kincaid grade floored at 0, used for bands and distances
    pub fn effective_grade(&self) -> f64 {
        self.flesch_kincaid_grade.max(0.0)
    }

    /// Whether the text reads above or below its audience
    pub fn direction(&self) -> Option<Direction> {
        let grade = self.effective_grade();
        match self.target_band {
            Some(band) if band.distance(grade) == 0.0 => None,
            Some(band) if grade < band.range().0 => Some(Direction::TooEasy),
            Some(_) => Some(Direction::TooHard),
            None if self.flesch_reading_ease < 60.0 => Some(Direction::TooHard),
            None => None,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Readability: {:.1}/100 ({})\n",
            self.appropriateness, self.grade_band
        ));
        out.push_str(&format!(
            "  Flesch-Kincaid grade: {:.1}\n  Flesch reading ease: {:.1} ({})\n",
            self.flesch_kincaid_grade, self.flesch_reading_ease, self.reading_ease
        ));
        out.push_str(&format!(
            "  Gunning Fog: {:.1}  SMOG: {:.1}  average grade: {:.1} (agreement: {})\n",
            self.gunning_fog, self.smog_index, self.average_grade, self.agreement
        ));
        out.push_str(&format!(
            "  {} sentences, {} words, {:.1} words/sentence, {:.2} syllables/word\n",
            self.stats.sentences,
            self.stats.words,
            self.words_per_sentence,
            self.syllables_per_word
        ));
        match self.target_band {
            Some(band) => out.push_str(&format!("  Target audience: {}\n", band)),
            None => out.push_str(&format!("  Suggested audience: {}\n", self.recommended_audience)),
        }
        for finding in &self.findings {
            out.push_str(&format!("  - {}\n", finding));
        }
        out
    }
}

fn recommended_audience(grade: f64) -> &'static str {
    if grade <= 3.0 {
        "Early elementary students (K-3)"
    } else if grade <= 5.0 {
        "Upper elementary students (4-5)"
    } else if grade <= 8.0 {
        "Middle school students (6-8)"
    } else if grade <= 12.0 {
        "High school students (9-12)"
    } else if grade <= 16.0 {
        "College students and adults"
    } else {
        "Specialized professionals and experts"
    }
}

/// Readability analyzer
#[derive(Debug, Clone, Default)]
pub struct ReadabilityAnalyzer {
    config: ReadabilityConfig,
    target: Option<GradeBand>,
}

impl ReadabilityAnalyzer {
    pub fn new(config: ReadabilityConfig) -> Self {
        Self {
            config,
            target: None,
        }
    }

    /// Use this target band instead of the document's grade metadata
    pub fn with_target(mut self, band: Option<GradeBand>) -> Self {
        self.target = band;
        self
    }

    pub fn config(&self) -> &ReadabilityConfig {
        &self.config
    }

    pub fn analyze_readability(&self, doc: &Document) -> Result<ReadabilityResult, EngineError> {
        if doc.sentence_count() == 0 {
            return Err(EngineError::InsufficientContent(
                "document has no sentences".to_string(),
            ));
        }

        let stats = TextStats::collect(doc, doc.sentences());
        let fk = stats.flesch_kincaid_grade();
        let fre = stats.flesch_reading_ease();
        let fog = stats.gunning_fog();
        let smog = stats.smog_index();
        let grades = [fk, fog, smog];
        let average_grade = grades.iter().sum::<f64>() / grades.len() as f64;
        let grade = fk.max(0.0);

        let target_band = self.target.or_else(|| doc.target_grade_band());
        let appropriateness = match target_band {
            Some(band) => self.config.appropriateness_for(band.distance(grade)),
            None => fre.clamp(0.0, 100.0),
        };

        let mut result = ReadabilityResult {
            stats,
            words_per_sentence: stats.words_per_sentence(),
            syllables_per_word: stats.syllables_per_word(),
            flesch_kincaid_grade: fk,
            flesch_reading_ease: fre,
            gunning_fog: fog,
            smog_index: smog,
            average_grade,
            agreement: Agreement::from_grades(&grades),
            reading_ease: ReadingEase::from_score(fre),
            grade_band: GradeBand::from_grade(grade),
            recommended_audience: recommended_audience(grade).to_string(),
            target_band,
            appropriateness: appropriateness.clamp(0.0, 100.0),
            findings: Vec::new(),
        };
        result.findings = self.findings(doc, &result);
        Ok(result)
    }

    /// Per-section readability for every section with at least one sentence
    pub fn analyze_sections(&self, doc: &Document) -> Vec<SectionReadability> {
        doc.sections()
            .iter()
            .enumerate()
            .filter_map(|(idx, section)| {
                let stats = TextStats::collect(
                    doc,
                    doc.sentences().iter().filter(|s| s.section == idx),
                );
                if stats.sentences == 0 {
                    return None;
                }
                let fk = stats.flesch_kincaid_grade();
                Some(SectionReadability {
                    label: section.label.clone(),
                    sentences: stats.sentences,
                    words: stats.words,
                    flesch_kincaid_grade: fk,
                    flesch_reading_ease: stats.flesch_reading_ease(),
                    grade_band: GradeBand::from_grade(fk.max(0.0)),
                })
            })
            .collect()
    }

    fn findings(&self, doc: &Document, result: &ReadabilityResult) -> Vec<Finding> {
        let cfg = &self.config;
        let mut findings = Vec::new();

        if let Some(band) = result.target_band {
            match result.direction() {
                Some(Direction::TooHard) => findings.push(
                    Finding::warning(format!(
                        "Grade level {:.1} is above the target band {}",
                        result.flesch_kincaid_grade, band
                    ))
                    .with_suggestion("Simplify vocabulary and shorten sentences"),
                ),
                Some(Direction::TooEasy) => findings.push(
                    Finding::warning(format!(
                        "Grade level {:.1} is below the target band {}",
                        result.flesch_kincaid_grade, band
                    ))
                    .with_suggestion("Introduce subject vocabulary and more developed sentences"),
                ),
                None => {}
            }
        }

        let wps = result.words_per_sentence;
        if wps > cfg.long_sentence_words {
            findings.push(
                Finding::warning(format!(
                    "Sentences are long ({:.1} words on average)",
                    wps
                ))
                .with_suggestion("Break long sentences into shorter ones"),
            );
        } else if wps < cfg.short_sentence_words {
            findings.push(
                Finding::info(format!("Sentences are very short ({:.1} words on average)", wps))
                    .with_suggestion("Combine some sentences for better flow"),
            );
        }

        let spw = result.syllables_per_word;
        if spw > cfg.complex_syllables_per_word {
            findings.push(
                Finding::warning(format!("Words are complex ({:.2} syllables on average)", spw))
                    .with_suggestion("Use simpler vocabulary where possible"),
            );
        } else if spw < cfg.simple_syllables_per_word {
            findings.push(Finding::info(format!(
                "Vocabulary is very simple ({:.2} syllables on average)",
                spw
            )));
        }

        // Point at the longest sentence when it is well past the limit
        if let Some(longest) = doc.sentences().iter().max_by_key(|s| s.words.len()) {
            let len = longest.words.len() as f64;
            if len > cfg.long_sentence_words * 1.5 {
                findings.push(
                    Finding::info(format!("Longest sentence has {} words", longest.words.len()))
                        .at(doc.location_of(longest.offset)),
                );
            }
        }

        if result.agreement == Agreement::Low {
            findings.push(Finding::info(format!(
                "Grade formulas disagree (FK {:.1}, Fog {:.1}, SMOG {:.1})",
                round_to(result.flesch_kincaid_grade, 1),
                round_to(result.gunning_fog, 1),
                round_to(result.smog_index, 1)
            )));
        }

        findings
    }
}

impl Analyzer for ReadabilityAnalyzer {
    fn component(&self) -> Component {
        Component::Readability
    }

    fn analyze(&self, doc: &Document) -> Result<AnalysisResult, EngineError> {
        self.analyze_readability(doc).map(AnalysisResult::Readability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn analyze(text: &str) -> ReadabilityResult {
        ReadabilityAnalyzer::default()
            .analyze_readability(&Document::parse(text))
            .unwrap()
    }

    #[test]
    fn syllable_heuristic() {
        assert_eq!(count_syllables("the"), 1);
        assert_eq!(count_syllables("lazy"), 2);
        assert_eq!(count_syllables("make"), 1);
        assert_eq!(count_syllables("table"), 2);
        assert_eq!(count_syllables("education"), 4);
        assert_eq!(count_syllables("rhythm"), 1);
        assert_eq!(count_syllables("sky"), 1);
        assert_eq!(count_syllables("Shh"), 1);
        assert_eq!(count_syllables("42"), 1);
        assert_eq!(count_syllables(""), 0);
    }

    #[test]
    fn simple_sentences_formulas() {
        let r = analyze("The quick brown fox jumps. The lazy dog sleeps.");
        assert_eq!(r.stats.sentences, 2);
        assert_eq!(r.stats.words, 9);
        assert_eq!(r.stats.syllables, 10);
        assert!((r.words_per_sentence - 4.5).abs() < 1e-9);
        let spw = 10.0 / 9.0;
        let fk = 0.39 * 4.5 + 11.8 * spw - 15.59;
        assert!((r.flesch_kincaid_grade - fk).abs() < 1e-9);
        let fre = 206.835 - 1.015 * 4.5 - 84.6 * spw;
        assert!((r.flesch_reading_ease - fre).abs() < 1e-9);
        assert_eq!(r.grade_band, GradeBand::Elementary);
        assert_eq!(r.reading_ease, ReadingEase::VeryEasy);
    }

    #[test]
    fn no_sentences_is_insufficient_content() {
        let err = ReadabilityAnalyzer::default()
            .analyze_readability(&Document::parse("   "))
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientContent(_)));
    }

    #[test]
    fn appropriateness_without_target_is_clamped_reading_ease() {
        let r = analyze("The cat sat. The dog ran.");
        assert!(r.target_band.is_none());
        assert_eq!(r.appropriateness, r.flesch_reading_ease.clamp(0.0, 100.0));
    }

    #[test]
    fn appropriateness_with_matching_target() {
        let r = analyze("Grade: 2\n\nThe cat sat on the mat. The dog ran to the park.");
        assert_eq!(r.target_band, Some(GradeBand::Elementary));
        assert_eq!(r.appropriateness, 100.0);
        assert!(r.direction().is_none());
    }

    #[test]
    fn upper_band_edge_is_in_range_for_direction_and_score() {
        let mut r = analyze("The cat sat. The dog ran.");
        r.target_band = Some(GradeBand::MiddleSchool);
        r.flesch_kincaid_grade = 9.0;
        assert_eq!(r.direction(), None);
        let config = ReadabilityConfig::default();
        assert_eq!(config.appropriateness_for(GradeBand::MiddleSchool.distance(9.0)), 100.0);

        r.flesch_kincaid_grade = 9.5;
        assert_eq!(r.direction(), Some(Direction::TooHard));
        assert!(config.appropriateness_for(GradeBand::MiddleSchool.distance(9.5)) < 100.0);
    }

    #[test]
    fn appropriateness_with_distant_target() {
        let analyzer = ReadabilityAnalyzer::default().with_target(Some(GradeBand::College));
        let r = analyzer
            .analyze_readability(&Document::parse("The cat sat on the mat. The dog ran."))
            .unwrap();
        // grade ~0 vs college (13+) is far beyond every step
        assert_eq!(r.appropriateness, 25.0);
        assert_eq!(r.direction(), Some(Direction::TooEasy));
        assert!(r.findings.iter().any(|f| f.message.contains("below the target")));
    }

    #[test]
    fn appropriateness_table_steps() {
        let cfg = ReadabilityConfig::default();
        assert_eq!(cfg.appropriateness_for(0.0), 100.0);
        assert_eq!(cfg.appropriateness_for(0.5), 85.0);
        assert_eq!(cfg.appropriateness_for(1.0), 85.0);
        assert_eq!(cfg.appropriateness_for(2.0), 70.0);
        assert_eq!(cfg.appropriateness_for(3.9), 50.0);
        assert_eq!(cfg.appropriateness_for(4.1), 25.0);
    }

    #[test]
    fn long_sentence_findings() {
        let sentence = "students ".repeat(34);
        let text = format!("{}end.", sentence);
        let r = analyze(&text);
        assert!(r.findings.iter().any(|f| f.message.starts_with("Sentences are long")));
        let longest = r
            .findings
            .iter()
            .find(|f| f.message.starts_with("Longest sentence"))
            .unwrap();
        assert_eq!(longest.location.map(|l| l.line), Some(1));
    }

    #[test]
    fn reading_ease_labels() {
        assert_eq!(ReadingEase::from_score(95.0), ReadingEase::VeryEasy);
        assert_eq!(ReadingEase::from_score(80.0), ReadingEase::Easy);
        assert_eq!(ReadingEase::from_score(65.0), ReadingEase::Standard);
        assert_eq!(ReadingEase::from_score(30.0), ReadingEase::Difficult);
        assert_eq!(ReadingEase::from_score(-10.0), ReadingEase::VeryDifficult);
    }

    #[test]
    fn formula_agreement() {
        assert_eq!(Agreement::from_grades(&[5.0, 6.0, 7.0]), Agreement::High);
        assert_eq!(Agreement::from_grades(&[5.0, 8.0, 6.0]), Agreement::Moderate);
        assert_eq!(Agreement::from_grades(&[2.0, 9.0, 6.0]), Agreement::Low);
    }

    #[test]
    fn section_readability() {
        let doc = Document::parse(
            "Introduction:\nWe read. We play.\n\nDetails:\nPhotosynthesis transforms electromagnetic radiation into chemical energy.\n\nEmpty:\n",
        );
        let sections = ReadabilityAnalyzer::default().analyze_sections(&doc);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].label, "Introduction");
        assert!(sections[1].flesch_kincaid_grade > sections[0].flesch_kincaid_grade);
    }

    #[test]
    fn result_is_deterministic() {
        let doc = Document::parse("Plants use sunlight to make food. Roots take in water.");
        let analyzer = ReadabilityAnalyzer::default();
        assert_eq!(
            analyzer.analyze_readability(&doc).unwrap(),
            analyzer.analyze_readability(&doc).unwrap()
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_syllables_at_least_one(word in "[a-zA-Z]{1,15}") {
            prop_assert!(count_syllables(&word) >= 1);
        }

        #[test]
        fn prop_formulas_finite(words in prop::collection::vec("[a-z]{1,12}", 1..40)) {
            let text = format!("{}.", words.join(" "));
            let r = analyze(&text);
            prop_assert!(r.flesch_kincaid_grade.is_finite());
            prop_assert!(r.flesch_reading_ease.is_finite());
            prop_assert!(r.gunning_fog.is_finite());
            prop_assert!(r.smog_index.is_finite());
            prop_assert!((0.0..=100.0).contains(&r.appropriateness));
        }
    }
}
