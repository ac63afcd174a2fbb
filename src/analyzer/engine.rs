//! Evaluation engine - runs the selected analyzers and aggregates them

use crate::analyzer::bias::BiasTermLists;
use crate::analyzer::curriculum::CurriculumFramework;
use crate::analyzer::readability::SectionReadability;
use crate::config::{Config, ScoringConfig};
use crate::document::{load_document, Metadata, SourceFormat, DEFAULT_MAX_FILE_SIZE};
use crate::session::EvaluationSession;
use crate::{AnalysisSet, Band, Component, Document, EngineError, GradeBand, OverallEvaluation};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{
    Aggregator, Analyzer, BiasDetector, CurriculumChecker, PedagogicalAnalyzer,
    ReadabilityAnalyzer,
};

/// Everything known about one evaluated document
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// SHA-256 of the raw text
    pub fingerprint: String,
    pub format: SourceFormat,
    pub metadata: Metadata,
    pub word_count: usize,
    pub sentence_count: usize,
    pub analyses: AnalysisSet,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<SectionReadability>,
    pub evaluation: OverallEvaluation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

impl DocumentReport {
    pub fn composite(&self) -> f64 {
        self.evaluation.composite
    }

    /// True unless a threshold is set and the composite falls below it
    pub fn passes(&self) -> bool {
        self.threshold.map_or(true, |t| self.composite() >= t)
    }

    /// Display name: the path when known, otherwise the title
    pub fn name(&self) -> String {
        match (&self.path, &self.metadata.title) {
            (Some(p), _) => p.display().to_string(),
            (None, Some(title)) => title.clone(),
            (None, None) => "<document>".to_string(),
        }
    }

    /// Plain-text rendering of every component and the overall evaluation
    pub fn render(&self) -> String {
        let mut out = format!("Document: {}\n", self.name());
        if let Some(title) = &self.metadata.title {
            out.push_str(&format!("Title: {}\n", title));
        }
        if let Some(subject) = &self.metadata.subject {
            out.push_str(&format!("Subject: {}\n", subject));
        }
        if let Some(grade) = &self.metadata.grade_level {
            out.push_str(&format!("Grade level: {}\n", grade));
        }
        out.push_str(&format!(
            "Words: {}  Sentences: {}\n\n",
            self.word_count, self.sentence_count
        ));
        for result in self.analyses.results() {
            out.push_str(&result.render());
            out.push('\n');
        }
        if !self.sections.is_empty() {
            out.push_str("Section readability:\n");
            for s in &self.sections {
                let label = if s.label.is_empty() { "(untitled)" } else { s.label.as_str() };
                out.push_str(&format!(
                    "  {:<28} grade {:>5.1}  ease {:>5.1}  {}\n",
                    label, s.flesch_kincaid_grade, s.flesch_reading_ease, s.grade_band
                ));
            }
            out.push('\n');
        }
        out.push_str(&self.evaluation.render());
        out
    }
}

/// Evaluation engine holding the shared data every analyzer needs.
///
/// Building the engine loads and compiles the framework and term lists once;
/// analyzers built from it share that data, so evaluating documents in
/// parallel is cheap.
#[derive(Debug, Clone)]
pub struct EvaluationEngine {
    components: Vec<Component>,
    scoring: ScoringConfig,
    framework: Arc<CurriculumFramework>,
    bias_terms: Arc<BiasTermLists>,
    /// Explicit overrides (command line); beat document metadata
    subject: Option<String>,
    grade: Option<GradeBand>,
    max_file_size: u64,
    sections: bool,
}

impl Default for EvaluationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EvaluationEngine {
    /// Engine with built-in data and default scoring
    pub fn new() -> Self {
        Self {
            components: Component::ALL.to_vec(),
            scoring: ScoringConfig::default(),
            framework: Arc::new(CurriculumFramework::builtin()),
            bias_terms: Arc::new(BiasTermLists::builtin()),
            subject: None,
            grade: None,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            sections: true,
        }
    }

    /// Engine configured from a loaded config (data files are read here)
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut engine = Self::new()
            .with_components(&config.components())
            .with_scoring(config.scoring());

        if let Some(path) = &config.framework {
            engine = engine.with_framework(CurriculumFramework::load(Path::new(path))?);
        }
        if let Some(path) = &config.bias_terms {
            engine = engine.with_bias_terms(BiasTermLists::load(Path::new(path))?);
        }
        if let Some(max) = config.max_file_size {
            engine = engine.with_max_file_size(max);
        }
        Ok(engine)
    }

    pub fn with_components(mut self, components: &[Component]) -> Self {
        let mut list = components.to_vec();
        list.sort();
        list.dedup();
        self.components = list;
        self
    }

    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn with_framework(mut self, framework: CurriculumFramework) -> Self {
        self.framework = Arc::new(framework);
        self
    }

    pub fn with_bias_terms(mut self, terms: BiasTermLists) -> Self {
        self.bias_terms = Arc::new(terms);
        self
    }

    /// Force the subject for every document
    pub fn with_subject(mut self, subject: Option<String>) -> Self {
        self.subject = subject;
        self
    }

    /// Force the target grade band for every document
    pub fn with_grade(mut self, grade: Option<GradeBand>) -> Self {
        self.grade = grade;
        self
    }

    pub fn with_max_file_size(mut self, max: u64) -> Self {
        self.max_file_size = max;
        self
    }

    /// Skip per-section readability
    pub fn without_sections(mut self) -> Self {
        self.sections = false;
        self
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    pub fn aggregator(&self) -> Aggregator {
        Aggregator::from_config(&self.scoring)
    }

    /// Analyzers for the selected components, with the resolved subject/grade
    fn analyzers(
        &self,
        subject: Option<String>,
        grade: Option<GradeBand>,
    ) -> Vec<Box<dyn Analyzer>> {
        let bands = self.scoring.bands;
        self.components
            .iter()
            .map(|component| -> Box<dyn Analyzer> {
                match component {
                    Component::Curriculum => Box::new(
                        CurriculumChecker::new(Arc::clone(&self.framework))
                            .with_subject(subject.clone())
                            .with_grade(grade)
                            .with_bands(bands),
                    ),
                    Component::Readability => Box::new(
                        ReadabilityAnalyzer::new(self.scoring.readability.clone())
                            .with_target(grade),
                    ),
                    Component::Pedagogy => Box::new(
                        PedagogicalAnalyzer::new(self.scoring.pedagogy.clone()).with_bands(bands),
                    ),
                    Component::Bias => Box::new(
                        BiasDetector::new(Arc::clone(&self.bias_terms))
                            .with_config(self.scoring.bias),
                    ),
                }
            })
            .collect()
    }

    /// Evaluate a parsed document
    pub fn evaluate(&self, doc: &Document) -> Result<DocumentReport, EngineError> {
        self.evaluate_with_defaults(doc, None, None)
    }

    /// Evaluate a document; `subject`/`grade` apply only when neither the
    /// engine nor the document metadata provide one
    pub fn evaluate_with_defaults(
        &self,
        doc: &Document,
        subject: Option<String>,
        grade: Option<GradeBand>,
    ) -> Result<DocumentReport, EngineError> {
        let subject = self
            .subject
            .clone()
            .or_else(|| doc.metadata().subject.clone())
            .or(subject);
        let grade = self.grade.or_else(|| doc.target_grade_band()).or(grade);

        let mut session = EvaluationSession::new(doc);
        let mut notes = Vec::new();
        for analyzer in self.analyzers(subject, grade) {
            match session.run(analyzer.as_ref()) {
                Ok(_) => {}
                Err(e @ EngineError::InsufficientContent(_)) => {
                    tracing::warn!(component = %analyzer.component(), error = %e, "analysis skipped");
                    notes.push(format!("{} not assessed: {}", analyzer.component().title(), e));
                }
                Err(e) => return Err(e),
            }
        }

        let mut evaluation = session.aggregate(&self.aggregator())?;
        evaluation.notes.extend(notes);

        let sections = if self.sections && self.components.contains(&Component::Readability) {
            ReadabilityAnalyzer::new(self.scoring.readability.clone()).analyze_sections(doc)
        } else {
            Vec::new()
        };

        tracing::info!(
            composite = evaluation.composite,
            verdict = %evaluation.verdict,
            components = session.analyses().len(),
            "document evaluated"
        );

        Ok(DocumentReport {
            path: None,
            fingerprint: doc.fingerprint(),
            format: doc.format(),
            metadata: doc.metadata().clone(),
            word_count: doc.word_count(),
            sentence_count: doc.sentence_count(),
            analyses: session.into_analyses(),
            sections,
            evaluation,
            threshold: None,
        })
    }

    /// Load and evaluate a file, applying the config's per-path settings
    pub fn evaluate_path(&self, path: &Path, config: Option<&Config>) -> Result<DocumentReport> {
        let effective = config.map(|c| c.effective_for_file(path)).unwrap_or_default();
        let doc = load_document(path, self.max_file_size)?;
        tracing::debug!(
            path = %path.display(),
            words = doc.word_count(),
            sentences = doc.sentence_count(),
            "document loaded"
        );

        let mut report = self
            .evaluate_with_defaults(&doc, effective.subject, effective.grade)
            .with_context(|| format!("Failed to evaluate {}", path.display()))?;
        report.path = Some(path.to_path_buf());
        report.threshold = effective.threshold;
        Ok(report)
    }

    /// Summary statistics over several evaluated documents
    pub fn aggregate_stats(reports: &[DocumentReport]) -> AggregateStats {
        if reports.is_empty() {
            return AggregateStats::default();
        }

        let scores: Vec<f64> = reports.iter().map(|r| r.composite()).collect();
        let average_score = scores.iter().sum::<f64>() / scores.len() as f64;
        let lowest_score = scores.iter().copied().fold(f64::INFINITY, f64::min);
        let highest_score = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let mut verdicts = BTreeMap::new();
        for r in reports {
            *verdicts.entry(r.evaluation.verdict).or_insert(0) += 1;
        }

        AggregateStats {
            documents_evaluated: reports.len(),
            average_score,
            lowest_score,
            highest_score,
            below_threshold: reports.iter().filter(|r| !r.passes()).count(),
            total_findings: reports
                .iter()
                .map(|r| r.analyses.results().iter().map(|a| a.findings().len()).sum::<usize>())
                .sum(),
            verdicts,
        }
    }
}

/// Aggregate statistics from a batch of documents
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub documents_evaluated: usize,
    pub average_score: f64,
    pub lowest_score: f64,
    pub highest_score: f64,
    pub below_threshold: usize,
    pub total_findings: usize,
    /// Number of documents per verdict
    pub verdicts: BTreeMap<Band, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const LESSON: &str = "\
Title: Fractions on a Number Line
Subject: Mathematics
Grade: 4

Learning Objectives:
Students will be able to compare fractions with like denominators.
By the end of this lesson students will place fractions on a number line.

Examples:
For example, one half is larger than one quarter.
Consider a pizza cut into eight slices.

Practice:
Compare three fifths and four fifths.
Which fraction is closer to one?

Summary:
In summary, fractions name parts of a whole.
";

    fn make_file(content: &str, suffix: &str) -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(suffix).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn evaluates_all_components() {
        let report = EvaluationEngine::new()
            .evaluate(&Document::parse(LESSON))
            .unwrap();
        assert_eq!(report.analyses.len(), 4);
        assert_eq!(report.evaluation.component_scores.len(), 4);
        assert!((0.0..=100.0).contains(&report.composite()));
        assert!(report.evaluation.notes.is_empty());
        assert!(!report.sections.is_empty());
        assert!(report.passes());
    }

    #[test]
    fn selected_component_passes_through() {
        let report = EvaluationEngine::new()
            .with_components(&[Component::Bias])
            .evaluate(&Document::parse(LESSON))
            .unwrap();
        assert_eq!(report.analyses.components(), vec![Component::Bias]);
        assert_eq!(report.composite(), report.analyses.bias.as_ref().unwrap().score);
        assert!(report.sections.is_empty());
    }

    #[test]
    fn readability_failure_becomes_note() {
        let doc = Document::parse("Title: Placeholder\nSubject: Science\n");
        let report = EvaluationEngine::new().evaluate(&doc).unwrap();
        assert!(report.analyses.readability.is_none());
        assert!(report
            .evaluation
            .notes
            .iter()
            .any(|n| n.starts_with("Readability not assessed")));
        assert!(report.evaluation.weights.get(&Component::Readability).is_none());
    }

    #[test]
    fn readability_alone_on_empty_text_fails() {
        let doc = Document::parse("Title: Placeholder\n");
        let err = EvaluationEngine::new()
            .with_components(&[Component::Readability])
            .evaluate(&doc)
            .unwrap_err();
        assert_eq!(err, EngineError::InsufficientAnalysis);
    }

    #[test]
    fn engine_subject_beats_metadata() {
        let engine = EvaluationEngine::new()
            .with_components(&[Component::Curriculum])
            .with_subject(Some("science".to_string()));
        let report = engine.evaluate(&Document::parse(LESSON)).unwrap();
        let curriculum = report.analyses.curriculum.unwrap();
        assert_eq!(curriculum.subject.as_deref(), Some("science"));
    }

    #[test]
    fn defaults_apply_only_without_metadata() {
        let engine = EvaluationEngine::new().with_components(&[Component::Curriculum]);
        let doc = Document::parse("The water cycle moves water between ocean and sky.");
        let report = engine
            .evaluate_with_defaults(&doc, Some("science".to_string()), Some(GradeBand::Elementary))
            .unwrap();
        let curriculum = report.analyses.curriculum.unwrap();
        assert_eq!(curriculum.subject.as_deref(), Some("science"));
        assert_eq!(curriculum.grade_band, Some(GradeBand::Elementary));

        let report = engine
            .evaluate_with_defaults(&Document::parse(LESSON), Some("science".to_string()), None)
            .unwrap();
        assert_eq!(
            report.analyses.curriculum.unwrap().subject.as_deref(),
            Some("mathematics")
        );
    }

    #[test]
    fn evaluate_path_applies_overrides() {
        let file = make_file(LESSON, ".txt");
        let config: Config = serde_json::from_str(r#"{"overrides": [{"files": ["**/*.txt"], "threshold": 101}]}"#)
            .unwrap();
        let report = EvaluationEngine::new()
            .evaluate_path(file.path(), Some(&config))
            .unwrap();
        assert_eq!(report.path.as_deref(), Some(file.path()));
        assert_eq!(report.threshold, Some(101.0));
        assert!(!report.passes());
    }

    #[test]
    fn evaluate_path_rejects_unsupported() {
        let file = make_file(LESSON, ".docx");
        assert!(EvaluationEngine::new().evaluate_path(file.path(), None).is_err());
    }

    #[test]
    fn from_config_loads_data_files() {
        let framework = make_file(
            r#"{"science": {"elementary": ["water cycle", "photosynthesis"]}}"#,
            ".json",
        );
        let config = Config {
            framework: Some(framework.path().to_string_lossy().into_owned()),
            components: vec![Component::Curriculum],
            ..Config::default()
        };
        let engine = EvaluationEngine::from_config(&config).unwrap();
        let doc = Document::parse("Subject: Science\nGrade: 3\n\nThe water cycle moves water.");
        let curriculum = engine.evaluate(&doc).unwrap().analyses.curriculum.unwrap();
        assert_eq!(curriculum.total_topics, 2);
        assert_eq!(curriculum.alignment_score, 50.0);
    }

    #[test]
    fn from_config_reports_bad_data_file() {
        let config = Config {
            bias_terms: Some("/nonexistent/terms.json".to_string()),
            ..Config::default()
        };
        let err = EvaluationEngine::from_config(&config).unwrap_err();
        assert!(format!("{:#}", err).contains("bias term lists"));
    }

    #[test]
    fn aggregate_stats_over_batch() {
        let engine = EvaluationEngine::new();
        let a = engine.evaluate(&Document::parse(LESSON)).unwrap();
        let mut b = engine
            .evaluate(&Document::parse("The chairman spoke. The chairman left."))
            .unwrap();
        b.threshold = Some(100.0);

        let stats = EvaluationEngine::aggregate_stats(&[a.clone(), b.clone()]);
        assert_eq!(stats.documents_evaluated, 2);
        assert_eq!(stats.below_threshold, 1);
        assert_eq!(stats.verdicts.values().sum::<usize>(), 2);
        assert!(stats.lowest_score <= stats.average_score);
        assert!(stats.average_score <= stats.highest_score);
        assert!((stats.average_score - (a.composite() + b.composite()) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn aggregate_stats_empty() {
        assert_eq!(EvaluationEngine::aggregate_stats(&[]), AggregateStats::default());
    }

    #[test]
    fn report_renders_every_part() {
        let report = EvaluationEngine::new()
            .evaluate(&Document::parse(LESSON))
            .unwrap();
        let text = report.render();
        assert!(text.contains("Title: Fractions on a Number Line"));
        assert!(text.contains("Overall quality"));
        assert!(text.contains("Section readability"));
        assert!(text.contains("Recommendations"));
    }
}
