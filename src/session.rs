//! Evaluation session: one document plus the analyses run on it so far

use crate::analyzer::{Aggregator, Analyzer};
use crate::{AnalysisResult, AnalysisSet, Component, Document, EngineError, OverallEvaluation};

/// Explicit per-document state.
///
/// Analyzers can be run in any order and any subset; running one twice
/// replaces its earlier result. Aggregation reads whatever is present.
#[derive(Debug)]
pub struct EvaluationSession<'a> {
    document: &'a Document,
    analyses: AnalysisSet,
}

impl<'a> EvaluationSession<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self {
            document,
            analyses: AnalysisSet::new(),
        }
    }

    pub fn document(&self) -> &Document {
        self.document
    }

    pub fn analyses(&self) -> &AnalysisSet {
        &self.analyses
    }

    /// Run one analyzer and store its result
    pub fn run(&mut self, analyzer: &dyn Analyzer) -> Result<&AnalysisSet, EngineError> {
        let result = analyzer.analyze(self.document)?;
        tracing::debug!(
            component = %result.component(),
            score = result.score(),
            "analysis complete"
        );
        self.analyses.insert(result);
        Ok(&self.analyses)
    }

    /// Store a result computed elsewhere
    pub fn record(&mut self, result: AnalysisResult) {
        self.analyses.insert(result);
    }

    pub fn has(&self, component: Component) -> bool {
        self.analyses.score(component).is_some()
    }

    pub fn aggregate(&self, aggregator: &Aggregator) -> Result<OverallEvaluation, EngineError> {
        aggregator.aggregate(&self.analyses)
    }

    pub fn into_analyses(self) -> AnalysisSet {
        self.analyses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{BiasDetector, PedagogicalAnalyzer, ReadabilityAnalyzer};

    const LESSON: &str = "Subject: Science\nGrade: 5\n\nObjectives:\nStudents will be able to describe the water cycle.\n\nThe sun warms the ocean. Water rises as vapor. For example, a puddle dries on a hot day.\n";

    #[test]
    fn aggregate_before_any_analysis_fails() {
        let doc = Document::parse(LESSON);
        let session = EvaluationSession::new(&doc);
        assert_eq!(
            session.aggregate(&Aggregator::default()).unwrap_err(),
            EngineError::InsufficientAnalysis
        );
    }

    #[test]
    fn single_analysis_passes_through() {
        let doc = Document::parse(LESSON);
        let mut session = EvaluationSession::new(&doc);
        session.run(&PedagogicalAnalyzer::default()).unwrap();
        assert!(session.has(Component::Pedagogy));
        assert!(!session.has(Component::Bias));

        let eval = session.aggregate(&Aggregator::default()).unwrap();
        let pedagogy = session.analyses().pedagogy.as_ref().unwrap().score;
        assert!((eval.composite - pedagogy).abs() < 1e-9);
    }

    #[test]
    fn any_order_same_result() {
        let doc = Document::parse(LESSON);
        let readability = ReadabilityAnalyzer::default();
        let bias = BiasDetector::default();

        let mut a = EvaluationSession::new(&doc);
        a.run(&readability).unwrap();
        a.run(&bias).unwrap();

        let mut b = EvaluationSession::new(&doc);
        b.run(&bias).unwrap();
        b.run(&readability).unwrap();

        assert_eq!(a.analyses(), b.analyses());
    }

    #[test]
    fn readability_on_empty_body_is_an_error() {
        let doc = Document::parse("Title: Placeholder\n");
        let mut session = EvaluationSession::new(&doc);
        let err = session.run(&ReadabilityAnalyzer::default()).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientContent(_)));
        assert!(session.analyses().is_empty());
    }
}
