//! Analyzer module - the four scoring dimensions and their aggregation

pub mod bias;
pub mod curriculum;
pub mod engine;
pub mod pedagogy;
pub mod readability;
pub mod scoring;

pub use bias::BiasDetector;
pub use curriculum::CurriculumChecker;
pub use engine::EvaluationEngine;
pub use pedagogy::PedagogicalAnalyzer;
pub use readability::ReadabilityAnalyzer;
pub use scoring::Aggregator;

use crate::{AnalysisResult, Component, Document, EngineError};

/// Trait shared by the four analyzers
///
/// Analyzers read the document only and hold pre-built configuration, so one
/// instance can score many documents from several threads.
pub trait Analyzer: Send + Sync {
    /// Component this analyzer scores
    fn component(&self) -> Component;

    /// Analyze a document and return the typed result
    fn analyze(&self, doc: &Document) -> Result<AnalysisResult, EngineError>;
}
