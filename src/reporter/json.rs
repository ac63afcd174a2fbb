//! JSON reporter for machine-readable output

use crate::analyzer::engine::{AggregateStats, DocumentReport};
use serde::Serialize;

/// Reporter for JSON output
pub struct JsonReporter {
    /// Whether to pretty-print JSON
    pretty: bool,
}

impl JsonReporter {
    /// Create a new JSON reporter
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Enable pretty-printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    fn to_json<T: Serialize + ?Sized>(&self, value: &T, fallback: &str) -> String {
        let out = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        out.unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to serialize report");
            fallback.to_string()
        })
    }

    /// Report a single document as JSON
    pub fn report(&self, report: &DocumentReport) -> String {
        self.to_json(report, "{}")
    }

    /// Report multiple documents as a JSON array
    pub fn report_many(&self, reports: &[DocumentReport]) -> String {
        self.to_json(reports, "[]")
    }

    /// Report multiple documents with a summary object
    pub fn report_with_summary(&self, reports: &[DocumentReport], stats: &AggregateStats) -> String {
        self.to_json(
            &JsonOutput {
                results: reports,
                summary: stats,
            },
            "{}",
        )
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonOutput<'a> {
    results: &'a [DocumentReport],
    summary: &'a AggregateStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::EvaluationEngine;
    use crate::Document;
    use std::path::PathBuf;

    fn make_report(path: &str, text: &str) -> DocumentReport {
        let mut report = EvaluationEngine::new()
            .evaluate(&Document::parse(text))
            .unwrap();
        report.path = Some(PathBuf::from(path));
        report
    }

    const LESSON: &str = "Subject: Mathematics\nGrade: 2\n\nObjectives:\nStudents will add two digit numbers.\n\nFor example, 12 plus 7 is 19. The chairman counted the apples.\n";

    #[test]
    fn single_report_has_expected_keys() {
        let json = JsonReporter::new().report(&make_report("lesson.txt", LESSON));
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["path"], "lesson.txt");
        assert!(parsed["fingerprint"].as_str().unwrap().len() == 64);
        assert_eq!(parsed["metadata"]["subject"], "Mathematics");
        assert!(parsed.get("wordCount").is_some());
        assert!(parsed["evaluation"]["composite"].is_number());
        assert!(parsed["evaluation"]["recommendations"].is_array());

        let analyses = &parsed["analyses"];
        for key in ["curriculum", "readability", "pedagogy", "bias"] {
            assert!(analyses.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(analyses["bias"]["matches"][0]["category"], "gender");
    }

    #[test]
    fn component_scores_keyed_by_name() {
        let json = JsonReporter::new().report(&make_report("lesson.txt", LESSON));
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let scores = parsed["evaluation"]["componentScores"].as_object().unwrap();
        let mut keys: Vec<&str> = scores.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["bias", "curriculum", "pedagogy", "readability"]);
    }

    #[test]
    fn pretty_output_is_indented() {
        let json = JsonReporter::new()
            .pretty()
            .report(&make_report("lesson.txt", LESSON));
        assert!(json.contains('\n'), "pretty JSON should have newlines");
        assert!(json.contains("  "), "pretty JSON should have indentation");
    }

    #[test]
    fn report_many_keeps_order() {
        let a = make_report("a.txt", LESSON);
        let b = make_report("b.txt", "Plants need light. Roots drink water.");
        let json = JsonReporter::new().report_many(&[a, b]);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let arr = parsed.as_array().unwrap();
        assert_eq!(arr.len(), 2);
        assert_eq!(arr[0]["path"], "a.txt");
        assert_eq!(arr[1]["path"], "b.txt");
    }

    #[test]
    fn report_with_summary() {
        let reports = vec![
            make_report("a.txt", LESSON),
            make_report("b.txt", "Plants need light. Roots drink water."),
        ];
        let stats = EvaluationEngine::aggregate_stats(&reports);
        let json = JsonReporter::new().report_with_summary(&reports, &stats);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["results"].as_array().unwrap().len(), 2);
        let summary = &parsed["summary"];
        assert_eq!(summary["documentsEvaluated"], 2);
        assert!(summary["averageScore"].is_number());
        assert!(summary["verdicts"].is_object());
    }

    #[test]
    fn report_many_empty() {
        let json = JsonReporter::new().report_many(&[]);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed.as_array().unwrap().is_empty());
    }
}
