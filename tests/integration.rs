//! End-to-end tests over the sample lessons in test-data/

use eduscore::analyzer::engine::DocumentReport;
use eduscore::analyzer::pedagogy::Aspect;
use eduscore::analyzer::readability::Direction;
use eduscore::analyzer::EvaluationEngine;
use eduscore::config::Config;
use eduscore::document::{load_document, SourceFormat, DEFAULT_MAX_FILE_SIZE};
use eduscore::{
    Band, BiasCategory, BiasTermLists, Component, CurriculumFramework, GradeBand,
};
use std::path::Path;

fn evaluate(path: &str) -> DocumentReport {
    EvaluationEngine::new()
        .evaluate_path(Path::new(path), None)
        .unwrap_or_else(|e| panic!("failed to evaluate {}: {:#}", path, e))
}

#[test]
fn well_structured_lesson_scores_well() {
    let report = evaluate("test-data/lessons/water_cycle.txt");

    assert_eq!(report.metadata.title.as_deref(), Some("Where Does the Rain Go?"));
    assert_eq!(report.metadata.author.as_deref(), Some("Ms. Okafor"));
    assert_eq!(report.analyses.len(), 4);

    let readability = report.analyses.readability.as_ref().unwrap();
    assert_eq!(readability.target_band, Some(GradeBand::Elementary));
    assert_eq!(readability.grade_band, GradeBand::Elementary);
    assert!(readability.appropriateness >= 75.0);

    let pedagogy = report.analyses.pedagogy.as_ref().unwrap();
    assert!(pedagogy.score >= 75.0, "pedagogy {}", pedagogy.score);
    assert!(pedagogy.structure_sections.contains(&"objectives".to_string()));
    assert!(pedagogy.structure_sections.contains(&"summary".to_string()));

    let bias = report.analyses.bias.as_ref().unwrap();
    assert_eq!(bias.score, 100.0);
    assert!(bias.matches.is_empty());

    let curriculum = report.analyses.curriculum.as_ref().unwrap();
    assert!(curriculum.framework_available);
    assert!(curriculum.covered_topics.contains(&"water cycle".to_string()));
    assert!(curriculum.missing_topics.contains(&"solar system".to_string()));

    assert!(report.composite() >= 60.0, "composite {}", report.composite());
    assert!(report
        .evaluation
        .recommendations
        .iter()
        .any(|r| r.component == Some(Component::Curriculum) && r.message.starts_with("Add coverage for:")));
}

#[test]
fn dense_text_for_young_readers_is_poor() {
    let report = evaluate("test-data/lessons/dense_policy.txt");

    let readability = report.analyses.readability.as_ref().unwrap();
    assert_eq!(readability.direction(), Some(Direction::TooHard));
    assert_eq!(readability.appropriateness, 25.0);
    assert!(readability.flesch_kincaid_grade > 12.0);

    let bias = report.analyses.bias.as_ref().unwrap();
    assert_eq!(bias.matches.len(), 2);
    assert_eq!(bias.total_severity, 11.0);
    assert_eq!(bias.score, 89.0);
    let categories: Vec<BiasCategory> = bias.by_category().keys().copied().collect();
    assert_eq!(categories, vec![BiasCategory::Gender, BiasCategory::Cultural]);

    let pedagogy = report.analyses.pedagogy.as_ref().unwrap();
    assert_eq!(pedagogy.score, 0.0);

    assert_eq!(report.evaluation.verdict, Band::Poor);
    assert!(report.composite() < 50.0);

    // Bias is above the good threshold, so its review notes come last
    let recs = &report.evaluation.recommendations;
    assert_ne!(recs.first().unwrap().component, Some(Component::Bias));
    assert_eq!(recs.last().unwrap().component, Some(Component::Bias));
    assert!(recs
        .iter()
        .any(|r| r.message.contains("Review language in category gender")));
}

#[test]
fn csv_worksheet_is_flattened() {
    let report = evaluate("test-data/lessons/fractions_worksheet.csv");
    assert_eq!(report.format, SourceFormat::Tabular);

    let pedagogy = report.analyses.pedagogy.as_ref().unwrap();
    assert!(pedagogy.sub_score(Aspect::Objectives).unwrap().count >= 1);
    assert!(pedagogy.sub_score(Aspect::Examples).unwrap().count >= 2);
    assert!(pedagogy.sub_score(Aspect::Assessment).unwrap().count >= 2);

    // No metadata row, so no subject to align against
    let curriculum = report.analyses.curriculum.as_ref().unwrap();
    assert!(!curriculum.framework_available);
    assert_eq!(curriculum.alignment_score, 100.0);
}

#[test]
fn markdown_headings_become_sections() {
    let report = evaluate("test-data/lessons/untitled_notes.md");
    let labels: Vec<&str> = report.sections.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, vec!["Notes on Measuring", "What we found"]);
}

#[test]
fn custom_framework_partial_coverage() {
    let framework = CurriculumFramework::load(Path::new("test-data/data/arithmetic.json")).unwrap();
    let engine = EvaluationEngine::new()
        .with_framework(framework)
        .with_components(&[Component::Curriculum]);
    let report = engine
        .evaluate_path(Path::new("test-data/lessons/adding_and_subtracting.txt"), None)
        .unwrap();

    let curriculum = report.analyses.curriculum.as_ref().unwrap();
    assert_eq!(curriculum.alignment_score, 66.67);
    assert_eq!(curriculum.covered_topics, vec!["addition", "subtraction"]);
    assert_eq!(curriculum.missing_topics, vec!["multiplication"]);
    assert_eq!(report.composite(), 66.67);
    assert_eq!(
        report.evaluation.recommendations[0].message,
        "Add coverage for: multiplication"
    );
}

#[test]
fn custom_bias_terms_with_unknown_category() {
    let terms = BiasTermLists::load(Path::new("test-data/data/workplace_terms.json")).unwrap();
    assert_eq!(terms.len(), 2);

    let doc = eduscore::Document::parse(
        "The chairman opened the meeting. She is not just a secretary. The chairman closed it.",
    );
    let report = EvaluationEngine::new()
        .with_bias_terms(terms)
        .with_components(&[Component::Bias])
        .evaluate(&doc)
        .unwrap();
    let bias = report.analyses.bias.unwrap();
    assert_eq!(bias.matches.len(), 3);
    assert_eq!(bias.score, 87.0);
    assert!(bias.by_category().contains_key(&BiasCategory::Other));
    // Findings are in document order
    let offsets: Vec<usize> = bias.matches.iter().map(|m| m.offset).collect();
    let mut sorted = offsets.clone();
    sorted.sort();
    assert_eq!(offsets, sorted);
}

#[test]
fn config_overrides_apply_per_path() {
    let config: Config = serde_json::from_str(
        r#"{
            "threshold": 50,
            "overrides": [
                {"files": ["**/fractions_worksheet.csv"], "subject": "mathematics", "grade": "3"}
            ]
        }"#,
    )
    .unwrap();
    let report = EvaluationEngine::from_config(&config)
        .unwrap()
        .evaluate_path(Path::new("test-data/lessons/fractions_worksheet.csv"), Some(&config))
        .unwrap();

    assert_eq!(report.threshold, Some(50.0));
    let curriculum = report.analyses.curriculum.as_ref().unwrap();
    assert!(curriculum.framework_available);
    assert_eq!(curriculum.subject.as_deref(), Some("mathematics"));
    assert!(curriculum.covered_topics.contains(&"fractions".to_string()));
}

#[test]
fn batch_statistics() {
    let engine = EvaluationEngine::new();
    let reports: Vec<DocumentReport> = [
        "test-data/lessons/water_cycle.txt",
        "test-data/lessons/dense_policy.txt",
    ]
    .iter()
    .map(|p| engine.evaluate_path(Path::new(p), None).unwrap())
    .collect();

    let stats = EvaluationEngine::aggregate_stats(&reports);
    assert_eq!(stats.documents_evaluated, 2);
    assert_eq!(stats.verdicts.get(&Band::Poor), Some(&1));
    assert!(stats.highest_score > stats.lowest_score);
}

#[test]
fn loader_and_parse_agree() {
    let path = Path::new("test-data/lessons/water_cycle.txt");
    let loaded = load_document(path, DEFAULT_MAX_FILE_SIZE).unwrap();
    let parsed = eduscore::Document::parse(std::fs::read_to_string(path).unwrap());
    assert_eq!(loaded.fingerprint(), parsed.fingerprint());
    assert_eq!(loaded.sentence_count(), parsed.sentence_count());
}
