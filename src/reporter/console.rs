//! Console reporter with colored output

use crate::analyzer::engine::{AggregateStats, DocumentReport};
use crate::analyzer::scoring::verdict_description;
use crate::{AnalysisResult, Band, Finding, Severity};
use colored::Colorize;

/// Reporter for terminal output
pub struct ConsoleReporter {
    /// Whether to use colors
    use_colors: bool,
    /// Whether to show verbose output
    verbose: bool,
}

impl ConsoleReporter {
    /// Create a new console reporter
    pub fn new() -> Self {
        Self {
            use_colors: true,
            verbose: false,
        }
    }

    /// Disable colors
    pub fn without_colors(mut self) -> Self {
        self.use_colors = false;
        self
    }

    /// Enable verbose output
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Report a single document
    pub fn report(&self, report: &DocumentReport) {
        print!("{}", self.render(report));
    }

    /// Report many documents followed by a summary
    pub fn report_many(&self, reports: &[DocumentReport], stats: &AggregateStats) {
        for report in reports {
            self.report(report);
            println!("{}", "─".repeat(60));
        }
        print!("{}", self.render_summary(stats));
    }

    /// Report in quiet mode (just the composite)
    pub fn report_quiet(&self, report: &DocumentReport) {
        println!(
            "{}: {:.1} ({})",
            report.name(),
            report.composite(),
            self.colorize_band(report.evaluation.verdict)
        );
    }

    /// Full report as a string
    pub fn render(&self, report: &DocumentReport) -> String {
        let mut out = String::new();
        self.push_header(&mut out, report);
        self.push_score(&mut out, report);
        for result in report.analyses.results() {
            self.push_component(&mut out, &result);
        }
        if self.verbose && !report.sections.is_empty() {
            self.push_sections(&mut out, report);
        }
        self.push_recommendations(&mut out, report);
        out.push('\n');
        out
    }

    fn push_header(&self, out: &mut String, report: &DocumentReport) {
        out.push('\n');
        out.push_str(&format!(
            "{}\n",
            self.bold(&format!("Educational Quality Report: {}", report.name()))
        ));
        let meta = &report.metadata;
        let mut line = Vec::new();
        if let Some(subject) = &meta.subject {
            line.push(format!("Subject: {}", subject));
        }
        if let Some(grade) = &meta.grade_level {
            line.push(format!("Grade: {}", grade));
        }
        line.push(format!("Words: {}", report.word_count));
        line.push(format!("Sentences: {}", report.sentence_count));
        out.push_str(&format!("   {}\n", line.join(" | ")));
        if let Some(title) = &meta.title {
            out.push_str(&format!("   Title: {}\n", title));
        }
        out.push('\n');
    }

    fn push_score(&self, out: &mut String, report: &DocumentReport) {
        let eval = &report.evaluation;
        out.push_str(&format!(
            "   Overall: {} {}\n",
            self.score_bar(eval.composite),
            self.colorize_band(eval.verdict)
        ));
        out.push_str(&format!(
            "   {}\n",
            self.dimmed(verdict_description(eval.verdict))
        ));
        if let Some(threshold) = report.threshold {
            let status = if report.passes() {
                self.paint(&format!("meets threshold {:.0}", threshold), Band::Excellent)
            } else {
                self.paint(&format!("below threshold {:.0}", threshold), Band::Poor)
            };
            out.push_str(&format!("   {}\n", status));
        }
        for note in &eval.notes {
            out.push_str(&format!("   {} {}\n", self.paint("ℹ", Band::Good), note));
        }
        out.push('\n');

        out.push_str(&format!("   {}\n", self.bold("Score Breakdown:")));
        for (component, score) in &eval.component_scores {
            let weight = eval.weights.get(component).copied().unwrap_or(0.0);
            out.push_str(&format!(
                "   {} {} {} (weight {:.0}%)\n",
                self.mini_bar(*score),
                self.colorize_score(*score),
                component.title(),
                weight * 100.0
            ));
        }
        out.push('\n');
    }

    fn push_component(&self, out: &mut String, result: &AnalysisResult) {
        out.push_str(&format!(
            "   {} {:.1} ({})\n",
            self.bold(&format!("{}:", result.component().title())),
            result.score(),
            result.label()
        ));
        match result {
            AnalysisResult::Curriculum(r) if r.framework_available => {
                let subject = r.subject.as_deref().unwrap_or("-");
                let band = r.grade_band.map(|b| b.to_string()).unwrap_or_default();
                out.push_str(&format!(
                    "      {} / {}: {} of {} topics covered\n",
                    subject,
                    band,
                    r.covered_topics.len(),
                    r.total_topics
                ));
            }
            AnalysisResult::Curriculum(r) if !r.subject_alignments.is_empty() => {
                for alignment in &r.subject_alignments {
                    out.push_str(&format!(
                        "      {}: {} of {} topics\n",
                        alignment.subject,
                        alignment.covered_topics.len(),
                        alignment.total_topics
                    ));
                }
            }
            AnalysisResult::Readability(r) => {
                out.push_str(&format!(
                    "      Flesch-Kincaid {:.1} | Reading ease {:.1} ({}) | Fog {:.1} | SMOG {:.1}\n",
                    r.flesch_kincaid_grade,
                    r.flesch_reading_ease,
                    r.reading_ease,
                    r.gunning_fog,
                    r.smog_index
                ));
                out.push_str(&format!(
                    "      Reads as {} | Recommended audience: {}\n",
                    r.grade_band, r.recommended_audience
                ));
            }
            AnalysisResult::Pedagogy(r) => {
                for sub in &r.sub_scores {
                    out.push_str(&format!(
                        "      {:<24} {:>4.1}/10 ({} markers)\n",
                        sub.aspect.title(),
                        sub.score,
                        sub.count
                    ));
                }
            }
            AnalysisResult::Bias(r) if self.verbose => {
                for m in &r.matches {
                    out.push_str(&format!(
                        "      {} L{}:{} [{}] \"{}\" ... {} ...\n",
                        self.paint("⚠", Band::Fair),
                        m.location.line,
                        m.location.column,
                        m.category,
                        m.matched,
                        self.dimmed(&m.context)
                    ));
                }
                if r.inclusive_count > 0 {
                    out.push_str(&format!(
                        "      {} {} inclusive phrase(s): {}\n",
                        self.paint("✓", Band::Excellent),
                        r.inclusive_count,
                        r.inclusive_phrases.join(", ")
                    ));
                }
            }
            _ => {}
        }

        let findings = result.findings();
        let hidden = if self.verbose {
            0
        } else {
            findings.iter().filter(|f| f.severity == Severity::Info).count()
        };
        for finding in findings {
            if self.verbose || finding.severity != Severity::Info {
                self.push_finding(out, finding);
            }
        }
        if hidden > 0 && findings.len() > 5 {
            out.push_str(&format!(
                "      {} {} additional notes (use --verbose to show)\n",
                self.paint("ℹ", Band::Good),
                hidden
            ));
        } else if hidden > 0 {
            for finding in findings.iter().filter(|f| f.severity == Severity::Info) {
                self.push_finding(out, finding);
            }
        }
        out.push('\n');
    }

    fn push_finding(&self, out: &mut String, finding: &Finding) {
        let icon = match finding.severity {
            Severity::Concern => self.paint("✗", Band::Poor),
            Severity::Warning => self.paint("⚠", Band::Fair),
            Severity::Info => self.paint("ℹ", Band::Good),
        };
        let location = finding
            .location
            .map(|l| format!("L{}:{} ", l.line, l.column))
            .unwrap_or_default();
        out.push_str(&format!(
            "      {} {}{}\n",
            icon,
            self.dimmed(&location),
            finding.message
        ));
        if let Some(suggestion) = &finding.suggestion {
            out.push_str(&format!("         {} {}\n", self.dimmed("→"), suggestion));
        }
    }

    fn push_sections(&self, out: &mut String, report: &DocumentReport) {
        out.push_str(&format!("   {}\n", self.bold("Section readability:")));
        for s in &report.sections {
            let label = if s.label.is_empty() { "(untitled)" } else { s.label.as_str() };
            out.push_str(&format!(
                "      {:<28} grade {:>5.1}  ease {:>5.1}\n",
                label, s.flesch_kincaid_grade, s.flesch_reading_ease
            ));
        }
        out.push('\n');
    }

    fn push_recommendations(&self, out: &mut String, report: &DocumentReport) {
        out.push_str(&format!("   {}\n", self.bold("Recommendations:")));
        let limit = if self.verbose { usize::MAX } else { 5 };
        let recs = &report.evaluation.recommendations;
        for rec in recs.iter().take(limit) {
            let arrow = if self.use_colors {
                "→".cyan().to_string()
            } else {
                "→".to_string()
            };
            out.push_str(&format!("   {} {}\n", arrow, rec.message));
        }
        if recs.len() > limit {
            out.push_str(&format!(
                "   {}\n",
                self.dimmed(&format!("... {} more (use --verbose to show)", recs.len() - limit))
            ));
        }
    }

    /// Batch summary as a string
    pub fn render_summary(&self, stats: &AggregateStats) -> String {
        let mut out = String::from("\n");
        out.push_str(&format!("{}\n", "═".repeat(60)));
        out.push_str(&format!("{}\n", self.bold("Summary")));
        out.push_str(&format!("{}\n", "═".repeat(60)));
        out.push_str(&format!(
            "   Documents evaluated: {}\n",
            self.bold(&stats.documents_evaluated.to_string())
        ));
        out.push_str(&format!(
            "   Average score:       {}\n",
            self.colorize_score(stats.average_score)
        ));
        if stats.documents_evaluated > 0 {
            out.push_str(&format!(
                "   Range:               {:.1} - {:.1}\n",
                stats.lowest_score, stats.highest_score
            ));
        }
        for (band, count) in &stats.verdicts {
            out.push_str(&format!("   {:<20} {}\n", format!("{}:", band), count));
        }
        out.push_str(&format!("   Total findings:      {}\n", stats.total_findings));
        if stats.below_threshold > 0 {
            out.push_str(&format!(
                "   {}\n",
                self.paint(
                    &format!("{} below threshold", stats.below_threshold),
                    Band::Poor
                )
            ));
        }
        out.push('\n');
        out
    }

    fn paint(&self, text: &str, band: Band) -> String {
        if !self.use_colors {
            return text.to_string();
        }
        match band {
            Band::Excellent => text.green().bold().to_string(),
            Band::Good => text.blue().to_string(),
            Band::Fair => text.yellow().to_string(),
            Band::Poor => text.red().bold().to_string(),
        }
    }

    fn bold(&self, text: &str) -> String {
        if self.use_colors {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn dimmed(&self, text: &str) -> String {
        if self.use_colors {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }

    fn colorize_band(&self, band: Band) -> String {
        let s = band.to_string();
        if !self.use_colors {
            return s;
        }
        match band {
            Band::Excellent => s.green().bold().to_string(),
            Band::Good => s.green().to_string(),
            Band::Fair => s.yellow().to_string(),
            Band::Poor => s.red().bold().to_string(),
        }
    }

    fn colorize_score(&self, score: f64) -> String {
        let s = format!("{:>5.1}", score);
        if !self.use_colors {
            s
        } else if score >= 75.0 {
            s.green().to_string()
        } else if score >= 50.0 {
            s.yellow().to_string()
        } else {
            s.red().to_string()
        }
    }

    fn score_bar(&self, score: f64) -> String {
        let filled = ((score.clamp(0.0, 100.0) * 20.0) / 100.0) as usize;
        let empty = 20 - filled;

        let bar = format!("[{}{}] {:>5.1}", "█".repeat(filled), "░".repeat(empty), score);

        if self.use_colors {
            if score >= 75.0 {
                bar.green().to_string()
            } else if score >= 50.0 {
                bar.yellow().to_string()
            } else {
                bar.red().to_string()
            }
        } else {
            bar
        }
    }

    fn mini_bar(&self, score: f64) -> String {
        let filled = ((score.clamp(0.0, 100.0) * 10.0) / 100.0) as usize;
        let empty = 10 - filled;
        format!("[{}{}]", "▓".repeat(filled), "░".repeat(empty))
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::EvaluationEngine;
    use crate::Document;

    fn report(text: &str) -> DocumentReport {
        EvaluationEngine::new().evaluate(&Document::parse(text)).unwrap()
    }

    #[test]
    fn plain_render_lists_components_and_recommendations() {
        let r = report("Subject: Science\nGrade: 5\n\nThe chairman explained how plants grow. Plants need light.");
        let text = ConsoleReporter::new().without_colors().render(&r);
        assert!(text.contains("Educational Quality Report"));
        assert!(text.contains("Score Breakdown:"));
        assert!(text.contains("Readability:"));
        assert!(text.contains("Bias & Sensitivity:"));
        assert!(text.contains("Recommendations:"));
        assert!(!text.contains('\u{1b}'), "no ANSI escapes without colors");
    }

    #[test]
    fn verbose_shows_bias_matches() {
        let r = report("The chairman spoke to the class. The chairman left early.");
        let quiet = ConsoleReporter::new().without_colors().render(&r);
        let verbose = ConsoleReporter::new().without_colors().verbose().render(&r);
        assert!(verbose.contains("\"chairman\""));
        assert!(verbose.len() >= quiet.len());
    }

    #[test]
    fn threshold_status_shown() {
        let mut r = report("Plants need light. Roots take in water.");
        r.threshold = Some(101.0);
        let text = ConsoleReporter::new().without_colors().render(&r);
        assert!(text.contains("below threshold 101"));
    }

    #[test]
    fn summary_counts() {
        let a = report("Plants need light. Roots take in water.");
        let stats = EvaluationEngine::aggregate_stats(&[a]);
        let text = ConsoleReporter::new().without_colors().render_summary(&stats);
        assert!(text.contains("Documents evaluated: 1"));
        assert!(text.contains("Total findings"));
    }

    #[test]
    fn bars_stay_in_range() {
        let reporter = ConsoleReporter::new().without_colors();
        assert_eq!(reporter.mini_bar(100.0).chars().filter(|c| *c == '▓').count(), 10);
        assert_eq!(reporter.mini_bar(0.0).chars().filter(|c| *c == '░').count(), 10);
        assert!(reporter.score_bar(55.5).ends_with(" 55.5"));
    }
}
