//! Plain-text report file

use crate::analyzer::engine::{AggregateStats, DocumentReport};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;

/// Writes the uncolored report, stamped with the generation time
pub struct TextReporter {
    generated_at: DateTime<Utc>,
}

impl TextReporter {
    pub fn new() -> Self {
        Self {
            generated_at: Utc::now(),
        }
    }

    /// Fixed timestamp (tests, reproducible output)
    pub fn at(generated_at: DateTime<Utc>) -> Self {
        Self { generated_at }
    }

    pub fn render(&self, reports: &[DocumentReport], stats: Option<&AggregateStats>) -> String {
        let rule = "=".repeat(60);
        let mut out = format!(
            "eduscore {} report\nGenerated: {}\n{}\n\n",
            env!("CARGO_PKG_VERSION"),
            self.generated_at.to_rfc3339(),
            rule
        );
        for (i, report) in reports.iter().enumerate() {
            if i > 0 {
                out.push_str(&format!("{}\n\n", "-".repeat(60)));
            }
            out.push_str(&report.render());
            out.push('\n');
        }
        if let Some(stats) = stats.filter(|_| reports.len() > 1) {
            out.push_str(&format!("{}\nSummary\n", rule));
            out.push_str(&format!("  Documents evaluated: {}\n", stats.documents_evaluated));
            out.push_str(&format!("  Average score:       {:.1}\n", stats.average_score));
            out.push_str(&format!(
                "  Range:               {:.1} - {:.1}\n",
                stats.lowest_score, stats.highest_score
            ));
            for (band, count) in &stats.verdicts {
                out.push_str(&format!("  {:<20} {}\n", format!("{}:", band), count));
            }
            if stats.below_threshold > 0 {
                out.push_str(&format!("  Below threshold:     {}\n", stats.below_threshold));
            }
        }
        out
    }

    /// Render and write to `path`, creating parent directories
    pub fn write(
        &self,
        path: &Path,
        reports: &[DocumentReport],
        stats: Option<&AggregateStats>,
    ) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::write(path, self.render(reports, stats))
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        tracing::info!(path = %path.display(), documents = reports.len(), "report written");
        Ok(())
    }
}

impl Default for TextReporter {
    fn default() -> Self {
        Self::new()
    }
}
