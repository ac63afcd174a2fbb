//! Config schema and deserialization

use crate::analyzer::bias::BiasConfig;
use crate::analyzer::pedagogy::PedagogyConfig;
use crate::analyzer::readability::ReadabilityConfig;
use crate::analyzer::scoring::ComponentWeights;
use crate::{BandThresholds, Component, GradeBand};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Numeric tuning for every analyzer and the aggregator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScoringConfig {
    /// Band thresholds shared by curriculum, pedagogy and the verdict
    pub bands: BandThresholds,
    /// Aggregator weights (renormalized over the components that ran)
    pub weights: ComponentWeights,
    pub readability: ReadabilityConfig,
    pub pedagogy: PedagogyConfig,
    pub bias: BiasConfig,
}

/// Per-path override configuration (batch mode)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOverride {
    /// Glob patterns this override applies to
    pub files: Vec<String>,

    #[serde(default)]
    pub threshold: Option<f64>,

    #[serde(default)]
    pub subject: Option<String>,

    #[serde(default)]
    pub grade: Option<String>,
}

/// Root config structure for .eduscorerc.json
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Extend another config file (path relative to this config)
    #[serde(default)]
    pub extends: Option<String>,

    /// Minimum composite score (exit 1 if below)
    #[serde(default)]
    pub threshold: Option<f64>,

    /// Glob patterns for files/directories to skip in batch mode
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Components to run (default: all)
    #[serde(default)]
    pub components: Vec<Component>,

    /// Curriculum framework JSON (relative paths resolve against the config file)
    #[serde(default)]
    pub framework: Option<String>,

    /// Bias term list JSON (relative paths resolve against the config file)
    #[serde(default)]
    pub bias_terms: Option<String>,

    /// Largest document accepted, in bytes
    #[serde(default)]
    pub max_file_size: Option<u64>,

    /// Subject used when a document declares none
    #[serde(default)]
    pub subject: Option<String>,

    /// Grade used when a document declares none ("4", "middle school", ...)
    #[serde(default)]
    pub grade: Option<String>,

    /// Scoring constants; taken whole from the nearest config that sets it
    #[serde(default)]
    pub scoring: Option<ScoringConfig>,

    /// Per-path overrides
    #[serde(default)]
    pub overrides: Vec<ConfigOverride>,
}

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub threshold: Option<f64>,
    pub components: Option<Vec<Component>>,
    pub framework: Option<String>,
    pub bias_terms: Option<String>,
    pub subject: Option<String>,
    pub grade: Option<String>,
}

impl Config {
    /// Merge CLI overrides into config. CLI values take precedence.
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        if cli.threshold.is_some() {
            self.threshold = cli.threshold;
        }
        if let Some(components) = cli.components {
            self.components = components;
        }
        if cli.framework.is_some() {
            self.framework = cli.framework;
        }
        if cli.bias_terms.is_some() {
            self.bias_terms = cli.bias_terms;
        }
        if cli.subject.is_some() {
            self.subject = cli.subject;
        }
        if cli.grade.is_some() {
            self.grade = cli.grade;
        }
        self
    }

    /// Reject values that would make scores meaningless
    pub fn validate(&self) -> Result<()> {
        let thresholds = self
            .threshold
            .iter()
            .chain(self.overrides.iter().filter_map(|o| o.threshold.as_ref()));
        for &threshold in thresholds {
            if !(0.0..=100.0).contains(&threshold) {
                bail!("threshold must be between 0 and 100 (got {})", threshold);
            }
        }
        if let Some(scoring) = &self.scoring {
            let k = scoring.bias.k;
            if !k.is_finite() || k < 0.0 {
                bail!("scoring.bias.k must be a non-negative number (got {})", k);
            }
            let weights = &scoring.weights;
            for (name, weight) in [
                ("curriculum", weights.curriculum),
                ("readability", weights.readability),
                ("pedagogy", weights.pedagogy),
                ("bias", weights.bias),
            ] {
                if !weight.is_finite() || weight < 0.0 {
                    bail!("scoring.weights.{} must be a non-negative number (got {})", name, weight);
                }
            }
        }
        Ok(())
    }

    /// Scoring constants, defaults when unset
    pub fn scoring(&self) -> ScoringConfig {
        self.scoring.clone().unwrap_or_default()
    }

    /// Components to run, all of them when the list is empty
    pub fn components(&self) -> Vec<Component> {
        if self.components.is_empty() {
            Component::ALL.to_vec()
        } else {
            let mut list = self.components.clone();
            list.sort();
            list.dedup();
            list
        }
    }

    /// Get effective config for a specific document path, applying overrides
    pub fn effective_for_file(&self, file_path: &Path) -> EffectiveConfig {
        let mut effective = EffectiveConfig {
            threshold: self.threshold,
            subject: self.subject.clone(),
            grade: self.grade.as_deref().and_then(GradeBand::parse),
        };

        for override_cfg in &self.overrides {
            if Self::matches_override(file_path, &override_cfg.files) {
                if let Some(threshold) = override_cfg.threshold {
                    effective.threshold = Some(threshold);
                }
                if let Some(subject) = &override_cfg.subject {
                    effective.subject = Some(subject.clone());
                }
                if let Some(grade) = override_cfg.grade.as_deref().and_then(GradeBand::parse) {
                    effective.grade = Some(grade);
                }
            }
        }

        effective
    }

    fn matches_override(file_path: &Path, patterns: &[String]) -> bool {
        patterns.iter().any(|pattern| {
            globset::Glob::new(pattern)
                .map(|glob| glob.compile_matcher().is_match(file_path))
                .unwrap_or(false)
        })
    }

    /// Merge another config into this one (for extends)
    pub fn merge_from(&mut self, base: Config) {
        if self.threshold.is_none() {
            self.threshold = base.threshold;
        }
        if self.extends.is_none() {
            self.extends = base.extends;
        }
        if self.components.is_empty() {
            self.components = base.components;
        }
        if self.framework.is_none() {
            self.framework = base.framework;
        }
        if self.bias_terms.is_none() {
            self.bias_terms = base.bias_terms;
        }
        if self.max_file_size.is_none() {
            self.max_file_size = base.max_file_size;
        }
        if self.subject.is_none() {
            self.subject = base.subject;
        }
        if self.grade.is_none() {
            self.grade = base.grade;
        }
        if self.scoring.is_none() {
            self.scoring = base.scoring;
        }

        let mut all_ignores = base.ignore;
        all_ignores.append(&mut self.ignore);
        self.ignore = all_ignores;

        // Base overrides first so this config's overrides win
        let mut all_overrides = base.overrides;
        all_overrides.append(&mut self.overrides);
        self.overrides = all_overrides;
    }
}

/// Effective configuration for one document (after applying overrides)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectiveConfig {
    pub threshold: Option<f64>,
    pub subject: Option<String>,
    pub grade: Option<GradeBand>,
}

/// Starter config written by `eduscore init`
pub fn starter_config(threshold: f64, subject: Option<&str>, grade: Option<&str>) -> String {
    let mut value = serde_json::json!({
        "threshold": threshold,
        "ignore": ["**/drafts/**", "**/archive/**"],
        "scoring": ScoringConfig::default(),
    });
    if let Some(map) = value.as_object_mut() {
        if let Some(subject) = subject {
            map.insert("subject".to_string(), serde_json::Value::from(subject));
        }
        if let Some(grade) = grade {
            map.insert("grade".to_string(), serde_json::Value::from(grade));
        }
    }
    let mut json = serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string());
    json.push('\n');
    json
}
