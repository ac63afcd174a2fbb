//! Configuration loading for eduscore
//!
//! A `.eduscorerc.json` is looked up from the document's directory upwards
//! unless `--config` names one. Files may `extends` another file; data paths
//! inside each file are anchored at that file's directory.

mod schema;

pub use schema::{
    starter_config, CliOverrides, Config, ConfigOverride, EffectiveConfig, ScoringConfig,
};

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = ".eduscorerc.json";

/// Locate and load the config for `work_dir`, following `extends`
pub fn load_config(work_dir: &Path, custom_path: Option<&Path>) -> Result<Config> {
    let path = match custom_path {
        Some(p) => {
            let path = work_dir.join(p);
            if !path.is_file() {
                bail!("Config file not found: {}", path.display());
            }
            Some(path)
        }
        None => find_config_in_parents(work_dir),
    };

    let Some(path) = path else {
        return Ok(Config::default());
    };
    tracing::debug!(path = %path.display(), "loading config");
    let config = ExtendsChain::default().load(&path)?;
    config
        .validate()
        .with_context(|| format!("Invalid config: {}", path.display()))?;
    Ok(config)
}

/// Files already visited while following `extends`
#[derive(Default)]
struct ExtendsChain {
    seen: Vec<PathBuf>,
}

impl ExtendsChain {
    fn load(&mut self, path: &Path) -> Result<Config> {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if self.seen.contains(&key) {
            bail!("Circular extends detected in config: {}", path.display());
        }
        self.seen.push(key);

        let mut config = read_config_file(path)?;
        let dir = path.parent().unwrap_or(Path::new("."));
        config.framework = config.framework.map(|p| anchor(dir, &p));
        config.bias_terms = config.bias_terms.map(|p| anchor(dir, &p));

        if let Some(parent) = config.extends.take() {
            let mut parent_path = dir.join(&parent);
            if parent_path.extension().is_none() {
                parent_path.set_extension("json");
            }
            if !parent_path.is_file() {
                bail!(
                    "Extended config not found: {} (referenced from {})",
                    parent_path.display(),
                    path.display()
                );
            }
            let base = self.load(&parent_path)?;
            config.merge_from(base);
        }
        Ok(config)
    }
}

fn read_config_file(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in config: {}", path.display()))
}

/// Relative data paths are anchored at the config's directory
fn anchor(dir: &Path, path: &str) -> String {
    dir.join(path).to_string_lossy().into_owned()
}

fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILENAME))
        .find(|candidate| candidate.is_file())
}

/// Compile the `ignore` globs used in batch mode
pub fn build_ignore_set(patterns: &[String]) -> Result<GlobSet> {
    let builder = patterns
        .iter()
        .try_fold(GlobSetBuilder::new(), |mut builder, pattern| {
            let glob = Glob::new(pattern)
                .with_context(|| format!("Invalid ignore pattern: {}", pattern))?;
            builder.add(glob);
            Ok::<_, anyhow::Error>(builder)
        })?;
    builder.build().context("Failed to build ignore patterns")
}

pub fn is_ignored(path: &Path, ignore_set: &GlobSet) -> bool {
    ignore_set.is_match(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        let mut f = fs::File::create(path).unwrap();
        writeln!(f, "{}", content).unwrap();
    }

    #[test]
    fn no_config_gives_defaults() {
        let dir = TempDir::new().unwrap();
        if find_config_in_parents(dir.path()).is_none() {
            let config = load_config(dir.path(), None).unwrap();
            assert!(config.threshold.is_none());
            assert!(config.scoring.is_none());
        }
    }

    #[test]
    fn ignore_patterns() {
        let set = build_ignore_set(&["**/drafts/**".to_string(), "**/*.bak.txt".to_string()])
            .unwrap();
        assert!(is_ignored(Path::new("lessons/drafts/week1.txt"), &set));
        assert!(is_ignored(Path::new("lessons/week1.bak.txt"), &set));
        assert!(!is_ignored(Path::new("lessons/week1.txt"), &set));
    }

    #[test]
    fn invalid_ignore_pattern_is_error() {
        assert!(build_ignore_set(&["a/[".to_string()]).is_err());
    }

    #[test]
    fn config_extends() {
        let dir = TempDir::new().unwrap();
        write(
            &dir.path().join("base.json"),
            r#"{
                "threshold": 60,
                "ignore": ["**/archive/**"],
                "framework": "frameworks/state.json",
                "scoring": {"bias": {"k": 2.0}}
            }"#,
        );
        write(
            &dir.path().join(CONFIG_FILENAME),
            r#"{
                "extends": "./base.json",
                "threshold": 75,
                "ignore": ["**/drafts/**"]
            }"#,
        );

        let config = load_config(dir.path(), None).unwrap();
        assert_eq!(config.threshold, Some(75.0));
        assert_eq!(config.ignore, vec!["**/archive/**", "**/drafts/**"]);
        assert_eq!(config.scoring().bias.k, 2.0);
        let framework = config.framework.unwrap();
        assert!(Path::new(&framework).starts_with(dir.path()));
        assert!(framework.ends_with("state.json"));
    }

    #[test]
    fn circular_extends_is_error() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join("a.json"), r#"{"extends": "./b.json"}"#);
        write(&dir.path().join("b.json"), r#"{"extends": "./a.json"}"#);
        let err = load_config(dir.path(), Some(Path::new("a.json"))).unwrap_err();
        assert!(err.to_string().contains("Circular extends"));
    }

    #[test]
    fn out_of_range_values_fail_at_load() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join("base.json"), r#"{"scoring": {"bias": {"k": -2}}}"#);
        write(&dir.path().join(CONFIG_FILENAME), r#"{"extends": "./base.json"}"#);
        let err = load_config(dir.path(), None).unwrap_err();
        assert!(format!("{:#}", err).contains("scoring.bias.k"));

        write(&dir.path().join(CONFIG_FILENAME), r#"{"threshold": 250}"#);
        let err = load_config(dir.path(), None).unwrap_err();
        assert!(format!("{:#}", err).contains("between 0 and 100"));
    }

    #[test]
    fn missing_custom_config_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(load_config(dir.path(), Some(Path::new("nope.json"))).is_err());
    }

    #[test]
    fn config_found_in_parent() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join(CONFIG_FILENAME), r#"{"subject": "science"}"#);
        let nested = dir.path().join("unit1").join("week2");
        fs::create_dir_all(&nested).unwrap();
        let config = load_config(&nested, None).unwrap();
        assert_eq!(config.subject.as_deref(), Some("science"));
    }
}
