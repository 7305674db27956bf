//! Configuration loading.
//!
//! Settings come from `tengen.toml` (current or parent directory, or the
//! path in `TENGEN_CONFIG`), with `TENGEN_*` environment variables
//! overriding individual fields on top. Anything missing falls back to
//! the built-in defaults; a malformed file is reported and ignored
//! rather than fatal.

use std::path::{Path, PathBuf};

use mcts::SearchConfig;
use serde::Deserialize;
use tracing::warn;

/// Default locations searched for the config file.
const CONFIG_SEARCH_PATHS: &[&str] = &["tengen.toml", "../tengen.toml"];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub search: SearchConfig,
    pub patterns: PatternFiles,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PatternFiles {
    pub prob_file: PathBuf,
    pub spat_file: PathBuf,
}

impl Default for PatternFiles {
    fn default() -> Self {
        Self {
            prob_file: "patterns.prob".into(),
            spat_file: "patterns.spat".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub file: PathBuf,
    /// Default tracing filter; `TENGEN_LOG` overrides it wholesale.
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            file: "tengen.log".into(),
            level: "info".into(),
        }
    }
}

/// Apply one environment override.
macro_rules! env_override {
    ($settings:expr, $section:ident . $field:ident, $key:expr) => {
        if let Ok(v) = std::env::var($key) {
            $settings.$section.$field = v.into();
        }
    };
    ($settings:expr, $section:ident . $field:ident, $key:expr, parse) => {
        if let Ok(Ok(v)) = std::env::var($key).map(|s| s.parse()) {
            $settings.$section.$field = v;
        }
    };
}

/// Load settings: explicit path, then `TENGEN_CONFIG`, then the search
/// list, then defaults. Environment overrides apply in every case.
pub fn load(explicit: Option<&Path>) -> Settings {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(path) = explicit {
        candidates.push(path.to_path_buf());
    }
    if let Ok(path) = std::env::var("TENGEN_CONFIG") {
        candidates.push(PathBuf::from(path));
    }
    candidates.extend(CONFIG_SEARCH_PATHS.iter().map(PathBuf::from));

    let mut settings = Settings::default();
    for path in candidates {
        if !path.exists() {
            continue;
        }
        settings = load_from_path(&path);
        break;
    }
    apply_env_overrides(settings)
}

fn load_from_path(path: &Path) -> Settings {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "config parse failed, using defaults");
                Settings::default()
            }
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "config read failed, using defaults");
            Settings::default()
        }
    }
}

fn apply_env_overrides(mut settings: Settings) -> Settings {
    env_override!(settings, search.n_sims, "TENGEN_SEARCH_N_SIMS", parse);
    env_override!(settings, search.expand_visits, "TENGEN_SEARCH_EXPAND_VISITS", parse);
    env_override!(settings, search.resign_threshold, "TENGEN_SEARCH_RESIGN_THRESHOLD", parse);
    env_override!(settings, patterns.prob_file, "TENGEN_PATTERNS_PROB_FILE");
    env_override!(settings, patterns.spat_file, "TENGEN_PATTERNS_SPAT_FILE");
    env_override!(settings, log.file, "TENGEN_LOG_FILE");
    env_override!(settings, log.level, "TENGEN_LOG_LEVEL");
    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.search.n_sims, 1400);
        assert_eq!(settings.patterns.prob_file, PathBuf::from("patterns.prob"));
        assert_eq!(settings.log.level, "info");
    }

    #[test]
    fn test_parse_partial_file() {
        let settings: Settings = toml::from_str(
            "[search]\nn_sims = 500\n\n[log]\nlevel = \"debug\"\n",
        )
        .unwrap();
        assert_eq!(settings.search.n_sims, 500);
        assert_eq!(settings.search.expand_visits, 8);
        assert_eq!(settings.log.level, "debug");
    }

    #[test]
    fn test_env_override_parses_numbers() {
        std::env::set_var("TENGEN_SEARCH_N_SIMS", "321");
        let settings = apply_env_overrides(Settings::default());
        assert_eq!(settings.search.n_sims, 321);
        std::env::remove_var("TENGEN_SEARCH_N_SIMS");
    }
}
