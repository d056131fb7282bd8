use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::graph::GraphOptions;
use crate::project::test_matcher::TestPattern;
use crate::query::cross_project::CrossProjectStrategy;

pub const CONFIG_FILE: &str = "affected-graph.toml";

/// Test globs used by projects that configure neither `test_match` nor `test_regex`.
pub const DEFAULT_TEST_GLOBS: &[&str] = &[
    "**/*.test.*",
    "**/*.spec.*",
    "**/__tests__/**",
];

/// Configuration loaded from `affected-graph.toml` at the workspace root.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AffectedConfig {
    /// Additional path patterns to exclude from every project (beyond .gitignore and node_modules).
    pub exclude: Option<Vec<String>>,
    /// Explicit project list. When empty, projects are discovered from the workspace manifest.
    #[serde(default)]
    pub projects: Vec<ProjectConfig>,
    #[serde(default)]
    pub graph: GraphConfig,
}

/// One `[[projects]]` entry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Project root, relative to the workspace root.
    pub root: PathBuf,
    pub test_match: Option<Vec<String>>,
    pub test_regex: Option<Vec<String>>,
}

/// The `[graph]` table.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct GraphConfig {
    pub link_package_imports: Option<bool>,
    pub cross_project_strategy: Option<CrossProjectStrategy>,
}

impl AffectedConfig {
    /// Load configuration from `affected-graph.toml` in the given root directory.
    ///
    /// Returns a default (empty) configuration if the file does not exist or cannot be parsed.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    warn!(
                        path = %config_path.display(),
                        %err,
                        "failed to parse config; using defaults"
                    );
                    Self::default()
                }
            },
            Err(err) => {
                warn!(path = %config_path.display(), %err, "failed to read config; using defaults");
                Self::default()
            }
        }
    }

    pub fn exclude(&self) -> &[String] {
        self.exclude.as_deref().unwrap_or_default()
    }

    pub fn graph_options(&self) -> GraphOptions {
        let defaults = GraphOptions::default();
        GraphOptions {
            link_package_imports: self
                .graph
                .link_package_imports
                .unwrap_or(defaults.link_package_imports),
            cross_project_strategy: self
                .graph
                .cross_project_strategy
                .unwrap_or(defaults.cross_project_strategy),
        }
    }
}

impl ProjectConfig {
    /// The project's test classifier. Globs win when both kinds are configured.
    pub fn test_pattern(&self) -> TestPattern {
        match (&self.test_match, &self.test_regex) {
            (Some(globs), Some(_)) => {
                warn!(
                    root = %self.root.display(),
                    "test_match and test_regex are exclusive; using test_match"
                );
                TestPattern::Glob(globs.clone())
            }
            (Some(globs), None) => TestPattern::Glob(globs.clone()),
            (None, Some(regexes)) => TestPattern::Regex(regexes.clone()),
            (None, None) => default_test_pattern(),
        }
    }
}

pub fn default_test_pattern() -> TestPattern {
    TestPattern::Glob(DEFAULT_TEST_GLOBS.iter().map(|g| (*g).to_owned()).collect())
}
