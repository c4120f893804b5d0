// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use crate::error::{ClassnetError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Classnet analysis configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub centrality: CentralityConfig,
    #[serde(default)]
    pub community: CommunityConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub synthetic: SyntheticConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExtractionConfig {
    /// Characters separating several names in one answer cell
    #[serde(default = "default_delimiters")]
    pub delimiters: Vec<char>,

    /// Add students who are named in answers but never responded
    #[serde(default)]
    pub include_unlisted_targets: bool,

    /// Upper bound on a merged edge weight (None = unbounded)
    #[serde(default)]
    pub max_edge_weight: Option<u32>,

    /// Fall back to generated data when no table can be obtained
    #[serde(default = "default_true")]
    pub synthetic_fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CentralityConfig {
    /// Power iteration cap for eigenvector centrality
    #[serde(default = "default_eigenvector_max_iter")]
    pub eigenvector_max_iter: usize,

    /// Per-node convergence tolerance for eigenvector centrality
    #[serde(default = "default_eigenvector_tolerance")]
    pub eigenvector_tolerance: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CommunityConfig {
    /// Resolution parameter (higher = more, smaller communities)
    #[serde(default = "default_resolution")]
    pub resolution: f64,

    /// Maximum local-moving/aggregation passes
    #[serde(default = "default_max_passes")]
    pub max_passes: usize,

    /// Minimum modularity improvement to start another pass
    #[serde(default = "default_min_improvement")]
    pub min_improvement: f64,

    /// Random seed for node visiting order
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnalyticsConfig {
    /// Fraction of the maximum in-degree below which a student is flagged
    #[serde(default = "default_isolation_threshold")]
    pub isolation_threshold: f64,

    /// Normalized score above which a measure counts as "high"
    #[serde(default = "default_high_threshold")]
    pub high_threshold: f64,

    /// Normalized score above which a measure counts as "moderate"
    #[serde(default = "default_moderate_threshold")]
    pub moderate_threshold: f64,

    /// How many top students the textual summary names per metric
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FetchConfig {
    /// Attempts per request, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Linear backoff step in milliseconds
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SyntheticConfig {
    /// Roster size used when no survey table is available at all
    #[serde(default = "default_synthetic_nodes")]
    pub nodes: usize,

    #[serde(default)]
    pub seed: Option<u64>,
}

// Default values
fn default_delimiters() -> Vec<char> {
    vec![',', ';', '/', '\n']
}

fn default_true() -> bool {
    true
}

fn default_eigenvector_max_iter() -> usize {
    1000
}

fn default_eigenvector_tolerance() -> f64 {
    1.0e-6
}

fn default_resolution() -> f64 {
    1.0
}

fn default_max_passes() -> usize {
    100
}

fn default_min_improvement() -> f64 {
    1.0e-7
}

fn default_isolation_threshold() -> f64 {
    0.1
}

fn default_high_threshold() -> f64 {
    0.7
}

fn default_moderate_threshold() -> f64 {
    0.3
}

fn default_top_n() -> usize {
    3
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_synthetic_nodes() -> usize {
    10
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            delimiters: default_delimiters(),
            include_unlisted_targets: false,
            max_edge_weight: None,
            synthetic_fallback: default_true(),
        }
    }
}

impl Default for CentralityConfig {
    fn default() -> Self {
        Self {
            eigenvector_max_iter: default_eigenvector_max_iter(),
            eigenvector_tolerance: default_eigenvector_tolerance(),
        }
    }
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            max_passes: default_max_passes(),
            min_improvement: default_min_improvement(),
            seed: None,
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            isolation_threshold: default_isolation_threshold(),
            high_threshold: default_high_threshold(),
            moderate_threshold: default_moderate_threshold(),
            top_n: default_top_n(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            nodes: default_synthetic_nodes(),
            seed: None,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AnalysisConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - CLASSNET_ISOLATION_THRESHOLD: low in-degree flag threshold (default: 0.1)
    /// - CLASSNET_COMMUNITY_SEED: Louvain random seed
    /// - CLASSNET_COMMUNITY_RESOLUTION: Louvain resolution (default: 1.0)
    /// - CLASSNET_EIGENVECTOR_MAX_ITER: eigenvector iteration cap (default: 1000)
    /// - CLASSNET_MAX_EDGE_WEIGHT: cap on merged edge weights (default: none)
    /// - CLASSNET_FETCH_ATTEMPTS: fetch attempts (default: 3)
    /// - CLASSNET_FETCH_BACKOFF_MS: linear backoff step (default: 1000)
    /// - CLASSNET_SYNTHETIC_FALLBACK: generate stand-in data when input is missing (default: true)
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Load configuration with priority: env > file > defaults
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        let mut config = if let Some(path) = config_file {
            if path.exists() {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(&path)?
            } else {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                Self::default()
            }
        } else {
            Self::default()
        };

        // Only variables that are actually set override the file
        config.apply_env();
        config.validate()?;

        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Some(val) = env_parse("CLASSNET_ISOLATION_THRESHOLD") {
            self.analytics.isolation_threshold = val;
        }
        if let Some(val) = env_parse("CLASSNET_COMMUNITY_SEED") {
            self.community.seed = Some(val);
        }
        if let Some(val) = env_parse("CLASSNET_COMMUNITY_RESOLUTION") {
            self.community.resolution = val;
        }
        if let Some(val) = env_parse("CLASSNET_EIGENVECTOR_MAX_ITER") {
            self.centrality.eigenvector_max_iter = val;
        }
        if let Some(val) = env_parse("CLASSNET_MAX_EDGE_WEIGHT") {
            self.extraction.max_edge_weight = Some(val);
        }
        if let Some(val) = env_parse("CLASSNET_FETCH_ATTEMPTS") {
            self.fetch.max_attempts = val;
        }
        if let Some(val) = env_parse("CLASSNET_FETCH_BACKOFF_MS") {
            self.fetch.backoff_ms = val;
        }
        if let Some(val) = env_parse("CLASSNET_SYNTHETIC_FALLBACK") {
            self.extraction.synthetic_fallback = val;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.extraction.delimiters.is_empty() {
            return Err(ClassnetError::Config(
                "at least one answer delimiter is required".to_string(),
            ));
        }
        if self.extraction.max_edge_weight == Some(0) {
            return Err(ClassnetError::Config(
                "max_edge_weight must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.analytics.isolation_threshold) {
            return Err(ClassnetError::Config(format!(
                "isolation_threshold must be within [0, 1], got {}",
                self.analytics.isolation_threshold
            )));
        }
        if self.analytics.moderate_threshold > self.analytics.high_threshold {
            return Err(ClassnetError::Config(
                "moderate_threshold must not exceed high_threshold".to_string(),
            ));
        }
        if self.community.resolution <= 0.0 {
            return Err(ClassnetError::Config(
                "community resolution must be positive".to_string(),
            ));
        }
        if self.centrality.eigenvector_max_iter == 0 {
            return Err(ClassnetError::Config(
                "eigenvector_max_iter must be at least 1".to_string(),
            ));
        }
        if self.fetch.max_attempts == 0 {
            return Err(ClassnetError::Config(
                "fetch max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(val) => Some(val),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.extraction.delimiters, vec![',', ';', '/', '\n']);
        assert_eq!(config.centrality.eigenvector_max_iter, 1000);
        assert_eq!(config.analytics.isolation_threshold, 0.1);
        assert_eq!(config.fetch.max_attempts, 3);
        assert!(config.extraction.synthetic_fallback);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[community]\nseed = 42\n\n[extraction]\nmax_edge_weight = 5\n"
        )
        .unwrap();

        let config = AnalysisConfig::from_file(file.path()).unwrap();
        assert_eq!(config.community.seed, Some(42));
        assert_eq!(config.community.resolution, 1.0);
        assert_eq!(config.extraction.max_edge_weight, Some(5));
        assert_eq!(config.extraction.delimiters.len(), 4);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[community\nseed = ").unwrap();

        let err = AnalysisConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ClassnetError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_zero_weight_cap() {
        let mut config = AnalysisConfig::default();
        config.extraction.max_edge_weight = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("CLASSNET_FETCH_ATTEMPTS", "5");
        std::env::set_var("CLASSNET_COMMUNITY_SEED", "not-a-number");

        let config = AnalysisConfig::from_env();
        assert_eq!(config.fetch.max_attempts, 5);
        assert_eq!(config.community.seed, None);

        std::env::remove_var("CLASSNET_FETCH_ATTEMPTS");
        std::env::remove_var("CLASSNET_COMMUNITY_SEED");
    }
}
