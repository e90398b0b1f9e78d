use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub entities: EntitiesConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
}

/// Top-level engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    /// Root directory of `.txt` documents to index.
    pub corpus_dir: PathBuf,
    pub db_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Entity validation/matching configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EntitiesConfig {
    /// Minimum Entity Validator confidence to keep a raw NER span (§4.2).
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
    /// Entity Matcher fuzzy-match similarity threshold (§4.3).
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f32,
    /// Bound on the substring-scan query-extraction tier, per entity type (§4.8).
    #[serde(default = "default_scan_cap")]
    pub scan_cap: usize,
}

impl Default for EntitiesConfig {
    fn default() -> Self {
        EntitiesConfig {
            min_confidence: default_min_confidence(),
            fuzzy_threshold: default_fuzzy_threshold(),
            scan_cap: default_scan_cap(),
        }
    }
}

fn default_min_confidence() -> f32 {
    0.5
}

fn default_fuzzy_threshold() -> f32 {
    0.85
}

fn default_scan_cap() -> usize {
    2000
}

/// Search/scoring configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
    #[serde(default = "default_min_candidates")]
    pub min_candidates: usize,
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    #[serde(default = "default_weight_person")]
    pub weight_person: f32,
    #[serde(default = "default_weight_location")]
    pub weight_location: f32,
    #[serde(default = "default_weight_org")]
    pub weight_org: f32,
    #[serde(default = "default_weight_date")]
    pub weight_date: f32,
    #[serde(default = "default_bm25_k1")]
    pub bm25_k1: f32,
    #[serde(default = "default_bm25_b")]
    pub bm25_b: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            default_top_k: default_top_k(),
            min_candidates: default_min_candidates(),
            max_candidates: default_max_candidates(),
            weight_person: default_weight_person(),
            weight_location: default_weight_location(),
            weight_org: default_weight_org(),
            weight_date: default_weight_date(),
            bm25_k1: default_bm25_k1(),
            bm25_b: default_bm25_b(),
        }
    }
}

fn default_top_k() -> usize {
    10
}
fn default_min_candidates() -> usize {
    50
}
fn default_max_candidates() -> usize {
    100
}
fn default_weight_person() -> f32 {
    2.0
}
fn default_weight_location() -> f32 {
    1.5
}
fn default_weight_org() -> f32 {
    1.5
}
fn default_weight_date() -> f32 {
    1.0
}
fn default_bm25_k1() -> f32 {
    1.5
}
fn default_bm25_b() -> f32 {
    0.75
}

/// Performance tuning configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PerformanceConfig {
    #[serde(default = "default_max_latency_ms")]
    pub max_latency_ms: u64,
    /// NER is only run on the first N characters of a document (§4.5).
    #[serde(default = "default_ner_char_bound")]
    pub ner_char_bound: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        PerformanceConfig {
            max_latency_ms: default_max_latency_ms(),
            ner_char_bound: default_ner_char_bound(),
        }
    }
}

fn default_max_latency_ms() -> u64 {
    200
}

fn default_ner_char_bound() -> usize {
    100_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in the `CASEFILE_CONFIG` environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        let _ = dotenv::dotenv();

        let config_path = std::env::var("CASEFILE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config =
            toml::from_str(&config_str).context("Failed to parse config.toml")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if !self.retrieval.corpus_dir.exists() {
            anyhow::bail!(
                "corpus_dir path does not exist: {}. Set retrieval.corpus_dir in config.toml to your documents directory.",
                self.retrieval.corpus_dir.display()
            );
        }

        if !self.retrieval.corpus_dir.is_dir() {
            anyhow::bail!(
                "corpus_dir must be a directory, not a file: {}",
                self.retrieval.corpus_dir.display()
            );
        }

        if self.search.default_top_k == 0 {
            anyhow::bail!("search.default_top_k must be greater than 0");
        }

        if self.search.min_candidates > self.search.max_candidates {
            anyhow::bail!(
                "search.min_candidates must be <= search.max_candidates"
            );
        }

        if self.entities.fuzzy_threshold < 0.0 || self.entities.fuzzy_threshold > 1.0 {
            anyhow::bail!("entities.fuzzy_threshold must be between 0.0 and 1.0");
        }

        if self.search.bm25_b < 0.0 || self.search.bm25_b > 1.0 {
            anyhow::bail!("search.bm25_b must be between 0.0 and 1.0");
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.retrieval.db_path
    }

    /// Get the corpus root path (corpus_dir from config.toml)
    pub fn corpus_dir(&self) -> &Path {
        &self.retrieval.corpus_dir
    }
}
