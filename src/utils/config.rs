// src/utils/config.rs - Environment-driven configuration for the reconciliation job
use log::{info, warn};
use std::time::Duration;

use crate::utils::env::env_or;

/// Connection settings for the AI ranking backend (an Ollama server).
#[derive(Debug, Clone, PartialEq)]
pub struct RankerConfig {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    /// Tried in order by the connection test when `model` does not answer.
    pub fallback_models: Vec<String>,
    pub request_timeout: Duration,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.1".to_string(),
            fallback_models: Vec::new(),
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl RankerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_or("RANKER_ENABLED", defaults.enabled),
            base_url: std::env::var("OLLAMA_URL").unwrap_or(defaults.base_url),
            model: std::env::var("OLLAMA_MODEL").unwrap_or(defaults.model),
            fallback_models: std::env::var("OLLAMA_FALLBACK_MODELS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            request_timeout: Duration::from_secs(env_or("RANKER_TIMEOUT_SECONDS", 120u64)),
        }
    }

    pub fn log_config(&self) {
        if self.enabled {
            info!("🤖 AI ranking ENABLED");
            info!("   Ollama URL: {}", self.base_url);
            info!("   Model: {}", self.model);
            if !self.fallback_models.is_empty() {
                info!("   Fallback models: {:?}", self.fallback_models);
            }
            info!("   Request timeout: {}s", self.request_timeout.as_secs());
        } else {
            warn!("🤖 AI ranking DISABLED - similarity scores are final");
        }
    }
}

/// Refinement policy: how many candidates go to the ranker, how many
/// failures are tolerated, and how long to pause between calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RefinerConfig {
    pub top_n: usize,
    /// The breaker trips once the error count exceeds this value.
    pub max_errors: usize,
    pub min_call_delay: Duration,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            top_n: 3,
            max_errors: 3,
            min_call_delay: Duration::from_millis(500),
        }
    }
}

impl RefinerConfig {
    pub fn from_env() -> Self {
        Self {
            top_n: env_or("REFINER_TOP_N", 3usize).max(1),
            max_errors: env_or("REFINER_MAX_ERRORS", 3usize),
            min_call_delay: Duration::from_millis(env_or("REFINER_MIN_CALL_DELAY_MS", 500u64)),
        }
    }

    pub fn log_config(&self) {
        info!(
            "🔁 Refiner: top {} candidates per record, breaker after {} errors, {}ms between calls",
            self.top_n,
            self.max_errors + 1,
            self.min_call_delay.as_millis()
        );
    }
}

/// Scoring worker pool size.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    pub workers: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
        }
    }
}

impl MatchConfig {
    pub fn from_env() -> Self {
        Self {
            workers: env_or("MATCH_WORKERS", num_cpus::get()).max(1),
        }
    }
}

/// Progress display and polling cadence.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressConfig {
    /// Whether the CLI draws a progress bar
    pub enabled: bool,
    pub poll_interval: Duration,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl ProgressConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: env_or("PROGRESS_ENABLED", true),
            poll_interval: Duration::from_millis(env_or("PROGRESS_POLL_INTERVAL_MS", 500u64).max(1)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    pub ranker: RankerConfig,
    pub refiner: RefinerConfig,
    pub matching: MatchConfig,
    pub progress: ProgressConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            ranker: RankerConfig::from_env(),
            refiner: RefinerConfig::from_env(),
            matching: MatchConfig::from_env(),
            progress: ProgressConfig::from_env(),
        }
    }

    pub fn log_config(&self) {
        self.ranker.log_config();
        if self.ranker.enabled {
            self.refiner.log_config();
        }
        info!("🧮 Scoring workers: {}", self.matching.workers);
        info!(
            "📊 Progress: bar={}, poll every {}ms",
            self.progress.enabled,
            self.progress.poll_interval.as_millis()
        );
    }
}
