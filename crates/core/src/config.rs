use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

/// Parse a profiled env var, falling back to `default` when unset or malformed.
fn profiled_env_parse<T: std::str::FromStr>(profile: &str, key: &str, default: T) -> T {
    profiled_env_opt(profile, key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn profiled_env_parse_opt<T: std::str::FromStr>(profile: &str, key: &str) -> Option<T> {
    profiled_env_opt(profile, key).and_then(|v| v.trim().parse().ok())
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub llm: LlmConfig,
    pub ollama: OllamaConfig,
    pub segmentation: SegmentationConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `COHORT_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("COHORT_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            llm: LlmConfig::from_env_profiled(p),
            ollama: OllamaConfig::from_env_profiled(p),
            segmentation: SegmentationConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        let seg = &self.segmentation;
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  llm:          provider={}, configured={}, timeout={}s",
            self.llm.provider,
            self.llm.is_configured(),
            self.llm.timeout_secs
        );
        tracing::info!("  ollama:       url={}, model={}", self.ollama.url, self.ollama.model);
        tracing::info!(
            "  segmentation: algorithm={}, k={}, eps={}, min_pts={}, seed={}",
            seg.algorithm,
            seg.k,
            seg.eps,
            seg.min_pts,
            seg.seed.map(|s| s.to_string()).as_deref().unwrap_or("(entropy)")
        );
    }
}

// ── LLM (OpenAI-compatible) ──────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "openai" or "ollama"
    pub provider: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// HTTP timeout applied to every completion request.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            openai_base_url: None,
            temperature: 0.3,
            max_tokens: 512,
            timeout_secs: 15,
        }
    }
}

impl LlmConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            provider: profiled_env_or(p, "LLM_PROVIDER", &d.provider),
            openai_api_key: profiled_env_opt(p, "OPENAI_API_KEY"),
            openai_model: profiled_env_or(p, "OPENAI_MODEL", &d.openai_model),
            openai_base_url: profiled_env_opt(p, "OPENAI_BASE_URL"),
            temperature: profiled_env_parse(p, "LLM_TEMPERATURE", d.temperature),
            max_tokens: profiled_env_parse(p, "LLM_MAX_TOKENS", d.max_tokens),
            timeout_secs: profiled_env_parse(p, "LLM_TIMEOUT_SECS", d.timeout_secs),
        }
    }

    pub fn is_configured(&self) -> bool {
        match self.provider.as_str() {
            "openai" => self.openai_api_key.is_some(),
            "ollama" => true,
            _ => false,
        }
    }
}

// ── Ollama (local models) ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub url: String,
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
        }
    }
}

impl OllamaConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            url: profiled_env_or(p, "OLLAMA_URL", &d.url),
            model: profiled_env_or(p, "OLLAMA_MODEL", &d.model),
        }
    }
}

// ── Segmentation engine ───────────────────────────────────────

/// Which clustering algorithm a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmChoice {
    Kmeans,
    Dbscan,
    /// Run both and keep the higher silhouette.
    Auto,
}

impl std::fmt::Display for AlgorithmChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlgorithmChoice::Kmeans => write!(f, "kmeans"),
            AlgorithmChoice::Dbscan => write!(f, "dbscan"),
            AlgorithmChoice::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for AlgorithmChoice {
    type Err = crate::customer::UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kmeans" | "k-means" => Ok(AlgorithmChoice::Kmeans),
            "dbscan" => Ok(AlgorithmChoice::Dbscan),
            "auto" => Ok(AlgorithmChoice::Auto),
            other => Err(crate::customer::UnknownVariant {
                kind: "algorithm",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationConfig {
    pub algorithm: AlgorithmChoice,
    /// K-Means cluster count.
    pub k: usize,
    pub max_iterations: usize,
    /// Fixed seed for centroid initialization; `None` draws from entropy.
    pub seed: Option<u64>,
    /// Independent K-Means restarts; the best silhouette wins.
    pub kmeans_trials: usize,
    /// DBSCAN neighbourhood radius.
    pub eps: f64,
    /// DBSCAN density threshold (neighbourhood includes the point itself).
    pub min_pts: usize,
    /// Clusters smaller than this are not analysed for patterns.
    pub min_cluster_size: usize,
    /// Suggestions below this confidence are dropped after ranking.
    pub min_confidence: f64,
    pub max_suggestions: usize,
    /// Upper bound on a single copy-writer call.
    pub copy_timeout_secs: u64,
    /// Optional deadline wrapping the whole run.
    pub run_deadline_secs: Option<u64>,
    pub business_goals: Vec<String>,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            algorithm: AlgorithmChoice::Auto,
            k: 5,
            max_iterations: 100,
            seed: None,
            kmeans_trials: 1,
            eps: 0.5,
            min_pts: 5,
            min_cluster_size: 5,
            min_confidence: 0.0,
            max_suggestions: 20,
            copy_timeout_secs: 10,
            run_deadline_secs: None,
            business_goals: Vec::new(),
        }
    }
}

impl SegmentationConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            algorithm: profiled_env_parse(p, "SEGMENT_ALGORITHM", d.algorithm),
            k: profiled_env_parse(p, "SEGMENT_K", d.k),
            max_iterations: profiled_env_parse(p, "SEGMENT_MAX_ITERATIONS", d.max_iterations),
            seed: profiled_env_parse_opt(p, "SEGMENT_SEED"),
            kmeans_trials: profiled_env_parse(p, "SEGMENT_KMEANS_TRIALS", d.kmeans_trials),
            eps: profiled_env_parse(p, "SEGMENT_EPS", d.eps),
            min_pts: profiled_env_parse(p, "SEGMENT_MIN_PTS", d.min_pts),
            min_cluster_size: profiled_env_parse(p, "SEGMENT_MIN_CLUSTER_SIZE", d.min_cluster_size),
            min_confidence: profiled_env_parse(p, "SEGMENT_MIN_CONFIDENCE", d.min_confidence),
            max_suggestions: profiled_env_parse(p, "SEGMENT_MAX_SUGGESTIONS", d.max_suggestions),
            copy_timeout_secs: profiled_env_parse(p, "SEGMENT_COPY_TIMEOUT_SECS", d.copy_timeout_secs),
            run_deadline_secs: profiled_env_parse_opt(p, "SEGMENT_RUN_DEADLINE_SECS"),
            business_goals: profiled_env_opt(p, "SEGMENT_BUSINESS_GOALS")
                .map(|v| parse_list(&v))
                .unwrap_or_default(),
        }
    }
}

/// Split a comma-separated list, dropping empty entries.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
