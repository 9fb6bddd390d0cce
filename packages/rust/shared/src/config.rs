//! Application configuration for coalwire.
//!
//! User config lives at `~/.coalwire/coalwire.toml`.
//! CLI flags override config file values, which override defaults.
//! Secrets never live in the file — the config names the env vars that hold them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoalwireError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "coalwire.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".coalwire";

// ---------------------------------------------------------------------------
// Config structs (matching coalwire.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Local database and paths.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Messaging channel delivery settings.
    #[serde(default)]
    pub channel: ChannelConfig,

    /// Document-store-of-truth settings.
    #[serde(default)]
    pub docstore: DocStoreConfig,

    /// Generative search / content generation settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Static site output + git publishing.
    #[serde(default)]
    pub site: SiteConfig,

    /// Candidate scoring weights and keyword lists.
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Filler-content cadence.
    #[serde(default)]
    pub cadence: CadenceConfig,
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the local database file. `~` is not expanded; pass absolute
    /// paths or rely on the default under the config directory.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "~/.coalwire/coalwire.db".into()
}

/// `[channel]` section — Telegram-style bot API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Name of the env var holding the bot token (never the token itself).
    #[serde(default = "default_bot_token_env")]
    pub bot_token_env: String,

    /// Target channel chat id (e.g. `@coalwire` or a numeric id).
    #[serde(default)]
    pub chat_id: String,

    /// Optional admin chat for per-cycle status summaries.
    #[serde(default)]
    pub admin_chat_id: Option<String>,

    /// API base URL. Overridable for testing.
    #[serde(default = "default_channel_base_url")]
    pub base_url: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            bot_token_env: default_bot_token_env(),
            chat_id: String::new(),
            admin_chat_id: None,
            base_url: default_channel_base_url(),
        }
    }
}

fn default_bot_token_env() -> String {
    "COALWIRE_BOT_TOKEN".into()
}
fn default_channel_base_url() -> String {
    "https://api.telegram.org".into()
}

/// `[docstore]` section — Notion-style records API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocStoreConfig {
    /// Name of the env var holding the integration token.
    #[serde(default = "default_docstore_token_env")]
    pub token_env: String,

    /// Target database/collection id.
    #[serde(default)]
    pub database_id: String,

    /// API base URL. Overridable for testing.
    #[serde(default = "default_docstore_base_url")]
    pub base_url: String,

    /// API version header value.
    #[serde(default = "default_docstore_version")]
    pub api_version: String,
}

impl Default for DocStoreConfig {
    fn default() -> Self {
        Self {
            token_env: default_docstore_token_env(),
            database_id: String::new(),
            base_url: default_docstore_base_url(),
            api_version: default_docstore_version(),
        }
    }
}

fn default_docstore_token_env() -> String {
    "COALWIRE_DOCSTORE_TOKEN".into()
}
fn default_docstore_base_url() -> String {
    "https://api.notion.com".into()
}
fn default_docstore_version() -> String {
    "2022-06-28".into()
}

/// `[search]` section — generative search + content generation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Name of the env var holding the API key.
    #[serde(default = "default_search_api_key_env")]
    pub api_key_env: String,

    /// Chat-completions-style base URL. Overridable for testing.
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// Model used for discovery and rendering.
    #[serde(default = "default_search_model")]
    pub model: String,

    /// Per-request timeout. Discovery calls are slow by nature.
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,

    /// Bounded retry attempts for transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_search_api_key_env(),
            base_url: default_search_base_url(),
            model: default_search_model(),
            timeout_secs: default_search_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_search_api_key_env() -> String {
    "COALWIRE_SEARCH_API_KEY".into()
}
fn default_search_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}
fn default_search_model() -> String {
    "gemini-2.0-flash".into()
}
fn default_search_timeout_secs() -> u64 {
    90
}
fn default_max_retries() -> u32 {
    3
}

/// `[site]` section — reconciler output and git publishing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Checkout of the static site repository.
    #[serde(default = "default_site_repo")]
    pub repo_path: String,

    /// Directory under the repo where article pages land.
    #[serde(default = "default_site_out_dir")]
    pub out_dir: String,

    /// Public base URL used in the sitemap and feed.
    #[serde(default = "default_site_base_url")]
    pub base_url: String,

    /// Trailing reconcile window in days.
    #[serde(default = "default_window_days")]
    pub window_days: i64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            repo_path: default_site_repo(),
            out_dir: default_site_out_dir(),
            base_url: default_site_base_url(),
            window_days: default_window_days(),
        }
    }
}

fn default_site_repo() -> String {
    "~/coalwire-site".into()
}
fn default_site_out_dir() -> String {
    "news".into()
}
fn default_site_base_url() -> String {
    "https://coalwire.example.org".into()
}
fn default_window_days() -> i64 {
    30
}

/// `[scoring]` section.
///
/// The weights are hand-tuned constants with no derivation; they live in
/// config so operators can adjust them without a rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Minimum summary length for a candidate to be considered at all.
    #[serde(default = "default_min_summary_len")]
    pub min_summary_len: usize,

    /// At least one of these must appear for a candidate to be domain-relevant.
    #[serde(default = "default_domain_keywords")]
    pub domain_keywords: Vec<String>,

    /// Off-topic markers. Rejecting unless a domain keyword is also present.
    #[serde(default = "default_irrelevant_markers")]
    pub irrelevant_markers: Vec<String>,

    /// Genericity markers. Two or more with zero numerals rejects the item.
    #[serde(default = "default_vague_phrases")]
    pub vague_phrases: Vec<String>,

    /// Keywords counted for the density bonus.
    #[serde(default = "default_priority_keywords")]
    pub priority_keywords: Vec<String>,

    /// Forecast-language markers for the outlook bonus.
    #[serde(default = "default_outlook_keywords")]
    pub outlook_keywords: Vec<String>,

    /// Substring allow-list of reputable outlets (matched on name or URL).
    #[serde(default = "default_premium_sources")]
    pub premium_sources: Vec<String>,

    /// Same-day publication bonus.
    #[serde(default = "default_recency_same_day")]
    pub recency_same_day: i64,

    /// Any-known-date bonus.
    #[serde(default = "default_recency_dated")]
    pub recency_dated: i64,

    /// Per-distinct-keyword bonus.
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: i64,

    /// Flat outlook bonus.
    #[serde(default = "default_outlook_bonus")]
    pub outlook_bonus: i64,

    /// Allow-listed source bonus.
    #[serde(default = "default_premium_bonus")]
    pub premium_bonus: i64,

    /// Bonus for carrying a source URL.
    #[serde(default = "default_url_bonus")]
    pub url_bonus: i64,

    /// Target summary length band for the length bonus.
    #[serde(default = "default_length_band_min")]
    pub length_band_min: usize,
    #[serde(default = "default_length_band_max")]
    pub length_band_max: usize,

    /// Cap on the length bonus.
    #[serde(default = "default_length_bonus_cap")]
    pub length_bonus_cap: i64,

    /// Per-numeral bonus and its cap.
    #[serde(default = "default_numeral_weight")]
    pub numeral_weight: i64,
    #[serde(default = "default_numeral_bonus_cap")]
    pub numeral_bonus_cap: i64,

    /// Penalty applied when vague phrases dominate a numberless item.
    #[serde(default = "default_vague_penalty")]
    pub vague_penalty: i64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_summary_len: default_min_summary_len(),
            domain_keywords: default_domain_keywords(),
            irrelevant_markers: default_irrelevant_markers(),
            vague_phrases: default_vague_phrases(),
            priority_keywords: default_priority_keywords(),
            outlook_keywords: default_outlook_keywords(),
            premium_sources: default_premium_sources(),
            recency_same_day: default_recency_same_day(),
            recency_dated: default_recency_dated(),
            keyword_weight: default_keyword_weight(),
            outlook_bonus: default_outlook_bonus(),
            premium_bonus: default_premium_bonus(),
            url_bonus: default_url_bonus(),
            length_band_min: default_length_band_min(),
            length_band_max: default_length_band_max(),
            length_bonus_cap: default_length_bonus_cap(),
            numeral_weight: default_numeral_weight(),
            numeral_bonus_cap: default_numeral_bonus_cap(),
            vague_penalty: default_vague_penalty(),
        }
    }
}

fn default_min_summary_len() -> usize {
    100
}
fn default_domain_keywords() -> Vec<String> {
    strings(&["coal", "thermal", "coking", "steam", "anthracite", "bituminous"])
}
fn default_irrelevant_markers() -> Vec<String> {
    strings(&[
        "trump",
        "election",
        "president",
        "general market",
        "all commodities",
    ])
}
fn default_vague_phrases() -> Vec<String> {
    strings(&[
        "limited activity",
        "no significant",
        "not mentioned",
        "under observation",
        "paused",
        "minimal",
        "general",
        "expected",
        "likely",
        "potential",
    ])
}
fn default_priority_keywords() -> Vec<String> {
    strings(&[
        "price",
        "prices",
        "export",
        "import",
        "demand",
        "supply",
        "record",
        "surge",
        "rise",
        "fall",
        "policy",
        "regulation",
        "mining",
        "production",
        "freight",
        "shipping",
        "trade",
        "china",
        "india",
        "australia",
        "indonesia",
        "europe",
        "thermal coal",
        "coking coal",
        "benchmark",
        "index",
    ])
}
fn default_outlook_keywords() -> Vec<String> {
    strings(&[
        "outlook",
        "forecast",
        "prediction",
        "expect",
        "projection",
        "trend",
    ])
}
fn default_premium_sources() -> Vec<String> {
    strings(&[
        "reuters",
        "bloomberg",
        "financial times",
        "ft.com",
        "argus",
        "platts",
        "spglobal",
        "s&p global",
    ])
}
fn default_recency_same_day() -> i64 {
    100
}
fn default_recency_dated() -> i64 {
    50
}
fn default_keyword_weight() -> i64 {
    10
}
fn default_outlook_bonus() -> i64 {
    10
}
fn default_premium_bonus() -> i64 {
    50
}
fn default_url_bonus() -> i64 {
    30
}
fn default_length_band_min() -> usize {
    100
}
fn default_length_band_max() -> usize {
    500
}
fn default_length_bonus_cap() -> i64 {
    30
}
fn default_numeral_weight() -> i64 {
    5
}
fn default_numeral_bonus_cap() -> i64 {
    50
}
fn default_vague_penalty() -> i64 {
    30
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// `[cadence]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CadenceConfig {
    /// Every Nth regular post triggers a filler cycle.
    #[serde(default = "default_cadence_interval")]
    pub interval: u64,

    /// Pool of filler topics drawn from uniformly.
    #[serde(default = "default_topic_pool")]
    pub topic_pool: Vec<String>,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            interval: default_cadence_interval(),
            topic_pool: default_topic_pool(),
        }
    }
}

fn default_cadence_interval() -> u64 {
    6
}
fn default_topic_pool() -> Vec<String> {
    strings(&[
        "freight rate volatility and market unpredictability",
        "vessel availability shortages during peak seasons",
        "port congestion and queuing delays",
        "route optimization challenges and longer transit times",
        "seasonal disruptions (monsoons, ice, storms)",
        "geopolitical risks affecting shipping lanes",
        "fuel cost fluctuations impacting freight rates",
        "charter market tightness and vessel scarcity",
        "demurrage and detention cost escalation",
        "multi-port discharge complexity and delays",
        "weather-related port closures",
        "infrastructure bottlenecks at key terminals",
        "crew shortage and vessel operational issues",
        "regulatory compliance delays at ports",
        "cargo handling equipment failures",
    ])
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.coalwire/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CoalwireError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Expand a leading `~/` to the home directory.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Get the path to the config file (`~/.coalwire/coalwire.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CoalwireError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| CoalwireError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CoalwireError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CoalwireError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CoalwireError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read a credential env var named in config. Empty or unset is a config error:
/// fatal for the cycle, surfaced before any platform is attempted.
pub fn credential(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(CoalwireError::config(format!(
            "credential not found: set the {var_name} environment variable"
        ))),
    }
}

/// Check that every credential a publish cycle needs is present.
pub fn validate_credentials(config: &AppConfig) -> Result<()> {
    credential(&config.channel.bot_token_env)?;
    credential(&config.docstore.token_env)?;
    credential(&config.search.api_key_env)?;

    if config.channel.chat_id.is_empty() {
        return Err(CoalwireError::config("channel.chat_id is not configured"));
    }
    if config.docstore.database_id.is_empty() {
        return Err(CoalwireError::config(
            "docstore.database_id is not configured",
        ));
    }
    Ok(())
}
