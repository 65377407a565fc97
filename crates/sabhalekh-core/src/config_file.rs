//! On-disk TOML configuration.
//!
//! All fields are optional so partial configs work (merge with defaults).
//! A `.sabhalekh.toml` in the working directory overrides the platform
//! config file. The section-anchor regexes live here rather than in code:
//! the built-in defaults fit the Maharashtra Vidhan Sabha document template,
//! and other legislative templates only need a config change.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub model: Option<ModelConfig>,
    pub extraction: Option<ExtractionConfig>,
    pub matching: Option<MatchingConfig>,
    pub anchors: Option<AnchorConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Chunk budget (characters) for the members-list extractor.
    pub member_chunk_size: Option<usize>,
    /// Chunk budget for the resolutions (karyavali) extractor.
    pub resolution_chunk_size: Option<usize>,
    /// Chunk budget for the index extractor.
    pub index_chunk_size: Option<usize>,
    /// Trailing entities carried across chunk boundaries.
    pub trailing_memory: Option<usize>,
    /// Hard cap on input text length before chunking.
    pub max_text_len: Option<usize>,
    pub max_retries: Option<u32>,
    pub retry_delay_secs: Option<u64>,
    /// Fixed delay between model calls.
    pub pacing_delay_secs: Option<u64>,
    /// TTL in seconds for memory-store entries (unset = no expiry).
    pub memory_ttl_secs: Option<u64>,
    /// Path to a persistent sqlite memory store (unset = in-memory).
    pub memory_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Fuzzy line similarity (0-100) above which a heading match is accepted.
    pub fuzzy_accept: Option<f64>,
    /// Similarity above which a rejected match is logged as a near miss.
    pub fuzzy_near_miss: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnchorConfig {
    /// Masthead pattern opening the members-list section.
    pub members_start: Option<String>,
    /// Agenda heading pattern (कार्यावली + weekday + date).
    pub agenda_start: Option<String>,
    /// Sitting-opening pattern ending the agenda section.
    pub debates_start: Option<String>,
}

/// Platform config path: `<config_dir>/sabhalekh/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("sabhalekh").join("config.toml"))
}

/// Load config by cascading CWD `.sabhalekh.toml` over the platform config.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(&PathBuf::from(".sabhalekh.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. `None` if missing or unparseable.
pub fn load_from_path(path: &PathBuf) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config file");
            None
        }
    }
}

fn pick<T>(overlay: Option<T>, base: Option<T>) -> Option<T> {
    overlay.or(base)
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let b_model = base.model.unwrap_or_default();
    let o_model = overlay.model.unwrap_or_default();
    let b_ext = base.extraction.unwrap_or_default();
    let o_ext = overlay.extraction.unwrap_or_default();
    let b_match = base.matching.unwrap_or_default();
    let o_match = overlay.matching.unwrap_or_default();
    let b_anchor = base.anchors.unwrap_or_default();
    let o_anchor = overlay.anchors.unwrap_or_default();

    ConfigFile {
        model: Some(ModelConfig {
            api_key: pick(o_model.api_key, b_model.api_key),
            base_url: pick(o_model.base_url, b_model.base_url),
            model: pick(o_model.model, b_model.model),
            temperature: pick(o_model.temperature, b_model.temperature),
            timeout_secs: pick(o_model.timeout_secs, b_model.timeout_secs),
        }),
        extraction: Some(ExtractionConfig {
            member_chunk_size: pick(o_ext.member_chunk_size, b_ext.member_chunk_size),
            resolution_chunk_size: pick(o_ext.resolution_chunk_size, b_ext.resolution_chunk_size),
            index_chunk_size: pick(o_ext.index_chunk_size, b_ext.index_chunk_size),
            trailing_memory: pick(o_ext.trailing_memory, b_ext.trailing_memory),
            max_text_len: pick(o_ext.max_text_len, b_ext.max_text_len),
            max_retries: pick(o_ext.max_retries, b_ext.max_retries),
            retry_delay_secs: pick(o_ext.retry_delay_secs, b_ext.retry_delay_secs),
            pacing_delay_secs: pick(o_ext.pacing_delay_secs, b_ext.pacing_delay_secs),
            memory_ttl_secs: pick(o_ext.memory_ttl_secs, b_ext.memory_ttl_secs),
            memory_path: pick(o_ext.memory_path, b_ext.memory_path),
        }),
        matching: Some(MatchingConfig {
            fuzzy_accept: pick(o_match.fuzzy_accept, b_match.fuzzy_accept),
            fuzzy_near_miss: pick(o_match.fuzzy_near_miss, b_match.fuzzy_near_miss),
        }),
        anchors: Some(AnchorConfig {
            members_start: pick(o_anchor.members_start, b_anchor.members_start),
            agenda_start: pick(o_anchor.agenda_start, b_anchor.agenda_start),
            debates_start: pick(o_anchor.debates_start, b_anchor.debates_start),
        }),
    }
}
