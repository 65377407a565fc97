//! Page classification, heading matching, debate segmentation and
//! deterministic field extraction for OCR'd kramank documents.

use thiserror::Error;

pub mod classify;
pub mod fields;
pub mod heading;
pub mod segment;
pub mod session;

pub use classify::{AnchorPatterns, SectionedPages, classify_pages};
pub use fields::{DebateFields, extract_chairman, extract_debate_fields, extract_sitting_date};
pub use heading::{HeadingMatch, MatchStrategy, MatcherConfig, locate, locate_with_config};
pub use segment::{is_valid_heading, segment};
pub use session::session_details;

#[derive(Error, Debug)]
pub enum ParsingError {
    #[error("invalid anchor pattern `{name}`: {source}")]
    AnchorPattern {
        name: &'static str,
        source: Box<regex::Error>,
    },
}

impl MatcherConfig {
    /// Build matcher thresholds from the on-disk config section.
    pub fn from_config(config: &sabhalekh_core::config_file::MatchingConfig) -> Self {
        let defaults = Self::default();
        Self {
            fuzzy_accept: config.fuzzy_accept.unwrap_or(defaults.fuzzy_accept),
            fuzzy_near_miss: config.fuzzy_near_miss.unwrap_or(defaults.fuzzy_near_miss),
        }
    }
}
