//! Session attributes recovered from the document folder path.
//!
//! Kramank folders follow a `<year>/<house>/Session_<n>_<type>/<kramank>`
//! convention; each attribute is searched across all path components so
//! reordered layouts still resolve.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use sabhalekh_core::SessionDetails;

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").unwrap());
static HOUSE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"MLA|MLC").unwrap());
static SESSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Session_\d+_(\w+)").unwrap());

/// Parse session details from a kramank folder path. `None` when any
/// required attribute is missing (logged with what was found).
pub fn session_details(folder_path: &Path) -> Option<SessionDetails> {
    let parts: Vec<String> = folder_path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    let year = parts
        .iter()
        .find_map(|p| YEAR_RE.find(p).map(|m| m.as_str().to_string()));
    let house = parts
        .iter()
        .find_map(|p| HOUSE_RE.find(p).map(|m| m.as_str().to_string()));
    let session_type = parts
        .iter()
        .find_map(|p| SESSION_RE.captures(p).map(|c| c[1].to_string()));
    let kramank_name = parts.last().cloned();

    match (year, house, session_type, kramank_name) {
        (Some(year), Some(house), Some(session_type), Some(kramank_name)) => {
            Some(SessionDetails {
                year,
                house,
                session_type,
                kramank_name,
            })
        }
        (year, house, session_type, kramank_name) => {
            tracing::warn!(
                ?year,
                ?house,
                ?session_type,
                ?kramank_name,
                path = %folder_path.display(),
                "could not extract all session details from folder path"
            );
            None
        }
    }
}
