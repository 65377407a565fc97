//! Text cleaning shared by the deterministic field extractor and the record
//! builders.
//!
//! OCR output carries three kinds of spacing noise: ordinary runs of
//! whitespace, known broken-token artifacts, and huge gaps dropped into the
//! middle of a word. The intra-word repair only fires on 3+ consecutive
//! spaces; a global letter-space-letter join would also destroy legitimate
//! word boundaries.

use once_cell::sync::Lazy;
use regex::Regex;

/// Known OCR corruption patterns and their repairs, applied before any
/// whitespace collapsing so the original gap widths are still visible.
static REPAIRS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"Dev\s+vices").unwrap(), "Devices"),
        (Regex::new(r"Debat\s+tes").unwrap(), "Debattes"),
        (Regex::new(r"d\s+date").unwrap(), "date"),
        (Regex::new(r"t\s+topic").unwrap(), "topic"),
    ]
});

/// Intra-word gap: 3+ spaces between word characters (e.g. "गा   यनाने").
static INTRA_WORD_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w)[ \t]{3,}(\w)").unwrap());

static MULTI_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static MULTI_DOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{2,}").unwrap());

/// Normalize one text field: repair known corruptions, close oversized
/// intra-word gaps, collapse whitespace runs and dot runs.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut cleaned = text.to_string();
    for (re, replacement) in REPAIRS.iter() {
        cleaned = re.replace_all(&cleaned, *replacement).into_owned();
    }
    let cleaned = INTRA_WORD_GAP.replace_all(&cleaned, "$1$2");
    let cleaned = MULTI_WS.replace_all(&cleaned, " ");
    let cleaned = MULTI_DOT.replace_all(&cleaned, ".");
    cleaned.trim().to_string()
}

/// Clean every item of a list, dropping entries that clean down to nothing.
pub fn clean_list<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| clean_text(s.as_ref()))
        .filter(|s| !s.is_empty())
        .collect()
}
