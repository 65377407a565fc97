//! Token-compression mapping for prompt size reduction.
//!
//! Legislative text repeats a handful of long words (party names, procedural
//! phrases) dozens of times per page. The ten most frequent words longer
//! than two characters are replaced by numeric aliases, and the mapping is
//! embedded in the prompt so the model can decompress before extracting.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").unwrap());

/// How many of the most frequent words get an alias.
const TOP_WORDS: usize = 10;

/// Replace the most frequent words with numeric aliases. Returns the
/// converted text and the alias → word mapping (empty when the text has no
/// qualifying words). Deterministic: ties rank by first occurrence.
pub fn compress(text: &str) -> (String, Vec<(usize, String)>) {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut first_seen: Vec<&str> = Vec::new();
    for m in WORD_RE.find_iter(text) {
        let word = m.as_str();
        if word.chars().count() <= 2 {
            continue;
        }
        let count = counts.entry(word).or_insert(0);
        if *count == 0 {
            first_seen.push(word);
        }
        *count += 1;
    }

    // Stable sort keeps first-occurrence order among equal counts.
    let mut ranked = first_seen;
    ranked.sort_by_key(|w| std::cmp::Reverse(counts[w]));
    ranked.truncate(TOP_WORDS);
    if ranked.is_empty() {
        return (text.to_string(), Vec::new());
    }

    let alias: HashMap<&str, usize> = ranked
        .iter()
        .enumerate()
        .map(|(i, w)| (*w, i + 1))
        .collect();
    let pattern = format!(
        r"\b(?:{})\b",
        ranked
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join("|")
    );
    let re = Regex::new(&pattern).expect("escaped word alternation must compile");
    let converted = re
        .replace_all(text, |caps: &regex::Captures| {
            alias[caps.get(0).unwrap().as_str()].to_string()
        })
        .into_owned();

    let mapping = ranked
        .into_iter()
        .enumerate()
        .map(|(i, w)| (i + 1, w.to_string()))
        .collect();
    (converted, mapping)
}

/// Render the mapping as a JSON object (`{"1": "word", ...}`) for prompt
/// embedding.
pub fn mapping_json(mapping: &[(usize, String)]) -> String {
    let object: serde_json::Map<String, serde_json::Value> = mapping
        .iter()
        .map(|(alias, word)| (alias.to_string(), serde_json::Value::String(word.clone())))
        .collect();
    serde_json::Value::Object(object).to_string()
}
