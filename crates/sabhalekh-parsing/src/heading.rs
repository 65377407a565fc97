//! Heading location in noisy OCR page text.
//!
//! OCR introduces spacing noise, broken diacritics, and occasionally merged
//! or split words, so a single matching strategy is not enough. Strategies
//! escalate from exact search to bounded fuzziness; the similarity floor
//! keeps the fuzzy stage from producing false positives.

use once_cell::sync::Lazy;
use regex::Regex;

/// Which strategy located a heading, kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchStrategy {
    Exact,
    Normalized,
    FuzzyLine,
    PartialPrefix,
    PunctuationStripped,
    WhitespaceCollapsed,
}

/// A located heading: byte offset into the raw page text plus the strategy
/// that found it.
#[derive(Debug, Clone, Copy)]
pub struct HeadingMatch {
    pub position: usize,
    pub strategy: MatchStrategy,
}

/// Fuzzy-match thresholds on the 0-100 similarity scale.
#[derive(Debug, Clone, Copy)]
pub struct MatcherConfig {
    /// Similarity above which a best-line fuzzy match is accepted.
    pub fuzzy_accept: f64,
    /// Similarity above which a rejected match is logged as a near miss.
    pub fuzzy_near_miss: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            fuzzy_accept: 85.0,
            fuzzy_near_miss: 70.0,
        }
    }
}

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

/// True for characters that survive into the comparison form. Keeps letters,
/// digits and Devanagari matras/virama; drops whitespace, danda and other
/// punctuation.
fn keeps(ch: char) -> bool {
    if ch.is_whitespace() || matches!(ch, '।' | '॥') {
        return false;
    }
    ch.is_alphanumeric() || ch == '_' || ('\u{0900}'..='\u{097F}').contains(&ch)
}

/// Comparison form: danda and punctuation stripped, all whitespace removed.
///
/// Whitespace is removed outright (not collapsed) because the dominant OCR
/// failure on headings is spurious or missing spaces between words; the
/// byte-offset map returned alongside makes a match in this form convertible
/// back to a position in the raw text.
fn normalize_with_offsets(text: &str) -> (String, Vec<usize>) {
    let mut normalized = String::new();
    let mut offsets = Vec::new();
    for (byte_idx, ch) in text.char_indices() {
        if !keeps(ch) {
            continue;
        }
        normalized.push(ch);
        offsets.push(byte_idx);
    }
    (normalized, offsets)
}

/// Comparison form without the offset map.
fn normalize(text: &str) -> String {
    normalize_with_offsets(text).0
}

/// Locate `heading` inside `page_text` with default thresholds.
/// Returns the byte offset of the heading in the raw text.
pub fn locate(heading: &str, page_text: &str) -> Option<usize> {
    locate_with_config(heading, page_text, &MatcherConfig::default()).map(|m| m.position)
}

/// Locate `heading` inside `page_text`, trying strategies in order; the
/// first success wins. `None` means the caller should skip this heading
/// without aborting the page.
pub fn locate_with_config(
    heading: &str,
    page_text: &str,
    config: &MatcherConfig,
) -> Option<HeadingMatch> {
    if heading.trim().is_empty() {
        return None;
    }

    // Strategy 1: exact substring.
    if let Some(pos) = page_text.find(heading) {
        return Some(HeadingMatch {
            position: pos,
            strategy: MatchStrategy::Exact,
        });
    }

    // Strategy 2: match in normalized form, then map back to the raw offset.
    let (norm_heading, _) = normalize_with_offsets(heading);
    let (norm_page, page_offsets) = normalize_with_offsets(page_text);
    if !norm_heading.is_empty()
        && let Some(norm_pos) = norm_page.find(&norm_heading)
    {
        let char_idx = norm_page[..norm_pos].chars().count();
        if let Some(&raw_pos) = page_offsets.get(char_idx) {
            tracing::debug!(heading = truncate(heading), "heading found via normalized match");
            return Some(HeadingMatch {
                position: raw_pos,
                strategy: MatchStrategy::Normalized,
            });
        }
    }

    // Strategy 3: fuzzy best-line match, bounded by the similarity floor.
    let mut best_similarity = 0.0f64;
    let mut best_line = "";
    for line in page_text.lines() {
        if line.trim().chars().count() < 3 {
            continue;
        }
        let similarity =
            rapidfuzz::fuzz::ratio(normalize(line).chars(), norm_heading.chars()) * 100.0;
        if similarity > best_similarity {
            best_similarity = similarity;
            best_line = line;
        }
    }
    if best_similarity > config.fuzzy_accept {
        if let Some(pos) = page_text.find(best_line) {
            tracing::debug!(
                heading = truncate(heading),
                similarity = best_similarity,
                "heading found via fuzzy line match"
            );
            return Some(HeadingMatch {
                position: pos,
                strategy: MatchStrategy::FuzzyLine,
            });
        }
    } else if best_similarity > config.fuzzy_near_miss {
        tracing::debug!(
            heading = truncate(heading),
            line = truncate(best_line),
            similarity = best_similarity,
            "fuzzy near miss below accept threshold"
        );
    }

    // Strategy 4: progressively shorter exact prefixes of long headings.
    let char_bounds: Vec<usize> = heading.char_indices().map(|(i, _)| i).collect();
    let char_count = char_bounds.len();
    if char_count > 10 {
        for len in (6..=char_count - 10).rev() {
            let prefix = &heading[..char_bounds[len]];
            if let Some(pos) = page_text.find(prefix) {
                tracing::debug!(
                    heading = truncate(heading),
                    prefix_chars = len,
                    "heading found via partial prefix"
                );
                return Some(HeadingMatch {
                    position: pos,
                    strategy: MatchStrategy::PartialPrefix,
                });
            }
        }
    }

    // Strategy 5: punctuation-stripped exact search.
    let depunctuated = NON_WORD.replace_all(heading, "");
    if depunctuated != heading
        && let Some(pos) = page_text.find(depunctuated.as_ref())
    {
        return Some(HeadingMatch {
            position: pos,
            strategy: MatchStrategy::PunctuationStripped,
        });
    }

    // Strategy 6: whitespace-collapsed exact search.
    let collapsed = heading.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed != heading
        && let Some(pos) = page_text.find(&collapsed)
    {
        return Some(HeadingMatch {
            position: pos,
            strategy: MatchStrategy::WhitespaceCollapsed,
        });
    }

    tracing::debug!(
        heading = truncate(heading),
        best_similarity,
        "heading not found in page text"
    );
    None
}

fn truncate(s: &str) -> &str {
    match s.char_indices().nth(50) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strategy(heading: &str, page: &str) -> Option<MatchStrategy> {
        locate_with_config(heading, page, &MatcherConfig::default()).map(|m| m.strategy)
    }

    // =========================================================================
    // Exact and normalized strategies
    // =========================================================================

    #[test]
    fn exact_match_returns_exact_offset() {
        let page = "प्रस्तावना\nविषय अ\nमजकूर येथे आहे";
        let pos = locate("विषय अ", page).unwrap();
        assert_eq!(pos, page.find("विषय अ").unwrap());
        assert_eq!(strategy("विषय अ", page), Some(MatchStrategy::Exact));
    }

    #[test]
    fn exact_fires_before_anything_else() {
        // Heading present verbatim: later strategies must not be consulted.
        let page = "xx चर्चा विषय xx चर्चाविषय";
        let m = locate_with_config("चर्चा विषय", page, &MatcherConfig::default()).unwrap();
        assert_eq!(m.strategy, MatchStrategy::Exact);
        assert_eq!(m.position, page.find("चर्चा विषय").unwrap());
    }

    #[test]
    fn extra_spaces_in_heading_found_via_normalized() {
        // Heading has internal spaces the source lacks.
        let page = "काही मजकूर चर्चाविषय आणखी मजकूर";
        let m = locate_with_config("चर्चा   विषय", page, &MatcherConfig::default()).unwrap();
        assert_eq!(m.strategy, MatchStrategy::Normalized);
        assert_eq!(m.position, page.find("चर्चाविषय").unwrap());
    }

    #[test]
    fn danda_stripped_for_normalized_match() {
        let page = "मथळा सभागृहाचे कामकाज पुढे";
        let m = locate_with_config("सभागृहाचे कामकाज ।", page, &MatcherConfig::default()).unwrap();
        assert_eq!(m.strategy, MatchStrategy::Normalized);
        assert_eq!(m.position, page.find("सभागृहाचे").unwrap());
    }

    // =========================================================================
    // Fuzzy and partial strategies
    // =========================================================================

    #[test]
    fn ocr_typo_found_via_fuzzy_line() {
        // One character differs: below exact, above the 85 floor.
        let page = "पहिली ओळ\nमहाराष्ट्र विनियोजन विधेयक मजूर\nशेवटची ओळ";
        let m = locate_with_config(
            "महाराष्ट्र विनियोजन विधेयक मंजूर",
            page,
            &MatcherConfig::default(),
        )
        .unwrap();
        assert_eq!(m.strategy, MatchStrategy::FuzzyLine);
        assert_eq!(m.position, page.find("महाराष्ट्र विनियोजन").unwrap());
    }

    #[test]
    fn dissimilar_text_is_not_matched() {
        let page = "पूर्णपणे वेगळा मजकूर इथे आहे\nदुसरी ओळ";
        assert!(locate("लक्षवेधी सूचना क्रमांक एक", page).is_none());
    }

    #[test]
    fn long_heading_with_truncated_tail_found_via_prefix() {
        // Page carries only the first words of a long heading.
        let heading = "नागपूर शहरातील पाणीपुरवठा योजनेबाबत लक्षवेधी सूचना";
        let page = "इतर मजकूर नागपूर शहरातील पाणीपुरवठा इतर";
        let m = locate_with_config(heading, page, &MatcherConfig::default()).unwrap();
        assert!(matches!(
            m.strategy,
            MatchStrategy::FuzzyLine | MatchStrategy::PartialPrefix
        ));
        assert_eq!(m.position, page.find("नागपूर").unwrap());
    }

    #[test]
    fn short_heading_skips_prefix_strategy() {
        // <= 10 chars: prefix strategy must not fire, so no match at all.
        assert!(locate("विषय", "no related text here").is_none());
    }

    // =========================================================================
    // Raw-text final attempts
    // =========================================================================

    #[test]
    fn whitespace_collapsed_heading_found_in_raw_text() {
        let page = "मथळा विषय क्रमांक दोन मजकूर";
        let pos = locate("विषय  क्रमांक  दोन", page).unwrap();
        assert_eq!(pos, page.find("विषय क्रमांक दोन").unwrap());
    }

    #[test]
    fn empty_heading_is_never_found() {
        assert!(locate("", "some page text").is_none());
    }
}
