//! Debate segmentation: carve the debates-section pages into per-topic
//! spans using the detected heading candidates.
//!
//! Heading candidates come from a font-size + alignment heuristic and
//! include false positives (slogans, date lines, stage directions), so
//! candidates pass a denylist before the matcher runs. No heading or page
//! failure aborts segmentation; the output may be shorter than the heading
//! count and downstream must tolerate that.

use once_cell::sync::Lazy;
use regex::Regex;

use sabhalekh_core::{DebateSpan, Page};

use crate::heading::{self, MatcherConfig};

const MONTHS: &str =
    "जानेवारी|फेब्रुवारी|मार्च|एप्रिल|मे|जून|जुलै|ऑगस्ट|सप्टेंबर|ऑक्टोबर|नोव्हेंबर|डिसेंबर";

/// Candidate lines that are never real debate headings.
static NEGATIVE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // National song slogan
        Regex::new(r"^बंदे\s+मातरम्").unwrap(),
        // "Jay Hind! Jay Maharashtra!" sign-off
        Regex::new(r"^जयहिंद\s*!?\s*जयमहाराष्ट्र\s*!?").unwrap(),
        // Resumption-after-adjournment stage direction
        Regex::new(r"^\(\s*स्थगितीनंतर\s*\)").unwrap(),
        // Marathi date line
        Regex::new(&format!(r"^[0-9०-९]{{1,2}}\s*(?:{MONTHS})\s*[0-9०-९]{{4}}")).unwrap(),
        // English date line
        Regex::new(r"^\d{1,2}\s*[A-Za-z]+\s*\d{4}").unwrap(),
        // Digits only
        Regex::new(r"^\d+$").unwrap(),
        // Fully parenthesized annotation
        Regex::new(r"^\(.*\)$").unwrap(),
    ]
});

/// Whether a heading candidate survives the denylist. Blank candidates are
/// rejected outright.
pub fn is_valid_heading(candidate: &str) -> bool {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return false;
    }
    !NEGATIVE_PATTERNS.iter().any(|re| re.is_match(trimmed))
}

/// Segment the debates-section pages into topic spans, in first-occurrence
/// order. Continuation pages (no headings) extend the previous span; a
/// heading identical to the previous span's topic merges into it. Sequence
/// numbers are assigned as spans are created and survive merges.
pub fn segment(pages: &[Page], config: &MatcherConfig) -> Vec<DebateSpan> {
    let mut spans: Vec<DebateSpan> = Vec::new();

    for page in pages {
        let text = &page.text;
        if text.trim().is_empty() {
            tracing::debug!(image = %page.image_name, "skipping page with empty text");
            continue;
        }

        if page.headings.is_empty() {
            // Pure continuation page: extend the previous span or drop.
            match spans.last_mut() {
                Some(last) => {
                    last.text.push('\n');
                    last.text.push_str(text);
                    push_image(&mut last.image_names, &page.image_name);
                    tracing::debug!(
                        image = %page.image_name,
                        topic = truncate(&last.topic),
                        "continuation page appended to previous debate"
                    );
                }
                None => {
                    tracing::warn!(
                        image = %page.image_name,
                        "page has no headings and no previous debate to continue; dropped"
                    );
                }
            }
            continue;
        }

        // A page whose candidates are all denylisted contributes nothing:
        // it is not a continuation, its headings were just noise.
        let valid: Vec<&str> = page
            .headings
            .iter()
            .map(|h| h.as_str())
            .filter(|h| {
                let ok = is_valid_heading(h);
                if !ok {
                    tracing::debug!(heading = truncate(h), "rejected heading candidate");
                }
                ok
            })
            .collect();

        for (i, candidate) in valid.iter().enumerate() {
            let Some(located) = heading::locate_with_config(candidate, text, config) else {
                tracing::warn!(
                    image = %page.image_name,
                    heading = truncate(candidate),
                    "heading not found in page text; skipped"
                );
                continue;
            };
            let start = located.position;

            // Span ends where the next valid candidate starts, or at
            // end-of-text when there is none or it cannot be located.
            let end = valid
                .get(i + 1)
                .and_then(|next| text.find(*next))
                .unwrap_or(text.len());

            let debate_text = if end > start { text[start..end].trim() } else { "" };
            if debate_text.chars().count() <= 1 {
                tracing::debug!(
                    heading = truncate(candidate),
                    "discarding debate slice as noise"
                );
                continue;
            }

            let topic = candidate.trim();
            match spans.last_mut() {
                // A heading legitimately repeats when it was re-OCR'd at a
                // page boundary; merge instead of opening a second span.
                // Fuzzy-equal-but-not-identical topics stay distinct.
                Some(last) if last.topic == topic => {
                    last.text.push('\n');
                    last.text.push_str(debate_text);
                    push_image(&mut last.image_names, &page.image_name);
                    tracing::debug!(topic = truncate(topic), "merged repeated heading");
                }
                _ => {
                    spans.push(DebateSpan {
                        topic: topic.to_string(),
                        text: debate_text.to_string(),
                        image_names: vec![page.image_name.clone()],
                        sequence: spans.len() + 1,
                    });
                    tracing::debug!(topic = truncate(topic), "new debate span");
                }
            }
        }
    }

    tracing::info!(
        spans = spans.len(),
        pages = pages.len(),
        "debate segmentation complete"
    );
    spans
}

fn push_image(images: &mut Vec<String>, image_name: &str) {
    if !images.iter().any(|i| i == image_name) {
        images.push(image_name.to_string());
    }
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

    fn page(name: &str, text: &str, headings: &[&str]) -> Page {
        Page {
            image_name: name.to_string(),
            text: text.to_string(),
            headings: headings.iter().map(|h| h.to_string()).collect(),
        }
    }

    fn config() -> MatcherConfig {
        MatcherConfig::default()
    }

    // =========================================================================
    // Denylist
    // =========================================================================

    #[test]
    fn denylist_rejects_false_positive_candidates() {
        assert!(!is_valid_heading("बंदे मातरम्"));
        assert!(!is_valid_heading("जयहिंद! जयमहाराष्ट्र!"));
        assert!(!is_valid_heading("( स्थगितीनंतर )"));
        assert!(!is_valid_heading("२१ मार्च २०२२"));
        assert!(!is_valid_heading("15 March 2022"));
        assert!(!is_valid_heading(""));
        assert!(!is_valid_heading("   "));
        assert!(!is_valid_heading("1234"));
        assert!(!is_valid_heading("(सभागृहात गोंधळ)"));
    }

    #[test]
    fn denylist_keeps_real_headings() {
        assert!(is_valid_heading("पुरवणी मागण्या"));
        assert!(is_valid_heading("लक्षवेधी सूचना"));
    }

    // =========================================================================
    // Span carving
    // =========================================================================

    #[test]
    fn two_headings_carve_two_spans() {
        // Both headings present verbatim, in order; the first span must end
        // exactly where the second heading begins.
        let topic_a = "विषय A";
        let topic_b = "विषय B";
        let text =
            format!("{topic_a} पहिल्या विषयाचा मजकूर इथे आहे\n{topic_b} दुसऱ्या विषयाचा मजकूर");
        let pos_b = text.find(topic_b).unwrap();

        let pages = vec![page("p1.jpg", &text, &[topic_a, topic_b])];
        let spans = segment(&pages, &config());
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].topic, topic_a);
        assert_eq!(spans[0].text, text[0..pos_b].trim());
        assert_eq!(spans[1].topic, topic_b);
        assert_eq!(spans[1].text, text[pos_b..].trim());
        assert_eq!(spans[0].sequence, 1);
        assert_eq!(spans[1].sequence, 2);
    }

    #[test]
    fn continuation_page_extends_last_span() {
        let pages = vec![
            page("p1.jpg", "विषय अ\nपहिल्या पानाचा मजकूर", &["विषय अ"]),
            page("p2.jpg", "दुसऱ्या पानाचा मजकूर", &[]),
        ];
        let spans = segment(&pages, &config());
        assert_eq!(spans.len(), 1);
        assert!(spans[0].text.contains("पहिल्या पानाचा मजकूर"));
        assert!(spans[0].text.contains("दुसऱ्या पानाचा मजकूर"));
        assert_eq!(spans[0].image_names, vec!["p1.jpg", "p2.jpg"]);
    }

    #[test]
    fn continuation_without_predecessor_is_dropped() {
        let pages = vec![page("p1.jpg", "मजकूर आहे पण मथळा नाही", &[])];
        let spans = segment(&pages, &config());
        assert!(spans.is_empty());
    }

    #[test]
    fn repeated_heading_on_next_page_merges() {
        let pages = vec![
            page("p1.jpg", "विषय अ\nपहिला भाग", &["विषय अ"]),
            page("p2.jpg", "विषय अ\nदुसरा भाग", &["विषय अ"]),
        ];
        let spans = segment(&pages, &config());
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].topic, "विषय अ");
        assert!(spans[0].text.contains("पहिला भाग"));
        assert!(spans[0].text.contains("दुसरा भाग"));
        assert_eq!(spans[0].image_names, vec!["p1.jpg", "p2.jpg"]);
        assert_eq!(spans[0].sequence, 1);
    }

    #[test]
    fn distinct_headings_stay_distinct() {
        let pages = vec![
            page("p1.jpg", "विषय अ\nभाग", &["विषय अ"]),
            page("p2.jpg", "विषय ब\nभाग", &["विषय ब"]),
        ];
        let spans = segment(&pages, &config());
        assert_eq!(spans.len(), 2);
    }

    #[test]
    fn empty_page_is_skipped() {
        let pages = vec![
            page("p1.jpg", "विषय अ\nमजकूर", &["विषय अ"]),
            page("p2.jpg", "   \n  ", &[]),
            page("p3.jpg", "पुढील मजकूर", &[]),
        ];
        let spans = segment(&pages, &config());
        assert_eq!(spans.len(), 1);
        // Only the non-empty continuation page contributed.
        assert_eq!(spans[0].image_names, vec!["p1.jpg", "p3.jpg"]);
    }

    #[test]
    fn unlocatable_heading_is_skipped_without_aborting_page() {
        let pages = vec![page(
            "p1.jpg",
            "विषय अ\nमजकूर इथे आहे",
            &["पूर्णपणे असंबंधित मथळा क्रमांक", "विषय अ"],
        )];
        let spans = segment(&pages, &config());
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].topic, "विषय अ");
    }

    #[test]
    fn tiny_slice_is_discarded_as_noise() {
        // Heading matches at the very end of the page text; the slice after
        // trimming is a single character.
        let pages = vec![page("p1.jpg", "मजकूर विषय क्षय", &["विषय क्षय"])];
        // Span text "विषय क्षय" is longer than one char, so this one stays.
        assert_eq!(segment(&pages, &config()).len(), 1);

        let pages = vec![page("p2.jpg", "अ", &["अ"])];
        assert!(segment(&pages, &config()).is_empty());
    }

    #[test]
    fn all_invalid_candidates_contribute_nothing() {
        let pages = vec![page(
            "p1.jpg",
            "( स्थगितीनंतर ) मजकूर",
            &["( स्थगितीनंतर )", "1234"],
        )];
        // Candidates all rejected; page is NOT treated as a continuation.
        assert!(segment(&pages, &config()).is_empty());
    }
}
