//! Page-type classification: a forward-only state machine over the OCR'd
//! page stream.
//!
//! A kramank document always reads index → members list → agenda
//! (कार्यावली) → debates, so classification is a four-state machine that
//! advances when the current page carries the next section's anchor pattern
//! and never moves backwards. The anchor regexes are tied to the Maharashtra
//! Vidhan Sabha template; other templates override them via configuration.

use once_cell::sync::Lazy;
use regex::Regex;

use sabhalekh_core::config_file::AnchorConfig;
use sabhalekh_core::{Page, SectionLabel};

use crate::ParsingError;

const WEEKDAYS: &str = "सोमवार|मंगळवार|बुधवार|गुरुवार|शुक्रवार|शनिवार|रविवार";

static MEMBERS_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"महाराष्ट्र शासन\s+राज्यपाल").unwrap());

static AGENDA_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"कार्यावली\s+(?:{WEEKDAYS}),\s+दिनांक.*?\n")).unwrap()
});

static DEBATES_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?:{WEEKDAYS}),\s+दिनांक.*?\n\s*विधानसभेची बैठक"
    ))
    .unwrap()
});

/// The three anchor patterns that drive section transitions.
pub struct AnchorPatterns {
    members_start: Regex,
    agenda_start: Regex,
    debates_start: Regex,
}

impl Default for AnchorPatterns {
    fn default() -> Self {
        Self {
            members_start: MEMBERS_START.clone(),
            agenda_start: AGENDA_START.clone(),
            debates_start: DEBATES_START.clone(),
        }
    }
}

impl AnchorPatterns {
    /// Build patterns from config, falling back to the built-in defaults for
    /// any anchor not overridden.
    pub fn from_config(config: &AnchorConfig) -> Result<Self, ParsingError> {
        let compile = |name: &'static str, pattern: &Option<String>, default: &Regex| {
            match pattern {
                Some(p) => Regex::new(p).map_err(|source| ParsingError::AnchorPattern {
                    name,
                    source: Box::new(source),
                }),
                None => Ok(default.clone()),
            }
        };
        Ok(Self {
            members_start: compile("members_start", &config.members_start, &MEMBERS_START)?,
            agenda_start: compile("agenda_start", &config.agenda_start, &AGENDA_START)?,
            debates_start: compile("debates_start", &config.debates_start, &DEBATES_START)?,
        })
    }

    /// Next state given the current state and the current page's text.
    /// First matching transition wins; debates is terminal.
    fn advance(&self, current: SectionLabel, text: &str) -> SectionLabel {
        match current {
            SectionLabel::Index if self.members_start.is_match(text) => SectionLabel::Members,
            SectionLabel::Members if self.agenda_start.is_match(text) => SectionLabel::Agenda,
            SectionLabel::Agenda if self.debates_start.is_match(text) => SectionLabel::Debates,
            other => other,
        }
    }
}

/// Pages bucketed per section, in input order.
#[derive(Debug, Default)]
pub struct SectionedPages {
    pub index: Vec<Page>,
    pub members: Vec<Page>,
    pub agenda: Vec<Page>,
    pub debates: Vec<Page>,
    /// The classifier's final state; stays `Index` when no anchor ever
    /// matched (degraded classification).
    pub final_state: SectionLabel,
}

impl SectionedPages {
    fn bucket(&mut self, label: SectionLabel) -> &mut Vec<Page> {
        match label {
            SectionLabel::Index => &mut self.index,
            SectionLabel::Members => &mut self.members,
            SectionLabel::Agenda => &mut self.agenda,
            SectionLabel::Debates => &mut self.debates,
        }
    }

    /// True when classification never left the initial state.
    pub fn is_degraded(&self) -> bool {
        self.final_state == SectionLabel::Index
    }
}

/// Filename stem ending in a non-digit marks a supplementary/appendix page
/// (upstream naming convention); those are forced into the index bucket.
fn is_supplementary(image_name: &str) -> bool {
    let stem = image_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(image_name);
    match stem.chars().next_back() {
        Some(last) => !last.is_ascii_digit(),
        None => false,
    }
}

/// Assign every page to a section, in input order. The state machine is
/// pure: running it twice over the same pages yields identical buckets.
pub fn classify_pages(pages: &[Page], anchors: &AnchorPatterns) -> SectionedPages {
    let mut sections = SectionedPages {
        final_state: SectionLabel::Index,
        ..Default::default()
    };
    let mut state = SectionLabel::Index;

    for page in pages {
        state = anchors.advance(state, &page.text);

        // Supplementary pages bypass the section buckets but still advance
        // the state machine above.
        let label = if is_supplementary(&page.image_name) {
            SectionLabel::Index
        } else {
            state
        };
        tracing::debug!(image = %page.image_name, section = %label, "page classified");
        sections.bucket(label).push(page.clone());
    }

    sections.final_state = state;
    if sections.is_degraded() && !pages.is_empty() {
        tracing::warn!(
            pages = pages.len(),
            "no section anchors matched; every page classified as index"
        );
    }
    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(name: &str, text: &str) -> Page {
        Page {
            image_name: name.to_string(),
            text: text.to_string(),
            headings: Vec::new(),
        }
    }

    const MASTHEAD: &str = "महाराष्ट्र शासन\nराज्यपाल यांच्या आदेशानुसार";
    const AGENDA: &str = "कार्यावली सोमवार, दिनांक २१ मार्च, २०२२\nठराव पहिला";
    const SITTING: &str =
        "सोमवार, दिनांक २१ मार्च, २०२२\nविधानसभेची बैठक अकरा वाजता सुरू झाली";

    #[test]
    fn pages_before_any_anchor_stay_in_index() {
        let pages = vec![page("001.jpg", "अनुक्रमणिका"), page("002.jpg", MASTHEAD)];
        let sections = classify_pages(&pages, &AnchorPatterns::default());
        assert_eq!(sections.index.len(), 1);
        assert_eq!(sections.index[0].image_name, "001.jpg");
        assert_eq!(sections.members.len(), 1);
        assert_eq!(sections.members[0].image_name, "002.jpg");
    }

    #[test]
    fn full_document_walks_all_four_states() {
        let pages = vec![
            page("001.jpg", "अनुक्रमणिका"),
            page("002.jpg", MASTHEAD),
            page("003.jpg", "सदस्यांची यादी पुढे चालू"),
            page("004.jpg", AGENDA),
            page("005.jpg", SITTING),
            page("006.jpg", "चर्चा पुढे चालू"),
        ];
        let sections = classify_pages(&pages, &AnchorPatterns::default());
        assert_eq!(sections.index.len(), 1);
        assert_eq!(sections.members.len(), 2);
        assert_eq!(sections.agenda.len(), 1);
        assert_eq!(sections.debates.len(), 2);
        assert_eq!(sections.final_state, SectionLabel::Debates);
    }

    #[test]
    fn state_never_regresses_from_debates() {
        // A stray masthead inside the debates section must not reopen members.
        let pages = vec![
            page("001.jpg", MASTHEAD),
            page("002.jpg", AGENDA),
            page("003.jpg", SITTING),
            page("004.jpg", MASTHEAD),
        ];
        let sections = classify_pages(&pages, &AnchorPatterns::default());
        assert_eq!(sections.debates.len(), 2);
        assert_eq!(sections.members.len(), 1);
    }

    #[test]
    fn supplementary_filename_forced_into_index() {
        let pages = vec![
            page("001.jpg", MASTHEAD),
            page("002a.jpg", "परिशिष्ट मजकूर"),
            page("003.jpg", "सदस्य यादी"),
        ];
        let sections = classify_pages(&pages, &AnchorPatterns::default());
        assert_eq!(sections.index.len(), 1);
        assert_eq!(sections.index[0].image_name, "002a.jpg");
        // State advanced on page 1, so page 3 is still members.
        assert_eq!(sections.members.len(), 2);
    }

    #[test]
    fn no_anchors_degrades_to_all_index() {
        let pages = vec![page("001.jpg", "मजकूर"), page("002.jpg", "आणखी मजकूर")];
        let sections = classify_pages(&pages, &AnchorPatterns::default());
        assert_eq!(sections.index.len(), 2);
        assert!(sections.is_degraded());
    }

    #[test]
    fn classification_is_idempotent() {
        let pages = vec![
            page("001.jpg", "अनुक्रम"),
            page("002.jpg", MASTHEAD),
            page("003.jpg", AGENDA),
            page("004.jpg", SITTING),
        ];
        let anchors = AnchorPatterns::default();
        let first = classify_pages(&pages, &anchors);
        let second = classify_pages(&pages, &anchors);
        let names = |pages: &[Page]| {
            pages
                .iter()
                .map(|p| p.image_name.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(&first.index), names(&second.index));
        assert_eq!(names(&first.members), names(&second.members));
        assert_eq!(names(&first.agenda), names(&second.agenda));
        assert_eq!(names(&first.debates), names(&second.debates));
    }

    #[test]
    fn custom_anchor_overrides_default() {
        let config = AnchorConfig {
            members_start: Some("MEMBERS HEREAFTER".to_string()),
            agenda_start: None,
            debates_start: None,
        };
        let anchors = AnchorPatterns::from_config(&config).unwrap();
        let pages = vec![page("001.jpg", "MEMBERS HEREAFTER\nnames")];
        let sections = classify_pages(&pages, &anchors);
        assert_eq!(sections.members.len(), 1);
    }

    #[test]
    fn malformed_custom_anchor_is_an_error() {
        let config = AnchorConfig {
            members_start: Some("(unclosed".to_string()),
            agenda_start: None,
            debates_start: None,
        };
        assert!(AnchorPatterns::from_config(&config).is_err());
    }
}
