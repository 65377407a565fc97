//! Deterministic regex-based field extraction from debate text.
//!
//! Complement and fallback to the model-based path: these pulls always run
//! and cost nothing, and the record builder keeps them when the model call
//! fails or returns garbage. Participants are honorific-prefixed spans
//! classified by nearby verb cues: a trailing question phrase marks the
//! asker, a colon or answer phrase marks the answerer, everything else is a
//! general member mention.

use once_cell::sync::Lazy;
use regex::Regex;

use sabhalekh_core::clean_text;

const MONTHS: &str =
    "जानेवारी|फेब्रुवारी|मार्च|एप्रिल|मे|जून|जुलै|ऑगस्ट|सप्टेंबर|ऑक्टोबर|नोव्हेंबर|डिसेंबर";

const WEEKDAYS: &str = "सोमवार|मंगळवार|बुधवार|गुरुवार|शुक्रवार|शनिवार|रविवार";

/// Day + Marathi month + year, Devanagari or ASCII digits.
static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"[0-9०-९]{{1,2}}\s+(?:{MONTHS})\s*,?\s*[0-9०-९]{{2,4}}"
    ))
    .unwrap()
});

/// "प्रश्न क्रमांक ४५" / "क्रमांक 45" with the number captured.
static QUESTION_NO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:प्रश्न\s+क्रमांक|क्रमांक)\s*([0-9०-९]+)").unwrap());

/// Honorific-prefixed participant span. श्रीमती must precede श्री in the
/// alternation or the latter would shadow it.
static MEMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:श्रीमती|श्री|सर्वश्री)\.?\s[^\n:,]+").unwrap());

/// Chairperson line: "अध्यक्ष : <name> ... अध्यक्षस्थानी होते".
static ADHYAKSHA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"अध्यक्ष\s*[:\-]\s*(.*?अध्यक्षस्थानी होते)").unwrap());

/// Sitting-date line: "सोमवार, दिनांक २१ मार्च, २०२२".
static SITTING_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?:{WEEKDAYS}),\s*दिनांक\s*[0-9०-९]{{1,2}}\s+[\x{{900}}-\x{{97F}}]\w*,?\s*[0-9०-९]{{4}}"
    ))
    .unwrap()
});

/// Verb cues that classify a participant span.
const QUESTION_CUES: &[&str] = &["प्रश्न विचारला", "प्रश्न उपस्थित", "पुढील प्रश्न"];
const ANSWER_CUES: &[&str] = &["उत्तर दिले", "उत्तरात", "खुलासा केला"];

/// Fields pulled deterministically from one debate span's text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebateFields {
    pub date: Option<String>,
    pub question_numbers: Vec<String>,
    pub members: Vec<String>,
    pub question_by: Vec<String>,
    pub answer_by: Vec<String>,
}

/// Extract date, question numbers and classified participants from debate
/// text.
pub fn extract_debate_fields(text: &str) -> DebateFields {
    let mut fields = DebateFields {
        date: DATE_RE.find(text).map(|m| clean_text(m.as_str())),
        ..Default::default()
    };

    for caps in QUESTION_NO_RE.captures_iter(text) {
        let number = caps[1].to_string();
        if !fields.question_numbers.contains(&number) {
            fields.question_numbers.push(number);
        }
    }

    for m in MEMBER_RE.find_iter(text) {
        let span = m.as_str();
        // The raw span runs to the next newline/colon/comma, so it may drag
        // the verb phrase along; "यांनी" separates name from verb.
        let (name, verb_tail) = match span.find(" यांनी") {
            Some(idx) => (&span[..idx], &span[idx..]),
            None => (span, ""),
        };
        let name = clean_text(name);
        if name.is_empty() {
            continue;
        }

        let after = &text[m.end()..];
        let followed_by_colon = after.trim_start().starts_with(':');
        let window: String = after.chars().take(60).collect();

        let is_asker = QUESTION_CUES
            .iter()
            .any(|cue| verb_tail.contains(cue) || window.contains(cue));
        let is_answerer = !is_asker
            && (followed_by_colon
                || ANSWER_CUES
                    .iter()
                    .any(|cue| verb_tail.contains(cue) || window.contains(cue)));

        push_unique(&mut fields.members, &name);
        if is_asker {
            push_unique(&mut fields.question_by, &name);
        } else if is_answerer {
            push_unique(&mut fields.answer_by, &name);
        }
    }

    fields
}

/// Chairperson (अध्यक्ष) line from the full document text.
pub fn extract_chairman(text: &str) -> Option<String> {
    let caps = ADHYAKSHA_RE.captures(text)?;
    let chairman = clean_text(&caps[1]);
    if chairman.is_empty() {
        tracing::warn!("chairperson line matched but cleaned to nothing");
        return None;
    }
    Some(chairman)
}

/// First sitting-date line ("weekday, दिनांक day month, year") in the
/// document text.
pub fn extract_sitting_date(text: &str) -> Option<String> {
    SITTING_DATE_RE.find(text).map(|m| m.as_str().to_string())
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}
