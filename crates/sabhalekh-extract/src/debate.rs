//! Per-debate record building: model-assisted field extraction merged over
//! the deterministic regex pulls.
//!
//! One record per span, never deduplicated. The model call is single-shot
//! (object-shaped, required keys checked); when it fails or returns garbage
//! the deterministic fields stand alone, so a record is always produced.

use serde_json::Value;

use sabhalekh_core::{DebateRecord, DebateSpan, ModelClient, ModelPacer, RetryPolicy, clean_text};
use sabhalekh_parsing::fields::{DebateFields, extract_debate_fields};

use crate::response::{self, Shape};

const DEBATE_PROMPT: &str = "\
You are a document parser working on Marathi Vidhan Sabha debates.

Extract the following structured data from the given debate text:

- date: (e.g. \"१३ मार्च २०००\")
- question_number: list of question numbers (e.g. [\"45\", \"46\"])
- members: list of names involved (asking or speaking)
- topics: key issues or bill subjects
- answers_by: list of names who responded

Return output as a valid JSON object:
{
  \"date\": \"\",
  \"question_number\": [],
  \"members\": [],
  \"topics\": [],
  \"answers_by\": []
}

IMPORTANT rules for the response:
1. Use EXACT text from the input text - do not modify or translate
2. Preserve all Marathi characters, numbers and formatting
3. Do not add any English text or translations
4. Return only the extracted Marathi text exactly as it appears in source

Do not return extra text, markdown, or comments.

Text:
{text}
";

const REQUIRED_KEYS: &[&str] = &["date", "question_number", "members", "topics", "answers_by"];

/// Model-extracted debate fields, shape-checked but otherwise raw.
#[derive(Debug, Clone, Default)]
pub struct ModelDebateFields {
    pub date: Option<String>,
    pub question_numbers: Vec<String>,
    pub members: Vec<String>,
    pub answers_by: Vec<String>,
}

/// Builds one structured record per debate span.
pub struct DebateBuilder<'a> {
    pub model: &'a dyn ModelClient,
    pub pacer: &'a ModelPacer,
    pub retry: RetryPolicy,
}

impl DebateBuilder<'_> {
    /// Deterministic extraction plus model enrichment.
    pub async fn build(&self, span: &DebateSpan) -> DebateRecord {
        let deterministic = extract_debate_fields(&span.text);
        let enriched = self.model_fields(&span.text).await;
        finalize_record(span, deterministic, enriched)
    }

    /// Deterministic extraction only (dry runs).
    pub fn build_offline(&self, span: &DebateSpan) -> DebateRecord {
        finalize_record(span, extract_debate_fields(&span.text), None)
    }

    async fn model_fields(&self, text: &str) -> Option<ModelDebateFields> {
        let prompt = DEBATE_PROMPT.replace("{text}", text);
        let mut raw = None;
        for attempt in 0..=self.retry.max_retries {
            self.pacer.acquire().await;
            match self.model.complete(&prompt).await {
                Ok(text) => {
                    raw = Some(text);
                    break;
                }
                Err(e) => {
                    if e.is_rate_limited() {
                        self.pacer.on_rate_limited();
                    }
                    tracing::warn!(attempt = attempt + 1, error = %e, "debate field model call failed");
                    if attempt < self.retry.max_retries {
                        tokio::time::sleep(self.retry.delay).await;
                    }
                }
            }
        }
        let raw = raw?;

        let payload = response::parse_payload(&raw, Shape::Object)?;
        if let Some(missing) = REQUIRED_KEYS.iter().find(|k| payload.get(**k).is_none()) {
            tracing::warn!(missing, "debate field response missing a required key");
            return None;
        }
        Some(ModelDebateFields {
            date: payload["date"]
                .as_str()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(String::from),
            question_numbers: string_list(&payload["question_number"]),
            members: string_list(&payload["members"]),
            answers_by: string_list(&payload["answers_by"]),
        })
    }
}

/// Accept both strings and bare numbers in model list fields.
fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Merge deterministic and model fields into the final record, applying the
/// validation gate: topic falls back to a placeholder, the document name
/// derives from the topic, and the member list is the union of every
/// attributed set.
pub fn finalize_record(
    span: &DebateSpan,
    deterministic: DebateFields,
    model: Option<ModelDebateFields>,
) -> DebateRecord {
    let model = model.unwrap_or_default();

    let mut topic = clean_text(&span.topic);
    if topic.is_empty() {
        tracing::warn!(sequence = span.sequence, "empty topic; using placeholder");
        topic = "Unknown Topic".to_string();
    }
    let document_name = format!("{topic}_Document");

    let date = model.date.or(deterministic.date);

    let mut question_numbers = deterministic.question_numbers;
    extend_unique(&mut question_numbers, model.question_numbers);

    let mut answer_by = deterministic.answer_by;
    extend_unique(&mut answer_by, sabhalekh_core::clean_list(model.answers_by));

    let question_by = deterministic.question_by;

    // Member-role aggregation: every attributed participant is also a member.
    let mut members = deterministic.members;
    extend_unique(&mut members, sabhalekh_core::clean_list(model.members));
    extend_unique(&mut members, question_by.clone());
    extend_unique(&mut members, answer_by.clone());

    DebateRecord {
        topic,
        text: clean_text(&span.text),
        document_name,
        date,
        question_numbers,
        members,
        question_by,
        answer_by,
        image_names: span.image_names.clone(),
        sequence: span.sequence,
    }
}

fn extend_unique(list: &mut Vec<String>, extra: Vec<String>) {
    for value in extra {
        if !list.iter().any(|v| v == &value) {
            list.push(value);
        }
    }
}
