//! Resolution (karyavali/ठराव) extraction spec.
//!
//! List-shaped. `resolution_no` and `text` are both required and together
//! form the identity key: agendas occasionally restate a number with
//! different text, and those must stay distinct entries.

use serde_json::{Value, json};

use sabhalekh_core::Resolution;

use crate::engine::ExtractionSpec;
use crate::response::Shape;

const RESOLUTION_PROMPT: &str = "\
You are a document parser working on Marathi Vidhan Sabha karyavali (resolutions).

Resolutions already extracted from earlier chunks (by number):
{previous_resolutions}

Extract the following structured data for every resolution in the text chunk:

- resolution_no: resolution number as written (e.g. \"१\", \"२\", \"३\")
- resolution_no_en: the same number in English digits (e.g. \"1\", \"2\", \"3\")
- text: the complete resolution text

Return output as a valid JSON array:
[
  {
    \"resolution_no\": \"\",
    \"resolution_no_en\": \"\",
    \"text\": \"\"
  }
]

IMPORTANT rules for the response:
1. Use EXACT text from the input text - do not modify or translate
2. Preserve all Marathi characters, numbers and formatting
3. Do not add any English text or translations
4. DO NOT include resolutions that are already listed above
5. Return an empty array [] if no new resolutions are found in this chunk

Do not return extra text, markdown, or comments.

Text chunk:
{text_chunk}
";

pub struct ResolutionSpec;

impl ExtractionSpec for ResolutionSpec {
    type Acc = Vec<Resolution>;

    fn shape(&self) -> Shape {
        Shape::Array
    }

    fn memory_key(&self) -> &str {
        "sabhalekh:memory:resolutions"
    }

    fn build_prompt(&self, memory_json: &str, chunk: &str) -> String {
        RESOLUTION_PROMPT
            .replace("{previous_resolutions}", memory_json)
            .replace("{text_chunk}", chunk)
    }

    fn absorb(&self, acc: &mut Vec<Resolution>, payload: Value) -> usize {
        let mut added = 0;
        for item in payload.as_array().cloned().unwrap_or_default() {
            let number = item["resolution_no"].as_str().map(str::trim);
            let text = item["text"].as_str().map(str::trim);
            let (Some(number), Some(text)) = (number, text) else {
                tracing::debug!("dropping resolution item missing number or text");
                continue;
            };
            if number.is_empty() || text.is_empty() {
                tracing::debug!("dropping resolution item with blank number or text");
                continue;
            }
            let number_en = item["resolution_no_en"].as_str().unwrap_or("").trim();

            let duplicate = acc
                .iter()
                .any(|r| r.resolution_no == number && r.text == text);
            if duplicate {
                tracing::debug!(number, "duplicate resolution discarded");
                continue;
            }
            acc.push(Resolution {
                resolution_no: number.to_string(),
                resolution_no_en: number_en.to_string(),
                text: text.to_string(),
            });
            added += 1;
        }
        added
    }

    fn memory_snapshot(&self, acc: &Vec<Resolution>, k: usize) -> Value {
        let numbers: Vec<&str> = acc
            .iter()
            .rev()
            .take(k)
            .map(|r| r.resolution_no.as_str())
            .collect();
        let numbers: Vec<&str> = numbers.into_iter().rev().collect();
        json!(numbers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_number_and_text() {
        let spec = ResolutionSpec;
        let mut acc = Vec::new();
        let payload = json!([
            {"resolution_no": "१", "text": "पहिला ठराव", "resolution_no_en": "1"},
            {"resolution_no": "२"},
            {"text": "क्रमांक नसलेला"},
        ]);
        assert_eq!(spec.absorb(&mut acc, payload), 1);
        assert_eq!(acc[0].resolution_no, "१");
        assert_eq!(acc[0].resolution_no_en, "1");
    }

    #[test]
    fn identity_is_number_plus_text() {
        let spec = ResolutionSpec;
        let mut acc = Vec::new();
        let payload = json!([
            {"resolution_no": "१", "text": "पहिला ठराव"},
            {"resolution_no": "१", "text": "पहिला ठराव"},
            {"resolution_no": "१", "text": "वेगळा मजकूर"},
        ]);
        assert_eq!(spec.absorb(&mut acc, payload), 2);
    }

    #[test]
    fn snapshot_holds_numbers_only() {
        let spec = ResolutionSpec;
        let acc = vec![
            Resolution {
                resolution_no: "१".into(),
                resolution_no_en: "1".into(),
                text: "खूप लांब ठरावाचा मजकूर".into(),
            },
            Resolution {
                resolution_no: "२".into(),
                resolution_no_en: "2".into(),
                text: "आणखी एक ठराव".into(),
            },
        ];
        let snapshot = spec.memory_snapshot(&acc, 1);
        assert_eq!(snapshot, json!(["२"]));
        // Identifiers only: the resolution text never enters memory.
        assert!(!snapshot.to_string().contains("ठराव"));
    }
}
