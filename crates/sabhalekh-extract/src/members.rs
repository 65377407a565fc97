//! Member-list extraction spec.
//!
//! List-shaped: each chunk yields a JSON array of `{name, role, department}`
//! objects. A name is required; role and department default to empty so a
//! sparsely OCR'd row still produces an entry. Identity is (name, role).

use serde_json::{Value, json};

use sabhalekh_core::Member;

use crate::engine::ExtractionSpec;
use crate::response::Shape;

const MEMBER_PROMPT: &str = "\
You are a document parser working on Marathi Vidhan Sabha member information.

Members already extracted from earlier chunks:
{previous_members}

Extract the following structured data for every member in the text chunk:

- name: full name of the member (e.g. \"श्री. अजित अनंतराव पवार\")
- role: their position (e.g. \"मुख्यमंत्री\", \"उपमुख्यमंत्री\", \"मंत्री\", \"राज्यमंत्री\", \"अध्यक्ष\")
- department: their department/ministry (e.g. \"गृह\", \"नगरविकास\", \"कृषी\", \"ऊर्जा\")

Return output as a valid JSON array:
[
  {
    \"name\": \"\",
    \"role\": \"\",
    \"department\": \"\"
  }
]

IMPORTANT rules for the response:
1. Use EXACT text from the input text - do not modify or translate
2. Preserve all Marathi characters, numbers and formatting
3. Do not add any English text or translations
4. DO NOT include members that are already listed above
5. Return an empty array [] if no new members are found in this chunk
6. A name is required - never skip a name; if role or department is missing, emit the entry with empty strings for them

Do not return extra text, markdown, or comments.

Text chunk:
{text_chunk}
";

pub struct MemberSpec;

impl ExtractionSpec for MemberSpec {
    type Acc = Vec<Member>;

    fn shape(&self) -> Shape {
        Shape::Array
    }

    fn memory_key(&self) -> &str {
        "sabhalekh:memory:members"
    }

    fn build_prompt(&self, memory_json: &str, chunk: &str) -> String {
        MEMBER_PROMPT
            .replace("{previous_members}", memory_json)
            .replace("{text_chunk}", chunk)
    }

    fn absorb(&self, acc: &mut Vec<Member>, payload: Value) -> usize {
        let mut added = 0;
        for item in payload.as_array().cloned().unwrap_or_default() {
            let Some(name) = item["name"].as_str().map(str::trim).filter(|n| !n.is_empty())
            else {
                tracing::debug!("dropping member item without a name");
                continue;
            };
            let role = item["role"].as_str().unwrap_or("").trim();
            let department = item["department"]
                .as_str()
                .or_else(|| item["ministry"].as_str())
                .unwrap_or("")
                .trim();

            let duplicate = acc.iter().any(|m| m.name == name && m.role == role);
            if duplicate {
                tracing::debug!(name, role, "duplicate member discarded");
                continue;
            }
            acc.push(Member {
                name: name.to_string(),
                role: role.to_string(),
                department: department.to_string(),
            });
            added += 1;
        }
        added
    }

    fn memory_snapshot(&self, acc: &Vec<Member>, k: usize) -> Value {
        let names: Vec<&str> = acc.iter().rev().take(k).map(|m| m.name.as_str()).collect();
        let names: Vec<&str> = names.into_iter().rev().collect();
        json!(names)
    }
}
