//! Index/table-of-contents extraction spec.
//!
//! Object-shaped: each chunk yields one `{date, khand, members, resolutions}`
//! record that merges into the running summary. Date and khand are
//! first-found-wins; members deduplicate by name, resolutions by number.
//! Chunks are token-compressed before prompting and the alias mapping is
//! embedded so the model decompresses first.

use serde_json::{Value, json};

use sabhalekh_core::{IndexMember, IndexResolution, IndexSummary};

use crate::engine::ExtractionSpec;
use crate::response::Shape;
use crate::token;

const INDEX_PROMPT: &str = "\
You are a document parser working on Marathi Vidhan Sabha index/table of contents information.

Summary of data extracted from earlier chunks:
{previous_data}

A mapping for token compression is provided below. Before extracting data,
first decompress the text chunk by replacing numbers with their corresponding
words from the mapping:
{mapping}

Extract the following structured data from the given Marathi text chunk:

1. Date information: look for dates near \"दिनांक\" or \"तारीख\"
2. Khand (खंड/section): section numbers like \"खंड १\", \"खंड २\"
3. Members: names of members mentioned in the index
4. Resolutions: resolution numbers, titles and descriptions for the day

Return output as a valid JSON object:
{
  \"date\": \"extracted date in Marathi\",
  \"khand\": \"section number/name\",
  \"members\": [
    { \"name\": \"member name in Marathi\", \"role\": \"role if mentioned\" }
  ],
  \"resolutions\": [
    { \"resolution_no\": \"\", \"title\": \"\", \"description\": \"\", \"page_no\": \"\" }
  ]
}

IMPORTANT rules for the response:
1. Use EXACT text from the input text - do not modify or translate
2. Preserve all Marathi characters, numbers and formatting
3. Do not add any English text or translations
4. DO NOT include data that was already processed in earlier chunks
5. Return empty arrays [] for members and resolutions if none are found
6. Return null for date and khand if not found

Do not return extra text, markdown, or comments.

Text chunk:
{text_chunk}
";

pub struct IndexSpec;

impl ExtractionSpec for IndexSpec {
    type Acc = IndexSummary;

    fn shape(&self) -> Shape {
        Shape::Object
    }

    fn memory_key(&self) -> &str {
        "sabhalekh:memory:index"
    }

    fn build_prompt(&self, memory_json: &str, chunk: &str) -> String {
        let (compressed, mapping) = token::compress(chunk);
        INDEX_PROMPT
            .replace("{previous_data}", memory_json)
            .replace("{mapping}", &token::mapping_json(&mapping))
            .replace("{text_chunk}", &compressed)
    }

    fn absorb(&self, acc: &mut IndexSummary, payload: Value) -> usize {
        let mut added = 0;

        if acc.date.is_none()
            && let Some(date) = payload["date"].as_str().map(str::trim).filter(|d| !d.is_empty())
        {
            acc.date = Some(date.to_string());
            tracing::debug!(date, "index date extracted");
        }
        if acc.khand.is_none()
            && let Some(khand) =
                payload["khand"].as_str().map(str::trim).filter(|k| !k.is_empty())
        {
            acc.khand = Some(khand.to_string());
            tracing::debug!(khand, "index khand extracted");
        }

        for item in payload["members"].as_array().cloned().unwrap_or_default() {
            let Some(name) = item["name"].as_str().map(str::trim).filter(|n| !n.is_empty())
            else {
                continue;
            };
            if acc.members.iter().any(|m| m.name == name) {
                tracing::debug!(name, "duplicate index member discarded");
                continue;
            }
            acc.members.push(IndexMember {
                name: name.to_string(),
                role: item["role"].as_str().unwrap_or("").trim().to_string(),
            });
            added += 1;
        }

        for item in payload["resolutions"].as_array().cloned().unwrap_or_default() {
            let Some(number) = item["resolution_no"]
                .as_str()
                .map(str::trim)
                .filter(|n| !n.is_empty())
            else {
                continue;
            };
            if acc.resolutions.iter().any(|r| r.resolution_no == number) {
                tracing::debug!(number, "duplicate index resolution discarded");
                continue;
            }
            acc.resolutions.push(IndexResolution {
                resolution_no: number.to_string(),
                title: item["title"].as_str().unwrap_or("").trim().to_string(),
                description: item["description"].as_str().unwrap_or("").trim().to_string(),
                page_no: item["page_no"].as_str().unwrap_or("").trim().to_string(),
            });
            added += 1;
        }

        added
    }

    fn memory_snapshot(&self, acc: &IndexSummary, k: usize) -> Value {
        let member_names: Vec<&str> = acc.members.iter().rev().take(k).map(|m| m.name.as_str()).collect();
        let member_names: Vec<&str> = member_names.into_iter().rev().collect();
        let resolution_nos: Vec<&str> = acc
            .resolutions
            .iter()
            .rev()
            .take(k)
            .map(|r| r.resolution_no.as_str())
            .collect();
        let resolution_nos: Vec<&str> = resolution_nos.into_iter().rev().collect();
        json!({
            "date": acc.date,
            "khand": acc.khand,
            "member_names": member_names,
            "resolution_nos": resolution_nos,
        })
    }

    fn empty_memory(&self) -> Value {
        json!({})
    }
}
