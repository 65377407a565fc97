use serde::{Deserialize, Serialize};

pub mod config_file;
pub mod memory;
pub mod model;
pub mod rate_limit;
pub mod text;

// Re-export for convenience
pub use config_file::{ConfigFile, load_config};
pub use memory::{InMemoryStore, MemoryStore, SqliteStore};
pub use model::{MockModel, ModelClient, ModelError, OpenRouterClient};
pub use rate_limit::{ModelPacer, RetryPolicy};
pub use text::{clean_list, clean_text};

/// One OCR'd page flowing through the pipeline.
///
/// Produced by the out-of-process OCR collaborator as an entry of
/// `ocr_results.json`; immutable once deserialized. `headings` holds the
/// candidate title lines the upstream layout heuristic flagged (font size +
/// center alignment); not guaranteed accurate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub image_name: String,
    pub text: String,
    #[serde(default)]
    pub headings: Vec<String>,
}

/// Section a page belongs to, in the canonical forward order of a kramank
/// document. Classification only ever advances: once a document has moved
/// to a later section, earlier labels are never assigned again.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SectionLabel {
    #[default]
    Index,
    Members,
    Agenda,
    Debates,
}

impl SectionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionLabel::Index => "index",
            SectionLabel::Members => "members",
            SectionLabel::Agenda => "agenda",
            SectionLabel::Debates => "debates",
        }
    }
}

impl std::fmt::Display for SectionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contiguous block of transcript text attributed to one heading/topic.
///
/// Created by the segmenter when a heading is located on a debates page;
/// continuation pages and repeated headings append to the previous span.
/// Finalized once segmentation completes; downstream treats it read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateSpan {
    pub topic: String,
    pub text: String,
    pub image_names: Vec<String>,
    /// 1-based first-occurrence order within the kramank.
    pub sequence: usize,
}

/// A sitting member extracted from the members-list section.
/// Identity key for deduplication: (name, role).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub department: String,
}

/// A numbered resolution (ठराव) from the agenda/karyavali section.
/// Identity key for deduplication: (resolution_no, text).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub resolution_no: String,
    #[serde(default)]
    pub resolution_no_en: String,
    pub text: String,
}

/// Member entry as it appears in the index/table-of-contents section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMember {
    pub name: String,
    #[serde(default)]
    pub role: String,
}

/// Resolution entry as it appears in the index section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexResolution {
    pub resolution_no: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub page_no: String,
}

/// Accumulated summary of the index section. `date` and `khand` are
/// first-found-wins across chunks; members/resolutions are deduplicated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexSummary {
    pub date: Option<String>,
    pub khand: Option<String>,
    pub members: Vec<IndexMember>,
    pub resolutions: Vec<IndexResolution>,
}

/// The fully structured record for one debate span. One per span, never
/// deduplicated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateRecord {
    pub topic: String,
    pub text: String,
    pub document_name: String,
    pub date: Option<String>,
    pub question_numbers: Vec<String>,
    pub members: Vec<String>,
    pub question_by: Vec<String>,
    pub answer_by: Vec<String>,
    pub image_names: Vec<String>,
    pub sequence: usize,
}

/// Session attributes recovered from the document folder path
/// (e.g. `.../2022/MLA/Session_1_Budget/Kramank_04`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetails {
    pub year: String,
    pub house: String,
    pub session_type: String,
    pub kramank_name: String,
}
