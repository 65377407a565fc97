//! End-to-end document processing: classify pages, segment debates, run the
//! three chunked extractors, build per-debate records, clear memory.
//!
//! Strictly sequential: one page, one chunk, one model call at a time. The
//! pipeline errors only when the output would be structurally meaningless
//! (no section boundaries, no debate spans); everything below that degrades
//! to logged partial results.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sabhalekh_core::config_file::ExtractionConfig;
use sabhalekh_core::{
    DebateRecord, IndexSummary, Member, MemoryStore, ModelClient, ModelPacer, Page, Resolution,
    RetryPolicy, SessionDetails,
};
use sabhalekh_parsing::{
    AnchorPatterns, MatcherConfig, classify_pages, extract_chairman, extract_sitting_date,
    segment, session_details,
};

use crate::debate::DebateBuilder;
use crate::engine::{ChunkEngine, EngineOptions};
use crate::index::IndexSpec;
use crate::members::MemberSpec;
use crate::resolutions::ResolutionSpec;

#[derive(Error, Debug)]
pub enum ExtractError {
    /// No anchor pattern matched any page: section boundaries are fully
    /// undetermined and downstream entities would all be misclassified.
    #[error("no section anchors matched; section boundaries are undetermined")]
    NoSectionBoundaries,
    /// Segmentation produced nothing to attribute text to.
    #[error("debate segmentation produced no spans")]
    NoDebates,
}

/// Everything extracted from one kramank document.
#[derive(Debug, Serialize, Deserialize)]
pub struct KramankRecord {
    pub session: Option<SessionDetails>,
    pub chairman: Option<String>,
    pub date: Option<String>,
    pub index: IndexSummary,
    pub members: Vec<Member>,
    pub resolutions: Vec<Resolution>,
    pub debates: Vec<DebateRecord>,
}

/// Pipeline tuning, resolved from the on-disk config.
#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    pub member_chunk_size: usize,
    pub resolution_chunk_size: usize,
    pub index_chunk_size: usize,
    pub trailing_memory: usize,
    pub max_text_len: usize,
    pub memory_ttl: Option<Duration>,
    /// Skip every model call; deterministic extraction only.
    pub dry_run: bool,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            member_chunk_size: 2000,
            resolution_chunk_size: 2000,
            index_chunk_size: 3000,
            trailing_memory: 1,
            max_text_len: 150_000,
            memory_ttl: None,
            dry_run: false,
        }
    }
}

impl ProcessorOptions {
    pub fn from_config(config: &ExtractionConfig) -> Self {
        let defaults = Self::default();
        Self {
            member_chunk_size: config.member_chunk_size.unwrap_or(defaults.member_chunk_size),
            resolution_chunk_size: config
                .resolution_chunk_size
                .unwrap_or(defaults.resolution_chunk_size),
            index_chunk_size: config.index_chunk_size.unwrap_or(defaults.index_chunk_size),
            trailing_memory: config.trailing_memory.unwrap_or(defaults.trailing_memory),
            max_text_len: config.max_text_len.unwrap_or(defaults.max_text_len),
            memory_ttl: config.memory_ttl_secs.map(Duration::from_secs),
            dry_run: false,
        }
    }

    fn engine_options(&self, chunk_size: usize) -> EngineOptions {
        EngineOptions {
            chunk_size,
            trailing_memory: self.trailing_memory,
            max_text_len: self.max_text_len,
            memory_ttl: self.memory_ttl,
        }
    }
}

/// The document processor. All collaborators are injected; nothing here is
/// global, so two processors never share hidden state.
pub struct DocumentProcessor<'a> {
    pub model: &'a dyn ModelClient,
    pub store: &'a dyn MemoryStore,
    pub pacer: &'a ModelPacer,
    pub retry: RetryPolicy,
    pub anchors: AnchorPatterns,
    pub matcher: MatcherConfig,
    pub options: ProcessorOptions,
}

impl DocumentProcessor<'_> {
    /// Process one document's OCR pages. `folder_path` feeds the
    /// session-details pull and may be omitted.
    pub async fn process(
        &self,
        pages: &[Page],
        folder_path: Option<&Path>,
    ) -> Result<KramankRecord, ExtractError> {
        let sections = classify_pages(pages, &self.anchors);
        if sections.is_degraded() {
            return Err(ExtractError::NoSectionBoundaries);
        }

        let full_text = join_pages(pages);
        let chairman = extract_chairman(&full_text);
        let date = extract_sitting_date(&full_text);
        let session = folder_path.and_then(session_details);
        tracing::info!(
            ?chairman,
            ?date,
            index_pages = sections.index.len(),
            members_pages = sections.members.len(),
            agenda_pages = sections.agenda.len(),
            debates_pages = sections.debates.len(),
            "document sectioned"
        );

        let spans = segment(&sections.debates, &self.matcher);
        if spans.is_empty() {
            return Err(ExtractError::NoDebates);
        }

        let engine = ChunkEngine {
            model: self.model,
            store: self.store,
            pacer: self.pacer,
            retry: self.retry,
        };
        let builder = DebateBuilder {
            model: self.model,
            pacer: self.pacer,
            retry: self.retry,
        };

        let (members, resolutions, index) = if self.options.dry_run {
            tracing::info!("dry run: skipping model-assisted extraction");
            (Vec::new(), Vec::new(), IndexSummary::default())
        } else {
            let members = engine
                .run(
                    &MemberSpec,
                    &join_pages(&sections.members),
                    &self.options.engine_options(self.options.member_chunk_size),
                )
                .await;
            let resolutions = engine
                .run(
                    &ResolutionSpec,
                    &join_pages(&sections.agenda),
                    &self.options.engine_options(self.options.resolution_chunk_size),
                )
                .await;
            let index = engine
                .run(
                    &IndexSpec,
                    &join_pages(&sections.index),
                    &self.options.engine_options(self.options.index_chunk_size),
                )
                .await;
            (members, resolutions, index)
        };

        let mut debates = Vec::with_capacity(spans.len());
        for span in &spans {
            let record = if self.options.dry_run {
                builder.build_offline(span)
            } else {
                builder.build(span).await
            };
            debates.push(record);
        }

        // Memory exists only to bridge chunks within this document run.
        engine.clear_memory(&MemberSpec);
        engine.clear_memory(&ResolutionSpec);
        engine.clear_memory(&IndexSpec);

        tracing::info!(
            members = members.len(),
            resolutions = resolutions.len(),
            debates = debates.len(),
            "document processing complete"
        );
        Ok(KramankRecord {
            session,
            chairman,
            date,
            index,
            members,
            resolutions,
            debates,
        })
    }
}

fn join_pages(pages: &[Page]) -> String {
    pages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use sabhalekh_core::{InMemoryStore, MockModel};

    const MASTHEAD: &str = "महाराष्ट्र शासन\nराज्यपाल यांच्या आदेशानुसार\nश्री. सदस्य यादी";
    const AGENDA: &str = "कार्यावली सोमवार, दिनांक २१ मार्च, २०२२\nठराव क्रमांक १";
    const SITTING: &str = "सोमवार, दिनांक २१ मार्च, २०२२\nविधानसभेची बैठक अकरा वाजता भरली\nअध्यक्ष : मा. श्री. नार्वेकर हे अध्यक्षस्थानी होते";

    fn pages() -> Vec<Page> {
        vec![
            Page {
                image_name: "001.jpg".into(),
                text: "अनुक्रमणिका\nखंड २".into(),
                headings: vec![],
            },
            Page {
                image_name: "002.jpg".into(),
                text: MASTHEAD.into(),
                headings: vec![],
            },
            Page {
                image_name: "003.jpg".into(),
                text: AGENDA.into(),
                headings: vec![],
            },
            Page {
                image_name: "004.jpg".into(),
                text: format!("{SITTING}\nविषय अ\nचर्चेचा मजकूर इथे"),
                headings: vec!["विषय अ".into()],
            },
        ]
    }

    fn processor<'a>(
        model: &'a MockModel,
        store: &'a InMemoryStore,
        pacer: &'a ModelPacer,
        dry_run: bool,
    ) -> DocumentProcessor<'a> {
        DocumentProcessor {
            model,
            store,
            pacer,
            retry: RetryPolicy {
                max_retries: 0,
                delay: Duration::ZERO,
            },
            anchors: AnchorPatterns::default(),
            matcher: MatcherConfig::default(),
            options: ProcessorOptions {
                dry_run,
                ..ProcessorOptions::default()
            },
        }
    }

    #[tokio::test]
    async fn dry_run_produces_records_without_model_calls() {
        let model = MockModel::replying([]);
        let store = InMemoryStore::new();
        let pacer = ModelPacer::new(Duration::ZERO);
        let record = processor(&model, &store, &pacer, true)
            .process(&pages(), Some(Path::new("/data/2022/MLA/Session_1_Budget/K04")))
            .await
            .unwrap();

        assert!(model.prompts().is_empty());
        assert_eq!(record.debates.len(), 1);
        assert_eq!(record.debates[0].topic, "विषय अ");
        assert_eq!(record.debates[0].sequence, 1);
        assert!(record.chairman.as_deref().unwrap().contains("नार्वेकर"));
        assert_eq!(
            record.date.as_deref(),
            Some("सोमवार, दिनांक २१ मार्च, २०२२")
        );
        let session = record.session.unwrap();
        assert_eq!(session.year, "2022");
        assert_eq!(session.house, "MLA");
    }

    #[tokio::test]
    async fn full_run_extracts_and_clears_memory() {
        // One chunk per extractor (members, resolutions, index) plus one
        // debate-field call.
        let model = MockModel::replying([
            r#"[{"name": "श्री. पवार", "role": "मंत्री", "department": "गृह"}]"#,
            r#"[{"resolution_no": "१", "resolution_no_en": "1", "text": "पहिला ठराव"}]"#,
            r#"{"date": "२१ मार्च २०२२", "khand": "खंड २", "members": [], "resolutions": []}"#,
            r#"{"date": "", "question_number": [], "members": [], "topics": [], "answers_by": []}"#,
        ]);
        let store = InMemoryStore::new();
        let pacer = ModelPacer::new(Duration::ZERO);
        let record = processor(&model, &store, &pacer, false)
            .process(&pages(), None)
            .await
            .unwrap();

        assert_eq!(record.members.len(), 1);
        assert_eq!(record.resolutions.len(), 1);
        assert_eq!(record.index.khand.as_deref(), Some("खंड २"));
        assert_eq!(record.debates.len(), 1);

        // Memory was cleared at the end of the document run.
        assert!(store.get("sabhalekh:memory:members").is_none());
        assert!(store.get("sabhalekh:memory:resolutions").is_none());
        assert!(store.get("sabhalekh:memory:index").is_none());
    }

    #[tokio::test]
    async fn no_anchors_is_document_fatal() {
        let model = MockModel::replying([]);
        let store = InMemoryStore::new();
        let pacer = ModelPacer::new(Duration::ZERO);
        let unclassifiable = vec![Page {
            image_name: "001.jpg".into(),
            text: "कुठलाही नांगर नाही".into(),
            headings: vec![],
        }];
        let err = processor(&model, &store, &pacer, true)
            .process(&unclassifiable, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::NoSectionBoundaries));
    }

    #[tokio::test]
    async fn no_debate_spans_is_document_fatal() {
        let model = MockModel::replying([]);
        let store = InMemoryStore::new();
        let pacer = ModelPacer::new(Duration::ZERO);
        // Anchors fire but the debates page has no usable headings and no
        // predecessor to continue.
        let pages = vec![
            Page {
                image_name: "001.jpg".into(),
                text: MASTHEAD.into(),
                headings: vec![],
            },
            Page {
                image_name: "002.jpg".into(),
                text: AGENDA.into(),
                headings: vec![],
            },
            Page {
                image_name: "003.jpg".into(),
                text: SITTING.into(),
                headings: vec![],
            },
        ];
        let err = processor(&model, &store, &pacer, true)
            .process(&pages, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::NoDebates));
    }
}
