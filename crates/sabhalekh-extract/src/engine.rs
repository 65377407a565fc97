//! The chunked extraction loop with trailing memory.
//!
//! Naive per-chunk extraction re-emits entities that straddle a chunk
//! boundary, so every chunk call carries a bounded snapshot of the most
//! recently accepted entities and every candidate is deduplicated against
//! the full accumulator. Memory stays bounded at the trailing window
//! regardless of document length, keeping prompt size constant.
//!
//! Failure containment: a chunk whose retries exhaust, or whose response
//! cannot be parsed, contributes nothing; later chunks still run. Partial
//! results beat total failure for a multi-chunk document.

use std::time::Duration;

use serde_json::Value;

use sabhalekh_core::{MemoryStore, ModelClient, ModelPacer, RetryPolicy};

use crate::chunk::chunk_lines;
use crate::response::{self, Shape};

/// Behavior of one extractor instantiation: prompt, identity and memory
/// rules. The engine owns the loop; implementations own the domain.
pub trait ExtractionSpec {
    type Acc: Default;

    /// Expected JSON container of a chunk response.
    fn shape(&self) -> Shape;

    /// Memory-store key, namespaced per extractor type.
    fn memory_key(&self) -> &str;

    /// Build the chunk prompt around the trailing-memory JSON and chunk text.
    fn build_prompt(&self, memory_json: &str, chunk: &str) -> String;

    /// Merge a shape-validated payload into the accumulator, dropping
    /// malformed and duplicate items individually. Returns accepted count.
    fn absorb(&self, acc: &mut Self::Acc, payload: Value) -> usize;

    /// Compact trailing snapshot (identifiers only, last `k` entities).
    fn memory_snapshot(&self, acc: &Self::Acc, k: usize) -> Value;

    /// Memory embedded in the first chunk's prompt, before anything is stored.
    fn empty_memory(&self) -> Value {
        Value::Array(Vec::new())
    }
}

/// Tuning for one engine run.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Chunk budget in characters.
    pub chunk_size: usize,
    /// Trailing entities carried across chunk boundaries.
    pub trailing_memory: usize,
    /// Hard cap on input length; longer text is truncated with a warning.
    pub max_text_len: usize,
    /// TTL applied to memory-store writes (`None` = no expiry).
    pub memory_ttl: Option<Duration>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            trailing_memory: 1,
            max_text_len: 150_000,
            memory_ttl: None,
        }
    }
}

/// The reusable chunk loop. All collaborators are injected so tests run
/// against an in-memory store and a scripted model.
pub struct ChunkEngine<'a> {
    pub model: &'a dyn ModelClient,
    pub store: &'a dyn MemoryStore,
    pub pacer: &'a ModelPacer,
    pub retry: RetryPolicy,
}

impl ChunkEngine<'_> {
    /// Run `spec` over `text`, returning the accumulated entities. Never
    /// fails: per-chunk problems degrade to partial output.
    pub async fn run<S: ExtractionSpec>(
        &self,
        spec: &S,
        text: &str,
        options: &EngineOptions,
    ) -> S::Acc {
        let mut acc = S::Acc::default();

        let text = bounded(text, options.max_text_len);
        let chunks = chunk_lines(text, options.chunk_size);
        tracing::info!(
            extractor = spec.memory_key(),
            chunks = chunks.len(),
            chars = text.chars().count(),
            "starting chunked extraction"
        );

        for (i, chunk) in chunks.iter().enumerate() {
            let memory_json = self
                .store
                .get(spec.memory_key())
                .unwrap_or_else(|| spec.empty_memory().to_string());
            let prompt = spec.build_prompt(&memory_json, chunk);

            let Some(raw) = self.call_with_retry(&prompt).await else {
                tracing::error!(
                    extractor = spec.memory_key(),
                    chunk = i + 1,
                    "model retries exhausted; chunk contributes nothing"
                );
                continue;
            };

            let Some(payload) = response::parse_payload(&raw, spec.shape()) else {
                tracing::warn!(
                    extractor = spec.memory_key(),
                    chunk = i + 1,
                    "unusable model response; chunk contributes nothing"
                );
                continue;
            };

            let added = spec.absorb(&mut acc, payload);
            let snapshot = spec.memory_snapshot(&acc, options.trailing_memory);
            self.store
                .set(spec.memory_key(), &snapshot.to_string(), options.memory_ttl);
            tracing::debug!(
                extractor = spec.memory_key(),
                chunk = i + 1,
                total = chunks.len(),
                added,
                "chunk processed"
            );
        }

        acc
    }

    /// Clear this extractor's trailing memory. Called by the pipeline once a
    /// document run finishes.
    pub fn clear_memory<S: ExtractionSpec>(&self, spec: &S) {
        self.store.delete(spec.memory_key());
    }

    /// One model call under the retry policy. Pacing applies to every
    /// attempt, so the first call of a run passes immediately and all later
    /// calls are spaced at the configured period.
    async fn call_with_retry(&self, prompt: &str) -> Option<String> {
        for attempt in 0..=self.retry.max_retries {
            self.pacer.acquire().await;
            match self.model.complete(prompt).await {
                Ok(text) => return Some(text),
                Err(e) => {
                    if e.is_rate_limited() {
                        self.pacer.on_rate_limited();
                    }
                    tracing::warn!(
                        attempt = attempt + 1,
                        attempts = self.retry.max_retries + 1,
                        error = %e,
                        "model call failed"
                    );
                    if attempt < self.retry.max_retries {
                        tokio::time::sleep(self.retry.delay).await;
                    }
                }
            }
        }
        None
    }
}

/// Truncate to `max_chars`, keeping char boundaries.
fn bounded(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => {
            tracing::warn!(
                max_chars,
                "input text exceeds cap; truncating before chunking"
            );
            &text[..idx]
        }
        None => text,
    }
}
