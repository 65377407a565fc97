//! Chunked model-assisted extraction with trailing memory, plus the
//! document pipeline tying classification, segmentation and extraction
//! together.

pub mod chunk;
pub mod debate;
pub mod engine;
pub mod index;
pub mod members;
pub mod pipeline;
pub mod resolutions;
pub mod response;
pub mod token;

pub use chunk::chunk_lines;
pub use debate::{DebateBuilder, finalize_record};
pub use engine::{ChunkEngine, EngineOptions, ExtractionSpec};
pub use index::IndexSpec;
pub use members::MemberSpec;
pub use pipeline::{DocumentProcessor, ExtractError, KramankRecord, ProcessorOptions};
pub use resolutions::ResolutionSpec;
pub use response::{Shape, parse_payload, sanitize};
