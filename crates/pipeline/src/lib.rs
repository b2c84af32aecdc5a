//! ContextFlow Pipeline
//!
//! The multi-source extraction-aggregation-synthesis core:
//! - Per-source fetching with isolated failures
//! - Bounded aggregation and combined-context construction
//! - Single stateful model session per run, prompts serialized
//! - Parsing of unstructured model output into structured records

pub mod aggregate;
pub mod parser;
pub mod session;
pub mod source;
pub mod synthesis;

pub use aggregate::{Aggregation, ContentAggregator};
pub use session::SessionManager;
pub use source::{FetchFailure, Source, SourceDescriptor, SourceFetcher};
pub use synthesis::{Analysis, Answer, SourceCitation, Summary, SynthesisPipeline};
