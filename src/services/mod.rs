pub mod essay_parser;
pub mod judgment_analysis;
pub mod llm_service;
pub mod partitioner;
pub mod perplexity_scorer;
pub mod skip_writer;
pub mod statistics;

pub use llm_service::LlmService;
pub use partitioner::{Partition, PartitionSettings};
pub use perplexity_scorer::{CompletionLogprobScorer, PredictabilityScorer};
pub use skip_writer::SkipWriter;
