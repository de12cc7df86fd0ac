pub mod bounder;
pub mod export;
pub mod extractor;
pub mod ingest;
pub mod llm;
pub mod pipeline;
pub mod prompt;
