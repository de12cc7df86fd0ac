use serde::Serialize;

use crate::error::PipelineError;
use crate::services::pipeline::GenerationPipeline;
use crate::utils::decode_text_lossy;

pub const DEFAULT_UPLOAD_NAME: &str = "upload.txt";

/// A document uploaded for extraction, as received from the client.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub language: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestResult {
    pub extracted: String,
    pub filename: String,
}

/// Decodes the upload and asks the model to pull out the pitch essentials.
pub async fn ingest_upload(pipeline: &GenerationPipeline, upload: Upload) -> Result<IngestResult, PipelineError> {
    let text = decode_text_lossy(&upload.bytes);
    tracing::info!(
        filename = %upload.filename,
        language = %upload.language,
        chars = text.chars().count(),
        "ingesting upload"
    );
    let extracted = pipeline.ingest(&text, &upload.language).await?;
    Ok(IngestResult {
        extracted,
        filename: upload.filename,
    })
}
