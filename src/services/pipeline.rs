use std::sync::Arc;
use std::time::Instant;

use crate::error::PipelineError;
use crate::models::{GenerationRequest, OptionSet};
use crate::services::bounder::bound_set;
use crate::services::extractor::extract;
use crate::services::llm::ModelInvoker;
use crate::services::prompt::PromptBuilder;

/// Prompt → model → extraction → bounding, one request at a time.
///
/// Only configuration and upstream failures escape; malformed model output
/// degrades to a fallback option set instead.
pub struct GenerationPipeline {
    prompts: PromptBuilder,
    invoker: Arc<dyn ModelInvoker>,
}

impl GenerationPipeline {
    pub fn new(prompts: PromptBuilder, invoker: Arc<dyn ModelInvoker>) -> Self {
        Self { prompts, invoker }
    }

    pub async fn generate(&self, request: &GenerationRequest) -> Result<OptionSet, PipelineError> {
        let kind = request.kind();
        let started = Instant::now();

        let invocation = self.prompts.build(request);
        let response = self.invoker.invoke(&invocation).await?;
        let set = bound_set(extract(kind, &response.raw_text));

        tracing::info!(
            kind = kind.as_str(),
            options = set.len(),
            partial = set.partial,
            upstream = ?response.upstream_status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "generation finished"
        );
        Ok(set)
    }

    /// Asks the model to summarize an uploaded document. Returns its raw text.
    pub async fn ingest(&self, text: &str, language: &str) -> Result<String, PipelineError> {
        let invocation = self.prompts.build_ingest(text, language);
        let response = self.invoker.invoke(&invocation).await?;
        Ok(response.raw_text)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::{ConfigError, UpstreamError, UpstreamStatus};
    use crate::models::{
        DeckRequest, ExtractedOption, IdeaRequest, ModelInvocation, ModelResponse, ScriptRequest,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Replays canned model output and records every invocation it sees.
    pub(crate) struct ScriptedInvoker {
        reply: Result<String, UpstreamStatus>,
        pub(crate) seen: Mutex<Vec<ModelInvocation>>,
    }

    impl ScriptedInvoker {
        pub(crate) fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn failing(status: UpstreamStatus) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(status),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ModelInvoker for ScriptedInvoker {
        async fn invoke(&self, invocation: &ModelInvocation) -> Result<ModelResponse, PipelineError> {
            self.seen.lock().unwrap().push(invocation.clone());
            match &self.reply {
                Ok(text) => Ok(ModelResponse {
                    raw_text: text.clone(),
                    upstream_status: UpstreamStatus::Ok,
                }),
                Err(status) => Err(UpstreamError::new(*status, "scripted failure").into()),
            }
        }
    }

    fn pipeline(invoker: Arc<ScriptedInvoker>) -> GenerationPipeline {
        GenerationPipeline::new(PromptBuilder::new(&Config::default()), invoker)
    }

    fn idea_request() -> GenerationRequest {
        GenerationRequest::Idea(IdeaRequest {
            genre: "thriller".into(),
            tone: "tense".into(),
            seed: "monsoon".into(),
            language: "en".into(),
        })
    }

    #[tokio::test]
    async fn three_well_formed_ideas_come_back_in_order() {
        let raw = json!({"options": [
            {"logline": "one", "premise": "p1"},
            {"logline": "two", "premise": "p2"},
            {"logline": "three", "premise": "p3"}
        ]})
        .to_string();
        let set = pipeline(ScriptedInvoker::replying(&raw))
            .generate(&idea_request())
            .await
            .unwrap();

        let loglines: Vec<&str> = set
            .options
            .iter()
            .map(|o| match o {
                ExtractedOption::Idea(idea) => idea.logline.as_str(),
                other => panic!("unexpected option {other:?}"),
            })
            .collect();
        assert_eq!(loglines, vec!["one", "two", "three"]);
        assert!(!set.partial);
    }

    #[tokio::test]
    async fn malformed_output_degrades_instead_of_failing() {
        let invoker = ScriptedInvoker::replying("Sure! Here are some scripts...");
        let set = pipeline(invoker.clone())
            .generate(&GenerationRequest::Script(ScriptRequest {
                outline: "Act 1".into(),
                style: "noir".into(),
                language: "en".into(),
            }))
            .await
            .unwrap();
        assert!(set.is_empty());
        assert!(set.partial);
        assert_eq!(invoker.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deck_build_returns_at_most_one_option() {
        let raw = json!({"options": [{"deck": {"title": "A"}}, {"deck": {"title": "B"}}]}).to_string();
        let set = pipeline(ScriptedInvoker::replying(&raw))
            .generate(&GenerationRequest::DeckBuild(DeckRequest {
                title: "A".into(),
                logline: "L".into(),
                synopsis: "S".into(),
                characters: "C".into(),
                world: "W".into(),
                comps: "X".into(),
                toneboard: Some("neon".into()),
                language: "en".into(),
            }))
            .await
            .unwrap();
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn upstream_failures_propagate() {
        let err = pipeline(ScriptedInvoker::failing(UpstreamStatus::Timeout))
            .generate(&idea_request())
            .await
            .unwrap_err();
        match err {
            PipelineError::Upstream(e) => assert_eq!(e.status, UpstreamStatus::Timeout),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn config_errors_propagate() {
        struct NoKey;

        #[async_trait]
        impl ModelInvoker for NoKey {
            async fn invoke(&self, _: &ModelInvocation) -> Result<ModelResponse, PipelineError> {
                Err(ConfigError::MissingApiKey.into())
            }
        }

        let pipeline = GenerationPipeline::new(PromptBuilder::new(&Config::default()), Arc::new(NoKey));
        let err = pipeline.generate(&idea_request()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Config(ConfigError::MissingApiKey)));
    }

    #[tokio::test]
    async fn ingest_returns_raw_model_text() {
        let invoker = ScriptedInvoker::replying("Title: Monsoon");
        let text = "x".repeat(20_000);
        let extracted = pipeline(invoker.clone()).ingest(&text, "en").await.unwrap();
        assert_eq!(extracted, "Title: Monsoon");
        let seen = invoker.seen.lock().unwrap();
        assert!(seen[0].user_content.len() < 15_100);
    }
}
