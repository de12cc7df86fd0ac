use std::time::Duration;

use crate::config::Config;
use crate::models::{ArtifactKind, GenerationRequest, ModelInvocation};
use crate::utils::truncate_chars;

/// Maximum characters of uploaded text embedded in an ingest prompt.
pub const UPLOAD_CHAR_BUDGET: usize = 15_000;

const IDEA_PERSONA: &str = "You are a multilingual film/series ideation assistant for Indian markets. \
Return 3 sharp loglines, each with a 1-paragraph premise.";

const OUTLINE_PERSONA: &str = "You are a professional story editor. Produce 3 alternative beat-sheets \
with acts/episodes, character bios, and world notes. Keep each concise and production-ready.";

const SCRIPT_PERSONA: &str = "You are a screenwriter. Expand the outline into 3 alternative sets of \
screenplay pages in Fountain-like format. Keep dialogue punchy; format with scene headers.";

const DECK_PERSONA: &str = "You are a pitch-deck producer for film/series. Create one structured deck \
with slides: Title, Logline, Synopsis, Characters, World, Toneboard, Comparables, CTA.";

const INGEST_PERSONA: &str = "You are a development exec. From the uploaded script text, extract: \
title, logline, synopsis, characters, world, themes, and comparables.";

fn output_schema(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Idea => r#"{"options":[{"logline":string,"premise":string}]}"#,
        ArtifactKind::Outline => r#"{"options":[{"outline":string}]}"#,
        ArtifactKind::Script => r#"{"options":[{"script":string}]}"#,
        ArtifactKind::DeckBuild => {
            r#"{"options":[{"deck":{"title":string,"slides":[{"heading":string,"body":string}]}}]}"#
        }
    }
}

/// The machine-checkable output directive appended to every generation persona.
pub fn schema_directive(kind: ArtifactKind) -> String {
    format!(
        "Return ONLY valid JSON matching schema: {} with exactly {} item(s) in \"options\". \
Do not wrap the JSON in markdown code fences and do not add any prose before or after it.",
        output_schema(kind),
        kind.option_count()
    )
}

/// Turns typed requests into model invocations. Holds no per-request state.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    model_id: String,
    timeout: Duration,
}

impl PromptBuilder {
    pub fn new(config: &Config) -> Self {
        Self {
            model_id: config.model_name.clone(),
            timeout: config.timeout,
        }
    }

    pub fn build(&self, request: &GenerationRequest) -> ModelInvocation {
        let kind = request.kind();
        let persona = match kind {
            ArtifactKind::Idea => IDEA_PERSONA,
            ArtifactKind::Outline => OUTLINE_PERSONA,
            ArtifactKind::Script => SCRIPT_PERSONA,
            ArtifactKind::DeckBuild => DECK_PERSONA,
        };

        let user_content = match request {
            GenerationRequest::Idea(r) => format!(
                "Language: {}\nGenre: {}\nTone: {}\nSeed: {}",
                r.language, r.genre, r.tone, r.seed
            ),
            GenerationRequest::Outline(r) => format!(
                "Structure: {}\nStyle: {}\nLanguage: {}\nLogline: {}",
                r.structure, r.style, r.language, r.logline
            ),
            GenerationRequest::Script(r) => format!(
                "Style: {}\nLanguage: {}\nOutline:\n{}",
                r.style, r.language, r.outline
            ),
            // Plain string fields only, so serialization cannot fail.
            GenerationRequest::DeckBuild(r) => serde_json::to_string(r).unwrap_or_default(),
        };

        self.invocation(format!("{persona} {}", schema_directive(kind)), user_content)
    }

    /// Builds the extraction prompt for an uploaded document.
    ///
    /// Only the first [`UPLOAD_CHAR_BUDGET`] characters of `text` are embedded.
    pub fn build_ingest(&self, text: &str, language: &str) -> ModelInvocation {
        let excerpt = truncate_chars(text, UPLOAD_CHAR_BUDGET);
        self.invocation(
            format!("{INGEST_PERSONA} Answer in plain text without markdown fences."),
            format!("Language: {language}\nTEXT:\n{excerpt}"),
        )
    }

    fn invocation(&self, system_instruction: String, user_content: String) -> ModelInvocation {
        ModelInvocation {
            system_instruction,
            user_content,
            model_id: self.model_id.clone(),
            timeout: self.timeout,
        }
    }
}
