use serde::{Deserialize, Serialize};

use crate::error::ApiError;

fn default_language() -> String {
    "en".to_string()
}

fn default_structure() -> String {
    "film".to_string()
}

fn default_style() -> String {
    "Bollywood high-concept thriller".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Idea,
    Outline,
    Script,
    DeckBuild,
}

impl ArtifactKind {
    /// Number of options promised to the caller for this kind.
    pub fn option_count(self) -> usize {
        match self {
            Self::Idea | Self::Outline | Self::Script => 3,
            Self::DeckBuild => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idea => "idea",
            Self::Outline => "outline",
            Self::Script => "script",
            Self::DeckBuild => "deck_build",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdeaRequest {
    pub genre: String,
    pub tone: String,
    pub seed: String,
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineRequest {
    pub logline: String,
    #[serde(default = "default_structure")]
    pub structure: String,
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptRequest {
    pub outline: String,
    pub style: String,
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckRequest {
    pub title: String,
    pub logline: String,
    pub synopsis: String,
    pub characters: String,
    pub world: String,
    pub comps: String,
    #[serde(default)]
    pub toneboard: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
}

/// A typed generation request; the variant decides prompt shape and output schema.
#[derive(Debug, Clone)]
pub enum GenerationRequest {
    Idea(IdeaRequest),
    Outline(OutlineRequest),
    Script(ScriptRequest),
    DeckBuild(DeckRequest),
}

impl GenerationRequest {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Self::Idea(_) => ArtifactKind::Idea,
            Self::Outline(_) => ArtifactKind::Outline,
            Self::Script(_) => ArtifactKind::Script,
            Self::DeckBuild(_) => ArtifactKind::DeckBuild,
        }
    }

    /// Rejects requests whose required fields are blank after trimming.
    pub fn validate(&self) -> Result<(), ApiError> {
        let fields: Vec<(&str, &str)> = match self {
            Self::Idea(r) => vec![
                ("genre", r.genre.as_str()),
                ("tone", r.tone.as_str()),
                ("seed", r.seed.as_str()),
                ("language", r.language.as_str()),
            ],
            Self::Outline(r) => vec![
                ("logline", r.logline.as_str()),
                ("structure", r.structure.as_str()),
                ("style", r.style.as_str()),
                ("language", r.language.as_str()),
            ],
            Self::Script(r) => vec![
                ("outline", r.outline.as_str()),
                ("style", r.style.as_str()),
                ("language", r.language.as_str()),
            ],
            Self::DeckBuild(r) => vec![
                ("title", r.title.as_str()),
                ("logline", r.logline.as_str()),
                ("synopsis", r.synopsis.as_str()),
                ("characters", r.characters.as_str()),
                ("world", r.world.as_str()),
                ("comps", r.comps.as_str()),
                ("language", r.language.as_str()),
            ],
        };

        let blank: Vec<&str> = fields
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect();

        if blank.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(format!(
                "{} request has blank required fields: {}",
                self.kind().as_str(),
                blank.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_optional_fields() {
        let req: OutlineRequest = serde_json::from_str(r#"{"logline":"A heist in Mumbai"}"#).unwrap();
        assert_eq!(req.structure, "film");
        assert_eq!(req.style, "Bollywood high-concept thriller");
        assert_eq!(req.language, "en");

        let deck: DeckRequest = serde_json::from_str(
            r#"{"title":"T","logline":"L","synopsis":"S","characters":"C","world":"W","comps":"X"}"#,
        )
        .unwrap();
        assert!(deck.toneboard.is_none());
    }

    #[test]
    fn blank_fields_fail_validation() {
        let req = GenerationRequest::Idea(IdeaRequest {
            genre: "thriller".into(),
            tone: "  ".into(),
            seed: "".into(),
            language: "en".into(),
        });
        let err = req.validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("tone"));
        assert!(message.contains("seed"));
        assert!(!message.contains("genre"));
    }

    #[test]
    fn optional_toneboard_may_be_blank() {
        let req = GenerationRequest::DeckBuild(DeckRequest {
            title: "Monsoon".into(),
            logline: "L".into(),
            synopsis: "S".into(),
            characters: "C".into(),
            world: "W".into(),
            comps: "X".into(),
            toneboard: Some(String::new()),
            language: "hi".into(),
        });
        assert!(req.validate().is_ok());
    }

    #[test]
    fn option_counts_per_kind() {
        assert_eq!(ArtifactKind::Idea.option_count(), 3);
        assert_eq!(ArtifactKind::Outline.option_count(), 3);
        assert_eq!(ArtifactKind::Script.option_count(), 3);
        assert_eq!(ArtifactKind::DeckBuild.option_count(), 1);
    }
}
