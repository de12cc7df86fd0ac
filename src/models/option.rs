use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::ArtifactKind;
use crate::error::UpstreamStatus;

/// Everything needed for one upstream call. Built fresh per request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInvocation {
    pub system_instruction: String,
    pub user_content: String,
    pub model_id: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub raw_text: String,
    pub upstream_status: UpstreamStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaOption {
    pub logline: String,
    pub premise: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineOption {
    pub outline: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptOption {
    pub script: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckOption {
    pub deck: serde_json::Map<String, serde_json::Value>,
}

/// One candidate artifact. Serializes to the kind's bare object shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExtractedOption {
    Idea(IdeaOption),
    Outline(OutlineOption),
    Script(ScriptOption),
    Deck(DeckOption),
}

/// Ordered candidates for a single generation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionSet {
    #[serde(skip)]
    pub kind: ArtifactKind,
    pub options: Vec<ExtractedOption>,
    /// Set when the model returned fewer options than the kind promises.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub partial: bool,
}

impl OptionSet {
    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn option_set_serializes_to_wire_shape() {
        let set = OptionSet {
            kind: ArtifactKind::Idea,
            options: vec![ExtractedOption::Idea(IdeaOption {
                logline: "A".into(),
                premise: "B".into(),
            })],
            partial: false,
        };
        assert_eq!(
            serde_json::to_value(&set).unwrap(),
            json!({"options": [{"logline": "A", "premise": "B"}]})
        );
    }

    #[test]
    fn partial_flag_only_appears_when_set() {
        let set = OptionSet {
            kind: ArtifactKind::Script,
            options: Vec::new(),
            partial: true,
        };
        assert_eq!(
            serde_json::to_value(&set).unwrap(),
            json!({"options": [], "partial": true})
        );
    }
}
