use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::models::{
    ArtifactKind, DeckOption, ExtractedOption, IdeaOption, OptionSet, OutlineOption, ScriptOption,
};
use crate::utils::truncate_chars;

/// Why raw model text could not be read as the expected shape.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseFailure {
    #[error("model output is not valid JSON: {0}")]
    NotJson(String),
    #[error("model output has no \"options\" array")]
    MissingOptions,
    #[error("deck reply holds no usable deck")]
    EmptyDeck,
}

/// Parses raw model text into typed options for `kind`.
///
/// Expects an object with an `options` array. For decks a bare object without
/// `options` is also accepted and treated as the single deck. Array items that
/// do not match the kind's schema are skipped; a deck array with nothing usable
/// is a failure so the raw text can survive through the fallback.
pub fn try_parse(kind: ArtifactKind, raw_text: &str) -> Result<Vec<ExtractedOption>, ParseFailure> {
    let value: Value =
        serde_json::from_str(raw_text.trim()).map_err(|e| ParseFailure::NotJson(e.to_string()))?;

    let Value::Object(mut root) = value else {
        return Err(ParseFailure::MissingOptions);
    };

    match root.remove("options") {
        Some(Value::Array(items)) => {
            let total = items.len();
            let options: Vec<ExtractedOption> = items
                .into_iter()
                .filter_map(|item| parse_item(kind, item))
                .collect();
            if options.len() < total {
                tracing::warn!(
                    kind = kind.as_str(),
                    skipped = total - options.len(),
                    "dropped options that did not match the schema"
                );
            }
            if kind == ArtifactKind::DeckBuild && options.is_empty() {
                return Err(ParseFailure::EmptyDeck);
            }
            Ok(options)
        }
        None if kind == ArtifactKind::DeckBuild && !root.is_empty() => {
            Ok(vec![ExtractedOption::Deck(DeckOption { deck: root })])
        }
        _ => Err(ParseFailure::MissingOptions),
    }
}

fn parse_item(kind: ArtifactKind, item: Value) -> Option<ExtractedOption> {
    fn typed<T: DeserializeOwned>(item: Value) -> Option<T> {
        serde_json::from_value(item).ok()
    }

    match kind {
        ArtifactKind::Idea => typed::<IdeaOption>(item).map(ExtractedOption::Idea),
        ArtifactKind::Outline => typed::<OutlineOption>(item).map(ExtractedOption::Outline),
        ArtifactKind::Script => typed::<ScriptOption>(item).map(ExtractedOption::Script),
        // Items without the `deck` wrapper are taken as the deck itself.
        ArtifactKind::DeckBuild => match item {
            Value::Object(mut map) => {
                let deck = match map.remove("deck") {
                    Some(Value::Object(inner)) if map.is_empty() => inner,
                    Some(other) => {
                        map.insert("deck".to_string(), other);
                        map
                    }
                    None => map,
                };
                Some(ExtractedOption::Deck(DeckOption { deck }))
            }
            _ => None,
        },
    }
}

/// What a caller gets back when the model output could not be parsed.
///
/// List kinds degrade to no options. A deck degrades to a single deck holding
/// the raw text under `raw`, so the output stays inspectable and exportable.
pub fn fallback_policy(kind: ArtifactKind, raw_text: &str, _failure: &ParseFailure) -> Vec<ExtractedOption> {
    match kind {
        ArtifactKind::Idea | ArtifactKind::Outline | ArtifactKind::Script => Vec::new(),
        ArtifactKind::DeckBuild => {
            let mut deck = Map::new();
            deck.insert("raw".to_string(), Value::String(raw_text.to_string()));
            vec![ExtractedOption::Deck(DeckOption { deck })]
        }
    }
}

/// Parses with a caller-supplied fallback. Never fails.
pub fn extract_with<F>(kind: ArtifactKind, raw_text: &str, fallback: F) -> OptionSet
where
    F: FnOnce(ArtifactKind, &str, &ParseFailure) -> Vec<ExtractedOption>,
{
    let options = match try_parse(kind, raw_text) {
        Ok(options) => options,
        Err(failure) => {
            tracing::warn!(
                kind = kind.as_str(),
                reason = %failure,
                raw = truncate_chars(raw_text, 200),
                "model output degraded to fallback"
            );
            fallback(kind, raw_text, &failure)
        }
    };

    OptionSet {
        kind,
        options,
        partial: false,
    }
}

pub fn extract(kind: ArtifactKind, raw_text: &str) -> OptionSet {
    extract_with(kind, raw_text, fallback_policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_well_formed_ideas_in_order() {
        let raw = r#"{"options":[{"logline":"A","premise":"B"},{"logline":"C","premise":"D"}]}"#;
        let set = extract(ArtifactKind::Idea, raw);
        assert_eq!(
            set.options,
            vec![
                ExtractedOption::Idea(IdeaOption { logline: "A".into(), premise: "B".into() }),
                ExtractedOption::Idea(IdeaOption { logline: "C".into(), premise: "D".into() }),
            ]
        );
    }

    #[test]
    fn invalid_json_yields_empty_options() {
        let set = extract(ArtifactKind::Outline, "not json");
        assert!(set.is_empty());
        assert_eq!(serde_json::to_value(&set).unwrap(), json!({"options": []}));
    }

    #[test]
    fn markdown_fenced_output_is_not_accepted() {
        let raw = "```json\n{\"options\":[{\"script\":\"x\"}]}\n```";
        assert!(matches!(try_parse(ArtifactKind::Script, raw), Err(ParseFailure::NotJson(_))));
    }

    #[test]
    fn wrong_top_level_shape_is_a_failure() {
        assert_eq!(try_parse(ArtifactKind::Idea, "[1,2,3]"), Err(ParseFailure::MissingOptions));
        assert_eq!(
            try_parse(ArtifactKind::Idea, r#"{"ideas":[]}"#),
            Err(ParseFailure::MissingOptions)
        );
        assert_eq!(
            try_parse(ArtifactKind::Script, r#"{"options":"three"}"#),
            Err(ParseFailure::MissingOptions)
        );
    }

    #[test]
    fn items_off_schema_are_skipped() {
        let raw = r#"{"options":[{"outline":"one"},{"beats":["x"]},{"outline":7},{"outline":"two"}]}"#;
        let options = try_parse(ArtifactKind::Outline, raw).unwrap();
        assert_eq!(
            options,
            vec![
                ExtractedOption::Outline(OutlineOption { outline: "one".into() }),
                ExtractedOption::Outline(OutlineOption { outline: "two".into() }),
            ]
        );
    }

    #[test]
    fn bare_deck_object_is_accepted() {
        let raw = r#"{"title":"Monsoon","slides":[]}"#;
        let options = try_parse(ArtifactKind::DeckBuild, raw).unwrap();
        match &options[..] {
            [ExtractedOption::Deck(d)] => assert_eq!(d.deck["title"], "Monsoon"),
            other => panic!("unexpected options: {other:?}"),
        }
    }

    #[test]
    fn deck_items_without_wrapper_are_kept() {
        let raw = r#"{"options":[{"title":"Monsoon","slides":[{"heading":"Hook"}]}]}"#;
        let set = crate::services::bounder::bound_set(extract(ArtifactKind::DeckBuild, raw));
        assert_eq!(
            serde_json::to_value(&set).unwrap(),
            json!({"options": [{"deck": {"title": "Monsoon", "slides": [{"heading": "Hook"}]}}]})
        );
    }

    #[test]
    fn deck_array_with_nothing_usable_keeps_raw_text() {
        let raw = r#"{"options":["Monsoon", 7]}"#;
        assert_eq!(try_parse(ArtifactKind::DeckBuild, raw), Err(ParseFailure::EmptyDeck));
        let set = extract(ArtifactKind::DeckBuild, raw);
        assert_eq!(
            serde_json::to_value(&set).unwrap(),
            json!({"options": [{"deck": {"raw": raw}}]})
        );
    }

    #[test]
    fn unparseable_deck_wraps_raw_text() {
        let set = extract(ArtifactKind::DeckBuild, "Slide 1: Monsoon");
        assert_eq!(
            serde_json::to_value(&set).unwrap(),
            json!({"options": [{"deck": {"raw": "Slide 1: Monsoon"}}]})
        );
    }

    #[test]
    fn caller_fallback_is_used_on_failure() {
        let set = extract_with(ArtifactKind::Script, "{", |_, raw, _| {
            vec![ExtractedOption::Script(ScriptOption { script: raw.to_string() })]
        });
        assert_eq!(set.options, vec![ExtractedOption::Script(ScriptOption { script: "{".into() })]);
    }
}
