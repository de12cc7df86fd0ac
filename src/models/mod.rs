mod option;
mod project;
mod request;

pub use option::{
    DeckOption, ExtractedOption, IdeaOption, ModelInvocation, ModelResponse, OptionSet,
    OutlineOption, ScriptOption,
};
pub use project::{Project, ProjectStep, ProjectSummary};
pub use request::{
    ArtifactKind, DeckRequest, GenerationRequest, IdeaRequest, OutlineRequest, ScriptRequest,
};
