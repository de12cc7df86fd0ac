use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Wizard steps whose output can be saved on a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStep {
    Ideas,
    Outline,
    Script,
    Deck,
}

impl ProjectStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ideas => "ideas",
            Self::Outline => "outline",
            Self::Script => "script",
            Self::Deck => "deck",
        }
    }
}

impl FromStr for ProjectStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ideas" => Ok(Self::Ideas),
            "outline" => Ok(Self::Outline),
            "script" => Ok(Self::Script),
            "deck" => Ok(Self::Deck),
            other => Err(format!(
                "unknown step {other:?}, expected one of ideas, outline, script, deck"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub owner_id: String,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Last saved payload per step name.
    #[serde(default)]
    pub steps: BTreeMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(owner_id: &str, project_id: &str, title: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            owner_id: owner_id.to_string(),
            project_id: project_id.to_string(),
            title,
            steps: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces one step's payload, leaving sibling steps untouched.
    pub fn merge_step(&mut self, step: ProjectStep, data: serde_json::Value) {
        self.steps.insert(step.as_str().to_string(), data);
        self.updated_at = Utc::now().max(self.updated_at);
    }

    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary {
            project_id: self.project_id.clone(),
            title: self.title.clone(),
            steps: self.steps.keys().cloned().collect(),
            updated_at: self.updated_at,
        }
    }
}

/// Listing entry; omits step payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSummary {
    pub project_id: String,
    pub title: Option<String>,
    pub steps: Vec<String>,
    pub updated_at: DateTime<Utc>,
}
