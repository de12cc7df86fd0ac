use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::models::{Project, ProjectStep};

/// Per-user project documents with merge-on-write step updates.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn get(&self, owner_id: &str, project_id: &str) -> Result<Option<Project>, StorageError>;

    async fn create(&self, owner_id: &str, title: Option<String>) -> Result<Project, StorageError>;

    /// Merges one step into the project, creating the project if needed.
    async fn merge_step(
        &self,
        owner_id: &str,
        project_id: &str,
        step: ProjectStep,
        data: serde_json::Value,
    ) -> Result<Project, StorageError>;

    /// All of an owner's projects, most recently updated first.
    async fn list(&self, owner_id: &str) -> Result<Vec<Project>, StorageError>;
}

type Key = (String, String);

pub struct MemoryProjectStore {
    namespace: String,
    projects: RwLock<HashMap<String, HashMap<Key, Project>>>,
}

impl MemoryProjectStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            projects: RwLock::new(HashMap::new()),
        }
    }

    fn key(owner_id: &str, project_id: &str) -> Key {
        (owner_id.to_string(), project_id.to_string())
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    async fn get(&self, owner_id: &str, project_id: &str) -> Result<Option<Project>, StorageError> {
        let guard = self.projects.read().await;
        Ok(guard
            .get(&self.namespace)
            .and_then(|docs| docs.get(&Self::key(owner_id, project_id)))
            .cloned())
    }

    async fn create(&self, owner_id: &str, title: Option<String>) -> Result<Project, StorageError> {
        let project_id = uuid::Uuid::new_v4().to_string();
        let project = Project::new(owner_id, &project_id, title);
        let mut guard = self.projects.write().await;
        guard
            .entry(self.namespace.clone())
            .or_default()
            .insert(Self::key(owner_id, &project_id), project.clone());
        tracing::info!(owner_id, project_id = %project_id, "created project");
        Ok(project)
    }

    async fn merge_step(
        &self,
        owner_id: &str,
        project_id: &str,
        step: ProjectStep,
        data: serde_json::Value,
    ) -> Result<Project, StorageError> {
        let mut guard = self.projects.write().await;
        let project = guard
            .entry(self.namespace.clone())
            .or_default()
            .entry(Self::key(owner_id, project_id))
            .or_insert_with(|| Project::new(owner_id, project_id, None));
        project.merge_step(step, data);
        tracing::debug!(owner_id, project_id, step = step.as_str(), "merged project step");
        Ok(project.clone())
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<Project>, StorageError> {
        let guard = self.projects.read().await;
        let mut projects: Vec<Project> = guard
            .get(&self.namespace)
            .map(|docs| {
                docs.values()
                    .filter(|p| p.owner_id == owner_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        projects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(projects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn merge_creates_then_preserves_siblings() {
        let store = MemoryProjectStore::new("test");
        store
            .merge_step("u1", "p1", ProjectStep::Ideas, json!({"options": [1, 2, 3]}))
            .await
            .unwrap();
        let project = store
            .merge_step("u1", "p1", ProjectStep::Outline, json!({"selected": 0}))
            .await
            .unwrap();

        assert_eq!(project.steps.len(), 2);
        assert_eq!(project.steps["ideas"], json!({"options": [1, 2, 3]}));
        assert_eq!(store.get("u1", "p1").await.unwrap(), Some(project));
    }

    #[tokio::test]
    async fn get_misses_other_owners() {
        let store = MemoryProjectStore::new("test");
        let created = store.create("u1", Some("Monsoon".into())).await.unwrap();
        assert!(store.get("u2", &created.project_id).await.unwrap().is_none());
        assert!(store.get("u1", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_orders_by_most_recent_update() {
        let store = MemoryProjectStore::new("test");
        let first = store.create("u1", Some("first".into())).await.unwrap();
        let second = store.create("u1", Some("second".into())).await.unwrap();
        store.create("u2", None).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store
            .merge_step("u1", &first.project_id, ProjectStep::Deck, json!({}))
            .await
            .unwrap();

        let listed: Vec<String> = store
            .list("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.project_id)
            .collect();
        assert_eq!(listed, vec![first.project_id, second.project_id]);
    }
}
