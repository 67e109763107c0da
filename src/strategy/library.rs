use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::graph::StrategyGraph;

/// Lifecycle of a saved strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyStatus {
    Draft,
    Active,
    Inactive,
}

impl StrategyStatus {
    pub fn label(&self) -> &'static str {
        match self {
            StrategyStatus::Draft => "Draft",
            StrategyStatus::Active => "Active",
            StrategyStatus::Inactive => "Inactive",
        }
    }
}

/// Authoring payload; an `id` of an existing strategy saves a new version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyDraft {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub graph: StrategyGraph,
    #[serde(default)]
    pub created_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedStrategy {
    pub id: String,
    pub name: String,
    pub description: String,
    pub graph: StrategyGraph,
    pub status: StrategyStatus,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StrategyLibraryError {
    #[error("strategy {0} not found")]
    NotFound(String),
}

/// Named strategy versions with at most one active entry.
#[derive(Debug, Clone, Default)]
pub struct StrategyLibrary {
    strategies: Vec<SavedStrategy>,
    sequence: u64,
}

impl StrategyLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> &[SavedStrategy] {
        &self.strategies
    }

    pub fn get(&self, id: &str) -> Option<&SavedStrategy> {
        self.strategies.iter().find(|strategy| strategy.id == id)
    }

    pub fn active(&self) -> Option<&SavedStrategy> {
        self.strategies
            .iter()
            .find(|strategy| strategy.status == StrategyStatus::Active)
    }

    /// Stores a draft. Re-saving an existing id replaces its graph, bumps the
    /// version and keeps its status.
    pub fn save(&mut self, draft: StrategyDraft, now: DateTime<Utc>) -> SavedStrategy {
        if let Some(existing) = draft
            .id
            .as_deref()
            .and_then(|id| self.strategies.iter_mut().find(|strategy| strategy.id == id))
        {
            existing.name = draft.name;
            existing.description = draft.description;
            existing.graph = draft.graph;
            existing.version += 1;
            existing.updated_at = now;
            return existing.clone();
        }

        let id = match draft.id {
            Some(id) => id,
            None => self.next_id(),
        };
        let saved = SavedStrategy {
            id,
            name: draft.name,
            description: draft.description,
            graph: draft.graph,
            status: StrategyStatus::Draft,
            version: 1,
            created_at: now,
            updated_at: now,
            created_by: draft.created_by,
        };
        self.strategies.push(saved.clone());
        saved
    }

    /// Marks `id` active and demotes whichever strategy was active before.
    pub fn activate(
        &mut self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<&SavedStrategy, StrategyLibraryError> {
        let index = self
            .strategies
            .iter()
            .position(|strategy| strategy.id == id)
            .ok_or_else(|| StrategyLibraryError::NotFound(id.to_string()))?;

        for (position, strategy) in self.strategies.iter_mut().enumerate() {
            if position == index {
                strategy.status = StrategyStatus::Active;
                strategy.updated_at = now;
            } else if strategy.status == StrategyStatus::Active {
                strategy.status = StrategyStatus::Inactive;
                strategy.updated_at = now;
            }
        }

        Ok(&self.strategies[index])
    }

    /// Demotes the active strategy, if any, returning its id.
    pub fn deactivate(&mut self, now: DateTime<Utc>) -> Option<String> {
        let active = self
            .strategies
            .iter_mut()
            .find(|strategy| strategy.status == StrategyStatus::Active)?;
        active.status = StrategyStatus::Inactive;
        active.updated_at = now;
        Some(active.id.clone())
    }

    fn next_id(&mut self) -> String {
        loop {
            self.sequence += 1;
            let candidate = format!("strategy_{:04}", self.sequence);
            if self.get(&candidate).is_none() {
                return candidate;
            }
        }
    }
}
