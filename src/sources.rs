//! # Source Registry
//!
//! The list of feeds the dashboard polls, persisted as a pretty-printed JSON
//! array in a single flat file.
//!
//! - A missing file reads as an empty list; a corrupt one is a storage error.
//! - Writes go to a temp file first and are renamed into place.
//! - Every operation holds one async lock, so concurrent CRUD calls never
//!   interleave a read-modify-write. Aggregation takes a snapshot through
//!   `read_all` and then works without the lock.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

pub const UNCLASSIFIED: &str = "unclassified";

fn default_class() -> String {
    UNCLASSIFIED.to_string()
}

/// A registered feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub id: u64,
    pub name: String,
    pub url: String,
    #[serde(default = "default_class")]
    pub sector: String,
    #[serde(default = "default_class")]
    pub category: String,
}

/// Payload for creating a source; the id is assigned by the registry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewSource {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Partial update: absent or blank fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcePatch {
    pub name: Option<String>,
    pub url: Option<String>,
    pub sector: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("source storage unreadable at {}: {reason}", .path.display())]
    Unreadable { path: PathBuf, reason: String },
    #[error("source storage unwritable at {}: {source}", .path.display())]
    Unwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("source {0} not found")]
    NotFound(u64),
    #[error("invalid source: {0}")]
    Invalid(String),
}

fn filled(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn apply(slot: &mut String, v: Option<String>) {
    if let Some(v) = filled(v) {
        *slot = v;
    }
}

pub struct SourceRegistry {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SourceRegistry {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<Source>, RegistryError> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(RegistryError::Unreadable {
                    path: self.path.clone(),
                    reason: e.to_string(),
                })
            }
        };
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&data).map_err(|e| RegistryError::Unreadable {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    async fn store(&self, sources: &[Source]) -> Result<(), RegistryError> {
        let unwritable = |source| RegistryError::Unwritable {
            path: self.path.clone(),
            source,
        };
        let json = serde_json::to_string_pretty(sources)
            .map_err(|e| unwritable(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json.as_bytes())
            .await
            .map_err(unwritable)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(unwritable)?;
        Ok(())
    }

    /// Snapshot of every registered source.
    pub async fn read_all(&self) -> Result<Vec<Source>, RegistryError> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    /// Append a source with `id = max + 1` (or 1 for an empty registry).
    pub async fn create(&self, new: NewSource) -> Result<Source, RegistryError> {
        let name = filled(Some(new.name))
            .ok_or_else(|| RegistryError::Invalid("name is required".into()))?;
        let url = filled(Some(new.url))
            .ok_or_else(|| RegistryError::Invalid("url is required".into()))?;

        let _guard = self.lock.lock().await;
        let mut sources = self.load().await?;
        let id = sources
            .iter()
            .map(|s| s.id)
            .max()
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| RegistryError::Invalid("source id space exhausted".into()))?;
        let source = Source {
            id,
            name,
            url,
            sector: filled(new.sector).unwrap_or_else(default_class),
            category: filled(new.category).unwrap_or_else(default_class),
        };
        sources.push(source.clone());
        self.store(&sources).await?;
        tracing::info!(id, name = %source.name, "source added");
        Ok(source)
    }

    pub async fn update(&self, id: u64, patch: SourcePatch) -> Result<Source, RegistryError> {
        let _guard = self.lock.lock().await;
        let mut sources = self.load().await?;
        let slot = sources
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(RegistryError::NotFound(id))?;
        apply(&mut slot.name, patch.name);
        apply(&mut slot.url, patch.url);
        apply(&mut slot.sector, patch.sector);
        apply(&mut slot.category, patch.category);
        let updated = slot.clone();
        self.store(&sources).await?;
        tracing::info!(id, "source updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: u64) -> Result<Source, RegistryError> {
        let _guard = self.lock.lock().await;
        let mut sources = self.load().await?;
        let idx = sources
            .iter()
            .position(|s| s.id == id)
            .ok_or(RegistryError::NotFound(id))?;
        let removed = sources.remove(idx);
        self.store(&sources).await?;
        tracing::info!(id, "source deleted");
        Ok(removed)
    }

    /// Remove every source whose name (case-insensitive) or url equals the given one.
    /// Returns what was removed; an empty result leaves the file untouched.
    pub async fn delete_matching(
        &self,
        name: Option<&str>,
        url: Option<&str>,
    ) -> Result<Vec<Source>, RegistryError> {
        let name = name.map(str::trim).filter(|s| !s.is_empty());
        let url = url.map(str::trim).filter(|s| !s.is_empty());

        let _guard = self.lock.lock().await;
        let sources = self.load().await?;
        let (removed, kept): (Vec<_>, Vec<_>) = sources.into_iter().partition(|s| {
            name.is_some_and(|n| s.name.eq_ignore_ascii_case(n)) || url.is_some_and(|u| s.url == u)
        });
        if !removed.is_empty() {
            self.store(&kept).await?;
            tracing::info!(count = removed.len(), "sources deleted by match");
        }
        Ok(removed)
    }
}

/// Case-insensitive keyword match over name, url, sector and category.
/// Keywords are split on whitespace and commas; any hit selects the source.
pub fn search(sources: &[Source], keywords: &str) -> Vec<Source> {
    let terms: Vec<String> = keywords
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect();
    if terms.is_empty() {
        return Vec::new();
    }
    sources
        .iter()
        .filter(|s| {
            let hay = format!("{} {} {} {}", s.name, s.url, s.sector, s.category).to_lowercase();
            terms.iter().any(|t| hay.contains(t.as_str()))
        })
        .cloned()
        .collect()
}
