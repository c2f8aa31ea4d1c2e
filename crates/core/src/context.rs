//! The context cache — tracks project file contents contributed by user
//! messages or tool results, and classifies them relative to the last
//! remote call so the request preamble can avoid re-sending unchanged
//! files.

use crate::error::ContextError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A tracked project file. Owned exclusively by the [`ContextCache`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileArtifact {
    /// Path relative to the working directory — the unique key.
    pub path: String,

    /// File content as last observed.
    pub content: String,

    /// When this entry was last inserted or overwritten.
    pub modified: DateTime<Utc>,

    /// What produced the entry (e.g. "user", "read_file").
    pub source: String,
}

/// Tracks known file artifacts and what has changed since the last
/// remote call.
#[derive(Debug, Default)]
pub struct ContextCache {
    files: BTreeMap<String, FileArtifact>,
    last_remote_call: Option<DateTime<Utc>>,
}

impl ContextCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an artifact, stamping the current time.
    /// Updates never create duplicate paths.
    pub fn upsert(
        &mut self,
        path: impl Into<String>,
        content: impl Into<String>,
        source: impl Into<String>,
    ) {
        let path = path.into();
        self.files.insert(
            path.clone(),
            FileArtifact {
                path,
                content: content.into(),
                modified: Utc::now(),
                source: source.into(),
            },
        );
    }

    /// Delete an artifact; fails if the path is untracked.
    pub fn remove(&mut self, path: &str) -> Result<(), ContextError> {
        self.files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| ContextError::NotFound(path.to_string()))
    }

    pub fn get(&self, path: &str) -> Option<&FileArtifact> {
        self.files.get(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// All tracked paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        self.files.keys().map(String::as_str).collect()
    }

    /// Human-readable listing for the CLI's `/context` command.
    pub fn summary(&self) -> String {
        if self.files.is_empty() {
            return "No files in context.".into();
        }
        let mut out = String::from("Files in context:");
        for path in self.files.keys() {
            out.push_str("\n- ");
            out.push_str(path);
        }
        out
    }

    /// Split artifacts into (unchanged since last call, new or modified
    /// since last call), each ascending by modification time.
    ///
    /// Artifacts with no prior remote call recorded always land in the
    /// second list. Recomputed fresh on every call — never cached.
    pub fn partition_for_request(&self) -> (Vec<&FileArtifact>, Vec<&FileArtifact>) {
        let mut unchanged = Vec::new();
        let mut fresh = Vec::new();

        for artifact in self.files.values() {
            match self.last_remote_call {
                Some(synced) if artifact.modified <= synced => unchanged.push(artifact),
                _ => fresh.push(artifact),
            }
        }

        unchanged.sort_by(|a, b| a.modified.cmp(&b.modified).then(a.path.cmp(&b.path)));
        fresh.sort_by(|a, b| a.modified.cmp(&b.modified).then(a.path.cmp(&b.path)));
        (unchanged, fresh)
    }

    /// Record the current time as the last-remote-call instant.
    ///
    /// Invoked once per completed remote call, after the response is
    /// received — tool results folded during the turn then classify as
    /// fresh on the next call.
    pub fn mark_synced(&mut self) {
        self.last_remote_call = Some(Utc::now());
    }

    pub fn last_synced(&self) -> Option<DateTime<Utc>> {
        self.last_remote_call
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_overwrites_without_duplicates() {
        let mut cache = ContextCache::new();
        cache.upsert("src/lib.rs", "old", "user");
        cache.upsert("src/lib.rs", "new", "read_file");

        assert_eq!(cache.len(), 1);
        let artifact = cache.get("src/lib.rs").unwrap();
        assert_eq!(artifact.content, "new");
        assert_eq!(artifact.source, "read_file");
    }

    #[test]
    fn remove_untracked_path_fails() {
        let mut cache = ContextCache::new();
        cache.upsert("a.txt", "x", "user");

        assert!(cache.remove("a.txt").is_ok());
        let err = cache.remove("a.txt").unwrap_err();
        assert!(matches!(err, ContextError::NotFound(_)));
    }

    #[test]
    fn partition_without_sync_puts_everything_in_fresh() {
        let mut cache = ContextCache::new();
        cache.upsert("a.txt", "x", "user");
        cache.upsert("b.txt", "y", "user");

        let (unchanged, fresh) = cache.partition_for_request();
        assert!(unchanged.is_empty());
        assert_eq!(fresh.len(), 2);
    }

    #[test]
    fn partition_is_disjoint_and_exhaustive() {
        let mut cache = ContextCache::new();
        cache.upsert("a.txt", "x", "user");
        cache.mark_synced();
        cache.upsert("b.txt", "y", "read_file");
        cache.upsert("c.txt", "z", "read_file");

        let (unchanged, fresh) = cache.partition_for_request();
        assert_eq!(unchanged.len() + fresh.len(), cache.len());
        assert_eq!(unchanged.len(), 1);
        assert_eq!(unchanged[0].path, "a.txt");

        let fresh_paths: Vec<_> = fresh.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(fresh_paths, vec!["b.txt", "c.txt"]);
        assert!(!fresh_paths.contains(&"a.txt"));
    }

    #[test]
    fn partition_sorts_by_modification_time() {
        let mut cache = ContextCache::new();
        cache.upsert("later.txt", "x", "user");
        cache.upsert("earlier.txt", "y", "user");
        // Overwrite bumps the timestamp, so later.txt is now newest.
        cache.upsert("later.txt", "x2", "user");

        let (_, fresh) = cache.partition_for_request();
        assert_eq!(fresh.len(), 2);
        assert!(fresh[0].modified <= fresh[1].modified);
        assert_eq!(fresh[1].path, "later.txt");
    }

    #[test]
    fn reupsert_after_sync_reclassifies_as_fresh() {
        let mut cache = ContextCache::new();
        cache.upsert("a.txt", "x", "user");
        cache.mark_synced();

        let (unchanged, fresh) = cache.partition_for_request();
        assert_eq!(unchanged.len(), 1);
        assert!(fresh.is_empty());

        cache.upsert("a.txt", "x2", "read_file");
        let (unchanged, fresh) = cache.partition_for_request();
        assert!(unchanged.is_empty());
        assert_eq!(fresh.len(), 1);
    }

    #[test]
    fn summary_lists_paths() {
        let mut cache = ContextCache::new();
        assert_eq!(cache.summary(), "No files in context.");

        cache.upsert("b.txt", "y", "user");
        cache.upsert("a.txt", "x", "user");
        let summary = cache.summary();
        assert!(summary.contains("- a.txt"));
        assert!(summary.contains("- b.txt"));
    }
}
