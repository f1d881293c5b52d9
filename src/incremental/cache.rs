//! Per-file incremental parsing cache.
//!
//! Each record holds the content hash, the structural signature, the
//! last-seen timestamp, and the language. The cache decides per file:
//! skip (hash unchanged), edge-only (hash changed, signature unchanged),
//! or full re-parse. Stale records are purged eagerly at load time.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const CACHE_FILE_NAME: &str = "parse_cache.json";

/// What to do with a file this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseDecision {
    /// Content hash unchanged: nothing to do.
    Skip,
    /// Content changed but declared structure did not: refresh only the
    /// dynamic edges.
    EdgeOnly,
    /// Structure changed or no prior record: full re-parse.
    Full,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub content_hash: String,
    pub structure_signature: Option<String>,
    pub timestamp: u64,
    pub language: String,
}

#[derive(Debug, Default)]
pub struct IncrementalCache {
    records: HashMap<String, FileRecord>,
    cache_path: Option<PathBuf>,
}

impl IncrementalCache {
    /// Load from disk, treating unreadable or corrupt content as "no
    /// prior record" and dropping records older than `ttl_seconds`.
    pub fn load(cache_path: PathBuf, ttl_seconds: u64) -> Self {
        let mut records: HashMap<String, FileRecord> = match std::fs::read_to_string(&cache_path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!(
                        "Incremental cache at {} is corrupted ({e}); starting fresh",
                        cache_path.display()
                    );
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        let now = unix_now();
        let before = records.len();
        records.retain(|_, record| now.saturating_sub(record.timestamp) < ttl_seconds);
        if before > records.len() {
            tracing::debug!("Purged {} stale cache records", before - records.len());
        }

        Self {
            records,
            cache_path: Some(cache_path),
        }
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True when the file's bytes differ from the cached hash.
    pub fn needs_parsing(&self, relative_path: &str, content_hash: &str) -> bool {
        match self.records.get(relative_path) {
            Some(record) => record.content_hash != content_hash,
            None => true,
        }
    }

    pub fn cached_signature(&self, relative_path: &str) -> Option<&str> {
        self.records
            .get(relative_path)?
            .structure_signature
            .as_deref()
    }

    /// Pick the update path for a parsed file.
    pub fn decide(
        &self,
        relative_path: &str,
        content_hash: &str,
        new_signature: Option<&str>,
        edge_only_enabled: bool,
    ) -> ParseDecision {
        let Some(record) = self.records.get(relative_path) else {
            return ParseDecision::Full;
        };
        if record.content_hash == content_hash {
            return ParseDecision::Skip;
        }
        if edge_only_enabled {
            if let (Some(old), Some(new)) = (record.structure_signature.as_deref(), new_signature)
            {
                if old == new {
                    return ParseDecision::EdgeOnly;
                }
            }
        }
        ParseDecision::Full
    }

    pub fn record(
        &mut self,
        relative_path: &str,
        content_hash: String,
        structure_signature: Option<String>,
        language: &str,
    ) {
        self.records.insert(
            relative_path.to_string(),
            FileRecord {
                content_hash,
                structure_signature,
                timestamp: unix_now(),
                language: language.to_string(),
            },
        );
    }

    pub fn invalidate(&mut self, relative_path: &str) {
        self.records.remove(relative_path);
    }

    /// Persist to the path the cache was loaded from.
    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = &self.cache_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.records)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }
}

/// Directory that holds the cache and the last-indexed Git HEAD.
pub fn state_dir(repo_path: &Path) -> PathBuf {
    repo_path.join(".codegraph")
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_files_need_parsing() {
        let cache = IncrementalCache::in_memory();
        assert!(cache.needs_parsing("a.py", "hash"));
        assert_eq!(cache.decide("a.py", "hash", None, true), ParseDecision::Full);
    }

    #[test]
    fn unchanged_hash_skips() {
        let mut cache = IncrementalCache::in_memory();
        cache.record("a.py", "h1".into(), Some("sig".into()), "python");
        assert!(!cache.needs_parsing("a.py", "h1"));
        assert_eq!(cache.decide("a.py", "h1", Some("sig"), true), ParseDecision::Skip);
    }

    #[test]
    fn changed_body_takes_edge_only_path() {
        let mut cache = IncrementalCache::in_memory();
        cache.record("a.py", "h1".into(), Some("sig".into()), "python");
        assert_eq!(
            cache.decide("a.py", "h2", Some("sig"), true),
            ParseDecision::EdgeOnly
        );
        // Edge-only disabled degrades to full.
        assert_eq!(
            cache.decide("a.py", "h2", Some("sig"), false),
            ParseDecision::Full
        );
    }

    #[test]
    fn changed_structure_is_a_full_parse() {
        let mut cache = IncrementalCache::in_memory();
        cache.record("a.py", "h1".into(), Some("sig1".into()), "python");
        assert_eq!(
            cache.decide("a.py", "h2", Some("sig2"), true),
            ParseDecision::Full
        );
    }

    #[test]
    fn corrupt_cache_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE_NAME);
        std::fs::write(&path, "{ not json").unwrap();
        let cache = IncrementalCache::load(path, 3600);
        assert!(cache.is_empty());
    }

    #[test]
    fn stale_records_are_purged_at_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE_NAME);

        let mut cache = IncrementalCache::load(path.clone(), 3600);
        cache.record("a.py", "h1".into(), None, "python");
        cache.save().unwrap();

        // TTL of zero invalidates everything on the next load.
        let reloaded = IncrementalCache::load(path, 0);
        assert!(reloaded.is_empty());
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE_NAME);

        let mut cache = IncrementalCache::load(path.clone(), 3600);
        cache.record("a.py", "h1".into(), Some("sig".into()), "python");
        cache.save().unwrap();

        let reloaded = IncrementalCache::load(path, 3600);
        assert!(!reloaded.needs_parsing("a.py", "h1"));
        assert_eq!(reloaded.cached_signature("a.py"), Some("sig"));
    }
}
