//! Hierarchy snapshots for transition scans.
//!
//! The engine only reads history. Recording snapshots (see
//! `ScanResult::snapshots`) is the caller's job, either in memory or in an
//! append-only JSONL file.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::NaiveDate;
use regimelab_core::domain::RegimeHierarchy;

/// Source of earlier hierarchy snapshots.
pub trait HierarchyHistory: Send + Sync {
    /// Latest snapshot of `symbol` strictly before `before`.
    fn previous(&self, symbol: &str, before: NaiveDate) -> Option<RegimeHierarchy>;
}

fn latest_before(snapshots: &[RegimeHierarchy], before: NaiveDate) -> Option<RegimeHierarchy> {
    snapshots
        .iter()
        .filter(|h| h.as_of() < before)
        .max_by_key(|h| h.as_of())
        .cloned()
}

#[derive(Debug, Default)]
pub struct InMemoryHistory {
    snapshots: RwLock<BTreeMap<String, Vec<RegimeHierarchy>>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, hierarchy: RegimeHierarchy) {
        if let Ok(mut map) = self.snapshots.write() {
            map.entry(hierarchy.instrument.clone()).or_default().push(hierarchy);
        }
    }

    pub fn with(self, hierarchy: RegimeHierarchy) -> Self {
        self.record(hierarchy);
        self
    }

    pub fn len(&self) -> usize {
        self.snapshots
            .read()
            .map(|m| m.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HierarchyHistory for InMemoryHistory {
    fn previous(&self, symbol: &str, before: NaiveDate) -> Option<RegimeHierarchy> {
        let map = self.snapshots.read().ok()?;
        latest_before(map.get(symbol)?, before)
    }
}

type SnapshotIndex = BTreeMap<String, Vec<RegimeHierarchy>>;

/// One hierarchy per line. Malformed lines are skipped on read.
///
/// The file is parsed once, on the first lookup, into a per-symbol index
/// shared by every clone; appends through any clone keep that index current.
#[derive(Debug, Clone)]
pub struct JsonlHistory {
    path: PathBuf,
    index: Arc<RwLock<Option<SnapshotIndex>>>,
}

impl JsonlHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            index: Arc::new(RwLock::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, hierarchy: &RegimeHierarchy) -> io::Result<()> {
        self.append_all(std::slice::from_ref(hierarchy))
    }

    /// Append several snapshots with a single open of the file.
    pub fn append_all(&self, hierarchies: &[RegimeHierarchy]) -> io::Result<()> {
        if hierarchies.is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        for hierarchy in hierarchies {
            let json = serde_json::to_string(hierarchy)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            writeln!(file, "{json}")?;
        }
        file.flush()?;

        if let Ok(mut guard) = self.index.write() {
            if let Some(index) = guard.as_mut() {
                for hierarchy in hierarchies {
                    index
                        .entry(hierarchy.instrument.clone())
                        .or_default()
                        .push(hierarchy.clone());
                }
            }
        }
        Ok(())
    }

    pub fn read_all(&self) -> io::Result<Vec<RegimeHierarchy>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let reader = io::BufReader::new(fs::File::open(&self.path)?);
        let mut snapshots = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<RegimeHierarchy>(&line) {
                Ok(h) => snapshots.push(h),
                Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "skipping malformed history line"),
            }
        }
        Ok(snapshots)
    }

    fn load_index(&self) -> io::Result<()> {
        let mut guard = self
            .index
            .write()
            .map_err(|_| io::Error::other("history index poisoned"))?;
        if guard.is_none() {
            let mut index = SnapshotIndex::new();
            for h in self.read_all()? {
                index.entry(h.instrument.clone()).or_default().push(h);
            }
            tracing::debug!(path = %self.path.display(), symbols = index.len(), "history indexed");
            *guard = Some(index);
        }
        Ok(())
    }
}

impl HierarchyHistory for JsonlHistory {
    fn previous(&self, symbol: &str, before: NaiveDate) -> Option<RegimeHierarchy> {
        if let Err(e) = self.load_index() {
            tracing::warn!(path = %self.path.display(), error = %e, "history unreadable");
            return None;
        }
        let guard = self.index.read().ok()?;
        latest_before(guard.as_ref()?.get(symbol)?, before)
    }
}
