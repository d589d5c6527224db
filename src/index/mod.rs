pub mod complexity;
pub mod store;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A symbol recorded for a file. Extraction happens outside ctxpack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub name: String,
    pub line: usize,
    pub kind: String,
    /// Declaration text, when the extractor captured one.
    pub signature: Option<String>,
    pub exported: bool,
}

impl SymbolRecord {
    /// Signature if present and non-blank, otherwise the bare name.
    pub fn label(&self) -> &str {
        self.signature
            .as_deref()
            .map(str::trim)
            .filter(|sig| !sig.is_empty())
            .unwrap_or_else(|| self.name.trim())
    }
}

/// Indexed metadata for one repo-relative file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Repo-relative, `/`-separated.
    pub path: String,
    pub line_count: usize,
    /// Seconds since the Unix epoch; 0 when unknown.
    pub mtime_secs: i64,
    pub size: u64,
    pub symbols: Vec<SymbolRecord>,
}

/// In-memory view of the file index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileIndex {
    records: HashMap<String, FileRecord>,
}

impl FileIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Line count and modification time for a file, if indexed.
    pub fn read(&self, path: &str) -> Option<&FileRecord> {
        self.records.get(path)
    }

    /// The `n` most recently modified paths, newest first; ties break by path.
    pub fn most_recent(&self, n: usize) -> Vec<String> {
        let mut records: Vec<&FileRecord> = self.records.values().collect();
        records.sort_by(|a, b| {
            b.mtime_secs
                .cmp(&a.mtime_secs)
                .then_with(|| a.path.cmp(&b.path))
        });
        records.into_iter().take(n).map(|r| r.path.clone()).collect()
    }

    /// Up to `limit` symbols for `path`: exported first, then by line, then by name.
    pub fn symbols(&self, path: &str, limit: usize) -> Vec<&SymbolRecord> {
        let Some(record) = self.records.get(path) else {
            return Vec::new();
        };
        let mut symbols: Vec<&SymbolRecord> = record.symbols.iter().collect();
        symbols.sort_by(|a, b| {
            b.exported
                .cmp(&a.exported)
                .then_with(|| a.line.cmp(&b.line))
                .then_with(|| a.name.cmp(&b.name))
        });
        symbols.truncate(limit);
        symbols
    }

    /// Insert or replace a record. Returns true when line count, mtime or size changed.
    pub fn upsert(&mut self, record: FileRecord) -> bool {
        match self.records.get_mut(&record.path) {
            Some(existing) => {
                let changed = existing.line_count != record.line_count
                    || existing.mtime_secs != record.mtime_secs
                    || existing.size != record.size;
                existing.line_count = record.line_count;
                existing.mtime_secs = record.mtime_secs;
                existing.size = record.size;
                if !record.symbols.is_empty() {
                    existing.symbols = record.symbols;
                }
                changed
            }
            None => {
                self.records.insert(record.path.clone(), record);
                true
            }
        }
    }

    /// Drop a record. Returns true if one was present.
    pub fn remove(&mut self, path: &str) -> bool {
        self.records.remove(path).is_some()
    }
}
