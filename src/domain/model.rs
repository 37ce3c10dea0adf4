use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

/// A normalized domain: non-empty, no scheme, no surrounding whitespace.
///
/// Only the normalizer constructs these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DomainRecord(String);

impl DomainRecord {
    pub(crate) fn new_unchecked(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn dedupe_key(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl fmt::Display for DomainRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DomainRecord {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Insertion-ordered set of domains. Uniqueness is case-insensitive and the
/// first-seen spelling wins.
#[derive(Debug, Clone, Default)]
pub struct DomainSet {
    records: Vec<DomainRecord>,
    seen: HashSet<String>,
}

impl DomainSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when an equivalent domain is already present.
    pub fn insert(&mut self, record: DomainRecord) -> bool {
        if self.seen.insert(record.dedupe_key()) {
            self.records.push(record);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DomainRecord> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[DomainRecord] {
        &self.records
    }
}

impl<'a> IntoIterator for &'a DomainSet {
    type Item = &'a DomainRecord;
    type IntoIter = std::slice::Iter<'a, DomainRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Normalizer output together with the counters the report needs.
#[derive(Debug, Clone)]
pub struct NormalizedDomains {
    pub domains: DomainSet,
    pub fetched: usize,
    pub rejected: usize,
}

impl NormalizedDomains {
    pub fn unique(&self) -> usize {
        self.domains.len()
    }

    pub fn duplicates(&self) -> usize {
        self.fetched - self.rejected - self.domains.len()
    }
}

/// One size-bounded request worth of domains, numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub domains: Vec<DomainRecord>,
    pub payload_bytes: usize,
    pub oversized: bool,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ChunkPlan {
    pub chunks: Vec<Chunk>,
    pub max_payload_bytes: usize,
    /// Size of the whole set as a single request body.
    pub total_payload_bytes: usize,
}

impl ChunkPlan {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn domain_count(&self) -> usize {
        self.chunks.iter().map(Chunk::len).sum()
    }

    pub fn total_megabytes(&self) -> f64 {
        self.total_payload_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Target list identity and its domain count at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteList {
    pub id: u64,
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    Replace,
    Append,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Replace => f.write_str("REPLACE"),
            SyncMode::Append => f.write_str("APPEND"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDescriptor {
    Remote(String),
    LocalFile(PathBuf),
}

impl SourceDescriptor {
    /// `http://` and `https://` prefixes mean a remote feed; anything else is a path.
    pub fn classify(raw: &str) -> Self {
        let trimmed = raw.trim();
        let lowered = trimmed.to_ascii_lowercase();
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            SourceDescriptor::Remote(trimmed.to_string())
        } else {
            SourceDescriptor::LocalFile(PathBuf::from(trimmed))
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, SourceDescriptor::Remote(_))
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceDescriptor::Remote(url) => f.write_str(url),
            SourceDescriptor::LocalFile(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFormat {
    Tabular { column: String, delimiter: u8 },
    LineOriented,
}

/// Raw candidates as read from the source, before normalization.
#[derive(Debug, Clone)]
pub struct RawSource {
    pub descriptor: SourceDescriptor,
    pub format: SourceFormat,
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum RemoteCount {
    Observed(usize),
    Inferred(usize),
}

impl RemoteCount {
    pub fn value(&self) -> usize {
        match self {
            RemoteCount::Observed(n) | RemoteCount::Inferred(n) => *n,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum DeployOutcome {
    Skipped,
    Deployed,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Ok,
    DeployFailed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Ok => f.write_str("OK"),
            RunStatus::DeployFailed => f.write_str("SYNC OK, DEPLOY FAILED"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub list_name: String,
    pub list_id: u64,
    pub created: bool,
    pub mode: SyncMode,
    pub source: String,
    pub fetched: usize,
    pub unique: usize,
    pub sent: usize,
    pub chunks_planned: usize,
    pub chunks_applied: usize,
    pub count_before: usize,
    pub count_after: RemoteCount,
    pub deploy: DeployOutcome,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn delta(&self) -> i64 {
        self.count_after.value() as i64 - self.count_before as i64
    }
}
