//! Persistence of sticky breakpoints across sessions.
//!
//! Records are grouped by the URL of the inspected document, so reloading a
//! page brings back its breakpoints while other pages keep their own.

use crate::{
    error::StoreError,
    record::{StickyBreakpointRecord, parse_records},
    set::BreakpointSet,
};
use log::{debug, warn};
use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

/// The external key-value store behind sticky breakpoints.
///
/// Writes are incremental: the session inserts or removes one record per
/// breakpoint change, and reads everything back for a URL on attach.
pub trait StickyStore {
    /// All records stored for `url`.
    ///
    /// # Errors
    ///
    /// Fails if the backing storage cannot be read.
    fn load(&self, url: &str) -> Result<Vec<StickyBreakpointRecord>, StoreError>;

    /// Stores `record` under `url`. Storing a record twice keeps one copy.
    ///
    /// # Errors
    ///
    /// Fails if the backing storage cannot be written.
    fn insert(&mut self, url: &str, record: StickyBreakpointRecord) -> Result<(), StoreError>;

    /// Removes `record` from `url`.
    ///
    /// # Errors
    ///
    /// Fails if the backing storage cannot be written.
    fn remove(&mut self, url: &str, record: &StickyBreakpointRecord) -> Result<(), StoreError>;

    /// Replaces everything stored under `url`.
    ///
    /// # Errors
    ///
    /// Fails if the backing storage cannot be written.
    fn replace(
        &mut self,
        url: &str,
        records: Vec<StickyBreakpointRecord>,
    ) -> Result<(), StoreError>;
}

/// A [`StickyStore`] kept in memory; it lives as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    by_url: BTreeMap<String, BreakpointSet<StickyBreakpointRecord>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// URLs that have at least one record.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.by_url.keys().map(String::as_str)
    }

    fn records(&self, url: &str) -> Vec<StickyBreakpointRecord> {
        self.by_url
            .get(url)
            .map(|records| records.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn insert_record(&mut self, url: &str, record: StickyBreakpointRecord) -> bool {
        self.by_url.entry(url.to_owned()).or_default().add(record)
    }

    fn remove_record(&mut self, url: &str, record: &StickyBreakpointRecord) -> bool {
        let Some(records) = self.by_url.get_mut(url) else {
            return false;
        };
        let removed = records.remove(record);
        if records.is_empty() {
            self.by_url.remove(url);
        }
        removed
    }

    fn replace_records(&mut self, url: &str, records: Vec<StickyBreakpointRecord>) {
        if records.is_empty() {
            self.by_url.remove(url);
        } else {
            self.by_url
                .insert(url.to_owned(), records.into_iter().collect());
        }
    }
}

impl StickyStore for MemoryStore {
    fn load(&self, url: &str) -> Result<Vec<StickyBreakpointRecord>, StoreError> {
        Ok(self.records(url))
    }

    fn insert(&mut self, url: &str, record: StickyBreakpointRecord) -> Result<(), StoreError> {
        self.insert_record(url, record);
        Ok(())
    }

    fn remove(&mut self, url: &str, record: &StickyBreakpointRecord) -> Result<(), StoreError> {
        self.remove_record(url, record);
        Ok(())
    }

    fn replace(
        &mut self,
        url: &str,
        records: Vec<StickyBreakpointRecord>,
    ) -> Result<(), StoreError> {
        self.replace_records(url, records);
        Ok(())
    }
}

/// A [`StickyStore`] persisted as one JSON object, `{ url: [record, ...] }`.
///
/// The file is read once on [`open`](Self::open) and rewritten on every
/// change. A change whose write fails is rolled back, so the cache never
/// holds what the file does not. Records that do not deserialize are dropped
/// with a warning.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    cache: MemoryStore,
}

impl JsonFileStore {
    /// Opens the store at `path`. A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or is not a JSON object
    /// of arrays.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let mut cache = MemoryStore::new();

        match fs::read_to_string(&path) {
            Ok(text) => {
                let by_url: BTreeMap<String, Vec<serde_json::Value>> =
                    serde_json::from_str(&text).map_err(|source| StoreError::Json {
                        path: path.clone(),
                        source,
                    })?;
                for (url, values) in by_url {
                    let (records, skipped) = parse_records(values);
                    if skipped > 0 {
                        warn!("dropped {skipped} unreadable records for {url}");
                    }
                    cache.replace_records(&url, records);
                }
                debug!("loaded sticky breakpoints from {}", path.display());
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(source) => return Err(StoreError::Io { path, source }),
        }

        Ok(Self { path, cache })
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        let by_url: BTreeMap<&str, Vec<StickyBreakpointRecord>> = self
            .cache
            .urls()
            .map(|url| (url, self.cache.records(url)))
            .collect();
        let text = serde_json::to_string_pretty(&by_url).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, text).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl StickyStore for JsonFileStore {
    fn load(&self, url: &str) -> Result<Vec<StickyBreakpointRecord>, StoreError> {
        Ok(self.cache.records(url))
    }

    fn insert(&mut self, url: &str, record: StickyBreakpointRecord) -> Result<(), StoreError> {
        if !self.cache.insert_record(url, record.clone()) {
            return Ok(());
        }
        let flushed = self.flush();
        if flushed.is_err() {
            self.cache.remove_record(url, &record);
        }
        flushed
    }

    fn remove(&mut self, url: &str, record: &StickyBreakpointRecord) -> Result<(), StoreError> {
        if !self.cache.remove_record(url, record) {
            return Ok(());
        }
        let flushed = self.flush();
        if flushed.is_err() {
            self.cache.insert_record(url, record.clone());
        }
        flushed
    }

    fn replace(
        &mut self,
        url: &str,
        records: Vec<StickyBreakpointRecord>,
    ) -> Result<(), StoreError> {
        let previous = self.cache.records(url);
        self.cache.replace_records(url, records);
        let flushed = self.flush();
        if flushed.is_err() {
            self.cache.replace_records(url, previous);
        }
        flushed
    }
}
