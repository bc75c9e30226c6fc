//! Per-record field tables used to resolve streamed object keys
//!
//! Record field names come from the compile-time table generated by
//! `#[derive(Deserialize)]` (skipped fields are already absent, renames are
//! applied). Each table is turned into a [`FieldList`] once and memoized for
//! the lifetime of the process.

use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use ahash::AHashMap;
use kspack_format::FoldStrategy;

/// One declared field of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEntry {
    /// Field name as declared (after renames)
    pub name: &'static str,
    /// Position in the declaration table
    pub index: usize,
    /// Fold comparison chosen for this name
    pub fold: FoldStrategy,
}

impl FieldEntry {
    /// Byte form of the name, compared against raw stream keys.
    pub fn name_bytes(&self) -> &'static [u8] {
        self.name.as_bytes()
    }
}

/// Flat list of a record's fields in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldList {
    record: &'static str,
    fields: Vec<FieldEntry>,
}

impl FieldList {
    /// Build the list for `record` from its declared field names.
    pub fn new(record: &'static str, names: &'static [&'static str]) -> Self {
        let fields = names
            .iter()
            .enumerate()
            .map(|(index, &name)| FieldEntry {
                name,
                index,
                fold: FoldStrategy::for_name(name.as_bytes()),
            })
            .collect();
        Self { record, fields }
    }

    /// Record type name.
    pub fn record(&self) -> &'static str {
        self.record
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldEntry] {
        &self.fields
    }

    /// Resolve a streamed key to a declared field.
    ///
    /// An exact match returns immediately, even when a case-insensitive
    /// match was seen earlier in the scan. Without an exact match the first
    /// case-insensitive match wins.
    pub fn resolve(&self, key: &[u8]) -> Option<&FieldEntry> {
        let mut folded = None;
        for field in &self.fields {
            let name = field.name_bytes();
            if name == key {
                return Some(field);
            }
            if folded.is_none() && field.fold.matches(name, key) {
                folded = Some(field);
            }
        }
        folded
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TableKey {
    record: &'static str,
    table: usize,
    len: usize,
}

impl TableKey {
    fn new(record: &'static str, names: &'static [&'static str]) -> Self {
        Self {
            record,
            table: names.as_ptr() as usize,
            len: names.len(),
        }
    }
}

/// Process-wide memo of record field tables.
///
/// Population is first-writer-wins: two threads racing on the same record
/// build equal lists and only one is kept.
#[derive(Debug, Default)]
pub struct FieldCache {
    tables: RwLock<AHashMap<TableKey, Arc<FieldList>>>,
}

impl FieldCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Field list of a record, built on first use.
    pub fn fields_of(
        &self,
        record: &'static str,
        names: &'static [&'static str],
    ) -> Arc<FieldList> {
        let key = TableKey::new(record, names);
        if let Some(list) = self
            .tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(list);
        }

        let built = Arc::new(FieldList::new(record, names));
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let list = tables.entry(key).or_insert_with(|| {
            tracing::trace!(record, fields = names.len(), "cached record field table");
            built
        });
        Arc::clone(list)
    }

    /// Number of cached records.
    pub fn len(&self) -> usize {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True when nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the global singleton instance
    pub fn global() -> &'static Self {
        static INSTANCE: OnceLock<FieldCache> = OnceLock::new();
        INSTANCE.get_or_init(FieldCache::new)
    }
}
