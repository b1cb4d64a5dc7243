use std::collections::BTreeSet;

use thiserror::Error;

use crate::data::aggregate::{
    GroupKey, GroupSummary, aggregate, total_bill_amount, word_corpus,
};
use crate::data::filter::{DimensionOptions, FilterChain, FilterState};
use crate::data::model::{Dimension, RecordStore};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("table index {index} out of range (session has {len} table(s))")]
    OutOfRange { index: usize, len: usize },
}

// ---------------------------------------------------------------------------
// TableView – everything the presentation layer needs for one table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableView {
    /// Options per dimension, in chain order.
    pub options: Vec<DimensionOptions>,
    /// Indices of records passing the current filters.
    pub visible_indices: Vec<usize>,
    pub summaries: Vec<GroupSummary>,
    pub total_bill_amount: f64,
    /// Input for the word-cloud renderer.
    pub corpus: String,
}

impl TableView {
    /// No rows survived the filters. Shown as an advisory, not an error.
    ///
    /// Surviving rows that all lack a grouping key still count as data; the
    /// summary list is then empty but the view is not.
    pub fn is_empty(&self) -> bool {
        self.visible_indices.is_empty()
    }
}

// ---------------------------------------------------------------------------
// TableInstance – one independently filtered table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct TableInstance {
    filters: FilterState,
    group_key: GroupKey,
    view: TableView,
}

impl TableInstance {
    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn group_key(&self) -> GroupKey {
        self.group_key
    }

    pub fn view(&self) -> &TableView {
        &self.view
    }

    /// Recompute options and summaries from scratch.
    fn recompute(&mut self, store: &RecordStore, chain: &FilterChain) {
        let outcome = chain.resolve(store, &mut self.filters);
        if outcome.indices.is_empty() {
            log::warn!("no rows match the current filters");
        }
        let summaries = aggregate(store, &outcome.indices, self.group_key);
        self.view = TableView {
            total_bill_amount: total_bill_amount(&summaries),
            corpus: word_corpus(&summaries),
            options: outcome.options,
            visible_indices: outcome.indices,
            summaries,
        };
    }
}

// ---------------------------------------------------------------------------
// ComparisonSession
// ---------------------------------------------------------------------------

/// A growable list of tables over one shared, read-only dataset.
pub struct ComparisonSession {
    store: RecordStore,
    chain: FilterChain,
    tables: Vec<TableInstance>,
}

impl ComparisonSession {
    /// Session with a single unfiltered table.
    pub fn new(store: RecordStore) -> Self {
        let mut session = Self::empty(store);
        session.add_table();
        session
    }

    /// Session with no tables.
    pub fn empty(store: RecordStore) -> Self {
        Self::with_chain(store, FilterChain::default())
    }

    pub fn with_chain(store: RecordStore, chain: FilterChain) -> Self {
        log::info!(
            "session over {} records, filter order {:?}",
            store.len(),
            chain.dimensions()
        );
        ComparisonSession {
            store,
            chain,
            tables: Vec::new(),
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn chain(&self) -> &FilterChain {
        &self.chain
    }

    pub fn tables(&self) -> &[TableInstance] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Append an unfiltered table and return its index.
    pub fn add_table(&mut self) -> usize {
        let mut table = TableInstance::default();
        table.recompute(&self.store, &self.chain);
        self.tables.push(table);
        self.tables.len() - 1
    }

    pub fn remove_table(&mut self, index: usize) -> Result<TableInstance, SessionError> {
        self.check(index)?;
        Ok(self.tables.remove(index))
    }

    pub fn view(&self, index: usize) -> Result<&TableView, SessionError> {
        self.check(index)?;
        Ok(&self.tables[index].view)
    }

    /// Replace the selection for one dimension of one table.
    pub fn set_selection<I, S>(
        &mut self,
        index: usize,
        dim: Dimension,
        values: I,
    ) -> Result<&TableView, SessionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        self.mutate(index, |t| {
            t.filters.insert(dim, values);
        })
    }

    /// Add `value` to the selection, or remove it if already selected.
    pub fn toggle_value(
        &mut self,
        index: usize,
        dim: Dimension,
        value: &str,
    ) -> Result<&TableView, SessionError> {
        self.mutate(index, |t| {
            let selected = t.filters.entry(dim).or_default();
            if !selected.remove(value) {
                selected.insert(value.to_string());
            }
        })
    }

    pub fn clear_dimension(
        &mut self,
        index: usize,
        dim: Dimension,
    ) -> Result<&TableView, SessionError> {
        self.mutate(index, |t| {
            t.filters.remove(&dim);
        })
    }

    pub fn clear_filters(&mut self, index: usize) -> Result<&TableView, SessionError> {
        self.mutate(index, |t| t.filters.clear())
    }

    pub fn set_group_key(
        &mut self,
        index: usize,
        key: GroupKey,
    ) -> Result<&TableView, SessionError> {
        self.mutate(index, |t| t.group_key = key)
    }

    fn mutate<F>(&mut self, index: usize, change: F) -> Result<&TableView, SessionError>
    where
        F: FnOnce(&mut TableInstance),
    {
        self.check(index)?;
        let table = &mut self.tables[index];
        change(table);
        log::debug!("recomputing table {index}");
        table.recompute(&self.store, &self.chain);
        Ok(&table.view)
    }

    fn check(&self, index: usize) -> Result<(), SessionError> {
        if index < self.tables.len() {
            Ok(())
        } else {
            Err(SessionError::OutOfRange {
                index,
                len: self.tables.len(),
            })
        }
    }
}
