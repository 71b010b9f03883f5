//! Browsing session: the current view, pagination cursor and column selection
//! over one [`MailboxIndex`].
//!
//! All state lives in [`Session`]; every operation that fails leaves the
//! session exactly as it was.

pub mod columns;
pub mod cursor;
pub mod sort;

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{MboxError, Result};
use crate::export::eml;
use crate::index::mailbox::{DateDiagnostic, MailboxIndex};
use crate::index::reader::MailboxStats;
use crate::model::mail::MessageRecord;
use crate::search::{self, SearchOutcome};
use crate::store::reader::MboxStore;

use self::columns::ColumnSelection;
use self::cursor::PaginationCursor;
use self::sort::{SortDirection, SortField};

/// How the current view was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewKind {
    /// Every message, in file order.
    All,
    Search { query: String },
    Sorted { field: SortField, direction: SortDirection },
}

/// One page of the current view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Position in the view of the first record.
    pub start: usize,
    /// Indices (file order) of the records on this page.
    pub indices: Vec<usize>,
    /// Length of the whole view.
    pub view_len: usize,
}

impl Page {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Position in the view just past the last record.
    pub fn end(&self) -> usize {
        self.start + self.indices.len()
    }
}

/// Interactive query state over a mailbox.
pub struct Session {
    index: MailboxIndex,
    view: Vec<usize>,
    kind: ViewKind,
    cursor: PaginationCursor,
    columns: ColumnSelection,
    store: MboxStore,
    date_format: String,
}

impl Session {
    /// Start a session with the defaults from `config`.
    ///
    /// Invalid configured page sizes or columns fall back to the built-in
    /// defaults with a warning.
    pub fn new(index: MailboxIndex, config: &Config) -> Result<Self> {
        let store =
            MboxStore::with_cache_size(index.path(), config.performance.lru_cache_size)?;

        let cursor = PaginationCursor::new(config.browse.page_size).unwrap_or_else(|e| {
            warn!(error = %e, "Invalid configured page size, using default");
            PaginationCursor::default()
        });
        let columns = ColumnSelection::from_names(&config.browse.columns).unwrap_or_else(|e| {
            warn!(error = %e, "Invalid configured columns, using default");
            ColumnSelection::default()
        });

        Ok(Self {
            view: (0..index.size()).collect(),
            kind: ViewKind::All,
            index,
            cursor,
            columns,
            store,
            date_format: config.general.date_format.clone(),
        })
    }

    pub fn index(&self) -> &MailboxIndex {
        &self.index
    }

    /// Indices (file order) of the records in the current view.
    pub fn view(&self) -> &[usize] {
        &self.view
    }

    pub fn view_kind(&self) -> &ViewKind {
        &self.kind
    }

    pub fn cursor(&self) -> &PaginationCursor {
        &self.cursor
    }

    pub fn columns(&self) -> &ColumnSelection {
        &self.columns
    }

    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    // ── Pagination ────────────────────────────

    /// Show the next page. `Some(n)` also changes the page size.
    pub fn list(&mut self, page_size: Option<usize>) -> Result<Page> {
        self.apply_page_size(page_size)?;
        let range = self.cursor.advance(self.view.len());
        Ok(self.page(range))
    }

    /// Same as [`list`](Self::list).
    pub fn next(&mut self, page_size: Option<usize>) -> Result<Page> {
        self.list(page_size)
    }

    /// Show the page before the one last shown.
    pub fn prev(&mut self, page_size: Option<usize>) -> Result<Page> {
        self.apply_page_size(page_size)?;
        let range = self.cursor.back(self.view.len());
        Ok(self.page(range))
    }

    fn apply_page_size(&mut self, page_size: Option<usize>) -> Result<()> {
        match page_size {
            Some(n) => self.cursor.set_page_size(n),
            None => Ok(()),
        }
    }

    fn page(&self, range: std::ops::Range<usize>) -> Page {
        Page {
            start: range.start,
            indices: self.view[range].to_vec(),
            view_len: self.view.len(),
        }
    }

    /// The records on `page`.
    pub fn records(&self, page: &Page) -> Vec<&MessageRecord> {
        page.indices
            .iter()
            .filter_map(|&i| self.index.records().get(i))
            .collect()
    }

    // ── View changes ──────────────────────────

    /// Search the full index; the matches become the current view.
    pub fn search(&mut self, query: &str) -> Result<SearchOutcome> {
        let outcome = search::search(&self.index, query)?;
        debug!(query, total = outcome.total(), "Search finished");
        self.set_view(
            outcome.matches.clone(),
            ViewKind::Search {
                query: outcome.query.clone(),
            },
        );
        Ok(outcome)
    }

    /// Sort the full index; the permutation becomes the current view.
    pub fn sort(&mut self, field: SortField, direction: SortDirection) {
        let order = sort::sort_order(self.index.records(), field, direction);
        self.set_view(order, ViewKind::Sorted { field, direction });
    }

    /// Back to every message in file order.
    pub fn reset(&mut self) {
        self.set_view((0..self.index.size()).collect(), ViewKind::All);
    }

    fn set_view(&mut self, view: Vec<usize>, kind: ViewKind) {
        self.view = view;
        self.kind = kind;
        self.cursor.reset();
    }

    /// Replace the column selection. On error nothing changes.
    pub fn set_columns(&mut self, spec: &str) -> Result<()> {
        self.columns = ColumnSelection::parse(spec)?;
        Ok(())
    }

    // ── Single messages ───────────────────────

    /// Record at `ordinal` in the current view.
    pub fn get(&self, ordinal: usize) -> Result<&MessageRecord> {
        self.view
            .get(ordinal)
            .map(|&i| &self.index.records()[i])
            .ok_or(MboxError::OutOfRange {
                ordinal,
                len: self.view.len(),
            })
    }

    /// Copy the message at `ordinal` verbatim to `dest`.
    pub fn export(&mut self, ordinal: usize, dest: &Path) -> Result<PathBuf> {
        let record = self
            .view
            .get(ordinal)
            .map(|&i| &self.index.records()[i])
            .ok_or(MboxError::OutOfRange {
                ordinal,
                len: self.view.len(),
            })?;
        eml::export_eml(&mut self.store, record, dest)
    }

    /// Raw text of the message at `ordinal` (lossy UTF-8, no MIME decoding).
    pub fn show(&mut self, ordinal: usize) -> Result<String> {
        let record = self
            .view
            .get(ordinal)
            .map(|&i| &self.index.records()[i])
            .ok_or(MboxError::OutOfRange {
                ordinal,
                len: self.view.len(),
            })?;
        let raw = self.store.get_raw_message(record)?;
        Ok(String::from_utf8_lossy(raw).into_owned())
    }

    /// How the date of the message at `ordinal` was resolved.
    pub fn diagnose(&self, ordinal: usize) -> Result<DateDiagnostic> {
        self.get(ordinal).map(DateDiagnostic::from)
    }

    /// Cell values of `record` for the current column selection.
    pub fn row(&self, record: &MessageRecord) -> Vec<String> {
        self.columns
            .columns()
            .iter()
            .map(|c| c.value(record, &self.date_format))
            .collect()
    }

    // ── Aggregates ────────────────────────────

    /// Statistics over the full index, computed now.
    pub fn stats(&self) -> MailboxStats {
        MailboxStats::compute(&self.index)
    }
}
