use std::collections::HashSet;

use crate::error::GatewayError;
use crate::filter::FilterState;
use crate::types::{CatalogItem, CatalogStatus, ItemId, PageResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// Page 1 under a new (or retried) filter.
    Reset,
    /// The next page under the current filter.
    Append,
}

/// A fetch the state machine has authorized. The generation is compared
/// when the response comes back; a mismatch means the query was superseded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub page: u32,
    pub kind: FetchKind,
    pub filter: FilterState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// `set_filter` with a filter equal to the current one.
    Unchanged,
    /// An append is already in flight.
    Busy,
    /// The last page said there is nothing more.
    Exhausted,
    /// No filter set yet, or page 1 has not been merged.
    NotReady,
    NothingToRetry,
    /// Visibility callback that was not a not-visible to visible crossing.
    NoCrossing,
    Closed,
}

#[derive(Debug)]
pub enum LoadOutcome {
    Loaded { page: u32, added: usize, has_more: bool },
    Skipped(SkipReason),
    /// Response belonged to a superseded query or a closed catalog; dropped.
    Stale,
    Failed(GatewayError),
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Client-held state of one catalog listing.
///
/// Pure and synchronous: callers obtain a `FetchTicket`, perform the fetch
/// without holding the state, then hand the result to `complete`.
#[derive(Debug)]
pub struct CatalogState<T> {
    filter: Option<FilterState>,
    items: Vec<T>,
    seen: HashSet<ItemId>,
    /// Next page to request, or the page currently being requested.
    current_page: u32,
    /// Highest page merged under the current filter (0 = none yet).
    loaded_page: u32,
    has_more: bool,
    is_initial_loading: bool,
    is_fetching_more: bool,
    error: Option<String>,
    last_failure: Option<FetchKind>,
    generation: u64,
    closed: bool,
}

impl<T: CatalogItem> Default for CatalogState<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: CatalogItem> CatalogState<T> {
    /// Fresh state of a just-mounted listing: nothing loaded, first load pending.
    pub fn new() -> Self {
        Self {
            filter: None,
            items: Vec::new(),
            seen: HashSet::new(),
            current_page: 1,
            loaded_page: 0,
            has_more: true,
            is_initial_loading: true,
            is_fetching_more: false,
            error: None,
            last_failure: None,
            generation: 0,
            closed: false,
        }
    }

    pub fn filter(&self) -> Option<&FilterState> {
        self.filter.as_ref()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_initial_loading(&self) -> bool {
        self.is_initial_loading
    }

    pub fn is_fetching_more(&self) -> bool {
        self.is_fetching_more
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Switch to `filter`, clearing everything loaded under the previous one.
    pub fn begin_reset(&mut self, filter: FilterState) -> Result<FetchTicket, SkipReason> {
        if self.closed {
            return Err(SkipReason::Closed);
        }
        if self.filter.as_ref() == Some(&filter) {
            return Err(SkipReason::Unchanged);
        }
        self.filter = Some(filter);
        Ok(self.reset())
    }

    pub fn begin_append(&mut self) -> Result<FetchTicket, SkipReason> {
        if self.closed {
            return Err(SkipReason::Closed);
        }
        // Page N is only requested on top of page N-1.
        if self.filter.is_none() || self.is_initial_loading || self.loaded_page == 0 {
            return Err(SkipReason::NotReady);
        }
        if self.is_fetching_more {
            return Err(SkipReason::Busy);
        }
        if !self.has_more {
            return Err(SkipReason::Exhausted);
        }
        self.current_page += 1;
        self.is_fetching_more = true;
        self.error = None;
        Ok(self.ticket(FetchKind::Append, self.current_page))
    }

    /// Re-issue whatever failed last.
    pub fn begin_retry(&mut self) -> Result<FetchTicket, SkipReason> {
        if self.closed {
            return Err(SkipReason::Closed);
        }
        match self.last_failure {
            Some(FetchKind::Reset) if self.filter.is_some() => Ok(self.reset()),
            Some(FetchKind::Append) => self.begin_append(),
            _ => Err(SkipReason::NothingToRetry),
        }
    }

    /// Apply the result of a fetch started from `ticket`.
    pub fn complete(
        &mut self,
        ticket: &FetchTicket,
        result: Result<PageResult<T>, GatewayError>,
    ) -> LoadOutcome {
        if self.closed || ticket.generation != self.generation {
            return LoadOutcome::Stale;
        }

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                self.error = Some(e.to_string());
                self.last_failure = Some(ticket.kind);
                match ticket.kind {
                    FetchKind::Reset => self.is_initial_loading = false,
                    FetchKind::Append => {
                        self.is_fetching_more = false;
                        self.current_page = self.loaded_page.max(1);
                    }
                }
                return LoadOutcome::Failed(e);
            }
        };

        let received = page.items.len();
        let added = self.merge(page.items);
        // A page with nothing in it ends pagination whatever the flag says.
        self.has_more = page.has_more && received > 0;
        self.current_page = ticket.page;
        self.loaded_page = ticket.page;
        self.is_initial_loading = false;
        self.is_fetching_more = false;
        self.error = None;
        self.last_failure = None;

        LoadOutcome::Loaded {
            page: ticket.page,
            added,
            has_more: self.has_more,
        }
    }

    /// The listing went away. Anything still in flight becomes stale.
    pub fn close(&mut self) {
        self.closed = true;
        self.generation += 1;
        self.is_initial_loading = false;
        self.is_fetching_more = false;
    }

    pub fn status(&self) -> CatalogStatus {
        CatalogStatus {
            generation: self.generation,
            item_count: self.items.len(),
            current_page: self.current_page,
            has_more: self.has_more,
            is_initial_loading: self.is_initial_loading,
            is_fetching_more: self.is_fetching_more,
            is_empty_result: self.filter.is_some()
                && !self.closed
                && !self.is_initial_loading
                && self.items.is_empty()
                && !self.has_more
                && self.error.is_none(),
            error: self.error.clone(),
            closed: self.closed,
        }
    }

    fn reset(&mut self) -> FetchTicket {
        self.generation += 1;
        self.items.clear();
        self.seen.clear();
        self.current_page = 1;
        self.loaded_page = 0;
        self.has_more = true;
        self.is_initial_loading = true;
        self.is_fetching_more = false;
        self.error = None;
        self.last_failure = None;
        self.ticket(FetchKind::Reset, 1)
    }

    fn ticket(&self, kind: FetchKind, page: u32) -> FetchTicket {
        FetchTicket {
            generation: self.generation,
            page,
            kind,
            filter: self.filter.clone().unwrap_or_default(),
        }
    }

    /// Append in order, keeping the first occurrence of every id.
    fn merge(&mut self, incoming: Vec<T>) -> usize {
        let before = self.items.len();
        for item in incoming {
            if self.seen.insert(item.item_id().clone()) {
                self.items.push(item);
            } else {
                tracing::debug!("Dropping duplicate item {}", item.item_id());
            }
        }
        self.items.len() - before
    }
}
