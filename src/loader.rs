use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::filter::{matches_query, Facets, FilterState};
use crate::gateway::CollectionGateway;
use crate::state::{CatalogState, FetchKind, FetchTicket, LoadOutcome};
use crate::types::CatalogStatus;

/// Incremental loader for one catalog listing.
///
/// Cheap to clone; clones share the same state, so a filter change can be
/// spawned on its own task while another handle keeps paging. The state lock
/// is never held across a gateway call: every operation takes a ticket under
/// the lock, fetches without it, then relocks to apply the result.
pub struct CatalogLoader<G: CollectionGateway> {
    gateway: Arc<G>,
    state: Arc<Mutex<CatalogState<G::Item>>>,
    status_tx: Arc<watch::Sender<CatalogStatus>>,
}

impl<G: CollectionGateway> Clone for CatalogLoader<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            state: Arc::clone(&self.state),
            status_tx: Arc::clone(&self.status_tx),
        }
    }
}

impl<G: CollectionGateway> CatalogLoader<G> {
    pub fn new(gateway: G) -> Self {
        Self::with_gateway(Arc::new(gateway))
    }

    pub fn with_gateway(gateway: Arc<G>) -> Self {
        let state = CatalogState::new();
        let (status_tx, _) = watch::channel(state.status());
        Self {
            gateway,
            state: Arc::new(Mutex::new(state)),
            status_tx: Arc::new(status_tx),
        }
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    /// Status updates, pushed after every state transition.
    pub fn subscribe(&self) -> watch::Receiver<CatalogStatus> {
        self.status_tx.subscribe()
    }

    pub async fn status(&self) -> CatalogStatus {
        self.state.lock().await.status()
    }

    pub async fn items(&self) -> Vec<G::Item> {
        self.state.lock().await.items().to_vec()
    }

    pub async fn filter(&self) -> Option<FilterState> {
        self.state.lock().await.filter().cloned()
    }

    /// Loaded items narrowed by a client-side text query, in server order.
    pub async fn visible_items(&self, query: &str) -> Vec<G::Item> {
        let state = self.state.lock().await;
        state
            .items()
            .iter()
            .filter(|item| matches_query(*item, query))
            .cloned()
            .collect()
    }

    /// Filter values present among the loaded items.
    pub async fn facets(&self) -> Facets {
        Facets::collect(self.state.lock().await.items())
    }

    /// Switch to `filter` and load its first page. Equal filters are a no-op.
    pub async fn set_filter(&self, filter: FilterState) -> LoadOutcome {
        let ticket = {
            let mut s = self.state.lock().await;
            match s.begin_reset(filter) {
                Ok(ticket) => {
                    self.publish(&s);
                    ticket
                }
                Err(reason) => return LoadOutcome::Skipped(reason),
            }
        };
        tracing::info!("Catalog reset (generation {})", ticket.generation);
        self.run(ticket).await
    }

    /// Load the page after the last one. At most one of these runs at a time.
    pub async fn request_next_page(&self) -> LoadOutcome {
        let ticket = {
            let mut s = self.state.lock().await;
            match s.begin_append() {
                Ok(ticket) => {
                    self.publish(&s);
                    ticket
                }
                Err(reason) => {
                    tracing::debug!("Next page skipped: {reason:?}");
                    return LoadOutcome::Skipped(reason);
                }
            }
        };
        self.run(ticket).await
    }

    /// Repeat the last failed fetch, if any.
    pub async fn retry(&self) -> LoadOutcome {
        let ticket = {
            let mut s = self.state.lock().await;
            match s.begin_retry() {
                Ok(ticket) => {
                    self.publish(&s);
                    ticket
                }
                Err(reason) => return LoadOutcome::Skipped(reason),
            }
        };
        tracing::info!("Retrying page {} (generation {})", ticket.page, ticket.generation);
        self.run(ticket).await
    }

    /// Unmount: every later call is skipped and in-flight fetches land nowhere.
    pub async fn close(&self) {
        let mut s = self.state.lock().await;
        if !s.is_closed() {
            s.close();
            self.publish(&s);
        }
    }

    async fn run(&self, ticket: FetchTicket) -> LoadOutcome {
        let result = self.gateway.fetch_page(ticket.page, &ticket.filter).await;

        let mut s = self.state.lock().await;
        let outcome = s.complete(&ticket, result);
        match &outcome {
            LoadOutcome::Loaded { page, added, has_more } => {
                tracing::debug!("Page {page}: {added} new items, has_more={has_more}");
            }
            LoadOutcome::Stale => {
                tracing::debug!(
                    "Dropping page {} from generation {} (now {})",
                    ticket.page,
                    ticket.generation,
                    s.generation()
                );
                return outcome;
            }
            LoadOutcome::Failed(e) => {
                let what = match ticket.kind {
                    FetchKind::Reset => "first page",
                    FetchKind::Append => "next page",
                };
                tracing::warn!(
                    "Failed to load {what} (page {}, transient={}): {e}",
                    ticket.page,
                    e.is_transient()
                );
            }
            LoadOutcome::Skipped(_) => {}
        }
        self.publish(&s);
        outcome
    }

    fn publish(&self, state: &CatalogState<G::Item>) {
        self.status_tx.send_replace(state.status());
    }
}
