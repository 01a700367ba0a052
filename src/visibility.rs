use crate::gateway::CollectionGateway;
use crate::loader::CatalogLoader;
use crate::state::{LoadOutcome, SkipReason};
use crate::types::{CatalogStatus, ItemId};

/// Infinite-scroll trigger watching the last rendered item.
///
/// Feed it visibility callbacks; it answers `true` once per
/// not-visible -> visible crossing of the observed item, and never while the
/// catalog is busy or exhausted.
#[derive(Debug, Default)]
pub struct VisibilityTrigger {
    target: Option<ItemId>,
    intersecting: bool,
}

impl VisibilityTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe `target` instead of whatever was observed before. Called
    /// whenever the rendered list changes; `None` detaches.
    pub fn observe(&mut self, target: Option<ItemId>) {
        if self.target != target {
            self.target = target;
            self.intersecting = false;
        }
    }

    pub fn detach(&mut self) {
        self.observe(None);
    }

    pub fn target(&self) -> Option<&ItemId> {
        self.target.as_ref()
    }

    /// Record a visibility change of `element` and decide whether to load more.
    pub fn on_visibility(&mut self, element: &ItemId, visible: bool, status: &CatalogStatus) -> bool {
        self.crossed(element, visible) && blocked_by(status).is_none()
    }

    fn crossed(&mut self, element: &ItemId, visible: bool) -> bool {
        if self.target.as_ref() != Some(element) {
            // Callback from an element we stopped observing.
            return false;
        }
        let crossed = visible && !self.intersecting;
        self.intersecting = visible;
        crossed
    }

    /// `on_visibility`, then ask `loader` for the next page if it fired.
    pub async fn notify<G: CollectionGateway>(
        &mut self,
        loader: &CatalogLoader<G>,
        element: &ItemId,
        visible: bool,
    ) -> LoadOutcome {
        if !self.crossed(element, visible) {
            return LoadOutcome::Skipped(SkipReason::NoCrossing);
        }
        match blocked_by(&loader.status().await) {
            Some(reason) => LoadOutcome::Skipped(reason),
            None => loader.request_next_page().await,
        }
    }
}

/// Why the catalog cannot take another page right now, if it cannot.
fn blocked_by(status: &CatalogStatus) -> Option<SkipReason> {
    if status.closed {
        Some(SkipReason::Closed)
    } else if status.is_initial_loading {
        Some(SkipReason::NotReady)
    } else if status.is_fetching_more {
        Some(SkipReason::Busy)
    } else if !status.has_more {
        Some(SkipReason::Exhausted)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready() -> CatalogStatus {
        CatalogStatus {
            has_more: true,
            current_page: 1,
            item_count: 9,
            ..CatalogStatus::default()
        }
    }

    #[test]
    fn fires_once_per_crossing() {
        let mut trigger = VisibilityTrigger::new();
        let last = ItemId::from(9u64);
        trigger.observe(Some(last.clone()));

        assert!(trigger.on_visibility(&last, true, &ready()));
        assert!(!trigger.on_visibility(&last, true, &ready()), "still visible");
        assert!(!trigger.on_visibility(&last, false, &ready()));
        assert!(trigger.on_visibility(&last, true, &ready()));
    }

    #[test]
    fn quiet_while_busy_or_exhausted() {
        let mut trigger = VisibilityTrigger::new();
        let last = ItemId::from(1u64);
        trigger.observe(Some(last.clone()));

        let busy = CatalogStatus { is_fetching_more: true, ..ready() };
        assert!(!trigger.on_visibility(&last, true, &busy));
        trigger.on_visibility(&last, false, &ready());

        let loading = CatalogStatus { is_initial_loading: true, ..ready() };
        assert!(!trigger.on_visibility(&last, true, &loading));
        trigger.on_visibility(&last, false, &ready());

        let done = CatalogStatus { has_more: false, ..ready() };
        assert!(!trigger.on_visibility(&last, true, &done));
    }

    #[test]
    fn blocking_reason_names_the_state() {
        assert_eq!(blocked_by(&ready()), None);
        let closed = CatalogStatus { closed: true, is_fetching_more: true, ..ready() };
        assert_eq!(blocked_by(&closed), Some(SkipReason::Closed));
        let loading = CatalogStatus { is_initial_loading: true, ..ready() };
        assert_eq!(blocked_by(&loading), Some(SkipReason::NotReady));
        let busy = CatalogStatus { is_fetching_more: true, ..ready() };
        assert_eq!(blocked_by(&busy), Some(SkipReason::Busy));
        let done = CatalogStatus { has_more: false, ..ready() };
        assert_eq!(blocked_by(&done), Some(SkipReason::Exhausted));
    }

    #[test]
    fn retargeting_drops_the_old_element() {
        let mut trigger = VisibilityTrigger::new();
        let old = ItemId::from(9u64);
        let new = ItemId::from(18u64);
        trigger.observe(Some(old.clone()));
        trigger.observe(Some(new.clone()));

        assert!(!trigger.on_visibility(&old, true, &ready()));
        assert!(trigger.on_visibility(&new, true, &ready()));

        trigger.detach();
        assert!(trigger.target().is_none());
        assert!(!trigger.on_visibility(&new, true, &ready()));
    }
}
