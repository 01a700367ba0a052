use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::error::GatewayError;
use crate::filter::FilterState;
use crate::gateway::CollectionGateway;
use crate::types::{CatalogItem, PageResult};

#[derive(Debug, Clone)]
enum Scripted<T> {
    Page(PageResult<T>),
    Fail { status: u16, message: String },
}

type Key = (FilterState, u32);

/// In-memory gateway answering from a script, for tests and offline demos.
///
/// Each `(filter, page)` has a queue of answers; the last one repeats once
/// the queue is down to it. Unscripted requests get an empty last page.
/// `hold` parks the next matching request until the returned `Notify` fires,
/// which is how tests make a response arrive late.
pub struct FakeGateway<T> {
    script: Mutex<HashMap<Key, VecDeque<Scripted<T>>>>,
    holds: Mutex<HashMap<Key, Arc<Notify>>>,
    calls: Mutex<Vec<(u32, FilterState)>>,
}

fn locked<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<T: CatalogItem + Clone + Send + Sync + 'static> Default for FakeGateway<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: CatalogItem + Clone + Send + Sync + 'static> FakeGateway<T> {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(HashMap::new()),
            holds: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Script consecutive pages for `filter`; only the last reports `has_more = false`.
    pub fn with_pages(self, filter: &FilterState, pages: Vec<Vec<T>>) -> Self {
        let count = pages.len();
        for (index, items) in pages.into_iter().enumerate() {
            let has_more = index + 1 < count;
            self.push_page(filter, index as u32 + 1, PageResult::new(items, has_more));
        }
        self
    }

    pub fn push_page(&self, filter: &FilterState, page: u32, result: PageResult<T>) {
        self.push(filter, page, Scripted::Page(result));
    }

    pub fn push_failure(&self, filter: &FilterState, page: u32, status: u16, message: &str) {
        self.push(
            filter,
            page,
            Scripted::Fail {
                status,
                message: message.to_string(),
            },
        );
    }

    /// Park the next request for `(filter, page)` until the returned handle is notified.
    pub fn hold(&self, filter: &FilterState, page: u32) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        locked(&self.holds).insert((filter.clone(), page), Arc::clone(&notify));
        notify
    }

    /// Every request seen so far, as `(page, filter)`.
    pub fn calls(&self) -> Vec<(u32, FilterState)> {
        locked(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        locked(&self.calls).len()
    }

    fn push(&self, filter: &FilterState, page: u32, answer: Scripted<T>) {
        locked(&self.script)
            .entry((filter.clone(), page))
            .or_default()
            .push_back(answer);
    }

    fn next_answer(&self, key: &Key) -> Option<Scripted<T>> {
        let mut script = locked(&self.script);
        let queue = script.get_mut(key)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl<T: CatalogItem + Clone + Send + Sync + 'static> CollectionGateway for FakeGateway<T> {
    type Item = T;

    async fn fetch_page(&self, page: u32, filter: &FilterState) -> Result<PageResult<T>, GatewayError> {
        let key = (filter.clone(), page);
        locked(&self.calls).push((page, filter.clone()));

        let hold = locked(&self.holds).remove(&key);
        if let Some(notify) = hold {
            notify.notified().await;
        }

        match self.next_answer(&key) {
            Some(Scripted::Page(result)) => Ok(result),
            Some(Scripted::Fail { status, message }) => Err(GatewayError::Status { status, message }),
            None => Ok(PageResult::last(Vec::new())),
        }
    }
}
