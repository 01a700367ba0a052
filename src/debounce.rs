use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::filter::FilterState;
use crate::gateway::CollectionGateway;
use crate::loader::CatalogLoader;

/// Sending side of a debouncer. Dropping it flushes the pending value.
#[derive(Debug)]
pub struct DebounceInput<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for DebounceInput<T> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<T> DebounceInput<T> {
    /// Returns false once the debouncer has shut down.
    pub fn push(&self, value: T) -> bool {
        self.tx.send(value).is_ok()
    }
}

/// Coalesce bursts: each value restarts the quiet timer, and only the last
/// value of a burst comes out once `quiet` has passed with no new input.
pub fn debounce<T: Send + 'static>(quiet: Duration) -> (DebounceInput<T>, mpsc::Receiver<T>) {
    let (in_tx, mut in_rx) = mpsc::unbounded_channel::<T>();
    let (out_tx, out_rx) = mpsc::channel::<T>(16);

    tokio::spawn(async move {
        while let Some(first) = in_rx.recv().await {
            let mut pending = first;
            let mut deadline = Instant::now() + quiet;
            let mut input_open = true;

            while input_open {
                tokio::select! {
                    next = in_rx.recv() => match next {
                        Some(value) => {
                            pending = value;
                            deadline = Instant::now() + quiet;
                        }
                        None => input_open = false,
                    },
                    _ = sleep_until(deadline) => break,
                }
            }

            if out_tx.send(pending).await.is_err() {
                return; // nobody is listening anymore
            }
            if !input_open {
                return;
            }
        }
    });

    (DebounceInput { tx: in_tx }, out_rx)
}

/// Hand every debounced filter to `loader`. Each `set_filter` runs on its
/// own task so a newer filter can supersede one still loading.
pub fn feed_loader<G: CollectionGateway>(
    loader: CatalogLoader<G>,
    mut filters: mpsc::Receiver<FilterState>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(filter) = filters.recv().await {
            let loader = loader.clone();
            tokio::spawn(async move {
                loader.set_filter(filter).await;
            });
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_to_last_value() {
        let (input, mut output) = debounce::<&'static str>(Duration::from_millis(300));
        for text in ["c", "ca", "cal", "calc"] {
            input.push(text);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(output.recv().await, Some("calc"));

        input.push("physics");
        assert_eq!(output.recv().await, Some("physics"));
    }

    #[tokio::test(start_paused = true)]
    async fn separate_bursts_emit_separately() {
        let (input, mut output) = debounce::<u32>(Duration::from_millis(50));
        input.push(1);
        tokio::time::sleep(Duration::from_millis(200)).await;
        input.push(2);
        input.push(3);
        assert_eq!(output.recv().await, Some(1));
        assert_eq!(output.recv().await, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn closing_input_flushes_pending_value() {
        let (input, mut output) = debounce::<u32>(Duration::from_secs(60));
        input.push(7);
        drop(input);
        assert_eq!(output.recv().await, Some(7));
        assert_eq!(output.recv().await, None);
    }
}
