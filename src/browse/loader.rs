//! Runs collection requests on the tokio runtime.
//!
//! - Each request becomes one spawned task against the [`QueryService`]
//! - Completions come back over a flume channel, still tagged with the
//!   generation they were issued under
//! - The owning thread drains them with [`FetchLoader::poll_completions`] and
//!   applies them itself; no collection state is touched off that thread

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use flume::{Receiver, Sender};
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

use crate::browse::collection::{FetchTicket, PageRequest, RefreshRequest, RefreshTicket};
use crate::error::QueryError;
use crate::models::{CatalogItem, ItemPage};
use crate::services::QueryService;

/// Result of background work, delivered to the owning thread.
#[derive(Debug)]
pub enum Completion {
    Page {
        ticket: FetchTicket,
        result: Result<ItemPage, QueryError>,
    },
    Refresh {
        ticket: RefreshTicket,
        result: Result<CatalogItem, QueryError>,
    },
    /// A delayed focused-item refresh is due.
    RefreshDue { generation: u64 },
}

/// Decrements the in-flight count when the task ends, even if it panics.
struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct FetchLoader {
    service: Arc<dyn QueryService>,
    runtime: Handle,
    result_tx: Sender<Completion>,
    result_rx: Receiver<Completion>,
    in_flight: Arc<AtomicUsize>,
}

impl FetchLoader {
    pub fn new(service: Arc<dyn QueryService>, runtime: Handle) -> Self {
        let (result_tx, result_rx) = flume::unbounded();
        Self {
            service,
            runtime,
            result_tx,
            result_rx,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn service(&self) -> &Arc<dyn QueryService> {
        &self.service
    }

    pub fn submit_page(&self, request: PageRequest) {
        let service = Arc::clone(&self.service);
        let tx = self.result_tx.clone();
        let guard = InFlightGuard::new(&self.in_flight);
        trace!(offset = request.ticket.offset, "page task spawned");

        self.runtime.spawn(async move {
            let _guard = guard;
            let result = service.query_items(request.query).await;
            let completion = Completion::Page {
                ticket: request.ticket,
                result,
            };
            if tx.send(completion).is_err() {
                debug!("loader dropped before page completed");
            }
        });
    }

    pub fn submit_refresh(&self, request: RefreshRequest) {
        let service = Arc::clone(&self.service);
        let tx = self.result_tx.clone();
        let guard = InFlightGuard::new(&self.in_flight);

        self.runtime.spawn(async move {
            let _guard = guard;
            let result = service.fetch_item(request.ticket.id).await;
            let completion = Completion::Refresh {
                ticket: request.ticket,
                result,
            };
            if tx.send(completion).is_err() {
                debug!("loader dropped before refresh completed");
            }
        });
    }

    /// Delivers [`Completion::RefreshDue`] after `delay`.
    pub fn schedule_refresh(&self, generation: u64, delay: Duration) {
        let tx = self.result_tx.clone();
        let guard = InFlightGuard::new(&self.in_flight);

        self.runtime.spawn(async move {
            let _guard = guard;
            tokio::time::sleep(delay).await;
            let _ = tx.send(Completion::RefreshDue { generation });
        });
    }

    /// Drain finished work without blocking.
    pub fn poll_completions(&self) -> Vec<Completion> {
        let mut completions = Vec::new();
        while let Ok(completion) = self.result_rx.try_recv() {
            completions.push(completion);
        }
        completions
    }

    /// Waits for the next completion. Returns `None` once nothing is in
    /// flight and the channel is empty.
    pub async fn next_completion(&self) -> Option<Completion> {
        if let Ok(completion) = self.result_rx.try_recv() {
            return Some(completion);
        }
        if self.in_flight() == 0 {
            // A task may have sent and finished since the first check.
            return self.result_rx.try_recv().ok();
        }
        match self.result_rx.recv_async().await {
            Ok(completion) => Some(completion),
            Err(e) => {
                warn!(error = ?e, "completion channel closed");
                None
            }
        }
    }

    /// Number of spawned tasks that have not finished.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight() > 0 || !self.result_rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browse::collection::{GenerationSource, PaginatedCollection};
    use crate::models::{BaseQuery, BrowseRequest, ItemCategory, ItemId, QueryKind};
    use crate::services::InMemoryCatalog;

    fn catalog(n: u128) -> Arc<InMemoryCatalog> {
        Arc::new(InMemoryCatalog::new(
            (0..n)
                .map(|i| CatalogItem::new(ItemId::from_u128(i), format!("{i:03}"), ItemCategory::Movie))
                .collect(),
        ))
    }

    #[tokio::test]
    async fn test_page_completion_round_trip() {
        let catalog = catalog(25);
        let loader = FetchLoader::new(catalog.clone(), Handle::current());
        let request = BrowseRequest::new(QueryKind::Items, BaseQuery::default(), 10);
        let mut collection = PaginatedCollection::new(request, 5, GenerationSource::new());

        loader.submit_page(collection.fetch_next().unwrap());
        match loader.next_completion().await {
            Some(Completion::Page { ticket, result }) => {
                let outcome = collection.apply_page(ticket, result).unwrap();
                assert_eq!(outcome.appended, 10);
                assert_eq!(outcome.total, 25);
            }
            other => panic!("unexpected completion {other:?}"),
        }
        assert_eq!(catalog.query_count(), 1);
        assert!(loader.next_completion().await.is_none());
    }

    #[tokio::test]
    async fn test_refresh_due_after_delay() {
        let loader = FetchLoader::new(catalog(1), Handle::current());
        loader.schedule_refresh(7, Duration::from_millis(5));
        assert!(loader.poll_completions().is_empty());
        match loader.next_completion().await {
            Some(Completion::RefreshDue { generation }) => assert_eq!(generation, 7),
            other => panic!("unexpected completion {other:?}"),
        }
    }
}
