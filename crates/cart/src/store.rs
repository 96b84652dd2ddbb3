//! The cart store.
//!
//! A [`CartStore`] owns the current [`CartCollection`] and keeps device
//! storage in step with it:
//!
//! 1. A mutation runs its reducer against the latest published cart while
//!    holding the `watch` channel's write lock, so two mutations can never
//!    read the same starting cart.
//! 2. The result is visible to [`CartStore::products`] and subscribers as soon
//!    as the lock is released.
//! 3. The mutation then queues a write request. One writer task per store
//!    drains the queue, serializes whatever cart is newest at that moment and
//!    replaces the stored value. Every request drained in the same batch gets
//!    that write's outcome.
//!
//! Writes are best-effort. A failed write is logged, captured to Sentry and
//! returned through the mutation's [`PendingWrite`]; the in-memory cart is
//! never rolled back. The next successful write brings storage up to date.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use marketplace_core::{CartChange, CartCollection, NewLineItem, ProductId};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::error::{CartError, Result, add_breadcrumb};
use crate::storage::CartStorage;

type WriteOutcome = Result<()>;
type WriteRequest = oneshot::Sender<WriteOutcome>;

/// Shared handle to the cart.
///
/// Cheap to clone; all clones see and mutate the same cart.
#[derive(Clone, Debug)]
pub struct CartStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    key: String,
    state: watch::Sender<CartCollection>,
    writes: Mutex<Option<mpsc::UnboundedSender<WriteRequest>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl CartStore {
    /// Load the cart stored under `key` and start the writer task.
    ///
    /// A missing value, a read error, or a value that does not decode as a
    /// cart all start the session with an empty cart. Those cases are logged,
    /// not returned.
    ///
    /// Must be called from within a Tokio runtime.
    #[instrument(skip(storage))]
    pub async fn load<S: CartStorage>(storage: S, key: &str) -> Self {
        let cart = match storage.get(key).await {
            Ok(Some(value)) => CartCollection::from_json(&value).unwrap_or_else(|e| {
                warn!(error = %e, "Stored cart is malformed, starting empty");
                CartCollection::new()
            }),
            Ok(None) => {
                debug!("No stored cart, starting empty");
                CartCollection::new()
            }
            Err(e) => {
                warn!(error = %e, "Failed to read stored cart, starting empty");
                CartCollection::new()
            }
        };

        info!(
            lines = cart.len(),
            units = cart.total_quantity(),
            "Cart loaded"
        );

        Self::start(storage, key, cart)
    }

    fn start<S: CartStorage>(storage: S, key: &str, cart: CartCollection) -> Self {
        let (state, snapshots) = watch::channel(cart);
        let (writes, requests) = mpsc::unbounded_channel();

        let writer = tokio::spawn(run_writer(storage, key.to_string(), snapshots, requests));

        Self {
            inner: Arc::new(StoreInner {
                key: key.to_string(),
                state,
                writes: Mutex::new(Some(writes)),
                writer: Mutex::new(Some(writer)),
            }),
        }
    }

    /// Storage key this store writes to.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Snapshot of the current cart.
    #[must_use]
    pub fn products(&self) -> CartCollection {
        self.inner.state.borrow().clone()
    }

    /// Receiver that is notified whenever the cart changes.
    ///
    /// Unchanged mutations (unknown IDs) do not notify.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartCollection> {
        self.inner.state.subscribe()
    }

    /// Add one unit of a product, appending it if it is not in the cart yet.
    pub fn add_to_cart(&self, item: NewLineItem) -> PendingWrite {
        let id = item.id.clone();
        self.apply(&id, |cart| cart.add(item))
    }

    /// Add one unit to a line already in the cart.
    ///
    /// Unknown IDs leave the cart and storage untouched.
    pub fn increment(&self, id: &ProductId) -> PendingWrite {
        self.apply(id, |cart| cart.increment(id))
    }

    /// Take one unit off a line; the line is removed when its last unit goes.
    ///
    /// Unknown IDs leave the cart and storage untouched.
    pub fn decrement(&self, id: &ProductId) -> PendingWrite {
        self.apply(id, |cart| cart.decrement(id))
    }

    /// Stop accepting writes and wait for queued ones to finish.
    ///
    /// The cart stays readable and mutable in memory afterwards, but further
    /// mutations resolve to [`CartError::Closed`]. Calling this more than once
    /// is harmless.
    pub async fn close(&self) {
        drop(
            self.inner
                .writes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );

        let writer = self
            .inner
            .writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(writer) = writer {
            if let Err(e) = writer.await {
                warn!(error = %e, "Cart writer task ended abnormally");
            }
            debug!("Cart store closed");
        }
    }

    fn apply(
        &self,
        id: &ProductId,
        reducer: impl FnOnce(&mut CartCollection) -> CartChange,
    ) -> PendingWrite {
        let mut change = CartChange::Unchanged;
        self.inner.state.send_if_modified(|cart| {
            change = reducer(cart);
            change.is_modified()
        });

        debug!(product_id = %id, ?change, "Cart mutation applied");

        if !change.is_modified() {
            return PendingWrite::new(change, WriteState::Skipped);
        }

        add_breadcrumb(
            "cart",
            &format!("{change:?}"),
            Some(&[("product_id", id.as_str())]),
        );

        let (tx, rx) = oneshot::channel();
        let queued = self
            .inner
            .writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|writes| writes.send(tx).is_ok());

        if queued {
            PendingWrite::new(change, WriteState::Queued(rx))
        } else {
            warn!(product_id = %id, "Cart store closed, change kept in memory only");
            PendingWrite::new(change, WriteState::Closed)
        }
    }
}

/// Persist the newest cart once per batch of queued requests.
async fn run_writer<S: CartStorage>(
    storage: S,
    key: String,
    snapshots: watch::Receiver<CartCollection>,
    mut requests: mpsc::UnboundedReceiver<WriteRequest>,
) {
    while let Some(first) = requests.recv().await {
        let mut waiters = vec![first];
        while let Ok(next) = requests.try_recv() {
            waiters.push(next);
        }

        // Every drained request published before it was queued, so the
        // current value already contains all of their changes.
        let encoded = snapshots.borrow().to_json();

        let outcome = match encoded {
            Ok(value) => storage.set(&key, &value).await.map_err(CartError::from),
            Err(e) => Err(CartError::from(e)),
        };

        match &outcome {
            Ok(()) => debug!(batch = waiters.len(), "Cart persisted"),
            Err(e) => e.report("Failed to persist cart"),
        }

        for waiter in waiters {
            // The caller may have dropped its PendingWrite
            let _ = waiter.send(outcome.clone());
        }
    }
}

enum WriteState {
    Skipped,
    Queued(oneshot::Receiver<WriteOutcome>),
    Closed,
}

/// Outcome of one mutation's write to storage.
///
/// The mutation itself has already happened when this is returned. Await it
/// to learn whether storage caught up, or drop it to fire and forget; the
/// write happens either way.
///
/// Resolves to `Ok(())` immediately when the mutation changed nothing.
pub struct PendingWrite {
    change: CartChange,
    state: WriteState,
}

impl PendingWrite {
    const fn new(change: CartChange, state: WriteState) -> Self {
        Self { change, state }
    }

    /// What the mutation did to the in-memory cart.
    #[must_use]
    pub const fn change(&self) -> CartChange {
        self.change
    }
}

impl std::fmt::Debug for PendingWrite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            WriteState::Skipped => "skipped",
            WriteState::Queued(_) => "queued",
            WriteState::Closed => "closed",
        };
        f.debug_struct("PendingWrite")
            .field("change", &self.change)
            .field("state", &state)
            .finish()
    }
}

impl Future for PendingWrite {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.state {
            WriteState::Skipped => Poll::Ready(Ok(())),
            WriteState::Closed => Poll::Ready(Err(CartError::Closed)),
            WriteState::Queued(rx) => Pin::new(rx)
                .poll(cx)
                .map(|received| received.unwrap_or(Err(CartError::Closed))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marketplace_core::{CART_STORAGE_KEY, Price, Quantity};

    use super::*;
    use crate::storage::{MemoryStorage, StorageError};

    fn shirt() -> NewLineItem {
        NewLineItem {
            id: ProductId::new("1"),
            title: "Shirt".to_string(),
            image_url: "u".to_string(),
            price: Price::from(10),
        }
    }

    fn item(id: &str) -> NewLineItem {
        NewLineItem {
            id: ProductId::new(id),
            ..shirt()
        }
    }

    fn quantity(store: &CartStore, id: &str) -> Option<u32> {
        store
            .products()
            .get(&ProductId::new(id))
            .map(|line| line.quantity.get())
    }

    fn stored(storage: &MemoryStorage) -> CartCollection {
        CartCollection::from_json(&storage.value(CART_STORAGE_KEY).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_load_empty_storage() {
        let store = CartStore::load(MemoryStorage::new(), CART_STORAGE_KEY).await;
        assert!(store.products().is_empty());
    }

    #[tokio::test]
    async fn test_load_malformed_value_starts_empty() {
        let storage = MemoryStorage::with_value(CART_STORAGE_KEY, "{not json");
        let store = CartStore::load(storage, CART_STORAGE_KEY).await;
        assert!(store.products().is_empty());
    }

    #[tokio::test]
    async fn test_load_legacy_negative_quantity_starts_empty() {
        let storage = MemoryStorage::with_value(
            CART_STORAGE_KEY,
            r#"[{"id":"1","title":"Shirt","image_url":"u","price":10,"quantity":-1}]"#,
        );
        let store = CartStore::load(storage, CART_STORAGE_KEY).await;
        assert!(store.products().is_empty());
    }

    #[tokio::test]
    async fn test_add_publishes_before_write_completes() {
        let storage = MemoryStorage::new();
        storage.hold_writes();
        let store = CartStore::load(storage.clone(), CART_STORAGE_KEY).await;

        let pending = store.add_to_cart(shirt());
        assert_eq!(pending.change(), CartChange::Added);
        assert_eq!(quantity(&store, "1"), Some(1));
        assert!(storage.value(CART_STORAGE_KEY).is_none());

        storage.release_writes();
        pending.await.unwrap();
        assert_eq!(stored(&storage), store.products());
    }

    #[tokio::test]
    async fn test_back_to_back_increments_are_not_lost() {
        let storage = MemoryStorage::new();
        let store = CartStore::load(storage.clone(), CART_STORAGE_KEY).await;
        store.add_to_cart(shirt()).await.unwrap();

        storage.hold_writes();
        let first = store.increment(&ProductId::new("1"));
        let second = store.increment(&ProductId::new("1"));
        assert_eq!(quantity(&store, "1"), Some(3));

        storage.release_writes();
        first.await.unwrap();
        second.await.unwrap();
        assert_eq!(stored(&storage), store.products());
    }

    #[tokio::test]
    async fn test_concurrent_tasks_serialize_mutations() {
        let store = CartStore::load(MemoryStorage::new(), CART_STORAGE_KEY).await;
        store.add_to_cart(shirt()).await.unwrap();

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.increment(&ProductId::new("1")).await })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(quantity(&store, "1"), Some(51));
    }

    #[tokio::test]
    async fn test_unknown_id_does_not_write() {
        let storage = MemoryStorage::new();
        let store = CartStore::load(storage.clone(), CART_STORAGE_KEY).await;
        store.add_to_cart(shirt()).await.unwrap();
        let before = store.products();
        let writes = storage.write_count();

        let pending = store.increment(&ProductId::new("missing"));
        assert_eq!(pending.change(), CartChange::Unchanged);
        pending.await.unwrap();
        store.decrement(&ProductId::new("missing")).await.unwrap();

        assert_eq!(store.products(), before);
        assert_eq!(storage.write_count(), writes);
    }

    #[tokio::test]
    async fn test_decrement_last_unit_removes_line() {
        let storage = MemoryStorage::new();
        let store = CartStore::load(storage.clone(), CART_STORAGE_KEY).await;
        store.add_to_cart(item("a")).await.unwrap();
        store.add_to_cart(item("b")).await.unwrap();

        let pending = store.decrement(&ProductId::new("a"));
        assert_eq!(pending.change(), CartChange::Removed);
        pending.await.unwrap();

        let ids: Vec<_> = store.products().iter().map(|l| l.id.to_string()).collect();
        assert_eq!(ids, vec!["b"]);
        assert_eq!(stored(&storage), store.products());
    }

    #[tokio::test]
    async fn test_write_failure_is_reported_without_rollback() {
        let storage = MemoryStorage::new();
        let store = CartStore::load(storage.clone(), CART_STORAGE_KEY).await;
        store.add_to_cart(shirt()).await.unwrap();

        storage.fail_writes(true);
        let result = store.increment(&ProductId::new("1")).await;
        assert!(matches!(
            result,
            Err(CartError::Storage(StorageError::Rejected(_)))
        ));
        assert_eq!(quantity(&store, "1"), Some(2));
        assert_eq!(
            stored(&storage).get(&ProductId::new("1")).unwrap().quantity,
            Quantity::ONE
        );

        // Next successful write reconciles storage with memory
        storage.fail_writes(false);
        store.increment(&ProductId::new("1")).await.unwrap();
        assert_eq!(stored(&storage), store.products());
    }

    #[tokio::test]
    async fn test_coalesced_writes_share_outcome() {
        let storage = MemoryStorage::new();
        let store = CartStore::load(storage.clone(), CART_STORAGE_KEY).await;

        storage.hold_writes();
        let pending: Vec<_> = ["a", "b", "c", "d"]
            .into_iter()
            .map(|id| store.add_to_cart(item(id)))
            .collect();
        storage.release_writes();

        for write in pending {
            write.await.unwrap();
        }

        // All four requests were queued before the writer ran, so they share
        // one write of the final cart.
        assert_eq!(storage.write_count(), 1);
        assert_eq!(stored(&storage), store.products());
        assert_eq!(store.products().len(), 4);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let store = CartStore::load(MemoryStorage::new(), CART_STORAGE_KEY).await;
        let mut rx = store.subscribe();

        let _ = store.add_to_cart(shirt());
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().total_quantity(), 1);

        let _ = store.increment(&ProductId::new("missing"));
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_debug_is_derived_with_key() {
        let store = CartStore::load(MemoryStorage::new(), CART_STORAGE_KEY).await;
        store.add_to_cart(shirt()).await.unwrap();

        let debug = format!("{store:?}");
        assert!(debug.starts_with("CartStore"));
        assert!(debug.contains(CART_STORAGE_KEY));
    }

    #[tokio::test]
    async fn test_close_flushes_then_rejects() {
        let storage = MemoryStorage::new();
        let store = CartStore::load(storage.clone(), CART_STORAGE_KEY).await;

        let pending = store.add_to_cart(shirt());
        store.close().await;
        pending.await.unwrap();
        assert_eq!(stored(&storage), store.products());

        let after = store.increment(&ProductId::new("1"));
        assert!(matches!(after.await, Err(CartError::Closed)));
        assert_eq!(quantity(&store, "1"), Some(2));

        store.close().await;
    }
}
