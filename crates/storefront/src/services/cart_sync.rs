//! Optimistic cart state shared across requests.
//!
//! Each cart ID maps to one [`OptimisticCart`] behind a `tokio` mutex. The
//! lock is only held to run the adapter, never across a Shopify call, so a
//! request arriving while a mutation is in flight renders the optimistic
//! projection instead of waiting.
//!
//! Settling a dispatched mutation (response, follow-ups, revert) runs in its
//! own task. The request that dispatched it only waits for the result, so a
//! client that disconnects mid-request cannot leave its key in flight.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinError;
use tracing::{Instrument, instrument};
use wellspring_core::CartId;
use wellspring_core::cart::{
    Cart, CartError, CartEvent, CartMutation, OptimisticCart, PendingMutation, Submission,
};
use wellspring_core::observer::Observer;

use crate::shopify::{ShopifyError, StorefrontClient};

/// Idle carts are dropped from memory after this long and reloaded on demand.
const CART_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

/// Maximum number of carts kept in memory.
const MAX_CARTS: u64 = 10_000;

/// Where carts are loaded from and mutations are sent to.
pub trait CartBackend: Send + Sync + 'static {
    fn fetch_cart(
        &self,
        cart_id: &CartId,
    ) -> impl Future<Output = Result<Cart, ShopifyError>> + Send;

    fn send_mutation(
        &self,
        cart_id: &CartId,
        mutation: &CartMutation,
    ) -> impl Future<Output = Result<Cart, ShopifyError>> + Send;
}

impl CartBackend for StorefrontClient {
    async fn fetch_cart(&self, cart_id: &CartId) -> Result<Cart, ShopifyError> {
        self.get_cart(cart_id).await
    }

    async fn send_mutation(
        &self,
        cart_id: &CartId,
        mutation: &CartMutation,
    ) -> Result<Cart, ShopifyError> {
        self.apply_cart_mutation(cart_id, mutation).await
    }
}

/// Errors from the cart sync service.
///
/// Mutations rejected by Shopify are not errors here; they come back as
/// [`CartOutcome::error`] with the projection already reverted.
#[derive(Debug, Error)]
pub enum CartSyncError {
    /// The requested change is malformed (zero quantity, unconfirmed line).
    #[error("Invalid cart change: {0}")]
    Invalid(#[from] CartError),

    /// The cart could not be loaded from Shopify.
    #[error("Cart load failed: {0}")]
    Load(Arc<ShopifyError>),

    /// The task settling a dispatched mutation panicked.
    #[error("Cart settle task failed: {0}")]
    Settle(#[from] JoinError),
}

impl CartSyncError {
    /// Whether the cart no longer exists upstream (expired or checked out).
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Load(err) if matches!(**err, ShopifyError::NotFound(_)))
    }
}

/// Result of a submitted cart change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartOutcome {
    /// The cart to render.
    pub cart: Cart,
    /// Inline error from a rejected mutation.
    pub error: Option<String>,
}

/// Logs every cart transition.
pub struct CartEventLogger;

impl Observer<CartEvent> for CartEventLogger {
    fn notify(&self, event: &CartEvent) {
        match event {
            CartEvent::Projected { key, cart } => tracing::debug!(
                key = %key,
                cart_id = %cart.id,
                total_quantity = cart.total_quantity,
                "Cart mutation projected"
            ),
            CartEvent::Coalesced { key } => {
                tracing::debug!(key = %key, "Cart mutation coalesced with in-flight request");
            }
            CartEvent::Superseded { key, cart } => tracing::debug!(
                key = %key,
                cart_id = %cart.id,
                "Cart mutation superseded pending request"
            ),
            CartEvent::Reconciled { key, cart } => tracing::info!(
                key = ?key,
                cart_id = %cart.id,
                total_quantity = cart.total_quantity,
                "Cart reconciled with server"
            ),
            CartEvent::Reverted { key, message, cart } => tracing::warn!(
                key = %key,
                cart_id = %cart.id,
                message = %message,
                "Cart mutation rejected, reverted to server cart"
            ),
        }
    }
}

/// Shared registry of optimistic carts.
pub struct CartSync<B = StorefrontClient> {
    backend: Arc<B>,
    carts: Cache<CartId, Arc<Mutex<OptimisticCart>>>,
    observers: Vec<Arc<dyn Observer<CartEvent>>>,
}

impl<B: CartBackend> CartSync<B> {
    /// Create the registry with the logging observer attached to every cart.
    #[must_use]
    pub fn new(backend: B) -> Self {
        let carts = Cache::builder()
            .max_capacity(MAX_CARTS)
            .time_to_idle(CART_IDLE_TTL)
            .build();

        Self {
            backend: Arc::new(backend),
            carts,
            observers: vec![Arc::new(CartEventLogger)],
        }
    }

    /// Attach an extra observer to every cart loaded from now on.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn Observer<CartEvent>>) -> Self {
        self.observers.push(observer);
        self
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn track(&self, server_cart: Cart) -> Arc<Mutex<OptimisticCart>> {
        let mut cart = OptimisticCart::new(server_cart);
        for observer in &self.observers {
            cart.subscribe(Arc::clone(observer));
        }
        Arc::new(Mutex::new(cart))
    }

    async fn entry(&self, cart_id: &CartId) -> Result<Arc<Mutex<OptimisticCart>>, CartSyncError> {
        self.carts
            .try_get_with(cart_id.clone(), async {
                let cart = self.backend.fetch_cart(cart_id).await?;
                Ok::<_, ShopifyError>(self.track(cart))
            })
            .await
            .map_err(CartSyncError::Load)
    }

    /// Start tracking a cart that was just created upstream.
    pub async fn adopt(&self, server_cart: Cart) -> Cart {
        let tracked = self.track(server_cart);
        let projection = tracked.lock().await.projection().clone();
        self.carts.insert(projection.id.clone(), tracked).await;
        projection
    }

    /// Stop tracking a cart (it expired or was checked out).
    pub async fn forget(&self, cart_id: &CartId) {
        self.carts.invalidate(cart_id).await;
    }

    /// The merged cart to render, loading it from Shopify on first use.
    ///
    /// # Errors
    ///
    /// Returns [`CartSyncError::Load`] if the cart cannot be loaded.
    pub async fn projection(&self, cart_id: &CartId) -> Result<Cart, CartSyncError> {
        let entry = self.entry(cart_id).await?;
        let cart = entry.lock().await;
        Ok(cart.projection().clone())
    }

    /// Refetch the server cart and adopt it when nothing is pending.
    ///
    /// With mutations in flight the current projection is returned as is;
    /// their responses will bring a newer server cart anyway.
    ///
    /// # Errors
    ///
    /// Returns [`CartSyncError::Load`] if the cart cannot be loaded.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn refresh(&self, cart_id: &CartId) -> Result<Cart, CartSyncError> {
        let entry = self.entry(cart_id).await?;
        {
            let cart = entry.lock().await;
            if !cart.pending().is_empty() {
                return Ok(cart.projection().clone());
            }
        }

        let server_cart = self
            .backend
            .fetch_cart(cart_id)
            .await
            .map_err(|e| CartSyncError::Load(Arc::new(e)))?;

        let mut cart = entry.lock().await;
        if cart.pending().is_empty() {
            cart.reconcile(server_cart);
        }
        Ok(cart.projection().clone())
    }

    /// Project `mutation`, send it upstream if its key is idle, and settle it.
    ///
    /// When this request dispatches, the settle task also drives any
    /// follow-up that concurrent requests parked under the same key, so
    /// exactly one request per key is out at any time. The task keeps running
    /// if this future is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`CartSyncError::Invalid`] for malformed changes,
    /// [`CartSyncError::Load`] if the cart cannot be loaded and
    /// [`CartSyncError::Settle`] if the settle task panics. Rejections by
    /// Shopify are reported through [`CartOutcome::error`].
    #[instrument(skip(self, mutation), fields(cart_id = %cart_id, key = %mutation.key()))]
    pub async fn submit(
        &self,
        cart_id: &CartId,
        mutation: CartMutation,
    ) -> Result<CartOutcome, CartSyncError> {
        let entry = self.entry(cart_id).await?;

        let submission = entry.lock().await.submit(mutation)?;
        let Submission::Dispatch(pending) = submission else {
            let cart = entry.lock().await;
            return Ok(CartOutcome {
                cart: cart.projection().clone(),
                error: None,
            });
        };

        let task = tokio::spawn(
            settle(Arc::clone(&self.backend), cart_id.clone(), entry, pending)
                .instrument(tracing::Span::current()),
        );
        Ok(task.await?)
    }
}

/// Send `pending`, then every follow-up parked behind it, until the key is
/// idle or Shopify rejects one.
async fn settle<B: CartBackend>(
    backend: Arc<B>,
    cart_id: CartId,
    entry: Arc<Mutex<OptimisticCart>>,
    mut pending: PendingMutation,
) -> CartOutcome {
    loop {
        let result = backend.send_mutation(&cart_id, &pending.mutation).await;

        let mut cart = entry.lock().await;
        match result {
            Ok(server_cart) => match cart.resolve(&pending, server_cart) {
                Some(follow_up) => {
                    tracing::debug!(
                        key = %follow_up.key,
                        sequence = follow_up.sequence,
                        "Dispatching follow-up cart mutation"
                    );
                    pending = follow_up;
                }
                None => {
                    return CartOutcome {
                        cart: cart.projection().clone(),
                        error: None,
                    };
                }
            },
            Err(err) => {
                if !matches!(err, ShopifyError::UserError(_)) {
                    tracing::error!(error = %err, key = %pending.key, "Cart mutation failed");
                }
                cart.reject(&pending, err.display_message());
                return CartOutcome {
                    cart: cart.projection().clone(),
                    error: cart.take_error(),
                };
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    use tokio::sync::oneshot;
    use wellspring_core::cart::{CartLine, LineAdd, LineUpdate};
    use wellspring_core::observer::Recorder;
    use wellspring_core::{CartLineId, MerchandiseId};

    use super::*;

    /// Backend whose mutation responses are released by the test.
    #[derive(Default)]
    struct FakeBackend {
        cart: StdMutex<Option<Cart>>,
        sent: StdMutex<Vec<CartMutation>>,
        gates: StdMutex<VecDeque<oneshot::Receiver<Result<Cart, ShopifyError>>>>,
    }

    impl FakeBackend {
        fn with_cart(cart: Cart) -> Self {
            Self {
                cart: StdMutex::new(Some(cart)),
                ..Self::default()
            }
        }

        fn gate(&self) -> oneshot::Sender<Result<Cart, ShopifyError>> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().push_back(rx);
            tx
        }

        fn sent(&self) -> Vec<CartMutation> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl CartBackend for FakeBackend {
        async fn fetch_cart(&self, cart_id: &CartId) -> Result<Cart, ShopifyError> {
            self.cart
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ShopifyError::NotFound(format!("Cart not found: {cart_id}")))
        }

        async fn send_mutation(
            &self,
            _cart_id: &CartId,
            mutation: &CartMutation,
        ) -> Result<Cart, ShopifyError> {
            self.sent.lock().unwrap().push(mutation.clone());
            let gate = self.gates.lock().unwrap().pop_front();
            match gate {
                Some(rx) => rx.await.unwrap(),
                None => Err(ShopifyError::UserError("no response scripted".to_string())),
            }
        }
    }

    fn cart_id() -> CartId {
        CartId::new("gid://shopify/Cart/1")
    }

    fn server_cart(lines: &[(&str, &str, u32)]) -> Cart {
        let mut cart = Cart::empty(cart_id());
        cart.lines = lines
            .iter()
            .map(|(id, merchandise, quantity)| CartLine {
                id: CartLineId::new(*id),
                merchandise_id: MerchandiseId::new(*merchandise),
                quantity: *quantity,
                is_optimistic: false,
                merchandise: None,
                cost: None,
            })
            .collect();
        cart.recompute_total_quantity();
        cart
    }

    fn update(line: &str, quantity: u32) -> CartMutation {
        CartMutation::UpdateLines(vec![LineUpdate {
            id: CartLineId::new(line),
            quantity,
        }])
    }

    async fn wait_for_sent(sync: &CartSync<FakeBackend>, count: usize) {
        for _ in 0..100 {
            if sync.backend().sent().len() >= count {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {count} dispatched mutations");
    }

    #[tokio::test]
    async fn test_submit_reconciles_with_server_cart() {
        let backend = FakeBackend::with_cart(server_cart(&[("l1", "v1", 1)]));
        let gate = backend.gate();
        let sync = CartSync::new(backend);

        gate.send(Ok(server_cart(&[("l1", "v1", 3)]))).unwrap();
        let outcome = sync.submit(&cart_id(), update("l1", 3)).await.unwrap();

        assert!(outcome.error.is_none());
        assert_eq!(outcome.cart.total_quantity, 3);
        assert!(!outcome.cart.is_optimistic);
        assert_eq!(sync.backend().sent().len(), 1);
    }

    #[tokio::test]
    async fn test_projection_visible_while_in_flight() {
        let backend = FakeBackend::with_cart(server_cart(&[("l1", "v1", 1)]));
        let gate = backend.gate();
        let sync = Arc::new(CartSync::new(backend));

        let task = tokio::spawn({
            let sync = Arc::clone(&sync);
            async move { sync.submit(&cart_id(), update("l1", 4)).await }
        });
        wait_for_sent(&sync, 1).await;

        let during = sync.projection(&cart_id()).await.unwrap();
        assert_eq!(during.total_quantity, 4);
        assert!(during.is_optimistic);

        gate.send(Ok(server_cart(&[("l1", "v1", 4)]))).unwrap();
        let outcome = task.await.unwrap().unwrap();
        assert!(!outcome.cart.is_optimistic);
    }

    #[tokio::test]
    async fn test_superseded_submission_is_sent_once_after_settle() {
        let backend = FakeBackend::with_cart(server_cart(&[("l1", "v1", 1)]));
        let first_gate = backend.gate();
        let second_gate = backend.gate();
        let sync = Arc::new(CartSync::new(backend));

        let first = tokio::spawn({
            let sync = Arc::clone(&sync);
            async move { sync.submit(&cart_id(), update("l1", 2)).await }
        });
        wait_for_sent(&sync, 1).await;

        // Same key while in flight: parked, not sent.
        let second = sync.submit(&cart_id(), update("l1", 3)).await.unwrap();
        assert_eq!(second.cart.total_quantity, 3);
        let third = sync.submit(&cart_id(), update("l1", 5)).await.unwrap();
        assert_eq!(third.cart.total_quantity, 5);
        assert_eq!(sync.backend().sent().len(), 1);

        first_gate.send(Ok(server_cart(&[("l1", "v1", 2)]))).unwrap();
        wait_for_sent(&sync, 2).await;
        assert_eq!(sync.backend().sent()[1], update("l1", 5));

        second_gate.send(Ok(server_cart(&[("l1", "v1", 5)]))).unwrap();
        let outcome = first.await.unwrap().unwrap();
        assert_eq!(outcome.cart.total_quantity, 5);
        assert_eq!(sync.backend().sent().len(), 2);
    }

    #[tokio::test]
    async fn test_dropped_request_still_settles_its_key() {
        let backend = FakeBackend::with_cart(server_cart(&[("l1", "v1", 1)]));
        let first_gate = backend.gate();
        let second_gate = backend.gate();
        let sync = Arc::new(CartSync::new(backend));

        let request = tokio::spawn({
            let sync = Arc::clone(&sync);
            async move { sync.submit(&cart_id(), update("l1", 2)).await }
        });
        wait_for_sent(&sync, 1).await;

        // The client went away while Shopify was still answering.
        request.abort();
        assert!(request.await.unwrap_err().is_cancelled());

        let parked = sync.submit(&cart_id(), update("l1", 1)).await.unwrap();
        assert!(parked.cart.is_optimistic);

        first_gate.send(Ok(server_cart(&[("l1", "v1", 2)]))).unwrap();
        wait_for_sent(&sync, 2).await;
        assert_eq!(sync.backend().sent()[1], update("l1", 1));

        second_gate.send(Ok(server_cart(&[("l1", "v1", 1)]))).unwrap();
        for _ in 0..100 {
            if !sync.projection(&cart_id()).await.unwrap().is_optimistic {
                break;
            }
            tokio::task::yield_now().await;
        }

        let settled = sync.projection(&cart_id()).await.unwrap();
        assert!(!settled.is_optimistic);
        assert_eq!(settled.total_quantity, 1);

        let refreshed = sync.refresh(&cart_id()).await.unwrap();
        assert!(!refreshed.is_optimistic);
    }

    #[tokio::test]
    async fn test_identical_submission_coalesces() {
        let backend = FakeBackend::with_cart(server_cart(&[("l1", "v1", 1)]));
        let gate = backend.gate();
        let recorder = Arc::new(Recorder::<CartEvent>::new());
        let sync = Arc::new(
            CartSync::new(backend).with_observer(Arc::clone(&recorder) as Arc<dyn Observer<CartEvent>>),
        );

        let first = tokio::spawn({
            let sync = Arc::clone(&sync);
            async move { sync.submit(&cart_id(), update("l1", 2)).await }
        });
        wait_for_sent(&sync, 1).await;

        sync.submit(&cart_id(), update("l1", 2)).await.unwrap();
        assert!(
            recorder
                .events()
                .iter()
                .any(|e| matches!(e, CartEvent::Coalesced { .. }))
        );

        gate.send(Ok(server_cart(&[("l1", "v1", 2)]))).unwrap();
        first.await.unwrap().unwrap();
        assert_eq!(sync.backend().sent().len(), 1);
    }

    #[tokio::test]
    async fn test_rejection_reverts_and_reports_first_message() {
        let backend = FakeBackend::with_cart(server_cart(&[("l1", "v1", 1)]));
        let gate = backend.gate();
        let sync = CartSync::new(backend);

        gate.send(Err(ShopifyError::UserError(
            "Only 1 item available".to_string(),
        )))
        .unwrap();
        let outcome = sync.submit(&cart_id(), update("l1", 9)).await.unwrap();

        assert_eq!(outcome.error.as_deref(), Some("Only 1 item available"));
        assert_eq!(outcome.cart.total_quantity, 1);
        assert!(!outcome.cart.is_optimistic);
    }

    #[tokio::test]
    async fn test_transport_failure_shows_generic_message() {
        let backend = FakeBackend::with_cart(server_cart(&[]));
        let gate = backend.gate();
        let sync = CartSync::new(backend);

        gate.send(Err(ShopifyError::RateLimited(2))).unwrap();
        let outcome = sync
            .submit(
                &cart_id(),
                CartMutation::AddLines(vec![LineAdd {
                    merchandise_id: MerchandiseId::new("v1"),
                    quantity: 1,
                }]),
            )
            .await
            .unwrap();

        assert!(outcome.error.unwrap().starts_with("Too many requests"));
        assert!(!outcome.cart.has_items());
    }

    #[tokio::test]
    async fn test_invalid_mutation_is_not_sent() {
        let backend = FakeBackend::with_cart(server_cart(&[("l1", "v1", 1)]));
        let sync = CartSync::new(backend);

        let err = sync
            .submit(
                &cart_id(),
                CartMutation::AddLines(vec![LineAdd {
                    merchandise_id: MerchandiseId::new("v1"),
                    quantity: 0,
                }]),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CartSyncError::Invalid(_)));
        assert!(sync.backend().sent().is_empty());
    }

    #[tokio::test]
    async fn test_missing_cart_is_not_found() {
        let sync = CartSync::new(FakeBackend::default());
        let err = sync.projection(&cart_id()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_adopt_and_refresh() {
        let backend = FakeBackend::with_cart(server_cart(&[("l1", "v1", 2)]));
        let sync = CartSync::new(backend);

        let adopted = sync.adopt(server_cart(&[("l1", "v1", 1)])).await;
        assert_eq!(adopted.total_quantity, 1);
        assert_eq!(sync.projection(&cart_id()).await.unwrap().total_quantity, 1);

        let refreshed = sync.refresh(&cart_id()).await.unwrap();
        assert_eq!(refreshed.total_quantity, 2);

        sync.forget(&cart_id()).await;
        assert_eq!(sync.projection(&cart_id()).await.unwrap().total_quantity, 2);
    }
}
