//! Stateful optimistic adapter over a server-owned cart.
//!
//! [`OptimisticCart`] keeps the last confirmed server cart plus the mutations
//! that are still waiting for a response, and renders the merge of the two.
//! At most one request per [`MutationKey`] is ever out. A repeated submission
//! under a busy key either coalesces (same payload) or supersedes the pending
//! effect and waits in a single follow-up slot. Adds are increments, so a
//! superseding add accumulates into the follow-up and is shown on top of the
//! in-flight add.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::controls::LineControls;
use super::model::Cart;
use super::mutation::{CartError, CartMutation, MutationKey, PendingMutation};
use super::projection::{apply_mutation, reconcile};
use crate::observer::{Observer, Observers};
use crate::types::CartLineId;

/// What the caller must do after [`OptimisticCart::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Send this mutation to the server, then report back with
    /// [`OptimisticCart::resolve`] or [`OptimisticCart::reject`].
    Dispatch(PendingMutation),
    /// Same payload as the pending request under this key; nothing to send.
    Coalesced,
    /// Replaced the pending effect; it is sent once the current request settles.
    Superseded,
}

/// State transitions announced to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    Projected { key: MutationKey, cart: Cart },
    Coalesced { key: MutationKey },
    Superseded { key: MutationKey, cart: Cart },
    /// `key` is `None` when the server cart arrived outside a mutation (a refetch).
    Reconciled { key: Option<MutationKey>, cart: Cart },
    Reverted { key: MutationKey, message: String, cart: Cart },
}

#[derive(Debug, Clone)]
struct Entry {
    in_flight: PendingMutation,
    follow_up: Option<PendingMutation>,
    /// Whether this entry's effect is part of the current projection.
    live: bool,
}

impl Entry {
    const fn new(in_flight: PendingMutation) -> Self {
        Self {
            in_flight,
            follow_up: None,
            live: true,
        }
    }

    /// The payload the user most recently asked for under this key.
    fn effective(&self) -> &PendingMutation {
        self.follow_up.as_ref().unwrap_or(&self.in_flight)
    }

    /// The mutations this entry contributes to the projection while live.
    fn effects(&self) -> impl Iterator<Item = &PendingMutation> {
        let stacked = self.in_flight.mutation.kind().is_additive();
        (stacked || self.follow_up.is_none())
            .then_some(&self.in_flight)
            .into_iter()
            .chain(self.follow_up.as_ref())
    }
}

/// A confirmed cart plus its unconfirmed local edits.
#[derive(Debug)]
pub struct OptimisticCart {
    confirmed: Cart,
    projection: Cart,
    entries: BTreeMap<MutationKey, Entry>,
    next_sequence: u64,
    last_error: Option<String>,
    observers: Observers<CartEvent>,
}

impl OptimisticCart {
    /// Start from a server cart with nothing pending.
    #[must_use]
    pub fn new(server_cart: Cart) -> Self {
        let confirmed = reconcile(server_cart);
        Self {
            projection: confirmed.clone(),
            confirmed,
            entries: BTreeMap::new(),
            next_sequence: 1,
            last_error: None,
            observers: Observers::new(),
        }
    }

    pub fn subscribe(&mut self, observer: Arc<dyn Observer<CartEvent>>) {
        self.observers.subscribe(observer);
    }

    /// The merged cart to render.
    #[must_use]
    pub const fn projection(&self) -> &Cart {
        &self.projection
    }

    /// The last cart the server returned.
    #[must_use]
    pub const fn confirmed(&self) -> &Cart {
        &self.confirmed
    }

    /// Message from the most recent rejected mutation, for inline display.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn take_error(&mut self) -> Option<String> {
        self.last_error.take()
    }

    /// Stepper state for a line of the current projection.
    #[must_use]
    pub fn controls(&self, line_id: &CartLineId) -> Option<LineControls> {
        self.projection.line(line_id).map(LineControls::for_line)
    }

    #[must_use]
    pub fn is_in_flight(&self, key: &MutationKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Every unconfirmed mutation, in-flight requests and follow-ups, oldest first.
    #[must_use]
    pub fn pending(&self) -> Vec<&PendingMutation> {
        let mut pending: Vec<&PendingMutation> = self
            .entries
            .values()
            .flat_map(|entry| std::iter::once(&entry.in_flight).chain(entry.follow_up.as_ref()))
            .collect();
        pending.sort_by_key(|mutation| mutation.sequence);
        pending
    }

    /// Project a user action and decide whether a request has to go out.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] if the mutation is invalid; the projection is
    /// left untouched.
    pub fn submit(&mut self, mutation: CartMutation) -> Result<Submission, CartError> {
        let mutation = mutation.normalized();
        mutation.validate()?;
        let key = mutation.key();
        self.last_error = None;

        if self
            .entries
            .get(&key)
            .is_some_and(|entry| entry.effective().mutation == mutation)
        {
            self.observers.emit(&CartEvent::Coalesced { key });
            return Ok(Submission::Coalesced);
        }

        let sequence = self.allocate_sequence();
        let submission = if let Some(entry) = self.entries.get_mut(&key) {
            let mutation = match entry.follow_up.take() {
                Some(parked) => parked.mutation.superseded_by(mutation),
                None => mutation,
            };
            entry.follow_up = Some(PendingMutation::new(mutation, sequence));
            entry.live = true;
            Submission::Superseded
        } else {
            let pending = PendingMutation::new(mutation, sequence);
            self.entries.insert(key.clone(), Entry::new(pending.clone()));
            Submission::Dispatch(pending)
        };
        self.reproject();

        let cart = self.projection.clone();
        let event = match submission {
            Submission::Dispatch(_) => CartEvent::Projected { key, cart },
            _ => CartEvent::Superseded { key, cart },
        };
        self.observers.emit(&event);
        Ok(submission)
    }

    /// The server accepted `dispatched` and returned `server_cart`.
    ///
    /// The server cart replaces the projection wholesale. Returns the
    /// follow-up to dispatch next under the same key, if one was waiting.
    pub fn resolve(
        &mut self,
        dispatched: &PendingMutation,
        server_cart: Cart,
    ) -> Option<PendingMutation> {
        self.adopt(server_cart);
        let follow_up = self.settle(dispatched, true);
        self.reproject();

        self.observers.emit(&CartEvent::Reconciled {
            key: Some(dispatched.key.clone()),
            cart: self.projection.clone(),
        });
        follow_up
    }

    /// The server rejected `dispatched`.
    ///
    /// The projection reverts to the last confirmed cart, any follow-up under
    /// the same key is dropped, and `message` becomes [`Self::last_error`].
    pub fn reject(&mut self, dispatched: &PendingMutation, message: impl Into<String>) {
        let message = message.into();
        for entry in self.entries.values_mut() {
            entry.live = false;
        }
        self.settle(dispatched, false);
        self.reproject();
        self.last_error = Some(message.clone());

        self.observers.emit(&CartEvent::Reverted {
            key: dispatched.key.clone(),
            message,
            cart: self.projection.clone(),
        });
    }

    /// Adopt a server cart that arrived outside any mutation (e.g. a refetch).
    pub fn reconcile(&mut self, server_cart: Cart) {
        self.adopt(server_cart);
        self.reproject();
        self.observers.emit(&CartEvent::Reconciled {
            key: None,
            cart: self.projection.clone(),
        });
    }

    /// Replace the confirmed cart and hide every pending effect.
    fn adopt(&mut self, server_cart: Cart) {
        self.confirmed = reconcile(server_cart);
        for entry in self.entries.values_mut() {
            entry.live = false;
        }
    }

    /// Retire `dispatched` from its key. With `promote`, a waiting follow-up
    /// becomes the new in-flight request and is returned for dispatch.
    fn settle(&mut self, dispatched: &PendingMutation, promote: bool) -> Option<PendingMutation> {
        let entry = self.entries.get_mut(&dispatched.key)?;
        if entry.in_flight.sequence != dispatched.sequence {
            return None;
        }

        match entry.follow_up.take() {
            Some(next) if promote => {
                entry.in_flight = next.clone();
                entry.live = true;
                Some(next)
            }
            _ => {
                self.entries.remove(&dispatched.key);
                None
            }
        }
    }

    fn reproject(&mut self) {
        let mut live: Vec<&PendingMutation> = self
            .entries
            .values()
            .filter(|entry| entry.live)
            .flat_map(Entry::effects)
            .collect();
        live.sort_by_key(|mutation| mutation.sequence);

        self.projection = live
            .into_iter()
            .fold(self.confirmed.clone(), |cart, pending| {
                apply_mutation(&cart, &pending.mutation)
            });
    }

    fn allocate_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::model::CartLine;
    use crate::cart::mutation::{LineAdd, LineUpdate};
    use crate::observer::Recorder;
    use crate::types::{CartId, MerchandiseId};

    fn line(id: &str, quantity: u32) -> CartLine {
        CartLine {
            id: CartLineId::new(id),
            merchandise_id: MerchandiseId::new(format!("variant-{id}")),
            quantity,
            is_optimistic: false,
            merchandise: None,
            cost: None,
        }
    }

    fn server_cart(lines: Vec<CartLine>) -> Cart {
        let mut cart = Cart::empty(CartId::new("gid://shopify/Cart/1"));
        cart.lines = lines;
        cart.recompute_total_quantity();
        cart
    }

    fn set_quantity(id: &str, quantity: u32) -> CartMutation {
        CartMutation::UpdateLines(vec![LineUpdate {
            id: CartLineId::new(id),
            quantity,
        }])
    }

    fn dispatched(submission: Submission) -> PendingMutation {
        match submission {
            Submission::Dispatch(pending) => pending,
            other => panic!("expected dispatch, got {other:?}"),
        }
    }

    #[test]
    fn test_submit_projects_immediately() {
        let mut cart = OptimisticCart::new(server_cart(vec![line("a", 1)]));
        let pending = dispatched(cart.submit(set_quantity("a", 2)).unwrap());

        assert_eq!(pending.key.as_str(), "LinesUpdate-a");
        assert_eq!(cart.projection().total_quantity, 2);
        assert!(cart.projection().is_optimistic);
        assert_eq!(cart.confirmed().total_quantity, 1);
        assert!(!cart.controls(&CartLineId::new("a")).unwrap().can_increment);
    }

    #[test]
    fn test_identical_submission_coalesces() {
        let recorder = Arc::new(Recorder::<CartEvent>::new());
        let mut cart = OptimisticCart::new(server_cart(vec![line("a", 3)]));
        cart.subscribe(recorder.clone());

        let pending = dispatched(cart.submit(set_quantity("a", 2)).unwrap());
        assert_eq!(cart.submit(set_quantity("a", 2)).unwrap(), Submission::Coalesced);

        let follow_up = cart.resolve(&pending, server_cart(vec![line("a", 2)]));
        assert!(follow_up.is_none());
        assert!(cart.pending().is_empty());
        assert_eq!(cart.projection().total_quantity, 2);
        assert!(matches!(recorder.events()[1], CartEvent::Coalesced { .. }));
    }

    #[test]
    fn test_superseding_submission_sends_one_follow_up() {
        let mut cart = OptimisticCart::new(server_cart(vec![line("a", 3)]));
        let first = dispatched(cart.submit(set_quantity("a", 2)).unwrap());
        assert_eq!(cart.submit(set_quantity("a", 1)).unwrap(), Submission::Superseded);
        assert_eq!(cart.submit(set_quantity("a", 4)).unwrap(), Submission::Superseded);

        // The latest payload replaces the earlier effect rather than stacking.
        assert_eq!(cart.projection().total_quantity, 4);
        assert_eq!(cart.pending().len(), 2);

        let follow_up = cart
            .resolve(&first, server_cart(vec![line("a", 2)]))
            .unwrap();
        assert_eq!(follow_up.mutation, set_quantity("a", 4));
        assert_eq!(cart.projection().total_quantity, 4);

        assert!(cart.resolve(&follow_up, server_cart(vec![line("a", 4)])).is_none());
        assert!(!cart.projection().is_optimistic);
        assert!(!cart.is_in_flight(&follow_up.key));
    }

    fn add(merchandise: &str, quantity: u32) -> CartMutation {
        CartMutation::AddLines(vec![LineAdd {
            merchandise_id: MerchandiseId::new(merchandise),
            quantity,
        }])
    }

    #[test]
    fn test_superseding_adds_show_what_the_server_will_hold() {
        let mut server = server_cart(Vec::new());
        let mut cart = OptimisticCart::new(server.clone());

        let first = dispatched(cart.submit(add("variant-a", 1)).unwrap());
        assert_eq!(cart.submit(add("variant-a", 2)).unwrap(), Submission::Superseded);
        assert_eq!(cart.projection().total_quantity, 3);
        assert_eq!(cart.submit(add("variant-a", 4)).unwrap(), Submission::Superseded);
        assert_eq!(cart.projection().total_quantity, 7);
        assert_eq!(cart.pending().len(), 2);

        server = apply_mutation(&server, &first.mutation);
        let follow_up = cart.resolve(&first, server.clone()).unwrap();
        assert_eq!(follow_up.mutation, add("variant-a", 6));
        assert_eq!(cart.projection().total_quantity, 7);

        server = apply_mutation(&server, &follow_up.mutation);
        assert!(cart.resolve(&follow_up, server.clone()).is_none());
        assert_eq!(server.total_quantity, 7);
        assert_eq!(cart.projection().total_quantity, server.total_quantity);
        assert!(!cart.projection().is_optimistic);
    }

    #[test]
    fn test_rejected_add_drops_parked_adds() {
        let mut cart = OptimisticCart::new(server_cart(vec![line("a", 1)]));
        let first = dispatched(cart.submit(add("variant-a", 1)).unwrap());
        cart.submit(add("variant-a", 2)).unwrap();
        assert_eq!(cart.projection().total_quantity, 4);

        cart.reject(&first, "Sold out");
        assert_eq!(cart.projection().total_quantity, 1);
        assert!(cart.pending().is_empty());
    }

    #[test]
    fn test_reject_reverts_and_records_error() {
        let recorder = Arc::new(Recorder::<CartEvent>::new());
        let mut cart = OptimisticCart::new(server_cart(vec![line("a", 1)]));
        cart.subscribe(recorder.clone());

        let pending = dispatched(cart.submit(set_quantity("a", 9)).unwrap());
        cart.submit(set_quantity("a", 8)).unwrap();
        cart.reject(&pending, "Only 5 items left");

        assert_eq!(cart.projection(), cart.confirmed());
        assert_eq!(cart.last_error(), Some("Only 5 items left"));
        assert!(cart.pending().is_empty());
        assert!(matches!(
            recorder.events().last(),
            Some(CartEvent::Reverted { message, .. }) if message == "Only 5 items left"
        ));

        // Retrying clears the inline error.
        cart.submit(set_quantity("a", 2)).unwrap();
        assert!(cart.last_error().is_none());
    }

    #[test]
    fn test_resolve_hides_other_pending_effects() {
        let mut cart = OptimisticCart::new(server_cart(vec![line("a", 1), line("b", 1)]));
        let on_a = dispatched(cart.submit(set_quantity("a", 5)).unwrap());
        let on_b = dispatched(cart.submit(set_quantity("b", 5)).unwrap());
        assert_eq!(cart.projection().total_quantity, 10);

        cart.resolve(&on_a, server_cart(vec![line("a", 5), line("b", 1)]));
        assert_eq!(cart.projection().total_quantity, 6);
        assert!(cart.is_in_flight(&on_b.key));

        cart.resolve(&on_b, server_cart(vec![line("a", 5), line("b", 5)]));
        assert_eq!(cart.projection().total_quantity, 10);
        assert!(cart.pending().is_empty());
    }

    #[test]
    fn test_stale_response_still_wins_but_keeps_entry() {
        let mut cart = OptimisticCart::new(server_cart(vec![line("a", 1)]));
        let pending = dispatched(cart.submit(set_quantity("a", 2)).unwrap());
        let mut stale = pending.clone();
        stale.sequence += 100;

        assert!(cart.resolve(&stale, server_cart(vec![line("a", 7)])).is_none());
        assert_eq!(cart.projection().total_quantity, 7);
        assert!(cart.is_in_flight(&pending.key));
    }

    #[test]
    fn test_invalid_submission_leaves_projection() {
        let mut cart = OptimisticCart::new(server_cart(vec![line("a", 1)]));
        let err = cart.submit(CartMutation::AddLines(vec![LineAdd {
            merchandise_id: MerchandiseId::new("v"),
            quantity: 0,
        }]));
        assert!(err.is_err());
        assert!(!cart.projection().is_optimistic);
    }

    #[test]
    fn test_refetch_reconcile_replaces_projection() {
        let mut cart = OptimisticCart::new(server_cart(vec![line("a", 1)]));
        cart.submit(set_quantity("a", 3)).unwrap();
        cart.reconcile(server_cart(vec![line("a", 1), line("b", 2)]));
        assert_eq!(cart.projection().total_quantity, 3);
        assert!(!cart.projection().is_optimistic);
    }
}
