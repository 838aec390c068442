//! Optimistic cart scenarios against a simulated Shopify cart.
//!
//! The simulated server applies each mutation authoritatively: it assigns
//! real line ids, prices every line and answers with a confirmed cart.
//!
//! Run with: cargo test -p wellspring-integration-tests --test `cart_adapter`

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use wellspring_core::cart::{
    Cart, CartCost, CartEvent, CartMutation, LineAdd, LineCost, LineUpdate, OptimisticCart,
    PendingMutation, Submission, apply_mutation,
};
use wellspring_core::observer::Recorder;
use wellspring_core::{CartId, CartLineId, MerchandiseId, Money};

/// In-memory stand-in for the Shopify cart.
struct SimulatedServer {
    cart: Cart,
    unit_price: Money,
    issued_lines: u32,
}

impl SimulatedServer {
    fn new() -> Self {
        let unit_price = Money::parse("10.00", "USD").unwrap();
        let mut cart = Cart::empty(CartId::new("gid://shopify/Cart/c1"));
        cart.checkout_url = Some("https://shop.example.com/checkouts/c1".to_string());
        cart.cost = CartCost {
            subtotal: Some(Money::zero("USD")),
            total: Some(Money::zero("USD")),
        };
        Self {
            cart,
            unit_price,
            issued_lines: 0,
        }
    }

    fn cart(&self) -> Cart {
        self.cart.clone()
    }

    fn handle(&mut self, pending: &PendingMutation) -> Cart {
        let mut next = apply_mutation(&self.cart, &pending.mutation);
        for line in &mut next.lines {
            if line.id.is_placeholder() {
                self.issued_lines += 1;
                line.id = CartLineId::new(format!("gid://shopify/CartLine/{}", self.issued_lines));
            }
            line.cost = Some(LineCost {
                amount_per_quantity: self.unit_price.clone(),
                total_amount: self.unit_price.times(line.quantity),
            });
        }
        next.recompute_cost();
        self.cart = next.into_confirmed();
        self.cart.clone()
    }
}

fn variant(n: u32) -> MerchandiseId {
    MerchandiseId::new(format!("gid://shopify/ProductVariant/{n}"))
}

fn add(n: u32, quantity: u32) -> CartMutation {
    CartMutation::AddLines(vec![LineAdd {
        merchandise_id: variant(n),
        quantity,
    }])
}

fn set_quantity(id: &CartLineId, quantity: u32) -> CartMutation {
    CartMutation::UpdateLines(vec![LineUpdate {
        id: id.clone(),
        quantity,
    }])
}

fn dispatched(submission: Submission) -> PendingMutation {
    match submission {
        Submission::Dispatch(pending) => pending,
        other => panic!("expected dispatch, got {other:?}"),
    }
}

fn assert_quantity_invariant(cart: &Cart) {
    let sum: u32 = cart.lines.iter().map(|line| line.quantity).sum();
    assert_eq!(cart.total_quantity, sum);
    assert!(cart.lines.iter().all(|line| line.quantity > 0));
}

/// Submit, dispatch and resolve one mutation end to end.
fn round_trip(cart: &mut OptimisticCart, server: &mut SimulatedServer, mutation: CartMutation) {
    let pending = dispatched(cart.submit(mutation).unwrap());
    assert_quantity_invariant(cart.projection());
    let confirmed = server.handle(&pending);
    assert!(cart.resolve(&pending, confirmed).is_none());
    assert_quantity_invariant(cart.projection());
}

#[test]
fn test_add_shows_placeholder_then_server_line() {
    let mut server = SimulatedServer::new();
    let mut cart = OptimisticCart::new(server.cart());

    let pending = dispatched(cart.submit(add(1, 2)).unwrap());
    let line = &cart.projection().lines[0];
    assert!(line.id.is_placeholder());
    assert!(line.is_optimistic);
    assert!(line.merchandise.is_none());
    assert_eq!(cart.projection().total_quantity, 2);
    assert!(cart.projection().is_optimistic);

    let confirmed = server.handle(&pending);
    cart.resolve(&pending, confirmed);

    let line = &cart.projection().lines[0];
    assert_eq!(line.id.as_str(), "gid://shopify/CartLine/1");
    assert!(!line.is_optimistic);
    assert!(!cart.projection().is_optimistic);
    assert_eq!(cart.projection(), &server.cart());
    assert!(cart.pending().is_empty());
}

#[test]
fn test_quantity_invariant_holds_across_a_session() {
    let mut server = SimulatedServer::new();
    let mut cart = OptimisticCart::new(server.cart());

    round_trip(&mut cart, &mut server, add(1, 2));
    round_trip(&mut cart, &mut server, add(2, 1));
    round_trip(&mut cart, &mut server, add(1, 1));

    let first = cart.projection().lines[0].id.clone();
    let second = cart.projection().lines[1].id.clone();
    assert_eq!(cart.projection().total_quantity, 4);

    round_trip(&mut cart, &mut server, set_quantity(&first, 5));
    round_trip(
        &mut cart,
        &mut server,
        CartMutation::RemoveLines(vec![second]),
    );

    assert_eq!(cart.projection().total_quantity, 5);
    assert_eq!(
        cart.projection().cost.subtotal,
        Some(Money::parse("50.00", "USD").unwrap())
    );
}

#[test]
fn test_update_to_zero_removes_line() {
    let mut server = SimulatedServer::new();
    let mut cart = OptimisticCart::new(server.cart());
    round_trip(&mut cart, &mut server, add(1, 3));
    let id = cart.projection().lines[0].id.clone();

    let pending = dispatched(cart.submit(set_quantity(&id, 0)).unwrap());
    assert!(cart.projection().lines.is_empty());
    assert_eq!(cart.projection().total_quantity, 0);
    assert!(!cart.projection().has_items());

    let confirmed = server.handle(&pending);
    cart.resolve(&pending, confirmed);
    assert!(cart.projection().lines.is_empty());
}

#[test]
fn test_decrement_twice_sends_latest_quantity_once() {
    let mut server = SimulatedServer::new();
    let mut cart = OptimisticCart::new(server.cart());
    round_trip(&mut cart, &mut server, add(1, 3));
    let id = cart.projection().lines[0].id.clone();

    let first = dispatched(cart.submit(set_quantity(&id, 2)).unwrap());
    assert_eq!(
        cart.submit(set_quantity(&id, 1)).unwrap(),
        Submission::Superseded
    );
    assert_eq!(cart.projection().total_quantity, 1);
    assert!(cart.is_in_flight(&first.key));
    assert_eq!(cart.pending().len(), 2);

    let confirmed = server.handle(&first);
    let follow_up = cart.resolve(&first, confirmed).unwrap();
    assert_eq!(follow_up.mutation, set_quantity(&id, 1));
    assert_eq!(cart.projection().total_quantity, 1);

    let confirmed = server.handle(&follow_up);
    assert!(cart.resolve(&follow_up, confirmed).is_none());
    assert_eq!(cart.projection().total_quantity, 1);
    assert!(!cart.is_in_flight(&first.key));
    assert_eq!(cart.projection(), &server.cart());
}

#[test]
fn test_add_during_add_matches_server_total() {
    let mut server = SimulatedServer::new();
    let mut cart = OptimisticCart::new(server.cart());

    let first = dispatched(cart.submit(add(1, 1)).unwrap());
    assert_eq!(cart.submit(add(1, 2)).unwrap(), Submission::Superseded);
    assert_eq!(cart.projection().total_quantity, 3);
    assert_quantity_invariant(cart.projection());

    let confirmed = server.handle(&first);
    let follow_up = cart.resolve(&first, confirmed).unwrap();
    assert_eq!(follow_up.mutation, add(1, 2));
    assert_eq!(cart.projection().total_quantity, 3);
    assert_eq!(cart.projection().lines.len(), 1);

    let confirmed = server.handle(&follow_up);
    assert!(cart.resolve(&follow_up, confirmed).is_none());
    assert_eq!(server.cart().total_quantity, 3);
    assert_eq!(cart.projection(), &server.cart());
}

#[test]
fn test_repeated_click_is_coalesced() {
    let mut server = SimulatedServer::new();
    let mut cart = OptimisticCart::new(server.cart());
    round_trip(&mut cart, &mut server, add(1, 1));
    let id = cart.projection().lines[0].id.clone();

    let pending = dispatched(cart.submit(set_quantity(&id, 2)).unwrap());
    assert_eq!(
        cart.submit(set_quantity(&id, 2)).unwrap(),
        Submission::Coalesced
    );
    assert_eq!(cart.pending().len(), 1);

    let confirmed = server.handle(&pending);
    assert!(cart.resolve(&pending, confirmed).is_none());
    assert_eq!(cart.projection().total_quantity, 2);
}

#[test]
fn test_rejection_reverts_and_drops_follow_up() {
    let mut server = SimulatedServer::new();
    let mut cart = OptimisticCart::new(server.cart());
    round_trip(&mut cart, &mut server, add(1, 3));
    let id = cart.projection().lines[0].id.clone();
    let before = cart.projection().clone();

    let first = dispatched(cart.submit(set_quantity(&id, 2)).unwrap());
    cart.submit(set_quantity(&id, 1)).unwrap();

    cart.reject(&first, "Only 2 items were available");

    assert_eq!(cart.projection(), &before);
    assert!(cart.pending().is_empty());
    assert_eq!(cart.last_error(), Some("Only 2 items were available"));
    assert_eq!(cart.take_error().as_deref(), Some("Only 2 items were available"));
    assert!(cart.last_error().is_none());
}

#[test]
fn test_refetch_replaces_projection_wholesale() {
    let mut server = SimulatedServer::new();
    let mut cart = OptimisticCart::new(server.cart());
    round_trip(&mut cart, &mut server, add(1, 1));

    cart.submit(add(2, 4)).unwrap();
    assert_eq!(cart.projection().total_quantity, 5);

    // Another tab emptied the cart.
    let mut emptied = server.cart();
    emptied.lines.clear();
    emptied.recompute_total_quantity();
    cart.reconcile(emptied.clone());

    assert_eq!(cart.projection(), &emptied);
    assert_eq!(cart.confirmed(), &emptied);
}

#[test]
fn test_placeholder_lines_cannot_be_updated() {
    let server = SimulatedServer::new();
    let mut cart = OptimisticCart::new(server.cart());
    cart.submit(add(1, 1)).unwrap();
    let placeholder = cart.projection().lines[0].id.clone();
    let before = cart.projection().clone();

    assert!(cart.submit(set_quantity(&placeholder, 3)).is_err());
    assert_eq!(cart.projection(), &before);
}

#[test]
fn test_observers_see_projection_then_reconciliation() {
    let recorder = Arc::new(Recorder::<CartEvent>::new());
    let mut server = SimulatedServer::new();
    let mut cart = OptimisticCart::new(server.cart());
    cart.subscribe(recorder.clone());

    let pending = dispatched(cart.submit(add(1, 1)).unwrap());
    let confirmed = server.handle(&pending);
    cart.resolve(&pending, confirmed);

    let events = recorder.events();
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], CartEvent::Projected { cart, .. } if cart.is_optimistic));
    assert!(matches!(
        &events[1],
        CartEvent::Reconciled { key: Some(_), cart } if !cart.is_optimistic
    ));
}
