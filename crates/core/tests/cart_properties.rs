//! Randomised mutation sequences through the projection and the adapter.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use wellspring_core::cart::{
    Cart, CartLine, CartMutation, LineAdd, LineUpdate, OptimisticCart, PendingMutation,
    Submission, apply_mutation,
};
use wellspring_core::{CartId, CartLineId, MerchandiseId};

#[derive(Debug, Clone)]
enum Step {
    Add { variant: u32, quantity: u32 },
    Update { line: u32, quantity: u32 },
    Remove { line: u32 },
    Resolve(usize),
    Reject(usize),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        2 => (1..=4u32, 1..=5u32).prop_map(|(variant, quantity)| Step::Add { variant, quantity }),
        2 => (1..=6u32, 0..=5u32).prop_map(|(line, quantity)| Step::Update { line, quantity }),
        1 => (1..=6u32).prop_map(|line| Step::Remove { line }),
        3 => any::<usize>().prop_map(Step::Resolve),
        1 => any::<usize>().prop_map(Step::Reject),
    ]
}

fn variant(n: u32) -> MerchandiseId {
    MerchandiseId::new(format!("gid://shopify/ProductVariant/{n}"))
}

fn line_id(n: u32) -> CartLineId {
    CartLineId::new(format!("gid://shopify/CartLine/{n}"))
}

fn add(n: u32, quantity: u32) -> CartMutation {
    CartMutation::AddLines(vec![LineAdd {
        merchandise_id: variant(n),
        quantity,
    }])
}

/// Applies each request authoritatively and issues real ids for new lines.
struct Server {
    cart: Cart,
    issued_lines: u32,
}

impl Server {
    fn with_lines(quantities: &[u32]) -> Self {
        let mut cart = Cart::empty(CartId::new("gid://shopify/Cart/p1"));
        for (n, quantity) in (1..).zip(quantities) {
            cart.lines.push(CartLine {
                id: line_id(n),
                merchandise_id: variant(n),
                quantity: *quantity,
                is_optimistic: false,
                merchandise: None,
                cost: None,
            });
        }
        cart.recompute_total_quantity();
        Self {
            cart,
            issued_lines: u32::try_from(quantities.len()).unwrap(),
        }
    }

    fn handle(&mut self, pending: &PendingMutation) -> Cart {
        let mut next = apply_mutation(&self.cart, &pending.mutation);
        for line in &mut next.lines {
            if line.id.is_placeholder() {
                self.issued_lines += 1;
                line.id = line_id(self.issued_lines);
            }
        }
        self.cart = next.into_confirmed();
        self.cart.clone()
    }
}

fn check_quantities(cart: &Cart) -> Result<(), TestCaseError> {
    let sum: u32 = cart.lines.iter().map(|line| line.quantity).sum();
    prop_assert_eq!(cart.total_quantity, sum);
    prop_assert!(cart.lines.iter().all(|line| line.quantity > 0));
    Ok(())
}

/// Resolve or reject the request at `index` (wrapped), queueing any follow-up.
fn settle(
    cart: &mut OptimisticCart,
    server: &mut Server,
    in_flight: &mut Vec<PendingMutation>,
    index: usize,
    accept: bool,
) {
    if in_flight.is_empty() {
        return;
    }
    let pending = in_flight.remove(index % in_flight.len());
    if accept {
        let confirmed = server.handle(&pending);
        in_flight.extend(cart.resolve(&pending, confirmed));
    } else {
        cart.reject(&pending, "Rejected");
    }
}

proptest! {
    #[test]
    fn prop_projection_quantities_stay_consistent(
        steps in proptest::collection::vec(step(), 1..40)
    ) {
        let mut server = Server::with_lines(&[1, 2, 3]);
        let mut cart = OptimisticCart::new(server.cart.clone());
        let mut in_flight: Vec<PendingMutation> = Vec::new();

        for step in steps {
            let mutation = match step {
                Step::Add { variant, quantity } => Some(add(variant, quantity)),
                Step::Update { line, quantity } => Some(CartMutation::UpdateLines(vec![
                    LineUpdate { id: line_id(line), quantity },
                ])),
                Step::Remove { line } => Some(CartMutation::RemoveLines(vec![line_id(line)])),
                Step::Resolve(index) => {
                    settle(&mut cart, &mut server, &mut in_flight, index, true);
                    None
                }
                Step::Reject(index) => {
                    settle(&mut cart, &mut server, &mut in_flight, index, false);
                    None
                }
            };
            if let Some(mutation) = mutation {
                if let Submission::Dispatch(pending) = cart.submit(mutation).unwrap() {
                    in_flight.push(pending);
                }
            }

            check_quantities(cart.projection())?;
            check_quantities(cart.confirmed())?;
        }

        while !in_flight.is_empty() {
            settle(&mut cart, &mut server, &mut in_flight, 0, true);
            check_quantities(cart.projection())?;
        }
        prop_assert!(cart.pending().is_empty());
        prop_assert!(!cart.projection().is_optimistic);
        prop_assert_eq!(cart.projection(), &server.cart);
    }

    #[test]
    fn prop_pending_adds_show_the_settled_total(
        steps in proptest::collection::vec(
            prop_oneof![
                2 => (1..=5u32).prop_map(|quantity| Step::Add { variant: 1, quantity }),
                2 => any::<usize>().prop_map(Step::Resolve),
                1 => any::<usize>().prop_map(Step::Reject),
            ],
            1..30,
        )
    ) {
        let mut server = Server::with_lines(&[]);
        let mut cart = OptimisticCart::new(server.cart.clone());
        let mut in_flight: Vec<PendingMutation> = Vec::new();

        for step in steps {
            match step {
                Step::Add { variant, quantity } => {
                    if let Submission::Dispatch(pending) =
                        cart.submit(add(variant, quantity)).unwrap()
                    {
                        in_flight.push(pending);
                    }
                }
                Step::Resolve(index) => {
                    settle(&mut cart, &mut server, &mut in_flight, index, true);
                }
                Step::Reject(index) => {
                    settle(&mut cart, &mut server, &mut in_flight, index, false);
                }
                Step::Update { .. } | Step::Remove { .. } => unreachable!(),
            }

            let queued: u32 = cart
                .pending()
                .iter()
                .map(|pending| match &pending.mutation {
                    CartMutation::AddLines(adds) => adds.iter().map(|a| a.quantity).sum(),
                    _ => 0,
                })
                .sum();
            prop_assert_eq!(
                cart.projection().total_quantity,
                server.cart.total_quantity + queued
            );
        }

        while !in_flight.is_empty() {
            settle(&mut cart, &mut server, &mut in_flight, 0, true);
        }
        prop_assert_eq!(cart.projection().total_quantity, server.cart.total_quantity);
    }
}
