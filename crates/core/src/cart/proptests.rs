#![allow(clippy::unwrap_used)]

use std::collections::HashSet;

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::{Cart, CartSnapshot, LineItem};
use crate::types::{CurrencyCode, MealId, Price};

#[derive(Debug, Clone)]
enum Op {
    Add { id: u8, price: u32, quantity: u32 },
    Remove { id: u8 },
    SetQuantity { id: u8, quantity: u32 },
    Clear,
}

fn meal_id(n: u8) -> MealId {
    MealId::parse(&format!("meal-{n}")).unwrap()
}

fn naira(amount: u32) -> Price {
    Price::new(Decimal::from(amount), CurrencyCode::NGN)
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..6, 0u32..5_000, 1u32..20)
            .prop_map(|(id, price, quantity)| Op::Add { id, price, quantity }),
        2 => (0u8..6).prop_map(|id| Op::Remove { id }),
        2 => (0u8..6, 1u32..20).prop_map(|(id, quantity)| Op::SetQuantity { id, quantity }),
        1 => Just(Op::Clear),
    ]
}

fn apply(cart: &mut Cart, op: &Op) {
    match *op {
        Op::Add { id, price, quantity } => {
            let item = LineItem::new(meal_id(id), format!("Meal {id}"), naira(price), quantity);
            assert_accepted(cart.add_item(item).is_ok());
        }
        Op::Remove { id } => {
            cart.remove_item(&meal_id(id));
        }
        Op::SetQuantity { id, quantity } => {
            assert_accepted(cart.set_quantity(&meal_id(id), quantity).is_ok());
        }
        Op::Clear => cart.clear(),
    }
}

/// Generated operations are always valid; a rejection here is a bug.
fn assert_accepted(ok: bool) {
    assert!(ok, "valid operation was rejected");
}

fn recomputed(snapshot: &CartSnapshot) -> (u64, Decimal) {
    snapshot.items.iter().fold((0, Decimal::ZERO), |(count, sum), item| {
        (
            count + u64::from(item.quantity),
            sum + item.unit_price.amount * Decimal::from(item.quantity),
        )
    })
}

proptest! {
    /// Aggregates always match a fresh recomputation over the items.
    #[test]
    fn prop_aggregates_match_items(ops in prop::collection::vec(arb_op(), 0..60)) {
        let mut cart = Cart::new(CurrencyCode::NGN);
        for op in &ops {
            apply(&mut cart, op);

            let snapshot = cart.snapshot();
            let (count, subtotal) = recomputed(&snapshot);
            prop_assert_eq!(snapshot.total_item_count, count);
            prop_assert_eq!(snapshot.subtotal.amount, subtotal);
            prop_assert_eq!(snapshot.subtotal.currency_code, CurrencyCode::NGN);
        }
    }

    /// No sequence of operations produces two entries for the same id.
    #[test]
    fn prop_ids_unique(ops in prop::collection::vec(arb_op(), 0..60)) {
        let mut cart = Cart::new(CurrencyCode::NGN);
        for op in &ops {
            apply(&mut cart, op);
        }
        let snapshot = cart.snapshot();
        let ids: HashSet<_> = snapshot.items.iter().map(|item| item.id.clone()).collect();
        prop_assert_eq!(ids.len(), snapshot.items.len());
    }

    /// Repeated adds of one id sum quantities and keep the first metadata.
    #[test]
    fn prop_merge_add(adds in prop::collection::vec((0u32..5_000, 1u32..50), 1..20)) {
        let mut cart = Cart::new(CurrencyCode::NGN);
        for (i, (price, quantity)) in adds.iter().enumerate() {
            let item = LineItem::new(meal_id(0), format!("title-{i}"), naira(*price), *quantity);
            cart.add_item(item).unwrap();
        }

        let snapshot = cart.snapshot();
        prop_assert_eq!(snapshot.items.len(), 1);
        let entry = snapshot.items.first().unwrap();
        let expected_quantity: u32 = adds.iter().map(|(_, q)| q).sum();
        prop_assert_eq!(entry.quantity, expected_quantity);
        prop_assert_eq!(&entry.title, "title-0");
        prop_assert_eq!(entry.unit_price, naira(adds.first().map_or(0, |(p, _)| *p)));
    }

    /// A second removal of the same id is a no-op.
    #[test]
    fn prop_remove_idempotent(ops in prop::collection::vec(arb_op(), 0..40), id in 0u8..6) {
        let mut cart = Cart::new(CurrencyCode::NGN);
        for op in &ops {
            apply(&mut cart, op);
        }

        cart.remove_item(&meal_id(id));
        let once = cart.snapshot();
        prop_assert!(!cart.remove_item(&meal_id(id)));
        prop_assert_eq!(cart.snapshot(), once);
    }

    /// Permuting adds of distinct ids yields identical aggregates.
    #[test]
    fn prop_aggregates_order_independent(
        (items, shuffled) in prop::collection::vec((0u32..5_000, 1u32..20), 1..8)
            .prop_map(|items| {
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, (price, quantity))| (u8::try_from(i).unwrap(), price, quantity))
                    .collect::<Vec<_>>()
            })
            .prop_flat_map(|items| (Just(items.clone()), Just(items).prop_shuffle())),
    ) {
        let to_line = |(n, price, quantity): (u8, u32, u32)| {
            LineItem::new(meal_id(n), format!("Meal {n}"), naira(price), quantity)
        };

        let mut forward = Cart::new(CurrencyCode::NGN);
        for entry in items {
            forward.add_item(to_line(entry)).unwrap();
        }
        let mut permuted = Cart::new(CurrencyCode::NGN);
        for entry in shuffled {
            permuted.add_item(to_line(entry)).unwrap();
        }

        let a = forward.snapshot();
        let b = permuted.snapshot();
        prop_assert_eq!(a.total_item_count, b.total_item_count);
        prop_assert_eq!(a.subtotal, b.subtotal);
    }

    /// Clear always leaves an empty cart with zero aggregates.
    #[test]
    fn prop_clear_totality(ops in prop::collection::vec(arb_op(), 0..40)) {
        let mut cart = Cart::new(CurrencyCode::NGN);
        for op in &ops {
            apply(&mut cart, op);
        }
        cart.clear();
        let snapshot = cart.snapshot();
        prop_assert!(snapshot.items.is_empty());
        prop_assert_eq!(snapshot.total_item_count, 0);
        prop_assert_eq!(snapshot.subtotal, naira(0));
    }
}
