use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Item;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    /// Next quantity for a line; decreasing never goes below zero.
    pub fn apply(self, quantity: i32) -> i32 {
        match self {
            Direction::Increase => quantity.saturating_add(1),
            Direction::Decrease => (quantity - 1).max(0),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineQuantity {
    pub item_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineView {
    pub line_id: Uuid,
    pub item: Item,
    pub quantity: i32,
    pub subtotal: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    /// Cents.
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::Direction;

    #[test]
    fn decrease_clamps_at_zero() {
        assert_eq!(Direction::Decrease.apply(0), 0);
        assert_eq!(Direction::Decrease.apply(1), 0);
        assert_eq!(Direction::Decrease.apply(3), 2);
    }

    #[test]
    fn any_sequence_stays_non_negative_and_matches_clamped_count() {
        let steps = [
            Direction::Decrease,
            Direction::Increase,
            Direction::Increase,
            Direction::Decrease,
            Direction::Decrease,
            Direction::Decrease,
            Direction::Increase,
        ];
        let mut quantity = 0;
        let mut expected: i32 = 0;
        for step in steps {
            quantity = step.apply(quantity);
            expected = match step {
                Direction::Increase => expected + 1,
                Direction::Decrease => (expected - 1).max(0),
            };
            assert!(quantity >= 0);
            assert_eq!(quantity, expected);
        }
        assert_eq!(quantity, 1);
    }

    #[test]
    fn only_increases_counts_every_step() {
        let quantity = (0..5).fold(0, |q, _| Direction::Increase.apply(q));
        assert_eq!(quantity, 5);
    }
}
