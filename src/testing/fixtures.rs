//! Small datasets for pipeline tests.

use serde::{Deserialize, Serialize};

/// An item with an integer price.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PricedItem {
    pub name: String,
    pub price: u32,
}

#[must_use]
pub fn priced(name: &str, price: u32) -> PricedItem {
    PricedItem {
        name: name.to_string(),
        price,
    }
}

/// Three items priced 5, 1 and 9, in that order.
///
/// ```
/// use ironstream::testing::sample_items;
///
/// let prices: Vec<u32> = sample_items().iter().map(|i| i.price).collect();
/// assert_eq!(prices, vec![5, 1, 9]);
/// ```
#[must_use]
pub fn sample_items() -> Vec<PricedItem> {
    vec![priced("notebook", 5), priced("pencil", 1), priced("backpack", 9)]
}

/// A customer order line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Order {
    pub id: u32,
    pub customer: String,
    pub category: String,
    pub quantity: i64,
    pub unit_price: u32,
}

impl Order {
    #[must_use]
    pub fn total(&self) -> i64 {
        self.quantity * i64::from(self.unit_price)
    }
}

/// Four orders with quantities 3, 0, 7 and 2.
#[must_use]
pub fn sample_orders() -> Vec<Order> {
    let order = |id: u32, customer: &str, category: &str, quantity: i64, unit_price: u32| Order {
        id,
        customer: customer.to_string(),
        category: category.to_string(),
        quantity,
        unit_price,
    };
    vec![
        order(1, "alice", "books", 3, 12),
        order(2, "bob", "garden", 0, 40),
        order(3, "alice", "garden", 7, 5),
        order(4, "carol", "books", 2, 30),
    ]
}
