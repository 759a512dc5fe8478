//! Commands for the Shopping Cart context.

use chronicle_core::command::Command;
use uuid::Uuid;

use super::money::Money;

/// Command to open a new cart.
#[derive(Debug, Clone)]
pub struct CreateCart {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The cart identifier.
    pub cart_id: String,
    /// The owning user.
    pub owner: String,
}

/// Command to add units of an item to a cart.
#[derive(Debug, Clone)]
pub struct AddItem {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The cart identifier.
    pub cart_id: String,
    /// The item identifier.
    pub item_id: String,
    /// Price of one unit.
    pub unit_price: Money,
    /// Number of units.
    pub quantity: u32,
}

/// Command to remove an item line from a cart.
#[derive(Debug, Clone)]
pub struct RemoveItem {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The cart identifier.
    pub cart_id: String,
    /// The item identifier.
    pub item_id: String,
}

/// Command to check out a cart.
#[derive(Debug, Clone)]
pub struct CheckOut {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The cart identifier.
    pub cart_id: String,
}

impl Command for CreateCart {
    fn command_type(&self) -> &'static str {
        "cart.create"
    }

    fn identity(&self) -> &str {
        &self.cart_id
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

impl Command for AddItem {
    fn command_type(&self) -> &'static str {
        "cart.add_item"
    }

    fn identity(&self) -> &str {
        &self.cart_id
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

impl Command for RemoveItem {
    fn command_type(&self) -> &'static str {
        "cart.remove_item"
    }

    fn identity(&self) -> &str {
        &self.cart_id
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

impl Command for CheckOut {
    fn command_type(&self) -> &'static str {
        "cart.check_out"
    }

    fn identity(&self) -> &str {
        &self.cart_id
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
