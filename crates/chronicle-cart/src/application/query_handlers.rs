//! Query handlers for the Shopping Cart context.
//!
//! This module contains query handlers that reconstitute carts from stored
//! events and return read-only view DTOs.

use chronicle_core::error::DomainError;
use chronicle_core::repository::Repository;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::domain::aggregates::Cart;
use crate::domain::money::Money;

/// Read-only view of one cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLineView {
    /// The item identifier.
    pub item_id: String,
    /// Price of one unit.
    pub unit_price: Money,
    /// Number of units.
    pub quantity: u32,
    /// Line total.
    pub subtotal: Money,
}

/// Read-only view of a cart aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    /// The cart identifier.
    pub cart_id: String,
    /// The owning user.
    pub owner: Option<String>,
    /// Lines sorted by item identifier.
    pub lines: Vec<CartLineView>,
    /// Sum of all line subtotals.
    pub total: Money,
    /// Whether the cart has been checked out.
    pub checked_out: bool,
    /// Current version (event count).
    pub version: i64,
}

/// Retrieves a cart by its identity.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the id,
/// `DomainError::Serialization` if a payload does not decode and
/// `DomainError::UnsupportedEvent` if the stream holds an event this
/// deployment cannot apply.
pub async fn get_cart_by_id(
    cart_id: &str,
    repo: &Repository<Cart>,
    cancel: &CancellationToken,
) -> Result<CartView, DomainError> {
    let cart = repo.get(cart_id, cancel).await?;
    let lines = cart
        .lines
        .iter()
        .map(|(item_id, line)| CartLineView {
            item_id: item_id.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
            subtotal: line.subtotal(),
        })
        .collect();

    Ok(CartView {
        cart_id: cart_id.to_owned(),
        owner: cart.owner.clone(),
        lines,
        total: cart.total(),
        checked_out: cart.checked_out,
        version: cart.version(),
    })
}
