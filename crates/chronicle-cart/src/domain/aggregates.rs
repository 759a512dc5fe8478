//! Aggregate root for the Shopping Cart context.

use std::collections::BTreeMap;

use chronicle_core::aggregate::{Aggregate, AggregateRoot};
use chronicle_core::clock::Clock;
use chronicle_core::error::{DomainError, UnsupportedEvent};
use chronicle_core::event::EventMetadata;
use chronicle_core::validation::{ValidationError, ValidationResult};
use uuid::Uuid;

use super::events::{
    CART_CHECKED_OUT_EVENT_TYPE, CART_CREATED_EVENT_TYPE, CartCheckedOut, CartCreated, CartEvent,
    CartEventKind, ITEM_ADDED_EVENT_TYPE, ITEM_REMOVED_EVENT_TYPE, ItemAdded, ItemRemoved,
};
use super::money::Money;

/// A line in the cart: one item with its unit price and quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    /// Price of one unit.
    pub unit_price: Money,
    /// Number of units.
    pub quantity: u32,
}

impl CartLine {
    /// Line total.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// Cart state derived from its events.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Cart {
    /// The user who owns the cart, once created.
    pub owner: Option<String>,
    /// Lines keyed by item identifier.
    pub lines: BTreeMap<String, CartLine>,
    /// Whether the cart has been checked out.
    pub checked_out: bool,
}

impl Cart {
    /// Sum of all line subtotals.
    #[must_use]
    pub fn total(&self) -> Money {
        self.lines.values().map(CartLine::subtotal).sum()
    }

    fn is_created(&self) -> bool {
        self.owner.is_some()
    }

    /// Rejects an addition whose merged quantity, line total or cart total
    /// would not fit.
    fn check_amounts(&self, payload: &ItemAdded) -> ValidationResult {
        let existing = self
            .lines
            .get(&payload.item_id)
            .map_or(0, |line| line.quantity);
        let Some(quantity) = existing.checked_add(payload.quantity) else {
            return rejected("line quantity is too large", "quantity_overflow");
        };
        let total = payload
            .unit_price
            .checked_times(quantity)
            .and_then(|line_total| {
                self.lines
                    .iter()
                    .filter(|(item_id, _)| **item_id != payload.item_id)
                    .try_fold(line_total, |sum, (_, line)| {
                        sum.checked_add(line.subtotal())
                    })
            });
        match total {
            Some(_) => ValidationResult::Success,
            None => rejected("cart amount is too large", "amount_overflow"),
        }
    }
}

fn rejected(message: &str, code: &str) -> ValidationResult {
    ValidationResult::failure(message, ValidationError::with_code(message, code))
}

impl Aggregate for Cart {
    const AGGREGATE_TYPE: &'static str = "cart";
    type Event = CartEvent;

    fn apply(&mut self, event: &CartEvent) -> Result<(), UnsupportedEvent> {
        match &event.kind {
            CartEventKind::CartCreated(payload) => {
                self.owner = Some(payload.owner.clone());
            }
            CartEventKind::ItemAdded(payload) => {
                self.lines
                    .entry(payload.item_id.clone())
                    .and_modify(|line| {
                        line.quantity = line.quantity.saturating_add(payload.quantity);
                    })
                    .or_insert(CartLine {
                        unit_price: payload.unit_price,
                        quantity: payload.quantity,
                    });
            }
            CartEventKind::ItemRemoved(payload) => {
                self.lines.remove(&payload.item_id);
            }
            CartEventKind::CartCheckedOut(_) => {
                self.checked_out = true;
            }
            CartEventKind::Unrecognized => {
                return Err(UnsupportedEvent {
                    aggregate_type: Self::AGGREGATE_TYPE,
                    event_type: event.metadata.event_type.clone(),
                });
            }
        }
        Ok(())
    }

    fn validate(&self, event: &CartEvent) -> ValidationResult {
        if let CartEventKind::CartCreated(payload) = &event.kind {
            if self.is_created() {
                return rejected("cart already exists", "cart_exists");
            }
            let mut result = ValidationResult::Success;
            if payload.cart_id.trim().is_empty() {
                result = result.and(rejected("cart id must not be empty", "cart_id_missing"));
            }
            if payload.owner.trim().is_empty() {
                result = result.and(rejected("cart owner must not be empty", "owner_missing"));
            }
            return result;
        }
        if matches!(event.kind, CartEventKind::Unrecognized) {
            // Left to `apply`, which reports it as unsupported.
            return ValidationResult::Success;
        }
        if !self.is_created() {
            return rejected("cart has not been created", "cart_not_created");
        }
        if self.checked_out {
            return rejected("cart is already checked out", "cart_checked_out");
        }

        match &event.kind {
            CartEventKind::ItemAdded(payload) => {
                let mut result = ValidationResult::Success;
                if payload.quantity == 0 {
                    result = result.and(rejected("quantity must be positive", "quantity_zero"));
                }
                if payload.unit_price.is_negative() {
                    result = result.and(rejected(
                        "unit price must not be negative",
                        "price_negative",
                    ));
                }
                if let Some(line) = self.lines.get(&payload.item_id) {
                    if line.unit_price != payload.unit_price {
                        result = result.and(rejected(
                            "unit price differs from the line already in the cart",
                            "price_mismatch",
                        ));
                    }
                }
                if result.is_success() {
                    result = self.check_amounts(payload);
                }
                result
            }
            CartEventKind::ItemRemoved(payload) if !self.lines.contains_key(&payload.item_id) => {
                rejected("item is not in the cart", "item_not_in_cart")
            }
            CartEventKind::CartCheckedOut(_) if self.lines.is_empty() => {
                rejected("cannot check out an empty cart", "cart_empty")
            }
            _ => ValidationResult::Success,
        }
    }
}

/// Behaviour methods for a cart root. Each checks business rules, builds the
/// event and records it through `apply_change`.
pub trait CartBehaviour {
    /// Opens the cart for `owner`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ValidationFailed` if the cart already exists or
    /// the owner is blank.
    fn create(
        &mut self,
        cart_id: &str,
        owner: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError>;

    /// Adds `quantity` units of an item.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ValidationFailed` for a missing or checked-out
    /// cart, a zero quantity, a negative price or a price that differs from
    /// the existing line.
    fn add_item(
        &mut self,
        item_id: &str,
        unit_price: Money,
        quantity: u32,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError>;

    /// Removes an item line.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ValidationFailed` if the item is not in the cart.
    fn remove_item(
        &mut self,
        item_id: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError>;

    /// Checks out the cart at its current total.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ValidationFailed` if the cart is empty or
    /// already checked out.
    fn check_out(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> Result<(), DomainError>;
}

fn new_event(
    root: &AggregateRoot<Cart>,
    identity: &str,
    event_type: &str,
    kind: CartEventKind,
    correlation_id: Uuid,
    clock: &dyn Clock,
) -> CartEvent {
    CartEvent {
        metadata: EventMetadata {
            event_id: Uuid::new_v4(),
            event_type: event_type.to_owned(),
            identity: identity.to_owned(),
            sequence_number: root.next_sequence_number(),
            correlation_id,
            causation_id: correlation_id,
            occurred_at: clock.now(),
        },
        kind,
    }
}

fn identity_of(root: &AggregateRoot<Cart>) -> Result<String, DomainError> {
    root.identity()
        .map(str::to_owned)
        .ok_or_else(|| DomainError::ValidationFailed {
            message: "cart has not been created".to_owned(),
            errors: vec![ValidationError::with_code(
                "cart has not been created",
                "cart_not_created",
            )],
        })
}

impl CartBehaviour for AggregateRoot<Cart> {
    fn create(
        &mut self,
        cart_id: &str,
        owner: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        let event = new_event(
            self,
            cart_id,
            CART_CREATED_EVENT_TYPE,
            CartEventKind::CartCreated(CartCreated {
                cart_id: cart_id.to_owned(),
                owner: owner.to_owned(),
            }),
            correlation_id,
            clock,
        );
        self.apply_change(event)?;
        Ok(())
    }

    fn add_item(
        &mut self,
        item_id: &str,
        unit_price: Money,
        quantity: u32,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        let identity = identity_of(self)?;
        let event = new_event(
            self,
            &identity,
            ITEM_ADDED_EVENT_TYPE,
            CartEventKind::ItemAdded(ItemAdded {
                item_id: item_id.to_owned(),
                unit_price,
                quantity,
            }),
            correlation_id,
            clock,
        );
        self.apply_change(event)?;
        Ok(())
    }

    fn remove_item(
        &mut self,
        item_id: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        let identity = identity_of(self)?;
        let event = new_event(
            self,
            &identity,
            ITEM_REMOVED_EVENT_TYPE,
            CartEventKind::ItemRemoved(ItemRemoved {
                item_id: item_id.to_owned(),
            }),
            correlation_id,
            clock,
        );
        self.apply_change(event)?;
        Ok(())
    }

    fn check_out(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> Result<(), DomainError> {
        let identity = identity_of(self)?;
        let total = self.total();
        let event = new_event(
            self,
            &identity,
            CART_CHECKED_OUT_EVENT_TYPE,
            CartEventKind::CartCheckedOut(CartCheckedOut { total }),
            correlation_id,
            clock,
        );
        self.apply_change(event)?;
        Ok(())
    }
}
