//! Domain events for the Shopping Cart context.

use chronicle_core::error::DomainError;
use chronicle_core::event::{DomainEvent, EventMetadata, decode_payload, encode_payload};
use chronicle_core::store::StoredEvent;
use serde::{Deserialize, Serialize};

use super::money::Money;

/// Event type tag for [`CartCreated`].
pub const CART_CREATED_EVENT_TYPE: &str = "cart.created";
/// Event type tag for [`ItemAdded`].
pub const ITEM_ADDED_EVENT_TYPE: &str = "cart.item_added";
/// Event type tag for [`ItemRemoved`].
pub const ITEM_REMOVED_EVENT_TYPE: &str = "cart.item_removed";
/// Event type tag for [`CartCheckedOut`].
pub const CART_CHECKED_OUT_EVENT_TYPE: &str = "cart.checked_out";

/// Emitted when a cart is opened for an owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartCreated {
    /// The cart identifier.
    pub cart_id: String,
    /// The user who owns the cart.
    pub owner: String,
}

/// Emitted when items are added. Adding an item already in the cart
/// increases its quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAdded {
    /// The item identifier.
    pub item_id: String,
    /// Price of one unit.
    pub unit_price: Money,
    /// Number of units added.
    pub quantity: u32,
}

/// Emitted when an item line is removed entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRemoved {
    /// The item identifier.
    pub item_id: String,
}

/// Emitted when the cart is checked out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartCheckedOut {
    /// Cart total at checkout.
    pub total: Money,
}

/// Event payload variants for the Shopping Cart context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CartEventKind {
    /// A cart has been created.
    CartCreated(CartCreated),
    /// Items have been added.
    ItemAdded(ItemAdded),
    /// An item has been removed.
    ItemRemoved(ItemRemoved),
    /// The cart has been checked out.
    CartCheckedOut(CartCheckedOut),
    /// A payload whose tag this deployment does not know, e.g. written by a
    /// newer release.
    #[serde(other)]
    Unrecognized,
}

/// Domain event envelope for the Shopping Cart context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: CartEventKind,
}

impl DomainEvent for CartEvent {
    fn event_type(&self) -> &str {
        match &self.kind {
            CartEventKind::CartCreated(_) => CART_CREATED_EVENT_TYPE,
            CartEventKind::ItemAdded(_) => ITEM_ADDED_EVENT_TYPE,
            CartEventKind::ItemRemoved(_) => ITEM_REMOVED_EVENT_TYPE,
            CartEventKind::CartCheckedOut(_) => CART_CHECKED_OUT_EVENT_TYPE,
            CartEventKind::Unrecognized => &self.metadata.event_type,
        }
    }

    fn to_payload(&self) -> Result<serde_json::Value, DomainError> {
        encode_payload(self.event_type(), &self.kind)
    }

    fn from_stored(stored: &StoredEvent) -> Result<Self, DomainError> {
        Ok(Self {
            metadata: EventMetadata::from_stored(stored),
            kind: decode_payload(stored)?,
        })
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn assigned_identity(&self) -> Option<&str> {
        match &self.kind {
            CartEventKind::CartCreated(payload) => Some(payload.cart_id.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use chronicle_test_support::fixed_time;
    use uuid::Uuid;

    use super::*;

    fn envelope(kind: CartEventKind) -> CartEvent {
        CartEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: ITEM_ADDED_EVENT_TYPE.to_owned(),
                identity: "cart-1".to_owned(),
                sequence_number: 2,
                correlation_id: Uuid::new_v4(),
                causation_id: Uuid::new_v4(),
                occurred_at: fixed_time(),
            },
            kind,
        }
    }

    #[test]
    fn test_payload_is_internally_tagged() {
        let event = envelope(CartEventKind::ItemAdded(ItemAdded {
            item_id: "i1".to_owned(),
            unit_price: Money::from_cents(1000),
            quantity: 2,
        }));

        let payload = event.to_payload().unwrap();

        assert_eq!(
            payload,
            serde_json::json!({
                "type": "ItemAdded",
                "item_id": "i1",
                "unit_price": 1000,
                "quantity": 2,
            })
        );
    }

    #[test]
    fn test_stored_envelope_preserves_fields() {
        let event = envelope(CartEventKind::ItemAdded(ItemAdded {
            item_id: "i1".to_owned(),
            unit_price: Money::from_cents(1000),
            quantity: 2,
        }));

        let stored = event.to_stored("cart").unwrap();
        let decoded = CartEvent::from_stored(&stored).unwrap();

        assert_eq!(stored.event_type, ITEM_ADDED_EVENT_TYPE);
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_unknown_tag_decodes_to_unrecognized() {
        let mut stored = envelope(CartEventKind::ItemRemoved(ItemRemoved {
            item_id: "i1".to_owned(),
        }))
        .to_stored("cart")
        .unwrap();
        stored.event_type = "cart.gift_wrapped".to_owned();
        stored.payload = serde_json::json!({ "type": "GiftWrapped", "paper": "red" });

        let decoded = CartEvent::from_stored(&stored).unwrap();

        assert_eq!(decoded.kind, CartEventKind::Unrecognized);
        assert_eq!(decoded.event_type(), "cart.gift_wrapped");
    }

    #[test]
    fn test_only_creation_assigns_identity() {
        let created = envelope(CartEventKind::CartCreated(CartCreated {
            cart_id: "cart-1".to_owned(),
            owner: "u1".to_owned(),
        }));
        let removed = envelope(CartEventKind::ItemRemoved(ItemRemoved {
            item_id: "i1".to_owned(),
        }));

        assert_eq!(created.assigned_identity(), Some("cart-1"));
        assert_eq!(removed.assigned_identity(), None);
    }
}
