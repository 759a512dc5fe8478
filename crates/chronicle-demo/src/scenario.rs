//! The cart walkthrough run by the demo binary.

use chronicle_cart::application::command_handlers::{
    handle_add_item, handle_check_out, handle_create_cart, handle_remove_item,
};
use chronicle_cart::application::query_handlers::{CartView, get_cart_by_id};
use chronicle_cart::domain::aggregates::Cart;
use chronicle_cart::domain::commands::{AddItem, CheckOut, CreateCart, RemoveItem};
use chronicle_cart::domain::money::Money;
use chronicle_core::clock::Clock;
use chronicle_core::repository::Repository;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::DemoError;

/// Creates a cart for `owner`, fills it, removes one line and checks it
/// out. Every step shares one correlation id.
///
/// # Errors
///
/// Returns `DemoError::Domain` if any command or the final query fails.
#[instrument(skip(clock, repo, cancel))]
pub async fn run_cart_lifecycle(
    cart_id: &str,
    owner: &str,
    clock: &dyn Clock,
    repo: &Repository<Cart>,
    cancel: &CancellationToken,
) -> Result<CartView, DemoError> {
    let correlation_id = Uuid::new_v4();

    handle_create_cart(
        &CreateCart {
            correlation_id,
            cart_id: cart_id.to_owned(),
            owner: owner.to_owned(),
        },
        clock,
        repo,
        cancel,
    )
    .await?;

    for (item_id, cents, quantity) in [("book", 1_250, 1), ("pen", 199, 3), ("book", 1_250, 1)] {
        handle_add_item(
            &AddItem {
                correlation_id,
                cart_id: cart_id.to_owned(),
                item_id: item_id.to_owned(),
                unit_price: Money::from_cents(cents),
                quantity,
            },
            clock,
            repo,
            cancel,
        )
        .await?;
    }

    handle_remove_item(
        &RemoveItem {
            correlation_id,
            cart_id: cart_id.to_owned(),
            item_id: "pen".to_owned(),
        },
        clock,
        repo,
        cancel,
    )
    .await?;

    let result = handle_check_out(
        &CheckOut {
            correlation_id,
            cart_id: cart_id.to_owned(),
        },
        clock,
        repo,
        cancel,
    )
    .await?;
    info!(version = result.version, "cart checked out");

    Ok(get_cart_by_id(cart_id, repo, cancel).await?)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chronicle_core::error::DomainError;
    use chronicle_test_support::{FixedClock, InMemoryEventStore, RecordingPublisher};

    use super::*;

    #[tokio::test]
    async fn test_lifecycle_checks_out_remaining_lines() {
        // Arrange
        let store = Arc::new(InMemoryEventStore::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let repo = Repository::<Cart>::new(store.clone(), publisher.clone());

        // Act
        let view = run_cart_lifecycle(
            "cart-1",
            "u1",
            &FixedClock::default(),
            &repo,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        // Assert
        assert!(view.checked_out);
        assert_eq!(view.version, 6);
        assert_eq!(view.total, Money::from_cents(2_500));
        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.lines[0].quantity, 2);
        assert_eq!(store.stream("cart-1").len(), 6);
        assert_eq!(publisher.published_batches().len(), 6);
    }

    #[tokio::test]
    async fn test_lifecycle_stops_when_cancelled() {
        // Arrange
        let store = Arc::new(InMemoryEventStore::new());
        let repo = Repository::<Cart>::new(store.clone(), Arc::new(RecordingPublisher::new()));
        let cancel = CancellationToken::new();
        cancel.cancel();

        // Act
        let result =
            run_cart_lifecycle("cart-1", "u1", &FixedClock::default(), &repo, &cancel).await;

        // Assert
        assert!(matches!(
            result,
            Err(DemoError::Domain(DomainError::Cancelled))
        ));
        assert!(store.stream("cart-1").is_empty());
    }
}
