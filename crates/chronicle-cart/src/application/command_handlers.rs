//! Command handlers for the Shopping Cart context.
//!
//! Each handler loads the cart through the repository, runs one behaviour
//! method and saves the resulting events.

use chronicle_core::aggregate::AggregateRoot;
use chronicle_core::clock::Clock;
use chronicle_core::command::Command;
use chronicle_core::error::DomainError;
use chronicle_core::repository::Repository;
use chronicle_core::store::StoredEvent;
use chronicle_core::validation::ValidationError;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::domain::aggregates::{Cart, CartBehaviour};
use crate::domain::commands::{AddItem, CheckOut, CreateCart, RemoveItem};

/// Result of a successfully handled command.
#[derive(Debug)]
pub struct CartCommandResult {
    /// The cart affected by the command.
    pub cart_id: String,
    /// Cart version after the command.
    pub version: i64,
    /// The stored events produced and persisted.
    pub stored_events: Vec<StoredEvent>,
}

async fn execute<C, F>(
    command: &C,
    repo: &Repository<Cart>,
    cancel: &CancellationToken,
    change: F,
) -> Result<CartCommandResult, DomainError>
where
    C: Command,
    F: FnOnce(&mut AggregateRoot<Cart>) -> Result<(), DomainError> + Send,
{
    let mut cart = repo.get(command.identity(), cancel).await?;
    change(&mut cart)?;
    let stored_events = repo.save(&mut cart, cancel).await?;
    info!(
        command = command.command_type(),
        version = cart.version(),
        "cart command handled"
    );
    Ok(CartCommandResult {
        cart_id: command.identity().to_owned(),
        version: cart.version(),
        stored_events,
    })
}

/// Handles the `CreateCart` command: opens a new cart and persists the
/// creation event.
///
/// # Errors
///
/// Returns `DomainError::ValidationFailed` if a cart with the same id
/// already exists or the owner is blank, or the repository's errors.
#[instrument(
    skip_all,
    fields(cart_id = %command.cart_id, correlation_id = %command.correlation_id)
)]
pub async fn handle_create_cart(
    command: &CreateCart,
    clock: &dyn Clock,
    repo: &Repository<Cart>,
    cancel: &CancellationToken,
) -> Result<CartCommandResult, DomainError> {
    if repo.load(&command.cart_id, cancel).await?.is_some() {
        return Err(DomainError::ValidationFailed {
            message: format!("cart {} already exists", command.cart_id),
            errors: vec![ValidationError::with_code(
                "cart already exists",
                "cart_exists",
            )],
        });
    }

    let mut cart = AggregateRoot::<Cart>::new();
    cart.create(
        &command.cart_id,
        &command.owner,
        command.correlation_id,
        clock,
    )?;
    let stored_events = repo.save(&mut cart, cancel).await?;
    info!(command = command.command_type(), "cart command handled");

    Ok(CartCommandResult {
        cart_id: command.cart_id.clone(),
        version: cart.version(),
        stored_events,
    })
}

/// Handles the `AddItem` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the cart does not exist,
/// `DomainError::ValidationFailed` if the cart rejects the item, or the
/// repository's errors.
#[instrument(
    skip_all,
    fields(cart_id = %command.cart_id, correlation_id = %command.correlation_id)
)]
pub async fn handle_add_item(
    command: &AddItem,
    clock: &dyn Clock,
    repo: &Repository<Cart>,
    cancel: &CancellationToken,
) -> Result<CartCommandResult, DomainError> {
    execute(command, repo, cancel, |cart| {
        cart.add_item(
            &command.item_id,
            command.unit_price,
            command.quantity,
            command.correlation_id,
            clock,
        )
    })
    .await
}

/// Handles the `RemoveItem` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the cart does not exist,
/// `DomainError::ValidationFailed` if the item is not in the cart, or the
/// repository's errors.
#[instrument(
    skip_all,
    fields(cart_id = %command.cart_id, correlation_id = %command.correlation_id)
)]
pub async fn handle_remove_item(
    command: &RemoveItem,
    clock: &dyn Clock,
    repo: &Repository<Cart>,
    cancel: &CancellationToken,
) -> Result<CartCommandResult, DomainError> {
    execute(command, repo, cancel, |cart| {
        cart.remove_item(&command.item_id, command.correlation_id, clock)
    })
    .await
}

/// Handles the `CheckOut` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the cart does not exist,
/// `DomainError::ValidationFailed` if the cart is empty or already checked
/// out, or the repository's errors.
#[instrument(
    skip_all,
    fields(cart_id = %command.cart_id, correlation_id = %command.correlation_id)
)]
pub async fn handle_check_out(
    command: &CheckOut,
    clock: &dyn Clock,
    repo: &Repository<Cart>,
    cancel: &CancellationToken,
) -> Result<CartCommandResult, DomainError> {
    execute(command, repo, cancel, |cart| {
        cart.check_out(command.correlation_id, clock)
    })
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chronicle_core::error::DomainError;
    use chronicle_core::publish::NoopPublisher;
    use chronicle_core::repository::Repository;
    use chronicle_test_support::{
        FailingEventStore, FixedClock, InMemoryEventStore, RecordingPublisher,
    };
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    use crate::application::command_handlers::{
        handle_add_item, handle_check_out, handle_create_cart, handle_remove_item,
    };
    use crate::domain::aggregates::Cart;
    use crate::domain::commands::{AddItem, CheckOut, CreateCart, RemoveItem};
    use crate::domain::events::{
        CART_CHECKED_OUT_EVENT_TYPE, CART_CREATED_EVENT_TYPE, ITEM_ADDED_EVENT_TYPE,
    };
    use crate::domain::money::Money;

    fn create_command(cart_id: &str) -> CreateCart {
        CreateCart {
            correlation_id: Uuid::new_v4(),
            cart_id: cart_id.to_owned(),
            owner: "u1".to_owned(),
        }
    }

    fn add_command(cart_id: &str, item_id: &str, cents: i64, quantity: u32) -> AddItem {
        AddItem {
            correlation_id: Uuid::new_v4(),
            cart_id: cart_id.to_owned(),
            item_id: item_id.to_owned(),
            unit_price: Money::from_cents(cents),
            quantity,
        }
    }

    #[tokio::test]
    async fn test_handle_create_cart_persists_and_publishes_creation() {
        // Arrange
        let store = Arc::new(InMemoryEventStore::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let repo = Repository::<Cart>::new(store.clone(), publisher.clone());
        let command = create_command("cart-1");

        // Act
        let result = handle_create_cart(
            &command,
            &FixedClock::default(),
            &repo,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(result.cart_id, "cart-1");
        assert_eq!(result.version, 1);
        assert_eq!(result.stored_events.len(), 1);
        let stored = &result.stored_events[0];
        assert_eq!(stored.event_type, CART_CREATED_EVENT_TYPE);
        assert_eq!(stored.aggregate_type, "cart");
        assert_eq!(stored.correlation_id, command.correlation_id);
        assert_eq!(store.stream("cart-1").len(), 1);
        assert_eq!(
            publisher.published_event_types(),
            vec![CART_CREATED_EVENT_TYPE]
        );
    }

    #[tokio::test]
    async fn test_handle_create_cart_rejects_existing_cart() {
        let repo = Repository::<Cart>::new(
            Arc::new(InMemoryEventStore::new()),
            Arc::new(NoopPublisher),
        );
        let clock = FixedClock::default();
        let cancel = CancellationToken::new();
        handle_create_cart(&create_command("cart-1"), &clock, &repo, &cancel)
            .await
            .unwrap();

        let result = handle_create_cart(&create_command("cart-1"), &clock, &repo, &cancel).await;

        assert!(matches!(result, Err(DomainError::ValidationFailed { .. })));
    }

    #[tokio::test]
    async fn test_handle_add_item_appends_to_existing_stream() {
        // Arrange
        let store = Arc::new(InMemoryEventStore::new());
        let repo = Repository::<Cart>::new(store.clone(), Arc::new(NoopPublisher));
        let clock = FixedClock::default();
        let cancel = CancellationToken::new();
        handle_create_cart(&create_command("cart-1"), &clock, &repo, &cancel)
            .await
            .unwrap();

        // Act
        let result = handle_add_item(&add_command("cart-1", "i1", 1000, 2), &clock, &repo, &cancel)
            .await
            .unwrap();

        // Assert
        assert_eq!(result.version, 2);
        assert_eq!(result.stored_events[0].event_type, ITEM_ADDED_EVENT_TYPE);
        assert_eq!(result.stored_events[0].sequence_number, 2);
        let sequence: Vec<i64> = store
            .stream("cart-1")
            .iter()
            .map(|e| e.sequence_number)
            .collect();
        assert_eq!(sequence, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_handle_add_item_returns_not_found_for_missing_cart() {
        let repo = Repository::<Cart>::new(
            Arc::new(InMemoryEventStore::new()),
            Arc::new(NoopPublisher),
        );

        let result = handle_add_item(
            &add_command("cart-404", "i1", 1000, 1),
            &FixedClock::default(),
            &repo,
            &CancellationToken::new(),
        )
        .await;

        match result {
            Err(DomainError::AggregateNotFound(identity)) => assert_eq!(identity, "cart-404"),
            other => panic!("expected AggregateNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_handle_remove_item_rejects_unknown_item_without_writing() {
        // Arrange
        let store = Arc::new(InMemoryEventStore::new());
        let repo = Repository::<Cart>::new(store.clone(), Arc::new(NoopPublisher));
        let clock = FixedClock::default();
        let cancel = CancellationToken::new();
        handle_create_cart(&create_command("cart-1"), &clock, &repo, &cancel)
            .await
            .unwrap();
        let command = RemoveItem {
            correlation_id: Uuid::new_v4(),
            cart_id: "cart-1".to_owned(),
            item_id: "i9".to_owned(),
        };

        // Act
        let result = handle_remove_item(&command, &clock, &repo, &cancel).await;

        // Assert
        assert!(matches!(result, Err(DomainError::ValidationFailed { .. })));
        assert_eq!(store.stream("cart-1").len(), 1);
    }

    #[tokio::test]
    async fn test_handle_check_out_records_total() {
        // Arrange
        let store = Arc::new(InMemoryEventStore::new());
        let repo = Repository::<Cart>::new(store.clone(), Arc::new(NoopPublisher));
        let clock = FixedClock::default();
        let cancel = CancellationToken::new();
        handle_create_cart(&create_command("cart-1"), &clock, &repo, &cancel)
            .await
            .unwrap();
        handle_add_item(&add_command("cart-1", "i1", 1000, 3), &clock, &repo, &cancel)
            .await
            .unwrap();
        let command = CheckOut {
            correlation_id: Uuid::new_v4(),
            cart_id: "cart-1".to_owned(),
        };

        // Act
        let result = handle_check_out(&command, &clock, &repo, &cancel)
            .await
            .unwrap();

        // Assert
        let stored = &result.stored_events[0];
        assert_eq!(stored.event_type, CART_CHECKED_OUT_EVENT_TYPE);
        assert_eq!(stored.payload["total"], 3000);
        assert_eq!(result.version, 3);
    }

    #[tokio::test]
    async fn test_handlers_propagate_store_errors() {
        let repo = Repository::<Cart>::new(Arc::new(FailingEventStore), Arc::new(NoopPublisher));

        let result = handle_create_cart(
            &create_command("cart-1"),
            &FixedClock::default(),
            &repo,
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }
}
