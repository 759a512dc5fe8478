//! Command abstractions.

use uuid::Uuid;

/// A request to change one aggregate.
///
/// Command handlers use these accessors to label tracing spans and to stamp
/// correlation and causation ids on the events they produce.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command, e.g. `"cart.add_item"`.
    fn command_type(&self) -> &'static str;

    /// Identity of the aggregate the command targets.
    fn identity(&self) -> &str;

    /// Correlation ID to trace this command through the system.
    fn correlation_id(&self) -> Uuid;
}
