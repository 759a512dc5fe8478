//! Chronicle demo: wires the cart context to an in-memory store and the
//! background publisher, and walks one cart through its lifecycle.

pub mod config;
pub mod error;
pub mod logging;
pub mod publisher;
pub mod scenario;
