//! Chronicle: Shopping Cart bounded context.
//!
//! Responsible for cart creation, line items and checkout. Serves as the
//! reference domain for the aggregate core.

pub mod application;
pub mod domain;
