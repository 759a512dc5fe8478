//! Chronicle Core: event-sourced aggregate abstractions.
//!
//! This crate defines the aggregate root, event, validation and error types
//! together with the contracts for event stores and publishers. It contains
//! no storage or transport code.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod publish;
pub mod repository;
pub mod store;
pub mod validation;
