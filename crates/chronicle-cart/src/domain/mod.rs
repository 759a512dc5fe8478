//! Domain layer: events, commands, money and the cart aggregate.

pub mod aggregates;
pub mod commands;
pub mod events;
pub mod money;
