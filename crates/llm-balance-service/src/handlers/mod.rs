//! API handlers.

pub mod balance;
pub mod health;
