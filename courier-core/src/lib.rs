//! Courier Core
//!
//! Resource model, schemas, provider trait and status waiter shared by
//! Courier providers

pub mod provider;
pub mod resource;
pub mod schema;
pub mod waiter;
