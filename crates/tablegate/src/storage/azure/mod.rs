//! Azure Table storage backend.
//!
//! Talks to the table service REST API with `reqwest`, signing requests with
//! SharedKeyLite. Batches are sent as entity group transactions.

mod auth;
mod batch;
mod client;
mod conversions;
mod error;

pub use client::AzureTableStore;
