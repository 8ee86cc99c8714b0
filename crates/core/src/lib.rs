//! Functional core for tablegate.
//!
//! Pure data types and functions: entity model, connection descriptors,
//! table naming, batch normalization, replication policy and the backing
//! store trait. Nothing in this crate performs I/O.

pub mod batch;
pub mod connection;
pub mod entity;
pub mod naming;
pub mod replication;
pub mod request;
pub mod result;
pub mod store;
pub mod validation;
