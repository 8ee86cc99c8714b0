//! In-memory storage backend.
//!
//! Process-local tables that follow the remote store's observable behavior:
//! data operations on a missing table fail with `TableNotFound`, batches are
//! atomic, and queries page with continuation tokens.

mod filter;
mod store;

pub use store::InMemoryTableStore;
