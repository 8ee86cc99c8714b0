//! Backing store implementations.
//!
//! This module provides concrete implementations of the `TableStore` trait
//! defined in `tablegate_core::store`. The implementation used by the server
//! is selected at compile time via feature flags.
//!
//! # Feature Flags
//!
//! - `inmemory` (default): process-local tables, for development and tests
//! - `azure`: Azure Table storage over its REST API
//!
//! These features are mutually exclusive. The in-memory store is always
//! compiled for tests.
//!
//! # Examples
//!
//! Build against Azure Table storage:
//! ```bash
//! cargo build -p tablegate --no-default-features --features azure
//! ```

// Compile-time checks for mutual exclusivity
#[cfg(all(feature = "inmemory", feature = "azure"))]
compile_error!(
    "Features 'inmemory' and 'azure' are mutually exclusive. \
    Enable only one storage backend at a time."
);

#[cfg(not(any(feature = "inmemory", feature = "azure")))]
compile_error!(
    "No storage backend selected. Enable 'inmemory' or 'azure' feature. \
    Example: cargo build -p tablegate --features azure"
);

#[cfg(any(feature = "inmemory", test))]
pub mod inmemory;

#[cfg(feature = "azure")]
pub mod azure;

#[cfg(test)]
pub mod testing;

#[cfg(feature = "inmemory")]
pub use inmemory::InMemoryTableStore;

#[cfg(feature = "azure")]
pub use azure::AzureTableStore;
