//! Key and table name validation.

use std::sync::LazyLock;

use regex::Regex;

/// Maximum number of items accepted in one batch.
pub const MAX_BATCH_ITEMS: usize = 100;

static TABLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-zA-Z0-9]{2,62}$").expect("valid table name pattern"));

// Anchored: an empty key or a key with any character outside the class is rejected.
static KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\-_.~,! ]+$").expect("valid key pattern"));

/// True when the physical table name is accepted by the backing store.
pub fn is_valid_table_name(name: &str) -> bool {
    TABLE_NAME.is_match(name)
}

/// True when the value can be used as a partition key or row key.
pub fn is_valid_key(key: &str) -> bool {
    KEY.is_match(key)
}
