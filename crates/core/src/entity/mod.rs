mod types;

pub use types::{
    is_reserved_field, Entity, Record, Value, DELETE_FLAG, PARTITION_KEY, ROW_KEY, TIMESTAMP,
    WILDCARD_ETAG,
};
