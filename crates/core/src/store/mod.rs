mod error;
mod http_mapping;
mod traits;
mod types;

pub use error::{
    Result, StoreError, RESOURCE_NOT_FOUND_CODE, TABLE_ALREADY_EXISTS_CODE, TABLE_NOT_FOUND_CODE,
};
pub use http_mapping::{errors_to_status_code, store_error_to_status_code};
pub use traits::TableStore;
pub use types::{
    AccountRole, BatchOperation, ContinuationToken, EntityQuery, QueryPage, TableBatch,
    TableCreation,
};
