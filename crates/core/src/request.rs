//! Per-call request parameters.
//!
//! `RequestParams` is derived once per operation from caller options and the
//! process defaults, and is never mutated afterwards.

use serde::{Deserialize, Serialize};

use crate::naming::{resolve_table_names, split_table_spec, TableNames};

/// Partition key used when the caller does not supply one.
pub const DEFAULT_PARTITION_KEY: &str = "_default";
/// Field consulted first when an item has no explicit row key.
pub const DEFAULT_ID_FIELD: &str = "Id";
/// Tenant code used when neither the caller nor configuration supplies one.
pub const DEFAULT_TENANT_CODE: &str = "a";
/// Environment code used when neither the caller nor configuration supplies one.
pub const DEFAULT_ENV_CODE: &str = "prd";

/// Process-wide scoping defaults, read once from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeDefaults {
    pub tenant_code: String,
    pub env_code: String,
}

impl Default for ScopeDefaults {
    fn default() -> Self {
        Self {
            tenant_code: DEFAULT_TENANT_CODE.to_string(),
            env_code: DEFAULT_ENV_CODE.to_string(),
        }
    }
}

/// Scoping options supplied by the caller. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    #[serde(default)]
    pub tenant_code: Option<String>,
    #[serde(default)]
    pub env_code: Option<String>,
    #[serde(default)]
    pub partition_key: Option<String>,
}

impl RequestOptions {
    pub fn with_tenant_code(mut self, tenant_code: impl Into<String>) -> Self {
        self.tenant_code = Some(tenant_code.into());
        self
    }

    pub fn with_env_code(mut self, env_code: impl Into<String>) -> Self {
        self.env_code = Some(env_code.into());
        self
    }

    pub fn with_partition_key(mut self, partition_key: impl Into<String>) -> Self {
        self.partition_key = Some(partition_key.into());
        self
    }
}

/// Immutable parameters for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParams {
    pub tenant_code: String,
    pub env_code: String,
    pub logical_name: String,
    pub secondary_logical_name: Option<String>,
    pub tables: TableNames,
    pub partition_key: String,
    pub row_key: Option<String>,
    pub id_field: String,
}

impl RequestParams {
    /// Resolves parameters for a table spec.
    pub fn resolve(table_spec: &str, options: &RequestOptions, defaults: &ScopeDefaults) -> Self {
        let tenant_code = non_empty(options.tenant_code.as_deref())
            .unwrap_or(&defaults.tenant_code)
            .to_string();
        let env_code = non_empty(options.env_code.as_deref())
            .unwrap_or(&defaults.env_code)
            .to_uppercase();
        let partition_key = non_empty(options.partition_key.as_deref())
            .unwrap_or(DEFAULT_PARTITION_KEY)
            .to_string();

        let (logical_name, secondary_logical_name) = split_table_spec(table_spec);
        let tables = resolve_table_names(table_spec, &tenant_code, &env_code);

        Self {
            logical_name: logical_name.to_string(),
            secondary_logical_name: secondary_logical_name.map(str::to_string),
            tenant_code,
            env_code,
            tables,
            partition_key,
            row_key: None,
            id_field: DEFAULT_ID_FIELD.to_string(),
        }
    }

    /// Sets the row key addressed by a single-item operation.
    pub fn with_row_key(mut self, row_key: Option<&str>) -> Self {
        self.row_key = non_empty(row_key).map(str::to_string);
        self
    }

    /// Overrides the identifier fallback field. Empty names keep the default.
    pub fn with_id_field(mut self, id_field: Option<&str>) -> Self {
        if let Some(field) = non_empty(id_field) {
            self.id_field = field.to_string();
        }
        self
    }

    /// The physical name of the primary table.
    pub fn table_name(&self) -> &str {
        &self.tables.primary
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_uses_defaults() {
        let params =
            RequestParams::resolve("t1", &RequestOptions::default(), &ScopeDefaults::default());

        assert_eq!(params.tenant_code, "a");
        assert_eq!(params.env_code, "PRD");
        assert_eq!(params.table_name(), "aPRDt1");
        assert_eq!(params.partition_key, "_default");
        assert_eq!(params.id_field, "Id");
        assert_eq!(params.row_key, None);
    }

    #[test]
    fn test_resolve_prefers_request_options() {
        let options = RequestOptions::default()
            .with_tenant_code("acme")
            .with_env_code("dev")
            .with_partition_key("store42");
        let params = RequestParams::resolve("stock", &options, &ScopeDefaults::default());

        assert_eq!(params.table_name(), "acmeDEVstock");
        assert_eq!(params.partition_key, "store42");
    }

    #[test]
    fn test_resolve_treats_empty_options_as_absent() {
        let options = RequestOptions::default()
            .with_tenant_code("")
            .with_partition_key("");
        let defaults = ScopeDefaults {
            tenant_code: "z".to_string(),
            env_code: "uat".to_string(),
        };
        let params = RequestParams::resolve("t1", &options, &defaults);

        assert_eq!(params.table_name(), "zUATt1");
        assert_eq!(params.partition_key, "_default");
    }

    #[test]
    fn test_resolve_two_tables() {
        let params = RequestParams::resolve(
            "left , right",
            &RequestOptions::default(),
            &ScopeDefaults::default(),
        );

        assert_eq!(params.logical_name, "left");
        assert_eq!(params.secondary_logical_name.as_deref(), Some("right"));
        assert_eq!(params.tables.secondary.as_deref(), Some("aPRDright"));
    }

    #[test]
    fn test_row_key_and_id_field_overrides() {
        let params =
            RequestParams::resolve("t1", &RequestOptions::default(), &ScopeDefaults::default())
                .with_row_key(Some("r1"))
                .with_id_field(Some("Sku"));

        assert_eq!(params.row_key.as_deref(), Some("r1"));
        assert_eq!(params.id_field, "Sku");

        let params = params.with_id_field(Some("")).with_row_key(Some(""));
        assert_eq!(params.id_field, "Sku");
        assert_eq!(params.row_key, None);
    }
}
