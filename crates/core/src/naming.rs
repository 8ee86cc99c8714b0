//! Physical table naming.
//!
//! Pure functions mapping a tenant, an environment and a logical table spec
//! onto the physical table names used in the backing store.

use serde::Serialize;

/// Physical table names resolved from a table spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableNames {
    pub primary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
}

/// Splits a logical table spec into its primary and optional secondary name.
///
/// The secondary name follows the first comma. Both parts are trimmed.
pub fn split_table_spec(table_spec: &str) -> (&str, Option<&str>) {
    match table_spec.split_once(',') {
        Some((primary, secondary)) => {
            let secondary = secondary.trim();
            (
                primary.trim(),
                (!secondary.is_empty()).then_some(secondary),
            )
        }
        None => (table_spec.trim(), None),
    }
}

/// Builds the physical name for one logical table.
///
/// Pattern: `<tenant><ENV><logical>`
pub fn physical_table_name(tenant_code: &str, env_code: &str, logical_name: &str) -> String {
    format!("{tenant_code}{}{logical_name}", env_code.to_uppercase())
}

/// Resolves a table spec into physical table names.
///
/// Never fails; a malformed result is reported by validation.
///
/// # Examples
///
/// ```
/// use tablegate_core::naming::resolve_table_names;
///
/// let names = resolve_table_names("orders, stock", "a", "prd");
/// assert_eq!(names.primary, "aPRDorders");
/// assert_eq!(names.secondary.as_deref(), Some("aPRDstock"));
/// ```
pub fn resolve_table_names(table_spec: &str, tenant_code: &str, env_code: &str) -> TableNames {
    let (primary, secondary) = split_table_spec(table_spec);

    TableNames {
        primary: physical_table_name(tenant_code, env_code, primary),
        secondary: secondary.map(|name| physical_table_name(tenant_code, env_code, name)),
    }
}
