//! Entity conversion functions.
//!
//! Pure functions between domain entities and the table service's JSON
//! payloads. Testable without network access.

use serde_json::{Map, Value as Json};

use tablegate_core::entity::{Entity, PARTITION_KEY, ROW_KEY};
use tablegate_core::store::StoreError;

// ============================================================================
// Addressing
// ============================================================================

const ODATA_TYPE_SUFFIX: &str = "@odata.type";
const EDM_INT64: &str = "Edm.Int64";

/// Quotes a key for use inside an entity resource path.
pub fn escape_key(key: &str) -> String {
    urlencoding::encode(&key.replace('\'', "''")).into_owned()
}

/// Resource path segment addressing one entity.
pub fn entity_resource(table: &str, partition_key: &str, row_key: &str) -> String {
    format!(
        "{table}(PartitionKey='{}',RowKey='{}')",
        escape_key(partition_key),
        escape_key(row_key)
    )
}

/// `$select` value for a projected query.
///
/// The keys are always requested so that projected rows still decode into
/// entities.
pub fn select_clause(fields: &[String]) -> String {
    let mut columns = vec![PARTITION_KEY, ROW_KEY];
    for field in fields {
        if !columns.contains(&field.as_str()) {
            columns.push(field.as_str());
        }
    }
    columns.join(",")
}

// ============================================================================
// Entity conversions
// ============================================================================

/// Convert an Entity to a request payload.
///
/// Integers outside the 32-bit range are sent as typed `Edm.Int64` strings.
pub fn entity_to_json(entity: &Entity) -> Json {
    let mut body = Map::new();
    body.insert(
        PARTITION_KEY.to_string(),
        Json::String(entity.partition_key.clone()),
    );
    body.insert(ROW_KEY.to_string(), Json::String(entity.row_key.clone()));

    for (name, value) in &entity.fields {
        match value {
            tablegate_core::entity::Value::Int(i) if i32::try_from(*i).is_err() => {
                body.insert(
                    format!("{name}{ODATA_TYPE_SUFFIX}"),
                    Json::String(EDM_INT64.to_string()),
                );
                body.insert(name.clone(), Json::String(i.to_string()));
            }
            other => {
                body.insert(
                    name.clone(),
                    serde_json::to_value(other).unwrap_or(Json::Null),
                );
            }
        }
    }

    Json::Object(body)
}

/// Convert a response object to an Entity.
///
/// `Edm.Int64` annotations are folded back into integers; other metadata
/// properties are dropped.
pub fn entity_from_json(value: Json, etag: Option<String>) -> Result<Entity, StoreError> {
    let Json::Object(mut object) = value else {
        return Err(StoreError::Serialization(
            "expected an entity object".to_string(),
        ));
    };

    let annotated: Vec<String> = object
        .iter()
        .filter(|(_, v)| v.as_str() == Some(EDM_INT64))
        .filter_map(|(k, _)| k.strip_suffix(ODATA_TYPE_SUFFIX).map(str::to_string))
        .collect();

    for name in annotated {
        if let Some(parsed) = object
            .get(&name)
            .and_then(Json::as_str)
            .and_then(|s| s.parse::<i64>().ok())
        {
            object.insert(name, Json::from(parsed));
        }
    }

    let body_etag = object
        .remove("odata.etag")
        .and_then(|v| v.as_str().map(str::to_string));
    object.retain(|k, _| !k.starts_with("odata.") && !k.ends_with(ODATA_TYPE_SUFFIX));

    let mut entity: Entity = serde_json::from_value(Json::Object(object))
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    entity.etag = etag.or(body_etag);
    Ok(entity)
}
