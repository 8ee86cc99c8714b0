//! Health check endpoints for Kubernetes-style probes.
//!
//! - `/healthz` - Basic liveness probe (immediate 200, no checks)
//! - `/readyz` - Readiness probe (one query per configured account)

use axum::{extract::State, http::StatusCode, Json};
use futures_util::future::join_all;
use serde::Serialize;

use tablegate_core::store::{AccountRole, EntityQuery};

use crate::{handlers::AppError, state::AppState};

/// Table probed by the readiness check. It does not need to exist.
const PROBE_TABLE: &str = "tablegateprobe";

#[derive(Debug, Serialize)]
pub struct AccountStatus {
    pub role: AccountRole,
    pub account: String,
    pub ready: bool,
}

/// GET /healthz - Basic liveness probe.
#[axum::debug_handler]
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// GET /readyz - Readiness probe.
///
/// Runs a one-row query on every account. A missing probe table still proves
/// the account answers. Only a primary failure fails the probe.
#[axum::debug_handler]
pub async fn readyz(State(state): State<AppState>) -> Result<Json<Vec<AccountStatus>>, AppError> {
    let accounts = state.service.accounts();
    let query = EntityQuery::default().with_top(1);

    let probes = join_all(accounts.iter().map(|(role, store)| {
        let query = &query;
        async move {
            let result = match store.query_entities(PROBE_TABLE, query).await {
                Err(err) if !err.is_table_missing() => Err(err),
                _ => Ok(()),
            };
            match (role, result) {
                (AccountRole::Primary, Err(err)) => Err(err),
                (role, result) => Ok(AccountStatus {
                    role,
                    account: store.account_name().to_string(),
                    ready: result.is_ok(),
                }),
            }
        }
    }))
    .await;

    let statuses = probes.into_iter().collect::<Result<Vec<_>, _>>()?;
    Ok(Json(statuses))
}
