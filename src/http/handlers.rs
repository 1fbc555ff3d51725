//! API handlers.

use alloy::primitives::Address;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::relay::types::{MetaTransaction, RejectReason, RelayOutcome};
use crate::store::subscriptions::Deployment;
use crate::subscriptions::registry::{
    AuthorizationRequest, AuthorizeOutcome, SaveOutcome, SaveRejection,
};
use crate::subscriptions::types::Subscription;

type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
pub struct Banner {
    pub name: &'static str,
    pub version: &'static str,
    pub network: u64,
}

pub async fn banner(State(state): State<AppState>) -> Json<Banner> {
    Json(Banner {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        network: state.network().0,
    })
}

pub async fn health(State(state): State<AppState>) -> Response {
    match state.ledger.probe().await {
        Ok(()) => {
            metrics::record_ledger_up(true);
            (StatusCode::OK, Json(json!({ "ledger": true }))).into_response()
        }
        Err(e) => {
            metrics::record_ledger_up(false);
            tracing::warn!(error = %e, "Health probe failed");
            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "ledger": false }))).into_response()
        }
    }
}

pub async fn miner(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let address = state.ledger.operator().await?;
    Ok(Json(json!({ "address": address })))
}

pub async fn subscriptions(State(state): State<AppState>) -> ApiResult<Json<Vec<Subscription>>> {
    Ok(Json(state.store.subscriptions().await?))
}

pub async fn contracts(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.store.deployments(Deployment::Contract).await?))
}

pub async fn subcontracts(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.store.deployments(Deployment::SubscriptionContract).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    pub contract_address: String,
}

pub async fn deploy(
    State(state): State<AppState>,
    body: Result<Json<DeployRequest>, JsonRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    record_deployment(&state, Deployment::Contract, body?.0).await
}

pub async fn deploy_sub(
    State(state): State<AppState>,
    body: Result<Json<DeployRequest>, JsonRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    record_deployment(&state, Deployment::SubscriptionContract, body?.0).await
}

async fn record_deployment(
    state: &AppState,
    kind: Deployment,
    request: DeployRequest,
) -> ApiResult<Json<serde_json::Value>> {
    let address = request.contract_address.trim().to_string();
    if address.to_lowercase().parse::<Address>().is_err() {
        return Err(ApiError::Unprocessable(format!("'{}' is not an address", address)));
    }

    if state.store.record_deployment(kind, &address).await? {
        tracing::info!(contract = %address, kind = ?kind, "Deployment recorded");
    }
    Ok(Json(json!({ "contract": address })))
}

pub async fn authorizations(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.store.authorizations(&address).await?))
}

pub async fn sign(
    State(state): State<AppState>,
    body: Result<Json<AuthorizationRequest>, JsonRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let Json(request) = body?;
    match state.registry.authorize(&request).await? {
        AuthorizeOutcome::Recorded { accounts } => Ok(Json(json!({
            "address": request.address,
            "accounts": accounts,
        }))),
        AuthorizeOutcome::InvalidSignature => Err(ApiError::Forbidden(
            "signature does not recover to account".to_string(),
        )),
    }
}

pub async fn abi(State(state): State<AppState>, Path(address): Path<String>) -> Json<serde_json::Value> {
    match state.abis.lookup(&address) {
        Some(entry) => Json(json!({ "status": "1", "message": "OK", "result": entry.abi })),
        None => Json(json!({ "status": "0", "message": "UNKNOWN ADDRESS" })),
    }
}

pub async fn save_subscription(
    State(state): State<AppState>,
    body: Result<Json<Subscription>, JsonRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let Json(subscription) = body?;
    match state.registry.save(subscription).await? {
        SaveOutcome::Saved { hash } => Ok(Json(json!({ "saved": true, "subscriptionHash": hash }))),
        SaveOutcome::AlreadyStored { hash } => {
            Ok(Json(json!({ "saved": false, "subscriptionHash": hash })))
        }
        SaveOutcome::Rejected(rejection @ SaveRejection::InvalidSignature { .. }) => {
            Err(ApiError::Forbidden(rejection.to_string()))
        }
        SaveOutcome::Rejected(rejection) => Err(ApiError::Unprocessable(rejection.to_string())),
    }
}

pub async fn relay_meta_tx(
    State(state): State<AppState>,
    body: Result<Json<MetaTransaction>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(meta) = body?;
    let response = match state.dispatcher.relay(meta).await? {
        RelayOutcome::Accepted { hash, tx_hash } => (
            StatusCode::ACCEPTED,
            Json(json!({
                "status": "accepted",
                "modifyStatusHash": hash,
                "txHash": tx_hash,
            })),
        ),
        RelayOutcome::Rejected(reason) => {
            let status = match reason {
                RejectReason::HashMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                RejectReason::InvalidSigner => StatusCode::FORBIDDEN,
            };
            (status, Json(json!({ "status": "rejected", "rejection": reason })))
        }
    };
    Ok(response.into_response())
}
