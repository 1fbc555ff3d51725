//! Error responses.
//!
//! | Condition                                   | Status |
//! |---------------------------------------------|--------|
//! | malformed body, parts or hash mismatch      | 422    |
//! | signature does not match                    | 403    |
//! | missing or wrong admin token                | 401    |
//! | body over the configured limit              | 413    |
//! | ledger or store unavailable                 | 503    |
//! | broadcast failed, unusable contract output  | 502    |

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::ledger::types::LedgerError;
use crate::relay::types::RelayError;
use crate::store::kv::StoreError;
use crate::subscriptions::registry::RegistryError;

#[derive(Debug)]
pub enum ApiError {
    Unprocessable(String),
    PayloadTooLarge(String),
    Forbidden(String),
    Unauthorized,
    Unavailable(String),
    BadGateway(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::Unprocessable(m)
            | ApiError::PayloadTooLarge(m)
            | ApiError::Forbidden(m)
            | ApiError::Unavailable(m)
            | ApiError::BadGateway(m)
            | ApiError::Internal(m) => m,
            ApiError::Unauthorized => "missing or invalid bearer token",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self.message(), "Request failed");
        }
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge(rejection.body_text());
        }
        ApiError::Unprocessable(rejection.body_text())
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Encoding(_) => ApiError::Unprocessable(e.to_string()),
            LedgerError::Rpc(_) | LedgerError::Timeout(_) | LedgerError::NoOperator { .. } => {
                ApiError::Unavailable(e.to_string())
            }
            LedgerError::Decoding(_) => ApiError::BadGateway(e.to_string()),
            LedgerError::Abi(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Timeout(_) | StoreError::Contention { .. } | StoreError::Backend(_) => {
                ApiError::Unavailable(e.to_string())
            }
            StoreError::Serialize(_) | StoreError::Snapshot(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::Ledger(e) => e.into(),
            RegistryError::Store(e) => e.into(),
        }
    }
}

impl From<RelayError> for ApiError {
    fn from(e: RelayError) -> Self {
        match e {
            RelayError::Verification(e) => e.into(),
            RelayError::Broadcast(e) => match e {
                LedgerError::Encoding(_) => ApiError::Unprocessable(e.to_string()),
                other => ApiError::BadGateway(format!("broadcast failed: {}", other)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (LedgerError::Timeout(10).into(), StatusCode::SERVICE_UNAVAILABLE),
            (LedgerError::Rpc("down".into()).into(), StatusCode::SERVICE_UNAVAILABLE),
            (LedgerError::Encoding("arity".into()).into(), StatusCode::UNPROCESSABLE_ENTITY),
            (LedgerError::Decoding("short".into()).into(), StatusCode::BAD_GATEWAY),
            (StoreError::Timeout(2000).into(), StatusCode::SERVICE_UNAVAILABLE),
            (
                StoreError::Contention { key: "k".into(), attempts: 16 }.into(),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                RelayError::Broadcast(LedgerError::Rpc("nonce".into())).into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                RelayError::Verification(LedgerError::Timeout(5)).into(),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED),
        ];

        for (error, status) in cases {
            assert_eq!(error.status(), status, "{:?}", error);
        }
    }
}
