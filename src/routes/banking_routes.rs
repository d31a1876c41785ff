//! HTTP routes for banking
//!
//! Protected endpoints relayed to the banking service:
//! - GET  /banking/accounts
//! - GET  /banking/accounts/{accountId}
//! - GET  /banking/operations
//! - POST /banking/operations
//!
//! Every request passes the bearer-token gate before its handler runs. The
//! acting user id always comes from the verified token's subject, never
//! from the request itself.

use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use super::{
    cors_preflight, error_response, failure_response, json_response, parse_json_body, BoxBody,
};
use crate::auth::AuthRejection;
use crate::rpc::HttpFailure;
use crate::server::AppState;
use crate::services::{NewOperation, OperationQuery};

/// The closed set of operation types accepted at this boundary.
/// The adapter itself forwards whatever it is given; membership is checked
/// here and only here.
pub const OPERATION_TYPES: [&str; 4] = ["deposit", "withdrawal", "transfer", "payment"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationsQueryParams {
    account_id: i64,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    operation_type: Option<String>,
}

impl OperationsQueryParams {
    fn validate(&self) -> Result<(), String> {
        if self.account_id <= 0 {
            return Err("accountId must be a positive integer".into());
        }

        if let Some(ref op_type) = self.operation_type {
            if !OPERATION_TYPES.contains(&op_type.as_str()) {
                return Err(invalid_operation_type());
            }
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateOperationRequest {
    account_id: i64,
    #[serde(rename = "type")]
    op_type: String,
    amount: f64,
    description: String,
}

impl CreateOperationRequest {
    fn validate(&self) -> Result<(), String> {
        if self.account_id <= 0 {
            return Err("accountId must be a positive integer".into());
        }

        if !OPERATION_TYPES.contains(&self.op_type.as_str()) {
            return Err(invalid_operation_type());
        }

        if self.amount <= 0.0 {
            return Err("amount must be positive".into());
        }

        Ok(())
    }
}

fn invalid_operation_type() -> String {
    format!("type must be one of: {}", OPERATION_TYPES.join(", "))
}

/// Run the authentication gate and resolve the acting user id.
/// Returns the ready-made 401 response on rejection.
async fn authenticate(
    state: &AppState,
    req: &Request<hyper::body::Incoming>,
) -> Result<i64, Response<BoxBody>> {
    let claims = state
        .auth
        .authenticate(req.headers())
        .await
        .map_err(|rejection| failure_response(HttpFailure::unauthorized(rejection.reason())))?;

    claims.user_id().ok_or_else(|| {
        warn!("Token subject '{}' is not a user id", claims.sub);
        failure_response(HttpFailure::unauthorized(
            AuthRejection::InvalidToken.reason(),
        ))
    })
}

/// GET /banking/accounts
async fn get_accounts(state: &AppState, user_id: i64) -> Response<BoxBody> {
    match state.banking.get_accounts(user_id).await {
        Ok(accounts) => json_response(StatusCode::OK, &accounts),
        Err(failure) => {
            warn!("Banking get_accounts failed: {}", failure);
            failure_response(failure.to_http())
        }
    }
}

/// GET /banking/accounts/{accountId}
async fn get_account(state: &AppState, account_id: i64, user_id: i64) -> Response<BoxBody> {
    match state.banking.get_account_by_id(account_id, user_id).await {
        Ok(account) => json_response(StatusCode::OK, &account),
        Err(failure) => {
            warn!("Banking get_account_by_id failed: {}", failure);
            failure_response(failure.to_http())
        }
    }
}

/// GET /banking/operations
async fn get_operations(
    state: &AppState,
    params: OperationsQueryParams,
    user_id: i64,
) -> Response<BoxBody> {
    let query = OperationQuery {
        account_id: params.account_id,
        user_id,
        start_date: params.start_date,
        end_date: params.end_date,
        operation_type: params.operation_type,
    };

    match state.banking.get_operations(query).await {
        Ok(operations) => json_response(StatusCode::OK, &operations),
        Err(failure) => {
            warn!("Banking get_operations failed: {}", failure);
            failure_response(failure.to_http())
        }
    }
}

/// POST /banking/operations
async fn create_operation(
    state: &AppState,
    body: CreateOperationRequest,
    user_id: i64,
) -> Response<BoxBody> {
    let operation = NewOperation {
        account_id: body.account_id,
        user_id,
        op_type: body.op_type,
        amount: body.amount,
        description: body.description,
    };

    match state.banking.create_operation(operation).await {
        Ok(created) => json_response(StatusCode::CREATED, &created),
        Err(failure) => {
            warn!("Banking create_operation failed: {}", failure);
            failure_response(failure.to_http())
        }
    }
}

/// Handle banking-related HTTP requests.
///
/// Returns Some(response) if the request was handled, None if it is not a
/// banking route.
pub async fn handle_banking_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let full_path = req.uri().path();
    let method = req.method().clone();

    if !full_path.starts_with("/banking") {
        return None;
    }

    if method == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let path = full_path.split('?').next().unwrap_or(full_path).to_string();

    let response = match (method, path.as_str()) {
        (Method::GET, "/banking/accounts") => {
            let user_id = match authenticate(&state, &req).await {
                Ok(id) => id,
                Err(rejected) => return Some(rejected),
            };
            get_accounts(&state, user_id).await
        }

        (Method::GET, p) if p.starts_with("/banking/accounts/") => {
            let user_id = match authenticate(&state, &req).await {
                Ok(id) => id,
                Err(rejected) => return Some(rejected),
            };

            let raw_id = p.strip_prefix("/banking/accounts/").unwrap_or("");
            match raw_id.parse::<i64>() {
                Ok(account_id) if account_id > 0 => get_account(&state, account_id, user_id).await,
                _ => error_response(
                    StatusCode::BAD_REQUEST,
                    "accountId must be a positive integer",
                ),
            }
        }

        (Method::GET, "/banking/operations") => {
            let user_id = match authenticate(&state, &req).await {
                Ok(id) => id,
                Err(rejected) => return Some(rejected),
            };

            let params: OperationsQueryParams =
                match serde_urlencoded::from_str(req.uri().query().unwrap_or("")) {
                    Ok(p) => p,
                    Err(e) => {
                        return Some(error_response(
                            StatusCode::BAD_REQUEST,
                            format!("Invalid query: {}", e),
                        ))
                    }
                };

            if let Err(reason) = params.validate() {
                return Some(error_response(StatusCode::BAD_REQUEST, reason));
            }

            get_operations(&state, params, user_id).await
        }

        (Method::POST, "/banking/operations") => {
            let user_id = match authenticate(&state, &req).await {
                Ok(id) => id,
                Err(rejected) => return Some(rejected),
            };

            let body: CreateOperationRequest = match parse_json_body(req).await {
                Ok(b) => b,
                Err(e) => {
                    return Some(error_response(
                        StatusCode::BAD_REQUEST,
                        format!("Invalid JSON body: {}", e),
                    ))
                }
            };

            if let Err(reason) = body.validate() {
                return Some(error_response(StatusCode::BAD_REQUEST, reason));
            }

            create_operation(&state, body, user_id).await
        }

        (_, "/banking/accounts") | (_, "/banking/operations") => {
            error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
        }

        _ => error_response(StatusCode::NOT_FOUND, "Banking endpoint not found"),
    };

    Some(response)
}
