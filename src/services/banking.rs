//! Banking service port and adapter
//!
//! Accounts and operations live in the banking service; the gateway relays
//! requests with the acting user id taken from the verified token. The
//! operation `type` string is forwarded exactly as received; membership in
//! the allowed set is checked at the HTTP boundary, not here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::rpc::{RpcClient, RpcFailure};

/// A bank account owned by a user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
    pub id: i64,
    pub user_id: i64,
    pub account_number: String,
    pub balance: f64,
    pub currency: String,
    pub created_at: String,
}

/// A ledger operation on an account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: i64,
    pub account_id: i64,
    #[serde(rename = "type")]
    pub op_type: String,
    pub amount: f64,
    pub description: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountList {
    pub accounts: Vec<BankAccount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationList {
    pub operations: Vec<Operation>,
}

/// Filters for an operation listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationQuery {
    pub account_id: i64,
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<String>,
}

/// A new operation to record
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOperation {
    pub account_id: i64,
    pub user_id: i64,
    #[serde(rename = "type")]
    pub op_type: String,
    pub amount: f64,
    pub description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AccountsParams {
    user_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AccountByIdParams {
    account_id: i64,
    user_id: i64,
}

/// Banking service operations the gateway relies on
#[async_trait]
pub trait BankingService: Send + Sync {
    async fn get_accounts(&self, user_id: i64) -> Result<AccountList, RpcFailure>;

    async fn get_account_by_id(
        &self,
        account_id: i64,
        user_id: i64,
    ) -> Result<BankAccount, RpcFailure>;

    async fn get_operations(&self, query: OperationQuery) -> Result<OperationList, RpcFailure>;

    async fn create_operation(&self, operation: NewOperation) -> Result<Operation, RpcFailure>;

    /// Whether the backend link is currently up (health reporting only)
    async fn is_connected(&self) -> bool;
}

/// Binds [`BankingService`] to the live banking connection
pub struct BankingClient {
    rpc: RpcClient,
}

impl BankingClient {
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl BankingService for BankingClient {
    async fn get_accounts(&self, user_id: i64) -> Result<AccountList, RpcFailure> {
        self.rpc.call("get_accounts", AccountsParams { user_id }).await
    }

    async fn get_account_by_id(
        &self,
        account_id: i64,
        user_id: i64,
    ) -> Result<BankAccount, RpcFailure> {
        self.rpc
            .call("get_account_by_id", AccountByIdParams { account_id, user_id })
            .await
    }

    async fn get_operations(&self, query: OperationQuery) -> Result<OperationList, RpcFailure> {
        self.rpc.call("get_operations", query).await
    }

    async fn create_operation(&self, operation: NewOperation) -> Result<Operation, RpcFailure> {
        self.rpc.call("create_operation", operation).await
    }

    async fn is_connected(&self) -> bool {
        self.rpc.is_connected().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_operation_forwards_type_verbatim() {
        // The adapter does not reinterpret the operation type; even a value
        // outside the HTTP boundary's allowed set goes on the wire unchanged.
        let op = NewOperation {
            account_id: 12,
            user_id: 42,
            op_type: "gift".into(),
            amount: 10.0,
            description: "birthday".into(),
        };

        let payload = rmp_serde::to_vec_named(&op).unwrap();
        let decoded: serde_json::Value = rmp_serde::from_slice(&payload).unwrap();

        assert_eq!(decoded["type"], "gift");
        assert_eq!(decoded["accountId"], 12);
        assert_eq!(decoded["userId"], 42);
    }

    #[test]
    fn test_operation_query_omits_absent_filters() {
        let query = OperationQuery {
            account_id: 3,
            user_id: 42,
            start_date: None,
            end_date: None,
            operation_type: Some("deposit".into()),
        };

        let payload = rmp_serde::to_vec_named(&query).unwrap();
        let decoded: serde_json::Value = rmp_serde::from_slice(&payload).unwrap();

        assert_eq!(decoded["accountId"], 3);
        assert_eq!(decoded["operationType"], "deposit");
        assert!(decoded.get("startDate").is_none());
        assert!(decoded.get("endDate").is_none());
    }
}
