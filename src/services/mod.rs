//! Service ports and adapters
//!
//! Route handlers program against the port traits; the client adapters bind
//! each port to a live backend connection. Adapters relay calls one-for-one
//! and never retry; a failed call surfaces its [`RpcFailure`] upward for
//! translation.
//!
//! [`RpcFailure`]: crate::rpc::RpcFailure

pub mod banking;
pub mod identity;

pub use banking::{
    AccountList, BankAccount, BankingClient, BankingService, NewOperation, Operation,
    OperationList, OperationQuery,
};
pub use identity::{IdentityClient, IdentityService, PublicKeyResponse, Session, UserAccount};
