//! Warden domain types
//!
//! The shared vocabulary of the authorization and deferred-execution core:
//! operation records and their status lattice, roles with per-function
//! permissions, function schemas, delegation envelopes for co-signed
//! approval, and the error taxonomy every layer reports through.
//!
//! These types carry no behavior beyond construction and structural
//! queries; all state transitions live in `warden-engine`.
#![deny(unsafe_code)]

pub mod envelope;
pub mod errors;
pub mod event;
pub mod identifiers;
pub mod operation;
pub mod role;
pub mod schema;

pub use envelope::{DelegationParams, MetaTransaction, SIGNATURE_LEN};
pub use errors::{ErrorKind, WardenError, WardenResult};
pub use event::OperationEvent;
pub use identifiers::{EntryPoint, HandlerId, OperationCategory, OperationId, RoleId};
pub use operation::{
    ExecutionPayload, OperationParams, OperationRecord, OperationStatus, PayloadKind,
    PaymentDetails,
};
pub use role::{FunctionPermission, OperationAction, Role, BROADCASTER_ROLE, OWNER_ROLE, RECOVERY_ROLE};
pub use schema::FunctionSchema;
