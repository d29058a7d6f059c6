//! Error types for the Warden core
//!
//! One enum for every layer; variants carry the offending identifiers so
//! callers and logs can name exactly what was rejected. `kind()` buckets
//! each variant into the four-way taxonomy callers dispatch on.

use alloy_primitives::Address;
use chrono::{DateTime, Utc};

use crate::identifiers::{HandlerId, OperationCategory, OperationId, RoleId};
use crate::role::OperationAction;

/// Coarse classification of a [`WardenError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller or signer lacks the required grant
    Authorization,
    /// The operation is structurally valid but arrived in the wrong state
    State,
    /// Malformed or inconsistent input
    Validation,
    /// The referenced entity does not exist
    NotFound,
}

/// Errors that can occur in Warden operations
#[derive(Debug, thiserror::Error)]
pub enum WardenError {
    // -- Authorization ----------------------------------------------------
    #[error("no permission: wallet {wallet} lacks {action:?} for handler {handler}")]
    NoPermission {
        wallet: Address,
        handler: HandlerId,
        action: OperationAction,
    },

    #[error("signer {signer} lacks {action:?} for handler {handler}")]
    SignerNotAuthorized {
        signer: Address,
        handler: HandlerId,
        action: OperationAction,
    },

    #[error("signature recovered {recovered}, envelope claims {claimed}")]
    SignerMismatch { claimed: Address, recovered: Address },

    #[error("role {role} would hold both signing and executing actions for handler {handler}")]
    RoleSeparationViolation { role: RoleId, handler: HandlerId },

    // -- State ------------------------------------------------------------
    #[error("operation {0} is not pending")]
    NotPending(OperationId),

    #[error("already initialized")]
    AlreadyInitialized,

    #[error("not initialized")]
    NotInitialized,

    #[error("role already exists: {0}")]
    RoleAlreadyExists(RoleId),

    #[error("function schema already exists for handler {0}")]
    FunctionAlreadyExists(HandlerId),

    #[error("category already registered: {0}")]
    CategoryAlreadyRegistered(OperationCategory),

    #[error("role {role} is full: max {max_wallets} wallets")]
    WalletLimitReached { role: RoleId, max_wallets: usize },

    #[error("wallet {wallet} already in role {role}")]
    WalletAlreadyInRole { role: RoleId, wallet: Address },

    #[error("cannot remove the last wallet of role {0}")]
    CannotRemoveLastWallet(RoleId),

    #[error("role {0} is protected")]
    ProtectedRole(RoleId),

    #[error("operation {id} not releasable before {release_time}")]
    BeforeReleaseTime {
        id: OperationId,
        release_time: DateTime<Utc>,
    },

    // -- Validation -------------------------------------------------------
    #[error("zero address")]
    ZeroAddress,

    #[error("zero target")]
    ZeroTarget,

    #[error("empty role name")]
    EmptyRoleName,

    #[error("zero category")]
    ZeroCategory,

    #[error("approval delay out of range: {seconds}s")]
    InvalidDelay { seconds: i64 },

    #[error("category not registered: {0}")]
    UnsupportedCategory(OperationCategory),

    #[error("handler {handler} does not support {action:?}")]
    UnsupportedAction {
        handler: HandlerId,
        action: OperationAction,
    },

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("nonce for signer {signer} must be {expected}, envelope carries {provided}")]
    StaleNonce {
        signer: Address,
        expected: u64,
        provided: u64,
    },

    #[error("envelope deadline {deadline} has passed")]
    ExpiredDeadline { deadline: DateTime<Utc> },

    #[error("envelope signed for context {provided}, this instance is context {expected}")]
    ContextMismatch { expected: u64, provided: u64 },

    #[error("envelope handler contract {provided} does not match record target {expected}")]
    TargetMismatch { expected: Address, provided: Address },

    #[error("envelope action {provided:?} does not match entry point action {expected:?}")]
    ActionMismatch {
        expected: OperationAction,
        provided: OperationAction,
    },

    #[error("recomputed digest does not match envelope digest for operation {0}")]
    DigestMismatch(OperationId),

    #[error("signed id {provided} is not the next sequence id {expected}")]
    IdOutOfSequence {
        expected: OperationId,
        provided: OperationId,
    },

    // -- NotFound ---------------------------------------------------------
    #[error("unknown operation: {0}")]
    UnknownOperation(OperationId),

    #[error("unknown role: {0}")]
    UnknownRole(RoleId),

    #[error("no function schema for handler {0}")]
    UnknownFunction(HandlerId),

    #[error("wallet {wallet} not in role {role}")]
    WalletNotInRole { role: RoleId, wallet: Address },
}

impl WardenError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WardenError::NoPermission { .. }
            | WardenError::SignerNotAuthorized { .. }
            | WardenError::SignerMismatch { .. }
            | WardenError::RoleSeparationViolation { .. } => ErrorKind::Authorization,

            WardenError::NotPending(_)
            | WardenError::AlreadyInitialized
            | WardenError::NotInitialized
            | WardenError::RoleAlreadyExists(_)
            | WardenError::FunctionAlreadyExists(_)
            | WardenError::CategoryAlreadyRegistered(_)
            | WardenError::WalletLimitReached { .. }
            | WardenError::WalletAlreadyInRole { .. }
            | WardenError::CannotRemoveLastWallet(_)
            | WardenError::ProtectedRole(_)
            | WardenError::BeforeReleaseTime { .. } => ErrorKind::State,

            WardenError::ZeroAddress
            | WardenError::ZeroTarget
            | WardenError::EmptyRoleName
            | WardenError::ZeroCategory
            | WardenError::InvalidDelay { .. }
            | WardenError::UnsupportedCategory(_)
            | WardenError::UnsupportedAction { .. }
            | WardenError::MalformedSignature(_)
            | WardenError::StaleNonce { .. }
            | WardenError::ExpiredDeadline { .. }
            | WardenError::ContextMismatch { .. }
            | WardenError::TargetMismatch { .. }
            | WardenError::ActionMismatch { .. }
            | WardenError::DigestMismatch(_)
            | WardenError::IdOutOfSequence { .. } => ErrorKind::Validation,

            WardenError::UnknownOperation(_)
            | WardenError::UnknownRole(_)
            | WardenError::UnknownFunction(_)
            | WardenError::WalletNotInRole { .. } => ErrorKind::NotFound,
        }
    }
}

/// Result type alias for Warden operations
pub type WardenResult<T> = Result<T, WardenError>;
