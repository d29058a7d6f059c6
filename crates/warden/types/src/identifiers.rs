//! Identifier newtypes
//!
//! Handlers, categories and roles are all addressed by keccak-derived
//! hashes of human-readable names, so configuration can speak in names
//! while storage and permission checks stay fixed-width.

use alloy_primitives::{keccak256, FixedBytes, B256};
use serde::{Deserialize, Serialize};

use crate::role::OperationAction;

/// Sequential identifier of an operation record.
///
/// Assigned by the engine starting at 1 and never reused; 0 is never a
/// valid assigned id.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct OperationId(pub u64);

impl OperationId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Four-byte selector identifying a callable function on a handler.
///
/// Derived from a function-style name as `keccak256(name)[0..4]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandlerId(pub FixedBytes<4>);

impl HandlerId {
    pub fn new(selector: FixedBytes<4>) -> Self {
        Self(selector)
    }

    /// Derive the selector from a function-style name.
    pub fn from_name(name: &str) -> Self {
        let hash = keccak256(name.as_bytes());
        Self(FixedBytes::from_slice(&hash[..4]))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl std::fmt::Display for HandlerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Category hash grouping operations for scoping and reporting.
///
/// `keccak256(category name)`; the zero hash is never a valid category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationCategory(pub B256);

impl OperationCategory {
    pub fn new(hash: B256) -> Self {
        Self(hash)
    }

    pub fn from_name(name: &str) -> Self {
        Self(keccak256(name.as_bytes()))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Short display form (0x + first 8 hex chars)
    pub fn short(&self) -> String {
        self.0.to_string().chars().take(10).collect()
    }
}

impl std::fmt::Display for OperationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifying hash of a role: `keccak256(role name)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleId(pub B256);

impl RoleId {
    pub fn new(hash: B256) -> Self {
        Self(hash)
    }

    pub fn from_name(name: &str) -> Self {
        Self(keccak256(name.as_bytes()))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Short display form (0x + first 8 hex chars)
    pub fn short(&self) -> String {
        self.0.to_string().chars().take(10).collect()
    }
}

impl std::fmt::Display for RoleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Entry points of the state machine itself.
///
/// Each entry point is addressable as a handler, so roles can be granted
/// permissions on the machine's own surface the same way they are granted
/// permissions on domain handlers. The entry-point name is also what the
/// lifecycle event reports as its triggering handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryPoint {
    Request,
    ApproveAfterDelay,
    Cancel,
    ApproveWithSignature,
    CancelWithSignature,
    RequestAndApprove,
    UpdatePayment,
}

impl EntryPoint {
    pub const ALL: [EntryPoint; 7] = [
        EntryPoint::Request,
        EntryPoint::ApproveAfterDelay,
        EntryPoint::Cancel,
        EntryPoint::ApproveWithSignature,
        EntryPoint::CancelWithSignature,
        EntryPoint::RequestAndApprove,
        EntryPoint::UpdatePayment,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EntryPoint::Request => "request",
            EntryPoint::ApproveAfterDelay => "approve_after_delay",
            EntryPoint::Cancel => "cancel",
            EntryPoint::ApproveWithSignature => "approve_with_signature",
            EntryPoint::CancelWithSignature => "cancel_with_signature",
            EntryPoint::RequestAndApprove => "request_and_approve",
            EntryPoint::UpdatePayment => "update_payment",
        }
    }

    pub fn handler_id(&self) -> HandlerId {
        HandlerId::from_name(self.name())
    }

    /// Actions that may be granted against this entry point.
    pub fn supported_actions(&self) -> &'static [OperationAction] {
        match self {
            EntryPoint::Request => &[
                OperationAction::TimeDelayRequest,
                OperationAction::SignRequestAndApprove,
            ],
            EntryPoint::ApproveAfterDelay => &[OperationAction::TimeDelayApprove],
            EntryPoint::Cancel => &[OperationAction::TimeDelayCancel],
            EntryPoint::ApproveWithSignature => {
                &[OperationAction::SignApprove, OperationAction::ExecuteApprove]
            }
            EntryPoint::CancelWithSignature => {
                &[OperationAction::SignCancel, OperationAction::ExecuteCancel]
            }
            EntryPoint::RequestAndApprove => &[
                OperationAction::SignRequestAndApprove,
                OperationAction::ExecuteRequestAndApprove,
            ],
            EntryPoint::UpdatePayment => &[OperationAction::UpdatePayment],
        }
    }
}

impl std::fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
