//! Operation records and their status lattice
//!
//! A record is created `Pending` and moves exactly once into a terminal
//! state; its parameters are immutable after creation and only the
//! attached payment may be replaced while it is still pending.

use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::{HandlerId, OperationCategory, OperationId};

/// Lifecycle status of an operation.
///
/// `Undefined` is the absence state reported for ids that were never
/// assigned. `Rejected` is part of the lattice for collaborators that own
/// a rejection flow; no core transition produces it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    #[default]
    Undefined,
    Pending,
    Cancelled,
    Completed,
    Failed,
    Rejected,
}

impl OperationStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, OperationStatus::Pending)
    }

    /// A terminal status can never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationStatus::Cancelled
                | OperationStatus::Completed
                | OperationStatus::Failed
                | OperationStatus::Rejected
        )
    }
}

/// Discriminant of an execution payload, as encoded into signed digests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    None,
    Standard,
    Raw,
}

impl PayloadKind {
    /// Wire code used in digest encoding.
    pub fn code(&self) -> u8 {
        match self {
            PayloadKind::None => 0,
            PayloadKind::Standard => 1,
            PayloadKind::Raw => 2,
        }
    }
}

/// What the approved operation will run against its target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPayload {
    /// Plain value transfer; no procedure is invoked.
    #[default]
    None,
    /// Selector-addressed call with pre-encoded arguments.
    Standard { selector: HandlerId, args: Vec<u8> },
    /// Pre-encoded calldata passed through verbatim.
    Raw { data: Vec<u8> },
}

impl ExecutionPayload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            ExecutionPayload::None => PayloadKind::None,
            ExecutionPayload::Standard { .. } => PayloadKind::Standard,
            ExecutionPayload::Raw { .. } => PayloadKind::Raw,
        }
    }

    /// Canonical byte image: selector ‖ args for a standard call, the raw
    /// bytes verbatim, empty for a plain transfer. This is both what the
    /// invoker receives and what signed digests commit to.
    pub fn to_calldata(&self) -> Vec<u8> {
        match self {
            ExecutionPayload::None => Vec::new(),
            ExecutionPayload::Standard { selector, args } => {
                let mut data = Vec::with_capacity(4 + args.len());
                data.extend_from_slice(selector.as_bytes());
                data.extend_from_slice(args);
                data
            }
            ExecutionPayload::Raw { data } => data.clone(),
        }
    }
}

/// Immutable creation parameters of an operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationParams {
    /// Principal that filed the request
    pub requester: Address,
    /// Procedure/resource the operation will act on
    pub target: Address,
    /// Native value forwarded with the invocation
    pub value: U256,
    /// Resource budget for the invocation; `None` means all remaining
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<u64>,
    /// Registered category the operation belongs to
    pub category: OperationCategory,
    /// What to run on approval
    pub payload: ExecutionPayload,
}

impl OperationParams {
    pub fn new(requester: Address, target: Address, category: OperationCategory) -> Self {
        Self {
            requester,
            target,
            value: U256::ZERO,
            gas_limit: None,
            category,
            payload: ExecutionPayload::None,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn with_payload(mut self, payload: ExecutionPayload) -> Self {
        self.payload = payload;
        self
    }
}

/// Optional payment disbursed together with a successful execution.
///
/// The all-zero value means "no payment attached"; it may be replaced
/// only while the owning record is pending.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PaymentDetails {
    pub recipient: Address,
    pub native_amount: U256,
    pub token: Address,
    pub token_amount: U256,
}

impl PaymentDetails {
    /// Payment in native value only.
    pub fn native(recipient: Address, amount: U256) -> Self {
        Self {
            recipient,
            native_amount: amount,
            token: Address::ZERO,
            token_amount: U256::ZERO,
        }
    }

    /// Payment in a token, optionally alongside native value.
    pub fn with_token(mut self, token: Address, amount: U256) -> Self {
        self.token = token;
        self.token_amount = amount;
        self
    }

    pub fn is_none(&self) -> bool {
        *self == Self::default()
    }
}

/// One entry in the append-only operation history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub id: OperationId,
    /// Earliest instant the time-delay path may approve
    pub release_time: DateTime<Utc>,
    pub status: OperationStatus,
    pub params: OperationParams,
    /// Output captured from the invocation, empty until terminal
    pub result: Vec<u8>,
    pub payment: PaymentDetails,
}

impl OperationRecord {
    /// A freshly requested, still pending record.
    pub fn new(id: OperationId, params: OperationParams, release_time: DateTime<Utc>) -> Self {
        Self {
            id,
            release_time,
            status: OperationStatus::Pending,
            params,
            result: Vec::new(),
            payment: PaymentDetails::default(),
        }
    }

    pub fn with_payment(mut self, payment: PaymentDetails) -> Self {
        self.payment = payment;
        self
    }

    pub fn is_pending(&self) -> bool {
        self.status.is_pending()
    }

    /// Hex rendering of the stored result, for logs and display surfaces.
    pub fn result_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.result))
    }
}
