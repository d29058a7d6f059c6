//! Delegation envelopes for the co-signed approval path
//!
//! An envelope carries an operation record (new, for the single-phase
//! path; or a copy of a stored one), the delegation parameters the signer
//! committed to, the digest the signature was made over, and the 65-byte
//! recoverable signature itself. Envelopes are ephemeral: the engine
//! verifies and consumes them, it never stores them.

use alloy_primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::HandlerId;
use crate::operation::OperationRecord;
use crate::role::OperationAction;

/// r ‖ s ‖ v recoverable signature length.
pub const SIGNATURE_LEN: usize = 65;

/// What the off-chain signer committed to, beyond the record itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationParams {
    /// Execution context the signature is valid in
    pub context_id: u64,
    /// Signer's replay counter; must equal the stored counter exactly
    pub nonce: u64,
    /// Contract the named handler function lives on
    pub handler_contract: Address,
    /// Selector of the handler function being authorized
    pub handler_selector: HandlerId,
    /// Action the submitter will perform with this envelope
    pub action: OperationAction,
    /// Instant after which the envelope is unusable
    pub deadline: DateTime<Utc>,
    /// Cap on the per-unit resource price the signer accepts
    pub max_resource_price: U256,
    /// Principal whose signature must recover from the digest
    pub signer: Address,
}

/// A co-signed request travelling from the signer to the submitter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTransaction {
    /// The operation the envelope acts on
    pub record: OperationRecord,
    pub params: DelegationParams,
    /// Digest the signature was produced over
    pub digest: B256,
    /// 65-byte r ‖ s ‖ v signature
    pub signature: Vec<u8>,
    /// Opaque context for the submitter; rides outside the signature
    pub data: Vec<u8>,
}

impl MetaTransaction {
    pub fn new(
        record: OperationRecord,
        params: DelegationParams,
        digest: B256,
        signature: Vec<u8>,
    ) -> Self {
        Self {
            record,
            params,
            digest,
            signature,
            data: Vec::new(),
        }
    }

    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    pub fn signature_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.signature))
    }
}
