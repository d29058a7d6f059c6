//! Structured digest over an operation and its delegation parameters
//!
//! Every signed field is widened to a 32-byte word, concatenated behind
//! a type hash, hashed, and bound to the domain with the
//! `0x19 ‖ 0x01 ‖ separator ‖ struct_hash` framing. Variable-length
//! payload bytes enter the digest only through their keccak hash, so
//! the struct encoding stays fixed-width.

use alloy_primitives::{keccak256, B256, U256};
use warden_types::{DelegationParams, HandlerId, OperationRecord};

use crate::domain::SigningDomain;

/// Type preimage the struct hash commits to.
const META_OPERATION_TYPE: &[u8] = b"MetaOperation(uint256 id,address requester,address target,uint256 value,uint256 gasLimit,bytes32 category,uint8 payloadKind,bytes32 payloadHash,uint256 contextId,uint256 nonce,address handlerContract,bytes4 handlerSelector,uint8 action,uint256 deadline,uint256 maxResourcePrice,address signer)";

pub(crate) fn word_u64(value: u64) -> B256 {
    B256::from(U256::from(value))
}

/// bytes4 convention: selector occupies the high-order bytes.
fn word_selector(selector: HandlerId) -> B256 {
    let mut word = B256::ZERO;
    word.0[..4].copy_from_slice(selector.as_bytes());
    word
}

/// Digest the off-chain signer produces a signature over.
///
/// Covers the record identity and immutable parameters plus every
/// delegation parameter. The record's status, release time, result and
/// payment are deliberately outside the signature, as is the envelope's
/// auxiliary data blob. An absent gas limit encodes as zero.
pub fn meta_digest(
    domain: &SigningDomain,
    record: &OperationRecord,
    params: &DelegationParams,
) -> B256 {
    let struct_hash = struct_hash(record, params);
    let mut preimage = Vec::with_capacity(2 + 2 * 32);
    preimage.push(0x19);
    preimage.push(0x01);
    preimage.extend_from_slice(domain.separator().as_slice());
    preimage.extend_from_slice(struct_hash.as_slice());
    keccak256(&preimage)
}

fn struct_hash(record: &OperationRecord, params: &DelegationParams) -> B256 {
    let mut encoded = Vec::with_capacity(17 * 32);
    encoded.extend_from_slice(keccak256(META_OPERATION_TYPE).as_slice());
    encoded.extend_from_slice(word_u64(record.id.0).as_slice());
    encoded.extend_from_slice(record.params.requester.into_word().as_slice());
    encoded.extend_from_slice(record.params.target.into_word().as_slice());
    encoded.extend_from_slice(B256::from(record.params.value).as_slice());
    encoded.extend_from_slice(word_u64(record.params.gas_limit.unwrap_or(0)).as_slice());
    encoded.extend_from_slice(record.params.category.0.as_slice());
    encoded.extend_from_slice(word_u64(record.params.payload.kind().code() as u64).as_slice());
    encoded.extend_from_slice(keccak256(record.params.payload.to_calldata()).as_slice());
    encoded.extend_from_slice(word_u64(params.context_id).as_slice());
    encoded.extend_from_slice(word_u64(params.nonce).as_slice());
    encoded.extend_from_slice(params.handler_contract.into_word().as_slice());
    encoded.extend_from_slice(word_selector(params.handler_selector).as_slice());
    encoded.extend_from_slice(word_u64(params.action.code() as u64).as_slice());
    encoded.extend_from_slice(word_u64(params.deadline.timestamp().max(0) as u64).as_slice());
    encoded.extend_from_slice(B256::from(params.max_resource_price).as_slice());
    encoded.extend_from_slice(params.signer.into_word().as_slice());
    keccak256(&encoded)
}
