//! Delegation envelope verification
//!
//! The ordered, fail-fast check list for co-signed envelopes. Order
//! matters and each rejection carries a distinct error: signature shape,
//! record state, requester, category, context, target and schema,
//! deadline, nonce, sequence id (single-phase only), digest, recovered
//! signer, signer authorization. Verification mutates nothing; the
//! engine advances the nonce only after the whole list passes.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use warden_signing::{meta_digest, recover_signer, SigningDomain};
use warden_types::{
    MetaTransaction, OperationAction, OperationCategory, OperationId, OperationRecord,
    WardenError, WardenResult, SIGNATURE_LEN,
};

use crate::permissions::PermissionRegistry;
use crate::schemas::FunctionSchemaRegistry;

pub(crate) struct VerificationContext<'a> {
    pub domain: &'a SigningDomain,
    pub schemas: &'a FunctionSchemaRegistry,
    pub permissions: &'a PermissionRegistry,
    pub categories: &'a HashSet<OperationCategory>,
    pub now: DateTime<Utc>,
    /// The signer's stored counter; the envelope must match it exactly
    pub expected_nonce: u64,
    /// Single-phase only: the id the engine will assign next
    pub next_id: Option<OperationId>,
}

/// Verify `meta` against `record` for an entry point performing
/// `expected_action`.
///
/// `record` is the envelope's embedded record copy: verification judges
/// the envelope exactly as it was signed, and the caller is responsible
/// for pinning the stored record to it afterwards. The digest is always
/// recomputed, never trusted from the envelope.
pub(crate) fn verify_envelope(
    ctx: &VerificationContext<'_>,
    record: &OperationRecord,
    meta: &MetaTransaction,
    expected_action: OperationAction,
) -> WardenResult<()> {
    if meta.signature.len() != SIGNATURE_LEN {
        return Err(WardenError::MalformedSignature(format!(
            "expected {SIGNATURE_LEN} bytes, got {}",
            meta.signature.len()
        )));
    }

    if !record.is_pending() {
        return Err(WardenError::NotPending(record.id));
    }

    if record.params.requester.is_zero() {
        return Err(WardenError::ZeroAddress);
    }

    if !ctx.categories.contains(&record.params.category) {
        return Err(WardenError::UnsupportedCategory(record.params.category));
    }

    if meta.params.context_id != ctx.domain.context_id {
        return Err(WardenError::ContextMismatch {
            expected: ctx.domain.context_id,
            provided: meta.params.context_id,
        });
    }

    if meta.params.action != expected_action {
        return Err(WardenError::ActionMismatch {
            expected: expected_action,
            provided: meta.params.action,
        });
    }

    if meta.params.handler_contract != record.params.target {
        return Err(WardenError::TargetMismatch {
            expected: record.params.target,
            provided: meta.params.handler_contract,
        });
    }
    let schema = ctx.schemas.require(meta.params.handler_selector)?;
    if !schema.supports(meta.params.action) {
        return Err(WardenError::UnsupportedAction {
            handler: meta.params.handler_selector,
            action: meta.params.action,
        });
    }

    if ctx.now > meta.params.deadline {
        return Err(WardenError::ExpiredDeadline {
            deadline: meta.params.deadline,
        });
    }

    if meta.params.nonce != ctx.expected_nonce {
        return Err(WardenError::StaleNonce {
            signer: meta.params.signer,
            expected: ctx.expected_nonce,
            provided: meta.params.nonce,
        });
    }

    if let Some(next_id) = ctx.next_id {
        if record.id != next_id {
            return Err(WardenError::IdOutOfSequence {
                expected: next_id,
                provided: record.id,
            });
        }
    }

    let digest = meta_digest(ctx.domain, record, &meta.params);
    if digest != meta.digest {
        return Err(WardenError::DigestMismatch(record.id));
    }
    let recovered = recover_signer(&digest, &meta.signature)
        .map_err(|err| WardenError::MalformedSignature(err.to_string()))?;

    if recovered != meta.params.signer {
        return Err(WardenError::SignerMismatch {
            claimed: meta.params.signer,
            recovered,
        });
    }

    let Some(counterpart) = meta.params.action.signing_counterpart() else {
        return Err(WardenError::UnsupportedAction {
            handler: meta.params.handler_selector,
            action: meta.params.action,
        });
    };
    if !ctx.permissions.has_action_permission(
        meta.params.signer,
        meta.params.handler_selector,
        counterpart,
    ) {
        return Err(WardenError::SignerNotAuthorized {
            signer: meta.params.signer,
            handler: meta.params.handler_selector,
            action: counterpart,
        });
    }

    Ok(())
}
