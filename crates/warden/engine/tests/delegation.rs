//! Co-signed delegation paths, end to end: an off-chain signer and an
//! on-chain submitter under disjoint roles drive approvals and
//! cancellations through signed envelopes.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use chrono::{DateTime, Duration, TimeZone, Utc};
use k256::ecdsa::SigningKey;
use warden_engine::{ManualClock, MockInvoker, OperationEngine, OperationInvoker};
use warden_signing::{address_of, meta_digest, sign_digest};
use warden_types::{
    DelegationParams, EntryPoint, ExecutionPayload, HandlerId, MetaTransaction, OperationAction,
    OperationCategory, OperationId, OperationParams, OperationRecord, OperationStatus,
    PaymentDetails, WardenError,
};

const CONTEXT: u64 = 31;

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

fn owner_key() -> SigningKey {
    SigningKey::from_slice(&[0x11; 32]).unwrap()
}

fn broadcaster_key() -> SigningKey {
    SigningKey::from_slice(&[0x22; 32]).unwrap()
}

fn second_signer_key() -> SigningKey {
    SigningKey::from_slice(&[0x33; 32]).unwrap()
}

fn recovery_wallet() -> Address {
    Address::repeat_byte(0xC1)
}

fn target_contract() -> Address {
    Address::repeat_byte(0x22)
}

fn vault() -> OperationCategory {
    OperationCategory::from_name("vault")
}

fn vault_handler() -> HandlerId {
    HandlerId::from_name("transfer_vault_funds")
}

/// Engine with a vault handler schema, a SIGNER role holding the signing
/// half (owner wallet), a SUBMITTER role holding the executing half
/// (broadcaster wallet), and a PROPOSER role for filing requests.
fn setup() -> (OperationEngine, Arc<ManualClock>) {
    setup_with(Box::new(MockInvoker::new().with_output(b"done".to_vec())))
}

fn setup_with(invoker: Box<dyn OperationInvoker>) -> (OperationEngine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start_time()));
    let mut engine = OperationEngine::new(CONTEXT, Address::repeat_byte(0xEE), invoker)
        .with_clock(clock.clone());
    engine
        .initialize(
            address_of(&owner_key()),
            address_of(&broadcaster_key()),
            recovery_wallet(),
            Duration::hours(6),
        )
        .unwrap();
    engine.add_operation_category(vault()).unwrap();
    engine
        .create_function_schema(
            "transfer_vault_funds",
            vault(),
            [
                OperationAction::SignApprove,
                OperationAction::ExecuteApprove,
                OperationAction::SignCancel,
                OperationAction::ExecuteCancel,
                OperationAction::SignRequestAndApprove,
                OperationAction::ExecuteRequestAndApprove,
            ],
        )
        .unwrap();

    let signer_role = engine.create_role("SIGNER", 2).unwrap();
    engine
        .assign_wallet(signer_role, address_of(&owner_key()))
        .unwrap();
    engine
        .grant_function_permission(
            signer_role,
            vault_handler(),
            [
                OperationAction::SignApprove,
                OperationAction::SignCancel,
                OperationAction::SignRequestAndApprove,
            ],
        )
        .unwrap();

    let submitter_role = engine.create_role("SUBMITTER", 2).unwrap();
    engine
        .assign_wallet(submitter_role, address_of(&broadcaster_key()))
        .unwrap();
    engine
        .grant_function_permission(
            submitter_role,
            vault_handler(),
            [
                OperationAction::ExecuteApprove,
                OperationAction::ExecuteCancel,
                OperationAction::ExecuteRequestAndApprove,
            ],
        )
        .unwrap();

    let proposer_role = engine.create_role("PROPOSER", 2).unwrap();
    engine.assign_wallet(proposer_role, recovery_wallet()).unwrap();
    engine
        .grant_function_permission(
            proposer_role,
            EntryPoint::Request.handler_id(),
            [OperationAction::TimeDelayRequest],
        )
        .unwrap();

    (engine, clock)
}

fn file_pending(engine: &mut OperationEngine) -> OperationRecord {
    engine
        .request(
            recovery_wallet(),
            target_contract(),
            U256::from(25u64),
            Some(60_000),
            vault(),
            ExecutionPayload::Standard {
                selector: vault_handler(),
                args: vec![0xAA, 0xBB],
            },
        )
        .unwrap()
}

fn signed_envelope(
    engine: &OperationEngine,
    key: &SigningKey,
    record: &OperationRecord,
    action: OperationAction,
    nonce: u64,
    deadline: DateTime<Utc>,
) -> MetaTransaction {
    let params = DelegationParams {
        context_id: CONTEXT,
        nonce,
        handler_contract: record.params.target,
        handler_selector: vault_handler(),
        action,
        deadline,
        max_resource_price: U256::from(500u64),
        signer: address_of(key),
    };
    let digest = meta_digest(engine.signing_domain(), record, &params);
    let signature = sign_digest(key, &digest).unwrap();
    MetaTransaction::new(record.clone(), params, digest, signature.to_vec())
}

fn default_deadline() -> DateTime<Utc> {
    start_time() + Duration::hours(2)
}

#[test]
fn test_signed_cancellation_rotates_nonce() {
    let (mut engine, _clock) = setup();
    let record = file_pending(&mut engine);
    let owner = address_of(&owner_key());
    let submitter = address_of(&broadcaster_key());
    assert_eq!(engine.nonce(owner), 0);

    let envelope = signed_envelope(
        &engine,
        &owner_key(),
        &record,
        OperationAction::ExecuteCancel,
        0,
        default_deadline(),
    );
    let cancelled = engine.cancel_with_signature(submitter, &envelope).unwrap();
    assert_eq!(cancelled.status, OperationStatus::Cancelled);
    assert_eq!(engine.nonce(owner), 1);
    assert_eq!(engine.pending_count(), 0);

    // Replaying the very same envelope fails on the nonce.
    assert!(matches!(
        engine.cancel_with_signature(submitter, &envelope),
        Err(WardenError::StaleNonce {
            expected: 1,
            provided: 0,
            ..
        })
    ));
    assert_eq!(engine.status(record.id), OperationStatus::Cancelled);
}

#[test]
fn test_re_signed_envelope_is_single_use() {
    let (mut engine, _clock) = setup();
    let first = file_pending(&mut engine);
    let second = file_pending(&mut engine);
    let owner = address_of(&owner_key());
    let submitter = address_of(&broadcaster_key());

    let envelope = signed_envelope(
        &engine,
        &owner_key(),
        &first,
        OperationAction::ExecuteCancel,
        0,
        default_deadline(),
    );
    engine.cancel_with_signature(submitter, &envelope).unwrap();

    // Re-signed under the advanced nonce: usable exactly once.
    let resigned = signed_envelope(
        &engine,
        &owner_key(),
        &second,
        OperationAction::ExecuteCancel,
        1,
        default_deadline(),
    );
    engine.cancel_with_signature(submitter, &resigned).unwrap();
    assert!(matches!(
        engine.cancel_with_signature(submitter, &resigned),
        Err(WardenError::StaleNonce { .. })
    ));

    // A fresh nonce cannot resurrect a terminal record, and the failed
    // attempt does not consume the nonce.
    let for_terminal = signed_envelope(
        &engine,
        &owner_key(),
        &first,
        OperationAction::ExecuteCancel,
        2,
        default_deadline(),
    );
    assert!(matches!(
        engine.cancel_with_signature(submitter, &for_terminal),
        Err(WardenError::NotPending(_))
    ));
    assert_eq!(engine.nonce(owner), 2);
}

#[test]
fn test_signed_approval_bypasses_delay() {
    let (mut engine, _clock) = setup();
    let record = file_pending(&mut engine);

    // No clock advance: the record is well before its release time.
    let envelope = signed_envelope(
        &engine,
        &owner_key(),
        &record,
        OperationAction::ExecuteApprove,
        0,
        default_deadline(),
    );
    let done = engine
        .approve_with_signature(address_of(&broadcaster_key()), &envelope)
        .unwrap();
    assert_eq!(done.status, OperationStatus::Completed);
    assert_eq!(done.result, b"done".to_vec());
    assert_eq!(engine.nonce(address_of(&owner_key())), 1);
    assert_eq!(engine.pending_count(), 0);
}

#[test]
fn test_signer_cannot_submit_own_envelope() {
    let (mut engine, _clock) = setup();
    let record = file_pending(&mut engine);
    let owner = address_of(&owner_key());

    let envelope = signed_envelope(
        &engine,
        &owner_key(),
        &record,
        OperationAction::ExecuteApprove,
        0,
        default_deadline(),
    );
    // The signer's role holds only the signing half.
    assert!(matches!(
        engine.approve_with_signature(owner, &envelope),
        Err(WardenError::NoPermission { .. })
    ));
    assert_eq!(engine.nonce(owner), 0);
    assert_eq!(engine.status(record.id), OperationStatus::Pending);
}

#[test]
fn test_submitter_cannot_sign_for_itself() {
    let (mut engine, _clock) = setup();
    let record = file_pending(&mut engine);
    let submitter = address_of(&broadcaster_key());

    // Broadcaster holds the executing half only; an envelope it signed
    // itself recovers fine but fails authorization.
    let envelope = signed_envelope(
        &engine,
        &broadcaster_key(),
        &record,
        OperationAction::ExecuteApprove,
        0,
        default_deadline(),
    );
    assert!(matches!(
        engine.approve_with_signature(submitter, &envelope),
        Err(WardenError::SignerNotAuthorized { .. })
    ));
    assert_eq!(engine.status(record.id), OperationStatus::Pending);
}

#[test]
fn test_cancel_envelope_needs_sign_cancel_grant() {
    let (mut engine, _clock) = setup();
    let record = file_pending(&mut engine);
    let signer = address_of(&second_signer_key());
    let submitter = address_of(&broadcaster_key());

    // Holds the approval signing grant, but not the cancellation one.
    let role = engine.create_role("APPROVAL_SIGNER", 2).unwrap();
    engine.assign_wallet(role, signer).unwrap();
    engine
        .grant_function_permission(role, vault_handler(), [OperationAction::SignApprove])
        .unwrap();

    let envelope = signed_envelope(
        &engine,
        &second_signer_key(),
        &record,
        OperationAction::ExecuteCancel,
        0,
        default_deadline(),
    );
    assert!(matches!(
        engine.cancel_with_signature(submitter, &envelope),
        Err(WardenError::SignerNotAuthorized { .. })
    ));
    assert_eq!(engine.nonce(signer), 0);
    assert_eq!(engine.status(record.id), OperationStatus::Pending);
}

#[test]
fn test_single_phase_needs_sign_request_and_approve_grant() {
    let (mut engine, _clock) = setup();
    let signer = address_of(&second_signer_key());
    let submitter = address_of(&broadcaster_key());

    // Signing grants for the two-phase paths only.
    let role = engine.create_role("TWO_PHASE_SIGNER", 2).unwrap();
    engine.assign_wallet(role, signer).unwrap();
    engine
        .grant_function_permission(
            role,
            vault_handler(),
            [OperationAction::SignApprove, OperationAction::SignCancel],
        )
        .unwrap();

    let prospective = OperationRecord::new(
        engine.next_id(),
        OperationParams::new(signer, target_contract(), vault()),
        start_time(),
    );
    let envelope = signed_envelope(
        &engine,
        &second_signer_key(),
        &prospective,
        OperationAction::ExecuteRequestAndApprove,
        0,
        default_deadline(),
    );
    assert!(matches!(
        engine.request_and_approve(submitter, &envelope),
        Err(WardenError::SignerNotAuthorized { .. })
    ));
    assert_eq!(engine.nonce(signer), 0);
    // Nothing was filed.
    assert_eq!(engine.pending_count(), 0);
    assert_eq!(engine.next_id(), prospective.id);
}

#[test]
fn test_submission_requires_executing_grant_per_entry_point() {
    let (mut engine, _clock) = setup();
    let record = file_pending(&mut engine);

    // The proposer wallet holds no executing grant on the vault handler.
    let cancel_env = signed_envelope(
        &engine,
        &owner_key(),
        &record,
        OperationAction::ExecuteCancel,
        0,
        default_deadline(),
    );
    assert!(matches!(
        engine.cancel_with_signature(recovery_wallet(), &cancel_env),
        Err(WardenError::NoPermission { .. })
    ));

    // Nor can the signer submit its own single-phase envelope.
    let prospective = OperationRecord::new(
        engine.next_id(),
        OperationParams::new(address_of(&owner_key()), target_contract(), vault()),
        start_time(),
    );
    let single_env = signed_envelope(
        &engine,
        &owner_key(),
        &prospective,
        OperationAction::ExecuteRequestAndApprove,
        0,
        default_deadline(),
    );
    assert!(matches!(
        engine.request_and_approve(address_of(&owner_key()), &single_env),
        Err(WardenError::NoPermission { .. })
    ));

    assert_eq!(engine.nonce(address_of(&owner_key())), 0);
    assert_eq!(engine.status(record.id), OperationStatus::Pending);
}

#[test]
fn test_tampered_envelope_rejected() {
    let (mut engine, _clock) = setup();
    let record = file_pending(&mut engine);

    let mut envelope = signed_envelope(
        &engine,
        &owner_key(),
        &record,
        OperationAction::ExecuteApprove,
        0,
        default_deadline(),
    );
    envelope.record.params.value = U256::from(1_000_000u64);

    assert!(matches!(
        engine.approve_with_signature(address_of(&broadcaster_key()), &envelope),
        Err(WardenError::DigestMismatch(_))
    ));
    assert_eq!(engine.status(record.id), OperationStatus::Pending);
}

#[test]
fn test_envelope_must_cover_stored_record() {
    let (mut engine, _clock) = setup();
    let record = file_pending(&mut engine);
    let owner = address_of(&owner_key());

    // Internally consistent envelope signed over the wrong value: the
    // signer authorized something other than what would execute.
    let mut decoy = record.clone();
    decoy.params.value = U256::from(1u64);
    let envelope = signed_envelope(
        &engine,
        &owner_key(),
        &decoy,
        OperationAction::ExecuteApprove,
        0,
        default_deadline(),
    );

    assert!(matches!(
        engine.approve_with_signature(address_of(&broadcaster_key()), &envelope),
        Err(WardenError::DigestMismatch(_))
    ));
    assert_eq!(engine.nonce(owner), 0);
    assert_eq!(engine.status(record.id), OperationStatus::Pending);
}

#[test]
fn test_expired_deadline_preserves_nonce_for_retry() {
    let (mut engine, clock) = setup();
    let record = file_pending(&mut engine);
    let owner = address_of(&owner_key());
    let submitter = address_of(&broadcaster_key());

    let envelope = signed_envelope(
        &engine,
        &owner_key(),
        &record,
        OperationAction::ExecuteApprove,
        0,
        default_deadline(),
    );
    clock.advance(Duration::hours(3));
    assert!(matches!(
        engine.approve_with_signature(submitter, &envelope),
        Err(WardenError::ExpiredDeadline { .. })
    ));
    assert_eq!(engine.nonce(owner), 0);

    // The same nonce works under a fresh deadline.
    let fresh = signed_envelope(
        &engine,
        &owner_key(),
        &record,
        OperationAction::ExecuteApprove,
        0,
        start_time() + Duration::hours(5),
    );
    let done = engine.approve_with_signature(submitter, &fresh).unwrap();
    assert_eq!(done.status, OperationStatus::Completed);
    assert_eq!(engine.nonce(owner), 1);
}

#[test]
fn test_foreign_context_rejected() {
    let (mut engine, _clock) = setup();
    let record = file_pending(&mut engine);

    let params = DelegationParams {
        context_id: CONTEXT + 1,
        nonce: 0,
        handler_contract: record.params.target,
        handler_selector: vault_handler(),
        action: OperationAction::ExecuteApprove,
        deadline: default_deadline(),
        max_resource_price: U256::from(500u64),
        signer: address_of(&owner_key()),
    };
    let digest = meta_digest(engine.signing_domain(), &record, &params);
    let signature = sign_digest(&owner_key(), &digest).unwrap();
    let envelope = MetaTransaction::new(record.clone(), params, digest, signature.to_vec());

    assert!(matches!(
        engine.approve_with_signature(address_of(&broadcaster_key()), &envelope),
        Err(WardenError::ContextMismatch { .. })
    ));
}

#[test]
fn test_action_must_match_entry_point() {
    let (mut engine, _clock) = setup();
    let record = file_pending(&mut engine);

    let envelope = signed_envelope(
        &engine,
        &owner_key(),
        &record,
        OperationAction::ExecuteCancel,
        0,
        default_deadline(),
    );
    assert!(matches!(
        engine.approve_with_signature(address_of(&broadcaster_key()), &envelope),
        Err(WardenError::ActionMismatch { .. })
    ));
}

#[test]
fn test_single_phase_request_and_approve() {
    let (mut engine, _clock) = setup();
    let signer = address_of(&owner_key());
    let submitter = address_of(&broadcaster_key());

    // Prospective record signed over the id the engine will assign next.
    let prospective = OperationRecord::new(
        engine.next_id(),
        OperationParams::new(signer, target_contract(), vault())
            .with_value(U256::from(40u64))
            .with_payload(ExecutionPayload::Standard {
                selector: vault_handler(),
                args: vec![0x01],
            }),
        start_time(),
    );
    let envelope = signed_envelope(
        &engine,
        &owner_key(),
        &prospective,
        OperationAction::ExecuteRequestAndApprove,
        0,
        default_deadline(),
    );

    let done = engine.request_and_approve(submitter, &envelope).unwrap();
    assert_eq!(done.id, prospective.id);
    assert_eq!(done.status, OperationStatus::Completed);
    assert_eq!(done.params.value, U256::from(40u64));
    assert_eq!(engine.pending_count(), 0);
    assert_eq!(engine.nonce(signer), 1);
    assert_eq!(engine.next_id(), OperationId::new(prospective.id.0 + 1));
}

#[test]
fn test_single_phase_ignores_unsigned_payment() {
    // Any disbursement attempt would end the operation Failed here.
    let (mut engine, _clock) = setup_with(Box::new(MockInvoker::failing_disbursements()));
    let signer = address_of(&owner_key());
    let submitter = address_of(&broadcaster_key());

    // Signed over a record carrying no payment.
    let prospective = OperationRecord::new(
        engine.next_id(),
        OperationParams::new(signer, target_contract(), vault()),
        start_time(),
    );
    assert!(prospective.payment.is_none());
    let mut envelope = signed_envelope(
        &engine,
        &owner_key(),
        &prospective,
        OperationAction::ExecuteRequestAndApprove,
        0,
        default_deadline(),
    );
    // The payment field sits outside the digest, so the submitter can
    // rewrite it without breaking the signature. It must not reach the
    // stored record.
    envelope.record.payment = PaymentDetails::native(submitter, U256::from(1_000_000u64));

    let done = engine.request_and_approve(submitter, &envelope).unwrap();
    assert_eq!(done.status, OperationStatus::Completed);
    assert!(done.payment.is_none());
    assert!(engine.record(done.id).unwrap().payment.is_none());
    assert_eq!(engine.nonce(signer), 1);
}

#[test]
fn test_single_phase_rejects_out_of_sequence_id() {
    let (mut engine, _clock) = setup();
    let signer = address_of(&owner_key());

    let prospective = OperationRecord::new(
        OperationId::new(99),
        OperationParams::new(signer, target_contract(), vault()),
        start_time(),
    );
    let envelope = signed_envelope(
        &engine,
        &owner_key(),
        &prospective,
        OperationAction::ExecuteRequestAndApprove,
        0,
        default_deadline(),
    );

    assert!(matches!(
        engine.request_and_approve(address_of(&broadcaster_key()), &envelope),
        Err(WardenError::IdOutOfSequence { .. })
    ));
    assert_eq!(engine.nonce(signer), 0);
    assert_eq!(engine.pending_count(), 0);
}
