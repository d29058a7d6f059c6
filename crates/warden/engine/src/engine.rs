//! Operation state machine
//!
//! `OperationEngine` owns the full lifecycle of deferred operations:
//! request, approval (after the configured delay or through a co-signed
//! envelope), cancellation, payment updates, and finalization through the
//! injected invoker. One engine instance protects one system; all state
//! is owned by the instance and mutated only through the entry points
//! below, each of which fully validates before it writes anything.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use chrono::Duration;
use tracing::{debug, info, warn};
use warden_signing::SigningDomain;
use warden_types::{
    EntryPoint, ExecutionPayload, FunctionSchema, HandlerId, MetaTransaction, OperationAction,
    OperationCategory, OperationEvent, OperationId, OperationParams, OperationRecord,
    OperationStatus, PaymentDetails, RoleId, WardenError, WardenResult, BROADCASTER_ROLE,
    OWNER_ROLE, RECOVERY_ROLE,
};

use crate::clock::{Clock, SystemClock};
use crate::definitions::DefinitionSet;
use crate::execution::{Invocation, OperationInvoker};
use crate::notifier::EventForwarder;
use crate::permissions::PermissionRegistry;
use crate::schemas::FunctionSchemaRegistry;
use crate::verifier::{verify_envelope, VerificationContext};

/// Category the engine's own entry-point schemas are registered under.
/// Not a request category: operations cannot be filed against it.
const CORE_CATEGORY: &str = "core";

/// Upper bound on the configurable approval delay.
const MAX_DELAY_DAYS: i64 = 3650;

pub struct OperationEngine {
    initialized: bool,
    next_id: u64,
    delay: Duration,
    records: HashMap<OperationId, OperationRecord>,
    pending: BTreeSet<OperationId>,
    permissions: PermissionRegistry,
    schemas: FunctionSchemaRegistry,
    categories: HashSet<OperationCategory>,
    nonces: HashMap<Address, u64>,
    domain: SigningDomain,
    clock: Arc<dyn Clock>,
    invoker: Box<dyn OperationInvoker>,
    forwarder: Option<Arc<dyn EventForwarder>>,
}

impl OperationEngine {
    pub fn new(context_id: u64, instance: Address, invoker: Box<dyn OperationInvoker>) -> Self {
        Self {
            initialized: false,
            next_id: 1,
            delay: Duration::zero(),
            records: HashMap::new(),
            pending: BTreeSet::new(),
            permissions: PermissionRegistry::new(),
            schemas: FunctionSchemaRegistry::new(),
            categories: HashSet::new(),
            nonces: HashMap::new(),
            domain: SigningDomain::standard(context_id, instance),
            clock: Arc::new(SystemClock),
            invoker,
            forwarder: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_forwarder(mut self, forwarder: Arc<dyn EventForwarder>) -> Self {
        self.forwarder = Some(forwarder);
        self
    }

    /// One-time bootstrap: creates the protected `OWNER`, `BROADCASTER`
    /// and `RECOVERY` roles (one wallet each), assigns the given
    /// principals, registers the engine's own entry points as handler
    /// schemas, and sets the approval delay. The delay must lie in
    /// `[0, MAX_DELAY_DAYS]`; a negative delay would place every release
    /// time in the past and void the time-delay gate.
    pub fn initialize(
        &mut self,
        owner: Address,
        broadcaster: Address,
        recovery: Address,
        delay: Duration,
    ) -> WardenResult<()> {
        if self.initialized {
            return Err(WardenError::AlreadyInitialized);
        }
        if owner.is_zero() || broadcaster.is_zero() || recovery.is_zero() {
            return Err(WardenError::ZeroAddress);
        }
        if delay < Duration::zero() || delay > Duration::days(MAX_DELAY_DAYS) {
            return Err(WardenError::InvalidDelay {
                seconds: delay.num_seconds(),
            });
        }

        for (name, wallet) in [
            (OWNER_ROLE, owner),
            (BROADCASTER_ROLE, broadcaster),
            (RECOVERY_ROLE, recovery),
        ] {
            let role_id = self.permissions.create_protected_role(name, 1)?;
            self.permissions.assign_wallet(role_id, wallet)?;
        }

        let core = OperationCategory::from_name(CORE_CATEGORY);
        for entry in EntryPoint::ALL {
            self.schemas.register(
                FunctionSchema::new(entry.name(), core)
                    .with_actions(entry.supported_actions().iter().copied()),
            )?;
        }

        self.delay = delay;
        self.initialized = true;
        info!(
            owner = %owner,
            broadcaster = %broadcaster,
            recovery = %recovery,
            delay_secs = delay.num_seconds(),
            "Operation engine initialized"
        );
        Ok(())
    }

    // --- Lifecycle entry points ---

    /// File a new deferred operation. The requester must hold either the
    /// time-delay request grant or the single-phase signing grant for the
    /// generic request entry point.
    pub fn request(
        &mut self,
        requester: Address,
        target: Address,
        value: U256,
        gas_limit: Option<u64>,
        category: OperationCategory,
        payload: ExecutionPayload,
    ) -> WardenResult<OperationRecord> {
        self.ensure_initialized()?;
        if requester.is_zero() {
            return Err(WardenError::ZeroAddress);
        }
        let handler = EntryPoint::Request.handler_id();
        let may_request = self.permissions.has_action_permission(
            requester,
            handler,
            OperationAction::TimeDelayRequest,
        ) || self.permissions.has_action_permission(
            requester,
            handler,
            OperationAction::SignRequestAndApprove,
        );
        if !may_request {
            return Err(WardenError::NoPermission {
                wallet: requester,
                handler,
                action: OperationAction::TimeDelayRequest,
            });
        }
        if target.is_zero() {
            return Err(WardenError::ZeroTarget);
        }
        if !self.categories.contains(&category) {
            return Err(WardenError::UnsupportedCategory(category));
        }

        let mut params = OperationParams::new(requester, target, category)
            .with_value(value)
            .with_payload(payload);
        params.gas_limit = gas_limit;

        let id = OperationId::new(self.next_id);
        self.next_id += 1;
        let record = OperationRecord::new(id, params, self.clock.now() + self.delay);
        self.records.insert(id, record.clone());
        self.pending.insert(id);
        self.emit(&record, EntryPoint::Request);
        Ok(record)
    }

    /// Approve a matured request and execute it. Fails with
    /// `BeforeReleaseTime` until the record's release instant.
    pub fn approve_after_delay(
        &mut self,
        caller: Address,
        id: OperationId,
    ) -> WardenResult<OperationRecord> {
        self.ensure_initialized()?;
        self.require_permission(
            caller,
            EntryPoint::ApproveAfterDelay.handler_id(),
            OperationAction::TimeDelayApprove,
        )?;

        let record = self
            .records
            .get(&id)
            .ok_or(WardenError::UnknownOperation(id))?;
        if !record.is_pending() {
            return Err(WardenError::NotPending(id));
        }
        if self.clock.now() < record.release_time {
            return Err(WardenError::BeforeReleaseTime {
                id,
                release_time: record.release_time,
            });
        }

        self.execute_and_finalize(id, EntryPoint::ApproveAfterDelay)
    }

    /// Cancel a pending request. No execution occurs.
    pub fn cancel(&mut self, caller: Address, id: OperationId) -> WardenResult<OperationRecord> {
        self.ensure_initialized()?;
        self.require_permission(
            caller,
            EntryPoint::Cancel.handler_id(),
            OperationAction::TimeDelayCancel,
        )?;

        let record = self
            .records
            .get_mut(&id)
            .ok_or(WardenError::UnknownOperation(id))?;
        if !record.is_pending() {
            return Err(WardenError::NotPending(id));
        }
        record.status = OperationStatus::Cancelled;
        let snapshot = record.clone();
        self.pending.remove(&id);
        self.emit(&snapshot, EntryPoint::Cancel);
        Ok(snapshot)
    }

    /// Approve a pending record through a co-signed envelope, bypassing
    /// the delay. The caller executes; the envelope's signer must hold
    /// the matching signing grant. The signer's nonce advances once the
    /// envelope verifies, whatever the invocation outcome.
    pub fn approve_with_signature(
        &mut self,
        caller: Address,
        meta: &MetaTransaction,
    ) -> WardenResult<OperationRecord> {
        self.ensure_initialized()?;
        self.require_permission(
            caller,
            meta.params.handler_selector,
            OperationAction::ExecuteApprove,
        )?;
        let id = self.resolve_envelope(meta, OperationAction::ExecuteApprove)?;

        self.advance_nonce(meta.params.signer);
        self.execute_and_finalize(id, EntryPoint::ApproveWithSignature)
    }

    /// Cancel a pending record through a co-signed envelope. Sets
    /// `Cancelled` without executing; the nonce still advances.
    pub fn cancel_with_signature(
        &mut self,
        caller: Address,
        meta: &MetaTransaction,
    ) -> WardenResult<OperationRecord> {
        self.ensure_initialized()?;
        self.require_permission(
            caller,
            meta.params.handler_selector,
            OperationAction::ExecuteCancel,
        )?;
        let id = self.resolve_envelope(meta, OperationAction::ExecuteCancel)?;

        self.advance_nonce(meta.params.signer);
        let record = self
            .records
            .get_mut(&id)
            .ok_or(WardenError::UnknownOperation(id))?;
        record.status = OperationStatus::Cancelled;
        let snapshot = record.clone();
        self.pending.remove(&id);
        self.emit(&snapshot, EntryPoint::CancelWithSignature);
        Ok(snapshot)
    }

    /// Single-phase path: file the envelope's embedded record and execute
    /// it in one call. The envelope must be signed over the id the engine
    /// will assign next. The stored record is built from the embedded
    /// params exactly as `request` builds one: fresh release time, empty
    /// result, no payment. The digest does not cover the embedded
    /// record's payment field, so it is never stored or disbursed.
    pub fn request_and_approve(
        &mut self,
        caller: Address,
        meta: &MetaTransaction,
    ) -> WardenResult<OperationRecord> {
        self.ensure_initialized()?;
        self.require_permission(
            caller,
            meta.params.handler_selector,
            OperationAction::ExecuteRequestAndApprove,
        )?;

        self.verify(
            &meta.record,
            meta,
            OperationAction::ExecuteRequestAndApprove,
            true,
        )?;
        if meta.record.params.target.is_zero() {
            return Err(WardenError::ZeroTarget);
        }

        self.advance_nonce(meta.params.signer);
        let id = OperationId::new(self.next_id);
        self.next_id += 1;
        let record = OperationRecord::new(
            id,
            meta.record.params.clone(),
            self.clock.now() + self.delay,
        );
        self.records.insert(id, record.clone());
        self.pending.insert(id);
        self.emit(&record, EntryPoint::RequestAndApprove);

        self.execute_and_finalize(id, EntryPoint::RequestAndApprove)
    }

    /// Replace the payment attached to a pending record. Not a status
    /// transition; no lifecycle event is emitted. A payment moving any
    /// amount must name a nonzero recipient, and a token amount a nonzero
    /// token; the all-zero value clears the payment.
    pub fn update_payment(
        &mut self,
        caller: Address,
        id: OperationId,
        payment: PaymentDetails,
    ) -> WardenResult<()> {
        self.ensure_initialized()?;
        self.require_permission(
            caller,
            EntryPoint::UpdatePayment.handler_id(),
            OperationAction::UpdatePayment,
        )?;
        let has_amount = !payment.native_amount.is_zero() || !payment.token_amount.is_zero();
        if has_amount && payment.recipient.is_zero() {
            return Err(WardenError::ZeroAddress);
        }
        if !payment.token_amount.is_zero() && payment.token.is_zero() {
            return Err(WardenError::ZeroAddress);
        }

        let record = self
            .records
            .get_mut(&id)
            .ok_or(WardenError::UnknownOperation(id))?;
        if !record.is_pending() {
            return Err(WardenError::NotPending(id));
        }
        record.payment = payment;
        info!(operation = %id, "Operation payment updated");
        Ok(())
    }

    // --- Configuration entry points ---

    pub fn add_operation_category(&mut self, category: OperationCategory) -> WardenResult<()> {
        self.ensure_initialized()?;
        Self::install_category(&mut self.categories, category)?;
        debug!(category = %category.short(), "Operation category registered");
        Ok(())
    }

    pub fn create_function_schema(
        &mut self,
        name: &str,
        category: OperationCategory,
        actions: impl IntoIterator<Item = OperationAction>,
    ) -> WardenResult<HandlerId> {
        self.ensure_initialized()?;
        let schema = FunctionSchema::new(name, category).with_actions(actions);
        let handler = schema.handler;
        self.schemas.register(schema)?;
        Ok(handler)
    }

    pub fn create_role(&mut self, name: &str, max_wallets: usize) -> WardenResult<RoleId> {
        self.ensure_initialized()?;
        self.permissions.create_role(name, max_wallets)
    }

    pub fn delete_role(&mut self, role_id: RoleId) -> WardenResult<()> {
        self.ensure_initialized()?;
        self.permissions.delete_role(role_id)
    }

    pub fn assign_wallet(&mut self, role_id: RoleId, wallet: Address) -> WardenResult<()> {
        self.ensure_initialized()?;
        self.permissions.assign_wallet(role_id, wallet)
    }

    pub fn revoke_wallet(&mut self, role_id: RoleId, wallet: Address) -> WardenResult<()> {
        self.ensure_initialized()?;
        self.permissions.revoke_wallet(role_id, wallet)
    }

    pub fn update_wallet(
        &mut self,
        role_id: RoleId,
        old_wallet: Address,
        new_wallet: Address,
    ) -> WardenResult<()> {
        self.ensure_initialized()?;
        self.permissions.update_wallet(role_id, old_wallet, new_wallet)
    }

    pub fn grant_function_permission(
        &mut self,
        role_id: RoleId,
        handler: HandlerId,
        actions: impl IntoIterator<Item = OperationAction>,
    ) -> WardenResult<()> {
        self.ensure_initialized()?;
        self.permissions
            .grant_function_permission(role_id, handler, actions, &self.schemas)
    }

    pub fn revoke_function_permission(
        &mut self,
        role_id: RoleId,
        handler: HandlerId,
    ) -> WardenResult<()> {
        self.ensure_initialized()?;
        self.permissions.revoke_function_permission(role_id, handler)
    }

    /// Install a batch of definitions: categories first, then schemas,
    /// then grants, so later entries may reference earlier ones. The
    /// batch is staged against copies of the registries and swapped in
    /// only once every entry has applied, so a failing entry leaves
    /// nothing installed.
    pub fn load_definitions(&mut self, definitions: &DefinitionSet) -> WardenResult<()> {
        self.ensure_initialized()?;

        let mut categories = self.categories.clone();
        let mut schemas = self.schemas.clone();
        let mut permissions = self.permissions.clone();

        for name in &definitions.categories {
            Self::install_category(&mut categories, OperationCategory::from_name(name))?;
        }
        for schema in &definitions.schemas {
            schemas.register(
                FunctionSchema::new(&schema.name, OperationCategory::from_name(&schema.category))
                    .with_actions(schema.actions.iter().copied()),
            )?;
        }
        for grant in &definitions.grants {
            permissions.grant_function_permission(
                RoleId::from_name(&grant.role),
                HandlerId::from_name(&grant.function),
                grant.actions.iter().copied(),
                &schemas,
            )?;
        }

        self.categories = categories;
        self.schemas = schemas;
        self.permissions = permissions;
        info!(
            categories = definitions.categories.len(),
            schemas = definitions.schemas.len(),
            grants = definitions.grants.len(),
            "Definitions loaded"
        );
        Ok(())
    }

    // --- Query methods ---

    pub fn record(&self, id: OperationId) -> Option<&OperationRecord> {
        self.records.get(&id)
    }

    /// `Undefined` for ids that were never assigned.
    pub fn status(&self, id: OperationId) -> OperationStatus {
        self.records
            .get(&id)
            .map(|record| record.status)
            .unwrap_or_default()
    }

    /// Pending ids in ascending order.
    pub fn pending_ids(&self) -> Vec<OperationId> {
        self.pending.iter().copied().collect()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// The id the next request will be assigned.
    pub fn next_id(&self) -> OperationId {
        OperationId::new(self.next_id)
    }

    pub fn nonce(&self, signer: Address) -> u64 {
        self.nonces.get(&signer).copied().unwrap_or(0)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn signing_domain(&self) -> &SigningDomain {
        &self.domain
    }

    pub fn permissions(&self) -> &PermissionRegistry {
        &self.permissions
    }

    pub fn schemas(&self) -> &FunctionSchemaRegistry {
        &self.schemas
    }

    pub fn is_category_registered(&self, category: OperationCategory) -> bool {
        self.categories.contains(&category)
    }

    // --- Internals ---

    fn ensure_initialized(&self) -> WardenResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(WardenError::NotInitialized)
        }
    }

    fn install_category(
        categories: &mut HashSet<OperationCategory>,
        category: OperationCategory,
    ) -> WardenResult<()> {
        if category.is_zero() {
            return Err(WardenError::ZeroCategory);
        }
        if categories.contains(&category) {
            return Err(WardenError::CategoryAlreadyRegistered(category));
        }
        categories.insert(category);
        Ok(())
    }

    fn require_permission(
        &self,
        wallet: Address,
        handler: HandlerId,
        action: OperationAction,
    ) -> WardenResult<()> {
        if self.permissions.has_action_permission(wallet, handler, action) {
            Ok(())
        } else {
            Err(WardenError::NoPermission {
                wallet,
                handler,
                action,
            })
        }
    }

    /// Two-phase envelope resolution: verify the envelope as signed, then
    /// pin it to the stored record. Verification judges the envelope's
    /// own record copy, so a replay after a successful use fails on the
    /// nonce rather than on the record's terminal status; the stored
    /// record must still carry the exact params the signer saw, and must
    /// still be pending, before anything mutates.
    fn resolve_envelope(
        &self,
        meta: &MetaTransaction,
        expected_action: OperationAction,
    ) -> WardenResult<OperationId> {
        let id = meta.record.id;
        let stored = self
            .records
            .get(&id)
            .ok_or(WardenError::UnknownOperation(id))?;
        self.verify(&meta.record, meta, expected_action, false)?;
        if stored.params != meta.record.params {
            return Err(WardenError::DigestMismatch(id));
        }
        if !stored.is_pending() {
            return Err(WardenError::NotPending(id));
        }
        Ok(id)
    }

    fn verify(
        &self,
        record: &OperationRecord,
        meta: &MetaTransaction,
        expected_action: OperationAction,
        single_phase: bool,
    ) -> WardenResult<()> {
        let ctx = VerificationContext {
            domain: &self.domain,
            schemas: &self.schemas,
            permissions: &self.permissions,
            categories: &self.categories,
            now: self.clock.now(),
            expected_nonce: self.nonce(meta.params.signer),
            next_id: single_phase.then(|| OperationId::new(self.next_id)),
        };
        verify_envelope(&ctx, record, meta, expected_action)
    }

    fn advance_nonce(&mut self, signer: Address) {
        let next = self.nonce(signer) + 1;
        self.nonces.insert(signer, next);
        debug!(signer = %signer, nonce = next, "Signer nonce advanced");
    }

    /// Run the invoker against the record and settle its terminal status.
    /// A payment attached to a successful invocation is disbursed; if the
    /// disbursement fails the record is still terminal `Failed`, and the
    /// invocation's effects stand.
    fn execute_and_finalize(
        &mut self,
        id: OperationId,
        entry: EntryPoint,
    ) -> WardenResult<OperationRecord> {
        let record = self
            .records
            .get(&id)
            .ok_or(WardenError::UnknownOperation(id))?;
        let invocation = Invocation::from_record(record);
        let payment = record.payment.clone();

        let outcome = self.invoker.invoke(&invocation);
        let status = if outcome.success {
            if payment.is_none() {
                OperationStatus::Completed
            } else {
                match self.invoker.disburse(&payment) {
                    Ok(()) => OperationStatus::Completed,
                    Err(reason) => {
                        warn!(
                            operation = %id,
                            reason = %reason,
                            "Payment disbursement failed after successful invocation"
                        );
                        OperationStatus::Failed
                    }
                }
            }
        } else {
            OperationStatus::Failed
        };

        let record = self
            .records
            .get_mut(&id)
            .ok_or(WardenError::UnknownOperation(id))?;
        record.status = status;
        record.result = outcome.output;
        let snapshot = record.clone();
        self.pending.remove(&id);
        self.emit(&snapshot, entry);
        Ok(snapshot)
    }

    fn emit(&self, record: &OperationRecord, entry: EntryPoint) {
        let event = OperationEvent::new(record, entry.name(), self.clock.now());
        info!(
            operation = %record.id,
            status = ?record.status,
            handler = %entry.name(),
            category = %record.params.category.short(),
            "Operation transition"
        );
        if let Some(forwarder) = &self.forwarder {
            if let Err(reason) = forwarder.forward(&event) {
                warn!(operation = %record.id, reason = %reason, "Event forwarding failed");
            }
        }
    }
}
