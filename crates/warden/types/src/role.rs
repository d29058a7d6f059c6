//! Roles and per-function action grants
//!
//! Authorization is role-based with per-function, per-action granularity:
//! a wallet may do something iff some role it belongs to grants that
//! action for that handler. `Sign*` and `Execute*` are the two halves of
//! the co-signed path and are never granted to one role for the same
//! handler; the registry enforces that at grant time.

use std::collections::{BTreeSet, HashMap};

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::identifiers::{HandlerId, RoleId};

/// Name of the protected administrative role created at bootstrap.
pub const OWNER_ROLE: &str = "OWNER";
/// Name of the protected transaction-submission role created at bootstrap.
pub const BROADCASTER_ROLE: &str = "BROADCASTER";
/// Name of the protected recovery role created at bootstrap.
pub const RECOVERY_ROLE: &str = "RECOVERY";

/// An action a role may be granted on a handler.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum OperationAction {
    /// File a request that matures after the time delay
    TimeDelayRequest,
    /// Approve a matured request
    TimeDelayApprove,
    /// Cancel a pending request on the time-delay path
    TimeDelayCancel,
    /// Co-sign a combined request-and-approve envelope
    SignRequestAndApprove,
    /// Co-sign an approval envelope
    SignApprove,
    /// Co-sign a cancellation envelope
    SignCancel,
    /// Submit a co-signed request-and-approve envelope
    ExecuteRequestAndApprove,
    /// Submit a co-signed approval envelope
    ExecuteApprove,
    /// Submit a co-signed cancellation envelope
    ExecuteCancel,
    /// Replace the payment attached to a pending record
    UpdatePayment,
}

impl OperationAction {
    /// Off-chain signing half of the co-signed path.
    pub fn is_signing(&self) -> bool {
        matches!(
            self,
            OperationAction::SignRequestAndApprove
                | OperationAction::SignApprove
                | OperationAction::SignCancel
        )
    }

    /// Submission half of the co-signed path.
    pub fn is_executing(&self) -> bool {
        matches!(
            self,
            OperationAction::ExecuteRequestAndApprove
                | OperationAction::ExecuteApprove
                | OperationAction::ExecuteCancel
        )
    }

    /// For an `Execute*` action, the `Sign*` action the envelope signer
    /// must hold.
    pub fn signing_counterpart(&self) -> Option<OperationAction> {
        match self {
            OperationAction::ExecuteRequestAndApprove => {
                Some(OperationAction::SignRequestAndApprove)
            }
            OperationAction::ExecuteApprove => Some(OperationAction::SignApprove),
            OperationAction::ExecuteCancel => Some(OperationAction::SignCancel),
            _ => None,
        }
    }

    /// Wire code used in digest encoding.
    pub fn code(&self) -> u8 {
        match self {
            OperationAction::TimeDelayRequest => 0,
            OperationAction::TimeDelayApprove => 1,
            OperationAction::TimeDelayCancel => 2,
            OperationAction::SignRequestAndApprove => 3,
            OperationAction::SignApprove => 4,
            OperationAction::SignCancel => 5,
            OperationAction::ExecuteRequestAndApprove => 6,
            OperationAction::ExecuteApprove => 7,
            OperationAction::ExecuteCancel => 8,
            OperationAction::UpdatePayment => 9,
        }
    }
}

/// Actions a role holds for one handler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionPermission {
    pub handler: HandlerId,
    pub actions: BTreeSet<OperationAction>,
}

impl FunctionPermission {
    pub fn new(handler: HandlerId, actions: impl IntoIterator<Item = OperationAction>) -> Self {
        Self {
            handler,
            actions: actions.into_iter().collect(),
        }
    }

    pub fn grants(&self, action: OperationAction) -> bool {
        self.actions.contains(&action)
    }

    pub fn has_signing_action(&self) -> bool {
        self.actions.iter().any(OperationAction::is_signing)
    }

    pub fn has_executing_action(&self) -> bool {
        self.actions.iter().any(OperationAction::is_executing)
    }
}

/// A named set of wallets with bounded membership and per-handler grants.
///
/// At most one permission entry exists per handler (the map key). A
/// protected role can never be deleted nor left without wallets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub id: RoleId,
    pub wallets: Vec<Address>,
    pub max_wallets: usize,
    pub permissions: HashMap<HandlerId, FunctionPermission>,
    pub protected: bool,
}

impl Role {
    pub fn new(name: impl Into<String>, max_wallets: usize) -> Self {
        let name = name.into();
        let id = RoleId::from_name(&name);
        Self {
            name,
            id,
            wallets: Vec::new(),
            max_wallets,
            permissions: HashMap::new(),
            protected: false,
        }
    }

    /// Mark the role as undeletable and never empty.
    pub fn protected(mut self) -> Self {
        self.protected = true;
        self
    }

    pub fn has_wallet(&self, wallet: &Address) -> bool {
        self.wallets.contains(wallet)
    }

    pub fn is_full(&self) -> bool {
        self.wallets.len() >= self.max_wallets
    }

    pub fn grants(&self, handler: HandlerId, action: OperationAction) -> bool {
        self.permissions
            .get(&handler)
            .is_some_and(|permission| permission.grants(action))
    }
}
