//! Permission Registry
//!
//! Roles, their wallet membership, and their per-handler action grants.
//! The wallet → roles index makes `has_action_permission` a map walk
//! over the wallet's own roles rather than a scan of every role.
//!
//! Grant validation enforces the separation invariant: a role never
//! holds both a signing and an executing action for the same handler,
//! so no single principal can ever satisfy both halves of the co-signed
//! path by configuration.

use std::collections::{BTreeSet, HashMap, HashSet};

use alloy_primitives::Address;
use tracing::{debug, info};
use warden_types::{
    FunctionPermission, HandlerId, OperationAction, Role, RoleId, WardenError, WardenResult,
};

use crate::schemas::FunctionSchemaRegistry;

#[derive(Clone, Debug, Default)]
pub struct PermissionRegistry {
    roles: HashMap<RoleId, Role>,
    wallet_roles: HashMap<Address, HashSet<RoleId>>,
}

impl PermissionRegistry {
    pub fn new() -> Self {
        Self {
            roles: HashMap::new(),
            wallet_roles: HashMap::new(),
        }
    }

    // --- Role lifecycle ---

    pub fn create_role(&mut self, name: &str, max_wallets: usize) -> WardenResult<RoleId> {
        self.insert_role(Role::new(name, max_wallets))
    }

    /// A role that can never be deleted nor left without wallets.
    pub fn create_protected_role(&mut self, name: &str, max_wallets: usize) -> WardenResult<RoleId> {
        self.insert_role(Role::new(name, max_wallets).protected())
    }

    fn insert_role(&mut self, role: Role) -> WardenResult<RoleId> {
        if role.name.is_empty() {
            return Err(WardenError::EmptyRoleName);
        }
        if self.roles.contains_key(&role.id) {
            return Err(WardenError::RoleAlreadyExists(role.id));
        }

        let id = role.id;
        info!(role = %id.short(), name = %role.name, protected = role.protected, "Role created");
        self.roles.insert(id, role);
        Ok(id)
    }

    pub fn delete_role(&mut self, role_id: RoleId) -> WardenResult<()> {
        let role = self
            .roles
            .get(&role_id)
            .ok_or(WardenError::UnknownRole(role_id))?;
        if role.protected {
            return Err(WardenError::ProtectedRole(role_id));
        }

        let wallets = role.wallets.clone();
        self.roles.remove(&role_id);
        for wallet in wallets {
            self.unindex(wallet, role_id);
        }

        info!(role = %role_id.short(), "Role deleted");
        Ok(())
    }

    // --- Membership ---

    pub fn assign_wallet(&mut self, role_id: RoleId, wallet: Address) -> WardenResult<()> {
        let role = self
            .roles
            .get_mut(&role_id)
            .ok_or(WardenError::UnknownRole(role_id))?;
        if wallet.is_zero() {
            return Err(WardenError::ZeroAddress);
        }
        if role.has_wallet(&wallet) {
            return Err(WardenError::WalletAlreadyInRole {
                role: role_id,
                wallet,
            });
        }
        if role.is_full() {
            return Err(WardenError::WalletLimitReached {
                role: role_id,
                max_wallets: role.max_wallets,
            });
        }

        role.wallets.push(wallet);
        self.wallet_roles.entry(wallet).or_default().insert(role_id);

        info!(role = %role_id.short(), wallet = %wallet, "Wallet assigned to role");
        Ok(())
    }

    pub fn revoke_wallet(&mut self, role_id: RoleId, wallet: Address) -> WardenResult<()> {
        let role = self
            .roles
            .get_mut(&role_id)
            .ok_or(WardenError::UnknownRole(role_id))?;
        let position = role
            .wallets
            .iter()
            .position(|member| *member == wallet)
            .ok_or(WardenError::WalletNotInRole {
                role: role_id,
                wallet,
            })?;
        if role.wallets.len() == 1 {
            return Err(WardenError::CannotRemoveLastWallet(role_id));
        }

        role.wallets.remove(position);
        self.unindex(wallet, role_id);

        info!(role = %role_id.short(), wallet = %wallet, "Wallet revoked from role");
        Ok(())
    }

    /// Replace one member with another without passing through an empty
    /// or oversized membership.
    pub fn update_wallet(
        &mut self,
        role_id: RoleId,
        old_wallet: Address,
        new_wallet: Address,
    ) -> WardenResult<()> {
        let role = self
            .roles
            .get_mut(&role_id)
            .ok_or(WardenError::UnknownRole(role_id))?;
        if new_wallet.is_zero() {
            return Err(WardenError::ZeroAddress);
        }
        if role.has_wallet(&new_wallet) {
            return Err(WardenError::WalletAlreadyInRole {
                role: role_id,
                wallet: new_wallet,
            });
        }
        let position = role
            .wallets
            .iter()
            .position(|member| *member == old_wallet)
            .ok_or(WardenError::WalletNotInRole {
                role: role_id,
                wallet: old_wallet,
            })?;

        role.wallets[position] = new_wallet;
        self.unindex(old_wallet, role_id);
        self.wallet_roles
            .entry(new_wallet)
            .or_default()
            .insert(role_id);

        info!(
            role = %role_id.short(),
            old_wallet = %old_wallet,
            new_wallet = %new_wallet,
            "Wallet replaced in role"
        );
        Ok(())
    }

    // --- Grants ---

    /// Grant actions for one handler to a role.
    ///
    /// The handler must have a registered schema, every action must be
    /// schema-supported, and the role's combined grant for this handler
    /// must stay on one side of the signing/executing separation.
    pub fn grant_function_permission(
        &mut self,
        role_id: RoleId,
        handler: HandlerId,
        actions: impl IntoIterator<Item = OperationAction>,
        schemas: &FunctionSchemaRegistry,
    ) -> WardenResult<()> {
        let role = self
            .roles
            .get_mut(&role_id)
            .ok_or(WardenError::UnknownRole(role_id))?;
        let schema = schemas.require(handler)?;

        let requested: BTreeSet<OperationAction> = actions.into_iter().collect();
        if requested.is_empty() {
            return Ok(());
        }
        for action in &requested {
            if !schema.supports(*action) {
                return Err(WardenError::UnsupportedAction {
                    handler,
                    action: *action,
                });
            }
        }

        let mut combined = requested.clone();
        if let Some(existing) = role.permissions.get(&handler) {
            combined.extend(existing.actions.iter().copied());
        }
        let has_signing = combined.iter().any(|action| action.is_signing());
        let has_executing = combined.iter().any(|action| action.is_executing());
        if has_signing && has_executing {
            return Err(WardenError::RoleSeparationViolation {
                role: role_id,
                handler,
            });
        }

        role.permissions
            .entry(handler)
            .and_modify(|permission| permission.actions.extend(requested.iter().copied()))
            .or_insert_with(|| FunctionPermission::new(handler, requested.iter().copied()));

        info!(role = %role_id.short(), handler = %handler, actions = ?requested, "Function permission granted");
        Ok(())
    }

    /// Remove a role's grant for one handler. Removing an absent grant
    /// is a no-op.
    pub fn revoke_function_permission(
        &mut self,
        role_id: RoleId,
        handler: HandlerId,
    ) -> WardenResult<()> {
        let role = self
            .roles
            .get_mut(&role_id)
            .ok_or(WardenError::UnknownRole(role_id))?;
        if role.permissions.remove(&handler).is_some() {
            info!(role = %role_id.short(), handler = %handler, "Function permission revoked");
        } else {
            debug!(role = %role_id.short(), handler = %handler, "No permission entry to revoke");
        }
        Ok(())
    }

    // --- Query methods ---

    /// True iff some role containing the wallet grants `action` for
    /// `handler`.
    pub fn has_action_permission(
        &self,
        wallet: Address,
        handler: HandlerId,
        action: OperationAction,
    ) -> bool {
        self.wallet_roles.get(&wallet).is_some_and(|role_ids| {
            role_ids.iter().any(|role_id| {
                self.roles
                    .get(role_id)
                    .is_some_and(|role| role.grants(handler, action))
            })
        })
    }

    pub fn role(&self, role_id: RoleId) -> Option<&Role> {
        self.roles.get(&role_id)
    }

    pub fn is_member(&self, role_id: RoleId, wallet: Address) -> bool {
        self.roles
            .get(&role_id)
            .is_some_and(|role| role.has_wallet(&wallet))
    }

    pub fn roles_of(&self, wallet: Address) -> Vec<&Role> {
        self.wallet_roles
            .get(&wallet)
            .map(|role_ids| {
                role_ids
                    .iter()
                    .filter_map(|role_id| self.roles.get(role_id))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn role_count(&self) -> usize {
        self.roles.len()
    }

    fn unindex(&mut self, wallet: Address, role_id: RoleId) {
        if let Some(role_ids) = self.wallet_roles.get_mut(&wallet) {
            role_ids.remove(&role_id);
            if role_ids.is_empty() {
                self.wallet_roles.remove(&wallet);
            }
        }
    }
}
