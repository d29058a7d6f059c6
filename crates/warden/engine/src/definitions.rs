//! Bulk configuration definitions
//!
//! A `DefinitionSet` bundles the categories, function schemas, and role
//! grants an operator wants installed in one pass. The engine applies
//! the three lists in order, so grants may reference schemas declared
//! earlier in the same set; roles must already exist. A set installs
//! all-or-nothing.

use serde::{Deserialize, Serialize};
use warden_types::OperationAction;

/// One function schema to register.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub actions: Vec<OperationAction>,
}

/// One permission grant: `actions` on the function named `function`,
/// for the role named `role`. Names are hashed to ids at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantDefinition {
    pub role: String,
    pub function: String,
    pub actions: Vec<OperationAction>,
}

/// A batch of definitions, typically decoded from a JSON document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefinitionSet {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub schemas: Vec<SchemaDefinition>,
    #[serde(default)]
    pub grants: Vec<GrantDefinition>,
}

impl DefinitionSet {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.schemas.is_empty() && self.grants.is_empty()
    }
}
