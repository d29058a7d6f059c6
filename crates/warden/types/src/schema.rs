//! Function schemas
//!
//! A schema declares what a handler function is: its name, the selector
//! derived from that name, the category its operations belong to, and
//! which actions roles may ever be granted against it. Schemas are
//! registered once and immutable afterwards.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::identifiers::{HandlerId, OperationCategory};
use crate::role::OperationAction;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSchema {
    /// Function-style name the selector is derived from
    pub name: String,
    pub handler: HandlerId,
    pub category: OperationCategory,
    pub supported_actions: BTreeSet<OperationAction>,
}

impl FunctionSchema {
    pub fn new(name: impl Into<String>, category: OperationCategory) -> Self {
        let name = name.into();
        let handler = HandlerId::from_name(&name);
        Self {
            name,
            handler,
            category,
            supported_actions: BTreeSet::new(),
        }
    }

    pub fn with_actions(
        mut self,
        actions: impl IntoIterator<Item = OperationAction>,
    ) -> Self {
        self.supported_actions.extend(actions);
        self
    }

    pub fn supports(&self, action: OperationAction) -> bool {
        self.supported_actions.contains(&action)
    }
}
