//! Function Schema Registry
//!
//! Schemas declare which actions may ever be configured against a
//! handler. Grant validation and envelope verification both consult this
//! registry; a schema is registered once and never changes.

use std::collections::HashMap;

use tracing::debug;
use warden_types::{FunctionSchema, HandlerId, OperationAction, WardenError, WardenResult};

#[derive(Clone, Debug, Default)]
pub struct FunctionSchemaRegistry {
    schemas: HashMap<HandlerId, FunctionSchema>,
}

impl FunctionSchemaRegistry {
    pub fn new() -> Self {
        Self {
            schemas: HashMap::new(),
        }
    }

    /// Register a schema; handler ids are register-once.
    pub fn register(&mut self, schema: FunctionSchema) -> WardenResult<()> {
        if schema.category.is_zero() {
            return Err(WardenError::ZeroCategory);
        }
        if self.schemas.contains_key(&schema.handler) {
            return Err(WardenError::FunctionAlreadyExists(schema.handler));
        }

        debug!(handler = %schema.handler, name = %schema.name, "Function schema registered");
        self.schemas.insert(schema.handler, schema);
        Ok(())
    }

    pub fn schema(&self, handler: HandlerId) -> Option<&FunctionSchema> {
        self.schemas.get(&handler)
    }

    pub fn require(&self, handler: HandlerId) -> WardenResult<&FunctionSchema> {
        self.schemas
            .get(&handler)
            .ok_or(WardenError::UnknownFunction(handler))
    }

    /// Pure structural lookup: could this action ever be granted here?
    pub fn is_action_supported(&self, handler: HandlerId, action: OperationAction) -> bool {
        self.schemas
            .get(&handler)
            .is_some_and(|schema| schema.supports(action))
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionSchema> {
        self.schemas.values()
    }
}
