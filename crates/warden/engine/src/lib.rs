//! Authorization and deferred-execution engine
//!
//! Gates sensitive operations behind multi-party approval: a request must
//! mature through a mandatory time delay, or be co-signed off-line and
//! submitted by a separately-authorized executor, before the injected
//! invoker runs it. Permissions are role-based with per-function,
//! per-action granularity, and the signing and submitting halves of the
//! co-signed path can never be held by one role for the same function.
//!
//! The root aggregate is [`OperationEngine`]; everything else here is a
//! registry or seam it owns.

#![deny(unsafe_code)]

pub mod clock;
pub mod definitions;
pub mod engine;
pub mod execution;
pub mod notifier;
pub mod permissions;
pub mod schemas;

mod verifier;

pub use clock::{Clock, ManualClock, SystemClock};
pub use definitions::{DefinitionSet, GrantDefinition, SchemaDefinition};
pub use engine::OperationEngine;
pub use execution::{Invocation, InvocationOutcome, MockInvoker, OperationInvoker};
pub use notifier::{EventForwarder, MemoryForwarder, RefusingForwarder};
pub use permissions::PermissionRegistry;
pub use schemas::FunctionSchemaRegistry;
