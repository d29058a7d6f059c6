//! Execution seam
//!
//! The engine decides *whether* an operation runs; the injected invoker
//! is the only component that *runs* anything. It receives fully
//! resolved invocations and payments and reports outcomes — it holds no
//! decision authority and cannot see the permission model.

use alloy_primitives::{Address, U256};
use warden_types::{OperationRecord, PaymentDetails};

/// A fully resolved call, ready for the execution substrate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub target: Address,
    /// Calldata assembled from the record's execution payload
    pub calldata: Vec<u8>,
    pub value: U256,
    /// `None` means all remaining resources
    pub gas_limit: Option<u64>,
}

impl Invocation {
    pub fn from_record(record: &OperationRecord) -> Self {
        Self {
            target: record.params.target,
            calldata: record.params.payload.to_calldata(),
            value: record.params.value,
            gas_limit: record.params.gas_limit,
        }
    }
}

/// What the substrate reports back from one invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvocationOutcome {
    pub success: bool,
    /// Return data on success, failure context otherwise
    pub output: Vec<u8>,
}

impl InvocationOutcome {
    pub fn succeeded(output: impl Into<Vec<u8>>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            output: reason.into().into_bytes(),
        }
    }
}

/// Capability handed to the engine at construction: invoke approved
/// operations and transfer their attached payments. A failed invocation
/// is an outcome, not an error; a failed disbursement carries its reason.
pub trait OperationInvoker: Send {
    fn invoke(&mut self, invocation: &Invocation) -> InvocationOutcome;

    fn disburse(&mut self, payment: &PaymentDetails) -> Result<(), String>;
}

/// Recording invoker for tests.
#[derive(Debug, Default)]
pub struct MockInvoker {
    pub fail_invocations: bool,
    pub fail_disbursements: bool,
    pub output: Vec<u8>,
    pub invocations: Vec<Invocation>,
    pub disbursements: Vec<PaymentDetails>,
}

impl MockInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every invocation reports failure.
    pub fn failing() -> Self {
        Self {
            fail_invocations: true,
            ..Self::default()
        }
    }

    /// Invocations succeed, every disbursement fails.
    pub fn failing_disbursements() -> Self {
        Self {
            fail_disbursements: true,
            ..Self::default()
        }
    }

    pub fn with_output(mut self, output: impl Into<Vec<u8>>) -> Self {
        self.output = output.into();
        self
    }
}

impl OperationInvoker for MockInvoker {
    fn invoke(&mut self, invocation: &Invocation) -> InvocationOutcome {
        self.invocations.push(invocation.clone());
        if self.fail_invocations {
            InvocationOutcome::failed("invocation refused")
        } else {
            InvocationOutcome::succeeded(self.output.clone())
        }
    }

    fn disburse(&mut self, payment: &PaymentDetails) -> Result<(), String> {
        self.disbursements.push(payment.clone());
        if self.fail_disbursements {
            Err("disbursement refused".to_string())
        } else {
            Ok(())
        }
    }
}
