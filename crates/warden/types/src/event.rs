//! Lifecycle events
//!
//! Every status transition produces one event. Events are a reporting
//! surface only: consumers cannot influence the transition that emitted
//! them, and delivery is fire-and-forget.

use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::{OperationCategory, OperationId};
use crate::operation::{OperationRecord, OperationStatus};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationEvent {
    /// Unique event identifier
    pub event_id: String,
    /// The operation that transitioned
    pub operation_id: OperationId,
    /// Entry point that triggered the transition
    pub handler_name: String,
    /// Status after the transition
    pub status: OperationStatus,
    pub requester: Address,
    pub target: Address,
    pub category: OperationCategory,
    /// When the transition happened
    pub timestamp: DateTime<Utc>,
}

impl OperationEvent {
    pub fn new(
        record: &OperationRecord,
        handler_name: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            operation_id: record.id,
            handler_name: handler_name.into(),
            status: record.status,
            requester: record.params.requester,
            target: record.params.target,
            category: record.params.category,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::OperationId;
    use crate::operation::OperationParams;

    #[test]
    fn test_event_captures_record_identity() {
        let record = OperationRecord::new(
            OperationId::new(3),
            OperationParams::new(
                Address::repeat_byte(0x11),
                Address::repeat_byte(0x22),
                OperationCategory::from_name("vault"),
            ),
            Utc::now(),
        );
        let now = Utc::now();
        let event = OperationEvent::new(&record, "request", now);

        assert!(!event.event_id.is_empty());
        assert_eq!(event.operation_id, OperationId::new(3));
        assert_eq!(event.handler_name, "request");
        assert_eq!(event.status, OperationStatus::Pending);
        assert_eq!(event.requester, Address::repeat_byte(0x11));
        assert_eq!(event.timestamp, now);
    }

    #[test]
    fn test_events_have_distinct_ids() {
        let record = OperationRecord::new(
            OperationId::new(1),
            OperationParams::new(
                Address::repeat_byte(0x01),
                Address::repeat_byte(0x02),
                OperationCategory::from_name("vault"),
            ),
            Utc::now(),
        );
        let a = OperationEvent::new(&record, "request", Utc::now());
        let b = OperationEvent::new(&record, "request", Utc::now());
        assert_ne!(a.event_id, b.event_id);
    }
}
