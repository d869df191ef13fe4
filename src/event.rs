//! Audit events recorded alongside every successful transition.
//!
//! Each command writes exactly one event in the same batch as the state it
//! mutates, so the event log and the entity state can never drift apart. The
//! storage key is the sha256 digest of the encoded event.

use crate::document::RejectionReason;
use crate::error::StoreError;
use crate::utils::{CalDate, TimeStamp};

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct WorkflowEvent {
    #[n(0)]
    pub entity_id: String,
    #[n(1)]
    pub actor: String,
    #[n(2)]
    pub recorded_at: TimeStamp,
    #[n(3)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum EventKind {
    #[n(0)]
    DocumentSubmitted,
    #[n(1)]
    DocumentApproved {
        #[n(0)]
        confirmed_expiry: CalDate,
    },
    #[n(2)]
    DocumentRejected {
        #[n(0)]
        reason: RejectionReason,
    },
    #[n(3)]
    AssignmentRequested {
        #[n(0)]
        preferred_truck_id: String,
    },
    #[n(4)]
    AssignmentApproved {
        #[n(0)]
        truck_id: String,
    },
    #[n(5)]
    AssignmentRejected,
    #[n(6)]
    TripCreated,
    #[n(7)]
    TripStarted {
        #[n(0)]
        driver_id: String,
        #[n(1)]
        truck_id: String,
    },
    #[n(8)]
    TripDelivered {
        #[n(0)]
        document_count: u32,
    },
    #[n(9)]
    DocumentsConfirmed,
    #[n(10)]
    TripApproved,
    #[n(11)]
    TripDetailsUpdated,
    #[n(12)]
    TripCancelled,
    #[n(13)]
    InvoiceIssued {
        #[n(0)]
        amount: u64,
        #[n(1)]
        trip_count: u32,
    },
}

impl WorkflowEvent {
    pub fn new(entity_id: &str, actor: &str, kind: EventKind) -> Self {
        Self {
            entity_id: entity_id.to_owned(),
            actor: actor.to_owned(),
            recorded_at: TimeStamp::new(),
            kind,
        }
    }

    /// Encode the event and derive its content-addressed storage key.
    pub fn build(&self) -> Result<(String, Vec<u8>), StoreError> {
        let cbor = minicbor::to_vec(self)?;
        let key = format!("evt_{}", sha256::digest(&cbor));

        Ok((key, cbor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_encoding() {
        let event = WorkflowEvent::new(
            "trip_abc",
            "manager",
            EventKind::InvoiceIssued {
                amount: 35_000_00,
                trip_count: 2,
            },
        );

        let (key, cbor) = event.build().unwrap();
        assert!(key.starts_with("evt_"));

        let decode: WorkflowEvent = minicbor::decode(&cbor).unwrap();
        assert_eq!(event, decode);
    }

    #[test]
    fn identical_events_share_a_key() {
        let event = WorkflowEvent::new("doc_abc", "manager", EventKind::DocumentSubmitted);

        let (key1, _) = event.build().unwrap();
        let (key2, _) = event.build().unwrap();

        assert_eq!(key1, key2);
    }
}
