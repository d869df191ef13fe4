//! The trip lifecycle entity and its draft builder.

use crate::document::ImageRef;
use crate::error::WorkflowError;
use crate::utils::{TimeStamp, new_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum TripStatus {
    #[n(0)]
    Created,
    #[n(1)]
    InProgress,
    #[n(2)]
    Delivered,
    #[n(3)]
    Approved,
    #[n(4)]
    Invoiced,
    #[n(5)]
    Cancelled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct TripExpenses {
    #[n(0)]
    pub fuel: u64,
    #[n(1)]
    pub tolls: u64,
    #[n(2)]
    pub driver_fee: u64,
    #[n(3)]
    pub other: u64,
    #[n(4)]
    pub other_reason: String,
}

impl TripExpenses {
    pub fn total(&self) -> u64 {
        self.fuel + self.tolls + self.driver_fee + self.other
    }
}

/// Proof-of-delivery document attached to a trip.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct DeliveryDocument {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub image: ImageRef,
    #[n(3)]
    pub uploaded_at: TimeStamp,
}

impl DeliveryDocument {
    pub fn new(name: &str, image: ImageRef) -> Self {
        Self {
            id: new_id("pod_"),
            name: name.to_owned(),
            image,
            uploaded_at: TimeStamp::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Trip {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub client_id: Option<String>,
    #[n(2)]
    pub client_name: Option<String>,
    #[n(3)]
    pub truck_id: Option<String>,
    #[n(4)]
    pub truck_plate: Option<String>,
    #[n(5)]
    pub driver_id: Option<String>,
    #[n(6)]
    pub driver_name: Option<String>,
    #[n(7)]
    pub origin_city: Option<String>,
    #[n(8)]
    pub destination_city: Option<String>,
    // free text from the POD-first flow; the driver may not know the client
    #[n(9)]
    pub driver_entered_destination: Option<String>,
    #[n(10)]
    pub cargo_description: Option<String>,
    #[n(11)]
    pub revenue: Option<u64>,
    #[n(12)]
    pub expenses: TripExpenses,
    #[n(13)]
    pub status: TripStatus,
    #[n(14)]
    pub is_planned: bool,
    #[n(15)]
    pub delivery_documents: Vec<DeliveryDocument>,
    #[n(16)]
    pub documents_confirmed: bool,
    #[n(17)]
    pub approved_by_manager: bool,
    #[n(18)]
    pub invoiced: bool,
    #[n(19)]
    pub created_at: TimeStamp,
    #[n(20)]
    pub started_at: Option<TimeStamp>,
    #[n(21)]
    pub delivered_at: Option<TimeStamp>,
    #[n(22)]
    pub approved_at: Option<TimeStamp>,
}

impl Trip {
    /// Construct a POD-first trip: the driver evidences a finished delivery
    /// before any administrative fields are known. Starts at `Delivered`.
    pub fn pod_first(
        driver_id: &str,
        driver_name: &str,
        destination: &str,
        documents: Vec<DeliveryDocument>,
    ) -> Self {
        // the structured city is a best effort cut of the free-text address
        let destination_city = destination
            .split('-')
            .next()
            .map(|part| part.trim().to_owned())
            .filter(|part| !part.is_empty());

        Self {
            id: new_id("trip_"),
            client_id: None,
            client_name: None,
            truck_id: None,
            truck_plate: None,
            driver_id: Some(driver_id.to_owned()),
            driver_name: Some(driver_name.to_owned()),
            origin_city: None,
            destination_city,
            driver_entered_destination: Some(destination.to_owned()),
            cargo_description: None,
            revenue: None,
            expenses: TripExpenses::default(),
            status: TripStatus::Delivered,
            is_planned: false,
            delivery_documents: documents,
            documents_confirmed: false,
            approved_by_manager: false,
            invoiced: false,
            created_at: TimeStamp::new(),
            started_at: None,
            delivered_at: Some(TimeStamp::new()),
            approved_at: None,
        }
    }

    /// Fields still blocking manager approval, by name. Empty means the trip
    /// satisfies every approval precondition.
    pub fn approval_blockers(&self) -> Vec<&'static str> {
        let mut blockers = Vec::new();
        if self.client_id.is_none() {
            blockers.push("client");
        }
        if self.driver_id.is_none() {
            blockers.push("driver");
        }
        if self.truck_id.is_none() {
            blockers.push("truck");
        }
        if self
            .cargo_description
            .as_deref()
            .is_none_or(|cargo| cargo.trim().is_empty())
        {
            blockers.push("cargo_description");
        }
        if self.revenue.is_none_or(|amount| amount == 0) {
            blockers.push("revenue");
        }
        if self.delivery_documents.is_empty() {
            blockers.push("delivery_documents");
        }
        blockers
    }

    /// The canonical ready-to-invoice predicate: manager approval and
    /// document confirmation are independent gates, both required.
    pub fn invoice_ready(&self) -> bool {
        self.status == TripStatus::Approved
            && self.approved_by_manager
            && self.documents_confirmed
            && !self.invoiced
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self.status, TripStatus::Created | TripStatus::InProgress)
    }
}

/// Builder for the planned flow, where a manager fills the trip in up front.
/// Only the route is mandatory at creation; everything else may arrive later
/// and is enforced at approval time instead.
#[derive(Debug, Default)]
pub struct TripDraft {
    client_id: Option<String>,
    client_name: Option<String>,
    truck_id: Option<String>,
    truck_plate: Option<String>,
    driver_id: Option<String>,
    driver_name: Option<String>,
    origin_city: Option<String>,
    destination_city: Option<String>,
    cargo_description: Option<String>,
    revenue: Option<u64>,
    expenses: Option<TripExpenses>,
}

impl TripDraft {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_client(mut self, id: &str, name: &str) -> Self {
        self.client_id = Some(id.to_owned());
        self.client_name = Some(name.to_owned());
        self
    }
    pub fn set_truck(mut self, id: &str, plate: &str) -> Self {
        self.truck_id = Some(id.to_owned());
        self.truck_plate = Some(plate.to_owned());
        self
    }
    pub fn set_driver(mut self, id: &str, name: &str) -> Self {
        self.driver_id = Some(id.to_owned());
        self.driver_name = Some(name.to_owned());
        self
    }
    pub fn set_route(mut self, origin: &str, destination: &str) -> Self {
        self.origin_city = Some(origin.to_owned());
        self.destination_city = Some(destination.to_owned());
        self
    }
    pub fn set_cargo(mut self, description: &str) -> Self {
        self.cargo_description = Some(description.to_owned());
        self
    }
    pub fn set_revenue(mut self, amount: u64) -> Self {
        self.revenue = Some(amount);
        self
    }
    pub fn set_expenses(mut self, expenses: TripExpenses) -> Self {
        self.expenses = Some(expenses);
        self
    }

    /// Finalise the draft into a `Created` trip.
    pub fn build(self) -> Result<Trip, WorkflowError> {
        let mut missing = Vec::new();
        if self.origin_city.as_deref().is_none_or(str::is_empty) {
            missing.push("origin_city");
        }
        if self.destination_city.as_deref().is_none_or(str::is_empty) {
            missing.push("destination_city");
        }
        if !missing.is_empty() {
            return Err(WorkflowError::missing(&missing));
        }

        Ok(Trip {
            id: new_id("trip_"),
            client_id: self.client_id,
            client_name: self.client_name,
            truck_id: self.truck_id,
            truck_plate: self.truck_plate,
            driver_id: self.driver_id,
            driver_name: self.driver_name,
            origin_city: self.origin_city,
            destination_city: self.destination_city,
            driver_entered_destination: None,
            cargo_description: self.cargo_description,
            revenue: self.revenue,
            expenses: self.expenses.unwrap_or_default(),
            status: TripStatus::Created,
            is_planned: true,
            delivery_documents: Vec::new(),
            documents_confirmed: false,
            approved_by_manager: false,
            invoiced: false,
            created_at: TimeStamp::new(),
            started_at: None,
            delivered_at: None,
            approved_at: None,
        })
    }
}

/// Administrative fields a manager fills in on a POD-first trip before
/// approval. `None` leaves the current value untouched.
#[derive(Debug, Default)]
pub struct TripDetailsUpdate {
    pub client: Option<(String, String)>,
    pub truck: Option<(String, String)>,
    pub cargo_description: Option<String>,
    pub revenue: Option<u64>,
    pub expenses: Option<TripExpenses>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_image() -> ImageRef {
        ImageRef {
            handle: "img_pod".to_owned(),
            content_type: "image/jpeg".to_owned(),
            byte_len: 102_400,
        }
    }

    #[test]
    fn draft_requires_a_route() {
        let err = TripDraft::new().set_cargo("steel coils").build().unwrap_err();

        match err {
            WorkflowError::Validation { fields } => {
                assert_eq!(fields, vec!["origin_city", "destination_city"]);
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn planned_draft_builds_into_created_trip() {
        let trip = TripDraft::new()
            .set_route("Istanbul", "Ankara")
            .set_client("client_1", "Acme Lojistik")
            .set_cargo("steel coils")
            .set_revenue(45_000_00)
            .build()
            .unwrap();

        assert_eq!(trip.status, TripStatus::Created);
        assert!(trip.is_planned);
        assert!(trip.delivery_documents.is_empty());
        assert!(trip.id.starts_with("trip_1"));
    }

    #[test]
    fn pod_first_trip_lands_delivered_with_gates_down() {
        let docs = vec![DeliveryDocument::new("pod.jpg", sample_image())];
        let trip = Trip::pod_first("drv_1", "Mehmet Yilmaz", "Ankara - Inonu Caddesi No:45", docs);

        assert_eq!(trip.status, TripStatus::Delivered);
        assert!(!trip.is_planned);
        assert!(trip.delivered_at.is_some());
        assert_eq!(trip.destination_city.as_deref(), Some("Ankara"));
        assert_eq!(
            trip.driver_entered_destination.as_deref(),
            Some("Ankara - Inonu Caddesi No:45")
        );
        assert!(!trip.documents_confirmed);
        assert!(!trip.approved_by_manager);
    }

    #[test]
    fn approval_blockers_name_each_missing_field() {
        let docs = vec![DeliveryDocument::new("pod.jpg", sample_image())];
        let mut trip = Trip::pod_first("drv_1", "Mehmet Yilmaz", "Ankara", docs);

        // driver and documents are present, everything else is missing
        assert_eq!(
            trip.approval_blockers(),
            vec!["client", "truck", "cargo_description", "revenue"]
        );

        trip.client_id = Some("client_1".to_owned());
        trip.truck_id = Some("truck_1".to_owned());
        trip.cargo_description = Some("furniture".to_owned());
        trip.revenue = Some(0);
        assert_eq!(trip.approval_blockers(), vec!["revenue"]);

        trip.revenue = Some(12_000_00);
        assert!(trip.approval_blockers().is_empty());
    }

    #[test]
    fn invoice_ready_needs_both_gates() {
        let docs = vec![DeliveryDocument::new("pod.jpg", sample_image())];
        let mut trip = Trip::pod_first("drv_1", "Mehmet Yilmaz", "Ankara", docs);
        trip.status = TripStatus::Approved;
        trip.approved_by_manager = true;

        assert!(!trip.invoice_ready());

        trip.documents_confirmed = true;
        assert!(trip.invoice_ready());

        trip.invoiced = true;
        assert!(!trip.invoice_ready());
    }

    #[test]
    fn cancellation_window_closes_at_delivery() {
        let mut trip = TripDraft::new()
            .set_route("Istanbul", "Izmir")
            .build()
            .unwrap();
        assert!(trip.can_cancel());

        trip.status = TripStatus::InProgress;
        assert!(trip.can_cancel());

        trip.status = TripStatus::Delivered;
        assert!(!trip.can_cancel());

        trip.status = TripStatus::Invoiced;
        assert!(!trip.can_cancel());
    }
}
