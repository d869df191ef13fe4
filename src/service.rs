//! Service layer API for fleet workflow operations.
//!
//! Every command follows the same shape: load the entities involved, validate
//! the transition, then apply the new state and its audit event in one batch.
//! Either the whole transition lands or none of it does.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use sled::Batch;
use tracing::{debug, info, warn};

use crate::assignment::{RequestStatus, TruckAssignmentRequest};
use crate::document::{
    DocumentCategory, DocumentSubmission, ImageRef, PreviousDocument, RejectionReason, Subject,
    SubmissionStatus,
};
use crate::error::WorkflowError;
use crate::event::{EventKind, WorkflowEvent};
use crate::fleet::{CertificateKind, Client, Driver, DriverStatus, Truck, TruckStatus};
use crate::invoice::Invoice;
use crate::store::{self, Store, stage};
use crate::trip::{DeliveryDocument, Trip, TripDetailsUpdate, TripDraft, TripStatus};
use crate::utils::{CalDate, TimeStamp};
use crate::warnings::{self, Warning};

/// Review actions without a named actor are attributed to the fleet manager.
const MANAGER: &str = "manager";

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub warning_window_days: i64,
    pub error_threshold_days: i64,
    pub invoice_due_days: i64,
    pub max_delivery_documents: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            warning_window_days: warnings::WARNING_WINDOW_DAYS,
            error_threshold_days: warnings::ERROR_THRESHOLD_DAYS,
            invoice_due_days: 30,
            max_delivery_documents: 3,
        }
    }
}

pub struct FleetService {
    store: Store,
    config: ServiceConfig,
    // commands serialize on this lock so that an entity in a given source
    // state can only be transitioned out of it once
    write_lock: Mutex<()>,
}

impl FleetService {
    pub fn new(instance: Arc<sled::Db>) -> Self {
        Self::with_config(instance, ServiceConfig::default())
    }

    pub fn with_config(instance: Arc<sled::Db>, config: ServiceConfig) -> Self {
        Self {
            store: Store::new(instance),
            config,
            write_lock: Mutex::new(()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .expect("a workflow command panicked while holding the write lock")
    }

    // FLEET SETUP

    pub fn register_truck(&self, truck: Truck) -> Result<Truck, WorkflowError> {
        let _guard = self.lock();
        let mut batch = Batch::default();
        stage(&mut batch, &truck.id, &truck)?;
        self.store.apply(batch)?;
        Ok(truck)
    }

    pub fn register_driver(&self, driver: Driver) -> Result<Driver, WorkflowError> {
        let _guard = self.lock();
        let mut batch = Batch::default();
        stage(&mut batch, &driver.id, &driver)?;
        self.store.apply(batch)?;
        Ok(driver)
    }

    pub fn register_client(&self, client: Client) -> Result<Client, WorkflowError> {
        let _guard = self.lock();
        let mut batch = Batch::default();
        stage(&mut batch, &client.id, &client)?;
        self.store.apply(batch)?;
        Ok(client)
    }

    // QUERIES

    pub fn truck(&self, id: &str) -> Result<Truck, WorkflowError> {
        self.store.load(id)
    }
    pub fn trucks(&self) -> Result<Vec<Truck>, WorkflowError> {
        Ok(self.store.scan(store::TRUCKS)?)
    }
    pub fn driver(&self, id: &str) -> Result<Driver, WorkflowError> {
        self.store.load(id)
    }
    pub fn drivers(&self) -> Result<Vec<Driver>, WorkflowError> {
        Ok(self.store.scan(store::DRIVERS)?)
    }
    pub fn client(&self, id: &str) -> Result<Client, WorkflowError> {
        self.store.load(id)
    }
    pub fn clients(&self) -> Result<Vec<Client>, WorkflowError> {
        Ok(self.store.scan(store::CLIENTS)?)
    }
    pub fn trip(&self, id: &str) -> Result<Trip, WorkflowError> {
        self.store.load(id)
    }
    pub fn trips(&self) -> Result<Vec<Trip>, WorkflowError> {
        Ok(self.store.scan(store::TRIPS)?)
    }
    pub fn submission(&self, id: &str) -> Result<DocumentSubmission, WorkflowError> {
        self.store.load(id)
    }
    pub fn submissions(&self) -> Result<Vec<DocumentSubmission>, WorkflowError> {
        Ok(self.store.scan(store::SUBMISSIONS)?)
    }
    pub fn request(&self, id: &str) -> Result<TruckAssignmentRequest, WorkflowError> {
        self.store.load(id)
    }
    pub fn requests(&self) -> Result<Vec<TruckAssignmentRequest>, WorkflowError> {
        Ok(self.store.scan(store::REQUESTS)?)
    }
    pub fn invoice(&self, id: &str) -> Result<Invoice, WorkflowError> {
        self.store.load(id)
    }
    pub fn invoices(&self) -> Result<Vec<Invoice>, WorkflowError> {
        Ok(self.store.scan(store::INVOICES)?)
    }

    pub fn trips_with_status(&self, status: TripStatus) -> Result<Vec<Trip>, WorkflowError> {
        Ok(self
            .trips()?
            .into_iter()
            .filter(|t| t.status == status)
            .collect())
    }

    pub fn trips_for_client(&self, client_id: &str) -> Result<Vec<Trip>, WorkflowError> {
        Ok(self
            .trips()?
            .into_iter()
            .filter(|t| t.client_id.as_deref() == Some(client_id))
            .collect())
    }

    pub fn pending_submissions(&self) -> Result<Vec<DocumentSubmission>, WorkflowError> {
        Ok(self
            .submissions()?
            .into_iter()
            .filter(DocumentSubmission::is_pending)
            .collect())
    }

    pub fn submissions_for_subject(
        &self,
        subject_id: &str,
    ) -> Result<Vec<DocumentSubmission>, WorkflowError> {
        Ok(self
            .submissions()?
            .into_iter()
            .filter(|s| s.subject.id() == subject_id)
            .collect())
    }

    pub fn pending_requests(&self) -> Result<Vec<TruckAssignmentRequest>, WorkflowError> {
        Ok(self
            .requests()?
            .into_iter()
            .filter(TruckAssignmentRequest::is_pending)
            .collect())
    }

    /// Trips that clear both gates and are still waiting for an invoice.
    pub fn invoiceable_trips(&self) -> Result<Vec<Trip>, WorkflowError> {
        Ok(self
            .trips()?
            .into_iter()
            .filter(Trip::invoice_ready)
            .collect())
    }

    /// Invoiceable trips keyed by client, the shape an invoicing batch is
    /// picked from.
    pub fn invoiceable_trips_by_client(
        &self,
    ) -> Result<BTreeMap<String, Vec<Trip>>, WorkflowError> {
        let mut grouped: BTreeMap<String, Vec<Trip>> = BTreeMap::new();
        for trip in self.invoiceable_trips()? {
            if let Some(client_id) = trip.client_id.clone() {
                grouped.entry(client_id).or_default().push(trip);
            }
        }
        Ok(grouped)
    }

    pub fn invoices_for_client(&self, client_id: &str) -> Result<Vec<Invoice>, WorkflowError> {
        Ok(self
            .invoices()?
            .into_iter()
            .filter(|i| i.client_id == client_id)
            .collect())
    }

    /// Compliance warnings over the current snapshot. Read-only; safe to call
    /// any number of times, concurrently with anything.
    pub fn warnings(&self) -> Result<Vec<Warning>, WorkflowError> {
        Ok(warnings::compute_warnings_with(
            &self.trucks()?,
            &self.drivers()?,
            CalDate::today(),
            self.config.warning_window_days,
            self.config.error_threshold_days,
        ))
    }

    // DOCUMENT APPROVAL WORKFLOW

    /// Submit a compliance document for review.
    pub fn submit_document(
        &self,
        category: DocumentCategory,
        subject: Subject,
        subject_name: &str,
        submitted_by: &str,
        image: Option<ImageRef>,
        suggested_expiry: Option<CalDate>,
        previous: Option<PreviousDocument>,
    ) -> Result<DocumentSubmission, WorkflowError> {
        let _guard = self.lock();

        let mut missing = Vec::new();
        if image.is_none() {
            missing.push("image");
        }
        if suggested_expiry.is_none() {
            missing.push("suggested_expiry_date");
        }
        let (Some(image), Some(suggested_expiry)) = (image, suggested_expiry) else {
            return Err(WorkflowError::missing(&missing));
        };
        if subject.kind() != category.subject_kind() {
            return Err(WorkflowError::missing(&["subject"]));
        }

        // the subject must exist before anyone reviews paperwork for it
        match &subject {
            Subject::Driver { id } => {
                self.store.load::<Driver>(id)?;
            }
            Subject::Truck { id } => {
                self.store.load::<Truck>(id)?;
            }
        }

        let submission = DocumentSubmission::new(
            category,
            subject,
            subject_name,
            submitted_by,
            image,
            suggested_expiry,
            previous,
        );

        let mut batch = Batch::default();
        stage(&mut batch, &submission.id, &submission)?;
        self.record_event(
            &mut batch,
            &submission.id,
            submitted_by,
            EventKind::DocumentSubmitted,
        )?;
        self.store.apply(batch)?;

        debug!(
            submission = %submission.id,
            category = category.label(),
            "document submitted for review"
        );
        Ok(submission)
    }

    /// Approve a pending submission and push the confirmed expiry onto the
    /// subject entity in the same batch.
    pub fn approve_document(
        &self,
        submission_id: &str,
        confirmed_expiry: CalDate,
        reviewer: &str,
    ) -> Result<DocumentSubmission, WorkflowError> {
        let _guard = self.lock();

        let mut submission: DocumentSubmission = self.store.load(submission_id)?;
        if !submission.is_pending() {
            return Err(WorkflowError::invalid_transition(
                submission_id,
                submission.status,
            ));
        }

        submission.status = SubmissionStatus::Approved;
        submission.confirmed_expiry = Some(confirmed_expiry);
        submission.reviewed_at = Some(TimeStamp::new());
        submission.reviewed_by = Some(reviewer.to_owned());

        let mut batch = Batch::default();
        self.propagate_confirmed_expiry(&mut batch, &submission, confirmed_expiry)?;
        stage(&mut batch, &submission.id, &submission)?;
        self.record_event(
            &mut batch,
            &submission.id,
            reviewer,
            EventKind::DocumentApproved { confirmed_expiry },
        )?;
        self.store.apply(batch)?;

        info!(
            submission = %submission.id,
            subject = submission.subject.id(),
            expiry = %confirmed_expiry,
            "document approved"
        );
        Ok(submission)
    }

    /// Reject a pending submission. The subject entity keeps its old expiry.
    pub fn reject_document(
        &self,
        submission_id: &str,
        reason: RejectionReason,
        note: Option<&str>,
        reviewer: &str,
    ) -> Result<DocumentSubmission, WorkflowError> {
        let _guard = self.lock();

        let mut submission: DocumentSubmission = self.store.load(submission_id)?;
        if !submission.is_pending() {
            return Err(WorkflowError::invalid_transition(
                submission_id,
                submission.status,
            ));
        }
        let note = note.map(str::trim).filter(|n| !n.is_empty());
        if reason.requires_note() && note.is_none() {
            return Err(WorkflowError::missing(&["rejection_note"]));
        }

        submission.status = SubmissionStatus::Rejected;
        submission.rejection_reason = Some(reason);
        submission.rejection_note = note.map(str::to_owned);
        submission.reviewed_at = Some(TimeStamp::new());
        submission.reviewed_by = Some(reviewer.to_owned());

        let mut batch = Batch::default();
        stage(&mut batch, &submission.id, &submission)?;
        self.record_event(
            &mut batch,
            &submission.id,
            reviewer,
            EventKind::DocumentRejected { reason },
        )?;
        self.store.apply(batch)?;

        warn!(submission = %submission.id, reason = ?reason, "document rejected");
        Ok(submission)
    }

    fn propagate_confirmed_expiry(
        &self,
        batch: &mut Batch,
        submission: &DocumentSubmission,
        confirmed_expiry: CalDate,
    ) -> Result<(), WorkflowError> {
        match &submission.subject {
            Subject::Driver { id } => {
                let mut driver: Driver = self.store.load(id)?;
                match submission.category {
                    DocumentCategory::License => driver.license_expiry = Some(confirmed_expiry),
                    DocumentCategory::Src => driver.record_certificate_expiry(
                        CertificateKind::Src,
                        confirmed_expiry,
                        &submission.id,
                        CalDate::today(),
                    ),
                    DocumentCategory::Cpc => driver.record_certificate_expiry(
                        CertificateKind::Cpc,
                        confirmed_expiry,
                        &submission.id,
                        CalDate::today(),
                    ),
                    DocumentCategory::CompulsoryInsurance
                    | DocumentCategory::ComprehensiveInsurance
                    | DocumentCategory::Inspection => {
                        return Err(WorkflowError::missing(&["subject"]));
                    }
                }
                stage(batch, id, &driver)?;
            }
            Subject::Truck { id } => {
                let mut truck: Truck = self.store.load(id)?;
                match submission.category {
                    DocumentCategory::CompulsoryInsurance => {
                        truck.compulsory_insurance_expiry = Some(confirmed_expiry)
                    }
                    DocumentCategory::ComprehensiveInsurance => {
                        truck.comprehensive_insurance_expiry = Some(confirmed_expiry)
                    }
                    DocumentCategory::Inspection => {
                        truck.inspection_expiry = Some(confirmed_expiry)
                    }
                    DocumentCategory::License | DocumentCategory::Src | DocumentCategory::Cpc => {
                        return Err(WorkflowError::missing(&["subject"]));
                    }
                }
                stage(batch, id, &truck)?;
            }
        }
        Ok(())
    }

    // TRUCK ASSIGNMENT WORKFLOW

    /// File a driver's request for a truck. One pending request per driver.
    pub fn request_truck_assignment(
        &self,
        driver_id: &str,
        preferred_truck_id: &str,
    ) -> Result<TruckAssignmentRequest, WorkflowError> {
        let _guard = self.lock();

        let driver: Driver = self.store.load(driver_id)?;
        let preferred: Truck = self.store.load(preferred_truck_id)?;

        let requests: Vec<TruckAssignmentRequest> = self.store.scan(store::REQUESTS)?;
        if requests
            .iter()
            .any(|r| r.driver_id == driver_id && r.is_pending())
        {
            return Err(WorkflowError::DuplicateRequest {
                driver_id: driver_id.to_owned(),
            });
        }

        let request = TruckAssignmentRequest::new(&driver, &preferred);

        let mut batch = Batch::default();
        stage(&mut batch, &request.id, &request)?;
        self.record_event(
            &mut batch,
            &request.id,
            driver_id,
            EventKind::AssignmentRequested {
                preferred_truck_id: preferred_truck_id.to_owned(),
            },
        )?;
        self.store.apply(batch)?;

        debug!(request = %request.id, driver = driver_id, "truck assignment requested");
        Ok(request)
    }

    /// Approve a pending request, pairing driver and truck reciprocally. The
    /// assigned truck may differ from the preferred one but must be
    /// unassigned and out of maintenance.
    pub fn approve_truck_request(
        &self,
        request_id: &str,
        assigned_truck_id: &str,
    ) -> Result<TruckAssignmentRequest, WorkflowError> {
        let _guard = self.lock();

        let mut request: TruckAssignmentRequest = self.store.load(request_id)?;
        if !request.is_pending() {
            return Err(WorkflowError::invalid_transition(request_id, request.status));
        }

        let trucks: Vec<Truck> = self.store.scan(store::TRUCKS)?;
        if !trucks.iter().any(Truck::is_unassigned) {
            return Err(WorkflowError::NoAvailableTrucks);
        }

        let mut truck: Truck = self.store.load(assigned_truck_id)?;
        if !truck.is_unassigned() || truck.status == TruckStatus::Maintenance {
            return Err(WorkflowError::missing(&["assigned_truck_id"]));
        }
        let mut driver: Driver = self.store.load(&request.driver_id)?;

        request.status = RequestStatus::Approved;
        request.assigned_truck_id = Some(truck.id.clone());
        request.assigned_truck_plate = Some(truck.plate_number.clone());
        request.reviewed_at = Some(TimeStamp::new());

        driver.assigned_truck_id = Some(truck.id.clone());
        driver.assigned_truck_plate = Some(truck.plate_number.clone());
        truck.assigned_driver_id = Some(driver.id.clone());
        truck.assigned_driver_name = Some(driver.name.clone());
        // an assigned truck is no longer offered as available
        if truck.status == TruckStatus::Available {
            truck.status = TruckStatus::InTransit;
        }

        let mut batch = Batch::default();
        stage(&mut batch, &request.id, &request)?;
        stage(&mut batch, &driver.id, &driver)?;
        stage(&mut batch, &truck.id, &truck)?;
        self.record_event(
            &mut batch,
            &request.id,
            MANAGER,
            EventKind::AssignmentApproved {
                truck_id: truck.id.clone(),
            },
        )?;
        self.store.apply(batch)?;

        info!(
            request = %request.id,
            driver = %driver.id,
            truck = %truck.id,
            "truck assignment approved"
        );
        Ok(request)
    }

    /// Reject a pending request. The driver must always be told why.
    pub fn reject_truck_request(
        &self,
        request_id: &str,
        note: &str,
    ) -> Result<TruckAssignmentRequest, WorkflowError> {
        let _guard = self.lock();

        let mut request: TruckAssignmentRequest = self.store.load(request_id)?;
        if !request.is_pending() {
            return Err(WorkflowError::invalid_transition(request_id, request.status));
        }
        if note.trim().is_empty() {
            return Err(WorkflowError::missing(&["rejection_note"]));
        }

        request.status = RequestStatus::Rejected;
        request.rejection_note = Some(note.trim().to_owned());
        request.reviewed_at = Some(TimeStamp::new());

        let mut batch = Batch::default();
        stage(&mut batch, &request.id, &request)?;
        self.record_event(&mut batch, &request.id, MANAGER, EventKind::AssignmentRejected)?;
        self.store.apply(batch)?;

        warn!(request = %request.id, "truck assignment rejected");
        Ok(request)
    }

    // TRIP LIFECYCLE

    /// Create a planned trip from a manager-filled draft.
    pub fn create_trip(&self, draft: TripDraft) -> Result<Trip, WorkflowError> {
        let _guard = self.lock();

        let trip = draft.build()?;

        let mut batch = Batch::default();
        stage(&mut batch, &trip.id, &trip)?;
        self.record_event(&mut batch, &trip.id, MANAGER, EventKind::TripCreated)?;
        self.store.apply(batch)?;

        debug!(trip = %trip.id, "planned trip created");
        Ok(trip)
    }

    /// Create a POD-first trip: delivery documents arrive before any
    /// administrative fields. The trip starts at `Delivered`.
    pub fn create_pod_trip(
        &self,
        driver_id: &str,
        destination: &str,
        documents: Vec<DeliveryDocument>,
    ) -> Result<Trip, WorkflowError> {
        let _guard = self.lock();

        let mut missing = Vec::new();
        if documents.is_empty() || documents.len() > self.config.max_delivery_documents {
            missing.push("delivery_documents");
        }
        if destination.trim().is_empty() {
            missing.push("destination");
        }
        if !missing.is_empty() {
            return Err(WorkflowError::missing(&missing));
        }

        let driver: Driver = self.store.load(driver_id)?;
        let document_count = documents.len() as u32;
        let trip = Trip::pod_first(driver_id, &driver.name, destination.trim(), documents);

        let mut batch = Batch::default();
        stage(&mut batch, &trip.id, &trip)?;
        self.record_event(
            &mut batch,
            &trip.id,
            driver_id,
            EventKind::TripDelivered { document_count },
        )?;
        self.store.apply(batch)?;

        info!(trip = %trip.id, driver = driver_id, "delivery evidenced ahead of trip details");
        Ok(trip)
    }

    /// A driver takes an open trip, pairing themselves and a chosen truck
    /// with it. `Created` to `InProgress`.
    pub fn assign_trip(
        &self,
        trip_id: &str,
        driver_id: &str,
        truck_id: &str,
    ) -> Result<Trip, WorkflowError> {
        let _guard = self.lock();

        let mut trip: Trip = self.store.load(trip_id)?;
        if trip.status != TripStatus::Created {
            return Err(WorkflowError::invalid_transition(trip_id, trip.status));
        }

        let mut driver: Driver = self.store.load(driver_id)?;
        if driver.status == DriverStatus::OnTrip {
            return Err(WorkflowError::missing(&["driver_id"]));
        }
        let mut truck: Truck = self.store.load(truck_id)?;
        if truck.status != TruckStatus::Available {
            return Err(WorkflowError::missing(&["truck_id"]));
        }

        trip.driver_id = Some(driver.id.clone());
        trip.driver_name = Some(driver.name.clone());
        trip.truck_id = Some(truck.id.clone());
        trip.truck_plate = Some(truck.plate_number.clone());
        trip.status = TripStatus::InProgress;
        trip.started_at = Some(TimeStamp::new());

        driver.status = DriverStatus::OnTrip;
        truck.status = TruckStatus::InTransit;
        truck.current_trip_id = Some(trip.id.clone());

        let mut batch = Batch::default();
        stage(&mut batch, &trip.id, &trip)?;
        stage(&mut batch, &driver.id, &driver)?;
        stage(&mut batch, &truck.id, &truck)?;
        self.record_event(
            &mut batch,
            &trip.id,
            driver_id,
            EventKind::TripStarted {
                driver_id: driver.id.clone(),
                truck_id: truck.id.clone(),
            },
        )?;
        self.store.apply(batch)?;

        info!(trip = %trip.id, driver = %driver.id, truck = %truck.id, "trip started");
        Ok(trip)
    }

    /// Attach proof-of-delivery documents, moving the trip to `Delivered`.
    pub fn upload_delivery_documents(
        &self,
        trip_id: &str,
        documents: Vec<DeliveryDocument>,
    ) -> Result<Trip, WorkflowError> {
        let _guard = self.lock();

        let mut trip: Trip = self.store.load(trip_id)?;
        if trip.status != TripStatus::InProgress {
            return Err(WorkflowError::invalid_transition(trip_id, trip.status));
        }
        let total = trip.delivery_documents.len() + documents.len();
        if documents.is_empty() || total > self.config.max_delivery_documents {
            return Err(WorkflowError::missing(&["delivery_documents"]));
        }

        trip.delivery_documents.extend(documents);
        trip.status = TripStatus::Delivered;
        trip.delivered_at = Some(TimeStamp::new());

        let actor = trip.driver_id.clone().unwrap_or_else(|| MANAGER.to_owned());
        let mut batch = Batch::default();
        stage(&mut batch, &trip.id, &trip)?;
        self.record_event(
            &mut batch,
            &trip.id,
            &actor,
            EventKind::TripDelivered {
                document_count: total as u32,
            },
        )?;
        self.store.apply(batch)?;

        info!(trip = %trip.id, documents = total, "trip delivered");
        Ok(trip)
    }

    /// Confirm the delivery documents are legible and correct. Independent of
    /// manager approval; both gates must pass before invoicing.
    pub fn confirm_documents(&self, trip_id: &str) -> Result<Trip, WorkflowError> {
        let _guard = self.lock();

        let mut trip: Trip = self.store.load(trip_id)?;
        if !matches!(trip.status, TripStatus::Delivered | TripStatus::Approved)
            || trip.documents_confirmed
        {
            return Err(WorkflowError::invalid_transition(trip_id, trip.status));
        }
        if trip.delivery_documents.is_empty() {
            return Err(WorkflowError::missing(&["delivery_documents"]));
        }

        trip.documents_confirmed = true;

        let mut batch = Batch::default();
        stage(&mut batch, &trip.id, &trip)?;
        self.record_event(&mut batch, &trip.id, MANAGER, EventKind::DocumentsConfirmed)?;
        self.store.apply(batch)?;

        debug!(trip = %trip.id, "delivery documents confirmed");
        Ok(trip)
    }

    /// Manager approval, `Delivered` to `Approved`. Reports every missing
    /// precondition by name so the caller can direct the user to fix exactly
    /// those fields.
    pub fn approve_trip(&self, trip_id: &str) -> Result<Trip, WorkflowError> {
        let _guard = self.lock();

        let mut trip: Trip = self.store.load(trip_id)?;
        if trip.status != TripStatus::Delivered {
            return Err(WorkflowError::invalid_transition(trip_id, trip.status));
        }
        let blockers = trip.approval_blockers();
        if !blockers.is_empty() {
            return Err(WorkflowError::missing(&blockers));
        }

        trip.status = TripStatus::Approved;
        trip.approved_by_manager = true;
        trip.approved_at = Some(TimeStamp::new());
        // in the planned flow the documents were attached and checked as part
        // of this same action; POD-first trips confirm separately
        if trip.is_planned {
            trip.documents_confirmed = true;
        }

        let mut batch = Batch::default();
        stage(&mut batch, &trip.id, &trip)?;
        self.record_event(&mut batch, &trip.id, MANAGER, EventKind::TripApproved)?;
        self.store.apply(batch)?;

        info!(trip = %trip.id, "trip approved by manager");
        Ok(trip)
    }

    /// Fill in administrative fields the driver could not know. Legal until
    /// the trip is approved.
    pub fn update_trip_details(
        &self,
        trip_id: &str,
        update: TripDetailsUpdate,
    ) -> Result<Trip, WorkflowError> {
        let _guard = self.lock();

        let mut trip: Trip = self.store.load(trip_id)?;
        if matches!(
            trip.status,
            TripStatus::Approved | TripStatus::Invoiced | TripStatus::Cancelled
        ) {
            return Err(WorkflowError::invalid_transition(trip_id, trip.status));
        }

        if let Some((client_id, client_name)) = update.client {
            self.store.load::<Client>(&client_id)?;
            trip.client_id = Some(client_id);
            trip.client_name = Some(client_name);
        }
        if let Some((truck_id, truck_plate)) = update.truck {
            self.store.load::<Truck>(&truck_id)?;
            trip.truck_id = Some(truck_id);
            trip.truck_plate = Some(truck_plate);
        }
        if let Some(cargo) = update.cargo_description {
            trip.cargo_description = Some(cargo);
        }
        if let Some(revenue) = update.revenue {
            trip.revenue = Some(revenue);
        }
        if let Some(expenses) = update.expenses {
            trip.expenses = expenses;
        }

        let mut batch = Batch::default();
        stage(&mut batch, &trip.id, &trip)?;
        self.record_event(&mut batch, &trip.id, MANAGER, EventKind::TripDetailsUpdated)?;
        self.store.apply(batch)?;

        debug!(trip = %trip.id, "trip details updated");
        Ok(trip)
    }

    /// Cancel a trip that has not been delivered yet, releasing its driver
    /// and truck in the same step.
    pub fn cancel_trip(&self, trip_id: &str) -> Result<Trip, WorkflowError> {
        let _guard = self.lock();

        let mut trip: Trip = self.store.load(trip_id)?;
        if !trip.can_cancel() {
            return Err(WorkflowError::invalid_transition(trip_id, trip.status));
        }

        let was_in_progress = trip.status == TripStatus::InProgress;
        trip.status = TripStatus::Cancelled;

        let mut batch = Batch::default();
        if was_in_progress {
            if let Some(driver_id) = &trip.driver_id {
                let mut driver: Driver = self.store.load(driver_id)?;
                driver.status = DriverStatus::Available;
                stage(&mut batch, driver_id, &driver)?;
            }
            if let Some(truck_id) = &trip.truck_id {
                let mut truck: Truck = self.store.load(truck_id)?;
                truck.status = TruckStatus::Available;
                truck.current_trip_id = None;
                stage(&mut batch, truck_id, &truck)?;
            }
        }
        stage(&mut batch, &trip.id, &trip)?;
        self.record_event(&mut batch, &trip.id, MANAGER, EventKind::TripCancelled)?;
        self.store.apply(batch)?;

        warn!(trip = %trip.id, "trip cancelled");
        Ok(trip)
    }

    // INVOICING

    /// Group approved, uninvoiced trips of a single client into an invoice
    /// and flip them to `Invoiced` atomically with the invoice itself.
    pub fn build_invoice(&self, trip_ids: &[String]) -> Result<Invoice, WorkflowError> {
        let _guard = self.lock();

        if trip_ids.is_empty() {
            return Err(WorkflowError::missing(&["trip_ids"]));
        }
        let mut seen = std::collections::HashSet::new();
        if !trip_ids.iter().all(|id| seen.insert(id)) {
            return Err(WorkflowError::missing(&["trip_ids"]));
        }

        let mut trips = Vec::with_capacity(trip_ids.len());
        for id in trip_ids {
            let trip: Trip = self.store.load(id)?;
            if !trip.invoice_ready() {
                return Err(WorkflowError::invalid_transition(id, trip.status));
            }
            trips.push(trip);
        }

        let Some(client_id) = trips[0].client_id.clone() else {
            return Err(WorkflowError::missing(&["client"]));
        };
        let client_name = trips[0].client_name.clone().unwrap_or_default();
        if let Some(stray) = trips
            .iter()
            .find(|t| t.client_id.as_deref() != Some(client_id.as_str()))
        {
            return Err(WorkflowError::MixedClient {
                trip_id: stray.id.clone(),
            });
        }

        let amount: u64 = trips.iter().filter_map(|t| t.revenue).sum();
        let invoice = Invoice::new(
            &client_id,
            &client_name,
            trip_ids.to_vec(),
            amount,
            CalDate::today(),
            self.config.invoice_due_days,
        );

        let mut batch = Batch::default();
        for mut trip in trips {
            trip.status = TripStatus::Invoiced;
            trip.invoiced = true;
            stage(&mut batch, &trip.id, &trip)?;
        }
        stage(&mut batch, &invoice.id, &invoice)?;
        self.record_event(
            &mut batch,
            &invoice.id,
            MANAGER,
            EventKind::InvoiceIssued {
                amount,
                trip_count: trip_ids.len() as u32,
            },
        )?;
        self.store.apply(batch)?;

        info!(
            invoice = %invoice.id,
            client = %client_id,
            amount,
            trips = trip_ids.len(),
            "invoice issued"
        );
        Ok(invoice)
    }

    fn record_event(
        &self,
        batch: &mut Batch,
        entity_id: &str,
        actor: &str,
        kind: EventKind,
    ) -> Result<(), WorkflowError> {
        let event = WorkflowEvent::new(entity_id, actor, kind);
        let (key, cbor) = event.build()?;
        batch.insert(key.as_bytes(), cbor);
        Ok(())
    }
}
