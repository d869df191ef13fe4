//! Driver requests to be paired with a truck.

use crate::fleet::{Driver, Truck};
use crate::utils::{TimeStamp, new_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum RequestStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Approved,
    #[n(2)]
    Rejected,
}

/// A single request. Reviewed exactly once: pending to approved or rejected,
/// immutable thereafter. The assigned truck may differ from the preferred one.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct TruckAssignmentRequest {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub driver_id: String,
    #[n(2)]
    pub driver_name: String,
    #[n(3)]
    pub preferred_truck_id: String,
    #[n(4)]
    pub preferred_truck_plate: String,
    #[n(5)]
    pub status: RequestStatus,
    #[n(6)]
    pub assigned_truck_id: Option<String>,
    #[n(7)]
    pub assigned_truck_plate: Option<String>,
    #[n(8)]
    pub rejection_note: Option<String>,
    #[n(9)]
    pub requested_at: TimeStamp,
    #[n(10)]
    pub reviewed_at: Option<TimeStamp>,
}

impl TruckAssignmentRequest {
    pub fn new(driver: &Driver, preferred: &Truck) -> Self {
        Self {
            id: new_id("req_"),
            driver_id: driver.id.clone(),
            driver_name: driver.name.clone(),
            preferred_truck_id: preferred.id.clone(),
            preferred_truck_plate: preferred.plate_number.clone(),
            status: RequestStatus::Pending,
            assigned_truck_id: None,
            assigned_truck_plate: None,
            rejection_note: None,
            requested_at: TimeStamp::new(),
            reviewed_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_starts_pending_with_denormalized_names() {
        let driver = Driver::new("Ali Demir", "A789012", "C");
        let truck = Truck::new("34 DEF 456", "refrigerated");

        let request = TruckAssignmentRequest::new(&driver, &truck);

        assert!(request.is_pending());
        assert_eq!(request.driver_name, "Ali Demir");
        assert_eq!(request.preferred_truck_plate, "34 DEF 456");
        assert!(request.assigned_truck_id.is_none());
        assert!(request.id.starts_with("req_1"));
    }
}
