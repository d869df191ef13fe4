//! Property-based tests for trip state derivation
//!
//! The invoicing gates and approval preconditions are plain predicates over
//! the trip record, so proptest can sweep arbitrary field combinations and
//! assert the derived answers agree with the rules. Bugs here would let
//! incomplete trips through to invoicing, which is the one outcome the
//! engine exists to prevent.

use fleet_workflow::{
    document::ImageRef,
    trip::{DeliveryDocument, Trip, TripStatus},
};
use proptest::prelude::*;

fn sample_image() -> ImageRef {
    ImageRef {
        handle: "img_pod".to_owned(),
        content_type: "image/jpeg".to_owned(),
        byte_len: 102_400,
    }
}

fn status_strategy() -> impl Strategy<Value = TripStatus> {
    prop_oneof![
        Just(TripStatus::Created),
        Just(TripStatus::InProgress),
        Just(TripStatus::Delivered),
        Just(TripStatus::Approved),
        Just(TripStatus::Invoiced),
        Just(TripStatus::Cancelled),
    ]
}

/// Strategy for a trip with every approval-relevant field independently
/// present or missing
fn trip_strategy() -> impl Strategy<Value = Trip> {
    (
        (
            any::<bool>(), // client
            any::<bool>(), // driver
            any::<bool>(), // truck
            any::<bool>(), // cargo
            prop::option::of(0u64..100_000),
            0usize..=3, // delivery documents
        ),
        (status_strategy(), any::<bool>(), any::<bool>(), any::<bool>()),
    )
        .prop_map(
            |(
                (has_client, has_driver, has_truck, has_cargo, revenue, doc_count),
                (status, documents_confirmed, approved_by_manager, invoiced),
            )| {
                let docs = (0..doc_count)
                    .map(|i| DeliveryDocument::new(&format!("pod-{i}.jpg"), sample_image()))
                    .collect();
                let mut trip = Trip::pod_first("drv_1", "Mehmet Yilmaz", "Ankara", docs);
                if !has_driver {
                    trip.driver_id = None;
                    trip.driver_name = None;
                }
                if has_client {
                    trip.client_id = Some("client_1".to_owned());
                    trip.client_name = Some("Acme Lojistik".to_owned());
                }
                if has_truck {
                    trip.truck_id = Some("truck_1".to_owned());
                    trip.truck_plate = Some("34 ABC 123".to_owned());
                }
                if has_cargo {
                    trip.cargo_description = Some("steel coils".to_owned());
                }
                trip.revenue = revenue;
                trip.status = status;
                trip.documents_confirmed = documents_confirmed;
                trip.approved_by_manager = approved_by_manager;
                trip.invoiced = invoiced;
                trip
            },
        )
}

proptest! {
    /// Property: a trip is ready to invoice iff it is approved, carries both
    /// gates, and was not invoiced yet - no other combination qualifies
    #[test]
    fn invoice_ready_is_exactly_the_conjunction(trip in trip_strategy()) {
        let expected = trip.status == TripStatus::Approved
            && trip.approved_by_manager
            && trip.documents_confirmed
            && !trip.invoiced;

        prop_assert_eq!(trip.invoice_ready(), expected);
    }

    /// Property: approval blockers name exactly the missing preconditions,
    /// each at most once, in a fixed order
    #[test]
    fn blockers_mirror_the_missing_fields(trip in trip_strategy()) {
        let blockers = trip.approval_blockers();

        prop_assert_eq!(blockers.contains(&"client"), trip.client_id.is_none());
        prop_assert_eq!(blockers.contains(&"driver"), trip.driver_id.is_none());
        prop_assert_eq!(blockers.contains(&"truck"), trip.truck_id.is_none());
        prop_assert_eq!(
            blockers.contains(&"cargo_description"),
            trip.cargo_description.is_none()
        );
        prop_assert_eq!(
            blockers.contains(&"revenue"),
            trip.revenue.is_none_or(|amount| amount == 0)
        );
        prop_assert_eq!(
            blockers.contains(&"delivery_documents"),
            trip.delivery_documents.is_empty()
        );

        let mut deduped = blockers.clone();
        deduped.dedup();
        prop_assert_eq!(blockers, deduped);
    }

    /// Property: cancellation is possible before delivery and never after
    #[test]
    fn cancellation_window_matches_the_status(trip in trip_strategy()) {
        let expected = matches!(trip.status, TripStatus::Created | TripStatus::InProgress);
        prop_assert_eq!(trip.can_cancel(), expected);
    }

    /// Property: trips survive the storage encoding unchanged, whatever
    /// combination of optional fields they carry
    #[test]
    fn trip_storage_roundtrip(trip in trip_strategy()) {
        let encoded = minicbor::to_vec(&trip).unwrap();
        let decoded: Trip = minicbor::decode(&encoded).unwrap();

        prop_assert_eq!(trip, decoded);
    }
}
