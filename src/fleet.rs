//! Trucks, drivers and clients — the entities the workflows act on.

use crate::utils::{CalDate, new_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum TruckStatus {
    #[n(0)]
    Available,
    #[n(1)]
    InTransit,
    #[n(2)]
    Maintenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum DriverStatus {
    #[n(0)]
    Available,
    #[n(1)]
    OnTrip,
    #[n(2)]
    OffDuty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum CertificateKind {
    #[n(0)]
    Src,
    #[n(1)]
    Cpc,
}

impl CertificateKind {
    pub fn label(&self) -> &'static str {
        match self {
            CertificateKind::Src => "SRC certificate",
            CertificateKind::Cpc => "CPC certificate",
        }
    }
}

/// A professional certificate held by a driver.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Certificate {
    #[n(0)]
    pub kind: CertificateKind,
    #[n(1)]
    pub number: String,
    #[n(2)]
    pub issue_date: CalDate,
    #[n(3)]
    pub expiry_date: Option<CalDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Truck {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub plate_number: String,
    #[n(2)]
    pub truck_type: String,
    #[n(3)]
    pub status: TruckStatus,
    #[n(4)]
    pub assigned_driver_id: Option<String>,
    #[n(5)]
    pub assigned_driver_name: Option<String>,
    #[n(6)]
    pub current_trip_id: Option<String>,
    #[n(7)]
    pub compulsory_insurance_expiry: Option<CalDate>,
    #[n(8)]
    pub comprehensive_insurance_expiry: Option<CalDate>,
    #[n(9)]
    pub inspection_expiry: Option<CalDate>,
}

impl Truck {
    pub fn new(plate_number: &str, truck_type: &str) -> Self {
        Self {
            id: new_id("truck_"),
            plate_number: plate_number.to_owned(),
            truck_type: truck_type.to_owned(),
            status: TruckStatus::Available,
            assigned_driver_id: None,
            assigned_driver_name: None,
            current_trip_id: None,
            compulsory_insurance_expiry: None,
            comprehensive_insurance_expiry: None,
            inspection_expiry: None,
        }
    }

    pub fn is_unassigned(&self) -> bool {
        self.assigned_driver_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Driver {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub license_number: String,
    #[n(3)]
    pub license_class: String,
    #[n(4)]
    pub license_expiry: Option<CalDate>,
    #[n(5)]
    pub status: DriverStatus,
    #[n(6)]
    pub assigned_truck_id: Option<String>,
    #[n(7)]
    pub assigned_truck_plate: Option<String>,
    #[n(8)]
    pub certificates: Vec<Certificate>,
}

impl Driver {
    pub fn new(name: &str, license_number: &str, license_class: &str) -> Self {
        Self {
            id: new_id("drv_"),
            name: name.to_owned(),
            license_number: license_number.to_owned(),
            license_class: license_class.to_owned(),
            license_expiry: None,
            status: DriverStatus::Available,
            assigned_truck_id: None,
            assigned_truck_plate: None,
            certificates: Vec::new(),
        }
    }

    pub fn certificate(&self, kind: CertificateKind) -> Option<&Certificate> {
        self.certificates.iter().find(|c| c.kind == kind)
    }

    /// Record a reviewed certificate expiry. When the driver holds no
    /// certificate of this kind yet, one is appended so the confirmed date is
    /// never dropped; `number` then references the reviewed submission.
    pub fn record_certificate_expiry(
        &mut self,
        kind: CertificateKind,
        expiry: CalDate,
        number: &str,
        issue_date: CalDate,
    ) {
        match self.certificates.iter_mut().find(|c| c.kind == kind) {
            Some(cert) => cert.expiry_date = Some(expiry),
            None => self.certificates.push(Certificate {
                kind,
                number: number.to_owned(),
                issue_date,
                expiry_date: Some(expiry),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Client {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub company_name: String,
    #[n(2)]
    pub contact_person: String,
    #[n(3)]
    pub city: String,
}

impl Client {
    pub fn new(company_name: &str, contact_person: &str, city: &str) -> Self {
        Self {
            id: new_id("client_"),
            company_name: company_name.to_owned(),
            contact_person: contact_person.to_owned(),
            city: city.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truck_encoding() {
        let mut truck = Truck::new("34 ABC 123", "tarpaulin");
        truck.inspection_expiry = Some(CalDate::new(2027, 1, 15));

        let encoding = minicbor::to_vec(&truck).unwrap();
        let decode: Truck = minicbor::decode(&encoding).unwrap();

        assert_eq!(truck, decode);
    }

    #[test]
    fn certificate_expiry_updates_in_place() {
        let mut driver = Driver::new("Test Driver", "M123456", "C+E");
        driver.certificates.push(Certificate {
            kind: CertificateKind::Src,
            number: "SRC-2024-001".to_owned(),
            issue_date: CalDate::new(2024, 1, 1),
            expiry_date: Some(CalDate::new(2026, 1, 1)),
        });

        driver.record_certificate_expiry(
            CertificateKind::Src,
            CalDate::new(2028, 1, 1),
            "doc_ignored",
            CalDate::new(2026, 6, 1),
        );

        assert_eq!(driver.certificates.len(), 1);
        assert_eq!(driver.certificates[0].number, "SRC-2024-001");
        assert_eq!(
            driver.certificates[0].expiry_date,
            Some(CalDate::new(2028, 1, 1))
        );
    }

    #[test]
    fn certificate_expiry_appends_when_absent() {
        let mut driver = Driver::new("Test Driver", "M123456", "C+E");

        driver.record_certificate_expiry(
            CertificateKind::Cpc,
            CalDate::new(2028, 1, 1),
            "doc_abc",
            CalDate::new(2026, 6, 1),
        );

        assert_eq!(driver.certificates.len(), 1);
        assert_eq!(driver.certificates[0].kind, CertificateKind::Cpc);
        assert_eq!(driver.certificates[0].number, "doc_abc");
    }
}
