//! Expiry warning engine.
//!
//! A pure pass over the current truck/driver snapshot. Nothing here mutates
//! or stores anything; warnings are recomputed on every query.

use crate::fleet::{Driver, Truck};
use crate::utils::CalDate;

/// Fields expiring within this many days produce a warning.
pub const WARNING_WINDOW_DAYS: i64 = 30;
/// Below this many days the warning escalates to an error.
pub const ERROR_THRESHOLD_DAYS: i64 = 7;

// declaration order drives the sort: errors surface before warnings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    InsuranceExpiring,
    InspectionExpiring,
    LicenseExpiring,
    CertificateExpiring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningSubject {
    Truck { id: String },
    Driver { id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
    pub severity: Severity,
    pub subject: WarningSubject,
}

/// Compute compliance warnings against today's date.
pub fn compute_warnings(trucks: &[Truck], drivers: &[Driver]) -> Vec<Warning> {
    compute_warnings_at(trucks, drivers, CalDate::today())
}

/// Compute compliance warnings against an explicit date. Deterministic: the
/// same snapshot and date always yield the same warnings in the same order.
pub fn compute_warnings_at(trucks: &[Truck], drivers: &[Driver], today: CalDate) -> Vec<Warning> {
    compute_warnings_with(trucks, drivers, today, WARNING_WINDOW_DAYS, ERROR_THRESHOLD_DAYS)
}

pub(crate) fn compute_warnings_with(
    trucks: &[Truck],
    drivers: &[Driver],
    today: CalDate,
    window_days: i64,
    error_threshold_days: i64,
) -> Vec<Warning> {
    let mut warnings = Vec::new();

    let days_remaining = |expiry: Option<CalDate>| -> Option<i64> {
        // a null expiry is "not applicable", never "overdue"
        let days = expiry?.days_from(today);
        (0..=window_days).contains(&days).then_some(days)
    };
    let severity_for = |days: i64| {
        if days < error_threshold_days {
            Severity::Error
        } else {
            Severity::Warning
        }
    };

    for truck in trucks {
        let truck_fields = [
            (
                truck.compulsory_insurance_expiry,
                WarningKind::InsuranceExpiring,
                "compulsory insurance",
            ),
            (
                truck.comprehensive_insurance_expiry,
                WarningKind::InsuranceExpiring,
                "comprehensive insurance",
            ),
            (
                truck.inspection_expiry,
                WarningKind::InspectionExpiring,
                "inspection",
            ),
        ];
        for (expiry, kind, label) in truck_fields {
            if let Some(days) = days_remaining(expiry) {
                warnings.push(Warning {
                    kind,
                    message: format!(
                        "{} - {} expires in {} days",
                        truck.plate_number, label, days
                    ),
                    severity: severity_for(days),
                    subject: WarningSubject::Truck {
                        id: truck.id.clone(),
                    },
                });
            }
        }
    }

    for driver in drivers {
        if let Some(days) = days_remaining(driver.license_expiry) {
            warnings.push(Warning {
                kind: WarningKind::LicenseExpiring,
                message: format!("{} - driving licence expires in {} days", driver.name, days),
                severity: severity_for(days),
                subject: WarningSubject::Driver {
                    id: driver.id.clone(),
                },
            });
        }

        for cert in &driver.certificates {
            if let Some(days) = days_remaining(cert.expiry_date) {
                warnings.push(Warning {
                    kind: WarningKind::CertificateExpiring,
                    message: format!(
                        "{} - {} expires in {} days",
                        driver.name,
                        cert.kind.label(),
                        days
                    ),
                    severity: severity_for(days),
                    subject: WarningSubject::Driver {
                        id: driver.id.clone(),
                    },
                });
            }
        }
    }

    // errors first, then message order, so identical inputs render identically
    warnings.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then_with(|| a.message.cmp(&b.message))
    });
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::{Certificate, CertificateKind};

    fn today() -> CalDate {
        CalDate::new(2026, 8, 7)
    }

    #[test]
    fn null_expiries_produce_no_warnings() {
        let truck = Truck::new("34 ABC 123", "tarpaulin");
        let driver = Driver::new("Mehmet Yilmaz", "M123456", "C+E");

        let warnings = compute_warnings_at(&[truck], &[driver], today());

        assert!(warnings.is_empty());
    }

    #[test]
    fn inspection_five_days_out_is_a_single_error() {
        let mut truck = Truck::new("34 ABC 123", "tarpaulin");
        truck.inspection_expiry = Some(today().plus_days(5));

        let warnings = compute_warnings_at(&[truck], &[], today());

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].severity, Severity::Error);
        assert_eq!(warnings[0].kind, WarningKind::InspectionExpiring);
        assert!(warnings[0].message.contains("34 ABC 123"));
    }

    #[test]
    fn severity_boundary_sits_below_seven_days() {
        let mut driver = Driver::new("Ali Demir", "A789012", "C");
        driver.license_expiry = Some(today().plus_days(6));
        let mut other = Driver::new("Hasan Kaya", "H345678", "C");
        other.license_expiry = Some(today().plus_days(7));

        let warnings = compute_warnings_at(&[], &[driver, other], today());

        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].severity, Severity::Error);
        assert!(warnings[0].message.starts_with("Ali Demir"));
        assert_eq!(warnings[1].severity, Severity::Warning);
        assert!(warnings[1].message.starts_with("Hasan Kaya"));
    }

    #[test]
    fn window_excludes_past_and_distant_dates() {
        let mut expired = Truck::new("34 AAA 111", "tarpaulin");
        expired.inspection_expiry = Some(today().plus_days(-1));
        let mut distant = Truck::new("34 BBB 222", "tarpaulin");
        distant.inspection_expiry = Some(today().plus_days(31));
        let mut edge = Truck::new("34 CCC 333", "tarpaulin");
        edge.inspection_expiry = Some(today().plus_days(30));

        let warnings = compute_warnings_at(&[expired, distant, edge], &[], today());

        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("34 CCC 333"));
        assert_eq!(warnings[0].severity, Severity::Warning);
    }

    #[test]
    fn expiring_today_is_an_error() {
        let mut truck = Truck::new("34 ABC 123", "tarpaulin");
        truck.compulsory_insurance_expiry = Some(today());

        let warnings = compute_warnings_at(&[truck], &[], today());

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].severity, Severity::Error);
        assert!(warnings[0].message.contains("expires in 0 days"));
    }

    #[test]
    fn certificates_warn_per_certificate() {
        let mut driver = Driver::new("Mehmet Yilmaz", "M123456", "C+E");
        driver.certificates.push(Certificate {
            kind: CertificateKind::Src,
            number: "SRC-2024-001".to_owned(),
            issue_date: CalDate::new(2024, 1, 1),
            expiry_date: Some(today().plus_days(10)),
        });
        driver.certificates.push(Certificate {
            kind: CertificateKind::Cpc,
            number: "CPC-2023-001".to_owned(),
            issue_date: CalDate::new(2023, 1, 1),
            expiry_date: Some(today().plus_days(3)),
        });

        let warnings = compute_warnings_at(&[], &[driver], today());

        assert_eq!(warnings.len(), 2);
        // the CPC certificate is closer, so it surfaces first as an error
        assert!(warnings[0].message.contains("CPC certificate"));
        assert_eq!(warnings[0].severity, Severity::Error);
        assert!(warnings[1].message.contains("SRC certificate"));
        assert_eq!(warnings[1].severity, Severity::Warning);
    }
}
