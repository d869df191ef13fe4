//! Invoices batched out of approved trips.

use crate::utils::{CalDate, new_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum InvoiceStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Paid,
    #[n(2)]
    Overdue,
}

/// Built only by the invoice batch builder; every referenced trip shares one
/// client and the amount is the sum of their revenues. Amounts are integer
/// kurus.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Invoice {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub client_id: String,
    #[n(2)]
    pub client_name: String,
    #[n(3)]
    pub trip_ids: Vec<String>,
    #[n(4)]
    pub amount: u64,
    #[n(5)]
    pub status: InvoiceStatus,
    #[n(6)]
    pub issue_date: CalDate,
    #[n(7)]
    pub due_date: CalDate,
    #[n(8)]
    pub paid_date: Option<CalDate>,
}

impl Invoice {
    pub(crate) fn new(
        client_id: &str,
        client_name: &str,
        trip_ids: Vec<String>,
        amount: u64,
        issue_date: CalDate,
        due_days: i64,
    ) -> Self {
        Self {
            id: new_id("inv_"),
            client_id: client_id.to_owned(),
            client_name: client_name.to_owned(),
            trip_ids,
            amount,
            status: InvoiceStatus::Pending,
            issue_date,
            due_date: issue_date.plus_days(due_days),
            paid_date: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_due_date_follows_issue_date() {
        let issue = CalDate::new(2026, 8, 7);
        let invoice = Invoice::new(
            "client_1",
            "Acme Lojistik",
            vec!["trip_a".to_owned(), "trip_b".to_owned()],
            35_000_00,
            issue,
            30,
        );

        assert_eq!(invoice.status, InvoiceStatus::Pending);
        assert_eq!(invoice.due_date, issue.plus_days(30));
        assert!(invoice.paid_date.is_none());
        assert!(invoice.id.starts_with("inv_1"));
    }
}
