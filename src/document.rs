//! Compliance document submissions and their review outcome.

use crate::utils::{CalDate, TimeStamp, new_id};

/// The closed set of document categories subject to review. Each category
/// targets exactly one subject kind and one expiry field on that subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum DocumentCategory {
    #[n(0)]
    License,
    #[n(1)]
    Src,
    #[n(2)]
    Cpc,
    #[n(3)]
    CompulsoryInsurance,
    #[n(4)]
    ComprehensiveInsurance,
    #[n(5)]
    Inspection,
}

impl DocumentCategory {
    pub fn label(&self) -> &'static str {
        match self {
            DocumentCategory::License => "Driving licence",
            DocumentCategory::Src => "SRC certificate",
            DocumentCategory::Cpc => "CPC certificate",
            DocumentCategory::CompulsoryInsurance => "Compulsory traffic insurance",
            DocumentCategory::ComprehensiveInsurance => "Comprehensive insurance",
            DocumentCategory::Inspection => "Periodic inspection",
        }
    }

    pub fn subject_kind(&self) -> SubjectKind {
        match self {
            DocumentCategory::License | DocumentCategory::Src | DocumentCategory::Cpc => {
                SubjectKind::Driver
            }
            DocumentCategory::CompulsoryInsurance
            | DocumentCategory::ComprehensiveInsurance
            | DocumentCategory::Inspection => SubjectKind::Truck,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectKind {
    Driver,
    Truck,
}

/// The entity a submission renews a document for.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum Subject {
    #[n(0)]
    Driver {
        #[n(0)]
        id: String,
    },
    #[n(1)]
    Truck {
        #[n(0)]
        id: String,
    },
}

impl Subject {
    pub fn id(&self) -> &str {
        match self {
            Subject::Driver { id } | Subject::Truck { id } => id,
        }
    }

    pub fn kind(&self) -> SubjectKind {
        match self {
            Subject::Driver { .. } => SubjectKind::Driver,
            Subject::Truck { .. } => SubjectKind::Truck,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum RejectionReason {
    #[n(0)]
    Blurry,
    #[n(1)]
    WrongType,
    #[n(2)]
    Expired,
    #[n(3)]
    Mismatch,
    #[n(4)]
    Incomplete,
    #[n(5)]
    Other,
}

impl RejectionReason {
    /// `Other` carries no meaning on its own, so the reviewer must explain.
    pub fn requires_note(&self) -> bool {
        matches!(self, RejectionReason::Other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum SubmissionStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Approved,
    #[n(2)]
    Rejected,
}

/// Opaque reference to an uploaded image. The upload collaborator validated
/// size and type; the engine never inspects the bytes behind the handle.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct ImageRef {
    #[n(0)]
    pub handle: String,
    #[n(1)]
    pub content_type: String,
    #[n(2)]
    pub byte_len: u64,
}

/// Snapshot of the document being replaced, kept for side-by-side review.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct PreviousDocument {
    #[n(0)]
    pub image: Option<ImageRef>,
    #[n(1)]
    pub expiry_date: Option<CalDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct DocumentSubmission {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub category: DocumentCategory,
    #[n(2)]
    pub subject: Subject,
    #[n(3)]
    pub subject_name: String,
    #[n(4)]
    pub submitted_by: String,
    #[n(5)]
    pub image: ImageRef,
    #[n(6)]
    pub suggested_expiry: CalDate,
    #[n(7)]
    pub confirmed_expiry: Option<CalDate>,
    #[n(8)]
    pub status: SubmissionStatus,
    #[n(9)]
    pub submitted_at: TimeStamp,
    #[n(10)]
    pub reviewed_at: Option<TimeStamp>,
    #[n(11)]
    pub reviewed_by: Option<String>,
    #[n(12)]
    pub rejection_reason: Option<RejectionReason>,
    #[n(13)]
    pub rejection_note: Option<String>,
    #[n(14)]
    pub previous: Option<PreviousDocument>,
}

impl DocumentSubmission {
    pub fn new(
        category: DocumentCategory,
        subject: Subject,
        subject_name: &str,
        submitted_by: &str,
        image: ImageRef,
        suggested_expiry: CalDate,
        previous: Option<PreviousDocument>,
    ) -> Self {
        Self {
            id: new_id("doc_"),
            category,
            subject,
            subject_name: subject_name.to_owned(),
            submitted_by: submitted_by.to_owned(),
            image,
            suggested_expiry,
            confirmed_expiry: None,
            status: SubmissionStatus::Pending,
            submitted_at: TimeStamp::new(),
            reviewed_at: None,
            reviewed_by: None,
            rejection_reason: None,
            rejection_note: None,
            previous,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == SubmissionStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_image() -> ImageRef {
        ImageRef {
            handle: "img_abc123".to_owned(),
            content_type: "image/jpeg".to_owned(),
            byte_len: 204_800,
        }
    }

    #[test]
    fn submission_starts_pending() {
        let sub = DocumentSubmission::new(
            DocumentCategory::License,
            Subject::Driver {
                id: "drv_1".to_owned(),
            },
            "Mehmet Yilmaz",
            "drv_1",
            sample_image(),
            CalDate::new(2029, 3, 15),
            None,
        );

        assert!(sub.is_pending());
        assert!(sub.confirmed_expiry.is_none());
        assert!(sub.rejection_reason.is_none());
        assert!(sub.id.starts_with("doc_1"));
    }

    #[test]
    fn categories_target_the_right_subject_kind() {
        assert_eq!(DocumentCategory::License.subject_kind(), SubjectKind::Driver);
        assert_eq!(DocumentCategory::Src.subject_kind(), SubjectKind::Driver);
        assert_eq!(DocumentCategory::Cpc.subject_kind(), SubjectKind::Driver);
        assert_eq!(
            DocumentCategory::CompulsoryInsurance.subject_kind(),
            SubjectKind::Truck
        );
        assert_eq!(
            DocumentCategory::ComprehensiveInsurance.subject_kind(),
            SubjectKind::Truck
        );
        assert_eq!(DocumentCategory::Inspection.subject_kind(), SubjectKind::Truck);
    }

    #[test]
    fn only_other_requires_a_note() {
        assert!(RejectionReason::Other.requires_note());
        assert!(!RejectionReason::Blurry.requires_note());
        assert!(!RejectionReason::Expired.requires_note());
    }

    #[test]
    fn submission_encoding() {
        let sub = DocumentSubmission::new(
            DocumentCategory::Inspection,
            Subject::Truck {
                id: "truck_1".to_owned(),
            },
            "34 ABC 123",
            "manager",
            sample_image(),
            CalDate::new(2027, 1, 10),
            Some(PreviousDocument {
                image: None,
                expiry_date: Some(CalDate::new(2026, 1, 10)),
            }),
        );

        let encoding = minicbor::to_vec(&sub).unwrap();
        let decode: DocumentSubmission = minicbor::decode(&encoding).unwrap();

        assert_eq!(sub, decode);
    }
}
