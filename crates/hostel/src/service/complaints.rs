use std::str::FromStr as _;

use bson::oid::ObjectId;
use log::info;
use model::{
    complaint::{Complaint, ComplaintDraft, ComplaintStatus, ComplaintView},
    errors::ValidationError,
};
use storage::{ComplaintQuery, StoreError};
use thiserror::Error;

use super::{log_store_error, Store};

#[derive(Clone)]
pub struct Complaints {
    store: Store,
}

impl Complaints {
    pub(crate) fn new(store: Store) -> Self {
        Complaints { store }
    }

    pub async fn submit(&self, draft: &ComplaintDraft) -> Result<Complaint, ComplaintError> {
        let complaint = draft.validate()?;
        if self
            .store
            .call(self.store.find_student(complaint.student_id))
            .await?
            .is_none()
        {
            return Err(ComplaintError::StudentNotFound);
        }
        info!(
            "new {:?} complaint from {}",
            complaint.category, complaint.student_id
        );
        self.store
            .call(self.store.insert_complaint(complaint.clone()))
            .await?;
        Ok(complaint)
    }

    pub async fn list_complaints(&self) -> Vec<ComplaintView> {
        self.find_or_empty(&ComplaintQuery::default()).await
    }

    pub async fn student_complaints(&self, student_id: ObjectId) -> Vec<ComplaintView> {
        self.find_or_empty(&ComplaintQuery {
            student: Some(student_id),
            status: None,
        })
        .await
    }

    pub async fn try_list_complaints(
        &self,
        query: &ComplaintQuery,
    ) -> Result<Vec<ComplaintView>, StoreError> {
        self.store.call(self.store.find_complaints(query)).await
    }

    async fn find_or_empty(&self, query: &ComplaintQuery) -> Vec<ComplaintView> {
        match self.try_list_complaints(query).await {
            Ok(complaints) => complaints,
            Err(err) => {
                log_store_error(
                    "list_complaints",
                    format_args!("student={:?} status={:?}", query.student, query.status),
                    &err,
                );
                vec![]
            }
        }
    }

    pub async fn set_status(&self, complaint_id: &str, status: &str) -> Result<(), ComplaintError> {
        let id = ObjectId::parse_str(complaint_id.trim())
            .map_err(|_| ComplaintError::NotFound)?;
        let status = ComplaintStatus::from_str(status.trim())?;
        if self
            .store
            .call(self.store.set_complaint_status(id, status))
            .await?
        {
            info!("complaint {} is now {}", id, status.as_str());
            Ok(())
        } else {
            Err(ComplaintError::NotFound)
        }
    }
}

#[derive(Debug, Error)]
pub enum ComplaintError {
    #[error("{0}")]
    Invalid(#[from] ValidationError),
    #[error("Student not found. Invalid student ID.")]
    StudentNotFound,
    #[error("Complaint not found.")]
    NotFound,
    #[error("Failed to save complaint, please try again later.")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use model::{complaint::ComplaintCategory, student::NOT_AVAILABLE};

    use super::*;
    use crate::testing::{hostel, student};

    fn draft(student_id: &str, category: &str, description: &str) -> ComplaintDraft {
        ComplaintDraft {
            student_id: student_id.to_owned(),
            category: category.to_owned(),
            description: description.to_owned(),
        }
    }

    #[tokio::test]
    async fn test_submit_and_list() {
        let (hostel, _) = hostel();
        let asha = student(&hostel, "Asha Rao", "asha@example.com", "111111111111").await;
        let complaint = hostel
            .complaints
            .submit(&draft(&asha.to_hex(), "Mess", "Dinner was served cold again"))
            .await
            .unwrap();
        assert_eq!(complaint.status, ComplaintStatus::Pending);
        assert_eq!(complaint.category, ComplaintCategory::Mess);

        let views = hostel.complaints.list_complaints().await;
        assert_eq!(views.len(), 1);
        let student = views[0].student.as_ref().unwrap();
        assert_eq!(student.display_name(), "Asha Rao");
        assert_eq!(hostel.complaints.student_complaints(asha).await.len(), 1);
        assert!(hostel
            .complaints
            .student_complaints(ObjectId::new())
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_submit_validation() {
        let (hostel, _) = hostel();
        let asha = student(&hostel, "Asha Rao", "asha@example.com", "111111111111").await;

        let err = hostel
            .complaints
            .submit(&draft("bad", "Mess", "Dinner was served cold again"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ComplaintError::Invalid(ValidationError::InvalidStudentId(_))
        ));

        let err = hostel
            .complaints
            .submit(&draft(&asha.to_hex(), "Laundry", "Machines are broken"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ComplaintError::Invalid(ValidationError::InvalidCategory(_))
        ));

        let err = hostel
            .complaints
            .submit(&draft(&asha.to_hex(), "Noise", "Too loud"))
            .await
            .unwrap_err();
        assert!(matches!(err, ComplaintError::Invalid(ValidationError::Fields(_))));

        let err = hostel
            .complaints
            .submit(&draft(
                &ObjectId::new().to_hex(),
                "Noise",
                "Loud music after midnight",
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, ComplaintError::StudentNotFound));
        assert!(hostel.complaints.list_complaints().await.is_empty());
    }

    #[tokio::test]
    async fn test_deleted_student_keeps_complaint() {
        let (hostel, store) = hostel();
        let asha = student(&hostel, "Asha Rao", "asha@example.com", "111111111111").await;
        hostel
            .complaints
            .submit(&draft(&asha.to_hex(), "Security", "Main gate left open at night"))
            .await
            .unwrap();
        store.remove_student(asha);

        let views = hostel.complaints.list_complaints().await;
        assert_eq!(views.len(), 1);
        assert!(views[0].student.is_none());
        let name = views[0]
            .student
            .as_ref()
            .map(|s| s.display_name())
            .unwrap_or(NOT_AVAILABLE);
        assert_eq!(name, "N/A");
    }

    #[tokio::test]
    async fn test_set_status() {
        let (hostel, _) = hostel();
        let asha = student(&hostel, "Asha Rao", "asha@example.com", "111111111111").await;
        let complaint = hostel
            .complaints
            .submit(&draft(&asha.to_hex(), "Maintenance", "Leaking tap in room 204"))
            .await
            .unwrap();
        let id = complaint.id.to_hex();

        hostel
            .complaints
            .set_status(&id, "In Progress")
            .await
            .unwrap();
        let views = hostel.complaints.list_complaints().await;
        assert_eq!(views[0].complaint.status, ComplaintStatus::InProgress);
        assert!(views[0].complaint.updated_at >= views[0].complaint.created_at);

        assert!(matches!(
            hostel.complaints.set_status(&id, "Closed").await,
            Err(ComplaintError::Invalid(ValidationError::InvalidComplaintStatus(_)))
        ));
        assert!(matches!(
            hostel
                .complaints
                .set_status(&ObjectId::new().to_hex(), "Resolved")
                .await,
            Err(ComplaintError::NotFound)
        ));
    }
}
