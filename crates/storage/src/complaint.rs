use std::collections::HashMap;

use bson::{doc, oid::ObjectId, Document};
use chrono::Utc;
use futures_util::stream::TryStreamExt as _;
use log::info;
use model::{
    complaint::{Complaint, ComplaintStatus, ComplaintView},
    student::StudentShort,
};
use mongodb::{Collection, Database, IndexModel};

use crate::{session::Db, ComplaintQuery, StoreError};

const COLLECTION: &str = "complaints";

pub(crate) async fn create_indexes(db: &Database) -> Result<(), StoreError> {
    let complaints: Collection<Document> = db.collection(COLLECTION);
    complaints
        .create_index(IndexModel::builder().keys(doc! { "created_at": -1 }).build())
        .await?;
    complaints
        .create_index(IndexModel::builder().keys(doc! { "student_id": 1 }).build())
        .await?;
    Ok(())
}

/// Attaches each complaint's student. Complaints whose student is gone keep
/// `student: None`. Order of `complaints` is preserved.
pub(crate) fn join_students(
    complaints: Vec<Complaint>,
    students: impl IntoIterator<Item = StudentShort>,
) -> Vec<ComplaintView> {
    let by_id = students
        .into_iter()
        .filter_map(|short| short.id.map(|id| (id, short)))
        .collect::<HashMap<_, _>>();
    complaints
        .into_iter()
        .map(|complaint| ComplaintView {
            student: by_id.get(&complaint.student_id).cloned(),
            complaint,
        })
        .collect()
}

#[derive(Clone)]
pub struct ComplaintStore {
    db: Db,
}

impl ComplaintStore {
    pub(crate) fn new(db: Db) -> Self {
        ComplaintStore { db }
    }

    async fn store(&self) -> Result<Collection<Complaint>, StoreError> {
        Ok(self.db.get().await?.collection(COLLECTION))
    }

    pub async fn insert(&self, complaint: Complaint) -> Result<(), StoreError> {
        info!(
            "Inserting complaint {} from {}",
            complaint.id, complaint.student_id
        );
        self.store().await?.insert_one(complaint).await?;
        Ok(())
    }

    pub async fn find(&self, query: &ComplaintQuery) -> Result<Vec<Complaint>, StoreError> {
        let mut filter = doc! {};
        if let Some(student) = query.student {
            filter.insert("student_id", student);
        }
        if let Some(status) = query.status {
            filter.insert("status", status.as_str());
        }
        Ok(self
            .store()
            .await?
            .find(filter)
            .sort(doc! { "created_at": -1 })
            .await?
            .try_collect()
            .await?)
    }

    pub async fn set_status(
        &self,
        id: ObjectId,
        status: ComplaintStatus,
    ) -> Result<bool, StoreError> {
        info!("Setting complaint {} status to {}", id, status.as_str());
        let result = self
            .store()
            .await?
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$set": {
                        "status": status.as_str(),
                        "updated_at": bson::DateTime::from_chrono(Utc::now()),
                    }
                },
            )
            .await?;
        Ok(result.matched_count > 0)
    }
}
