use bson::{doc, oid::ObjectId, Document};
use chrono::{DateTime, Utc};
use futures_util::stream::TryStreamExt as _;
use log::{debug, info};
use model::{
    attendance::{AttendanceRecord, AttendanceStatus, UpsertOutcome},
    ids::DayId,
};
use mongodb::{
    options::{IndexOptions, UpdateOptions},
    Collection, Database, IndexModel,
};

use crate::{session::Db, StoreError, StudentScope};

pub(crate) const COLLECTION: &str = "attendance";

pub(crate) async fn create_indexes(db: &Database) -> Result<(), StoreError> {
    let attendance: Collection<Document> = db.collection(COLLECTION);
    attendance
        .create_index(
            IndexModel::builder()
                .keys(doc! { "student_id": 1, "date": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
        )
        .await?;
    attendance
        .create_index(IndexModel::builder().keys(doc! { "date": 1 }).build())
        .await?;
    Ok(())
}

/// Attendance rows keyed by (student_id, date). Rows are read as raw
/// documents so one malformed row does not fail a whole month.
#[derive(Clone)]
pub struct AttendanceStore {
    db: Db,
}

impl AttendanceStore {
    pub(crate) fn new(db: Db) -> Self {
        AttendanceStore { db }
    }

    async fn store(&self) -> Result<Collection<Document>, StoreError> {
        Ok(self.db.get().await?.collection(COLLECTION))
    }

    pub async fn find(
        &self,
        scope: StudentScope,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut filter = doc! {
            "date": {
                "$gte": bson::DateTime::from_chrono(from),
                "$lt": bson::DateTime::from_chrono(to),
            }
        };
        if let StudentScope::One(id) = scope {
            filter.insert("student_id", id);
        }

        let docs: Vec<Document> = self
            .store()
            .await?
            .find(filter)
            .sort(doc! { "date": 1 })
            .await?
            .try_collect()
            .await?;

        let total = docs.len();
        let records = docs
            .iter()
            .filter_map(record_from_document)
            .collect::<Vec<_>>();
        if records.len() != total {
            debug!(
                "skipped {} malformed attendance rows in [{}, {})",
                total - records.len(),
                from,
                to
            );
        }
        Ok(records)
    }

    pub async fn upsert(
        &self,
        student_id: ObjectId,
        day: DayId,
        status: AttendanceStatus,
    ) -> Result<UpsertOutcome, StoreError> {
        info!("Marking {} as {} on {}", student_id, status.as_str(), day);
        let result = self
            .store()
            .await?
            .update_one(
                doc! { "student_id": student_id, "date": bson::DateTime::from_chrono(day.id()) },
                doc! { "$set": { "status": status.as_str() } },
            )
            .with_options(UpdateOptions::builder().upsert(true).build())
            .await?;

        Ok(if result.upserted_id.is_some() {
            UpsertOutcome::Inserted
        } else if result.modified_count > 0 {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Unchanged
        })
    }
}

/// `None` when any of the three fields is missing or has the wrong type.
pub(crate) fn record_from_document(doc: &Document) -> Option<AttendanceRecord> {
    let student_id = doc.get_object_id("student_id").ok()?;
    let date = doc.get_datetime("date").ok()?.to_chrono();
    let status = doc.get_str("status").ok()?.parse().ok()?;
    Some(AttendanceRecord {
        student_id,
        date,
        status,
    })
}
