use bson::{doc, oid::ObjectId, Document};
use futures_util::stream::TryStreamExt as _;
use log::info;
use model::student::{Student, StudentShort};
use mongodb::{options::IndexOptions, Collection, Database, IndexModel};

use crate::{session::Db, StoreError, StudentQuery, StudentSort};

pub(crate) const COLLECTION: &str = "students";

pub(crate) async fn create_indexes(db: &Database) -> Result<(), StoreError> {
    let students: Collection<Document> = db.collection(COLLECTION);
    for key in ["email", "national_id"] {
        let mut keys = Document::new();
        keys.insert(key, 1);
        students
            .create_index(
                IndexModel::builder()
                    .keys(keys)
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
            )
            .await?;
    }
    students
        .create_index(IndexModel::builder().keys(doc! { "created_at": -1 }).build())
        .await?;
    Ok(())
}

#[derive(Clone)]
pub struct StudentStore {
    db: Db,
}

impl StudentStore {
    pub(crate) fn new(db: Db) -> Self {
        StudentStore { db }
    }

    async fn students(&self) -> Result<Collection<Student>, StoreError> {
        Ok(self.db.get().await?.collection(COLLECTION))
    }

    async fn raw(&self) -> Result<Collection<Document>, StoreError> {
        Ok(self.db.get().await?.collection(COLLECTION))
    }

    pub async fn find(&self, query: &StudentQuery) -> Result<Vec<Student>, StoreError> {
        let students = self.students().await?;
        let mut find = students
            .find(search_filter(query))
            .sort(sort_doc(query.sort));
        if let Some(limit) = query.limit {
            find = find.limit(limit as i64);
        }
        Ok(find.await?.try_collect().await?)
    }

    pub async fn roster(&self, query: &StudentQuery) -> Result<Vec<StudentShort>, StoreError> {
        let students = self.raw().await?;
        let mut find = students
            .find(search_filter(query))
            .projection(doc! { "_id": 1, "full_name": 1, "email": 1 })
            .sort(sort_doc(query.sort));
        if let Some(limit) = query.limit {
            find = find.limit(limit as i64);
        }
        let docs: Vec<Document> = find.await?.try_collect().await?;
        Ok(docs.iter().map(short_from_document).collect())
    }

    pub async fn shorts_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<StudentShort>, StoreError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let docs: Vec<Document> = self
            .raw()
            .await?
            .find(doc! { "_id": { "$in": ids.to_vec() } })
            .projection(doc! { "_id": 1, "full_name": 1, "email": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(docs.iter().map(short_from_document).collect())
    }

    pub async fn get(&self, id: ObjectId) -> Result<Option<Student>, StoreError> {
        Ok(self.students().await?.find_one(doc! { "_id": id }).await?)
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<Student>, StoreError> {
        Ok(self
            .students()
            .await?
            .find_one(doc! { "email": email })
            .await?)
    }

    pub async fn count(&self, query: &StudentQuery) -> Result<u64, StoreError> {
        Ok(self
            .students()
            .await?
            .count_documents(search_filter(query))
            .await?)
    }

    pub async fn insert(&self, student: Student) -> Result<(), StoreError> {
        info!("Inserting student: {} <{}>", student.id, student.email);
        self.students().await?.insert_one(student).await?;
        Ok(())
    }
}

fn sort_doc(sort: StudentSort) -> Document {
    match sort {
        StudentSort::Newest => doc! { "created_at": -1 },
        StudentSort::Name => doc! { "full_name": 1 },
    }
}

fn search_filter(query: &StudentQuery) -> Document {
    let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
        return doc! {};
    };
    let keyword = escape_regex(search);
    doc! {
        "$or": [
            { "full_name": { "$regex": format!("(^|\\s){}", keyword), "$options": "i" } },
            { "email": { "$regex": format!("^{}", keyword), "$options": "i" } },
        ]
    }
}

fn escape_regex(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub(crate) fn short_from_document(doc: &Document) -> StudentShort {
    StudentShort {
        id: doc.get_object_id("_id").ok(),
        full_name: doc.get_str("full_name").ok().map(str::to_owned),
        email: doc.get_str("email").ok().map(str::to_owned),
    }
}
