use std::sync::Arc;

use bson::doc;
use eyre::Context as _;
use log::info;
use mongodb::{Client, Database};
use tokio::sync::OnceCell;

use crate::{attendance, complaint, student, StoreError};

/// Lazily connected database handle.
///
/// Clones share one connection. The first caller connects, pings and
/// creates indexes while concurrent callers wait for it; a failed attempt
/// leaves the handle empty so the next call retries.
#[derive(Clone)]
pub struct Db {
    uri: Arc<str>,
    name: Arc<str>,
    cell: Arc<OnceCell<Database>>,
}

impl Db {
    pub(crate) fn new(uri: &str, db_name: &str) -> Self {
        Db {
            uri: Arc::from(uri),
            name: Arc::from(db_name),
            cell: Arc::new(OnceCell::new()),
        }
    }

    pub async fn get(&self) -> Result<&Database, StoreError> {
        self.cell.get_or_try_init(|| self.connect()).await
    }

    async fn connect(&self) -> Result<Database, StoreError> {
        info!("connecting to mongo database {}", self.name);
        let client = Client::with_uri_str(self.uri.as_ref())
            .await
            .context("Failed to connect to MongoDB")?;
        let db = client.database(&self.name);
        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(StoreError::from)?;

        student::create_indexes(&db).await?;
        attendance::create_indexes(&db).await?;
        complaint::create_indexes(&db).await?;
        info!("mongo database {} is ready", self.name);
        Ok(db)
    }
}
