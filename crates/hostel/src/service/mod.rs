use std::{fmt, future::Future, ops::Deref, sync::Arc, time::Duration};

use log::error;
use storage::{RecordStore, StoreError};

pub mod attendance;
pub mod billing;
pub mod complaints;
pub mod students;

/// Shared store handle that bounds every call with the request timeout.
#[derive(Clone)]
pub struct Store {
    inner: Arc<dyn RecordStore>,
    timeout: Duration,
}

impl Store {
    pub fn new(inner: Arc<dyn RecordStore>, timeout: Duration) -> Self {
        Store { inner, timeout }
    }

    pub async fn call<T, F>(&self, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout),
        }
    }
}

impl Deref for Store {
    type Target = dyn RecordStore;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

pub(crate) fn log_store_error(op: &str, context: fmt::Arguments<'_>, err: &StoreError) {
    error!("{} failed: kind={} {}: {}", op, err.kind(), context, err);
}
