//! Fetched schema holder. The record UI cannot render until it is `Ready`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use directory_core::SchemaField;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::api::EmployeeBackend;
use crate::transport::TransportError;

/// A resolved schema with fields already in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaView {
    pub collection: String,
    pub sample_size: u32,
    pub generated_at: DateTime<Utc>,
    pub fields: Vec<SchemaField>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaStatus {
    Loading,
    Ready(Arc<SchemaView>),
    Failed(TransportError),
}

struct Inner {
    status: SchemaStatus,
    generation: u64,
}

/// Loads `/api/schema` and replaces it wholesale on every refresh.
pub struct SchemaStore {
    backend: Arc<dyn EmployeeBackend>,
    inner: Mutex<Inner>,
}

impl SchemaStore {
    #[must_use]
    pub fn new(backend: Arc<dyn EmployeeBackend>) -> Self {
        Self {
            backend,
            inner: Mutex::new(Inner {
                status: SchemaStatus::Loading,
                generation: 0,
            }),
        }
    }

    #[must_use]
    pub fn status(&self) -> SchemaStatus {
        self.inner.lock().status.clone()
    }

    /// Fields in display order, once loaded.
    #[must_use]
    pub fn fields(&self) -> Option<Vec<SchemaField>> {
        match &self.inner.lock().status {
            SchemaStatus::Ready(view) => Some(view.fields.clone()),
            _ => None,
        }
    }

    /// Fetches the schema. A ready schema stays visible while the refetch is
    /// in flight; only the latest call's outcome is applied.
    pub async fn refresh(&self) -> SchemaStatus {
        let generation = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            if matches!(inner.status, SchemaStatus::Failed(_)) {
                inner.status = SchemaStatus::Loading;
            }
            inner.generation
        };

        let outcome = self.backend.fetch_schema().await;

        let mut inner = self.inner.lock();
        if inner.generation != generation {
            debug!(generation, "discarding superseded schema response");
            return inner.status.clone();
        }
        inner.status = match outcome {
            Ok(schema) => {
                debug!(collection = %schema.collection, fields = schema.fields.len(), "schema loaded");
                let fields = schema.ordered_fields();
                SchemaStatus::Ready(Arc::new(SchemaView {
                    collection: schema.collection,
                    sample_size: schema.sample_size,
                    generated_at: schema.generated_at,
                    fields,
                }))
            }
            Err(err) => {
                warn!(error = %err, "schema load failed");
                SchemaStatus::Failed(err)
            }
        };
        inner.status.clone()
    }
}
