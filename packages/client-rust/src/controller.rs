//! Record list controller: query state, paginated fetches and mutations.
//!
//! Fetches are keyed by [`QueryParams`]. Every fetch bumps a generation
//! counter; a response whose generation is no longer current is dropped on
//! arrival, so the last issued query always wins. Successful mutations clear
//! the page cache and refetch rather than patching local state.

use std::sync::Arc;

use directory_core::{
    Attributes, FilterOperator, FilterSet, FormMode, PageResponse, QueryParams, Record,
    SortDirection,
};
use parking_lot::Mutex;
use quick_cache::sync::Cache;
use tracing::{debug, info, warn};

use crate::api::EmployeeBackend;
use crate::config::ClientConfig;
use crate::schema_store::{SchemaStatus, SchemaStore, SchemaView};
use crate::transport::TransportError;

// ---------------------------------------------------------------------------
// State types
// ---------------------------------------------------------------------------

/// Fetch state of the current query.
#[derive(Debug, Clone, PartialEq)]
pub enum ListStatus {
    /// Nothing requested yet.
    Idle,
    Loading,
    Ready,
    /// The last fetch failed; [`RecordListController::retry`] re-issues it.
    Failed(TransportError),
}

/// Which record, if any, the form dialog is editing.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FormTarget {
    #[default]
    Closed,
    Creating,
    Editing {
        id: String,
        attributes: Arc<Attributes>,
    },
}

impl FormTarget {
    /// Submit mode for the open form.
    #[must_use]
    pub fn mode(&self) -> Option<FormMode> {
        match self {
            Self::Closed => None,
            Self::Creating => Some(FormMode::Create),
            Self::Editing { id, .. } => Some(FormMode::Edit { id: id.clone() }),
        }
    }

    /// Initial values for the form. Identity changes with every new target.
    #[must_use]
    pub fn initial(&self) -> Option<Arc<Attributes>> {
        match self {
            Self::Editing { attributes, .. } => Some(Arc::clone(attributes)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Transient user notification produced by a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn success(message: &str) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.to_string(),
        }
    }

    fn error(err: &TransportError) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: err.to_string(),
        }
    }
}

/// Read-only copy of the controller state for rendering.
#[derive(Debug, Clone)]
pub struct ListSnapshot {
    pub params: QueryParams,
    pub status: ListStatus,
    /// Latest page for `params`, or a cached one while it refetches.
    pub page: Option<Arc<PageResponse<Record>>>,
    pub target: FormTarget,
    pub mutating: bool,
}

/// What the record section should render.
#[derive(Debug, Clone)]
pub enum ListView {
    SchemaLoading,
    SchemaFailed(TransportError),
    Ready {
        schema: Arc<SchemaView>,
        list: ListSnapshot,
    },
}

struct ListState {
    params: QueryParams,
    generation: u64,
    status: ListStatus,
    page: Option<Arc<PageResponse<Record>>>,
    target: FormTarget,
    mutations_in_flight: usize,
    notices: Vec<Notice>,
}

// ---------------------------------------------------------------------------
// RecordListController
// ---------------------------------------------------------------------------

pub struct RecordListController {
    backend: Arc<dyn EmployeeBackend>,
    cache: Cache<QueryParams, Arc<PageResponse<Record>>>,
    state: Mutex<ListState>,
}

impl RecordListController {
    /// Creates an idle controller whose first query uses the configured
    /// page size and sort.
    #[must_use]
    pub fn new(backend: Arc<dyn EmployeeBackend>, config: &ClientConfig) -> Self {
        let params = QueryParams {
            page: Some(0),
            size: Some(config.page_size),
            sort: Some(config.default_sort.clone()),
            direction: Some(config.default_direction),
            ..QueryParams::default()
        };
        Self {
            backend,
            cache: Cache::new(config.cache_capacity.max(1)),
            state: Mutex::new(ListState {
                params,
                generation: 0,
                status: ListStatus::Idle,
                page: None,
                target: FormTarget::Closed,
                mutations_in_flight: 0,
                notices: Vec::new(),
            }),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> ListSnapshot {
        let state = self.state.lock();
        ListSnapshot {
            params: state.params.clone(),
            status: state.status.clone(),
            page: state.page.clone(),
            target: state.target.clone(),
            mutating: state.mutations_in_flight > 0,
        }
    }

    /// Combines the schema state with the list snapshot. The list is only
    /// renderable once the schema is ready.
    #[must_use]
    pub fn view(&self, schema: &SchemaStore) -> ListView {
        match schema.status() {
            SchemaStatus::Loading => ListView::SchemaLoading,
            SchemaStatus::Failed(err) => ListView::SchemaFailed(err),
            SchemaStatus::Ready(schema) => ListView::Ready {
                schema,
                list: self.snapshot(),
            },
        }
    }

    /// Drains pending notifications.
    pub fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut self.state.lock().notices)
    }

    // -- queries ------------------------------------------------------------

    /// Fetches `params`, superseding any fetch still in flight.
    pub async fn list(&self, params: QueryParams) -> ListStatus {
        let generation = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.page = self.cache.get(&params);
            state.params = params.clone();
            state.status = ListStatus::Loading;
            state.generation
        };

        let outcome = self.backend.list(&params).await;

        let mut state = self.state.lock();
        if state.generation != generation {
            debug!(generation, current = state.generation, "discarding superseded list response");
            return state.status.clone();
        }
        state.status = match outcome {
            Ok(page) => {
                if !page.is_consistent() {
                    warn!(page = page.page, total_pages = page.total_pages, "inconsistent page response");
                }
                let page = Arc::new(page);
                self.cache.insert(params, Arc::clone(&page));
                state.page = Some(page);
                ListStatus::Ready
            }
            Err(err) => {
                warn!(error = %err, "list fetch failed");
                ListStatus::Failed(err)
            }
        };
        state.status.clone()
    }

    /// Re-runs the current query.
    pub async fn refresh(&self) -> ListStatus {
        let params = self.state.lock().params.clone();
        self.list(params).await
    }

    /// Re-issues the current (failed) request with identical parameters.
    pub async fn retry(&self) -> ListStatus {
        self.refresh().await
    }

    pub async fn set_page(&self, page: u32) -> ListStatus {
        let params = QueryParams {
            page: Some(page),
            ..self.state.lock().params.clone()
        };
        self.list(params).await
    }

    pub async fn change_sort(&self, field: &str, direction: SortDirection) -> ListStatus {
        let params = QueryParams {
            sort: Some(field.to_string()),
            direction: Some(direction),
            ..self.state.lock().params.clone()
        };
        self.list(params).await
    }

    /// Sets the free-text search and returns to the first page.
    pub async fn change_search(&self, raw: &str) -> ListStatus {
        let mut params = self.state.lock().params.clone();
        params.set_search(raw);
        params.page = Some(0);
        self.list(params).await
    }

    /// Replaces the filters and returns to the first page.
    pub async fn change_filters(&self, filters: FilterSet) -> ListStatus {
        let params = QueryParams {
            filters,
            page: Some(0),
            ..self.state.lock().params.clone()
        };
        self.list(params).await
    }

    /// Adds or replaces the filter for `field`. Empty input is ignored.
    pub async fn apply_filter(&self, field: &str, operator: FilterOperator, value: &str) -> ListStatus {
        let mut filters = self.state.lock().params.filters.clone();
        if !filters.apply(field, operator, value) {
            return self.state.lock().status.clone();
        }
        self.change_filters(filters).await
    }

    pub async fn remove_filter(&self, field: &str) -> ListStatus {
        let mut filters = self.state.lock().params.filters.clone();
        if filters.remove(field).is_none() {
            return self.state.lock().status.clone();
        }
        self.change_filters(filters).await
    }

    // -- form target --------------------------------------------------------

    pub fn begin_create(&self) {
        self.state.lock().target = FormTarget::Creating;
    }

    pub fn begin_edit(&self, record: &Record) {
        self.state.lock().target = FormTarget::Editing {
            id: record.id.clone(),
            attributes: Arc::new(record.attributes.clone()),
        };
    }

    pub fn cancel_form(&self) {
        self.state.lock().target = FormTarget::Closed;
    }

    /// Routes a submitted form to `create` or `replace` by the open target.
    /// Returns `Ok(None)` when no form is open.
    ///
    /// # Errors
    ///
    /// Returns the mutation's transport error.
    pub async fn submit_form(&self, attributes: Attributes) -> Result<Option<Record>, TransportError> {
        let target = self.state.lock().target.clone();
        match target {
            FormTarget::Closed => Ok(None),
            FormTarget::Creating => self.create(attributes).await.map(Some),
            FormTarget::Editing { id, .. } => self.replace(&id, attributes).await.map(Some),
        }
    }

    // -- mutations ----------------------------------------------------------

    /// Creates a record. On success the form closes and the list refetches;
    /// on failure the form stays open.
    ///
    /// # Errors
    ///
    /// Returns the backend failure, also queued as an error notice.
    pub async fn create(&self, attributes: Attributes) -> Result<Record, TransportError> {
        self.begin_mutation();
        let outcome = self.backend.create(attributes).await;
        let record = self.finish_mutation(outcome, "Employee created", |target| {
            if *target == FormTarget::Creating {
                *target = FormTarget::Closed;
            }
        })?;
        info!(id = %record.id, "employee created");
        self.refresh().await;
        Ok(record)
    }

    /// Replaces a record's attributes and closes the edit form on success.
    ///
    /// # Errors
    ///
    /// Returns the backend failure, also queued as an error notice.
    pub async fn replace(&self, id: &str, attributes: Attributes) -> Result<Record, TransportError> {
        self.begin_mutation();
        let outcome = self.backend.replace(id, attributes).await;
        let record = self.finish_mutation(outcome, "Employee updated", |target| {
            if matches!(target, FormTarget::Editing { id: editing, .. } if editing.as_str() == id) {
                *target = FormTarget::Closed;
            }
        })?;
        info!(%id, "employee updated");
        self.refresh().await;
        Ok(record)
    }

    /// Partially updates a record. The form target is left alone.
    ///
    /// # Errors
    ///
    /// Returns the backend failure, also queued as an error notice.
    pub async fn patch(&self, id: &str, attributes: Attributes) -> Result<Record, TransportError> {
        self.begin_mutation();
        let outcome = self.backend.patch(id, attributes).await;
        let record = self.finish_mutation(outcome, "Employee patched", |_| {})?;
        info!(%id, "employee patched");
        self.refresh().await;
        Ok(record)
    }

    /// Deletes a record, softly unless `soft` is false.
    ///
    /// If the record was the only row of a page past the first, the next
    /// fetch requests the previous page.
    ///
    /// # Errors
    ///
    /// Returns the backend failure, also queued as an error notice.
    pub async fn delete(&self, id: &str, soft: bool) -> Result<(), TransportError> {
        self.begin_mutation();
        let outcome = self.backend.delete(id, soft).await;
        self.finish_mutation(outcome, "Employee deleted", |_| {})?;
        info!(%id, soft, "employee deleted");

        {
            let mut state = self.state.lock();
            let was_last_on_page = state
                .page
                .as_ref()
                .is_some_and(|page| page.content.len() == 1 && page.content[0].id == id);
            match state.params.page {
                Some(current) if current > 0 && was_last_on_page => {
                    debug!(from = current, to = current - 1, "stepping back from emptied page");
                    state.params.page = Some(current - 1);
                }
                _ => {}
            }
        }
        self.refresh().await;
        Ok(())
    }

    fn begin_mutation(&self) {
        self.state.lock().mutations_in_flight += 1;
    }

    /// Records the mutation outcome. On success the cache is cleared, the
    /// target updated and a success notice queued; failures only queue an
    /// error notice.
    fn finish_mutation<T>(
        &self,
        outcome: Result<T, TransportError>,
        success: &str,
        update_target: impl FnOnce(&mut FormTarget),
    ) -> Result<T, TransportError> {
        let mut state = self.state.lock();
        state.mutations_in_flight = state.mutations_in_flight.saturating_sub(1);
        match outcome {
            Ok(value) => {
                self.cache.clear();
                debug!(reason = success, "list cache invalidated");
                update_target(&mut state.target);
                state.notices.push(Notice::success(success));
                Ok(value)
            }
            Err(err) => {
                warn!(error = %err, "mutation failed");
                state.notices.push(Notice::error(&err));
                Err(err)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
