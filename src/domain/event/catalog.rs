use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::member::MemberId;
use crate::store::{create_entity, load_entity, query_entities, EntityStore, Query, SortOrder};
use crate::utils::{retry_on_transient, RetryConfig};

use super::errors::CatalogError;
use super::model::{Event, EventDraft};
use super::value_objects::EventId;

pub const DEFAULT_LIST_LIMIT: usize = 10;
pub const MAX_LIST_LIMIT: usize = 20;

/// Outcome of checking whether an event accepts signups.
#[derive(Debug, Clone, PartialEq)]
pub enum EventValidation {
    Open(Event),
    NotFound,
    /// Exists, but `now` is outside its enrollment window.
    Inactive(Event),
}

impl EventValidation {
    pub fn label(&self) -> &'static str {
        match self {
            EventValidation::Open(_) => "open",
            EventValidation::NotFound => "not_found",
            EventValidation::Inactive(_) => "inactive",
        }
    }
}

pub struct EventCatalog {
    store: Arc<dyn EntityStore>,
    retry: RetryConfig,
}

impl EventCatalog {
    pub fn new(store: Arc<dyn EntityStore>, retry: RetryConfig) -> Self {
        Self { store, retry }
    }

    pub async fn validate(&self, event_id: &EventId) -> Result<EventValidation, CatalogError> {
        self.validate_at(event_id, Utc::now()).await
    }

    pub async fn validate_at(
        &self,
        event_id: &EventId,
        now: DateTime<Utc>,
    ) -> Result<EventValidation, CatalogError> {
        if event_id.as_str().trim().is_empty() {
            return Ok(EventValidation::NotFound);
        }

        let store = self.store.as_ref();
        let key = event_id.key();
        let event = retry_on_transient("load_event", &self.retry, |_attempt| {
            load_entity::<Event>(store, &key)
        })
        .await
        .into_result()?;

        let validation = match event {
            None => EventValidation::NotFound,
            Some(event) if !event.is_open_at(now) => EventValidation::Inactive(event),
            Some(event) => EventValidation::Open(event),
        };

        tracing::debug!(event_id = %event_id, validation = validation.label(), "Validated event");
        Ok(validation)
    }

    /// Most recently modified first. `limit` defaults to 10 and is clamped to 1..=20.
    pub async fn list(&self, limit: Option<usize>) -> Result<Vec<Event>, CatalogError> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
        let query = Query::kind(EventId::KIND)
            .order(SortOrder::Descending)
            .limit(limit);

        let store = self.store.as_ref();
        let events = retry_on_transient("list_events", &self.retry, |_attempt| {
            query_entities::<Event>(store, &query)
        })
        .await
        .into_result()?;

        Ok(events)
    }

    pub async fn add(&self, draft: EventDraft, author: &MemberId) -> Result<Event, CatalogError> {
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(CatalogError::EmptyTitle);
        }
        if draft.duration.is_some_and(|d| !d.is_valid()) {
            return Err(CatalogError::InvalidTimeRange { field: "duration" });
        }
        if draft.enrollment_window.is_some_and(|w| !w.is_valid()) {
            return Err(CatalogError::InvalidTimeRange {
                field: "enrollment_window",
            });
        }

        let event = Event {
            event_id: EventId::generate(),
            title,
            description: draft.description,
            location: draft.location,
            duration: draft.duration,
            enrollment_window: draft.enrollment_window,
            modified_at: Utc::now(),
            modified_by: Some(author.clone()),
        };

        // Fresh v7 id: a conflict can only be our own committed retry.
        let store = self.store.as_ref();
        retry_on_transient("add_event", &self.retry, |_attempt| create_entity(store, &event))
            .await
            .into_result()?;

        tracing::info!(
            event_id = %event.event_id,
            title = %event.title,
            author = %author,
            "✅ Added event"
        );
        Ok(event)
    }
}
