use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::member::MemberId;
use crate::store::{Entity, EntityKey};

use super::value_objects::{EventId, Location, TimeRange};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: EventId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// When the event itself takes place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<TimeRange>,
    /// When signups are accepted. No window means always open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrollment_window: Option<TimeRange>,
    pub modified_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_by: Option<MemberId>,
}

impl Event {
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.enrollment_window
            .map(|window| window.contains(now))
            .unwrap_or(true)
    }
}

impl Entity for Event {
    fn kind() -> &'static str {
        EventId::KIND
    }

    fn key(&self) -> EntityKey {
        self.event_id.key()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.modified_at
    }
}

/// What an author submits. The catalog assigns id and audit fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub duration: Option<TimeRange>,
    #[serde(default)]
    pub enrollment_window: Option<TimeRange>,
}
