use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::event::EventId;
use crate::domain::member::MemberId;
use crate::store::{Entity, EntityKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub member_id: MemberId,
    pub event_id: EventId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    pub enrolled_at: DateTime<Utc>,
    /// Identifies the ledger call that wrote this record.
    pub signup_id: Uuid,
}

impl Enrollment {
    pub const KIND: &'static str = "Enrollment";

    /// Comments are stored as sent; blank ones become `None`.
    pub fn new(member_id: MemberId, event_id: EventId, comments: Option<String>) -> Self {
        let comments = comments.filter(|c| !c.trim().is_empty());

        Self {
            member_id,
            event_id,
            comments,
            enrolled_at: Utc::now(),
            signup_id: Uuid::now_v7(),
        }
    }

    pub fn key_for(member_id: &MemberId, event_id: &EventId) -> EntityKey {
        member_id.key().child(Self::KIND, event_id.as_str())
    }
}

impl Entity for Enrollment {
    fn kind() -> &'static str {
        Self::KIND
    }

    fn key(&self) -> EntityKey {
        Self::key_for(&self.member_id, &self.event_id)
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.enrolled_at
    }
}
