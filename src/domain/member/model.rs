use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{Entity, EntityKey};

use super::value_objects::{MemberId, Principal, Profile};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub member_id: MemberId,
    pub primary_email: String,
    #[serde(default)]
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Member {
    /// Fresh record for a principal seen for the first time.
    pub fn first_contact(principal: &Principal, now: DateTime<Utc>) -> Self {
        Self {
            member_id: MemberId::from_principal(principal),
            primary_email: principal.email().to_string(),
            profile: Profile::default(),
            created_at: now,
            modified_at: now,
        }
    }

    /// Replace the profile; identity fields and `created_at` are kept.
    pub fn with_profile(mut self, profile: Profile, now: DateTime<Utc>) -> Self {
        self.profile = profile;
        self.modified_at = now;
        self
    }
}

impl Entity for Member {
    fn kind() -> &'static str {
        MemberId::KIND
    }

    fn key(&self) -> EntityKey {
        self.member_id.key()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.modified_at
    }
}
