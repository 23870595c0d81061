use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::store::EntityKey;

use super::errors::IdentityError;

// ============================================================================
// Member Value Objects
// ============================================================================

/// Identity asserted by the authentication layer for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    id: String,
    email: String,
}

impl Principal {
    /// Rejects blank ids and emails without an `@`.
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Result<Self, IdentityError> {
        let id = id.into().trim().to_string();
        let email = email.into().trim().to_string();

        if id.is_empty() || !email.contains('@') {
            return Err(IdentityError::Unauthenticated);
        }
        Ok(Self { id, email })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

/// Member key name. Always the principal id itself, so the same identity
/// maps to the same record no matter how often it is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    pub const KIND: &'static str = "Member";

    pub fn from_principal(principal: &Principal) -> Self {
        Self(principal.id().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn key(&self) -> EntityKey {
        EntityKey::root(Self::KIND, self.0.clone())
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Name {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub first: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle: Option<String>,
    pub last: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phone {
    /// work, home, ...
    pub contact: String,
    /// mobile, landline, fax, ...
    pub line: String,
    pub number: String,
}

/// Profile data owned by the member. Opaque to signup logic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub name: Name,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative_email: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub phones: Vec<Phone>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_requires_id_and_email() {
        assert!(Principal::new("u1", "a@x.com").is_ok());
        assert!(matches!(Principal::new("  ", "a@x.com"), Err(IdentityError::Unauthenticated)));
        assert!(matches!(Principal::new("u1", "not-an-email"), Err(IdentityError::Unauthenticated)));
    }

    #[test]
    fn test_member_id_is_deterministic() {
        let a = Principal::new("u1", "a@x.com").unwrap();
        let b = Principal::new(" u1 ", "other@x.com").unwrap();

        assert_eq!(MemberId::from_principal(&a), MemberId::from_principal(&b));
        assert_eq!(MemberId::from_principal(&a).key().path(), "Member:u1");
    }

    #[test]
    fn test_profile_deserializes_from_partial_json() {
        let profile: Profile = serde_json::from_str(r#"{"name":{"first":"Ada"}}"#).unwrap();
        assert_eq!(profile.name.first, "Ada");
        assert!(profile.phones.is_empty());
    }
}
