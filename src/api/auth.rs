use actix_web::HttpRequest;

use crate::domain::member::Principal;

/// Source of the authenticated principal for a request.
pub trait IdentityProvider: Send + Sync {
    fn current_principal(&self, req: &HttpRequest) -> Option<Principal>;
}

/// Reads the principal from headers set by an authenticating proxy in front
/// of the service. Requests missing either header, or carrying an invalid
/// one, are anonymous.
pub struct HeaderIdentity {
    id_header: String,
    email_header: String,
}

impl HeaderIdentity {
    pub fn new(id_header: impl Into<String>, email_header: impl Into<String>) -> Self {
        Self {
            id_header: id_header.into(),
            email_header: email_header.into(),
        }
    }

    fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
        req.headers().get(name)?.to_str().ok()
    }
}

impl IdentityProvider for HeaderIdentity {
    fn current_principal(&self, req: &HttpRequest) -> Option<Principal> {
        let id = Self::header(req, &self.id_header)?;
        let email = Self::header(req, &self.email_header)?;

        match Principal::new(id, email) {
            Ok(principal) => Some(principal),
            Err(_) => {
                tracing::debug!(principal = %id, "Ignoring malformed principal headers");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn identity() -> HeaderIdentity {
        HeaderIdentity::new("x-principal-id", "x-principal-email")
    }

    #[test]
    fn test_principal_from_headers() {
        let req = TestRequest::default()
            .insert_header(("x-principal-id", "u1"))
            .insert_header(("x-principal-email", "a@x.com"))
            .to_http_request();

        let principal = identity().current_principal(&req).unwrap();
        assert_eq!(principal.id(), "u1");
        assert_eq!(principal.email(), "a@x.com");
    }

    #[test]
    fn test_missing_or_invalid_headers_are_anonymous() {
        let no_email = TestRequest::default()
            .insert_header(("x-principal-id", "u1"))
            .to_http_request();
        assert!(identity().current_principal(&no_email).is_none());

        let bad_email = TestRequest::default()
            .insert_header(("x-principal-id", "u1"))
            .insert_header(("x-principal-email", "nope"))
            .to_http_request();
        assert!(identity().current_principal(&bad_email).is_none());
    }
}
