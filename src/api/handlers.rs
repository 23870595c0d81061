use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::domain::event::{EventDraft, EventId};
use crate::domain::member::{MemberId, Principal, Profile};
use crate::domain::signup::{SignupOutcome, SignupRequest};

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EnrollBody {
    #[serde(default)]
    pub comments: Option<String>,
}

/// An empty body means no comments; anything else must be a valid
/// `EnrollBody`, so a malformed request never records a signup.
fn parse_enroll_body(body: &[u8]) -> Result<EnrollBody, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(EnrollBody::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid enrollment body: {}", e)))
}

fn require_principal(state: &AppState, req: &HttpRequest) -> Result<Principal, ApiError> {
    state
        .identity
        .current_principal(req)
        .ok_or(ApiError::Unauthenticated)
}

pub async fn list_events(
    state: web::Data<AppState>,
    query: web::Query<ListEventsQuery>,
) -> Result<HttpResponse, ApiError> {
    let events = state.catalog.list(query.limit).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "events": events })))
}

pub async fn add_event(
    state: web::Data<AppState>,
    req: HttpRequest,
    draft: web::Json<EventDraft>,
) -> Result<HttpResponse, ApiError> {
    let principal = require_principal(&state, &req)?;
    if !state.may_author_events(principal.id()) {
        tracing::warn!(principal = %principal.id(), "Event add rejected: not an admin");
        return Err(ApiError::Forbidden);
    }

    let event = state
        .catalog
        .add(draft.into_inner(), &MemberId::from_principal(&principal))
        .await?;
    Ok(HttpResponse::Created().json(event))
}

pub async fn enroll(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let principal = state.identity.current_principal(&req);
    let body = parse_enroll_body(&body)?;
    let request = SignupRequest {
        event_id: EventId::new(path.into_inner()),
        comments: body.comments,
    };

    let outcome = state.coordinator.enroll(principal.as_ref(), request).await?;
    let response = match outcome {
        SignupOutcome::Success(enrollment) => HttpResponse::Created().json(serde_json::json!({
            "status": "enrolled",
            "enrollment": enrollment,
        })),
        SignupOutcome::DuplicateSignup(enrollment) => HttpResponse::Ok().json(serde_json::json!({
            "status": "already_enrolled",
            "enrollment": enrollment,
        })),
    };
    Ok(response)
}

pub async fn my_enrollments(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let principal = state.identity.current_principal(&req);
    let enrollments = state.coordinator.my_enrollments(principal.as_ref()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "enrollments": enrollments })))
}

pub async fn current_member(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let principal = require_principal(&state, &req)?;
    let member = state.resolver.current(&principal).await?;
    Ok(HttpResponse::Ok().json(member))
}

pub async fn update_member(
    state: web::Data<AppState>,
    req: HttpRequest,
    profile: web::Json<Profile>,
) -> Result<HttpResponse, ApiError> {
    let principal = require_principal(&state, &req)?;
    let member = state
        .resolver
        .update_profile(&principal, profile.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(member))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{test, web, App};
    use chrono::Utc;
    use serde_json::{json, Value};

    use crate::api::{configure, AppState};
    use crate::config::Config;
    use crate::domain::event::{Event, EventId};
    use crate::metrics::Metrics;
    use crate::store::{to_record, EntityStore, InMemoryStore};

    async fn state_with_event(config: Config) -> (AppState, Arc<Metrics>) {
        let store = Arc::new(InMemoryStore::new());
        let event = Event {
            event_id: EventId::new("picnic-2024"),
            title: "Picnic".to_string(),
            description: String::new(),
            location: None,
            duration: None,
            enrollment_window: None,
            modified_at: Utc::now(),
            modified_by: None,
        };
        store.put(to_record(&event).unwrap()).await.unwrap();

        let metrics = Arc::new(Metrics::new().unwrap());
        (AppState::new(store, &config, metrics.clone()), metrics)
    }

    macro_rules! app {
        ($state:expr, $metrics:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .app_data(web::Data::new($metrics))
                    .configure(configure),
            )
            .await
        };
    }

    fn signed_in(req: test::TestRequest, id: &str) -> test::TestRequest {
        req.insert_header(("x-principal-id", id))
            .insert_header(("x-principal-email", "a@x.com"))
    }

    #[actix_web::test]
    async fn test_enroll_then_duplicate_then_list() {
        let (state, metrics) = state_with_event(Config::default()).await;
        let app = app!(state, metrics);

        let first = signed_in(test::TestRequest::post(), "u1")
            .uri("/api/v1/events/picnic-2024/enroll")
            .set_json(json!({ "comments": "bringing salad" }))
            .to_request();
        let resp = test::call_service(&app, first).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "enrolled");
        assert_eq!(body["enrollment"]["comments"], "bringing salad");

        let second = signed_in(test::TestRequest::post(), "u1")
            .uri("/api/v1/events/picnic-2024/enroll")
            .to_request();
        let resp = test::call_service(&app, second).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "already_enrolled");

        let list = signed_in(test::TestRequest::get(), "u1")
            .uri("/api/v1/enrollments")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, list).await;
        assert_eq!(body["enrollments"].as_array().unwrap().len(), 1);
        assert_eq!(body["enrollments"][0]["event_id"], "picnic-2024");
    }

    #[actix_web::test]
    async fn test_enroll_body_parsing() {
        use super::parse_enroll_body;

        assert_eq!(parse_enroll_body(b"").unwrap().comments, None);
        assert_eq!(parse_enroll_body(b" \n").unwrap().comments, None);
        assert_eq!(
            parse_enroll_body(br#"{"comments":"bringing salad"}"#).unwrap().comments.as_deref(),
            Some("bringing salad")
        );
        assert!(parse_enroll_body(b"{").is_err());
    }

    #[actix_web::test]
    async fn test_malformed_enroll_body_is_rejected() {
        let (state, metrics) = state_with_event(Config::default()).await;
        let app = app!(state, metrics);

        let truncated = signed_in(test::TestRequest::post(), "u1")
            .uri("/api/v1/events/picnic-2024/enroll")
            .insert_header(("content-type", "application/json"))
            .set_payload(r#"{"comments": ["bringing salad"]"#)
            .to_request();
        let resp = test::call_service(&app, truncated).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let wrong_type = signed_in(test::TestRequest::post(), "u1")
            .uri("/api/v1/events/picnic-2024/enroll")
            .set_json(json!({ "comments": ["bringing salad"] }))
            .to_request();
        let resp = test::call_service(&app, wrong_type).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let list = signed_in(test::TestRequest::get(), "u1")
            .uri("/api/v1/enrollments")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, list).await;
        assert!(body["enrollments"].as_array().unwrap().is_empty());

        // A corrected resend is a first signup, not a duplicate.
        let fixed = signed_in(test::TestRequest::post(), "u1")
            .uri("/api/v1/events/picnic-2024/enroll")
            .set_json(json!({ "comments": "bringing salad" }))
            .to_request();
        let resp = test::call_service(&app, fixed).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    #[actix_web::test]
    async fn test_error_statuses() {
        let (state, metrics) = state_with_event(Config::default()).await;
        let app = app!(state, metrics);

        let anonymous = test::TestRequest::post()
            .uri("/api/v1/events/picnic-2024/enroll")
            .to_request();
        assert_eq!(test::call_service(&app, anonymous).await.status(), StatusCode::UNAUTHORIZED);

        let unknown = signed_in(test::TestRequest::post(), "u1")
            .uri("/api/v1/events/nope/enroll")
            .to_request();
        assert_eq!(test::call_service(&app, unknown).await.status(), StatusCode::NOT_FOUND);

        let no_member = signed_in(test::TestRequest::put(), "u2")
            .uri("/api/v1/member/current")
            .set_json(json!({ "name": { "first": "Ada", "last": "Lovelace" } }))
            .to_request();
        assert_eq!(test::call_service(&app, no_member).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_event_authoring_respects_admins() {
        let config = Config {
            admin_principals: vec!["admin".to_string()],
            ..Config::default()
        };
        let (state, metrics) = state_with_event(config).await;
        let app = app!(state, metrics);

        let draft = json!({ "title": "Board meeting", "description": "Quarterly" });

        let denied = signed_in(test::TestRequest::put(), "u1")
            .uri("/api/v1/events")
            .set_json(&draft)
            .to_request();
        assert_eq!(test::call_service(&app, denied).await.status(), StatusCode::FORBIDDEN);

        let allowed = signed_in(test::TestRequest::put(), "admin")
            .uri("/api/v1/events")
            .set_json(&draft)
            .to_request();
        let resp = test::call_service(&app, allowed).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let list = test::TestRequest::get().uri("/api/v1/events?limit=5").to_request();
        let body: Value = test::call_and_read_body_json(&app, list).await;
        let events = body["events"].as_array().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["title"], "Board meeting");
    }

    #[actix_web::test]
    async fn test_member_current_and_update() {
        let (state, metrics) = state_with_event(Config::default()).await;
        let app = app!(state, metrics);

        let current = signed_in(test::TestRequest::get(), "u1")
            .uri("/api/v1/member/current")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, current).await;
        assert_eq!(body["member_id"], "u1");
        assert_eq!(body["primary_email"], "a@x.com");

        let update = signed_in(test::TestRequest::put(), "u1")
            .uri("/api/v1/member/current")
            .set_json(json!({ "name": { "first": "Ada", "last": "Lovelace" } }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, update).await;
        assert_eq!(body["profile"]["name"]["first"], "Ada");
        assert_eq!(body["member_id"], "u1");
    }

    #[actix_web::test]
    async fn test_metrics_endpoint() {
        let (state, metrics) = state_with_event(Config::default()).await;
        let app = app!(state, metrics);

        let enroll = signed_in(test::TestRequest::post(), "u1")
            .uri("/api/v1/events/picnic-2024/enroll")
            .to_request();
        test::call_service(&app, enroll).await;

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let body = test::call_and_read_body(&app, req).await;
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("signup_outcomes_total"));
    }
}
