// ============================================================================
// HTTP API (actix-web)
// ============================================================================
//
// Thin routing layer over the domain services. Handlers extract the
// principal, call one service, and shape the JSON response.
//
//   GET  /api/v1/events?limit=N         most recently modified events
//   PUT  /api/v1/events                 add an event
//   POST /api/v1/events/{id}/enroll     sign the caller up
//   GET  /api/v1/enrollments            the caller's signups
//   GET  /api/v1/member/current         the caller's member record
//   PUT  /api/v1/member/current         replace the caller's profile
//
// ============================================================================

mod auth;
mod error;
mod handlers;

use std::sync::Arc;

use actix_web::web;

use crate::config::Config;
use crate::domain::enrollment::EnrollmentLedger;
use crate::domain::event::EventCatalog;
use crate::domain::member::IdentityResolver;
use crate::domain::signup::SignupCoordinator;
use crate::metrics::{self, Metrics};
use crate::store::EntityStore;

pub use auth::{HeaderIdentity, IdentityProvider};
pub use error::ApiError;

/// Shared, immutable application state. Built once at startup.
pub struct AppState {
    pub coordinator: Arc<SignupCoordinator>,
    pub catalog: Arc<EventCatalog>,
    pub resolver: Arc<IdentityResolver>,
    pub identity: Arc<dyn IdentityProvider>,
    pub admin_principals: Vec<String>,
}

impl AppState {
    pub fn new(store: Arc<dyn EntityStore>, config: &Config, metrics: Arc<Metrics>) -> Self {
        let retry = config.retry_config();

        let catalog = Arc::new(EventCatalog::new(store.clone(), retry.clone()));
        let resolver = Arc::new(IdentityResolver::new(store.clone(), retry.clone(), metrics.clone()));
        let ledger = Arc::new(EnrollmentLedger::new(store, retry, metrics.clone()));
        let coordinator = Arc::new(SignupCoordinator::new(
            catalog.clone(),
            resolver.clone(),
            ledger,
            metrics,
        ));

        Self {
            coordinator,
            catalog,
            resolver,
            identity: Arc::new(HeaderIdentity::new(
                config.principal_id_header.clone(),
                config.principal_email_header.clone(),
            )),
            admin_principals: config.admin_principals.clone(),
        }
    }

    /// With no admins configured, any signed-in principal may author events.
    pub fn may_author_events(&self, principal_id: &str) -> bool {
        self.admin_principals.is_empty() || self.admin_principals.iter().any(|a| a == principal_id)
    }
}

/// Register all routes. Expects `web::Data<AppState>` and
/// `web::Data<Arc<Metrics>>` to be registered on the app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/events", web::get().to(handlers::list_events))
            .route("/events", web::put().to(handlers::add_event))
            .route("/events/{event_id}/enroll", web::post().to(handlers::enroll))
            .route("/enrollments", web::get().to(handlers::my_enrollments))
            .route("/member/current", web::get().to(handlers::current_member))
            .route("/member/current", web::put().to(handlers::update_member)),
    )
    .configure(metrics::configure_routes);
}
