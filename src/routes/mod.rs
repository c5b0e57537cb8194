// Route exports
pub mod admin;
pub mod builders;
pub mod leads;

use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;

use crate::models::{ErrorResponse, HealthResponse};
use crate::services::{LeadRouter, RouteError, StoreError};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<LeadRouter>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health_check))
            .configure(leads::configure)
            .configure(builders::configure)
            .configure(admin::configure),
    );
}

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

pub(crate) fn bad_request(error: &str, message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: 400,
    })
}

/// Map a routing failure onto its JSON error response
pub(crate) fn error_response(err: &RouteError) -> HttpResponse {
    let (mut builder, status_code, error) = match err {
        RouteError::Store(StoreError::LeadNotFound(_)) => {
            (HttpResponse::NotFound(), 404, "Lead not found")
        }
        RouteError::Store(StoreError::BuilderNotFound(_)) => {
            (HttpResponse::NotFound(), 404, "Builder not found")
        }
        RouteError::NotAssigned { .. } => (HttpResponse::NotFound(), 404, "Lead not assigned"),
        RouteError::Store(StoreError::DuplicateLead(_)) => {
            (HttpResponse::Conflict(), 409, "Lead already exists")
        }
        RouteError::Store(StoreError::Transition(_)) => {
            (HttpResponse::Conflict(), 409, "Invalid status change")
        }
        RouteError::NotRoutable { .. } => (HttpResponse::Conflict(), 409, "Lead not routable"),
        RouteError::UnknownStatus(_) => (HttpResponse::BadRequest(), 400, "Invalid status"),
    };

    builder.json(ErrorResponse {
        error: error.to_string(),
        message: err.to_string(),
        status_code,
    })
}
