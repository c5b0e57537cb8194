use actix_web::{web, HttpResponse, Responder};
use std::collections::HashMap;

use super::{bad_request, AppState};
use crate::models::LeadStatus;

/// Configure operator routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/admin/leads", web::get().to(list_leads))
        .route("/admin/leads/reroute", web::post().to(reroute_stale))
        .route("/admin/audit/builders", web::post().to(audit_builders))
        .route("/admin/routing/analytics", web::get().to(routing_analytics))
        .route("/admin/dispatch/failures", web::get().to(dispatch_failures));
}

/// GET /api/v1/admin/leads?status={status}
async fn list_leads(
    state: web::Data<AppState>,
    query: web::Query<HashMap<String, String>>,
) -> impl Responder {
    let status = match query.get("status") {
        Some(raw) => match LeadStatus::parse(raw) {
            Some(status) => Some(status),
            None => {
                return bad_request(
                    "Invalid status",
                    "status must be one of: new, sent, responded, closed".to_string(),
                );
            }
        },
        None => None,
    };

    let leads: Vec<_> = state
        .router
        .leads()
        .list()
        .await
        .into_iter()
        .filter(|lead| status.map_or(true, |s| lead.status == s))
        .collect();

    HttpResponse::Ok().json(serde_json::json!({
        "count": leads.len(),
        "leads": leads,
    }))
}

/// POST /api/v1/admin/leads/reroute
///
/// Routes sent leads with no response inside the stale window to additional
/// builders. Each lead is only ever re-routed once.
async fn reroute_stale(state: web::Data<AppState>) -> impl Responder {
    let report = state.router.reroute_stale(None).await;
    HttpResponse::Ok().json(report)
}

/// POST /api/v1/admin/audit/builders
async fn audit_builders(state: web::Data<AppState>) -> impl Responder {
    let report = state.router.audit_builders(None).await;
    if report.failed > 0 {
        tracing::warn!("Builder audit found {} builders with problems", report.failed);
    }
    HttpResponse::Ok().json(report)
}

/// GET /api/v1/admin/routing/analytics
async fn routing_analytics(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.router.analytics().await)
}

/// GET /api/v1/admin/dispatch/failures
///
/// Notifications that exhausted their delivery attempts.
async fn dispatch_failures(state: web::Data<AppState>) -> impl Responder {
    let failures = state.router.leads().dead_letters().await;

    HttpResponse::Ok().json(serde_json::json!({
        "count": failures.len(),
        "failures": failures,
    }))
}
