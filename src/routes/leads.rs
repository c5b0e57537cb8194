use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use super::{bad_request, error_response, AppState};
use crate::models::{SubmitLeadRequest, SubmitLeadResponse, UpdateStatusRequest};
use crate::services::RouteError;

/// Configure all lead routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/leads", web::post().to(submit_lead))
        .route("/leads/{id}", web::get().to(get_lead))
        .route("/leads/{id}/route", web::post().to(route_lead))
        .route("/leads/{id}/status", web::post().to(update_status));
}

/// Submit a quote request
///
/// POST /api/v1/leads
///
/// Request body:
/// ```json
/// {
///   "clientName": "string",
///   "clientEmail": "string",
///   "eventName": "string",
///   "city": "string",
///   "country": "string",
///   "timeline": "1-2 months"
/// }
/// ```
///
/// The lead is stored and routed in the same request.
async fn submit_lead(
    state: web::Data<AppState>,
    req: web::Json<SubmitLeadRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for lead submission: field_errors={:?}", errors);
        return bad_request("Validation failed", errors.to_string());
    }

    match state.router.submit(req.into_inner()).await {
        Ok(routing) => HttpResponse::Created().json(SubmitLeadResponse {
            lead_id: routing.lead_id.clone(),
            routing,
        }),
        Err(e) => {
            tracing::error!("Failed to submit lead: {}", e);
            error_response(&e)
        }
    }
}

/// GET /api/v1/leads/{id}
///
/// Unredacted lead record for operators.
async fn get_lead(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match state.router.leads().get(&path).await {
        Ok(lead) => HttpResponse::Ok().json(lead),
        Err(e) => error_response(&RouteError::from(e)),
    }
}

/// POST /api/v1/leads/{id}/route
async fn route_lead(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match state.router.route(&path).await {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(e) => {
            tracing::warn!("Routing lead {} failed: {}", path.as_str(), e);
            error_response(&e)
        }
    }
}

/// POST /api/v1/leads/{id}/status
///
/// Request body: `{ "status": "new|sent|responded|closed" }`
async fn update_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<UpdateStatusRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return bad_request("Validation failed", errors.to_string());
    }

    match state.router.update_status(&path, &req.status).await {
        Ok(lead) => HttpResponse::Ok().json(lead),
        Err(e) => error_response(&e),
    }
}
