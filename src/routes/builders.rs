use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use super::{bad_request, error_response, AppState};
use crate::models::{Builder, SetActiveRequest, SubscriptionPlan, UpdatePlanRequest};
use crate::services::RouteError;

/// Configure all builder routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/builders/{id}", web::put().to(upsert_builder))
        .route("/builders/{id}/plan", web::patch().to(update_plan))
        .route("/builders/{id}/active", web::patch().to(set_active))
        .route("/builders/{id}/leads", web::get().to(builder_inbox))
        .route("/builders/{id}/leads/{lead_id}", web::get().to(builder_lead));
}

/// PUT /api/v1/builders/{id}
///
/// Creates or replaces a builder profile. The path ID wins over any `id` in
/// the body.
async fn upsert_builder(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<Builder>,
) -> impl Responder {
    let mut builder = req.into_inner();
    builder.id = path.into_inner();

    if builder.company_name.trim().is_empty() {
        return bad_request(
            "Validation failed",
            "companyName must not be empty".to_string(),
        );
    }
    if !builder.subscription_plan.is_recognized() {
        tracing::warn!(
            "Builder {} registered with unrecognized plan {:?}",
            builder.id,
            builder.subscription_plan.as_str()
        );
    }

    let created = state.router.builders().upsert(builder.clone()).await;
    if created {
        HttpResponse::Created().json(builder)
    } else {
        HttpResponse::Ok().json(builder)
    }
}

/// PATCH /api/v1/builders/{id}/plan
///
/// Request body: `{ "plan": "free|professional|enterprise" }`. Legacy names
/// (`basic`, `pro`, `growth`) are mapped; anything else is stored as
/// unrecognized and grants no access.
async fn update_plan(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<UpdatePlanRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return bad_request("Validation failed", errors.to_string());
    }

    let plan = SubscriptionPlan::parse(&req.plan);
    match state.router.builders().set_plan(&path, plan).await {
        Ok(builder) => HttpResponse::Ok().json(builder),
        Err(e) => error_response(&RouteError::from(e)),
    }
}

/// PATCH /api/v1/builders/{id}/active
async fn set_active(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<SetActiveRequest>,
) -> impl Responder {
    match state.router.builders().set_active(&path, req.is_active).await {
        Ok(builder) => {
            tracing::info!("Builder {} active={}", builder.id, builder.is_active);
            HttpResponse::Ok().json(builder)
        }
        Err(e) => error_response(&RouteError::from(e)),
    }
}

/// GET /api/v1/builders/{id}/leads
///
/// Leads distributed to the builder; client contact details are masked unless
/// the builder's plan unlocks them.
async fn builder_inbox(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match state.router.builder_inbox(&path).await {
        Ok(inbox) => HttpResponse::Ok().json(inbox),
        Err(e) => error_response(&e),
    }
}

/// GET /api/v1/builders/{id}/leads/{lead_id}
async fn builder_lead(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    let (builder_id, lead_id) = path.into_inner();

    match state.router.builder_lead_view(&builder_id, &lead_id).await {
        Ok(view) => HttpResponse::Ok().json(view),
        Err(e) => error_response(&e),
    }
}
