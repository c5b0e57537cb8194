// Integration tests for Stand Leads

use actix_web::{http::StatusCode, test, web, App};
use serde_json::{json, Value};
use stand_leads::config::Settings;
use stand_leads::routes::{configure_routes, AppState};
use stand_leads::services::{HttpMailer, LogMailer, Mailer};
use stand_leads::models::MASK_TOKEN;
use stand_leads::{router_from_settings, LeadRouter};
use std::sync::Arc;
use std::time::Duration;

fn create_router(mailer: Arc<dyn Mailer>) -> Arc<LeadRouter> {
    let mut settings = Settings::default();
    settings.dispatch.backoff_ms = 1;
    settings.dispatch.app_url = "https://stands.test".to_string();
    Arc::new(router_from_settings(&settings, mailer))
}

fn builder_json(city: &str, plan: &str, specializations: &[&str]) -> Value {
    json!({
        "companyName": format!("{} Stands", city),
        "contact": { "email": format!("sales@{}.test", city.to_lowercase().replace(' ', "")) },
        "headquartersCity": city,
        "headquartersCountry": "USA",
        "serviceAreas": [city],
        "specializations": specializations,
        "subscriptionPlan": plan,
        "responseRate": 0.9,
        "verified": true,
        "rating": 4.7
    })
}

fn lead_json() -> Value {
    json!({
        "name": "Dana Client",
        "email": "dana@client.test",
        "phone": "+1 702 555 0100",
        "company": "Client Inc",
        "exhibitionName": "CES 2025",
        "city": "Las Vegas",
        "country": "USA",
        "boothSize": "10x20",
        "budget": "$40,000",
        "timeline": "1-2 months"
    })
}

macro_rules! app {
    ($router:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(AppState { router: $router.clone() }))
                .configure(configure_routes),
        )
        .await
    };
}

#[actix_web::test]
async fn test_health_endpoint() {
    let router = create_router(Arc::new(LogMailer));
    let app = app!(router);

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "healthy");
}

#[actix_web::test]
async fn test_submit_routes_to_matching_builders() {
    let router = create_router(Arc::new(LogMailer));
    let app = app!(router);

    for (id, city, plan, specs) in [
        ("vegas-tech", "Las Vegas", "free", vec!["Technology"]),
        ("vegas-food", "Las Vegas", "enterprise", vec!["Food & Beverage"]),
        ("paris", "Paris", "enterprise", vec![]),
    ] {
        let req = test::TestRequest::put()
            .uri(&format!("/api/v1/builders/{}", id))
            .set_json(builder_json(city, plan, &specs))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let req = test::TestRequest::post()
        .uri("/api/v1/leads")
        .set_json(lead_json())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = test::read_body_json(resp).await;
    let lead_id = body["leadId"].as_str().unwrap().to_string();
    assert_eq!(body["routing"]["status"], "sent");
    assert_eq!(body["routing"]["notificationsSent"], 1);
    assert_eq!(body["routing"]["matchedBuilders"][0]["builderId"], "vegas-tech");

    let lead = router.leads().get(&lead_id).await.unwrap();
    assert_eq!(lead.matched_builder_ids, vec!["vegas-tech"]);
    assert_eq!(lead.client_name, "Dana Client");
    assert_eq!(format!("{:?}", lead.priority), "High");
}

#[actix_web::test]
async fn test_inbox_masks_until_plan_upgrade() {
    let router = create_router(Arc::new(LogMailer));
    let app = app!(router);

    let req = test::TestRequest::put()
        .uri("/api/v1/builders/a")
        .set_json(builder_json("Las Vegas", "free", &["Technology"]))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/leads")
        .set_json(lead_json())
        .to_request();
    let submitted: Value = test::call_and_read_body_json(&app, req).await;
    let lead_id = submitted["leadId"].as_str().unwrap().to_string();

    let req = test::TestRequest::get().uri("/api/v1/builders/a/leads").to_request();
    let inbox: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(inbox["detailsUnlocked"], false);
    assert_eq!(inbox["leads"][0]["clientEmail"], MASK_TOKEN);
    assert_eq!(inbox["leads"][0]["clientPhone"], MASK_TOKEN);
    assert_eq!(inbox["leads"][0]["eventName"], "CES 2025");

    let req = test::TestRequest::patch()
        .uri("/api/v1/builders/a/plan")
        .set_json(json!({ "plan": "enterprise" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/builders/a/leads/{}", lead_id))
        .to_request();
    let view: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(view["detailsUnlocked"], true);
    assert_eq!(view["clientEmail"], "dana@client.test");
    assert_eq!(view["clientPhone"], "+1 702 555 0100");
}

#[actix_web::test]
async fn test_invalid_submission_rejected() {
    let router = create_router(Arc::new(LogMailer));
    let app = app!(router);

    let mut body = lead_json();
    body["email"] = json!("not-an-email");
    body["city"] = json!("   ");

    let req = test::TestRequest::post()
        .uri("/api/v1/leads")
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let error: Value = test::read_body_json(resp).await;
    assert_eq!(error["error"], "Validation failed");
    assert!(router.leads().is_empty().await);
}

#[actix_web::test]
async fn test_status_lifecycle_over_http() {
    let router = create_router(Arc::new(LogMailer));
    let app = app!(router);

    let req = test::TestRequest::post()
        .uri("/api/v1/leads")
        .set_json(lead_json())
        .to_request();
    let submitted: Value = test::call_and_read_body_json(&app, req).await;
    let lead_id = submitted["leadId"].as_str().unwrap().to_string();
    // nobody serves Las Vegas yet
    assert_eq!(submitted["routing"]["status"], "new");

    let status_uri = format!("/api/v1/leads/{}/status", lead_id);

    // statuses only move one step forward
    let req = test::TestRequest::post()
        .uri(&status_uri)
        .set_json(json!({ "status": "closed" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    for status in ["sent", "responded", "closed"] {
        let req = test::TestRequest::post()
            .uri(&status_uri)
            .set_json(json!({ "status": status }))
            .to_request();
        let lead: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(lead["status"], status);
    }

    let req = test::TestRequest::post()
        .uri(&status_uri)
        .set_json(json!({ "status": "new" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/leads/{}/route", lead_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri(&status_uri)
        .set_json(json!({ "status": "archived" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_unknown_resources_return_404() {
    let router = create_router(Arc::new(LogMailer));
    let app = app!(router);

    let req = test::TestRequest::get().uri("/api/v1/leads/missing").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/api/v1/builders/missing/leads").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::patch()
        .uri("/api/v1/builders/missing/active")
        .set_json(json!({ "isActive": false }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_failed_delivery_is_retried_and_dead_lettered() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/emails")
        .with_status(503)
        .with_body("provider down")
        .expect(3)
        .create_async()
        .await;

    let mailer = HttpMailer::new(
        format!("{}/emails", server.url()),
        "test_key".to_string(),
        "leads@stands.test".to_string(),
        Duration::from_secs(5),
    )
    .unwrap();
    let router = create_router(Arc::new(mailer));
    let app = app!(router);

    let req = test::TestRequest::put()
        .uri("/api/v1/builders/a")
        .set_json(builder_json("Las Vegas", "professional", &[]))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/leads")
        .set_json(lead_json())
        .to_request();
    let submitted: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(submitted["routing"]["status"], "new");
    assert_eq!(submitted["routing"]["dispatches"][0]["status"], "failed");
    assert_eq!(submitted["routing"]["dispatches"][0]["attempts"], 3);
    mock.assert_async().await;

    let req = test::TestRequest::get()
        .uri("/api/v1/admin/dispatch/failures")
        .to_request();
    let failures: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(failures["count"], 1);
    assert_eq!(failures["failures"][0]["builderId"], "a");
}

#[actix_web::test]
async fn test_notification_email_is_redacted_for_free_plan() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/emails")
        .match_body(mockito::Matcher::Regex("CES 2025".to_string()))
        .with_status(200)
        .create_async()
        .await;
    let leak = server
        .mock("POST", "/emails")
        .match_body(mockito::Matcher::Regex("dana@client\\.test".to_string()))
        .with_status(200)
        .expect(0)
        .create_async()
        .await;

    let mailer = HttpMailer::new(
        format!("{}/emails", server.url()),
        "test_key".to_string(),
        "leads@stands.test".to_string(),
        Duration::from_secs(5),
    )
    .unwrap();
    let router = create_router(Arc::new(mailer));
    let app = app!(router);

    let req = test::TestRequest::put()
        .uri("/api/v1/builders/a")
        .set_json(builder_json("Las Vegas", "free", &[]))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/leads")
        .set_json(lead_json())
        .to_request();
    let submitted: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(submitted["routing"]["status"], "sent");
    leak.assert_async().await;
    mock.assert_async().await;
}

#[actix_web::test]
async fn test_admin_audit_and_analytics() {
    let router = create_router(Arc::new(LogMailer));
    let app = app!(router);

    let req = test::TestRequest::put()
        .uri("/api/v1/builders/good")
        .set_json(builder_json("Las Vegas", "enterprise", &[]))
        .to_request();
    test::call_service(&app, req).await;

    let mut broken = builder_json("Las Vegas", "trialing", &[]);
    broken["contact"] = json!({});
    let req = test::TestRequest::put()
        .uri("/api/v1/builders/broken")
        .set_json(broken)
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/audit/builders")
        .to_request();
    let report: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(report["total"], 2);
    assert_eq!(report["failed"], 1);
    assert_eq!(report["outcomes"][1]["itemId"], "broken");

    let req = test::TestRequest::post()
        .uri("/api/v1/leads")
        .set_json(lead_json())
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/admin/routing/analytics")
        .to_request();
    let stats: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(stats["totalLeads"], 1);
    assert_eq!(stats["routedLeads"], 1);
    // unrecognized plan has no capacity
    assert_eq!(stats["totalAssignments"], 1);
    assert_eq!(stats["builderUtilization"]["good"], 1);
    assert_eq!(stats["builderUtilization"]["broken"], 0);

    let req = test::TestRequest::get()
        .uri("/api/v1/admin/leads?status=sent")
        .to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed["count"], 1);

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/leads/reroute")
        .to_request();
    let reroute: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(reroute["total"], 0);
}
