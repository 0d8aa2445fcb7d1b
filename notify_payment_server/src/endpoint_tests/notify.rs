use actix_web::{http::StatusCode, test::TestRequest};
use notify_payment_engine::db_types::{DealStatus, NewDeal};
use serde_json::json;

use super::helpers::{bearer, TestContext, NOTIFY_SECRET};

fn notification(text: &str) -> serde_json::Value {
    json!({
        "package": "ru.sberbankmobile",
        "title": "Зачисление",
        "text": text,
        "postedAt": "2024-05-01T12:30:00.000+03:00",
        "deviceId": "dev1"
    })
}

#[actix_web::test]
async fn notify_without_a_token() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new(false);
    let req = TestRequest::post().uri("/notify").set_json(notification("Paid 100"));
    let (status, body) = ctx.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication Error. No bearer token was provided.");
}

#[actix_web::test]
async fn notify_with_the_wrong_token() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new(false);
    let deal = ctx.deals.create_deal(NewDeal::new("100")).await.unwrap();
    let req =
        TestRequest::post().uri("/notify").insert_header(bearer("not-the-secret")).set_json(notification("Paid 100"));
    let (status, body) = ctx.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication Error. The bearer token is not valid.");
    // nothing was ingested
    assert_eq!(ctx.deals.fetch_deal(deal.id).await.unwrap().status, DealStatus::Pending);
    assert!(ctx.registry.devices().await.is_empty());
}

#[actix_web::test]
async fn the_token_is_checked_before_the_body() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new(false);
    let req = TestRequest::post()
        .uri("/notify")
        .insert_header(("Authorization", format!("Basic {NOTIFY_SECRET}")))
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{ not json");
    let (status, _) = ctx.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn malformed_notifications() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new(false);
    let req = TestRequest::post()
        .uri("/notify")
        .insert_header(bearer(NOTIFY_SECRET))
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{ not json");
    let (status, body) = ctx.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Could not read request body"));
}

#[actix_web::test]
async fn notify_confirms_the_matching_deal() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new(false);
    let deal = ctx.deals.create_deal(NewDeal::new("1 234,56")).await.unwrap();
    let req =
        TestRequest::post().uri("/notify").insert_header(bearer(NOTIFY_SECRET)).set_json(notification("Paid 1 234,56 ₽"));
    let (status, body) = ctx.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"received": true, "matched": true, "dealId": deal.id.to_string(), "amount": "1234,56"}));

    let deal = ctx.deals.fetch_deal(deal.id).await.unwrap();
    assert_eq!(deal.status, DealStatus::Confirmed);
    let snapshot = deal.match_info.unwrap();
    assert_eq!(snapshot.package, "ru.sberbankmobile");
    assert_eq!(snapshot.device_id.as_deref(), Some("dev1"));
    assert!(snapshot.posted_at.is_some());
    assert!(!ctx.deals.scheduler().is_armed(deal.id));
}

#[actix_web::test]
async fn notify_without_a_matching_deal() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new(false);
    ctx.deals.create_deal(NewDeal::new("100").with_device_id("dev2")).await.unwrap();
    let req = TestRequest::post().uri("/notify").insert_header(bearer(NOTIFY_SECRET)).set_json(notification("Paid 100"));
    let (status, body) = ctx.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"received": true, "matched": false, "dealId": null, "amount": "100"}));
    let device = ctx.registry.device("dev1").await.unwrap();
    assert!(device.activated_at.is_some());
}

#[actix_web::test]
async fn the_declared_amount_wins_over_the_text() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new(false);
    let deal = ctx.deals.create_deal(NewDeal::new("250")).await.unwrap();
    let mut payload = notification("Balance 9 000, received 250");
    payload["amount"] = json!("250");
    let req = TestRequest::post().uri("/notify").insert_header(bearer(NOTIFY_SECRET)).set_json(payload);
    let (status, body) = ctx.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dealId"], deal.id.to_string());
}
