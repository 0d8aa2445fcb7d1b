use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;

use super::helpers::{bearer, TestContext, ADMIN_TOKEN, NOTIFY_SECRET};

#[actix_web::test]
async fn health_and_status_are_public() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new(true);
    let (status, _) = ctx.send(TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = ctx.send(TestRequest::get().uri("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true, "deals": []}));
}

#[actix_web::test]
async fn create_and_fetch_deals() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new(false);
    let req = TestRequest::post().uri("/deal").set_json(json!({"amount": "1 500", "deviceId": "dev1"}));
    let (status, deal) = ctx.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deal["id"], "1");
    assert_eq!(deal["amount"], "1500");
    assert_eq!(deal["deviceId"], "dev1");
    assert_eq!(deal["status"], "pending");
    assert_eq!(deal["paymentInstruction"], "Transfer 1500 to the merchant account. Payment reference: deal #1");

    let (status, _) = ctx.send(TestRequest::post().uri("/deal").set_json(json!({"amount": 70}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, all) = ctx.send(TestRequest::get().uri("/deals")).await;
    assert_eq!(status, StatusCode::OK);
    let amounts = all.as_array().unwrap().iter().map(|d| d["amount"].as_str().unwrap()).collect::<Vec<_>>();
    assert_eq!(amounts, vec!["1500", "70"]);

    let (status, fetched) = ctx.send(TestRequest::get().uri("/deal/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, deal);
}

#[actix_web::test]
async fn invalid_deals_are_rejected() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new(false);
    let (status, body) = ctx.send(TestRequest::post().uri("/deal").set_json(json!({"amount": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid input: The deal amount must not be empty");
    let (status, _) = ctx.send(TestRequest::post().uri("/deal").set_json(json!({"amount": "5", "accountId": "8"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = ctx.send(TestRequest::post().uri("/deal").set_json(json!({"deviceId": "dev1"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unknown_deals() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new(false);
    for uri in ["/deal/42", "/deal/abc"] {
        let (status, body) = ctx.send(TestRequest::get().uri(uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
    }
    let (status, _) = ctx.send(TestRequest::post().uri("/deal/42/close")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = ctx.send(TestRequest::post().uri("/deal/42/reject")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn closing_a_confirmed_deal_is_a_conflict() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new(false);
    ctx.send(TestRequest::post().uri("/deal").set_json(json!({"amount": "300"}))).await;

    let (status, deal) = ctx.send(TestRequest::post().uri("/deal/1/close")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deal["status"], "confirmed");
    assert!(deal["confirmedAt"].is_string());
    assert!(deal["match"].is_null());

    let (status, body) = ctx.send(TestRequest::post().uri("/deal/1/close")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Deal 1 is confirmed, but it must be pending for this operation");
    let (status, _) = ctx.send(TestRequest::post().uri("/deal/1/reject")).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // a late notification cannot confirm it again
    let req = TestRequest::post()
        .uri("/notify")
        .insert_header(bearer(NOTIFY_SECRET))
        .set_json(json!({"text": "Paid 300", "package": "bank"}));
    let (status, body) = ctx.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matched"], false);
}

#[actix_web::test]
async fn manual_rejection() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new(false);
    ctx.send(TestRequest::post().uri("/deal").set_json(json!({"amount": "10"}))).await;
    ctx.send(TestRequest::post().uri("/deal").set_json(json!({"amount": "20"}))).await;

    let req = TestRequest::post().uri("/deal/1/reject").set_json(json!({"reason": "customer cancelled"}));
    let (status, deal) = ctx.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deal["status"], "rejected");
    assert_eq!(deal["rejectReason"], json!({"kind": "manual", "note": "customer cancelled"}));
    assert!(deal["rejectedAt"].is_string());

    let (status, deal) = ctx.send(TestRequest::post().uri("/deal/2/reject")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deal["rejectReason"], json!({"kind": "manual", "note": null}));
    assert_eq!(ctx.deals.scheduler().armed_count(), 0);
}

#[actix_web::test]
async fn malformed_reject_requests_leave_the_deal_pending() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new(false);
    ctx.send(TestRequest::post().uri("/deal").set_json(json!({"amount": "10"}))).await;

    let req = TestRequest::post().uri("/deal/1/reject").set_json(json!({"reason": 5}));
    let (status, body) = ctx.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Could not read request body"));
    let req = TestRequest::post().uri("/deal/1/reject").insert_header(("Content-Type", "application/json")).set_payload("{");
    let (status, _) = ctx.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, deal) = ctx.send(TestRequest::get().uri("/deal/1")).await;
    assert_eq!(deal["status"], "pending");
    assert!(ctx.deals.scheduler().is_armed("1".parse().unwrap()));

    // an explicit null reason is the same as no reason
    let req = TestRequest::post().uri("/deal/1/reject").set_json(json!({"reason": null}));
    let (status, deal) = ctx.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deal["rejectReason"], json!({"kind": "manual", "note": null}));
}

#[actix_web::test]
async fn management_routes_require_the_admin_token_when_configured() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new(true);
    let (status, _) = ctx.send(TestRequest::post().uri("/deal").set_json(json!({"amount": "10"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = ctx.send(TestRequest::get().uri("/deals").insert_header(bearer(NOTIFY_SECRET))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = ctx.send(TestRequest::get().uri("/accounts")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    // unknown paths are not hidden behind the admin check
    let (status, _) = ctx.send(TestRequest::get().uri("/no/such/route")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = ctx.send(TestRequest::get().uri("/deals/extra")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = TestRequest::post().uri("/deal").insert_header(bearer(ADMIN_TOKEN)).set_json(json!({"amount": "10"}));
    let (status, _) = ctx.send(req).await;
    assert_eq!(status, StatusCode::OK);
    let (status, deals) = ctx.send(TestRequest::get().uri("/deals").insert_header(bearer(ADMIN_TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deals.as_array().unwrap().len(), 1);

    // the admin token is not a notify token
    let req = TestRequest::post()
        .uri("/notify")
        .insert_header(bearer(ADMIN_TOKEN))
        .set_json(json!({"text": "Paid 10", "package": "bank"}));
    let (status, _) = ctx.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
