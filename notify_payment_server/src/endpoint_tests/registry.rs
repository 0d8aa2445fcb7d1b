use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;

use super::helpers::{bearer, TestContext, NOTIFY_SECRET};

#[actix_web::test]
async fn accounts() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new(false);
    let req = TestRequest::post().uri("/account").set_json(json!({"name": "Ivan", "bank": "Sber", "number": "40817810099910004312"}));
    let (status, account) = ctx.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(account["id"], "1");
    assert_eq!(account["label"], "Ivan (Sber *4312)");

    let req = TestRequest::post().uri("/account").set_json(json!({"name": "", "bank": "Sber", "number": "1"}));
    let (status, body) = ctx.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid input: The account name must not be empty");

    let (status, all) = ctx.send(TestRequest::get().uri("/accounts")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 1);

    let req = TestRequest::post().uri("/deal").set_json(json!({"amount": "99", "accountId": "1"}));
    let (status, deal) = ctx.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deal["accountLabel"], "Ivan (Sber *4312)");
    assert_eq!(deal["paymentInstruction"], "Transfer 99 to 40817810099910004312. Payment reference: deal #1");
}

#[actix_web::test]
async fn devices() {
    let _ = env_logger::try_init().ok();
    let ctx = TestContext::new(false);
    let req = TestRequest::post().uri("/account").set_json(json!({"name": "Olga", "bank": "Tinkoff", "number": "1111"}));
    ctx.send(req).await;

    let req = TestRequest::post().uri("/device").set_json(json!({"id": "till-1", "label": "Front desk", "accountId": "1"}));
    let (status, device) = ctx.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(device["label"], "Front desk");
    assert_eq!(device["accountLabel"], "Olga (Tinkoff *1111)");
    assert_eq!(device["source"], "manual");
    assert!(device["activatedAt"].is_null());

    let (status, device) = ctx.send(TestRequest::post().uri("/device/till-1/activate")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(device["activatedAt"].is_string());

    let (status, _) = ctx.send(TestRequest::post().uri("/device/ghost/activate")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let req = TestRequest::post().uri("/device").set_json(json!({"id": "till-2", "accountId": "7"}));
    let (status, body) = ctx.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid input: Account 7 does not exist");
    let (_, devices) = ctx.send(TestRequest::get().uri("/devices")).await;
    assert_eq!(devices.as_array().unwrap().len(), 1);

    // a notification from an unknown device registers it
    let req = TestRequest::post()
        .uri("/notify")
        .insert_header(bearer(NOTIFY_SECRET))
        .set_json(json!({"text": "Paid 5", "package": "bank", "deviceId": "pos-9"}));
    ctx.send(req).await;
    let (status, devices) = ctx.send(TestRequest::get().uri("/devices")).await;
    assert_eq!(status, StatusCode::OK);
    let ids = devices.as_array().unwrap().iter().map(|d| d["id"].as_str().unwrap()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["pos-9", "till-1"]);
    assert_eq!(devices[0]["source"], "notify");
}
