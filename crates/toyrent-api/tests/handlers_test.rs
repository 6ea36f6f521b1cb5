//! Handler tests over the in-memory store
//!
//! Each test wires the real services to the in-memory repositories and a
//! stub gateway, then drives the API through `actix_web::test`.

mod common;

use actix_web::{test, web, App};
use common::{context, decimal};
use serde_json::{json, Value};
use toyrent_api::configure;
use toyrent_core::models::TransactionStatus;
use uuid::Uuid;

fn rental_body(user_id: Uuid, toy_id: Uuid, quantity: i32) -> Value {
    json!({
        "user_id": user_id,
        "rental_date": "2024-06-03T09:00:00Z",
        "expected_return_date": "2024-06-06T09:00:00Z",
        "notes": "weekend trip",
        "items": [{ "toy_id": toy_id, "quantity": quantity, "condition_before": "good" }]
    })
}

#[actix_web::test]
async fn test_health_check() {
    let ctx = context().await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(ctx.state.clone()))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "healthy");
}

#[actix_web::test]
async fn test_create_and_get_rental() {
    let ctx = context().await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(ctx.state.clone()))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/rentals")
        .set_json(rental_body(ctx.user_id, ctx.toy_id, 2))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Rental created successfully");
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["customer_name"], "Dewi Lestari");
    assert_eq!(decimal(&body["data"]["total_rental_price"]), 30000.into());
    assert_eq!(ctx.store.stock_of(ctx.toy_id).await, Some(1));

    let id = body["data"]["id"].as_str().unwrap().to_string();
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/rentals/{}", id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["id"], id.as_str());
    assert_eq!(body["data"]["items"][0]["toy_name"], "Wooden train");
}

#[actix_web::test]
async fn test_create_rental_errors() {
    let ctx = context().await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(ctx.state.clone()))
            .configure(configure),
    )
    .await;

    let mut empty = rental_body(ctx.user_id, ctx.toy_id, 1);
    empty["items"] = json!([]);
    let req = test::TestRequest::post()
        .uri("/api/v1/rentals")
        .set_json(empty)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["status"], 400);

    let req = test::TestRequest::post()
        .uri("/api/v1/rentals")
        .set_json(rental_body(ctx.user_id, ctx.toy_id, 4))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "insufficient_stock");

    let req = test::TestRequest::post()
        .uri("/api/v1/rentals")
        .set_json(rental_body(ctx.user_id, Uuid::new_v4(), 1))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let req = test::TestRequest::post()
        .uri("/api/v1/rentals")
        .insert_header(("content-type", "application/json"))
        .set_payload("{ not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "validation_error");

    assert_eq!(ctx.store.stock_of(ctx.toy_id).await, Some(3));
}

#[actix_web::test]
async fn test_get_unknown_rental() {
    let ctx = context().await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(ctx.state.clone()))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/rentals/{}", Uuid::new_v4()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "rental_not_found");
}

#[actix_web::test]
async fn test_pay_extend_and_return() {
    let ctx = context().await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(ctx.state.clone()))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/rentals")
        .set_json(rental_body(ctx.user_id, ctx.toy_id, 1))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let rental_id = body["data"]["id"].as_str().unwrap().to_string();
    let item_id = body["data"]["items"][0]["id"].as_str().unwrap().to_string();

    // Checkout
    let req = test::TestRequest::post()
        .uri("/api/v1/payments")
        .set_json(json!({ "rental_id": rental_id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["payment_type"], "rental");
    assert_eq!(decimal(&body["data"]["gross_amount"]), 15000.into());
    let order_id = body["data"]["order_id"].as_str().unwrap().to_string();
    assert_eq!(
        body["data"]["snap_token"],
        format!("token-{}", order_id).as_str()
    );

    // Gateway settles and notifies
    ctx.gateway
        .set_status(&order_id, TransactionStatus::Settlement);
    let req = test::TestRequest::post()
        .uri("/api/v1/payments/callback")
        .set_json(json!({
            "order_id": order_id,
            "transaction_status": "settlement",
            "status_code": "200"
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["action"], "rental_updated");
    assert_eq!(body["data"]["payment_status"], "paid");
    assert_eq!(body["data"]["rental_status"], "active");

    // Paying twice conflicts
    let req = test::TestRequest::post()
        .uri("/api/v1/payments")
        .set_json(json!({ "rental_id": rental_id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);

    // Extend by two days
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/rentals/{}/extend", rental_id))
        .set_json(json!({ "new_expected_return_date": "2024-06-08T09:00:00Z" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(decimal(&body["data"]["additional_cost"]), 10000.into());
    assert_eq!(decimal(&body["data"]["original_rental_price"]), 15000.into());
    assert_eq!(decimal(&body["data"]["new_total_price"]), 25000.into());
    assert_eq!(body["data"]["payment"]["payment_type"], "extension");

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/payments/rental/{}", rental_id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    // Return on the new date
    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/rentals/{}/return", rental_id))
        .set_json(json!({
            "actual_return_date": "2024-06-08T08:00:00Z",
            "items": [{ "rental_item_id": item_id, "condition_after": "fair" }]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(decimal(&body["data"]["damage_fee"]), 30000.into());
    assert_eq!(body["data"]["items"][0]["status"], "returned");
    assert_eq!(ctx.store.stock_of(ctx.toy_id).await, Some(3));
}

#[actix_web::test]
async fn test_cancel_rental() {
    let ctx = context().await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(ctx.state.clone()))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/rentals")
        .set_json(rental_body(ctx.user_id, ctx.toy_id, 3))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let rental_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(ctx.store.stock_of(ctx.toy_id).await, Some(0));

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/rentals/{}/cancel", rental_id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["status"], "cancelled");
    assert_eq!(ctx.store.stock_of(ctx.toy_id).await, Some(3));

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/rentals/{}/cancel", rental_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "already_finalized");
}

#[actix_web::test]
async fn test_callback_errors() {
    let ctx = context().await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(ctx.state.clone()))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/payments/callback")
        .set_json(json!({ "transaction_status": "settlement" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    // The gateway has never heard of this order
    let req = test::TestRequest::post()
        .uri("/api/v1/payments/callback")
        .set_json(json!({ "order_id": "0badc0de-240603090000", "transaction_status": "settlement" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 502);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/payments/{}", Uuid::new_v4()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "payment_not_found");
}
