//! Customer accounts, carts and order placement.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::str::FromStr;

use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use mp_records_integration_tests::{CUSTOMER_PASSWORD, TestApp, TestResponse};

fn shipping() -> Value {
    json!({
        "firstName": "Jan",
        "lastName": "Nowak",
        "email": "jan@example.pl",
        "phone": "+48 600 000 000",
        "street": "Długa 1",
        "city": "Kraków",
        "postalCode": "30-001",
    })
}

fn decimal(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().unwrap()).unwrap()
}

/// An admin token plus a sized T-shirt (M: 3, L: 2) and a vinyl without sizes.
async fn shop(app: &TestApp) -> (String, String, String) {
    let token = app.admin_token().await;
    let shirt = app
        .create_product(
            &token,
            &json!({
                "name": "Koszulka MP",
                "price": "89.99",
                "category": "clothing",
                "sizes": [{ "name": "M", "stock": 3 }, { "name": "L", "stock": 2 }],
            }),
        )
        .await;
    let vinyl = app
        .create_product(
            &token,
            &json!({ "name": "Winyl Noc", "price": "120.00", "category": "music" }),
        )
        .await;
    (token, shirt, vinyl)
}

async fn stock(app: &TestApp, product: &str, size: &str) -> u64 {
    let body = app.get(&format!("/api/products/{product}"), None).await.json();
    body["data"]["sizes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["name"] == size)
        .and_then(|s| s["stock"].as_u64())
        .unwrap()
}

async fn add_to_cart(
    app: &TestApp,
    token: &str,
    product: &str,
    size: Option<&str>,
    quantity: u32,
) -> TestResponse {
    app.post(
        "/api/customers/cart",
        Some(token),
        &json!({ "productId": product, "size": size, "quantity": quantity }),
    )
    .await
}

#[tokio::test]
async fn test_customer_register_login_and_profile() {
    let app = TestApp::new();
    let token = app.customer_token("ola@example.pl").await;

    let duplicate = app
        .post(
            "/api/customers/register",
            None,
            &json!({ "email": "OLA@example.pl", "password": CUSTOMER_PASSWORD }),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);

    let login = app
        .post(
            "/api/customers/login",
            None,
            &json!({ "email": "ola@example.pl", "password": CUSTOMER_PASSWORD }),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    assert!(login.json()["token"].is_string());

    let wrong = app
        .post(
            "/api/customers/login",
            None,
            &json!({ "email": "ola@example.pl", "password": "zle-haslo" }),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let updated = app
        .put(
            "/api/customers/profile",
            Some(&token),
            &json!({ "phone": "+48 500 100 200", "address": { "city": "Gdańsk" } }),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);

    let profile = app.get("/api/customers/profile", Some(&token)).await.json();
    assert_eq!(profile["data"]["firstName"], "Ola");
    assert_eq!(profile["data"]["phone"], "+48 500 100 200");
    assert_eq!(profile["data"]["address"]["city"], "Gdańsk");
    assert!(profile["data"].get("passwordHash").is_none());
}

#[tokio::test]
async fn test_cart_merges_updates_and_removes_lines() {
    let app = TestApp::new();
    let (_admin, shirt, vinyl) = shop(&app).await;
    let token = app.customer_token("ola@example.pl").await;

    add_to_cart(&app, &token, &shirt, Some("M"), 1).await;
    add_to_cart(&app, &token, &shirt, Some("M"), 2).await;
    let cart = add_to_cart(&app, &token, &vinyl, None, 1).await.json();
    assert_eq!(cart["count"], 2);
    assert_eq!(cart["data"][0]["quantity"], 3);
    assert_eq!(cart["data"][0]["product"]["name"], "Koszulka MP");

    let missing =
        add_to_cart(&app, &token, "00000000-0000-4000-8000-000000000000", None, 1).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let changed = app
        .put("/api/customers/cart/1", Some(&token), &json!({ "quantity": 4 }))
        .await
        .json();
    assert_eq!(changed["data"][1]["quantity"], 4);

    let zero = app
        .put("/api/customers/cart/0", Some(&token), &json!({ "quantity": 0 }))
        .await
        .json();
    assert_eq!(zero["count"], 1);
    assert_eq!(zero["data"][0]["productId"], vinyl.as_str());

    let out_of_range = app.delete("/api/customers/cart/5", Some(&token)).await;
    assert_eq!(out_of_range.status, StatusCode::BAD_REQUEST);

    let cleared = app.delete("/api/customers/cart", Some(&token)).await.json();
    assert_eq!(cleared["count"], 0);
}

#[tokio::test]
async fn test_guest_order_prices_and_decrements_stock() {
    let app = TestApp::new();
    let (_admin, shirt, _vinyl) = shop(&app).await;

    let placed = app
        .post(
            "/api/orders",
            None,
            &json!({
                "shipping": shipping(),
                "items": [{ "productId": shirt, "size": "M", "quantity": 2 }],
                "paymentMethod": "blik",
            }),
        )
        .await;
    assert_eq!(placed.status, StatusCode::CREATED, "{}", placed.text());

    let body = placed.json();
    let order = &body["data"];
    assert!(order["number"].as_str().unwrap().starts_with("MP"));
    assert!(order["customer"].is_null());
    assert_eq!(order["paymentMethod"], "blik");
    assert_eq!(order["status"], "new");
    assert_eq!(order["items"][0]["name"], "Koszulka MP");
    assert_eq!(decimal(&order["totals"]["productsSubtotal"]), Decimal::new(17998, 2));
    assert_eq!(decimal(&order["totals"]["shipping"]), Decimal::new(15, 0));
    assert_eq!(decimal(&order["totals"]["total"]), Decimal::new(19498, 2));

    assert_eq!(stock(&app, &shirt, "M").await, 1);
    assert_eq!(stock(&app, &shirt, "L").await, 2);
}

#[tokio::test]
async fn test_free_shipping_from_threshold() {
    let app = TestApp::new();
    let (_admin, _shirt, vinyl) = shop(&app).await;

    let placed = app
        .post(
            "/api/orders",
            None,
            &json!({
                "shipping": shipping(),
                "items": [{ "productId": vinyl, "quantity": 2 }],
            }),
        )
        .await;
    assert_eq!(placed.status, StatusCode::CREATED, "{}", placed.text());

    let body = placed.json();
    let totals = &body["data"]["totals"];
    assert_eq!(decimal(&totals["shipping"]), Decimal::ZERO);
    assert_eq!(decimal(&totals["total"]), Decimal::new(240, 0));
}

#[tokio::test]
async fn test_insufficient_stock_rejects_whole_order() {
    let app = TestApp::new();
    let (token, shirt, vinyl) = shop(&app).await;

    let rejected = app
        .post(
            "/api/orders",
            None,
            &json!({
                "shipping": shipping(),
                "items": [
                    { "productId": shirt, "size": "L", "quantity": 1 },
                    { "productId": shirt, "size": "M", "quantity": 2 },
                    { "productId": shirt, "size": "M", "quantity": 2 },
                    { "productId": vinyl, "quantity": 1 },
                ],
            }),
        )
        .await;
    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
    assert_eq!(rejected.json()["success"], false);

    assert_eq!(stock(&app, &shirt, "M").await, 3);
    assert_eq!(stock(&app, &shirt, "L").await, 2);

    let orders = app.get("/api/orders/admin", Some(&token)).await.json();
    assert_eq!(orders["count"], 0);
}

#[tokio::test]
async fn test_order_validation_errors() {
    let app = TestApp::new();
    let (_admin, shirt, _vinyl) = shop(&app).await;

    let empty = app
        .post("/api/orders", None, &json!({ "shipping": shipping(), "items": [] }))
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);

    let no_address = app
        .post(
            "/api/orders",
            None,
            &json!({ "items": [{ "productId": shirt, "size": "M", "quantity": 1 }] }),
        )
        .await;
    assert_eq!(no_address.status, StatusCode::BAD_REQUEST);

    let unknown_product = app
        .post(
            "/api/orders",
            None,
            &json!({
                "shipping": shipping(),
                "items": [{ "productId": "00000000-0000-4000-8000-000000000000", "quantity": 1 }],
            }),
        )
        .await;
    assert_eq!(unknown_product.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_customer_order_clears_cart_and_admin_updates_status() {
    let app = TestApp::new();
    let (admin, shirt, _vinyl) = shop(&app).await;
    let token = app.customer_token("ola@example.pl").await;

    app.post(
        "/api/customers/cart",
        Some(&token),
        &json!({ "productId": shirt, "size": "L", "quantity": 1 }),
    )
    .await;

    let placed = app
        .post(
            "/api/orders",
            Some(&token),
            &json!({
                "shipping": shipping(),
                "items": [{ "productId": shirt, "size": "L", "quantity": 1 }],
            }),
        )
        .await;
    assert_eq!(placed.status, StatusCode::CREATED, "{}", placed.text());
    let id = placed.json()["data"]["id"].as_str().unwrap().to_owned();

    let cart = app.get("/api/customers/cart", Some(&token)).await.json();
    assert_eq!(cart["count"], 0);

    let mine = app.get("/api/orders/mine", Some(&token)).await.json();
    assert_eq!(mine["count"], 1);
    assert_eq!(mine["data"][0]["id"], id.as_str());

    let anonymous = app.get(&format!("/api/orders/{id}"), None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let shipped = app
        .put(
            &format!("/api/orders/{id}"),
            Some(&admin),
            &json!({ "status": "shipped", "paymentStatus": "paid", "trackingNumber": "PL123" }),
        )
        .await;
    assert_eq!(shipped.status, StatusCode::OK);
    assert_eq!(shipped.json()["data"]["status"], "shipped");
    assert_eq!(shipped.json()["data"]["paymentStatus"], "paid");

    let filtered = app
        .get("/api/orders/admin?status=shipped", Some(&admin))
        .await
        .json();
    assert_eq!(filtered["count"], 1);
    let none = app
        .get("/api/orders/admin?status=delivered", Some(&admin))
        .await
        .json();
    assert_eq!(none["count"], 0);

    let deleted = app.delete(&format!("/api/orders/{id}"), Some(&admin)).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(
        app.get(&format!("/api/orders/{id}"), Some(&admin)).await.status,
        StatusCode::NOT_FOUND
    );
}
