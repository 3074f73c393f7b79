//! Releases, products, members, contact messages and site settings.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};

use mp_records_integration_tests::{TestApp, id_of};

fn titles(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["title"].as_str().unwrap().to_owned())
        .collect()
}

#[tokio::test]
async fn test_release_crud_and_visibility() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    let anonymous = app
        .post("/api/releases", None, &json!({ "title": "Noc", "artists": "Kaz" }))
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let missing_artists = app
        .post("/api/releases", Some(&token), &json!({ "title": "Noc" }))
        .await;
    assert_eq!(missing_artists.status, StatusCode::BAD_REQUEST);

    let created = app
        .post(
            "/api/releases",
            Some(&token),
            &json!({ "title": "Noc", "artists": "Kaz, Bolek", "year": 2024, "highlight": "new" }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let id = id_of(&created.json());

    let hidden = app
        .post(
            "/api/releases",
            Some(&token),
            &json!({ "title": "Szkic", "artists": "Kaz", "active": false }),
        )
        .await;
    assert_eq!(hidden.status, StatusCode::CREATED);

    let public = app.get("/api/releases", None).await;
    assert_eq!(titles(&public.json()), vec!["Noc"]);
    assert_eq!(public.json()["count"], 1);

    let admin = app.get("/api/releases/admin", Some(&token)).await;
    assert_eq!(admin.json()["count"], 2);

    let updated = app
        .put(
            &format!("/api/releases/{id}"),
            Some(&token),
            &json!({ "title": "Noc (Deluxe)" }),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.json()["data"]["title"], "Noc (Deluxe)");
    assert_eq!(updated.json()["data"]["artists"], "Kaz, Bolek");

    let deleted = app.delete(&format!("/api/releases/{id}"), Some(&token)).await;
    assert_eq!(deleted.status, StatusCode::OK);

    let gone = app.get(&format!("/api/releases/{id}"), None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(gone.json()["success"], false);
}

#[tokio::test]
async fn test_release_move_swaps_neighbours() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    let first = app
        .post(
            "/api/releases",
            Some(&token),
            &json!({ "title": "Pierwsza", "artists": "A", "position": 0 }),
        )
        .await;
    let second = app
        .post(
            "/api/releases",
            Some(&token),
            &json!({ "title": "Druga", "artists": "B", "position": 1 }),
        )
        .await;
    let first_id = id_of(&first.json());
    let second_id = id_of(&second.json());

    let moved = app
        .put(
            &format!("/api/releases/{second_id}/move"),
            Some(&token),
            &json!({ "direction": "up" }),
        )
        .await;
    assert_eq!(moved.status, StatusCode::OK);
    assert_eq!(titles(&moved.json()), vec!["Druga", "Pierwsza"]);

    let too_far = app
        .put(
            &format!("/api/releases/{first_id}/move"),
            Some(&token),
            &json!({ "direction": "down" }),
        )
        .await;
    assert_eq!(too_far.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_products_filter_and_stock_totals() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    app.create_product(
        &token,
        &json!({
            "name": "Koszulka MP",
            "price": "89.99",
            "category": "clothing",
            "sizes": [{ "name": "M", "stock": 3 }, { "name": "L", "stock": 2 }],
        }),
    )
    .await;
    app.create_product(
        &token,
        &json!({ "name": "Winyl Noc", "price": "120.00", "category": "music" }),
    )
    .await;
    app.create_product(
        &token,
        &json!({ "name": "Czapka", "price": "49.00", "category": "accessories", "status": "hidden" }),
    )
    .await;

    let all = app.get("/api/products", None).await.json();
    assert_eq!(all["count"], 2);

    let clothing = app.get("/api/products?category=clothing", None).await.json();
    assert_eq!(clothing["count"], 1);
    assert_eq!(clothing["data"][0]["name"], "Koszulka MP");
    assert_eq!(clothing["data"][0]["totalStock"], 5);

    let admin = app.get("/api/products/admin", Some(&token)).await.json();
    assert_eq!(admin["count"], 3);

    let duplicate_sizes = app
        .post(
            "/api/products",
            Some(&token),
            &json!({
                "name": "Bluza",
                "price": "150.00",
                "sizes": [{ "name": "M", "stock": 1 }, { "name": "M", "stock": 2 }],
            }),
        )
        .await;
    assert_eq!(duplicate_sizes.status, StatusCode::BAD_REQUEST);

    let negative = app
        .post(
            "/api/products",
            Some(&token),
            &json!({ "name": "Gratis", "price": "-1.00" }),
        )
        .await;
    assert_eq!(negative.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_member_crud() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    let created = app
        .post(
            "/api/members",
            Some(&token),
            &json!({ "nickname": "Kaz", "role": "Producent" }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let id = id_of(&created.json());

    let listed = app.get("/api/members", None).await.json();
    assert_eq!(listed["count"], 1);
    assert_eq!(listed["data"][0]["nickname"], "Kaz");

    let updated = app
        .put(
            &format!("/api/members/{id}"),
            Some(&token),
            &json!({ "active": false }),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);

    assert_eq!(app.get("/api/members", None).await.json()["count"], 0);
    assert_eq!(
        app.get("/api/members/admin", Some(&token)).await.json()["count"],
        1
    );

    let deleted = app.delete(&format!("/api/members/{id}"), Some(&token)).await;
    assert_eq!(deleted.status, StatusCode::OK);
    let again = app.delete(&format!("/api/members/{id}"), Some(&token)).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_contact_messages_and_unread_count() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    let invalid = app
        .post(
            "/api/contact",
            None,
            &json!({ "email": "not-an-email", "body": "Cześć" }),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    let sent = app
        .post(
            "/api/contact",
            None,
            &json!({ "email": "fan@example.pl", "subject": "Koncert", "body": "Kiedy gracie?" }),
        )
        .await;
    assert_eq!(sent.status, StatusCode::CREATED);
    let id = id_of(&sent.json());

    let anonymous = app.get("/api/contact", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let unread = app.get("/api/contact/unread", Some(&token)).await.json();
    assert_eq!(unread["count"], 1);

    let read = app
        .put(&format!("/api/contact/{id}/read"), Some(&token), &json!({}))
        .await;
    assert_eq!(read.status, StatusCode::OK);
    assert_eq!(read.json()["data"]["read"], true);

    let unread = app.get("/api/contact/unread", Some(&token)).await.json();
    assert_eq!(unread["count"], 0);

    let messages = app.get("/api/contact", Some(&token)).await.json();
    assert_eq!(messages["count"], 1);
    assert_eq!(messages["data"][0]["subject"], "Koncert");
}

#[tokio::test]
async fn test_settings_patch_keeps_other_fields() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    let before = app.get("/api/settings", None).await;
    assert_eq!(before.status, StatusCode::OK);
    let before = before.json();

    let not_object = app.put("/api/settings", Some(&token), &json!([1, 2])).await;
    assert_eq!(not_object.status, StatusCode::BAD_REQUEST);

    let anonymous = app
        .put("/api/settings", None, &json!({ "marqueeText": "Hej" }))
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let updated = app
        .put(
            "/api/settings",
            Some(&token),
            &json!({ "marqueeText": "Nowa płyta już jest" }),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);

    let after = app.get("/api/settings", None).await.json();
    assert_eq!(after["data"]["marqueeText"], "Nowa płyta już jest");
    assert_eq!(
        after["data"]["particlesEnabled"],
        before["data"]["particlesEnabled"]
    );
    assert_eq!(after["data"]["socialMedia"], before["data"]["socialMedia"]);
}

#[tokio::test]
async fn test_spotify_fetch_requires_url() {
    let app = TestApp::new();

    let missing = app.get("/api/spotify/fetch", None).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let foreign = app
        .get("/api/spotify/fetch?url=https%3A%2F%2Fexample.com%2Falbum", None)
        .await;
    assert_eq!(foreign.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_requests_answer_with_error_envelope() {
    let app = TestApp::new();

    let bad_id = app.get("/api/products/not-a-uuid", None).await;
    assert_eq!(bad_id.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_id.header(header::CONTENT_TYPE), Some("application/json"));
    let body = bad_id.json();
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());

    let bad_product = app
        .post(
            "/api/orders",
            None,
            &json!({ "items": [{ "productId": "abc", "quantity": 1 }] }),
        )
        .await;
    assert_eq!(bad_product.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_product.json()["success"], false);

    let request = Request::builder()
        .method("POST")
        .uri("/api/contact")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\": "))
        .unwrap();
    let broken = app.send(request).await;
    assert_eq!(broken.status, StatusCode::BAD_REQUEST);
    assert_eq!(broken.json()["success"], false);

    let bad_filter = app.get("/api/products?category=furniture", None).await;
    assert_eq!(bad_filter.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_filter.json()["success"], false);
}
